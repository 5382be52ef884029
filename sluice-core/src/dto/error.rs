//! Error body returned by every failing endpoint

use serde::{Deserialize, Serialize};

/// JSON body written on failure
///
/// `error_message` is the stable, caller-facing message; `error_details`
/// carries the error kind and the full chain of wrapped causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_message: String,
    #[serde(default)]
    pub error_details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let body = ErrorBody {
            error_message: "bad file".to_string(),
            error_details: "InvalidInput: bad file".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["errorMessage"], "bad file");
        assert_eq!(json["errorDetails"], "InvalidInput: bad file");
    }
}
