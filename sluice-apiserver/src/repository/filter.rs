//! Filter translation
//!
//! Renders validated predicates as SQL conditions on the `pipelines` table
//! (aliased `p`), binding every operand as a parameter.

use sluice_core::domain::filter::{Filter, Operand, Operation, Predicate};
use sqlx::{Postgres, QueryBuilder};

use super::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Text,
    /// Compared as Unix seconds
    Epoch,
}

struct Column {
    key: &'static str,
    expr: &'static str,
    field_type: FieldType,
}

const COLUMNS: &[Column] = &[
    Column {
        key: "id",
        expr: "p.id::text",
        field_type: FieldType::Text,
    },
    Column {
        key: "name",
        expr: "p.name",
        field_type: FieldType::Text,
    },
    Column {
        key: "description",
        expr: "p.description",
        field_type: FieldType::Text,
    },
    Column {
        key: "namespace",
        expr: "p.namespace",
        field_type: FieldType::Text,
    },
    Column {
        key: "created_at",
        expr: "EXTRACT(EPOCH FROM p.created_at)::BIGINT",
        field_type: FieldType::Epoch,
    },
];

enum Bound {
    Text(String),
    Int(i64),
    TextList(Vec<String>),
    IntList(Vec<i64>),
}

/// Append ` AND <condition>` for every predicate of `filter`
pub fn push_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &Filter,
) -> Result<(), ResourceError> {
    for predicate in &filter.predicates {
        let column = COLUMNS
            .iter()
            .find(|c| c.key == predicate.key())
            .ok_or_else(|| {
                ResourceError::InvalidArgument(format!(
                    "predicate '{}': unknown field",
                    predicate.key()
                ))
            })?;

        let bound = bind_value(column, predicate)?;

        builder.push(" AND ");
        match predicate.operation() {
            Operation::In => {
                builder.push(column.expr).push(" = ANY(");
                push_bound(builder, bound);
                builder.push(")");
            }
            Operation::IsSubstring => {
                builder.push("strpos(").push(column.expr).push(", ");
                push_bound(builder, bound);
                builder.push(") > 0");
            }
            operation => {
                builder
                    .push(column.expr)
                    .push(" ")
                    .push(comparison(predicate.key(), operation)?)
                    .push(" ");
                push_bound(builder, bound);
            }
        }
    }

    Ok(())
}

fn push_bound(builder: &mut QueryBuilder<'_, Postgres>, bound: Bound) {
    match bound {
        Bound::Text(v) => builder.push_bind(v),
        Bound::Int(v) => builder.push_bind(v),
        Bound::TextList(v) => builder.push_bind(v),
        Bound::IntList(v) => builder.push_bind(v),
    };
}

fn comparison(key: &str, operation: Operation) -> Result<&'static str, ResourceError> {
    match operation {
        Operation::Equals => Ok("="),
        Operation::NotEquals => Ok("<>"),
        Operation::GreaterThan => Ok(">"),
        Operation::GreaterThanEquals => Ok(">="),
        Operation::LessThan => Ok("<"),
        Operation::LessThanEquals => Ok("<="),
        other => Err(ResourceError::InvalidArgument(format!(
            "predicate '{}': {} is not a comparison",
            key, other
        ))),
    }
}

fn bind_value(column: &Column, predicate: &Predicate) -> Result<Bound, ResourceError> {
    let bound = match (column.field_type, predicate.operand()) {
        (FieldType::Text, Operand::String(v)) => Bound::Text(v.clone()),
        (FieldType::Text, Operand::StringValues(v)) => Bound::TextList(v.clone()),
        (FieldType::Epoch, Operand::Int(v)) => Bound::Int(i64::from(*v)),
        (FieldType::Epoch, Operand::Long(v)) => Bound::Int(*v),
        (FieldType::Epoch, Operand::Timestamp(v)) => Bound::Int(v.timestamp()),
        (FieldType::Epoch, Operand::IntValues(v)) => {
            Bound::IntList(v.iter().copied().map(i64::from).collect())
        }
        (FieldType::Epoch, Operand::LongValues(v)) => Bound::IntList(v.clone()),
        (_, operand) => {
            return Err(ResourceError::InvalidArgument(format!(
                "predicate '{}': field '{}' cannot be compared with {}",
                predicate.key(),
                column.key,
                operand.field_name()
            )));
        }
    };

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn render(filter: &Filter) -> Result<String, ResourceError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT p.id FROM pipelines p WHERE p.namespace = ");
        builder.push_bind(String::new());
        push_filter(&mut builder, filter)?;
        Ok(builder.sql().to_string())
    }

    #[test]
    fn test_empty_filter_adds_nothing() {
        let sql = render(&Filter::default()).unwrap();
        assert_eq!(sql, "SELECT p.id FROM pipelines p WHERE p.namespace = $1");
    }

    #[test]
    fn test_predicates_are_anded_and_bound() {
        let filter = Filter::new(vec![
            Predicate::new("name", Operation::Equals, Operand::String("demo".into())).unwrap(),
            Predicate::new(
                "created_at",
                Operation::GreaterThanEquals,
                Operand::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            )
            .unwrap(),
            Predicate::new(
                "id",
                Operation::In,
                Operand::StringValues(vec!["a".into(), "b".into()]),
            )
            .unwrap(),
            Predicate::new(
                "description",
                Operation::IsSubstring,
                Operand::String("etl".into()),
            )
            .unwrap(),
        ]);

        let sql = render(&filter).unwrap();
        assert_eq!(
            sql,
            "SELECT p.id FROM pipelines p WHERE p.namespace = $1 \
             AND p.name = $2 \
             AND EXTRACT(EPOCH FROM p.created_at)::BIGINT >= $3 \
             AND p.id::text = ANY($4) \
             AND strpos(p.description, $5) > 0"
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let filter = Filter::new(vec![
            Predicate::new("owner", Operation::Equals, Operand::String("x".into())).unwrap(),
        ]);
        let err = render(&filter).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument(msg) if msg.contains("'owner'")));
    }

    #[test]
    fn test_operand_type_must_match_field() {
        let filter = Filter::new(vec![
            Predicate::new("name", Operation::Equals, Operand::Int(3)).unwrap(),
        ]);
        assert!(matches!(
            render(&filter),
            Err(ResourceError::InvalidArgument(_))
        ));

        let filter = Filter::new(vec![
            Predicate::new("created_at", Operation::Equals, Operand::String("now".into()))
                .unwrap(),
        ]);
        assert!(matches!(
            render(&filter),
            Err(ResourceError::InvalidArgument(_))
        ));
    }
}
