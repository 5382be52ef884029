//! Upload counters
//!
//! Monotonic request totals shared by every handler task. Created once at
//! startup and injected through the application state.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct UploadCounters {
    enabled: bool,
    pipeline_uploads: AtomicU64,
    version_uploads: AtomicU64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub pipeline_upload_requests: u64,
    pub pipeline_version_upload_requests: u64,
}

impl UploadCounters {
    /// Counters that only count when `enabled`
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn record_pipeline_upload(&self) {
        if self.enabled {
            self.pipeline_uploads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_version_upload(&self) {
        if self.enabled {
            self.version_uploads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            pipeline_upload_requests: self.pipeline_uploads.load(Ordering::Relaxed),
            pipeline_version_upload_requests: self.version_uploads.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_disabled_counters_stay_zero() {
        let counters = UploadCounters::new(false);
        counters.record_pipeline_upload();
        counters.record_version_upload();

        assert_eq!(counters.snapshot().pipeline_upload_requests, 0);
        assert_eq!(counters.snapshot().pipeline_version_upload_requests, 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(UploadCounters::new(true));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let counters = counters.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        counters.record_pipeline_upload();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(counters.snapshot().pipeline_upload_requests, 800);
    }
}
