//! Timeout utilities for external tool invocations.
//!
//! Every call into an external process (decoder, readelf, objdump) is wrapped
//! so a hung tool costs one bounded wait instead of the whole run.

use crate::error::{Result, RopCheckError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default timeout for a single decoder invocation in milliseconds
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 2_000;

/// Default timeout for section listing and extraction tools in milliseconds
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 60_000;

/// Timeout configuration for one operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log timeout warnings
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(millis: u64, operation: impl Into<String>) -> Self {
        Self {
            duration: Duration::from_millis(millis),
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    /// Per-window decoder timeout, quiet because timeouts are counted instead
    pub fn decode(millis: u64) -> Self {
        Self {
            log_warnings: false,
            ..Self::new(millis, "decode")
        }
    }
}

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        operation = %config.operation_name,
        timeout_ms = config.duration.as_millis() as u64,
        "Starting timed operation"
    );

    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => {
            let millis = config.duration.as_millis() as u64;
            if config.log_warnings {
                warn!(
                    operation = %config.operation_name,
                    timeout_ms = millis,
                    "Operation timed out"
                );
            }
            Err(RopCheckError::Timeout { millis })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_timeout_success() {
        let config = TimeoutConfig::new(1_000, "test_operation");

        let result = with_timeout(config, async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_async_timeout_failure() {
        let config = TimeoutConfig::decode(50);

        let result: Result<i32> = with_timeout(config, async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(42)
        })
        .await;

        assert!(matches!(result, Err(RopCheckError::Timeout { millis: 50 })));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let config = TimeoutConfig::new(DEFAULT_TOOL_TIMEOUT_MS, "readelf");
        let result: Result<()> = with_timeout(config, async {
            Err(RopCheckError::MissingTool("readelf".into()))
        })
        .await;
        assert!(matches!(result, Err(RopCheckError::MissingTool(_))));
    }
}
