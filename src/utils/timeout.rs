use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::errors::{EngineError, Result};

/// Execute a future with a deadline.
///
/// An elapsed deadline is reported as [`EngineError::Timeout`]; the inner
/// future's own error is passed through untouched.
pub async fn with_timeout<F, T>(future: F, duration: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Operation '{}' timed out after {:?}", operation_name, duration);
            Err(EngineError::Timeout {
                operation: operation_name.to_string(),
                after: duration,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_operation() {
        async fn quick_operation() -> Result<String> {
            Ok("success".to_string())
        }

        let result = with_timeout(quick_operation(), Duration::from_secs(1), "test_operation").await;

        assert_eq!(result.unwrap(), "success");
    }

    #[tokio::test]
    async fn test_timeout() {
        async fn slow_operation() -> Result<String> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok("success".to_string())
        }

        let result =
            with_timeout(slow_operation(), Duration::from_millis(50), "test_operation").await;

        let err = result.unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        async fn failing_operation() -> Result<String> {
            Err(EngineError::exchange_unavailable("BTCE"))
        }

        let result =
            with_timeout(failing_operation(), Duration::from_secs(1), "test_operation").await;

        assert!(matches!(result, Err(EngineError::ExchangeUnavailable(_))));
    }
}
