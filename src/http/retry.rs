//! Classification of download failures into retryable and terminal.

use reqwest::StatusCode;

/// Maximum attempts for one download.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Failures that another attempt cannot fix.
#[derive(Debug)]
pub enum NonRetryableError {
    /// The release asset does not exist (HTTP 404) — wrong version, or an
    /// artifact the release never published.
    AssetNotFound(String),
    /// The release host is throttling us (HTTP 429, or 403 rate-limit).
    RateLimited(String),
    /// Other 4xx responses that will not succeed on retry.
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::AssetNotFound(msg) => {
                write!(f, "Release asset not found: {}", msg)
            }
            NonRetryableError::RateLimited(msg) => {
                write!(
                    f,
                    "Rate limited by the release host: {}. Try again later.",
                    msg
                )
            }
            NonRetryableError::ClientError(msg) => {
                write!(f, "Request rejected: {}", msg)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classify a status error. `Ok(())` means another attempt may succeed.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    if let Some(status) = error.status() {
        match status {
            StatusCode::NOT_FOUND => {
                return Err(NonRetryableError::AssetNotFound(
                    "the requested release asset does not exist".to_string(),
                ));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(NonRetryableError::RateLimited(
                    "too many requests".to_string(),
                ));
            }
            StatusCode::FORBIDDEN if error.to_string().contains("rate limit") => {
                return Err(NonRetryableError::RateLimited(
                    "download quota exceeded".to_string(),
                ));
            }
            s if s.is_client_error() => {
                return Err(NonRetryableError::ClientError(format!(
                    "HTTP {} error",
                    s.as_u16()
                )));
            }
            // 5xx and everything else: worth retrying
            _ => {}
        }
    }

    // Connection errors, timeouts, resets are retryable
    Ok(())
}

/// Map an `error_for_status()` error: retryable errors pass through,
/// terminal ones become a `NonRetryableError`.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_error(status: usize) -> reqwest::Error {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(status)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let response = client.get(server.url()).send().await.unwrap();
        response.error_for_status().unwrap_err()
    }

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::AssetNotFound("v9.9.9".to_string());
        assert!(err.to_string().contains("not found"));

        let err = NonRetryableError::RateLimited("test".to_string());
        assert!(err.to_string().contains("Rate limited"));

        let err = NonRetryableError::ClientError("HTTP 400".to_string());
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[tokio::test]
    async fn test_classify_error_not_found() {
        let err = status_error(404).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::AssetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_too_many_requests() {
        let err = status_error(429).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_other_client_error() {
        let err = status_error(400).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::ClientError(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_server_error_is_retryable() {
        let err = status_error(503).await;
        assert!(classify_error(&err).is_ok());
    }

    #[tokio::test]
    async fn test_check_retryable_wraps_terminal_errors() {
        let err = status_error(404).await;
        let mapped = check_retryable(err);
        assert!(mapped.downcast_ref::<NonRetryableError>().is_some());

        let err = status_error(500).await;
        let mapped = check_retryable(err);
        assert!(mapped.downcast_ref::<NonRetryableError>().is_none());
    }
}
