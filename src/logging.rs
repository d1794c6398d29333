/// Structured logging for the flood alert relay
///
/// Thin layer over `tracing` that tags every event with the collaborator it
/// concerns (repository, delivery, dispatch) and an optional context id such
/// as a reply token, and classifies failures so that routine ones (an expired
/// reply token) do not drown out real outages.

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::model::RelayError;

// ---------------------------------------------------------------------------
// Log sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Repository,
    Delivery,
    Dispatch,
    System,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Repository => write!(f, "REPO"),
            LogSource::Delivery => write!(f, "SEND"),
            LogSource::Dispatch => write!(f, "DISPATCH"),
            LogSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Routine failure, e.g. the user's reply token expired before we answered
    Expected,
    /// Indicates an outage or misconfiguration
    Unexpected,
    /// Cannot tell which
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logger(default_directive: &str, timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn info(source: LogSource, context: Option<&str>, message: &str) {
    tracing::info!(source = %source, context = context.unwrap_or("-"), "{message}");
}

pub fn warn(source: LogSource, context: Option<&str>, message: &str) {
    tracing::warn!(source = %source, context = context.unwrap_or("-"), "{message}");
}

pub fn error(source: LogSource, context: Option<&str>, message: &str) {
    tracing::error!(source = %source, context = context.unwrap_or("-"), "{message}");
}

pub fn debug(source: LogSource, context: Option<&str>, message: &str) {
    tracing::debug!(source = %source, context = context.unwrap_or("-"), "{message}");
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a repository failure from its message.
pub fn classify_repository_failure(err: &RelayError) -> FailureType {
    let message = err.to_string().to_lowercase();
    if message.contains("timeout")
        || message.contains("timed out")
        || message.contains("connection")
        || message.contains("not found")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Classify a delivery failure from the HTTP status.
///
/// Reply tokens are single use and expire quickly, so a 400 is usually a
/// late or duplicate reply. Auth failures mean the channel token is wrong.
pub fn classify_delivery_failure(err: &RelayError) -> FailureType {
    match err {
        RelayError::Delivery { status: Some(400), .. } => FailureType::Expected,
        RelayError::Delivery { status: Some(401 | 403), .. } => FailureType::Unexpected,
        RelayError::Delivery { status: Some(s), .. } if *s >= 500 => FailureType::Unexpected,
        RelayError::Delivery { status: None, .. } => FailureType::Unexpected,
        _ => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(
    source: LogSource,
    context: Option<&str>,
    failure_type: FailureType,
    message: &str,
) {
    match failure_type {
        FailureType::Expected => info(source, context, message),
        FailureType::Unexpected => error(source, context, message),
        FailureType::Unknown => warn(source, context, message),
    }
}

pub fn log_repository_failure(operation: &str, err: &RelayError) {
    let failure_type = classify_repository_failure(err);
    let message = format!("{operation} failed [{failure_type}]: {err}");
    log_classified(LogSource::Repository, None, failure_type, &message);
}

pub fn log_delivery_failure(reply_token: &str, err: &RelayError) {
    let failure_type = classify_delivery_failure(err);
    let message = format!("reply failed [{failure_type}]: {err}");
    log_classified(LogSource::Delivery, Some(reply_token), failure_type, &message);
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of one inbound event batch.
pub fn log_batch_summary(handled: usize, ignored: usize, failed: usize) {
    let message = format!("batch complete: {handled} replied, {ignored} ignored, {failed} failed");

    if failed == 0 {
        debug(LogSource::Dispatch, None, &message);
    } else if handled == 0 {
        error(LogSource::Dispatch, None, &message);
    } else {
        warn(LogSource::Dispatch, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(status: Option<u16>) -> RelayError {
        RelayError::Delivery {
            status,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_delivery_failure_classification() {
        assert_eq!(classify_delivery_failure(&delivery(Some(400))), FailureType::Expected);
        assert_eq!(classify_delivery_failure(&delivery(Some(401))), FailureType::Unexpected);
        assert_eq!(classify_delivery_failure(&delivery(Some(503))), FailureType::Unexpected);
        assert_eq!(classify_delivery_failure(&delivery(None)), FailureType::Unexpected);
        assert_eq!(classify_delivery_failure(&delivery(Some(429))), FailureType::Unknown);
    }

    #[test]
    fn test_repository_failure_classification() {
        let refused = RelayError::Repository("connection refused".to_string());
        assert_eq!(classify_repository_failure(&refused), FailureType::Unexpected);

        let odd = RelayError::Repository("column \"level_cm\" has unexpected type".to_string());
        assert_eq!(classify_repository_failure(&odd), FailureType::Unknown);
    }

    #[test]
    fn test_logging_without_subscriber_does_not_panic() {
        log_batch_summary(1, 2, 0);
        log_delivery_failure("token", &delivery(Some(400)));
        log_repository_failure("fetch_latest_readings", &RelayError::Repository("x".to_string()));
    }
}
