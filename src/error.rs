//! Error handling for domain-scout

use std::time::Duration;
use thiserror::Error;

/// Main error type for domain-scout
#[derive(Error, Debug, Clone)]
pub enum DomainScoutError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Provider '{provider}' is missing credentials or disabled")]
    MissingCredentials { provider: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        url: Option<String>,
    },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Timeout error: {operation} timed out{}", limit_suffix(.after))]
    Timeout {
        operation: String,
        after: Option<Duration>,
    },

    #[error("Call quota exhausted: {limit} live lookups already made")]
    QuotaExhausted { limit: usize },

    #[error("Protocol error ({provider}): {message}")]
    Protocol { provider: String, message: String },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        content: Option<String>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse error taxonomy carried into outcome records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials absent or provider disabled; never retried.
    MissingConfiguration,
    /// Timeouts, connection failures, throttling; retried per backoff schedule.
    TransientNetwork,
    /// Malformed or unexpected provider response; terminal immediately.
    ProviderProtocol,
    /// Budget policy of the current run, not a provider fault.
    QuotaExhausted,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingConfiguration => write!(f, "missing_configuration"),
            ErrorKind::TransientNetwork => write!(f, "transient_network"),
            ErrorKind::ProviderProtocol => write!(f, "provider_protocol"),
            ErrorKind::QuotaExhausted => write!(f, "quota_exhausted"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl DomainScoutError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_credentials(provider: impl Into<String>) -> Self {
        Self::MissingCredentials {
            provider: provider.into(),
        }
    }

    /// Create a network error
    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        url: Option<String>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            url,
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Create a timeout error for a known limit
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after: Some(after),
        }
    }

    /// A timeout reported by a lower layer that did not say which limit fired.
    pub fn timed_out(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after: None,
        }
    }

    pub fn quota_exhausted(limit: usize) -> Self {
        Self::QuotaExhausted { limit }
    }

    /// Create a provider protocol error (unexpected response shape or status)
    pub fn protocol(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>, content: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            content,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Io {
            message: message.into(),
            path,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether another attempt against the same provider could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimit { .. } => true,
            Self::Network { status_code, .. } => match status_code {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            _ => false,
        }
    }

    /// Classify this error into the outcome taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::MissingCredentials { .. } => {
                ErrorKind::MissingConfiguration
            }
            Self::Network { .. } | Self::RateLimit { .. } | Self::Timeout { .. } => {
                ErrorKind::TransientNetwork
            }
            Self::Authentication { .. } | Self::Protocol { .. } | Self::Parse { .. } => {
                ErrorKind::ProviderProtocol
            }
            Self::QuotaExhausted { .. } => ErrorKind::QuotaExhausted,
            _ => ErrorKind::Unknown,
        }
    }

    /// Render for storage in an outcome's `error` field.
    ///
    /// Missing credentials and a spent quota collapse to their shared
    /// sentinels so callers can match on them; everything else keeps its
    /// kind as a prefix.
    pub fn to_outcome_error(&self) -> String {
        match self {
            Self::MissingCredentials { .. } => crate::types::MISSING_CREDENTIALS.to_string(),
            Self::QuotaExhausted { .. } => crate::types::MAX_CALLS_REACHED.to_string(),
            other => format!("{}: {}", other.kind(), other),
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("❌ Configuration problem: {}\n💡 Check your .env file or environment", message)
            }
            Self::MissingCredentials { provider } => {
                format!("⚠️  Provider '{}' skipped: credentials missing or disabled", provider)
            }
            Self::Network { message, status_code, .. } => {
                let status = status_code.map_or(String::new(), |c| format!(" ({})", c));
                format!("❌ Network error{}: {}\n💡 Check your internet connection", status, message)
            }
            Self::Authentication { message } => {
                format!("❌ Authentication failed: {}\n💡 Verify your registrar API keys", message)
            }
            Self::RateLimit { message, retry_after } => {
                let retry = retry_after.map_or(String::new(), |s| format!(" Retry in {}s.", s));
                format!("⏱️  Rate limit exceeded: {}{}\n💡 Lower the provider RPS setting", message, retry)
            }
            Self::Timeout { operation, after } => {
                format!(
                    "⏱️  Operation '{}' timed out{}\n💡 Try increasing the provider timeout",
                    operation,
                    limit_suffix(after)
                )
            }
            Self::QuotaExhausted { limit } => {
                format!("⏱️  All {} live lookups are spent\n💡 Raise DOMAIN_CHECK_MAX_CALLS or rely on the cache", limit)
            }
            Self::Protocol { provider, message } => {
                format!("❌ Unexpected response from {}: {}", provider, message)
            }
            Self::Parse { message, .. } => {
                format!("❌ Parse error: {}\n💡 This might be a temporary issue, try again", message)
            }
            Self::Validation { message } => {
                format!("❌ Validation error: {}\n💡 Check your input format", message)
            }
            Self::Cache { message } => {
                format!("❌ Cache error: {}\n💡 Check DOMAIN_CACHE_PATH and file permissions", message)
            }
            Self::Io { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ File error{}: {}\n💡 Check file permissions and paths", path_info, message)
            }
            Self::Internal { message } => {
                format!("❌ Internal error: {}\n💡 This is a bug, please report it", message)
            }
        }
    }
}

/// Convert from common error types
impl From<reqwest::Error> for DomainScoutError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| u.to_string());

        if err.is_timeout() {
            Self::timed_out("HTTP request")
        } else if err.is_connect() {
            Self::network("Connection failed", status_code, url)
        } else if err.is_decode() {
            Self::parse(err.to_string(), None)
        } else {
            Self::network(err.to_string(), status_code, url)
        }
    }
}

impl From<serde_json::Error> for DomainScoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}

impl From<std::io::Error> for DomainScoutError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string(), None)
    }
}

impl From<rusqlite::Error> for DomainScoutError {
    fn from(err: rusqlite::Error) -> Self {
        Self::cache(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for DomainScoutError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::cache(err.to_string())
    }
}

fn limit_suffix(after: &Option<Duration>) -> String {
    after.map_or(String::new(), |d| format!(" after {:?}", d))
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DomainScoutError>;

/// Helper macros for common error patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::DomainScoutError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::DomainScoutError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::DomainScoutError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::DomainScoutError::validation(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DomainScoutError::network("reset", None, None).is_transient());
        assert!(DomainScoutError::network("busy", Some(503), None).is_transient());
        assert!(DomainScoutError::network("slow down", Some(429), None).is_transient());
        assert!(DomainScoutError::timeout("lookup", Duration::from_secs(1)).is_transient());

        assert!(!DomainScoutError::network("gone", Some(404), None).is_transient());
        assert!(!DomainScoutError::authentication("bad key").is_transient());
        assert!(!DomainScoutError::protocol("godaddy", "no body").is_transient());
        assert!(!DomainScoutError::missing_credentials("namecom").is_transient());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DomainScoutError::missing_credentials("namecom").kind(),
            ErrorKind::MissingConfiguration
        );
        assert_eq!(
            DomainScoutError::timeout("lookup", Duration::from_secs(1)).kind(),
            ErrorKind::TransientNetwork
        );
        assert_eq!(
            DomainScoutError::parse("bad json", None).kind(),
            ErrorKind::ProviderProtocol
        );
        assert_eq!(
            DomainScoutError::quota_exhausted(80).kind(),
            ErrorKind::QuotaExhausted
        );
        assert_eq!(ErrorKind::QuotaExhausted.to_string(), "quota_exhausted");
    }

    #[test]
    fn test_outcome_error_rendering() {
        let missing = DomainScoutError::missing_credentials("godaddy");
        assert_eq!(missing.to_outcome_error(), "missing_credentials_or_disabled");

        let rendered = DomainScoutError::protocol("namecheap", "ApiResponse ERROR").to_outcome_error();
        assert!(rendered.starts_with("provider_protocol: "));
        assert!(rendered.contains("ApiResponse ERROR"));
    }

    #[test]
    fn test_timeout_messages() {
        let bounded = DomainScoutError::timeout("godaddy request", Duration::from_secs(10));
        assert_eq!(bounded.to_string(), "Timeout error: godaddy request timed out after 10s");

        let reported = DomainScoutError::timed_out("HTTP request");
        assert_eq!(reported.to_string(), "Timeout error: HTTP request timed out");
        assert!(!reported.to_string().contains("0ns"));
        assert!(reported.is_transient());
    }

    #[test]
    fn test_quota_error_uses_sentinel() {
        let spent = DomainScoutError::quota_exhausted(3);
        assert_eq!(spent.to_outcome_error(), "max_calls_reached");
        assert!(!spent.is_transient());
    }

    #[test]
    fn test_error_macros() {
        let error = config_error!("bad value for {}", "DOMAIN_CHECK_MAX_CALLS");
        assert!(error.to_string().contains("DOMAIN_CHECK_MAX_CALLS"));

        let error = validation_error!("empty label");
        assert!(error.to_string().contains("empty label"));
    }
}
