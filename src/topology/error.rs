//! Topology error types.

use thiserror::Error;

/// Errors raised by explicit topology operations.
///
/// Selection paths never produce these: a missing pool during linearization
/// is skipped silently.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Pool not found.
    #[error("pool '{0}' not found")]
    PoolNotFound(String),

    /// Host not found.
    #[error("host '{host}' not found in pool '{pool}'")]
    HostNotFound { pool: String, host: String },

    /// Host address could not be parsed.
    #[error("invalid address '{address}' for host '{host}'")]
    InvalidAddress { host: String, address: String },
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TopologyError::PoolNotFound("web".to_string());
        assert_eq!(err.to_string(), "pool 'web' not found");

        let err = TopologyError::HostNotFound {
            pool: "web".into(),
            host: "a".into(),
        };
        assert_eq!(err.to_string(), "host 'a' not found in pool 'web'");
    }
}
