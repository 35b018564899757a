//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Check whether this is a transient transport failure.
    ///
    /// Transient errors (dropped connection, broken stream, timeout, busy
    /// broker) are retried by the connection manager; anything else, such
    /// as bad credentials or a protocol error, surfaces immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            QueueError::Redis(e) => {
                e.is_connection_dropped()
                    || e.is_io_error()
                    || e.is_timeout()
                    || matches!(
                        e.kind(),
                        redis::ErrorKind::TryAgain
                            | redis::ErrorKind::BusyLoadingError
                            | redis::ErrorKind::MasterDown
                    )
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_dropped_connection_is_transient() {
        let err = QueueError::Redis(
            io::Error::new(io::ErrorKind::ConnectionReset, "connection closed").into(),
        );
        assert!(err.is_transient());

        let err = QueueError::Redis(
            io::Error::new(io::ErrorKind::BrokenPipe, "stream interrupted").into(),
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_auth_failure_is_permanent() {
        let err = QueueError::Redis(redis::RedisError::from((
            redis::ErrorKind::AuthenticationFailed,
            "invalid password",
        )));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_protocol_error_is_permanent() {
        let err = QueueError::Redis(redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "unexpected reply type",
        )));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_payload_errors_are_permanent() {
        let json = serde_json::from_str::<String>("{not json").unwrap_err();
        assert!(!QueueError::Json(json).is_transient());
        assert!(!QueueError::MalformedPayload("x".into()).is_transient());
        assert!(!QueueError::connection_failed("bad URI").is_transient());
    }
}
