//! Oracle error types.
//!
//! Every variant is transport-class as far as a ranking batch is
//! concerned: the batch fails terminally and is never retried
//! automatically (the user retries by triggering another mutation).

/// Error from a ranking oracle call.
#[derive(Debug)]
pub struct OracleError {
    /// The kind of error
    pub kind: OracleErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
}

impl OracleError {
    /// Create a network error (connection failed, timeout).
    pub fn network_error(message: String) -> Self {
        Self {
            kind: OracleErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    /// Create a server error (5xx).
    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: OracleErrorKind::ServerError,
            status_code: Some(status_code),
            message,
        }
    }

    /// Create a client error (bad request, auth, quota).
    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: OracleErrorKind::ClientError,
            status_code: Some(status_code),
            message,
        }
    }

    /// Create an empty-response error (2xx but no usable text).
    pub fn empty_response(message: String) -> Self {
        Self {
            kind: OracleErrorKind::EmptyResponse,
            status_code: None,
            message,
        }
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for OracleError {}

/// Classification of oracle transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleErrorKind {
    /// Connection failed or timed out before a response arrived
    NetworkError,
    /// The oracle answered with a 5xx status
    ServerError,
    /// The oracle answered with a 4xx status
    ClientError,
    /// The oracle answered 2xx but produced no usable text
    EmptyResponse,
}

impl std::fmt::Display for OracleErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleErrorKind::NetworkError => write!(f, "Network error"),
            OracleErrorKind::ServerError => write!(f, "Server error"),
            OracleErrorKind::ClientError => write!(f, "Client error"),
            OracleErrorKind::EmptyResponse => write!(f, "Empty response"),
        }
    }
}

/// Parse an HTTP status code into an error kind.
pub fn classify_http_status(status: u16) -> OracleErrorKind {
    match status {
        400..=499 => OracleErrorKind::ClientError,
        _ => OracleErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(400), OracleErrorKind::ClientError);
        assert_eq!(classify_http_status(401), OracleErrorKind::ClientError);
        assert_eq!(classify_http_status(429), OracleErrorKind::ClientError);
        assert_eq!(classify_http_status(500), OracleErrorKind::ServerError);
        assert_eq!(classify_http_status(503), OracleErrorKind::ServerError);
    }

    #[test]
    fn test_display_includes_status() {
        let err = OracleError::server_error(503, "overloaded".to_string());
        assert_eq!(format!("{}", err), "Server error (HTTP 503): overloaded");

        let err = OracleError::network_error("connection refused".to_string());
        assert_eq!(format!("{}", err), "Network error: connection refused");
    }
}
