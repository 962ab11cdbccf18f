use thiserror::Error;

/// Top-level error type for the `eipsync-api` crate.
///
/// Covers every failure mode of both REST surfaces: authentication,
/// transport, upstream rejection, and response decoding.
/// `eipsync-core` maps these into run-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected, or not representable as header values.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Upstream ────────────────────────────────────────────────────
    /// The server answered with a non-success status.
    #[error("Upstream rejected request (HTTP {status}): {body}")]
    Upstream { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Response decode error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the transport gave up waiting for a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Upstream { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the server refused the payload as invalid (HTTP 400).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Upstream { status: 400, .. })
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Build an `Error::Deserialization` with a bounded preview of the body.
pub(crate) fn decode_error(err: &serde_json::Error, body: String) -> Error {
    let preview: String = body.chars().take(200).collect();
    Error::Deserialization {
        message: format!("{err} (body preview: {preview:?})"),
        body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upstream_400_is_validation() {
        let err = Error::Upstream {
            status: 400,
            body: "{\"status\": [\"bad\"]}".into(),
        };
        assert!(err.is_validation());
        assert!(!err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn upstream_5xx_is_transient() {
        let err = Error::Upstream {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn decode_error_truncates_preview() {
        let body = "x".repeat(1000);
        let parse_err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        match decode_error(&parse_err, body.clone()) {
            Error::Deserialization { message, body: raw } => {
                assert!(message.len() < 400);
                assert_eq!(raw, body);
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
