// ── Core error types ──
//
// Run-level errors from eipsync-core. Consumers never see raw HTTP status
// codes or reqwest errors; the `From<eipsync_api::Error>` impl translates
// transport-layer failures into run-level variants. Per-entity problems
// (rejected records, failed mutations) are not errors at this level: they
// surface as `Outcome` values and summary counts.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Parameter errors ─────────────────────────────────────────────
    #[error("Invalid CIDR filter {input:?}: {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("Invalid domain filter entries: {}", .invalid.join(", "))]
    InvalidDomains { invalid: Vec<String> },

    #[error("CIDR filter {cidr} spans {hosts} hosts, above the limit of {limit}")]
    FilterTooBroad { cidr: String, hosts: u128, limit: u64 },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Upstream errors ──────────────────────────────────────────────
    #[error("Upstream rejected request (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Response decode error: {message}")]
    Decode { message: String },

    // ── Target store ─────────────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Errors raised at the inventory store seam.
///
/// `Validation` and `NotFound` are recovered per entity by the target
/// adapter; `Backend` aborts a load.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Store backend error: {message}")]
    Backend { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<eipsync_api::Error> for CoreError {
    fn from(err: eipsync_api::Error) -> Self {
        match err {
            eipsync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            eipsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if let Some(status) = e.status() {
                    CoreError::Upstream {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            eipsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            eipsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            eipsync_api::Error::Upstream { status, body } => CoreError::Upstream {
                status,
                message: body,
            },
            eipsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
        }
    }
}

impl From<eipsync_api::Error> for StoreError {
    fn from(err: eipsync_api::Error) -> Self {
        if err.is_validation() {
            let message = match err {
                eipsync_api::Error::Upstream { body, .. } => body,
                other => other.to_string(),
            };
            StoreError::Validation { message }
        } else if err.is_not_found() {
            StoreError::NotFound {
                what: err.to_string(),
            }
        } else {
            StoreError::Backend {
                message: err.to_string(),
            }
        }
    }
}

impl CoreError {
    /// Attach the configured timeout to a bare `Timeout` translated from
    /// the transport layer.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        match self {
            CoreError::Timeout { timeout_secs: 0 } => CoreError::Timeout { timeout_secs: secs },
            other => other,
        }
    }

    /// `true` for errors raised by parameter validation, before any I/O.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidCidr { .. }
                | CoreError::InvalidDomains { .. }
                | CoreError::FilterTooBroad { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upstream_400_becomes_store_validation() {
        let err = StoreError::from(eipsync_api::Error::Upstream {
            status: 400,
            body: "{\"prefix\": [\"duplicate\"]}".into(),
        });
        match err {
            StoreError::Validation { message } => assert!(message.contains("duplicate")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn upstream_500_becomes_store_backend() {
        let err = StoreError::from(eipsync_api::Error::Upstream {
            status: 500,
            body: String::new(),
        });
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    #[test]
    fn decode_error_translates() {
        let err = CoreError::from(eipsync_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(matches!(err, CoreError::Decode { .. }));
    }

    #[test]
    fn invalid_domains_lists_every_entry() {
        let err = CoreError::InvalidDomains {
            invalid: vec!["bad domain".into(), "-x.com".into()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid domain filter entries: bad domain, -x.com"
        );
        assert!(err.is_parameter_error());
    }

    #[test]
    fn timeout_gets_configured_seconds() {
        let err = CoreError::Timeout { timeout_secs: 0 }.with_timeout_secs(120);
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 120 }));
    }
}
