//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use eipsync_config::ConfigError;
use eipsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UPSTREAM: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Parameters ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(eipsync::invalid_parameter),
        help(
            "--cidr takes network/length (e.g. 10.1.0.0/16); \
             --domains takes a comma-separated list of domain names."
        )
    )]
    InvalidParameter { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(eipsync::filter_too_broad),
        help("Narrow the --cidr filter or raise defaults.max_host_queries in the config.")
    )]
    FilterTooBroad { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(eipsync::validation))]
    Validation { field: String, reason: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(eipsync::connection_failed),
        help(
            "Check the URL and that the server is reachable.\n\
             Self-signed certificate? Use --insecure (-k) or set ca_cert in the profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(eipsync::timeout),
        help("Increase the timeout with --timeout or narrow the run with --cidr / --domains.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(eipsync::auth_failed),
        help("Verify the credentials, or store new ones with: eipsync config set-secret")
    )]
    AuthFailed { message: String },

    #[error("No {secret} configured for profile '{profile}'")]
    #[diagnostic(
        code(eipsync::no_credentials),
        help(
            "Store it with: eipsync config set-secret\n\
             Or set EIPSYNC_SOLIDSERVER_PASSWORD / EIPSYNC_NAUTOBOT_TOKEN."
        )
    )]
    NoCredentials { profile: String, secret: String },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("Upstream rejected request (HTTP {status}): {message}")]
    #[diagnostic(code(eipsync::upstream))]
    Upstream { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(eipsync::upstream))]
    Api { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(eipsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: eipsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(eipsync::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParameter { .. } | Self::FilterTooBroad { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Upstream { .. } | Self::Api { .. } => exit_code::UPSTREAM,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCidr { .. } | CoreError::InvalidDomains { .. } => {
                CliError::InvalidParameter {
                    message: err.to_string(),
                }
            }
            CoreError::FilterTooBroad { .. } => CliError::FilterTooBroad {
                message: err.to_string(),
            },
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Upstream { status, message } => CliError::Upstream { status, message },
            CoreError::Decode { .. } | CoreError::Store(_) => CliError::Api {
                message: err.to_string(),
            },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, secret } => CliError::NoCredentials {
                profile,
                secret: secret.to_string(),
            },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_errors_exit_with_usage() {
        let err = CliError::from(CoreError::InvalidDomains {
            invalid: vec!["bad domain".into()],
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("bad domain"));
    }

    #[test]
    fn transport_errors_map_to_their_codes() {
        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 30 });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let upstream = CliError::from(CoreError::Upstream {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(upstream.exit_code(), exit_code::UPSTREAM);

        let conn = CliError::from(CoreError::ConnectionFailed {
            url: "https://ipam.example.net".into(),
            reason: "refused".into(),
        });
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_profile_lists_none() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            name: "lab".into(),
            available: Vec::new(),
        });
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "(none)"),
            other => panic!("expected ProfileNotFound, got {other:?}"),
        }
    }
}
