// ── Runtime connection configuration ──
//
// These types describe *how* to reach SOLIDserver and Nautobot.
// They carry credential data and connection tuning, but never touch disk.
// The CLI constructs them (via eipsync-config) and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use eipsync_api::{TlsMode, TransportConfig};

/// Default SOLIDserver request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default page size for both list APIs.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Default number of concurrent per-host queries during a CIDR fetch.
pub const DEFAULT_CONCURRENCY: usize = 16;
/// Default cap on the number of hosts a CIDR filter may enumerate.
pub const DEFAULT_MAX_HOST_QUERIES: u64 = 65_536;
/// Default Nautobot namespace for created records.
pub const DEFAULT_NAMESPACE: &str = "Global";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed lab installs).
    DangerAcceptInvalid,
}

impl TlsVerification {
    fn to_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Connection settings for the SOLIDserver source.
#[derive(Debug, Clone)]
pub struct SolidServerConfig {
    /// Base URL; `https://` is assumed when no scheme is given.
    pub url: String,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout. Applies to the source client only.
    pub timeout: Duration,
    pub page_size: usize,
}

impl SolidServerConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_mode(),
            timeout: self.timeout,
        }
    }
}

/// Connection settings for the Nautobot target.
#[derive(Debug, Clone)]
pub struct NautobotConfig {
    pub url: String,
    pub token: SecretString,
    /// Namespace new records are created in.
    pub namespace: String,
    pub tls: TlsVerification,
    pub page_size: usize,
}

impl NautobotConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_mode(),
            ..TransportConfig::default()
        }
    }
}
