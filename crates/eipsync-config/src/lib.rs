//! Configuration for the eipsync binary.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to the core runtime configs `SolidServerConfig` and
//! `NautobotConfig`. Core never reads this file; it receives the built
//! configs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eipsync_core::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_HOST_QUERIES, DEFAULT_NAMESPACE, DEFAULT_PAGE_SIZE,
    DEFAULT_TIMEOUT_SECS,
};
use eipsync_core::{NautobotConfig, SolidServerConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/<secret>`.
pub const KEYRING_SERVICE: &str = "eipsync";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {secret} configured for profile '{profile}'")]
    NoCredentials { profile: String, secret: Secret },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named source/target pairs.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// SOLIDserver request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Concurrent per-host queries during a CIDR fetch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Largest number of hosts a CIDR filter may enumerate.
    #[serde(default = "default_max_host_queries")]
    pub max_host_queries: u64,

    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            max_host_queries: default_max_host_queries(),
            output: default_output(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_max_host_queries() -> u64 {
    DEFAULT_MAX_HOST_QUERIES
}
fn default_output() -> String {
    "table".into()
}

/// One SOLIDserver → Nautobot pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// SOLIDserver base URL; `https://` is assumed without a scheme.
    #[serde(default)]
    pub solidserver_url: String,

    #[serde(default)]
    pub solidserver_username: String,

    /// Plaintext password (prefer keyring or env var).
    pub solidserver_password: Option<String>,

    /// Environment variable holding the password.
    pub solidserver_password_env: Option<String>,

    #[serde(default)]
    pub nautobot_url: String,

    /// Plaintext API token (prefer keyring or env var).
    pub nautobot_token: Option<String>,

    /// Environment variable holding the token.
    pub nautobot_token_env: Option<String>,

    pub nautobot_namespace: Option<String>,

    /// CA certificate for both endpoints.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification on both endpoints.
    pub insecure: Option<bool>,

    /// Overrides `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Reconciliation policy default for this profile.
    pub delete_unmatched: Option<bool>,
}

impl Profile {
    pub fn tls(&self) -> TlsVerification {
        if self.insecure.unwrap_or(false) {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        }
    }

    pub fn namespace(&self) -> &str {
        self.nautobot_namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    fn env_override(&self, secret: Secret) -> Option<&str> {
        match secret {
            Secret::SolidServerPassword => self.solidserver_password_env.as_deref(),
            Secret::NautobotToken => self.nautobot_token_env.as_deref(),
        }
    }

    fn plaintext(&self, secret: Secret) -> Option<&str> {
        match secret {
            Secret::SolidServerPassword => self.solidserver_password.as_deref(),
            Secret::NautobotToken => self.nautobot_token.as_deref(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "eipsync", "eipsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("eipsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `EIPSYNC_DEFAULTS__TIMEOUT=30`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EIPSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// The profile a command should use: explicit choice, then the file's
/// default, then `"default"`.
pub fn active_profile_name(explicit: Option<&str>, cfg: &Config) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look a profile up by name.
pub fn find_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let mut available: Vec<String> = cfg.profiles.keys().cloned().collect();
        available.sort();
        ConfigError::ProfileNotFound {
            name: name.into(),
            available,
        }
    })
}

// ── Credential resolution ───────────────────────────────────────────

/// The two secrets a profile needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    SolidServerPassword,
    NautobotToken,
}

impl Secret {
    /// Suffix of the keyring entry name.
    pub fn keyring_name(self) -> &'static str {
        match self {
            Self::SolidServerPassword => "solidserver-password",
            Self::NautobotToken => "nautobot-token",
        }
    }

    /// Environment variable consulted for every profile.
    pub fn fixed_env(self) -> &'static str {
        match self {
            Self::SolidServerPassword => "EIPSYNC_SOLIDSERVER_PASSWORD",
            Self::NautobotToken => "EIPSYNC_NAUTOBOT_TOKEN",
        }
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SolidServerPassword => "SOLIDserver password",
            Self::NautobotToken => "Nautobot token",
        })
    }
}

fn keyring_entry(profile_name: &str, secret: Secret) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{}", secret.keyring_name()),
    )?)
}

/// Resolve a secret: profile env var → fixed env var → keyring →
/// plaintext in the profile.
pub fn resolve_secret(
    profile: &Profile,
    profile_name: &str,
    secret: Secret,
) -> Result<SecretString, ConfigError> {
    resolve_secret_with(
        profile,
        profile_name,
        secret,
        |name| std::env::var(name).ok(),
        |key| {
            keyring_entry(key, secret)
                .ok()
                .and_then(|entry| entry.get_password().ok())
        },
    )
}

fn resolve_secret_with(
    profile: &Profile,
    profile_name: &str,
    secret: Secret,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    let non_empty = |value: &String| !value.is_empty();
    let found = profile
        .env_override(secret)
        .and_then(&env)
        .filter(non_empty)
        .or_else(|| env(secret.fixed_env()).filter(non_empty))
        .or_else(|| keyring(profile_name).filter(non_empty))
        .or_else(|| profile.plaintext(secret).map(str::to_owned))
        .filter(non_empty);

    found
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
            secret,
        })
}

/// Store a secret in the system keyring under `eipsync/<profile>/<secret>`.
pub fn store_secret(profile_name: &str, secret: Secret, value: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, secret)?.set_password(value)?;
    Ok(())
}

// ── Translation to core configs ─────────────────────────────────────

fn require_url(field: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "not set".into(),
        });
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    url::Url::parse(&candidate).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL {trimmed:?}: {e}"),
    })?;
    Ok(trimmed.to_owned())
}

/// Build the SOLIDserver connection config for a profile.
pub fn solidserver_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SolidServerConfig, ConfigError> {
    let url = require_url("solidserver_url", &profile.solidserver_url)?;
    if profile.solidserver_username.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "solidserver_username".into(),
            reason: "not set".into(),
        });
    }
    let password = resolve_secret(profile, profile_name, Secret::SolidServerPassword)?;

    Ok(SolidServerConfig {
        url,
        username: profile.solidserver_username.clone(),
        password,
        tls: profile.tls(),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        page_size: defaults.page_size,
    })
}

/// Build the Nautobot connection config for a profile.
pub fn nautobot_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<NautobotConfig, ConfigError> {
    let url = require_url("nautobot_url", &profile.nautobot_url)?;
    let token = resolve_secret(profile, profile_name, Secret::NautobotToken)?;

    Ok(NautobotConfig {
        url,
        token,
        namespace: profile.namespace().to_owned(),
        tls: profile.tls(),
        page_size: defaults.page_size,
    })
}
