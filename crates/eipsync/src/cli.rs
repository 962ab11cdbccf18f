//! Clap derive structures for the `eipsync` CLI.
//!
//! Kept free of workspace crates so `build.rs` can include it for man
//! page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// eipsync -- SOLIDserver to Nautobot IPAM sync
#[derive(Debug, Parser)]
#[command(
    name = "eipsync",
    version,
    about = "Sync SOLIDserver IP addresses and prefixes into Nautobot",
    long_about = "Loads IP addresses and terminal subnets from an EfficientIP SOLIDserver,\n\
        diffs them against Nautobot IPAM, and applies the creates and updates.\n\n\
        Target records the source does not know about are left alone unless\n\
        --delete-unmatched is given.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "EIPSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "EIPSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "EIPSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase log verbosity above the default info (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates on both endpoints
    #[arg(long, short = 'k', env = "EIPSYNC_INSECURE", global = true)]
    pub insecure: bool,
}

// ── Output Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync from SOLIDserver into Nautobot
    Sync(SyncArgs),

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Only sync records in these domains (comma-separated)
    #[arg(long, value_name = "DOMAINS")]
    pub domains: Option<String>,

    /// Only sync records inside this network (e.g. 10.1.0.0/16)
    #[arg(long, value_name = "NETWORK")]
    pub cidr: Option<String>,

    /// Skip IP addresses
    #[arg(long)]
    pub no_addresses: bool,

    /// Skip prefixes
    #[arg(long)]
    pub no_prefixes: bool,

    /// SOLIDserver request timeout in seconds (overrides the profile)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log every record, including unchanged ones
    #[arg(long)]
    pub debug: bool,

    /// Compute and report the diff without changing Nautobot
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Delete Nautobot records the source no longer has
    #[arg(long)]
    pub delete_unmatched: bool,

    /// Concurrent per-host queries for --cidr (overrides the config)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with a profile
    Init {
        /// SOLIDserver base URL
        #[arg(long)]
        solidserver_url: String,

        /// SOLIDserver API user
        #[arg(long)]
        solidserver_username: String,

        /// Nautobot base URL
        #[arg(long)]
        nautobot_url: String,

        /// Nautobot namespace for new records
        #[arg(long)]
        namespace: Option<String>,

        /// Replace an existing profile of the same name
        #[arg(long)]
        force: bool,
    },

    /// Display the resolved configuration with secrets masked
    Show,

    /// Print the config file path
    Path,

    /// Store a secret in the system keyring
    SetSecret {
        /// Which secret to store
        secret: SecretKind,

        /// Read the value from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretKind {
    /// SOLIDserver API password
    SolidserverPassword,
    /// Nautobot API token
    NautobotToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
