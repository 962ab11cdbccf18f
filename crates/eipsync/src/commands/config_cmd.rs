//! Config subcommand handlers.

use std::io::{self, BufRead};

use eipsync_config::{Config, Profile, Secret, active_profile_name, save_config_to, store_secret};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretKind};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config as TOML for display, masking plaintext secrets.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = writeln!(out, "concurrency = {}", cfg.defaults.concurrency);
    let _ = writeln!(out, "max_host_queries = {}", cfg.defaults.max_host_queries);
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "solidserver_url = \"{}\"", p.solidserver_url);
        let _ = writeln!(out, "solidserver_username = \"{}\"", p.solidserver_username);
        if p.solidserver_password.is_some() {
            let _ = writeln!(out, "solidserver_password = \"****\"");
        }
        if let Some(ref env) = p.solidserver_password_env {
            let _ = writeln!(out, "solidserver_password_env = \"{env}\"");
        }
        let _ = writeln!(out, "nautobot_url = \"{}\"", p.nautobot_url);
        if p.nautobot_token.is_some() {
            let _ = writeln!(out, "nautobot_token = \"****\"");
        }
        if let Some(ref env) = p.nautobot_token_env {
            let _ = writeln!(out, "nautobot_token_env = \"{env}\"");
        }
        let _ = writeln!(out, "nautobot_namespace = \"{}\"", p.namespace());
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(delete) = p.delete_unmatched {
            let _ = writeln!(out, "delete_unmatched = {delete}");
        }
    }

    out.trim_end().to_owned()
}

/// The same config with plaintext secrets masked, for JSON / YAML output.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.solidserver_password.is_some() {
            profile.solidserver_password = Some("****".into());
        }
        if profile.nautobot_token.is_some() {
            profile.nautobot_token = Some("****".into());
        }
    }
    cfg
}

fn read_secret(stdin: bool, label: &str) -> Result<String, CliError> {
    let value = if stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    } else {
        rpassword::prompt_password(format!("{label}: "))?
    };
    if value.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(value)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = super::config_path(global);

    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            solidserver_url,
            solidserver_username,
            nautobot_url,
            namespace,
            force,
        } => {
            let mut cfg = super::load_config(global)?;
            let profile_name = active_profile_name(global.profile.as_deref(), &cfg);

            if cfg.profiles.contains_key(&profile_name) && !force {
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: format!("profile '{profile_name}' already exists (use --force)"),
                });
            }

            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    solidserver_url,
                    solidserver_username,
                    nautobot_url,
                    nautobot_namespace: namespace,
                    ..Profile::default()
                },
            );
            if cfg.default_profile.is_none() {
                cfg.default_profile = Some(profile_name.clone());
            }

            save_config_to(&path, &cfg)?;
            eprintln!("✓ Profile '{profile_name}' written to {}", path.display());
            eprintln!("  Store secrets with: eipsync config set-secret solidserver-password");
            eprintln!("                      eipsync config set-secret nautobot-token");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&super::load_config(global)?);
            let out = output::render_single(global.output, &cfg, format_config_redacted)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { secret, stdin } => {
            let cfg = super::load_config(global)?;
            let profile_name = active_profile_name(global.profile.as_deref(), &cfg);
            let secret = match secret {
                SecretKind::SolidserverPassword => Secret::SolidServerPassword,
                SecretKind::NautobotToken => Secret::NautobotToken,
            };

            let value = read_secret(stdin, &secret.to_string())?;
            store_secret(&profile_name, secret, &value)?;
            eprintln!("✓ {secret} stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
