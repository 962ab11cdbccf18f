//! `eipsync sync`: one run from SOLIDserver into Nautobot.

use eipsync_config::{active_profile_name, find_profile, nautobot_config, solidserver_config};
use eipsync_core::{JobParams, NautobotInventory, SyncJob};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load_config(global)?;
    let profile_name = active_profile_name(global.profile.as_deref(), &cfg);

    let mut params = JobParams {
        domains: args.domains,
        cidr: args.cidr,
        addresses: !args.no_addresses,
        prefixes: !args.no_prefixes,
        timeout_secs: cfg.defaults.timeout,
        debug: args.debug,
        dry_run: args.dry_run,
        delete_unmatched: args.delete_unmatched,
    };

    // Parameter errors surface before credentials are resolved or either
    // system is contacted.
    params
        .scope()?
        .check_host_budget(cfg.defaults.max_host_queries)?;

    let mut profile = find_profile(&cfg, &profile_name)?.clone();
    if global.insecure {
        profile.insecure = Some(true);
    }
    params.timeout_secs = args
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    params.delete_unmatched |= profile.delete_unmatched.unwrap_or(false);

    let source = solidserver_config(&profile, &profile_name, &cfg.defaults)?;
    let target = nautobot_config(&profile, &profile_name, &cfg.defaults)?;
    let store = NautobotInventory::new(&target)?;

    tracing::debug!(profile = %profile_name, ?params, "starting sync");
    let job = SyncJob::new(source)
        .with_concurrency(args.concurrency.unwrap_or(cfg.defaults.concurrency))
        .with_max_host_queries(cfg.defaults.max_host_queries);
    let report = job.run(&params, &store).await?;

    let rendered = output::render_report(global.output, &report)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
