// Command handlers

use anyhow::Result;
use tracing::{debug, warn};

use crate::cli::{Args, Command};
use dsnap_config::{ConfigFile, ConfigLoader, SnapConfig};
use dsnap_provider::{get_provider, CloudProvider, ProviderContext};

pub mod prune;
pub mod resolve;
pub mod run;

/// Main command dispatcher
pub fn execute_command(args: Args) -> Result<()> {
    let raw = ConfigLoader::new()
        .load(args.config.as_deref())?
        .merge(args.overrides());

    let (provider, config) = prepare(raw, &args)?;
    debug!(
        "Using provider {} for project {}",
        provider.name(),
        config.project
    );

    match args.command {
        Command::Run => run::handle_run(provider.as_ref(), &config),
        Command::Prune => prune::handle_prune(provider.as_ref(), &config),
        Command::Resolve => resolve::handle_resolve(provider.as_ref(), &config),
    }
}

/// Validate the configuration and build the provider.
///
/// Validation runs first whenever a project is already known, so a bad
/// configuration is reported without touching the cloud tooling.
fn prepare(mut raw: ConfigFile, args: &Args) -> Result<(Box<dyn CloudProvider>, SnapConfig)> {
    let require_inventory = args.command.needs_inventory();
    let context =
        ProviderContext::with_verbose(args.debug).with_timeout(raw.command_timeout_secs);
    let provider_name = raw
        .provider
        .clone()
        .unwrap_or_else(|| dsnap_config::config::DEFAULT_PROVIDER.to_string());

    if raw.project.as_deref().is_some_and(|p| !p.trim().is_empty()) {
        let config = SnapConfig::resolve(raw, require_inventory)?;
        let provider = get_provider(&config.provider, context)?;
        return Ok((provider, config));
    }

    let provider = get_provider(&provider_name, context)?;
    match provider.active_project() {
        Ok(Some(project)) => {
            debug!("Using active {} project {}", provider.name(), project);
            raw.project = Some(project);
        }
        Ok(None) => {}
        Err(e) => warn!("Could not read the active project: {}", e),
    }
    let config = SnapConfig::resolve(raw, require_inventory)?;
    Ok((provider, config))
}
