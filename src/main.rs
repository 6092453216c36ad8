//! # Service Reconciler
//!
//! Hook entrypoint that keeps a systemd-managed service in line with its
//! configuration.
//!
//! ## Overview
//!
//! On every hook invocation the binary:
//!
//! 1. **Collects active flags** - persisted flags plus those derived from the event inputs
//! 2. **Dispatches** - runs the handlers whose flag predicates hold
//! 3. **Builds the desired config** - charm config, database URIs and staging overrides
//! 4. **Reconciles** - renders the unit and settings file, writes what changed,
//!    restarts the service when anything did
//!
//! ## Usage
//!
//! ```bash
//! # React to a config change once the database relation is up
//! service-reconciler hook config-changed \
//!     --flag ols.configured \
//!     --charm-config /var/lib/charm/config.yaml \
//!     --database /var/lib/charm/db.yaml \
//!     --env-file /srv/serial-vault/service.env
//!
//! # Print both artifacts without touching disk
//! service-reconciler render --charm-config config.yaml --db-primary postgresql://...
//!
//! # Show persisted flags
//! service-reconciler flags
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use service_reconciler::config::{
    load_charm_config, CharmConfig, DatabaseInfo, DesiredConfig, HookConfig, ServiceEnvironment,
};
use service_reconciler::constants::{FLAG_BASE_CONFIGURED, FLAG_DB_MASTER_AVAILABLE};
use service_reconciler::dispatch::{ActiveFlags, Dispatcher};
use service_reconciler::observability::{init_tracing, metrics};
use service_reconciler::reconciler::{Reconciler, Trigger};
use service_reconciler::service::SystemctlManager;
use service_reconciler::state::{FileFlagStore, FlagStore, MemoryFlagStore};
use service_reconciler::status::{discover_status_reporter, LogStatusReporter, StatusReporter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Idempotent service reconciler hook
#[derive(Parser)]
#[command(name = "service-reconciler", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a framework event
    Hook {
        /// Event name (e.g. config-changed, db-relation-changed, update-status)
        event: String,

        /// Extra flags active for this invocation (repeatable)
        #[arg(long = "flag", value_name = "NAME")]
        flags: Vec<String>,

        #[command(flatten)]
        inputs: Inputs,
    },
    /// Print the rendered unit and settings file without writing them
    Render {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// List persisted flags
    Flags,
}

/// Settings that override the environment
#[derive(Args)]
struct Overrides {
    /// Managed service (and unit) name [env: SERVICE_NAME]
    #[arg(long, global = true)]
    service_name: Option<String>,

    /// Root of the service trees [env: SERVICE_BASE_DIR]
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Directory for the systemd unit [env: SYSTEMD_UNIT_DIR]
    #[arg(long, global = true)]
    unit_dir: Option<PathBuf>,

    /// Persisted flag store [env: STATE_FILE]
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// systemctl binary [env: SYSTEMCTL_PATH]
    #[arg(long, global = true)]
    systemctl: Option<PathBuf>,

    /// Prometheus textfile to write after the run [env: METRICS_TEXTFILE]
    #[arg(long, global = true)]
    metrics_textfile: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut HookConfig) {
        if let Some(name) = self.service_name {
            config.service_name = name;
        }
        if let Some(dir) = self.base_dir {
            config.service_base_dir = dir;
        }
        if let Some(dir) = self.unit_dir {
            config.systemd_unit_dir = dir;
        }
        if let Some(path) = self.state_file {
            config.state_file = path;
        }
        if self.systemctl.is_some() {
            config.systemctl_path = self.systemctl;
        }
        if self.metrics_textfile.is_some() {
            config.metrics_textfile = self.metrics_textfile;
        }
    }
}

/// Where the desired state comes from
#[derive(Args)]
struct Inputs {
    /// Charm config YAML mapping
    #[arg(long)]
    charm_config: Option<PathBuf>,

    /// Database relation document ({primary, standbys})
    #[arg(long, conflicts_with_all = ["db_primary", "db_standby"])]
    database: Option<PathBuf>,

    /// Primary database URI
    #[arg(long)]
    db_primary: Option<String>,

    /// Standby database URI (repeatable)
    #[arg(long, requires = "db_primary")]
    db_standby: Vec<String>,

    /// dotenv file with the service environment; defaults to the hook's own SERVICE_ENVIRONMENT
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl Inputs {
    fn charm_config(&self) -> Result<CharmConfig> {
        match &self.charm_config {
            Some(path) => Ok(load_charm_config(path)?),
            None => Ok(CharmConfig::new()),
        }
    }

    /// Whether database info was passed at all, without reading it
    fn has_database(&self) -> bool {
        self.database.is_some() || self.db_primary.is_some()
    }

    /// `None` while the database relation is not available
    fn database(&self) -> Result<Option<DatabaseInfo>> {
        if let Some(path) = &self.database {
            return Ok(Some(DatabaseInfo::from_file(path)?));
        }
        match &self.db_primary {
            Some(primary) => Ok(Some(DatabaseInfo::new(
                primary.clone(),
                self.db_standby.clone(),
            )?)),
            None => Ok(None),
        }
    }

    fn environment(&self) -> Result<ServiceEnvironment> {
        match &self.env_file {
            Some(path) => Ok(ServiceEnvironment::from_env_file(path)?),
            None => Ok(ServiceEnvironment::from_process()),
        }
    }

    fn desired(
        &self,
        database: Option<&DatabaseInfo>,
        environment: &ServiceEnvironment,
    ) -> Result<DesiredConfig> {
        let charm_config = self.charm_config()?;
        Ok(match database {
            Some(database) => DesiredConfig::build(&charm_config, database, environment),
            // never rendered: the reconciler skips until the database is available
            None => DesiredConfig::new(),
        })
    }
}

/// Handlers registered in the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookHandler {
    Configure,
}

fn dispatcher() -> Dispatcher<HookHandler> {
    Dispatcher::new().when(
        &[FLAG_BASE_CONFIGURED, FLAG_DB_MASTER_AVAILABLE],
        HookHandler::Configure,
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HookConfig::from_env();
    cli.overrides.apply(&mut config);

    init_tracing(&config)?;
    metrics::register_metrics()?;

    let result = match cli.command {
        Commands::Hook {
            event,
            flags,
            inputs,
        } => run_hook(&config, &event, &flags, &inputs).await,
        Commands::Render { inputs } => render(&config, &inputs),
        Commands::Flags => list_flags(&config).await,
    };

    if let Some(path) = &config.metrics_textfile {
        if let Err(e) = metrics::write_textfile(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    result
}

/// Everything a reconcile call needs, resolved from the CLI inputs
struct HookRun {
    trigger: Trigger,
    environment: ServiceEnvironment,
    desired: DesiredConfig,
}

/// Load the inputs for `event`
///
/// The status poll never reads the input files, so a broken database document
/// or env file cannot turn a poll into a failure.
fn resolve_hook_run(config: &HookConfig, event: &str, inputs: &Inputs) -> Result<HookRun> {
    if event == config.status_poll_event {
        return Ok(HookRun {
            trigger: Trigger::new(event, inputs.has_database()),
            environment: ServiceEnvironment::new(),
            desired: DesiredConfig::new(),
        });
    }

    let database = inputs.database().context("Failed to load database info")?;
    let environment = inputs
        .environment()
        .context("Failed to load service environment")?;
    let desired = inputs
        .desired(database.as_ref(), &environment)
        .context("Failed to build desired configuration")?;
    Ok(HookRun {
        trigger: Trigger::new(event, database.is_some()),
        environment,
        desired,
    })
}

async fn run_hook(
    config: &HookConfig,
    event: &str,
    extra_flags: &[String],
    inputs: &Inputs,
) -> Result<()> {
    let flags: Arc<dyn FlagStore> = Arc::new(FileFlagStore::new(&config.state_file));
    let run = resolve_hook_run(config, event, inputs)?;

    let mut active: ActiveFlags = flags
        .active()
        .await
        .context("Failed to read persisted flags")?
        .into_iter()
        .collect();
    active.extend(extra_flags.iter().cloned());
    if run.trigger.database_available {
        active.insert(FLAG_DB_MASTER_AVAILABLE.to_string());
    }

    let dispatcher = dispatcher();
    let handlers: Vec<HookHandler> = dispatcher.ready(&active).copied().collect();
    if handlers.is_empty() {
        info!(event, ?active, "No handler ready for event");
        return Ok(());
    }

    for handler in handlers {
        match handler {
            HookHandler::Configure => configure(config, &run, Arc::clone(&flags)).await?,
        }
    }
    Ok(())
}

async fn configure(config: &HookConfig, run: &HookRun, flags: Arc<dyn FlagStore>) -> Result<()> {
    let service_manager = SystemctlManager::discover(config.systemctl_path.as_deref())?;
    let status: Arc<dyn StatusReporter> = Arc::from(discover_status_reporter());

    let reconciler = Reconciler::new(config.layout(), Arc::new(service_manager), status, flags)
        .with_service_user(&config.service_user)
        .with_environment(run.environment.clone())
        .with_status_poll_event(&config.status_poll_event);

    let outcome = reconciler
        .reconcile(&run.trigger, &run.desired)
        .await
        .with_context(|| format!("Failed to reconcile {}", config.service_name))?;
    info!(
        event = %run.trigger.event,
        outcome = outcome.as_str(),
        "Hook finished"
    );
    Ok(())
}

fn render(config: &HookConfig, inputs: &Inputs) -> Result<()> {
    let database = inputs.database().context("Failed to load database info")?;
    let database = database.context("render needs --database or --db-primary")?;
    let environment = inputs
        .environment()
        .context("Failed to load service environment")?;
    let desired = inputs.desired(Some(&database), &environment)?;

    // Collaborators are never invoked while rendering
    let reconciler = Reconciler::new(
        config.layout(),
        Arc::new(SystemctlManager::new("systemctl")),
        Arc::new(LogStatusReporter),
        Arc::new(MemoryFlagStore::new()),
    )
    .with_service_user(&config.service_user)
    .with_environment(environment);

    let (descriptor, settings) = reconciler.render(&desired)?;
    for artifact in [descriptor, settings] {
        println!("==> {} <==", artifact.path.display());
        print!("{}", artifact.content);
        println!();
    }
    Ok(())
}

async fn list_flags(config: &HookConfig) -> Result<()> {
    let store = FileFlagStore::new(&config.state_file);
    for flag in store.active().await? {
        println!("{flag}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(args: &[&str]) -> Inputs {
        let mut argv = vec!["service-reconciler", "hook", "update-status"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Hook { inputs, .. } => inputs,
            _ => unreachable!("parsed a hook command"),
        }
    }

    #[test]
    fn test_status_poll_ignores_unreadable_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("db.yaml");
        let inputs = inputs(&["--database", missing.to_str().unwrap()]);
        let config = HookConfig::default();

        let run = resolve_hook_run(&config, "update-status", &inputs).unwrap();
        assert!(run.trigger.database_available);
        assert!(run.desired.is_empty());

        assert!(resolve_hook_run(&config, "config-changed", &inputs).is_err());
    }

    #[test]
    fn test_hook_run_builds_desired_config() {
        let inputs = inputs(&["--db-primary", "postgresql://vault:pw@db-0/vault"]);
        let run = resolve_hook_run(&HookConfig::default(), "config-changed", &inputs).unwrap();

        assert!(run.trigger.database_available);
        assert!(run.desired.contains_key("maindb"));
    }

    #[test]
    fn test_configure_requires_both_flags() {
        let active: ActiveFlags = [FLAG_BASE_CONFIGURED.to_string()].into_iter().collect();
        assert_eq!(dispatcher().ready(&active).count(), 0);

        let active: ActiveFlags = [FLAG_BASE_CONFIGURED, FLAG_DB_MASTER_AVAILABLE]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            dispatcher().ready(&active).copied().collect::<Vec<_>>(),
            vec![HookHandler::Configure]
        );
    }
}
