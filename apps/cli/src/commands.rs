//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use fieldsync_core::{
    FieldPayload, ProgressReporter, SyncOptions, SyncReport, SyncStage, run_sync,
};
use fieldsync_shared::{
    AppConfig, ConfigOverrides, FieldKind, SyncConfig, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// fieldsync: keep ticket field dropdowns in step with time-tracking data.
#[derive(Parser)]
#[command(
    name = "fieldsync",
    version,
    about = "Sync time-tracking clients and projects into ticket field options.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.fieldsync/fieldsync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch clients and projects and overwrite both ticket fields.
    Sync {
        /// Build the option lists and print them without writing anything.
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        endpoints: EndpointArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Connection settings that override the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct EndpointArgs {
    /// Time-tracking account domain or base URL.
    #[arg(long, env = "HARVEST_DOMAIN")]
    pub harvest_domain: Option<String>,

    /// Time-tracking user name.
    #[arg(long, env = "HARVEST_USER")]
    pub harvest_user: Option<String>,

    /// Ticketing account domain or base URL.
    #[arg(long, env = "ZENDESK_DOMAIN")]
    pub zendesk_domain: Option<String>,

    /// Ticketing user name.
    #[arg(long, env = "ZENDESK_USER")]
    pub zendesk_user: Option<String>,
}

impl From<EndpointArgs> for ConfigOverrides {
    fn from(args: EndpointArgs) -> Self {
        Self {
            harvest_domain: args.harvest_domain,
            harvest_user: args.harvest_user,
            zendesk_domain: args.zendesk_domain,
            zendesk_user: args.zendesk_user,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Crate targets that log under the CLI's verbosity flag.
const LOG_TARGETS: &[&str] = &[
    "fieldsync",
    "fieldsync_core",
    "fieldsync_harvest",
    "fieldsync_shared",
    "fieldsync_zendesk",
];

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout is reserved for the summary and dry-run payloads.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Sync { dry_run, endpoints } => {
            cmd_sync(config_path.as_deref(), dry_run, endpoints.into()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

async fn cmd_sync(
    config_path: Option<&Path>,
    dry_run: bool,
    overrides: ConfigOverrides,
) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let sync_config = SyncConfig::resolve(&app_config, &overrides)?;

    info!(
        harvest = %sync_config.harvest.base_url,
        zendesk = %sync_config.zendesk.base_url,
        client_field_id = sync_config.client_field_id,
        project_field_id = sync_config.project_field_id,
        dry_run,
        "starting sync"
    );

    let reporter = CliProgress::new();
    let report = run_sync(sync_config, &SyncOptions { dry_run }, &reporter).await?;

    print_report(&report);

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&report.client_field.options)?);
        println!("{}", serde_json::to_string_pretty(&report.project_field.options)?);
    }

    info!("DONE");
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!();
    if report.dry_run {
        println!("  Dry run, nothing was written.");
    } else {
        println!("  Ticket fields synced!");
    }
    println!("  Run:      {}", report.run_id);
    println!("  Started:  {}", report.started_at.to_rfc3339());
    println!("  Projects: {}", report.projects);
    println!("  Clients:  {}", report.clients);
    print_field(&report.client_field);
    print_field(&report.project_field);
    for issue in &report.unresolved {
        println!("  Skipped:  {issue}");
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_field(payload: &FieldPayload) {
    println!(
        "  {:<9} field {}: {} options (was {}){}",
        format!("{}:", label(payload.kind)),
        payload.field_id,
        payload.options.len(),
        payload.previous_options,
        if payload.unchanged { ", unchanged" } else { "" }
    );
}

fn label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Client => "Client",
        FieldKind::Project => "Project",
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: SyncStage) {
        match stage {
            SyncStage::Done | SyncStage::Failed => self.spinner.finish_and_clear(),
            SyncStage::Idle => {}
            other => self.spinner.set_message(format!("{}…", capitalize(other.as_str()))),
        }
    }

    fn field_written(&self, kind: FieldKind, ok: bool) {
        let status = if ok { "written" } else { "FAILED" };
        self.spinner
            .set_message(format!("{} field {status}", label(kind)));
    }

    fn done(&self, _report: &SyncReport) {
        self.spinner.finish_and_clear();
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    println!("{}", toml::to_string_pretty(&config)?);

    if config.harvest.domain.is_empty() || config.zendesk.domain.is_empty() {
        warn!("no domains in config file; `sync` needs HARVEST_DOMAIN and ZENDESK_DOMAIN");
    }
    Ok(())
}
