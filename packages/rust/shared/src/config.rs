//! Application configuration for fieldsync.
//!
//! User config lives at `~/.fieldsync/fieldsync.toml`.
//! Environment variables and CLI flags override config file values, which
//! override defaults. Secrets never live in the file: it only names the
//! environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FieldSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fieldsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fieldsync";

// ---------------------------------------------------------------------------
// Config structs (matching fieldsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Time-tracking service (source) settings.
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Ticketing system (target) settings.
    #[serde(default)]
    pub zendesk: ZendeskConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub sync: SyncSettings,
}

/// `[harvest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Account domain (`acme.harvestapp.com`) or full base URL.
    #[serde(default)]
    pub domain: String,

    /// Basic-auth user name.
    #[serde(default)]
    pub user: String,

    /// Name of the env var holding the password (never store the password itself).
    #[serde(default = "default_harvest_password_env")]
    pub password_env: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            user: String::new(),
            password_env: default_harvest_password_env(),
        }
    }
}

fn default_harvest_password_env() -> String {
    "HARVEST_PASS".into()
}

/// `[zendesk]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZendeskConfig {
    /// Account domain (`acme.zendesk.com`) or full base URL.
    #[serde(default)]
    pub domain: String,

    /// Basic-auth user name (for API tokens: `agent@example.com/token`).
    #[serde(default)]
    pub user: String,

    /// Name of the env var holding the API token.
    #[serde(default = "default_zendesk_token_env")]
    pub token_env: String,

    /// Ticket field receiving one option per client.
    #[serde(default = "default_client_field_id")]
    pub client_field_id: u64,

    /// Ticket field receiving one option per project.
    #[serde(default = "default_project_field_id")]
    pub project_field_id: u64,
}

impl Default for ZendeskConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            user: String::new(),
            token_env: default_zendesk_token_env(),
            client_field_id: default_client_field_id(),
            project_field_id: default_project_field_id(),
        }
    }
}

fn default_zendesk_token_env() -> String {
    "ZENDESK_TOKEN".into()
}
fn default_client_field_id() -> u64 {
    29557247
}
fn default_project_field_id() -> u64 {
    29084117
}

/// `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Maximum concurrent client-detail requests against the source API.
    #[serde(default = "default_client_concurrency")]
    pub client_concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            client_concurrency: default_client_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_client_concurrency() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Runtime config (resolved from file + env + CLI flags)
// ---------------------------------------------------------------------------

/// Values that take precedence over the config file (CLI flags / env vars).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub harvest_domain: Option<String>,
    pub harvest_user: Option<String>,
    pub zendesk_domain: Option<String>,
    pub zendesk_user: Option<String>,
}

/// Basic-auth credentials. The secret is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A remote API: where it lives and how to authenticate.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub base_url: Url,
    pub credentials: Credentials,
}

/// Everything one sync run needs. Built once per run and passed in explicitly.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub harvest: ServiceEndpoint,
    pub zendesk: ServiceEndpoint,
    pub client_field_id: u64,
    pub project_field_id: u64,
    pub client_concurrency: usize,
    pub timeout: Duration,
}

impl SyncConfig {
    /// Resolve the runtime config, reading secrets from the process environment.
    pub fn resolve(config: &AppConfig, overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with(config, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve the runtime config with a custom secret lookup.
    pub fn resolve_with<F>(
        config: &AppConfig,
        overrides: &ConfigOverrides,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let harvest = endpoint(
            "harvest",
            overrides.harvest_domain.as_deref().unwrap_or(&config.harvest.domain),
            overrides.harvest_user.as_deref().unwrap_or(&config.harvest.user),
            &config.harvest.password_env,
            &lookup,
        )?;

        let zendesk = endpoint(
            "zendesk",
            overrides.zendesk_domain.as_deref().unwrap_or(&config.zendesk.domain),
            overrides.zendesk_user.as_deref().unwrap_or(&config.zendesk.user),
            &config.zendesk.token_env,
            &lookup,
        )?;

        if config.sync.client_concurrency == 0 {
            return Err(FieldSyncError::config(
                "sync.client_concurrency must be at least 1",
            ));
        }

        if config.zendesk.client_field_id == config.zendesk.project_field_id {
            return Err(FieldSyncError::config(format!(
                "zendesk.client_field_id and zendesk.project_field_id are both {}",
                config.zendesk.client_field_id
            )));
        }

        Ok(Self {
            harvest,
            zendesk,
            client_field_id: config.zendesk.client_field_id,
            project_field_id: config.zendesk.project_field_id,
            client_concurrency: config.sync.client_concurrency,
            timeout: Duration::from_secs(config.sync.timeout_secs),
        })
    }
}

fn endpoint<F>(
    section: &str,
    domain: &str,
    user: &str,
    secret_env: &str,
    lookup: &F,
) -> Result<ServiceEndpoint>
where
    F: Fn(&str) -> Option<String>,
{
    if domain.trim().is_empty() {
        return Err(FieldSyncError::config(format!(
            "{section}.domain is not set (config file or {}_DOMAIN)",
            section.to_uppercase()
        )));
    }
    if user.trim().is_empty() {
        return Err(FieldSyncError::config(format!(
            "{section}.user is not set (config file or {}_USER)",
            section.to_uppercase()
        )));
    }

    let secret = match lookup(secret_env) {
        Some(val) if !val.is_empty() => val,
        _ => {
            return Err(FieldSyncError::config(format!(
                "{section} secret not found. Set the {secret_env} environment variable."
            )));
        }
    };

    Ok(ServiceEndpoint {
        base_url: base_url_from_domain(domain)?,
        credentials: Credentials {
            user: user.to_string(),
            secret,
        },
    })
}

/// Turn a bare domain into an `https://` base URL. Full URLs are kept as-is.
pub fn base_url_from_domain(domain: &str) -> Result<Url> {
    let domain = domain.trim().trim_end_matches('/');
    let raw = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };

    let url = Url::parse(&raw)
        .map_err(|e| FieldSyncError::validation(format!("invalid domain '{domain}': {e}")))?;

    if url.host_str().is_none() {
        return Err(FieldSyncError::validation(format!(
            "domain has no host: {domain}"
        )));
    }

    Ok(url)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fieldsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FieldSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fieldsync/fieldsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FieldSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FieldSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FieldSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(FieldSyncError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FieldSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FieldSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
