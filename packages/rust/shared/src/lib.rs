//! Shared types, error model, configuration, and HTTP plumbing for fieldsync.
//!
//! This crate is the foundation depended on by all other fieldsync crates.
//! It provides:
//! - [`FieldSyncError`]: the unified error type
//! - Domain types ([`Project`], [`Client`], [`FieldOption`], [`TargetField`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)
//! - [`ApiClient`]: Basic-auth JSON client used for both remote APIs

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConfigOverrides, Credentials, HarvestConfig, ServiceEndpoint, SyncConfig,
    SyncSettings, ZendeskConfig, base_url_from_domain, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{FieldSyncError, Result};
pub use http::ApiClient;
pub use types::{Client, FieldKind, FieldOption, Project, TargetField};
