//! Source fetcher for the time-tracking service.
//!
//! Pulls every project in one request, then dereferences the distinct
//! `client_id`s with one request per client, at most
//! [`SyncConfig::client_concurrency`] in flight at a time.

mod wire;

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use fieldsync_shared::{ApiClient, Client, FieldSyncError, Project, Result, SyncConfig};

use crate::wire::{ClientEnvelope, ProjectEnvelope, unwrap_projects};

/// `updated_since` filter sent with the project listing. Old enough to
/// include every project the account has ever had.
pub const UPDATED_SINCE_EPOCH: &str = "2013-01-01 00:00";

// ---------------------------------------------------------------------------
// SourceData
// ---------------------------------------------------------------------------

/// Everything fetched from the source API in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceData {
    /// Projects in the order the API listed them.
    pub projects: Vec<Project>,
    /// One client per distinct `client_id`, ordered by id.
    pub clients: Vec<Client>,
}

// ---------------------------------------------------------------------------
// HarvestClient
// ---------------------------------------------------------------------------

/// Read-only client for the time-tracking API.
pub struct HarvestClient {
    api: ApiClient,
    concurrency: usize,
}

impl HarvestClient {
    /// Create a client from the run's configuration.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.harvest, config.timeout)?,
            concurrency: config.client_concurrency.max(1),
        })
    }

    /// Fetch all projects, then all clients they reference.
    ///
    /// Any failed request aborts the whole fetch; nothing partial is returned.
    #[instrument(skip_all)]
    pub async fn fetch_projects_and_clients(&self) -> Result<SourceData> {
        let projects = self.fetch_projects().await?;
        let ids = distinct_client_ids(&projects);
        let clients = self.fetch_clients(&ids).await?;

        info!(
            projects = projects.len(),
            clients = clients.len(),
            "source data fetched"
        );

        Ok(SourceData { projects, clients })
    }

    /// `GET /projects?updated_since=...`
    #[instrument(skip_all)]
    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        info!("fetching projects");
        let envelopes: Vec<ProjectEnvelope> = self
            .api
            .get_json("/projects", &[("updated_since", UPDATED_SINCE_EPOCH)])
            .await?;
        Ok(unwrap_projects(envelopes))
    }

    /// Fetch the given clients with bounded concurrency.
    ///
    /// The result follows the order of `ids`, whatever order the responses
    /// arrive in. On the first failure the remaining requests are aborted.
    #[instrument(skip_all, fields(clients = ids.len(), concurrency = self.concurrency))]
    pub async fn fetch_clients(&self, ids: &[u64]) -> Result<Vec<Client>> {
        info!("fetching clients");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, &id) in ids.iter().enumerate() {
            let api = self.api.clone();
            let sem = semaphore.clone();

            tasks.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| FieldSyncError::Task(format!("client fetch pool closed: {e}")))?;
                fetch_client(&api, id).await.map(|client| (index, client))
            });
        }

        let mut slots: Vec<Option<Client>> = vec![None; ids.len()];

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| FieldSyncError::Task(e.to_string()))?;
            match outcome {
                Ok((index, client)) => slots[index] = Some(client),
                Err(e) => {
                    warn!(error = %e, "client fetch failed, aborting remaining requests");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

async fn fetch_client(api: &ApiClient, id: u64) -> Result<Client> {
    debug!(client_id = id, "fetching client");
    let envelope: ClientEnvelope = api.get_json(&format!("/clients/{id}"), &[]).await?;
    Ok(envelope.client)
}

/// Distinct client ids referenced by `projects`, ascending.
pub fn distinct_client_ids(projects: &[Project]) -> Vec<u64> {
    projects
        .iter()
        .map(|p| p.client_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
