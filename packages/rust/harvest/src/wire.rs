//! Response envelopes of the time-tracking API.
//!
//! Every record comes wrapped in an object keyed by its type:
//! `[{"project": {...}}, ...]` and `{"client": {...}}`.

use serde::Deserialize;

use fieldsync_shared::{Client, Project};

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectEnvelope {
    pub project: Project,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientEnvelope {
    pub client: Client,
}

pub(crate) fn unwrap_projects(envelopes: Vec<ProjectEnvelope>) -> Vec<Project> {
    envelopes.into_iter().map(|e| e.project).collect()
}
