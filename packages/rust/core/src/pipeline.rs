//! End-to-end sync: source → field read → build options → field write.
//!
//! Stages run strictly in sequence. Inside a stage, requests run
//! concurrently: client lookups through a bounded pool, the two field reads
//! as a fail-fast pair, and the two field writes independently of each other.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument};
use uuid::Uuid;

use fieldsync_harvest::{HarvestClient, SourceData};
use fieldsync_shared::{FieldKind, FieldOption, FieldSyncError, SyncConfig, TargetField};
use fieldsync_zendesk::{ZendeskClient, encode_field_update};

use crate::options::{UnresolvedClient, build_client_options, build_project_options};

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Where a sync run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    FetchingSource,
    FetchingFields,
    Building,
    Writing,
    Done,
    Failed,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingSource => "fetching source",
            Self::FetchingFields => "fetching fields",
            Self::Building => "building options",
            Self::Writing => "writing fields",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Result of writing one field.
#[derive(Debug)]
pub struct WriteOutcome {
    pub kind: FieldKind,
    pub field_id: u64,
    pub result: std::result::Result<(), FieldSyncError>,
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Why a sync run failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A structural failure that stopped the run at `stage`.
    #[error("sync failed while {stage}: {source}")]
    Stage {
        stage: SyncStage,
        #[source]
        source: FieldSyncError,
    },

    /// At least one field write failed. Every field's outcome is listed.
    #[error("field write failed: {}", describe_outcomes(.outcomes))]
    Write { outcomes: Vec<WriteOutcome> },
}

impl PipelineError {
    /// The stage the run was in when it failed.
    pub fn stage(&self) -> SyncStage {
        match self {
            Self::Stage { stage, .. } => *stage,
            Self::Write { .. } => SyncStage::Writing,
        }
    }

    /// Fields that were written successfully before the run was declared failed.
    pub fn written_fields(&self) -> Vec<FieldKind> {
        match self {
            Self::Stage { .. } => Vec::new(),
            Self::Write { outcomes } => outcomes
                .iter()
                .filter(|o| o.is_ok())
                .map(|o| o.kind)
                .collect(),
        }
    }
}

fn describe_outcomes(outcomes: &[WriteOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(()) => format!("{} field {} written", o.kind, o.field_id),
            Err(e) => format!("{} field {} failed ({e})", o.kind, o.field_id),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Options, report, progress
// ---------------------------------------------------------------------------

/// Per-run switches.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Fetch and build, but skip the field writes.
    pub dry_run: bool,
}

/// What was (or, in a dry run, would have been) written to one field.
#[derive(Debug, Clone)]
pub struct FieldPayload {
    pub kind: FieldKind,
    pub field_id: u64,
    /// Number of options the field held before this run.
    pub previous_options: usize,
    /// Whether the field already held exactly these options.
    pub unchanged: bool,
    pub options: Vec<FieldOption>,
    /// Hex SHA-256 of the request body.
    pub digest: String,
}

/// Summary of a completed sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub dry_run: bool,
    pub projects: usize,
    pub clients: usize,
    pub client_field: FieldPayload,
    pub project_field: FieldPayload,
    /// Projects left out because their client was not found.
    pub unresolved: Vec<UnresolvedClient>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called on every stage transition, including `Done` and `Failed`.
    fn stage(&self, stage: SyncStage);
    /// Called once per field after its write attempt.
    fn field_written(&self, kind: FieldKind, ok: bool);
    /// Called when the run completes successfully.
    fn done(&self, report: &SyncReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: SyncStage) {}
    fn field_written(&self, _kind: FieldKind, _ok: bool) {}
    fn done(&self, _report: &SyncReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One configured sync. The config (and the credentials in it) live exactly
/// as long as the pipeline.
pub struct SyncPipeline {
    config: SyncConfig,
    harvest: HarvestClient,
    zendesk: ZendeskClient,
}

/// Build a pipeline from `config` and run it once.
pub async fn run_sync(
    config: SyncConfig,
    opts: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<SyncReport, PipelineError> {
    let pipeline = SyncPipeline::new(config).map_err(|source| {
        progress.stage(SyncStage::Failed);
        PipelineError::Stage {
            stage: SyncStage::Idle,
            source,
        }
    })?;
    pipeline.run(opts, progress).await
}

impl SyncPipeline {
    /// Build the API clients for one run.
    pub fn new(config: SyncConfig) -> fieldsync_shared::Result<Self> {
        let harvest = HarvestClient::new(&config)?;
        let zendesk = ZendeskClient::new(&config)?;
        Ok(Self {
            config,
            harvest,
            zendesk,
        })
    }

    /// Run fetch → read → build → write once.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty, dry_run = opts.dry_run))]
    pub async fn run(
        &self,
        opts: &SyncOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<SyncReport, PipelineError> {
        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        progress.stage(SyncStage::Idle);
        match self.run_stages(run_id, opts, progress).await {
            Ok(report) => {
                progress.stage(SyncStage::Done);
                progress.done(&report);
                info!(
                    projects = report.projects,
                    clients = report.clients,
                    client_options = report.client_field.options.len(),
                    project_options = report.project_field.options.len(),
                    unresolved = report.unresolved.len(),
                    elapsed_ms = report.elapsed.as_millis(),
                    "sync complete"
                );
                Ok(report)
            }
            Err(e) => {
                progress.stage(SyncStage::Failed);
                let transport =
                    matches!(&e, PipelineError::Stage { source, .. } if source.is_transport());
                error!(stage = %e.stage(), transport, error = %e, "sync failed");
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        opts: &SyncOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<SyncReport, PipelineError> {
        let started_at = Utc::now();
        let start = Instant::now();

        info!(%run_id, "starting sync");

        // --- Stage 1: Source ---
        progress.stage(SyncStage::FetchingSource);
        let source: SourceData = self
            .harvest
            .fetch_projects_and_clients()
            .await
            .map_err(at(SyncStage::FetchingSource))?;

        // --- Stage 2: Current field definitions ---
        // Both reads must succeed before anything is built or written.
        progress.stage(SyncStage::FetchingFields);
        let (client_field, project_field) = tokio::try_join!(
            self.zendesk.fetch_field(self.config.client_field_id),
            self.zendesk.fetch_field(self.config.project_field_id),
        )
        .map_err(at(SyncStage::FetchingFields))?;

        // --- Stage 3: Build ---
        progress.stage(SyncStage::Building);
        let client_options = build_client_options(&source.clients);
        let project_options = build_project_options(&source.projects, &source.clients);

        let client_payload = payload(
            FieldKind::Client,
            self.config.client_field_id,
            &client_field,
            client_options,
        )
        .map_err(at(SyncStage::Building))?;
        let project_payload = payload(
            FieldKind::Project,
            self.config.project_field_id,
            &project_field,
            project_options.options,
        )
        .map_err(at(SyncStage::Building))?;

        // --- Stage 4: Write ---
        if opts.dry_run {
            info!("dry run, skipping field writes");
        } else {
            progress.stage(SyncStage::Writing);
            self.write_both(&client_payload, &project_payload, progress)
                .await?;
        }

        Ok(SyncReport {
            run_id,
            started_at,
            elapsed: start.elapsed(),
            dry_run: opts.dry_run,
            projects: source.projects.len(),
            clients: source.clients.len(),
            client_field: client_payload.payload,
            project_field: project_payload.payload,
            unresolved: project_options.unresolved,
        })
    }

    /// Write both fields concurrently. A failure on one side never cancels
    /// the other; both outcomes are reported.
    async fn write_both(
        &self,
        client: &EncodedPayload,
        project: &EncodedPayload,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let (client_result, project_result) = tokio::join!(
            self.zendesk
                .write_field_body(client.payload.field_id, client.body.clone()),
            self.zendesk
                .write_field_body(project.payload.field_id, project.body.clone()),
        );

        let outcomes = vec![
            WriteOutcome {
                kind: FieldKind::Client,
                field_id: client.payload.field_id,
                result: client_result,
            },
            WriteOutcome {
                kind: FieldKind::Project,
                field_id: project.payload.field_id,
                result: project_result,
            },
        ];

        for outcome in &outcomes {
            progress.field_written(outcome.kind, outcome.is_ok());
            match &outcome.result {
                Ok(()) => info!(
                    field = %outcome.kind,
                    field_id = outcome.field_id,
                    "field written"
                ),
                Err(e) => error!(
                    field = %outcome.kind,
                    field_id = outcome.field_id,
                    error = %e,
                    "field write failed"
                ),
            }
        }

        if outcomes.iter().all(WriteOutcome::is_ok) {
            Ok(())
        } else {
            Err(PipelineError::Write { outcomes })
        }
    }
}

/// A payload together with the exact bytes that will be PUT.
struct EncodedPayload {
    payload: FieldPayload,
    body: Vec<u8>,
}

fn payload(
    kind: FieldKind,
    field_id: u64,
    current: &TargetField,
    options: Vec<FieldOption>,
) -> fieldsync_shared::Result<EncodedPayload> {
    let body = encode_field_update(&options)?;
    let digest = compute_digest(&body);
    let unchanged = current.custom_field_options == options;

    info!(
        field = %kind,
        field_id,
        previous = current.custom_field_options.len(),
        incoming = options.len(),
        unchanged,
        %digest,
        "prepared field options"
    );

    Ok(EncodedPayload {
        payload: FieldPayload {
            kind,
            field_id,
            previous_options: current.custom_field_options.len(),
            unchanged,
            options,
            digest,
        },
        body,
    })
}

/// Compute the hex SHA-256 of a request body.
fn compute_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

fn at(stage: SyncStage) -> impl Fn(FieldSyncError) -> PipelineError {
    move |source| PipelineError::Stage { stage, source }
}
