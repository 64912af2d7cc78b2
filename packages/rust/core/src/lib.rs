//! Reconciliation pipeline for fieldsync.
//!
//! This crate ties the source fetcher and the ticket field client together:
//! [`options`] turns clients and projects into dropdown options, and
//! [`pipeline`] runs fetch → read → build → write as one batch.

pub mod options;
pub mod pipeline;

pub use options::{
    ProjectOptions, UnresolvedClient, build_client_options, build_project_options, slug,
};
pub use pipeline::{
    FieldPayload, PipelineError, ProgressReporter, SilentProgress, SyncOptions, SyncPipeline,
    SyncReport, SyncStage, WriteOutcome, run_sync,
};
