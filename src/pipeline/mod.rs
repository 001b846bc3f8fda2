//! Association Pipeline
//!
//! ```text
//! STEP 1: Invalidation   (drop present links superseded by stage data)
//! STEP 2: Selection      (full: everything; incremental: new or affected)
//! STEP 3: Batches        (candidates -> scoring -> aggregation -> atomic commit)
//! STEP 4: Backfill       (summaries for linked quakes that lack one)
//! ```
//!
//! Batches run one after another. Each batch commits as a single unit, so an
//! interrupted run leaves exactly the completed batches applied.

mod backfill;
mod coordinator;
mod incremental;

pub use backfill::backfill_missing_summaries;
pub use coordinator::{AssociationPipeline, RunReport, RunTargets};
pub use incremental::{invalidate_superseded, select_events};

use crate::ingest::IngestError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}
