//! Backfill: summaries for quakes that have links but no summary row

use tracing::info;

use crate::aggregate::aggregate;
use crate::storage::{AssociationStore, StorageError};

/// Recompute and insert every missing summary, `batch_size` quakes at a time.
///
/// Idempotent: a second call finds nothing missing and inserts nothing.
pub fn backfill_missing_summaries(store: &AssociationStore, batch_size: usize) -> Result<usize, StorageError> {
    let missing = store.quakes_missing_summary()?;
    if missing.is_empty() {
        info!("No summaries missing");
        return Ok(0);
    }
    info!(quakes = missing.len(), "Backfilling missing summaries");

    let mut inserted = 0;
    for chunk in missing.chunks(batch_size.max(1)) {
        let mut links = store.links_for(chunk)?;
        let summaries = aggregate(&mut links);
        inserted += store.insert_missing_summaries(&summaries)?;
    }

    info!(inserted, "Backfill complete");
    Ok(inserted)
}
