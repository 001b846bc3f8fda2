//! Incremental controller: which quakes need (re)processing

use std::collections::BTreeSet;

use tracing::info;

use crate::storage::{AssociationStore, Invalidation, StorageError};
use crate::types::{Event, ProcessingMode, QuakeId};

/// Remove present links of wells that now have stage data.
///
/// Returns the affected quakes; their summaries are already gone and they
/// must be reprocessed. A store without a link table has nothing to invalidate.
pub fn invalidate_superseded(
    store: &AssociationStore,
    stage_wells: &BTreeSet<String>,
) -> Result<Invalidation, StorageError> {
    let inv = store.invalidate_present(stage_wells)?;
    if inv.links_removed > 0 {
        info!(
            links = inv.links_removed,
            quakes = inv.affected.len(),
            "Invalidated present links superseded by stage data"
        );
    }
    Ok(inv)
}

/// Events a run must process.
///
/// - Full: every event.
/// - Incremental, no link table yet: every event.
/// - Incremental otherwise: affected events, plus events never processed.
pub fn select_events(
    events: Vec<Event>,
    mode: ProcessingMode,
    store: &AssociationStore,
    affected: &BTreeSet<QuakeId>,
) -> Result<Vec<Event>, StorageError> {
    if mode == ProcessingMode::Full {
        return Ok(events);
    }
    if !store.has_links_table() {
        info!("No link table yet, processing every event");
        return Ok(events);
    }

    let processed = store.processed_quakes()?;
    let total = events.len();
    let selected: Vec<Event> = events
        .into_iter()
        .filter(|e| affected.contains(&e.quake_id) || !processed.contains(&e.quake_id))
        .collect();
    info!(
        selected = selected.len(),
        skipped = total - selected.len(),
        affected = affected.len(),
        "Incremental selection"
    );
    Ok(selected)
}
