//! Batch orchestration for one association run

use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

use super::{backfill_missing_summaries, invalidate_superseded, select_events, PipelineError};
use crate::aggregate::aggregate;
use crate::association::{ActivitySet, Associator};
use crate::config::AssocConfig;
use crate::storage::AssociationStore;
use crate::types::{CandidateLink, Event, ProbabilitySummary, ProcessingMode, QuakeId};

/// Optional single-quake / single-well reprocessing
#[derive(Debug, Clone, Default)]
pub struct RunTargets {
    /// Process only this quake, replacing whatever is stored for it
    pub quake: Option<QuakeId>,
    /// Re-associate this well from its present line: its stage rows are
    /// ignored for the run and other present lines are left out
    pub well: Option<String>,
}

/// Counters for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub events_loaded: usize,
    pub events_selected: usize,
    pub batches: usize,
    pub links_written: usize,
    pub summaries_written: usize,
    pub present_lines_superseded: usize,
    pub links_invalidated: usize,
    pub quakes_affected: usize,
    pub summaries_backfilled: usize,
    pub elapsed_ms: u64,
}

/// Drives invalidation, selection, batching and backfill against one store
pub struct AssociationPipeline<'a> {
    config: &'a AssocConfig,
    store: &'a AssociationStore,
}

/// Rows held back for the single write of an in-memory run
#[derive(Default)]
struct Accumulated {
    quakes: Vec<QuakeId>,
    links: Vec<CandidateLink>,
    summaries: Vec<ProbabilitySummary>,
}

impl<'a> AssociationPipeline<'a> {
    pub const fn new(config: &'a AssocConfig, store: &'a AssociationStore) -> Self {
        Self { config, store }
    }

    /// Run the whole pipeline over already-loaded inputs.
    pub fn run(
        &self,
        events: Vec<Event>,
        mut activities: ActivitySet,
        targets: &RunTargets,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let run = &self.config.run;
        let mut report = RunReport { events_loaded: events.len(), ..RunReport::default() };

        info!(mode = %run.mode, scoring = %run.scoring, in_memory = run.in_memory, "Starting association run");

        if let Some(well) = &targets.well {
            activities.retarget_well(well);
            info!(well_id = %well, present_lines = activities.hf_present.len(), "Re-associating single well");
        }
        report.present_lines_superseded = activities.drop_superseded_present();

        // STEP 1: invalidation (moot in full mode, the tables are emptied)
        let mut affected = BTreeSet::new();
        if run.mode == ProcessingMode::Incremental {
            let inv = invalidate_superseded(self.store, &activities.stage_wells())?;
            report.links_invalidated = inv.links_removed;
            report.quakes_affected = inv.affected.len();
            affected = inv.affected;
        }

        // STEP 2: selection
        let mut events = events;
        if let Some(q) = targets.quake {
            events.retain(|e| e.quake_id == q);
            affected.insert(q);
            info!(quake_id = q, found = !events.is_empty(), "Re-associating single quake");
        }
        let selected = select_events(events, run.mode, self.store, &affected)?;
        report.events_selected = selected.len();

        // In-memory runs truncate right before their single write, which
        // never happens when nothing was selected
        if run.mode == ProcessingMode::Full && (!run.in_memory || selected.is_empty()) {
            self.store.truncate()?;
        }

        // STEP 3: batches
        if selected.is_empty() {
            info!("Nothing to process");
        } else {
            let associator = Associator::build(activities, self.config);
            self.process_batches(&selected, &associator, targets, &mut report)?;
        }

        // STEP 4: backfill
        report.summaries_backfilled = backfill_missing_summaries(self.store, run.backfill_batch_size)?;

        self.store.flush()?;
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            selected = report.events_selected,
            links = report.links_written,
            summaries = report.summaries_written,
            backfilled = report.summaries_backfilled,
            elapsed_ms = report.elapsed_ms,
            "Association run complete"
        );
        Ok(report)
    }

    fn process_batches(
        &self,
        events: &[Event],
        associator: &Associator,
        targets: &RunTargets,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let run = &self.config.run;
        let batch_size = run.batch_size.max(1);
        let total_batches = events.len().div_ceil(batch_size);
        let mut held = run.in_memory.then(Accumulated::default);

        for (n, chunk) in events.chunks(batch_size).enumerate() {
            let mut links = associator.associate(chunk, self.config);
            let summaries = aggregate(&mut links);
            let quakes: Vec<QuakeId> = chunk.iter().map(|e| e.quake_id).collect();

            if let Some(well) = &targets.well {
                let matching = links.iter().filter(|l| &l.well_id == well).count();
                debug!(batch = n + 1, well_id = %well, links = matching, "Links for re-associated well");
            }

            report.batches += 1;
            report.links_written += links.len();
            report.summaries_written += summaries.len();

            match held.as_mut() {
                Some(acc) => {
                    acc.quakes.extend(quakes);
                    acc.links.extend(links);
                    acc.summaries.extend(summaries);
                }
                None => {
                    self.store.write_batch(&quakes, &links, &summaries)?;
                }
            }

            info!(
                batch = n + 1,
                of = total_batches,
                quakes = chunk.len(),
                links = report.links_written,
                "Batch complete"
            );
        }

        if let Some(acc) = held {
            if run.mode == ProcessingMode::Full {
                self.store.truncate()?;
            }
            self.store.write_batch(&acc.quakes, &acc.links, &acc.summaries)?;
            info!(quakes = acc.quakes.len(), links = acc.links.len(), "Wrote accumulated results");
        }
        Ok(())
    }
}
