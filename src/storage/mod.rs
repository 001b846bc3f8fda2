//! Link and summary table storage
//!
//! Three named sled trees in one database:
//! - `eq_well_association`: candidate links, keyed by quake id + link ordinal
//! - `eq_well_association_classified`: one probability summary per quake
//! - `processed_quakes`: ledger of every quake a run has processed, including
//!   quakes that produced no links
//!
//! Keys are big-endian so a quake's rows sort together and `scan_prefix`
//! finds them. Values are JSON. A batch (its links, summaries and ledger
//! entries) commits as one multi-tree transaction.

mod keys;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{TransactionError, TransactionResult};
use sled::{Batch, Transactional, Tree};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::types::{CandidateLink, ProbabilitySummary, QuakeId, Resolution};

pub use keys::{link_key, quake_from_key, quake_key};

pub const LINKS_TREE: &str = "eq_well_association";
pub const SUMMARIES_TREE: &str = "eq_well_association_classified";
pub const LEDGER_TREE: &str = "processed_quakes";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transaction aborted")]
    Aborted,
    #[error("malformed key in {tree}: {len} bytes")]
    MalformedKey { tree: &'static str, len: usize },
}

impl From<TransactionError<()>> for StorageError {
    fn from(e: TransactionError<()>) -> Self {
        match e {
            TransactionError::Abort(()) => Self::Aborted,
            TransactionError::Storage(e) => Self::Database(e),
        }
    }
}

/// Ledger value for a processed quake
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProcessedMarker {
    processed_at: DateTime<Utc>,
    links: u32,
}

/// Rows written by one batch commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWrite {
    pub quakes: usize,
    pub links_removed: usize,
    pub links_inserted: usize,
    pub summaries_inserted: usize,
}

/// Outcome of invalidating coarse links
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Quakes that had at least one removed present link
    pub affected: BTreeSet<QuakeId>,
    pub links_removed: usize,
}

/// Row counts and a sample row per table, for post-run verification
#[derive(Debug, Clone, Default)]
pub struct TableReport {
    pub links: usize,
    pub summaries: usize,
    pub processed: usize,
    pub sample_link: Option<CandidateLink>,
    pub sample_summary: Option<ProbabilitySummary>,
}

/// Persistent link / summary / ledger tables
#[derive(Clone)]
pub struct AssociationStore {
    db: Arc<sled::Db>,
}

impl AssociationStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;

        tracing::info!(path = %path_ref.display(), "Association store opened");

        Ok(Self { db: Arc::new(db) })
    }

    /// Throwaway store, removed on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }

    fn has_tree(&self, name: &str) -> bool {
        self.db.tree_names().iter().any(|n| n.as_ref() == name.as_bytes())
    }

    /// Open a tree only if a previous run created it
    fn existing_tree(&self, name: &str) -> Result<Option<Tree>, StorageError> {
        if self.has_tree(name) {
            Ok(Some(self.db.open_tree(name)?))
        } else {
            Ok(None)
        }
    }

    /// Whether the link table has ever been created
    pub fn has_links_table(&self) -> bool {
        self.has_tree(LINKS_TREE)
    }

    /// Empty all three tables. Creates them if missing.
    pub fn truncate(&self) -> Result<(), StorageError> {
        for name in [LINKS_TREE, SUMMARIES_TREE, LEDGER_TREE] {
            self.db.open_tree(name)?.clear()?;
        }
        tracing::info!("Truncated link, summary and ledger tables");
        Ok(())
    }

    /// Quakes recorded as processed, plus any quake with a stored link
    pub fn processed_quakes(&self) -> Result<BTreeSet<QuakeId>, StorageError> {
        let mut ids = BTreeSet::new();
        if let Some(ledger) = self.existing_tree(LEDGER_TREE)? {
            for key in ledger.iter().keys() {
                ids.insert(quake_from_key(&key?, LEDGER_TREE)?);
            }
        }
        ids.extend(self.linked_quakes()?);
        Ok(ids)
    }

    /// Distinct quake ids present in the link table
    pub fn linked_quakes(&self) -> Result<BTreeSet<QuakeId>, StorageError> {
        let mut ids = BTreeSet::new();
        if let Some(links) = self.existing_tree(LINKS_TREE)? {
            for key in links.iter().keys() {
                ids.insert(quake_from_key(&key?, LINKS_TREE)?);
            }
        }
        Ok(ids)
    }

    /// Stored links for the given quakes, in quake then ordinal order
    pub fn links_for(&self, quake_ids: &[QuakeId]) -> Result<Vec<CandidateLink>, StorageError> {
        let Some(links) = self.existing_tree(LINKS_TREE)? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for &q in quake_ids {
            for item in links.scan_prefix(quake_key(q)) {
                let (_, value) = item?;
                out.push(serde_json::from_slice(&value)?);
            }
        }
        Ok(out)
    }

    pub fn summary(&self, quake_id: QuakeId) -> Result<Option<ProbabilitySummary>, StorageError> {
        let Some(summaries) = self.existing_tree(SUMMARIES_TREE)? else {
            return Ok(None);
        };
        match summaries.get(quake_key(quake_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Commit one batch atomically.
    ///
    /// Every quake in `processed` has its previous links and summary replaced
    /// by the rows given here, and is recorded in the ledger. Link ordinals
    /// follow the order of `links` within each quake.
    pub fn write_batch(
        &self,
        processed: &[QuakeId],
        links: &[CandidateLink],
        summaries: &[ProbabilitySummary],
    ) -> Result<BatchWrite, StorageError> {
        let links_tree = self.db.open_tree(LINKS_TREE)?;
        let summaries_tree = self.db.open_tree(SUMMARIES_TREE)?;
        let ledger_tree = self.db.open_tree(LEDGER_TREE)?;

        let mut link_batch = Batch::default();
        let mut summary_batch = Batch::default();
        let mut ledger_batch = Batch::default();
        let mut report = BatchWrite { quakes: processed.len(), ..BatchWrite::default() };

        // Replace, never append: clear every old row of the processed quakes
        for &q in processed {
            for key in links_tree.scan_prefix(quake_key(q)).keys() {
                link_batch.remove(key?);
                report.links_removed += 1;
            }
            summary_batch.remove(quake_key(q).to_vec());
        }

        let mut ordinals: BTreeMap<QuakeId, u32> = BTreeMap::new();
        for link in links {
            let ordinal = ordinals.entry(link.quake_id).or_insert(0);
            link_batch.insert(link_key(link.quake_id, *ordinal).to_vec(), serde_json::to_vec(link)?);
            *ordinal += 1;
        }
        report.links_inserted = links.len();

        for s in summaries {
            summary_batch.insert(quake_key(s.quake_id).to_vec(), serde_json::to_vec(s)?);
        }
        report.summaries_inserted = summaries.len();

        let now = Utc::now();
        for &q in processed {
            let marker = ProcessedMarker {
                processed_at: now,
                links: ordinals.get(&q).copied().unwrap_or(0),
            };
            ledger_batch.insert(quake_key(q).to_vec(), serde_json::to_vec(&marker)?);
        }

        let result: TransactionResult<(), ()> = (&links_tree, &summaries_tree, &ledger_tree)
            .transaction(|(l, s, p)| {
                l.apply_batch(&link_batch)?;
                s.apply_batch(&summary_batch)?;
                p.apply_batch(&ledger_batch)?;
                Ok(())
            });
        result?;

        tracing::debug!(
            quakes = report.quakes,
            links_removed = report.links_removed,
            links = report.links_inserted,
            summaries = report.summaries_inserted,
            "Committed batch"
        );
        Ok(report)
    }

    /// Remove every present-resolution link for wells that now have stage data.
    ///
    /// Summaries and ledger entries of the affected quakes are removed in the
    /// same transaction so they are recomputed on the next pass.
    pub fn invalidate_present(&self, stage_wells: &BTreeSet<String>) -> Result<Invalidation, StorageError> {
        let Some(links_tree) = self.existing_tree(LINKS_TREE)? else {
            return Ok(Invalidation::default());
        };
        if stage_wells.is_empty() {
            return Ok(Invalidation::default());
        }

        let mut out = Invalidation::default();
        let mut link_batch = Batch::default();
        for item in links_tree.iter() {
            let (key, value) = item?;
            let link: CandidateLink = serde_json::from_slice(&value)?;
            if link.resolution == Resolution::Present && stage_wells.contains(&link.well_id) {
                link_batch.remove(key);
                out.affected.insert(link.quake_id);
                out.links_removed += 1;
            }
        }
        if out.affected.is_empty() {
            return Ok(out);
        }

        let mut quake_batch = Batch::default();
        for &q in &out.affected {
            quake_batch.remove(quake_key(q).to_vec());
        }

        let summaries_tree = self.db.open_tree(SUMMARIES_TREE)?;
        let ledger_tree = self.db.open_tree(LEDGER_TREE)?;
        let result: TransactionResult<(), ()> = (&links_tree, &summaries_tree, &ledger_tree)
            .transaction(|(l, s, p)| {
                l.apply_batch(&link_batch)?;
                s.apply_batch(&quake_batch)?;
                p.apply_batch(&quake_batch)?;
                Ok(())
            });
        result?;

        Ok(out)
    }

    /// Quakes with at least one link and no summary row
    pub fn quakes_missing_summary(&self) -> Result<Vec<QuakeId>, StorageError> {
        let linked = self.linked_quakes()?;
        let Some(summaries) = self.existing_tree(SUMMARIES_TREE)? else {
            return Ok(linked.into_iter().collect());
        };
        let mut missing = Vec::new();
        for q in linked {
            if !summaries.contains_key(quake_key(q))? {
                missing.push(q);
            }
        }
        Ok(missing)
    }

    /// Insert summaries for quakes that have none. Existing rows are left alone.
    pub fn insert_missing_summaries(&self, summaries: &[ProbabilitySummary]) -> Result<usize, StorageError> {
        let tree = self.db.open_tree(SUMMARIES_TREE)?;
        let mut batch = Batch::default();
        let mut inserted = 0;
        for s in summaries {
            let key = quake_key(s.quake_id);
            if !tree.contains_key(key)? {
                batch.insert(key.to_vec(), serde_json::to_vec(s)?);
                inserted += 1;
            }
        }
        tree.apply_batch(batch)?;
        Ok(inserted)
    }

    /// Row counts plus the first row of each table
    pub fn table_report(&self) -> Result<TableReport, StorageError> {
        let mut report = TableReport::default();
        if let Some(links) = self.existing_tree(LINKS_TREE)? {
            report.links = links.len();
            if let Some((_, v)) = links.first()? {
                report.sample_link = Some(serde_json::from_slice(&v)?);
            }
        }
        if let Some(summaries) = self.existing_tree(SUMMARIES_TREE)? {
            report.summaries = summaries.len();
            if let Some((_, v)) = summaries.first()? {
                report.sample_summary = Some(serde_json::from_slice(&v)?);
            }
        }
        if let Some(ledger) = self.existing_tree(LEDGER_TREE)? {
            report.processed = ledger.len();
        }
        Ok(report)
    }

    /// Every stored link, in key order
    pub fn all_links(&self) -> Result<Vec<CandidateLink>, StorageError> {
        let Some(links) = self.existing_tree(LINKS_TREE)? else {
            return Ok(Vec::new());
        };
        links
            .iter()
            .values()
            .map(|v| Ok(serde_json::from_slice(&v?)?))
            .collect()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
