//! eq-assoc: Induced-Seismicity Attribution
//!
//! Links earthquakes to nearby well activity (hydraulic-fracturing stages,
//! water disposal, production) by spatial proximity and time-since-activity
//! decay, and keeps a best-guess attribution per event.
//!
//! ## Architecture
//!
//! - **Region Classifier**: tags events and wells with the region whose radii apply
//! - **Candidate Sources**: great-circle point search and projected line search
//! - **Kernel Scorer**: Gaussian distance and exponential time decay
//! - **Aggregator**: stage, well and pad probabilities per event
//! - **Pipeline**: invalidation, incremental selection, atomic batches, backfill

pub mod aggregate;
pub mod association;
pub mod config;
pub mod geometry;
pub mod ingest;
pub mod pipeline;
pub mod region;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{AssocConfig, ConfigError, ConfigOverrides};

// Re-export commonly used types
pub use types::{
    Activity, ActivityType, ActivityWindow, CandidateLink, Event, PresentLine,
    ProbabilitySummary, ProcessingMode, QuakeId, Region, Resolution, ScoringMode,
};

// Re-export engine entry points
pub use association::{ActivitySet, Associator, CandidateSource};
pub use pipeline::{AssociationPipeline, PipelineError, RunReport, RunTargets};
pub use region::RegionClassifier;
pub use storage::{AssociationStore, StorageError};
