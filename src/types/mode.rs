//! Run-level switches

use serde::{Deserialize, Serialize};

/// How the destination tables are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Only new or invalidated events are processed
    #[default]
    Incremental,
    /// Truncate both tables and process every event
    Full,
}

/// Kernel selection for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Both kernels fixed at 1.0: binary in-window / in-radius association
    Simple,
    /// Gaussian distance kernel and exponential time decay
    #[default]
    Detailed,
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Detailed => write!(f, "detailed"),
        }
    }
}
