//! Shared data structures for earthquake-to-well attribution
//!
//! This module defines the core records flowing through the association engine:
//! - Inputs: Event (earthquake), Activity (HF stage / WD / PROD point), PresentLine
//!   (coarse HF well geometry used while no stage records exist)
//! - Enumerations: ActivityType, Resolution, Region, ProcessingMode, ScoringMode
//! - Outputs: CandidateLink (one per event/activity pair) and ProbabilitySummary
//!   (one per event with at least one link)

mod activity;
mod event;
mod link;
mod mode;
mod region;

pub use activity::*;
pub use event::*;
pub use link::*;
pub use mode::*;
pub use region::*;
