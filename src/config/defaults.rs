//! System-wide default constants.
//!
//! Centralises the numbers the engine falls back to when no config file is
//! present. Grouped by subsystem for easy discovery.

// ============================================================================
// Geodesy
// ============================================================================

/// Earth radius used to convert between kilometres and central angle.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// UTM zone of the planar system used for line geometry (NAD83 / UTM 10N, EPSG:26910).
pub const PLANE_UTM_ZONE: u8 = 10;

// ============================================================================
// Kernels
// ============================================================================

/// Kernel shape constant.
///
/// `sigma = radius / SHAPE` and `tau = Tmax / SHAPE`, so both kernels are
/// small but non-zero at the nominal edge of their window.
pub const KERNEL_SHAPE: f64 = 2.45;

// ============================================================================
// Windows
// ============================================================================

/// Upper bound on any window length or lag, in days (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Upper bound on the disposal onset delay, in months.
pub const MAX_DELAY_MONTHS: u32 = 1_200;

// ============================================================================
// Batching
// ============================================================================

/// Events per processing batch.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Events per backfill chunk.
pub const DEFAULT_BACKFILL_BATCH_SIZE: usize = 10_000;

// ============================================================================
// Storage
// ============================================================================

/// Default sled database path for the link and summary tables.
pub const DEFAULT_STORE_PATH: &str = "./data/eq_assoc.db";

/// Default directory holding the source CSV tables.
pub const DEFAULT_DATA_DIR: &str = "./data/source";

/// Local time zone of the regulator's catalogue.
pub const DEFAULT_TIMEZONE: &str = "Canada/Pacific";

// ============================================================================
// Weights
// ============================================================================

/// Favoured HF target formation.
pub const FAVOURED_FORMATION: &str = "Lower Middle Montney";

/// Catch-all formation category.
pub const FALLBACK_FORMATION: &str = "Other";

/// Weight applied when a formation lookup misses even the fallback category.
pub const FALLBACK_FORMATION_WEIGHT: f64 = 0.2;

// ============================================================================
// Ingest
// ============================================================================

/// Assumed depth of production wells without a survey (km).
pub const PROD_DEFAULT_DEPTH_KM: f64 = 2.0;
