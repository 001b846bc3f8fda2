//! Source table loading
//!
//! Reads the raw CSV tables from the data directory, normalises them into
//! region-tagged [`Event`]s and activities, and builds each activity's time
//! window. Rows missing a coordinate or timestamp are dropped and counted.
//!
//! | File | Columns |
//! |---|---|
//! | `earthquakes.csv` | `quake_id, latitude, longitude, depth_km, time_utc` |
//! | `hf_stage.csv` | `stage_id, well_id, pad_id, latitude, longitude, depth_m, datetime, date` |
//! | `hf_present.csv` | `well_id, latitude, longitude, expected_start, expected_end` (one row per segment point) |
//! | `wd.csv` | `well_id, latitude, longitude, depth_m, yearmonth` |
//! | `prod.csv` | `well_id, latitude, longitude, status_eff, mode_code, ops_type` |
//! | `formation_targets.csv` | `well_id, target` (optional; `LM` marks the favoured formation) |
//!
//! Only `earthquakes.csv` is required. A missing activity file is an empty
//! table for that type.

pub mod windows;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::association::ActivitySet;
use crate::config::defaults::{FAVOURED_FORMATION, PROD_DEFAULT_DEPTH_KM};
use crate::config::AssocConfig;
use crate::region::RegionClassifier;
use crate::types::{Activity, ActivityType, Event, PresentLine};

pub const EARTHQUAKES_FILE: &str = "earthquakes.csv";
pub const HF_STAGE_FILE: &str = "hf_stage.csv";
pub const HF_PRESENT_FILE: &str = "hf_present.csv";
pub const WD_FILE: &str = "wd.csv";
pub const PROD_FILE: &str = "prod.csv";
pub const FORMATION_TARGETS_FILE: &str = "formation_targets.csv";

/// Formation target code for the favoured interval
const FAVOURED_TARGET_CODE: &str = "LM";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("required table {} not found", .0.display())]
    MissingTable(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("unknown time zone '{0}'")]
    TimeZone(String),
}

// ============================================================================
// Raw rows
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuakeRow {
    quake_id: u64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    depth_km: Option<f64>,
    time_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HfStageRow {
    stage_id: String,
    well_id: String,
    pad_id: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    depth_m: Option<f64>,
    datetime: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HfPresentRow {
    well_id: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    expected_start: Option<String>,
    expected_end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WdRow {
    well_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    depth_m: Option<f64>,
    yearmonth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProdRow {
    well_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status_eff: Option<String>,
    #[serde(default)]
    mode_code: Option<String>,
    #[serde(default)]
    ops_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    well_id: String,
    target: Option<String>,
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse a timestamp in any of the layouts found in the source tables.
///
/// Offsets are converted to UTC; date-only values mean midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date(s).map(|d| d.and_time(chrono::NaiveTime::MIN))
}

/// Parse a calendar date: `YYYY-MM-DD`, `YYYYMMDD` or a `YYYY-MM` month.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .ok()
}

fn coords(lat: Option<f64>, lon: Option<f64>) -> Option<(f64, f64)> {
    match (lat, lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Deserialize every row; malformed rows are skipped with a count.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::Csv { path: path.to_path_buf(), source })?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for record in reader.deserialize::<T>() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                malformed += 1;
                debug!(path = %path.display(), error = %e, "Skipping malformed row");
            }
        }
    }
    if malformed > 0 {
        warn!(path = %path.display(), malformed, "Skipped malformed rows");
    }
    Ok(rows)
}

// ============================================================================
// Loader
// ============================================================================

/// Loads and normalises every source table for one run
pub struct SourceTables<'a> {
    dir: PathBuf,
    config: &'a AssocConfig,
    classifier: RegionClassifier,
    tz: Tz,
    now_local: NaiveDateTime,
}

impl<'a> SourceTables<'a> {
    pub fn new(config: &'a AssocConfig) -> Result<Self, IngestError> {
        let tz = Tz::from_str(&config.run.timezone)
            .map_err(|_| IngestError::TimeZone(config.run.timezone.clone()))?;
        Ok(Self {
            dir: config.run.data_dir.clone(),
            config,
            classifier: RegionClassifier::default(),
            tz,
            now_local: Utc::now().with_timezone(&tz).naive_local(),
        })
    }

    /// Read from another directory than the configured one
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Pin "now" (the open end of production windows)
    #[must_use]
    pub const fn with_now(mut self, now_local: NaiveDateTime) -> Self {
        self.now_local = now_local;
        self
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Rows of an optional table; a missing file is empty.
    fn optional_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, IngestError> {
        let path = self.path(file);
        if !path.exists() {
            info!(path = %path.display(), "Table not found, treating as empty");
            return Ok(Vec::new());
        }
        read_rows(&path)
    }

    fn to_local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        self.tz.from_utc_datetime(&utc).naive_local()
    }

    /// Earthquake catalogue with local times and regions, sorted by quake id
    pub fn load_events(&self) -> Result<Vec<Event>, IngestError> {
        let path = self.path(EARTHQUAKES_FILE);
        if !path.exists() {
            return Err(IngestError::MissingTable(path));
        }
        let rows: Vec<QuakeRow> = read_rows(&path)?;
        let total = rows.len();

        let mut events: Vec<Event> = rows
            .into_iter()
            .filter_map(|r| {
                let (latitude, longitude) = coords(r.latitude, r.longitude)?;
                let utc = parse_timestamp(r.time_utc.as_deref()?)?;
                Some(Event {
                    quake_id: r.quake_id,
                    latitude,
                    longitude,
                    depth_km: r.depth_km.unwrap_or(f64::NAN),
                    time_local: self.to_local(utc),
                    region: self.classifier.classify(latitude, longitude),
                })
            })
            .collect();
        events.sort_by_key(|e| e.quake_id);
        events.dedup_by_key(|e| e.quake_id);

        info!(loaded = events.len(), dropped = total - events.len(), "Loaded earthquakes");
        Ok(events)
    }

    /// Activity tables for every enabled type
    pub fn load_activities(&self) -> Result<ActivitySet, IngestError> {
        let mut set = ActivitySet::default();
        if self.config.type_enabled(ActivityType::Hf) {
            let targets = self.load_formation_targets()?;
            set.hf_stage = self.load_hf_stage(&targets)?;
            set.hf_present = self.load_hf_present()?;
        }
        if self.config.type_enabled(ActivityType::Wd) {
            set.wd = self.load_wd()?;
        }
        if self.config.type_enabled(ActivityType::Prod) {
            set.prod = self.load_prod()?;
        }
        info!(
            hf_stage = set.hf_stage.len(),
            hf_present = set.hf_present.len(),
            wd = set.wd.len(),
            prod = set.prod.len(),
            "Loaded activities"
        );
        Ok(set)
    }

    /// Well id to formation category
    fn load_formation_targets(&self) -> Result<HashMap<String, String>, IngestError> {
        let fallback = &self.config.weights.formation_fallback;
        Ok(self
            .optional_rows::<TargetRow>(FORMATION_TARGETS_FILE)?
            .into_iter()
            .map(|r| {
                let formation = if r.target.as_deref().map(str::trim) == Some(FAVOURED_TARGET_CODE) {
                    FAVOURED_FORMATION.to_string()
                } else {
                    fallback.clone()
                };
                (r.well_id, formation)
            })
            .collect())
    }

    fn load_hf_stage(&self, targets: &HashMap<String, String>) -> Result<Vec<Activity>, IngestError> {
        let rows: Vec<HfStageRow> = self.optional_rows(HF_STAGE_FILE)?;
        let total = rows.len();
        let fallback = &self.config.weights.formation_fallback;

        let stages: Vec<Activity> = rows
            .into_iter()
            .filter_map(|r| {
                let (latitude, longitude) = coords(r.latitude, r.longitude)?;
                let datetime = r.datetime.as_deref().and_then(parse_timestamp);
                let date = r.date.as_deref().and_then(parse_date);
                let window = windows::hf_stage_window(datetime, date, &self.config.windows)?;
                let formation = targets.get(&r.well_id).unwrap_or(fallback).clone();
                Some(Activity {
                    activity_type: ActivityType::Hf,
                    stage_id: Some(r.stage_id),
                    pad_id: non_empty(r.pad_id),
                    formation: Some(formation),
                    latitude,
                    longitude,
                    depth_km: r.depth_m.map_or(f64::NAN, |m| m / 1000.0),
                    window,
                    region: self.classifier.classify(latitude, longitude),
                    well_id: r.well_id,
                })
            })
            .collect();

        if stages.len() < total {
            warn!(dropped = total - stages.len(), "Dropped HF stage rows without location or time");
        }
        Ok(stages)
    }

    /// One polyline per coarse well, in well id order
    fn load_hf_present(&self) -> Result<Vec<PresentLine>, IngestError> {
        let rows: Vec<HfPresentRow> = self.optional_rows(HF_PRESENT_FILE)?;

        struct Pending {
            coords: Vec<(f64, f64)>,
            start: Option<NaiveDateTime>,
            end: Option<NaiveDateTime>,
        }

        let mut wells: BTreeMap<String, Pending> = BTreeMap::new();
        for r in rows {
            let Some(well_id) = non_empty(r.well_id) else { continue };
            let p = wells.entry(well_id).or_insert(Pending { coords: Vec::new(), start: None, end: None });
            if let Some(c) = coords(r.latitude, r.longitude) {
                p.coords.push(c);
            }
            if let Some(s) = r.expected_start.as_deref().and_then(parse_timestamp) {
                p.start = Some(p.start.map_or(s, |cur| cur.min(s)));
            }
            if let Some(e) = r.expected_end.as_deref().and_then(parse_timestamp) {
                p.end = Some(p.end.map_or(e, |cur| cur.max(e)));
            }
        }

        let mut lines = Vec::with_capacity(wells.len());
        for (well_id, p) in wells {
            let (Some(start), Some(end)) = (p.start, p.end) else {
                warn!(well_id = %well_id, "Present well lacks expected dates, skipping");
                continue;
            };
            if p.coords.is_empty() {
                warn!(well_id = %well_id, "Present well has no coordinates, skipping");
                continue;
            }
            let Some(window) = windows::present_line_window(start, end, &self.config.windows) else {
                warn!(well_id = %well_id, "Present well window out of range, skipping");
                continue;
            };
            lines.push(PresentLine {
                well_id,
                coords: p.coords,
                formation: self.config.weights.formation_fallback.clone(),
                window,
            });
        }
        Ok(lines)
    }

    fn load_wd(&self) -> Result<Vec<Activity>, IngestError> {
        let rows: Vec<WdRow> = self.optional_rows(WD_FILE)?;
        let total = rows.len();
        let wd: Vec<Activity> = rows
            .into_iter()
            .filter_map(|r| {
                let (latitude, longitude) = coords(r.latitude, r.longitude)?;
                let month = parse_date(r.yearmonth.as_deref()?)?;
                let window = windows::wd_window(month, &self.config.windows)?;
                Some(Activity {
                    activity_type: ActivityType::Wd,
                    stage_id: None,
                    pad_id: None,
                    formation: None,
                    latitude,
                    longitude,
                    depth_km: r.depth_m.map_or(f64::NAN, |m| m / 1000.0),
                    window,
                    region: self.classifier.classify(latitude, longitude),
                    well_id: r.well_id,
                })
            })
            .collect();
        if wd.len() < total {
            warn!(dropped = total - wd.len(), "Dropped WD rows without location or month");
        }
        Ok(wd)
    }

    /// Active producing wells whose status took effect on or after `prod_cut`
    fn load_prod(&self) -> Result<Vec<Activity>, IngestError> {
        let rows: Vec<ProdRow> = self.optional_rows(PROD_FILE)?;
        let cut = self.config.windows.prod_cut;
        let prod: Vec<Activity> = rows
            .into_iter()
            .filter(|r| r.mode_code.as_deref().map_or(true, |m| m == "ACT"))
            .filter(|r| r.ops_type.as_deref().map_or(true, |o| o == "PROD"))
            .filter_map(|r| {
                let (latitude, longitude) = coords(r.latitude, r.longitude)?;
                let status_eff = parse_date(r.status_eff.as_deref()?)?;
                if status_eff < cut {
                    return None;
                }
                Some(Activity {
                    activity_type: ActivityType::Prod,
                    stage_id: None,
                    pad_id: None,
                    formation: None,
                    latitude,
                    longitude,
                    depth_km: PROD_DEFAULT_DEPTH_KM,
                    window: windows::prod_window(status_eff, self.now_local),
                    region: self.classifier.classify(latitude, longitude),
                    well_id: r.well_id,
                })
            })
            .collect();
        Ok(prod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;
    use std::fs;

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expect = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2023-01-02T08:00:00Z"), Some(expect));
        assert_eq!(parse_timestamp("2023-01-02 08:00:00"), Some(expect));
        assert_eq!(parse_timestamp("2023-01-02 08:00:00+00:00"), Some(expect));
        assert_eq!(parse_timestamp("2023-01-02T09:00:00+01:00"), Some(expect));
        assert_eq!(parse_timestamp("  "), None);
        assert_eq!(parse_date("20150601"), NaiveDate::from_ymd_opt(2015, 6, 1));
        assert_eq!(parse_date("2015-06"), NaiveDate::from_ymd_opt(2015, 6, 1));
    }

    #[test]
    fn test_events_are_localised_and_gaps_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            EARTHQUAKES_FILE,
            "quake_id,latitude,longitude,depth_km,time_utc\n\
             2,56.11,-121.31,3.2,2023-01-02T08:00:00Z\n\
             1,56.60,-121.90,2.0,2023-07-01 12:00:00\n\
             3,,-121.31,3.0,2023-01-02T08:00:00Z\n\
             4,56.11,-121.31,3.0,\n",
        );
        let config = AssocConfig::default();
        let events = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].quake_id, 1);
        // PDT in July, PST in January
        assert_eq!(events[0].time_local, ts("2023-07-01 05:00:00"));
        assert_eq!(events[1].time_local, ts("2023-01-02 00:00:00"));
        assert_eq!(events[0].region, Region::NorthernMontney);
        assert_eq!(events[1].region, Region::Ksmma);
    }

    #[test]
    fn test_missing_catalogue_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssocConfig::default();
        let err = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_events();
        assert!(matches!(err, Err(IngestError::MissingTable(_))));
    }

    #[test]
    fn test_hf_stage_formation_and_pad() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            HF_STAGE_FILE,
            "stage_id,well_id,pad_id,latitude,longitude,depth_m,datetime,date\n\
             1,100,PAD-A,56.11,-121.31,2100,,2023-01-01\n\
             2,200,,56.12,-121.30,2000,2023-01-05 10:00:00,2023-01-05\n\
             3,300,PAD-C,,-121.30,2000,,2023-01-05\n",
        );
        write(dir.path(), FORMATION_TARGETS_FILE, "well_id,target\n100,LM\n200,UM\n");
        let config = AssocConfig::default();
        let set = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_activities().unwrap();
        assert_eq!(set.hf_stage.len(), 2);
        let a = &set.hf_stage[0];
        assert_eq!(a.formation.as_deref(), Some("Lower Middle Montney"));
        assert_eq!(a.pad_id.as_deref(), Some("PAD-A"));
        assert_eq!(a.window.decay_start, ts("2023-01-02"));
        assert!((a.depth_km - 2.1).abs() < 1e-12);
        let b = &set.hf_stage[1];
        assert_eq!(b.formation.as_deref(), Some("Other"));
        assert!(b.pad_id.is_none());
        assert_eq!(b.window.decay_start, ts("2023-01-05 10:00:00"));
        assert!(set.wd.is_empty() && set.prod.is_empty() && set.hf_present.is_empty());
    }

    #[test]
    fn test_present_lines_group_by_well() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            HF_PRESENT_FILE,
            "well_id,latitude,longitude,expected_start,expected_end\n\
             B,56.30,-120.80,2022-03-01,2022-03-20\n\
             A,56.40,-121.00,2022-01-01,2022-02-01\n\
             B,56.31,-120.79,2022-02-15,2022-04-01\n\
             ,56.31,-120.79,2022-02-15,2022-04-01\n",
        );
        let config = AssocConfig::default();
        let set = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_activities().unwrap();
        assert_eq!(set.hf_present.len(), 2);
        let b = &set.hf_present[1];
        assert_eq!(b.well_id, "B");
        assert_eq!(b.coords.len(), 2);
        assert_eq!(b.window.inj_start, ts("2022-02-15"));
        assert_eq!(b.window.decay_start, ts("2022-04-01"));
        assert_eq!(b.formation, "Other");
    }

    #[test]
    fn test_prod_filters_status_and_cut() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PROD_FILE,
            "well_id,latitude,longitude,status_eff,mode_code,ops_type\n\
             P1,56.3,-120.8,20150601,ACT,PROD\n\
             P2,56.3,-120.8,20050601,ACT,PROD\n\
             P3,56.3,-120.8,20160601,SUSP,PROD\n\
             P4,56.3,-120.8,20160601,ACT,INJ\n",
        );
        let config = AssocConfig::default();
        let now = ts("2025-01-01");
        let set = SourceTables::new(&config).unwrap().with_dir(dir.path()).with_now(now).load_activities().unwrap();
        assert_eq!(set.prod.len(), 1);
        assert_eq!(set.prod[0].well_id, "P1");
        assert_eq!(set.prod[0].window.inj_end, now);
        assert_eq!(set.prod[0].depth_km, 2.0);
    }

    #[test]
    fn test_disabled_types_are_not_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), WD_FILE, "well_id,latitude,longitude,depth_m,yearmonth\nD1,56.3,-120.8,1500,2023-01\n");
        let mut config = AssocConfig::default();
        config.run.types = vec![ActivityType::Hf];
        let set = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_activities().unwrap();
        assert!(set.wd.is_empty());
        config.run.types = vec![ActivityType::Wd];
        let set = SourceTables::new(&config).unwrap().with_dir(dir.path()).load_activities().unwrap();
        assert_eq!(set.wd.len(), 1);
        assert_eq!(set.wd[0].window.decay_start, ts("2023-02-01"));
    }
}
