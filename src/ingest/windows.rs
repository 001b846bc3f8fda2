//! Activity time-window builders
//!
//! Window arithmetic is checked: an offset that leaves chrono's range drops
//! the row instead of panicking.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta};

use crate::config::WindowConfig;
use crate::types::ActivityWindow;

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn plus_days(t: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    t.checked_add_signed(TimeDelta::try_days(days)?)
}

fn plus_hours(t: NaiveDateTime, hours: i64) -> Option<NaiveDateTime> {
    t.checked_add_signed(TimeDelta::try_hours(hours)?)
}

/// HF stage: decay starts after a lag that depends on timestamp precision.
///
/// A precise `datetime` lags by `hf_lag_datetime_hours`; a date-only record by
/// `hf_lag_dateonly_days`. The window opens at decay start and lasts
/// `hf_tmax_days`. `None` without either timestamp.
pub fn hf_stage_window(
    datetime: Option<NaiveDateTime>,
    date: Option<NaiveDate>,
    w: &WindowConfig,
) -> Option<ActivityWindow> {
    let decay_start = match (datetime, date) {
        (Some(dt), _) => plus_hours(dt, w.hf_lag_datetime_hours)?,
        (None, Some(d)) => plus_days(midnight(d), w.hf_lag_dateonly_days)?,
        (None, None) => return None,
    };
    Some(ActivityWindow {
        inj_start: decay_start,
        decay_start,
        inj_end: plus_days(decay_start, w.hf_tmax_days)?,
    })
}

/// HF present line: open at the earliest expected start, decay from the
/// latest expected end, and close `hf_tmax_days` after it.
pub fn present_line_window(
    earliest_start: NaiveDateTime,
    latest_end: NaiveDateTime,
    w: &WindowConfig,
) -> Option<ActivityWindow> {
    Some(ActivityWindow {
        inj_start: earliest_start,
        decay_start: latest_end,
        inj_end: plus_days(latest_end, w.hf_tmax_days)?,
    })
}

/// WD monthly volume: open on the first of the month, delay decay by whole
/// calendar months, close `wd_tmax_days` after opening.
pub fn wd_window(month: NaiveDate, w: &WindowConfig) -> Option<ActivityWindow> {
    let inj_start = midnight(month.with_day(1)?);
    let decay_start = inj_start.checked_add_months(Months::new(w.wd_delay_months))?;
    Some(ActivityWindow {
        inj_start,
        decay_start,
        inj_end: plus_days(inj_start, w.wd_tmax_days)?,
    })
}

/// PROD: open from the status effective date; the end is only informational.
pub fn prod_window(status_eff: NaiveDate, now: NaiveDateTime) -> ActivityWindow {
    let inj_start = midnight(status_eff);
    ActivityWindow { inj_start, decay_start: inj_start, inj_end: now }
}
