//! Temporal gate: does the event fall inside the activity's window, and how
//! long after decay onset did it happen?

use chrono::NaiveDateTime;

use crate::types::{ActivityType, ActivityWindow};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Elapsed days used by the temporal kernel, or `None` when the event is
/// outside the activity's window.
///
/// PROD windows are open-ended: only `inj_start` gates and decay runs from
/// it. HF and WD require `inj_start <= t <= inj_end` and decay from
/// `decay_start`. The result is never negative.
pub fn elapsed_days(
    activity_type: ActivityType,
    window: &ActivityWindow,
    event_time: NaiveDateTime,
) -> Option<f64> {
    let decay_from = match activity_type {
        ActivityType::Prod => {
            if event_time < window.inj_start {
                return None;
            }
            window.inj_start
        }
        ActivityType::Hf | ActivityType::Wd => {
            if event_time < window.inj_start || event_time > window.inj_end {
                return None;
            }
            window.decay_start
        }
    };

    #[allow(clippy::cast_precision_loss)]
    let days = (event_time - decay_from).num_milliseconds() as f64 / MILLIS_PER_DAY;
    Some(days.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn window(start: NaiveDateTime, decay: NaiveDateTime, end: NaiveDateTime) -> ActivityWindow {
        ActivityWindow { inj_start: start, decay_start: decay, inj_end: end }
    }

    #[test]
    fn test_hf_inside_window_counts_from_decay_start() {
        let w = window(at(2023, 1, 1), at(2023, 1, 1), at(2025, 1, 14));
        assert_eq!(elapsed_days(ActivityType::Hf, &w, at(2023, 1, 2)), Some(1.0));
    }

    #[test]
    fn test_hf_outside_window_is_rejected() {
        let w = window(at(2023, 1, 1), at(2023, 1, 1), at(2023, 2, 1));
        assert_eq!(elapsed_days(ActivityType::Hf, &w, at(2022, 12, 31)), None);
        assert_eq!(elapsed_days(ActivityType::Hf, &w, at(2023, 2, 2)), None);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let w = window(at(2023, 1, 1), at(2023, 1, 1), at(2023, 2, 1));
        assert_eq!(elapsed_days(ActivityType::Wd, &w, at(2023, 1, 1)), Some(0.0));
        assert_eq!(elapsed_days(ActivityType::Wd, &w, at(2023, 2, 1)), Some(31.0));
    }

    #[test]
    fn test_wd_before_delayed_onset_clamps_to_zero() {
        let w = window(at(2023, 1, 1), at(2023, 2, 1), at(2024, 1, 1));
        assert_eq!(elapsed_days(ActivityType::Wd, &w, at(2023, 1, 15)), Some(0.0));
    }

    #[test]
    fn test_prod_is_open_ended() {
        let w = window(at(2015, 6, 1), at(2015, 6, 1), at(2016, 1, 1));
        assert_eq!(elapsed_days(ActivityType::Prod, &w, at(2015, 5, 31)), None);
        assert_eq!(elapsed_days(ActivityType::Prod, &w, at(2020, 6, 1)), Some(1827.0));
    }

    #[test]
    fn test_fractional_days() {
        let w = window(at(2023, 1, 1), at(2023, 1, 1), at(2023, 2, 1));
        let t = at(2023, 1, 1) + chrono::Duration::hours(12);
        assert_eq!(elapsed_days(ActivityType::Hf, &w, t), Some(0.5));
    }
}
