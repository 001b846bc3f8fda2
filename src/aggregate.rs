//! Hierarchical aggregation: stage → well → pad probabilities per event.
//!
//! Single pass over each event's links with explicit grouping. Ties resolve
//! deterministically:
//! - best stage: lowest link ordinal
//! - best well: lowest `(well_id, type)`
//! - best pad: lowest `pad_id`

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ActivityType, CandidateLink, ProbabilitySummary, QuakeId};

/// Group link ordinals by event, keeping encounter order within each event.
fn group_by_event(links: &[CandidateLink]) -> BTreeMap<QuakeId, Vec<usize>> {
    let mut groups: BTreeMap<QuakeId, Vec<usize>> = BTreeMap::new();
    for (i, link) in links.iter().enumerate() {
        groups.entry(link.quake_id).or_default().push(i);
    }
    groups
}

/// Normalise scores within each event into `p_stage`.
///
/// An event whose scores are all zero gets a uniform distribution.
pub fn assign_stage_probabilities(links: &mut [CandidateLink]) {
    for ordinals in group_by_event(links).values() {
        let total: f64 = ordinals.iter().map(|&i| links[i].score).sum();
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / ordinals.len() as f64;
        for &i in ordinals {
            links[i].p_stage = if total > 0.0 { links[i].score / total } else { uniform };
        }
    }
}

/// Argmax over an ordered map; the first (lowest) key wins ties.
fn best_entry<K: Clone>(mass: &BTreeMap<K, f64>) -> Option<(K, f64)> {
    let mut best: Option<(&K, f64)> = None;
    for (k, &m) in mass {
        if best.map_or(true, |(_, bm)| m > bm) {
            best = Some((k, m));
        }
    }
    best.map(|(k, m)| (k.clone(), m))
}

fn normalised(mass: f64, total: f64) -> f64 {
    if total > 0.0 { mass / total } else { 0.0 }
}

/// Summarise one event's links. `p_stage` must already be assigned.
fn summarize_event(quake_id: QuakeId, links: &[&CandidateLink]) -> Option<ProbabilitySummary> {
    let mut best_stage: Option<&CandidateLink> = None;
    let mut well_mass: BTreeMap<(String, ActivityType), f64> = BTreeMap::new();
    let mut pad_mass: BTreeMap<String, f64> = BTreeMap::new();
    let mut wells: BTreeSet<(ActivityType, &str)> = BTreeSet::new();

    for &link in links {
        if best_stage.map_or(true, |b| link.p_stage > b.p_stage) {
            best_stage = Some(link);
        }
        *well_mass.entry((link.well_id.clone(), link.activity_type)).or_default() += link.p_stage;
        *pad_mass.entry(link.pad_id.clone()).or_default() += link.p_stage;
        wells.insert((link.activity_type, link.well_id.as_str()));
    }

    let stage = best_stage?;
    let well_total: f64 = well_mass.values().sum();
    let pad_total: f64 = pad_mass.values().sum();
    let ((best_well, best_well_type), well_m) = best_entry(&well_mass)?;
    let (best_pad, pad_m) = best_entry(&pad_mass)?;

    let count = |t: ActivityType| -> u32 {
        u32::try_from(wells.iter().filter(|(wt, _)| *wt == t).count()).unwrap_or(u32::MAX)
    };

    Some(ProbabilitySummary {
        quake_id,
        best_stage: stage.stage_id.clone(),
        best_stage_prob: stage.p_stage,
        best_well,
        best_well_type,
        best_well_prob: normalised(well_m, well_total),
        best_pad,
        best_pad_prob: normalised(pad_m, pad_total),
        best_d_km: stage.d_km,
        best_dt_days: stage.dt_days,
        n_hf_wells: count(ActivityType::Hf),
        n_wd_wells: count(ActivityType::Wd),
        n_prod_wells: count(ActivityType::Prod),
        best_well_target: None,
        best_well_formation: None,
    })
}

/// One summary per event that has at least one link, ordered by quake id.
/// Uses the `p_stage` already on the links.
pub fn summarize(links: &[CandidateLink]) -> Vec<ProbabilitySummary> {
    group_by_event(links)
        .into_iter()
        .filter_map(|(quake_id, ordinals)| {
            let event_links: Vec<&CandidateLink> = ordinals.iter().map(|&i| &links[i]).collect();
            summarize_event(quake_id, &event_links)
        })
        .collect()
}

/// Assign `p_stage` and summarise in one step
pub fn aggregate(links: &mut [CandidateLink]) -> Vec<ProbabilitySummary> {
    assign_stage_probabilities(links);
    summarize(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Region, Resolution};

    fn link(quake_id: QuakeId, stage: Option<&str>, well: &str, pad: &str, t: ActivityType, score: f64) -> CandidateLink {
        CandidateLink {
            quake_id,
            stage_id: stage.map(str::to_string),
            well_id: well.to_string(),
            pad_id: pad.to_string(),
            activity_type: t,
            d_km: score,
            dt_days: 10.0 * score,
            score,
            region: Region::NorthernMontney,
            resolution: Resolution::Stage,
            p_stage: 0.0,
        }
    }

    fn sums(links: &[CandidateLink], quake_id: QuakeId) -> f64 {
        links.iter().filter(|l| l.quake_id == quake_id).map(|l| l.p_stage).sum()
    }

    #[test]
    fn test_stage_probabilities_sum_to_one_per_event() {
        let mut links = vec![
            link(1, Some("A"), "W1", "P1", ActivityType::Hf, 0.5),
            link(2, None, "D1", "D1", ActivityType::Wd, 0.03),
            link(1, Some("B"), "W1", "P1", ActivityType::Hf, 0.25),
            link(1, None, "D1", "D1", ActivityType::Wd, 0.25),
        ];
        assign_stage_probabilities(&mut links);
        assert!((sums(&links, 1) - 1.0).abs() < 1e-12);
        assert!((sums(&links, 2) - 1.0).abs() < 1e-12);
        assert!((links[0].p_stage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_well_and_pad_rollup() {
        let mut links = vec![
            link(1, Some("A"), "W1", "P1", ActivityType::Hf, 0.3),
            link(1, Some("B"), "W2", "P1", ActivityType::Hf, 0.2),
            link(1, Some("C"), "W3", "P2", ActivityType::Hf, 0.4),
            link(1, None, "D1", "D1", ActivityType::Wd, 0.1),
        ];
        let summaries = aggregate(&mut links);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.best_stage.as_deref(), Some("C"));
        assert!((s.best_stage_prob - 0.4).abs() < 1e-12);
        assert_eq!(s.best_well, "W3");
        assert_eq!(s.best_well_type, ActivityType::Hf);
        assert!((s.best_well_prob - 0.4).abs() < 1e-12);
        // P1 gathers 0.3 + 0.2 across two wells
        assert_eq!(s.best_pad, "P1");
        assert!((s.best_pad_prob - 0.5).abs() < 1e-12);
        assert_eq!(s.best_d_km, 0.4);
        assert_eq!((s.n_hf_wells, s.n_wd_wells, s.n_prod_wells), (3, 1, 0));
    }

    #[test]
    fn test_well_counts_are_distinct_wells_not_links() {
        let mut links = vec![
            link(5, Some("A"), "W1", "P1", ActivityType::Hf, 0.1),
            link(5, Some("B"), "W1", "P1", ActivityType::Hf, 0.1),
            link(5, Some("C"), "W1", "P1", ActivityType::Hf, 0.1),
        ];
        let s = &aggregate(&mut links)[0];
        assert_eq!(s.n_hf_wells, 1);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let mut links = vec![
            link(1, Some("Z"), "WB", "PB", ActivityType::Hf, 0.2),
            link(1, Some("Y"), "WA", "PA", ActivityType::Hf, 0.2),
        ];
        let s = &aggregate(&mut links)[0];
        assert_eq!(s.best_stage.as_deref(), Some("Z"), "lowest ordinal wins the stage tie");
        assert_eq!(s.best_well, "WA", "lowest well id wins the well tie");
        assert_eq!(s.best_pad, "PA", "lowest pad id wins the pad tie");
    }

    #[test]
    fn test_same_well_different_types_are_separate() {
        let mut links = vec![
            link(1, None, "W1", "W1", ActivityType::Wd, 0.1),
            link(1, None, "W1", "W1", ActivityType::Prod, 0.1),
        ];
        let s = &aggregate(&mut links)[0];
        assert_eq!(s.best_well_type, ActivityType::Wd);
        assert!((s.best_well_prob - 0.5).abs() < 1e-12);
        assert!((s.best_pad_prob - 1.0).abs() < 1e-12);
        assert_eq!((s.n_wd_wells, s.n_prod_wells), (1, 1));
    }

    #[test]
    fn test_all_zero_scores_spread_uniformly() {
        let mut links = vec![
            link(3, None, "D1", "D1", ActivityType::Wd, 0.0),
            link(3, None, "D2", "D2", ActivityType::Wd, 0.0),
        ];
        let s = &aggregate(&mut links)[0];
        assert!((links[0].p_stage - 0.5).abs() < 1e-12);
        assert_eq!(s.best_well, "D1");
    }

    #[test]
    fn test_no_links_no_summaries() {
        assert!(aggregate(&mut []).is_empty());
    }
}
