//! Distance and time decay kernels, and the composed link score

use crate::config::AssocConfig;
use crate::types::{ActivityType, Region, ScoringMode};

/// Gaussian distance kernel, `sigma = radius / shape`.
pub fn spatial_kernel(d_km: f64, radius_km: f64, shape: f64) -> f64 {
    let sigma = radius_km / shape;
    (-(d_km * d_km) / (2.0 * sigma * sigma)).exp()
}

/// Exponential time decay, `tau = tmax / shape`. Exactly 1.0 at zero elapsed time.
pub fn temporal_kernel(dt_days: f64, tmax_days: f64, shape: f64) -> f64 {
    if dt_days == 0.0 {
        return 1.0;
    }
    let tau = tmax_days / shape;
    (-dt_days / tau).exp()
}

/// Scores candidates against one immutable configuration
#[derive(Debug, Clone, Copy)]
pub struct KernelScorer<'a> {
    config: &'a AssocConfig,
}

impl<'a> KernelScorer<'a> {
    pub const fn new(config: &'a AssocConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &'a AssocConfig {
        self.config
    }

    /// `type_weight * formation_weight (HF only) * f_d * f_t`.
    ///
    /// In simple mode both kernels are 1.0, leaving a pure weight.
    pub fn score(
        &self,
        activity_type: ActivityType,
        formation: Option<&str>,
        region: Region,
        d_km: f64,
        dt_days: f64,
    ) -> f64 {
        let c = self.config;
        let mut score = c.weights.type_weight(activity_type);
        if activity_type == ActivityType::Hf {
            score *= c.weights.formation_weight(formation);
        }
        if c.run.scoring == ScoringMode::Detailed {
            let shape = c.kernel.shape;
            #[allow(clippy::cast_precision_loss)]
            let tmax = c.windows.tmax_days(activity_type) as f64;
            score *= spatial_kernel(d_km, c.radius_km.get(activity_type, region), shape);
            score *= temporal_kernel(dt_days, tmax, shape);
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernels_are_one_at_origin() {
        assert_eq!(spatial_kernel(0.0, 1.0, 2.45), 1.0);
        assert_eq!(temporal_kernel(0.0, 744.0, 2.45), 1.0);
    }

    #[test]
    fn test_kernels_strictly_decrease() {
        let mut prev_d = 1.0;
        let mut prev_t = 1.0;
        for i in 1..=20 {
            let x = f64::from(i) * 0.25;
            let fd = spatial_kernel(x, 3.0, 2.45);
            let ft = temporal_kernel(x * 30.0, 744.0, 2.45);
            assert!(fd < prev_d && ft < prev_t);
            assert!(fd >= 0.0 && ft >= 0.0);
            prev_d = fd;
            prev_t = ft;
        }
    }

    #[test]
    fn test_edge_of_window_values() {
        let fd = spatial_kernel(1.0, 1.0, 2.45);
        assert!((fd - (-2.45f64 * 2.45 / 2.0).exp()).abs() < 1e-12);
        let ft = temporal_kernel(744.0, 744.0, 2.45);
        assert!((ft - (-2.45f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_reference_hf_score() {
        let config = AssocConfig::default();
        let scorer = KernelScorer::new(&config);
        let s = scorer.score(ActivityType::Hf, Some("Lower Middle Montney"), Region::Ksmma, 0.0, 1.0);
        assert!((s - 0.7177).abs() < 1e-4, "got {s}");
    }

    #[test]
    fn test_simple_mode_is_pure_weight() {
        let mut config = AssocConfig::default();
        config.run.scoring = ScoringMode::Simple;
        let scorer = KernelScorer::new(&config);
        assert_eq!(scorer.score(ActivityType::Wd, None, Region::NorthernMontney, 9.0, 300.0), 0.1);
        let hf = scorer.score(ActivityType::Hf, Some("Other"), Region::Ksmma, 0.9, 700.0);
        assert!((hf - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_formation_weight_only_applies_to_hf() {
        let config = AssocConfig::default();
        let scorer = KernelScorer::new(&config);
        let wd = scorer.score(ActivityType::Wd, Some("Lower Middle Montney"), Region::Ksmma, 0.0, 0.0);
        assert_eq!(wd, 0.1);
    }
}
