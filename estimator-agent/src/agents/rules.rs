//! Rule-based hour estimates for tasks whose platforms had to change.
//!
//! A baseline is derived from whatever hours the task already has, then
//! scaled per platform and by project complexity.

use estimator_core::{Complexity, Efforts, EstimationMethod, Platform};
use std::collections::BTreeSet;

/// Hours assumed for a task with no usable figures at all.
pub const DEFAULT_BASELINE_HOURS: f64 = 8.0;

/// Relative effort of each platform against a frontend baseline.
pub fn platform_factor(platform: Platform) -> f64 {
    match platform {
        Platform::Flutter | Platform::WebApp => 1.0,
        Platform::Api => 1.5,
        Platform::Cms => 0.7,
    }
}

/// Frontend-equivalent hours implied by `efforts`.
pub fn baseline_hours(efforts: &Efforts) -> f64 {
    let frontend: Vec<f64> =
        efforts.iter().filter(|(p, _)| p.is_frontend()).map(|(_, h)| f64::from(*h)).collect();
    if !frontend.is_empty() {
        return frontend.iter().sum::<f64>() / frontend.len() as f64;
    }
    if let Some(api) = efforts.get(&Platform::Api) {
        return f64::from(*api) / platform_factor(Platform::Api);
    }
    if let Some(cms) = efforts.get(&Platform::Cms) {
        return f64::from(*cms) / platform_factor(Platform::Cms);
    }
    DEFAULT_BASELINE_HOURS
}

/// Clamp a model- or template-supplied figure to the platform cap.
pub fn cap_hours(platform: Platform, hours: u32) -> u32 {
    hours.min(platform.hour_cap())
}

#[derive(Debug, Clone)]
pub struct RuleBasedEstimator {
    targets: BTreeSet<Platform>,
    complexity: Complexity,
}

impl RuleBasedEstimator {
    pub fn new(targets: BTreeSet<Platform>, complexity: Complexity) -> Self {
        Self { targets, complexity }
    }

    pub fn targets(&self) -> &BTreeSet<Platform> {
        &self.targets
    }

    /// Hours for `platform` given a frontend baseline.
    pub fn estimate(&self, platform: Platform, baseline: f64) -> u32 {
        let raw = (baseline * platform_factor(platform) * self.complexity.multiplier()).round();
        let cap = platform.hour_cap();
        if raw.is_nan() || raw < 1.0 {
            1
        } else if raw >= f64::from(cap) {
            cap
        } else {
            raw as u32
        }
    }

    /// Hours for every target platform, derived from `source`.
    pub fn estimate_all(&self, source: &Efforts) -> Efforts {
        let baseline = baseline_hours(source);
        self.targets.iter().map(|p| (*p, self.estimate(*p, baseline))).collect()
    }

    /// Keep on-target figures of `original` (capped) and estimate the rest.
    ///
    /// When every original platform is a target the figures are kept as they
    /// are and the task stays historical. Otherwise off-target hours are
    /// dropped and each missing target platform is estimated from the
    /// original figures.
    pub fn retarget(&self, original: &Efforts) -> (Efforts, EstimationMethod) {
        let on_target = !original.is_empty() && original.keys().all(|p| self.targets.contains(p));
        let mut efforts: Efforts = original
            .iter()
            .filter(|(p, _)| self.targets.contains(*p))
            .map(|(p, h)| (*p, cap_hours(*p, *h)))
            .collect();

        if on_target {
            return (efforts, EstimationMethod::Historical);
        }

        let baseline = baseline_hours(original);
        for platform in &self.targets {
            efforts.entry(*platform).or_insert_with(|| self.estimate(*platform, baseline));
        }
        (efforts, EstimationMethod::RuleBased)
    }

    /// Turn model-supplied `(platform label, hours)` pairs into efforts:
    /// unknown labels and off-target platforms are dropped, negative values
    /// become zero, and everything is capped.
    pub fn sanitize<'a, I>(&self, raw: I) -> Efforts
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut efforts = Efforts::new();
        for (label, hours) in raw {
            let Some(platform) = Platform::normalize(label) else {
                tracing::debug!(platform = label, "Dropping effort for unknown platform");
                continue;
            };
            if !self.targets.contains(&platform) {
                continue;
            }
            let hours = if hours.is_finite() && hours > 0.0 { hours.round() as u32 } else { 0 };
            efforts.insert(platform, cap_hours(platform, hours));
        }
        efforts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(platforms: &[Platform]) -> BTreeSet<Platform> {
        platforms.iter().copied().collect()
    }

    fn efforts(pairs: &[(Platform, u32)]) -> Efforts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_baseline_prefers_frontend_mean() {
        let mixed = efforts(&[(Platform::Flutter, 10), (Platform::WebApp, 6), (Platform::Api, 30)]);
        assert_eq!(baseline_hours(&mixed), 8.0);
        assert_eq!(baseline_hours(&efforts(&[(Platform::Api, 12)])), 8.0);
        assert!((baseline_hours(&efforts(&[(Platform::Cms, 7)])) - 10.0).abs() < 1e-9);
        assert_eq!(baseline_hours(&Efforts::new()), DEFAULT_BASELINE_HOURS);
    }

    #[test]
    fn test_estimate_scales_and_clamps() {
        let medium = RuleBasedEstimator::new(targets(&[Platform::Api]), Complexity::Medium);
        assert_eq!(medium.estimate(Platform::Api, 8.0), 12);
        assert_eq!(medium.estimate(Platform::Api, 100.0), 32);
        assert_eq!(medium.estimate(Platform::Cms, 100.0), 24);
        assert_eq!(medium.estimate(Platform::Flutter, 0.0), 1);

        let complex = RuleBasedEstimator::new(targets(&[Platform::Api]), Complexity::Complex);
        assert_eq!(complex.estimate(Platform::Flutter, 8.0), 12);

        let simple = RuleBasedEstimator::new(targets(&[Platform::Api]), Complexity::Simple);
        assert_eq!(simple.estimate(Platform::Cms, 10.0), 5);
    }

    fn medium(platforms: &[Platform]) -> RuleBasedEstimator {
        RuleBasedEstimator::new(targets(platforms), Complexity::Medium)
    }

    #[test]
    fn test_retarget_keeps_on_target_figures() {
        let estimator = medium(&[Platform::Flutter, Platform::Api]);
        let (result, method) = estimator.retarget(&efforts(&[(Platform::Flutter, 40)]));
        assert_eq!(result, efforts(&[(Platform::Flutter, 32)]));
        assert_eq!(method, EstimationMethod::Historical);
    }

    #[test]
    fn test_retarget_replaces_off_target_platforms() {
        let estimator = medium(&[Platform::Flutter, Platform::Api]);
        let (result, method) =
            estimator.retarget(&efforts(&[(Platform::WebApp, 12), (Platform::Api, 10)]));
        assert_eq!(result, efforts(&[(Platform::Flutter, 12), (Platform::Api, 10)]));
        assert_eq!(method, EstimationMethod::RuleBased);
    }

    #[test]
    fn test_retarget_empty_uses_default_baseline() {
        let estimator = medium(&[Platform::WebApp, Platform::Cms]);
        let (result, method) = estimator.retarget(&Efforts::new());
        assert_eq!(result, efforts(&[(Platform::WebApp, 8), (Platform::Cms, 6)]));
        assert_eq!(method, EstimationMethod::RuleBased);
    }

    #[test]
    fn test_sanitize_model_efforts() {
        let estimator = medium(&[Platform::Flutter, Platform::Cms]);
        let result =
            estimator.sanitize([("Mobile", 12.4), ("CMS", 90.0), ("API", 8.0), ("Desktop", 5.0)]);
        assert_eq!(result, efforts(&[(Platform::Flutter, 12), (Platform::Cms, 24)]));
    }
}
