//! Shared confidence math (§3 invariant 6, §4.3).

use crate::model::{ParameterDefinition, ResolutionMethod};

/// Confirmation-tier thresholds from §4.1 / §6.4. Configuration-driven in
/// `Dependencies`; these are the spec defaults.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceThresholds {
    pub confirm_low: f64,
    pub confirm_high: f64,
    pub dynamic_confidence_threshold: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            confirm_low: 0.60,
            confirm_high: 0.85,
            dynamic_confidence_threshold: 0.70,
        }
    }
}

/// `effective_confidence = base(resolution_method) * max(weight, 0.3)`.
#[must_use]
pub fn effective_confidence(method: ResolutionMethod, def: &ParameterDefinition) -> f64 {
    method.base_confidence() * def.effective_weight()
}

/// The three routing tiers from the confidence-gated routing table in
/// §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    AutoApply,
    Confirm,
    Clarify,
}

/// Classifies a minimum effective confidence into a routing tier.
/// Boundaries are inclusive at their lower edge, per §8's boundary tests:
/// exactly 0.85 auto-applies, exactly 0.60 confirms.
#[must_use]
pub fn classify(min_effective_confidence: f64, thresholds: ConfidenceThresholds) -> ConfidenceTier {
    if min_effective_confidence >= thresholds.confirm_high {
        ConfidenceTier::AutoApply
    } else if min_effective_confidence >= thresholds.confirm_low {
        ConfidenceTier::Confirm
    } else {
        ConfidenceTier::Clarify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AllowedValuesSource, ParameterDefinition};

    fn def(weight: f64) -> ParameterDefinition {
        ParameterDefinition {
            name: "p".into(),
            column: None,
            table: None,
            description: String::new(),
            ask_if_missing: false,
            confidence_weight: weight,
            default_value: None,
            default_policy: None,
            allowed_values_source: AllowedValuesSource::Null,
            validation: None,
        }
    }

    #[test]
    fn exact_match_full_weight_is_one() {
        let d = def(1.0);
        assert_eq!(effective_confidence(ResolutionMethod::ExactMatch, &d), 1.0);
    }

    #[test]
    fn weight_floor_prevents_zeroing() {
        let d = def(0.0);
        // 1.0 * max(0.0, 0.3) == 0.3
        assert!((effective_confidence(ResolutionMethod::ExactMatch, &d) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn boundary_exactly_085_is_auto_apply() {
        assert_eq!(classify(0.85, ConfidenceThresholds::default()), ConfidenceTier::AutoApply);
    }

    #[test]
    fn boundary_exactly_060_is_confirm() {
        assert_eq!(classify(0.60, ConfidenceThresholds::default()), ConfidenceTier::Confirm);
    }

    #[test]
    fn below_060_is_clarify() {
        assert_eq!(classify(0.59, ConfidenceThresholds::default()), ConfidenceTier::Clarify);
    }
}
