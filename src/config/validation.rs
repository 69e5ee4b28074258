use super::schema::EngineSettings;
use crate::MAX_CRITERIA;

/// Validate engine settings before use.
/// Returns all validation errors at once (not just the first).
pub fn validate_settings(settings: &EngineSettings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if !settings.max_score.is_finite() || settings.max_score <= 0.0 {
        errors.push(format!(
            "settings.max_score: must be positive and finite, got {}",
            settings.max_score
        ));
    }

    if !(settings.weight_tolerance > 0.0 && settings.weight_tolerance < 1.0) {
        errors.push(format!(
            "settings.weight_tolerance: must be in (0, 1), got {}",
            settings.weight_tolerance
        ));
    }

    if !settings.convexity_epsilon.is_finite() || settings.convexity_epsilon < 0.0 {
        errors.push(format!(
            "settings.convexity_epsilon: must be non-negative, got {}",
            settings.convexity_epsilon
        ));
    }

    if !(0.0..=1.0).contains(&settings.base_penalty_weight) {
        errors.push(format!(
            "settings.base_penalty_weight: must be in [0, 1], got {}",
            settings.base_penalty_weight
        ));
    }

    if !(0.0..=1.0).contains(&settings.baseline_fixed_penalty) {
        errors.push(format!(
            "settings.baseline_fixed_penalty: must be in [0, 1], got {}",
            settings.baseline_fixed_penalty
        ));
    }

    for (name, ceiling) in settings.ceilings.all() {
        if ceiling == 0 || ceiling > MAX_CRITERIA {
            errors.push(format!(
                "settings.ceilings.{}: must be between 1 and {}, got {}",
                name, MAX_CRITERIA, ceiling
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
