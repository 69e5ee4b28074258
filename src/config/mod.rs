mod schema;
mod validation;

pub use schema::{EngineSettings, TierCeilings};
pub use validation::validate_settings;

use crate::error::{AggregationError, Result};

impl EngineSettings {
    /// Parse settings from YAML text.
    ///
    /// Reading the document is the caller's job; this only parses and
    /// validates it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if:
    /// - The YAML cannot be parsed
    /// - Any field fails `validate_settings` (all problems are reported)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: EngineSettings = serde_saphyr::from_str(yaml)
            .map_err(|e| AggregationError::InvalidInput(format!("invalid settings YAML: {}", e)))?;

        validate_settings(&settings).map_err(|errors| {
            AggregationError::InvalidInput(format!("invalid settings: {}", errors.join("; ")))
        })?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_empty_document_uses_defaults() {
        let settings = EngineSettings::from_yaml("{}").unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_from_yaml_rejects_invalid_values() {
        let err = EngineSettings::from_yaml("max_score: -2.0").unwrap_err();
        assert!(err.to_string().contains("settings.max_score"));
    }

    #[test]
    fn test_from_yaml_rejects_malformed() {
        let err = EngineSettings::from_yaml("max_score: [1, 2").unwrap_err();
        assert!(matches!(err, AggregationError::InvalidInput(_)));
    }
}
