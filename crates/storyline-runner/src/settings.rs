//! Host settings.
//!
//! Settings are owned and persisted by the host; the runner only reads
//! them. Every field is optional, so an empty JSON object means "all
//! categories on, default temperatures, built-in prompts".

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::RunnerError;
use crate::extractor::{Category, Extractor};

/// Read-only host preferences.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-category enable flags. Missing categories are enabled.
    pub categories: BTreeMap<Category, bool>,
    /// Per-category temperature overrides.
    pub category_temperatures: BTreeMap<Category, f32>,
    /// Per-extractor temperature overrides, keyed by extractor name.
    pub temperatures: BTreeMap<String, f32>,
    /// Per-extractor prompt template overrides, keyed by extractor name.
    pub prompts: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, RunnerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("failed to read settings {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parse settings from JSON.
    pub fn parse(json: &str) -> Result<Self, RunnerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether extractors in `category` may run.
    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories.get(&category).copied().unwrap_or(true)
    }

    /// Temperature for `extractor`: per-extractor, then per-category, then
    /// the extractor's default.
    pub fn temperature(&self, extractor: &Extractor) -> f32 {
        self.temperatures
            .get(extractor.name())
            .or_else(|| self.category_temperatures.get(&extractor.category))
            .copied()
            .unwrap_or(extractor.default_temperature)
    }

    /// Prompt template override for the named extractor.
    pub fn prompt_override(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use storyline_core::config::SchedulerConfig;

    use super::*;
    use crate::extractor::ExtractorKind;

    #[test]
    fn empty_settings_enable_everything() {
        let settings = Settings::parse("{}").unwrap_or_default();
        assert!(settings.is_enabled(Category::Props));
        assert!(settings.prompt_override("mood").is_none());
    }

    #[test]
    fn temperature_precedence() {
        let json = r#"{
            "categories": {"outfits": false},
            "category_temperatures": {"characters": 0.9},
            "temperatures": {"mood": 0.1}
        }"#;
        let settings = Settings::parse(json);
        assert!(settings.is_ok());
        let Ok(settings) = settings else { return };

        let config = SchedulerConfig::default();
        let mood = Extractor::builtin(ExtractorKind::Mood, &config);
        let position = Extractor::builtin(ExtractorKind::Position, &config);
        let time = Extractor::builtin(ExtractorKind::Time, &config);

        assert!((settings.temperature(&mood) - 0.1).abs() < f32::EPSILON);
        assert!((settings.temperature(&position) - 0.9).abs() < f32::EPSILON);
        assert!((settings.temperature(&time) - time.default_temperature).abs() < f32::EPSILON);
        assert!(!settings.is_enabled(Category::Outfits));
        assert!(settings.is_enabled(Category::Characters));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result = Settings::parse(r#"{"categories": {"weather": true}}"#);
        assert!(matches!(result, Err(RunnerError::Serde(_))));
    }
}
