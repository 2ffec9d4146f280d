// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for lensort

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::{LensortError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Input/output locations
    #[serde(default)]
    pub paths: PathConfig,

    /// Vision backend configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Prompt templates for the vision backend
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Classification ruleset
    #[serde(default)]
    pub rules: RuleConfig,

    /// Offline geocoder settings
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PathConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
    #[serde(default = "default_completion_log")]
    pub completion_log: String,
    #[serde(default = "default_extraction_error_log")]
    pub extraction_error_log: String,
    #[serde(default = "default_placement_error_log")]
    pub placement_error_log: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_detect_prompt")]
    pub detect: String,
    #[serde(default = "default_classify_prompt")]
    pub classify: String,
}

/// Thresholds, keyword sets and category labels driving the rule engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleConfig {
    /// Inclusive lower bound of the "many people" bucket
    #[serde(default = "default_min_session_people")]
    pub min_session_people: u32,
    /// Inclusive upper bound; anything above is treated as detector noise
    #[serde(default = "default_max_session_people")]
    pub max_session_people: u32,
    /// How many ranked class names to request from the classifier
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// When false, sessions skip classification and no scene type is recorded
    #[serde(default = "default_true")]
    pub infer_scene_type: bool,
    #[serde(default = "default_indoor_keywords")]
    pub indoor_keywords: Vec<String>,
    #[serde(default = "default_outdoor_keywords")]
    pub outdoor_keywords: Vec<String>,
    #[serde(default = "default_plant_keywords")]
    pub plant_keywords: Vec<String>,
    #[serde(default)]
    pub labels: CategoryLabels,
}

/// Destination folder name for each branch of the ruleset.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CategoryLabels {
    #[serde(default = "default_portrait_label")]
    pub portrait: String,
    #[serde(default = "default_session_label")]
    pub session: String,
    #[serde(default = "default_plants_label")]
    pub plants: String,
    #[serde(default = "default_catch_all_label")]
    pub catch_all: String,
    #[serde(default = "default_error_label")]
    pub error: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GeocoderConfig {
    /// Cities table (`lat,lon,name,...` CSV). Without one every photo lands
    /// in `Unknown_Location`, coordinates are still recorded.
    #[serde(default)]
    pub cities_path: Option<String>,
}

// Default value functions
fn default_source_dir() -> String { "./Unsorted_Images".to_string() }
fn default_output_dir() -> String { "./Sorted_Images".to_string() }
fn default_summary_file() -> String { "image_summary.csv".to_string() }
fn default_completion_log() -> String { "process_log.csv".to_string() }
fn default_extraction_error_log() -> String { "metadata_error_log.txt".to_string() }
fn default_placement_error_log() -> String { "error_log.txt".to_string() }
fn default_engine_url() -> String { "http://localhost:11434".to_string() }
fn default_vision_model() -> String { "llava:7b".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_min_session_people() -> u32 { 6 }
fn default_max_session_people() -> u32 { 70 }
fn default_top_k() -> usize { 5 }
fn default_true() -> bool { true }
fn default_portrait_label() -> String { "Omar".to_string() }
fn default_session_label() -> String { "Session_Delivery".to_string() }
fn default_plants_label() -> String { "Plants".to_string() }
fn default_catch_all_label() -> String { "KPMG_Offices".to_string() }
fn default_error_label() -> String { "Unsorted_AI_Error".to_string() }

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_indoor_keywords() -> Vec<String> {
    strings(&[
        "desk", "monitor", "chair", "auditorium", "conference_room", "library", "kitchen",
        "computer", "cup", "table", "screen", "keyboard", "office", "room", "bookcase",
    ])
}

fn default_outdoor_keywords() -> Vec<String> {
    strings(&[
        "mountain", "seashore", "sky", "car", "street_sign", "building", "flagpole",
        "beach", "field", "valley", "road", "umbrella", "tent",
    ])
}

fn default_plant_keywords() -> Vec<String> {
    strings(&[
        "plant", "flower", "tree", "daisy", "sunflower", "rose", "tulip", "dandelion",
        "orchid", "lily",
    ])
}

fn default_detect_prompt() -> String {
    "Count the people visible in this photo. Answer with JSON only, in the form \
     {\"person_count\": <integer>}.".to_string()
}

fn default_classify_prompt() -> String {
    "Classify this photo using ImageNet class names. List the {top_k} most likely \
     classes, most confident first. Answer with JSON only, in the form \
     {\"labels\": [{\"id\": <imagenet index or null>, \"name\": \"<class_name>\"}]}."
        .to_string()
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            summary_file: default_summary_file(),
            completion_log: default_completion_log(),
            extraction_error_log: default_extraction_error_log(),
            placement_error_log: default_placement_error_log(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            vision_model: default_vision_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            detect: default_detect_prompt(),
            classify: default_classify_prompt(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_session_people: default_min_session_people(),
            max_session_people: default_max_session_people(),
            top_k: default_top_k(),
            infer_scene_type: true,
            indoor_keywords: default_indoor_keywords(),
            outdoor_keywords: default_outdoor_keywords(),
            plant_keywords: default_plant_keywords(),
            labels: CategoryLabels::default(),
        }
    }
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self {
            portrait: default_portrait_label(),
            session: default_session_label(),
            plants: default_plants_label(),
            catch_all: default_catch_all_label(),
            error: default_error_label(),
        }
    }
}

impl RuleConfig {
    /// The first-generation ruleset: 1-3 people are portraits, 4 or more are
    /// sessions with no scene check, empty frames are checked for plants on
    /// the top class only.
    pub fn legacy() -> Self {
        Self {
            plant_keywords: strings(&["plant", "flower"]),
            ..Self::default().with_legacy_thresholds()
        }
    }

    /// Switch to the first-generation thresholds (4+ people is a session, no
    /// crowd cap, top class only, no scene check). Labels and keyword lists
    /// are kept.
    pub fn with_legacy_thresholds(self) -> Self {
        Self {
            min_session_people: 4,
            max_session_people: u32::MAX,
            top_k: 1,
            infer_scene_type: false,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_session_people < 1 {
            return Err(LensortError::Config(
                "rules.min_session_people must be at least 1".to_string(),
            ));
        }
        if self.max_session_people < self.min_session_people {
            return Err(LensortError::Config(format!(
                "rules.max_session_people ({}) is below rules.min_session_people ({})",
                self.max_session_people, self.min_session_people
            )));
        }
        if self.top_k == 0 {
            return Err(LensortError::Config("rules.top_k must be at least 1".to_string()));
        }
        for (branch, label) in self.labels.iter() {
            if !is_single_component(label) {
                return Err(LensortError::Config(format!(
                    "rules.labels.{} ({:?}) must be a plain folder name",
                    branch, label
                )));
            }
        }
        Ok(())
    }
}

impl CategoryLabels {
    /// Labels paired with their config key, for validation and listings.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("portrait", self.portrait.as_str()),
            ("session", self.session.as_str()),
            ("plants", self.plants.as_str()),
            ("catch_all", self.catch_all.as_str()),
            ("error", self.error.as_str()),
        ]
        .into_iter()
    }
}

/// True when `name` is exactly one normal path component (no separators,
/// no `.`/`..`, not empty).
pub fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == std::ffi::OsStr::new(name)
    )
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| LensortError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check everything that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        if self.engine.timeout_secs == 0 {
            return Err(LensortError::Config("engine.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules.min_session_people, 6);
        assert_eq!(config.rules.max_session_people, 70);
        assert_eq!(config.paths.summary_file, "image_summary.csv");
    }

    #[test]
    fn test_legacy_rules_are_valid() {
        let rules = RuleConfig::legacy();
        assert!(rules.validate().is_ok());
        assert!(!rules.infer_scene_type);
        assert_eq!(rules.top_k, 1);
    }

    #[test]
    fn test_legacy_thresholds_keep_labels_and_keywords() {
        let mut rules = RuleConfig::default();
        rules.labels.portrait = "Family".to_string();
        rules.plant_keywords = vec!["cactus".to_string()];

        let legacy = rules.clone().with_legacy_thresholds();
        assert_eq!(legacy.labels, rules.labels);
        assert_eq!(legacy.plant_keywords, rules.plant_keywords);
        assert_eq!(legacy.min_session_people, 4);
        assert_eq!(legacy.max_session_people, u32::MAX);
        assert_eq!(legacy.top_k, 1);
        assert!(!legacy.infer_scene_type);
        assert!(legacy.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"rules": {"min_session_people": 4, "labels": {"portrait": "Family"}}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.rules.min_session_people, 4);
        assert_eq!(config.rules.max_session_people, 70);
        assert_eq!(config.rules.labels.portrait, "Family");
        assert_eq!(config.rules.labels.plants, "Plants");
        assert_eq!(config.paths.output_dir, "./Sorted_Images");
        assert!(config.geocoder.cities_path.is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let rules = RuleConfig {
            min_session_people: 10,
            max_session_people: 5,
            ..RuleConfig::default()
        };
        assert!(matches!(rules.validate(), Err(LensortError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_min() {
        let rules = RuleConfig { min_session_people: 0, ..RuleConfig::default() };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_like_labels() {
        let mut rules = RuleConfig::default();
        rules.labels.catch_all = "../escape".to_string();
        assert!(rules.validate().is_err());

        rules.labels.catch_all = String::new();
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_single_component() {
        assert!(is_single_component("Plants"));
        assert!(is_single_component("New_York_City"));
        assert!(!is_single_component(""));
        assert!(!is_single_component(".."));
        assert!(!is_single_component("."));
        assert!(!is_single_component("a/b"));
        assert!(!is_single_component("/abs"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lensort.json");
        let mut config = AppConfig::default();
        config.rules.top_k = 3;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.rules, config.rules);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.rules, RuleConfig::default());
    }
}
