// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rule engine mapping vision signals to a destination category
//!
//! The engine is a pure function of `(person_count, ranked_class_names,
//! RuleConfig)`. It never fails and never touches the filesystem; callers ask
//! [`ClassificationEngine::bucket`] first to learn whether the classifier has
//! to run at all, then hand whatever it produced to
//! [`ClassificationEngine::decide`].

use crate::config::RuleConfig;
use crate::record::{Decision, SceneType};

/// Person-count range an image falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeopleBucket {
    /// No people: check for plants
    Empty,
    /// `1..min_session_people`
    Portrait,
    /// `min_session_people..=max_session_people`
    Session,
    /// Above `max_session_people`, treated as detector noise
    Crowd,
}

#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    rules: RuleConfig,
}

impl ClassificationEngine {
    pub fn new(rules: RuleConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    pub fn bucket(&self, person_count: u32) -> PeopleBucket {
        if person_count == 0 {
            PeopleBucket::Empty
        } else if person_count < self.rules.min_session_people {
            PeopleBucket::Portrait
        } else if person_count <= self.rules.max_session_people {
            PeopleBucket::Session
        } else {
            PeopleBucket::Crowd
        }
    }

    /// Whether images in `bucket` need scene classification.
    pub fn needs_classification(&self, bucket: PeopleBucket) -> bool {
        match bucket {
            PeopleBucket::Empty => true,
            PeopleBucket::Session => self.rules.infer_scene_type,
            PeopleBucket::Portrait | PeopleBucket::Crowd => false,
        }
    }

    /// Decide the category. `ranked` is ignored for buckets that do not
    /// classify.
    pub fn decide<S: AsRef<str>>(&self, person_count: u32, ranked: &[S]) -> Decision {
        let labels = &self.rules.labels;
        match self.bucket(person_count) {
            PeopleBucket::Empty => {
                let category = if contains_any(ranked, &self.rules.plant_keywords) {
                    &labels.plants
                } else {
                    &labels.catch_all
                };
                Decision {
                    category: category.clone(),
                    scene_type: self.rules.infer_scene_type.then(|| self.scene_type(ranked)),
                }
            }
            PeopleBucket::Portrait => Decision {
                category: labels.portrait.clone(),
                scene_type: None,
            },
            PeopleBucket::Session if !self.rules.infer_scene_type => Decision {
                category: labels.session.clone(),
                scene_type: None,
            },
            PeopleBucket::Session => {
                let scene = self.scene_type(ranked);
                let category = match scene {
                    SceneType::Indoor => &labels.session,
                    SceneType::Outdoor | SceneType::Unknown => &labels.catch_all,
                };
                Decision {
                    category: category.clone(),
                    scene_type: Some(scene),
                }
            }
            PeopleBucket::Crowd => Decision {
                category: labels.catch_all.clone(),
                scene_type: None,
            },
        }
    }

    /// Indoor wins over Outdoor when both keyword sets match.
    pub fn scene_type<S: AsRef<str>>(&self, ranked: &[S]) -> SceneType {
        if contains_any(ranked, &self.rules.indoor_keywords) {
            SceneType::Indoor
        } else if contains_any(ranked, &self.rules.outdoor_keywords) {
            SceneType::Outdoor
        } else {
            SceneType::Unknown
        }
    }
}

/// Case-sensitive, unanchored substring match of any keyword in any name.
fn contains_any<S: AsRef<str>>(names: &[S], keywords: &[String]) -> bool {
    names.iter().any(|name| {
        let name = name.as_ref();
        keywords.iter().any(|k| name.contains(k.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_CLASSES: [&str; 0] = [];

    fn engine() -> ClassificationEngine {
        ClassificationEngine::new(RuleConfig::default())
    }

    #[test]
    fn test_buckets() {
        let engine = engine();
        assert_eq!(engine.bucket(0), PeopleBucket::Empty);
        assert_eq!(engine.bucket(1), PeopleBucket::Portrait);
        assert_eq!(engine.bucket(5), PeopleBucket::Portrait);
        assert_eq!(engine.bucket(6), PeopleBucket::Session);
        assert_eq!(engine.bucket(70), PeopleBucket::Session);
        assert_eq!(engine.bucket(71), PeopleBucket::Crowd);
    }

    #[test]
    fn test_portrait_ignores_labels() {
        let engine = engine();
        for count in 1..6 {
            for labels in [vec!["conference_room"], vec!["daisy"], vec![]] {
                let decision = engine.decide(count, &labels);
                assert_eq!(decision.category, "Omar");
                assert_eq!(decision.scene_type, None);
            }
        }
        assert!(!engine.needs_classification(PeopleBucket::Portrait));
    }

    #[test]
    fn test_crowd_is_catch_all_without_scene() {
        let engine = engine();
        for count in [71, 120, 10_000] {
            let decision = engine.decide(count, &["conference_room"]);
            assert_eq!(decision.category, "KPMG_Offices");
            assert_eq!(decision.scene_type, None);
        }
        assert!(!engine.needs_classification(PeopleBucket::Crowd));
    }

    #[test]
    fn test_empty_frame_plants() {
        let engine = engine();
        let decision = engine.decide(0, &["daisy", "grass"]);
        assert_eq!(decision.category, "Plants");
        assert_eq!(decision.scene_type, Some(SceneType::Unknown));

        // substring, unanchored
        assert_eq!(engine.decide(0, &["houseplant"]).category, "Plants");
        assert_eq!(engine.decide(0, &["desk", "pot", "christmas_tree"]).category, "Plants");
    }

    #[test]
    fn test_empty_frame_without_plants_is_catch_all() {
        let engine = engine();
        let decision = engine.decide(0, &["desk", "monitor"]);
        assert_eq!(decision.category, "KPMG_Offices");
        assert_eq!(decision.scene_type, Some(SceneType::Indoor));
    }

    #[test]
    fn test_plant_match_is_case_sensitive() {
        let engine = engine();
        assert_eq!(engine.decide(0, &["Flower_Pot"]).category, "KPMG_Offices");
    }

    #[test]
    fn test_session_indoor() {
        let engine = engine();
        let decision = engine.decide(8, &["conference_room", "chair"]);
        assert_eq!(decision.scene_type, Some(SceneType::Indoor));
        assert_eq!(decision.category, "Session_Delivery");
    }

    #[test]
    fn test_session_outdoor_and_unknown_are_catch_all() {
        let engine = engine();
        let outdoor = engine.decide(8, &["seashore", "sandbar"]);
        assert_eq!(outdoor.scene_type, Some(SceneType::Outdoor));
        assert_eq!(outdoor.category, "KPMG_Offices");

        let unknown = engine.decide(8, &["jersey", "suit"]);
        assert_eq!(unknown.scene_type, Some(SceneType::Unknown));
        assert_eq!(unknown.category, "KPMG_Offices");
    }

    #[test]
    fn test_indoor_takes_precedence() {
        let engine = engine();
        assert_eq!(engine.scene_type(&["beach", "desk"]), SceneType::Indoor);
        assert_eq!(engine.scene_type(&["beach_wagon", "library"]), SceneType::Indoor);
    }

    #[test]
    fn test_empty_ranked_list() {
        let engine = engine();
        assert_eq!(engine.scene_type(&NO_CLASSES), SceneType::Unknown);
        assert_eq!(engine.decide(0, &NO_CLASSES).category, "KPMG_Offices");
        let session = engine.decide(10, &NO_CLASSES);
        assert_eq!(session.category, "KPMG_Offices");
        assert_eq!(session.scene_type, Some(SceneType::Unknown));
    }

    #[test]
    fn test_legacy_ruleset() {
        let engine = ClassificationEngine::new(RuleConfig::legacy());
        assert_eq!(engine.decide(3, &NO_CLASSES).category, "Omar");

        let session = engine.decide(4, &NO_CLASSES);
        assert_eq!(session.category, "Session_Delivery");
        assert_eq!(session.scene_type, None);
        assert!(!engine.needs_classification(PeopleBucket::Session));

        // no upper cap
        assert_eq!(engine.decide(500, &NO_CLASSES).category, "Session_Delivery");

        let empty = engine.decide(0, &["pot_plant"]);
        assert_eq!(empty.category, "Plants");
        assert_eq!(empty.scene_type, None);
        assert_eq!(engine.decide(0, &["daisy"]).category, "KPMG_Offices");
    }

    #[test]
    fn test_custom_labels() {
        let mut rules = RuleConfig::default();
        rules.labels.portrait = "Portraits".to_string();
        rules.labels.catch_all = "Misc".to_string();
        let engine = ClassificationEngine::new(rules);
        assert_eq!(engine.decide(2, &NO_CLASSES).category, "Portraits");
        assert_eq!(engine.decide(100, &NO_CLASSES).category, "Misc");
    }

    #[test]
    fn test_decide_is_deterministic() {
        let engine = engine();
        let labels = ["conference_room", "sky"];
        assert_eq!(engine.decide(9, &labels), engine.decide(9, &labels));
    }
}
