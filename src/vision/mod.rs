// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Vision collaborators: person detection and whole-image classification

pub mod ollama;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::record::RankedClass;
use crate::{LensortError, Result};

pub use ollama::OllamaVision;

/// Counts the people in an image.
#[async_trait]
pub trait PersonDetector: Send + Sync {
    async fn count_people(&self, path: &Path) -> Result<u32>;
}

/// Ranks whole-image classes for an image, best first.
#[async_trait]
pub trait SceneClassifier: Send + Sync {
    async fn classify(&self, path: &Path, top_k: usize) -> Result<Vec<RankedClass>>;
}

#[derive(Debug, Deserialize)]
struct DetectionReply {
    person_count: i64,
}

#[derive(Debug, Deserialize)]
struct ClassificationReply {
    labels: Vec<LabelReply>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelReply {
    Named {
        #[serde(default)]
        id: Option<u32>,
        name: String,
    },
    Bare(String),
}

/// Parse a `{"person_count": n}` answer.
pub fn parse_detection(answer: &str) -> Result<u32> {
    let reply: DetectionReply = serde_json::from_str(json_object(answer)?)
        .map_err(|e| LensortError::Vision(format!("bad detection reply: {}", e)))?;
    u32::try_from(reply.person_count)
        .map_err(|_| LensortError::Vision(format!("negative person count {}", reply.person_count)))
}

/// Parse a `{"labels": [...]}` answer into at most `top_k` classes.
/// Entries may be objects (`{"id": 1, "name": "x"}`) or bare strings.
pub fn parse_classification(answer: &str, top_k: usize) -> Result<Vec<RankedClass>> {
    let reply: ClassificationReply = serde_json::from_str(json_object(answer)?)
        .map_err(|e| LensortError::Vision(format!("bad classification reply: {}", e)))?;

    Ok(reply
        .labels
        .into_iter()
        .map(|label| match label {
            LabelReply::Named { id, name } => RankedClass { id, name: normalize_label(&name) },
            LabelReply::Bare(name) => RankedClass { id: None, name: normalize_label(&name) },
        })
        .filter(|class| !class.name.is_empty())
        .take(top_k)
        .collect())
}

/// Bring a free-form label into ImageNet style: `Conference Room` ->
/// `conference_room`.
pub fn normalize_label(raw: &str) -> String {
    let mut label = raw
        .trim()
        .trim_matches('"')
        .to_lowercase()
        .replace([' ', '-'], "_");
    while label.contains("__") {
        label = label.replace("__", "_");
    }
    label.trim_matches('_').to_string()
}

/// Models like to wrap JSON in prose or code fences; keep the outermost
/// object.
fn json_object(answer: &str) -> Result<&str> {
    match (answer.find('{'), answer.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&answer[start..=end]),
        _ => Err(LensortError::Vision(format!(
            "no JSON object in reply: {:?}",
            answer.chars().take(80).collect::<String>()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection() {
        assert_eq!(parse_detection(r#"{"person_count": 8}"#).unwrap(), 8);
        assert_eq!(
            parse_detection("Sure! ```json\n{\"person_count\": 0}\n```").unwrap(),
            0
        );
    }

    #[test]
    fn test_parse_detection_rejects_garbage() {
        assert!(matches!(parse_detection("three people"), Err(LensortError::Vision(_))));
        assert!(matches!(parse_detection(r#"{"people": 3}"#), Err(LensortError::Vision(_))));
        assert!(matches!(parse_detection(r#"{"person_count": -2}"#), Err(LensortError::Vision(_))));
    }

    #[test]
    fn test_parse_classification() {
        let answer = r#"{"labels": [
            {"id": 634, "name": "Conference Room"},
            {"id": null, "name": "folding chair"},
            "desk",
            {"name": "  "}
        ]}"#;
        let classes = parse_classification(answer, 5).unwrap();
        assert_eq!(
            classes,
            vec![
                RankedClass { id: Some(634), name: "conference_room".to_string() },
                RankedClass { id: None, name: "folding_chair".to_string() },
                RankedClass { id: None, name: "desk".to_string() },
            ]
        );
    }

    #[test]
    fn test_parse_classification_truncates() {
        let answer = r#"{"labels": ["a", "b", "c", "d"]}"#;
        let classes = parse_classification(answer, 2).unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[1].name, "b");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" Street Sign "), "street_sign");
        assert_eq!(normalize_label("\"rose-hip\""), "rose_hip");
        assert_eq!(normalize_label("a  b"), "a_b");
    }
}
