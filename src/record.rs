// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-image facts and the decision taken on them

use serde::{Deserialize, Serialize};
use std::fmt;

/// City sentinel used when GPS data is missing or cannot be resolved.
pub const UNKNOWN_LOCATION: &str = "Unknown_Location";

/// Coarse scene type inferred from ranked class names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneType {
    Indoor,
    Outdoor,
    Unknown,
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SceneType::Indoor => "Indoor",
            SceneType::Outdoor => "Outdoor",
            SceneType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One whole-image class suggested by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    /// Model-specific class index, when the backend reports one
    pub id: Option<u32>,
    pub name: String,
}

/// Where a photo was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN_LOCATION.to_string(),
            latitude: None,
            longitude: None,
        }
    }
}

/// Everything the collaborators found out about one image.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub filename: String,
    pub person_count: u32,
    pub top_class_id: Option<u32>,
    pub top_class_name: Option<String>,
    /// Top-K class names, best first. Not persisted.
    pub ranked_class_names: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: String,
}

impl FeatureRecord {
    /// Assemble a record from detector, classifier and geocoder output.
    /// `ranked` is empty when classification was skipped.
    pub fn new(filename: String, person_count: u32, ranked: &[RankedClass], location: Location) -> Self {
        let top = ranked.first();
        Self {
            filename,
            person_count,
            top_class_id: top.and_then(|c| c.id),
            top_class_name: top.map(|c| c.name.clone()),
            ranked_class_names: ranked.iter().map(|c| c.name.clone()).collect(),
            latitude: location.latitude,
            longitude: location.longitude,
            city: location.city,
        }
    }
}

/// Outcome of the rule engine for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Destination folder name
    pub category: String,
    /// Present only when the ruleset ran scene inference for this image
    pub scene_type: Option<SceneType>,
}
