// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Extraction stage: run the collaborators on every image and stream the
//! decisions into the summary table

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, RuleConfig};
use crate::geocoder::{Geocoder, OfflineGeocoder};
use crate::journal::{ErrorLog, FailureEvent, Stage};
use crate::record::{Decision, FeatureRecord};
use crate::rules::ClassificationEngine;
use crate::summary::{SummaryRow, SummaryStore};
use crate::vision::{OllamaVision, PersonDetector, SceneClassifier};
use crate::{LensortError, Result};

/// Extensions accepted as input, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Collaborators and ruleset for one scan. Built at run start, dropped at
/// run end.
pub struct ExtractionContext {
    detector: Arc<dyn PersonDetector>,
    classifier: Arc<dyn SceneClassifier>,
    geocoder: Arc<dyn Geocoder>,
    engine: ClassificationEngine,
}

impl ExtractionContext {
    pub fn new(
        detector: Arc<dyn PersonDetector>,
        classifier: Arc<dyn SceneClassifier>,
        geocoder: Arc<dyn Geocoder>,
        engine: ClassificationEngine,
    ) -> Self {
        Self {
            detector,
            classifier,
            geocoder,
            engine,
        }
    }

    /// Wire up the Ollama vision backend and the offline geocoder. A
    /// configured but unreadable cities table is fatal.
    pub fn from_config(config: &AppConfig, rules: RuleConfig) -> Result<Self> {
        rules.validate()?;
        let vision = Arc::new(OllamaVision::new(&config.engine, &config.prompts)?);

        let geocoder = match &config.geocoder.cities_path {
            Some(path) => OfflineGeocoder::from_csv(Path::new(path))?,
            None => {
                warn!("No cities table configured; every photo goes to Unknown_Location");
                OfflineGeocoder::empty()
            }
        };

        Ok(Self::new(
            vision.clone(),
            vision,
            Arc::new(geocoder),
            ClassificationEngine::new(rules),
        ))
    }

    pub fn engine(&self) -> &ClassificationEngine {
        &self.engine
    }

    /// Gather facts for one image and decide its category.
    pub async fn extract(&self, path: &Path) -> std::result::Result<(FeatureRecord, Decision), FailureEvent> {
        let filename = file_name(path);

        let person_count = self
            .detector
            .count_people(path)
            .await
            .map_err(|e| FailureEvent::new(filename.as_str(), Stage::Detection, e))?;

        let bucket = self.engine.bucket(person_count);
        let ranked = if self.engine.needs_classification(bucket) {
            self.classifier
                .classify(path, self.engine.rules().top_k)
                .await
                .map_err(|e| FailureEvent::new(filename.as_str(), Stage::Classification, e))?
        } else {
            Vec::new()
        };
        debug!("{}: {} people ({:?}), classes {:?}", filename, person_count, bucket, ranked);

        let location = self
            .geocoder
            .locate(path)
            .map_err(|e| FailureEvent::new(filename.as_str(), Stage::Geocoding, e))?;

        let record = FeatureRecord::new(filename, person_count, &ranked, location);
        let decision = self.engine.decide(record.person_count, &record.ranked_class_names);
        Ok((record, decision))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub images: usize,
    pub failed: usize,
}

/// Scan `source_dir` and rewrite the summary table.
///
/// The source folder is checked before the summary is touched. Per-image
/// failures are recorded as error rows plus an error-log line; the scan
/// carries on with the next image.
pub async fn scan(
    ctx: &ExtractionContext,
    source_dir: &Path,
    store: &SummaryStore,
    errors: &ErrorLog,
) -> Result<ScanReport> {
    if !source_dir.is_dir() {
        return Err(LensortError::MissingInput(source_dir.to_path_buf()));
    }

    let images = list_images(source_dir)?;
    let mut report = ScanReport::default();
    if images.is_empty() {
        info!("No images found in {:?}. Nothing to do.", source_dir);
        return Ok(report);
    }

    info!("Starting metadata scan. Found {} images.", images.len());
    let error_label = ctx.engine.rules().labels.error.clone();
    let mut writer = store.writer()?;

    for path in images {
        let row = match ctx.extract(&path).await {
            Ok((record, decision)) => {
                info!("{} -> {} ({})", record.filename, decision.category, record.city);
                SummaryRow::new(record, decision)
            }
            Err(event) => {
                warn!("{} failed during {}: {}", event.filename, event.stage, event.reason);
                errors.record(&event);
                report.failed += 1;
                SummaryRow::failed(event.filename, &error_label)
            }
        };
        writer.append(&row)?;
        report.images += 1;
    }

    writer.finish()?;
    info!(
        "Scan complete: {} images, {} failed. Review results in {:?}",
        report.images,
        report.failed,
        store.path()
    );
    Ok(report)
}

/// Image files directly inside `dir`, sorted by name. Hidden files are
/// skipped.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort();
    Ok(images)
}

pub fn is_image(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    if hidden {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
