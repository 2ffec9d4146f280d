// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The per-run summary table: one CSV row per scanned image
//!
//! The file is rewritten from scratch on every scan. Columns are matched by
//! header name, so files from older scans without `Scene_Type` still load.

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::record::{Decision, FeatureRecord, SceneType, UNKNOWN_LOCATION};
use crate::{LensortError, Result};

/// Column order of the summary file.
pub const HEADER: [&str; 9] = [
    "filename",
    "AI_Folder",
    "Offline_City",
    "People_Count",
    "Top_Class_ID",
    "Top_Class_Name",
    "GPS_Latitude",
    "GPS_Longitude",
    "Scene_Type",
];

/// A feature record joined with its decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub filename: String,
    #[serde(rename = "AI_Folder")]
    pub category: String,
    #[serde(rename = "Offline_City")]
    pub city: String,
    #[serde(rename = "People_Count", default, deserialize_with = "lenient_count")]
    pub person_count: u32,
    #[serde(rename = "Top_Class_ID", default, deserialize_with = "csv::invalid_option")]
    pub top_class_id: Option<u32>,
    #[serde(rename = "Top_Class_Name", default)]
    pub top_class_name: Option<String>,
    #[serde(rename = "GPS_Latitude", default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(rename = "GPS_Longitude", default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    #[serde(rename = "Scene_Type", default, deserialize_with = "csv::invalid_option")]
    pub scene_type: Option<SceneType>,
}

impl SummaryRow {
    pub fn new(record: FeatureRecord, decision: Decision) -> Self {
        Self {
            filename: record.filename,
            category: decision.category,
            city: record.city,
            person_count: record.person_count,
            top_class_id: record.top_class_id,
            top_class_name: record.top_class_name,
            latitude: record.latitude,
            longitude: record.longitude,
            scene_type: decision.scene_type,
        }
    }

    /// Row recorded for an image whose extraction failed.
    pub fn failed(filename: String, error_category: &str) -> Self {
        Self {
            filename,
            category: error_category.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
            person_count: 0,
            top_class_id: None,
            top_class_name: None,
            latitude: None,
            longitude: None,
            scene_type: None,
        }
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<u32, D::Error> {
    let raw = String::deserialize(de)?;
    let raw = raw.trim();
    Ok(raw
        .parse::<u32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && *v <= f64::from(u32::MAX))
                .map(|v| v as u32)
        })
        .unwrap_or(0))
}

/// CSV-backed summary table.
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Truncate the file and start a fresh table.
    pub fn writer(&self) -> Result<SummaryWriter> {
        SummaryWriter::create(&self.path)
    }

    /// Replace the table with `rows`.
    pub fn write_all(&self, rows: &[SummaryRow]) -> Result<()> {
        let mut writer = self.writer()?;
        for row in rows {
            writer.append(row)?;
        }
        writer.finish()
    }

    /// Read every row back. A missing file is a [`LensortError::MissingInput`].
    pub fn read_all(&self) -> Result<Vec<SummaryRow>> {
        if !self.path.exists() {
            return Err(LensortError::MissingInput(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        Self::read_from(file)
    }

    /// Parse a summary table from any byte source. Rows that cannot be
    /// parsed are logged and skipped.
    pub fn read_from<R: Read>(source: R) -> Result<Vec<SummaryRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);

        let mut rows = Vec::new();
        for (index, record) in reader.deserialize::<SummaryRow>().enumerate() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => warn!("Skipping summary row {}: {}", index + 1, e),
            }
        }
        Ok(rows)
    }
}

/// Streams rows into a freshly truncated summary file.
pub struct SummaryWriter {
    writer: csv::Writer<File>,
}

impl SummaryWriter {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Append one row and flush it, so an interrupted scan keeps what it
    /// already decided.
    pub fn append(&mut self, row: &SummaryRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
