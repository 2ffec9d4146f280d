// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Append-only run journals: the completion log that makes sorting resumable,
//! and the plain-text error logs.

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::Result;

/// A successfully placed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub filename: String,
    pub destination: PathBuf,
}

/// Two-column CSV (`filename,destination_directory`), no header. The first
/// column is the idempotence key.
pub struct CompletionLog {
    path: PathBuf,
}

impl CompletionLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry. The file is opened and closed per write.
    pub fn append(&self, entry: &CompletionEntry) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        let destination = entry.destination.to_string_lossy();
        writer.write_record([entry.filename.as_str(), destination.as_ref()])?;
        writer.flush()?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> Result<Vec<CompletionEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to parse completion log entry: {}", e);
                    continue;
                }
            };
            let filename = record.get(0).unwrap_or("");
            if filename.is_empty() {
                continue;
            }
            entries.push(CompletionEntry {
                filename: filename.to_string(),
                destination: PathBuf::from(record.get(1).unwrap_or("")),
            });
        }

        Ok(entries)
    }

    /// Filenames already placed; anything in here is never copied again.
    pub fn processed_filenames(&self) -> Result<HashSet<String>> {
        Ok(self.read_all()?.into_iter().map(|e| e.filename).collect())
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<CompletionEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Forget every placement; the next sort copies everything again.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Classification,
    Geocoding,
    Placement,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detection => "detection",
            Stage::Classification => "classification",
            Stage::Geocoding => "geocoding",
            Stage::Placement => "placement",
        };
        f.write_str(name)
    }
}

/// One per-image failure. Only turned into text when written to an error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEvent {
    pub filename: String,
    pub stage: Stage,
    pub reason: String,
}

impl FailureEvent {
    pub fn new(filename: impl Into<String>, stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            filename: filename.into(),
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn to_line(&self, at: DateTime<Utc>) -> String {
        // keep it on one line whatever the error text looks like
        let reason = self.reason.replace(['\n', '\r'], " ");
        format!(
            "{} {} ({}): {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.filename,
            self.stage,
            reason
        )
    }
}

/// Free-form, append-only failure log. Never parsed back.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, event: &FailureEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", event.to_line(Utc::now()))?;
        Ok(())
    }

    /// Append, downgrading a failure to write the log itself to a warning.
    pub fn record(&self, event: &FailureEvent) {
        if let Err(e) = self.append(event) {
            warn!("Could not write error log {:?}: {} (event: {:?})", self.path, e, event);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lines of a text log, or nothing if it was never written.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::io::read_to_string(File::open(path)?)?;
    Ok(text.lines().map(String::from).collect())
}
