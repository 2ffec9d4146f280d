// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Resumable copy of scanned images into `output/<category>/<city>/`
//!
//! Idempotence is keyed on the filename alone: once a filename is in the
//! completion log it is never copied again, even if a later scan gives it a
//! different category or city. Clear the completion log to re-sort.
//!
//! Rows whose extraction failed carry the error category. They are copied
//! into that folder for review but never logged, so the next scan-and-sort
//! can place them properly; the review copy is removed once that happens.

use std::collections::HashSet;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{is_single_component, CategoryLabels};
use crate::journal::{CompletionEntry, CompletionLog, ErrorLog, FailureEvent, Stage};
use crate::summary::{SummaryRow, SummaryStore};
use crate::{LensortError, Result};

/// What happened to one summary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Copied into the given directory and logged
    Copied(PathBuf),
    /// Already in the completion log
    Skipped,
    /// Dry run: would have been copied into the given directory
    Planned(PathBuf),
    /// Extraction failed: copied into the error folder, not logged
    Parked(PathBuf),
    Failed(FailureEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortReport {
    pub copied: usize,
    pub skipped: usize,
    pub planned: usize,
    pub parked: usize,
    pub failed: usize,
}

impl SortReport {
    fn record(&mut self, outcome: &SortOutcome) {
        match outcome {
            SortOutcome::Copied(_) => self.copied += 1,
            SortOutcome::Skipped => self.skipped += 1,
            SortOutcome::Planned(_) => self.planned += 1,
            SortOutcome::Parked(_) => self.parked += 1,
            SortOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.copied + self.skipped + self.planned + self.parked + self.failed
    }
}

pub struct SortExecutor {
    source_dir: PathBuf,
    output_dir: PathBuf,
    completion: CompletionLog,
    errors: ErrorLog,
    error_category: String,
    dry_run: bool,
}

impl SortExecutor {
    pub fn new(source_dir: PathBuf, output_dir: PathBuf, completion: CompletionLog, errors: ErrorLog) -> Self {
        Self {
            source_dir,
            output_dir,
            completion,
            errors,
            error_category: CategoryLabels::default().error,
            dry_run: false,
        }
    }

    /// Plan only: nothing is created, copied or logged.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Category marking rows whose extraction failed.
    pub fn with_error_category(mut self, category: impl Into<String>) -> Self {
        self.error_category = category.into();
        self
    }

    /// Check inputs, load the summary and sort it. Nothing is written when
    /// the source folder or the summary is missing.
    pub fn run_from_summary(&self, store: &SummaryStore) -> Result<SortReport> {
        if !self.source_dir.is_dir() {
            return Err(LensortError::MissingInput(self.source_dir.clone()));
        }
        if !store.exists() {
            return Err(LensortError::MissingInput(store.path().to_path_buf()));
        }
        let rows = store.read_all()?;
        self.run(&rows)
    }

    pub fn run(&self, rows: &[SummaryRow]) -> Result<SortReport> {
        let mut processed = self.completion.processed_filenames()?;
        info!(
            "Starting sort: {} summary entries, {} already placed",
            rows.len(),
            processed.len()
        );
        if self.dry_run {
            warn!("DRY RUN MODE - files will not be copied");
        }

        let mut report = SortReport::default();
        for row in rows {
            let outcome = self.place(row, &mut processed);
            report.record(&outcome);
        }

        info!(
            "Sort finished: {} copied, {} skipped, {} planned, {} parked, {} failed",
            report.copied, report.skipped, report.planned, report.parked, report.failed
        );
        Ok(report)
    }

    /// Handle one row. `processed` grows as files are placed, so a filename
    /// repeated in the summary is only copied once.
    pub fn place(&self, row: &SummaryRow, processed: &mut HashSet<String>) -> SortOutcome {
        if processed.contains(&row.filename) {
            debug!("Already placed: {}", row.filename);
            return SortOutcome::Skipped;
        }

        let final_dir = match self.destination_dir(row) {
            Ok(dir) => dir,
            Err(e) => return self.fail(row, e),
        };

        let parked = row.category == self.error_category;

        if self.dry_run {
            info!("DRY RUN: Would copy {} to {:?}", row.filename, final_dir);
            if !parked {
                processed.insert(row.filename.clone());
            }
            return SortOutcome::Planned(final_dir);
        }

        let source = self.source_dir.join(&row.filename);
        if let Err(e) = copy_into(&source, &final_dir, &row.filename) {
            return self.fail(row, e);
        }

        if parked {
            info!("Copied {} to {:?} for review, not logged", row.filename, final_dir);
            return SortOutcome::Parked(final_dir);
        }

        let entry = CompletionEntry {
            filename: row.filename.clone(),
            destination: final_dir.clone(),
        };
        if let Err(e) = self.completion.append(&entry) {
            return self.fail(row, e);
        }

        processed.insert(row.filename.clone());
        info!("Copied {} to {:?}", row.filename, final_dir);
        self.clear_parked_copies(&row.filename, &final_dir);
        SortOutcome::Copied(final_dir)
    }

    /// Remove review copies an earlier run left under the error category.
    fn clear_parked_copies(&self, filename: &str, final_dir: &Path) {
        let Ok(cities) = fs::read_dir(self.output_dir.join(&self.error_category)) else {
            return;
        };
        for city in cities.filter_map(|e| e.ok()) {
            let dir = city.path();
            let stale = dir.join(filename);
            if dir == final_dir || !stale.is_file() {
                continue;
            }
            match fs::remove_file(&stale) {
                Ok(()) => debug!("Removed review copy {:?}", stale),
                Err(e) => warn!("Could not remove review copy {:?}: {}", stale, e),
            }
        }
    }

    /// `output/<category>/<city>`, refusing anything that would escape it.
    pub fn destination_dir(&self, row: &SummaryRow) -> Result<PathBuf> {
        for (what, value) in [
            ("filename", &row.filename),
            ("category", &row.category),
            ("city", &row.city),
        ] {
            if !is_single_component(value) {
                return Err(LensortError::Placement(format!(
                    "{} {:?} is not a plain file or folder name",
                    what, value
                )));
            }
        }
        Ok(self.output_dir.join(&row.category).join(&row.city))
    }

    fn fail(&self, row: &SummaryRow, error: LensortError) -> SortOutcome {
        let event = FailureEvent::new(row.filename.as_str(), Stage::Placement, &error);
        warn!("Failed to place {}: {}", row.filename, error);
        self.errors.record(&event);
        SortOutcome::Failed(event)
    }
}

/// Create `dir` if needed and copy `source` into it, keeping permissions and
/// access/modification times.
///
/// Times and permissions are set through the handle that wrote the data, so a
/// read-only source still yields a complete copy. An existing target (a
/// review copy from an earlier run) is replaced.
fn copy_into(source: &Path, dir: &Path, filename: &str) -> Result<()> {
    let mut input = File::open(source)?;
    let meta = input.metadata()?;

    fs::create_dir_all(dir)?;
    let target = dir.join(filename);
    if target.is_file() {
        fs::remove_file(&target)?;
    }
    let mut output = File::create(&target)?;
    io::copy(&mut input, &mut output)?;

    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    output.set_times(times)?;
    output.set_permissions(meta.permissions())?;
    Ok(())
}
