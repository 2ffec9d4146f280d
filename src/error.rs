// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for lensort

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lensort operations
pub type Result<T> = std::result::Result<T, LensortError>;

/// lensort error types
#[derive(Error, Debug)]
pub enum LensortError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required input (source folder, summary file, cities table) is absent.
    #[error("Missing input: {} not found", .0.display())]
    MissingInput(PathBuf),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Vision backend not available: {0}")]
    VisionUnavailable(String),

    /// The vision backend answered, but not with anything we can use.
    #[error("Malformed vision reply: {0}")]
    Vision(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Placement error: {0}")]
    Placement(String),
}
