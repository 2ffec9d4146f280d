// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! lensort: Local AI Photo Triage
//!
//! Counts people and classifies scenes with a local vision model, reads GPS
//! tags, decides a destination category per photo and copies each photo into
//! `output/<category>/<city>/`, resumably.

pub mod config;
pub mod error;
pub mod extract;
pub mod geocoder;
pub mod gps;
pub mod journal;
pub mod ollama;
pub mod record;
pub mod rules;
pub mod sorter;
pub mod summary;
pub mod vision;

pub use config::AppConfig;
pub use error::{LensortError, Result};
