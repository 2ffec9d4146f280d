// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Offline GPS-to-city resolution

use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::is_single_component;
use crate::gps;
use crate::record::{Location, UNKNOWN_LOCATION};
use crate::{LensortError, Result};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Resolves where an image was taken.
pub trait Geocoder: Send + Sync {
    fn locate(&self, path: &Path) -> Result<Location>;
}

/// A row of the cities table.
#[derive(Debug, Clone, Deserialize)]
pub struct City {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

/// Nearest-city lookup over a table loaded once at startup.
pub struct OfflineGeocoder {
    cities: Vec<City>,
}

impl OfflineGeocoder {
    /// A geocoder that knows no cities: coordinates are still reported, the
    /// city is always `Unknown_Location`.
    pub fn empty() -> Self {
        Self { cities: Vec::new() }
    }

    pub fn with_cities(cities: Vec<City>) -> Self {
        Self { cities }
    }

    /// Load a `lat,lon,name[,...]` table with a header row. Extra columns
    /// (admin regions, country code) are ignored.
    pub fn from_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LensortError::MissingInput(path.to_path_buf()));
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut cities = Vec::new();
        for record in reader.deserialize() {
            let city: City = record?;
            cities.push(city);
        }
        info!("Loaded {} cities from {:?}", cities.len(), path);
        Ok(Self { cities })
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<&City> {
        self.cities.iter().min_by(|a, b| {
            let da = haversine_km(latitude, longitude, a.lat, a.lon);
            let db = haversine_km(latitude, longitude, b.lat, b.lon);
            da.total_cmp(&db)
        })
    }

    /// City folder name for a coordinate pair.
    pub fn city_for(&self, latitude: f64, longitude: f64) -> String {
        self.nearest(latitude, longitude)
            .map(|c| sanitize_city(&c.name))
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }
}

impl Geocoder for OfflineGeocoder {
    fn locate(&self, path: &Path) -> Result<Location> {
        match gps::read_coordinates(path)? {
            Some((latitude, longitude)) => {
                let city = self.city_for(latitude, longitude);
                debug!("{:?} at ({}, {}) -> {}", path, latitude, longitude, city);
                Ok(Location {
                    city,
                    latitude: Some(latitude),
                    longitude: Some(longitude),
                })
            }
            None => Ok(Location::unknown()),
        }
    }
}

/// Make a place name safe to use as one folder: commas dropped, spaces
/// become underscores. Anything still not a plain folder name maps to
/// `Unknown_Location`.
pub fn sanitize_city(name: &str) -> String {
    let clean = name.trim().replace(',', "").replace(' ', "_");
    if is_single_component(&clean) {
        clean
    } else {
        UNKNOWN_LOCATION.to_string()
    }
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
