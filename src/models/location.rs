use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

use crate::error::{EtlError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(length(min = 1))]
    pub city: String,

    #[validate(length(min = 1))]
    pub country: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Location {
    pub fn new(city: &str, country: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// The fixed set of locations every run iterates over.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    /// Build a registry, rejecting invalid coordinates and duplicate (city, country) pairs.
    pub fn new(locations: Vec<Location>) -> Result<Self> {
        let mut seen = HashSet::new();
        for location in &locations {
            location
                .validate()
                .map_err(|e| EtlError::InvalidLocation(format!("{}: {}", location, e)))?;

            if !seen.insert((location.city.clone(), location.country.clone())) {
                return Err(EtlError::InvalidLocation(format!(
                    "duplicate location {}",
                    location
                )));
            }
        }

        Ok(Self { locations })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn find(&self, city: &str, country: &str) -> Option<&Location> {
        self.locations
            .iter()
            .find(|l| l.city == city && l.country == country)
    }

    pub fn default_locations() -> Vec<Location> {
        vec![
            Location::new("Savannah", "USA", 32.0809, -81.0912),
            Location::new("Port Wentworth", "USA", 32.17, -81.17),
            Location::new("Pooler", "USA", 32.11, -81.25),
        ]
    }
}
