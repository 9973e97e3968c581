use std::fmt;

use serde::{Deserialize, Serialize};

use crate::numeric::format_coordinate;

/// A fully resolved project location.
///
/// Built once per run by the resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub year: i32,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, country: impl Into<String>, year: i32) -> Self {
        Self {
            latitude,
            longitude,
            country: country.into(),
            year,
        }
    }

    /// The same place in another simulation year.
    pub fn with_year(&self, year: i32) -> Self {
        Self {
            year,
            ..self.clone()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}) {}",
            self.country,
            format_coordinate(self.latitude),
            format_coordinate(self.longitude),
            self.year
        )
    }
}
