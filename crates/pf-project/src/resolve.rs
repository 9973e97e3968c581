//! Location/year resolution.

use pf_core::{Location, format_coordinate};
use tracing::{debug, info};

use crate::layout::InputLayout;
use crate::metadata::ProjectMetadata;
use crate::settings::Settings;
use crate::{ProjectError, ProjectResult};

/// Values supplied at the call site; `None` falls back to metadata, then settings.
#[derive(Debug, Clone, Default)]
pub struct LocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub year: Option<i32>,
}

/// Fill missing location fields and persist the result to the project metadata.
///
/// Precedence per field: request, persisted metadata, `settings.default_location`.
pub fn resolve_location(
    settings: &Settings,
    layout: &InputLayout,
    request: &LocationRequest,
) -> ProjectResult<Location> {
    let mut metadata = ProjectMetadata::load(layout)?;
    let defaults = &settings.default_location;

    let latitude = pick("latitude", request.latitude, metadata.latitude()?, defaults.latitude)?;
    let longitude = pick(
        "longitude",
        request.longitude,
        metadata.longitude()?,
        defaults.longitude,
    )?;
    let country = pick(
        "country",
        request.country.clone(),
        metadata.country(),
        defaults.country.clone(),
    )?;
    let year = pick("year", request.year, metadata.year()?, defaults.year)?;

    metadata.set_location(latitude, longitude, &country, year);
    metadata.save()?;

    let location = Location::new(latitude, longitude, country, year);
    info!(
        latitude = %format_coordinate(location.latitude),
        longitude = %format_coordinate(location.longitude),
        country = %location.country,
        year = location.year,
        "resolved project location"
    );
    Ok(location)
}

fn pick<T: std::fmt::Debug>(
    field: &str,
    requested: Option<T>,
    persisted: Option<T>,
    default: Option<T>,
) -> ProjectResult<T> {
    if let Some(v) = requested {
        debug!(field, value = ?v, "location field from caller");
        return Ok(v);
    }
    if let Some(v) = persisted {
        debug!(field, value = ?v, "location field from project metadata");
        return Ok(v);
    }
    if let Some(v) = default {
        debug!(field, value = ?v, "location field from settings default");
        return Ok(v);
    }
    Err(ProjectError::Missing {
        what: format!("{field} is required but not given and not stored in project metadata"),
    })
}
