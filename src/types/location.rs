//! Geographic coordinates and the great-circle distance used for station matching.

use haversine::{distance, Location as HaversineLocation, Units};
use std::f64::consts::PI;

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use region_extract::LatLon;
///
/// let wichita = LatLon(37.6872, -97.3301);
/// assert_eq!(wichita.0, 37.6872); // Latitude
/// assert_eq!(wichita.1, -97.3301); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Great-circle distance to `other` in kilometers on a spherical Earth.
    ///
    /// The haversine term is evaluated with `atan2`, which stays well conditioned for
    /// identical points. At an exact antipode rounding can push the term past 1 and the
    /// square root of `1 - a` turns into NaN; that case is half the circumference.
    pub fn distance_km(&self, other: LatLon) -> f64 {
        let km = distance(
            HaversineLocation {
                latitude: self.0,
                longitude: self.1,
            },
            HaversineLocation {
                latitude: other.0,
                longitude: other.1,
            },
            Units::Kilometers,
        );
        if km.is_nan() {
            PI * EARTH_RADIUS_KM
        } else {
            km
        }
    }
}

/// A point of interest (farm, irrigation district, ...) supplied by the region config.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOfInterest {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SiteOfInterest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }
}
