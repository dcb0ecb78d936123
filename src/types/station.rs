//! Defines the data structures representing reference weather stations parsed from the
//! GHCN station registry.

use crate::types::location::LatLon;
use serde::{Deserialize, Serialize};

/// Represents a single reference weather station from the fixed-width registry.
///
/// Records are immutable once parsed. They are retained after matching so the
/// station's region code can be attached to every daily row fetched for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StationRecord {
    /// The unique registry identifier (e.g., "USC00144972").
    pub id: String,
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
    /// The region code (state, province, ...), empty when the registry has none.
    pub region: String,
    /// Human-readable station name.
    pub name: String,
}

impl StationRecord {
    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }
}
