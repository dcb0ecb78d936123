//! Resolves which reference stations to pull daily weather from.
//!
//! Two policies sit behind [`SelectionPolicy`]: [`NearestToSites`] picks the station
//! closest to each configured site, and [`FirstPerRegion`] picks the first registry
//! station of every configured region when no site coordinates exist.
//! [`select_stations`] chooses between them.

use crate::types::location::{LatLon, SiteOfInterest};
use crate::types::region::RegionFilter;
use crate::types::station::StationRecord;
use log::debug;
use std::collections::HashSet;

/// The nearest station found for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteMatch {
    pub site_id: String,
    pub station_id: String,
    pub distance_km: f64,
}

/// Outcome of a selection run: the deduplicated stations in first-selected order,
/// plus the per-site matches that produced them (empty for the region fallback).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    stations: Vec<StationRecord>,
    matches: Vec<SiteMatch>,
}

impl Selection {
    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn matches(&self) -> &[SiteMatch] {
        &self.matches
    }

    /// `true` when nothing could be selected, e.g. because the catalog was empty.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

pub trait SelectionPolicy {
    /// Selects stations from `catalog`, which is expected in registry order.
    fn select(&self, catalog: &[StationRecord]) -> Selection;
}

/// One match per site; a station nearest to several sites is listed once.
#[derive(Debug, Clone, Copy)]
pub struct NearestToSites<'a> {
    pub sites: &'a [SiteOfInterest],
}

/// The first registry station of each region, in region order. Regions without
/// stations are skipped.
#[derive(Debug, Clone, Copy)]
pub struct FirstPerRegion<'a> {
    pub regions: &'a RegionFilter,
}

/// Finds the station with the smallest great-circle distance to `location`.
///
/// Exact ties keep the station that appears first in `stations`.
pub fn nearest_station(location: LatLon, stations: &[StationRecord]) -> Option<(&StationRecord, f64)> {
    let mut best: Option<(&StationRecord, f64)> = None;
    for station in stations {
        let dist_km = location.distance_km(station.location());
        match best {
            Some((_, best_km)) if dist_km >= best_km => {}
            _ => best = Some((station, dist_km)),
        }
    }
    best
}

impl SelectionPolicy for NearestToSites<'_> {
    fn select(&self, catalog: &[StationRecord]) -> Selection {
        let mut selection = Selection::default();
        let mut selected_ids: HashSet<&str> = HashSet::new();

        for site in self.sites {
            let Some((station, distance_km)) = nearest_station(site.location(), catalog) else {
                // Empty catalog: nothing can match any site.
                break;
            };
            debug!(
                "Site {} -> station {} ({:.1} km)",
                site.id, station.id, distance_km
            );
            selection.matches.push(SiteMatch {
                site_id: site.id.clone(),
                station_id: station.id.clone(),
                distance_km,
            });
            if selected_ids.insert(station.id.as_str()) {
                selection.stations.push(station.clone());
            }
        }
        selection
    }
}

impl SelectionPolicy for FirstPerRegion<'_> {
    fn select(&self, catalog: &[StationRecord]) -> Selection {
        let stations = self
            .regions
            .codes()
            .iter()
            .filter_map(|code| catalog.iter().find(|station| station.region.eq_ignore_ascii_case(code)))
            .cloned()
            .collect();
        Selection {
            stations,
            matches: Vec::new(),
        }
    }
}

/// Runs [`NearestToSites`] when any sites are given, [`FirstPerRegion`] otherwise.
pub fn select_stations(
    sites: &[SiteOfInterest],
    regions: &RegionFilter,
    catalog: &[StationRecord],
) -> Selection {
    if sites.is_empty() {
        FirstPerRegion { regions }.select(catalog)
    } else {
        NearestToSites { sites }.select(catalog)
    }
}
