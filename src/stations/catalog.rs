//! Parser and cache for the fixed-width GHCN station registry (`ghcnd-stations.txt`).

use crate::stations::error::CatalogError;
use crate::transport::Transport;
use crate::types::region::RegionFilter;
use crate::types::station::StationRecord;
use crate::utils::describe;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{info, warn};
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::task;

pub const STATIONS_URL: &str = "https://www.ncei.noaa.gov/pub/data/ghcn/daily/ghcnd-stations.txt";
const BINCODE_CACHE_FILE_NAME: &str = "ghcnd_stations.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Lines shorter than this cannot carry the region column and are skipped.
pub const MIN_LINE_WIDTH: usize = 40;

// Character offsets of the registry columns.
const ID: Range<usize> = 0..11;
const LATITUDE: Range<usize> = 12..20;
const LONGITUDE: Range<usize> = 21..30;
const REGION: Range<usize> = 38..40;
const NAME: Range<usize> = 41..71;

/// Parses registry text into station records, in line order.
///
/// Short lines, lines whose coordinates are not finite numbers, and (when `regions` is
/// non-empty) stations outside the configured regions are dropped.
pub fn parse_catalog(text: &str, regions: &RegionFilter) -> Vec<StationRecord> {
    text.lines()
        .filter_map(parse_line)
        .filter(|station| regions.allows(&station.region))
        .collect()
}

fn parse_line(line: &str) -> Option<StationRecord> {
    if line.chars().count() < MIN_LINE_WIDTH {
        return None;
    }
    let latitude = parse_coordinate(column(line, LATITUDE))?;
    let longitude = parse_coordinate(column(line, LONGITUDE))?;
    Some(StationRecord {
        id: column(line, ID).to_string(),
        latitude,
        longitude,
        region: column(line, REGION).to_string(),
        name: column(line, NAME).to_string(),
    })
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Trimmed slice of `line` between two character offsets, clipped to the line end.
fn column(line: &str, range: Range<usize>) -> &str {
    let start = byte_offset(line, range.start);
    let end = byte_offset(line, range.end).max(start);
    line[start..end].trim()
}

fn byte_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

/// The parsed registry, in registry order.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<StationRecord>,
}

impl StationCatalog {
    /// Loads the whole registry, from the bincode cache in `cache_dir` when it decodes,
    /// otherwise by downloading and parsing it and rewriting the cache.
    ///
    /// Only the download can fail the load. An unreadable cache is replaced and a cache
    /// that cannot be written is logged.
    pub async fn load<T: Transport>(transport: &T, cache_dir: &Path) -> Result<Self, CatalogError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        if tokio::fs::metadata(&cache_file).await.is_ok() {
            let path_clone = cache_file.clone();
            match task::spawn_blocking(move || Self::get_cached_stations(&path_clone)).await? {
                Ok(stations) => return Ok(Self { stations }),
                Err(e) => warn!("Discarding station cache: {}", describe(&e)),
            }
        }

        warn!("Station cache not usable. Fetching from URL: {}", STATIONS_URL);
        let bytes = transport.get(STATIONS_URL).await?;
        let text = String::from_utf8_lossy(&bytes);
        let stations = parse_catalog(&text, &RegionFilter::default());
        info!("Parsed {} stations from registry", stations.len());
        if let Err(e) = Self::cache_stations(&stations, &cache_file).await {
            warn!("Station cache not written: {}", describe(&e));
        }
        Ok(Self { stations })
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<StationRecord>, CatalogError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| CatalogError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded, _) =
            bincode::serde::decode_from_slice::<Vec<StationRecord>, _>(&bytes, BINCODE_CONFIG)
                .map_err(|e| CatalogError::CacheDecode(cache_path.to_path_buf(), Box::new(e)))?;
        Ok(decoded)
    }

    /// Writes the cache through a temporary file in the same directory, so an
    /// interrupted write never leaves a truncated cache behind.
    async fn cache_stations(stations: &[StationRecord], cache_path: &Path) -> Result<(), CatalogError> {
        let encoded = bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
            .map_err(|e| CatalogError::CacheEncode(Box::new(e)))?;
        let path = cache_path.to_path_buf();
        task::spawn_blocking(move || {
            let write_error = |e| CatalogError::CacheWrite(path.clone(), e);
            let dir = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir).map_err(write_error)?;
            let mut temp_file = NamedTempFile::new_in(dir).map_err(write_error)?;
            temp_file.write_all(&encoded).map_err(write_error)?;
            temp_file.persist(&path).map_err(|e| write_error(e.error))?;
            info!(
                "Wrote station cache ({} bytes) to {}",
                encoded.len(),
                path.display()
            );
            Ok(())
        })
        .await?
    }

    /// The subset of stations inside `regions`, keeping registry order.
    pub fn restricted_to(&self, regions: &RegionFilter) -> StationCatalog {
        Self {
            stations: self
                .stations
                .iter()
                .filter(|station| regions.allows(&station.region))
                .cloned()
                .collect(),
        }
    }

    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn get(&self, id: &str) -> Option<&StationRecord> {
        self.stations.iter().find(|station| station.id == id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
