//! The top-level run: three independent extracts driven from one region config.

use crate::config::{ConfigError, RegionConfig};
use crate::error::PipelineError;
use crate::ndvi::NdviExtractor;
use crate::output::{
    ndvi_frame, stats_frame, totals_frame, weather_frame, write_csv, OutputPaths,
};
use crate::quickstats::aggregate::RegionTotals;
use crate::quickstats::{QuickStatsExtract, QuickStatsExtractor};
use crate::stations::catalog::StationCatalog;
use crate::stations::locate_station::select_stations;
use crate::transport::{HttpTransport, Transport};
use crate::types::timeseries::DateWindow;
use crate::utils::{describe, ensure_cache_dir_exists, get_cache_dir};
use crate::weather_data::fetcher::{DailyTarget, DailyWeatherFetcher};
use bon::bon;
use log::{info, warn};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a run reads and writes. Passed explicitly instead of living in globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl RunContext {
    pub fn outputs(&self) -> OutputPaths {
        OutputPaths::in_dir(&self.output_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractPath {
    QuickStats,
    Weather,
    Ndvi,
}

impl ExtractPath {
    pub const ALL: [ExtractPath; 3] = [ExtractPath::QuickStats, ExtractPath::Weather, ExtractPath::Ndvi];
}

impl fmt::Display for ExtractPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractPath::QuickStats => "quickstats",
            ExtractPath::Weather => "weather",
            ExtractPath::Ndvi => "ndvi",
        };
        f.write_str(name)
    }
}

impl FromStr for ExtractPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quickstats" => Ok(ExtractPath::QuickStats),
            "weather" | "ghcn" => Ok(ExtractPath::Weather),
            "ndvi" | "modis" => Ok(ExtractPath::Ndvi),
            other => Err(format!(
                "unknown extract '{}', expected quickstats, weather or ndvi",
                other
            )),
        }
    }
}

/// What one extract produced: rows written and the entities it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSummary {
    pub rows: usize,
    pub skipped: Vec<String>,
}

/// Per-extract results; `None` for extracts that did not run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub quickstats: Option<PathSummary>,
    pub weather: Option<PathSummary>,
    pub ndvi: Option<PathSummary>,
}

/// Runs the statistics, daily weather and vegetation index extracts for one region config.
///
/// # Examples
///
/// ```rust,no_run
/// # use region_extract::{Pipeline, PipelineError, RegionConfig};
/// # use std::path::{Path, PathBuf};
/// # async fn run() -> Result<(), PipelineError> {
/// let config = RegionConfig::load(Path::new("assets/data/region_config.json"))?;
/// let pipeline = Pipeline::builder()
///     .config(config)
///     .output_dir(PathBuf::from("assets/data"))
///     .build()
///     .await?;
/// let summary = pipeline.run().await?;
/// println!("{:?}", summary);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<T = HttpTransport> {
    transport: T,
    config: RegionConfig,
    context: RunContext,
}

#[bon]
impl Pipeline<HttpTransport> {
    /// Builds a pipeline over HTTP.
    ///
    /// The cache directory defaults to `region_extract_cache` inside the user cache
    /// directory and is created when missing. The request timeout defaults to 60 seconds.
    #[builder]
    pub async fn new(
        config: RegionConfig,
        output_dir: PathBuf,
        cache_dir: Option<PathBuf>,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => get_cache_dir().map_err(PipelineError::CacheDirResolution)?,
        };
        ensure_cache_dir_exists(&cache_dir)
            .await
            .map_err(|e| PipelineError::CacheDirCreation(cache_dir.clone(), e))?;
        let transport = HttpTransport::new(timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        Ok(Self::with_transport(
            transport,
            config,
            RunContext {
                output_dir,
                cache_dir,
            },
        ))
    }
}

impl<T: Transport> Pipeline<T> {
    pub fn with_transport(transport: T, config: RegionConfig, context: RunContext) -> Self {
        Self {
            transport,
            config,
            context,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Checks the config keys the selected extracts cannot run without.
    pub fn validate(&self, paths: &[ExtractPath]) -> Result<(), ConfigError> {
        if paths.contains(&ExtractPath::QuickStats) {
            self.config.validate_quickstats()?;
        }
        if paths.contains(&ExtractPath::Weather) {
            self.config.validate_ghcn()?;
        }
        Ok(())
    }

    /// Runs every extract.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_only(&ExtractPath::ALL).await
    }

    /// Validates the config for `paths`, then runs those extracts concurrently.
    ///
    /// Returns an error only for fatal problems; skipped stations and sites are
    /// reported in the summary.
    pub async fn run_only(&self, paths: &[ExtractPath]) -> Result<RunSummary, PipelineError> {
        self.validate(paths)?;
        let (quickstats, weather, ndvi) = tokio::try_join!(
            when(paths.contains(&ExtractPath::QuickStats), self.run_quickstats()),
            when(paths.contains(&ExtractPath::Weather), self.run_weather()),
            when(paths.contains(&ExtractPath::Ndvi), self.run_ndvi()),
        )?;
        Ok(RunSummary {
            quickstats,
            weather,
            ndvi: ndvi.flatten(),
        })
    }

    /// Downloads (or reuses) the statistics dump and writes the filtered records and
    /// per-region totals. A dump that cannot be fetched or read yields header-only files.
    pub async fn run_quickstats(&self) -> Result<PathSummary, PipelineError> {
        let url = self
            .config
            .quickstats
            .dataset_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("quickstats.dataset_url"))?;
        let extractor = QuickStatsExtractor::new(
            &self.transport,
            &self.config.quickstats,
            &self.config.states,
            &self.context.cache_dir,
        );

        let mut skipped = Vec::new();
        let extract = match extractor.fetch_dataset(url).await {
            Ok(path) => match extractor.extract_file(&path).await {
                Ok(extract) => extract,
                Err(e) => {
                    warn!("Statistics dataset unreadable, writing empty extract: {}", describe(&e));
                    skipped.push(url.to_string());
                    QuickStatsExtract::default()
                }
            },
            Err(e) => {
                warn!("Statistics download failed, writing empty extract: {}", describe(&e));
                skipped.push(url.to_string());
                QuickStatsExtract::default()
            }
        };

        if extract.totals.is_empty() {
            info!("No numeric statistics values to total");
        }
        let outputs = self.context.outputs();
        write_csv(stats_frame(&extract.rows)?, &outputs.quickstats).await?;
        write_totals(&extract.totals, &outputs).await?;
        Ok(PathSummary {
            rows: extract.rows.len(),
            skipped,
        })
    }

    /// Resolves the stations, fetches their daily records inside the configured window,
    /// and writes them. No stations means a header-only file.
    pub async fn run_weather(&self) -> Result<PathSummary, PipelineError> {
        let window = DateWindow::from_bounds(self.config.ghcn.start_date, self.config.ghcn.end_date)?;
        let targets = self.weather_targets().await?;

        let outcome = if targets.is_empty() {
            warn!("No stations selected; writing empty daily weather extract");
            Default::default()
        } else {
            info!("Fetching daily weather for {} stations in {}", targets.len(), window);
            DailyWeatherFetcher::new(&self.transport, window)
                .fetch_all(&targets)
                .await
        };

        let frame = weather_frame(&outcome.rows)?;
        write_csv(frame, &self.context.outputs().weather).await?;
        Ok(PathSummary {
            rows: outcome.rows.len(),
            skipped: outcome.skipped,
        })
    }

    /// Explicit stations (with their region looked up in the catalog), or the stations
    /// the selection policy picks from the configured sites and regions.
    pub async fn weather_targets(&self) -> Result<Vec<DailyTarget>, PipelineError> {
        let ghcn = &self.config.ghcn;
        if ghcn.stations.is_empty() && !ghcn.auto_select_from_sites {
            return Err(ConfigError::NoStationSource.into());
        }

        let regions = self.config.region_filter();
        let catalog = match StationCatalog::load(&self.transport, &self.context.cache_dir).await {
            Ok(catalog) => catalog.restricted_to(&regions),
            Err(e) => {
                warn!("Station registry unavailable: {}", describe(&e));
                StationCatalog::default()
            }
        };
        if catalog.is_empty() {
            warn!("No registry stations in the configured regions");
        } else {
            info!("{} registry stations in the configured regions", catalog.len());
        }

        if !ghcn.stations.is_empty() {
            return Ok(ghcn
                .stations
                .iter()
                .map(|id| {
                    let region = catalog
                        .get(id)
                        .map(|station| station.region.clone())
                        .filter(|region| !region.is_empty());
                    DailyTarget::new(id.clone(), region)
                })
                .collect());
        }

        let sites = self.config.matching_sites();
        let selection = select_stations(&sites, &regions, catalog.stations());
        if selection.is_empty() {
            warn!("No catalog station matched {} sites or the configured regions", sites.len());
        }
        for site_match in selection.matches() {
            info!(
                "Site {} uses station {} ({:.1} km)",
                site_match.site_id, site_match.station_id, site_match.distance_km
            );
        }
        Ok(selection.stations().iter().map(DailyTarget::from).collect())
    }

    /// Samples the vegetation index at every configured site. Returns `None` when the
    /// config has no `modis` section.
    pub async fn run_ndvi(&self) -> Result<Option<PathSummary>, PipelineError> {
        let Some(modis) = &self.config.modis else {
            info!("No modis section configured; skipping vegetation index extract");
            return Ok(None);
        };
        let extractor = NdviExtractor::from_config(&self.transport, modis);
        let outcome = extractor.extract(&modis.ndvi_sites()).await?;

        let frame = ndvi_frame(&outcome.rows)?;
        write_csv(frame, &self.context.outputs().ndvi).await?;
        Ok(Some(PathSummary {
            rows: outcome.rows.len(),
            skipped: outcome.skipped,
        }))
    }
}

async fn write_totals(totals: &RegionTotals, outputs: &OutputPaths) -> Result<(), PipelineError> {
    let frame = totals_frame(totals)?;
    write_csv(frame, &outputs.quickstats_summary).await?;
    Ok(())
}

async fn when<F, R>(enabled: bool, extract: F) -> Result<Option<R>, PipelineError>
where
    F: Future<Output = Result<R, PipelineError>>,
{
    if enabled {
        extract.await.map(Some)
    } else {
        Ok(None)
    }
}
