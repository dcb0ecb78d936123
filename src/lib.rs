pub mod config;
mod error;
pub mod filtering;
pub mod ndvi;
pub mod output;
mod pipeline;
pub mod quickstats;
pub mod stations;
pub mod transport;
pub mod types;
pub mod utils;
pub mod weather_data;

pub use error::PipelineError;
pub use pipeline::*;

pub use config::{ConfigError, RegionConfig};
pub use types::location::{LatLon, SiteOfInterest};
pub use types::region::RegionFilter;
pub use types::station::StationRecord;
pub use types::timeseries::{DateWindow, TimeseriesRow};

pub use ndvi::error::NdviError;
pub use output::OutputError;
pub use quickstats::error::QuickStatsError;
pub use stations::error::CatalogError;
pub use transport::{FetchError, HttpTransport, Transport};
pub use weather_data::error::WeatherDataError;
