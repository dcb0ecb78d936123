use crate::transport::FetchError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error("Daily data download failed for station '{station}'")]
    Fetch {
        station: String,
        #[source]
        source: FetchError,
    },

    // Errors during CSV reading (inside blocking task)
    #[error("I/O error processing CSV data for station '{station}'")]
    CsvReadIo {
        station: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing error processing CSV data for station '{station}'")]
    CsvReadPolars {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("Missing required column '{column}' for station {station}")]
    MissingColumnError { station: String, column: String },

    #[error("Polars operation failed for station {station}: {source}")]
    PolarsError {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
