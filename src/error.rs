use crate::config::ConfigError;
use crate::ndvi::error::NdviError;
use crate::output::OutputError;
use crate::transport::FetchError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run. Per-station, per-site and per-dataset failures are logged
/// and absorbed by the extract that hit them, so they never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ndvi(#[from] NdviError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
