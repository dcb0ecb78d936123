use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuickStatsError {
    #[error("Failed to open statistics dataset '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("Statistics dataset has no header row")]
    MissingHeader,

    // Covers decompression, read and quoting failures of the underlying stream
    #[error("Failed reading statistics dataset at line {line}")]
    Read {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
