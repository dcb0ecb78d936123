use log::info;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "region_extract_cache";

pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not determine system cache directory"))
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Renders an error and its whole source chain on one line, for warnings about
/// skipped entities.
pub fn describe(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Rows gathered from a batch of entities, and the ids of the entities that were skipped.
#[derive(Debug, Clone)]
pub struct BatchOutcome<R> {
    pub rows: Vec<R>,
    pub skipped: Vec<String>,
}

impl<R> Default for BatchOutcome<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FetchError;

    #[test]
    fn test_describe_includes_sources() {
        let error = FetchError::DownloadIo {
            url: "https://example.test/a.gz".into(),
            path: PathBuf::from("/tmp/a.gz"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        let text = describe(&error);
        assert!(text.starts_with("Download of https://example.test/a.gz"));
        assert!(text.ends_with(": disk full"));
    }

    #[tokio::test]
    async fn test_ensure_cache_dir_exists_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_cache_dir_exists(&nested).await.unwrap();
        assert!(nested.is_dir());
        ensure_cache_dir_exists(&nested).await.unwrap();

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(ensure_cache_dir_exists(&file).await.is_err());
    }
}
