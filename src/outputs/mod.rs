//! Persistence of finished collections.
//!
//! The pipeline hands each finished collection to a [`Renderer`] under a
//! destination name. [`FileRenderer`] turns a destination into a file in
//! the output directory and writes the collection in the configured
//! format:
//!
//! - [`html`]: a standalone HTML table, one row per item
//! - [`json`]: a pretty-printed JSON array
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── all_news.html          # every item fetched in the run
//! └── most_rated_news.html   # top-K inside the date window
//! ```
//!
//! Destinations are never overwritten. Persisting to an existing file fails
//! with [`PersistError::DestinationExists`] and leaves the file as it was.

pub mod html;
pub mod json;

use crate::config::{OutputFormat, OutputSettings};
use crate::models::FeedItem;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render HTML: {0}")]
    Html(#[from] std::fmt::Error),

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capability to persist a collection of items under a destination name.
pub trait Renderer: Send + Sync + 'static {
    /// Persist `items` to `destination`, returning where they were written.
    ///
    /// Must fail with [`PersistError::DestinationExists`] when the
    /// destination is already populated.
    fn persist(
        &self,
        destination: &str,
        items: &[FeedItem],
    ) -> impl Future<Output = Result<PathBuf, PersistError>> + Send;
}

/// Writes each destination as a file inside one directory.
#[derive(Debug, Clone)]
pub struct FileRenderer {
    dir: PathBuf,
    format: OutputFormat,
}

impl FileRenderer {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(settings.dir.clone(), settings.format)
    }

    /// File path for a destination name.
    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir
            .join(format!("{destination}.{}", self.format.extension()))
    }

    fn render(&self, items: &[FeedItem]) -> Result<String, PersistError> {
        Ok(match self.format {
            OutputFormat::Html => html::render_items(items)?,
            OutputFormat::Json => json::render_items(items)?,
        })
    }
}

impl Renderer for FileRenderer {
    #[instrument(level = "info", skip(self, items), fields(items = items.len()))]
    async fn persist(&self, destination: &str, items: &[FeedItem]) -> Result<PathBuf, PersistError> {
        let path = self.path_for(destination);
        let document = self.render(items)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;

        // create_new refuses to open an existing file, so nothing is truncated
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PersistError::DestinationExists(path));
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        file.write_all(document.as_bytes())
            .await
            .map_err(|source| io_error(&path, source))?;
        file.flush().await.map_err(|source| io_error(&path, source))?;

        debug!(path = %path.display(), bytes = document.len(), "Wrote document");
        Ok(path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFeedItem;

    fn items() -> Vec<FeedItem> {
        (1..=3)
            .map(|id| {
                FeedItem::from(RawFeedItem {
                    id,
                    title: format!("News {id}"),
                    publication_date: 1_725_000_000,
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_path_uses_format_extension() {
        let html = FileRenderer::new("/tmp/out", OutputFormat::Html);
        let json = FileRenderer::new("/tmp/out", OutputFormat::Json);
        assert_eq!(html.path_for("all_news"), PathBuf::from("/tmp/out/all_news.html"));
        assert_eq!(json.path_for("all_news"), PathBuf::from("/tmp/out/all_news.json"));
    }

    #[tokio::test]
    async fn test_persist_writes_new_file() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(tmp.path().join("nested"), OutputFormat::Html);

        let path = renderer.persist("all_news", &items()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(written.contains("News 3"));
    }

    #[tokio::test]
    async fn test_existing_destination_is_left_unmodified() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(tmp.path(), OutputFormat::Json);
        let path = renderer.path_for("most_rated_news");
        std::fs::write(&path, "original").unwrap();

        let err = renderer.persist("most_rated_news", &items()).await.unwrap_err();

        match err {
            PersistError::DestinationExists(p) => assert_eq!(p, path),
            other => panic!("expected DestinationExists, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_second_persist_to_same_destination_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(tmp.path(), OutputFormat::Json);

        renderer.persist("all_news", &items()).await.unwrap();
        let first = std::fs::read_to_string(renderer.path_for("all_news")).unwrap();

        let err = renderer.persist("all_news", &[]).await.unwrap_err();
        assert!(matches!(err, PersistError::DestinationExists(_)));
        assert_eq!(std::fs::read_to_string(renderer.path_for("all_news")).unwrap(), first);
    }

    #[tokio::test]
    async fn test_empty_collection_is_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(tmp.path(), OutputFormat::Json);

        let path = renderer.persist("most_rated_news", &[]).await.unwrap();
        let parsed: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }
}
