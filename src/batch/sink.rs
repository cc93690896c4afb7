use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Destination for downloaded table markup.
#[allow(async_fn_in_trait)]
pub trait OutputSink {
    /// Stores `markup` under `key` (`{region}_{indicator}`).
    async fn write(&mut self, key: &str, markup: &str) -> AppResult<()>;
}

/// Writes each table to `{dir}/{key}.html`.
///
/// Data goes to a `.part` file first and is renamed once complete, so an
/// interrupted write never leaves a truncated table behind.
#[derive(Debug, Clone)]
pub struct HtmlFileSink {
    dir: PathBuf,
}

impl HtmlFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.html"))
    }
}

impl OutputSink for HtmlFileSink {
    async fn write(&mut self, key: &str, markup: &str) -> AppResult<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| AppError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file_path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{key}.html.part"));

        if let Err(e) = fs::write(&tmp_path, markup).await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                warn!(
                    file_path = %tmp_path.display(),
                    error = %cleanup,
                    "Failed to remove temp file"
                );
            }
            return Err(AppError::IoError(format!(
                "Failed to write {}: {e}",
                tmp_path.display()
            )));
        }

        fs::rename(&tmp_path, &file_path).await.map_err(|e| {
            AppError::IoError(format!(
                "Failed to move {} into place: {e}",
                file_path.display()
            ))
        })?;

        debug!(file_path = %file_path.display(), bytes = markup.len(), "Table saved");
        Ok(())
    }
}
