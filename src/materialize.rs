//! Local materialization of downloads.
//!
//! A [`Materializer`] turns a serialized payload into a file the user can
//! open. The call is fire-and-forget: the save pipeline reports the
//! download as fulfilled as soon as `materialize` returns, without waiting
//! for or observing the write.

use std::path::PathBuf;

use tokio_util::task::TaskTracker;

/// Sink for downloaded content.
pub trait Materializer: Send + Sync {
    /// Hand off `contents` to be written as `filepath` with the given
    /// content type label. Must not block.
    fn materialize(&self, contents: String, filepath: &str, content_type: &str);
}

/// Writes downloads into a directory.
///
/// Only the last segment of the filepath is used as the file name. Writes
/// run on spawned tasks tracked by a [`TaskTracker`]; call
/// [`flush`](DiskMaterializer::flush) before exiting to let them land.
pub struct DiskMaterializer {
    dir: PathBuf,
    tracker: TaskTracker,
}

impl DiskMaterializer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tracker: TaskTracker::new(),
        }
    }

    /// Target path for a download of `filepath`.
    pub fn target_for(&self, filepath: &str) -> PathBuf {
        self.dir.join(file_name(filepath))
    }

    /// Wait for every write started so far.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Last path segment of `filepath`, or the whole string when it has none.
pub fn file_name(filepath: &str) -> &str {
    filepath
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(filepath)
}

impl Materializer for DiskMaterializer {
    fn materialize(&self, contents: String, filepath: &str, content_type: &str) {
        let target = self.target_for(filepath);
        let dir = self.dir.clone();
        tracing::debug!(target = %target.display(), content_type, bytes = contents.len(), "materialize");

        self.tracker.spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %e, "could not create download directory");
                return;
            }
            if let Err(e) = tokio::fs::write(&target, contents).await {
                tracing::warn!(target = %target.display(), error = %e, "download write failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("dir/sub/notes.md"), "notes.md");
        assert_eq!(file_name("notebook.ipynb"), "notebook.ipynb");
        assert_eq!(file_name("dir/"), "dir");
    }

    #[tokio::test]
    async fn test_writes_into_directory() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("downloads");
        let materializer = DiskMaterializer::new(&out);

        materializer.materialize("hello".to_string(), "/remote/dir/b.txt", "text/plain");
        materializer.flush().await;

        let written = std::fs::read_to_string(out.join("b.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn test_flush_can_be_called_repeatedly() {
        let tmp = TempDir::new().unwrap();
        let materializer = DiskMaterializer::new(tmp.path());

        materializer.materialize("one".to_string(), "a.txt", "text/plain");
        materializer.flush().await;
        materializer.materialize("two".to_string(), "b.txt", "text/plain");
        materializer.flush().await;

        assert_eq!(std::fs::read_to_string(tmp.path().join("b.txt")).unwrap(), "two");
    }
}
