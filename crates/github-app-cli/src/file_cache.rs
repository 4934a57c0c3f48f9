//! File-backed cache store.
//!
//! Each key is one file under the cache directory, so installation tokens and
//! ETag-validated responses survive between CLI runs.

use async_trait::async_trait;
use github_app_api::cache::CacheStore;
use github_app_api::CacheError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// [`CacheStore`] keeping one file per key.
///
/// The directory is created on first write. Reading a key that was never
/// written yields `None`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }
}

/// Map a key to a file name that stays inside the cache directory.
///
/// Keys are percent-encoded, so `/` never survives and distinct keys never
/// share a file. A leading `.` is encoded too, which rules out `.` and `..`.
fn file_name(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded.into_owned(),
    }
}

/// Staging file suffix, unique per write within this process.
fn staging_suffix() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}.{}.tmp",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn failed(action: &str, path: &Path, error: std::io::Error) -> CacheError {
    CacheError::OperationFailed {
        message: format!("Failed to {} {}: {}", action, path.display(), error),
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);

        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(failed("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| failed("create", &self.root, e))?;

        let path = self.path_for(key);
        // Write then rename so readers never see a partial entry. Encoded
        // keys never start with `.`, so staging names cannot collide with them.
        let staging = self
            .root
            .join(format!(".{}.{}", file_name(key), staging_suffix()));

        tokio::fs::write(&staging, value)
            .await
            .map_err(|e| failed("write", &staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| failed("replace", &path, e))?;

        debug!(path = %path.display(), "Stored cache entry");
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_cache_tests.rs"]
mod tests;
