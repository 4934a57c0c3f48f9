//! Git tree navigation.
//!
//! A [`Tree`] wraps one `git/trees/<sha>` payload. Its entries are either
//! subdirectories ([`Directory`], type `tree`) or files ([`File`], type
//! `blob`). GitHub truncates very large listings; a truncated tree refuses to
//! enumerate, and a search that misses in a truncated tree cannot tell
//! "absent" from "cut off", so it fails with `ApiError::TruncatedResponse`
//! instead of `ApiError::NotFound`.

use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::payload;
use crate::client::{ApiClient, Params};
use crate::error::ApiError;

const DIRECTORY: &str = "tree";
const FILE: &str = "blob";

/// One level of a git tree.
#[derive(Clone)]
pub struct Tree {
    api: Arc<dyn ApiClient>,
    data: Arc<Value>,
    truncated: bool,
}

impl Tree {
    /// Wrap a `git/trees/<sha>` payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if the payload has no `tree`
    /// array.
    pub fn from_api_response(api: Arc<dyn ApiClient>, data: Value) -> Result<Self, ApiError> {
        if !data.get("tree").is_some_and(Value::is_array) {
            return Err(ApiError::unexpected_payload(
                "missing or invalid field `/tree` (expected an array)",
            ));
        }

        let truncated = payload::bool_or_false(&data, "/truncated");

        Ok(Self {
            api,
            data: Arc::new(data),
            truncated,
        })
    }

    /// Check whether GitHub cut the listing short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn entries(&self, kind: &'static str) -> impl Iterator<Item = &Value> + '_ {
        self.data
            .get("tree")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(move |entry| payload::optional_str(entry, "/type") == Some(kind))
    }

    fn find(&self, kind: &'static str, name: &str) -> Option<&Value> {
        self.entries(kind)
            .find(|entry| payload::optional_str(entry, "/path") == Some(name))
    }

    /// All subdirectories at this level.
    pub fn directories(&self) -> Result<Vec<Directory>, ApiError> {
        if self.truncated {
            return Err(truncated(
                "Unable to retrieve all directories, too many files in the repository",
            ));
        }

        self.entries(DIRECTORY)
            .map(|entry| Directory::from_tree_item(self.api.clone(), entry))
            .collect()
    }

    /// The subdirectory called `name`.
    pub fn directory(&self, name: &str) -> Result<Directory, ApiError> {
        match self.find(DIRECTORY, name) {
            Some(entry) => Directory::from_tree_item(self.api.clone(), entry),
            None if self.truncated => Err(truncated(
                "Unable to find the requested directory, too many files in the repository",
            )),
            None => Err(ApiError::not_found(format!(
                "The requested directory does not exist: {}",
                name
            ))),
        }
    }

    pub fn has_directory(&self, name: &str) -> Result<bool, ApiError> {
        exists(self.directory(name))
    }

    /// All files at this level.
    pub fn files(&self) -> Result<Vec<File>, ApiError> {
        if self.truncated {
            return Err(truncated(
                "Unable to retrieve all files, there are too many in the repository",
            ));
        }

        self.entries(FILE)
            .map(|entry| File::from_tree_item(self.api.clone(), entry))
            .collect()
    }

    /// The file called `name`.
    pub fn file(&self, name: &str) -> Result<File, ApiError> {
        match self.find(FILE, name) {
            Some(entry) => File::from_tree_item(self.api.clone(), entry),
            None if self.truncated => Err(truncated(
                "Unable to find the requested file, there are too many in the repository",
            )),
            None => Err(ApiError::not_found(format!(
                "The requested file does not exist: {}",
                name
            ))),
        }
    }

    pub fn has_file(&self, name: &str) -> Result<bool, ApiError> {
        exists(self.file(name))
    }

    /// The raw tree payload.
    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("sha", &self.data.get("sha"))
            .field("truncated", &self.truncated)
            .finish_non_exhaustive()
    }
}

fn truncated(message: &str) -> ApiError {
    ApiError::TruncatedResponse {
        message: message.to_string(),
    }
}

fn exists<T>(lookup: Result<T, ApiError>) -> Result<bool, ApiError> {
    match lookup {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// A subdirectory entry of a tree.
///
/// Its own listing is fetched from the entry's `url` on first use.
#[derive(Clone)]
pub struct Directory {
    api: Arc<dyn ApiClient>,
    name: String,
    url: String,
    tree: Arc<OnceCell<Tree>>,
}

impl Directory {
    /// Wrap a `type: tree` entry of a tree listing.
    pub fn from_tree_item(api: Arc<dyn ApiClient>, item: &Value) -> Result<Self, ApiError> {
        Ok(Self {
            api,
            name: payload::required_str(item, "/path")?.to_string(),
            url: payload::required_str(item, "/url")?.to_string(),
            tree: Arc::new(OnceCell::new()),
        })
    }

    /// Path of the directory relative to its parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory's own tree, fetched once.
    pub async fn tree(&self) -> Result<&Tree, ApiError> {
        self.tree
            .get_or_try_init(|| async {
                let data = self.api.get(&self.url, Params::new()).await?;
                Tree::from_api_response(self.api.clone(), data)
            })
            .await
    }

    pub async fn directories(&self) -> Result<Vec<Directory>, ApiError> {
        self.tree().await?.directories()
    }

    pub async fn directory(&self, name: &str) -> Result<Directory, ApiError> {
        self.tree().await?.directory(name)
    }

    pub async fn has_directory(&self, name: &str) -> Result<bool, ApiError> {
        self.tree().await?.has_directory(name)
    }

    pub async fn files(&self) -> Result<Vec<File>, ApiError> {
        self.tree().await?.files()
    }

    pub async fn file(&self, name: &str) -> Result<File, ApiError> {
        self.tree().await?.file(name)
    }

    pub async fn has_file(&self, name: &str) -> Result<bool, ApiError> {
        self.tree().await?.has_file(name)
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// A file entry of a tree.
#[derive(Clone)]
pub struct File {
    api: Arc<dyn ApiClient>,
    name: String,
    size: u64,
    mode: String,
    hash: String,
    url: String,
    contents: Arc<OnceCell<Vec<u8>>>,
}

impl File {
    /// Wrap a `type: blob` entry of a tree listing.
    pub fn from_tree_item(api: Arc<dyn ApiClient>, item: &Value) -> Result<Self, ApiError> {
        Ok(Self {
            api,
            name: payload::required_str(item, "/path")?.to_string(),
            size: payload::required_u64(item, "/size")?,
            mode: payload::required_str(item, "/mode")?.to_string(),
            hash: payload::required_str(item, "/sha")?.to_string(),
            url: payload::required_str(item, "/url")?.to_string(),
            contents: Arc::new(OnceCell::new()),
        })
    }

    /// Path of the file relative to its directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Git file mode, e.g. `100644`.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Blob SHA.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The decoded file contents, fetched once.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if the blob has no `content` or
    /// it is not valid base64.
    pub async fn contents(&self) -> Result<&[u8], ApiError> {
        let contents = self
            .contents
            .get_or_try_init(|| async {
                let blob = self.api.get(&self.url, Params::new()).await?;
                decode_blob(&blob)
            })
            .await?;

        Ok(contents.as_slice())
    }

    /// The file contents as UTF-8 text.
    pub async fn text(&self) -> Result<String, ApiError> {
        let contents = self.contents().await?;

        String::from_utf8(contents.to_vec()).map_err(|_| {
            ApiError::unexpected_payload(format!("The file is not valid UTF-8: {}", self.name))
        })
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

// GitHub wraps blob content at 60 columns.
fn decode_blob(blob: &Value) -> Result<Vec<u8>, ApiError> {
    let undecodable = || {
        ApiError::unexpected_payload(
            "Unable to decode the file contents from the GitHub API response",
        )
    };

    let encoded: String = payload::optional_str(blob, "/content")
        .ok_or_else(undecodable)?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| undecodable())
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
