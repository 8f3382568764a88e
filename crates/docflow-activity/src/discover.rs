use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docflow_task::{DiscoveryResult, WorkflowRequest};
use tokio::fs;
use tracing::{debug, warn};

use crate::Discover;
use crate::error::ActivityError;

/// Filesystem-based discovery.
///
/// Uploads are stored in a directory structure:
/// ```text
/// {root}/
/// └── {user_id}/
///     └── {upload_id}/
///         ├── assay-results.xlsx
///         └── paper.pdf
/// ```
///
/// Regular, non-hidden files are returned sorted by file name so repeated
/// discovery of the same upload yields the same order.
pub struct FsDiscovery {
  root: PathBuf,
  extensions: Vec<String>,
}

impl FsDiscovery {
  /// Discover every regular file under `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      extensions: Vec::new(),
    }
  }

  /// Only accept files with one of the given extensions (case-insensitive).
  pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.extensions = extensions
      .into_iter()
      .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
      .filter(|e| !e.is_empty())
      .collect();
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory holding one upload's documents.
  pub fn upload_dir(&self, user_id: &str, upload_id: &str) -> PathBuf {
    self.root.join(user_id).join(upload_id)
  }

  fn accepts(&self, file_name: &str) -> bool {
    if file_name.starts_with('.') {
      return false;
    }
    if self.extensions.is_empty() {
      return true;
    }
    Path::new(file_name)
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
  }
}

#[async_trait]
impl Discover for FsDiscovery {
  async fn discover(&self, request: &WorkflowRequest) -> Result<DiscoveryResult, ActivityError> {
    let dir = self.upload_dir(&request.user_id, &request.upload_id);

    let mut entries = match fs::read_dir(&dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(dir = %dir.display(), "upload directory does not exist, nothing to discover");
        return Ok(DiscoveryResult::default());
      }
      Err(e) => return Err(ActivityError::io(&dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|e| ActivityError::io(&dir, e))?
    {
      let file_type = entry
        .file_type()
        .await
        .map_err(|e| ActivityError::io(&entry.path(), e))?;
      if !file_type.is_file() {
        continue;
      }

      let file_name = entry.file_name();
      let Some(name) = file_name.to_str() else {
        warn!(path = %entry.path().display(), "skipping document with non-UTF-8 name");
        continue;
      };
      if self.accepts(name) {
        names.push(name.to_string());
      }
    }

    names.sort();
    let document_paths: Vec<String> = names
      .into_iter()
      .map(|name| dir.join(name).to_string_lossy().into_owned())
      .collect();

    debug!(
      dir = %dir.display(),
      documents = document_paths.len(),
      "upload discovered"
    );
    Ok(DiscoveryResult::new(document_paths))
  }
}
