use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use docflow_task::CleanupRequest;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::Cleanup;
use crate::error::ActivityError;

/// Filesystem cleanup for uploaded source documents.
///
/// Only paths inside `{root}/{user_id}/{upload_id}/` are ever removed; others
/// are skipped and reported. Every path is attempted before a failure is
/// reported, so a retry only has the leftovers to deal with.
pub struct FsCleanup {
  root: PathBuf,
}

impl FsCleanup {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn upload_dir(&self, request: &CleanupRequest) -> PathBuf {
    self.root.join(&request.user_id).join(&request.upload_id)
  }
}

/// Resolve `.` and `..` lexically so a relative root and the paths derived
/// from it compare component by component.
fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        let last = normalized.components().next_back();
        let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
        let can_pop = matches!(last, Some(Component::Normal(_)));
        if can_pop {
          normalized.pop();
        } else if !at_root {
          normalized.push(Component::ParentDir);
        }
      }
      other => normalized.push(other),
    }
  }
  normalized
}

fn is_inside(path: &Path, dir: &Path) -> bool {
  let path = normalize(path);
  let dir = normalize(dir);
  path.starts_with(&dir) && path != dir
}

#[async_trait]
impl Cleanup for FsCleanup {
  async fn cleanup(&self, request: &CleanupRequest) -> Result<(), ActivityError> {
    let upload_dir = self.upload_dir(request);

    let mut removed = 0usize;
    let mut rejected = Vec::new();
    let mut failures = Vec::new();
    for raw in &request.document_paths {
      if !is_inside(Path::new(raw), &upload_dir) {
        warn!(path = %raw, dir = %upload_dir.display(), "refusing to remove path outside upload");
        rejected.push(raw.as_str());
        continue;
      }
      match fs::remove_file(raw).await {
        Ok(()) => removed += 1,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
          debug!(path = %raw, "document already removed");
        }
        Err(e) => failures.push(format!("{raw}: {e}")),
      }
    }

    // Drop the upload directory once it is empty; a non-empty or missing
    // directory is left alone.
    match fs::remove_dir(&upload_dir).await {
      Ok(()) => debug!(dir = %upload_dir.display(), "upload directory removed"),
      Err(e) => debug!(dir = %upload_dir.display(), error = %e, "upload directory kept"),
    }

    let rejection = (!rejected.is_empty()).then(|| {
      format!(
        "refusing to remove {} path(s) outside of '{}': {}",
        rejected.len(),
        upload_dir.display(),
        rejected.join(", ")
      )
    });

    // A failed removal may succeed on retry; a rejected path never will.
    if !failures.is_empty() {
      let mut message = format!(
        "failed to remove {} of {} documents: {}",
        failures.len(),
        request.document_paths.len(),
        failures.join("; ")
      );
      if let Some(rejection) = rejection {
        message.push_str("; ");
        message.push_str(&rejection);
      }
      return Err(ActivityError::failed(message));
    }
    if let Some(rejection) = rejection {
      return Err(ActivityError::invalid_input(rejection));
    }

    info!(
      upload_id = %request.upload_id,
      removed,
      requested = request.document_paths.len(),
      "upload cleaned up"
    );
    Ok(())
  }
}
