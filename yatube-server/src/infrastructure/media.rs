use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::error::DomainError;

const UPLOAD_DIR: &str = "posts";
/// Longest stored file name before any collision suffix; keeps
/// `posts/<name>_<suffix>` well inside the `image` column.
const MAX_NAME_LEN: usize = 100;

/// An image received from a post form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores post images on the local filesystem under `{root}/posts/`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the upload and returns its reference relative to the media
    /// root, e.g. `posts/small.gif`. An existing file is never overwritten:
    /// a clashing name gets a short random suffix.
    pub async fn save(&self, image: &UploadedImage) -> Result<String, DomainError> {
        let dir = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            error!("failed to create media dir {}: {}", dir.display(), e);
            DomainError::Internal(format!("media storage error: {e}"))
        })?;

        let mut name = sanitize_file_name(&image.file_name);
        if tokio::fs::try_exists(dir.join(&name)).await.unwrap_or(false) {
            name = with_suffix(&name, &Uuid::new_v4().simple().to_string()[..7]);
        }

        let path = dir.join(&name);
        tokio::fs::write(&path, &image.bytes).await.map_err(|e| {
            error!("failed to write upload {}: {}", path.display(), e);
            DomainError::Internal(format!("media storage error: {e}"))
        })?;

        let reference = format!("{UPLOAD_DIR}/{name}");
        info!(image = %reference, bytes = image.bytes.len(), "image stored");
        Ok(reference)
    }

    /// Removes a file previously returned by [`MediaStorage::save`]. Used
    /// when the row that would have referenced it was never written.
    pub async fn remove(&self, reference: &str) {
        let path = self.root.join(reference);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("failed to remove unused upload {}: {}", path.display(), e);
        } else {
            info!(image = %reference, "unused image removed");
        }
    }
}

/// Keeps the last path component, replaces anything outside
/// `[A-Za-z0-9._-]` with `_` and shortens the stem past `MAX_NAME_LEN`.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        truncate_name(cleaned)
    }
}

// input is ASCII here, so byte offsets are char boundaries
fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_NAME_LEN / 2 => {
            let keep = MAX_NAME_LEN - ext.len() - 1;
            format!("{}.{ext}", &stem[..keep])
        }
        _ => name[..MAX_NAME_LEN].to_string(),
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif(name: &str) -> UploadedImage {
        UploadedImage {
            file_name: name.into(),
            content_type: Some("image/gif".into()),
            bytes: b"GIF89a".to_vec(),
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my photo.gif"), "my_photo.gif");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name("C:\\pics\\cat.png"), "cat.png");
    }

    #[test]
    fn long_names_keep_their_extension() {
        let name = sanitize_file_name(&format!("{}.gif", "a".repeat(300)));
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert!(name.ends_with("a.gif"));

        let bare = sanitize_file_name(&"b".repeat(300));
        assert_eq!(bare, "b".repeat(MAX_NAME_LEN));

        assert_eq!(sanitize_file_name("short.gif"), "short.gif");
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(with_suffix("small.gif", "abc1234"), "small_abc1234.gif");
        assert_eq!(with_suffix("README", "abc1234"), "README_abc1234");
    }

    #[tokio::test]
    async fn clashing_uploads_get_distinct_references() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let first = storage.save(&gif("small.gif")).await.unwrap();
        let second = storage.save(&gif("small.gif")).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(storage.root().join(&second).exists());
    }

    #[tokio::test]
    async fn removed_uploads_are_gone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let reference = storage.save(&gif("small.gif")).await.unwrap();
        storage.remove(&reference).await;

        assert!(!storage.root().join(&reference).exists());
    }
}
