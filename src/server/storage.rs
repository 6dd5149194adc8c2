//! Persistence of submitted images.

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Writes submitted images into a single directory under collision-free names.
pub struct ImageStorage {
    dir: PathBuf,
}

/// A stored image: its name inside the storage directory and its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub name: String,
    pub path: PathBuf,
}

impl ImageStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the storage directory if needed.
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Saves `data` as `<random hex>_<sanitized original_name>`.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> std::io::Result<StoredImage> {
        let name = unique_name(original_name);
        let path = self.dir.join(&name);
        fs::write(&path, data).await?;
        Ok(StoredImage { name, path })
    }
}

pub fn unique_name(original_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(original_name))
}

/// Keeps only the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`. Never returns an empty string or a dot-only name.
pub fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("bottle.jpg"), "bottle.jpg");
        assert_eq!(sanitize_filename("/path/to/bottle.jpg"), "bottle.jpg");
        assert_eq!(sanitize_filename("..\\..\\evil.png"), "evil.png");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("caffè.jpg"), "caff_.jpg");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename("dir/"), "upload");
    }

    #[test]
    fn unique_names_have_hex_prefix() {
        let name = unique_name("can.png");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert_eq!(prefix.len(), 32);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "can.png");
        assert_ne!(unique_name("can.png"), unique_name("can.png"));
    }

    #[tokio::test]
    async fn saves_into_the_storage_dir() {
        let dir = TempDir::new().unwrap();
        let storage = ImageStorage::new(dir.path().join("uploads"));
        storage.init().await.unwrap();

        let stored = storage.save("../bottle.jpg", b"pixels").await.unwrap();

        assert!(stored.name.ends_with("_bottle.jpg"));
        assert_eq!(stored.path, dir.path().join("uploads").join(&stored.name));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"pixels");
    }
}
