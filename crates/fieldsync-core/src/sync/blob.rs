//! Access to captured media content.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Reads the raw bytes behind a photo or recording `file_path`.
#[allow(async_fn_in_trait)]
pub trait BlobReader {
    async fn read_as_binary(&self, path: &str) -> Result<Vec<u8>>;
}

/// Reads device files under a data root.
///
/// Relative paths resolve against the root, absolute paths are used as is, and
/// inline `data:<mime>;base64,<payload>` URIs are decoded without touching disk.
#[derive(Debug, Clone)]
pub struct FsBlobReader {
    root: PathBuf,
}

impl FsBlobReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }
}

impl BlobReader for FsBlobReader {
    async fn read_as_binary(&self, path: &str) -> Result<Vec<u8>> {
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::InvalidInput("blob path must not be empty".to_string()));
        }
        if let Some(uri) = path.strip_prefix("data:") {
            return decode_data_uri(uri);
        }

        let resolved = self.resolve(path);
        match tokio::fs::read(&resolved).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(
                format!("blob file {}", resolved.display()),
            )),
            Err(error) => Err(Error::Io(error)),
        }
    }
}

/// Decode the part of a data URI after `data:`.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| Error::InvalidInput("data URI has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(Error::InvalidInput(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    BASE64
        .decode(payload.trim())
        .map_err(|error| Error::InvalidInput(format!("invalid base64 in data URI: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_relative_paths_under_root() {
        let tmp = tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("recordings")).unwrap();
        std::fs::write(tmp.path().join("recordings/a.webm"), b"\x1a\x45\xdf\xa3").unwrap();

        let reader = FsBlobReader::new(tmp.path());
        let bytes = reader.read_as_binary("recordings/a.webm").await.unwrap();
        assert_eq!(bytes, b"\x1a\x45\xdf\xa3");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let tmp = tempdir().unwrap();
        let reader = FsBlobReader::new(tmp.path());

        let error = reader.read_as_binary("photos/gone.jpg").await.unwrap_err();
        assert!(matches!(error, Error::NotFound(message) if message.contains("gone.jpg")));
    }

    #[tokio::test]
    async fn decodes_inline_data_uri() {
        let reader = FsBlobReader::new("/nonexistent");
        let bytes = reader
            .read_as_binary("data:image/jpeg;base64,aGVsbG8=")
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn rejects_unsupported_data_uris() {
        let reader = FsBlobReader::new("/nonexistent");
        assert!(reader.read_as_binary("data:text/plain,hello").await.is_err());
        assert!(reader.read_as_binary("data:image/png;base64").await.is_err());
        assert!(reader
            .read_as_binary("data:image/png;base64,@@@")
            .await
            .is_err());
        assert!(reader.read_as_binary("  ").await.is_err());
    }
}
