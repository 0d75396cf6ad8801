//! `file://` content adapter: reads a local path and returns its bytes.
//!
//! The read runs directly on the async runtime via `tokio::fs` rather than
//! `spawn_blocking`, since local file reads are short; `spawn_blocking` is
//! reserved for genuinely blocking calls (see `http.rs`).

use super::{ContentAdapter, FetchedContent};
use crate::error::{CodexError, Result};
use async_trait::async_trait;

pub struct FileAdapter;

/// Strips a `file://` prefix down to a filesystem path. `file:///a/b` and
/// `file://a/b` both resolve to `/a/b` - this adapter only targets local
/// absolute paths, not UNC-style host components.
fn path_from_uri(uri: &str) -> Result<&str> {
    uri.strip_prefix("file://")
        .ok_or_else(|| CodexError::AdapterFailure(format!("not a file:// uri: {uri}")))
}

#[async_trait]
impl ContentAdapter for FileAdapter {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn fetch(
        &self,
        uri: &str,
        _headers: Option<&std::collections::BTreeMap<String, String>>,
    ) -> Result<FetchedContent> {
        let path = path_from_uri(uri)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CodexError::AdapterFailure(format!("reading {path}: {e}")))?;
        Ok(FetchedContent {
            media_type: "application/octet-stream".to_string(),
            bytes: Some(bytes.into()),
            json: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_local_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello\n").await.unwrap();

        let uri = format!("file://{}", path.display());
        let adapter = FileAdapter;
        let fetched = adapter.fetch(&uri, None).await.unwrap();
        assert_eq!(fetched.bytes.as_deref(), Some(&b"hello\n"[..]));
        assert_eq!(fetched.media_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_file_is_adapter_failure() {
        let adapter = FileAdapter;
        let err = adapter.fetch("file:///no/such/path", None).await.unwrap_err();
        assert!(matches!(err, CodexError::AdapterFailure(_)));
    }

    #[test]
    fn rejects_non_file_scheme() {
        assert!(path_from_uri("http://example.com").is_err());
    }
}
