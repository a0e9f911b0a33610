//! Fetching documents by URL.
//!
//! The loader only needs raw bytes for a URL; where they come from is up to
//! the [`Transport`]. Local files and an in-memory table are provided here.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use thiserror::Error;

/// Errors that can occur while fetching a URL.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unable to load {url}: {status} - {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Unable to load {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn not_found(url: impl Into<String>) -> Self {
        TransportError::Status {
            url: url.into(),
            status: 404,
            reason: "Not Found".to_string(),
        }
    }

    /// URL the failed request was for.
    pub fn url(&self) -> &str {
        match self {
            TransportError::Status { url, .. } | TransportError::Io { url, .. } => url,
        }
    }

    /// Status code, when the failure was a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Io { .. } => None,
        }
    }
}

/// Retrieves the bytes behind a URL.
pub trait Transport {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, TransportError>>;
}

/// Reads URLs as paths on the local filesystem, optionally below a root.
#[derive(Debug, Default, Clone)]
pub struct FileTransport {
    root: Option<PathBuf>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every URL relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(url),
            None => PathBuf::from(url),
        }
    }

    /// Blocking read shared by the transport and file-backed asset loaders.
    pub fn read(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        std::fs::read(self.path_for(url)).map_err(|source| match source.kind() {
            ErrorKind::NotFound => TransportError::not_found(url),
            _ => TransportError::Io {
                url: url.to_string(),
                source,
            },
        })
    }
}

impl Transport for FileTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, TransportError>> {
        async move { self.read(url) }.boxed_local()
    }
}

/// Serves URLs from an in-memory table. Unknown URLs answer 404.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(url.into(), bytes.into());
    }
}

impl Transport for MemoryTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, TransportError>> {
        async move {
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::not_found(url))
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_memory_transport() {
        let transport = MemoryTransport::new().with("a/doc.json", "{}");

        assert_eq!(block_on(transport.fetch("a/doc.json")).unwrap(), b"{}");

        let err = block_on(transport.fetch("a/missing.json")).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.url(), "a/missing.json");
        assert_eq!(
            err.to_string(),
            "Unable to load a/missing.json: 404 - Not Found"
        );
    }

    #[test]
    fn test_file_transport_missing_file() {
        let dir = tempdir().unwrap();
        let transport = FileTransport::with_root(dir.path());
        let err = block_on(transport.fetch("missing/structure.json")).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_file_transport_reads_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("doc.json"), b"[1]").unwrap();

        let transport = FileTransport::with_root(dir.path());
        assert_eq!(block_on(transport.fetch("doc.json")).unwrap(), b"[1]");
    }
}
