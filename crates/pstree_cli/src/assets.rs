//! File-backed asset loading for the command line.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use pstree_core::{AssetError, AssetLoader, FileTransport, GeometryLibrary};

/// Loads referenced assets from disk.
///
/// `.json` files are read as a serialized [`GeometryLibrary`]. Any other
/// format is only checked for existence and yields an empty library, so the
/// tree can still be inspected without a geometry decoder.
#[derive(Debug, Default)]
pub struct FileAssetLoader {
    files: FileTransport,
}

impl FileAssetLoader {
    pub fn new(files: FileTransport) -> Self {
        Self { files }
    }

    fn load_now(&self, url: &str) -> Result<GeometryLibrary, AssetError> {
        let bytes = self
            .files
            .read(url)
            .map_err(|e| AssetError::new(url, e.to_string()))?;

        if !url.ends_with(".json") {
            log::warn!("No geometry decoder for {}, using an empty library", url);
            return Ok(GeometryLibrary::empty(url));
        }

        let mut library: GeometryLibrary =
            serde_json::from_slice(&bytes).map_err(|e| AssetError::new(url, e.to_string()))?;
        if library.source.is_empty() {
            library.source = url.to_string();
        }

        log::debug!(
            "Loaded {}: {} meshes, {} triangles",
            url,
            library.mesh_count(),
            library.triangle_count()
        );
        Ok(library)
    }
}

impl AssetLoader for FileAssetLoader {
    fn load<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<GeometryLibrary, AssetError>> {
        async move { self.load_now(url) }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_loads_json_geometry() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("wheel.json"),
            r#"{"meshes": [{"name": "rim", "positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2]}]}"#,
        )
        .unwrap();

        let loader = FileAssetLoader::new(FileTransport::with_root(dir.path()));
        let library = block_on(loader.load("wheel.json")).unwrap();
        assert_eq!(library.source, "wheel.json");
        assert_eq!(library.mesh_count(), 1);
        assert_eq!(library.triangle_count(), 1);
    }

    #[test]
    fn test_unknown_format_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bolt.zcad"), b"\0\0").unwrap();

        let loader = FileAssetLoader::new(FileTransport::with_root(dir.path()));
        let library = block_on(loader.load("bolt.zcad")).unwrap();
        assert_eq!(library.mesh_count(), 0);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        let loader = FileAssetLoader::new(FileTransport::with_root(dir.path()));
        let err = block_on(loader.load("missing/part.json")).unwrap_err();
        assert_eq!(err.url, "missing/part.json");
        assert!(err.message.contains("404"));
    }
}
