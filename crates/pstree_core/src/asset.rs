//! Referenced assets: handles, loading and per-session deduplication.
//!
//! Each distinct (reference name, version) is instantiated exactly once per
//! load session. The first use gets the canonical [`AssetHandle`]; every later
//! use gets an instance that shares the same geometry slot, so geometry
//! buffers are loaded once and shared while node names and transforms stay
//! independent.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::mesh::GeometryLibrary;
use crate::reference::ReferenceEntry;
use crate::structure::resolve_asset_url;

/// Failure to load the geometry behind an asset URL.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unable to load asset {url}: {message}")]
pub struct AssetError {
    pub url: String,
    pub message: String,
}

impl AssetError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Loads the geometry of one referenced asset file.
///
/// This is the seam to the geometry/material subsystem. Implementations may
/// suspend for as long as they need; the tree builder waits on at most one
/// load at a time.
pub trait AssetLoader {
    fn load<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<GeometryLibrary, AssetError>>;
}

/// A placement of a referenced asset.
///
/// Handles are not `Clone`: the canonical handle is created once by
/// [`AssetCache::acquire`] and further placements are made explicit with
/// [`AssetHandle::instance`]. All handles of one asset share a single
/// geometry slot.
pub struct AssetHandle {
    source: Rc<str>,
    geometry: Rc<OnceCell<Arc<GeometryLibrary>>>,
    is_instance: bool,
}

impl AssetHandle {
    /// Create a canonical, not yet loaded handle for `source`.
    pub fn new(source: impl Into<Rc<str>>) -> Self {
        Self {
            source: source.into(),
            geometry: Rc::new(OnceCell::new()),
            is_instance: false,
        }
    }

    /// Create an instance of this asset: shared geometry, separate identity.
    pub fn instance(&self) -> AssetHandle {
        AssetHandle {
            source: Rc::clone(&self.source),
            geometry: Rc::clone(&self.geometry),
            is_instance: true,
        }
    }

    /// Second handle to the same placement, used to keep the canonical
    /// asset on its reference entry.
    fn share(&self) -> AssetHandle {
        AssetHandle {
            is_instance: self.is_instance,
            ..self.instance()
        }
    }

    /// Resolved URL of the asset file.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `true` for every placement after the first one.
    pub fn is_instance(&self) -> bool {
        self.is_instance
    }

    /// `true` once the geometry has been loaded.
    pub fn is_ready(&self) -> bool {
        self.geometry.get().is_some()
    }

    /// The loaded geometry, if ready.
    pub fn geometry(&self) -> Option<Arc<GeometryLibrary>> {
        self.geometry.get().cloned()
    }

    /// `true` when both handles place the same loaded or pending asset.
    pub fn shares_geometry_with(&self, other: &AssetHandle) -> bool {
        Rc::ptr_eq(&self.geometry, &other.geometry)
    }

    /// Wait until the geometry is loaded, loading it through `loader` if needed.
    ///
    /// Ready handles (every instance of an already loaded asset) return
    /// without suspending.
    pub async fn wait_ready(
        &self,
        loader: &dyn AssetLoader,
    ) -> Result<Arc<GeometryLibrary>, AssetError> {
        if let Some(geometry) = self.geometry.get() {
            return Ok(Arc::clone(geometry));
        }

        let library = loader.load(&self.source).await?;
        log::debug!(
            "Loaded asset {} ({} meshes, {} triangles)",
            self.source,
            library.mesh_count(),
            library.triangle_count()
        );
        Ok(Arc::clone(self.geometry.get_or_init(|| Arc::new(library))))
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("source", &self.source)
            .field("is_instance", &self.is_instance)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Result of [`AssetCache::acquire`].
#[derive(Debug)]
pub struct Acquired {
    pub handle: AssetHandle,

    /// `true` when this call created the canonical asset
    pub first_use: bool,
}

/// Hands out one canonical asset per reference entry and instances after that.
///
/// The handles themselves live on the [`ReferenceEntry`]s; the cache only
/// knows where assets are resolved from and counts what it handed out. There
/// is no eviction: entries keep their asset for the whole session.
#[derive(Debug, Default)]
pub struct AssetCache {
    folder: String,
    instantiations: usize,
    instances: usize,
}

impl AssetCache {
    /// Create a cache resolving asset URLs against `folder`.
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Default::default()
        }
    }

    /// Get the asset for `entry`.
    ///
    /// The first call for an entry creates the canonical handle, stores it on
    /// the entry and returns it. Later calls return instances of it.
    pub fn acquire(&mut self, entry: &mut ReferenceEntry) -> Acquired {
        if let Some(cached) = &entry.cached_asset {
            self.instances += 1;
            return Acquired {
                handle: cached.instance(),
                first_use: false,
            };
        }

        let url = resolve_asset_url(&self.folder, &entry.url);
        log::debug!("Instantiating {} {} from {}", entry.name, entry.version, url);

        let canonical = AssetHandle::new(url);
        entry.cached_asset = Some(canonical.share());
        self.instantiations += 1;
        Acquired {
            handle: canonical,
            first_use: true,
        }
    }

    /// Drop the asset of an entry whose first load failed, so a later use
    /// loads it again instead of instancing an empty slot.
    pub fn forget(&mut self, entry: &mut ReferenceEntry) {
        if entry.cached_asset.take().is_some() {
            self.instantiations = self.instantiations.saturating_sub(1);
        }
    }

    /// Number of canonical assets created.
    pub fn instantiations(&self) -> usize {
        self.instantiations
    }

    /// Number of instances handed out.
    pub fn instances(&self) -> usize {
        self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use futures::executor::block_on;
    use futures::FutureExt;
    use pstree_math::Vec3;
    use std::cell::Cell;

    struct CountingLoader {
        calls: Cell<usize>,
    }

    impl AssetLoader for CountingLoader {
        fn load<'a>(
            &'a self,
            url: &'a str,
        ) -> LocalBoxFuture<'a, Result<GeometryLibrary, AssetError>> {
            async move {
                self.calls.set(self.calls.get() + 1);
                let mesh = Mesh::new("m", vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
                Ok(GeometryLibrary::with_meshes(url, vec![mesh]))
            }
            .boxed_local()
        }
    }

    fn entry() -> ReferenceEntry {
        ReferenceEntry::new("Bolt", "1", "parts/bolt.zcad")
    }

    #[test]
    fn test_first_acquire_is_canonical() {
        let mut cache = AssetCache::new("data/");
        let mut entry = entry();

        let acquired = cache.acquire(&mut entry);
        assert!(acquired.first_use);
        assert!(!acquired.handle.is_instance());
        assert_eq!(acquired.handle.source(), "data/parts/bolt.zcad");
        assert!(entry.cached_asset.is_some());
        assert_eq!(cache.instantiations(), 1);
    }

    #[test]
    fn test_later_acquires_are_instances() {
        let mut cache = AssetCache::new("");
        let mut entry = entry();

        let first = cache.acquire(&mut entry).handle;
        let second = cache.acquire(&mut entry);
        let third = cache.acquire(&mut entry);

        assert!(!second.first_use);
        assert!(second.handle.is_instance());
        assert!(second.handle.shares_geometry_with(&first));
        assert!(third.handle.shares_geometry_with(&second.handle));
        assert_eq!(cache.instantiations(), 1);
        assert_eq!(cache.instances(), 2);
    }

    #[test]
    fn test_wait_ready_loads_once_for_all_instances() {
        let loader = CountingLoader { calls: Cell::new(0) };
        let mut cache = AssetCache::new("");
        let mut entry = entry();

        let canonical = cache.acquire(&mut entry).handle;
        assert!(!canonical.is_ready());

        let geometry = block_on(canonical.wait_ready(&loader)).unwrap();
        assert_eq!(geometry.triangle_count(), 1);

        let instance = cache.acquire(&mut entry).handle;
        assert!(instance.is_ready());
        let shared = block_on(instance.wait_ready(&loader)).unwrap();

        assert!(Arc::ptr_eq(&geometry, &shared));
        assert_eq!(loader.calls.get(), 1);
    }

    #[test]
    fn test_forget_allows_reload() {
        let mut cache = AssetCache::new("");
        let mut entry = entry();

        let _ = cache.acquire(&mut entry);
        cache.forget(&mut entry);

        assert!(entry.cached_asset.is_none());
        assert!(cache.acquire(&mut entry).first_use);
        assert_eq!(cache.instantiations(), 1);
    }
}
