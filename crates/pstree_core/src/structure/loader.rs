//! Asynchronous product structure loading.
//!
//! [`load_structure`] hands back the root of the tree immediately and a
//! future that fetches the document, registers its reference list and
//! materializes the node tree under that root. The future is single threaded
//! and makes no assumption about the executor driving it.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use pstree_math::{decode_affine_3x4, Transform, TransformError};
use thiserror::Error;

use crate::asset::{AssetCache, AssetError, AssetLoader};
use crate::progress::{ProgressTracker, WorkloadCounter, STRUCTURE_LOAD_UNITS};
use crate::reference::{ReferenceError, ReferenceRegistry, VersionFallback};
use crate::structure::document::{document_folder, document_stem, NodeDescriptor, StructureDocument};
use crate::structure::handle::{LoadOutcome, ProductStructure};
use crate::transport::{Transport, TransportError};
use crate::tree::{NodeId, ProductTree, TreeNode};

/// Errors that can occur while loading a product structure.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid product structure document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Invalid transform on node {node}: {source}")]
    Transform {
        node: String,
        #[source]
        source: TransformError,
    },

    #[error("Product structure load was dropped before it finished")]
    Aborted,
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Future returned by [`load_structure`]. Nothing happens until it is polled.
pub type StructureLoad = LocalBoxFuture<'static, LoadOutcome>;

/// What to do when a subtree cannot be materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failing node; the whole load fails.
    #[default]
    FailFast,

    /// Replace the failing node with a placeholder, skip its children and
    /// carry on with its siblings.
    Continue,
}

/// Loader configuration.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Uniform scale applied once at the root (document units to meters)
    pub unit_scale: f64,

    pub error_policy: ErrorPolicy,

    pub version_fallback: VersionFallback,

    /// Name of the root node returned to the caller
    pub root_name: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            unit_scale: 1.0 / 1000.0, // millimeters to meters
            error_policy: ErrorPolicy::FailFast,
            version_fallback: VersionFallback::FirstRegistered,
            root_name: "ProductStructure".to_string(),
        }
    }
}

/// Collaborators and options for one load.
///
/// Registries and caches are created per load, so sessions never share
/// reference state.
#[derive(Clone)]
pub struct LoadSession {
    pub transport: Rc<dyn Transport>,
    pub assets: Rc<dyn AssetLoader>,
    pub progress: Rc<dyn WorkloadCounter>,
    pub options: LoadOptions,
}

impl LoadSession {
    pub fn new(transport: Rc<dyn Transport>, assets: Rc<dyn AssetLoader>) -> Self {
        Self {
            transport,
            assets,
            progress: Rc::new(ProgressTracker::new()),
            options: LoadOptions::default(),
        }
    }

    pub fn with_progress(mut self, progress: Rc<dyn WorkloadCounter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }
}

/// Statistics of a finished load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Nodes attached below the root, placeholders included
    pub nodes: usize,

    /// Distinct assets loaded
    pub asset_loads: usize,

    /// Placements that reused an already loaded asset
    pub instances: usize,

    /// References resolved to a different version than requested
    pub fallbacks: usize,

    /// One message per placeholder node
    pub placeholders: Vec<String>,
}

/// Start loading the product structure at `url`.
///
/// Returns the root handle right away (empty, scaled by
/// [`LoadOptions::unit_scale`]) and the future that populates it. Two work
/// units are announced before returning; one is completed when the document
/// fetch returns and one when the whole tree is attached.
pub fn load_structure(
    url: impl Into<String>,
    session: LoadSession,
) -> (ProductStructure, StructureLoad) {
    let url = url.into();

    let mut tree = ProductTree::new();
    let mut root_node = TreeNode::container(session.options.root_name.as_str());
    root_node.transform = Transform::from_uniform_scale(session.options.unit_scale);
    let root = tree.add_root(root_node);
    let tree = Rc::new(RefCell::new(tree));

    session.progress.increment_total(STRUCTURE_LOAD_UNITS);

    let (structure, signal) = ProductStructure::new(Rc::clone(&tree), root);
    let load = async move {
        let outcome = run_load(&url, &session, tree, root).await.map_err(Arc::new);
        match &outcome {
            Ok(summary) => log::info!(
                "Loaded product structure {} ({} nodes, {} assets, {} instances)",
                document_stem(&url),
                summary.nodes,
                summary.asset_loads,
                summary.instances
            ),
            Err(err) => log::error!("Failed to load product structure {}: {}", url, err),
        }
        signal.fire(outcome.clone());
        outcome
    }
    .boxed_local();

    (structure, load)
}

async fn run_load(
    url: &str,
    session: &LoadSession,
    tree: Rc<RefCell<ProductTree>>,
    root: NodeId,
) -> LoadResult<LoadSummary> {
    log::info!("Loading product structure {}", url);

    let fetched = session.transport.fetch(url).await;
    session.progress.increment_done(1);
    let bytes = fetched?;

    let document = StructureDocument::from_slice(&bytes)?;

    let mut registry = ReferenceRegistry::new(session.options.version_fallback);
    registry.register_all(&document.export_info.references);
    log::debug!("Registered {} references", registry.len());

    let mut builder = TreeBuilder::new(
        registry,
        AssetCache::new(document_folder(url)),
        Rc::clone(&tree),
        session.assets.as_ref(),
        session.options.error_policy,
    );
    builder.build(root, &document.root).await?;

    session.progress.increment_done(1);
    tree.borrow_mut().mark_complete(root);

    Ok(builder.into_summary())
}

/// Walks a [`NodeDescriptor`] tree and attaches the nodes it describes.
///
/// Children are built in document order, one at a time: a child (and any
/// asset load it waits on) finishes before its next sibling starts.
pub struct TreeBuilder<'a> {
    registry: ReferenceRegistry,
    cache: AssetCache,
    tree: Rc<RefCell<ProductTree>>,
    assets: &'a dyn AssetLoader,
    policy: ErrorPolicy,
    summary: LoadSummary,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        registry: ReferenceRegistry,
        cache: AssetCache,
        tree: Rc<RefCell<ProductTree>>,
        assets: &'a dyn AssetLoader,
        policy: ErrorPolicy,
    ) -> Self {
        Self {
            registry,
            cache,
            tree,
            assets,
            policy,
            summary: LoadSummary::default(),
        }
    }

    /// Materialize `desc` and its subtree as the last child of `parent`.
    ///
    /// The node is attached before its children are built and is marked
    /// complete only once they all are.
    pub fn build<'b>(
        &'b mut self,
        parent: NodeId,
        desc: &'b NodeDescriptor,
    ) -> LocalBoxFuture<'b, LoadResult<NodeId>> {
        async move {
            let (node, transform) = match self.materialize(desc).await {
                Ok(materialized) => materialized,
                Err(err) => return self.recover(parent, desc, err),
            };

            let id = self.tree.borrow_mut().attach(parent, node);
            self.summary.nodes += 1;
            if let Some(transform) = transform {
                self.tree.borrow_mut().set_transform(id, transform);
            }

            for child in &desc.children {
                self.build(id, child).await?;
            }

            self.tree.borrow_mut().mark_complete(id);
            Ok(id)
        }
        .boxed_local()
    }

    /// Create the node for `desc` and decode its transform.
    ///
    /// Reference nodes wait here for the first load of their asset; this is
    /// the only place the builder suspends.
    async fn materialize(
        &mut self,
        desc: &NodeDescriptor,
    ) -> LoadResult<(TreeNode, Option<Transform>)> {
        let name = desc.display_name();
        let transform = desc
            .matrix
            .as_deref()
            .map(decode_affine_3x4)
            .transpose()
            .map_err(|source| LoadError::Transform {
                node: name.to_string(),
                source,
            })?;

        let Some(pointer) = &desc.reference else {
            return Ok((TreeNode::container(name), transform));
        };

        let resolved = self
            .registry
            .resolve_mut(&pointer.reference_name, &pointer.version)?;
        if resolved.fallback_from.is_some() {
            self.summary.fallbacks += 1;
        }

        let acquired = self.cache.acquire(resolved.entry);
        if acquired.first_use {
            if let Err(err) = acquired.handle.wait_ready(self.assets).await {
                self.cache.forget(resolved.entry);
                return Err(err.into());
            }
            log::debug!("Loaded: {}", name);
            self.summary.asset_loads += 1;
        } else {
            self.summary.instances += 1;
        }

        Ok((TreeNode::reference(name, acquired.handle), transform))
    }

    /// Apply the error policy to a node that could not be materialized.
    fn recover(
        &mut self,
        parent: NodeId,
        desc: &NodeDescriptor,
        err: LoadError,
    ) -> LoadResult<NodeId> {
        match self.policy {
            ErrorPolicy::FailFast => Err(err),
            ErrorPolicy::Continue => {
                let name = desc.display_name();
                log::warn!("Skipping {}: {}", name, err);

                let mut tree = self.tree.borrow_mut();
                let id = tree.attach(parent, TreeNode::placeholder(name, err.to_string()));
                tree.mark_complete(id);
                self.summary.nodes += 1;
                self.summary.placeholders.push(format!("{name}: {err}"));
                Ok(id)
            }
        }
    }

    pub fn into_summary(self) -> LoadSummary {
        self.summary
    }
}
