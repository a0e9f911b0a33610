//! pstree core - product structure trees for CAD assemblies.
//!
//! This crate provides:
//!
//! - **Document model**: the exported JSON product structure
//! - **Reference registry and asset cache**: one load per referenced part,
//!   instances after that
//! - **Product tree**: the materialized node hierarchy
//! - **Loader**: asynchronous, reference-resolving tree materialization
//!
//! # Example
//!
//! ```ignore
//! use pstree_core::structure::{load_structure, LoadSession};
//!
//! let (structure, load) = load_structure("car/structure.json", session);
//! let summary = pollster::block_on(load)?;
//! println!("Loaded {} nodes, {} instances",
//!     summary.nodes,
//!     summary.instances);
//! ```

pub mod asset;
pub mod mesh;
pub mod progress;
pub mod reference;
pub mod structure;
pub mod transport;
pub mod tree;

// Re-export commonly used types
pub use asset::{AssetCache, AssetError, AssetHandle, AssetLoader};
pub use mesh::{GeometryLibrary, Mesh};
pub use progress::{ProgressTracker, WorkloadCounter};
pub use reference::{ReferenceEntry, ReferenceRegistry, VersionFallback};
pub use structure::{
    load_structure, ErrorPolicy, LoadError, LoadOptions, LoadOutcome, LoadSession, LoadSummary,
    ProductStructure, StructureDocument,
};
pub use transport::{FileTransport, MemoryTransport, Transport, TransportError};
pub use tree::{NodeId, NodeKind, ProductTree, TreeNode};
