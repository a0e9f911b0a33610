//! Product structure documents and their asynchronous materialization.
//!
//! A product structure is a JSON export of a CAD assembly: a reference list
//! of named, versioned sub-assembly files plus a node tree placing them.
//!
//! ## Loading
//!
//! - The root node is returned before any fetch happens, scaled from
//!   millimeters to meters.
//! - Each (reference, version) is loaded once; repeated placements are
//!   instances sharing the same geometry.
//! - Children are materialized in document order, one at a time.
//! - A missing reference version falls back to another registered version.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use pstree_core::structure::{load_structure, LoadSession};
//! use pstree_core::transport::FileTransport;
//!
//! let session = LoadSession::new(Rc::new(FileTransport::new()), Rc::new(my_asset_loader));
//! let (structure, load) = load_structure("data/car/structure.json", session);
//! let summary = pollster::block_on(load)?;
//! println!("{} nodes", structure.tree().node_count());
//! ```

mod document;
mod handle;
mod loader;

pub use document::*;
pub use handle::*;
pub use loader::*;
