//! Geometry payloads bound to referenced assets.
//!
//! The loader never inspects geometry itself; it only needs something it can
//! share between the canonical asset and its instances. A [`GeometryLibrary`]
//! is what an [`AssetLoader`](crate::asset::AssetLoader) produces for one
//! referenced file.

use pstree_math::Vec3;
use serde::Deserialize;

/// A triangle mesh: vertex positions plus triangle indices.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Mesh {
    /// Mesh name inside its source file
    #[serde(default)]
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Triangle indices (every 3 indices form a triangle)
    #[serde(default)]
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh from positions and indices.
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices,
        }
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        if self.positions.is_empty() {
            return None;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for pos in &self.positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }
        Some((min, max))
    }
}

/// All geometry loaded from one referenced asset file.
///
/// Immutable once loaded; shared by `Arc` between every instance of the asset.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeometryLibrary {
    /// URL the library was loaded from
    #[serde(default)]
    pub source: String,

    /// Meshes contained in the asset
    #[serde(default)]
    pub meshes: Vec<Mesh>,
}

impl GeometryLibrary {
    /// Create an empty library for `source`.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            meshes: Vec::new(),
        }
    }

    /// Create a library from a set of meshes.
    pub fn with_meshes(source: impl Into<String>, meshes: Vec<Mesh>) -> Self {
        Self {
            source: source.into(),
            meshes,
        }
    }

    /// Total triangle count over all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Number of meshes in the library.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
