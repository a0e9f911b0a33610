//! Example: Load a small in-memory product structure and inspect it.
//!
//! Run with: cargo run --example load_structure

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use pstree_core::mesh::{GeometryLibrary, Mesh};
use pstree_core::{
    load_structure, AssetError, AssetLoader, LoadSession, MemoryTransport, ProgressTracker,
};
use pstree_math::Vec3;

const STRUCTURE: &str = r#"{
  "Export_Info": {
    "Reference List": [
      { "Name": "Chassis", "V_version": "1", "url": "chassis.zcad" },
      { "Name": "Wheel", "V_version": "2", "url": "wheel.zcad" }
    ]
  },
  "Root": {
    "Instance": { "instanceName": "Car" },
    "children": [
      {
        "Instance": { "instanceName": "Chassis.1" },
        "Reference": { "referenceName": "Chassis", "V_version": "1" }
      },
      {
        "Instance": { "instanceName": "Wheel.FL" },
        "Reference": { "referenceName": "Wheel", "V_version": "2" },
        "matrix": [1,0,0,800, 0,1,0,0, 0,0,1,1500]
      },
      {
        "Instance": { "instanceName": "Wheel.FR" },
        "Reference": { "referenceName": "Wheel", "V_version": "3" },
        "matrix": [1,0,0,-800, 0,1,0,0, 0,0,1,1500]
      }
    ]
  }
}"#;

/// Hands out a single triangle for every asset.
struct TriangleLoader;

impl AssetLoader for TriangleLoader {
    fn load<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<GeometryLibrary, AssetError>> {
        async move {
            let mesh = Mesh::new(
                "tri",
                vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                vec![0, 1, 2],
            );
            Ok(GeometryLibrary::with_meshes(url, vec![mesh]))
        }
        .boxed_local()
    }
}

fn main() {
    env_logger::init();

    let transport = MemoryTransport::new().with("models/car/structure.json", STRUCTURE);
    let progress = Rc::new(ProgressTracker::new());
    let session = LoadSession::new(Rc::new(transport), Rc::new(TriangleLoader))
        .with_progress(progress.clone());

    let (structure, load) = load_structure("models/car/structure.json", session);
    println!(
        "Root available before loading: {}",
        structure.with_root(|root| root.name.clone()).unwrap_or_default()
    );

    match futures::executor::block_on(load) {
        Ok(summary) => {
            let tree = structure.tree();
            let root_name = structure
                .with_root(|root| root.name.clone())
                .unwrap_or_default();
            println!("\n=== {} ===", root_name);
            println!("Nodes: {}", summary.nodes);
            println!("Assets loaded: {}", summary.asset_loads);
            println!("Instances: {}", summary.instances);
            println!("Version fallbacks: {}", summary.fallbacks);
            println!("Progress: {:.0}%", progress.fraction() * 100.0);

            println!("\n--- Tree ---");
            for (depth, id) in tree.iter_depth_first(structure.root()) {
                let Some(node) = tree.get(id) else { continue };
                let pos = tree.world_position(id);
                println!(
                    "  {:indent$}{} at ({:.2}, {:.2}, {:.2}){}",
                    "",
                    node.name,
                    pos.x,
                    pos.y,
                    pos.z,
                    if node.is_instance() { " [instance]" } else { "" },
                    indent = depth * 2
                );
            }
        }
        Err(e) => {
            eprintln!("Error loading product structure: {}", e);
        }
    }
}
