use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pstree_core::{
    load_structure, ErrorPolicy, FileTransport, LoadOptions, LoadSession, NodeId, NodeKind,
    ProductTree, ProgressTracker, VersionFallback,
};

mod assets;

use assets::FileAssetLoader;

#[derive(Parser, Debug)]
#[command(name = "pstree")]
#[command(about = "Load a product structure document and print its assembly tree")]
struct CliArgs {
    /// Path to the product structure JSON document
    document: String,

    /// Scale applied at the root (document units to meters)
    #[arg(long, default_value_t = 0.001)]
    unit_scale: f64,

    /// Replace failing subtrees with placeholders instead of aborting
    #[arg(long)]
    continue_on_error: bool,

    /// Version to use when the requested one is not in the reference list
    #[arg(long, value_enum, default_value_t = Fallback::First)]
    fallback: Fallback,

    /// Only print nodes down to this depth
    #[arg(long)]
    depth: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Fallback {
    First,
    Lowest,
    Highest,
}

impl From<Fallback> for VersionFallback {
    fn from(fallback: Fallback) -> Self {
        match fallback {
            Fallback::First => VersionFallback::FirstRegistered,
            Fallback::Lowest => VersionFallback::Lowest,
            Fallback::Highest => VersionFallback::Highest,
        }
    }
}

impl CliArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            unit_scale: self.unit_scale,
            error_policy: if self.continue_on_error {
                ErrorPolicy::Continue
            } else {
                ErrorPolicy::FailFast
            },
            version_fallback: self.fallback.into(),
            ..LoadOptions::default()
        }
    }
}

fn print_tree(tree: &ProductTree, root: NodeId, max_depth: Option<usize>) {
    for (depth, id) in tree.iter_depth_first(root) {
        if max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        let Some(node) = tree.get(id) else { continue };

        let t = node.transform.translation;
        let mut line = format!(
            "{:indent$}{} ({:.3}, {:.3}, {:.3})",
            "",
            node.name,
            t.x,
            t.y,
            t.z,
            indent = depth * 2
        );
        if let Some(asset) = &node.asset {
            line.push_str(&format!(" -> {}", asset.source()));
            if asset.is_instance() {
                line.push_str(" [instance]");
            }
        }
        if let NodeKind::Placeholder { reason } = &node.kind {
            line.push_str(&format!(" [placeholder: {}]", reason));
        }
        println!("{}", line);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = CliArgs::parse();
    log::info!("Loading product structure {}", args.document);

    let files = FileTransport::new();
    let progress = Rc::new(ProgressTracker::new());
    let session = LoadSession::new(
        Rc::new(files.clone()),
        Rc::new(FileAssetLoader::new(files)),
    )
    .with_progress(progress.clone())
    .with_options(args.load_options());

    let (structure, load) = load_structure(args.document.as_str(), session);
    let outcome = pollster::block_on(load);

    // Whatever was materialized before a failure is still worth showing.
    print_tree(&structure.tree(), structure.root(), args.depth);

    let summary = outcome.with_context(|| format!("Failed to load {}", args.document))?;
    let tree = structure.tree();

    println!();
    println!("Nodes: {}", summary.nodes);
    println!("Assets loaded: {}", summary.asset_loads);
    println!("Instances: {}", summary.instances);
    println!("Version fallbacks: {}", summary.fallbacks);
    println!("Triangles: {}", tree.total_triangle_count());
    println!(
        "Progress: {}/{} ({:.0}%)",
        progress.done(),
        progress.total(),
        progress.fraction() * 100.0
    );
    if !summary.placeholders.is_empty() {
        println!("Placeholders:");
        for message in &summary.placeholders {
            println!("  {}", message);
        }
    }

    Ok(())
}
