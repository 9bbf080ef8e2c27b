use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rwx_core::rwx::{
    export_scene, load_rwx_dir, load_rwx_with_options, ExportOptions, ImportOptions, RecordingBuilder, RwxImport,
};
use rwx_core::{NodeId, Scene};
use rwx_math::{Aabb, DVec3};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect RWX models", long_about = None)]
struct Args {
    /// RWX file, or a directory of .rwx files
    path: PathBuf,

    /// Import options as a JSON file
    #[arg(long)]
    options: Option<PathBuf>,

    /// Override the root node name
    #[arg(long)]
    name: Option<String>,

    /// Rotate the exported root from Y-up to Z-up
    #[arg(long, default_value_t = false)]
    z_up: bool,

    /// Print the exported hierarchy as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Exit with an error if any line failed
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut options = match &args.options {
        Some(path) => read_options(path)?,
        None => ImportOptions::default(),
    };
    if args.name.is_some() {
        options.name = args.name.clone();
    }
    log::debug!("Import options: {:?}", options);
    let export = ExportOptions {
        axis_correction: args.z_up,
    };

    if args.path.is_dir() {
        return inspect_dir(&args, &options, &export);
    }

    let import = load_rwx_with_options(&args.path, &options)
        .with_context(|| format!("Failed to open {}", args.path.display()))?;
    let mut builder = RecordingBuilder::new();
    export_scene(&import.scene, &mut builder, &export);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&builder)?);
    } else {
        print_summary(&import, &builder);
    }

    if args.strict && import.has_errors() {
        bail!("{} line(s) failed in {}", import.errors.len(), args.path.display());
    }
    Ok(())
}

fn read_options(path: &Path) -> Result<ImportOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid options file {}", path.display()))
}

fn inspect_dir(args: &Args, options: &ImportOptions, export: &ExportOptions) -> Result<()> {
    let results = load_rwx_dir(&args.path, options)
        .with_context(|| format!("Failed to load directory {}", args.path.display()))?;

    let mut failed_lines = 0;
    println!("=== {} ({} files) ===", args.path.display(), results.len());
    for (path, result) in &results {
        match result {
            Ok(import) => {
                let mut builder = RecordingBuilder::new();
                export_scene(&import.scene, &mut builder, export);
                println!(
                    "  {:<32} {:>5} nodes {:>7} vertices {:>7} faces {:>3} errors",
                    file_label(path),
                    builder.nodes.len(),
                    import.scene.vertex_count(),
                    import.scene.face_count(),
                    import.errors.len()
                );
                failed_lines += import.errors.len();
            }
            Err(e) => println!("  {:<32} failed: {}", file_label(path), e),
        }
    }

    if args.strict && (failed_lines > 0 || results.iter().any(|(_, r)| r.is_err())) {
        bail!("{} line(s) failed across {}", failed_lines, args.path.display());
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(import: &RwxImport, builder: &RecordingBuilder) {
    let scene = &import.scene;
    println!("\n=== Scene: {} ===", scene.name);
    println!("Lines: {}", import.line_count);
    println!("Nodes: {}", builder.nodes.len());
    println!("Vertices: {}", scene.vertex_count());
    println!("Faces: {}", scene.face_count());
    if !import.prototypes.is_empty() {
        println!("Prototypes: {}", import.prototypes.join(", "));
    }

    println!("\n--- Hierarchy ---");
    print_node(scene, scene.root(), 1);

    println!("\n--- World Bounds ---");
    print_bounds(&scene.world_bounds());

    if !import.errors.is_empty() {
        println!("\n--- Errors ({}) ---", import.errors.len());
        for err in &import.errors {
            println!("  line {}: {} ('{}')", err.line, err.error, err.content);
        }
    }
    if !import.unrecognized.is_empty() {
        println!("\n--- Skipped ({}) ---", import.unrecognized.len());
        for line in &import.unrecognized {
            println!("  line {}: {}", line.line, line.content);
        }
    }
}

fn print_node(scene: &Scene, id: NodeId, depth: usize) {
    let node = scene.node(id);
    let origin = scene.world_matrix(id).transform_point3(DVec3::ZERO);
    println!(
        "{:indent$}{} [{}] {} vertices, {} faces at ({:.2}, {:.2}, {:.2})",
        "",
        node.name,
        node.mesh.name,
        node.mesh.vertex_count(),
        node.mesh.face_count(),
        origin.x,
        origin.y,
        origin.z,
        indent = depth * 2
    );
    for &child in scene.children(id) {
        print_node(scene, child, depth + 1);
    }
}

fn print_bounds(bounds: &Aabb) {
    if bounds.is_empty() {
        println!("  (no geometry)");
        return;
    }
    let (min, max) = (bounds.min(), bounds.max());
    println!("  Min: ({:.2}, {:.2}, {:.2})", min.x, min.y, min.z);
    println!("  Max: ({:.2}, {:.2}, {:.2})", max.x, max.y, max.z);
}
