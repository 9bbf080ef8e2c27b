//! Example: Load an RWX file and replay it into a recording host.
//!
//! Run with: cargo run --example load_rwx -- path/to/model.rwx

use std::env;

use rwx_core::rwx::{export_scene, load_rwx, BuilderCall, ExportOptions, RecordingBuilder};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: load_rwx <path-to-rwx-file>");
        println!("\nExample:");
        println!("  cargo run --example load_rwx -- models/chair.rwx");
        return;
    }

    let path = &args[1];
    println!("Loading RWX file: {}", path);

    match load_rwx(path) {
        Ok(import) => {
            let mut builder = RecordingBuilder::new();
            export_scene(&import.scene, &mut builder, &ExportOptions { axis_correction: true });

            println!("\n=== Scene: {} ===", import.scene.name);
            println!("Nodes exported: {}", builder.nodes.len());
            println!("Prototypes: {}", import.prototypes.len());
            println!("Bad lines: {}", import.errors.len());

            println!("\n--- Builder Calls ---");
            for call in &builder.calls {
                match call {
                    BuilderCall::CreateNode { node, name, parent, .. } => {
                        println!("  node [{}] {} (parent {:?})", node, name, parent);
                    }
                    BuilderCall::AppendFaces { mesh, count } if *count > 0 => {
                        println!("  mesh [{}] += {} faces", mesh, count);
                    }
                    _ => {}
                }
            }
        }
        Err(e) => {
            eprintln!("Error loading RWX file: {}", e);
        }
    }
}
