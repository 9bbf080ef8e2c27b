//! RWX (RenderWare script) support.
//!
//! This module interprets the line-oriented RWX command language and builds
//! a [`Scene`](crate::scene::Scene) hierarchy from it.
//!
//! ## Supported Features
//!
//! - Clump hierarchies (`clumpbegin`/`clumpend`) with per-clump meshes
//! - Vertices with optional UVs; triangles, quads and fan-triangulated polygons
//! - Transform and joint transform stacks (`transformbegin`, `translate`,
//!   `rotate`, `scale`, `transform`, ...)
//! - Prototypes (`protobegin`/`protoend`/`protoinstance`)
//! - `block` primitives
//! - Color and opacity, with fake-lighting face tints
//!
//! ## Not Supported
//!
//! - Textures, surface properties and light sampling (parsed and ignored)
//! - Other primitives (`cone`, `cylinder`, `sphere`, ...), skipped as
//!   unrecognized
//!
//! # Example
//!
//! ```ignore
//! use rwx_core::rwx::{export_scene, load_rwx, ExportOptions, RecordingBuilder};
//!
//! let import = load_rwx("path/to/model.rwx")?;
//! let mut builder = RecordingBuilder::new();
//! export_scene(&import.scene, &mut builder, &ExportOptions::default());
//! ```

mod builder;
mod command;
mod interpreter;
mod loader;
mod prototype;

pub use builder::*;
pub use command::*;
pub use interpreter::*;
pub use loader::*;
pub use prototype::*;
