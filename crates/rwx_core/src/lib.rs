//! RWX Core - Scene graph and RWX import.
//!
//! This crate provides:
//!
//! - **Scene graph types**: `Scene`, `SceneNode`, `Mesh`, `MaterialState`
//! - **RWX support**: command parsing, interpretation and scene loading
//! - **Host export**: the `SceneBuilder` contract and an in-memory recorder
//!
//! # Example
//!
//! ```ignore
//! use rwx_core::rwx::load_rwx;
//!
//! // Load an RWX model
//! let import = load_rwx("model.rwx")?;
//! println!("Loaded {} nodes with {} faces ({} bad lines)",
//!     import.scene.visible_nodes().len(),
//!     import.scene.face_count(),
//!     import.errors.len());
//! ```

pub mod mesh;
pub mod primitives;
pub mod rwx;
pub mod scene;
pub mod stack;
pub mod triangulate;

// Re-export commonly used types
pub use mesh::{Face, Mesh, Vertex};
pub use rwx::{export_scene, load_rwx, load_rwx_dir, load_rwx_from_string, ExportOptions, ImportOptions, RwxImport};
pub use scene::{MaterialState, NodeId, Scene, SceneNode};
