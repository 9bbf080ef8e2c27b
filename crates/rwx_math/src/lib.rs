// Re-export glam for convenience
pub use glam::*;

// RWX math types
mod aabb;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use transform::{affine_from_row_major, axis_correction, rotation_degrees, DMat4Ext};
