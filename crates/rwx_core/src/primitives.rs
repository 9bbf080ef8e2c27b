//! Canonical primitives generated by RWX commands.

use rwx_math::{DMat4, DVec3};

use crate::mesh::{Face, Mesh, DEFAULT_UV};

/// Corners of the cube spanning `[-1, 1]` on every axis.
const CUBE_CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Quads wound counter-clockwise when seen from outside.
const CUBE_FACES: [[u32; 4]; 6] = [
    [0, 3, 2, 1], // -Z
    [4, 5, 6, 7], // +Z
    [0, 1, 5, 4], // -Y
    [3, 7, 6, 2], // +Y
    [0, 4, 7, 3], // -X
    [1, 2, 6, 5], // +X
];

/// The cube spanning `[-1, 1]`, eight vertices and six quads.
pub fn unit_cube(color: DVec3) -> Mesh {
    let mut mesh = Mesh::new("block");
    for corner in CUBE_CORNERS {
        mesh.add_vertex(DVec3::from_array(corner), DEFAULT_UV);
    }
    mesh.faces.extend(CUBE_FACES.iter().map(|quad| Face {
        indices: quad.to_vec(),
        color,
        shaded_colors: Vec::new(),
    }));
    mesh.recompute_normals();
    mesh.reshade();
    mesh
}

/// An axis-aligned box of the given full extents centered on the origin.
///
/// The unit cube is scaled by half of `size` on each axis; placing the box
/// with the current transform is the caller's job.
pub fn block(size: DVec3, color: DVec3) -> Mesh {
    let mut mesh = unit_cube(color);
    mesh.transform(DMat4::from_scale(size * 0.5));
    mesh
}
