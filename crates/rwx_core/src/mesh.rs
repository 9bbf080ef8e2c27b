//! Mesh geometry representation for the RWX scene graph.
//!
//! A [`Mesh`] accumulates vertices and polygon faces in file order. Vertex
//! indices are stable for the lifetime of the mesh: vertices are only ever
//! appended, never reordered, so faces recorded early stay valid.

use rwx_math::{Aabb, DMat4, DVec2, DVec3};
use serde::Serialize;
use thiserror::Error;

/// UV given to vertices declared without `uv` tokens.
pub const DEFAULT_UV: DVec2 = DVec2::new(0.5, 0.5);

/// Errors raised when a face does not fit the mesh it is added to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("face needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("vertex index {index} out of range (mesh has {vertex_count} vertices)")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// One point of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vertex {
    pub position: DVec3,
    pub uv: DVec2,
}

impl Vertex {
    pub fn new(position: DVec3, uv: DVec2) -> Self {
        Self { position, uv }
    }
}

/// A planar polygon referencing vertices of its owning mesh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Face {
    /// 0-based vertex indices, in winding order (at least 3)
    pub indices: Vec<u32>,

    /// Material color active when the face was declared
    pub color: DVec3,

    /// Per-corner tint derived from the vertex normals.
    ///
    /// This is a cheap fake-lighting hint for the host, not real shading.
    /// It is refreshed whenever the face's geometry is transformed.
    pub shaded_colors: Vec<[u8; 3]>,
}

/// A geometry container: vertices, faces and derived per-vertex normals.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Mesh {
    /// Mesh name
    pub name: String,

    /// Vertices (insertion order is index order)
    pub vertices: Vec<Vertex>,

    /// Polygon faces
    pub faces: Vec<Face>,

    /// Set for meshes that carry per-vertex UV and color data
    pub vertex_attributes: bool,

    /// Unnormalized sum of the normals of every face touching each vertex
    #[serde(skip)]
    normal_sums: Vec<DVec3>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an empty mesh flagged as carrying per-vertex UV and color.
    pub fn with_vertex_attributes(name: impl Into<String>) -> Self {
        Self {
            vertex_attributes: true,
            ..Self::new(name)
        }
    }

    /// Append a vertex and return its 0-based index.
    pub fn add_vertex(&mut self, position: DVec3, uv: DVec2) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(position, uv));
        self.normal_sums.push(DVec3::ZERO);
        index
    }

    /// Add a face from 0-based indices and return its index.
    ///
    /// The face's shaded corner colors are computed from the vertex normals
    /// once this face has been accounted for.
    pub fn add_face(&mut self, indices: Vec<u32>, color: DVec3) -> Result<usize, MeshError> {
        if indices.len() < 3 {
            return Err(MeshError::TooFewVertices(indices.len()));
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange { index, vertex_count });
        }

        let normal = self.polygon_normal(&indices);
        for &i in &indices {
            self.normal_sums[i as usize] += normal;
        }

        let shaded_colors = indices
            .iter()
            .map(|&i| shade(self.vertex_normal(i as usize), color))
            .collect();

        self.faces.push(Face {
            indices,
            color,
            shaded_colors,
        });
        Ok(self.faces.len() - 1)
    }

    /// Append all of `source`'s vertices and faces, transforming the copied
    /// positions by `transform`.
    ///
    /// Face indices are offset by this mesh's vertex count before the merge.
    /// Normals are recomputed afterwards and the merged faces reshaded.
    pub fn merge(&mut self, source: &Mesh, transform: DMat4) {
        let offset = self.vertices.len() as u32;
        let first_face = self.faces.len();

        self.vertices.extend(
            source
                .vertices
                .iter()
                .map(|v| Vertex::new(transform.transform_point3(v.position), v.uv)),
        );
        self.faces.extend(source.faces.iter().map(|f| Face {
            indices: f.indices.iter().map(|i| i + offset).collect(),
            color: f.color,
            shaded_colors: f.shaded_colors.clone(),
        }));
        self.vertex_attributes |= source.vertex_attributes;

        self.recompute_normals();
        self.reshade_from(first_face);
    }

    /// Transform every vertex position in place, then recompute normals and
    /// shaded colors.
    pub fn transform(&mut self, transform: DMat4) {
        for vertex in &mut self.vertices {
            vertex.position = transform.transform_point3(vertex.position);
        }
        self.recompute_normals();
        self.reshade_from(0);
    }

    /// Recompute the shaded corner colors of every face from the current
    /// vertex normals.
    pub fn reshade(&mut self) {
        self.reshade_from(0);
    }

    fn reshade_from(&mut self, first_face: usize) {
        let normals: Vec<DVec3> = (0..self.vertices.len()).map(|i| self.vertex_normal(i)).collect();
        for face in self.faces.iter_mut().skip(first_face) {
            face.shaded_colors = face
                .indices
                .iter()
                .map(|&i| shade(normals[i as usize], face.color))
                .collect();
        }
    }

    /// Rebuild the per-vertex normal sums from the current faces.
    pub fn recompute_normals(&mut self) {
        let mut sums = vec![DVec3::ZERO; self.vertices.len()];
        for face in &self.faces {
            let normal = self.polygon_normal(&face.indices);
            for &i in &face.indices {
                sums[i as usize] += normal;
            }
        }
        self.normal_sums = sums;
    }

    /// Smooth normal of a vertex: the normalized average of the normals of
    /// the faces that use it. Zero for vertices without a usable face.
    pub fn vertex_normal(&self, index: usize) -> DVec3 {
        self.normal_sums
            .get(index)
            .and_then(|n| n.try_normalize())
            .unwrap_or(DVec3::ZERO)
    }

    /// Unit normal of a face (right-handed winding), zero if degenerate.
    pub fn face_normal(&self, face: &Face) -> DVec3 {
        self.polygon_normal(&face.indices)
            .try_normalize()
            .unwrap_or(DVec3::ZERO)
    }

    /// Area-weighted normal of a polygon, summed over its fan triangles.
    fn polygon_normal(&self, indices: &[u32]) -> DVec3 {
        let p0 = self.vertices[indices[0] as usize].position;
        indices[1..]
            .windows(2)
            .map(|w| {
                let p1 = self.vertices[w[0] as usize].position;
                let p2 = self.vertices[w[1] as usize].position;
                (p1 - p0).cross(p2 - p0)
            })
            .sum()
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::enclosing(self.vertices.iter().map(|v| v.position))
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces in the mesh.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles the faces decompose into.
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.indices.len() - 2).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }
}

/// Fake-lighting tint: `clamp(255 * (n + 1) * c, 0, 255)` per channel,
/// truncated towards zero.
pub fn shade(normal: DVec3, color: DVec3) -> [u8; 3] {
    let channel = |n: f64, c: f64| (255.0 * (n + 1.0) * c).trunc().clamp(0.0, 255.0) as u8;
    [
        channel(normal.x, color.x),
        channel(normal.y, color.y),
        channel(normal.z, color.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new("tri");
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0), DEFAULT_UV);
        mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0), DEFAULT_UV);
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0), DEFAULT_UV);
        mesh
    }

    #[test]
    fn test_add_face() {
        let mut mesh = triangle_mesh();
        let face = mesh.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        assert_eq!(face, 0);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.faces[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_add_face_rejects_bad_indices() {
        let mut mesh = triangle_mesh();

        assert_eq!(
            mesh.add_face(vec![0, 1, 3], DVec3::ONE),
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
        assert_eq!(
            mesh.add_face(vec![0, 1], DVec3::ONE),
            Err(MeshError::TooFewVertices(2))
        );
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_face_normal_is_right_handed() {
        let mut mesh = triangle_mesh();
        mesh.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        // CCW in the XY plane viewed from +Z
        assert_eq!(mesh.face_normal(&mesh.faces[0]), DVec3::Z);
        assert_eq!(mesh.vertex_normal(0), DVec3::Z);
    }

    #[test]
    fn test_shaded_colors() {
        let mut mesh = triangle_mesh();
        mesh.add_face(vec![0, 1, 2], DVec3::new(1.0, 0.5, 0.25)).unwrap();

        // normal (0, 0, 1): r = 255 * 1 * 1, g = 255 * 1 * 0.5, b = 255 * 2 * 0.25
        assert_eq!(mesh.faces[0].shaded_colors, vec![[255, 127, 127]; 3]);
    }

    #[test]
    fn test_shade_clamps() {
        assert_eq!(shade(DVec3::ONE, DVec3::ONE), [255, 255, 255]);
        assert_eq!(shade(-DVec3::ONE, DVec3::ONE), [0, 0, 0]);
        assert_eq!(shade(DVec3::ZERO, DVec3::ZERO), [0, 0, 0]);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut target = Mesh::new("a");
        target.add_vertex(DVec3::ZERO, DEFAULT_UV);
        target.add_vertex(DVec3::X, DEFAULT_UV);
        target.add_face(vec![0, 1, 0], DVec3::ONE).unwrap();

        let mut source = triangle_mesh();
        source.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        target.merge(&source, DMat4::IDENTITY);

        assert_eq!(target.vertex_count(), 5);
        assert_eq!(target.face_count(), 2);
        assert_eq!(target.faces[1].indices, vec![2, 3, 4]);
    }

    #[test]
    fn test_merge_applies_transform_and_keeps_uv() {
        let mut source = Mesh::new("src");
        source.add_vertex(DVec3::ZERO, DVec2::new(0.1, 0.9));
        source.add_vertex(DVec3::X, DEFAULT_UV);
        source.add_vertex(DVec3::Y, DEFAULT_UV);
        source.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        let mut target = Mesh::new("dst");
        target.merge(&source, DMat4::from_translation(DVec3::new(0.0, 0.0, 5.0)));

        assert_eq!(target.vertices[0].position, DVec3::new(0.0, 0.0, 5.0));
        assert_eq!(target.vertices[0].uv, DVec2::new(0.1, 0.9));
        assert_eq!(target.vertex_normal(0), DVec3::Z);
    }

    #[test]
    fn test_merge_reshades_rotated_faces() {
        let mut source = triangle_mesh();
        source.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();
        assert_eq!(source.faces[0].shaded_colors[0], [255, 255, 255]);

        let mut target = Mesh::new("dst");
        target.merge(&source, DMat4::from_rotation_y(std::f64::consts::PI));

        // normal now points down -Z, so the blue channel goes dark
        let face = &target.faces[0];
        for (corner, &i) in face.indices.iter().enumerate() {
            assert_eq!(face.shaded_colors[corner], shade(target.vertex_normal(i as usize), face.color));
            assert_eq!(face.shaded_colors[corner][2], 0);
        }
    }

    #[test]
    fn test_merge_keeps_existing_tints() {
        let mut target = triangle_mesh();
        target.add_face(vec![0, 1, 2], DVec3::new(1.0, 0.5, 0.25)).unwrap();
        let before = target.faces[0].shaded_colors.clone();

        let mut source = triangle_mesh();
        source.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();
        target.merge(&source, DMat4::from_rotation_x(std::f64::consts::FRAC_PI_2));

        assert_eq!(target.faces[0].shaded_colors, before);
    }

    #[test]
    fn test_transform_reshades() {
        let grey = DVec3::splat(0.5);
        let mut mesh = triangle_mesh();
        mesh.add_face(vec![0, 1, 2], grey).unwrap();
        assert_eq!(mesh.faces[0].shaded_colors[0], [127, 127, 255]);

        mesh.transform(DMat4::from_rotation_x(-std::f64::consts::FRAC_PI_2));

        // +Z turns into +Y
        let expected = shade(mesh.vertex_normal(0), grey);
        assert_eq!(mesh.faces[0].shaded_colors, vec![expected; 3]);
        assert_eq!(expected[0], 127);
        assert!(expected[1] >= 254);
        assert_eq!(expected[2], 127);
    }

    #[test]
    fn test_merge_does_not_alias_source() {
        let mut source = triangle_mesh();
        source.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        let mut target = Mesh::new("dst");
        target.merge(&source, DMat4::IDENTITY);
        target.vertices[0].position = DVec3::splat(9.0);

        assert_eq!(source.vertices[0].position, DVec3::ZERO);
    }

    #[test]
    fn test_triangle_count() {
        let mut mesh = triangle_mesh();
        mesh.add_vertex(DVec3::new(1.0, 1.0, 0.0), DEFAULT_UV);
        mesh.add_face(vec![0, 1, 3, 2], DVec3::ONE).unwrap();
        mesh.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn test_bounds() {
        let mesh = triangle_mesh();
        let bounds = mesh.bounds();

        assert_eq!(bounds.min(), DVec3::ZERO);
        assert_eq!(bounds.max(), DVec3::new(1.0, 1.0, 0.0));
    }
}
