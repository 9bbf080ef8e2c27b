//! Handing an imported scene to a host.
//!
//! A host (a DCC tool, an engine, a file writer) implements [`SceneBuilder`]
//! and receives the visible hierarchy through [`export_scene`]. Prototype
//! working nodes are never exported.

use rwx_math::{axis_correction, DMat4};
use serde::{Deserialize, Serialize};

use crate::mesh::{Face, Vertex};
use crate::scene::{NodeId, Scene};

/// Host-side settings for [`export_scene`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Pre-multiply the root transform by the Y-up to Z-up correction
    pub axis_correction: bool,
}

/// Calls a host makes available for building meshes and nodes.
pub trait SceneBuilder {
    type MeshHandle: Clone;
    type NodeHandle: Clone;

    fn create_mesh(&mut self, name: &str) -> Self::MeshHandle;

    fn append_vertices(&mut self, mesh: &Self::MeshHandle, vertices: &[Vertex]);

    fn append_faces(&mut self, mesh: &Self::MeshHandle, faces: &[Face]);

    fn recompute_normals(&mut self, mesh: &Self::MeshHandle);

    fn create_node(
        &mut self,
        mesh: &Self::MeshHandle,
        name: &str,
        parent: Option<&Self::NodeHandle>,
    ) -> Self::NodeHandle;

    fn set_local_transform(&mut self, node: &Self::NodeHandle, matrix: DMat4);

    /// Called once, after every node exists.
    fn finalize(&mut self, root: &Self::NodeHandle);
}

/// Replay the visible part of `scene` into `builder`, parents before
/// children. Returns the host's handle for the root node.
pub fn export_scene<B: SceneBuilder>(
    scene: &Scene,
    builder: &mut B,
    options: &ExportOptions,
) -> B::NodeHandle {
    let root = scene.root();
    let root_handle = export_node(scene, builder, root, None);

    let mut local = scene.node(root).local_transform;
    if options.axis_correction {
        local = axis_correction() * local;
    }
    builder.set_local_transform(&root_handle, local);

    let mut pending: Vec<(NodeId, B::NodeHandle)> = scene
        .children(root)
        .iter()
        .rev()
        .map(|&child| (child, root_handle.clone()))
        .collect();
    while let Some((id, parent)) = pending.pop() {
        let handle = export_node(scene, builder, id, Some(&parent));
        builder.set_local_transform(&handle, scene.node(id).local_transform);
        pending.extend(scene.children(id).iter().rev().map(|&child| (child, handle.clone())));
    }

    builder.finalize(&root_handle);
    root_handle
}

fn export_node<B: SceneBuilder>(
    scene: &Scene,
    builder: &mut B,
    id: NodeId,
    parent: Option<&B::NodeHandle>,
) -> B::NodeHandle {
    let node = scene.node(id);
    let mesh = builder.create_mesh(&node.mesh.name);
    builder.append_vertices(&mesh, &node.mesh.vertices);
    builder.append_faces(&mesh, &node.mesh.faces);
    builder.recompute_normals(&mesh);
    builder.create_node(&mesh, &node.name, parent)
}

/// One call received by a [`RecordingBuilder`]. Handles are indices into
/// the recorder's mesh and node lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BuilderCall {
    CreateMesh { mesh: usize, name: String },
    AppendVertices { mesh: usize, count: usize },
    AppendFaces { mesh: usize, count: usize },
    RecomputeNormals { mesh: usize },
    CreateNode {
        node: usize,
        mesh: usize,
        name: String,
        parent: Option<usize>,
    },
    SetLocalTransform { node: usize, matrix: DMat4 },
    Finalize { root: usize },
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RecordedMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordedNode {
    pub name: String,
    pub mesh: usize,
    pub parent: Option<usize>,
    pub local_transform: DMat4,
}

/// In-memory host that keeps everything it is given.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RecordingBuilder {
    pub calls: Vec<BuilderCall>,
    pub meshes: Vec<RecordedMesh>,
    pub nodes: Vec<RecordedNode>,
    pub root: Option<usize>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a recorded node by name.
    pub fn node_named(&self, name: &str) -> Option<&RecordedNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

impl SceneBuilder for RecordingBuilder {
    type MeshHandle = usize;
    type NodeHandle = usize;

    fn create_mesh(&mut self, name: &str) -> usize {
        let mesh = self.meshes.len();
        self.meshes.push(RecordedMesh {
            name: name.to_string(),
            ..Default::default()
        });
        self.calls.push(BuilderCall::CreateMesh {
            mesh,
            name: name.to_string(),
        });
        mesh
    }

    fn append_vertices(&mut self, mesh: &usize, vertices: &[Vertex]) {
        self.meshes[*mesh].vertices.extend_from_slice(vertices);
        self.calls.push(BuilderCall::AppendVertices {
            mesh: *mesh,
            count: vertices.len(),
        });
    }

    fn append_faces(&mut self, mesh: &usize, faces: &[Face]) {
        self.meshes[*mesh].faces.extend_from_slice(faces);
        self.calls.push(BuilderCall::AppendFaces {
            mesh: *mesh,
            count: faces.len(),
        });
    }

    fn recompute_normals(&mut self, mesh: &usize) {
        self.calls.push(BuilderCall::RecomputeNormals { mesh: *mesh });
    }

    fn create_node(&mut self, mesh: &usize, name: &str, parent: Option<&usize>) -> usize {
        let node = self.nodes.len();
        self.nodes.push(RecordedNode {
            name: name.to_string(),
            mesh: *mesh,
            parent: parent.copied(),
            local_transform: DMat4::IDENTITY,
        });
        self.calls.push(BuilderCall::CreateNode {
            node,
            mesh: *mesh,
            name: name.to_string(),
            parent: parent.copied(),
        });
        node
    }

    fn set_local_transform(&mut self, node: &usize, matrix: DMat4) {
        self.nodes[*node].local_transform = matrix;
        self.calls.push(BuilderCall::SetLocalTransform {
            node: *node,
            matrix,
        });
    }

    fn finalize(&mut self, root: &usize) {
        self.root = Some(*root);
        self.calls.push(BuilderCall::Finalize { root: *root });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, DEFAULT_UV};
    use rwx_math::DVec3;

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("model");
        let root = scene.root();

        let mut mesh = Mesh::with_vertex_attributes("m_line_2");
        mesh.add_vertex(DVec3::ZERO, DEFAULT_UV);
        mesh.add_vertex(DVec3::X, DEFAULT_UV);
        mesh.add_vertex(DVec3::Y, DEFAULT_UV);
        mesh.add_face(vec![0, 1, 2], DVec3::ONE).unwrap();

        let clump = scene.add_node("ob_2", mesh, Some(root), DMat4::from_translation(DVec3::Z));
        scene.add_node("ob_4", Mesh::new("m_line_4"), Some(clump), DMat4::IDENTITY);
        scene.add_node("pob_hidden", Mesh::new("p_hidden"), None, DMat4::IDENTITY);
        scene
    }

    #[test]
    fn test_export_visits_visible_nodes_only() {
        let scene = sample_scene();
        let mut builder = RecordingBuilder::new();
        let root = export_scene(&scene, &mut builder, &ExportOptions::default());

        let names: Vec<_> = builder.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["model", "ob_2", "ob_4"]);
        assert_eq!(builder.root, Some(root));
        assert!(builder.node_named("pob_hidden").is_none());
    }

    #[test]
    fn test_export_preserves_parents_and_transforms() {
        let scene = sample_scene();
        let mut builder = RecordingBuilder::new();
        export_scene(&scene, &mut builder, &ExportOptions::default());

        let clump = builder.node_named("ob_2").unwrap();
        assert_eq!(clump.parent, Some(0));
        assert_eq!(clump.local_transform, DMat4::from_translation(DVec3::Z));
        assert_eq!(builder.node_named("ob_4").unwrap().parent, Some(1));

        let mesh = &builder.meshes[clump.mesh];
        assert_eq!(mesh.name, "m_line_2");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn test_export_call_order() {
        let scene = Scene::new("empty");
        let mut builder = RecordingBuilder::new();
        export_scene(&scene, &mut builder, &ExportOptions::default());

        assert_eq!(
            builder.calls,
            vec![
                BuilderCall::CreateMesh {
                    mesh: 0,
                    name: "empty".to_string()
                },
                BuilderCall::AppendVertices { mesh: 0, count: 0 },
                BuilderCall::AppendFaces { mesh: 0, count: 0 },
                BuilderCall::RecomputeNormals { mesh: 0 },
                BuilderCall::CreateNode {
                    node: 0,
                    mesh: 0,
                    name: "empty".to_string(),
                    parent: None
                },
                BuilderCall::SetLocalTransform {
                    node: 0,
                    matrix: DMat4::IDENTITY
                },
                BuilderCall::Finalize { root: 0 },
            ]
        );
    }

    #[test]
    fn test_axis_correction_applies_to_root_only() {
        let scene = sample_scene();
        let mut builder = RecordingBuilder::new();
        export_scene(
            &scene,
            &mut builder,
            &ExportOptions {
                axis_correction: true,
            },
        );

        assert_eq!(builder.nodes[0].local_transform, axis_correction());
        assert_eq!(
            builder.node_named("ob_2").unwrap().local_transform,
            DMat4::from_translation(DVec3::Z)
        );
    }
}
