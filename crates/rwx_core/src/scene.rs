//! Scene graph types for RWX imports.
//!
//! Nodes live in an arena owned by [`Scene`] and refer to each other by
//! [`NodeId`]. The parent link is a plain index, so it never keeps a node
//! alive on its own. Prototype working nodes share the arena but are never
//! attached below the root, which keeps them out of the visible hierarchy.

use rwx_math::{Aabb, DMat4, DMat4Ext, DVec3};
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;

/// Active color and opacity.
///
/// Defaults to black and fully transparent until `color`/`opacity` commands
/// say otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialState {
    /// RGB, each channel in [0, 1]
    pub color: DVec3,

    /// Opacity in [0, 1] (0 = transparent)
    pub opacity: f64,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            color: DVec3::ZERO,
            opacity: 0.0,
        }
    }
}

impl MaterialState {
    /// Set the color, clamping each channel to [0, 1].
    pub fn set_color(&mut self, color: DVec3) {
        self.color = color.clamp(DVec3::ZERO, DVec3::ONE);
    }

    /// Set the opacity, clamped to [0, 1].
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

/// Index of a node in its [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the output hierarchy.
#[derive(Clone, Debug, Serialize)]
pub struct SceneNode {
    /// Node name
    pub name: String,

    /// Owned geometry (possibly empty)
    pub mesh: Mesh,

    /// Placement relative to the parent, fixed when the node is created
    pub local_transform: DMat4,

    /// Parent node, `None` for the root and for detached prototype nodes
    pub parent: Option<NodeId>,

    /// Children in creation order
    pub children: Vec<NodeId>,
}

/// A complete imported scene: the node arena and its root.
#[derive(Clone, Debug, Serialize)]
pub struct Scene {
    /// Scene name (usually from filename)
    pub name: String,

    nodes: Vec<SceneNode>,
    root: NodeId,
}

impl Scene {
    /// Create a scene holding a single empty root node.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = SceneNode {
            name: name.clone(),
            mesh: Mesh::new(name.clone()),
            local_transform: DMat4::IDENTITY,
            parent: None,
            children: Vec::new(),
        };
        Self {
            name,
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add a node, attaching it below `parent` when one is given.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        mesh: Mesh,
        parent: Option<NodeId>,
        local_transform: DMat4,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            mesh,
            local_transform,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn mesh(&self, id: NodeId) -> &Mesh {
        &self.nodes[id.0].mesh
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> &mut Mesh {
        &mut self.nodes[id.0].mesh
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Total number of nodes, prototype working nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deep-copy the subtree rooted at `source` below `parent`.
    ///
    /// The copy of `source` gets `placement * local` as its local transform;
    /// deeper copies keep their original local transforms. Copies are named
    /// `iob_<mesh>` with meshes `im_<mesh>`. Returns the copy of `source`.
    pub fn instance_subtree(&mut self, source: NodeId, parent: NodeId, placement: DMat4) -> NodeId {
        let original = &self.nodes[source.0];
        let mut mesh = original.mesh.clone();
        let node_name = format!("iob_{}", mesh.name);
        mesh.name = format!("im_{}", mesh.name);
        let local = placement * original.local_transform;
        let children = original.children.clone();

        let copy = self.add_node(node_name, mesh, Some(parent), local);
        for child in children {
            self.instance_subtree(child, copy, DMat4::IDENTITY);
        }
        copy
    }

    /// Nodes reachable from the root, in pre-order.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.nodes[id.0].children.iter().rev());
        }
        order
    }

    /// Returns true if `id` hangs below the root.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Compose local transforms from the top of the node's chain down.
    pub fn world_matrix(&self, id: NodeId) -> DMat4 {
        let mut matrix = self.nodes[id.0].local_transform;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            matrix = self.nodes[parent.0].local_transform * matrix;
            current = self.parent(parent);
        }
        matrix
    }

    /// Vertex total over the visible hierarchy.
    pub fn vertex_count(&self) -> usize {
        self.visible_nodes()
            .into_iter()
            .map(|id| self.mesh(id).vertex_count())
            .sum()
    }

    /// Face total over the visible hierarchy.
    pub fn face_count(&self) -> usize {
        self.visible_nodes()
            .into_iter()
            .map(|id| self.mesh(id).face_count())
            .sum()
    }

    /// World-space bounding box of all visible geometry.
    pub fn world_bounds(&self) -> Aabb {
        self.visible_nodes()
            .into_iter()
            .map(|id| self.world_matrix(id).transform_aabb(&self.mesh(id).bounds()))
            .fold(Aabb::empty(), |acc, b| Aabb::surrounding(&acc, &b))
    }
}
