//! The RWX command interpreter.
//!
//! [`Interpreter`] owns every piece of state one import needs: the scene
//! arena, the current node, the three scoped stacks (transform, joint
//! transform, material) and the prototype registry. Nothing is global, so
//! independent imports can run side by side.
//!
//! Lines are processed strictly in order. A line that fails is logged and
//! recorded as a [`LineError`], and processing continues with the next line.

use rwx_math::{affine_from_row_major, rotation_degrees, DMat4, DVec2, DVec3};

use crate::mesh::Mesh;
use crate::primitives;
use crate::rwx::command::{Command, CommandError, CommandResult};
use crate::rwx::loader::ImportOptions;
use crate::rwx::prototype::PrototypeRegistry;
use crate::scene::{MaterialState, NodeId, Scene};
use crate::stack::{ScopedStack, StackKind, StackUnderflow, TransformStack};
use crate::triangulate::fan_triangulate;

/// A line that failed, kept for the caller alongside the log message.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    /// Trimmed line text
    pub content: String,
    pub error: CommandError,
}

/// A line whose keyword is outside the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedLine {
    pub line: usize,
    pub content: String,
}

/// Everything one import produced.
#[derive(Debug, Clone)]
pub struct RwxImport {
    /// The built hierarchy; prototype working nodes are detached from its root
    pub scene: Scene,
    /// Lines that failed, in file order
    pub errors: Vec<LineError>,
    /// Lines that were skipped as unrecognized, in file order
    pub unrecognized: Vec<UnrecognizedLine>,
    /// Names of all prototypes defined by the file
    pub prototypes: Vec<String>,
    /// Number of lines read
    pub line_count: usize,
}

impl RwxImport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// State saved by `protobegin` and restored by `protoend`.
#[derive(Debug, Clone)]
struct ProtoContext {
    name: String,
    resume: NodeId,
    /// Open scopes before the definition's own scope
    scope_depth: usize,
}

/// Stack machine turning RWX command lines into a [`Scene`].
pub struct Interpreter {
    scene: Scene,
    current: NodeId,
    transforms: TransformStack,
    joints: TransformStack,
    materials: ScopedStack<MaterialState>,
    prototypes: PrototypeRegistry,
    proto: Option<ProtoContext>,
    default_uv: DVec2,
    errors: Vec<LineError>,
    unrecognized: Vec<UnrecognizedLine>,
    line_count: usize,
}

impl Interpreter {
    /// Fresh interpreter with an empty root node named after `name`.
    pub fn new(name: &str, options: &ImportOptions) -> Self {
        let scene = Scene::new(name);
        let current = scene.root();
        Self {
            scene,
            current,
            transforms: TransformStack::identity(StackKind::Transform),
            joints: TransformStack::identity(StackKind::JointTransform),
            materials: ScopedStack::new(StackKind::Material, MaterialState::default()),
            prototypes: PrototypeRegistry::new(),
            proto: None,
            default_uv: DVec2::from_array(options.default_uv),
            errors: Vec::new(),
            unrecognized: Vec::new(),
            line_count: 0,
        }
    }

    /// Process one line. Failures are logged and recorded, never propagated.
    pub fn process_line(&mut self, line_no: usize, line: &str) {
        self.line_count = self.line_count.max(line_no);

        let result = Command::parse(line).and_then(|command| match command {
            None => Ok(()),
            Some(Command::Unrecognized(_)) => {
                self.skip(line_no, line.trim());
                Ok(())
            }
            Some(command) => self.execute(command, line_no),
        });

        if let Err(error) = result {
            log::warn!("Error at line {}: {} ('{}')", line_no, error, line.trim());
            self.errors.push(LineError {
                line: line_no,
                content: line.trim().to_string(),
                error,
            });
        }
    }

    /// Apply one parsed command.
    pub fn execute(&mut self, command: Command, line_no: usize) -> CommandResult<()> {
        match command {
            Command::ModelBegin => self.begin_model(),
            Command::ModelEnd => Ok(()),
            Command::ProtoBegin(name) => self.begin_prototype(name),
            Command::ProtoEnd => self.end_prototype(),
            Command::ProtoInstance(name) => self.instantiate(&name),
            Command::ClumpBegin => {
                self.begin_clump(line_no);
                Ok(())
            }
            Command::ClumpEnd => self.end_clump(),

            Command::Vertex { position, uv } => {
                let uv = uv.unwrap_or(self.default_uv);
                self.current_mesh_mut().add_vertex(position, uv);
                Ok(())
            }
            Command::Triangle(indices) => self.add_face("triangle", indices.to_vec()),
            Command::Quad(indices) => self.add_face("quad", indices.to_vec()),
            Command::Polygon(indices) => self.add_polygon(&indices),
            Command::Block(size) => {
                let block = primitives::block(size, self.materials.top().color);
                let placement = *self.transforms.top();
                self.current_mesh_mut().merge(&block, placement);
                Ok(())
            }

            Command::Identity => {
                self.transforms.reset();
                Ok(())
            }
            Command::TransformBegin => {
                self.transforms.push();
                Ok(())
            }
            Command::TransformEnd => self.transforms.pop().map(drop).map_err(Into::into),
            Command::Translate(offset) => {
                self.transforms.translate(offset);
                Ok(())
            }
            Command::Rotate { axis, degrees } => {
                let rotation = rotation("rotate", axis, degrees)?;
                self.transforms.compose(rotation);
                Ok(())
            }
            Command::Scale(factors) => {
                self.transforms.scale(factors);
                Ok(())
            }
            Command::Transform(values) => {
                self.transforms.replace(affine_from_row_major(&values));
                Ok(())
            }

            Command::IdentityJoint => {
                self.joints.reset();
                Ok(())
            }
            Command::JointTransformBegin => {
                self.joints.push();
                Ok(())
            }
            Command::JointTransformEnd => self.joints.pop().map(drop).map_err(Into::into),
            Command::RotateJoint { axis, degrees } => {
                let rotation = rotation("rotatejoint", axis, degrees)?;
                self.joints.compose(rotation);
                Ok(())
            }
            Command::TransformJoint(values) => {
                self.joints.replace(affine_from_row_major(&values));
                Ok(())
            }

            Command::Color(color) => {
                self.materials.top_mut().set_color(color);
                Ok(())
            }
            Command::Opacity(opacity) => {
                self.materials.top_mut().set_opacity(opacity);
                Ok(())
            }
            Command::Surface | Command::LightSampling => Ok(()),

            Command::Unrecognized(keyword) => {
                self.skip(line_no, &keyword);
                Ok(())
            }
        }
    }

    /// The scene built so far.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Node that receives geometry and new clumps.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Top of the transform stack.
    pub fn transform(&self) -> DMat4 {
        *self.transforms.top()
    }

    /// Top of the joint transform stack.
    ///
    /// Maintained alongside the transform stack; nothing in the geometry path
    /// reads it.
    pub fn joint_transform(&self) -> DMat4 {
        *self.joints.top()
    }

    /// Active material state.
    pub fn material(&self) -> MaterialState {
        *self.materials.top()
    }

    /// Name of the prototype being defined, if any.
    pub fn defining_prototype(&self) -> Option<&str> {
        self.proto.as_ref().map(|ctx| ctx.name.as_str())
    }

    pub fn prototypes(&self) -> &PrototypeRegistry {
        &self.prototypes
    }

    pub fn errors(&self) -> &[LineError] {
        &self.errors
    }

    /// Finish the run and hand back everything built, failed lines included.
    pub fn finish(self) -> RwxImport {
        if let Some(ctx) = &self.proto {
            log::warn!("Prototype `{}` was never closed with protoend", ctx.name);
        }
        let open_scopes = self.transforms.scope_depth();
        if open_scopes > 0 {
            log::warn!("{} scope(s) still open at end of input", open_scopes);
        }

        log::info!(
            "Imported '{}': {} nodes, {} vertices, {} faces, {} prototypes ({} errors, {} skipped lines)",
            self.scene.name,
            self.scene.visible_nodes().len(),
            self.scene.vertex_count(),
            self.scene.face_count(),
            self.prototypes.len(),
            self.errors.len(),
            self.unrecognized.len()
        );

        RwxImport {
            prototypes: self.prototypes.names(),
            scene: self.scene,
            errors: self.errors,
            unrecognized: self.unrecognized,
            line_count: self.line_count,
        }
    }

    fn skip(&mut self, line_no: usize, content: &str) {
        log::info!("Skipping unrecognized command at line {}: '{}'", line_no, content);
        self.unrecognized.push(UnrecognizedLine {
            line: line_no,
            content: content.to_string(),
        });
    }

    fn current_mesh_mut(&mut self) -> &mut Mesh {
        self.scene.mesh_mut(self.current)
    }

    fn begin_model(&mut self) -> CommandResult<()> {
        if let Some(ctx) = &self.proto {
            return Err(CommandError::StructuralMisuse(format!(
                "modelbegin inside definition of prototype `{}`",
                ctx.name
            )));
        }
        if self.current != self.scene.root() {
            return Err(CommandError::StructuralMisuse(
                "modelbegin inside an open clump".to_string(),
            ));
        }
        Ok(())
    }

    fn begin_clump(&mut self, line_no: usize) {
        let placement = *self.transforms.top();
        let mesh = Mesh::with_vertex_attributes(format!("m_line_{line_no}"));
        let node = self
            .scene
            .add_node(format!("ob_{line_no}"), mesh, Some(self.current), placement);
        self.current = node;

        self.transforms.open_identity_scope();
        self.joints.open_identity_scope();
        let inherited = *self.materials.top();
        self.materials.open_scope(inherited);

        log::debug!("Opened clump ob_{} (depth {})", line_no, self.transforms.scope_depth());
    }

    fn end_clump(&mut self) -> CommandResult<()> {
        let parent = self
            .scene
            .parent(self.current)
            .ok_or(StackUnderflow(StackKind::Transform))?;

        let unclosed_transforms = self.transforms.close_scope()?;
        let unclosed_joints = self.joints.close_scope()?;
        self.materials.close_scope()?;
        self.current = parent;

        log::debug!("Closed clump (depth {})", self.transforms.scope_depth());

        // The clump is closed either way; leftovers are reported, not kept.
        if unclosed_transforms > 0 {
            return Err(StackUnderflow(StackKind::Transform).into());
        }
        if unclosed_joints > 0 {
            return Err(StackUnderflow(StackKind::JointTransform).into());
        }
        Ok(())
    }

    fn begin_prototype(&mut self, name: String) -> CommandResult<()> {
        if let Some(ctx) = &self.proto {
            return Err(CommandError::StructuralMisuse(format!(
                "protobegin `{}` inside definition of prototype `{}`",
                name, ctx.name
            )));
        }

        let mesh = Mesh::with_vertex_attributes(format!("p_{name}"));
        let node = self
            .scene
            .add_node(format!("pob_{name}"), mesh, None, DMat4::IDENTITY);
        if self.prototypes.begin(&name, node).is_some() {
            log::warn!("Prototype `{}` redefined; the new definition replaces it", name);
        }
        log::debug!("Defining prototype `{}`", name);

        self.proto = Some(ProtoContext {
            name,
            resume: self.current,
            scope_depth: self.transforms.scope_depth(),
        });
        self.current = node;

        // The definition gets its own floor, inheriting the enclosing state.
        let transform = *self.transforms.top();
        self.transforms.open_scope(transform);
        let joint = *self.joints.top();
        self.joints.open_scope(joint);
        let material = *self.materials.top();
        self.materials.open_scope(material);
        Ok(())
    }

    fn end_prototype(&mut self) -> CommandResult<()> {
        let ctx = self.proto.take().ok_or_else(|| {
            CommandError::StructuralMisuse("protoend outside a prototype definition".to_string())
        })?;

        // Clumps left open inside the definition, then the definition's scope
        let mut open_clumps = 0;
        while self.transforms.scope_depth() > ctx.scope_depth + 1 {
            self.close_scopes()?;
            open_clumps += 1;
        }
        self.close_scopes()?;
        if open_clumps > 0 {
            log::warn!(
                "Prototype `{}` ended with {} open clump(s); closing them",
                ctx.name,
                open_clumps
            );
        }

        self.prototypes.finalize(&ctx.name);
        self.current = ctx.resume;
        log::debug!("Finished prototype `{}`", ctx.name);
        Ok(())
    }

    fn close_scopes(&mut self) -> CommandResult<()> {
        self.transforms.close_scope()?;
        self.joints.close_scope()?;
        self.materials.close_scope()?;
        Ok(())
    }

    /// Copy a finalized prototype into the current node at the current
    /// transform. Fails without touching the scene if the name is unknown.
    fn instantiate(&mut self, name: &str) -> CommandResult<()> {
        let proto = self.prototypes.resolve(name)?;
        let placement = *self.transforms.top();

        let source = self.scene.mesh(proto).clone();
        let children = self.scene.children(proto).to_vec();
        for child in children {
            self.scene.instance_subtree(child, self.current, placement);
        }
        self.current_mesh_mut().merge(&source, placement);
        Ok(())
    }

    fn add_face(&mut self, command: &'static str, indices: Vec<u32>) -> CommandResult<()> {
        let color = self.materials.top().color;
        self.current_mesh_mut()
            .add_face(indices, color)
            .map(drop)
            .map_err(|e| CommandError::from_mesh(command, e))
    }

    /// Fan-triangulate a polygon into the current mesh. All indices are
    /// checked first so a bad polygon adds nothing.
    fn add_polygon(&mut self, indices: &[u32]) -> CommandResult<()> {
        let vertex_count = self.scene.mesh(self.current).vertex_count();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(CommandError::malformed(
                "polygon",
                format!("vertex index {} out of range (mesh has {} vertices)", index + 1, vertex_count),
            ));
        }
        for triangle in fan_triangulate(indices) {
            self.add_face("polygon", triangle.to_vec())?;
        }
        Ok(())
    }
}

fn rotation(command: &'static str, axis: DVec3, degrees: f64) -> CommandResult<DMat4> {
    rotation_degrees(axis, degrees)
        .ok_or_else(|| CommandError::malformed(command, "rotation axis has zero length"))
}
