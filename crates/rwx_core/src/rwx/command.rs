//! RWX command line tokenizer and classifier.
//!
//! Each non-empty line holds one command: a case-insensitive keyword followed
//! by whitespace-separated numeric or identifier arguments. `#` starts a
//! comment that runs to the end of the line.
//!
//! # Supported Commands
//!
//! - `modelbegin`, `modelend`
//! - `protobegin <name>`, `protoend`, `protoinstance <name>`
//! - `clumpbegin`, `clumpend`
//! - `vertex x y z [uv u v]`
//! - `triangle`, `quad`, `polygon n i1 .. in` (1-based indices)
//! - `block sx sy sz`
//! - `identity`, `transformbegin`, `transformend`, `translate`, `rotate`,
//!   `scale`, `transform m11 .. m44`
//! - `identityjoint`, `jointtransformbegin`, `jointtransformend`,
//!   `rotatejoint`, `transformjoint`
//! - `color r g b`, `opacity a`, `surface ..`, `lightsampling ..`

use rwx_math::{DVec2, DVec3};
use thiserror::Error;

use crate::mesh::MeshError;
use crate::stack::StackUnderflow;

/// Errors that can occur while interpreting a single command line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("malformed `{command}`: {message}")]
    Malformed {
        command: &'static str,
        message: String,
    },

    #[error(transparent)]
    StackUnderflow(#[from] StackUnderflow),

    #[error("prototype `{0}` is not defined")]
    ReferenceNotFound(String),

    #[error("{0}")]
    StructuralMisuse(String),
}

impl CommandError {
    pub(crate) fn malformed(command: &'static str, message: impl Into<String>) -> Self {
        CommandError::Malformed {
            command,
            message: message.into(),
        }
    }

    pub(crate) fn from_mesh(command: &'static str, err: MeshError) -> Self {
        Self::malformed(command, err.to_string())
    }
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// The closed set of recognized command keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    ModelBegin,
    ModelEnd,
    ProtoBegin,
    ProtoEnd,
    ProtoInstance,
    ClumpBegin,
    ClumpEnd,
    Vertex,
    Triangle,
    Quad,
    Polygon,
    Block,
    Identity,
    TransformBegin,
    TransformEnd,
    Translate,
    Rotate,
    Scale,
    Transform,
    IdentityJoint,
    JointTransformBegin,
    JointTransformEnd,
    RotateJoint,
    TransformJoint,
    Color,
    Opacity,
    Surface,
    LightSampling,
}

impl CommandKind {
    /// Classify a keyword, ignoring ASCII case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_lowercase().as_str() {
            "modelbegin" => CommandKind::ModelBegin,
            "modelend" => CommandKind::ModelEnd,
            "protobegin" => CommandKind::ProtoBegin,
            "protoend" => CommandKind::ProtoEnd,
            "protoinstance" => CommandKind::ProtoInstance,
            "clumpbegin" => CommandKind::ClumpBegin,
            "clumpend" => CommandKind::ClumpEnd,
            "vertex" => CommandKind::Vertex,
            "triangle" => CommandKind::Triangle,
            "quad" => CommandKind::Quad,
            "polygon" => CommandKind::Polygon,
            "block" => CommandKind::Block,
            "identity" => CommandKind::Identity,
            "transformbegin" => CommandKind::TransformBegin,
            "transformend" => CommandKind::TransformEnd,
            "translate" => CommandKind::Translate,
            "rotate" => CommandKind::Rotate,
            "scale" => CommandKind::Scale,
            "transform" => CommandKind::Transform,
            "identityjoint" => CommandKind::IdentityJoint,
            "jointtransformbegin" => CommandKind::JointTransformBegin,
            "jointtransformend" => CommandKind::JointTransformEnd,
            "rotatejoint" => CommandKind::RotateJoint,
            "transformjoint" => CommandKind::TransformJoint,
            "color" => CommandKind::Color,
            "opacity" => CommandKind::Opacity,
            "surface" => CommandKind::Surface,
            "lightsampling" => CommandKind::LightSampling,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical lowercase keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            CommandKind::ModelBegin => "modelbegin",
            CommandKind::ModelEnd => "modelend",
            CommandKind::ProtoBegin => "protobegin",
            CommandKind::ProtoEnd => "protoend",
            CommandKind::ProtoInstance => "protoinstance",
            CommandKind::ClumpBegin => "clumpbegin",
            CommandKind::ClumpEnd => "clumpend",
            CommandKind::Vertex => "vertex",
            CommandKind::Triangle => "triangle",
            CommandKind::Quad => "quad",
            CommandKind::Polygon => "polygon",
            CommandKind::Block => "block",
            CommandKind::Identity => "identity",
            CommandKind::TransformBegin => "transformbegin",
            CommandKind::TransformEnd => "transformend",
            CommandKind::Translate => "translate",
            CommandKind::Rotate => "rotate",
            CommandKind::Scale => "scale",
            CommandKind::Transform => "transform",
            CommandKind::IdentityJoint => "identityjoint",
            CommandKind::JointTransformBegin => "jointtransformbegin",
            CommandKind::JointTransformEnd => "jointtransformend",
            CommandKind::RotateJoint => "rotatejoint",
            CommandKind::TransformJoint => "transformjoint",
            CommandKind::Color => "color",
            CommandKind::Opacity => "opacity",
            CommandKind::Surface => "surface",
            CommandKind::LightSampling => "lightsampling",
        }
    }
}

/// A fully parsed command line.
///
/// Face indices are already converted to 0-based.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ModelBegin,
    ModelEnd,
    ProtoBegin(String),
    ProtoEnd,
    ProtoInstance(String),
    ClumpBegin,
    ClumpEnd,
    Vertex { position: DVec3, uv: Option<DVec2> },
    Triangle([u32; 3]),
    Quad([u32; 4]),
    Polygon(Vec<u32>),
    Block(DVec3),
    Identity,
    TransformBegin,
    TransformEnd,
    Translate(DVec3),
    Rotate { axis: DVec3, degrees: f64 },
    Scale(DVec3),
    Transform([f64; 16]),
    IdentityJoint,
    JointTransformBegin,
    JointTransformEnd,
    RotateJoint { axis: DVec3, degrees: f64 },
    TransformJoint([f64; 16]),
    Color(DVec3),
    Opacity(f64),
    Surface,
    LightSampling,
    /// A keyword outside the grammar; carries the keyword as written
    Unrecognized(String),
}

/// Split a line into tokens, dropping any `#` comment.
pub fn tokenize(line: &str) -> Vec<&str> {
    let code = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    code.split_whitespace().collect()
}

impl Command {
    /// Parse one line. Blank and comment-only lines yield `Ok(None)`.
    pub fn parse(line: &str) -> CommandResult<Option<Command>> {
        let tokens = tokenize(line);
        let Some((&keyword, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let Some(kind) = CommandKind::from_keyword(keyword) else {
            return Ok(Some(Command::Unrecognized(keyword.to_string())));
        };

        let args = Args {
            command: kind.keyword(),
            tokens: args,
        };
        let command = match kind {
            CommandKind::ModelBegin => Command::ModelBegin,
            CommandKind::ModelEnd => Command::ModelEnd,
            CommandKind::ProtoBegin => Command::ProtoBegin(args.name()?),
            CommandKind::ProtoEnd => Command::ProtoEnd,
            CommandKind::ProtoInstance => Command::ProtoInstance(args.name()?),
            CommandKind::ClumpBegin => Command::ClumpBegin,
            CommandKind::ClumpEnd => Command::ClumpEnd,
            CommandKind::Vertex => Command::Vertex {
                position: args.vec3(0)?,
                uv: args.uv()?,
            },
            CommandKind::Triangle => Command::Triangle([args.index(0)?, args.index(1)?, args.index(2)?]),
            CommandKind::Quad => Command::Quad([
                args.index(0)?,
                args.index(1)?,
                args.index(2)?,
                args.index(3)?,
            ]),
            CommandKind::Polygon => Command::Polygon(args.polygon()?),
            CommandKind::Block => Command::Block(args.vec3(0)?),
            CommandKind::Identity => Command::Identity,
            CommandKind::TransformBegin => Command::TransformBegin,
            CommandKind::TransformEnd => Command::TransformEnd,
            CommandKind::Translate => Command::Translate(args.vec3(0)?),
            CommandKind::Rotate => Command::Rotate {
                axis: args.vec3(0)?,
                degrees: args.float(3)?,
            },
            CommandKind::Scale => Command::Scale(args.vec3(0)?),
            CommandKind::Transform => Command::Transform(args.matrix()?),
            CommandKind::IdentityJoint => Command::IdentityJoint,
            CommandKind::JointTransformBegin => Command::JointTransformBegin,
            CommandKind::JointTransformEnd => Command::JointTransformEnd,
            CommandKind::RotateJoint => Command::RotateJoint {
                axis: args.vec3(0)?,
                degrees: args.float(3)?,
            },
            CommandKind::TransformJoint => Command::TransformJoint(args.matrix()?),
            CommandKind::Color => Command::Color(args.vec3(0)?),
            CommandKind::Opacity => Command::Opacity(args.float(0)?),
            CommandKind::Surface => Command::Surface,
            CommandKind::LightSampling => Command::LightSampling,
        };
        Ok(Some(command))
    }
}

/// Argument tokens of one command, with typed accessors.
struct Args<'a> {
    command: &'static str,
    tokens: &'a [&'a str],
}

impl Args<'_> {
    fn token(&self, i: usize) -> CommandResult<&str> {
        self.tokens.get(i).copied().ok_or_else(|| {
            CommandError::malformed(
                self.command,
                format!("expected at least {} arguments, got {}", i + 1, self.tokens.len()),
            )
        })
    }

    fn name(&self) -> CommandResult<String> {
        self.token(0).map(str::to_string)
    }

    fn float(&self, i: usize) -> CommandResult<f64> {
        let token = self.token(i)?;
        let value: f64 = token
            .parse()
            .map_err(|_| CommandError::malformed(self.command, format!("invalid number `{token}`")))?;
        if !value.is_finite() {
            return Err(CommandError::malformed(
                self.command,
                format!("non-finite number `{token}`"),
            ));
        }
        Ok(value)
    }

    fn vec3(&self, start: usize) -> CommandResult<DVec3> {
        Ok(DVec3::new(
            self.float(start)?,
            self.float(start + 1)?,
            self.float(start + 2)?,
        ))
    }

    /// A 1-based vertex index, returned 0-based.
    fn index(&self, i: usize) -> CommandResult<u32> {
        let token = self.token(i)?;
        match token.parse::<u32>() {
            Ok(index) if index >= 1 => Ok(index - 1),
            _ => Err(CommandError::malformed(
                self.command,
                format!("invalid vertex index `{token}`"),
            )),
        }
    }

    /// Optional `uv u v` after the position.
    fn uv(&self) -> CommandResult<Option<DVec2>> {
        match self.tokens.get(3) {
            Some(tag) if tag.eq_ignore_ascii_case("uv") => {
                Ok(Some(DVec2::new(self.float(4)?, self.float(5)?)))
            }
            _ => Ok(None),
        }
    }

    /// `n i1 .. in`, extra trailing tokens ignored.
    fn polygon(&self) -> CommandResult<Vec<u32>> {
        let token = self.token(0)?;
        let count: usize = token
            .parse()
            .map_err(|_| CommandError::malformed(self.command, format!("invalid vertex count `{token}`")))?;
        if count < 3 {
            return Err(CommandError::malformed(
                self.command,
                format!("polygon needs at least 3 vertices, got {count}"),
            ));
        }
        (1..=count).map(|i| self.index(i)).collect()
    }

    fn matrix(&self) -> CommandResult<[f64; 16]> {
        let mut values = [0.0; 16];
        for (i, value) in values.iter_mut().enumerate() {
            *value = self.float(i)?;
        }
        Ok(values)
    }
}
