//! Scoped state stacks for the RWX interpreter.
//!
//! Each stack is never empty. Clump scopes are opened with
//! [`ScopedStack::open_scope`]; the entry they push is a floor that
//! `transformend`-style pops cannot go below, so an excess pop inside one
//! clump cannot reach into the enclosing scope.

use std::fmt;

use rwx_math::{DMat4, DVec3};
use thiserror::Error;

/// Which of the interpreter's stacks an operation touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackKind {
    Transform,
    JointTransform,
    Material,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Transform => write!(f, "transform"),
            StackKind::JointTransform => write!(f, "joint transform"),
            StackKind::Material => write!(f, "material"),
        }
    }
}

/// A pop or scope close found nothing to remove.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{0} stack underflow")]
pub struct StackUnderflow(pub StackKind);

/// A stack whose entries are grouped into nested scopes.
#[derive(Clone, Debug)]
pub struct ScopedStack<T> {
    kind: StackKind,
    entries: Vec<T>,
    /// Index of the base entry of each open scope, innermost last
    floors: Vec<usize>,
}

impl<T: Clone> ScopedStack<T> {
    /// Create a stack holding only `base`.
    pub fn new(kind: StackKind, base: T) -> Self {
        Self {
            kind,
            entries: vec![base],
            floors: Vec::new(),
        }
    }

    pub fn kind(&self) -> StackKind {
        self.kind
    }

    pub fn top(&self) -> &T {
        // entries is never empty
        &self.entries[self.entries.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut T {
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Total number of entries.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Number of open scopes.
    pub fn scope_depth(&self) -> usize {
        self.floors.len()
    }

    /// Push a copy of the top entry.
    pub fn push(&mut self) {
        let top = self.top().clone();
        self.entries.push(top);
    }

    /// Pop the top entry, refusing to remove the base entry of the innermost
    /// scope (or the root entry).
    pub fn pop(&mut self) -> Result<T, StackUnderflow> {
        let floor = self.floors.last().copied().unwrap_or(0);
        if self.entries.len() - 1 <= floor {
            return Err(StackUnderflow(self.kind));
        }
        self.entries.pop().ok_or(StackUnderflow(self.kind))
    }

    /// Open a scope whose base entry is `base`.
    pub fn open_scope(&mut self, base: T) {
        self.floors.push(self.entries.len());
        self.entries.push(base);
    }

    /// Close the innermost scope, dropping its base entry and anything pushed
    /// on top of it.
    ///
    /// Returns how many pushed entries were still open inside the scope.
    pub fn close_scope(&mut self) -> Result<usize, StackUnderflow> {
        let floor = self.floors.pop().ok_or(StackUnderflow(self.kind))?;
        let unclosed = self.entries.len() - floor - 1;
        self.entries.truncate(floor);
        Ok(unclosed)
    }
}

/// A stack of affine matrices.
///
/// Operations compose so that the newest one applies to geometry first:
/// `top = top * op` with glam's column vectors, which is the format's
/// `top <- op . top` in row-vector notation.
pub type TransformStack = ScopedStack<DMat4>;

impl ScopedStack<DMat4> {
    /// A stack whose root entry is the identity.
    pub fn identity(kind: StackKind) -> Self {
        Self::new(kind, DMat4::IDENTITY)
    }

    /// Replace the top with the identity (does not push).
    pub fn reset(&mut self) {
        *self.top_mut() = DMat4::IDENTITY;
    }

    /// Replace the top wholesale.
    pub fn replace(&mut self, matrix: DMat4) {
        *self.top_mut() = matrix;
    }

    /// Compose `op` onto the top.
    pub fn compose(&mut self, op: DMat4) {
        let top = self.top_mut();
        *top = *top * op;
    }

    pub fn translate(&mut self, offset: DVec3) {
        self.compose(DMat4::from_translation(offset));
    }

    pub fn scale(&mut self, factors: DVec3) {
        self.compose(DMat4::from_scale(factors));
    }

    /// Open a clump scope: the new scope starts from the identity.
    pub fn open_identity_scope(&mut self) {
        self.open_scope(DMat4::IDENTITY);
    }
}
