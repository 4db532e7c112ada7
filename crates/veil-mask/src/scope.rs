//! Lexical scopes of visible columns.
//!
//! Every `SELECT ... FROM` opens a scope holding the columns its FROM clause
//! makes visible. Scopes nest with the query; leaving a query must restore the
//! enclosing scope no matter how the query is left, so frames are only ever
//! pushed through [`ScopeStack::enter`], whose guard pops the frame on drop.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::field::FieldInfo;

/// Stack of visible-column frames. The bottom frame is the empty root scope.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Vec<FieldInfo>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }

    /// Columns visible from the innermost scope.
    pub fn visible(&self) -> &[FieldInfo] {
        self.frames.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of frames, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a nested scope. The scope closes when the guard is dropped.
    pub fn enter(&mut self, fields: Vec<FieldInfo>) -> ScopeGuard<'_> {
        self.frames.push(fields);
        trace!(depth = self.frames.len(), width = self.visible().len(), "entered scope");
        ScopeGuard { stack: self }
    }
}

/// An open scope. Dereferences to the stack so nested scopes can be entered
/// through it.
#[must_use = "the scope closes as soon as the guard is dropped"]
pub struct ScopeGuard<'s> {
    stack: &'s mut ScopeStack,
}

impl Deref for ScopeGuard<'_> {
    type Target = ScopeStack;

    fn deref(&self) -> &ScopeStack {
        self.stack
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut ScopeStack {
        self.stack
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.pop();
        trace!(depth = self.stack.frames.len(), "left scope");
    }
}
