//! Registry of per-VCS-type handlers.
//!
//! Handlers come from extensions. Every rendering call must run with the
//! owning extension's context active, and the context must be restored on
//! all exit paths — a guard pops the stack on drop, so unwinding restores
//! it too.

use crate::model::{Changeset, FileChange, Repository};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Reserved type tag of the fallback handler.
pub const GENERIC_TYPE: &str = "generic";

/// A pluggable handler for one VCS type.
pub trait VcsHandler {
    /// Case-insensitive type tag this handler serves.
    fn vcs_type(&self) -> &str;

    /// Human-readable VCS name.
    fn label(&self) -> &str;

    /// Render a changeset reference for display and audit entries.
    fn format_changeset(&self, repo: &Repository, changeset: &Changeset) -> String;

    /// Render a single file change.
    fn format_file(&self, file: &FileChange) -> String {
        format!("{} {}", file.action, file.current_path())
    }
}

/// Fallback handler used when no extension serves a repository's type.
pub struct GenericHandler;

impl VcsHandler for GenericHandler {
    fn vcs_type(&self) -> &str {
        GENERIC_TYPE
    }

    fn label(&self) -> &str {
        "Generic"
    }

    fn format_changeset(&self, _repo: &Repository, changeset: &Changeset) -> String {
        let short: String = changeset.revision.chars().take(8).collect();
        if changeset.branch.is_empty() {
            short
        } else {
            format!("{} {}", changeset.branch, short)
        }
    }
}

/// Stack of active extension contexts. Shared by reference between the
/// registry and its wrapped handlers; single-threaded by design.
#[derive(Clone, Default)]
pub struct ContextStack {
    frames: Rc<RefCell<Vec<String>>>,
}

impl ContextStack {
    /// Push a context frame; it pops when the returned guard drops.
    pub fn enter(&self, name: &str) -> ContextGuard {
        self.frames.borrow_mut().push(name.to_string());
        ContextGuard {
            frames: Rc::clone(&self.frames),
        }
    }

    /// The extension whose context is currently active, if any.
    pub fn current(&self) -> Option<String> {
        self.frames.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

pub struct ContextGuard {
    frames: Rc<RefCell<Vec<String>>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.frames.borrow_mut().pop();
    }
}

/// A handler bound to its originating extension. Rendering calls are scoped
/// to the extension's context; the cheap accessors forward directly, so the
/// wrapper is otherwise indistinguishable from the handler itself.
pub struct ScopedHandler {
    inner: Rc<dyn VcsHandler>,
    extension: String,
    context: ContextStack,
}

impl ScopedHandler {
    /// Name of the extension that registered this handler.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl VcsHandler for ScopedHandler {
    fn vcs_type(&self) -> &str {
        self.inner.vcs_type()
    }

    fn label(&self) -> &str {
        self.inner.label()
    }

    fn format_changeset(&self, repo: &Repository, changeset: &Changeset) -> String {
        let _scope = self.context.enter(&self.extension);
        self.inner.format_changeset(repo, changeset)
    }

    fn format_file(&self, file: &FileChange) -> String {
        let _scope = self.context.enter(&self.extension);
        self.inner.format_file(file)
    }
}

/// Indexes registered handlers by lowercased type tag and dispatches with
/// the generic fallback. Iteration order is tag order.
pub struct VcsRegistry {
    handlers: BTreeMap<String, ScopedHandler>,
    context: ContextStack,
}

impl VcsRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: BTreeMap::new(),
            context: ContextStack::default(),
        };
        registry.register(GENERIC_TYPE, Rc::new(GenericHandler));
        registry
    }

    /// Index a handler under its type tag. Blank tags are ignored; a later
    /// registration for the same tag replaces the earlier one.
    pub fn register(&mut self, extension: &str, handler: Rc<dyn VcsHandler>) {
        let tag = handler.vcs_type().to_lowercase();
        if tag.is_empty() {
            return;
        }
        self.handlers.insert(
            tag,
            ScopedHandler {
                inner: handler,
                extension: extension.to_string(),
                context: self.context.clone(),
            },
        );
    }

    /// The handler for a VCS type, or the generic handler when absent.
    pub fn lookup(&self, vcs_type: &str) -> &ScopedHandler {
        self.handlers
            .get(&vcs_type.to_lowercase())
            .unwrap_or_else(|| &self.handlers[GENERIC_TYPE])
    }

    /// The handler serving a repository's type.
    pub fn handler_for(&self, repo: &Repository) -> &ScopedHandler {
        self.lookup(&repo.vcs_type)
    }

    /// All registered handlers in tag order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &ScopedHandler)> {
        self.handlers.iter().map(|(tag, h)| (tag.as_str(), h))
    }

    /// Display label for a type tag; unknown tags come back verbatim.
    pub fn type_label(&self, vcs_type: &str) -> String {
        match self.handlers.get(&vcs_type.to_lowercase()) {
            Some(handler) => handler.label().to_string(),
            None => vcs_type.to_string(),
        }
    }

    pub fn context(&self) -> &ContextStack {
        &self.context
    }
}

impl Default for VcsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
