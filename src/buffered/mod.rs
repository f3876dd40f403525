//! # Staged Cells
//!
//! `Buffered<V>` keeps a committed and a staged copy of a value. Writes go to
//! the staged copy, reads see the committed copy, and `commit()` promotes one
//! to the other in a single step.
//!
//! Field-level access goes through the `Addressable` capability instead of
//! reflection: a state type names its own addressable paths.

pub mod subjects;

use std::hash::Hash;

use crate::model::{Step, Tree, TreePath};

pub use subjects::BufferedPathSubjects;

// ============================================================================
// Addressable
// ============================================================================

/// Get/set-by-path capability for state held in a `Buffered` cell.
pub trait Addressable {
    /// Identifies one field of the value.
    type Path: Clone + Eq + Hash;
    /// What lives at a path.
    type Field: Clone;

    fn get_field(&self, path: &Self::Path) -> Self::Field;
    fn set_field(&mut self, path: &Self::Path, value: Self::Field);
}

/// Trees are addressed by `TreePath`; a field is `None` when absent.
impl<K: Eq + Hash + Clone, L: Clone> Addressable for Tree<K, L> {
    type Path = TreePath<K>;
    type Field = Option<Tree<K, L>>;

    fn get_field(&self, path: &TreePath<K>) -> Self::Field {
        self.get(path).cloned()
    }

    fn set_field(&mut self, path: &TreePath<K>, value: Self::Field) {
        self.set(path, value);
    }
}

/// Convenience for building a `TreePath` from steps.
pub fn tree_path<K>(steps: impl IntoIterator<Item = Step<K>>) -> TreePath<K> {
    steps.into_iter().collect()
}

// ============================================================================
// Buffered
// ============================================================================

/// A committed value plus a staged value awaiting `commit()`.
///
/// Two cells are equal only when both sides match, so a cell with pending
/// changes never equals a freshly built one.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffered<V> {
    committed: V,
    staged: V,
}

impl<V: Clone> Buffered<V> {
    pub fn new(value: V) -> Self {
        Self { committed: value.clone(), staged: value }
    }

    /// The committed value.
    pub fn get(&self) -> &V {
        &self.committed
    }

    /// What the next `commit()` will publish.
    pub fn staged(&self) -> &V {
        &self.staged
    }

    /// Replace the staged value.
    pub fn set(&mut self, value: V) {
        self.staged = value;
    }

    /// Mutate the staged value in place.
    pub fn update(&mut self, f: impl FnOnce(&mut V)) {
        f(&mut self.staged);
    }

    /// A settled cell holding what `commit()` would produce. Leaves `self`
    /// untouched.
    pub fn committed_view(&self) -> Buffered<V> {
        Buffered::new(self.staged.clone())
    }

    /// Promote staged to committed and return the new committed value.
    pub fn commit(&mut self) -> &V {
        self.committed = self.staged.clone();
        &self.committed
    }

    /// Take the committed value, dropping the staged side.
    pub fn into_inner(self) -> V {
        self.committed
    }
}

impl<V: Clone + PartialEq> Buffered<V> {
    pub fn is_dirty(&self) -> bool {
        self.committed != self.staged
    }
}

impl<V: Clone + Addressable> Buffered<V> {
    /// Read a field of the committed value.
    pub fn field(&self, path: &V::Path) -> V::Field {
        self.committed.get_field(path)
    }

    /// Write a field of the staged value.
    pub fn set_field(&mut self, path: &V::Path, value: V::Field) {
        self.staged.set_field(path, value);
    }
}

impl<V: Clone + Default> Default for Buffered<V> {
    fn default() -> Self { Self::new(V::default()) }
}
