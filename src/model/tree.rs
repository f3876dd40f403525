//! Path-addressable tree value.
//!
//! A `Tree` is a leaf, an ordered array of trees, or a keyed dictionary of
//! trees. Nested state is read and written through a path of `Step`s, each
//! one either an array index or a dictionary key.
//!
//! Reading rules:
//! - a leaf is its own fixed point: indexing past it returns the leaf
//! - an out-of-range index or missing key yields `None` (absent)
//!
//! Writing rules:
//! - an empty path replaces the whole value (absent clears to `Tree::empty()`)
//! - a non-empty path creates the intermediate containers it needs

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::Location;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::Scalar;
use crate::{Error, Result};

/// Recursive value: leaf, array, or dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree<K, L>
where
    K: Eq + Hash,
{
    Leaf(L),
    Array(Vec<Tree<K, L>>),
    Dictionary(HashMap<K, Tree<K, L>>),
}

/// One step of a tree path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step<K> {
    Index(usize),
    Key(K),
}

/// Most empty slots a single write may append to an array to reach its index.
pub const MAX_ARRAY_PADDING: usize = 1 << 16;

/// A path into a tree. Most paths are short, so they live inline.
pub type TreePath<K> = SmallVec<[Step<K>; 4]>;

impl<K> Step<K> {
    pub fn index(i: usize) -> Self { Step::Index(i) }
    pub fn key(k: impl Into<K>) -> Self { Step::Key(k.into()) }
}

impl<K> From<usize> for Step<K> { fn from(i: usize) -> Self { Step::Index(i) } }
impl From<&str> for Step<String> { fn from(k: &str) -> Self { Step::Key(k.to_owned()) } }
impl From<String> for Step<String> { fn from(k: String) -> Self { Step::Key(k) } }

impl<K: fmt::Display> fmt::Display for Step<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Index(i) => write!(f, "[{i}]"),
            Step::Key(k) => write!(f, ".{k}"),
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl<K: Eq + Hash, L> Tree<K, L> {
    /// The empty dictionary. Also what an absent write clears to.
    pub fn empty() -> Self { Tree::Dictionary(HashMap::new()) }

    pub fn leaf(value: impl Into<L>) -> Self { Tree::Leaf(value.into()) }

    pub fn type_name(&self) -> &'static str {
        match self {
            Tree::Leaf(_) => "LEAF",
            Tree::Array(_) => "ARRAY",
            Tree::Dictionary(_) => "DICTIONARY",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Tree::Leaf(_) => false,
            Tree::Array(a) => a.is_empty(),
            Tree::Dictionary(d) => d.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&L> {
        match self {
            Tree::Leaf(l) => Some(l),
            _ => None,
        }
    }
}

impl<K: Eq + Hash, L> Default for Tree<K, L> {
    fn default() -> Self { Self::empty() }
}

impl<K: Eq + Hash, L> From<Vec<Tree<K, L>>> for Tree<K, L> {
    fn from(items: Vec<Tree<K, L>>) -> Self { Tree::Array(items) }
}

impl<K: Eq + Hash, L> From<HashMap<K, Tree<K, L>>> for Tree<K, L> {
    fn from(map: HashMap<K, Tree<K, L>>) -> Self { Tree::Dictionary(map) }
}

impl<K: Eq + Hash, L> FromIterator<(K, Tree<K, L>)> for Tree<K, L> {
    fn from_iter<I: IntoIterator<Item = (K, Tree<K, L>)>>(iter: I) -> Self {
        Tree::Dictionary(iter.into_iter().collect())
    }
}

impl<K: Eq + Hash, L> FromIterator<Tree<K, L>> for Tree<K, L> {
    fn from_iter<I: IntoIterator<Item = Tree<K, L>>>(iter: I) -> Self {
        Tree::Array(iter.into_iter().collect())
    }
}

impl<K: Eq + Hash> From<bool> for Tree<K, Scalar> { fn from(v: bool) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<i32> for Tree<K, Scalar> { fn from(v: i32) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<i64> for Tree<K, Scalar> { fn from(v: i64) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<f64> for Tree<K, Scalar> { fn from(v: f64) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<&str> for Tree<K, Scalar> { fn from(v: &str) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<String> for Tree<K, Scalar> { fn from(v: String) -> Self { Tree::Leaf(v.into()) } }
impl<K: Eq + Hash> From<Scalar> for Tree<K, Scalar> { fn from(v: Scalar) -> Self { Tree::Leaf(v) } }

// ============================================================================
// Path access
// ============================================================================

impl<K: Eq + Hash, L> Tree<K, L> {
    /// Read the subtree at `path`.
    pub fn get(&self, path: &[Step<K>]) -> Option<&Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match (self, first) {
            (Tree::Leaf(_), _) => Some(self),
            (Tree::Array(items), Step::Index(i)) => items.get(*i)?.get(rest),
            (Tree::Dictionary(map), Step::Key(k)) => map.get(k)?.get(rest),
            _ => None,
        }
    }

    /// Mutable access to an existing subtree. Unlike `get`, a leaf does not
    /// absorb the remaining path.
    pub fn get_mut(&mut self, path: &[Step<K>]) -> Option<&mut Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match (self, first) {
            (Tree::Array(items), Step::Index(i)) => items.get_mut(*i)?.get_mut(rest),
            (Tree::Dictionary(map), Step::Key(k)) => map.get_mut(k)?.get_mut(rest),
            _ => None,
        }
    }

    pub fn contains(&self, path: &[Step<K>]) -> bool {
        self.get(path).is_some()
    }
}

impl<K: Eq + Hash + Clone, L: Clone> Tree<K, L> {
    /// Read the subtree at `path`, falling back to `default` when absent.
    pub fn get_or(&self, path: &[Step<K>], default: Self) -> Self {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Write `value` at `path`. `None` removes the addressed entry.
    ///
    /// A write that would pad an array by more than `MAX_ARRAY_PADDING`
    /// empty slots is dropped with a warning; use `try_set` to see it fail.
    pub fn set(&mut self, path: &[Step<K>], value: Option<Self>) {
        if let Err(e) = self.try_set(path, value) {
            tracing::warn!(error = %e, "tree write dropped");
        }
    }

    /// `set` that reports an unreachable index instead of dropping the
    /// write. Nothing is modified when it fails.
    pub fn try_set(&mut self, path: &[Step<K>], value: Option<Self>) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            *self = value.unwrap_or_else(Self::empty);
            return Ok(());
        };
        match value {
            Some(value) => {
                self.check_padding(path)?;
                self.make_path(parents).put(last, value);
            }
            None => {
                if let Some(parent) = self.get_mut(parents) {
                    parent.remove(last);
                }
            }
        }
        Ok(())
    }

    /// Builder-style `set`.
    pub fn with(mut self, path: &[Step<K>], value: impl Into<Self>) -> Self {
        self.set(path, Some(value.into()));
        self
    }

    /// Walk `path` over the existing structure and reject any index that
    /// lies too far past the end of the array it would land in.
    fn check_padding(&self, path: &[Step<K>]) -> Result<()> {
        let mut node = Some(self);
        for step in path {
            let len = match node {
                Some(Tree::Array(items)) => items.len(),
                _ => 0,
            };
            if let Step::Index(index) = step {
                if index.saturating_sub(len) > MAX_ARRAY_PADDING {
                    return Err(Error::IndexOutOfRange { index: *index, len });
                }
            }
            node = match (node, step) {
                (Some(Tree::Array(items)), Step::Index(i)) => items.get(*i),
                (Some(Tree::Dictionary(map)), Step::Key(k)) => map.get(k),
                _ => None,
            };
        }
        Ok(())
    }

    fn make_path(&mut self, path: &[Step<K>]) -> &mut Self {
        path.iter().fold(self, |node, step| node.child_or_insert(step))
    }

    fn child_or_insert(&mut self, step: &Step<K>) -> &mut Self {
        match step {
            Step::Index(i) => {
                if !matches!(self, Tree::Array(_)) {
                    *self = Tree::Array(Vec::new());
                }
                let Tree::Array(items) = self else { unreachable!() };
                if items.len() <= *i {
                    items.resize_with(*i + 1, Self::empty);
                }
                &mut items[*i]
            }
            Step::Key(k) => {
                if !matches!(self, Tree::Dictionary(_)) {
                    *self = Self::empty();
                }
                let Tree::Dictionary(map) = self else { unreachable!() };
                map.entry(k.clone()).or_insert_with(Self::empty)
            }
        }
    }

    fn put(&mut self, step: &Step<K>, value: Self) {
        *self.child_or_insert(step) = value;
    }

    fn remove(&mut self, step: &Step<K>) {
        match (self, step) {
            (Tree::Array(items), Step::Index(i)) if *i < items.len() => {
                items.remove(*i);
            }
            (Tree::Dictionary(map), Step::Key(k)) => {
                map.remove(k);
            }
            _ => {}
        }
    }
}

// ============================================================================
// Casting
// ============================================================================

/// Strict conversion out of a tree, used by `Tree::cast`.
pub trait FromTree<K: Eq + Hash, L>: Sized {
    fn from_tree(tree: &Tree<K, L>) -> Option<Self>;
}

impl<K: Eq + Hash + fmt::Debug, L: fmt::Debug> Tree<K, L> {
    /// Cast into a native type, failing with `Error::TypeMismatch` that
    /// records the value, the requested type and the call site.
    #[track_caller]
    pub fn cast<T: FromTree<K, L>>(&self) -> Result<T> {
        let location = Location::caller();
        T::from_tree(self).ok_or_else(|| Error::TypeMismatch {
            value: format!("{self:?}"),
            expected: type_name::<T>(),
            location: location.to_string(),
        })
    }
}

impl<K: Eq + Hash + Clone, L: Clone> FromTree<K, L> for Tree<K, L> {
    fn from_tree(tree: &Tree<K, L>) -> Option<Self> { Some(tree.clone()) }
}

impl<K: Eq + Hash + Clone, L: Clone> FromTree<K, L> for Vec<Tree<K, L>> {
    fn from_tree(tree: &Tree<K, L>) -> Option<Self> {
        match tree {
            Tree::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl<K: Eq + Hash + Clone, L: Clone> FromTree<K, L> for HashMap<K, Tree<K, L>> {
    fn from_tree(tree: &Tree<K, L>) -> Option<Self> {
        match tree {
            Tree::Dictionary(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl<K: Eq + Hash> FromTree<K, Scalar> for Scalar {
    fn from_tree(tree: &Tree<K, Scalar>) -> Option<Self> { tree.as_leaf().cloned() }
}

impl<K: Eq + Hash> FromTree<K, Scalar> for bool {
    fn from_tree(tree: &Tree<K, Scalar>) -> Option<Self> {
        match tree.as_leaf()? {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl<K: Eq + Hash> FromTree<K, Scalar> for i64 {
    fn from_tree(tree: &Tree<K, Scalar>) -> Option<Self> {
        match tree.as_leaf()? {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl<K: Eq + Hash> FromTree<K, Scalar> for f64 {
    fn from_tree(tree: &Tree<K, Scalar>) -> Option<Self> { tree.as_leaf()?.as_float() }
}

impl<K: Eq + Hash> FromTree<K, Scalar> for String {
    fn from_tree(tree: &Tree<K, Scalar>) -> Option<Self> {
        tree.as_leaf()?.as_str().map(str::to_owned)
    }
}

// ============================================================================
// JSON
// ============================================================================

/// A tree with string keys and scalar leaves: the JSON-shaped signal.
pub type Json = Tree<String, Scalar>;

impl From<&serde_json::Value> for Json {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Tree::Leaf(Scalar::Null),
            serde_json::Value::Bool(b) => Tree::Leaf(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Tree::Leaf(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Tree::Leaf(Scalar::Float(f))
                } else {
                    Tree::Leaf(Scalar::Null)
                }
            }
            serde_json::Value::String(s) => Tree::Leaf(Scalar::String(s.clone())),
            serde_json::Value::Array(arr) => Tree::Array(arr.iter().map(Json::from).collect()),
            serde_json::Value::Object(map) => {
                map.iter().map(|(k, v)| (k.clone(), Json::from(v))).collect()
            }
        }
    }
}

impl From<serde_json::Value> for Json {
    fn from(v: serde_json::Value) -> Self { Json::from(&v) }
}

impl From<&Json> for serde_json::Value {
    fn from(tree: &Json) -> Self {
        match tree {
            Tree::Leaf(Scalar::Null) => serde_json::Value::Null,
            Tree::Leaf(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Tree::Leaf(Scalar::Int(i)) => serde_json::json!(*i),
            Tree::Leaf(Scalar::Float(f)) => serde_json::json!(*f),
            Tree::Leaf(Scalar::String(s)) => serde_json::Value::String(s.clone()),
            Tree::Array(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Tree::Dictionary(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.into());
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

impl Serialize for Json {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Json {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Json::from)
    }
}

impl fmt::Display for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self))
    }
}
