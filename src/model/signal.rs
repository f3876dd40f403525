//! The capability set a value needs to travel through a `Brain`.

use std::fmt;
use std::hash::Hash;

use super::{FromScalar, Scalar, Tree};

/// Value stored per node.
///
/// A signal compares by value, reads lossily as a primitive scalar kind and
/// can be built back from one. Unset nodes are `None` at the engine level,
/// never a particular signal value.
pub trait Signal: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Scalar reading of this signal, if it has one.
    fn scalar(&self) -> Option<Scalar>;

    fn from_scalar(scalar: Scalar) -> Self;

    /// Lossy cast: the scalar reading converted to `T`, or `default`.
    fn cast_or<T: FromScalar>(&self, default: T) -> T {
        self.scalar()
            .as_ref()
            .and_then(T::from_scalar)
            .unwrap_or(default)
    }
}

/// `cast_or` for a possibly unset input.
pub fn cast_or<S: Signal, T: FromScalar>(signal: Option<&S>, default: T) -> T {
    match signal {
        Some(s) => s.cast_or(default),
        None => default,
    }
}

impl Signal for Scalar {
    fn scalar(&self) -> Option<Scalar> { Some(self.clone()) }
    fn from_scalar(scalar: Scalar) -> Self { scalar }
}

impl<K> Signal for Tree<K, Scalar>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn scalar(&self) -> Option<Scalar> { self.as_leaf().cloned() }
    fn from_scalar(scalar: Scalar) -> Self { Tree::Leaf(scalar) }
}
