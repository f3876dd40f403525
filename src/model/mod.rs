//! # Signal Model
//!
//! Pure data carried through the engine: scalars, path-addressable trees,
//! and the `Signal` capability the engine is generic over.
//!
//! Design rule: no channels, no state, no async here.

pub mod scalar;
pub mod signal;
pub mod tree;

pub use scalar::{FromScalar, Scalar};
pub use signal::{cast_or, Signal};
pub use tree::{FromTree, Json, Step, Tree, TreePath, MAX_ARRAY_PADDING};
