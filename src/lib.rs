//! # lark — Incremental Dataflow Engine
//!
//! A graph of named nodes whose values are recomputed from declared inputs.
//! Writes are staged, committed in discrete steps, and propagated to
//! dependents until the graph settles or the round budget runs out.
//!
//! ## Design Principles
//!
//! 1. **Stage, then commit**: nothing a caller writes is visible to other
//!    readers until `commit()`
//! 2. **Static topology**: lexicon and functions are fixed at construction
//! 3. **Functions declare fixed points**: returning "no change" is what ends
//!    propagation
//! 4. **The caller owns time**: the engine never commits by itself
//!
//! ## Quick Start
//!
//! ```rust
//! use lark::{Brain, Concept, Function, Functions, Json, Lexicon, cast_or};
//!
//! # fn example() -> lark::Result<()> {
//! let mut lexicon = Lexicon::new();
//! lexicon.insert("sum".to_string(), Concept::new("+", ["x", "y"]));
//!
//! let mut functions = Functions::new();
//! functions.insert("+".to_string(), Function::immediate_fn("+", |x: &[Option<Json>]| {
//!     let y: f64 = x.iter().map(|s| cast_or(s.as_ref(), 0.0)).sum();
//!     Ok(Some(Json::from(y)))
//! }));
//!
//! let mut brain = Brain::new(lexicon, functions)?;
//! brain.write("x".into(), Json::from(2));
//! brain.write("y".into(), Json::from(3));
//! brain.commit(1);
//!
//! assert_eq!(brain.committed(&"sum".to_string()), Some(&Json::from(5.0)));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | `model` | `Scalar`, `Tree`, `Signal` |
//! | `buffered` | `Buffered` staged cell, per-path change tracking |
//! | `brain` | the engine |
//! | `driver` | tick queue that runs a brain on one task |
//! | `life` | Game of Life on top of the engine |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod buffered;
pub mod brain;
pub mod driver;
pub mod life;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    cast_or, FromScalar, FromTree, Json, Scalar, Signal, Step, Tree, TreePath, MAX_ARRAY_PADDING,
};

// ============================================================================
// Re-exports: Staged cells
// ============================================================================

pub use buffered::{tree_path, Addressable, Buffered, BufferedPathSubjects};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use brain::{
    lexicon_from_json, Brain, BrainConfig, BrainStats, Concept, DeferredFunction, Evaluation,
    Function, Functions, ImmediateFunction, Lemma, Lexicon, Neuron, State, ThoughtSender,
};
pub use driver::{Driver, DriverConfig, DriverHandle};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing concept for lemma {lemma} (input of {dependent})")]
    MissingConcept { lemma: String, dependent: String },

    #[error("Function {function} not found for concept {lemma}")]
    MissingFunction { function: String, lemma: String },

    #[error("Type mismatch: {value} is not {expected} (at {location})")]
    TypeMismatch {
        value: String,
        expected: &'static str,
        location: String,
    },

    #[error("Index {index} is too far past the end of an array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
