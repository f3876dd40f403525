//! Node functions.
//!
//! A function is either immediate (evaluated inside `commit`) or deferred
//! (launched on the Tokio runtime, results delivered later as thoughts).
//! Both return "no change" when the node is already at its fixed point for
//! the given inputs; an immediate function that keeps re-emitting an equal
//! value keeps its dependents busy forever.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;

use crate::model::Signal;
use crate::Result;

/// Synchronous node function.
pub trait ImmediateFunction<S: Signal>: Send + Sync {
    fn description(&self) -> &str {
        "immediate"
    }

    /// Compute the node from its inputs (`None` = unset input).
    /// `Ok(None)` means no change.
    fn call(&self, inputs: &[Option<S>]) -> Result<Option<S>>;
}

/// Asynchronous node function.
///
/// Results go through `out`, any number of times. They land in the brain's
/// pending thoughts and are folded in by a later commit.
#[async_trait]
pub trait DeferredFunction<S: Signal>: Send + Sync {
    fn description(&self) -> &str {
        "deferred"
    }

    async fn call(&self, inputs: Vec<Option<S>>, out: ThoughtSender<S>) -> Result<()>;
}

/// Delivers deferred results back to the owning brain.
pub struct ThoughtSender<S> {
    send: Arc<dyn Fn(S) -> bool + Send + Sync>,
}

impl<S> ThoughtSender<S> {
    pub(crate) fn new(send: impl Fn(S) -> bool + Send + Sync + 'static) -> Self {
        Self { send: Arc::new(send) }
    }

    /// Queue a thought. Returns `false` once the brain is gone.
    pub fn send(&self, signal: S) -> bool {
        (self.send)(signal)
    }
}

impl<S> Clone for ThoughtSender<S> {
    fn clone(&self) -> Self {
        Self { send: Arc::clone(&self.send) }
    }
}

/// A registered function: immediate or deferred.
pub enum Function<S: Signal> {
    Immediate(Arc<dyn ImmediateFunction<S>>),
    Deferred(Arc<dyn DeferredFunction<S>>),
}

/// Function id → function.
pub type Functions<L, S> = HashMap<L, Function<S>>;

impl<S: Signal> Function<S> {
    pub fn immediate(f: impl ImmediateFunction<S> + 'static) -> Self {
        Function::Immediate(Arc::new(f))
    }

    pub fn deferred(f: impl DeferredFunction<S> + 'static) -> Self {
        Function::Deferred(Arc::new(f))
    }

    /// Immediate function from a closure.
    pub fn immediate_fn<F>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Option<S>]) -> Result<Option<S>> + Send + Sync + 'static,
    {
        Self::immediate(FnImmediate { description: description.into(), f })
    }

    pub fn description(&self) -> &str {
        match self {
            Function::Immediate(f) => f.description(),
            Function::Deferred(f) => f.description(),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Function::Deferred(_))
    }
}

impl<S: Signal> Clone for Function<S> {
    fn clone(&self) -> Self {
        match self {
            Function::Immediate(f) => Function::Immediate(Arc::clone(f)),
            Function::Deferred(f) => Function::Deferred(Arc::clone(f)),
        }
    }
}

impl<S: Signal> fmt::Debug for Function<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Immediate(_) => write!(f, "Immediate({})", self.description()),
            Function::Deferred(_) => write!(f, "Deferred({})", self.description()),
        }
    }
}

struct FnImmediate<F> {
    description: String,
    f: F,
}

impl<S, F> ImmediateFunction<S> for FnImmediate<F>
where
    S: Signal,
    F: Fn(&[Option<S>]) -> Result<Option<S>> + Send + Sync,
{
    fn description(&self) -> &str {
        &self.description
    }

    fn call(&self, inputs: &[Option<S>]) -> Result<Option<S>> {
        (self.f)(inputs)
    }
}
