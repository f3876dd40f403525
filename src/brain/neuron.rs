//! Neuron: a concept paired with its resolved function.

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Concept, Function, Lemma, ThoughtSender};
use crate::model::Signal;
use crate::Error;

/// Outcome of one evaluation.
///
/// Immediate functions end in `Resolved`, `Unchanged` or `Failed` within the
/// commit that evaluated them. Deferred ones report `Evaluating` and deliver
/// later.
#[derive(Debug)]
pub enum Evaluation<S> {
    Resolved(S),
    Unchanged,
    Failed(Error),
    Evaluating(JoinHandle<()>),
}

/// Runtime unit of the graph. Immutable once the brain is built.
#[derive(Debug, Clone)]
pub struct Neuron<L, S: Signal> {
    pub lemma: L,
    pub concept: Concept<L>,
    pub function: Function<S>,
}

impl<L: Lemma, S: Signal> Neuron<L, S> {
    pub fn new(lemma: L, concept: Concept<L>, function: Function<S>) -> Self {
        Self { lemma, concept, function }
    }

    /// Evaluate against the given inputs. Deferred results are sent as
    /// `(lemma, signal)` pairs on `deliveries`.
    pub fn evaluate(
        &self,
        inputs: Vec<Option<S>>,
        deliveries: &mpsc::UnboundedSender<(L, S)>,
    ) -> Evaluation<S> {
        match &self.function {
            Function::Immediate(f) => match f.call(&inputs) {
                Ok(Some(signal)) => Evaluation::Resolved(signal),
                Ok(None) => Evaluation::Unchanged,
                Err(e) => Evaluation::Failed(e),
            },
            Function::Deferred(f) => {
                let Ok(runtime) = Handle::try_current() else {
                    return Evaluation::Failed(Error::Evaluation(format!(
                        "deferred function '{}' needs a Tokio runtime",
                        f.description()
                    )));
                };
                let f = f.clone();
                let lemma = self.lemma.clone();
                let tx = deliveries.clone();
                let out = ThoughtSender::new(move |signal| tx.send((lemma.clone(), signal)).is_ok());
                let lemma = self.lemma.clone();
                Evaluation::Evaluating(runtime.spawn(async move {
                    if let Err(e) = f.call(inputs, out).await {
                        tracing::error!(
                            lemma = ?lemma,
                            function = f.description(),
                            error = %e,
                            "deferred evaluation failed"
                        );
                    }
                }))
            }
        }
    }
}
