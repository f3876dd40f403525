//! # Brain — incremental dataflow engine
//!
//! A brain owns a static topology (lexicon + functions), the committed
//! state, and three buffers:
//!
//! | Buffer | Filled by | Folded in |
//! |--------|-----------|-----------|
//! | `change` | `write()` | next `commit()`, wins over thoughts |
//! | `thoughts` | neuron evaluation, deferred deliveries | next round or next `commit()` |
//! | `carry` | the last round of a commit | seeds the next commit's frontier |
//!
//! ## Commit
//!
//! 1. `writes = carry ∪ thoughts ∪ change` (change wins, collisions with a
//!    thought are logged as conflicts)
//! 2. merge `writes` into state
//! 3. up to `rounds` times: evaluate every neuron that depends on a key of
//!    `writes`; stop if no thoughts came out, else fold them into state and
//!    make them the next `writes`
//! 4. notify subscribers of every node whose committed value moved, and
//!    return those nodes
//!
//! The brain never schedules a commit by itself. `write` and `commit` take
//! `&mut self`, so there is one committer at a time.

pub mod concept;
pub mod function;
pub mod neuron;

use std::fmt;
use std::hash::Hash;
use std::mem;

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::model::Signal;
use crate::{Error, Result};

pub use concept::{lexicon_from_json, Concept, Lexicon};
pub use function::{DeferredFunction, Function, Functions, ImmediateFunction, ThoughtSender};
pub use neuron::{Evaluation, Neuron};

/// Node identifier bounds.
pub trait Lemma: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Lemma for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Node → signal.
pub type State<L, S> = HashMap<L, S>;

// ============================================================================
// Configuration
// ============================================================================

/// Brain construction and commit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Fail construction when an input has no lexicon entry.
    pub strict_dependencies: bool,
    /// Rounds used by `commit_default`.
    pub default_rounds: usize,
    /// Log when a write overrides a pending thought.
    pub warn_on_conflict: bool,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            strict_dependencies: false,
            default_rounds: 1,
            warn_on_conflict: true,
        }
    }
}

/// Running counters, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrainStats {
    pub commits: u64,
    pub rounds: u64,
    pub evaluations: u64,
    pub unchanged: u64,
    pub failures: u64,
    pub conflicts: u64,
    pub deferred_launched: u64,
    pub thoughts_delivered: u64,
}

// ============================================================================
// Brain
// ============================================================================

pub struct Brain<L: Lemma, S: Signal> {
    config: BrainConfig,
    lexicon: Lexicon<L>,
    functions: Functions<L, S>,
    neurons: HashMap<L, Neuron<L, S>>,
    /// input → nodes that declare it
    connections: HashMap<L, HashSet<L>>,

    state: State<L, S>,
    change: State<L, S>,
    thoughts: State<L, S>,
    carry: State<L, S>,

    subjects: Mutex<HashMap<L, watch::Sender<Option<S>>>>,
    in_flight: HashMap<L, JoinHandle<()>>,
    deliveries_tx: mpsc::UnboundedSender<(L, S)>,
    deliveries_rx: mpsc::UnboundedReceiver<(L, S)>,
    stats: BrainStats,
}

impl<L: Lemma, S: Signal> Brain<L, S> {
    pub fn new(lexicon: Lexicon<L>, functions: Functions<L, S>) -> Result<Self> {
        Self::open(lexicon, functions, State::new(), BrainConfig::default())
    }

    pub fn with_state(
        lexicon: Lexicon<L>,
        functions: Functions<L, S>,
        state: State<L, S>,
    ) -> Result<Self> {
        Self::open(lexicon, functions, state, BrainConfig::default())
    }

    /// Build one neuron per lexicon entry and the reverse-dependency index.
    /// No brain is produced if any reference fails to resolve.
    pub fn open(
        lexicon: Lexicon<L>,
        functions: Functions<L, S>,
        state: State<L, S>,
        config: BrainConfig,
    ) -> Result<Self> {
        let mut neurons = HashMap::with_capacity(lexicon.len());
        let mut connections: HashMap<L, HashSet<L>> = HashMap::new();

        for (lemma, concept) in &lexicon {
            let function = functions.get(&concept.function).ok_or_else(|| Error::MissingFunction {
                function: format!("{:?}", concept.function),
                lemma: format!("{lemma:?}"),
            })?;

            if config.strict_dependencies {
                if let Some(x) = concept.inputs.iter().find(|x| !lexicon.contains_key(*x)) {
                    return Err(Error::MissingConcept {
                        lemma: format!("{x:?}"),
                        dependent: format!("{lemma:?}"),
                    });
                }
            }

            neurons.insert(
                lemma.clone(),
                Neuron::new(lemma.clone(), concept.clone(), function.clone()),
            );
            for x in &concept.inputs {
                connections.entry(x.clone()).or_default().insert(lemma.clone());
            }
        }

        tracing::debug!(
            neurons = neurons.len(),
            inputs = connections.len(),
            state = state.len(),
            "brain constructed"
        );

        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            lexicon,
            functions,
            neurons,
            connections,
            state,
            change: State::new(),
            thoughts: State::new(),
            carry: State::new(),
            subjects: Mutex::new(HashMap::new()),
            in_flight: HashMap::new(),
            deliveries_tx,
            deliveries_rx,
            stats: BrainStats::default(),
        })
    }

    pub fn config(&self) -> &BrainConfig { &self.config }
    pub fn lexicon(&self) -> &Lexicon<L> { &self.lexicon }
    pub fn functions(&self) -> &Functions<L, S> { &self.functions }
    pub fn neuron(&self, lemma: &L) -> Option<&Neuron<L, S>> { self.neurons.get(lemma) }
    pub fn stats(&self) -> &BrainStats { &self.stats }

    /// Nodes that declare `lemma` as an input.
    pub fn dependents(&self, lemma: &L) -> impl Iterator<Item = &L> {
        self.connections.get(lemma).into_iter().flatten()
    }

    // ========================================================================
    // Read / write
    // ========================================================================

    /// Queued write if there is one, else the committed value. `None` is unset.
    pub fn get(&self, lemma: &L) -> Option<&S> {
        self.change.get(lemma).or_else(|| self.state.get(lemma))
    }

    /// Committed value only.
    pub fn committed(&self, lemma: &L) -> Option<&S> {
        self.state.get(lemma)
    }

    /// Committed state snapshot.
    pub fn state(&self) -> &State<L, S> {
        &self.state
    }

    /// Queue a write for the next commit.
    pub fn write(&mut self, lemma: L, signal: S) {
        self.change.insert(lemma, signal);
    }

    /// Replace every queued write.
    pub fn write_all(&mut self, writes: State<L, S>) {
        self.change = writes;
    }

    /// Queued writes.
    pub fn pending_writes(&self) -> &State<L, S> {
        &self.change
    }

    /// Computed values awaiting a commit.
    pub fn pending_thoughts(&self) -> &State<L, S> {
        &self.thoughts
    }

    /// Whether a commit now would have anything to do.
    pub fn has_pending(&self) -> bool {
        !self.change.is_empty() || !self.thoughts.is_empty() || !self.carry.is_empty()
    }

    /// Channel for one node, created on first use. New receivers see the
    /// current committed value straight away.
    pub fn subscribe(&self, lemma: &L) -> watch::Receiver<Option<S>> {
        self.subjects
            .lock()
            .entry(lemma.clone())
            .or_insert_with(|| watch::channel(self.state.get(lemma).cloned()).0)
            .subscribe()
    }

    // ========================================================================
    // Deferred deliveries
    // ========================================================================

    /// Move every deferred result that has arrived into pending thoughts.
    /// Later arrivals for the same node replace earlier ones.
    pub fn drain_deliveries(&mut self) -> usize {
        let mut n = 0;
        while let Ok((lemma, signal)) = self.deliveries_rx.try_recv() {
            self.thoughts.insert(lemma, signal);
            n += 1;
        }
        self.stats.thoughts_delivered += n as u64;
        n
    }

    /// Wait for the next deferred result and queue it as a thought.
    /// Cancel safe.
    pub async fn receive_thought(&mut self) -> Option<L> {
        let (lemma, signal) = self.deliveries_rx.recv().await?;
        self.thoughts.insert(lemma.clone(), signal);
        self.stats.thoughts_delivered += 1;
        Some(lemma)
    }

    /// Deferred evaluations that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.values().filter(|h| !h.is_finished()).count()
    }

    // ========================================================================
    // Commit
    // ========================================================================

    pub fn commit_default(&mut self) -> State<L, S> {
        self.commit(self.config.default_rounds)
    }

    /// Apply queued writes and thoughts, propagate for up to `rounds`
    /// rounds, publish. Returns every node whose committed value moved,
    /// with its new value.
    pub fn commit(&mut self, rounds: usize) -> State<L, S> {
        self.drain_deliveries();
        self.stats.commits += 1;

        let thoughts = mem::take(&mut self.thoughts);
        let change = mem::take(&mut self.change);

        for (lemma, signal) in &change {
            if let Some(thought) = thoughts.get(lemma) {
                self.stats.conflicts += 1;
                if self.config.warn_on_conflict {
                    tracing::warn!(
                        lemma = ?lemma,
                        write = ?signal,
                        thought = ?thought,
                        "write replaces pending thought"
                    );
                }
            }
        }

        let mut changed: State<L, S> = thoughts;
        changed.extend(change);

        let mut before: HashMap<L, Option<S>> = HashMap::new();
        let mut writes = mem::take(&mut self.carry);
        writes.extend(changed.iter().map(|(l, s)| (l.clone(), s.clone())));
        self.merge(&writes, &mut before);

        let mut ran = 0;
        for _ in 0..rounds {
            ran += 1;
            let frontier = self.affected(&writes);
            tracing::trace!(round = ran, frontier = frontier.len(), "propagating");
            for lemma in &frontier {
                self.evaluate(lemma);
            }
            if self.thoughts.is_empty() {
                writes.clear();
                break;
            }
            writes = mem::take(&mut self.thoughts);
            self.merge(&writes, &mut before);
            changed.extend(writes.iter().map(|(l, s)| (l.clone(), s.clone())));
        }
        self.stats.rounds += ran;
        self.carry = writes;

        // net change only: drop nodes that ended where they started
        changed.retain(|lemma, signal| {
            before.get(lemma).is_none_or(|old| old.as_ref() != Some(&*signal))
        });

        self.publish(&changed);

        tracing::debug!(
            rounds,
            ran,
            changed = changed.len(),
            carry = self.carry.len(),
            "commit"
        );
        changed
    }

    /// Fold `writes` into state, remembering the pre-commit value of every
    /// node the first time this commit touches it.
    fn merge(&mut self, writes: &State<L, S>, before: &mut HashMap<L, Option<S>>) {
        for (lemma, signal) in writes {
            let old = self.state.insert(lemma.clone(), signal.clone());
            before.entry(lemma.clone()).or_insert(old);
        }
    }

    /// Union of the dependents of every written node.
    fn affected(&self, writes: &State<L, S>) -> HashSet<L> {
        writes
            .keys()
            .filter_map(|lemma| self.connections.get(lemma))
            .flatten()
            .cloned()
            .collect()
    }

    fn evaluate(&mut self, lemma: &L) {
        let evaluation = {
            let Some(neuron) = self.neurons.get(lemma) else { return };
            let inputs = neuron
                .concept
                .inputs
                .iter()
                .map(|x| self.state.get(x).cloned())
                .collect();
            neuron.evaluate(inputs, &self.deliveries_tx)
        };
        self.stats.evaluations += 1;

        match evaluation {
            Evaluation::Resolved(signal) => {
                self.thoughts.insert(lemma.clone(), signal);
            }
            Evaluation::Unchanged => self.stats.unchanged += 1,
            Evaluation::Failed(e) => {
                self.stats.failures += 1;
                tracing::error!(lemma = ?lemma, error = %e, "evaluation failed, keeping value");
            }
            Evaluation::Evaluating(handle) => {
                self.stats.deferred_launched += 1;
                if let Some(previous) = self.in_flight.insert(lemma.clone(), handle) {
                    if !previous.is_finished() {
                        tracing::trace!(lemma = ?lemma, "superseding deferred evaluation");
                    }
                    previous.abort();
                }
            }
        }
    }

    fn publish(&self, changed: &State<L, S>) {
        let subjects = self.subjects.lock();
        for lemma in changed.keys() {
            let Some(subject) = subjects.get(lemma) else { continue };
            let value = self.state.get(lemma).cloned();
            subject.send_if_modified(|current| {
                if *current == value {
                    return false;
                }
                *current = value;
                true
            });
        }
    }
}

impl<L: Lemma, S: Signal> Drop for Brain<L, S> {
    fn drop(&mut self) {
        for handle in self.in_flight.values() {
            handle.abort();
        }
    }
}

impl<L: Lemma, S: Signal> fmt::Debug for Brain<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brain")
            .field("neurons", &self.neurons.len())
            .field("state", &self.state.len())
            .field("change", &self.change.len())
            .field("thoughts", &self.thoughts.len())
            .field("carry", &self.carry.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
