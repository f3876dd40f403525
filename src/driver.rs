//! External tick driver.
//!
//! Moves a `Brain` onto one Tokio task, which becomes the single context
//! that writes, commits, and receives deferred results. Callers talk to it
//! through a cloneable `DriverHandle` that posts ticks to a queue.
//!
//! In continuous mode a commit that changed something posts the next
//! commit tick back onto the same queue instead of recursing, so a running
//! simulation never grows the call stack.
//!
//! ```text
//! DriverHandle ──Tick──▶ queue ──▶ driver task ──commit──▶ Brain
//!                          ▲                                 │
//!                          └──── follow-up Commit (continuous)┘
//! ```

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::brain::{Brain, Lemma, State};
use crate::model::Signal;
use crate::{Error, Result};

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Keep committing while commits keep changing something.
    pub continuous: bool,
    /// Rounds per automatic commit.
    pub rounds: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { continuous: false, rounds: 1 }
    }
}

enum Tick<L: Lemma, S: Signal> {
    Write(L, S),
    WriteAll(State<L, S>),
    Commit {
        rounds: usize,
        reply: Option<oneshot::Sender<State<L, S>>>,
    },
    Subscribe(L, oneshot::Sender<watch::Receiver<Option<S>>>),
    Snapshot(oneshot::Sender<State<L, S>>),
    Shutdown,
}

pub struct Driver;

impl Driver {
    /// Spawn the driver task. The join handle returns the brain once every
    /// handle is dropped or `shutdown` is called.
    pub fn spawn<L: Lemma, S: Signal>(
        brain: Brain<L, S>,
        config: DriverConfig,
    ) -> (DriverHandle<L, S>, JoinHandle<Brain<L, S>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(brain, config, rx, tx.downgrade()));
        (DriverHandle { tx }, task)
    }
}

async fn run<L: Lemma, S: Signal>(
    mut brain: Brain<L, S>,
    config: DriverConfig,
    mut rx: mpsc::UnboundedReceiver<Tick<L, S>>,
    queue: mpsc::WeakUnboundedSender<Tick<L, S>>,
) -> Brain<L, S> {
    tracing::debug!(?config, "driver started");
    let follow_up = |changed: bool| {
        if !config.continuous || !changed {
            return;
        }
        if let Some(tx) = queue.upgrade() {
            let _ = tx.send(Tick::Commit { rounds: config.rounds, reply: None });
        }
    };

    loop {
        tokio::select! {
            tick = rx.recv() => match tick {
                None | Some(Tick::Shutdown) => break,
                Some(Tick::Write(lemma, signal)) => brain.write(lemma, signal),
                Some(Tick::WriteAll(writes)) => brain.write_all(writes),
                Some(Tick::Commit { rounds, reply }) => {
                    let changed = brain.commit(rounds);
                    follow_up(!changed.is_empty());
                    if let Some(reply) = reply {
                        let _ = reply.send(changed);
                    }
                }
                Some(Tick::Subscribe(lemma, reply)) => {
                    let _ = reply.send(brain.subscribe(&lemma));
                }
                Some(Tick::Snapshot(reply)) => {
                    let _ = reply.send(brain.state().clone());
                }
            },
            Some(lemma) = brain.receive_thought() => {
                tracing::trace!(lemma = ?lemma, "deferred thought delivered");
                follow_up(true);
            }
        }
    }

    tracing::debug!("driver stopped");
    brain
}

/// Posts ticks to a running driver.
pub struct DriverHandle<L: Lemma, S: Signal> {
    tx: mpsc::UnboundedSender<Tick<L, S>>,
}

impl<L: Lemma, S: Signal> Clone for DriverHandle<L, S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<L: Lemma, S: Signal> DriverHandle<L, S> {
    fn post(&self, tick: Tick<L, S>) -> Result<()> {
        self.tx
            .send(tick)
            .map_err(|_| Error::Driver("driver stopped".into()))
    }

    pub fn write(&self, lemma: L, signal: S) -> Result<()> {
        self.post(Tick::Write(lemma, signal))
    }

    pub fn write_all(&self, writes: State<L, S>) -> Result<()> {
        self.post(Tick::WriteAll(writes))
    }

    /// Post a commit without waiting for it.
    pub fn tick(&self, rounds: usize) -> Result<()> {
        self.post(Tick::Commit { rounds, reply: None })
    }

    /// Commit and wait for the changed nodes.
    pub async fn commit(&self, rounds: usize) -> Result<State<L, S>> {
        let (reply, rx) = oneshot::channel();
        self.post(Tick::Commit { rounds, reply: Some(reply) })?;
        rx.await.map_err(|_| Error::Driver("commit dropped".into()))
    }

    pub async fn subscribe(&self, lemma: L) -> Result<watch::Receiver<Option<S>>> {
        let (reply, rx) = oneshot::channel();
        self.post(Tick::Subscribe(lemma, reply))?;
        rx.await.map_err(|_| Error::Driver("subscribe dropped".into()))
    }

    pub async fn snapshot(&self) -> Result<State<L, S>> {
        let (reply, rx) = oneshot::channel();
        self.post(Tick::Snapshot(reply))?;
        rx.await.map_err(|_| Error::Driver("snapshot dropped".into()))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.post(Tick::Shutdown)
    }
}
