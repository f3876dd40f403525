//! Concepts and the lexicon: the declared topology of a brain.

use std::hash::Hash;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Static description of one node: which function computes it, and from
/// which inputs (in order). No inputs means an externally driven source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept<L> {
    pub function: L,
    #[serde(default = "Vec::new")]
    pub inputs: Vec<L>,
}

impl<L> Concept<L> {
    pub fn new(function: impl Into<L>, inputs: impl IntoIterator<Item = impl Into<L>>) -> Self {
        Self {
            function: function.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    /// A concept with no inputs.
    pub fn source(function: impl Into<L>) -> Self {
        Self { function: function.into(), inputs: Vec::new() }
    }
}

/// Node → concept. Nodes missing from the lexicon are pure external inputs.
pub type Lexicon<L> = HashMap<L, Concept<L>>;

/// Parse a lexicon from a JSON object of `{ lemma: { function, inputs } }`.
pub fn lexicon_from_json<L>(json: &str) -> Result<Lexicon<L>>
where
    L: Eq + Hash + DeserializeOwned,
{
    Ok(serde_json::from_str(json)?)
}
