//! Generic transition-table engine.
//!
//! A [`TransitionTable`] maps every state of a machine to the set of states
//! it may move to. A state with an empty set is terminal and rejects every
//! transition, including a retry of the same target.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

use super::EntityType;

/// A state of one submission machine.
pub trait SubmissionState:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr<Err = EngineError> + Send + Sync + 'static
{
    /// The machine the state belongs to.
    const ENTITY_TYPE: EntityType;

    /// The state a new submission starts in.
    const INITIAL: Self;

    /// Every state of the machine.
    const ALL: &'static [Self];

    /// The machine's transition table.
    fn table() -> &'static TransitionTable<Self>;

    /// The canonical upper-case name.
    fn as_str(&self) -> &'static str;
}

/// The allowed transitions of one state machine.
#[derive(Debug)]
pub struct TransitionTable<S> {
    machine: EntityType,
    edges: HashMap<S, Vec<S>>,
}

impl<S: SubmissionState> TransitionTable<S> {
    /// Builds a table from `(from, allowed targets)` pairs.
    ///
    /// States without an entry are terminal.
    pub fn new(machine: EntityType, edges: Vec<(S, Vec<S>)>) -> Self {
        let mut map: HashMap<S, Vec<S>> = S::ALL.iter().map(|s| (*s, Vec::new())).collect();
        map.extend(edges);
        Self {
            machine,
            edges: map,
        }
    }

    /// The machine this table belongs to.
    pub fn machine(&self) -> EntityType {
        self.machine
    }

    /// States reachable from `from` in one step.
    pub fn allowed(&self, from: S) -> &[S] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `state` has no outgoing transitions.
    pub fn is_terminal(&self, state: S) -> bool {
        self.allowed(state).is_empty()
    }

    /// Checks that `to` is reachable from `from`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` with the allowed set of `from` otherwise.
    pub fn validate(&self, from: S, to: S) -> EngineResult<()> {
        let allowed = self.allowed(from);
        if allowed.contains(&to) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                machine: self.machine,
                from: from.to_string(),
                to: to.to_string(),
                allowed: allowed.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Checks a transition given as state names.
    ///
    /// An unknown `from` has an empty allowed set; an unknown `to` is never
    /// allowed. Both fail with `InvalidTransition`.
    pub fn validate_raw(&self, from: &str, to: &str) -> EngineResult<(S, S)> {
        let from_state = from.parse::<S>().ok();
        let to_state = to.parse::<S>().ok();
        match (from_state, to_state) {
            (Some(from), Some(to)) => self.validate(from, to).map(|()| (from, to)),
            (from_state, _) => Err(EngineError::InvalidTransition {
                machine: self.machine,
                from: from.to_string(),
                to: to.to_string(),
                allowed: from_state
                    .map(|s| self.allowed(s).iter().map(|t| t.to_string()).collect())
                    .unwrap_or_default(),
            }),
        }
    }
}
