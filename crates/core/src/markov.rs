//! Constrained Markov chain that orders word-types in a cover text.
//!
//! Every walk starts at the hub state [`START_STATE`], wanders through
//! word-type states and eventually comes back. The chain itself is immutable
//! once validated; a [`Walk`] carries the current state and random source for
//! a single encode call, so one chain can serve many walks at once.
//!
//! # Invariants
//!
//! Enforced by [`MarkovChain::set_transitions`]:
//! - `s0` has at least one inbound and one outbound transition
//! - every endpoint is a declared state, no state points at itself
//! - every weight is strictly positive
//! - with edges into `s0` removed, the graph reachable from `s0` is acyclic
//!   and has no dead ends, so every walk returns to `s0`

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, LookupError, Result, ValidationError, Violation};

/// Name of the mandatory start/hub state.
pub const START_STATE: &str = "s0";

/// Inclusive bounds on the number of states (including `s0`) in a placeholder chain.
pub const PLACEHOLDER_STATES: std::ops::RangeInclusive<usize> = 2..=100;

type Transitions = BTreeMap<String, BTreeMap<String, f64>>;

/// Persisted chain record: `{wt_refs: {state: word_type}, chain: {from: {to: weight}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerialChain {
    #[serde(default)]
    pub wt_refs: BTreeMap<String, String>,
    #[serde(default)]
    pub chain: Transitions,
}

/// A validated word-type state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkovChain {
    /// Word-type of every state except `s0`
    word_types: BTreeMap<String, String>,
    transitions: Transitions,
}

impl MarkovChain {
    /// Declare states whose word-type is their own name.
    ///
    /// The start state is implicit; passing it here has no effect.
    pub fn new<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_word_types(states.into_iter().map(|state| {
            let state = state.into();
            (state.clone(), state)
        }))
    }

    /// Declare states with an explicit word-type each.
    pub fn with_word_types<I, S, W>(states: I) -> Self
    where
        I: IntoIterator<Item = (S, W)>,
        S: Into<String>,
        W: Into<String>,
    {
        let word_types = states
            .into_iter()
            .map(|(state, word_type)| (state.into(), word_type.into()))
            .filter(|(state, _)| state != START_STATE)
            .collect();
        Self {
            word_types,
            transitions: BTreeMap::new(),
        }
    }

    /// A chain with only the start state and no transitions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chain `s0 -> w1 -> ... -> wn -> s0` with unit weights, one state per word-type.
    pub fn linear<I, S>(word_types: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = word_types.into_iter().map(Into::into).collect();
        let mut chain = Self::new(names.iter().cloned());
        let mut path = vec![START_STATE.to_string()];
        path.extend(names);
        path.push(START_STATE.to_string());
        chain.set_transitions(path.windows(2).map(|pair| (pair[0].clone(), pair[1].clone(), 1.0)))?;
        Ok(chain)
    }

    /// Linear chain of `state_count` states (including `s0`), named
    /// `state_name{i}` with word-type `word_type{i}`.
    pub fn placeholder(state_count: usize) -> Result<Self> {
        if !PLACEHOLDER_STATES.contains(&state_count) {
            return Err(Error::Config(format!(
                "number of states must be between {} and {} (including \"{START_STATE}\"), got {state_count}",
                PLACEHOLDER_STATES.start(),
                PLACEHOLDER_STATES.end()
            )));
        }

        let states: Vec<String> = (1..state_count).map(|i| format!("state_name{i}")).collect();
        let mut chain = Self::with_word_types(
            states
                .iter()
                .enumerate()
                .map(|(i, state)| (state.clone(), format!("word_type{}", i + 1))),
        );

        let mut path = vec![START_STATE.to_string()];
        path.extend(states);
        path.push(START_STATE.to_string());
        chain.set_transitions(path.windows(2).map(|pair| (pair[0].clone(), pair[1].clone(), 1.0)))?;
        Ok(chain)
    }

    /// All declared states, `s0` first.
    pub fn states(&self) -> impl Iterator<Item = &str> {
        std::iter::once(START_STATE).chain(self.word_types.keys().map(String::as_str))
    }

    /// True if `state` is `s0` or a declared state.
    pub fn has_state(&self, state: &str) -> bool {
        state == START_STATE || self.word_types.contains_key(state)
    }

    /// True once transitions have been set.
    pub fn has_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    /// Outbound transitions of `state`, keyed by target.
    pub fn transitions_from(&self, state: &str) -> Option<&BTreeMap<String, f64>> {
        self.transitions.get(state)
    }

    /// Validate and store a full transition set, replacing any previous one.
    ///
    /// All violations are collected and returned together. On failure the
    /// chain keeps its previous transitions.
    pub fn set_transitions<I, S, T>(&mut self, edges: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, T, f64)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut violations = Vec::new();
        let mut unknown = BTreeSet::new();
        let mut candidate: Transitions = BTreeMap::new();
        let mut start_outbound = false;
        let mut start_inbound = false;

        for (from, to, weight) in edges {
            let (from, to) = (from.into(), to.into());
            for state in [&from, &to] {
                if !self.has_state(state) && unknown.insert(state.clone()) {
                    violations.push(Violation::UnknownState(state.clone()));
                }
            }
            // Written so that NaN is rejected too.
            if !(weight > 0.0) {
                violations.push(Violation::NonPositiveWeight {
                    from: from.clone(),
                    to: to.clone(),
                    weight,
                });
            } else if weight.is_infinite() {
                violations.push(Violation::InfiniteWeight {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            if from == to {
                violations.push(Violation::SelfLoop(from.clone()));
            }
            start_outbound |= from == START_STATE;
            start_inbound |= to == START_STATE;

            let targets = candidate.entry(from.clone()).or_default();
            if targets.insert(to.clone(), weight).is_some() {
                violations.push(Violation::DuplicateTransition { from, to });
            }
        }

        if !start_outbound {
            violations.push(Violation::NoStartOutbound);
        }
        if !start_inbound {
            violations.push(Violation::NoStartInbound);
        }
        for (from, targets) in &candidate {
            let total: f64 = targets.values().filter(|weight| weight.is_finite()).sum();
            if !total.is_finite() {
                violations.push(Violation::WeightOverflow(from.clone()));
            }
        }
        for state in dead_ends(&candidate) {
            violations.push(Violation::DeadEnd(state));
        }
        if violations.is_empty() {
            if let Some(cycle) = find_cycle(&candidate) {
                violations.push(Violation::Cycle(cycle));
            }
        }

        if !violations.is_empty() {
            return Err(ValidationError { violations }.into());
        }

        self.transitions = candidate;
        Ok(())
    }

    /// Word-type associated with a state.
    pub fn word_type_of(&self, state: &str) -> Result<&str> {
        if state == START_STATE {
            return Err(LookupError::StartStateHasNoWordType.into());
        }
        self.word_types
            .get(state)
            .map(String::as_str)
            .ok_or_else(|| LookupError::UnknownState(state.to_string()).into())
    }

    /// Start a walk at `s0` using `rng` for every transition choice.
    pub fn walk<R: Rng>(&self, rng: R) -> Walk<'_, R> {
        Walk {
            chain: self,
            rng,
            current: START_STATE,
        }
    }

    /// Number of distinct paths from `state` back to `s0`.
    ///
    /// Each edge into `s0` counts as one path. Counts saturate at `u64::MAX`.
    pub fn path_count_to_start(&self, state: &str) -> Result<u64> {
        let state = self.state_name(state)?;
        let mut memo: HashMap<&str, u64> = HashMap::new();
        let mut stack = vec![(state, false)];

        while let Some((current, expanded)) = stack.pop() {
            if memo.contains_key(current) {
                continue;
            }
            let targets = self.transitions.get(current).into_iter().flat_map(|t| t.keys());
            if expanded {
                let count = targets
                    .map(|to| match to.as_str() {
                        START_STATE => 1,
                        to => memo.get(to).copied().unwrap_or(0),
                    })
                    .fold(0u64, u64::saturating_add);
                memo.insert(current, count);
            } else {
                stack.push((current, true));
                for to in targets {
                    if to != START_STATE && !memo.contains_key(to.as_str()) {
                        stack.push((to.as_str(), false));
                    }
                }
            }
        }

        Ok(memo.get(state).copied().unwrap_or(0))
    }

    fn state_name(&self, state: &str) -> Result<&str> {
        if state == START_STATE {
            return Ok(START_STATE);
        }
        self.word_types
            .get_key_value(state)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| LookupError::UnknownState(state.to_string()).into())
    }

    /// Convert to the persisted record.
    pub fn to_serial(&self) -> SerialChain {
        SerialChain {
            wt_refs: self.word_types.clone(),
            chain: self.transitions.clone(),
        }
    }

    /// Rebuild and validate a chain from its persisted record.
    ///
    /// A record with no transitions loads as an empty chain.
    pub fn from_serial(serial: SerialChain) -> Result<Self> {
        let mut chain = Self::with_word_types(serial.wt_refs);
        if serial.chain.values().all(BTreeMap::is_empty) {
            return Ok(chain);
        }
        chain.set_transitions(
            serial
                .chain
                .into_iter()
                .flat_map(|(from, targets)| {
                    targets
                        .into_iter()
                        .map(move |(to, weight)| (from.clone(), to, weight))
                }),
        )?;
        Ok(chain)
    }
}

/// States reachable from `s0` that have no outbound transition.
fn dead_ends(transitions: &Transitions) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![START_STATE];
    let mut dead = Vec::new();

    while let Some(state) = stack.pop() {
        match transitions.get(state) {
            Some(targets) if !targets.is_empty() => {
                for to in targets.keys() {
                    if to != START_STATE && seen.insert(to.as_str()) {
                        stack.push(to.as_str());
                    }
                }
            }
            _ if state != START_STATE => dead.push(state.to_string()),
            _ => {}
        }
    }

    dead.sort();
    dead
}

/// First cycle found by a depth-first search from `s0`, ignoring edges into `s0`.
fn find_cycle(transitions: &Transitions) -> Option<Vec<String>> {
    fn successors<'a>(transitions: &'a Transitions, state: &str) -> std::vec::IntoIter<&'a str> {
        transitions
            .get(state)
            .map(|targets| {
                targets
                    .keys()
                    .map(String::as_str)
                    .filter(|to| *to != START_STATE)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
            .into_iter()
    }

    let mut finished: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = vec![START_STATE];
    let mut frames = vec![successors(transitions, START_STATE)];

    while let Some(frame) = frames.last_mut() {
        let Some(next) = frame.next() else {
            frames.pop();
            if let Some(done) = path.pop() {
                finished.insert(done);
            }
            continue;
        };

        if let Some(position) = path.iter().position(|state| *state == next) {
            let mut cycle: Vec<String> = path[position..].iter().map(|s| s.to_string()).collect();
            cycle.push(next.to_string());
            return Some(cycle);
        }
        if !finished.contains(next) {
            path.push(next);
            frames.push(successors(transitions, next));
        }
    }

    None
}

/// Call-local traversal of a chain: the current state plus a random source.
#[derive(Debug)]
pub struct Walk<'a, R> {
    chain: &'a MarkovChain,
    rng: R,
    current: &'a str,
}

impl<'a, R: Rng> Walk<'a, R> {
    /// State the walk is currently in.
    pub fn current_state(&self) -> &'a str {
        self.current
    }

    /// True when the walk is at `s0`.
    pub fn is_at_start(&self) -> bool {
        self.current == START_STATE
    }

    /// Word-type of the current state.
    pub fn word_type(&self) -> Result<&'a str> {
        self.chain.word_type_of(self.current)
    }

    /// The random source, for callers that draw extra values mid-walk.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Take one weighted random transition and return the new state.
    ///
    /// Draws uniformly in `[0, total)` and picks the first edge, in target
    /// name order, whose cumulative weight reaches the draw.
    pub fn advance(&mut self) -> Result<&'a str> {
        let targets = self
            .chain
            .transitions
            .get(self.current)
            .filter(|targets| !targets.is_empty())
            .ok_or_else(|| LookupError::NoTransitions(self.current.to_string()))?;

        let total: f64 = targets.values().sum();
        let draw = self.rng.gen_range(0.0..total);

        let mut cumulative = 0.0;
        let mut chosen = None;
        for (to, weight) in targets {
            cumulative += weight;
            chosen = Some(to.as_str());
            if cumulative >= draw {
                break;
            }
        }

        let next = chosen.ok_or_else(|| LookupError::NoTransitions(self.current.to_string()))?;
        log::debug!("chain: {} -> {}", self.current, next);
        self.current = next;
        Ok(next)
    }
}
