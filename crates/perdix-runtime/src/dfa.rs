//! Per-decision DFA cache.
//!
//! Each decision memoizes its prediction outcomes in a DFA keyed by
//! frozen configuration sets. The DFA is shared mutable state between
//! every parser over the same network. State interning and edge addition
//! are idempotent under their locks and monotonic: states and edges are
//! added, never removed, so concurrent predictions converge regardless of
//! interleaving.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use perdix_atn::{Atn, INVALID_ALT, StateNumber};
use perdix_core::token::TokenType;
use perdix_core::vocabulary::Vocabulary;
use rustc_hash::FxHashMap;

use crate::config_set::ConfigSet;
use crate::context::ContextCache;
use crate::semantic::SemanticContext;

/// Target of a DFA edge.
#[derive(Clone, Debug)]
pub enum DfaEdge {
    /// The symbol leads nowhere; remembering this avoids re-simulating a
    /// dead end.
    Error,
    State(Arc<DfaState>),
}

/// A memoized prediction state.
///
/// Everything except `edges` and the interned `state_number` is fixed
/// before publication; edges grow monotonically afterwards.
#[derive(Debug)]
pub struct DfaState {
    /// Intern order within the owning DFA; for diagnostics only.
    state_number: AtomicUsize,
    pub configs: ConfigSet,
    pub is_accept: bool,
    /// Predicted alternative for accept states; [`INVALID_ALT`] when the
    /// outcome depends on `predicates`.
    pub prediction: usize,
    /// SLL hit a conflict here; full-context prediction is required.
    pub requires_full_context: bool,
    /// `(semantic_context, alt)` pairs for predicated accept states.
    pub predicates: Option<Vec<(Arc<SemanticContext>, usize)>>,
    edges: RwLock<FxHashMap<TokenType, DfaEdge>>,
    configs_hash: u64,
}

impl DfaState {
    /// Build a candidate state around a frozen configuration set.
    pub fn new(mut configs: ConfigSet) -> Self {
        configs.freeze();
        let configs_hash = {
            let mut h = rustc_hash::FxHasher::default();
            configs.hash(&mut h);
            h.finish()
        };
        Self {
            state_number: AtomicUsize::new(usize::MAX),
            configs,
            is_accept: false,
            prediction: INVALID_ALT,
            requires_full_context: false,
            predicates: None,
            edges: RwLock::new(FxHashMap::default()),
            configs_hash,
        }
    }

    pub fn state_number(&self) -> usize {
        self.state_number.load(Ordering::Relaxed)
    }

    pub fn edge(&self, symbol: TokenType) -> Option<DfaEdge> {
        self.edges.read().unwrap().get(&symbol).cloned()
    }

    /// Record an edge. First writer wins; concurrent writers compute the
    /// same target, so dropping the loser is harmless.
    pub fn set_edge(&self, symbol: TokenType, target: DfaEdge) {
        self.edges
            .write()
            .unwrap()
            .entry(symbol)
            .or_insert(target);
    }

    fn edges_snapshot(&self) -> Vec<(TokenType, DfaEdge)> {
        let mut edges: Vec<_> = self
            .edges
            .read()
            .unwrap()
            .iter()
            .map(|(t, e)| (*t, e.clone()))
            .collect();
        edges.sort_by_key(|(t, _)| *t);
        edges
    }
}

impl PartialEq for DfaState {
    fn eq(&self, other: &Self) -> bool {
        self.configs_hash == other.configs_hash && self.configs == other.configs
    }
}

impl Eq for DfaState {}

impl Hash for DfaState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.configs_hash);
    }
}

/// The DFA of one decision.
#[derive(Debug)]
pub struct Dfa {
    pub decision: usize,
    pub atn_start_state: StateNumber,
    /// Precedence DFAs key their start states by parser precedence
    /// instead of using a single `s0`.
    pub is_precedence_dfa: bool,
    states: Mutex<FxHashMap<Arc<DfaState>, Arc<DfaState>>>,
    s0: RwLock<Option<Arc<DfaState>>>,
    precedence_s0: RwLock<FxHashMap<u32, Arc<DfaState>>>,
}

impl Dfa {
    pub fn new(atn: &Atn, decision: usize) -> Self {
        let atn_start_state = atn.decision_state(decision);
        Self {
            decision,
            atn_start_state,
            is_precedence_dfa: atn.state(atn_start_state).is_precedence_decision(),
            states: Mutex::new(FxHashMap::default()),
            s0: RwLock::new(None),
            precedence_s0: RwLock::new(FxHashMap::default()),
        }
    }

    /// Intern a candidate state: returns the existing equivalent state,
    /// or publishes the candidate. The flag reports whether the candidate
    /// was newly published.
    pub fn add_state(&self, candidate: DfaState) -> (Arc<DfaState>, bool) {
        let candidate = Arc::new(candidate);
        let mut states = self.states.lock().unwrap();
        if let Some(existing) = states.get(&candidate) {
            return (existing.clone(), false);
        }
        candidate
            .state_number
            .store(states.len(), Ordering::Relaxed);
        states.insert(candidate.clone(), candidate.clone());
        (candidate, true)
    }

    pub fn num_states(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn s0(&self) -> Option<Arc<DfaState>> {
        self.s0.read().unwrap().clone()
    }

    /// Publish the start state; a concurrently published one wins.
    pub fn set_s0(&self, state: Arc<DfaState>) -> Arc<DfaState> {
        let mut s0 = self.s0.write().unwrap();
        s0.get_or_insert(state).clone()
    }

    pub fn precedence_start_state(&self, precedence: u32) -> Option<Arc<DfaState>> {
        debug_assert!(self.is_precedence_dfa);
        self.precedence_s0.read().unwrap().get(&precedence).cloned()
    }

    pub fn set_precedence_start_state(&self, precedence: u32, state: Arc<DfaState>) -> Arc<DfaState> {
        debug_assert!(self.is_precedence_dfa);
        let mut map = self.precedence_s0.write().unwrap();
        map.entry(precedence).or_insert(state).clone()
    }

    /// Human-readable listing of interned states and edges.
    pub fn dump(&self, vocabulary: &Vocabulary) -> String {
        let mut states: Vec<_> = self.states.lock().unwrap().values().cloned().collect();
        states.sort_by_key(|s| s.state_number());
        let mut out = String::new();
        for state in states {
            let accept = if state.is_accept {
                format!(" => {}", state.prediction)
            } else {
                String::new()
            };
            out.push_str(&format!(
                "s{}{}{}\n",
                state.state_number(),
                if state.requires_full_context { "^" } else { "" },
                accept,
            ));
            for (symbol, edge) in state.edges_snapshot() {
                let target = match edge {
                    DfaEdge::Error => "<error>".to_string(),
                    DfaEdge::State(s) => format!("s{}", s.state_number()),
                };
                out.push_str(&format!(
                    "  {} -> {}\n",
                    vocabulary.display_name(symbol),
                    target
                ));
            }
        }
        out
    }
}

/// Shared prediction caches for one network: a DFA per decision plus the
/// context interner. Clone the `Arc` into every parser over the ATN.
#[derive(Debug)]
pub struct DfaCache {
    dfas: Vec<Dfa>,
    context_cache: ContextCache,
}

impl DfaCache {
    pub fn new(atn: &Atn) -> Arc<Self> {
        Arc::new(Self {
            dfas: (0..atn.num_decisions()).map(|d| Dfa::new(atn, d)).collect(),
            context_cache: ContextCache::new(),
        })
    }

    pub fn dfa(&self, decision: usize) -> &Dfa {
        &self.dfas[decision]
    }

    pub fn context_cache(&self) -> &ContextCache {
        &self.context_cache
    }
}

impl std::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field("len", &self.len())
            .finish()
    }
}
