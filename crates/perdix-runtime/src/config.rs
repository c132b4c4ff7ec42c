//! ATN configurations.
//!
//! A configuration is where one prediction hypothesis stands: an ATN
//! state, the 1-based alternative it belongs to, the call stack that got
//! it there, and the predicates it is conditioned on. Set membership keys
//! on `(state, alt, semantic_context)` only; contexts merge instead of
//! distinguishing entries.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use perdix_atn::StateNumber;

use crate::context::PredictionContext;
use crate::semantic::SemanticContext;

/// One prediction hypothesis.
#[derive(Clone, Debug)]
pub struct AtnConfig {
    pub state: StateNumber,
    pub alt: usize,
    pub context: Arc<PredictionContext>,
    pub semantic_context: Arc<SemanticContext>,
    /// How many times closure fell off the end of the decision entry rule
    /// into the outer context. Nonzero only under SLL wildcard stacks.
    pub reaches_into_outer_context: usize,
    /// Exempts this configuration from the precedence filter.
    pub precedence_filter_suppressed: bool,
}

impl AtnConfig {
    pub fn new(state: StateNumber, alt: usize, context: Arc<PredictionContext>) -> Self {
        Self::with_semantic(state, alt, context, SemanticContext::none())
    }

    pub fn with_semantic(
        state: StateNumber,
        alt: usize,
        context: Arc<PredictionContext>,
        semantic_context: Arc<SemanticContext>,
    ) -> Self {
        Self {
            state,
            alt,
            context,
            semantic_context,
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
        }
    }

    /// Same hypothesis at a different state.
    pub fn transform(&self, state: StateNumber) -> Self {
        let mut c = self.clone();
        c.state = state;
        c
    }

    pub fn transform_with_context(&self, state: StateNumber, context: Arc<PredictionContext>) -> Self {
        let mut c = self.transform(state);
        c.context = context;
        c
    }

    pub fn transform_with_semantic(
        &self,
        state: StateNumber,
        semantic_context: Arc<SemanticContext>,
    ) -> Self {
        let mut c = self.transform(state);
        c.semantic_context = semantic_context;
        c
    }

    /// Set-membership key.
    pub fn key(&self) -> ConfigKey {
        ConfigKey {
            state: self.state,
            alt: self.alt,
            semantic_context: self.semantic_context.clone(),
        }
    }
}

/// Full structural equality: used by closure cycle guards and DFA-state
/// comparison. `reaches_into_outer_context` is deliberately excluded.
impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.precedence_filter_suppressed == other.precedence_filter_suppressed
            && self.semantic_context == other.semantic_context
            && (Arc::ptr_eq(&self.context, &other.context) || self.context == other.context)
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.state);
        state.write_usize(self.alt);
        state.write_u64(self.context.node_hash());
        self.semantic_context.hash(state);
        state.write_u8(self.precedence_filter_suppressed as u8);
    }
}

/// Lookup key of a configuration inside a set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub state: StateNumber,
    pub alt: usize,
    pub semantic_context: Arc<SemanticContext>,
}
