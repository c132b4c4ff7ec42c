//! Configuration sets and their algebra.
//!
//! A set is an insertion-ordered map from `(state, alt, semantic_context)`
//! keys to configurations. Adding a config whose key is already present
//! merges the prediction contexts instead of storing a second entry.
//! Once frozen a set becomes a DFA-state cache key; mutating it afterward
//! is a programmer error and panics.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use perdix_atn::{Atn, INVALID_ALT, StateNumber};
use perdix_core::bitset::BitSet;
use perdix_core::token::EPSILON;
use rustc_hash::FxHashMap;

use crate::config::{AtnConfig, ConfigKey};
use crate::context::{self, MergeCache, PredictionContext};
use crate::semantic::Recognizer;
use crate::tree::CtxRef;

/// An ordered set of configurations with merge-on-add semantics.
#[derive(Clone, Debug, Default)]
pub struct ConfigSet {
    configs: IndexMap<ConfigKey, AtnConfig>,
    /// True when built under full-context prediction (empty stacks stay
    /// distinct in merges).
    pub full_ctx: bool,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    /// The single alternative all configurations agree on, or
    /// [`INVALID_ALT`].
    pub unique_alt: usize,
    pub conflicting_alts: Option<BitSet>,
    readonly: bool,
}

impl ConfigSet {
    pub fn new(full_ctx: bool) -> Self {
        Self {
            full_ctx,
            unique_alt: INVALID_ALT,
            ..Self::default()
        }
    }

    fn assert_mutable(&self) {
        assert!(!self.readonly, "attempt to mutate a frozen configuration set");
    }

    /// Freeze; the set may now serve as a DFA-state key.
    pub fn freeze(&mut self) {
        self.readonly = true;
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Add a configuration. An existing entry under the same key merges
    /// contexts, takes the larger outer-context depth, and ORs the
    /// precedence-filter suppression. Returns true when a new entry was
    /// created.
    pub fn add(&mut self, config: AtnConfig, cache: &mut MergeCache) -> bool {
        self.assert_mutable();
        if !config.semantic_context.is_none() {
            self.has_semantic_context = true;
        }
        if config.reaches_into_outer_context > 0 {
            self.dips_into_outer_context = true;
        }

        match self.configs.entry(config.key()) {
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(config);
                true
            }
            indexmap::map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                let root_is_wildcard = !self.full_ctx;
                let merged = context::merge(
                    &existing.context,
                    &config.context,
                    root_is_wildcard,
                    cache,
                );
                existing.reaches_into_outer_context = existing
                    .reaches_into_outer_context
                    .max(config.reaches_into_outer_context);
                existing.precedence_filter_suppressed |= config.precedence_filter_suppressed;
                existing.context = merged;
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Configurations in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AtnConfig> {
        self.configs.values()
    }

    pub fn get(&self, index: usize) -> &AtnConfig {
        &self.configs[index]
    }

    /// All alternatives present in the set.
    pub fn alts(&self) -> BitSet {
        self.iter().map(|c| c.alt).collect()
    }

    /// The single alternative present, or [`INVALID_ALT`].
    pub fn compute_unique_alt(&self) -> usize {
        let mut alt = INVALID_ALT;
        for c in self.iter() {
            if alt == INVALID_ALT {
                alt = c.alt;
            } else if c.alt != alt {
                return INVALID_ALT;
            }
        }
        alt
    }

    /// Group configurations by `(state, context)` and return the
    /// alternative bitset of each group, the raw material for conflict
    /// detection.
    pub fn conflicting_alt_subsets(&self) -> Vec<BitSet> {
        let mut groups: IndexMap<SubsetKey, BitSet> = IndexMap::new();
        for c in self.iter() {
            let key = SubsetKey {
                state: c.state,
                context: c.context.clone(),
            };
            groups.entry(key).or_default().set(c.alt);
        }
        groups.into_values().collect()
    }

    /// Map each state to the alternatives seen at it.
    pub fn state_to_alt_map(&self) -> FxHashMap<StateNumber, BitSet> {
        let mut map: FxHashMap<StateNumber, BitSet> = FxHashMap::default();
        for c in self.iter() {
            map.entry(c.state).or_default().set(c.alt);
        }
        map
    }

    /// Precedence filter for left-recursive rule entry (full-context
    /// start states only).
    ///
    /// First pass keeps alternative 1 configurations whose precedence
    /// predicates hold; second pass drops configurations of higher
    /// alternatives that duplicate a surviving alt-1 `(state, context)`
    /// pair unless explicitly suppressed from filtering.
    pub fn apply_precedence_filter<R: Recognizer>(
        &self,
        recognizer: &mut R,
        outer_ctx: Option<&CtxRef>,
        cache: &mut MergeCache,
    ) -> ConfigSet {
        let mut states_from_alt1: FxHashMap<StateNumber, Arc<PredictionContext>> =
            FxHashMap::default();
        let mut result = ConfigSet::new(self.full_ctx);

        for config in self.iter() {
            if config.alt != 1 {
                continue;
            }
            let Some(updated) = config.semantic_context.eval_precedence(recognizer, outer_ctx)
            else {
                // Predicate failed: alternative 1 is not viable here.
                continue;
            };
            states_from_alt1.insert(config.state, config.context.clone());
            if Arc::ptr_eq(&updated, &config.semantic_context)
                || *updated == *config.semantic_context
            {
                result.add(config.clone(), cache);
            } else {
                result.add(
                    config.transform_with_semantic(config.state, updated),
                    cache,
                );
            }
        }

        for config in self.iter() {
            if config.alt == 1 {
                continue;
            }
            if !config.precedence_filter_suppressed
                && let Some(ctx) = states_from_alt1.get(&config.state)
                && **ctx == *config.context
            {
                // Same (state, context) as a primary alternative: the
                // higher alternative is the redundant recursive entry.
                continue;
            }
            result.add(config.clone(), cache);
        }
        result
    }

    /// Restrict to configurations in rule stop states.
    ///
    /// With `look_to_end_of_rule`, a configuration at an epsilon-only
    /// state from which end-of-rule is reachable counts as stopped and is
    /// moved to its rule's stop state.
    pub fn rule_stop_configs(
        &self,
        atn: &Atn,
        look_to_end_of_rule: bool,
        cache: &mut MergeCache,
    ) -> ConfigSet {
        if self
            .iter()
            .all(|c| atn.state(c.state).is_rule_stop())
        {
            return self.clone();
        }
        let mut result = ConfigSet::new(self.full_ctx);
        for config in self.iter() {
            let state = atn.state(config.state);
            if state.is_rule_stop() {
                result.add(config.clone(), cache);
                continue;
            }
            if look_to_end_of_rule && state.epsilon_only_transitions {
                let next = atn.next_tokens(config.state);
                if next.contains(EPSILON) {
                    let end = atn.rule_stop_state(state.rule);
                    result.add(config.transform(end), cache);
                }
            }
        }
        result
    }

    /// Partition by predicate evaluation. The always-true sentinel goes
    /// straight to the succeeded side.
    pub fn split_by_semantic_validity<R: Recognizer>(
        &self,
        recognizer: &mut R,
        outer_ctx: Option<&CtxRef>,
        cache: &mut MergeCache,
    ) -> (ConfigSet, ConfigSet) {
        let mut succeeded = ConfigSet::new(self.full_ctx);
        let mut failed = ConfigSet::new(self.full_ctx);
        for config in self.iter() {
            if config.semantic_context.is_none() {
                succeeded.add(config.clone(), cache);
            } else if config.semantic_context.eval(recognizer, outer_ctx) {
                succeeded.add(config.clone(), cache);
            } else {
                failed.add(config.clone(), cache);
            }
        }
        (succeeded, failed)
    }

    /// Rewrite every context through the shared interner, collapsing
    /// subgraphs equal to ones other predictions already built. Called
    /// right before a set freezes into a DFA state.
    pub(crate) fn optimize_contexts(&mut self, cache: &crate::context::ContextCache) {
        self.assert_mutable();
        let mut visited = FxHashMap::default();
        for config in self.configs.values_mut() {
            config.context = cache.get_cached(&config.context, &mut visited);
        }
    }

    /// Minimum alternative among configurations that finished the
    /// decision entry rule: rule-stop configurations with an empty stack
    /// path, or configurations that dipped into the outer context.
    pub fn alt_finishing_entry_rule(&self, atn: &Atn) -> usize {
        let mut alts = BitSet::new();
        for config in self.iter() {
            if config.reaches_into_outer_context > 0
                || (atn.state(config.state).is_rule_stop() && config.context.has_empty_path())
            {
                alts.set(config.alt);
            }
        }
        alts.min().unwrap_or(INVALID_ALT)
    }
}

/// Grouping key for conflict analysis.
#[derive(Clone, PartialEq, Eq)]
struct SubsetKey {
    state: StateNumber,
    context: Arc<PredictionContext>,
}

impl Hash for SubsetKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.state);
        state.write_u64(self.context.node_hash());
    }
}

/// Structural equality over the ordered configurations plus the flags
/// that change prediction semantics. This is what makes frozen sets
/// usable as DFA-state keys.
impl PartialEq for ConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.full_ctx == other.full_ctx
            && self.configs.len() == other.configs.len()
            && self
                .configs
                .values()
                .zip(other.configs.values())
                .all(|(a, b)| a == b)
    }
}

impl Eq for ConfigSet {}

impl Hash for ConfigSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.full_ctx as u8);
        for config in self.configs.values() {
            config.hash(state);
        }
    }
}
