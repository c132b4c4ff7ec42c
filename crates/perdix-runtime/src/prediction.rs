//! Prediction-mode policies.
//!
//! Pure functions over configuration sets that decide when SLL
//! simulation must stop, whether a conflict is a real ambiguity, and
//! which alternative full-context prediction resolves to.

use perdix_atn::{Atn, INVALID_ALT};
use perdix_core::bitset::BitSet;

use crate::config_set::ConfigSet;
use crate::context::MergeCache;
use crate::semantic::SemanticContext;

/// How aggressively prediction trades certainty for speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PredictionMode {
    /// SLL only: fastest, reports a conflict instead of falling back.
    Sll,
    /// SLL with automatic full-context fallback on conflict.
    #[default]
    Ll,
    /// Full LL that also insists on reporting exact ambiguities.
    LlExactAmbigDetection,
}

pub fn all_configs_in_rule_stop_states(atn: &Atn, configs: &ConfigSet) -> bool {
    configs.iter().all(|c| atn.state(c.state).is_rule_stop())
}

pub fn has_config_in_rule_stop_state(atn: &Atn, configs: &ConfigSet) -> bool {
    configs.iter().any(|c| atn.state(c.state).is_rule_stop())
}

/// Union of all alternative subsets.
pub fn get_alts(alt_subsets: &[BitSet]) -> BitSet {
    let mut all = BitSet::new();
    for subset in alt_subsets {
        all.or_with(subset);
    }
    all
}

/// The alternative every subset's minimum agrees on, or [`INVALID_ALT`].
pub fn get_single_viable_alt(alt_subsets: &[BitSet]) -> usize {
    let mut viable = BitSet::new();
    for subset in alt_subsets {
        let min = subset.min().expect("conflict subset cannot be empty");
        viable.set(min);
        if viable.cardinality() > 1 {
            return INVALID_ALT;
        }
    }
    viable.min().unwrap_or(INVALID_ALT)
}

/// Full-context resolution rule: the minimum viable alternative when all
/// subsets agree on one.
pub fn resolves_to_just_one_viable_alt(alt_subsets: &[BitSet]) -> usize {
    get_single_viable_alt(alt_subsets)
}

pub fn all_subsets_conflict(alt_subsets: &[BitSet]) -> bool {
    !has_non_conflicting_alt_set(alt_subsets)
}

/// Any subset with exactly one alternative?
pub fn has_non_conflicting_alt_set(alt_subsets: &[BitSet]) -> bool {
    alt_subsets.iter().any(|s| s.cardinality() == 1)
}

/// Any subset with more than one alternative?
pub fn has_conflicting_alt_set(alt_subsets: &[BitSet]) -> bool {
    alt_subsets.iter().any(|s| s.cardinality() > 1)
}

pub fn all_subsets_equal(alt_subsets: &[BitSet]) -> bool {
    match alt_subsets.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|s| s == first),
    }
}

/// The unique alternative across the whole set, or [`INVALID_ALT`].
pub fn get_unique_alt(alt_subsets: &[BitSet]) -> usize {
    let all = get_alts(alt_subsets);
    if all.cardinality() == 1 {
        all.min().unwrap()
    } else {
        INVALID_ALT
    }
}

fn has_state_associated_with_one_alt(configs: &ConfigSet) -> bool {
    configs
        .state_to_alt_map()
        .values()
        .any(|alts| alts.cardinality() == 1)
}

/// Whether SLL simulation can stop at this configuration set: further
/// lookahead cannot disambiguate.
///
/// True when every configuration reached a rule stop state, or when the
/// conflicting-alt subsets show a conflict the SLL heuristic cannot
/// attribute to mere context splitting. Under pure SLL with predicates,
/// the semantic contexts are stripped first so predicate differences do
/// not mask conflicts.
pub fn has_sll_conflict_terminating_prediction(
    mode: PredictionMode,
    atn: &Atn,
    configs: &ConfigSet,
) -> bool {
    if all_configs_in_rule_stop_states(atn, configs) {
        return true;
    }

    let stripped;
    let configs = if mode == PredictionMode::Sll && configs.has_semantic_context {
        let mut dup = ConfigSet::new(configs.full_ctx);
        let mut cache = MergeCache::new();
        for c in configs.iter() {
            dup.add(
                c.transform_with_semantic(c.state, SemanticContext::none()),
                &mut cache,
            );
        }
        stripped = dup;
        &stripped
    } else {
        configs
    };

    let alt_subsets = configs.conflicting_alt_subsets();
    has_conflicting_alt_set(&alt_subsets) && !has_state_associated_with_one_alt(configs)
}
