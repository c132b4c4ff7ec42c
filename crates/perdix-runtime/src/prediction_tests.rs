//! Tests for prediction-mode policy functions.

use perdix_core::bitset::BitSet;

use super::config::AtnConfig;
use super::config_set::ConfigSet;
use super::context::{MergeCache, PredictionContext};
use super::prediction::{self, PredictionMode};
use super::test_grammars;
use perdix_atn::INVALID_ALT;

fn bits(alts: &[usize]) -> BitSet {
    alts.iter().copied().collect()
}

#[test]
fn get_alts_unions_subsets() {
    let subsets = vec![bits(&[1, 2]), bits(&[3])];
    assert_eq!(prediction::get_alts(&subsets).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn single_viable_alt_requires_agreement_on_minimum() {
    assert_eq!(
        prediction::get_single_viable_alt(&[bits(&[1, 2]), bits(&[1, 3])]),
        1
    );
    assert_eq!(
        prediction::get_single_viable_alt(&[bits(&[1, 2]), bits(&[2, 3])]),
        INVALID_ALT
    );
}

#[test]
fn subset_conflict_predicates() {
    let conflicting = vec![bits(&[1, 2]), bits(&[1, 2])];
    assert!(prediction::all_subsets_conflict(&conflicting));
    assert!(prediction::all_subsets_equal(&conflicting));
    assert!(prediction::has_conflicting_alt_set(&conflicting));
    assert!(!prediction::has_non_conflicting_alt_set(&conflicting));

    let mixed = vec![bits(&[1, 2]), bits(&[3])];
    assert!(!prediction::all_subsets_conflict(&mixed));
    assert!(!prediction::all_subsets_equal(&mixed));
    assert!(prediction::has_non_conflicting_alt_set(&mixed));
}

#[test]
fn unique_alt_across_subsets() {
    assert_eq!(prediction::get_unique_alt(&[bits(&[2]), bits(&[2])]), 2);
    assert_eq!(
        prediction::get_unique_alt(&[bits(&[2]), bits(&[3])]),
        INVALID_ALT
    );
}

#[test]
fn rule_stop_queries() {
    let atn = test_grammars::linear();
    let stop = atn.rule_stop_state(0);
    let mut cache = MergeCache::new();

    let mut stopped = ConfigSet::new(false);
    stopped.add(
        AtnConfig::new(stop, 1, PredictionContext::empty()),
        &mut cache,
    );
    assert!(prediction::all_configs_in_rule_stop_states(&atn, &stopped));
    assert!(prediction::has_config_in_rule_stop_state(&atn, &stopped));

    stopped.add(AtnConfig::new(2, 1, PredictionContext::empty()), &mut cache);
    assert!(!prediction::all_configs_in_rule_stop_states(&atn, &stopped));
    assert!(prediction::has_config_in_rule_stop_state(&atn, &stopped));
}

#[test]
fn sll_stops_when_every_config_reached_rule_end() {
    let atn = test_grammars::linear();
    let stop = atn.rule_stop_state(0);
    let mut cache = MergeCache::new();
    let mut set = ConfigSet::new(false);
    set.add(
        AtnConfig::new(stop, 1, PredictionContext::empty()),
        &mut cache,
    );
    set.add(
        AtnConfig::new(stop, 2, PredictionContext::empty()),
        &mut cache,
    );

    assert!(prediction::has_sll_conflict_terminating_prediction(
        PredictionMode::Ll,
        &atn,
        &set
    ));
}

#[test]
fn sll_continues_while_some_state_is_unambiguous() {
    let atn = test_grammars::linear();
    let mut cache = MergeCache::new();
    let mut set = ConfigSet::new(false);
    // States 2 and 3 are mid-rule basic states.
    set.add(AtnConfig::new(2, 1, PredictionContext::empty()), &mut cache);
    set.add(AtnConfig::new(2, 2, PredictionContext::empty()), &mut cache);
    set.add(AtnConfig::new(3, 1, PredictionContext::empty()), &mut cache);

    // State 3 is associated with a single alternative, so more
    // lookahead may still separate the alternatives.
    assert!(!prediction::has_sll_conflict_terminating_prediction(
        PredictionMode::Ll,
        &atn,
        &set
    ));
}

#[test]
fn sll_terminates_on_pure_conflict() {
    let atn = test_grammars::linear();
    let mut cache = MergeCache::new();
    let mut set = ConfigSet::new(false);
    set.add(AtnConfig::new(2, 1, PredictionContext::empty()), &mut cache);
    set.add(AtnConfig::new(2, 2, PredictionContext::empty()), &mut cache);

    assert!(prediction::has_sll_conflict_terminating_prediction(
        PredictionMode::Ll,
        &atn,
        &set
    ));
}

#[test]
fn resolves_to_min_viable_alt_in_full_ll() {
    assert_eq!(
        prediction::resolves_to_just_one_viable_alt(&[bits(&[2, 3]), bits(&[2, 4])]),
        2
    );
}
