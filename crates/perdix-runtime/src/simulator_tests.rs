//! Tests for adaptive prediction.

use std::thread;

use perdix_core::bitset::BitSet;
use perdix_core::stream::{ListTokenStream, TokenStream};

use super::dfa::DfaCache;
use super::error::RecognitionError;
use super::prediction::PredictionMode;
use super::semantic::Recognizer;
use super::simulator::ParserAtnSimulator;
use super::test_grammars::{self, EQ, ID, INT, PLUS};
use super::trace::{NoopTracer, Tracer};
use super::tree::CtxRef;

/// Recognizer with a fixed predicate verdict and no precedence stack.
struct FlatRecog {
    pred_result: bool,
}

impl Recognizer for FlatRecog {
    fn sempred(&mut self, _ctx: Option<&CtxRef>, _rule: usize, _pred: usize) -> bool {
        self.pred_result
    }

    fn precpred(&self, _ctx: Option<&CtxRef>, _precedence: u32) -> bool {
        true
    }
}

/// Tracer that counts report events.
#[derive(Default)]
struct Counting {
    ambiguities: usize,
    full_context_attempts: usize,
    ambig_alts: Option<BitSet>,
}

impl Tracer for Counting {
    fn attempting_full_context(
        &mut self,
        _decision: usize,
        _conflicting: &BitSet,
        _start: usize,
        _stop: usize,
    ) {
        self.full_context_attempts += 1;
    }

    fn ambiguity(
        &mut self,
        _decision: usize,
        _exact: bool,
        alts: &BitSet,
        _start: usize,
        _stop: usize,
    ) {
        self.ambiguities += 1;
        self.ambig_alts = Some(alts.clone());
    }
}

fn input(types: &[(i32, &str)]) -> ListTokenStream {
    ListTokenStream::from_types(types)
}

fn predict(
    sim: &ParserAtnSimulator,
    stream: &mut ListTokenStream,
    decision: usize,
) -> Result<usize, RecognitionError> {
    sim.adaptive_predict(
        stream,
        decision,
        None,
        &mut FlatRecog { pred_result: true },
        &mut NoopTracer,
    )
}

#[test]
fn predicts_by_lookahead() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));

    let mut eq_input = input(&[(ID, "x"), (EQ, "="), (INT, "3")]);
    assert_eq!(predict(&sim, &mut eq_input, decision).unwrap(), 1);

    let mut plus_input = input(&[(ID, "x"), (PLUS, "+"), (INT, "3")]);
    assert_eq!(predict(&sim, &mut plus_input, decision).unwrap(), 2);
}

#[test]
fn restores_stream_position_on_success() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));

    let mut stream = input(&[(ID, "x"), (EQ, "="), (INT, "3")]);
    stream.consume(); // predict from a non-zero position
    stream.seek(0);
    let before = stream.index();
    predict(&sim, &mut stream, decision).unwrap();
    assert_eq!(stream.index(), before);
}

#[test]
fn restores_stream_position_on_error() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));

    let mut stream = input(&[(EQ, "="), (EQ, "=")]);
    let before = stream.index();
    assert!(predict(&sim, &mut stream, decision).is_err());
    assert_eq!(stream.index(), before);
}

#[test]
fn no_viable_alt_carries_offending_token_and_configs() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));

    let mut stream = input(&[(EQ, "="), (INT, "1")]);
    let err = predict(&sim, &mut stream, decision).unwrap_err();
    match err {
        RecognitionError::NoViableAlt {
            offending,
            decision: d,
            configs,
            ..
        } => {
            assert_eq!(offending.token_type, EQ);
            assert_eq!(d, decision);
            assert!(!configs.is_empty());
        }
        other => panic!("expected NoViableAlt, got {other}"),
    }
}

#[test]
fn dfa_grows_once_then_serves_from_cache() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let cache = DfaCache::new(&atn);
    let sim = ParserAtnSimulator::new(atn.clone(), cache.clone());

    let mut stream = input(&[(ID, "x"), (EQ, "="), (INT, "3")]);
    predict(&sim, &mut stream, decision).unwrap();
    let states_after_first = cache.dfa(decision).num_states();
    assert!(states_after_first > 0);

    stream.seek(0);
    predict(&sim, &mut stream, decision).unwrap();
    assert_eq!(cache.dfa(decision).num_states(), states_after_first);
}

#[test]
fn dfa_dump_shows_states_edges_and_predictions() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let cache = DfaCache::new(&atn);
    let sim = ParserAtnSimulator::new(atn.clone(), cache.clone());

    let mut a = input(&[(ID, "x"), (EQ, "="), (INT, "3")]);
    let mut b = input(&[(ID, "x"), (PLUS, "+"), (INT, "3")]);
    predict(&sim, &mut a, decision).unwrap();
    predict(&sim, &mut b, decision).unwrap();

    let dump = cache.dfa(decision).dump(&test_grammars::vocab());
    assert_eq!(
        dump,
        indoc::indoc! {"
            s0
              ID -> s1
            s1
              '=' -> s2
              '+' -> s3
            s2 => 1
            s3 => 2
        "}
    );
}

#[test]
fn sll_and_ll_agree_on_unambiguous_input() {
    let (atn, decision) = test_grammars::ambiguous();

    let mut sll = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));
    sll.set_prediction_mode(PredictionMode::Sll);
    let mut ll = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));
    ll.set_prediction_mode(PredictionMode::Ll);

    let mut a = input(&[(ID, "x")]);
    let mut b = input(&[(ID, "x")]);
    assert_eq!(
        predict(&sll, &mut a, decision).unwrap(),
        predict(&ll, &mut b, decision).unwrap()
    );

    // No-viable under SLL implies no-viable under LL.
    let mut a = input(&[(INT, "3")]);
    let mut b = input(&[(INT, "3")]);
    assert!(predict(&sll, &mut a, decision).is_err());
    assert!(predict(&ll, &mut b, decision).is_err());
}

#[test]
fn true_ambiguity_falls_back_to_full_context_and_reports() {
    let (atn, decision) = test_grammars::identical_alts();
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));

    let mut stream = input(&[(ID, "x")]);
    let mut tracer = Counting::default();
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: true },
            &mut tracer,
        )
        .unwrap();

    // Minimum alternative wins a genuine ambiguity.
    assert_eq!(alt, 1);
    assert_eq!(tracer.full_context_attempts, 1);
    assert_eq!(tracer.ambiguities, 1);
    assert_eq!(
        tracer.ambig_alts.as_ref().unwrap().iter().collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[test]
fn exact_ambiguity_detection_flags_exact_conflicts() {
    let (atn, decision) = test_grammars::identical_alts();
    let mut sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));
    sim.set_prediction_mode(PredictionMode::LlExactAmbigDetection);

    let mut stream = input(&[(ID, "x")]);
    let mut tracer = Counting::default();
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: true },
            &mut tracer,
        )
        .unwrap();
    assert_eq!(alt, 1);
    assert_eq!(tracer.ambiguities, 1);
}

#[test]
fn predicated_decision_follows_predicate_verdict() {
    let (atn, decision) = test_grammars::predicated();

    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));
    let mut stream = input(&[(ID, "x")]);
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: false },
            &mut NoopTracer,
        )
        .unwrap();
    assert_eq!(alt, 2);

    // Fresh caches: predicate outcomes must not leak through the DFA.
    let sim = ParserAtnSimulator::new(atn.clone(), DfaCache::new(&atn));
    let mut stream = input(&[(ID, "x")]);
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: true },
            &mut NoopTracer,
        )
        .unwrap();
    assert_eq!(alt, 1);
}

#[test]
fn predicated_dfa_state_reevaluates_per_call() {
    // One shared DFA: the predicated accept state stores the predicate
    // pairs, so each prediction evaluates them afresh.
    let (atn, decision) = test_grammars::predicated();
    let cache = DfaCache::new(&atn);
    let sim = ParserAtnSimulator::new(atn.clone(), cache);

    let mut stream = input(&[(ID, "x")]);
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: true },
            &mut NoopTracer,
        )
        .unwrap();
    assert_eq!(alt, 1);

    stream.seek(0);
    let alt = sim
        .adaptive_predict(
            &mut stream,
            decision,
            None,
            &mut FlatRecog { pred_result: false },
            &mut NoopTracer,
        )
        .unwrap();
    assert_eq!(alt, 2);
}

#[test]
fn concurrent_predictions_share_one_dfa() {
    let (atn, decision) = test_grammars::two_alt_lookahead();
    let cache = DfaCache::new(&atn);

    thread::scope(|scope| {
        let mut handles = Vec::new();
        for round in 0..4 {
            let atn = atn.clone();
            let cache = cache.clone();
            handles.push(scope.spawn(move || {
                let sim = ParserAtnSimulator::new(atn, cache);
                let mut stream = if round % 2 == 0 {
                    input(&[(ID, "x"), (EQ, "="), (INT, "3")])
                } else {
                    input(&[(ID, "x"), (PLUS, "+"), (INT, "3")])
                };
                predict(&sim, &mut stream, decision).unwrap()
            }));
        }
        let alts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(alts, vec![1, 2, 1, 2]);
    });

    // The shared DFA holds the union of both lookahead paths, deduplicated.
    let sequential_cache = DfaCache::new(&atn);
    let sim = ParserAtnSimulator::new(atn.clone(), sequential_cache.clone());
    let mut a = input(&[(ID, "x"), (EQ, "="), (INT, "3")]);
    let mut b = input(&[(ID, "x"), (PLUS, "+"), (INT, "3")]);
    predict(&sim, &mut a, decision).unwrap();
    predict(&sim, &mut b, decision).unwrap();

    assert_eq!(
        cache.dfa(decision).num_states(),
        sequential_cache.dfa(decision).num_states()
    );
}
