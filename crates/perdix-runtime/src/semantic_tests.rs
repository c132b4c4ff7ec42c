//! Tests for the predicate algebra.

use std::sync::Arc;

use super::semantic::{Recognizer, SemanticContext};
use super::tree::CtxRef;

fn pred(n: usize) -> Arc<SemanticContext> {
    Arc::new(SemanticContext::Predicate {
        rule: 0,
        pred_index: n,
        is_ctx_dependent: false,
    })
}

fn prec(p: u32) -> Arc<SemanticContext> {
    Arc::new(SemanticContext::PrecedencePredicate { precedence: p })
}

/// Recognizer whose predicate verdicts come from a fixed table.
struct Table {
    results: Vec<bool>,
    precedence: u32,
}

impl Recognizer for Table {
    fn sempred(&mut self, _ctx: Option<&CtxRef>, _rule: usize, pred_index: usize) -> bool {
        self.results[pred_index]
    }

    fn precpred(&self, _ctx: Option<&CtxRef>, precedence: u32) -> bool {
        precedence >= self.precedence
    }
}

#[test]
fn and_short_circuits_none() {
    let p = pred(0);
    assert_eq!(SemanticContext::and(&SemanticContext::none(), &p), p);
    assert_eq!(SemanticContext::and(&p, &SemanticContext::none()), p);
}

#[test]
fn or_absorbs_none() {
    let p = pred(0);
    assert!(SemanticContext::or(&SemanticContext::none(), &p).is_none());
}

#[test]
fn and_deduplicates_operands() {
    let combined = SemanticContext::and(&pred(0), &pred(0));
    assert_eq!(combined, pred(0));
}

#[test]
fn and_flattens_nested_conjunctions() {
    let ab = SemanticContext::and(&pred(0), &pred(1));
    let abc = SemanticContext::and(&ab, &pred(2));
    match &*abc {
        SemanticContext::And(ops) => assert_eq!(ops.len(), 3),
        other => panic!("expected flattened And, got {other:?}"),
    }
}

#[test]
fn operand_order_is_canonical() {
    let ab = SemanticContext::and(&pred(0), &pred(1));
    let ba = SemanticContext::and(&pred(1), &pred(0));
    assert_eq!(ab, ba);
}

#[test]
fn and_keeps_least_restrictive_precedence_predicate() {
    let combined = SemanticContext::and(&prec(3), &prec(5));
    assert_eq!(combined, prec(3));
}

#[test]
fn or_keeps_most_permissive_precedence_predicate() {
    let combined = SemanticContext::or(&prec(3), &prec(5));
    assert_eq!(combined, prec(5));
}

#[test]
fn eval_walks_the_formula() {
    let mut table = Table {
        results: vec![true, false],
        precedence: 0,
    };
    let conj = SemanticContext::and(&pred(0), &pred(1));
    assert!(!conj.eval(&mut table, None));

    let disj = SemanticContext::or(&pred(0), &pred(1));
    assert!(disj.eval(&mut table, None));
}

#[test]
fn eval_precedence_folds_to_none_when_predicate_holds() {
    let table = Table {
        results: vec![],
        precedence: 2,
    };
    let folded = prec(3).eval_precedence(&table, None).unwrap();
    assert!(folded.is_none());
}

#[test]
fn eval_precedence_falsifies_failing_predicate() {
    let table = Table {
        results: vec![],
        precedence: 5,
    };
    assert!(prec(3).eval_precedence(&table, None).is_none());
}

#[test]
fn eval_precedence_drops_precedence_but_keeps_user_predicates() {
    let table = Table {
        results: vec![],
        precedence: 1,
    };
    let mixed = SemanticContext::and(&prec(3), &pred(0));
    let folded = mixed.eval_precedence(&table, None).unwrap();
    assert_eq!(folded, pred(0));
}

#[test]
fn eval_precedence_fails_conjunction_when_any_leg_fails() {
    let table = Table {
        results: vec![],
        precedence: 9,
    };
    let mixed = SemanticContext::and(&prec(3), &pred(0));
    assert!(mixed.eval_precedence(&table, None).is_none());
}

#[test]
fn eval_precedence_or_true_branch_wins() {
    let table = Table {
        results: vec![],
        precedence: 2,
    };
    let mixed = SemanticContext::or(&prec(3), &pred(0));
    let folded = mixed.eval_precedence(&table, None).unwrap();
    assert!(folded.is_none());
}
