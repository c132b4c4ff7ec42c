//! Tests for LL(1) lookahead sets.

use perdix_core::token::{EOF, EPSILON};

use crate::atn::GrammarKind;
use crate::builder::AtnBuilder;
use crate::state::StateKind;
use crate::transition::Transition;

const ID: i32 = 1;
const EQ: i32 = 2;
const INT: i32 = 3;

/// Two rules: `s: e '=' INT; e: ID;`
struct Fixture {
    atn: crate::atn::Atn,
    s_start: usize,
    e_call_site: usize,
    after_eq: usize,
}

fn two_rules() -> Fixture {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 3);
    let s = b.add_rule(false);
    let e = b.add_rule(false);

    // s body: call e, then '=' INT
    let call_site = b.add_state(s, StateKind::Basic);
    let after_call = b.add_state(s, StateKind::Basic);
    let after_eq = b.add_state(s, StateKind::Basic);
    let after_int = b.add_state(s, StateKind::Basic);
    b.add_transition(b.rule_start(s), Transition::epsilon(call_site));
    b.add_transition(
        call_site,
        Transition::Rule {
            target: b.rule_start(e),
            rule: e,
            precedence: 0,
            follow: after_call,
        },
    );
    b.add_transition(after_call, Transition::Atom { target: after_eq, label: EQ });
    b.add_transition(after_eq, Transition::Atom { target: after_int, label: INT });
    b.add_transition(after_int, Transition::epsilon(b.rule_stop(s)));

    // e body: ID
    let e_body = b.add_state(e, StateKind::Basic);
    b.add_transition(b.rule_start(e), Transition::epsilon(e_body));
    b.add_transition(e_body, Transition::Atom { target: b.rule_stop(e), label: ID });

    let s_start = b.rule_start(s);
    Fixture {
        atn: b.build().unwrap(),
        s_start,
        e_call_site: call_site,
        after_eq,
    }
}

#[test]
fn looks_through_rule_calls() {
    let f = two_rules();
    let set = f.atn.next_tokens(f.s_start);
    assert!(set.contains(ID));
    assert!(!set.contains(EQ));
}

#[test]
fn rule_return_follows_call_site() {
    let f = two_rules();
    // From the call site, e matches ID and control resumes before '='.
    let set = f.atn.next_tokens(f.e_call_site);
    assert!(set.contains(ID));
    assert!(!set.contains(EQ));
}

#[test]
fn end_of_rule_is_epsilon() {
    let f = two_rules();
    let stop = f.atn.rule_stop_state(0);
    let set = f.atn.next_tokens(stop);
    assert!(set.contains(EPSILON));
}

#[test]
fn expected_tokens_resolves_epsilon_against_callers() {
    let f = two_rules();
    // At e's stop state with s's call site as the invoker, the parser
    // expects '='.
    let e_stop = f.atn.rule_stop_state(1);
    let set = f.atn.expected_tokens(e_stop, [f.e_call_site]);
    assert!(set.contains(EQ));
    assert!(!set.contains(EPSILON));
}

#[test]
fn expected_tokens_at_input_end_is_eof() {
    let f = two_rules();
    let s_stop = f.atn.rule_stop_state(0);
    let set = f.atn.expected_tokens(s_stop, []);
    assert!(set.contains(EOF));
    assert!(!set.contains(EPSILON));
}

#[test]
fn mid_rule_lookahead_is_direct_label() {
    let f = two_rules();
    let set = f.atn.next_tokens(f.after_eq);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![INT]);
}

/// `x: y* ;  y: ID;` exercises cyclic structure in the walker.
#[test]
fn cyclic_loops_terminate() {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 1);
    let x = b.add_rule(false);
    let y = b.add_rule(false);

    let loop_end = b.add_state(x, StateKind::Basic);
    let loopback = b.add_state(x, StateKind::StarLoopback);
    let entry = b.add_state(
        x,
        StateKind::StarLoopEntry {
            loopback,
            precedence_decision: false,
        },
    );
    b.set_kind(loop_end, StateKind::LoopEnd { loopback });
    let body = b.add_state(x, StateKind::Basic);
    let after_call = b.add_state(x, StateKind::Basic);

    b.add_transition(b.rule_start(x), Transition::epsilon(entry));
    b.add_transition(entry, Transition::epsilon(body));
    b.add_transition(entry, Transition::epsilon(loop_end));
    b.add_transition(
        body,
        Transition::Rule {
            target: b.rule_start(y),
            rule: y,
            precedence: 0,
            follow: after_call,
        },
    );
    b.add_transition(after_call, Transition::epsilon(loopback));
    b.add_transition(loopback, Transition::epsilon(entry));
    b.add_transition(loop_end, Transition::epsilon(b.rule_stop(x)));
    b.mark_decision(entry);

    let y_body = b.add_state(y, StateKind::Basic);
    b.add_transition(b.rule_start(y), Transition::epsilon(y_body));
    b.add_transition(y_body, Transition::Atom { target: b.rule_stop(y), label: ID });

    let x_start = b.rule_start(x);
    let atn = b.build().unwrap();

    let set = atn.next_tokens(x_start);
    assert!(set.contains(ID));
    assert!(set.contains(EPSILON)); // the loop can match zero times
}
