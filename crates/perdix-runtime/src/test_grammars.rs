//! Hand-assembled networks shared by the runtime tests.
//!
//! Each constructor builds the same shape the grammar compiler would
//! emit, including the decision numbering and the left-recursion
//! encoding with precedence predicates.

use std::sync::Arc;

use perdix_atn::{Atn, AtnBuilder, GrammarKind, StateKind, Transition};
use perdix_core::vocabulary::Vocabulary;

pub const ID: i32 = 1;
pub const EQ: i32 = 2;
pub const INT: i32 = 3;
pub const BANG: i32 = 4;
pub const PLUS: i32 = 5;

pub fn vocab() -> Vocabulary {
    Vocabulary::from_symbolic(&["ID", "'='", "INT", "'!'", "'+'"])
}

/// `s: ID '=' INT ;`
pub fn linear() -> Arc<Atn> {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let s = b.add_rule(false);
    let a0 = b.add_state(s, StateKind::Basic);
    let a1 = b.add_state(s, StateKind::Basic);
    let a2 = b.add_state(s, StateKind::Basic);
    let a3 = b.add_state(s, StateKind::Basic);
    b.add_transition(b.rule_start(s), Transition::epsilon(a0));
    b.add_transition(a0, Transition::Atom { target: a1, label: ID });
    b.add_transition(a1, Transition::Atom { target: a2, label: EQ });
    b.add_transition(a2, Transition::Atom { target: a3, label: INT });
    b.add_transition(a3, Transition::epsilon(b.rule_stop(s)));
    Arc::new(b.build().unwrap())
}

/// `s: e ;  e: ID | ID '!' ;` with the decision in `e`.
///
/// Returns the network and the decision number of `e`'s block.
pub fn ambiguous() -> (Arc<Atn>, usize) {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let s = b.add_rule(false);
    let e = b.add_rule(false);

    // s: e ;
    let call = b.add_state(s, StateKind::Basic);
    let after = b.add_state(s, StateKind::Basic);
    b.add_transition(b.rule_start(s), Transition::epsilon(call));
    b.add_transition(
        call,
        Transition::Rule {
            target: b.rule_start(e),
            rule: e,
            precedence: 0,
            follow: after,
        },
    );
    b.add_transition(after, Transition::epsilon(b.rule_stop(s)));

    // e: ID | ID '!' ;
    let end = b.add_state(e, StateKind::Basic);
    let block = b.add_state(e, StateKind::BlockStart { end });
    b.set_kind(end, StateKind::BlockEnd { start: block });
    let alt1 = b.add_state(e, StateKind::Basic);
    let alt2 = b.add_state(e, StateKind::Basic);
    let alt2_mid = b.add_state(e, StateKind::Basic);
    b.add_transition(b.rule_start(e), Transition::epsilon(block));
    b.add_transition(block, Transition::epsilon(alt1));
    b.add_transition(block, Transition::epsilon(alt2));
    b.add_transition(alt1, Transition::Atom { target: end, label: ID });
    b.add_transition(alt2, Transition::Atom { target: alt2_mid, label: ID });
    b.add_transition(alt2_mid, Transition::Atom { target: end, label: BANG });
    b.add_transition(end, Transition::epsilon(b.rule_stop(e)));
    let decision = b.mark_decision(block);

    (Arc::new(b.build().unwrap()), decision)
}

/// `e: e '+' e | INT ;` in its left-recursion-eliminated form:
/// `e[p]: INT ( {2 >= p}? '+' e[3] )* ;`
pub fn left_recursive() -> (Arc<Atn>, usize) {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let e = b.add_rule(true);

    let primary = b.add_state(e, StateKind::Basic);
    let after_primary = b.add_state(e, StateKind::Basic);

    let loopback = b.add_state(e, StateKind::StarLoopback);
    let entry = b.add_state(
        e,
        StateKind::StarLoopEntry {
            loopback,
            precedence_decision: true,
        },
    );
    let block_end = b.add_state(e, StateKind::Basic);
    let block_start = b.add_state(e, StateKind::StarBlockStart { end: block_end });
    b.set_kind(block_end, StateKind::BlockEnd { start: block_start });
    let loop_end = b.add_state(e, StateKind::LoopEnd { loopback });

    let pred = b.add_state(e, StateKind::Basic);
    let after_pred = b.add_state(e, StateKind::Basic);
    let after_plus = b.add_state(e, StateKind::Basic);

    b.add_transition(b.rule_start(e), Transition::epsilon(primary));
    b.add_transition(primary, Transition::Atom { target: after_primary, label: INT });
    b.add_transition(after_primary, Transition::epsilon(entry));

    b.add_transition(entry, Transition::epsilon(block_start));
    b.add_transition(entry, Transition::epsilon(loop_end));
    let decision = b.mark_decision(entry);

    b.add_transition(block_start, Transition::epsilon(pred));
    b.add_transition(
        pred,
        Transition::PrecedencePredicate {
            target: after_pred,
            precedence: 2,
        },
    );
    b.add_transition(after_pred, Transition::Atom { target: after_plus, label: PLUS });
    b.add_transition(
        after_plus,
        Transition::Rule {
            target: b.rule_start(e),
            rule: e,
            precedence: 3,
            follow: block_end,
        },
    );
    b.add_transition(block_end, Transition::epsilon(loopback));
    b.add_transition(loopback, Transition::epsilon(entry));
    b.add_transition(loop_end, Transition::epsilon(b.rule_stop(e)));

    (Arc::new(b.build().unwrap()), decision)
}

/// `s: {p()}? ID | ID ;`
pub fn predicated() -> (Arc<Atn>, usize) {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let s = b.add_rule(false);

    let end = b.add_state(s, StateKind::Basic);
    let block = b.add_state(s, StateKind::BlockStart { end });
    b.set_kind(end, StateKind::BlockEnd { start: block });
    let alt1 = b.add_state(s, StateKind::Basic);
    let alt1_body = b.add_state(s, StateKind::Basic);
    let alt2 = b.add_state(s, StateKind::Basic);

    b.add_transition(b.rule_start(s), Transition::epsilon(block));
    b.add_transition(block, Transition::epsilon(alt1));
    b.add_transition(block, Transition::epsilon(alt2));
    b.add_transition(
        alt1,
        Transition::Predicate {
            target: alt1_body,
            rule: s,
            pred_index: 0,
            is_ctx_dependent: false,
        },
    );
    b.add_transition(alt1_body, Transition::Atom { target: end, label: ID });
    b.add_transition(alt2, Transition::Atom { target: end, label: ID });
    b.add_transition(end, Transition::epsilon(b.rule_stop(s)));
    let decision = b.mark_decision(block);

    (Arc::new(b.build().unwrap()), decision)
}

/// `s: ID | ID ;`: two identical alternatives, a genuine ambiguity
/// that SLL cannot resolve and full LL reports.
pub fn identical_alts() -> (Arc<Atn>, usize) {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let s = b.add_rule(false);

    let end = b.add_state(s, StateKind::Basic);
    let block = b.add_state(s, StateKind::BlockStart { end });
    b.set_kind(end, StateKind::BlockEnd { start: block });
    let alt1 = b.add_state(s, StateKind::Basic);
    let alt2 = b.add_state(s, StateKind::Basic);

    b.add_transition(b.rule_start(s), Transition::epsilon(block));
    b.add_transition(block, Transition::epsilon(alt1));
    b.add_transition(block, Transition::epsilon(alt2));
    b.add_transition(alt1, Transition::Atom { target: end, label: ID });
    b.add_transition(alt2, Transition::Atom { target: end, label: ID });
    b.add_transition(end, Transition::epsilon(b.rule_stop(s)));
    let decision = b.mark_decision(block);

    (Arc::new(b.build().unwrap()), decision)
}

/// `s: ID '=' INT | ID '+' INT ;`: two alternatives that need two
/// tokens of lookahead, enough to grow a real DFA.
pub fn two_alt_lookahead() -> (Arc<Atn>, usize) {
    let mut b = AtnBuilder::new(GrammarKind::Parser, 5);
    let s = b.add_rule(false);

    let end = b.add_state(s, StateKind::Basic);
    let block = b.add_state(s, StateKind::BlockStart { end });
    b.set_kind(end, StateKind::BlockEnd { start: block });

    let a1 = b.add_state(s, StateKind::Basic);
    let a1_eq = b.add_state(s, StateKind::Basic);
    let a1_int = b.add_state(s, StateKind::Basic);
    let a2 = b.add_state(s, StateKind::Basic);
    let a2_plus = b.add_state(s, StateKind::Basic);
    let a2_int = b.add_state(s, StateKind::Basic);

    b.add_transition(b.rule_start(s), Transition::epsilon(block));
    b.add_transition(block, Transition::epsilon(a1));
    b.add_transition(block, Transition::epsilon(a2));
    b.add_transition(a1, Transition::Atom { target: a1_eq, label: ID });
    b.add_transition(a1_eq, Transition::Atom { target: a1_int, label: EQ });
    b.add_transition(a1_int, Transition::Atom { target: end, label: INT });
    b.add_transition(a2, Transition::Atom { target: a2_plus, label: ID });
    b.add_transition(a2_plus, Transition::Atom { target: a2_int, label: PLUS });
    b.add_transition(a2_int, Transition::Atom { target: end, label: INT });
    b.add_transition(end, Transition::epsilon(b.rule_stop(s)));
    let decision = b.mark_decision(block);

    (Arc::new(b.build().unwrap()), decision)
}
