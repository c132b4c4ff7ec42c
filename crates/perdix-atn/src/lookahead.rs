//! LL(1) lookahead analysis.
//!
//! Computes the set of tokens matchable from a state without consuming
//! anything first. Rule calls push the follow state onto an explicit
//! stack; reaching a rule stop with an empty stack contributes [`EPSILON`]
//! to mark end-of-rule reachability.

use perdix_core::bitset::BitSet;
use perdix_core::interval::IntervalSet;
use perdix_core::token::{EPSILON, MIN_USER_TOKEN_TYPE};
use rustc_hash::FxHashSet;

use crate::atn::Atn;
use crate::state::StateNumber;
use crate::transition::Transition;

/// Tokens matchable from `state`; `stop` (if set) also terminates the
/// walk, contributing [`EPSILON`].
pub fn look(atn: &Atn, state: StateNumber, stop: Option<StateNumber>) -> IntervalSet {
    let mut walker = Walker {
        atn,
        stop,
        result: IntervalSet::new(),
        busy: FxHashSet::default(),
        called_rules: BitSet::new(),
    };
    let mut stack = Vec::new();
    walker.walk(state, &mut stack);
    walker.result
}

struct Walker<'a> {
    atn: &'a Atn,
    stop: Option<StateNumber>,
    result: IntervalSet,
    /// Cycle guard: `(state, follow stack)` pairs already expanded.
    busy: FxHashSet<(StateNumber, Vec<StateNumber>)>,
    /// Rules on the current call path, to cut recursive rule re-entry.
    called_rules: BitSet,
}

impl Walker<'_> {
    fn walk(&mut self, state: StateNumber, stack: &mut Vec<StateNumber>) {
        if !self.busy.insert((state, stack.clone())) {
            return;
        }

        if Some(state) == self.stop {
            self.result.add(EPSILON);
            return;
        }

        let atn = self.atn;
        let s = atn.state(state);
        if s.is_rule_stop() {
            match stack.pop() {
                None => {
                    self.result.add(EPSILON);
                    return;
                }
                Some(follow) => {
                    // The rule completed; allow re-entry along the
                    // continuation.
                    let was_called = self.called_rules.get(s.rule);
                    self.called_rules.clear(s.rule);
                    self.walk(follow, stack);
                    if was_called {
                        self.called_rules.set(s.rule);
                    }
                    stack.push(follow);
                    return;
                }
            }
        }

        for t in &s.transitions {
            match t {
                Transition::Rule {
                    target,
                    rule,
                    follow,
                    ..
                } => {
                    if self.called_rules.get(*rule) {
                        continue;
                    }
                    self.called_rules.set(*rule);
                    stack.push(*follow);
                    self.walk(*target, stack);
                    stack.pop();
                    self.called_rules.clear(*rule);
                }
                Transition::Epsilon { target, .. }
                | Transition::Predicate { target, .. }
                | Transition::PrecedencePredicate { target, .. }
                | Transition::Action { target, .. } => {
                    self.walk(*target, stack);
                }
                Transition::Wildcard { .. } => {
                    self.result
                        .add_range(MIN_USER_TOKEN_TYPE, self.atn.max_token_type);
                }
                Transition::NotSet { set, .. } => {
                    let complement = set.complement(MIN_USER_TOKEN_TYPE, self.atn.max_token_type);
                    self.result.add_set(&complement);
                }
                Transition::Atom { .. } | Transition::Range { .. } | Transition::Set { .. } => {
                    if let Some(label) = t.label() {
                        self.result.add_set(&label);
                    }
                }
            }
        }
    }
}
