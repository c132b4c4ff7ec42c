//! Transition variants.
//!
//! Every transition carries its target state number. Epsilon-ness is
//! derived from the tag: predicate, action, and rule-call transitions do
//! not consume input.

use perdix_core::interval::IntervalSet;
use perdix_core::token::TokenType;

use crate::state::{RuleIndex, StateNumber};

/// A labeled edge of the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Epsilon {
        target: StateNumber,
        /// For rule-return edges out of a precedence rule invoked at
        /// precedence 0: the rule returned from. Closure uses this to
        /// exempt configurations from the precedence filter.
        outermost_precedence_return: Option<RuleIndex>,
    },
    /// Matches exactly one token type.
    Atom {
        target: StateNumber,
        label: TokenType,
    },
    /// Matches the closed range `[low, high]`.
    Range {
        target: StateNumber,
        low: TokenType,
        high: TokenType,
    },
    Set {
        target: StateNumber,
        set: IntervalSet,
    },
    /// Matches any in-vocabulary token outside `set`.
    NotSet {
        target: StateNumber,
        set: IntervalSet,
    },
    /// Matches any in-vocabulary token.
    Wildcard {
        target: StateNumber,
    },
    /// Call into `rule`; `target` is the rule start state and `follow` is
    /// where the caller resumes after the rule returns.
    Rule {
        target: StateNumber,
        rule: RuleIndex,
        precedence: u32,
        follow: StateNumber,
    },
    Predicate {
        target: StateNumber,
        rule: RuleIndex,
        pred_index: usize,
        is_ctx_dependent: bool,
    },
    PrecedencePredicate {
        target: StateNumber,
        precedence: u32,
    },
    Action {
        target: StateNumber,
        rule: RuleIndex,
        action_index: usize,
        is_ctx_dependent: bool,
    },
}

impl Transition {
    /// Plain epsilon edge.
    pub fn epsilon(target: StateNumber) -> Self {
        Transition::Epsilon {
            target,
            outermost_precedence_return: None,
        }
    }

    #[inline]
    pub fn target(&self) -> StateNumber {
        match *self {
            Transition::Epsilon { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::PrecedencePredicate { target, .. }
            | Transition::Action { target, .. } => target,
        }
    }

    /// Whether this transition consumes no input.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Predicate { .. }
                | Transition::PrecedencePredicate { .. }
                | Transition::Action { .. }
        )
    }

    /// Whether `symbol` satisfies the label, for symbols drawn from the
    /// vocabulary range `[min_vocab, max_vocab]`.
    pub fn matches(&self, symbol: TokenType, min_vocab: TokenType, max_vocab: TokenType) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { low, high, .. } => *low <= symbol && symbol <= *high,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol >= min_vocab && symbol <= max_vocab && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol >= min_vocab && symbol <= max_vocab,
            _ => false,
        }
    }

    /// The match set, for labeled transitions.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { low, high, .. } => Some(IntervalSet::of_range(*low, *high)),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => Some(set.clone()),
            _ => None,
        }
    }

    /// Tag value used by the wire format.
    pub fn tag(&self) -> u16 {
        match self {
            Transition::Epsilon { .. } => 0,
            Transition::Atom { .. } => 1,
            Transition::Range { .. } => 2,
            Transition::Set { .. } => 3,
            Transition::NotSet { .. } => 4,
            Transition::Wildcard { .. } => 5,
            Transition::Rule { .. } => 6,
            Transition::Predicate { .. } => 7,
            Transition::PrecedencePredicate { .. } => 8,
            Transition::Action { .. } => 9,
        }
    }
}
