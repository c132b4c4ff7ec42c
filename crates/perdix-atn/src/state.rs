//! ATN states as tagged variants with a shared header.
//!
//! States are referenced everywhere by [`StateNumber`] (their index in
//! `Atn::states`), never by identity, so configurations survive
//! serialization round-trips and cross-thread sharing.

use crate::transition::Transition;

/// Index of a state in `Atn::states`.
pub type StateNumber = usize;

/// Index of a rule in the grammar.
pub type RuleIndex = usize;

/// State-type tag plus the variant-specific companions.
///
/// Block start/end and loop states carry the state numbers that tie the
/// sub-automaton together; the builder wires them after all states exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    Basic,
    RuleStart {
        /// True for the start state of a left-recursive precedence rule.
        precedence_rule: bool,
    },
    RuleStop,
    /// Start of a plain alternative block.
    BlockStart { end: StateNumber },
    /// Start of a `+` block; the loopback re-enters it.
    PlusBlockStart {
        end: StateNumber,
        loopback: StateNumber,
    },
    /// Start of a `*` block.
    StarBlockStart { end: StateNumber },
    BlockEnd { start: StateNumber },
    PlusLoopback,
    StarLoopEntry {
        loopback: StateNumber,
        /// True when this entry drives a left-recursive precedence rule
        /// decision.
        precedence_decision: bool,
    },
    StarLoopback,
    TokensStart,
    LoopEnd { loopback: StateNumber },
}

impl StateKind {
    /// Tag value used by the wire format and for dispatch tables.
    pub fn tag(&self) -> u16 {
        match self {
            StateKind::Basic => 0,
            StateKind::RuleStart { .. } => 1,
            StateKind::RuleStop => 2,
            StateKind::BlockStart { .. } => 3,
            StateKind::PlusBlockStart { .. } => 4,
            StateKind::StarBlockStart { .. } => 5,
            StateKind::BlockEnd { .. } => 6,
            StateKind::PlusLoopback => 7,
            StateKind::StarLoopEntry { .. } => 8,
            StateKind::StarLoopback => 9,
            StateKind::TokensStart => 10,
            StateKind::LoopEnd { .. } => 11,
        }
    }

    /// Whether states of this kind may own a decision.
    pub fn is_decision_kind(&self) -> bool {
        matches!(
            self,
            StateKind::BlockStart { .. }
                | StateKind::PlusBlockStart { .. }
                | StateKind::StarBlockStart { .. }
                | StateKind::PlusLoopback
                | StateKind::StarLoopEntry { .. }
                | StateKind::TokensStart
        )
    }
}

/// One node of the network.
#[derive(Clone, Debug)]
pub struct AtnState {
    pub number: StateNumber,
    pub rule: RuleIndex,
    pub kind: StateKind,
    /// Decision number, for states that head a decision (0-based).
    pub decision: Option<usize>,
    pub transitions: Vec<Transition>,
    /// True when every outgoing transition is non-consuming. Derived by
    /// the builder.
    pub epsilon_only_transitions: bool,
}

impl AtnState {
    #[inline]
    pub fn is_rule_stop(&self) -> bool {
        self.kind == StateKind::RuleStop
    }

    /// A decision state has more than one viable alternative; its ordered
    /// transitions are the 1-based alternatives of the decision.
    #[inline]
    pub fn is_decision(&self) -> bool {
        self.decision.is_some()
    }

    /// True for the entry state of a left-recursive rule's loop decision.
    pub fn is_precedence_decision(&self) -> bool {
        matches!(
            self.kind,
            StateKind::StarLoopEntry {
                precedence_decision: true,
                ..
            }
        )
    }
}
