//! The assembled network.

use perdix_core::interval::IntervalSet;
use perdix_core::token::{EOF, EPSILON, TokenType};

use crate::lookahead;
use crate::state::{AtnState, RuleIndex, StateNumber};

/// Alternative number meaning "no alternative predicted". Real
/// alternatives are 1-based.
pub const INVALID_ALT: usize = 0;

/// Whether the network was compiled from a parser or a lexer grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarKind {
    Parser,
    Lexer,
}

/// An immutable augmented transition network.
///
/// Constructed by [`AtnBuilder`](crate::builder::AtnBuilder) or decoded
/// from the wire format; shared read-only afterwards. States are addressed
/// by number and decisions index into the decision table.
#[derive(Clone, Debug)]
pub struct Atn {
    pub grammar_kind: GrammarKind,
    pub max_token_type: TokenType,
    pub(crate) states: Vec<AtnState>,
    /// Decision number to decision state.
    pub(crate) decisions: Vec<StateNumber>,
    pub(crate) rule_to_start: Vec<StateNumber>,
    pub(crate) rule_to_stop: Vec<StateNumber>,
    /// Token type each rule produces (lexer grammars only; `INVALID_TYPE`
    /// for parser rules).
    pub(crate) rule_to_token_type: Vec<TokenType>,
}

impl Atn {
    #[inline]
    pub fn state(&self, number: StateNumber) -> &AtnState {
        &self.states[number]
    }

    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    pub fn num_rules(&self) -> usize {
        self.rule_to_start.len()
    }

    pub fn num_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// State heading the given decision.
    pub fn decision_state(&self, decision: usize) -> StateNumber {
        self.decisions[decision]
    }

    pub fn rule_start_state(&self, rule: RuleIndex) -> StateNumber {
        self.rule_to_start[rule]
    }

    pub fn rule_stop_state(&self, rule: RuleIndex) -> StateNumber {
        self.rule_to_stop[rule]
    }

    pub fn rule_token_type(&self, rule: RuleIndex) -> TokenType {
        self.rule_to_token_type[rule]
    }

    /// Whether `rule` is a left-recursive precedence rule.
    pub fn is_precedence_rule(&self, rule: RuleIndex) -> bool {
        matches!(
            self.state(self.rule_to_start[rule]).kind,
            crate::state::StateKind::RuleStart {
                precedence_rule: true
            }
        )
    }

    /// Resume point after the rule invoked at `invoking` returns.
    ///
    /// Panics if `invoking` has no rule transition; callers only reach
    /// this through invocation chains, so a miss is a structural bug.
    pub fn rule_follow(&self, invoking: StateNumber) -> StateNumber {
        for t in &self.state(invoking).transitions {
            if let crate::transition::Transition::Rule { follow, .. } = t {
                return *follow;
            }
        }
        panic!("state {invoking} has no rule transition to follow");
    }

    /// Tokens that can follow `state` within its own rule.
    ///
    /// The set contains [`EPSILON`] when end-of-rule is reachable without
    /// consuming, which callers resolve against the invocation context.
    pub fn next_tokens(&self, state: StateNumber) -> IntervalSet {
        lookahead::look(self, state, None)
    }

    /// Tokens acceptable at `state` given the chain of invoking states,
    /// innermost first. Used by error reporting and recovery.
    pub fn expected_tokens(
        &self,
        state: StateNumber,
        invoking_states: impl IntoIterator<Item = StateNumber>,
    ) -> IntervalSet {
        let mut following = self.next_tokens(state);
        if !following.contains(EPSILON) {
            return following;
        }

        let mut expected = IntervalSet::new();
        add_without_epsilon(&mut expected, &following);
        for invoking in invoking_states {
            if !following.contains(EPSILON) {
                break;
            }
            let follow = self.rule_follow(invoking);
            following = self.next_tokens(follow);
            add_without_epsilon(&mut expected, &following);
        }
        if following.contains(EPSILON) {
            expected.add(EOF);
        }
        expected
    }
}

fn add_without_epsilon(dest: &mut IntervalSet, src: &IntervalSet) {
    dest.add_set(src);
    dest.remove(EPSILON);
}
