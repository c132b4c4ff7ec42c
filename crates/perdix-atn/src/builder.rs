//! Assembly of an [`Atn`].
//!
//! The builder is the only construction path: the wire-format decoder and
//! hand-built test grammars both go through it, so every published network
//! has passed the same structural validation.

use perdix_core::token::{INVALID_TYPE, TokenType};
use thiserror::Error;

use crate::atn::{Atn, GrammarKind};
use crate::state::{AtnState, RuleIndex, StateKind, StateNumber};
use crate::transition::Transition;

/// Structural problems detected when freezing a network.
#[derive(Debug, Error)]
pub enum AtnBuildError {
    #[error("transition from state {from} targets missing state {target}")]
    DanglingTarget { from: StateNumber, target: StateNumber },

    #[error("state {state} mixes epsilon and consuming transitions")]
    MixedTransitions { state: StateNumber },

    #[error("decision state {state} has kind that cannot head a decision")]
    BadDecisionKind { state: StateNumber },

    #[error("rule {rule} referenced by state {state} does not exist")]
    UnknownRule { state: StateNumber, rule: RuleIndex },

    #[error("rule transition at state {state} does not target a rule start state")]
    BadRuleTarget { state: StateNumber },
}

/// Incrementally assembles states, rules, and decisions, then freezes
/// into an [`Atn`].
#[derive(Debug)]
pub struct AtnBuilder {
    grammar_kind: GrammarKind,
    max_token_type: TokenType,
    states: Vec<AtnState>,
    decisions: Vec<StateNumber>,
    rule_to_start: Vec<StateNumber>,
    rule_to_stop: Vec<StateNumber>,
    rule_to_token_type: Vec<TokenType>,
}

impl AtnBuilder {
    pub fn new(grammar_kind: GrammarKind, max_token_type: TokenType) -> Self {
        Self {
            grammar_kind,
            max_token_type,
            states: Vec::new(),
            decisions: Vec::new(),
            rule_to_start: Vec::new(),
            rule_to_stop: Vec::new(),
            rule_to_token_type: Vec::new(),
        }
    }

    /// Declare a rule, creating its start and stop states.
    pub fn add_rule(&mut self, precedence_rule: bool) -> RuleIndex {
        let rule = self.rule_to_start.len();
        let start = self.add_state(rule, StateKind::RuleStart { precedence_rule });
        let stop = self.add_state(rule, StateKind::RuleStop);
        self.rule_to_start.push(start);
        self.rule_to_stop.push(stop);
        self.rule_to_token_type.push(INVALID_TYPE);
        rule
    }

    /// Set the token type a lexer rule produces.
    pub fn set_rule_token_type(&mut self, rule: RuleIndex, token_type: TokenType) {
        self.rule_to_token_type[rule] = token_type;
    }

    /// Install rule tables wholesale. Used by the wire-format decoder,
    /// where rule start/stop states already exist in the state table.
    pub fn install_rule_tables(&mut self, tables: &[(StateNumber, StateNumber, TokenType)]) {
        self.rule_to_start = tables.iter().map(|&(start, _, _)| start).collect();
        self.rule_to_stop = tables.iter().map(|&(_, stop, _)| stop).collect();
        self.rule_to_token_type = tables.iter().map(|&(_, _, tt)| tt).collect();
    }

    /// Add a state and return its number.
    pub fn add_state(&mut self, rule: RuleIndex, kind: StateKind) -> StateNumber {
        let number = self.states.len();
        self.states.push(AtnState {
            number,
            rule,
            kind,
            decision: None,
            transitions: Vec::new(),
            epsilon_only_transitions: true,
        });
        number
    }

    /// Replace a state's kind; used to wire block/loop companions once
    /// all participating states exist.
    pub fn set_kind(&mut self, state: StateNumber, kind: StateKind) {
        self.states[state].kind = kind;
    }

    /// Assign the next decision number to `state`.
    pub fn mark_decision(&mut self, state: StateNumber) -> usize {
        let decision = self.decisions.len();
        self.decisions.push(state);
        self.states[state].decision = Some(decision);
        decision
    }

    pub fn add_transition(&mut self, from: StateNumber, transition: Transition) {
        self.states[from].transitions.push(transition);
    }

    pub fn rule_start(&self, rule: RuleIndex) -> StateNumber {
        self.rule_to_start[rule]
    }

    pub fn rule_stop(&self, rule: RuleIndex) -> StateNumber {
        self.rule_to_stop[rule]
    }

    /// Validate and freeze.
    pub fn build(mut self) -> Result<Atn, AtnBuildError> {
        self.add_rule_return_edges();
        let num_states = self.states.len();
        let num_rules = self.rule_to_start.len();

        for state in &mut self.states {
            let mut saw_epsilon = false;
            let mut saw_consuming = false;
            for t in &state.transitions {
                if t.is_epsilon() {
                    saw_epsilon = true;
                } else {
                    saw_consuming = true;
                }
            }
            if saw_epsilon && saw_consuming {
                return Err(AtnBuildError::MixedTransitions {
                    state: state.number,
                });
            }
            // A state with no transitions (rule stop of an uncalled
            // rule) is not epsilon-only; closure must still record it.
            state.epsilon_only_transitions = saw_epsilon && !saw_consuming;
        }

        for state in &self.states {
            for t in &state.transitions {
                if t.target() >= num_states {
                    return Err(AtnBuildError::DanglingTarget {
                        from: state.number,
                        target: t.target(),
                    });
                }
                if let Transition::Rule { target, rule, .. } = t {
                    if *rule >= num_rules {
                        return Err(AtnBuildError::UnknownRule {
                            state: state.number,
                            rule: *rule,
                        });
                    }
                    if !matches!(self.states[*target].kind, StateKind::RuleStart { .. }) {
                        return Err(AtnBuildError::BadRuleTarget {
                            state: state.number,
                        });
                    }
                }
            }
            if state.decision.is_some() && !state.kind.is_decision_kind() {
                return Err(AtnBuildError::BadDecisionKind {
                    state: state.number,
                });
            }
        }

        Ok(Atn {
            grammar_kind: self.grammar_kind,
            states: self.states,
            decisions: self.decisions,
            rule_to_start: self.rule_to_start,
            rule_to_stop: self.rule_to_stop,
            rule_to_token_type: self.rule_to_token_type,
            max_token_type: self.max_token_type,
        })
    }

    /// Give every rule stop state an epsilon return edge to the follow
    /// state of each call site. Closure chases these when the stack is
    /// empty (SLL wildcard). Idempotent so decoded networks, which
    /// already carry the edges, pass through unchanged.
    fn add_rule_return_edges(&mut self) {
        let mut returns: Vec<(StateNumber, Transition)> = Vec::new();
        for state in &self.states {
            for t in &state.transitions {
                let Transition::Rule {
                    target,
                    rule,
                    precedence,
                    follow,
                } = t
                else {
                    continue;
                };
                if *rule >= self.rule_to_stop.len() || *target >= self.states.len() {
                    continue; // build() will report these
                }
                let precedence_rule = matches!(
                    self.states[*target].kind,
                    StateKind::RuleStart {
                        precedence_rule: true
                    }
                );
                let outermost_precedence_return =
                    (precedence_rule && *precedence == 0).then_some(*rule);
                returns.push((
                    self.rule_to_stop[*rule],
                    Transition::Epsilon {
                        target: *follow,
                        outermost_precedence_return,
                    },
                ));
            }
        }
        for (stop, edge) in returns {
            if !self.states[stop].transitions.contains(&edge) {
                self.states[stop].transitions.push(edge);
            }
        }
    }
}
