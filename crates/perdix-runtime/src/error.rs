//! Recognition errors.
//!
//! Prediction and matching never recover on their own; they surface one
//! of these and the interpreter drives the error strategy. Structural
//! problems (frozen-set mutation, corrupt tables) are panics, not errors.

use perdix_atn::{RuleIndex, StateNumber};
use perdix_core::token::Token;
use thiserror::Error;

use crate::config_set::ConfigSet;

/// A recoverable input-level error.
///
/// Every variant carries the offending token, the rule, and the ATN state
/// the recognizer was in, which is what the error strategy needs for
/// resynchronization.
#[derive(Clone, Debug, Error)]
pub enum RecognitionError {
    /// The current token does not satisfy the expected set.
    #[error("mismatched input '{}' expecting {expected}", offending.text)]
    InputMismatch {
        offending: Token,
        /// Rendered expected-token set.
        expected: String,
        rule: RuleIndex,
        state: StateNumber,
    },

    /// Adaptive prediction found no viable alternative.
    #[error("no viable alternative at input '{}'", offending.text)]
    NoViableAlt {
        offending: Token,
        /// Token at which prediction started.
        start: Token,
        decision: usize,
        rule: RuleIndex,
        state: StateNumber,
        /// Configurations alive when prediction died.
        configs: ConfigSet,
    },

    /// A semantic or precedence predicate evaluated false.
    #[error("rule {rule} {message}")]
    FailedPredicate {
        offending: Token,
        rule: RuleIndex,
        state: StateNumber,
        /// Predicate index for user predicates; `None` for precedence
        /// predicates.
        pred_index: Option<usize>,
        message: String,
    },

    /// Lexer counterpart of [`RecognitionError::NoViableAlt`].
    #[error("no viable token alternative at index {start_index}")]
    LexerNoViableAlt {
        start_index: usize,
        rule: RuleIndex,
        state: StateNumber,
    },
}

impl RecognitionError {
    /// The token that triggered the error, where one exists.
    pub fn offending_token(&self) -> Option<&Token> {
        match self {
            RecognitionError::InputMismatch { offending, .. }
            | RecognitionError::NoViableAlt { offending, .. }
            | RecognitionError::FailedPredicate { offending, .. } => Some(offending),
            RecognitionError::LexerNoViableAlt { .. } => None,
        }
    }

    pub fn rule_index(&self) -> RuleIndex {
        match self {
            RecognitionError::InputMismatch { rule, .. }
            | RecognitionError::NoViableAlt { rule, .. }
            | RecognitionError::FailedPredicate { rule, .. }
            | RecognitionError::LexerNoViableAlt { rule, .. } => *rule,
        }
    }

    pub fn state(&self) -> StateNumber {
        match self {
            RecognitionError::InputMismatch { state, .. }
            | RecognitionError::NoViableAlt { state, .. }
            | RecognitionError::FailedPredicate { state, .. }
            | RecognitionError::LexerNoViableAlt { state, .. } => *state,
        }
    }
}
