//! Error strategies.
//!
//! The interpreter surfaces recognition errors; a strategy decides how to
//! resynchronize. [`DefaultErrorStrategy`] repairs with single-token
//! deletion/insertion and resyncs to the follow set;
//! [`BailErrorStrategy`] aborts the parse on the first error.
//!
//! Strategies see the parser through the object-safe [`ParserOps`] seam,
//! so the interpreter can hand itself over without generics bleeding
//! into the trait.

use perdix_atn::{Atn, RuleIndex, StateKind, StateNumber};
use perdix_core::interval::IntervalSet;
use perdix_core::token::{EOF, EPSILON, INVALID_TYPE, Token, TokenType};
use perdix_core::vocabulary::Vocabulary;

use crate::error::RecognitionError;

/// Marker index for tokens conjured by recovery; they exist only in the
/// tree, not in the stream.
pub const SYNTHETIC_TOKEN_INDEX: usize = usize::MAX;

/// What a strategy may do to the parser.
pub trait ParserOps {
    fn atn(&self) -> &Atn;
    fn vocabulary(&self) -> &Vocabulary;
    fn current_state(&self) -> StateNumber;
    fn current_rule(&self) -> RuleIndex;
    fn la(&mut self, k: isize) -> TokenType;
    /// Current token, cloned.
    fn current_token(&mut self) -> Token;
    fn input_index(&self) -> usize;
    /// Consume the current token into the tree; `as_error` stores it as
    /// an error node.
    fn consume_current(&mut self, as_error: bool) -> Token;
    /// Tokens acceptable at the current state given the rule-invocation
    /// chain.
    fn expected_tokens(&self) -> IntervalSet;
    /// Invoking states of the context chain, innermost first.
    fn rule_invocation_chain(&self) -> Vec<StateNumber>;
    /// Attach an error node to the current context.
    fn add_error_node(&mut self, token: Token);
    /// Record a syntax error (listener/tracer notification).
    fn notify_error(&mut self, error: &RecognitionError);
}

/// Recovery policy, driven by the interpreter.
pub trait ErrorStrategy {
    fn reset(&mut self);

    /// Make sure the parser is in sync before a decision; may repair or
    /// raise.
    fn sync(&mut self, parser: &mut dyn ParserOps) -> Result<(), RecognitionError>;

    /// A token matched; leave error-recovery mode.
    fn report_match(&mut self, parser: &mut dyn ParserOps);

    fn report_error(&mut self, parser: &mut dyn ParserOps, error: &RecognitionError);

    /// Resynchronize after a reported error. Returning an error aborts
    /// the parse.
    fn recover(
        &mut self,
        parser: &mut dyn ParserOps,
        error: &RecognitionError,
    ) -> Result<(), RecognitionError>;

    /// Repair a single-token mismatch in place, producing the token the
    /// parser should pretend to have matched.
    fn recover_inline(&mut self, parser: &mut dyn ParserOps) -> Result<Token, RecognitionError>;

    fn in_error_recovery_mode(&self) -> bool;
}

/// Recovers with single-token deletion/insertion and follow-set
/// resynchronization.
#[derive(Debug, Default)]
pub struct DefaultErrorStrategy {
    error_recovery_mode: bool,
    last_error_index: Option<usize>,
    last_error_states: Vec<StateNumber>,
}

impl DefaultErrorStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin_error_condition(&mut self) {
        self.error_recovery_mode = true;
    }

    fn end_error_condition(&mut self) {
        self.error_recovery_mode = false;
        self.last_error_states.clear();
        self.last_error_index = None;
    }

    /// Union of follow sets along the rule-invocation chain: everything
    /// that could come after the rules currently in flight.
    fn recovery_set(&self, parser: &mut dyn ParserOps) -> IntervalSet {
        let mut recover = IntervalSet::new();
        for invoking in parser.rule_invocation_chain() {
            let follow = parser.atn().rule_follow(invoking);
            recover.add_set(&parser.atn().next_tokens(follow));
        }
        recover.remove(EPSILON);
        recover
    }

    fn consume_until(&mut self, parser: &mut dyn ParserOps, set: &IntervalSet) {
        loop {
            let t = parser.la(1);
            if t == EOF || set.contains(t) {
                return;
            }
            parser.consume_current(true);
        }
    }

    fn report_unwanted_token(&mut self, parser: &mut dyn ParserOps) {
        if self.error_recovery_mode {
            return;
        }
        self.begin_error_condition();
        let offending = parser.current_token();
        let expected = parser.expected_tokens();
        let error = RecognitionError::InputMismatch {
            offending,
            expected: expected.display(parser.vocabulary()),
            rule: parser.current_rule(),
            state: parser.current_state(),
        };
        parser.notify_error(&error);
    }

    fn report_missing_token(&mut self, parser: &mut dyn ParserOps) {
        if self.error_recovery_mode {
            return;
        }
        self.begin_error_condition();
        let offending = parser.current_token();
        let expected = parser.expected_tokens();
        let error = RecognitionError::InputMismatch {
            offending,
            expected: expected.display(parser.vocabulary()),
            rule: parser.current_rule(),
            state: parser.current_state(),
        };
        parser.notify_error(&error);
    }

    /// If dropping the current token makes the next one match, drop it.
    fn single_token_deletion(&mut self, parser: &mut dyn ParserOps) -> Option<Token> {
        let next_type = parser.la(2);
        let expecting = parser.expected_tokens();
        if !expecting.contains(next_type) {
            return None;
        }
        self.report_unwanted_token(parser);
        // Delete the extra token, then move past the one we actually
        // matched as if nothing happened.
        parser.consume_current(true);
        let matched = parser.current_token();
        self.report_match_inner();
        parser.consume_current(false);
        Some(matched)
    }

    fn report_match_inner(&mut self) {
        self.end_error_condition();
    }

    /// If the current token would match right after the one we expect,
    /// conjure the missing token instead of consuming anything.
    fn single_token_insertion(&mut self, parser: &mut dyn ParserOps) -> Option<Token> {
        let current_type = parser.la(1);
        let atn = parser.atn();
        let state = atn.state(parser.current_state());
        let next = state.transitions.first()?.target();
        let chain = parser.rule_invocation_chain();
        let expecting_at_ll2 = parser.atn().expected_tokens(next, chain);
        if !expecting_at_ll2.contains(current_type) {
            return None;
        }
        self.report_missing_token(parser);
        Some(self.missing_symbol(parser))
    }

    fn missing_symbol(&self, parser: &mut dyn ParserOps) -> Token {
        let current = parser.current_token();
        let expected = parser.expected_tokens();
        let expected_type = expected.min_element().unwrap_or(INVALID_TYPE);
        let name = if expected_type == EOF {
            "<missing EOF>".to_string()
        } else {
            format!("<missing {}>", parser.vocabulary().display_name(expected_type))
        };
        let mut token = Token::new(expected_type, name);
        token.index = SYNTHETIC_TOKEN_INDEX;
        token.line = current.line;
        token.column = current.column;
        token
    }

    fn input_mismatch(&self, parser: &mut dyn ParserOps) -> RecognitionError {
        RecognitionError::InputMismatch {
            offending: parser.current_token(),
            expected: parser.expected_tokens().display(parser.vocabulary()),
            rule: parser.current_rule(),
            state: parser.current_state(),
        }
    }
}

impl ErrorStrategy for DefaultErrorStrategy {
    fn reset(&mut self) {
        self.end_error_condition();
    }

    fn sync(&mut self, parser: &mut dyn ParserOps) -> Result<(), RecognitionError> {
        // One error per resynchronization: stay quiet while recovering.
        if self.error_recovery_mode {
            return Ok(());
        }

        let state = parser.current_state();
        let la = parser.la(1);
        let next = parser.atn().next_tokens(state);
        if next.contains(EPSILON) || next.contains(la) {
            return Ok(());
        }

        match parser.atn().state(state).kind {
            StateKind::BlockStart { .. }
            | StateKind::StarBlockStart { .. }
            | StateKind::PlusBlockStart { .. }
            | StateKind::StarLoopEntry { .. } => {
                if self.single_token_deletion(parser).is_some() {
                    return Ok(());
                }
                Err(self.input_mismatch(parser))
            }
            StateKind::PlusLoopback | StateKind::StarLoopback => {
                self.report_unwanted_token(parser);
                let mut expecting = parser.expected_tokens();
                expecting.add_set(&self.recovery_set(parser));
                self.consume_until(parser, &expecting);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn report_match(&mut self, _parser: &mut dyn ParserOps) {
        self.end_error_condition();
    }

    fn report_error(&mut self, parser: &mut dyn ParserOps, error: &RecognitionError) {
        if self.error_recovery_mode {
            return;
        }
        self.begin_error_condition();
        parser.notify_error(error);
    }

    fn recover(
        &mut self,
        parser: &mut dyn ParserOps,
        _error: &RecognitionError,
    ) -> Result<(), RecognitionError> {
        // A second failure at the same spot must consume or we loop
        // forever.
        if self.last_error_index == Some(parser.input_index())
            && self.last_error_states.contains(&parser.current_state())
        {
            parser.consume_current(true);
        }
        self.last_error_index = Some(parser.input_index());
        self.last_error_states.push(parser.current_state());

        let follow = self.recovery_set(parser);
        self.consume_until(parser, &follow);
        Ok(())
    }

    fn recover_inline(&mut self, parser: &mut dyn ParserOps) -> Result<Token, RecognitionError> {
        if let Some(token) = self.single_token_deletion(parser) {
            return Ok(token);
        }
        if let Some(token) = self.single_token_insertion(parser) {
            return Ok(token);
        }
        Err(self.input_mismatch(parser))
    }

    fn in_error_recovery_mode(&self) -> bool {
        self.error_recovery_mode
    }
}

/// Aborts the parse on the first syntax error.
#[derive(Debug, Default)]
pub struct BailErrorStrategy;

impl BailErrorStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorStrategy for BailErrorStrategy {
    fn reset(&mut self) {}

    fn sync(&mut self, _parser: &mut dyn ParserOps) -> Result<(), RecognitionError> {
        Ok(())
    }

    fn report_match(&mut self, _parser: &mut dyn ParserOps) {}

    fn report_error(&mut self, parser: &mut dyn ParserOps, error: &RecognitionError) {
        parser.notify_error(error);
    }

    fn recover(
        &mut self,
        _parser: &mut dyn ParserOps,
        error: &RecognitionError,
    ) -> Result<(), RecognitionError> {
        Err(error.clone())
    }

    fn recover_inline(&mut self, parser: &mut dyn ParserOps) -> Result<Token, RecognitionError> {
        Err(RecognitionError::InputMismatch {
            offending: parser.current_token(),
            expected: parser.expected_tokens().display(parser.vocabulary()),
            rule: parser.current_rule(),
            state: parser.current_state(),
        })
    }

    fn in_error_recovery_mode(&self) -> bool {
        false
    }
}
