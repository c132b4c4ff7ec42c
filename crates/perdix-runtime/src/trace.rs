//! Prediction and parse tracing.
//!
//! The simulator and interpreter are generic over a [`Tracer`];
//! [`NoopTracer`] compiles away entirely, [`PrintTracer`] narrates to
//! stderr for debugging. Ambiguity and context-sensitivity reports flow
//! through the same seam.

use perdix_core::bitset::BitSet;
use perdix_core::token::TokenType;

use crate::error::RecognitionError;

/// Observer of prediction and parse progress.
///
/// Implementations must not assume hooks are balanced across error
/// paths; prediction may abort between `predict_enter` and
/// `predict_exit`.
pub trait Tracer {
    fn predict_enter(&mut self, _decision: usize, _input_index: usize) {}
    fn predict_exit(&mut self, _decision: usize, _alt: usize) {}
    /// Followed a memoized DFA edge on `symbol`.
    fn dfa_edge(&mut self, _decision: usize, _symbol: TokenType) {}
    /// Published a new DFA state.
    fn dfa_state_added(&mut self, _decision: usize) {}
    /// SLL hit a conflict; retrying with full context.
    fn attempting_full_context(
        &mut self,
        _decision: usize,
        _conflicting_alts: &BitSet,
        _start_index: usize,
        _stop_index: usize,
    ) {
    }
    /// Full context picked a different alternative than SLL would have.
    fn context_sensitivity(
        &mut self,
        _decision: usize,
        _prediction: usize,
        _start_index: usize,
        _stop_index: usize,
    ) {
    }
    /// The input region is genuinely ambiguous between `ambig_alts`.
    fn ambiguity(
        &mut self,
        _decision: usize,
        _exact: bool,
        _ambig_alts: &BitSet,
        _start_index: usize,
        _stop_index: usize,
    ) {
    }
    /// The interpreter reported a syntax error.
    fn syntax_error(&mut self, _error: &RecognitionError) {}
}

/// Tracer that does nothing; all hooks inline to nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that narrates to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintTracer;

impl Tracer for PrintTracer {
    fn predict_enter(&mut self, decision: usize, input_index: usize) {
        eprintln!("predict: decision {decision} at token {input_index}");
    }

    fn predict_exit(&mut self, decision: usize, alt: usize) {
        eprintln!("predict: decision {decision} -> alt {alt}");
    }

    fn dfa_edge(&mut self, decision: usize, symbol: TokenType) {
        eprintln!("dfa: decision {decision} edge on {symbol}");
    }

    fn dfa_state_added(&mut self, decision: usize) {
        eprintln!("dfa: decision {decision} new state");
    }

    fn attempting_full_context(
        &mut self,
        decision: usize,
        conflicting_alts: &BitSet,
        start_index: usize,
        stop_index: usize,
    ) {
        eprintln!(
            "full-ctx: decision {decision} conflict {conflicting_alts} at {start_index}..{stop_index}"
        );
    }

    fn context_sensitivity(
        &mut self,
        decision: usize,
        prediction: usize,
        start_index: usize,
        stop_index: usize,
    ) {
        eprintln!(
            "full-ctx: decision {decision} context-sensitive alt {prediction} at {start_index}..{stop_index}"
        );
    }

    fn ambiguity(
        &mut self,
        decision: usize,
        exact: bool,
        ambig_alts: &BitSet,
        start_index: usize,
        stop_index: usize,
    ) {
        eprintln!(
            "ambiguity: decision {decision} alts {ambig_alts} exact={exact} at {start_index}..{stop_index}"
        );
    }

    fn syntax_error(&mut self, error: &RecognitionError) {
        eprintln!("error: {error}");
    }
}
