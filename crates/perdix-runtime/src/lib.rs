//! Adaptive LL(*) prediction and ATN-walking interpretation.
//!
//! The runtime half of Perdix: graph-structured prediction contexts,
//! configuration-set algebra, the per-decision DFA cache, the adaptive
//! SLL/full-LL simulator, and the interpreter that walks a network to
//! build parse trees.
//!
//! Sharing model: one [`Atn`](perdix_atn::Atn) plus one
//! [`DfaCache`] serve any number of parsers, across threads. Everything
//! per-parse (trees, streams, interpreter state) is thread-local.

pub mod config;
pub mod config_set;
pub mod context;
pub mod dfa;
pub mod error;
pub mod interpreter;
pub mod prediction;
pub mod semantic;
pub mod simulator;
pub mod strategy;
pub mod trace;
pub mod tree;

#[cfg(test)]
mod prediction_tests;
#[cfg(test)]
mod semantic_tests;
#[cfg(test)]
mod simulator_tests;
#[cfg(test)]
mod test_grammars;

pub use config::{AtnConfig, ConfigKey};
pub use config_set::ConfigSet;
pub use context::{ContextCache, MergeCache, PredictionContext, merge};
pub use dfa::{Dfa, DfaCache, DfaEdge, DfaState};
pub use error::RecognitionError;
pub use interpreter::{Callbacks, Interpreter, InterpreterBuilder};
pub use prediction::PredictionMode;
pub use semantic::{Recognizer, SemanticContext};
pub use simulator::ParserAtnSimulator;
pub use strategy::{BailErrorStrategy, DefaultErrorStrategy, ErrorStrategy, ParserOps};
pub use trace::{NoopTracer, PrintTracer, Tracer};
pub use tree::{CtxRef, ParseTree, RuleContext, to_string_tree};
