//! Immutable augmented transition network (ATN) model.
//!
//! An [`Atn`] is a directed graph of tagged states connected by labeled
//! transitions, produced once (by the [`builder`] or the [`serial`]
//! decoder) and then shared read-only by any number of parsers. This crate
//! also carries the LL(1) lookahead analysis (`next_tokens`,
//! `expected_tokens`) the runtime and error strategies rely on.

pub mod atn;
pub mod builder;
pub mod lookahead;
pub mod serial;
pub mod state;
pub mod transition;

#[cfg(test)]
mod lookahead_tests;

pub use atn::{Atn, GrammarKind, INVALID_ALT};
pub use builder::{AtnBuildError, AtnBuilder};
pub use serial::{AtnFormatError, decode, encode};
pub use state::{AtnState, RuleIndex, StateKind, StateNumber};
pub use transition::Transition;
