//! Shared primitives for the Perdix parser runtime.
//!
//! This crate holds the plain-data layer every other Perdix crate builds on:
//! - `token` - the token model and reserved token-type constants
//! - `interval` - sorted interval sets over token types
//! - `bitset` - a growable bitset used for alternative-set analysis
//! - `vocabulary` - token-type to name resolution for diagnostics
//! - `stream` - the token-stream interface and an in-memory implementation

pub mod bitset;
pub mod interval;
pub mod stream;
pub mod token;
pub mod vocabulary;

#[cfg(test)]
mod bitset_tests;
#[cfg(test)]
mod interval_tests;

pub use bitset::BitSet;
pub use interval::{Interval, IntervalSet};
pub use stream::{ListTokenStream, TokenStream};
pub use token::{EOF, EPSILON, INVALID_TYPE, MIN_USER_TOKEN_TYPE, Token, TokenType};
pub use vocabulary::Vocabulary;
