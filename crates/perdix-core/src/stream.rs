//! Token-stream interface and an in-memory implementation.
//!
//! The runtime only ever talks to a [`TokenStream`]; lexing is an external
//! concern. [`ListTokenStream`] wraps an already-lexed token list, which is
//! also what the tests drive the interpreter with.

use crate::token::{EOF, Token, TokenType};

/// Random-access stream of tokens.
///
/// Lookahead positions `k` are 1-based and relative to the cursor; `k = -1`
/// is the most recently consumed token. Marks follow the mark/seek/release
/// protocol: prediction marks the stream on entry and restores the cursor
/// on every exit path.
pub trait TokenStream {
    /// Token type `k` positions ahead (or behind, for negative `k`).
    /// Positions past the end report [`EOF`].
    fn la(&mut self, k: isize) -> TokenType;

    /// Token `k` positions ahead (or behind), if in range.
    fn lt(&mut self, k: isize) -> Option<&Token>;

    /// Cursor position: index of the token `la(1)` reads.
    fn index(&self) -> usize;

    /// Advance past the current token. Saturates at end of input.
    fn consume(&mut self);

    /// Mark the current position for later `seek`. The returned marker is
    /// passed to `release` when the caller is done rewinding.
    fn mark(&mut self) -> isize;

    /// Release a marker obtained from `mark`.
    fn release(&mut self, marker: isize);

    /// Move the cursor to an absolute token index.
    fn seek(&mut self, index: usize);

    /// Token at an absolute index. Panics if out of range.
    fn get(&self, index: usize) -> &Token;

    /// Total number of tokens, including the end-of-input token.
    fn size(&self) -> usize;
}

/// Token stream over a fully materialized token list.
///
/// The list is terminated with an end-of-input token; one is appended if
/// the input does not already end with it. Stream indices are rewritten to
/// match list positions.
#[derive(Clone, Debug)]
pub struct ListTokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl ListTokenStream {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| !t.is_eof()) {
            tokens.push(Token::eof());
        }
        for (i, t) in tokens.iter_mut().enumerate() {
            t.index = i;
        }
        Self { tokens, pos: 0 }
    }

    /// Build a stream from `(token_type, text)` pairs. Test convenience.
    pub fn from_types(types: &[(TokenType, &str)]) -> Self {
        Self::new(
            types
                .iter()
                .map(|&(tt, text)| Token::new(tt, text))
                .collect(),
        )
    }
}

impl TokenStream for ListTokenStream {
    fn la(&mut self, k: isize) -> TokenType {
        self.lt(k).map_or(EOF, |t| t.token_type)
    }

    fn lt(&mut self, k: isize) -> Option<&Token> {
        if k == 0 {
            return None;
        }
        let index = if k > 0 {
            self.pos.checked_add(k as usize - 1)?
        } else {
            self.pos.checked_sub((-k) as usize)?
        };
        // Clamp forward lookahead to the trailing EOF token.
        if k > 0 && index >= self.tokens.len() {
            return self.tokens.last();
        }
        self.tokens.get(index)
    }

    fn index(&self) -> usize {
        self.pos
    }

    fn consume(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn mark(&mut self) -> isize {
        // Fully buffered: nothing to pin, markers are free.
        0
    }

    fn release(&mut self, _marker: isize) {}

    fn seek(&mut self, index: usize) {
        self.pos = index.min(self.tokens.len() - 1);
    }

    fn get(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    fn size(&self) -> usize {
        self.tokens.len()
    }
}
