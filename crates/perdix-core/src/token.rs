//! Token model and reserved token-type constants.

/// Token types are signed so the reserved sentinels stay out of the
/// non-negative user range.
pub type TokenType = i32;

/// End-of-input sentinel.
pub const EOF: TokenType = -1;
/// Label of non-consuming transitions; also marks end-of-rule reachability
/// in lookahead sets.
pub const EPSILON: TokenType = -2;
/// Type of tokens that carry no valid type (error placeholders).
pub const INVALID_TYPE: TokenType = 0;
/// First token type available to grammars.
pub const MIN_USER_TOKEN_TYPE: TokenType = 1;

/// Default channel tokens are emitted on.
pub const DEFAULT_CHANNEL: u32 = 0;

/// A lexed token.
///
/// `index` is the position in the owning stream; error strategies create
/// synthetic tokens with the index of the token they stand in for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub text: String,
    pub index: usize,
    pub line: u32,
    pub column: u32,
    pub channel: u32,
}

impl Token {
    /// Create a token on the default channel. Stream index is assigned
    /// when the token is handed to a stream.
    pub fn new(token_type: TokenType, text: impl Into<String>) -> Self {
        Self {
            token_type,
            text: text.into(),
            index: 0,
            line: 0,
            column: 0,
            channel: DEFAULT_CHANNEL,
        }
    }

    /// Create the end-of-input token.
    pub fn eof() -> Self {
        Self::new(EOF, "<EOF>")
    }

    /// Whether this is the end-of-input token.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }
}
