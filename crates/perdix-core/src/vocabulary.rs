//! Token-type to name resolution for diagnostics.

use crate::token::{EOF, TokenType};

/// Maps token types to literal, symbolic, and display names.
///
/// Display-name resolution order: display, then literal, then symbolic,
/// then the decimal rendering of the type itself.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    literal: Vec<Option<String>>,
    symbolic: Vec<Option<String>>,
    display: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(
        literal: Vec<Option<String>>,
        symbolic: Vec<Option<String>>,
        display: Vec<Option<String>>,
    ) -> Self {
        Self {
            literal,
            symbolic,
            display,
        }
    }

    /// Vocabulary with symbolic names only, indexed from token type 1.
    /// Convenient for hand-built grammars.
    pub fn from_symbolic(names: &[&str]) -> Self {
        let mut symbolic = vec![None];
        symbolic.extend(names.iter().map(|n| Some((*n).to_string())));
        Self {
            literal: Vec::new(),
            symbolic,
            display: Vec::new(),
        }
    }

    /// Largest token type this vocabulary knows a name for.
    pub fn max_token_type(&self) -> TokenType {
        self.literal
            .len()
            .max(self.symbolic.len())
            .max(self.display.len()) as TokenType
            - 1
    }

    pub fn literal_name(&self, t: TokenType) -> Option<&str> {
        lookup(&self.literal, t)
    }

    pub fn symbolic_name(&self, t: TokenType) -> Option<&str> {
        if t == EOF {
            return Some("EOF");
        }
        lookup(&self.symbolic, t)
    }

    pub fn display_name(&self, t: TokenType) -> String {
        if let Some(name) = lookup(&self.display, t) {
            return name.to_string();
        }
        if let Some(name) = self.literal_name(t) {
            return name.to_string();
        }
        if let Some(name) = self.symbolic_name(t) {
            return name.to_string();
        }
        t.to_string()
    }
}

fn lookup(names: &[Option<String>], t: TokenType) -> Option<&str> {
    if t < 0 {
        return None;
    }
    names.get(t as usize).and_then(|n| n.as_deref())
}
