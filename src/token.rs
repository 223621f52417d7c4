use compact_str::CompactString;

/// Position in source string (byte offset).
pub type Pos = usize;

/// All token types produced by the lexer.
///
/// End of input is signalled by the lexer returning `None`, so there is no
/// sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Space,
    Keyword,
    Name,
    Value,
    Symbol,
    Comment,
    Command,
    Unknown,
}

/// A token in the formatting pipeline.
///
/// Unlike most lexer output the text is mutable: case transforms, whitespace
/// normalization and token gluing all rewrite it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub text: CompactString,
    pub spos: Pos,
}

impl Token {
    pub fn new(token_type: TokenType, text: &str, spos: Pos) -> Self {
        Self {
            token_type,
            text: CompactString::from(text),
            spos,
        }
    }

    /// A whitespace token synthesized by the formatter. It has no source
    /// position of its own; `spos` is that of the token it was placed next to.
    pub fn space(text: &str, spos: Pos) -> Self {
        Self::new(TokenType::Space, text, spos)
    }

    pub fn is_space(&self) -> bool {
        self.token_type == TokenType::Space
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.token_type == TokenType::Symbol && self.text == symbol
    }

    /// Whether the text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
