use memchr::{memchr, memmem};

use crate::dialect::Dialect;
use crate::token::{Token, TokenType};

/// Symbol pairs lexed as a single token.
const TWO_CHARACTER_SYMBOLS: &[[char; 2]] = &[
    ['<', '>'],
    ['<', '='],
    ['>', '='],
    ['|', '|'],
    ['(', ')'],
    ['!', '='],
    [':', '='],
    ['.', '*'],
];

fn is_space(c: char) -> bool {
    c.is_whitespace()
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Punctuation that never forms part of a word.
pub fn is_symbol(c: char) -> bool {
    matches!(
        c,
        '"' | '?'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | '|'
            | '*'
            | '+'
            | ','
            | '-'
            | '.'
            | '/'
            | ':'
            | ';'
            | '<'
            | '='
            | '>'
            | '!'
            | '~'
            | '`'
            | '['
            | ']'
    )
}

/// Anything that is not whitespace, a digit or a symbol starts a word.
fn is_letter(c: char) -> bool {
    !is_space(c) && !is_digit(c) && !is_symbol(c)
}

/// Splits SQL text into classified tokens.
///
/// Tokenizing never fails. Every byte of the input ends up in exactly one
/// token, so concatenating the token texts gives back the input. Unterminated
/// quoted values and block comments run to the end of input.
pub struct Tokenizer<'d> {
    dialect: &'d Dialect,
    line_comment_starts: Vec<char>,
}

impl<'d> Tokenizer<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        let line_comment_starts = dialect
            .single_line_comments()
            .iter()
            .filter_map(|marker| marker.chars().next())
            .collect();
        Self {
            dialect,
            line_comment_starts,
        }
    }

    pub fn tokenize(&self, sql: &str) -> Vec<Token> {
        Scanner {
            src: sql,
            pos: 0,
            dialect: self.dialect,
            line_comment_starts: &self.line_comment_starts,
        }
        .collect()
    }
}

/// Cursor over one input. Yields tokens until the input is exhausted.
struct Scanner<'a, 'd> {
    src: &'a str,
    pos: usize,
    dialect: &'d Dialect,
    line_comment_starts: &'a [char],
}

impl Scanner<'_, '_> {
    fn current(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.current() {
            if !pred(c) {
                break;
            }
            self.bump(c);
        }
    }

    fn token(&self, token_type: TokenType, start: usize) -> Token {
        Token::new(token_type, &self.src[start..self.pos], start)
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let c = self.current()?;

        let token = if is_space(c) {
            self.eat_while(is_space);
            self.token(TokenType::Space, start)
        } else if c == ';' {
            self.bump(c);
            self.token(TokenType::Symbol, start)
        } else if is_digit(c) {
            self.eat_while(|c| is_digit(c) || c == '.' || c == 'e' || c == 'E');
            self.token(TokenType::Value, start)
        } else if self.line_comment_starts.contains(&c) {
            self.line_comment(start, c)
        } else if is_letter(c) {
            self.word(start)
        } else if c == '/' {
            self.slash(start)
        } else if c == '\'' || self.dialect.is_quote_char(c) {
            self.quoted(start, c)
        } else if is_symbol(c) {
            self.symbol(start, c)
        } else {
            self.bump(c);
            self.token(TokenType::Unknown, start)
        };
        Some(token)
    }

    /// A line comment runs through its newline. A character that only looks
    /// like a comment start is a one-character symbol.
    fn line_comment(&mut self, start: usize, c: char) -> Token {
        let rest = self.rest();
        let is_comment = self
            .dialect
            .single_line_comments()
            .iter()
            .any(|marker| !marker.is_empty() && rest.starts_with(marker.as_str()));
        if !is_comment {
            self.bump(c);
            return self.token(TokenType::Symbol, start);
        }
        let len = match memchr(b'\n', rest.as_bytes()) {
            Some(nl) => nl + 1,
            None => rest.len(),
        };
        self.pos += len;
        self.token(TokenType::Comment, start)
    }

    fn word(&mut self, start: usize) -> Token {
        let dialect = self.dialect;
        let struct_separator = dialect.struct_separator();
        let catalog_separator = dialect.catalog_separator();
        self.eat_while(|c| {
            is_letter(c)
                || is_digit(c)
                || c == '*'
                || c == struct_separator
                || catalog_separator.contains(c)
        });

        let word = &self.src[start..self.pos];
        if dialect.is_command(word) {
            let rest = self.rest();
            let len = rest.find(['\n', '\r']).unwrap_or(rest.len());
            self.pos += len;
            return self.token(TokenType::Command, start);
        }
        if dialect.keyword_type(word).is_some() {
            self.token(TokenType::Keyword, start)
        } else {
            self.token(TokenType::Name, start)
        }
    }

    fn slash(&mut self, start: usize) -> Token {
        self.bump('/');
        if self.current() != Some('*') {
            return self.token(TokenType::Symbol, start);
        }
        self.bump('*');
        let (_, end_marker) = self.dialect.multi_line_comment();
        let rest = self.rest();
        let len = match memmem::find(rest.as_bytes(), end_marker.as_bytes()) {
            Some(at) => at + end_marker.len(),
            None => rest.len(),
        };
        self.pos += len;
        self.token(TokenType::Comment, start)
    }

    /// A quoted value, including its quotes. A doubled closing quote is an
    /// escaped quote inside the value.
    fn quoted(&mut self, start: usize, open: char) -> Token {
        let close = self.dialect.closing_quote(open);
        self.bump(open);
        while let Some(c) = self.current() {
            self.bump(c);
            if c == close {
                if self.current() == Some(close) {
                    self.bump(close);
                    continue;
                }
                break;
            }
        }
        self.token(TokenType::Value, start)
    }

    fn symbol(&mut self, start: usize, c: char) -> Token {
        self.bump(c);
        if let Some(next) = self.current() {
            if TWO_CHARACTER_SYMBOLS.contains(&[c, next]) {
                self.bump(next);
            }
        }
        self.token(TokenType::Symbol, start)
    }
}

impl Iterator for Scanner<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
