use compact_str::{format_compact, CompactString};
use smallvec::SmallVec;
use tracing::trace;

use crate::config::FormatterConfig;
use crate::dialect::Dialect;
use crate::lexer::Tokenizer;
use crate::token::{Token, TokenType};

const LINE_SEPARATOR: &str = "\n";

/// Keywords that may open a join clause.
const JOIN_WORDS: &[&str] = &["LEFT", "RIGHT", "INNER", "OUTER", "JOIN"];

/// Two-word clause keywords merged into a single token before indenting.
const COMPOUND_KEYWORDS: &[(&str, &str)] = &[
    ("ORDER", "BY"),
    ("GROUP", "BY"),
    ("CONNECT", "BY"),
    ("START", "WITH"),
];

/// Symbols that never get spaces around them.
const EMBEDDED_SYMBOLS: &[&str] = &[":", "."];

/// An open bracket seen by the indent pass.
#[derive(Debug, Clone, Copy)]
struct BracketFrame {
    /// The bracket follows a function name; no breaks are inserted until it
    /// closes.
    function_call: bool,
    /// Indent level to restore at the matching `)`.
    saved_indent: i32,
}

/// Re-indents SQL text token by token.
///
/// The formatter has no SQL grammar. It lexes the input, rewrites keyword
/// case and whitespace, then walks the tokens once, inserting line breaks
/// around clause keywords, commas and brackets. Anything it does not
/// recognise passes through unchanged, so it never fails.
#[derive(Debug, Clone)]
pub struct TokenizedFormatter<'d> {
    config: FormatterConfig,
    dialect: &'d Dialect,
}

impl TokenizedFormatter<'static> {
    /// Formatter over the shared standard dialect.
    pub fn new(config: FormatterConfig) -> Self {
        Self::with_dialect(config, Dialect::shared())
    }
}

impl<'d> TokenizedFormatter<'d> {
    pub fn with_dialect(config: FormatterConfig, dialect: &'d Dialect) -> Self {
        Self { config, dialect }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn dialect(&self) -> &Dialect {
        self.dialect
    }

    /// Format `sql`. A trailing newline in the input is preserved.
    pub fn format(&self, sql: &str) -> String {
        let tokens = Tokenizer::new(self.dialect).tokenize(sql);
        let lexed = tokens.len();
        let tokens = self.rewrite(tokens);
        trace!(lexed, emitted = tokens.len(), "formatted token stream");

        let mut out = String::with_capacity(sql.len() + sql.len() / 2);
        for token in &tokens {
            out.push_str(&token.text);
        }
        // A trailing line comment already ends with the newline.
        if sql.ends_with('\n') && !out.ends_with('\n') {
            out.push_str(LINE_SEPARATOR);
        }
        out
    }

    fn rewrite(&self, tokens: Vec<Token>) -> Vec<Token> {
        let tokens = trim_edges(tokens);
        if tokens.is_empty() {
            return tokens;
        }
        let tokens = self.apply_keyword_case(tokens);
        let tokens = collapse_whitespace(tokens);
        let tokens = glue_compounds(tokens);
        let tokens = IndentPass::new(self, tokens).run();
        let tokens = compact_single_values(tokens);
        self.insert_spacing(tokens)
    }

    fn apply_keyword_case(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        let case = self.config.keyword_case();
        for token in tokens.iter_mut().filter(|t| t.token_type == TokenType::Keyword) {
            token.text = case.transform(&token.text);
        }
        tokens
    }

    fn is_delimiter(&self, text: &str) -> bool {
        text.eq_ignore_ascii_case(self.config.statement_delimiter())
    }

    /// Separator to put between two adjacent tokens in the final stream.
    fn gap_between(&self, prev: &Token, token: &Token) -> Option<&'static str> {
        if prev.is_space() || token.is_space() {
            return None;
        }
        if prev.token_type == TokenType::Comment {
            // A line comment whose newline was stripped must still end its line.
            if self.dialect.is_line_comment(&prev.text) && !prev.text.ends_with('\n') {
                return Some(LINE_SEPARATOR);
            }
            return None;
        }
        if token.text.starts_with('(') {
            return None;
        }
        if token.text == "," || self.is_delimiter(&token.text) {
            return None;
        }
        if token.token_type == TokenType::Value && prev.token_type == TokenType::Name {
            return None;
        }
        if is_embedded_symbol(token) || is_embedded_symbol(prev) {
            return None;
        }
        if token.token_type == TokenType::Symbol && prev.token_type == TokenType::Symbol {
            return None;
        }
        Some(" ")
    }

    fn insert_spacing(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut out: Vec<Token> = Vec::with_capacity(tokens.len() * 2);
        for token in tokens {
            if let Some(prev) = out.last() {
                if let Some(gap) = self.gap_between(prev, &token) {
                    out.push(Token::space(gap, token.spos));
                }
            }
            out.push(token);
        }
        out
    }
}

fn is_embedded_symbol(token: &Token) -> bool {
    token.token_type == TokenType::Symbol && EMBEDDED_SYMBOLS.contains(&token.text.as_str())
}

/// Drop leading and trailing whitespace.
fn trim_edges(mut tokens: Vec<Token>) -> Vec<Token> {
    if tokens.first().is_some_and(Token::is_space) {
        tokens.remove(0);
    }
    if tokens.last().is_some_and(Token::is_space) {
        tokens.pop();
    }
    tokens
}

/// Remove whitespace next to symbols and comments; shrink the rest to a
/// single space.
fn collapse_whitespace(tokens: Vec<Token>) -> Vec<Token> {
    let absorbs = |ty: Option<&TokenType>| {
        matches!(ty, Some(TokenType::Symbol) | Some(TokenType::Comment))
    };
    let types: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();

    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.into_iter().enumerate() {
        if !token.is_space() {
            out.push(token);
            continue;
        }
        let prev = i.checked_sub(1).and_then(|p| types.get(p));
        if absorbs(prev) || absorbs(types.get(i + 1)) {
            continue;
        }
        out.push(Token::space(" ", token.spos));
    }
    out
}

/// Merge multi-token constructs that the indent pass treats as one token:
/// compound clause keywords, the Oracle outer join marker `(+)` and
/// `<name>` template parameters.
fn glue_compounds(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        if let Some([t0, t1, t2]) = tokens.get(index..index + 3) {
            if let Some(glued) = glue(t0, t1, t2) {
                out.push(glued);
                index += 3;
                continue;
            }
        }
        out.push(tokens[index].clone());
        index += 1;
    }
    out
}

fn glue(t0: &Token, t1: &Token, t2: &Token) -> Option<Token> {
    if t0.token_type == TokenType::Keyword
        && t1.is_space()
        && t2.token_type == TokenType::Keyword
    {
        let first = t0.text.to_uppercase();
        let second = t2.text.to_uppercase();
        if COMPOUND_KEYWORDS
            .iter()
            .any(|(a, b)| *a == first && *b == second)
        {
            return Some(Token {
                text: format_compact!("{} {}", t0.text, t2.text),
                ..t0.clone()
            });
        }
    }
    if t0.is_symbol("(") && t1.is_symbol("+") && t2.is_symbol(")") {
        return Some(Token {
            text: CompactString::from("(+)"),
            ..t0.clone()
        });
    }
    if t0.is_symbol("<") && t1.token_type == TokenType::Name && t2.is_symbol(">") {
        return Some(Token {
            text: format_compact!("{}{}{}", t0.text, t1.text, t2.text),
            ..t0.clone()
        });
    }
    None
}

/// Collapse `(`, blank, X, blank, `)` into the single token `(X)` so short
/// bracketed values such as `VARCHAR(100)` stay on one line.
fn compact_single_values(mut tokens: Vec<Token>) -> Vec<Token> {
    let mut index = tokens.len();
    while index > 4 {
        index -= 1;
        if index >= tokens.len() {
            continue;
        }
        let window = &tokens[index - 4..=index];
        if window[0].is_symbol("(")
            && window[1].is_blank()
            && window[3].is_blank()
            && window[4].is_symbol(")")
        {
            let glued = format_compact!("({})", window[2].text);
            tokens[index - 4].text = glued;
            tokens.drain(index - 3..=index);
        }
    }
    tokens
}

/// The single forward walk that decides where lines break.
///
/// `break_at` inserts into the token list it is walking, so every caller
/// advances its cursor by the returned insertion count.
struct IndentPass<'f, 'd> {
    formatter: &'f TokenizedFormatter<'d>,
    tokens: Vec<Token>,
    brackets: SmallVec<[BracketFrame; 8]>,
    indent: i32,
    in_between: bool,
}

impl<'f, 'd> IndentPass<'f, 'd> {
    fn new(formatter: &'f TokenizedFormatter<'d>, tokens: Vec<Token>) -> Self {
        Self {
            formatter,
            tokens,
            brackets: SmallVec::new(),
            indent: 0,
            in_between: false,
        }
    }

    fn run(mut self) -> Vec<Token> {
        let mut prev = CompactString::from(" ");
        let mut index = 0;
        while index < self.tokens.len() {
            if self.follows_open_line_comment(index) {
                index += self.break_at(index, self.indent);
            }
            let token_type = self.tokens[index].token_type;
            let text = self.tokens[index].text.clone();
            let upper = text.to_uppercase();

            index = match token_type {
                TokenType::Symbol => self.on_symbol(index, &upper, &prev),
                TokenType::Keyword => self.on_keyword(index, &upper),
                TokenType::Comment => self.on_comment(index, &text),
                TokenType::Command => {
                    self.indent = 0;
                    let mut index = index;
                    if index > 0 {
                        index += self.break_at(index, 0);
                    }
                    index + self.break_at(index + 1, 0)
                }
                TokenType::Name
                    if index > 0 && self.tokens[index - 1].token_type == TokenType::Comment =>
                {
                    index + self.break_at(index, self.indent)
                }
                _ if self.formatter.is_delimiter(&upper) => {
                    self.indent = 0;
                    index + self.break_at(index + 1, 0)
                }
                _ => index,
            };

            prev = text;
            index += 1;
        }
        self.tokens
    }

    fn on_symbol(&mut self, mut index: usize, upper: &str, prev: &str) -> usize {
        if upper == "(" {
            self.brackets.push(BracketFrame {
                function_call: self.formatter.dialect.is_function(prev),
                saved_indent: self.indent,
            });
            self.indent += 1;
            index += self.break_at(index + 1, self.indent);
        } else if upper == ")" && !self.brackets.is_empty() {
            if let Some(frame) = self.brackets.last().copied() {
                self.indent = frame.saved_indent;
            }
            // Break before popping: a closing call bracket stays inline.
            index += self.break_at(index, self.indent);
            self.brackets.pop();
        } else if upper == "," {
            index += self.break_at(index + 1, self.indent);
        } else if self.formatter.is_delimiter(upper) {
            self.indent = 0;
            index += self.break_at(index, 0);
        }
        index
    }

    fn on_keyword(&mut self, mut index: usize, upper: &str) -> usize {
        match upper {
            "DELETE" | "SELECT" | "UPDATE" | "INSERT" | "INTO" | "CREATE" | "DROP"
            | "TRUNCATE" | "TABLE" | "CASE" => {
                self.indent += 1;
                index += self.break_at(index + 1, self.indent);
            }
            "FROM" | "WHERE" | "SET" | "START WITH" | "CONNECT BY" | "ORDER BY" | "GROUP BY"
            | "HAVING" => {
                index += self.break_at(index, self.indent - 1);
                index += self.break_at(index + 1, self.indent);
            }
            "LEFT" | "RIGHT" | "INNER" | "OUTER" | "JOIN" => {
                if self.is_join_start(index) {
                    index += self.break_at(index, self.indent - 1);
                }
            }
            "VALUES" | "END" => {
                self.indent -= 1;
                index += self.break_at(index, self.indent);
            }
            "OR" | "WHEN" | "ELSE" | "TOP" => {
                index += self.break_at(index, self.indent);
            }
            "ON" => {
                index += self.break_at(index + 1, self.indent);
            }
            "USING" => {
                index += self.break_at(index + 1, self.indent + 1);
            }
            "UNION" | "INTERSECT" | "EXCEPT" => {
                self.indent -= 2;
                index += self.break_at(index, self.indent);
                self.indent += 1;
            }
            "BETWEEN" => {
                self.in_between = true;
            }
            "AND" => {
                if !self.in_between {
                    index += self.break_at(index, self.indent);
                }
                self.in_between = false;
            }
            _ => {}
        }
        index
    }

    fn on_comment(&mut self, index: usize, text: &str) -> usize {
        let dialect = self.formatter.dialect;
        let (block_start, _) = dialect.multi_line_comment();
        if !dialect.is_line_comment(text) && text.starts_with(block_start) {
            return index + self.break_at(index + 1, self.indent);
        }
        index
    }

    /// Whether the token at `index` directly follows a line comment that lost
    /// its newline to an earlier break.
    fn follows_open_line_comment(&self, index: usize) -> bool {
        let Some(prev) = index.checked_sub(1).map(|p| &self.tokens[p]) else {
            return false;
        };
        let token = &self.tokens[index];
        prev.token_type == TokenType::Comment
            && self.formatter.dialect.is_line_comment(&prev.text)
            && !prev.text.ends_with('\n')
            && !token.is_space()
            && !self.formatter.is_delimiter(&token.text)
    }

    /// Whether the join word at `index` opens a join clause: the previous
    /// word is not a join word and the run of join words starting here
    /// reaches `JOIN`.
    fn is_join_start(&self, index: usize) -> bool {
        let is_join_word =
            |t: &Token| JOIN_WORDS.iter().any(|w| t.text.eq_ignore_ascii_case(w));

        if !is_join_word(&self.tokens[index]) {
            return false;
        }
        if let Some(prev) = self.tokens[..index].iter().rev().find(|t| !t.is_space()) {
            if is_join_word(prev) {
                return false;
            }
        }
        for token in self.tokens[index..].iter().filter(|t| !t.is_space()) {
            if token.text.eq_ignore_ascii_case("JOIN") {
                return true;
            }
            if !is_join_word(token) {
                return false;
            }
        }
        false
    }

    fn line_break(&self, indent: i32) -> CompactString {
        let mut line = CompactString::from(LINE_SEPARATOR);
        for _ in 0..indent.max(0) {
            line.push_str(self.formatter.config.indent_string());
        }
        line
    }

    /// Put a line break of depth `indent` immediately before the token at
    /// `at`, reusing adjacent whitespace where there is some. Returns the
    /// number of tokens inserted before the caller's cursor.
    fn break_at(&mut self, at: usize, indent: i32) -> usize {
        if self.brackets.iter().any(|f| f.function_call) || at >= self.tokens.len() {
            return 0;
        }

        let mut line = self.line_break(indent);
        let dialect = self.formatter.dialect;
        if at > 0 {
            let token = &mut self.tokens[at];
            if token.token_type == TokenType::Comment && dialect.is_line_comment(&token.text) {
                // Line comments stay at the end of the line they trail.
                line = CompactString::from(" ");
                token.text = CompactString::from(token.text.trim_end());
            }
        }

        let spos = self.tokens[at].spos;
        if self.tokens[at].is_space() {
            self.tokens[at].text = line;
            return 0;
        }

        if self.formatter.is_delimiter(&self.tokens[at].text) {
            if at + 1 < self.tokens.len() {
                let blank = format_compact!("{line}{line}");
                self.tokens.insert(at + 1, Token::space(&blank, spos));
            }
            return 1;
        }

        if at == 0 {
            return 0;
        }
        if self.tokens[at - 1].is_space() {
            self.tokens[at - 1].text = line;
            return 0;
        }
        self.tokens.insert(at, Token::space(&line, spos));
        1
    }
}
