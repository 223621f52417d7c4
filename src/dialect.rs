use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// How the dialect classifies a known word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordType {
    Keyword,
    Function,
    Type,
}

/// SQL:2003 reserved words, plus the handful of statement keywords the
/// re-indenter keys on that the standard leaves unreserved.
static RESERVED_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "ALL", "ALLOCATE", "ALTER", "AND", "ANY", "ARE", "ARRAY", "AS", "ASENSITIVE",
    "ASYMMETRIC", "AT", "ATOMIC", "AUTHORIZATION", "BEGIN", "BETWEEN", "BOTH", "BY",
    "CALL", "CALLED", "CARDINALITY", "CASCADED", "CASE", "CHECK", "CLOSE", "COLLATE",
    "COLUMN", "COMMIT", "CONDITION", "CONNECT", "CONSTRAINT", "CORRESPONDING",
    "CREATE", "CROSS", "CUBE", "CURRENT", "CURSOR", "CYCLE", "DAY", "DEALLOCATE",
    "DECLARE", "DEFAULT", "DELETE", "DEREF", "DESCRIBE", "DETERMINISTIC",
    "DISCONNECT", "DISTINCT", "DROP", "DYNAMIC", "EACH", "ELEMENT", "ELSE", "END",
    "END-EXEC", "ESCAPE", "EVERY", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "EXTERNAL",
    "FALSE", "FETCH", "FILTER", "FOR", "FOREIGN", "FREE", "FROM", "FULL", "FUNCTION",
    "FUSION", "GET", "GLOBAL", "GRANT", "GROUP", "GROUPING", "HAVING", "HOLD", "HOUR",
    "IDENTITY", "IF", "IN", "INDICATOR", "INNER", "INOUT", "INSENSITIVE", "INSERT",
    "INTERSECT", "INTERSECTION", "INTERVAL", "INTO", "IS", "JOIN", "LANGUAGE", "LARGE",
    "LATERAL", "LEADING", "LEFT", "LIKE", "LOCAL", "MATCH", "MEMBER", "MERGE", "METHOD",
    "MINUTE", "MODIFIES", "MODULE", "MONTH", "MULTISET", "NATIONAL", "NATURAL", "NEW",
    "NO", "NONE", "NORMALIZE", "NOT", "NULL", "OF", "OLD", "ON", "ONLY", "OPEN", "OR",
    "ORDER", "OUT", "OUTER", "OVER", "OVERLAPS", "OVERLAY", "PARAMETER", "PARTITION",
    "PRECISION", "PREPARE", "PRIMARY", "PROCEDURE", "RANGE", "READS", "RECURSIVE",
    "REF", "REFERENCES", "REFERENCING", "RELEASE", "RETURN", "RETURNS", "REVOKE",
    "RIGHT", "ROLLBACK", "ROLLUP", "ROW", "ROWS", "SAVEPOINT", "SCOPE", "SCROLL",
    "SEARCH", "SECOND", "SELECT", "SENSITIVE", "SESSION_USER", "SET", "SIMILAR",
    "SOME", "SPECIFIC", "SQL", "SQLEXCEPTION", "SQLSTATE", "SQLWARNING", "START",
    "STATIC", "SUBMULTISET", "SYMMETRIC", "SYSTEM", "SYSTEM_USER", "TABLE",
    "TABLESAMPLE", "THEN", "TIMEZONE_HOUR", "TIMEZONE_MINUTE", "TO", "TRAILING",
    "TRANSLATION", "TREAT", "TRIGGER", "TRUE", "UESCAPE", "UNION", "UNIQUE",
    "UNKNOWN", "UNNEST", "UPDATE", "USER", "USING", "VALUE", "VALUES", "VARYING",
    "WHEN", "WHENEVER", "WHERE", "WINDOW", "WITH", "WITHIN", "WITHOUT", "YEAR",
};

/// Widely used non-standard keywords.
static EXTRA_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "ADD", "ASC", "CASCADE", "CHANGE", "COMMENT", "DATABASE", "DESC", "EXPLAIN",
    "IGNORE", "INDEX", "KEY", "LIMIT", "MODIFY", "NULLS", "OFFSET", "RENAME",
    "RESTRICT", "SCHEMA", "SEQUENCE", "SHOW", "TOP", "TRUNCATE", "USE", "VIEW",
};

/// SQL:2003 scalar, aggregate and window functions plus common extensions.
/// Some of these are also keywords; the keyword classification wins.
static FUNCTIONS: phf::Set<&'static str> = phf::phf_set! {
    "ABS", "AVG", "BIT_LENGTH", "CAST", "CEIL", "CEILING", "CHAR_LENGTH",
    "CHARACTER_LENGTH", "COALESCE", "CONCAT", "CONVERT", "CORR", "COUNT",
    "COVAR_POP", "COVAR_SAMP", "CUME_DIST", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DENSE_RANK", "EXP", "EXTRACT", "FLOOR", "LEFT", "LENGTH",
    "LN", "LOCALTIME", "LOCALTIMESTAMP", "LOWER", "MAX", "MIN", "MOD", "NULLIF",
    "OCTET_LENGTH", "PERCENT_RANK", "PERCENTILE_CONT", "PERCENTILE_DISC", "POSITION",
    "POWER", "RANK", "REGR_AVGX", "REGR_AVGY", "REGR_COUNT", "REGR_INTERCEPT",
    "REGR_R2", "REGR_SLOPE", "REGR_SXX", "REGR_SXY", "REGR_SYY", "REPLACE", "RIGHT",
    "ROUND", "ROW_NUMBER", "SQRT", "STDDEV_POP", "STDDEV_SAMP", "SUBSTRING", "SUM",
    "TRANSLATE", "TRIM", "UPPER", "VAR_POP", "VAR_SAMP", "WIDTH_BUCKET", "YEAR",
};

/// Default column/parameter type names.
static TYPES: phf::Set<&'static str> = phf::phf_set! {
    "BIGINT", "BINARY", "BIT", "BLOB", "BOOL", "BOOLEAN", "CHAR", "CHARACTER", "CLOB",
    "DATE", "DATETIME", "DECIMAL", "DOUBLE", "FLOAT", "INT", "INTEGER", "INTERVAL",
    "NCHAR", "NCLOB", "NUMBER", "NUMERIC", "NVARCHAR", "REAL", "SMALLINT", "TIME",
    "TIMESTAMP", "TINYINT", "VARBINARY", "VARCHAR", "VARCHAR2", "XML",
};

const DEFAULT_LINE_COMMENTS: &[&str] = &["--"];
const DEFAULT_QUOTE_PAIRS: &[(char, char)] = &[('"', '"')];
const STRUCT_SEPARATOR: char = '.';

/// The word tables and lexical conventions the lexer and formatter consult.
///
/// A dialect is an ordinary value: build it once, then share it by reference
/// between any number of formatting calls. [`Dialect::shared`] holds the
/// standard dialect for callers that do not need their own.
#[derive(Debug, Clone)]
pub struct Dialect {
    /// Upper-cased word -> classification.
    keywords: HashMap<String, KeywordType>,
    single_line_comments: Vec<String>,
    multi_line_comment: (String, String),
    quote_pairs: Vec<(char, char)>,
    struct_separator: char,
    catalog_separator: String,
    script_delimiter: String,
    commands: HashSet<String>,
}

impl Dialect {
    /// The standard dialect: SQL:2003 keywords, functions and default types,
    /// `--` line comments, `/* */` block comments and `"` identifier quotes.
    pub fn standard() -> Self {
        let mut dialect = Self {
            keywords: HashMap::new(),
            single_line_comments: DEFAULT_LINE_COMMENTS.iter().map(|s| s.to_string()).collect(),
            multi_line_comment: ("/*".to_string(), "*/".to_string()),
            quote_pairs: DEFAULT_QUOTE_PAIRS.to_vec(),
            struct_separator: STRUCT_SEPARATOR,
            catalog_separator: STRUCT_SEPARATOR.to_string(),
            script_delimiter: ";".to_string(),
            commands: HashSet::new(),
        };
        dialect.add_keywords(RESERVED_KEYWORDS.iter().copied(), KeywordType::Keyword);
        dialect.add_keywords(EXTRA_KEYWORDS.iter().copied(), KeywordType::Keyword);
        dialect.add_keywords(TYPES.iter().copied(), KeywordType::Type);
        dialect.add_keywords(FUNCTIONS.iter().copied(), KeywordType::Function);
        dialect
    }

    /// The process-wide standard dialect, built on first use.
    pub fn shared() -> &'static Dialect {
        static SHARED: OnceLock<Dialect> = OnceLock::new();
        SHARED.get_or_init(Dialect::standard)
    }

    /// Register words under `kind`. A word already classified as a keyword
    /// keeps that classification.
    pub fn add_keywords<'a, I>(&mut self, words: I, kind: KeywordType)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for word in words {
            let word = word.to_uppercase();
            if self.keywords.get(&word) != Some(&KeywordType::Keyword) {
                self.keywords.insert(word, kind);
            }
        }
    }

    /// Register a command word. A word lexed with this (case-insensitive)
    /// spelling swallows the rest of its line into a single command token.
    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.insert(command.to_uppercase());
        self
    }

    /// Case-insensitive classification lookup.
    pub fn keyword_type(&self, word: &str) -> Option<KeywordType> {
        self.keywords.get(&word.to_uppercase()).copied()
    }

    pub fn is_function(&self, word: &str) -> bool {
        self.keyword_type(word) == Some(KeywordType::Function)
    }

    pub fn is_command(&self, word: &str) -> bool {
        !self.commands.is_empty() && self.commands.contains(&word.to_uppercase())
    }

    pub fn single_line_comments(&self) -> &[String] {
        &self.single_line_comments
    }

    /// Whether `text` starts with one of the single-line comment markers.
    pub fn is_line_comment(&self, text: &str) -> bool {
        self.single_line_comments
            .iter()
            .any(|marker| !marker.is_empty() && text.starts_with(marker.as_str()))
    }

    /// Block comment start and end markers.
    pub fn multi_line_comment(&self) -> (&str, &str) {
        (&self.multi_line_comment.0, &self.multi_line_comment.1)
    }

    /// Identifier quote pairs, `(open, close)`.
    pub fn quote_pairs(&self) -> &[(char, char)] {
        &self.quote_pairs
    }

    /// Closing quote for a quote character. Characters that do not open a
    /// configured pair close themselves.
    pub fn closing_quote(&self, open: char) -> char {
        self.quote_pairs
            .iter()
            .find(|(o, _)| *o == open)
            .map(|(_, c)| *c)
            .unwrap_or(open)
    }

    pub fn is_quote_char(&self, c: char) -> bool {
        self.quote_pairs.iter().any(|(o, _)| *o == c)
    }

    pub fn struct_separator(&self) -> char {
        self.struct_separator
    }

    pub fn catalog_separator(&self) -> &str {
        &self.catalog_separator
    }

    /// Default statement delimiter.
    pub fn script_delimiter(&self) -> &str {
        &self.script_delimiter
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::standard()
    }
}
