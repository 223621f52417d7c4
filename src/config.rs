use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use compact_str::CompactString;
use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::SqltidyError;
use crate::mode::Mode;

pub const KEYWORD_CASE_PROPERTY: &str = "sql.formatter.keyword.case";
pub const STATEMENT_DELIMITER_PROPERTY: &str = "sql.formatter.statement.delimiter";
pub const INDENT_TYPE_PROPERTY: &str = "sql.formatter.indent.type";
pub const INDENT_SIZE_PROPERTY: &str = "sql.formatter.indent.size";

const PROPERTY_PREFIX: &str = "sql.formatter.";
const CONFIG_FILE_NAME: &str = "sqltidy.toml";

/// Case applied to every keyword token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordCase {
    #[default]
    Upper,
    Lower,
    Original,
}

impl KeywordCase {
    pub fn transform(self, word: &str) -> CompactString {
        match self {
            KeywordCase::Upper => CompactString::from(word.to_uppercase()),
            KeywordCase::Lower => CompactString::from(word.to_lowercase()),
            KeywordCase::Original => CompactString::from(word),
        }
    }
}

impl FromStr for KeywordCase {
    type Err = SqltidyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPPER" => Ok(KeywordCase::Upper),
            "LOWER" => Ok(KeywordCase::Lower),
            "ORIGINAL" => Ok(KeywordCase::Original),
            _ => Err(SqltidyError::InvalidValue {
                option: "keyword case",
                value: s.to_string(),
                expected: "one of UPPER, LOWER, ORIGINAL",
            }),
        }
    }
}

/// Character one indent level is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentType {
    #[default]
    Space,
    Tab,
}

impl IndentType {
    fn indent_char(self) -> char {
        match self {
            IndentType::Space => ' ',
            IndentType::Tab => '\t',
        }
    }
}

impl FromStr for IndentType {
    type Err = SqltidyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "space" => Ok(IndentType::Space),
            "tab" => Ok(IndentType::Tab),
            _ => Err(SqltidyError::InvalidValue {
                option: "indent type",
                value: s.to_string(),
                expected: "one of space, tab",
            }),
        }
    }
}

fn parse_indent_size(s: &str) -> Result<usize, SqltidyError> {
    match s.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(SqltidyError::InvalidValue {
            option: "indent size",
            value: s.to_string(),
            expected: "a positive integer",
        }),
    }
}

/// Settings consumed by the formatter. Immutable once built; every
/// constructor validates its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    keyword_case: KeywordCase,
    indent_type: IndentType,
    indent_size: usize,
    statement_delimiter: String,
    indent_string: String,
}

impl FormatterConfig {
    pub fn new(
        keyword_case: KeywordCase,
        indent_type: IndentType,
        indent_size: usize,
        statement_delimiter: &str,
    ) -> Result<Self, SqltidyError> {
        if indent_size == 0 {
            return Err(SqltidyError::InvalidValue {
                option: "indent size",
                value: indent_size.to_string(),
                expected: "a positive integer",
            });
        }
        if statement_delimiter.trim().is_empty() {
            return Err(SqltidyError::InvalidValue {
                option: "statement delimiter",
                value: statement_delimiter.to_string(),
                expected: "a non-empty string",
            });
        }
        let indent_string = std::iter::repeat(indent_type.indent_char())
            .take(indent_size)
            .collect();
        Ok(Self {
            keyword_case,
            indent_type,
            indent_size,
            statement_delimiter: statement_delimiter.trim().to_string(),
            indent_string,
        })
    }

    /// Build from a `sql.formatter.*` property bag. Missing keys take their
    /// defaults; keys outside the `sql.formatter.` namespace are ignored.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, SqltidyError> {
        let known = [
            KEYWORD_CASE_PROPERTY,
            STATEMENT_DELIMITER_PROPERTY,
            INDENT_TYPE_PROPERTY,
            INDENT_SIZE_PROPERTY,
        ];
        if let Some(unknown) = properties
            .keys()
            .find(|k| k.starts_with(PROPERTY_PREFIX) && !known.contains(&k.as_str()))
        {
            return Err(SqltidyError::Config(format!(
                "Unknown formatter property: {}",
                unknown
            )));
        }

        let keyword_case = match properties.get(KEYWORD_CASE_PROPERTY) {
            Some(value) => value.parse()?,
            None => KeywordCase::default(),
        };
        let indent_type = match properties.get(INDENT_TYPE_PROPERTY) {
            Some(value) => value.parse()?,
            None => IndentType::default(),
        };
        let indent_size = match properties.get(INDENT_SIZE_PROPERTY) {
            Some(value) => parse_indent_size(value)?,
            None => 4,
        };
        let delimiter = properties
            .get(STATEMENT_DELIMITER_PROPERTY)
            .map(String::as_str)
            .unwrap_or_else(|| Dialect::shared().script_delimiter());
        Self::new(keyword_case, indent_type, indent_size, delimiter)
    }

    /// Build from one or more `.properties` files; later files override
    /// earlier ones.
    pub fn from_properties_files(paths: &[PathBuf]) -> Result<Self, SqltidyError> {
        let mut properties = HashMap::new();
        for path in paths {
            let content = std::fs::read_to_string(path)?;
            properties.extend(parse_properties(&content));
        }
        Self::from_properties(&properties)
    }

    pub fn keyword_case(&self) -> KeywordCase {
        self.keyword_case
    }

    pub fn indent_type(&self) -> IndentType {
        self.indent_type
    }

    pub fn indent_size(&self) -> usize {
        self.indent_size
    }

    pub fn statement_delimiter(&self) -> &str {
        &self.statement_delimiter
    }

    /// One indent level, pre-rendered.
    pub fn indent_string(&self) -> &str {
        &self.indent_string
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            keyword_case: KeywordCase::Upper,
            indent_type: IndentType::Space,
            indent_size: 4,
            statement_delimiter: ";".to_string(),
            indent_string: "    ".to_string(),
        }
    }
}

/// Parse Java `.properties` text: `key=value`, `key: value` or `key value`
/// lines, `#`/`!` comments, and trailing-backslash continuation lines.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    let mut logical = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        let trailing_backslashes = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing_backslashes % 2 == 1 {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);
        let (key, value) = split_property(&logical);
        properties.insert(key, value);
        logical.clear();
    }
    if !logical.is_empty() {
        let (key, value) = split_property(&logical);
        properties.insert(key, value);
    }
    properties
}

fn split_property(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    key.push(unescape(escaped));
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if matches!(chars.peek(), Some('=') | Some(':')) {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape(escaped));
            }
        } else {
            value.push(c);
        }
    }
    (key, value)
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\x0c',
        other => other,
    }
}

/// The `sqltidy.toml` / `[tool.sqltidy]` schema.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    keyword_case: Option<String>,
    indent_type: Option<String>,
    indent_size: Option<usize>,
    statement_delimiter: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl FileConfig {
    fn apply(self, mode: &mut Mode) -> Result<(), SqltidyError> {
        let base = &mode.formatter;
        let keyword_case = match &self.keyword_case {
            Some(value) => value.parse()?,
            None => base.keyword_case(),
        };
        let indent_type = match &self.indent_type {
            Some(value) => value.parse()?,
            None => base.indent_type(),
        };
        let indent_size = self.indent_size.unwrap_or(base.indent_size());
        let delimiter = self
            .statement_delimiter
            .as_deref()
            .unwrap_or(base.statement_delimiter());
        mode.formatter = FormatterConfig::new(keyword_case, indent_type, indent_size, delimiter)?;
        if !self.exclude.is_empty() {
            mode.exclude = self.exclude;
        }
        Ok(())
    }
}

/// Load sqltidy configuration.
///
/// An explicit `config_path` may be a `.properties` file (the
/// `sql.formatter.*` keys) or a TOML file. Without one, the parent
/// directories of `files` are searched for `sqltidy.toml` or a
/// `pyproject.toml` with a `[tool.sqltidy]` table, then the user config
/// directory.
pub fn load_config(files: &[PathBuf], config_path: Option<&Path>) -> Result<Mode, SqltidyError> {
    let mut mode = Mode::default();

    let config_file = match config_path {
        Some(path) => {
            if path.exists() {
                Some(path.to_path_buf())
            } else {
                return Err(SqltidyError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        None => find_config_file(files),
    };

    if let Some(path) = config_file {
        tracing::debug!(path = %path.display(), "loading config");
        if is_properties_file(&path) {
            mode.formatter = FormatterConfig::from_properties_files(&[path])?;
        } else {
            load_config_from_path(&path)?.apply(&mut mode)?;
        }
    }

    Ok(mode)
}

fn is_properties_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "properties")
}

/// Search the common parents of the inputs, then the user config directory.
fn find_config_file(files: &[PathBuf]) -> Option<PathBuf> {
    for parent in get_common_parents(files) {
        let config = parent.join(CONFIG_FILE_NAME);
        if config.exists() {
            return Some(config);
        }
        let pyproject = parent.join("pyproject.toml");
        if pyproject.exists() && has_sqltidy_section(&pyproject) {
            return Some(pyproject);
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join("sqltidy").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn has_sqltidy_section(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .is_some_and(|table| {
            table
                .get("tool")
                .and_then(|tool| tool.get("sqltidy"))
                .is_some()
        })
}

/// Get the common parent directories of the given file paths, ordered
/// from most specific to least specific.
fn get_common_parents(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut parents = Vec::new();

    for file in files {
        let parent = if file.is_dir() {
            file.clone()
        } else {
            file.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        };

        // Walk up to root
        let mut current = Some(parent.as_path());
        while let Some(dir) = current {
            let dir_buf = dir.to_path_buf();
            if !parents.contains(&dir_buf) {
                parents.push(dir_buf);
            }
            current = dir.parent();
        }
    }

    parents
}

/// Load and parse a TOML config file. `pyproject.toml` keeps its settings
/// under `[tool.sqltidy]`; any other file holds them at the top level.
fn load_config_from_path(path: &Path) -> Result<FileConfig, SqltidyError> {
    let content = std::fs::read_to_string(path)?;
    let is_pyproject = path
        .file_name()
        .map(|n| n == "pyproject.toml")
        .unwrap_or(false);

    if !is_pyproject {
        return Ok(toml::from_str(&content)?);
    }

    let mut parsed: toml::Table = toml::from_str(&content)?;
    let section = parsed
        .remove("tool")
        .and_then(|tool| match tool {
            toml::Value::Table(mut tool) => tool.remove("sqltidy"),
            _ => None,
        });
    match section {
        Some(section) => Ok(section.try_into()?),
        None => Ok(FileConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = FormatterConfig::default();
        assert_eq!(config.keyword_case(), KeywordCase::Upper);
        assert_eq!(config.indent_type(), IndentType::Space);
        assert_eq!(config.indent_size(), 4);
        assert_eq!(config.statement_delimiter(), ";");
        assert_eq!(config.indent_string(), "    ");
        assert_eq!(config, FormatterConfig::from_properties(&HashMap::new()).unwrap());
    }

    #[test]
    fn test_keyword_case_transform() {
        assert_eq!(KeywordCase::Upper.transform("select"), "SELECT");
        assert_eq!(KeywordCase::Lower.transform("SeLeCt"), "select");
        assert_eq!(KeywordCase::Original.transform("SeLeCt"), "SeLeCt");
    }

    #[test]
    fn test_keyword_case_parse() {
        assert_eq!("UPPER".parse::<KeywordCase>().unwrap(), KeywordCase::Upper);
        assert_eq!("lower".parse::<KeywordCase>().unwrap(), KeywordCase::Lower);
        assert_eq!("Original".parse::<KeywordCase>().unwrap(), KeywordCase::Original);
        let err = "MIXED".parse::<KeywordCase>().unwrap_err();
        assert!(err.to_string().contains("MIXED"));
        assert!(err.to_string().contains("UPPER, LOWER, ORIGINAL"));
    }

    #[test]
    fn test_from_properties() {
        let config = FormatterConfig::from_properties(&props(&[
            (KEYWORD_CASE_PROPERTY, "LOWER"),
            (STATEMENT_DELIMITER_PROPERTY, "GO"),
            (INDENT_TYPE_PROPERTY, "tab"),
            (INDENT_SIZE_PROPERTY, "2"),
        ]))
        .unwrap();
        assert_eq!(config.keyword_case(), KeywordCase::Lower);
        assert_eq!(config.statement_delimiter(), "GO");
        assert_eq!(config.indent_type(), IndentType::Tab);
        assert_eq!(config.indent_string(), "\t\t");
    }

    #[test]
    fn test_from_properties_rejects_bad_values() {
        for (key, value) in [
            (KEYWORD_CASE_PROPERTY, "MIXED"),
            (INDENT_TYPE_PROPERTY, "tabs"),
            (INDENT_SIZE_PROPERTY, "0"),
            (INDENT_SIZE_PROPERTY, "four"),
            (STATEMENT_DELIMITER_PROPERTY, " "),
        ] {
            let result = FormatterConfig::from_properties(&props(&[(key, value)]));
            assert!(result.is_err(), "{key}={value:?} should be rejected");
        }
    }

    #[test]
    fn test_from_properties_unknown_keys() {
        assert!(FormatterConfig::from_properties(&props(&[("sql.formatter.line.width", "80")])).is_err());
        // Foreign keys in a shared property bag are fine.
        assert!(FormatterConfig::from_properties(&props(&[("java.version", "17")])).is_ok());
    }

    #[test]
    fn test_parse_properties() {
        let text = "# comment\n! also a comment\n\nsql.formatter.keyword.case=LOWER\nsql.formatter.indent.type : tab\nsql.formatter.indent.size 2\nlong.value = one \\\n    two\nescaped\\=key=a\\tb\n";
        let properties = parse_properties(text);
        assert_eq!(properties.get(KEYWORD_CASE_PROPERTY).unwrap(), "LOWER");
        assert_eq!(properties.get(INDENT_TYPE_PROPERTY).unwrap(), "tab");
        assert_eq!(properties.get(INDENT_SIZE_PROPERTY).unwrap(), "2");
        assert_eq!(properties.get("long.value").unwrap(), "one two");
        assert_eq!(properties.get("escaped=key").unwrap(), "a\tb");
        assert_eq!(properties.len(), 5);
    }

    #[test]
    fn test_properties_files_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.properties");
        let second = dir.path().join("b.properties");
        std::fs::write(&first, "sql.formatter.keyword.case=LOWER\nsql.formatter.indent.size=2\n").unwrap();
        std::fs::write(&second, "sql.formatter.keyword.case=ORIGINAL\n").unwrap();
        let config = FormatterConfig::from_properties_files(&[first, second]).unwrap();
        assert_eq!(config.keyword_case(), KeywordCase::Original);
        assert_eq!(config.indent_size(), 2);
    }

    #[test]
    fn test_file_config_apply() {
        let mut mode = Mode::default();
        let file: FileConfig = toml::from_str(
            "keyword_case = \"lower\"\nindent_size = 2\nexclude = [\"target/**\"]\n",
        )
        .unwrap();
        file.apply(&mut mode).unwrap();
        assert_eq!(mode.formatter.keyword_case(), KeywordCase::Lower);
        assert_eq!(mode.formatter.indent_string(), "  ");
        assert_eq!(mode.formatter.statement_delimiter(), ";");
        assert_eq!(mode.exclude, vec!["target/**".to_string()]);
    }

    #[test]
    fn test_unknown_config_key_error() {
        let result: Result<FileConfig, _> = toml::from_str("line_length = 120\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_sqltidy_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "indent_type = \"tab\"\nindent_size = 1\n").unwrap();
        let sql = dir.path().join("q.sql");
        std::fs::write(&sql, "select 1\n").unwrap();
        let mode = load_config(&[sql], None).unwrap();
        assert_eq!(mode.formatter.indent_string(), "\t");
    }

    #[test]
    fn test_load_config_from_pyproject() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "[project]\nname = \"x\"\n\n[tool.sqltidy]\nkeyword_case = \"LOWER\"\n").unwrap();
        let mode = load_config(&[], Some(&path)).unwrap();
        assert_eq!(mode.formatter.keyword_case(), KeywordCase::Lower);
    }

    #[test]
    fn test_load_config_from_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbeaver.properties");
        std::fs::write(&path, "sql.formatter.keyword.case=ORIGINAL\n").unwrap();
        let mode = load_config(&[], Some(&path)).unwrap();
        assert_eq!(mode.formatter.keyword_case(), KeywordCase::Original);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let result = load_config(&[], Some(Path::new("/nonexistent/sqltidy.toml")));
        assert!(matches!(result, Err(SqltidyError::Config(_))));
    }
}
