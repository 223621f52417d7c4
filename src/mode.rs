use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::FormatterConfig;
use crate::error::SqltidyError;

/// Mode holds the formatter settings plus how a run treats files.
#[derive(Debug, Clone, Default)]
pub struct Mode {
    pub formatter: FormatterConfig,

    /// Report files that would change without writing them.
    pub check: bool,

    /// Like `check`, and also render a unified diff per changed file.
    pub diff: bool,

    /// Skip the safety equivalence check.
    pub fast: bool,

    /// Glob patterns to exclude.
    pub exclude: Vec<String>,

    pub verbose: bool,
    pub quiet: bool,
    pub no_progressbar: bool,
    pub no_color: bool,
    pub force_color: bool,

    /// Worker threads for multi-file runs (0 = all cores).
    pub threads: usize,

    pub single_process: bool,
}

impl Mode {
    /// Whether color output is enabled.
    pub fn color(&self) -> bool {
        if self.force_color {
            return true;
        }
        if self.no_color {
            return false;
        }
        std::env::var_os("NO_COLOR").is_none()
    }

    /// Whether safety check should be performed.
    pub fn should_safety_check(&self) -> bool {
        !self.fast && !self.check && !self.diff
    }

    /// SQL file extensions to process.
    pub fn sql_extensions(&self) -> &[&str] {
        &["sql", "ddl", "dml"]
    }

    /// Compile the exclude patterns.
    pub fn exclude_set(&self) -> Result<GlobSet, SqltidyError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode() {
        let mode = Mode::default();
        assert_eq!(mode.formatter, FormatterConfig::default());
        assert!(!mode.check);
        assert!(!mode.diff);
        assert!(!mode.fast);
        assert_eq!(mode.threads, 0);
    }

    #[test]
    fn test_color_logic() {
        let mut mode = Mode::default();
        mode.no_color = true;
        assert!(!mode.color());

        mode.force_color = true;
        assert!(mode.color()); // force_color overrides no_color
    }

    #[test]
    fn test_safety_check() {
        let mut mode = Mode::default();
        assert!(mode.should_safety_check());

        mode.fast = true;
        assert!(!mode.should_safety_check());

        let mut mode = Mode::default();
        mode.diff = true;
        assert!(!mode.should_safety_check());
    }

    #[test]
    fn test_exclude_set() {
        let mut mode = Mode::default();
        mode.exclude = vec!["**/migrations/**".to_string(), "*.gen.sql".to_string()];
        let set = mode.exclude_set().unwrap();
        assert!(set.is_match("db/migrations/001.sql"));
        assert!(set.is_match("schema.gen.sql"));
        assert!(!set.is_match("queries/report.sql"));

        mode.exclude = vec!["[unclosed".to_string()];
        assert!(matches!(mode.exclude_set(), Err(SqltidyError::Pattern(_))));
    }
}
