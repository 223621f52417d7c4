use std::io::Write;
use std::path::{Path, PathBuf};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Status of formatting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// File was already formatted correctly.
    Unchanged,
    /// File was reformatted (or would be, in check mode).
    Changed,
    /// An error occurred while processing the file.
    Error,
}

/// Result of formatting a single file.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub error: Option<String>,
    /// Unified diff of the change, filled in diff mode.
    pub diff: Option<String>,
}

impl FileResult {
    pub fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            error: None,
            diff: None,
        }
    }

    pub fn error(path: &Path, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(path, FileStatus::Error)
        }
    }
}

/// Aggregated report of formatting results.
#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn unchanged(&self) -> usize {
        self.count(FileStatus::Unchanged)
    }

    pub fn changed(&self) -> usize {
        self.count(FileStatus::Changed)
    }

    pub fn errors(&self) -> usize {
        self.count(FileStatus::Error)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    pub fn has_changes(&self) -> bool {
        self.changed() > 0
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("{} file(s) processed", self.total()));
        if self.changed() > 0 {
            parts.push(format!("{} reformatted", self.changed()));
        }
        if self.unchanged() > 0 {
            parts.push(format!("{} unchanged", self.unchanged()));
        }
        if self.errors() > 0 {
            parts.push(format!("{} error(s)", self.errors()));
        }
        parts.join(", ")
    }

    /// Print error details.
    pub fn print_errors(&self) {
        for result in &self.results {
            if let Some(ref error) = result.error {
                eprintln!("error: {}: {}", result.path.display(), error);
            }
        }
    }

    /// Print collected diffs to stderr, colored by line kind.
    pub fn print_diffs(&self, color: bool) -> std::io::Result<()> {
        let choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        let mut stderr = StandardStream::stderr(choice);
        for diff in self.results.iter().filter_map(|r| r.diff.as_deref()) {
            write_diff(&mut stderr, diff)?;
        }
        stderr.reset()
    }
}

fn write_diff(out: &mut impl WriteColor, diff: &str) -> std::io::Result<()> {
    for line in diff.split_inclusive('\n') {
        let color = if line.starts_with("---") || line.starts_with("+++") {
            Some(Color::Cyan)
        } else if line.starts_with('-') {
            Some(Color::Red)
        } else if line.starts_with('+') {
            Some(Color::Green)
        } else {
            None
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        write!(out, "{}", line)?;
    }
    out.reset()?;
    if !diff.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}
