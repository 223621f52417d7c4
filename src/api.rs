use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::SqltidyError;
use crate::formatter::TokenizedFormatter;
use crate::mode::Mode;
use crate::report::{FileResult, FileStatus, Report};

/// Format a SQL string according to the given mode.
/// This is the core API function.
pub fn format_string(source: &str, mode: &Mode) -> Result<String, SqltidyError> {
    let formatter = TokenizedFormatter::new(mode.formatter.clone());
    let result = formatter.format(source);

    if mode.should_safety_check() {
        safety_check(source, &result)?;
    }

    Ok(result)
}

/// Run the formatter on a collection of files and directories.
pub fn run(files: &[PathBuf], mode: &Mode) -> Result<Report, SqltidyError> {
    let matching_paths = get_matching_paths(files, mode)?;
    info!(files = matching_paths.len(), "formatting");
    let progress = progress_bar(matching_paths.len(), mode);

    let results = if mode.single_process || matching_paths.len() <= 1 {
        format_sequentially(&matching_paths, mode, &progress)
    } else {
        match build_runtime(mode) {
            Ok(runtime) => runtime.block_on(format_concurrently(matching_paths, mode, &progress)),
            Err(e) => {
                warn!(error = %e, "could not start worker pool, formatting sequentially");
                format_sequentially(&matching_paths, mode, &progress)
            }
        }
    };
    progress.finish_and_clear();

    let mut report = Report::new();
    for result in results {
        report.add(result);
    }
    Ok(report)
}

fn progress_bar(len: usize, mode: &Mode) -> ProgressBar {
    if mode.no_progressbar || mode.quiet || len < 2 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}") {
        bar.set_style(style);
    }
    bar
}

fn build_runtime(mode: &Mode) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if mode.threads > 0 {
        builder.worker_threads(mode.threads);
    }
    builder.enable_all().build()
}

fn format_sequentially(paths: &[PathBuf], mode: &Mode, progress: &ProgressBar) -> Vec<FileResult> {
    paths
        .iter()
        .map(|path| {
            let result = format_file(path, mode);
            progress.inc(1);
            result
        })
        .collect()
}

/// One task per file; results are collected in path order.
async fn format_concurrently(
    paths: Vec<PathBuf>,
    mode: &Mode,
    progress: &ProgressBar,
) -> Vec<FileResult> {
    let mode = Arc::new(mode.clone());
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let mode = Arc::clone(&mode);
            let handle = tokio::spawn(format_file_async(path.clone(), mode));
            (path, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => FileResult::error(&path, format!("formatting task failed: {}", e)),
        };
        progress.inc(1);
        results.push(result);
    }
    results
}

/// What remains to be done for a file once its source is formatted.
enum Plan {
    Done(FileResult),
    Write(String),
}

fn plan(path: &Path, source: &str, mode: &Mode) -> Plan {
    let formatted = match format_string(source, mode) {
        Ok(f) => f,
        Err(e) => return Plan::Done(FileResult::error(path, e.to_string())),
    };

    if source == formatted {
        debug!(path = %path.display(), "unchanged");
        return Plan::Done(FileResult::new(path, FileStatus::Unchanged));
    }

    if mode.check || mode.diff {
        let mut result = FileResult::new(path, FileStatus::Changed);
        if mode.diff {
            result.diff = Some(unified_diff(path, source, &formatted));
        }
        return Plan::Done(result);
    }

    Plan::Write(formatted)
}

/// Format a single file.
fn format_file(path: &Path, mode: &Mode) -> FileResult {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return FileResult::error(path, format!("Read error: {}", e)),
    };

    match plan(path, &source, mode) {
        Plan::Done(result) => result,
        Plan::Write(formatted) => match std::fs::write(path, formatted) {
            Ok(()) => {
                debug!(path = %path.display(), "reformatted");
                FileResult::new(path, FileStatus::Changed)
            }
            Err(e) => FileResult::error(path, format!("Write error: {}", e)),
        },
    }
}

async fn format_file_async(path: PathBuf, mode: Arc<Mode>) -> FileResult {
    let source = match tokio::fs::read_to_string(&path).await {
        Ok(s) => s,
        Err(e) => return FileResult::error(&path, format!("Read error: {}", e)),
    };

    match plan(&path, &source, &mode) {
        Plan::Done(result) => result,
        Plan::Write(formatted) => match tokio::fs::write(&path, formatted).await {
            Ok(()) => {
                debug!(path = %path.display(), "reformatted");
                FileResult::new(&path, FileStatus::Changed)
            }
            Err(e) => FileResult::error(&path, format!("Write error: {}", e)),
        },
    }
}

/// Get all SQL file paths that match the given inputs. Inputs may be
/// files, directories (searched recursively) or glob patterns.
pub fn get_matching_paths(paths: &[PathBuf], mode: &Mode) -> Result<Vec<PathBuf>, SqltidyError> {
    let extensions = mode.sql_extensions();
    let exclude = mode.exclude_set()?;
    let mut result = HashSet::new();

    for path in paths {
        if path.is_file() {
            if is_sql_file(path, extensions) {
                result.insert(path.clone());
            }
        } else if path.is_dir() {
            collect_sql_files(path, extensions, &exclude, &mut result);
        } else if let Some(pattern) = path.to_str().filter(|p| is_glob(p)) {
            let entries = glob::glob(pattern).map_err(|e| {
                SqltidyError::Config(format!("Invalid path pattern {}: {}", pattern, e))
            })?;
            for entry in entries.flatten() {
                if entry.is_file() && is_sql_file(&entry, extensions) && !is_excluded(&entry, &exclude) {
                    result.insert(entry);
                }
            }
        } else {
            warn!(path = %path.display(), "no such file or directory");
        }
    }

    let mut sorted: Vec<PathBuf> = result.into_iter().collect();
    sorted.sort();
    Ok(sorted)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Check if a file has a SQL extension.
fn is_sql_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// Exclude patterns match either the full path or the bare file name.
fn is_excluded(path: &Path, exclude: &GlobSet) -> bool {
    exclude.is_match(path) || path.file_name().is_some_and(|name| exclude.is_match(name))
}

/// Recursively collect SQL files from a directory.
fn collect_sql_files(
    dir: &Path,
    extensions: &[&str],
    exclude: &GlobSet,
    result: &mut HashSet<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));

        // Skip hidden entries and excluded patterns
        if hidden || is_excluded(&path, exclude) {
            continue;
        }

        if path.is_dir() {
            collect_sql_files(&path, extensions, exclude, result);
        } else if is_sql_file(&path, extensions) {
            result.insert(path);
        }
    }
}

/// Verify formatting only changed whitespace and letter case: the
/// non-whitespace characters of both texts, lower-cased, must match.
fn safety_check(original: &str, formatted: &str) -> Result<(), SqltidyError> {
    fn significant(text: &str) -> impl Iterator<Item = char> + '_ {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
    }

    let mut before = significant(original);
    let mut after = significant(formatted);
    let mut position = 0usize;
    loop {
        match (before.next(), after.next()) {
            (None, None) => return Ok(()),
            (a, b) if a == b => position += 1,
            (a, b) => {
                return Err(SqltidyError::Equivalence(format!(
                    "Text mismatch at significant character {}: original {:?}, formatted {:?}",
                    position, a, b
                )))
            }
        }
    }
}

/// Render a unified diff between original and formatted content.
fn unified_diff(path: &Path, original: &str, formatted: &str) -> String {
    use similar::{ChangeTag, TextDiff};

    let mut out = format!("--- {}\n+++ {}\n", path.display(), path.display());
    let diff = TextDiff::from_lines(original, formatted);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}
