//! CLI integration tests for the sqltidy binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const UNFORMATTED: &str = "select a, b from t where a = 1\n";
const FORMATTED: &str = "SELECT\n    a,\n    b\nFROM\n    t\nWHERE\n    a = 1\n";

/// Helper: get a Command for the sqltidy binary.
fn sqltidy() -> Command {
    let mut cmd = Command::cargo_bin("sqltidy").expect("binary should exist");
    cmd.env_remove("SQLTIDY_LOG");
    cmd
}

/// Helper: create a temp directory holding the given files.
fn setup_temp_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
    dir
}

// ─── Preformatted files (should be left unchanged) ───

#[test]
fn test_preformatted_file_unchanged() {
    let dir = setup_temp_dir(&[("query.sql", FORMATTED)]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 unchanged"));
}

#[test]
fn test_preformatted_check_mode_passes() {
    let dir = setup_temp_dir(&[("query.sql", FORMATTED)]);
    sqltidy().arg("--check").arg(dir.path()).assert().success();
}

// ─── Unformatted files ───

#[test]
fn test_unformatted_file_reformatted() {
    let dir = setup_temp_dir(&[("query.sql", UNFORMATTED)]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 reformatted"));
    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, FORMATTED);
}

#[test]
fn test_unformatted_check_mode_fails() {
    let dir = setup_temp_dir(&[("query.sql", UNFORMATTED)]);
    sqltidy().arg("--check").arg(dir.path()).assert().code(1);
    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, UNFORMATTED);
}

#[test]
fn test_unformatted_check_mode_verbose() {
    let dir = setup_temp_dir(&[("query.sql", UNFORMATTED)]);
    sqltidy()
        .arg("--check")
        .arg("--verbose")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("would reformat"));
}

#[test]
fn test_unformatted_diff_mode_shows_diff() {
    let dir = setup_temp_dir(&[("query.sql", UNFORMATTED)]);
    sqltidy()
        .arg("--diff")
        .arg("--no-color")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("-select a, b from t where a = 1"))
        .stderr(predicate::str::contains("+SELECT"));
}

// ─── Formatter options ───

#[test]
fn test_keyword_case_and_tabs() {
    sqltidy()
        .args(["--keyword-case", "lower", "--indent-type", "tab", "--indent-size", "1", "-"])
        .write_stdin("SELECT A FROM T\n")
        .assert()
        .success()
        .stdout("select\n\tA\nfrom\n\tT\n");
}

#[test]
fn test_invalid_keyword_case_rejected() {
    sqltidy()
        .args(["--keyword-case", "MIXED", "-"])
        .write_stdin("select 1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MIXED"));
}

#[test]
fn test_zero_indent_size_is_config_error() {
    sqltidy()
        .args(["--indent-size", "0", "-"])
        .write_stdin("select 1\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_custom_delimiter() {
    sqltidy()
        .args(["--delimiter", "GO", "-"])
        .write_stdin("select a from t go select b from u\n")
        .assert()
        .success()
        .stdout("SELECT\n    a\nFROM\n    t go\nSELECT\n    b\nFROM\n    u\n");
}

// ─── Stdin ───

#[test]
fn test_stdin_formats_sql() {
    sqltidy()
        .arg("-")
        .write_stdin("SELECT    1\n")
        .assert()
        .success()
        .stdout("SELECT\n    1\n");
}

#[test]
fn test_stdin_empty_input() {
    sqltidy().arg("-").write_stdin("\n").assert().success().stdout("\n");
}

#[test]
fn test_stdin_normalizes_trailing_newlines() {
    sqltidy()
        .arg("-")
        .write_stdin("select 1\n\n")
        .assert()
        .success()
        .stdout("SELECT\n    1\n");
}

// ─── Config files ───

#[test]
fn test_config_file_discovered() {
    let dir = setup_temp_dir(&[
        ("sqltidy.toml", "keyword_case = \"lower\"\nindent_size = 2\n"),
        ("query.sql", UNFORMATTED),
    ]);
    sqltidy().arg(dir.path()).assert().success();
    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, "select\n  a,\n  b\nfrom\n  t\nwhere\n  a = 1\n");
}

#[test]
fn test_properties_config_file() {
    let dir = setup_temp_dir(&[(
        "formatter.properties",
        "sql.formatter.keyword.case=ORIGINAL\nsql.formatter.indent.type=tab\n",
    )]);
    sqltidy()
        .arg("--config")
        .arg(dir.path().join("formatter.properties"))
        .arg("-")
        .write_stdin("Select a From t\n")
        .assert()
        .success()
        .stdout("Select\n\t\t\t\ta\nFrom\n\t\t\t\tt\n");
}

#[test]
fn test_cli_overrides_config_file() {
    let dir = setup_temp_dir(&[
        ("sqltidy.toml", "keyword_case = \"lower\"\n"),
        ("query.sql", UNFORMATTED),
    ]);
    sqltidy()
        .args(["--keyword-case", "upper"])
        .arg(dir.path())
        .assert()
        .success();
    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, FORMATTED);
}

#[test]
fn test_unknown_config_key_is_error() {
    let dir = setup_temp_dir(&[
        ("sqltidy.toml", "line_length = 100\n"),
        ("query.sql", UNFORMATTED),
    ]);
    sqltidy().arg(dir.path()).assert().code(2);
}

// ─── Errors ───

#[test]
fn test_error_file_exits_with_code_2() {
    let dir = setup_temp_dir(&[]);
    fs::write(dir.path().join("bad.sql"), b"\xff\xfe\x00S").unwrap();
    sqltidy()
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bad.sql"));
}

// ─── File discovery ───

#[test]
fn test_multiple_files_mixed_status() {
    let dir = setup_temp_dir(&[
        ("good.sql", FORMATTED),
        ("bad.sql", UNFORMATTED),
        ("schema.ddl", "create table t (a int)\n"),
    ]);
    sqltidy()
        .arg("--check")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("3 file(s) processed, 2 reformatted, 1 unchanged"));
}

#[test]
fn test_ignores_non_sql_and_hidden_files() {
    let dir = setup_temp_dir(&[
        ("notes.txt", UNFORMATTED),
        (".cache/query.sql", UNFORMATTED),
        ("models/query.sql", FORMATTED),
    ]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 file(s) processed"));
    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), UNFORMATTED);
}

#[test]
fn test_exclude_pattern() {
    let dir = setup_temp_dir(&[
        ("keep.sql", UNFORMATTED),
        ("vendor/skip.sql", UNFORMATTED),
    ]);
    sqltidy()
        .args(["--exclude", "**/vendor/**"])
        .arg(dir.path())
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("keep.sql")).unwrap(), FORMATTED);
    assert_eq!(fs::read_to_string(dir.path().join("vendor/skip.sql")).unwrap(), UNFORMATTED);
}

#[test]
fn test_single_process_matches_parallel() {
    let files: Vec<(String, &str)> = (0..6).map(|i| (format!("q{i}.sql"), UNFORMATTED)).collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
    let dir = setup_temp_dir(&refs);
    sqltidy()
        .arg("--single-process")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("6 reformatted"));
    for (name, _) in &files {
        assert_eq!(fs::read_to_string(dir.path().join(name)).unwrap(), FORMATTED);
    }
}

#[test]
fn test_quiet_mode_suppresses_output() {
    let dir = setup_temp_dir(&[("query.sql", UNFORMATTED)]);
    sqltidy()
        .arg("--quiet")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
