use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqltidy::config::{FormatterConfig, IndentType, KeywordCase};
use sqltidy::mode::Mode;
use sqltidy::report::{FileStatus, Report};

/// sqltidy - a token-based SQL re-indenter.
/// Breaks lines at clause keywords, indents by bracket depth and sets keyword case.
#[derive(Parser, Debug)]
#[command(name = "sqltidy", version, about)]
struct Cli {
    /// Files, directories or glob patterns to format. Use "-" to read from stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Keyword case: UPPER, LOWER or ORIGINAL.
    #[arg(long)]
    keyword_case: Option<KeywordCase>,

    /// Indent with spaces or tabs.
    #[arg(long)]
    indent_type: Option<IndentType>,

    /// Indent characters per level.
    #[arg(long)]
    indent_size: Option<usize>,

    /// Statement delimiter.
    #[arg(long)]
    delimiter: Option<String>,

    /// Check formatting without writing changes.
    #[arg(long)]
    check: bool,

    /// Show formatting diff.
    #[arg(long)]
    diff: bool,

    /// Skip safety equivalence check (faster).
    #[arg(long)]
    fast: bool,

    /// Glob patterns to exclude.
    #[arg(long)]
    exclude: Vec<String>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only).
    #[arg(short, long)]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progressbar: bool,

    /// Force color output.
    #[arg(long)]
    force_color: bool,

    /// Disable color output.
    #[arg(long)]
    no_color: bool,

    /// Number of threads for parallel processing (0 = all cores).
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,

    /// Disable multi-threaded processing.
    #[arg(long)]
    single_process: bool,

    /// Path to config file (sqltidy.toml, pyproject.toml or a .properties file).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let is_stdin = cli.files.len() == 1 && cli.files[0].to_string_lossy() == "-";

    let mode = match build_mode(&cli) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if is_stdin {
        let mut source = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut source) {
            eprintln!("Error reading stdin: {}", e);
            return ExitCode::from(2);
        }

        return match sqltidy::format_string(&source, &mode) {
            Ok(formatted) => {
                print!("{}", formatted);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        };
    }

    let report = match sqltidy::run(&cli.files, &mode) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if mode.diff {
        if let Err(e) = report.print_diffs(mode.color()) {
            eprintln!("Error writing diff: {}", e);
        }
    }

    if !mode.quiet {
        print_verbose_results(&report, &mode);
        eprintln!("{}", report.summary());
    }

    report.print_errors();

    if report.has_errors() {
        ExitCode::from(2)
    } else if (mode.check || mode.diff) && report.has_changes() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Logging goes to stderr. `SQLTIDY_LOG` takes an env-filter directive;
/// without it only warnings are shown, or info with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("SQLTIDY_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Merge the loaded config file with command line overrides.
fn build_mode(cli: &Cli) -> anyhow::Result<Mode> {
    let base = sqltidy::load_config(&cli.files, cli.config.as_deref())
        .context("failed to load configuration")?;

    let formatter = FormatterConfig::new(
        cli.keyword_case.unwrap_or(base.formatter.keyword_case()),
        cli.indent_type.unwrap_or(base.formatter.indent_type()),
        cli.indent_size.unwrap_or(base.formatter.indent_size()),
        cli.delimiter
            .as_deref()
            .unwrap_or(base.formatter.statement_delimiter()),
    )
    .context("invalid formatter options")?;

    Ok(Mode {
        formatter,
        check: cli.check,
        diff: cli.diff,
        fast: cli.fast,
        exclude: if cli.exclude.is_empty() {
            base.exclude
        } else {
            cli.exclude.clone()
        },
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_progressbar: cli.no_progressbar,
        no_color: cli.no_color,
        force_color: cli.force_color,
        threads: cli.threads,
        single_process: cli.single_process,
    })
}

fn print_verbose_results(report: &Report, mode: &Mode) {
    if !mode.verbose {
        return;
    }
    for result in &report.results {
        match result.status {
            FileStatus::Changed if mode.check || mode.diff => {
                eprintln!("would reformat {}", result.path.display());
            }
            FileStatus::Changed => {
                eprintln!("reformatted {}", result.path.display());
            }
            FileStatus::Error => {
                eprintln!(
                    "error: {}: {}",
                    result.path.display(),
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            FileStatus::Unchanged => {}
        }
    }
}
