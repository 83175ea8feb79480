use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use ls_report::{FailurePolicy, InputSource, ReportConfig, ReportPipeline};

/// Exit code when the batch finished but some rows could not be rendered.
const PARTIAL_FAILURE_EXIT_CODE: i32 = 5;

/// Generates one learning style report PDF per row of a `*LS.xlsx` survey spreadsheet.
///
/// Fonts are looked up in `--fonts-dir`, then `LS_REPORT_FONTS_DIR`, then `assets/fonts`.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory scanned for the `*LS.xlsx` spreadsheet.
    #[arg(long, value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Spreadsheet to read instead of scanning `--dir`.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory the reports are written to.
    #[arg(long, value_name = "DIR", default_value = ls_report::config::DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Directory holding the respondent photos (default: `<prefix>_附件`).
    #[arg(long, value_name = "DIR")]
    attachments: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    fonts_dir: Option<PathBuf>,

    /// Only process the first N records.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Keep rendering the remaining rows when one fails.
    #[arg(long)]
    keep_going: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }

    fn into_config(self) -> ReportConfig {
        let input = match self.input {
            Some(file) => InputSource::File(file),
            None => InputSource::Discover(self.dir),
        };
        let policy = if self.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::FailFast
        };
        ReportConfig::new()
            .with_input(input)
            .with_output_dir(self.output)
            .with_attachments_dir(self.attachments)
            .with_fonts_dir(self.fonts_dir)
            .with_row_limit(self.limit)
            .with_failure_policy(policy)
    }
}

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let pipeline = ReportPipeline::new(cli.into_config());
    match pipeline.run() {
        Ok(summary) if summary.is_success() => {}
        Ok(summary) => {
            eprintln!("error: {} rows failed", summary.failures.len());
            for failure in &summary.failures {
                eprintln!("  {}: {}", failure.label, failure.message);
            }
            std::process::exit(PARTIAL_FAILURE_EXIT_CODE);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            print_error_sources(&err);
            std::process::exit(err.exit_code());
        }
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
