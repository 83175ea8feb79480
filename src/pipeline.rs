//! Batch driver: one spreadsheet in, one PDF per row out.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::builder::render_pdf;
use crate::chart::ChartGenerator;
use crate::config::{FailurePolicy, ReportConfig};
use crate::error::{RenderError, ReportError, Result};
use crate::fonts::FontSet;
use crate::loader;
use crate::record::RespondentRecord;
use crate::template::build_report;

/// A row that failed while the batch kept going.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFailure {
    /// 1-based spreadsheet row, `0` when unknown.
    pub row_number: usize,
    pub label: String,
    pub message: String,
}

/// What a finished run produced.
#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<RowFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a row needs that is set up once per run.
struct RunContext {
    fonts: FontSet,
    chart: ChartGenerator,
    attachments_dir: PathBuf,
}

/// Runs a [`ReportConfig`] to completion.
#[derive(Debug)]
pub struct ReportPipeline {
    config: ReportConfig,
}

impl ReportPipeline {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Loads the spreadsheet and writes one report per row.
    ///
    /// The input file and the fonts are resolved before the output directory is created, so a
    /// run that cannot start leaves nothing behind.
    pub fn run(&self) -> Result<BatchSummary> {
        self.config.validate()?;
        let input = self.config.resolve_input()?;
        let rows = loader::load_rows(&input, self.config.row_limit())?;

        let fonts = FontSet::load(self.config.fonts_dir())
            .map_err(|err| ReportError::configuration(format!("cannot load fonts: {err}")))?;
        loader::ensure_output_dir(self.config.output_dir())?;

        let context = RunContext {
            chart: ChartGenerator::new(*self.config.chart(), fonts.body_regular_bytes())?,
            attachments_dir: self.config.attachments_dir_for(&input),
            fonts,
        };
        debug!("Photos are looked up in {}", context.attachments_dir.display());

        let mut summary = BatchSummary::default();
        for row in rows {
            match row {
                Ok(record) => match self.render_row(&context, &record) {
                    Ok(path) => summary.written.push(path),
                    Err(err) => {
                        self.record_failure(&mut summary, record.row_number(), record.describe(), err)?
                    }
                },
                Err(err) => {
                    let row_number = match &err {
                        ReportError::DataFormat(data) => data.row().unwrap_or(0),
                        _ => 0,
                    };
                    self.record_failure(&mut summary, row_number, format!("row {row_number}"), err)?
                }
            }
        }

        info!(
            "Wrote {} reports to {}, {} rows failed",
            summary.written.len(),
            self.config.output_dir().display(),
            summary.failures.len()
        );
        for failure in &summary.failures {
            info!("Failed {}: {}", failure.label, failure.message);
        }
        Ok(summary)
    }

    /// Fail-fast hands `err` back; continue mode records it if it only concerns one row.
    fn record_failure(
        &self,
        summary: &mut BatchSummary,
        row_number: usize,
        label: String,
        err: ReportError,
    ) -> Result<()> {
        if self.config.failure_policy() == FailurePolicy::FailFast || !err.is_row_scoped() {
            return Err(err);
        }
        let message = error_chain(&err);
        warn!("Skipping {label}: {message}");
        summary.failures.push(RowFailure {
            row_number,
            label,
            message,
        });
        Ok(())
    }

    fn render_row(&self, context: &RunContext, record: &RespondentRecord) -> Result<PathBuf> {
        let chart = context.chart.render(record.magnitudes())?;

        let photo = match record.find_photo(&context.attachments_dir) {
            Some(path) => match fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!("Cannot read photo {}: {err}", path.display());
                    None
                }
            },
            None => {
                debug!("No photo for {}", record.describe());
                None
            }
        };

        let document = build_report(record, chart, photo);
        let bytes = render_pdf(&document, &context.fonts, self.config.layout())?;

        let path = output_path(self.config.output_dir(), record)?;
        fs::write(&path, bytes).map_err(|source| RenderError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Report path for `record` inside `output_dir`, rejecting names that would leave it.
fn output_path(output_dir: &Path, record: &RespondentRecord) -> Result<PathBuf> {
    let file_name = record.report_file_name();
    if file_name.contains(['/', '\\', '\0']) {
        return Err(RenderError::InvalidFileName(file_name).into());
    }
    Ok(output_dir.join(file_name))
}

fn error_chain(err: &ReportError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DimensionScores, PoleMagnitudes};

    fn record(name: &str) -> RespondentRecord {
        RespondentRecord::new(
            "3",
            "282412244",
            name,
            DimensionScores::default(),
            PoleMagnitudes::default(),
        )
    }

    #[test]
    fn output_path_follows_naming_convention() {
        let path = output_path(Path::new("报告"), &record("张三")).expect("path");
        assert_eq!(path, Path::new("报告").join("序号3_282412244张三.pdf"));
    }

    #[test]
    fn names_with_separators_are_rejected() {
        for name in ["a/b", "a\\b", "a\0b"] {
            let err = output_path(Path::new("out"), &record(name)).unwrap_err();
            assert!(matches!(
                err,
                ReportError::Render(RenderError::InvalidFileName(_))
            ));
            assert!(err.is_row_scoped());
        }
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = ReportError::from(RenderError::Write {
            path: PathBuf::from("报告/x.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(error_chain(&err), "failed to write 报告/x.pdf: denied");
    }

    #[test]
    fn summary_without_failures_is_success() {
        let mut summary = BatchSummary::default();
        assert!(summary.is_success());
        summary.failures.push(RowFailure {
            row_number: 4,
            label: "row 4".into(),
            message: "bad".into(),
        });
        assert!(!summary.is_success());
    }
}
