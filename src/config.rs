//! Run configuration for a report batch.

use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::loader;

/// Default name of the directory receiving the reports.
pub const DEFAULT_OUTPUT_DIR: &str = "报告";

/// Where the survey spreadsheet comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Scan a directory for `*LS.xlsx`.
    Discover(PathBuf),
    /// Use the given file as is.
    File(PathBuf),
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::Discover(PathBuf::from("."))
    }
}

/// What to do when a single row fails to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the batch on the first failing row.
    #[default]
    FailFast,
    /// Log the failure, keep going, and report it in the batch summary.
    Continue,
}

/// Page margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for PageMargins {
    /// 2.54 cm on every side. On A4 this leaves 159.2 mm of printable width, enough for the
    /// 6 in chart at full size. The reference table is wider and is scaled down to fit.
    fn default() -> Self {
        Self {
            top: 25.4,
            right: 25.4,
            bottom: 25.4,
            left: 25.4,
        }
    }
}

/// Page geometry and base typography.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Paper width and height in millimetres.
    pub paper_size_mm: (f64, f64),
    pub margins: PageMargins,
    /// Body text size in points.
    pub font_size: u8,
    pub line_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            paper_size_mm: (210.0, 297.0),
            margins: PageMargins::default(),
            font_size: 11,
            line_spacing: 1.25,
        }
    }
}

impl LayoutOptions {
    /// Width available to content between the left and right margins.
    pub fn printable_width_mm(&self) -> f64 {
        self.paper_size_mm.0 - self.margins.left - self.margins.right
    }
}

/// Raster settings of the dimension chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartOptions {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width_in: 7.0,
            height_in: 3.5,
            dpi: 150,
        }
    }
}

impl ChartOptions {
    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }
}

/// Everything a batch run needs, built with chained `with_*` calls.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    input: InputSource,
    output_dir: PathBuf,
    attachments_dir: Option<PathBuf>,
    fonts_dir: Option<PathBuf>,
    row_limit: Option<usize>,
    failure_policy: FailurePolicy,
    layout: LayoutOptions,
    chart: ChartOptions,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: InputSource::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            attachments_dir: None,
            fonts_dir: None,
            row_limit: None,
            failure_policy: FailurePolicy::default(),
            layout: LayoutOptions::default(),
            chart: ChartOptions::default(),
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: InputSource) -> Self {
        self.input = input;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Overrides the `<prefix>_附件` photo directory.
    pub fn with_attachments_dir(mut self, dir: impl Into<Option<PathBuf>>) -> Self {
        self.attachments_dir = dir.into();
        self
    }

    pub fn with_fonts_dir(mut self, dir: impl Into<Option<PathBuf>>) -> Self {
        self.fonts_dir = dir.into();
        self
    }

    pub fn with_row_limit(mut self, limit: impl Into<Option<usize>>) -> Self {
        self.row_limit = limit.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_chart(mut self, chart: ChartOptions) -> Self {
        self.chart = chart;
        self
    }

    pub fn input(&self) -> &InputSource {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref()
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.row_limit
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn chart(&self) -> &ChartOptions {
        &self.chart
    }

    /// Turns the input source into a concrete, existing spreadsheet path.
    pub fn resolve_input(&self) -> Result<PathBuf> {
        match &self.input {
            InputSource::Discover(dir) => loader::discover_input(dir),
            InputSource::File(path) if path.is_file() => Ok(path.clone()),
            InputSource::File(path) => Err(ReportError::configuration(format!(
                "input file not found: {}",
                path.display()
            ))),
        }
    }

    /// The configured photo directory, or the one derived from `input`.
    pub fn attachments_dir_for(&self, input: &Path) -> PathBuf {
        self.attachments_dir
            .clone()
            .unwrap_or_else(|| loader::default_attachments_dir(input))
    }

    /// Checks option combinations that cannot work before anything touches the disk.
    pub fn validate(&self) -> Result<()> {
        if self.row_limit == Some(0) {
            return Err(ReportError::configuration("row limit must be at least 1"));
        }
        if self.chart.dpi == 0 || self.chart.width_in <= 0.0 || self.chart.height_in <= 0.0 {
            return Err(ReportError::configuration(
                "chart size and resolution must be positive",
            ));
        }
        if self.layout.printable_width_mm() <= 0.0 {
            return Err(ReportError::configuration(
                "page margins leave no printable width",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_conventions() {
        let config = ReportConfig::new();
        assert_eq!(config.input(), &InputSource::Discover(PathBuf::from(".")));
        assert_eq!(config.output_dir(), Path::new("报告"));
        assert_eq!(config.failure_policy(), FailurePolicy::FailFast);
        assert_eq!(config.chart().pixel_size(), (1050, 525));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_page_fits_the_chart_unscaled() {
        let layout = LayoutOptions::default();
        assert!((layout.printable_width_mm() - 159.2).abs() < 1e-9);
        assert!(layout.printable_width_mm() >= crate::template::CHART_SIZE_MM.0);
    }

    #[test]
    fn attachments_default_to_prefix_directory() {
        let config = ReportConfig::new();
        assert_eq!(
            config.attachments_dir_for(Path::new("in/秋季LS.xlsx")),
            PathBuf::from("in/秋季_附件")
        );
        let config = config.with_attachments_dir(PathBuf::from("photos"));
        assert_eq!(
            config.attachments_dir_for(Path::new("in/秋季LS.xlsx")),
            PathBuf::from("photos")
        );
    }

    #[test]
    fn missing_explicit_input_is_a_configuration_error() {
        let config = ReportConfig::new()
            .with_input(InputSource::File(PathBuf::from("no/such/fileLS.xlsx")));
        let err = config.resolve_input().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn zero_row_limit_is_rejected() {
        let config = ReportConfig::new().with_row_limit(Some(0));
        assert!(config.validate().is_err());
    }
}
