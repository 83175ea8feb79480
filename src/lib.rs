//! Batch generator of personalized learning style reports.
//!
//! Each row of a `*LS.xlsx` survey spreadsheet becomes one PDF with a reference table, a
//! diverging bar chart of the pole magnitudes and the recommended study strategies.

pub mod builder;
pub mod chart;
pub mod config;
pub mod dimension;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod ils;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod richtext;
pub mod template;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use config::{FailurePolicy, InputSource, ReportConfig};
pub use error::{ReportError, Result};
pub use pipeline::{BatchSummary, ReportPipeline, RowFailure};
