//! Error types shared by every stage of the report pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "bookmarks")]
use crate::bookmarks::BookmarkError;

/// Top level error returned by the loader, the renderers and the batch driver.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The run cannot start: missing input, unreadable workbook, fonts not found, bad options.
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Process exit code used by the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::Configuration(_) => 2,
            ReportError::DataFormat(_) => 3,
            ReportError::Render(_) => 4,
            ReportError::Io(_) => 1,
        }
    }

    /// Whether the error only concerns a single row and the batch may carry on past it.
    pub fn is_row_scoped(&self) -> bool {
        match self {
            ReportError::Render(_) => true,
            ReportError::DataFormat(err) => err.row().is_some(),
            ReportError::Configuration(_) | ReportError::Io(_) => false,
        }
    }
}

impl From<genpdf::error::Error> for ReportError {
    fn from(err: genpdf::error::Error) -> Self {
        Self::Render(RenderError::Document(err))
    }
}

/// Problems with the content of the spreadsheet.
#[derive(Error, Debug)]
pub enum DataFormatError {
    #[error("{path}: missing required columns: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("{path}: workbook contains no worksheet")]
    NoWorksheet { path: PathBuf },

    #[error("{path}: cannot read worksheet ({details})")]
    UnreadableSheet { path: PathBuf, details: String },

    #[error("row {row}, column {column}: expected an integer, found {found:?}")]
    NotAnInteger {
        row: usize,
        column: String,
        found: String,
    },

    #[error("row {row}, column {column}: magnitude must not be negative, found {value}")]
    NegativeMagnitude {
        row: usize,
        column: String,
        value: i64,
    },

    #[error("row {row}, column {column}: expected answer 1 or 2, found {found:?}")]
    InvalidAnswer {
        row: usize,
        column: String,
        found: String,
    },

    #[error("row {row}, column {column}: value {value} is out of range")]
    OutOfRange {
        row: usize,
        column: String,
        value: i64,
    },
}

impl DataFormatError {
    /// The 1-based spreadsheet row the error refers to, if it is row-scoped.
    pub fn row(&self) -> Option<usize> {
        match self {
            DataFormatError::NotAnInteger { row, .. }
            | DataFormatError::InvalidAnswer { row, .. }
            | DataFormatError::NegativeMagnitude { row, .. }
            | DataFormatError::OutOfRange { row, .. } => Some(*row),
            DataFormatError::MissingColumns { .. }
            | DataFormatError::NoWorksheet { .. }
            | DataFormatError::UnreadableSheet { .. } => None,
        }
    }
}

/// Failures while drawing the chart, laying out the document or writing it out.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Chart(String),

    #[error("image encoding failed")]
    Image(#[from] image::ImageError),

    #[error("document layout failed")]
    Document(#[source] genpdf::error::Error),

    #[error("invalid report file name {0:?}")]
    InvalidFileName(String),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[cfg(feature = "bookmarks")]
    #[error("failed to add outline bookmarks")]
    Bookmarks(#[from] BookmarkError),
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(ReportError::configuration("no input").exit_code(), 2);
        let data = DataFormatError::MissingColumns {
            path: PathBuf::from("aLS.xlsx"),
            columns: vec!["姓名".into()],
        };
        assert_eq!(ReportError::from(data).exit_code(), 3);
        let render = RenderError::Chart("backend".into());
        assert_eq!(ReportError::from(render).exit_code(), 4);
        let io = io::Error::new(io::ErrorKind::Other, "disk");
        assert_eq!(ReportError::from(io).exit_code(), 1);
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = DataFormatError::MissingColumns {
            path: PathBuf::from("classLS.xlsx"),
            columns: vec!["积极".into(), "顺序".into()],
        };
        assert_eq!(
            err.to_string(),
            "classLS.xlsx: missing required columns: 积极, 顺序"
        );
    }

    #[test]
    fn only_row_errors_are_row_scoped() {
        let cell = DataFormatError::NotAnInteger {
            row: 4,
            column: "积极/沉思".into(),
            found: "abc".into(),
        };
        assert!(ReportError::from(cell).is_row_scoped());
        let sheet = DataFormatError::NoWorksheet {
            path: PathBuf::from("x"),
        };
        assert!(!ReportError::from(sheet).is_row_scoped());
        assert!(!ReportError::configuration("fonts").is_row_scoped());
    }
}
