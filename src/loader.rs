//! Locating and reading the survey spreadsheet.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info, warn};

use crate::dimension::{Dimension, Pole};
use crate::error::{DataFormatError, ReportError, Result};
use crate::ils::{self, Answer};
use crate::record::{DimensionScores, PoleMagnitudes, RespondentRecord};

/// File name suffix identifying survey spreadsheets.
pub const INPUT_SUFFIX: &str = "LS.xlsx";

pub const SEQUENCE_COLUMN: &str = "序号";
pub const STUDENT_ID_COLUMN: &str = "学号";
pub const NAME_COLUMN: &str = "姓名";

/// Finds the survey spreadsheet in `dir`.
///
/// When several files match, the lexicographically first file name wins.
pub fn discover_input(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|err| {
        ReportError::configuration(format!(
            "cannot scan {} for *{INPUT_SUFFIX}: {err}",
            dir.display()
        ))
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(INPUT_SUFFIX) && entry.path().is_file() {
            candidates.push(name.to_owned());
        }
    }
    candidates.sort();

    for candidate in &candidates {
        debug!("Input candidate: {candidate}");
    }

    match candidates.as_slice() {
        [] => Err(ReportError::configuration(format!(
            "no *{INPUT_SUFFIX} file found in {}",
            dir.display()
        ))),
        [only] => {
            let path = dir.join(only);
            info!("Found input file {}", path.display());
            Ok(path)
        }
        [first, ..] => {
            warn!(
                "{} files match *{INPUT_SUFFIX} in {}; using {first}",
                candidates.len(),
                dir.display()
            );
            Ok(dir.join(first))
        }
    }
}

/// The part of the file name before `LS.xlsx`, or `None` when the name does not follow the
/// convention.
pub fn prefix_of(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.strip_suffix(INPUT_SUFFIX)
}

/// `<dir of input>/<prefix>_附件`, the default photo directory.
pub fn default_attachments_dir(input: &Path) -> PathBuf {
    let prefix = prefix_of(input).map(str::to_owned).unwrap_or_else(|| {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{prefix}_附件"))
}

/// Creates the output directory (and parents) unless it already exists.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        info!("Output directory exists: {}", path.display());
        return Ok(());
    }
    fs::create_dir_all(path)?;
    info!("Created output directory: {}", path.display());
    Ok(())
}

/// Reads every record of the first worksheet, failing on the first malformed row.
pub fn load_records(path: &Path) -> Result<Vec<RespondentRecord>> {
    load_records_limited(path, None)
}

/// Like [`load_records`] but stops after `limit` records.
pub fn load_records_limited(path: &Path, limit: Option<usize>) -> Result<Vec<RespondentRecord>> {
    load_rows(path, limit)?.into_iter().collect()
}

/// Reads the first worksheet and parses each non-blank row independently.
///
/// Sheet-level problems (unreadable workbook, missing columns) fail the whole call. Row-level
/// problems are returned in place so a caller can decide to carry on.
pub fn load_rows(path: &Path, limit: Option<usize>) -> Result<Vec<Result<RespondentRecord>>> {
    if !path.is_file() {
        return Err(ReportError::configuration(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let mut workbook = open_workbook_auto(path).map_err(|err| {
        ReportError::configuration(format!("cannot open {}: {err}", path.display()))
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataFormatError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(|err| DataFormatError::UnreadableSheet {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();
    let columns = ColumnMap::resolve(path, &header)?;

    let mut parsed = Vec::new();
    for (index, cells) in rows.enumerate() {
        if limit.is_some_and(|limit| parsed.len() >= limit) {
            break;
        }
        // header is spreadsheet row `first_row + 1`
        let row_number = first_row + index + 2;
        if columns.is_blank(cells) {
            debug!("Skipping blank row {row_number}");
            continue;
        }
        parsed.push(columns.parse(cells, row_number));
    }

    info!("Loaded {} rows from {}", parsed.len(), path.display());
    Ok(parsed)
}

/// Where a row's scores come from.
enum StyleColumns {
    /// Signed score columns plus pole magnitude columns (right poles optional).
    Scored {
        scores: [usize; 4],
        magnitudes: [(usize, Option<usize>); 4],
    },
    /// Raw answers in `ILS1`..`ILS44`.
    Answers(Vec<usize>),
}

struct ColumnMap {
    sequence: usize,
    student_id: usize,
    name: usize,
    style: StyleColumns,
}

impl ColumnMap {
    fn resolve(path: &Path, header: &[String]) -> Result<Self> {
        let positions: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| (name.as_str(), index))
            .collect();

        let mut missing = Vec::new();
        let require = |missing: &mut Vec<String>, name: &str| match positions.get(name) {
            Some(index) => *index,
            None => {
                missing.push(name.to_owned());
                usize::MAX
            }
        };

        let name = require(&mut missing, NAME_COLUMN);
        let student_id = require(&mut missing, STUDENT_ID_COLUMN);
        let sequence = require(&mut missing, SEQUENCE_COLUMN);
        let identity_missing = missing.len();

        let scores =
            Dimension::ALL.map(|dimension| require(&mut missing, dimension.score_column()));
        let lefts = Dimension::ALL
            .map(|dimension| require(&mut missing, dimension.profile().left.magnitude_column));

        // a full answer set stands in for absent pre-scored columns
        let answers = if missing.len() > identity_missing {
            answer_columns(&positions)
        } else {
            None
        };
        if answers.is_some() {
            debug!(
                "{}: no score columns, scoring {}1..{}{} answers",
                path.display(),
                ils::COLUMN_PREFIX,
                ils::COLUMN_PREFIX,
                ils::QUESTION_COUNT
            );
            missing.truncate(identity_missing);
        }

        if !missing.is_empty() {
            return Err(DataFormatError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            }
            .into());
        }

        let style = match answers {
            Some(answers) => StyleColumns::Answers(answers),
            None => {
                let mut magnitudes = [(0, None); 4];
                for (slot, (dimension, left)) in magnitudes
                    .iter_mut()
                    .zip(Dimension::ALL.into_iter().zip(lefts))
                {
                    let right_column = dimension.profile().right.magnitude_column;
                    let right = positions.get(right_column).copied();
                    if right.is_none() {
                        debug!("Optional column {right_column} absent; its magnitudes read as 0");
                    }
                    *slot = (left, right);
                }
                StyleColumns::Scored { scores, magnitudes }
            }
        };

        Ok(Self {
            sequence,
            student_id,
            name,
            style,
        })
    }

    fn is_blank(&self, cells: &[Data]) -> bool {
        text_at(cells, self.student_id).is_empty() && text_at(cells, self.name).is_empty()
    }

    fn parse(&self, cells: &[Data], row: usize) -> Result<RespondentRecord> {
        let (scores, magnitudes) = match &self.style {
            StyleColumns::Scored { scores, magnitudes } => {
                parse_scored(cells, row, scores, magnitudes)?
            }
            StyleColumns::Answers(columns) => parse_answers(cells, row, columns)?,
        };

        Ok(RespondentRecord::new(
            text_at(cells, self.sequence),
            text_at(cells, self.student_id),
            text_at(cells, self.name),
            scores,
            magnitudes,
        )
        .with_row_number(row))
    }
}

/// Positions of `ILS1`..`ILS44`, if every one is present.
fn answer_columns(positions: &HashMap<&str, usize>) -> Option<Vec<usize>> {
    (1..=ils::QUESTION_COUNT)
        .map(|question| positions.get(ils::answer_column(question).as_str()).copied())
        .collect()
}

fn parse_scored(
    cells: &[Data],
    row: usize,
    score_columns: &[usize; 4],
    magnitude_columns: &[(usize, Option<usize>); 4],
) -> Result<(DimensionScores, PoleMagnitudes)> {
    let mut scores = DimensionScores::default();
    for (dimension, column) in Dimension::ALL.into_iter().zip(score_columns) {
        let value = integer_at(cells, *column, row, dimension.score_column(), false)?;
        let score = i32::try_from(value).map_err(|_| DataFormatError::OutOfRange {
            row,
            column: dimension.score_column().to_owned(),
            value,
        })?;
        scores.set(dimension, score);
    }

    let mut magnitudes = PoleMagnitudes::default();
    for (dimension, (left, right)) in Dimension::ALL.into_iter().zip(magnitude_columns) {
        let profile = dimension.profile();
        let left_value = magnitude_at(cells, *left, row, profile.left.magnitude_column)?;
        magnitudes.set(dimension, Pole::Left, left_value);
        if let Some(right) = right {
            let right_value = magnitude_at(cells, *right, row, profile.right.magnitude_column)?;
            magnitudes.set(dimension, Pole::Right, right_value);
        }
    }
    Ok((scores, magnitudes))
}

fn parse_answers(
    cells: &[Data],
    row: usize,
    columns: &[usize],
) -> Result<(DimensionScores, PoleMagnitudes)> {
    let mut answers = [Answer::A; ils::QUESTION_COUNT];
    for (question, (slot, column)) in answers.iter_mut().zip(columns).enumerate() {
        let cell = cells.get(*column).unwrap_or(&Data::Empty);
        *slot = integral_value(cell)
            .and_then(Answer::from_code)
            .ok_or_else(|| DataFormatError::InvalidAnswer {
                row,
                column: ils::answer_column(question + 1),
                found: cell_text(cell),
            })?;
    }
    Ok(ils::score_answers(&answers))
}

fn text_at(cells: &[Data], column: usize) -> String {
    cells.get(column).map(cell_text).unwrap_or_default()
}

/// String form of a cell. Integral floats print without a fractional part, so a numeric
/// 学号 `282412244` does not turn into `282412244.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_owned(),
        Data::Float(value) if value.is_finite() && value.fract() == 0.0 => {
            format!("{}", *value as i64)
        }
        other => other.to_string().trim().to_owned(),
    }
}

fn integral_value(cell: &Data) -> Option<i64> {
    fn from_float(value: f64) -> Option<i64> {
        (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64)
            .then_some(value as i64)
    }

    match cell {
        Data::Int(value) => Some(*value),
        Data::Float(value) => from_float(*value),
        Data::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn integer_at(
    cells: &[Data],
    column: usize,
    row: usize,
    name: &str,
    blank_is_zero: bool,
) -> Result<i64> {
    let cell = cells.get(column).unwrap_or(&Data::Empty);
    if blank_is_zero && cell_text(cell).is_empty() {
        return Ok(0);
    }
    integral_value(cell).ok_or_else(|| {
        DataFormatError::NotAnInteger {
            row,
            column: name.to_owned(),
            found: cell_text(cell),
        }
        .into()
    })
}

fn magnitude_at(cells: &[Data], column: usize, row: usize, name: &str) -> Result<u32> {
    let value = integer_at(cells, column, row, name, true)?;
    if value < 0 {
        return Err(DataFormatError::NegativeMagnitude {
            row,
            column: name.to_owned(),
            value,
        }
        .into());
    }
    u32::try_from(value).map_err(|_| {
        DataFormatError::OutOfRange {
            row,
            column: name.to_owned(),
            value,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_everything_before_suffix() {
        assert_eq!(prefix_of(Path::new("dir/2024秋LS.xlsx")), Some("2024秋"));
        assert_eq!(prefix_of(Path::new("LS.xlsx")), Some(""));
        assert_eq!(prefix_of(Path::new("scores.xlsx")), None);
    }

    #[test]
    fn attachments_dir_sits_next_to_input() {
        assert_eq!(
            default_attachments_dir(Path::new("data/classLS.xlsx")),
            PathBuf::from("data/class_附件")
        );
        assert_eq!(
            default_attachments_dir(Path::new("classLS.xlsx")),
            PathBuf::from("class_附件")
        );
    }

    #[test]
    fn integral_cells() {
        assert_eq!(integral_value(&Data::Float(5.0)), Some(5));
        assert_eq!(integral_value(&Data::Int(-3)), Some(-3));
        assert_eq!(integral_value(&Data::String(" -3 ".into())), Some(-3));
        assert_eq!(integral_value(&Data::String("5.0".into())), Some(5));
        assert_eq!(integral_value(&Data::Float(5.5)), None);
        assert_eq!(integral_value(&Data::String("abc".into())), None);
        assert_eq!(integral_value(&Data::Empty), None);
        assert_eq!(integral_value(&Data::Bool(true)), None);
    }

    #[test]
    fn numeric_identifiers_print_without_fraction() {
        assert_eq!(cell_text(&Data::Float(282412244.0)), "282412244");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String(" 张三 ".into())), "张三");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn blank_magnitude_reads_as_zero() {
        let cells = [Data::Empty, Data::String("  ".into()), Data::Float(4.0)];
        assert_eq!(magnitude_at(&cells, 0, 2, "积极").ok(), Some(0));
        assert_eq!(magnitude_at(&cells, 1, 2, "积极").ok(), Some(0));
        assert_eq!(magnitude_at(&cells, 2, 2, "积极").ok(), Some(4));
        assert_eq!(magnitude_at(&cells, 9, 2, "积极").ok(), Some(0));
    }

    #[test]
    fn negative_magnitude_is_rejected() {
        let cells = [Data::Float(-1.0)];
        let err = magnitude_at(&cells, 0, 5, "视觉").unwrap_err();
        assert!(matches!(
            err,
            ReportError::DataFormat(DataFormatError::NegativeMagnitude { row: 5, .. })
        ));
    }

    #[test]
    fn blank_score_is_an_error() {
        let cells = [Data::Empty];
        let err = integer_at(&cells, 0, 3, "积极/沉思", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 3, column 积极/沉思: expected an integer, found \"\""
        );
    }

    #[test]
    fn discovery_requires_a_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.xlsx"), b"").expect("write");
        let err = discover_input(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn discovery_picks_lexicographically_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["bLS.xlsx", "aLS.xlsx", "cLS.xlsx"] {
            fs::write(dir.path().join(name), b"").expect("write");
        }
        let chosen = discover_input(dir.path()).expect("discover");
        assert_eq!(chosen, dir.path().join("aLS.xlsx"));
    }

    fn answer_sheet_header() -> Vec<String> {
        let mut header: Vec<String> = [SEQUENCE_COLUMN, STUDENT_ID_COLUMN, NAME_COLUMN]
            .iter()
            .map(|name| name.to_string())
            .collect();
        header.extend((1..=ils::QUESTION_COUNT).map(ils::answer_column));
        header
    }

    #[test]
    fn answer_columns_stand_in_for_scores() {
        let map = ColumnMap::resolve(Path::new("classLS.xlsx"), &answer_sheet_header())
            .expect("answer sheet resolves");
        assert!(matches!(&map.style, StyleColumns::Answers(columns) if columns[0] == 3));

        // ILS1 (processing) is `b`, every other answer `a`
        let mut cells = vec![
            Data::Float(1.0),
            Data::String("282412244".into()),
            Data::String("张三".into()),
            Data::Float(2.0),
        ];
        cells.extend((1..ils::QUESTION_COUNT).map(|_| Data::Float(1.0)));
        let record = map.parse(&cells, 2).expect("record");
        assert_eq!(record.scores().active_reflective, -9);
        assert_eq!(record.scores().visual_verbal, -11);
        assert_eq!(record.magnitudes().active, 10);
        assert_eq!(record.magnitudes().reflective, 1);
    }

    #[test]
    fn answers_outside_one_and_two_are_rejected() {
        let map = ColumnMap::resolve(Path::new("classLS.xlsx"), &answer_sheet_header())
            .expect("answer sheet resolves");
        let mut cells = vec![
            Data::Float(1.0),
            Data::String("282412244".into()),
            Data::String("张三".into()),
        ];
        cells.extend((0..ils::QUESTION_COUNT).map(|_| Data::Float(2.0)));
        cells[3 + 6] = Data::Float(3.0);

        match map.parse(&cells, 4).unwrap_err() {
            ReportError::DataFormat(DataFormatError::InvalidAnswer { row, column, found }) => {
                assert_eq!((row, column.as_str(), found.as_str()), (4, "ILS7", "3"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn partial_answer_set_does_not_replace_scores() {
        let mut header = answer_sheet_header();
        header.retain(|name| name != "ILS44");
        let err = ColumnMap::resolve(Path::new("classLS.xlsx"), &header)
            .err()
            .expect("missing score columns");
        match err {
            ReportError::DataFormat(DataFormatError::MissingColumns { columns, .. }) => {
                assert_eq!(columns.first().map(String::as_str), Some("积极/沉思"));
                assert!(!columns.iter().any(|name| name.starts_with("ILS")));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn output_dir_is_created_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("报告").join("nested");
        ensure_output_dir(&out).expect("create");
        assert!(out.is_dir());
        ensure_output_dir(&out).expect("reuse");
    }
}
