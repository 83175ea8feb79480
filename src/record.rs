//! In-memory representation of one survey row.

use std::path::{Path, PathBuf};

use crate::dimension::{Dimension, Pole};

/// Photo extensions accepted for a respondent, in lookup order.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

/// The four signed dimension scores of a respondent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimensionScores {
    pub active_reflective: i32,
    pub sensing_intuitive: i32,
    pub visual_verbal: i32,
    pub sequential_global: i32,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> i32 {
        match dimension {
            Dimension::Processing => self.active_reflective,
            Dimension::Perception => self.sensing_intuitive,
            Dimension::Input => self.visual_verbal,
            Dimension::Understanding => self.sequential_global,
        }
    }

    pub fn set(&mut self, dimension: Dimension, score: i32) {
        match dimension {
            Dimension::Processing => self.active_reflective = score,
            Dimension::Perception => self.sensing_intuitive = score,
            Dimension::Input => self.visual_verbal = score,
            Dimension::Understanding => self.sequential_global = score,
        }
    }
}

/// Unsigned per-pole counts, used only by the chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoleMagnitudes {
    pub active: u32,
    pub reflective: u32,
    pub sensing: u32,
    pub intuitive: u32,
    pub visual: u32,
    pub verbal: u32,
    pub sequential: u32,
    pub global: u32,
}

impl PoleMagnitudes {
    pub fn get(&self, dimension: Dimension, pole: Pole) -> u32 {
        match (dimension, pole) {
            (Dimension::Processing, Pole::Left) => self.active,
            (Dimension::Processing, Pole::Right) => self.reflective,
            (Dimension::Perception, Pole::Left) => self.sensing,
            (Dimension::Perception, Pole::Right) => self.intuitive,
            (Dimension::Input, Pole::Left) => self.visual,
            (Dimension::Input, Pole::Right) => self.verbal,
            (Dimension::Understanding, Pole::Left) => self.sequential,
            (Dimension::Understanding, Pole::Right) => self.global,
        }
    }

    pub fn set(&mut self, dimension: Dimension, pole: Pole, magnitude: u32) {
        let slot = match (dimension, pole) {
            (Dimension::Processing, Pole::Left) => &mut self.active,
            (Dimension::Processing, Pole::Right) => &mut self.reflective,
            (Dimension::Perception, Pole::Left) => &mut self.sensing,
            (Dimension::Perception, Pole::Right) => &mut self.intuitive,
            (Dimension::Input, Pole::Left) => &mut self.visual,
            (Dimension::Input, Pole::Right) => &mut self.verbal,
            (Dimension::Understanding, Pole::Left) => &mut self.sequential,
            (Dimension::Understanding, Pole::Right) => &mut self.global,
        };
        *slot = magnitude;
    }
}

/// One respondent, as read from a spreadsheet row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RespondentRecord {
    row_number: usize,
    sequence: String,
    student_id: String,
    name: String,
    scores: DimensionScores,
    magnitudes: PoleMagnitudes,
}

impl RespondentRecord {
    pub fn new(
        sequence: impl Into<String>,
        student_id: impl Into<String>,
        name: impl Into<String>,
        scores: DimensionScores,
        magnitudes: PoleMagnitudes,
    ) -> Self {
        Self {
            row_number: 0,
            sequence: sequence.into(),
            student_id: student_id.into(),
            name: name.into(),
            scores,
            magnitudes,
        }
    }

    /// Records the 1-based spreadsheet row, used in diagnostics only.
    pub fn with_row_number(mut self, row_number: usize) -> Self {
        self.row_number = row_number;
        self
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    /// The 序号 cell in its string form.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scores(&self) -> &DimensionScores {
        &self.scores
    }

    pub fn magnitudes(&self) -> &PoleMagnitudes {
        &self.magnitudes
    }

    /// `<name>学习风格报告`
    pub fn report_title(&self) -> String {
        format!("{}学习风格报告", self.name)
    }

    /// `序号<seq>_<student_id><name>.pdf`
    pub fn report_file_name(&self) -> String {
        format!("序号{}_{}{}.pdf", self.sequence, self.student_id, self.name)
    }

    /// `序号<seq>_<name>`, the photo file name without extension.
    pub fn photo_stem(&self) -> String {
        format!("序号{}_{}", self.sequence, self.name)
    }

    /// Returns the first existing photo under `attachments_dir`, trying each of
    /// [`PHOTO_EXTENSIONS`] in order.
    pub fn find_photo(&self, attachments_dir: &Path) -> Option<PathBuf> {
        let stem = self.photo_stem();
        PHOTO_EXTENSIONS
            .iter()
            .map(|ext| attachments_dir.join(format!("{stem}.{ext}")))
            .find(|candidate| candidate.is_file())
    }

    /// Short label for log lines and failure summaries.
    pub fn describe(&self) -> String {
        format!(
            "row {} (序号{} {} {})",
            self.row_number, self.sequence, self.student_id, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> RespondentRecord {
        RespondentRecord::new(
            "1",
            "282412244",
            "张三",
            DimensionScores::default(),
            PoleMagnitudes::default(),
        )
        .with_row_number(2)
    }

    #[test]
    fn names_follow_conventions() {
        let record = sample();
        assert_eq!(record.report_title(), "张三学习风格报告");
        assert_eq!(record.report_file_name(), "序号1_282412244张三.pdf");
        assert_eq!(record.photo_stem(), "序号1_张三");
    }

    #[test]
    fn scores_and_magnitudes_are_addressable_by_dimension() {
        let mut scores = DimensionScores::default();
        let mut magnitudes = PoleMagnitudes::default();
        for (index, dimension) in Dimension::ALL.into_iter().enumerate() {
            scores.set(dimension, index as i32 - 2);
            magnitudes.set(dimension, Pole::Left, index as u32);
            magnitudes.set(dimension, Pole::Right, 10 + index as u32);
        }
        assert_eq!(scores.visual_verbal, 0);
        assert_eq!(scores.get(Dimension::Processing), -2);
        assert_eq!(magnitudes.sequential, 3);
        assert_eq!(magnitudes.get(Dimension::Perception, Pole::Right), 11);
    }

    #[test]
    fn photo_lookup_prefers_jpeg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let record = sample();
        assert_eq!(record.find_photo(dir.path()), None);

        fs::write(dir.path().join("序号1_张三.png"), b"png").expect("write png");
        assert_eq!(
            record.find_photo(dir.path()),
            Some(dir.path().join("序号1_张三.png"))
        );

        fs::write(dir.path().join("序号1_张三.jpeg"), b"jpeg").expect("write jpeg");
        assert_eq!(
            record.find_photo(dir.path()),
            Some(dir.path().join("序号1_张三.jpeg"))
        );
    }

    #[test]
    fn missing_attachments_directory_has_no_photo() {
        let record = sample();
        assert_eq!(record.find_photo(Path::new("does/not/exist")), None);
    }
}
