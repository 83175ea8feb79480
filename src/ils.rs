//! Scoring of raw Index of Learning Styles answer sheets.
//!
//! The questionnaire has 44 two-choice questions. Question `i * 4 + d` (0-based) belongs to
//! dimension `d`, so each dimension gets 11 questions. Answer `a` leans towards the left pole and
//! answer `b` towards the right one.

use crate::dimension::{Dimension, Pole};
use crate::record::{DimensionScores, PoleMagnitudes};

pub const QUESTION_COUNT: usize = 44;
pub const QUESTIONS_PER_DIMENSION: usize = QUESTION_COUNT / Dimension::ALL.len();

/// Header prefix of the answer columns, `ILS1` to `ILS44`.
pub const COLUMN_PREFIX: &str = "ILS";

/// Header of the answer column for 1-based `question`.
pub fn answer_column(question: usize) -> String {
    format!("{COLUMN_PREFIX}{question}")
}

/// One recorded answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Option a, coded `1`.
    A,
    /// Option b, coded `2`.
    B,
}

impl Answer {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Answer::A),
            2 => Some(Answer::B),
            _ => None,
        }
    }

    pub fn pole(self) -> Pole {
        match self {
            Answer::A => Pole::Left,
            Answer::B => Pole::Right,
        }
    }
}

/// 0-based indices of the questions scored for `dimension`.
pub fn dimension_questions(dimension: Dimension) -> impl Iterator<Item = usize> {
    let offset = dimension.index();
    (0..QUESTIONS_PER_DIMENSION).map(move |i| i * Dimension::ALL.len() + offset)
}

/// Turns a complete answer sheet into signed scores and pole counts.
///
/// The score is `b count - a count`, so a respondent who mostly picks `a` gets a negative score
/// and lands on the left pole.
pub fn score_answers(answers: &[Answer; QUESTION_COUNT]) -> (DimensionScores, PoleMagnitudes) {
    let mut scores = DimensionScores::default();
    let mut magnitudes = PoleMagnitudes::default();

    for dimension in Dimension::ALL {
        let (mut left, mut right) = (0u32, 0u32);
        for index in dimension_questions(dimension) {
            match answers[index].pole() {
                Pole::Left => left += 1,
                Pole::Right => right += 1,
            }
        }
        scores.set(dimension, right as i32 - left as i32);
        magnitudes.set(dimension, Pole::Left, left);
        magnitudes.set(dimension, Pole::Right, right);
    }

    (scores, magnitudes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_interleave_dimensions() {
        let processing: Vec<_> = dimension_questions(Dimension::Processing).collect();
        assert_eq!(processing, [0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40]);
        let understanding: Vec<_> = dimension_questions(Dimension::Understanding).collect();
        assert_eq!(understanding.first(), Some(&3));
        assert_eq!(understanding.last(), Some(&43));
        assert_eq!(answer_column(44), "ILS44");
    }

    #[test]
    fn mostly_a_answers_lean_left() {
        let mut answers = [Answer::B; QUESTION_COUNT];
        // every processing question answered `a`
        for index in dimension_questions(Dimension::Processing) {
            answers[index] = Answer::A;
        }
        // 3 of 11 perception questions answered `a`
        for index in dimension_questions(Dimension::Perception).take(3) {
            answers[index] = Answer::A;
        }

        let (scores, magnitudes) = score_answers(&answers);
        assert_eq!(scores.active_reflective, -11);
        assert_eq!(Pole::for_score(scores.active_reflective), Pole::Left);
        assert_eq!(scores.sensing_intuitive, 5);
        assert_eq!(scores.visual_verbal, 11);
        assert_eq!((magnitudes.active, magnitudes.reflective), (11, 0));
        assert_eq!((magnitudes.sensing, magnitudes.intuitive), (3, 8));
        assert_eq!((magnitudes.visual, magnitudes.verbal), (0, 11));
    }

    #[test]
    fn answer_codes() {
        assert_eq!(Answer::from_code(1), Some(Answer::A));
        assert_eq!(Answer::from_code(2), Some(Answer::B));
        assert_eq!(Answer::from_code(0), None);
        assert_eq!(Answer::from_code(3), None);
    }
}
