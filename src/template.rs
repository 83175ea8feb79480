//! The fixed report layout, filled in from one respondent record.
//!
//! Everything here is pure: the chart and photo arrive as encoded bytes, and the result is a
//! [`ReportDocument`] that [`crate::builder::render_pdf`] lays out.

use crate::dimension::{Dimension, Pole, StrengthBand};
use crate::model::{
    Block, ColumnsBlock, HorizontalAlignment, ImageBlock, ReportDocument, RichParagraph,
    TableBlock, TableCell, VerticalAlignment,
};
use crate::record::RespondentRecord;
use crate::richtext::Span;

const MM_PER_INCH: f64 = 25.4;

/// First-line indent of narrative paragraphs (0.3 in).
pub const PARAGRAPH_INDENT_MM: f64 = 0.3 * MM_PER_INCH;
/// Display height of the respondent photo (1.8 in).
pub const PHOTO_HEIGHT_MM: f64 = 1.8 * MM_PER_INCH;
/// Display size of the dimension chart (6 in x 3 in).
pub const CHART_SIZE_MM: (f64, f64) = (6.0 * MM_PER_INCH, 3.0 * MM_PER_INCH);
/// Reference table column widths (2.5 cm, 2 cm, 14.93 cm).
pub const TABLE_COLUMN_WIDTHS_MM: [f64; 3] = [25.0, 20.0, 149.3];

const COLUMN_GAP_MM: f64 = 12.7;

const INTRODUCTION: &str = "本报告基于 Index of Learning Styles 问卷调查的结果生成，\
可为制定学习策略提供参考。基于 Felder-Silverman 学习风格模型，学习风格可划分为以下四个维度：\
积极/沉思，感官/直觉，视觉/言语，顺序/全局。\
每个学习者在每个维度上的倾向性都有所不同，因此需要制定个性化的学习策略。学习风格的各个维度及其特点如下表：";

const OVERVIEW_HEADING: &str = "1 总览";
const OVERVIEW_LEAD: &str = "您的学习风格在四个维度下的倾向性为：";
const OVERVIEW_DISCLAIMER: &str = "（强弱程度仅仅代表倾向性，不代表学习能力强弱）";

const DIMENSIONS_HEADING: &str = "2 学习风格维度";
const DIMENSIONS_LEAD: &str =
    "数字标识出了您的学习风格在每个维度下的倾向程度，在每个维度下总体的倾向取决于两个方向之差。";
const BAND_NOTES: [&str; 3] = [
    "• 如果您在一个维度的倾向性差异在 1~3之间，意味着在该维度下的两种特质之间有较好的平衡，\
因此能够适应不同的学习策略和教学风格。",
    "• 如果倾向性差异为 5 或 7，您在该维度下某个特质具有中等的倾向性，\
因此能够更加轻松地在有利于该特质的教学环境中学习。",
    "• 如果倾向性差异为 9 或 11，您对该维度下的某个特质具有很强的倾向性，\
在不支持这种倾向的环境中学习可能具有较大的困难，因此需要特别关注个性化的策略。",
];

const STRATEGY_HEADING: &str = "3 推荐学习策略";

const TABLE_TYPE_HEADER: &str = "学习风格类型";
const TABLE_TRAITS_HEADER: &str = "特点";

fn strength_tag(score: i32) -> String {
    format!("（{}）", StrengthBand::classify(score).label())
}

/// Overview bullet for one dimension, e.g. `• 信息加工：（强）积极`.
pub fn summary_line(dimension: Dimension, score: i32) -> String {
    let profile = dimension.profile();
    format!(
        "• {}：{}{}",
        profile.category,
        strength_tag(score),
        profile.pole(Pole::for_score(score)).label
    )
}

/// Strategy bullet for one dimension: the strength tag and the selected pole's advice.
pub fn strategy_line(dimension: Dimension, score: i32) -> String {
    let pole = dimension.profile().pole(Pole::for_score(score));
    format!("• {}{}", strength_tag(score), pole.strategy)
}

fn header_cell(row: usize, column: usize, text: &str) -> TableCell {
    let content = RichParagraph::new(vec![Span::new(text).bold().heading_face()])
        .with_alignment(HorizontalAlignment::Center);
    TableCell::new(row, column, content)
}

/// The 9x3 table describing every dimension pole. Identical for every respondent.
pub fn reference_table() -> TableBlock {
    let mut table = TableBlock::new(9, TABLE_COLUMN_WIDTHS_MM.to_vec())
        .with_cell(header_cell(0, 0, TABLE_TYPE_HEADER).with_column_span(2))
        .with_cell(header_cell(0, 2, TABLE_TRAITS_HEADER));

    for (index, dimension) in Dimension::ALL.into_iter().enumerate() {
        let profile = dimension.profile();
        let first_row = 1 + index * 2;
        table = table.with_cell(
            TableCell::new(first_row, 0, RichParagraph::plain(profile.category))
                .with_row_span(2)
                .with_vertical_alignment(VerticalAlignment::Center),
        );
        for (offset, pole) in [Pole::Left, Pole::Right].into_iter().enumerate() {
            let row = first_row + offset;
            let texts = profile.pole(pole);
            table = table
                .with_cell(
                    TableCell::new(row, 1, RichParagraph::plain(texts.type_label))
                        .with_vertical_alignment(VerticalAlignment::Center),
                )
                .with_cell(TableCell::new(
                    row,
                    2,
                    RichParagraph::plain(texts.description),
                ));
        }
    }
    table
}

fn indented(text: &str) -> RichParagraph {
    RichParagraph::plain(text).with_first_line_indent_mm(PARAGRAPH_INDENT_MM)
}

/// Builds the complete report for `record`.
pub fn build_report(
    record: &RespondentRecord,
    chart_png: Vec<u8>,
    photo: Option<Vec<u8>>,
) -> ReportDocument {
    let title = record.report_title();
    let scores = record.scores();

    let mut identity = vec![Block::from(RichParagraph::plain(format!(
        "学号：{}",
        record.student_id()
    )))];
    if let Some(photo) = photo {
        identity.push(
            ImageBlock::new(photo)
                .with_height_mm(PHOTO_HEIGHT_MM)
                .into(),
        );
    }
    let intro = ColumnsBlock::new()
        .with_gap_mm(COLUMN_GAP_MM)
        .with_column(identity)
        .with_column(vec![Block::from(indented(INTRODUCTION))]);

    let mut document = ReportDocument::new(title.clone())
        .with_block(Block::heading(0, title))
        .with_block(intro)
        .with_block(reference_table())
        .with_block(Block::heading(1, OVERVIEW_HEADING))
        .with_block(indented(OVERVIEW_LEAD));
    for dimension in Dimension::ALL {
        document.push(RichParagraph::plain(summary_line(
            dimension,
            scores.get(dimension),
        )));
    }
    document.push(RichParagraph::plain(OVERVIEW_DISCLAIMER));

    document.push(Block::heading(1, DIMENSIONS_HEADING));
    document.push(indented(DIMENSIONS_LEAD));
    document.push(
        ImageBlock::new(chart_png)
            .with_width_mm(CHART_SIZE_MM.0)
            .with_height_mm(CHART_SIZE_MM.1),
    );
    for note in BAND_NOTES {
        document.push(RichParagraph::plain(note));
    }

    document.push(Block::heading(1, STRATEGY_HEADING));
    for dimension in Dimension::ALL {
        document.push(RichParagraph::plain(strategy_line(
            dimension,
            scores.get(dimension),
        )));
    }
    document
}
