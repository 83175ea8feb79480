//! Data structures describing the logical content of a report.
//!
//! The types in this module form a renderer-independent document tree. They only reference
//! [`Span`] for inline styling, so a report can be built and inspected in tests without loading
//! any fonts; [`crate::builder`] maps the tree onto `genpdf` elements.

use crate::richtext::Span;

/// Horizontal placement of text lines, images and table cell content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical placement of content inside a table cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
}

/// Rich text paragraph carrying inline styling information and layout metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
    first_line_indent_mm: f64,
}

impl RichParagraph {
    /// Creates a paragraph from the provided spans using left alignment.
    pub fn new(spans: impl Into<Vec<Span>>) -> Self {
        Self {
            spans: spans.into(),
            ..Self::default()
        }
    }

    /// Creates a paragraph holding a single unstyled span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Span::new(text)])
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    pub fn first_line_indent_mm(&self) -> f64 {
        self.first_line_indent_mm
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }

    /// Sets the alignment and returns the updated paragraph.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Indents the first line by `indent_mm` and returns the updated paragraph.
    pub fn with_first_line_indent_mm(mut self, indent_mm: f64) -> Self {
        self.first_line_indent_mm = indent_mm;
        self
    }
}

/// A numbered section heading. Level 0 is the document title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    level: u8,
    text: String,
}

impl Heading {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An encoded raster image (PNG, JPEG) with its display size.
///
/// When only one of width and height is set the other follows the aspect ratio; with neither set
/// the image keeps its natural size.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    bytes: Vec<u8>,
    alignment: HorizontalAlignment,
    width_mm: Option<f64>,
    height_mm: Option<f64>,
}

impl ImageBlock {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            alignment: HorizontalAlignment::Left,
            width_mm: None,
            height_mm: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    pub fn width_mm(&self) -> Option<f64> {
        self.width_mm
    }

    pub fn height_mm(&self) -> Option<f64> {
        self.height_mm
    }

    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_width_mm(mut self, width_mm: impl Into<Option<f64>>) -> Self {
        self.width_mm = width_mm.into();
        self
    }

    pub fn with_height_mm(mut self, height_mm: impl Into<Option<f64>>) -> Self {
        self.height_mm = height_mm.into();
        self
    }
}

/// One cell of a [`TableBlock`], anchored at its top-left grid position.
#[derive(Clone, Debug, PartialEq)]
pub struct TableCell {
    row: usize,
    column: usize,
    row_span: usize,
    column_span: usize,
    content: RichParagraph,
    vertical_alignment: VerticalAlignment,
}

impl TableCell {
    pub fn new(row: usize, column: usize, content: RichParagraph) -> Self {
        Self {
            row,
            column,
            row_span: 1,
            column_span: 1,
            content,
            vertical_alignment: VerticalAlignment::Top,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn row_span(&self) -> usize {
        self.row_span
    }

    pub fn column_span(&self) -> usize {
        self.column_span
    }

    pub fn content(&self) -> &RichParagraph {
        &self.content
    }

    pub fn vertical_alignment(&self) -> VerticalAlignment {
        self.vertical_alignment
    }

    /// Merges this cell with the `rows` rows starting at its own (minimum 1).
    pub fn with_row_span(mut self, rows: usize) -> Self {
        self.row_span = rows.max(1);
        self
    }

    /// Merges this cell with the `columns` columns starting at its own (minimum 1).
    pub fn with_column_span(mut self, columns: usize) -> Self {
        self.column_span = columns.max(1);
        self
    }

    pub fn with_vertical_alignment(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical_alignment = alignment;
        self
    }

    fn covers(&self, row: usize, column: usize) -> bool {
        (self.row..self.row + self.row_span).contains(&row)
            && (self.column..self.column + self.column_span).contains(&column)
    }
}

/// A bordered grid with fixed column widths and merged cells.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    rows: usize,
    column_widths_mm: Vec<f64>,
    cells: Vec<TableCell>,
}

impl TableBlock {
    /// Creates an empty table with `rows` rows and one column per width.
    pub fn new(rows: usize, column_widths_mm: impl Into<Vec<f64>>) -> Self {
        Self {
            rows,
            column_widths_mm: column_widths_mm.into(),
            cells: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.column_widths_mm.len()
    }

    pub fn column_widths_mm(&self) -> &[f64] {
        &self.column_widths_mm
    }

    pub fn cells(&self) -> &[TableCell] {
        &self.cells
    }

    /// Adds a cell and returns the updated table.
    ///
    /// Cells reaching past the grid are clipped to it. A cell overlapping one added earlier is
    /// dropped with a warning.
    pub fn with_cell(mut self, mut cell: TableCell) -> Self {
        if cell.row >= self.rows || cell.column >= self.columns() {
            log::warn!(
                "Dropping table cell at ({}, {}) outside the {}x{} grid",
                cell.row,
                cell.column,
                self.rows,
                self.columns()
            );
            return self;
        }
        cell.row_span = cell.row_span.min(self.rows - cell.row);
        cell.column_span = cell.column_span.min(self.columns() - cell.column);

        let overlaps = (cell.row..cell.row + cell.row_span).any(|row| {
            (cell.column..cell.column + cell.column_span)
                .any(|column| self.cell_at(row, column).is_some())
        });
        if overlaps {
            log::warn!(
                "Dropping table cell at ({}, {}) overlapping an existing cell",
                cell.row,
                cell.column
            );
            return self;
        }

        self.cells.push(cell);
        self
    }

    /// Returns the cell covering grid position (`row`, `column`), merged or not.
    pub fn cell_at(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.cells.iter().find(|cell| cell.covers(row, column))
    }
}

/// Side-by-side columns of equal width, each a vertical stack of blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnsBlock {
    columns: Vec<Vec<Block>>,
    gap_mm: f64,
}

impl ColumnsBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Vec<Block>] {
        &self.columns
    }

    pub fn gap_mm(&self) -> f64 {
        self.gap_mm
    }

    /// Appends a column and returns the updated section.
    pub fn with_column<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.columns.push(blocks.into_iter().collect());
        self
    }

    pub fn with_gap_mm(mut self, gap_mm: f64) -> Self {
        self.gap_mm = gap_mm;
        self
    }
}

/// Individual content blocks that make up a report.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading(Heading),
    Paragraph(RichParagraph),
    Image(ImageBlock),
    Table(TableBlock),
    Columns(ColumnsBlock),
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading(Heading::new(level, text))
    }
}

impl From<RichParagraph> for Block {
    fn from(paragraph: RichParagraph) -> Self {
        Block::Paragraph(paragraph)
    }
}

impl From<ImageBlock> for Block {
    fn from(image: ImageBlock) -> Self {
        Block::Image(image)
    }
}

impl From<TableBlock> for Block {
    fn from(table: TableBlock) -> Self {
        Block::Table(table)
    }
}

impl From<ColumnsBlock> for Block {
    fn from(columns: ColumnsBlock) -> Self {
        Block::Columns(columns)
    }
}

/// A complete report: a document title and an ordered list of blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportDocument {
    title: String,
    blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// Document title, stored in the PDF metadata.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push(&mut self, block: impl Into<Block>) {
        self.blocks.push(block.into());
    }

    /// Appends a block and returns the updated document.
    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.push(block);
        self
    }

    /// All headings in document order, including those nested in columns.
    pub fn headings(&self) -> Vec<&Heading> {
        fn collect<'a>(blocks: &'a [Block], out: &mut Vec<&'a Heading>) {
            for block in blocks {
                match block {
                    Block::Heading(heading) => out.push(heading),
                    Block::Columns(columns) => {
                        for column in columns.columns() {
                            collect(column, out);
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut headings = Vec::new();
        collect(&self.blocks, &mut headings);
        headings
    }

    /// Concatenated text of every top-level paragraph, one per line.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph.text()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, column: usize) -> TableCell {
        TableCell::new(row, column, RichParagraph::plain(format!("{row},{column}")))
    }

    #[test]
    fn merged_cells_cover_their_span() {
        let table = TableBlock::new(3, vec![10.0, 10.0, 10.0])
            .with_cell(cell(0, 0).with_column_span(2))
            .with_cell(cell(1, 0).with_row_span(2));

        assert_eq!(table.cell_at(0, 1).map(TableCell::column), Some(0));
        assert_eq!(table.cell_at(2, 0).map(TableCell::row), Some(1));
        assert!(table.cell_at(2, 2).is_none());
    }

    #[test]
    fn overlapping_cells_are_dropped() {
        let table = TableBlock::new(2, vec![10.0, 10.0])
            .with_cell(cell(0, 0).with_column_span(2))
            .with_cell(cell(0, 1));
        assert_eq!(table.cells().len(), 1);
    }

    #[test]
    fn spans_are_clipped_to_the_grid() {
        let table = TableBlock::new(2, vec![10.0, 10.0])
            .with_cell(cell(1, 1).with_row_span(5).with_column_span(5))
            .with_cell(cell(5, 0));
        assert_eq!(table.cells().len(), 1);
        assert_eq!(table.cells()[0].row_span(), 1);
        assert_eq!(table.cells()[0].column_span(), 1);
    }

    #[test]
    fn headings_include_nested_columns() {
        let document = ReportDocument::new("t")
            .with_block(Block::heading(0, "title"))
            .with_block(ColumnsBlock::new().with_column(vec![Block::heading(2, "nested")]))
            .with_block(Block::heading(1, "1 one"));
        let texts: Vec<_> = document.headings().iter().map(|h| h.text()).collect();
        assert_eq!(texts, ["title", "nested", "1 one"]);
    }

    #[test]
    fn typed_parts_convert_into_blocks() {
        let mut document = ReportDocument::new("t");
        document.push(RichParagraph::plain("段落"));
        document.push(ImageBlock::new(vec![0u8; 4]));
        document.push(TableBlock::new(1, vec![10.0]));
        document.push(ColumnsBlock::new());

        let kinds: Vec<_> = document
            .blocks()
            .iter()
            .map(|block| match block {
                Block::Heading(_) => "heading",
                Block::Paragraph(_) => "paragraph",
                Block::Image(_) => "image",
                Block::Table(_) => "table",
                Block::Columns(_) => "columns",
            })
            .collect();
        assert_eq!(kinds, ["paragraph", "image", "table", "columns"]);
        assert_eq!(document.paragraph_texts(), ["段落"]);
    }

    #[test]
    fn paragraph_text_joins_spans() {
        let paragraph = RichParagraph::new(vec![Span::new("学号："), Span::new("42").bold()]);
        assert_eq!(paragraph.text(), "学号：42");
    }
}
