//! Lays out a [`ReportDocument`] as a PDF with `genpdf`.

use std::cell::RefCell;
use std::rc::Rc;

use genpdf::elements::{Break, LinearLayout};
use genpdf::error::Error;
use genpdf::style::{self, Color};
use genpdf::{Alignment, Document, Margins, PageDecorator, Size};
use log::debug;

use crate::config::LayoutOptions;
use crate::elements::{
    mm_from_f64, ColumnLayout, FlowText, GridCell, GridTable, PageCounter, PageMarker, SizedImage,
};
use crate::error::Result;
use crate::fonts::{FontSet, InstalledFonts};
use crate::model::{Block, Heading, HorizontalAlignment, ReportDocument, RichParagraph, TableBlock};
use crate::richtext::{resolve_spans, Span};

/// Gap between consecutive blocks, in body lines.
const BLOCK_SPACING_LINES: f64 = 0.4;
/// Gap above a heading, in body lines.
const HEADING_SPACING_LINES: f64 = 0.8;

const TITLE_COLOR: Color = Color::Rgb(23, 54, 93);
const HEADING_COLOR: Color = Color::Rgb(54, 95, 145);

/// Builder for `genpdf::Document` instances laid out for reports.
#[derive(Default)]
pub struct DocumentBuilder {
    paper_size: Option<Size>,
    margins: Option<Margins>,
    title: Option<String>,
    font_size: Option<u8>,
    line_spacing: Option<f64>,
    page_counter: PageCounter,
}

impl DocumentBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies paper size, margins and base typography from `layout`.
    pub fn from_layout(layout: &LayoutOptions) -> Self {
        let (width, height) = layout.paper_size_mm;
        let margins = layout.margins;
        Self::new()
            .with_paper_size(Size::new(mm_from_f64(width), mm_from_f64(height)))
            .with_margins(Margins::trbl(
                mm_from_f64(margins.top),
                mm_from_f64(margins.right),
                mm_from_f64(margins.bottom),
                mm_from_f64(margins.left),
            ))
            .with_font_size(layout.font_size)
            .with_line_spacing(layout.line_spacing)
    }

    /// Sets the paper size used for newly created documents.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Sets the margins applied through the page decorator.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    /// Sets the title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f64) -> Self {
        self.line_spacing = Some(line_spacing);
        self
    }

    /// Counter holding the number of the page being rendered, shared with the page decorator.
    pub fn page_counter(&self) -> PageCounter {
        Rc::clone(&self.page_counter)
    }

    /// Builds a fully configured `genpdf::Document` instance.
    pub fn build(self, fonts: &FontSet) -> (Document, InstalledFonts) {
        let (mut document, installed) = fonts.new_document();

        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }
        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(font_size) = self.font_size {
            document.set_font_size(font_size);
        }
        if let Some(line_spacing) = self.line_spacing {
            document.set_line_spacing(line_spacing);
        }

        document.set_page_decorator(ConfiguredPageDecorator::new(self.margins, self.page_counter));
        (document, installed)
    }
}

/// Applies the page margins and keeps the shared page counter current.
struct ConfiguredPageDecorator {
    page: PageCounter,
    margins: Option<Margins>,
}

impl ConfiguredPageDecorator {
    fn new(margins: Option<Margins>, page: PageCounter) -> Self {
        page.set(0);
        Self { page, margins }
    }
}

impl PageDecorator for ConfiguredPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> std::result::Result<genpdf::render::Area<'a>, Error> {
        self.page.set(self.page.get() + 1);

        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }

        Ok(area)
    }
}

/// A heading together with the page it was laid out on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingPage {
    pub level: u8,
    pub text: String,
    /// 1-based page number, `None` if the heading was never rendered.
    pub page: Option<usize>,
}

/// Output of [`render_report`].
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub headings: Vec<HeadingPage>,
}

fn alignment(alignment: HorizontalAlignment) -> Alignment {
    match alignment {
        HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
        HorizontalAlignment::Right => Alignment::Right,
    }
}

fn heading_span(heading: &Heading) -> Span {
    let span = Span::new(heading.text()).bold().heading_face();
    match heading.level() {
        0 => span.with_size(20).colored(TITLE_COLOR),
        1 => span.with_size(15).colored(HEADING_COLOR),
        _ => span.with_size(13).colored(HEADING_COLOR),
    }
}

/// Turns model blocks into `genpdf` elements for one document.
struct BlockConverter {
    fonts: InstalledFonts,
    counter: PageCounter,
    pages: Rc<RefCell<Vec<Option<usize>>>>,
    headings: Vec<(u8, String)>,
}

impl BlockConverter {
    fn new(fonts: InstalledFonts, counter: PageCounter) -> Self {
        Self {
            fonts,
            counter,
            pages: Rc::new(RefCell::new(Vec::new())),
            headings: Vec::new(),
        }
    }

    fn paragraph(&self, paragraph: &RichParagraph) -> FlowText {
        FlowText::new(resolve_spans(paragraph.spans(), &self.fonts))
            .with_alignment(alignment(paragraph.alignment()))
            .with_first_line_indent(mm_from_f64(paragraph.first_line_indent_mm()))
    }

    fn table(&self, table: &TableBlock) -> GridTable {
        let cells = table
            .cells()
            .iter()
            .map(|cell| GridCell {
                row: cell.row(),
                column: cell.column(),
                row_span: cell.row_span(),
                column_span: cell.column_span(),
                content: self.paragraph(cell.content()),
                vertical_alignment: cell.vertical_alignment(),
            })
            .collect();
        GridTable::new(table.rows(), table.column_widths_mm().to_vec(), cells)
    }

    fn push_blocks(&mut self, layout: &mut LinearLayout, blocks: &[Block]) -> Result<()> {
        for (index, block) in blocks.iter().enumerate() {
            if index > 0 {
                let lines = match block {
                    Block::Heading(_) => HEADING_SPACING_LINES,
                    _ => BLOCK_SPACING_LINES,
                };
                layout.push(Break::new(lines));
            }
            self.push_block(layout, block)?;
        }
        Ok(())
    }

    fn push_block(&mut self, layout: &mut LinearLayout, block: &Block) -> Result<()> {
        match block {
            Block::Heading(heading) => {
                let text = FlowText::new(heading_span(heading).resolve(&self.fonts)).with_alignment(
                    if heading.level() == 0 {
                        Alignment::Center
                    } else {
                        Alignment::Left
                    },
                );
                let slot = self.headings.len();
                self.headings.push((heading.level(), heading.text().to_owned()));
                self.pages.borrow_mut().push(None);
                layout.push(PageMarker::new(
                    text,
                    Rc::clone(&self.counter),
                    Rc::clone(&self.pages),
                    slot,
                ));
            }
            Block::Paragraph(paragraph) => layout.push(self.paragraph(paragraph)),
            Block::Image(image) => {
                let element = SizedImage::from_bytes(image.bytes())?
                    .with_width(image.width_mm().map(mm_from_f64))
                    .with_height(image.height_mm().map(mm_from_f64))
                    .with_alignment(alignment(image.alignment()));
                layout.push(element);
            }
            Block::Table(table) => layout.push(self.table(table)),
            Block::Columns(columns) => {
                let mut element = ColumnLayout::new(mm_from_f64(columns.gap_mm()));
                for blocks in columns.columns() {
                    let mut column = LinearLayout::vertical();
                    self.push_blocks(&mut column, blocks)?;
                    element.push(column);
                }
                layout.push(element);
            }
        }
        Ok(())
    }

    fn finish(self) -> Vec<HeadingPage> {
        let pages = self.pages.borrow();
        self.headings
            .iter()
            .zip(pages.iter())
            .map(|((level, text), page)| HeadingPage {
                level: *level,
                text: text.clone(),
                page: *page,
            })
            .collect()
    }
}

/// Lays out and renders `document`, reporting the page of every heading.
///
/// With the `bookmarks` feature the level-1 headings also become PDF outline entries.
pub fn render_report(
    document: &ReportDocument,
    fonts: &FontSet,
    layout: &LayoutOptions,
) -> Result<RenderedReport> {
    let builder = DocumentBuilder::from_layout(layout).with_title(document.title());
    let counter = builder.page_counter();
    let (mut pdf, installed) = builder.build(fonts);

    let mut converter = BlockConverter::new(installed, Rc::clone(&counter));
    let mut root = LinearLayout::vertical();
    converter.push_blocks(&mut root, document.blocks())?;
    pdf.push(root);

    let mut bytes = Vec::new();
    pdf.render(&mut bytes)?;
    debug!(
        "Rendered {:?}: {} pages, {} bytes",
        document.title(),
        counter.get(),
        bytes.len()
    );

    let headings = converter.finish();

    #[cfg(feature = "bookmarks")]
    let bytes = {
        let targets: Vec<(&str, Option<usize>)> = headings
            .iter()
            .filter(|heading| heading.level == 1)
            .map(|heading| (heading.text.as_str(), heading.page))
            .collect();
        crate::bookmarks::apply_heading_bookmarks(&bytes, &targets)
            .map_err(crate::error::RenderError::from)?
    };

    Ok(RenderedReport { bytes, headings })
}

/// Lays out and renders `document` to PDF bytes.
pub fn render_pdf(
    document: &ReportDocument,
    fonts: &FontSet,
    layout: &LayoutOptions,
) -> Result<Vec<u8>> {
    render_report(document, fonts, layout).map(|rendered| rendered.bytes)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn decorator_resets_the_page_counter() {
        let counter: PageCounter = Rc::new(Cell::new(7));
        let decorator = ConfiguredPageDecorator::new(None, Rc::clone(&counter));
        assert_eq!(counter.get(), 0);
        drop(decorator);
    }

    #[test]
    fn headings_scale_with_level() {
        let title = heading_span(&Heading::new(0, "张三学习风格报告"));
        assert_eq!(title.size(), Some(20));
        assert!(title.is_bold());
        assert_eq!(heading_span(&Heading::new(1, "1 总览")).size(), Some(15));
        assert_eq!(heading_span(&Heading::new(1, "1 总览")).color(), Some(HEADING_COLOR));
    }

    #[test]
    fn layout_options_carry_into_builder() {
        let builder = DocumentBuilder::from_layout(&LayoutOptions::default());
        assert_eq!(builder.font_size, Some(11));
        assert_eq!(builder.paper_size, Some(Size::new(210, 297)));
        assert!(builder.margins.is_some());
    }
}
