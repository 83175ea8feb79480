//! Layout elements built on top of `genpdf` primitives.
//!
//! `genpdf`'s own paragraph only breaks lines at whitespace and its image element ignores the
//! space left on the page. Reports need Chinese text that wraps between ideographs, images sized
//! in millimetres, bordered tables with merged cells and side-by-side columns, so those live here.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use image::GenericImageView;

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::fonts::FontCache;
use genpdf::style::{Style, StyledString};
use genpdf::{render, Alignment, Context, Element, Margins, Mm, Position, RenderResult, Scale, Size};

use crate::model::VerticalAlignment;
use crate::richtext::is_east_asian;

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const DEFAULT_CELL_PADDING_MM: (f64, f64) = (0.8, 1.9);

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn zero() -> Mm {
    Mm::default()
}

fn is_closing_punctuation(c: char) -> bool {
    matches!(
        c,
        '，' | '。' | '、' | '；' | '：' | '！' | '？' | '）' | '」' | '』' | '》' | '】' | '…' | '’' | '”'
    )
}

fn is_opening_punctuation(c: char) -> bool {
    matches!(c, '（' | '「' | '『' | '《' | '【' | '‘' | '“')
}

#[derive(Clone, Debug, PartialEq)]
struct Fragment {
    text: String,
    style: Style,
}

impl Fragment {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

fn append_fragment(fragments: &mut Vec<Fragment>, fragment: Fragment) {
    match fragments.last_mut() {
        Some(last) if last.style == fragment.style => last.text.push_str(&fragment.text),
        _ => fragments.push(fragment),
    }
}

/// Unbreakable unit of a paragraph, or the space between two of them.
#[derive(Clone, Debug, PartialEq)]
enum Item {
    Atom(Vec<Fragment>),
    Space(Fragment),
}

fn glue_onto_last(items: &mut [Item], fragment: Fragment) -> Option<Fragment> {
    match items.last_mut() {
        Some(Item::Atom(fragments)) => {
            append_fragment(fragments, fragment);
            None
        }
        _ => Some(fragment),
    }
}

/// Splits styled text into line-breaking items.
///
/// Every East-Asian character is its own atom and Latin words are atoms. Closing punctuation
/// sticks to the atom before it and opening punctuation to the atom after it, so neither can start
/// or end a line respectively.
fn split_items(strings: &[StyledString]) -> Vec<Item> {
    let mut items: Vec<Item> = Vec::new();
    let mut word: Vec<Fragment> = Vec::new();
    let mut glue_next = false;

    fn flush_word(items: &mut Vec<Item>, word: &mut Vec<Fragment>, glue_next: &mut bool) {
        if word.is_empty() {
            return;
        }
        let fragments = std::mem::take(word);
        if std::mem::take(glue_next) {
            if let Some(Item::Atom(last)) = items.last_mut() {
                for fragment in fragments {
                    append_fragment(last, fragment);
                }
                return;
            }
        }
        items.push(Item::Atom(fragments));
    }

    for string in strings {
        let style = string.style;
        for c in string.s.chars() {
            if c.is_whitespace() {
                flush_word(&mut items, &mut word, &mut glue_next);
                glue_next = false;
                if !matches!(items.last(), Some(Item::Space(_))) {
                    items.push(Item::Space(Fragment::new(" ", style)));
                }
            } else if is_east_asian(c) {
                flush_word(&mut items, &mut word, &mut glue_next);
                let fragment = Fragment::new(c, style);
                let unglued = if is_closing_punctuation(c) || glue_next {
                    glue_onto_last(&mut items, fragment)
                } else {
                    Some(fragment)
                };
                if let Some(fragment) = unglued {
                    items.push(Item::Atom(vec![fragment]));
                }
                glue_next = is_opening_punctuation(c);
            } else {
                append_fragment(&mut word, Fragment::new(c, style));
            }
        }
    }
    flush_word(&mut items, &mut word, &mut glue_next);
    items
}

#[derive(Clone, Debug)]
struct Line {
    fragments: Vec<Fragment>,
    indent: Mm,
    width: Mm,
    height: Mm,
    baseline_style: Style,
}

struct LineBreaker<'f> {
    font_cache: &'f FontCache,
    base: Style,
    width: Mm,
    first_line_indent: Mm,
    lines: Vec<Line>,
    current: Vec<Fragment>,
    current_width: Mm,
    pending_space: Option<(Fragment, Mm)>,
}

impl<'f> LineBreaker<'f> {
    fn new(font_cache: &'f FontCache, base: Style, width: Mm, first_line_indent: Mm) -> Self {
        Self {
            font_cache,
            base,
            width,
            first_line_indent,
            lines: Vec::new(),
            current: Vec::new(),
            current_width: zero(),
            pending_space: None,
        }
    }

    fn indent(&self) -> Mm {
        if self.lines.is_empty() {
            self.first_line_indent
        } else {
            zero()
        }
    }

    fn available(&self) -> Mm {
        self.width - self.indent()
    }

    fn fragment_width(&self, fragment: &Fragment) -> Mm {
        self.base
            .and(fragment.style)
            .str_width(self.font_cache, &fragment.text)
    }

    fn push_space(&mut self, fragment: Fragment) {
        if !self.current.is_empty() && self.pending_space.is_none() {
            let width = self.fragment_width(&fragment);
            self.pending_space = Some((fragment, width));
        }
    }

    fn push_atom(&mut self, fragments: Vec<Fragment>) {
        let width: Mm = fragments.iter().map(|f| self.fragment_width(f)).sum();
        let chars: usize = fragments.iter().map(|f| f.text.chars().count()).sum();

        if width > self.available() && chars > 1 {
            // wider than a whole line: break between characters
            for fragment in fragments {
                for c in fragment.text.chars() {
                    self.push_atom(vec![Fragment::new(c, fragment.style)]);
                }
            }
            return;
        }

        let space_width = self
            .pending_space
            .as_ref()
            .map(|(_, width)| *width)
            .unwrap_or_default();
        if !self.current.is_empty() && self.current_width + space_width + width > self.available() {
            self.finish_line();
        }

        if let Some((space, space_width)) = self.pending_space.take() {
            append_fragment(&mut self.current, space);
            self.current_width += space_width;
        }
        for fragment in fragments {
            append_fragment(&mut self.current, fragment);
        }
        self.current_width += width;
    }

    fn finish_line(&mut self) {
        let fragments = std::mem::take(&mut self.current);
        let mut height = zero();
        let mut glyph_height = zero();
        let mut baseline_style = self.base;
        for fragment in &fragments {
            let style = self.base.and(fragment.style);
            height = height.max(style.line_height(self.font_cache));
            let glyph = style.font(self.font_cache).glyph_height(style.font_size());
            if glyph > glyph_height {
                glyph_height = glyph;
                baseline_style = style;
            }
        }
        let indent = self.indent();
        self.lines.push(Line {
            fragments,
            indent,
            width: self.current_width,
            height,
            baseline_style,
        });
        self.current_width = zero();
        self.pending_space = None;
    }

    fn finish(mut self) -> Vec<Line> {
        if !self.current.is_empty() {
            self.finish_line();
        }
        self.lines
    }
}

/// A paragraph that wraps between East-Asian characters and at whitespace in Latin text.
///
/// Lines are laid out on the first render for the width of the area it receives, then printed
/// line by line; a paragraph that does not fit continues on the next page.
pub struct FlowText {
    items: Vec<Item>,
    alignment: Alignment,
    first_line_indent: Mm,
    lines: Vec<Line>,
    laid_out_width: Option<Mm>,
    next_line: usize,
}

impl FlowText {
    pub fn new(strings: Vec<StyledString>) -> Self {
        Self {
            items: split_items(&strings),
            alignment: Alignment::Left,
            first_line_indent: zero(),
            lines: Vec::new(),
            laid_out_width: None,
            next_line: 0,
        }
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.set_alignment(alignment);
        self
    }

    pub fn set_first_line_indent(&mut self, indent: Mm) {
        self.first_line_indent = indent;
    }

    pub fn with_first_line_indent(mut self, indent: Mm) -> Self {
        self.set_first_line_indent(indent);
        self
    }

    fn ensure_layout(&mut self, font_cache: &FontCache, style: Style, width: Mm) {
        let stale = self.next_line == 0 && self.laid_out_width != Some(width);
        if self.laid_out_width.is_some() && !stale {
            return;
        }
        let mut breaker = LineBreaker::new(font_cache, style, width, self.first_line_indent);
        for item in &self.items {
            match item {
                Item::Atom(fragments) => breaker.push_atom(fragments.clone()),
                Item::Space(fragment) => breaker.push_space(fragment.clone()),
            }
        }
        self.lines = breaker.finish();
        self.laid_out_width = Some(width);
    }

    /// Total height of the paragraph when laid out at `width`.
    pub fn measure(&mut self, font_cache: &FontCache, style: Style, width: Mm) -> Mm {
        self.ensure_layout(font_cache, style, width);
        self.lines.iter().map(|line| line.height).sum()
    }
}

impl Element for FlowText {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let width = area.size().width;
        self.ensure_layout(&context.font_cache, style, width);

        let mut result = RenderResult::default();
        let mut y = zero();
        let mut index = self.next_line;
        while let Some(line) = self.lines.get(index) {
            if y + line.height > area.size().height {
                break;
            }
            let free = (width - line.indent - line.width).max(zero());
            let x = line.indent
                + match self.alignment {
                    Alignment::Left => zero(),
                    Alignment::Center => free / 2.0,
                    Alignment::Right => free,
                };
            let Some(mut section) =
                area.text_section(&context.font_cache, Position::new(x, y), line.baseline_style)
            else {
                break;
            };
            for fragment in &line.fragments {
                section.print_str(&fragment.text, style.and(fragment.style))?;
            }
            y += line.height;
            index += 1;
        }

        self.next_line = index;
        result.has_more = index < self.lines.len();
        result.size = Size::new(if y > zero() { width } else { zero() }, y);
        Ok(result)
    }
}

/// Loads an image from in-memory bytes using the [`image`] crate with descriptive errors.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<image::DynamicImage, Error> {
    image::load_from_memory(bytes.as_ref()).context("Failed to decode image from provided bytes")
}

fn natural_image_size(image: &image::DynamicImage) -> (f64, f64) {
    let (px_width, px_height) = image.dimensions();
    (
        MM_PER_INCH * f64::from(px_width) / DEFAULT_IMAGE_DPI,
        MM_PER_INCH * f64::from(px_height) / DEFAULT_IMAGE_DPI,
    )
}

/// A raster image displayed at a requested size in millimetres.
///
/// Any alpha channel is dropped, since `genpdf` cannot embed it. An image wider than its area is
/// shrunk to fit; one taller than the remaining page moves to the next page.
pub struct SizedImage {
    image: Image,
    natural_mm: (f64, f64),
    width: Option<Mm>,
    height: Option<Mm>,
    deferred: bool,
}

impl SizedImage {
    pub fn from_dynamic_image(image: image::DynamicImage) -> Result<Self, Error> {
        let natural_mm = natural_image_size(&image);
        let rgb = image::DynamicImage::ImageRgb8(image.to_rgb8());
        Ok(Self {
            image: Image::from_dynamic_image(rgb)?,
            natural_mm,
            width: None,
            height: None,
            deferred: false,
        })
    }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, Error> {
        Self::from_dynamic_image(decode_image_from_bytes(bytes)?)
    }

    pub fn with_width(mut self, width: impl Into<Option<Mm>>) -> Self {
        self.width = width.into();
        self
    }

    pub fn with_height(mut self, height: impl Into<Option<Mm>>) -> Self {
        self.height = height.into();
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.image.set_alignment(alignment);
        self
    }

    /// Display size in millimetres, limited to `max_width`.
    pub fn display_size(&self, max_width: Mm) -> (f64, f64) {
        let (natural_width, natural_height) = self.natural_mm;
        let aspect = if natural_width > f64::EPSILON {
            natural_height / natural_width
        } else {
            1.0
        };
        let (mut width, mut height) = match (self.width.map(mm_to_f64), self.height.map(mm_to_f64))
        {
            (Some(width), Some(height)) => (width, height),
            (Some(width), None) => (width, width * aspect),
            (None, Some(height)) if aspect > f64::EPSILON => (height / aspect, height),
            (None, Some(height)) => (natural_width, height),
            (None, None) => (natural_width, natural_height),
        };
        let max_width = mm_to_f64(max_width);
        if width > max_width && width > f64::EPSILON {
            let factor = max_width / width;
            width *= factor;
            height *= factor;
        }
        (width, height)
    }
}

impl Element for SizedImage {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let (width, height) = self.display_size(area.size().width);
        if mm_from_f64(height) > area.size().height && !self.deferred {
            self.deferred = true;
            return Ok(RenderResult {
                size: Size::default(),
                has_more: true,
            });
        }

        let (natural_width, natural_height) = self.natural_mm;
        let scale_x = if natural_width > f64::EPSILON {
            width / natural_width
        } else {
            1.0
        };
        let scale_y = if natural_height > f64::EPSILON {
            height / natural_height
        } else {
            1.0
        };
        self.image.set_scale(Scale::new(scale_x, scale_y));
        self.image.render(context, area, style)
    }
}

/// One cell of a [`GridTable`].
pub struct GridCell {
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub column_span: usize,
    pub content: FlowText,
    pub vertical_alignment: VerticalAlignment,
}

/// A bordered table with fixed column widths and merged cells.
///
/// Rows joined by a vertical merge form a band that always stays on one page. Columns are
/// scaled down proportionally when the table is wider than its area.
pub struct GridTable {
    rows: usize,
    column_widths_mm: Vec<f64>,
    cells: Vec<GridCell>,
    /// Vertical and horizontal cell padding.
    padding: (Mm, Mm),
    next_band: usize,
    deferred: bool,
}

impl GridTable {
    pub fn new(rows: usize, column_widths_mm: Vec<f64>, mut cells: Vec<GridCell>) -> Self {
        cells.sort_by_key(|cell| (cell.row, cell.column));
        let (vertical, horizontal) = DEFAULT_CELL_PADDING_MM;
        Self {
            rows,
            column_widths_mm,
            cells,
            padding: (mm_from_f64(vertical), mm_from_f64(horizontal)),
            next_band: 0,
            deferred: false,
        }
    }

    fn column_widths(&self, available: Mm) -> Vec<Mm> {
        let total: f64 = self.column_widths_mm.iter().sum();
        let available = mm_to_f64(available);
        let factor = if total > available && total > f64::EPSILON {
            available / total
        } else {
            1.0
        };
        self.column_widths_mm
            .iter()
            .map(|width| mm_from_f64(width * factor))
            .collect()
    }

    fn span_width(widths: &[Mm], start: usize, span: usize) -> Mm {
        widths.iter().skip(start).take(span).copied().sum()
    }

    fn row_heights(&mut self, font_cache: &FontCache, style: Style, widths: &[Mm]) -> Vec<Mm> {
        let (vertical, horizontal) = self.padding;
        let mut heights = vec![zero(); self.rows];
        let mut spanning = Vec::new();

        for (index, cell) in self.cells.iter_mut().enumerate() {
            let inner = Self::span_width(widths, cell.column, cell.column_span) - horizontal * 2.0;
            let needed =
                cell.content.measure(font_cache, style, inner.max(zero())) + vertical * 2.0;
            if cell.row_span == 1 {
                heights[cell.row] = heights[cell.row].max(needed);
            } else {
                spanning.push((index, needed));
            }
        }

        for (index, needed) in spanning {
            let cell = &self.cells[index];
            let end = cell.row + cell.row_span;
            let have: Mm = heights[cell.row..end].iter().copied().sum();
            if needed > have {
                heights[end - 1] += needed - have;
            }
        }
        heights
    }

    /// Row ranges that must stay together.
    fn bands(&self) -> Vec<(usize, usize)> {
        let mut bands = Vec::new();
        let mut start = 0;
        while start < self.rows {
            let mut end = start + 1;
            let mut row = start;
            while row < end {
                for cell in self.cells.iter().filter(|cell| cell.row == row) {
                    end = end.max(cell.row + cell.row_span);
                }
                row += 1;
            }
            bands.push((start, end.min(self.rows)));
            start = end;
        }
        bands
    }

    fn draw_border(area: &render::Area<'_>, origin: Position, size: Size) {
        let top_left = origin;
        let top_right = Position::new(origin.x + size.width, origin.y);
        let bottom_right = Position::new(origin.x + size.width, origin.y + size.height);
        let bottom_left = Position::new(origin.x, origin.y + size.height);
        area.draw_line(
            vec![top_left, top_right, bottom_right, bottom_left, top_left],
            Style::new(),
        );
    }
}

impl Element for GridTable {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let widths = self.column_widths(area.size().width);
        let heights = self.row_heights(&context.font_cache, style, &widths);
        let bands = self.bands();
        let table_width: Mm = widths.iter().copied().sum();

        let mut result = RenderResult::default();
        let mut y = zero();
        let mut band_index = self.next_band;
        while let Some(&(start, end)) = bands.get(band_index) {
            let band_height: Mm = heights[start..end].iter().copied().sum();
            if y + band_height > area.size().height {
                // a band taller than a fresh page is drawn anyway and overflows
                if y > zero() || !self.deferred {
                    self.deferred = true;
                    break;
                }
            }

            let (vertical, horizontal) = self.padding;
            for cell in self
                .cells
                .iter_mut()
                .filter(|cell| (start..end).contains(&cell.row))
            {
                let x = Self::span_width(&widths, 0, cell.column);
                let cell_y = y + heights[start..cell.row].iter().copied().sum::<Mm>();
                let size = Size::new(
                    Self::span_width(&widths, cell.column, cell.column_span),
                    heights[cell.row..cell.row + cell.row_span]
                        .iter()
                        .copied()
                        .sum::<Mm>(),
                );
                Self::draw_border(&area, Position::new(x, cell_y), size);

                let mut inner = area.clone();
                inner.add_offset(Position::new(x, cell_y));
                inner.set_size(size);
                inner.add_margins(Margins::vh(vertical, horizontal));

                let content_width = inner.size().width.max(zero());
                let content_height =
                    cell.content.measure(&context.font_cache, style, content_width);
                if cell.vertical_alignment == VerticalAlignment::Center {
                    let slack = (inner.size().height - content_height).max(zero());
                    inner.add_offset(Position::new(0, slack / 2.0));
                }
                // the row height already fits the content, so nothing carries over
                cell.content.render(context, inner, style)?;
            }

            y += band_height;
            band_index += 1;
            self.deferred = false;
        }

        self.next_band = band_index;
        result.has_more = band_index < bands.len();
        result.size = Size::new(if y > zero() { table_width } else { zero() }, y);
        Ok(result)
    }
}

/// Equal-width columns laid out side by side, separated by a gap.
pub struct ColumnLayout {
    columns: Vec<Box<dyn Element>>,
    finished: Vec<bool>,
    gap: Mm,
}

impl ColumnLayout {
    pub fn new(gap: Mm) -> Self {
        Self {
            columns: Vec::new(),
            finished: Vec::new(),
            gap,
        }
    }

    pub fn push<E: Element + 'static>(&mut self, column: E) {
        self.columns.push(Box::new(column));
        self.finished.push(false);
    }
}

impl Element for ColumnLayout {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.columns.is_empty() {
            return Ok(result);
        }

        let count = self.columns.len();
        let gaps = self.gap * (count - 1) as f64;
        let width = ((area.size().width - gaps) / count as f64).max(zero());
        let mut x = zero();
        for (column, finished) in self.columns.iter_mut().zip(self.finished.iter_mut()) {
            if !*finished {
                let mut column_area = area.clone();
                column_area.add_offset(Position::new(x, 0));
                column_area.set_width(width);
                let column_result = column.render(context, column_area, style)?;
                result.size.height = result.size.height.max(column_result.size.height);
                result.has_more |= column_result.has_more;
                *finished = !column_result.has_more;
            }
            x += width + self.gap;
        }
        if result.size.height > zero() {
            result.size.width = area.size().width;
        }
        Ok(result)
    }
}

/// Page number of the page currently being rendered, advanced by the page decorator.
pub type PageCounter = Rc<Cell<usize>>;

/// Records the page on which the wrapped element starts.
pub struct PageMarker<E> {
    element: E,
    counter: PageCounter,
    slot: usize,
    pages: Rc<RefCell<Vec<Option<usize>>>>,
}

impl<E: Element> PageMarker<E> {
    /// Wraps `element`; its first page lands in `pages[slot]`.
    pub fn new(
        element: E,
        counter: PageCounter,
        pages: Rc<RefCell<Vec<Option<usize>>>>,
        slot: usize,
    ) -> Self {
        Self {
            element,
            counter,
            slot,
            pages,
        }
    }
}

impl<E: Element> Element for PageMarker<E> {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let result = self.element.render(context, area, style)?;
        if result.size.height > zero() {
            let mut pages = self.pages.borrow_mut();
            if let Some(entry) = pages.get_mut(self.slot) {
                entry.get_or_insert(self.counter.get());
            }
        }
        Ok(result)
    }
}
