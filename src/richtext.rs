//! Styled text fragments with script-aware font selection.
//!
//! A [`Span`] describes a piece of text with inline styling (bold, color, size). It does
//! not name a concrete font: when a span is resolved against a document's [`InstalledFonts`], each
//! maximal run of East-Asian characters is set in the East-Asian face selected by the span's
//! [`Typeface`] while everything else uses the Latin face. This is the same split word processors
//! make with their separate East-Asian font slot.

use genpdf::style::{Color, Style, StyledString};

use crate::fonts::InstalledFonts;

/// Which East-Asian face a span uses for its Chinese characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Typeface {
    /// Serif body face.
    #[default]
    Body,
    /// Sans-serif heading face.
    Heading,
}

/// A slice of text together with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    color: Option<Color>,
    size: Option<u8>,
    typeface: Typeface,
}

impl Span {
    /// Creates a new span with the provided text and no styles applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Font size in points, if the span overrides the document size.
    pub fn size(&self) -> Option<u8> {
        self.size
    }

    pub fn typeface(&self) -> Typeface {
        self.typeface
    }

    /// Sets the bold flag and returns the updated span.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Sets the span color and returns the updated span.
    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = typeface;
        self
    }

    /// Convenience shorthand that marks the span as bold.
    pub fn bold(self) -> Self {
        self.with_bold(true)
    }

    /// Convenience shorthand that assigns a color to the span.
    pub fn colored(self, color: Color) -> Self {
        self.with_color(Some(color))
    }

    /// Shorthand for the sans-serif heading face.
    pub fn heading_face(self) -> Self {
        self.with_typeface(Typeface::Heading)
    }

    fn to_style(&self) -> Style {
        let mut style = Style::new();
        if let Some(color) = self.color {
            style.set_color(color);
        }
        if let Some(size) = self.size {
            style.set_font_size(size);
        }
        if self.bold {
            style.set_bold();
        }
        style
    }

    /// Splits the span into styled strings, one per script run, each bound to a font family of
    /// `fonts`.
    pub fn resolve(&self, fonts: &InstalledFonts) -> Vec<StyledString> {
        let east_asian = match self.typeface {
            Typeface::Body => fonts.body,
            Typeface::Heading => fonts.heading,
        };
        let base = self.to_style();
        script_runs(&self.text)
            .into_iter()
            .map(|(script, text)| {
                let family = match script {
                    Script::Latin => fonts.latin,
                    Script::EastAsian => east_asian,
                };
                StyledString::new(text, base.with_font_family(family))
            })
            .collect()
    }
}

impl From<&str> for Span {
    fn from(text: &str) -> Self {
        Span::new(text)
    }
}

impl From<String> for Span {
    fn from(text: String) -> Self {
        Span::new(text)
    }
}

/// Resolves a sequence of spans into styled strings for one document.
pub fn resolve_spans<'a, I>(spans: I, fonts: &InstalledFonts) -> Vec<StyledString>
where
    I: IntoIterator<Item = &'a Span>,
{
    spans
        .into_iter()
        .flat_map(|span| span.resolve(fonts))
        .collect()
}

/// Writing system class used to pick a font slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Script {
    Latin,
    EastAsian,
}

/// Whether `c` belongs in the East-Asian font slot: CJK ideographs, kana, hangul, CJK symbols
/// and punctuation, full-width forms and a few typographic marks used in Chinese text.
pub fn is_east_asian(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x11FF
            | 0x2E80..=0x2FDF
            | 0x2FF0..=0x30FF
            | 0x3100..=0x31FF
            | 0x3200..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA960..=0xA97F
            | 0xAC00..=0xD7AF
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFFEF
            | 0x20000..=0x3FFFF
    ) || matches!(c, '•' | '·' | '‘' | '’' | '“' | '”' | '…' | '—' | '⟵' | '⟶')
}

/// Splits `text` into maximal single-script runs. Whitespace joins the run before it; leading
/// whitespace joins the first run.
pub fn script_runs(text: &str) -> Vec<(Script, &str)> {
    let mut runs: Vec<(Script, &str)> = Vec::new();
    let mut current: Option<Script> = None;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        let script = if is_east_asian(c) {
            Script::EastAsian
        } else {
            Script::Latin
        };
        match current {
            None => current = Some(script),
            Some(active) if active != script => {
                runs.push((active, &text[start..index]));
                start = index;
                current = Some(script);
            }
            Some(_) => {}
        }
    }

    if start < text.len() {
        runs.push((current.unwrap_or(Script::Latin), &text[start..]));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_builder_sets_flags() {
        let span = Span::new("标题")
            .bold()
            .with_size(15)
            .colored(Color::Rgb(1, 2, 3))
            .heading_face();
        assert!(span.is_bold());
        assert_eq!(span.size(), Some(15));
        assert_eq!(span.color(), Some(Color::Rgb(1, 2, 3)));
        assert_eq!(span.typeface(), Typeface::Heading);
        assert_eq!(span.text(), "标题");
    }

    #[test]
    fn classifies_common_characters() {
        assert!(is_east_asian('学'));
        assert!(is_east_asian('，'));
        assert!(is_east_asian('（'));
        assert!(is_east_asian('。'));
        assert!(is_east_asian('•'));
        assert!(!is_east_asian('A'));
        assert!(!is_east_asian('1'));
        assert!(!is_east_asian('-'));
    }

    #[test]
    fn splits_mixed_text_into_runs() {
        let runs = script_runs("本报告基于 Index of Learning Styles 问卷");
        assert_eq!(
            runs,
            vec![
                (Script::EastAsian, "本报告基于 "),
                (Script::Latin, "Index of Learning Styles "),
                (Script::EastAsian, "问卷"),
            ]
        );
    }

    #[test]
    fn digits_next_to_ideographs_switch_script() {
        let runs = script_runs("1 总览");
        assert_eq!(
            runs,
            vec![(Script::Latin, "1 "), (Script::EastAsian, "总览")]
        );
    }

    #[test]
    fn leading_whitespace_joins_first_run() {
        assert_eq!(script_runs("  学号"), vec![(Script::EastAsian, "  学号")]);
        assert_eq!(script_runs("   "), vec![(Script::Latin, "   ")]);
        assert!(script_runs("").is_empty());
    }
}
