//! Font discovery and loading.
//!
//! Reports mix Latin and Chinese text, so three families are loaded: a Latin face for ASCII and
//! other western text, a serif East-Asian face for body text and a sans-serif East-Asian face for
//! headings. Each family needs `<Family>-Regular.ttf` and `<Family>-Bold.ttf`; italic files are
//! optional and fall back to the upright ones.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{Font, FontData, FontFamily};
use genpdf::Document;
use log::{debug, warn};

/// Latin face, metrically compatible with Times New Roman.
pub const LATIN_FAMILY_NAME: &str = "LiberationSerif";
/// East-Asian body face (宋体-like).
pub const BODY_FAMILY_NAME: &str = "NotoSerifSC";
/// East-Asian heading face (黑体-like).
pub const HEADING_FAMILY_NAME: &str = "NotoSansSC";

/// Environment variable that points at a fonts directory.
pub const FONTS_DIR_ENV: &str = "LS_REPORT_FONTS_DIR";

const FAMILY_NAMES: [&str; 3] = [LATIN_FAMILY_NAME, BODY_FAMILY_NAME, HEADING_FAMILY_NAME];
const REQUIRED_STYLES: [&str; 2] = ["Regular", "Bold"];

fn font_file_name(family: &str, style: &str) -> String {
    format!("{family}-{style}.ttf")
}

fn font_directory_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.iter().any(|existing| existing == &candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(dir) = explicit {
        push(dir.to_path_buf());
    }

    if let Some(dir) = env::var_os(FONTS_DIR_ENV) {
        if !dir.is_empty() {
            push(PathBuf::from(dir));
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }

    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

    candidates
}

fn missing_font_files(path: &Path) -> Vec<String> {
    FAMILY_NAMES
        .iter()
        .flat_map(|family| {
            REQUIRED_STYLES
                .iter()
                .map(move |style| font_file_name(family, style))
        })
        .filter(|name| !path.join(name).is_file())
        .collect()
}

/// Returns the first candidate directory holding every required font file.
///
/// Candidates are, in order: `explicit`, `$LS_REPORT_FONTS_DIR`, `assets/fonts` next to the
/// executable, and `assets/fonts` in the crate root.
pub fn resolve_font_directory(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(explicit) {
        let exists = candidate.is_dir();
        let missing = if exists {
            missing_font_files(&candidate)
        } else {
            Vec::new()
        };

        if exists && missing.is_empty() {
            debug!("Using fonts from {}", candidate.display());
            return Ok(candidate);
        }

        let reason = if !exists {
            format!("directory missing at {}", candidate.display())
        } else {
            format!("missing files [{}]", missing.join(", "))
        };
        debug!("Font directory candidate rejected: {reason}");
        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    let summary = if attempts.is_empty() {
        "no search paths were available".to_owned()
    } else {
        attempts.join(", ")
    };

    Err(Error::new(
        format!(
            "Unable to locate the report fonts. Checked: {summary}. Pass --fonts-dir or set {FONTS_DIR_ENV}."
        ),
        io::Error::new(io::ErrorKind::NotFound, "fonts directory not found"),
    ))
}

/// Reports whether every required font file can be found.
pub fn fonts_available(explicit: Option<&Path>) -> bool {
    resolve_font_directory(explicit).is_ok()
}

fn read_font(directory: &Path, family: &str, style: &str) -> Result<Vec<u8>, Error> {
    let path = directory.join(font_file_name(family, style));
    fs::read(&path).map_err(|err| {
        Error::new(
            format!("Failed to read font file {}: {}", path.display(), err),
            err,
        )
    })
}

fn load_family(directory: &Path, family: &str) -> Result<(FontFamily<FontData>, Vec<u8>), Error> {
    let regular_bytes = read_font(directory, family, "Regular")?;
    let regular = FontData::new(regular_bytes.clone(), None)?;
    let bold = FontData::new(read_font(directory, family, "Bold")?, None)?;

    let italic_path = directory.join(font_file_name(family, "Italic"));
    let italic = if italic_path.is_file() {
        FontData::load(&italic_path, None)?
    } else {
        regular.clone()
    };
    let bold_italic_path = directory.join(font_file_name(family, "BoldItalic"));
    let bold_italic = if bold_italic_path.is_file() {
        FontData::load(&bold_italic_path, None)?
    } else {
        bold.clone()
    };

    Ok((
        FontFamily {
            regular,
            bold,
            italic,
            bold_italic,
        },
        regular_bytes,
    ))
}

/// The three font families of a report, loaded once per run.
///
/// Every document gets its own copy of the font data, since a `genpdf` document owns its font
/// cache.
// TODO: subset the East-Asian faces; genpdf 0.2 embeds every cached face whole, which makes
// each report as large as the CJK font files.
pub struct FontSet {
    latin: FontFamily<FontData>,
    body: FontFamily<FontData>,
    heading: FontFamily<FontData>,
    body_regular: Vec<u8>,
}

impl FontSet {
    /// Finds and loads all families; see [`resolve_font_directory`] for the search order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let directory = resolve_font_directory(explicit)?;
        if let Some(dir) = explicit {
            if dir != directory {
                warn!(
                    "Fonts missing from {}; falling back to {}",
                    dir.display(),
                    directory.display()
                );
            }
        }
        Self::load_from(&directory)
    }

    /// Loads all families from `directory` without searching.
    pub fn load_from(directory: &Path) -> Result<Self, Error> {
        let (latin, _) = load_family(directory, LATIN_FAMILY_NAME)?;
        let (body, body_regular) = load_family(directory, BODY_FAMILY_NAME)?;
        let (heading, _) = load_family(directory, HEADING_FAMILY_NAME)?;
        Ok(Self {
            latin,
            body,
            heading,
            body_regular,
        })
    }

    /// Raw bytes of the regular East-Asian body face, used for chart text.
    pub fn body_regular_bytes(&self) -> &[u8] {
        &self.body_regular
    }

    /// Creates a document whose default family is the Latin face, with the East-Asian faces
    /// added to its font cache.
    pub fn new_document(&self) -> (Document, InstalledFonts) {
        let mut document = Document::new(self.latin.clone());
        let latin = document.font_cache().default_font_family();
        let body = document.add_font_family(self.body.clone());
        let heading = document.add_font_family(self.heading.clone());
        (
            document,
            InstalledFonts {
                latin,
                body,
                heading,
            },
        )
    }
}

/// Font handles valid for one document's font cache.
#[derive(Clone, Copy, Debug)]
pub struct InstalledFonts {
    pub latin: FontFamily<Font>,
    pub body: FontFamily<Font>,
    pub heading: FontFamily<Font>,
}
