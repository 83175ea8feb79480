//! Diverging bar chart of the per-pole magnitudes, rendered to PNG in memory.

use std::sync::OnceLock;

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};

use crate::config::ChartOptions;
use crate::dimension::{Dimension, Pole};
use crate::error::{RenderError, Result};
use crate::record::PoleMagnitudes;

/// Family name under which the chart face is registered with plotters.
pub const CHART_FONT_FAMILY: &str = "ls-report-cjk";

const LEFT_COLOR: RGBColor = RGBColor(135, 206, 235);
const RIGHT_COLOR: RGBColor = RGBColor(250, 128, 114);

const X_LIMIT: f64 = 12.0;
const Y_RANGE: (f64, f64) = (0.4, 4.6);
const BAR_HEIGHT: f64 = 0.8;
const LEFT_LABEL_X: f64 = -14.0;
const RIGHT_LABEL_X: f64 = 13.0;
const AXIS_LABEL: &str = "倾向性";

const LABEL_POINTS: f64 = 12.0;
const TICK_POINTS: f64 = 10.0;
const GUTTER_FRACTION: f64 = 0.105;

/// The face registered as [`CHART_FONT_FAMILY`], or why registration failed.
static FONT_REGISTRATION: OnceLock<std::result::Result<&'static [u8], String>> = OnceLock::new();

/// Registers `bytes` as [`CHART_FONT_FAMILY`].
///
/// plotters keeps one face per family for the whole process, so only the first call registers
/// anything. A later call with different bytes keeps the first face and logs a warning.
fn register_chart_font(bytes: &[u8]) -> Result<()> {
    let registered = FONT_REGISTRATION
        .get_or_init(|| {
            let bytes: &'static [u8] = Box::leak(bytes.to_vec().into_boxed_slice());
            register_font(CHART_FONT_FAMILY, FontStyle::Normal, bytes)
                .map(|()| bytes)
                .map_err(|_| "chart font is not a usable TrueType face".to_owned())
        })
        .clone()
        .map_err(RenderError::Chart)?;
    if registered != bytes {
        warn!(
            "Chart font already registered ({} bytes); ignoring a different face ({} bytes)",
            registered.len(),
            bytes.len()
        );
    }
    Ok(())
}

fn chart_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Chart(err.to_string())
}

/// Renders the dimension chart of one respondent.
#[derive(Debug)]
pub struct ChartGenerator {
    options: ChartOptions,
}

impl ChartGenerator {
    /// Creates a generator drawing its text with the font in `font_bytes`.
    ///
    /// The chart face is registered once per process. Generators created later all draw with
    /// the first face, even when given different `font_bytes`.
    pub fn new(options: ChartOptions, font_bytes: &[u8]) -> Result<Self> {
        register_chart_font(font_bytes)?;
        Ok(Self { options })
    }

    fn points_to_pixels(&self, points: f64) -> f64 {
        points * f64::from(self.options.dpi) / 72.0
    }

    /// Draws the chart and returns it as PNG bytes.
    ///
    /// Four rows from top to bottom, one per dimension. The left pole extends left of zero in
    /// sky blue, the right pole extends right in salmon, and pole names sit outside the axis.
    pub fn render(&self, magnitudes: &PoleMagnitudes) -> Result<Vec<u8>> {
        let (width, height) = self.options.pixel_size();
        let mut buffer = vec![255u8; width as usize * height as usize * 3];
        self.draw(magnitudes, &mut buffer, (width, height))?;

        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| RenderError::Chart("chart buffer size mismatch".to_owned()))?;
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(RenderError::from)?;
        debug!("Rendered {width}x{height} chart ({} bytes)", png.len());
        Ok(png)
    }

    fn draw(
        &self,
        magnitudes: &PoleMagnitudes,
        buffer: &mut [u8],
        size: (u32, u32),
    ) -> std::result::Result<(), RenderError> {
        let label_px = self.points_to_pixels(LABEL_POINTS);
        let tick_px = self.points_to_pixels(TICK_POINTS);
        let gutter = (f64::from(size.0) * GUTTER_FRACTION).round() as u32;

        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin_left(gutter)
            .margin_right(gutter)
            .margin_top((label_px * 0.5).round() as u32)
            .margin_bottom((label_px * 0.25).round() as u32)
            .x_label_area_size((tick_px + label_px * 1.8).round() as u32)
            .build_cartesian_2d(-X_LIMIT..X_LIMIT, Y_RANGE.0..Y_RANGE.1)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .disable_y_axis()
            .y_labels(0)
            .x_labels(5)
            .max_light_lines(0)
            .x_label_formatter(&|x| format!("{x:.0}"))
            .x_desc(AXIS_LABEL)
            .label_style((CHART_FONT_FAMILY, tick_px))
            .axis_desc_style((CHART_FONT_FAMILY, label_px))
            .draw()
            .map_err(chart_error)?;

        let label_style = TextStyle::from((CHART_FONT_FAMILY, label_px).into_font())
            .pos(Pos::new(HPos::Left, VPos::Center));

        for (index, dimension) in Dimension::ALL.into_iter().enumerate() {
            let y = 4.0 - index as f64;
            let (bottom, top) = (y - BAR_HEIGHT / 2.0, y + BAR_HEIGHT / 2.0);
            let left = f64::from(magnitudes.get(dimension, Pole::Left)).min(X_LIMIT);
            let right = f64::from(magnitudes.get(dimension, Pole::Right)).min(X_LIMIT);

            chart
                .draw_series([
                    Rectangle::new([(-left, bottom), (0.0, top)], LEFT_COLOR.filled()),
                    Rectangle::new([(0.0, bottom), (right, top)], RIGHT_COLOR.filled()),
                ])
                .map_err(chart_error)?;

            let profile = dimension.profile();
            for (x, text) in [
                (LEFT_LABEL_X, profile.left.label),
                (RIGHT_LABEL_X, profile.right.label),
            ] {
                let anchor = chart.backend_coord(&(x, y));
                root.draw(&Text::new(text, anchor, label_style.clone()))
                    .map_err(chart_error)?;
            }
        }

        root.present().map_err(chart_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontSet;

    fn generator() -> Option<ChartGenerator> {
        let fonts = match FontSet::load(None) {
            Ok(fonts) => fonts,
            Err(err) => {
                eprintln!("Skipping chart test: {err}");
                return None;
            }
        };
        let generator = ChartGenerator::new(ChartOptions::default(), fonts.body_regular_bytes());
        Some(generator.expect("chart"))
    }

    fn sample() -> PoleMagnitudes {
        PoleMagnitudes {
            active: 11,
            visual: 6,
            intuitive: 3,
            global: 9,
            ..PoleMagnitudes::default()
        }
    }

    #[test]
    fn chart_is_a_png_of_the_configured_size() {
        let Some(generator) = generator() else {
            return;
        };
        let png = generator.render(&sample()).expect("render");
        let decoded = image::load_from_memory(&png).expect("decode").to_rgb8();
        assert_eq!(decoded.dimensions(), (1050, 525));

        let colors: Vec<_> = decoded.pixels().map(|p| p.0).collect();
        assert!(colors.contains(&[135, 206, 235]));
        assert!(colors.contains(&[250, 128, 114]));
    }

    #[test]
    fn identical_magnitudes_give_identical_bytes() {
        let Some(generator) = generator() else {
            return;
        };
        let first = generator.render(&sample()).expect("render");
        let second = generator.render(&sample()).expect("render");
        assert_eq!(first, second);
        assert_ne!(first, generator.render(&PoleMagnitudes::default()).expect("render"));
    }

    #[test]
    fn later_faces_do_not_replace_the_first() {
        let Some(generator) = generator() else {
            return;
        };
        let first = match FONT_REGISTRATION.get() {
            Some(Ok(bytes)) => *bytes,
            other => panic!("unexpected registration {other:?}"),
        };

        let other = ChartGenerator::new(ChartOptions::default(), b"not a font")
            .expect("later registration is ignored");
        assert!(matches!(FONT_REGISTRATION.get(), Some(Ok(bytes)) if *bytes == first));
        assert_eq!(
            other.render(&sample()).expect("render"),
            generator.render(&sample()).expect("render")
        );
    }
}
