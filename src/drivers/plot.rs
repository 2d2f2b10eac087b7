use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::drivers::AcquisitionError;
use crate::types::StyleHint;

/// Marker size used for every sample point.
pub const MARKER_SIZE: u32 = 5;

/// Drawing surface fed by the controller.
pub trait Renderer {
    fn clear(&mut self);
    fn render(&mut self, xs: &[f64], ys: &[f64], style: &StyleHint);
}

/// Keeps the last frame around so it can be turned into a PNG on demand.
#[derive(Clone, Debug)]
pub struct PngRenderer {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    /// Caption and axis labels; needs a system sans-serif font.
    pub annotate: bool,
    last: Option<(Vec<f64>, Vec<f64>, StyleHint)>,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            annotate: true,
            last: None,
        }
    }
}

impl Renderer for PngRenderer {
    fn clear(&mut self) {
        self.last = None;
    }

    fn render(&mut self, xs: &[f64], ys: &[f64], style: &StyleHint) {
        self.last = Some((xs.to_vec(), ys.to_vec(), style.clone()));
    }
}

impl PngRenderer {
    pub fn has_frame(&self) -> bool {
        self.last.is_some()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, AcquisitionError> {
        let (xs, ys, style) = self
            .last
            .as_ref()
            .ok_or_else(|| AcquisitionError::Plot("nothing rendered yet".into()))?;
        let canvas = Canvas {
            width: self.width,
            height: self.height,
            background: self.background,
            annotate: self.annotate,
        };
        render_scalar_png(xs, ys, style, canvas)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub annotate: bool,
}

pub fn render_scalar_png(
    xs: &[f64],
    ys: &[f64],
    style: &StyleHint,
    canvas: Canvas,
) -> Result<Vec<u8>, AcquisitionError> {
    let Canvas {
        width,
        height,
        background,
        annotate,
    } = canvas;
    if ys.is_empty() {
        return Err(AcquisitionError::Plot("frame has no samples".into()));
    }
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&background)?;
        let x_max = xs.last().copied().unwrap_or(0.0).max(1.0);
        let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let pad = if (y_max - y_min).abs() < f64::EPSILON {
            y_max.abs().max(1.0) * 0.1
        } else {
            (y_max - y_min) * 0.05
        };
        let [r, g, b] = style.color;
        let color = RGBColor(r, g, b);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if annotate {
            builder
                .caption(&style.label, ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(0f64..x_max, (y_min - pad)..(y_max + pad))?;
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(&WHITE.mix(0.1));
        if annotate {
            mesh.label_style(("sans-serif", 12).into_font().color(&WHITE));
        } else {
            mesh.disable_x_axis().disable_y_axis();
        }
        mesh.draw()?;
        chart.draw_series(
            xs.iter()
                .zip(ys)
                .map(|(x, y)| Circle::new((*x, *y), MARKER_SIZE / 2 + 1, color.filled())),
        )?;
        root.present()?;
    }
    encode_png(&buffer, width, height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AcquisitionError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AcquisitionError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
