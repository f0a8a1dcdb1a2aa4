//! Bitmap surface backed by a tiny-skia pixmap, encoded as PNG
//!
//! Text uses the 8x8 public-domain bitmap font from `font8x8`, scaled to the
//! requested size. Each glyph cell is one em wide.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use tiny_skia::{
    FilterQuality, GradientStop, IntSize, LinearGradient, Paint, PathBuilder, Pixmap, PixmapPaint, Point, SpreadMode,
    Stroke, StrokeDash, Transform,
};

use super::{Align, Rect, Rgb, Surface, TextStyle};
use crate::qr::QrImage;
use crate::{Error, Result};

/// Rows of the glyph cell that sit above the baseline.
const ASCENT_ROWS: f32 = 7.0;

pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::DrawingSurfaceUnavailable(format!("cannot allocate a {}x{} pixmap", width, height))
        })?;
        Ok(Self { pixmap })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    fn solid(color: Rgb) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.0, color.1, color.2, 255);
        paint.anti_alias = true;
        paint
    }
}

fn to_skia(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

impl Surface for RasterSurface {
    fn size(&self) -> (f32, f32) {
        (self.pixmap.width() as f32, self.pixmap.height() as f32)
    }

    fn fill_gradient(&mut self, rect: Rect, from: Rgb, to: Rgb) {
        let Some(r) = to_skia(rect) else { return };
        let shader = LinearGradient::new(
            Point::from_xy(r.left(), r.top()),
            Point::from_xy(r.right(), r.top()),
            vec![
                GradientStop::new(0.0, tiny_skia::Color::from_rgba8(from.0, from.1, from.2, 255)),
                GradientStop::new(1.0, tiny_skia::Color::from_rgba8(to.0, to.1, to.2, 255)),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        );
        let mut paint = Paint::default();
        match shader {
            Some(shader) => paint.shader = shader,
            // Degenerate gradient (zero width); fall back to the first stop
            None => paint.set_color_rgba8(from.0, from.1, from.2, 255),
        }
        self.pixmap.fill_rect(r, &paint, Transform::identity(), None);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        if let Some(r) = to_skia(rect) {
            self.pixmap.fill_rect(r, &Self::solid(color), Transform::identity(), None);
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb, width: f32) {
        let Some(r) = to_skia(rect) else { return };
        let path = PathBuilder::from_rect(r);
        let stroke = Stroke { width, ..Stroke::default() };
        self.pixmap.stroke_path(&path, &Self::solid(color), &stroke, Transform::identity(), None);
    }

    fn draw_dashed_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32, dash: [f32; 2]) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        let Some(path) = pb.finish() else { return };
        let stroke = Stroke {
            width,
            dash: StrokeDash::new(dash.to_vec(), 0.0),
            ..Stroke::default()
        };
        self.pixmap.stroke_path(&path, &Self::solid(color), &stroke, Transform::identity(), None);
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        let cell = style.size / 8.0;
        let start_x = match style.align {
            Align::Left => x,
            Align::Center => x - self.measure_text(text, style.size, style.bold) / 2.0,
        };
        let top = y - ASCENT_ROWS * cell;
        // Bold widens every lit pixel to the right
        let pixel_w = if style.bold { cell * 1.4 } else { cell };
        let paint = Self::solid(style.color);

        for (i, c) in text.chars().enumerate() {
            let origin_x = start_x + i as f32 * style.size;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..8 {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = tiny_skia::Rect::from_xywh(
                        origin_x + col as f32 * cell,
                        top + row as f32 * cell,
                        pixel_w,
                        cell,
                    );
                    if let Some(px) = px {
                        self.pixmap.fill_rect(px, &paint, Transform::identity(), None);
                    }
                }
            }
        }
    }

    fn measure_text(&self, text: &str, size: f32, _bold: bool) -> f32 {
        text.chars().count() as f32 * size
    }

    fn draw_image(&mut self, rect: Rect, image: &QrImage) {
        let Some(size) = IntSize::from_wh(image.width, image.height) else { return };
        // tiny-skia wants premultiplied pixels
        let data: Vec<u8> = image
            .rgba
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3] as u16;
                let pm = |c: u8| ((c as u16 * a + 127) / 255) as u8;
                [pm(p[0]), pm(p[1]), pm(p[2]), p[3]]
            })
            .collect();
        let Some(src) = Pixmap::from_vec(data, size) else { return };

        let sx = rect.width / image.width as f32;
        let sy = rect.height / image.height as f32;
        let paint = PixmapPaint { quality: FilterQuality::Nearest, ..PixmapPaint::default() };
        self.pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, rect.x, rect.y),
            None,
        );
    }

    fn encode(self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| Error::SerializationFailed(format!("PNG encoding failed: {}", e)))
    }
}
