//! Drawing surfaces and the ticket layout painted onto them
//!
//! The layout in [`layout`] only talks to the [`Surface`] trait, so the
//! raster (PNG) and document (PDF) outputs share one drawing routine. A
//! [`paint::RecordingSurface`] captures the same calls as plain data.
//!
//! Coordinates are in surface units with the origin at the top-left corner,
//! x increasing rightward and y increasing downward. Backends whose native
//! coordinate system differs (PDF) flip internally.

pub mod layout;
pub mod paint;

#[cfg(feature = "raster")]
pub mod raster;

#[cfg(feature = "document")]
pub mod document;

use crate::qr::QrImage;
use crate::Result;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb`.
    pub const fn hex(value: u32) -> Self {
        Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Components as floats in `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 3] {
        [self.0 as f32 / 255.0, self.1 as f32 / 255.0, self.2 as f32 / 255.0]
    }
}

/// Axis-aligned rectangle in surface units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Shrink by `by` on every side.
    pub fn inset(&self, by: f32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
            width: (self.width - 2.0 * by).max(0.0),
            height: (self.height - 2.0 * by).max(0.0),
        }
    }
}

/// Horizontal anchoring of a text run relative to its x coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub color: Rgb,
    pub align: Align,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgb) -> Self {
        Self { size, bold: false, color, align: Align::Left }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

/// Fixed size of the surface a ticket is laid out on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
}

impl Frame {
    /// 600x200 px bitmap.
    pub const IMAGE: Frame = Frame { width: 600.0, height: 200.0 };
    /// 210x100 mm landscape page, in PDF points.
    pub const DOCUMENT: Frame = Frame { width: 595.28, height: 283.46 };
}

/// Drawing capabilities the ticket layout needs from a backend.
pub trait Surface {
    /// Width and height in surface units.
    fn size(&self) -> (f32, f32);

    /// Fill `rect` with a left-to-right two-stop linear gradient.
    fn fill_gradient(&mut self, rect: Rect, from: Rgb, to: Rgb);

    fn fill_rect(&mut self, rect: Rect, color: Rgb);

    fn stroke_rect(&mut self, rect: Rect, color: Rgb, width: f32);

    /// Straight dashed line; `dash` is `[on, off]` lengths.
    fn draw_dashed_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32, dash: [f32; 2]);

    /// Draw a single line of text with its baseline at `y`.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle);

    /// Advance width of `text` at the given size.
    fn measure_text(&self, text: &str, size: f32, bold: bool) -> f32;

    /// Draw `image` stretched into `rect`.
    fn draw_image(&mut self, rect: Rect, image: &QrImage);

    /// Serialize the finished surface.
    fn encode(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}
