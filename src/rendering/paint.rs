//! Paint commands, the ticket palette and a surface that records commands

use sha2::{Digest, Sha256};

use super::{Rect, Rgb, Surface, TextStyle};
use crate::qr::QrImage;
use crate::Result;

pub const GRADIENT_FROM: Rgb = Rgb::hex(0x667eea);
pub const GRADIENT_TO: Rgb = Rgb::hex(0x764ba2);
pub const BODY: Rgb = Rgb::hex(0xffffff);
pub const BORDER: Rgb = Rgb::hex(0xe2e8f0);
pub const PERFORATION: Rgb = Rgb::hex(0xcbd5e1);
pub const TEXT: Rgb = Rgb::hex(0x1e293b);
pub const MUTED: Rgb = Rgb::hex(0x64748b);
pub const ACCENT: Rgb = Rgb::hex(0x059669);
pub const QR_PANEL: Rgb = Rgb::hex(0xf8fafc);
pub const BADGE_TEXT: Rgb = Rgb::hex(0xffffff);

/// Badge color for a ticket or order status.
pub fn status_color(status: &str) -> Rgb {
    match status.trim().to_ascii_lowercase().as_str() {
        "active" | "confirmed" | "approved" => Rgb::hex(0x22c55e),
        "pending" => Rgb::hex(0xeab308),
        "used" => Rgb::hex(0x3b82f6),
        "cancelled" | "rejected" => Rgb::hex(0xef4444),
        _ => Rgb::hex(0x6b7280),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Gradient {
        rect: Rect,
        from: Rgb,
        to: Rgb,
    },
    SolidRect {
        rect: Rect,
        color: Rgb,
    },
    StrokeRect {
        rect: Rect,
        color: Rgb,
        width: f32,
    },
    DashedLine {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width: f32,
        dash: [f32; 2],
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Image {
        rect: Rect,
        width: u32,
        height: u32,
    },
}

/// Surface that keeps every call as a [`PaintCommand`].
///
/// Text is measured with a fixed advance of 0.55 em per character so
/// layouts recorded here are deterministic.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    commands: Vec<PaintCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height, commands: Vec::new() }
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<PaintCommand> {
        self.commands
    }

    /// Every text run, in paint order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// One line per command, with coordinates rounded to two decimals.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            let line = match cmd {
                PaintCommand::Gradient { rect, from, to } => {
                    format!("gradient {} {:?}->{:?}", fmt_rect(rect), from, to)
                }
                PaintCommand::SolidRect { rect, color } => format!("fill {} {:?}", fmt_rect(rect), color),
                PaintCommand::StrokeRect { rect, color, width } => {
                    format!("stroke {} {:?} w={:.2}", fmt_rect(rect), color, width)
                }
                PaintCommand::DashedLine { from, to, color, width, dash } => format!(
                    "dash ({:.2},{:.2})->({:.2},{:.2}) {:?} w={:.2} [{:.2},{:.2}]",
                    from.0, from.1, to.0, to.1, color, width, dash[0], dash[1]
                ),
                PaintCommand::Text { x, y, text, style } => format!(
                    "text ({:.2},{:.2}) size={:.2} bold={} {:?} {:?} {:?}",
                    x, y, style.size, style.bold, style.align, style.color, text
                ),
                PaintCommand::Image { rect, width, height } => {
                    format!("image {} {}x{}", fmt_rect(rect), width, height)
                }
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// SHA-256 of [`Self::dump`], hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.dump().as_bytes()))
    }
}

fn fmt_rect(r: &Rect) -> String {
    format!("[{:.2},{:.2} {:.2}x{:.2}]", r.x, r.y, r.width, r.height)
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill_gradient(&mut self, rect: Rect, from: Rgb, to: Rgb) {
        self.commands.push(PaintCommand::Gradient { rect, from, to });
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.commands.push(PaintCommand::SolidRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb, width: f32) {
        self.commands.push(PaintCommand::StrokeRect { rect, color, width });
    }

    fn draw_dashed_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32, dash: [f32; 2]) {
        self.commands.push(PaintCommand::DashedLine { from, to, color, width, dash });
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        self.commands.push(PaintCommand::Text { x, y, text: text.to_string(), style: *style });
    }

    fn measure_text(&self, text: &str, size: f32, _bold: bool) -> f32 {
        text.chars().count() as f32 * size * 0.55
    }

    fn draw_image(&mut self, rect: Rect, image: &QrImage) {
        self.commands.push(PaintCommand::Image { rect, width: image.width, height: image.height });
    }

    fn encode(self) -> Result<Vec<u8>> {
        Ok(self.dump().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_commands_in_order() {
        let mut s = RecordingSurface::new(100.0, 50.0);
        s.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), BODY);
        s.draw_text(1.0, 2.0, "hi", &TextStyle::new(12.0, TEXT));
        assert_eq!(s.commands().len(), 2);
        assert_eq!(s.texts(), vec!["hi"]);
        match &s.commands()[0] {
            PaintCommand::SolidRect { rect, .. } => assert_eq!(rect.width, 10.0),
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn digest_is_stable_and_content_addressed() {
        let mut a = RecordingSurface::new(10.0, 10.0);
        a.draw_text(0.0, 0.0, "x", &TextStyle::new(8.0, MUTED));
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());
        b.draw_text(0.0, 0.0, "y", &TextStyle::new(8.0, MUTED));
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn status_colors() {
        assert_eq!(status_color("Active"), Rgb::hex(0x22c55e));
        assert_eq!(status_color("used"), Rgb::hex(0x3b82f6));
        assert_eq!(status_color("whatever"), Rgb::hex(0x6b7280));
    }
}
