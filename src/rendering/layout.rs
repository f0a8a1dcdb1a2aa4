//! The ticket layout, shared by every drawing backend
//!
//! All metrics scale with the frame height so the 600x200 px image and the
//! 210x100 mm page come out with the same proportions.

use super::paint::{self, status_color};
use super::{Rect, Surface, TextStyle};
use crate::qr::QrImage;
use crate::request::TicketRenderRequest;

/// Share of the ticket body taken by the details zone, left of the perforation.
pub const DETAILS_SHARE: f32 = 0.75;

pub const SCAN_CAPTION: &str = "Scan to verify";
pub const QR_UNAVAILABLE: &str = "QR unavailable";

/// What to paint for one ticket.
#[derive(Debug, Clone, Copy)]
pub struct TicketContent<'a> {
    pub request: &'a TicketRenderRequest,
    pub currency_symbol: &'a str,
    /// Encoded in the QR code, and printed in the fallback panel
    pub verification_url: &'a str,
    /// `None` when the QR fetch failed
    pub qr: Option<&'a QrImage>,
}

/// What the layout ended up painting.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSummary {
    /// Every text run, in paint order
    pub texts: Vec<String>,
    pub qr_embedded: bool,
}

/// Derived geometry of the ticket for a surface size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TicketGeometry {
    /// Scale unit; 1.0 on the 200 px tall image
    pub unit: f32,
    pub frame: Rect,
    pub body: Rect,
    pub perforation_x: f32,
    pub details: Rect,
    pub stub: Rect,
    pub qr_panel: Rect,
}

impl TicketGeometry {
    pub fn for_size(width: f32, height: f32) -> Self {
        let unit = height / 200.0;
        let frame = Rect::new(0.0, 0.0, width, height);
        let body = frame.inset(height / 10.0);
        let perforation_x = body.x + body.width * DETAILS_SHARE;
        let details = Rect::new(body.x, body.y, perforation_x - body.x, body.height);
        let stub = Rect::new(perforation_x, body.y, body.right() - perforation_x, body.height);

        let panel_size = (stub.width - 20.0 * unit).min(body.height * 0.6).max(0.0);
        let qr_panel = Rect::new(stub.center_x() - panel_size / 2.0, body.y + 12.0 * unit, panel_size, panel_size);

        Self { unit, frame, body, perforation_x, details, stub, qr_panel }
    }
}

struct Painter<'s, S: Surface> {
    surface: &'s mut S,
    texts: Vec<String>,
}

impl<S: Surface> Painter<'_, S> {
    fn text(&mut self, x: f32, y: f32, text: &str, style: TextStyle) {
        self.surface.draw_text(x, y, text, &style);
        self.texts.push(text.to_string());
    }

    /// Draw `text`, ellipsized so it fits in `max_width`.
    fn text_fitted(&mut self, x: f32, y: f32, text: &str, max_width: f32, style: TextStyle) {
        let fitted = ellipsize(&*self.surface, text, max_width, style.size, style.bold);
        self.text(x, y, &fitted, style);
    }

    /// Draw `text` shrunk below `style.size` if needed so it fits in `max_width`.
    fn text_shrunk(&mut self, x: f32, y: f32, text: &str, max_width: f32, mut style: TextStyle) {
        let width = self.surface.measure_text(text, style.size, style.bold);
        if width > max_width && width > 0.0 {
            style.size *= max_width / width;
        }
        self.text(x, y, text, style);
    }
}

/// Cut `text` and append "..." until it fits in `max_width`.
///
/// Per-character advances are summed once to find the cut; the candidate is
/// then measured as a whole and stepped back if rounding pushed it over.
pub fn ellipsize<S: Surface + ?Sized>(surface: &S, text: &str, max_width: f32, size: f32, bold: bool) -> String {
    if surface.measure_text(text, size, bold) <= max_width {
        return text.to_string();
    }
    let budget = max_width - surface.measure_text("...", size, bold);
    let mut keep = 0;
    let mut used = 0.0;
    for (i, c) in text.char_indices() {
        let mut buf = [0u8; 4];
        used += surface.measure_text(c.encode_utf8(&mut buf), size, bold);
        if used > budget {
            break;
        }
        keep = i + c.len_utf8();
    }

    let mut prefix = &text[..keep];
    loop {
        let candidate = format!("{}...", prefix.trim_end());
        if prefix.is_empty() || surface.measure_text(&candidate, size, bold) <= max_width {
            return candidate;
        }
        let mut chars = prefix.chars();
        chars.next_back();
        prefix = chars.as_str();
    }
}

/// Break `text` into lines of at most `max_width`, splitting anywhere.
pub fn wrap_anywhere<S: Surface + ?Sized>(surface: &S, text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for c in text.chars() {
        cur.push(c);
        if surface.measure_text(&cur, size, false) > max_width && cur.chars().count() > 1 {
            cur.pop();
            lines.push(std::mem::take(&mut cur));
            cur.push(c);
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn or_tbd(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => "TBD",
    }
}

/// Paint a complete ticket onto `surface`.
pub fn paint_ticket<S: Surface>(surface: &mut S, content: &TicketContent<'_>) -> LayoutSummary {
    let (width, height) = surface.size();
    let g = TicketGeometry::for_size(width, height);
    let u = g.unit;
    let req = content.request;

    let mut p = Painter { surface, texts: Vec::new() };

    // Frame and body
    p.surface.fill_gradient(g.frame, paint::GRADIENT_FROM, paint::GRADIENT_TO);
    p.surface.fill_rect(g.body, paint::BODY);
    p.surface.stroke_rect(g.body, paint::BORDER, 2.0 * u);
    p.surface.draw_dashed_line(
        (g.perforation_x, g.body.y),
        (g.perforation_x, g.body.bottom()),
        paint::PERFORATION,
        1.5 * u,
        [5.0 * u, 5.0 * u],
    );

    // Details zone
    let x = g.details.x + 20.0 * u;
    let max_w = g.details.right() - 16.0 * u - x;
    let mut y = g.body.y + 34.0 * u;
    p.text_fitted(x, y, req.title.trim(), max_w, TextStyle::new(22.0 * u, paint::TEXT).bold());
    y += 20.0 * u;
    p.text_fitted(x, y, &format!("Ticket: {}", req.reference()), max_w, TextStyle::new(12.0 * u, paint::MUTED));
    y += 24.0 * u;
    let body_style = TextStyle::new(14.0 * u, paint::TEXT);
    p.text_fitted(x, y, &format!("Date: {}", or_tbd(req.event_date.as_deref())), max_w, body_style);
    y += 18.0 * u;
    p.text_fitted(x, y, &format!("Venue: {}", or_tbd(req.venue_label.as_deref())), max_w, body_style);
    if let Some(time) = req.start_time.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        y += 18.0 * u;
        p.text_fitted(x, y, &format!("Time: {}", time), max_w, body_style);
    }
    y += 26.0 * u;
    let price_style = TextStyle::new(16.0 * u, paint::ACCENT).bold();
    let price = ellipsize(&*p.surface, &req.price_label(content.currency_symbol), max_w, price_style.size, true);
    let price_w = p.surface.measure_text(&price, price_style.size, true);
    p.text(x, y, &price, price_style);

    // Status badge on the price line, or on its own line when it does not fit
    if let Some(status) = req.status_label() {
        let size = 8.0 * u;
        let pad = 6.0 * u;
        let full_w = p.surface.measure_text(&status, size, true) + 2.0 * pad;
        let (badge_x, baseline) = if price_w + 12.0 * u + full_w <= max_w {
            (x + price_w + 12.0 * u, y)
        } else {
            (x, (y + 20.0 * u).min(g.body.bottom() - 6.0 * u))
        };
        let label = ellipsize(&*p.surface, &status, x + max_w - badge_x - 2.0 * pad, size, true);
        let text_w = p.surface.measure_text(&label, size, true);
        let badge = Rect::new(badge_x, baseline - 11.0 * u, text_w + 2.0 * pad, 14.0 * u);
        p.surface.fill_rect(badge, status_color(&status));
        p.text(
            badge.center_x(),
            badge.y + 10.5 * u,
            &label,
            TextStyle::new(size, paint::BADGE_TEXT).bold().centered(),
        );
    }

    // Stub: QR panel and caption
    let panel = g.qr_panel;
    p.surface.fill_rect(panel, paint::QR_PANEL);
    p.surface.stroke_rect(panel, paint::BORDER, u);

    let qr_embedded = match content.qr {
        Some(image) => {
            p.surface.draw_image(panel.inset(5.0 * u), image);
            true
        }
        None => {
            let inner = panel.inset(5.0 * u);
            p.text_shrunk(
                panel.center_x(),
                inner.y + 10.0 * u,
                QR_UNAVAILABLE,
                inner.width,
                TextStyle::new(8.0 * u, paint::MUTED).bold().centered(),
            );
            let url_size = 7.0 * u;
            let mut line_y = inner.y + 24.0 * u;
            for line in wrap_anywhere(&*p.surface, content.verification_url, inner.width, url_size) {
                if line_y > inner.bottom() {
                    break;
                }
                p.text(panel.center_x(), line_y, &line, TextStyle::new(url_size, paint::MUTED).centered());
                line_y += 9.0 * u;
            }
            false
        }
    };

    let caption_y = panel.bottom() + 14.0 * u;
    p.text_shrunk(
        g.stub.center_x(),
        caption_y,
        SCAN_CAPTION,
        g.stub.width - 12.0 * u,
        TextStyle::new(10.0 * u, paint::MUTED).centered(),
    );

    LayoutSummary { texts: p.texts, qr_embedded }
}
