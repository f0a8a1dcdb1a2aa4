//! Single-page PDF surface built with `pdf-writer`
//!
//! Text uses the base-14 Helvetica fonts with WinAnsi encoding, so nothing
//! is embedded except the QR bitmap. Layout coordinates are top-left based
//! and flipped to PDF user space on the way out.

use pdf_writer::types::FunctionShadingType;
use pdf_writer::{Content, Finish, Name, Pdf, Rect as PdfRect, Ref, Str, TextStr};

use super::{Align, Rect, Rgb, Surface, TextStyle};
use crate::qr::QrImage;
use crate::{Error, Result};

const FONT_REGULAR: &[u8] = b"F1";
const FONT_BOLD: &[u8] = b"F2";

/// Helvetica advance widths for U+0020..=U+007E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for U+0020..=U+007E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode `text` for a WinAnsi simple font; unmappable characters become `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            0x20ac => 0x80,
            _ => b'?',
        })
        .collect()
}

fn advance(byte: u8, bold: bool) -> f32 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    let w = match byte {
        0x20..=0x7e => table[(byte - 0x20) as usize],
        _ => 556,
    };
    w as f32 / 1000.0
}

struct GradientFill {
    name: Vec<u8>,
    rect: Rect,
    from: Rgb,
    to: Rgb,
}

struct ImageFill {
    name: Vec<u8>,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

pub struct DocumentSurface {
    width: f32,
    height: f32,
    title: Option<String>,
    content: Content,
    gradients: Vec<GradientFill>,
    images: Vec<ImageFill>,
}

impl DocumentSurface {
    /// A page of `width` x `height` points.
    pub fn new(width: f32, height: f32) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::DrawingSurfaceUnavailable(format!(
                "invalid page size {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            title: None,
            content: Content::new(),
            gradients: Vec::new(),
            images: Vec::new(),
        })
    }

    /// Title recorded in the document information dictionary.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn flip(&self, y: f32) -> f32 {
        self.height - y
    }

    /// `rect` in PDF user space: (x, bottom, width, height).
    fn pdf_rect(&self, rect: Rect) -> (f32, f32, f32, f32) {
        (rect.x, self.flip(rect.bottom()), rect.width, rect.height)
    }
}

impl Surface for DocumentSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill_gradient(&mut self, rect: Rect, from: Rgb, to: Rgb) {
        let name = format!("Sh{}", self.gradients.len() + 1).into_bytes();
        let (x, y, w, h) = self.pdf_rect(rect);
        self.content.save_state();
        self.content.rect(x, y, w, h);
        self.content.clip_nonzero();
        self.content.end_path();
        self.content.shading(Name(&name));
        self.content.restore_state();
        self.gradients.push(GradientFill { name, rect, from, to });
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let [r, g, b] = color.to_unit();
        let (x, y, w, h) = self.pdf_rect(rect);
        self.content.set_fill_rgb(r, g, b);
        self.content.rect(x, y, w, h);
        self.content.fill_nonzero();
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb, width: f32) {
        let [r, g, b] = color.to_unit();
        let (x, y, w, h) = self.pdf_rect(rect);
        self.content.set_stroke_rgb(r, g, b);
        self.content.set_line_width(width);
        self.content.rect(x, y, w, h);
        self.content.stroke();
    }

    fn draw_dashed_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32, dash: [f32; 2]) {
        let [r, g, b] = color.to_unit();
        self.content.save_state();
        self.content.set_stroke_rgb(r, g, b);
        self.content.set_line_width(width);
        self.content.set_dash_pattern(dash, 0.0);
        self.content.move_to(from.0, self.flip(from.1));
        self.content.line_to(to.0, self.flip(to.1));
        self.content.stroke();
        self.content.restore_state();
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) {
        let [r, g, b] = style.color.to_unit();
        let start_x = match style.align {
            Align::Left => x,
            Align::Center => x - self.measure_text(text, style.size, style.bold) / 2.0,
        };
        let font = if style.bold { FONT_BOLD } else { FONT_REGULAR };
        let encoded = win_ansi(text);
        let baseline = self.flip(y);

        self.content.set_fill_rgb(r, g, b);
        self.content.begin_text();
        self.content.set_font(Name(font), style.size);
        self.content.next_line(start_x, baseline);
        self.content.show(Str(&encoded));
        self.content.end_text();
    }

    fn measure_text(&self, text: &str, size: f32, bold: bool) -> f32 {
        win_ansi(text).into_iter().map(|b| advance(b, bold)).sum::<f32>() * size
    }

    fn draw_image(&mut self, rect: Rect, image: &QrImage) {
        let name = format!("Im{}", self.images.len() + 1).into_bytes();
        let (x, y, w, h) = self.pdf_rect(rect);
        self.content.save_state();
        self.content.transform([w, 0.0, 0.0, h, x, y]);
        self.content.x_object(Name(&name));
        self.content.restore_state();
        self.images.push(ImageFill {
            name,
            width: image.width,
            height: image.height,
            rgb: image.to_rgb_over_white(),
        });
    }

    fn encode(self) -> Result<Vec<u8>> {
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        let page_id = alloc.bump();
        let content_id = alloc.bump();
        let regular_id = alloc.bump();
        let bold_id = alloc.bump();
        let info_id = alloc.bump();

        let gradient_ids: Vec<(Ref, Ref)> = self.gradients.iter().map(|_| (alloc.bump(), alloc.bump())).collect();
        let image_ids: Vec<Ref> = self.images.iter().map(|_| alloc.bump()).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(PdfRect::new(0.0, 0.0, self.width, self.height));
        page.parent(page_tree_id);
        page.contents(content_id);
        {
            let mut resources = page.resources();
            resources.fonts().pair(Name(FONT_REGULAR), regular_id).pair(Name(FONT_BOLD), bold_id);
            if !self.images.is_empty() {
                let mut x_objects = resources.x_objects();
                for (img, id) in self.images.iter().zip(&image_ids) {
                    x_objects.pair(Name(&img.name), *id);
                }
            }
            if !self.gradients.is_empty() {
                let mut shadings = resources.shadings();
                for (grad, (_, shading_id)) in self.gradients.iter().zip(&gradient_ids) {
                    shadings.pair(Name(&grad.name), *shading_id);
                }
            }
        }
        page.finish();

        pdf.type1_font(regular_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        for (grad, (function_id, shading_id)) in self.gradients.iter().zip(&gradient_ids) {
            pdf.exponential_function(*function_id)
                .domain([0.0, 1.0])
                .c0(grad.from.to_unit())
                .c1(grad.to.to_unit())
                .n(1.0);

            let y = self.height - grad.rect.bottom();
            let mut shading = pdf.function_shading(*shading_id);
            shading.shading_type(FunctionShadingType::Axial);
            shading.color_space().device_rgb();
            shading.function(*function_id);
            shading.coords([grad.rect.x, y, grad.rect.right(), y]);
            shading.extend([true, true]);
            shading.finish();
        }

        for (img, id) in self.images.iter().zip(&image_ids) {
            let mut image = pdf.image_xobject(*id, &img.rgb);
            image.width(img.width as i32);
            image.height(img.height as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
            image.finish();
        }

        {
            let mut info = pdf.document_info(info_id);
            info.producer(TextStr("ticketdoc"));
            if let Some(title) = &self.title {
                info.title(TextStr(title));
            }
        }

        pdf.stream(content_id, &self.content.finish());
        Ok(pdf.finish())
    }
}
