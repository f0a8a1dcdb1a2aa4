#![cfg(all(feature = "raster", feature = "document"))]

use ticketdoc::rendering::document::DocumentSurface;
use ticketdoc::rendering::raster::RasterSurface;
use ticketdoc::{paint_ticket, Frame, Surface, TicketContent, TicketRenderRequest};

fn content(request: &TicketRenderRequest) -> TicketContent<'_> {
    TicketContent {
        request,
        currency_symbol: "$",
        verification_url: "http://localhost:3000/1",
        qr: None,
    }
}

#[test]
fn smoke_raster_surface() {
    let request = TicketRenderRequest::new("1", "Smoke");
    let mut s = RasterSurface::new(256, 128).unwrap();
    assert_eq!(s.size(), (256.0, 128.0));
    let summary = paint_ticket(&mut s, &content(&request));
    assert_eq!(summary.texts[0], "Smoke");
    assert!(!s.encode().unwrap().is_empty());
}

#[test]
fn smoke_document_surface() {
    let request = TicketRenderRequest::new("1", "Smoke");
    let mut s = DocumentSurface::new(Frame::DOCUMENT.width, Frame::DOCUMENT.height).unwrap();
    let summary = paint_ticket(&mut s, &content(&request));
    assert!(!summary.qr_embedded);
    let pdf = s.encode().unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(pdf.windows(16).any(|w| w == b"(Scan to verify)"));
}
