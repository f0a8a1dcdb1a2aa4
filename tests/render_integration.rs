//! End-to-end renders against a local stand-in for the QR service

#![cfg(all(feature = "http", feature = "raster", feature = "document"))]

use std::sync::{Arc, Mutex};

use ticketdoc::{
    CachedQrSource, DownloadSink, HttpQrSource, MemorySink, QrStatus, RenderFormat, RendererConfig,
    TicketRenderRequest, TicketRenderer,
};
use tiny_http::{Header, Response, Server};

#[derive(Clone, Copy)]
enum Mode {
    Png,
    ServerError,
    Garbage,
}

fn qr_png() -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, 21, 21);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..21 * 21).map(|i| if (i / 21 + i % 21) % 2 == 0 { 0 } else { 255 }).collect();
        writer.write_image_data(&data).unwrap();
    }
    out
}

/// Start a QR service stand-in; returns its base URL and the request log.
fn start_qr_server(mode: Mode) -> (String, Arc<Mutex<Vec<String>>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().expect("tcp listener");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            log.lock().unwrap().push(request.url().to_string());
            let _ = match mode {
                Mode::Png => request.respond(
                    Response::from_data(qr_png())
                        .with_header("Content-Type: image/png".parse::<Header>().unwrap()),
                ),
                Mode::ServerError => request.respond(Response::from_string("boom").with_status_code(500)),
                Mode::Garbage => request.respond(Response::from_string("<html>not an image</html>")),
            };
        }
    });

    (format!("http://{}/v1/create-qr-code/", addr), seen)
}

fn renderer(service: &str) -> TicketRenderer<CachedQrSource<HttpQrSource>, MemorySink> {
    let config = RendererConfig {
        qr_service_url: service.to_string(),
        timeout_ms: 5000,
        ..Default::default()
    };
    let qr = CachedQrSource::new(HttpQrSource::new(&config).unwrap(), config.qr_cache_capacity);
    TicketRenderer::new(config, qr, MemorySink::new()).unwrap()
}

fn concert() -> TicketRenderRequest {
    TicketRenderRequest {
        event_date: Some("2025-01-15".into()),
        venue_label: Some("Music Hall".into()),
        price: 50.0,
        ..TicketRenderRequest::new("42", "Concert Night")
    }
}

const VERIFY: &str = "http://localhost:3000/";

#[tokio::test]
async fn image_render_with_reachable_qr_service() {
    let (service, seen) = start_qr_server(Mode::Png);
    let r = renderer(&service);

    let outcome = r.render(&concert(), RenderFormat::Image, VERIFY).await.expect("render");
    assert_eq!(outcome.filename, "ticket-42.png");
    assert_eq!(outcome.qr, QrStatus::Embedded);
    assert_eq!(&outcome.bytes[0..8], b"\x89PNG\r\n\x1a\n");

    let urls = seen.lock().unwrap().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("data=http%3A%2F%2Flocalhost%3A3000%2F42"), "{}", urls[0]);
    assert!(urls[0].contains("size=150x150"));

    let delivered = r.sink().delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "ticket-42.png");
    assert_eq!(delivered[0].1, outcome.bytes);
}

#[tokio::test]
async fn document_render_with_reachable_qr_service() {
    let (service, _) = start_qr_server(Mode::Png);
    let r = renderer(&service);

    let outcome = r.render(&concert(), RenderFormat::Document, VERIFY).await.expect("render");
    assert_eq!(outcome.filename, "ticket-42.pdf");
    assert_eq!(outcome.qr, QrStatus::Embedded);
    assert!(outcome.bytes.starts_with(b"%PDF-"));
    assert!(outcome.bytes.windows(4).any(|w| w == b"/Im1"));
}

#[tokio::test]
async fn qr_cache_avoids_second_fetch() {
    let (service, seen) = start_qr_server(Mode::Png);
    let r = renderer(&service);

    r.compose(&concert(), RenderFormat::Image, VERIFY).await.unwrap();
    r.compose(&concert(), RenderFormat::Document, VERIFY).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(r.qr_source().len(), 1);
}

#[tokio::test]
async fn failing_qr_service_degrades_to_fallback_panel() {
    for mode in [Mode::ServerError, Mode::Garbage] {
        let (service, _) = start_qr_server(mode);
        let r = renderer(&service);

        for format in [RenderFormat::Image, RenderFormat::Document] {
            let outcome = r.render(&concert(), format, VERIFY).await.expect("render must not fail");
            assert!(matches!(outcome.qr, QrStatus::Fallback { .. }));
            assert!(!outcome.bytes.is_empty());
            assert!(outcome.text.iter().any(|t| t == "Scan to verify"));
            assert!(outcome.text.iter().any(|t| t == "QR unavailable"));
        }
    }
}

#[tokio::test]
async fn status_500_reason_is_reported() {
    let (service, _) = start_qr_server(Mode::ServerError);
    let outcome = renderer(&service).compose(&concert(), RenderFormat::Image, VERIFY).await.unwrap();
    assert_eq!(
        outcome.qr,
        QrStatus::Fallback { reason: "QR service returned HTTP 500".into() }
    );
}

#[tokio::test]
async fn unreachable_qr_service_still_renders() {
    // Bind and drop a listener so the port is very likely closed
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let r = renderer(&format!("http://127.0.0.1:{}/qr", port));
    let outcome = r.render(&concert(), RenderFormat::Document, VERIFY).await.unwrap();
    assert_eq!(outcome.filename, "ticket-42.pdf");
    assert!(matches!(outcome.qr, QrStatus::Fallback { .. }));
    assert!(outcome.bytes.windows(14).any(|w| w == b"QR unavailable"));
}

#[tokio::test]
async fn renders_are_textually_idempotent() {
    let (service, _) = start_qr_server(Mode::Png);
    let r = renderer(&service);
    let req = TicketRenderRequest {
        reference_code: Some("TKT-2025-001".into()),
        status: Some("used".into()),
        ..concert()
    };

    let a = r.compose(&req, RenderFormat::Image, VERIFY).await.unwrap();
    let b = r.compose(&req, RenderFormat::Image, VERIFY).await.unwrap();
    assert_eq!(a.text, b.text);
    assert_eq!(a.filename, "ticket-TKT-2025-001.png");
    for expected in ["Concert Night", "Ticket: TKT-2025-001", "Date: 2025-01-15", "$50.00", "USED"] {
        assert!(a.text.iter().any(|t| t == expected), "missing {}", expected);
    }
}

#[tokio::test]
async fn reference_falls_back_to_id_and_zero_price_is_shown() {
    let (service, _) = start_qr_server(Mode::Png);
    let req = TicketRenderRequest { price: 0.0, ..concert() };
    let outcome = renderer(&service).compose(&req, RenderFormat::Document, VERIFY).await.unwrap();
    assert_eq!(outcome.filename, "ticket-42.pdf");
    assert!(outcome.text.iter().any(|t| t == "Ticket: 42"));
    assert!(outcome.text.iter().any(|t| t == "$0.00"));
}

#[tokio::test]
async fn invalid_requests_deliver_nothing() {
    let (service, seen) = start_qr_server(Mode::Png);
    let r = renderer(&service);

    let err = r.render(&TicketRenderRequest::new("", "Untitled"), RenderFormat::Image, VERIFY).await.unwrap_err();
    assert!(matches!(err, ticketdoc::Error::InvalidRequest(_)));
    let err = r.render(&concert(), RenderFormat::Image, "not a url").await.unwrap_err();
    assert!(matches!(err, ticketdoc::Error::InvalidRequest(_)));

    assert!(r.sink().delivered().is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn directory_sink_receives_the_file() {
    let (service, _) = start_qr_server(Mode::Png);
    let dir = tempfile::tempdir().unwrap();
    let config = RendererConfig {
        qr_service_url: service,
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let r = ticketdoc::new_renderer(config).unwrap();

    let outcome = r.render(&concert(), RenderFormat::Image, VERIFY).await.unwrap();
    let saved = std::fs::read(dir.path().join("ticket-42.png")).unwrap();
    assert_eq!(saved, outcome.bytes);

    // The sink can also be driven directly with a finished outcome
    let receipt = r.sink().deliver(&outcome).await.unwrap();
    assert_eq!(receipt.size, outcome.bytes.len());
}
