//! ticketdoc
//!
//! Renders event tickets into downloadable documents: a PNG image or a
//! single-page landscape PDF, each carrying a QR code that resolves to the
//! ticket's verification URL.
//!
//! # Features
//!
//! - **raster** (default): PNG output via tiny-skia
//! - **document** (default): PDF output via pdf-writer
//! - **http** (default): QR bitmaps fetched from an HTTP QR service
//!
//! A QR service outage never fails a render: the ticket is still produced,
//! with a textual fallback panel where the QR code would be.
//!
//! # Example
//!
//! ```no_run
//! use ticketdoc::{RenderFormat, RendererConfig, TicketRenderRequest};
//!
//! # async fn run() -> ticketdoc::Result<()> {
//! let renderer = ticketdoc::new_renderer(RendererConfig::default())?;
//! let request = TicketRenderRequest {
//!     event_date: Some("2025-01-15".into()),
//!     venue_label: Some("Music Hall".into()),
//!     price: 50.0,
//!     ..TicketRenderRequest::new("42", "Concert Night")
//! };
//! let outcome = renderer
//!     .render(&request, RenderFormat::Image, "https://tickets.example.com/")
//!     .await?;
//! assert_eq!(outcome.filename, "ticket-42.png");
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub mod download;
pub mod error;
pub mod qr;
pub mod records;
pub mod rendering;
pub mod request;
pub mod stats;

pub use download::{DirectorySink, DownloadReceipt, DownloadSink, MemorySink};
pub use error::{Error, Result};
pub use qr::{CachedQrSource, OfflineQrSource, QrError, QrImage, QrSource};
#[cfg(feature = "http")]
pub use qr::HttpQrSource;
pub use rendering::layout::{paint_ticket, LayoutSummary, TicketContent};
pub use rendering::paint::RecordingSurface;
pub use rendering::{Frame, Surface};
pub use request::{RenderFormat, TicketRenderRequest};

/// Configuration for the ticket renderer
///
/// The defaults match the public QR service the marketplace front-end used
/// and a local development verification host.
///
/// # Examples
///
/// ```
/// let cfg = ticketdoc::RendererConfig::default();
/// assert_eq!(cfg.currency_symbol, "$");
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Base URL of the QR image service
    pub qr_service_url: String,
    /// Requested QR bitmap edge length in pixels
    pub qr_pixel_size: u32,
    /// Timeout for the QR fetch in milliseconds
    pub timeout_ms: u64,
    /// User agent sent to the QR service
    pub user_agent: String,
    /// Glyph printed before the price
    pub currency_symbol: String,
    /// How many QR bitmaps to keep in memory (0 disables the cache)
    pub qr_cache_capacity: usize,
    /// Verification URL prefix used when the caller does not pass one
    pub verification_base_url: String,
    /// Directory downloads are written to
    pub output_dir: PathBuf,
    /// Pixel density multiplier for image output
    pub image_scale: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            qr_service_url: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
            qr_pixel_size: 150,
            timeout_ms: 10000,
            user_agent: concat!("ticketdoc/", env!("CARGO_PKG_VERSION")).to_string(),
            currency_symbol: "$".to_string(),
            qr_cache_capacity: 64,
            verification_base_url: "http://localhost:3000/".to_string(),
            output_dir: PathBuf::from("."),
            image_scale: 1,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<()> {
        if self.qr_pixel_size == 0 {
            return Err(Error::ConfigError("qr_pixel_size must be positive".into()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be positive".into()));
        }
        if !(1..=8).contains(&self.image_scale) {
            return Err(Error::ConfigError(format!("image_scale {} is out of range 1..=8", self.image_scale)));
        }
        url::Url::parse(&self.qr_service_url)
            .map_err(|e| Error::ConfigError(format!("qr_service_url is not a URL: {}", e)))?;
        Ok(())
    }

    /// Read a JSON config file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Whether the QR code made it into the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QrStatus {
    Embedded,
    /// The QR fetch failed and the textual fallback panel was drawn
    Fallback { reason: String },
}

/// The file produced by one render
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub bytes: Vec<u8>,
    /// `ticket-<reference>.<ext>`
    pub filename: String,
    pub format: RenderFormat,
    /// Visible text, in paint order
    pub text: Vec<String>,
    pub qr: QrStatus,
}

impl RenderOutcome {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// The payload as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Turns [`TicketRenderRequest`]s into downloadable documents.
pub struct TicketRenderer<Q, D> {
    config: RendererConfig,
    qr: Q,
    sink: D,
}

impl<Q: QrSource, D: DownloadSink> TicketRenderer<Q, D> {
    pub fn new(config: RendererConfig, qr: Q, sink: D) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, qr, sink })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn qr_source(&self) -> &Q {
        &self.qr
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Render `request` and hand the file to the download sink.
    ///
    /// Nothing is delivered when rendering fails.
    pub async fn render(
        &self,
        request: &TicketRenderRequest,
        format: RenderFormat,
        verification_base_url: &str,
    ) -> Result<RenderOutcome> {
        let outcome = self.compose(request, format, verification_base_url).await?;
        let receipt = self.sink.deliver(&outcome).await?;
        debug!("delivered {} ({} bytes)", receipt.filename, receipt.size);
        Ok(outcome)
    }

    /// Render `request` without delivering it.
    pub async fn compose(
        &self,
        request: &TicketRenderRequest,
        format: RenderFormat,
        verification_base_url: &str,
    ) -> Result<RenderOutcome> {
        request.validate()?;
        request::validate_verification_base(verification_base_url)?;

        let payload = request.verification_payload(verification_base_url);
        let (qr, status) = self.fetch_qr(&payload).await;
        let content = TicketContent {
            request,
            currency_symbol: &self.config.currency_symbol,
            verification_url: &payload,
            qr: qr.as_deref(),
        };

        let (bytes, summary) = self.paint_and_encode(format, &content, &request.title)?;
        debug!("rendered {} as {} ({} bytes)", request.id, format, bytes.len());

        Ok(RenderOutcome {
            bytes,
            filename: request.filename(format),
            format,
            text: summary.texts,
            qr: status,
        })
    }

    /// Lay the ticket out onto a [`RecordingSurface`] sized for `format`.
    pub async fn plan(
        &self,
        request: &TicketRenderRequest,
        format: RenderFormat,
        verification_base_url: &str,
    ) -> Result<(RecordingSurface, LayoutSummary)> {
        request.validate()?;
        request::validate_verification_base(verification_base_url)?;

        let payload = request.verification_payload(verification_base_url);
        let (qr, _) = self.fetch_qr(&payload).await;
        let frame = match format {
            RenderFormat::Image => Frame::IMAGE,
            RenderFormat::Document => Frame::DOCUMENT,
        };
        let mut surface = RecordingSurface::new(frame.width, frame.height);
        let summary = paint_ticket(
            &mut surface,
            &TicketContent {
                request,
                currency_symbol: &self.config.currency_symbol,
                verification_url: &payload,
                qr: qr.as_deref(),
            },
        );
        Ok((surface, summary))
    }

    async fn fetch_qr(&self, payload: &str) -> (Option<Arc<QrImage>>, QrStatus) {
        match self.qr.fetch(payload).await {
            Ok(image) => (Some(image), QrStatus::Embedded),
            Err(e) => {
                warn!("QR code for {} unavailable, drawing fallback panel: {}", payload, e);
                (None, QrStatus::Fallback { reason: e.to_string() })
            }
        }
    }

    fn paint_and_encode(
        &self,
        format: RenderFormat,
        content: &TicketContent<'_>,
        title: &str,
    ) -> Result<(Vec<u8>, LayoutSummary)> {
        match format {
            #[cfg(feature = "raster")]
            RenderFormat::Image => {
                let scale = self.config.image_scale as f32;
                let mut surface = rendering::raster::RasterSurface::new(
                    (Frame::IMAGE.width * scale) as u32,
                    (Frame::IMAGE.height * scale) as u32,
                )?;
                let summary = paint_ticket(&mut surface, content);
                Ok((surface.encode()?, summary))
            }
            #[cfg(feature = "document")]
            RenderFormat::Document => {
                let mut surface = rendering::document::DocumentSurface::new(Frame::DOCUMENT.width, Frame::DOCUMENT.height)?
                    .with_title(title.trim());
                let summary = paint_ticket(&mut surface, content);
                Ok((surface.encode()?, summary))
            }
            #[allow(unreachable_patterns)]
            other => {
                let _ = title;
                Err(Error::DrawingSurfaceUnavailable(format!("no {} backend compiled in", other)))
            }
        }
    }
}

/// Create a renderer with the HTTP QR source (cached per the config) that
/// saves downloads into `config.output_dir`.
#[cfg(feature = "http")]
pub fn new_renderer(config: RendererConfig) -> Result<TicketRenderer<CachedQrSource<HttpQrSource>, DirectorySink>> {
    config.validate()?;
    let qr = CachedQrSource::new(HttpQrSource::new(&config)?, config.qr_cache_capacity);
    let sink = DirectorySink::new(config.output_dir.clone());
    TicketRenderer::new(config, qr, sink)
}
