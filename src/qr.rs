//! QR bitmaps: fetching them from the external QR service and caching them
//!
//! The renderer never fails because of a QR problem. Every source returns a
//! [`QrError`] which the renderer logs and turns into the fallback panel.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use log::debug;
use thiserror::Error;

/// Why a QR bitmap could not be obtained
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QrError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("QR service unreachable: {0}")]
    Network(String),

    /// The service answered with a non-2xx status
    #[error("QR service returned HTTP {0}")]
    Status(u16),

    /// The body was not a decodable PNG
    #[error("QR image could not be decoded: {0}")]
    Decode(String),

    /// No QR source is configured
    #[error("QR service disabled")]
    Disabled,
}

/// A decoded QR bitmap, always 8-bit RGBA, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl QrImage {
    /// Decode a PNG of any color type into RGBA8.
    pub fn decode_png(data: &[u8]) -> Result<Self, QrError> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().map_err(|e| QrError::Decode(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(|e| QrError::Decode(e.to_string()))?;
        let bytes = &buf[..info.buffer_size()];

        let (color_type, _) = reader.output_color_type();
        let rgba: Vec<u8> = match color_type {
            png::ColorType::Rgba => bytes.to_vec(),
            png::ColorType::Rgb => bytes.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
            png::ColorType::Grayscale => bytes.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            png::ColorType::GrayscaleAlpha => bytes.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
            png::ColorType::Indexed => {
                return Err(QrError::Decode("palette was not expanded".into()));
            }
        };

        if info.width == 0 || info.height == 0 {
            return Err(QrError::Decode("empty image".into()));
        }

        Ok(Self { width: info.width, height: info.height, rgba })
    }

    /// Pixels composited over white, as packed RGB.
    pub fn to_rgb_over_white(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3] as u16;
                let blend = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
                [blend(p[0]), blend(p[1]), blend(p[2])]
            })
            .collect()
    }
}

/// Somewhere a QR bitmap for a payload can be obtained from.
pub trait QrSource {
    fn fetch(&self, payload: &str) -> impl Future<Output = Result<Arc<QrImage>, QrError>> + Send;
}

/// A source that always fails, forcing the textual fallback panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineQrSource;

impl QrSource for OfflineQrSource {
    async fn fetch(&self, _payload: &str) -> Result<Arc<QrImage>, QrError> {
        Err(QrError::Disabled)
    }
}

/// Build the QR service URL for `payload`.
pub fn service_url(service: &str, pixel_size: u32, payload: &str) -> Result<url::Url, QrError> {
    let mut url = url::Url::parse(service).map_err(|e| QrError::Network(format!("bad service URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("size", &format!("{}x{}", pixel_size, pixel_size))
        .append_pair("format", "png")
        .append_pair("data", payload);
    Ok(url)
}

/// Fetches QR bitmaps from an HTTP QR service with a single GET.
#[cfg(feature = "http")]
pub struct HttpQrSource {
    client: reqwest::Client,
    service: String,
    pixel_size: u32,
}

#[cfg(feature = "http")]
impl HttpQrSource {
    pub fn new(config: &crate::RendererConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| crate::Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            service: config.qr_service_url.clone(),
            pixel_size: config.qr_pixel_size,
        })
    }
}

#[cfg(feature = "http")]
impl QrSource for HttpQrSource {
    async fn fetch(&self, payload: &str) -> Result<Arc<QrImage>, QrError> {
        let url = service_url(&self.service, self.pixel_size, payload)?;
        debug!("fetching QR image from {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QrError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QrError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| QrError::Network(e.to_string()))?;
        QrImage::decode_png(&body).map(Arc::new)
    }
}

struct CacheState {
    images: HashMap<String, Arc<QrImage>>,
    order: VecDeque<String>,
}

/// Wraps a source with a bounded in-memory cache keyed by payload.
///
/// Only successful fetches are cached; once full the oldest entry is evicted.
pub struct CachedQrSource<S> {
    inner: S,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl<S> CachedQrSource<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            state: Mutex::new(CacheState { images: HashMap::new(), order: VecDeque::new() }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.images.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, payload: &str) -> Option<Arc<QrImage>> {
        self.state.lock().ok()?.images.get(payload).cloned()
    }

    fn store(&self, payload: &str, image: Arc<QrImage>) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut state) = self.state.lock() else { return };
        if state.images.contains_key(payload) {
            return;
        }
        while state.order.len() >= self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.images.remove(&oldest);
                }
                None => break,
            }
        }
        state.order.push_back(payload.to_string());
        state.images.insert(payload.to_string(), image);
    }
}

impl<S: QrSource + Sync> QrSource for CachedQrSource<S> {
    async fn fetch(&self, payload: &str) -> Result<Arc<QrImage>, QrError> {
        if let Some(hit) = self.lookup(payload) {
            debug!("QR cache hit for {}", payload);
            return Ok(hit);
        }
        let image = self.inner.fetch(payload).await?;
        self.store(payload, image.clone());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn encode_gray_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let data: Vec<u8> = (0..width * height).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl QrSource for CountingSource {
        async fn fetch(&self, _payload: &str) -> Result<Arc<QrImage>, QrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(QrError::Status(500));
            }
            Ok(Arc::new(QrImage { width: 1, height: 1, rgba: vec![0, 0, 0, 255] }))
        }
    }

    #[test]
    fn decodes_grayscale_png_to_rgba() {
        let img = QrImage::decode_png(&encode_gray_png(4, 2)).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
        assert_eq!(img.rgba.len(), 4 * 2 * 4);
        assert_eq!(&img.rgba[..8], &[0, 0, 0, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(QrImage::decode_png(b"<html>oops</html>"), Err(QrError::Decode(_))));
    }

    #[test]
    fn transparent_pixels_composite_to_white() {
        let img = QrImage { width: 2, height: 1, rgba: vec![0, 0, 0, 0, 10, 20, 30, 255] };
        assert_eq!(img.to_rgb_over_white(), vec![255, 255, 255, 10, 20, 30]);
    }

    #[test]
    fn service_url_encodes_payload() {
        let url = service_url("https://api.qrserver.com/v1/create-qr-code/", 100, "http://x/1?a=b").unwrap();
        let q: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(q["size"], "100x100");
        assert_eq!(q["format"], "png");
        assert_eq!(q["data"], "http://x/1?a=b");
        assert!(url.as_str().contains("data=http%3A%2F%2Fx%2F1%3Fa%3Db"));
    }

    #[tokio::test]
    async fn cache_reuses_successful_fetches() {
        let cache = CachedQrSource::new(CountingSource { calls: AtomicUsize::new(0), fail: false }, 2);
        cache.fetch("a").await.unwrap();
        cache.fetch("a").await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);

        cache.fetch("b").await.unwrap();
        cache.fetch("c").await.unwrap();
        assert_eq!(cache.len(), 2);
        // "a" was evicted first
        cache.fetch("a").await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cache_does_not_store_failures() {
        let cache = CachedQrSource::new(CountingSource { calls: AtomicUsize::new(0), fail: true }, 8);
        assert_eq!(cache.fetch("x").await, Err(QrError::Status(500)));
        assert_eq!(cache.fetch("x").await, Err(QrError::Status(500)));
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn offline_source_is_disabled() {
        assert_eq!(OfflineQrSource.fetch("x").await, Err(QrError::Disabled));
    }
}
