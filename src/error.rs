//! Error types for the ticket renderer

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a render.
///
/// QR service failures never appear here: they are absorbed by the
/// renderer and show up as [`crate::QrStatus::Fallback`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The request failed validation before any drawing happened
    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    /// A format string did not name a supported output kind
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The backend could not allocate a drawing surface
    #[error("Drawing surface unavailable: {0}")]
    DrawingSurfaceUnavailable(String),

    /// The finished surface could not be encoded
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The download sink could not store the payload
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the calling UI should show the generic "could not generate
    /// ticket" notice. Validation and configuration errors are programming
    /// mistakes on the caller side and are reported verbatim instead.
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            Error::DrawingSurfaceUnavailable(_)
                | Error::SerializationFailed(_)
                | Error::DownloadFailed(_)
                | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failures_are_classified() {
        assert!(Error::SerializationFailed("png".into()).is_render_failure());
        assert!(Error::DrawingSurfaceUnavailable("0x0".into()).is_render_failure());
        assert!(!Error::InvalidRequest("empty id".into()).is_render_failure());
        assert_eq!(
            Error::UnsupportedFormat("gif".into()).to_string(),
            "Unsupported output format: gif"
        );
    }
}
