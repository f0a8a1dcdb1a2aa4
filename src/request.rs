//! The render request and the output formats it can be rendered to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Everything the renderer needs to know about one ticket.
///
/// Built from already-fetched data right before a render (see
/// [`crate::records`]) and borrowed immutably for the whole render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRenderRequest {
    /// Opaque identifier, appended to the verification URL
    pub id: String,
    /// Display name of the event
    pub title: String,
    /// Human-readable ticket or order number
    #[serde(default)]
    pub reference_code: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub venue_label: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub status: Option<String>,
}

impl TicketRenderRequest {
    /// Minimal request with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            reference_code: None,
            event_date: None,
            venue_label: None,
            start_time: None,
            price: 0.0,
            status: None,
        }
    }

    /// Check the preconditions of a render.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidRequest("ticket id must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRequest("ticket title must not be empty".into()));
        }
        if !self.price.is_finite() {
            return Err(Error::InvalidRequest(format!("price {} is not a finite amount", self.price)));
        }
        Ok(())
    }

    /// The reference shown on the ticket and used in the filename, falling
    /// back to the id when no reference code is set.
    pub fn reference(&self) -> &str {
        match self.reference_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => self.id.trim(),
        }
    }

    /// Uppercased status label, if any.
    pub fn status_label(&self) -> Option<String> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }

    /// `<glyph><amount>` with two decimals.
    pub fn price_label(&self, currency_symbol: &str) -> String {
        format!("{}{:.2}", currency_symbol, self.price)
    }

    /// Suggested download filename: `ticket-<reference>.<ext>`.
    pub fn filename(&self, format: RenderFormat) -> String {
        let stem: String = self
            .reference()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '-',
                c if c.is_control() => '-',
                c => c,
            })
            .collect();
        format!("ticket-{}.{}", stem, format.extension())
    }

    /// The payload encoded into the QR code: the base URL followed by the id
    /// exactly as given.
    pub fn verification_payload(&self, verification_base_url: &str) -> String {
        format!("{}{}", verification_base_url, self.id)
    }
}

/// Output kind of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Raster image, encoded as PNG
    Image,
    /// Single-page landscape document, encoded as PDF
    Document,
}

impl RenderFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RenderFormat::Image => "png",
            RenderFormat::Document => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            RenderFormat::Image => "image/png",
            RenderFormat::Document => "application/pdf",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFormat::Image => f.write_str("image"),
            RenderFormat::Document => f.write_str("document"),
        }
    }
}

impl FromStr for RenderFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "png" => Ok(RenderFormat::Image),
            "document" | "pdf" => Ok(RenderFormat::Document),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Validate that `base` is an absolute URL usable as a verification prefix.
pub fn validate_verification_base(base: &str) -> Result<()> {
    url::Url::parse(base)
        .map(|_| ())
        .map_err(|e| Error::InvalidRequest(format!("verification base URL {:?} is invalid: {}", base, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concert() -> TicketRenderRequest {
        TicketRenderRequest {
            event_date: Some("2025-01-15".into()),
            venue_label: Some("Music Hall".into()),
            price: 50.0,
            ..TicketRenderRequest::new("42", "Concert Night")
        }
    }

    #[test]
    fn filename_falls_back_to_id() {
        let req = concert();
        assert_eq!(req.filename(RenderFormat::Image), "ticket-42.png");
        assert_eq!(req.filename(RenderFormat::Document), "ticket-42.pdf");

        let blank = TicketRenderRequest { reference_code: Some("  ".into()), ..concert() };
        assert_eq!(blank.reference(), "42");
    }

    #[test]
    fn filename_uses_reference_code() {
        let req = TicketRenderRequest { reference_code: Some("TKT-2025-001".into()), ..concert() };
        assert_eq!(req.filename(RenderFormat::Image), "ticket-TKT-2025-001.png");
    }

    #[test]
    fn filename_strips_path_separators() {
        let req = TicketRenderRequest { reference_code: Some("../a/b".into()), ..concert() };
        assert_eq!(req.filename(RenderFormat::Document), "ticket-..-a-b.pdf");
    }

    #[test]
    fn zero_price_keeps_decimals() {
        let req = TicketRenderRequest { price: 0.0, ..concert() };
        assert_eq!(req.price_label("$"), "$0.00");
        assert_eq!(concert().price_label("$"), "$50.00");
    }

    #[test]
    fn validation_rejects_missing_fields() {
        assert!(concert().validate().is_ok());
        assert!(TicketRenderRequest::new("", "x").validate().is_err());
        assert!(TicketRenderRequest::new("1", " ").validate().is_err());
        let nan = TicketRenderRequest { price: f64::NAN, ..concert() };
        assert!(matches!(nan.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("image".parse::<RenderFormat>().unwrap(), RenderFormat::Image);
        assert_eq!("PDF".parse::<RenderFormat>().unwrap(), RenderFormat::Document);
        assert!(matches!("gif".parse::<RenderFormat>(), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let json = r#"{"id":"42","title":"Concert Night","eventDate":"2025-01-15","venueLabel":"Music Hall","price":50}"#;
        let req: TicketRenderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req, concert());
    }

    #[test]
    fn verification_payload_concatenates() {
        assert_eq!(concert().verification_payload("https://tix.example/"), "https://tix.example/42");
        let padded = TicketRenderRequest::new("42 ", "Concert Night");
        assert_eq!(padded.verification_payload("https://tix.example/?t="), "https://tix.example/?t=42 ");
        assert!(validate_verification_base("https://tix.example/").is_ok());
        assert!(validate_verification_base("not a url").is_err());
    }
}
