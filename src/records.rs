//! Ticket and order records as the ticketing API returns them
//!
//! Amounts come over the wire either as JSON numbers or as numeric strings
//! (`"50.00"`); anything unparseable is treated as zero.

use serde::{Deserialize, Deserializer, Serialize};

use crate::request::TicketRenderRequest;

fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => parse_amount(&s),
        _ => 0.0,
    })
}

/// Parse a leading decimal number, ignoring trailing garbage (`"12.5 BDT"`).
pub fn parse_amount(s: &str) -> f64 {
    let s = s.trim();
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let mut candidate = &s[..end];
    // Trim back to the longest prefix that parses, e.g. "1.2.3" -> "1.2"
    while !candidate.is_empty() {
        if let Ok(v) = candidate.parse::<f64>() {
            if v.is_finite() {
                return v;
            }
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A purchased ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub ticket_number: Option<String>,
    #[serde(default, alias = "title")]
    pub event_title: String,
    #[serde(default, alias = "date")]
    pub event_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ticket_type: Option<String>,
}

/// An order for one or more tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub event_title: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: f64,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Per-event revenue line of a vendor's earnings report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningRecord {
    #[serde(default)]
    pub event_title: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_revenue: f64,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl From<&TicketRecord> for TicketRenderRequest {
    fn from(t: &TicketRecord) -> Self {
        TicketRenderRequest {
            id: t.id.clone(),
            title: t.event_title.clone(),
            reference_code: non_blank(&t.ticket_number),
            event_date: non_blank(&t.event_date),
            venue_label: non_blank(&t.location),
            start_time: non_blank(&t.start_time),
            price: t.price,
            status: non_blank(&t.status),
        }
    }
}

impl From<&OrderRecord> for TicketRenderRequest {
    fn from(o: &OrderRecord) -> Self {
        TicketRenderRequest {
            id: o.id.clone(),
            title: o.event_title.clone(),
            reference_code: Some(format!("ORDER-{}", o.id)),
            event_date: non_blank(&o.event_date),
            venue_label: non_blank(&o.location),
            start_time: non_blank(&o.start_time),
            price: o.total_amount,
            status: non_blank(&o.status),
        }
    }
}
