//! Dashboard aggregates over ticket, order and earnings records

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::records::{EarningRecord, OrderRecord, TicketRecord};

fn has_status(status: &Option<String>, wanted: &str) -> bool {
    status.as_deref().map(|s| s.trim().eq_ignore_ascii_case(wanted)).unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub total_tickets: usize,
    pub active_tickets: usize,
    pub used_tickets: usize,
    pub total_spent: f64,
}

impl TicketStats {
    pub fn from_records(tickets: &[TicketRecord]) -> Self {
        Self {
            total_tickets: tickets.len(),
            active_tickets: tickets.iter().filter(|t| has_status(&t.status, "active")).count(),
            used_tickets: tickets.iter().filter(|t| has_status(&t.status, "used")).count(),
            total_spent: tickets.iter().map(|t| t.price).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderStats {
    pub total_orders: usize,
    pub confirmed_orders: usize,
    pub pending_orders: usize,
    pub total_spent: f64,
}

impl OrderStats {
    pub fn from_records(orders: &[OrderRecord]) -> Self {
        Self {
            total_orders: orders.len(),
            confirmed_orders: orders.iter().filter(|o| has_status(&o.status, "confirmed")).count(),
            pending_orders: orders.iter().filter(|o| has_status(&o.status, "pending")).count(),
            total_spent: orders.iter().map(|o| o.total_amount).sum(),
        }
    }
}

/// A vendor's earnings against what has already been paid out or requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EarningsSummary {
    pub total_earnings: f64,
    pub this_month_earnings: f64,
    pub approved_withdrawals: f64,
    pub pending_withdrawals: f64,
    pub available_for_withdrawal: f64,
}

/// Leading `YYYY-MM-DD` of a date or timestamp string.
fn parse_event_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

impl EarningsSummary {
    /// `today` decides which month counts as "this month".
    pub fn compute(earnings: &[EarningRecord], approved_withdrawals: f64, pending_withdrawals: f64, today: NaiveDate) -> Self {
        let total_earnings: f64 = earnings.iter().map(|e| e.total_revenue).sum();
        let this_month_earnings = earnings
            .iter()
            .filter(|e| {
                e.event_date
                    .as_deref()
                    .and_then(parse_event_date)
                    .map(|d| d.year() == today.year() && d.month() == today.month())
                    .unwrap_or(false)
            })
            .map(|e| e.total_revenue)
            .sum();

        Self {
            total_earnings,
            this_month_earnings,
            approved_withdrawals,
            pending_withdrawals,
            available_for_withdrawal: total_earnings - approved_withdrawals - pending_withdrawals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickets() -> Vec<TicketRecord> {
        serde_json::from_str(
            r#"[
                {"id":1,"event_title":"A","price":"50.00","status":"active"},
                {"id":2,"event_title":"B","price":25,"status":"used"},
                {"id":3,"event_title":"C","price":"oops","status":"Active"},
                {"id":4,"event_title":"D","price":10}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn ticket_stats() {
        let s = TicketStats::from_records(&tickets());
        assert_eq!(s.total_tickets, 4);
        assert_eq!(s.active_tickets, 2);
        assert_eq!(s.used_tickets, 1);
        assert_eq!(s.total_spent, 85.0);
        assert_eq!(TicketStats::from_records(&[]), TicketStats::default());
    }

    #[test]
    fn order_stats() {
        let orders: Vec<OrderRecord> = serde_json::from_str(
            r#"[
                {"id":1,"total_amount":"100","status":"confirmed"},
                {"id":2,"total_amount":"20.5","status":"pending"},
                {"id":3,"total_amount":null,"status":"cancelled"}
            ]"#,
        )
        .unwrap();
        let s = OrderStats::from_records(&orders);
        assert_eq!((s.total_orders, s.confirmed_orders, s.pending_orders), (3, 1, 1));
        assert_eq!(s.total_spent, 120.5);
    }

    #[test]
    fn earnings_this_month_and_available() {
        let earnings: Vec<EarningRecord> = serde_json::from_str(
            r#"[
                {"event_date":"2025-03-02","total_revenue":"300"},
                {"event_date":"2025-03-28T18:00:00Z","total_revenue":200},
                {"event_date":"2024-03-10","total_revenue":"50"},
                {"event_date":null,"total_revenue":"5"},
                {"event_date":"garbage","total_revenue":"1"}
            ]"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let s = EarningsSummary::compute(&earnings, 100.0, 50.0, today);
        assert_eq!(s.total_earnings, 556.0);
        assert_eq!(s.this_month_earnings, 500.0);
        assert_eq!(s.available_for_withdrawal, 406.0);
    }
}
