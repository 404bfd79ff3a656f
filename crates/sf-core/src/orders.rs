//! Order read models and listing filters.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use sf_schemas::{Money, Order, OrderItem, OrderStatus, OrderTracking, StatusHistoryEntry};

use crate::status::{completed_stages, parse_status, progress_percent, CompletedStage};
use crate::ShopError;

/// Inclusive calendar-date range, evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Both bounds must be present and `YYYY-MM-DD`; otherwise `None`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        let start = NaiveDate::parse_from_str(start?.trim(), "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(end?.trim(), "%Y-%m-%d").ok()?;
        Some(Self { start, end })
    }

    /// Customer listing: an explicit valid range, else the last `days` days.
    pub fn or_last_days(start: Option<&str>, end: Option<&str>, today: NaiveDate, days: u64) -> Self {
        Self::parse(start, end).unwrap_or_else(|| Self::last_days(today, days))
    }

    /// Half-open UTC instant bounds `[start 00:00, end+1 00:00)`.
    pub fn bounds_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let lo = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let hi = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        (lo, hi)
    }
}

/// Staff listing filter. Both parts optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub range: Option<DateRange>,
}

impl OrderFilter {
    /// An empty status means "all"; an unknown one is an error. A missing or
    /// malformed date range is ignored.
    pub fn from_query(
        status: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, ShopError> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(parse_status(s)?),
            None => None,
        };
        Ok(Self {
            status,
            range: DateRange::parse(start, end),
        })
    }
}

/// Everything the order page shows.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tracking: Option<OrderTracking>,
    /// Newest first.
    pub history: Vec<StatusHistoryEntry>,
    pub progress_percent: u8,
    pub completed_stages: Vec<CompletedStage>,
    pub current_stage_at: Option<DateTime<Utc>>,
}

impl OrderDetail {
    pub fn assemble(
        order: Order,
        items: Vec<OrderItem>,
        tracking: Option<OrderTracking>,
        history: Vec<StatusHistoryEntry>,
    ) -> Self {
        let progress_percent = progress_percent(order.status);
        let completed_stages = tracking.as_ref().map(completed_stages).unwrap_or_default();
        let current_stage_at = tracking
            .as_ref()
            .and_then(|t| t.stage_timestamp(order.status));
        Self {
            order,
            items,
            tracking,
            history,
            progress_percent,
            completed_stages,
            current_stage_at,
        }
    }

    /// Recomputed from the frozen lines; equals `order.total`.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}
