use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::Booking;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Cancellation refund rules: a full refund when cancelled at least
/// `full_refund_hours` before the start, `late_refund_percent` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RefundPolicy {
    pub full_refund_hours: i64,
    pub late_refund_percent: Decimal,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            full_refund_hours: 24,
            late_refund_percent: Decimal::from(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundQuote {
    pub percent: Decimal,
    pub amount: Decimal,
}

impl RefundPolicy {
    pub fn compute_refund(&self, booking: &Booking, now: DateTime<Utc>) -> RefundQuote {
        let seconds_before = (booking.start_time - now).num_seconds();
        let percent = if seconds_before >= self.full_refund_hours * 3600 {
            HUNDRED
        } else {
            self.late_refund_percent.clamp(Decimal::ZERO, HUNDRED)
        };

        let amount = (booking.total_price * percent / HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, booking.total_price);

        RefundQuote { percent, amount }
    }
}
