//! Splits completed payments between the platform and the venue owner and
//! tracks whether the owner's share has been paid out.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Payment, PaymentDistribution, PaymentStatus};

#[derive(Debug, Clone, Copy)]
pub struct SettlementPolicy {
    pub platform_fee_percent: Decimal,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            platform_fee_percent: Decimal::from(10),
        }
    }
}

impl SettlementPolicy {
    /// Returns `(platform, owner)`. The owner share absorbs the rounding
    /// remainder so both always add up to `amount`.
    pub fn split(&self, amount: Decimal) -> (Decimal, Decimal) {
        let platform = (amount * self.platform_fee_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (platform, amount - platform)
    }
}

/// Records the split for a completed payment. Must run in the same
/// transaction that completed it.
pub fn settle(
    conn: &Connection,
    policy: &SettlementPolicy,
    payment: &Payment,
    now: DateTime<Utc>,
) -> Result<PaymentDistribution, AppError> {
    if payment.status != PaymentStatus::Completed {
        return Err(AppError::Validation(format!(
            "payment {} is {}, only completed payments can be settled",
            payment.id, payment.status
        )));
    }
    if queries::get_distribution_for_payment(conn, &payment.id)?.is_some() {
        return Err(AppError::AlreadySettled(payment.id.clone()));
    }

    let booking = queries::get_booking(conn, &payment.booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", payment.booking_id)))?;
    let (_, venue) = queries::get_room_with_venue(conn, booking.room_id)?
        .ok_or_else(|| AppError::NotFound(format!("room {}", booking.room_id)))?;

    let (platform, owner) = policy.split(payment.amount);
    let id =
        queries::insert_distribution(conn, &payment.id, platform, owner, &venue.owner_id, &now)
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    AppError::AlreadySettled(payment.id.clone())
                }
                other => AppError::Storage(other),
            })?;

    tracing::info!(
        payment_id = %payment.id,
        distribution_id = id,
        platform = %platform,
        owner = %owner,
        owner_id = %venue.owner_id,
        "payment settled"
    );

    queries::get_distribution(conn, id)?
        .ok_or_else(|| AppError::Internal(format!("distribution {id} vanished")))
}

/// Marks the owner's share as paid out. Calling it again is a no-op that
/// keeps the original paid date.
pub fn mark_paid_to_owner(
    conn: &Connection,
    distribution_id: i64,
    now: DateTime<Utc>,
) -> Result<PaymentDistribution, AppError> {
    if queries::mark_distribution_paid(conn, distribution_id, &now)? {
        tracing::info!(distribution_id, "owner share marked paid");
    }
    queries::get_distribution(conn, distribution_id)?
        .ok_or_else(|| AppError::NotFound(format!("distribution {distribution_id}")))
}

pub fn unpaid_distributions(
    conn: &Connection,
    owner_id: Option<&str>,
) -> Result<Vec<PaymentDistribution>, AppError> {
    Ok(queries::get_unpaid_distributions(conn, owner_id)?)
}
