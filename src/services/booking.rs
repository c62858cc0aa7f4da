//! Reservation lifecycle: pending -> confirmed -> cancelled | completed.
//!
//! Every operation that changes a reservation opens an IMMEDIATE transaction,
//! so SQLite's write lock is held from the first read. The overlap check, the
//! wallet debit and the insert are therefore serialized against every other
//! writer on the same database file. Any error returned before `commit` drops
//! the transaction and rolls everything back.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Account, Booking, BookingStatus, EntryKind, Interval, InvoiceStatus, Payment, PaymentStatus,
    Room, Venue,
};
use crate::services::{availability, invoices};
use crate::services::ledger::{self, Posting};
use crate::services::refund::{RefundPolicy, RefundQuote};
use crate::services::settlement::{self, SettlementPolicy};
use crate::services::venues;

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub account_id: String,
    pub room_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub num_guests: u32,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub refund: RefundQuote,
    /// What was actually credited back; zero when nothing had been charged.
    pub refunded: Decimal,
}

/// Hourly rate times duration, rounded half-up to cents.
pub fn quote_price(rate: Decimal, interval: &Interval) -> Decimal {
    (rate * Decimal::from(interval.duration_seconds()) / Decimal::from(3600))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_eligible_for_completion(booking: &Booking, now: DateTime<Utc>) -> bool {
    booking.status == BookingStatus::Confirmed && now >= booking.end_time
}

pub fn get_reservation(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

/// Books and pays in one step: the payer's wallet is debited, the booking is
/// stored as confirmed and the charge is settled.
pub fn create_reservation(
    conn: &mut Connection,
    settlement_policy: &SettlementPolicy,
    req: &ReservationRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let interval = validate_request(req, now)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (room, venue) = reserve(&tx, req, &interval)?;

    let booking = new_booking(req, &interval, &room, BookingStatus::Confirmed, now)?;
    queries::insert_booking(&tx, &booking)?;
    availability::claim_windows(&tx, room.id, &interval)?;
    charge(&tx, settlement_policy, &booking, &room, &venue, now)?;

    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        room_id = room.id,
        account_id = %booking.account_id,
        total = %booking.total_price,
        "reservation created"
    );
    Ok(booking)
}

/// Reserves the interval as pending without moving any money. Paid later by
/// `pay_reservation` or through the payment gateway.
pub fn hold_reservation(
    conn: &mut Connection,
    req: &ReservationRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let interval = validate_request(req, now)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (room, _) = reserve(&tx, req, &interval)?;

    let booking = new_booking(req, &interval, &room, BookingStatus::Pending, now)?;
    queries::insert_booking(&tx, &booking)?;
    availability::claim_windows(&tx, room.id, &interval)?;

    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        room_id = room.id,
        total = %booking.total_price,
        "reservation held"
    );
    Ok(booking)
}

/// Wallet checkout by the payer of an active reservation that has not been
/// charged yet. A pending reservation is confirmed by the payment.
pub fn pay_reservation(
    conn: &mut Connection,
    settlement_policy: &SettlementPolicy,
    actor: &Account,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = get_reservation(&tx, booking_id)?;

    if booking.account_id != actor.id {
        return Err(AppError::Forbidden(format!(
            "only the payer can pay booking {booking_id}"
        )));
    }
    ensure_payable(&tx, &booking)?;

    let (room, venue) = room_with_venue(&tx, booking.room_id)?;
    charge(&tx, settlement_policy, &booking, &room, &venue, now)?;
    if booking.status == BookingStatus::Pending {
        queries::update_booking_status(&tx, &booking.id, BookingStatus::Confirmed, &now)?;
    }
    let booking = get_reservation(&tx, booking_id)?;

    tx.commit()?;

    tracing::info!(booking_id, total = %booking.total_price, "reservation paid");
    Ok(booking)
}

/// Owner or admin approval of a pending reservation. Approval does not charge;
/// an approved reservation can still be paid until it is.
pub fn confirm_reservation(
    conn: &mut Connection,
    actor: &Account,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = get_reservation(&tx, booking_id)?;
    let (_, venue) = room_with_venue(&tx, booking.room_id)?;
    venues::ensure_manages(actor, &venue)?;
    ensure_transition(&booking, BookingStatus::Confirmed)?;

    queries::update_booking_status(&tx, &booking.id, BookingStatus::Confirmed, &now)?;
    let booking = get_reservation(&tx, booking_id)?;
    tx.commit()?;

    tracing::info!(booking_id, actor_id = %actor.id, "reservation confirmed");
    Ok(booking)
}

pub fn cancel_reservation(
    conn: &mut Connection,
    policy: &RefundPolicy,
    actor: &Account,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<CancellationOutcome, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = get_reservation(&tx, booking_id)?;
    let (room, venue) = room_with_venue(&tx, booking.room_id)?;

    if booking.account_id != actor.id && venues::ensure_manages(actor, &venue).is_err() {
        return Err(AppError::Forbidden(format!(
            "account {} cannot cancel booking {booking_id}",
            actor.id
        )));
    }
    if booking.status.is_terminal() {
        return Err(AppError::AlreadyTerminal {
            id: booking.id,
            status: booking.status,
        });
    }
    if booking.start_time <= now {
        tracing::warn!(booking_id, "cancellation rejected: booking already started");
        return Err(AppError::TooLateToCancel(booking.id));
    }

    let refund = policy.compute_refund(&booking, now);
    let mut refunded = Decimal::ZERO;

    if let Some(charge) =
        queries::get_booking_payment_with_status(&tx, &booking.id, PaymentStatus::Completed)?
    {
        if refund.amount > Decimal::ZERO {
            ledger::credit(
                &tx,
                Posting {
                    account_id: &booking.account_id,
                    amount: refund.amount,
                    kind: EntryKind::Refund,
                    description: format!(
                        "Refund ({}%) for cancelled booking at {} - {}",
                        refund.percent, venue.name, room.name
                    ),
                    reference_id: Some(booking.id.as_str()),
                    at: now,
                },
            )?;
            refunded = refund.amount;
        }
        queries::update_payment_status(&tx, &charge.id, PaymentStatus::Refunded, None, &now)?;
    }

    queries::update_booking_status(&tx, &booking.id, BookingStatus::Cancelled, &now)?;
    invoices::cancel(&tx, &booking.id, now)?;
    availability::release_windows(&tx, booking.room_id, &booking.interval())?;
    let booking = get_reservation(&tx, booking_id)?;

    tx.commit()?;

    tracing::info!(
        booking_id,
        actor_id = %actor.id,
        percent = %refund.percent,
        refunded = %refunded,
        "reservation cancelled"
    );
    Ok(CancellationOutcome {
        booking,
        refund,
        refunded,
    })
}

/// Moves an active reservation to a new interval. A charged reservation must
/// keep its duration. An uncharged one is re-priced at the room's current rate,
/// its open gateway payments are failed and its invoice follows the new total.
pub fn reschedule_reservation(
    conn: &mut Connection,
    actor: &Account,
    booking_id: &str,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let interval = Interval::new(new_start, new_end)?;
    if interval.start < now {
        return Err(AppError::Validation(
            "cannot reschedule into the past".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut booking = get_reservation(&tx, booking_id)?;
    let (room, venue) = room_with_venue(&tx, booking.room_id)?;

    if booking.account_id != actor.id && venues::ensure_manages(actor, &venue).is_err() {
        return Err(AppError::Forbidden(format!(
            "account {} cannot reschedule booking {booking_id}",
            actor.id
        )));
    }
    if !booking.status.is_active() {
        return Err(AppError::AlreadyTerminal {
            id: booking.id,
            status: booking.status,
        });
    }
    if booking.start_time <= now {
        return Err(AppError::Validation(format!(
            "booking {booking_id} has already started"
        )));
    }

    let previous = booking.interval();
    let charged =
        queries::get_booking_payment_with_status(&tx, &booking.id, PaymentStatus::Completed)?
            .is_some();
    if charged {
        if interval.duration_seconds() != previous.duration_seconds() {
            return Err(AppError::Validation(
                "a paid booking can only be moved to an interval of the same length".to_string(),
            ));
        }
    } else {
        booking.total_price = priced(&room, &interval)?;
    }

    let excluded = Some(booking.id.as_str());
    if availability::check_overlap(&tx, room.id, interval.start, interval.end, excluded)? {
        tracing::warn!(booking_id, room_id = room.id, "reschedule rejected: slot conflict");
        return Err(AppError::SlotConflict { room_id: room.id });
    }

    booking.start_time = interval.start;
    booking.end_time = interval.end;
    booking.updated_at = now;
    queries::update_booking_interval(&tx, &booking)?;

    if !charged {
        let failed = queries::fail_pending_payments(&tx, &booking.id, &now)?;
        if failed > 0 {
            tracing::info!(booking_id, failed, "stale gateway payments failed on reschedule");
        }
        invoices::reprice(&tx, &booking.id, booking.total_price, now)?;
    }

    // The booking no longer covers its old interval, so release sees only
    // the other reservations.
    availability::release_windows(&tx, room.id, &previous)?;
    availability::claim_windows(&tx, room.id, &interval)?;

    tx.commit()?;

    tracing::info!(
        booking_id,
        from = %previous.start,
        to = %interval.start,
        "reservation rescheduled"
    );
    Ok(booking)
}

pub fn complete_reservation(
    conn: &mut Connection,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = get_reservation(&tx, booking_id)?;
    ensure_transition(&booking, BookingStatus::Completed)?;
    if !is_eligible_for_completion(&booking, now) {
        return Err(AppError::Validation(format!(
            "booking {booking_id} has not ended yet"
        )));
    }

    queries::update_booking_status(&tx, &booking.id, BookingStatus::Completed, &now)?;
    let booking = get_reservation(&tx, booking_id)?;
    tx.commit()?;

    tracing::info!(booking_id, "reservation completed");
    Ok(booking)
}

/// Completes every confirmed reservation that has ended by `now`.
pub fn complete_due_reservations(
    conn: &mut Connection,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let count = queries::complete_due_bookings(&tx, &now)?;
    tx.commit()?;

    if count > 0 {
        tracing::info!(count, "due reservations completed");
    }
    Ok(count)
}

// ── Helpers ──

fn validate_request(req: &ReservationRequest, now: DateTime<Utc>) -> Result<Interval, AppError> {
    let interval = Interval::new(req.start, req.end)?;
    if interval.start < now {
        return Err(AppError::Validation(
            "cannot book an interval in the past".to_string(),
        ));
    }
    if req.num_guests == 0 {
        return Err(AppError::Validation("at least one guest is required".to_string()));
    }
    Ok(interval)
}

/// Checks the payer and the room and runs the overlap check. Must be called
/// inside the write transaction.
fn reserve(
    tx: &Transaction<'_>,
    req: &ReservationRequest,
    interval: &Interval,
) -> Result<(Room, Venue), AppError> {
    let payer = queries::get_account(tx, &req.account_id)?
        .ok_or_else(|| AppError::NotFound(format!("account {}", req.account_id)))?;
    if !payer.is_active {
        return Err(AppError::Forbidden(format!("account {} is deactivated", payer.id)));
    }

    let (room, venue) = room_with_venue(tx, req.room_id)?;
    if !room.is_active || !venue.is_active {
        return Err(AppError::Validation(format!(
            "room {} is not accepting bookings",
            room.id
        )));
    }
    if req.num_guests > room.capacity {
        return Err(AppError::Validation(format!(
            "room {} holds at most {} guests",
            room.id, room.capacity
        )));
    }

    if availability::check_overlap(tx, room.id, interval.start, interval.end, None)? {
        tracing::warn!(
            room_id = room.id,
            start = %interval.start,
            "booking rejected: slot conflict"
        );
        return Err(AppError::SlotConflict { room_id: room.id });
    }

    Ok((room, venue))
}

fn new_booking(
    req: &ReservationRequest,
    interval: &Interval,
    room: &Room,
    status: BookingStatus,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    Ok(Booking {
        id: Uuid::new_v4().to_string(),
        account_id: req.account_id.clone(),
        room_id: room.id,
        start_time: interval.start,
        end_time: interval.end,
        num_guests: req.num_guests,
        special_requests: req
            .special_requests
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        status,
        total_price: priced(room, interval)?,
        created_at: now,
        updated_at: now,
    })
}

fn priced(room: &Room, interval: &Interval) -> Result<Decimal, AppError> {
    let price = quote_price(room.price_per_hour, interval);
    if price <= Decimal::ZERO {
        return Err(AppError::Validation(
            "interval is too short to be priced".to_string(),
        ));
    }
    Ok(price)
}

/// Debits the payer, records the completed charge, settles it and marks the
/// invoice paid.
fn charge(
    tx: &Transaction<'_>,
    settlement_policy: &SettlementPolicy,
    booking: &Booking,
    room: &Room,
    venue: &Venue,
    now: DateTime<Utc>,
) -> Result<Payment, AppError> {
    ledger::debit(
        tx,
        Posting {
            account_id: &booking.account_id,
            amount: booking.total_price,
            kind: EntryKind::Booking,
            description: format!("Payment for booking at {} - {}", venue.name, room.name),
            reference_id: Some(booking.id.as_str()),
            at: now,
        },
    )?;

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        booking_id: booking.id.clone(),
        account_id: booking.account_id.clone(),
        amount: booking.total_price,
        status: PaymentStatus::Completed,
        gateway_reference: None,
        created_at: now,
        updated_at: now,
    };
    queries::insert_payment(tx, &payment)?;
    settlement::settle(tx, settlement_policy, &payment, now)?;
    invoices::issue(tx, booking, InvoiceStatus::Paid, now)?;
    Ok(payment)
}

fn room_with_venue(conn: &Connection, room_id: i64) -> Result<(Room, Venue), AppError> {
    queries::get_room_with_venue(conn, room_id)?
        .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))
}

/// A reservation can be charged while it is active and has neither a
/// completed charge nor a payment awaiting the gateway.
pub(crate) fn ensure_payable(conn: &Connection, booking: &Booking) -> Result<(), AppError> {
    if !booking.status.is_active() {
        return Err(AppError::AlreadyTerminal {
            id: booking.id.clone(),
            status: booking.status,
        });
    }
    if queries::get_booking_payment_with_status(conn, &booking.id, PaymentStatus::Completed)?
        .is_some()
    {
        return Err(AppError::AlreadyPaid(booking.id.clone()));
    }
    if let Some(pending) =
        queries::get_booking_payment_with_status(conn, &booking.id, PaymentStatus::Pending)?
    {
        return Err(AppError::PaymentPending {
            booking_id: booking.id.clone(),
            payment_id: pending.id,
        });
    }
    Ok(())
}

fn ensure_transition(booking: &Booking, next: BookingStatus) -> Result<(), AppError> {
    if booking.status.is_terminal() {
        return Err(AppError::AlreadyTerminal {
            id: booking.id.clone(),
            status: booking.status,
        });
    }
    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            id: booking.id.clone(),
            from: booking.status,
            to: next,
        });
    }
    Ok(())
}
