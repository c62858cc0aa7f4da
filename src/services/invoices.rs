//! One invoice per booking. It is issued as `sent` when a gateway checkout
//! opens, flips to `paid` when a charge completes and to `cancelled` with the
//! booking. Every function runs inside the caller's transaction.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::queries::{self, NewInvoice};
use crate::errors::AppError;
use crate::models::{Account, Booking, Invoice, InvoiceStatus, Role};

/// Days between issue and due date.
pub const PAYMENT_TERMS_DAYS: i64 = 7;

/// `INV-<issue date>-<first 12 hex digits of the booking id>`.
pub fn invoice_number(booking_id: &str, issued_at: DateTime<Utc>) -> String {
    let suffix: String = booking_id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(12)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("INV-{}-{suffix}", issued_at.format("%Y%m%d"))
}

/// Issues the booking's invoice for its current total, or refreshes the
/// existing one.
pub fn issue(
    conn: &Connection,
    booking: &Booking,
    status: InvoiceStatus,
    now: DateTime<Utc>,
) -> Result<Invoice, AppError> {
    let number = invoice_number(&booking.id, now);
    queries::upsert_invoice(
        conn,
        &NewInvoice {
            invoice_number: &number,
            booking_id: &booking.id,
            account_id: &booking.account_id,
            issued_at: now,
            due_date: (now + Duration::days(PAYMENT_TERMS_DAYS)).date_naive(),
            total_amount: booking.total_price,
            status,
        },
    )?;

    let invoice = for_booking(conn, &booking.id)?;
    tracing::info!(
        invoice_number = %invoice.invoice_number,
        booking_id = %booking.id,
        status = %invoice.status,
        total = %invoice.total_amount,
        "invoice issued"
    );
    Ok(invoice)
}

/// Cancels the booking's invoice if it has one.
pub fn cancel(conn: &Connection, booking_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
    let cancelled =
        queries::update_invoice_status(conn, booking_id, InvoiceStatus::Cancelled, &now)?;
    if cancelled {
        tracing::info!(booking_id, "invoice cancelled");
    }
    Ok(cancelled)
}

/// Follows a re-priced booking. Paid invoices are left alone.
pub fn reprice(
    conn: &Connection,
    booking_id: &str,
    total: Decimal,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    Ok(queries::update_unpaid_invoice_total(conn, booking_id, total, &now)?)
}

pub fn for_booking(conn: &Connection, booking_id: &str) -> Result<Invoice, AppError> {
    queries::get_invoice_for_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("invoice for booking {booking_id}")))
}

/// Looks up an invoice by number on behalf of `actor`, who must be the
/// billed account or an admin.
pub fn get_invoice(
    conn: &Connection,
    actor: &Account,
    invoice_number: &str,
) -> Result<Invoice, AppError> {
    let invoice = queries::get_invoice_by_number(conn, invoice_number)?
        .ok_or_else(|| AppError::NotFound(format!("invoice {invoice_number}")))?;
    if invoice.account_id != actor.id && actor.role != Role::Admin {
        return Err(AppError::Forbidden(format!(
            "invoice {invoice_number} belongs to another account"
        )));
    }
    Ok(invoice)
}

pub fn list_invoices(conn: &Connection, account_id: &str) -> Result<Vec<Invoice>, AppError> {
    Ok(queries::get_invoices_for_account(conn, account_id)?)
}
