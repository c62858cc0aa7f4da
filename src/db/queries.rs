use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::db::sql::Cents;
use crate::models::{
    Account, Booking, BookingStatus, EntryKind, Invoice, InvoiceStatus, Payment,
    PaymentDistribution, PaymentStatus, Room, TimeSlot, Venue, VenueType, WalletTransaction,
};

// ── Accounts ──

const ACCOUNT_COLUMNS: &str = "id, username, role, wallet_cents, is_active, created_at";

pub fn insert_account(conn: &Connection, account: &Account) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, username, role, wallet_cents, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id,
            account.username,
            account.role,
            Cents(account.wallet_balance),
            account.is_active,
            account.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, id: &str) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![id],
        parse_account_row,
    )
    .optional()
}

pub fn set_account_active(conn: &Connection, id: &str, active: bool) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE accounts SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    Ok(count > 0)
}

pub fn get_wallet_balance(conn: &Connection, id: &str) -> rusqlite::Result<Option<Decimal>> {
    conn.query_row(
        "SELECT wallet_cents FROM accounts WHERE id = ?1",
        params![id],
        |row| row.get::<_, Cents>(0).map(|c| c.0),
    )
    .optional()
}

/// Check-and-decrement in one statement. Returns false when the account is
/// missing or its balance is below `amount`; nothing is written in that case.
pub fn debit_wallet(conn: &Connection, id: &str, amount: Decimal) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE accounts SET wallet_cents = wallet_cents - ?1
         WHERE id = ?2 AND wallet_cents >= ?1",
        params![Cents(amount), id],
    )?;
    Ok(count > 0)
}

pub fn credit_wallet(conn: &Connection, id: &str, amount: Decimal) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE accounts SET wallet_cents = wallet_cents + ?1 WHERE id = ?2",
        params![Cents(amount), id],
    )?;
    Ok(count > 0)
}

fn parse_account_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        role: row.get(2)?,
        wallet_balance: row.get::<_, Cents>(3)?.0,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// ── Venues & Rooms ──

const ROOM_COLUMNS: &str = "r.id, r.venue_id, r.name, r.capacity, r.price_per_hour_cents, r.is_active";
const VENUE_COLUMNS: &str = "v.id, v.owner_id, v.name, v.venue_type, v.is_active, v.created_at";

pub fn insert_venue(
    conn: &Connection,
    owner_id: &str,
    name: &str,
    venue_type: VenueType,
    created_at: &DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO venues (owner_id, name, venue_type, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, name, venue_type, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_venue(conn: &Connection, id: i64) -> rusqlite::Result<Option<Venue>> {
    conn.query_row(
        &format!("SELECT {VENUE_COLUMNS} FROM venues v WHERE v.id = ?1"),
        params![id],
        |row| parse_venue_row(row, 0),
    )
    .optional()
}

pub fn insert_room(
    conn: &Connection,
    venue_id: i64,
    name: &str,
    capacity: u32,
    price_per_hour: Decimal,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO rooms (venue_id, name, capacity, price_per_hour_cents) VALUES (?1, ?2, ?3, ?4)",
        params![venue_id, name, capacity, Cents(price_per_hour)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_room(conn: &Connection, id: i64) -> rusqlite::Result<Option<Room>> {
    conn.query_row(
        &format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ?1"),
        params![id],
        |row| parse_room_row(row, 0),
    )
    .optional()
}

/// A room together with the venue that owns it.
pub fn get_room_with_venue(conn: &Connection, id: i64) -> rusqlite::Result<Option<(Room, Venue)>> {
    conn.query_row(
        &format!(
            "SELECT {ROOM_COLUMNS}, {VENUE_COLUMNS}
             FROM rooms r INNER JOIN venues v ON v.id = r.venue_id
             WHERE r.id = ?1"
        ),
        params![id],
        |row| Ok((parse_room_row(row, 0)?, parse_venue_row(row, 6)?)),
    )
    .optional()
}

pub fn update_room_terms(
    conn: &Connection,
    id: i64,
    price_per_hour: Decimal,
    capacity: u32,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE rooms SET price_per_hour_cents = ?1, capacity = ?2 WHERE id = ?3",
        params![Cents(price_per_hour), capacity, id],
    )?;
    Ok(count > 0)
}

fn parse_room_row(row: &Row, offset: usize) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(offset)?,
        venue_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        capacity: row.get(offset + 3)?,
        price_per_hour: row.get::<_, Cents>(offset + 4)?.0,
        is_active: row.get(offset + 5)?,
    })
}

fn parse_venue_row(row: &Row, offset: usize) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(offset)?,
        owner_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        venue_type: row.get(offset + 3)?,
        is_active: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
    })
}

// ── Time Slots ──

/// Returns false when an identical window already exists.
pub fn insert_time_slot(
    conn: &Connection,
    room_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO time_slots (room_id, start_time, end_time) VALUES (?1, ?2, ?3)",
        params![room_id, start, end],
    )?;
    Ok(count > 0)
}

pub fn get_time_slots_in_range(
    conn: &Connection,
    room_id: i64,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> rusqlite::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, room_id, start_time, end_time, is_available FROM time_slots
         WHERE room_id = ?1 AND start_time < ?3 AND end_time > ?2
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![room_id, from, to], |row| {
        Ok(TimeSlot {
            id: row.get(0)?,
            room_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            is_available: row.get(4)?,
        })
    })?;

    rows.collect()
}

pub fn claim_time_slots(
    conn: &Connection,
    room_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE time_slots SET is_available = 0
         WHERE room_id = ?1 AND start_time < ?3 AND end_time > ?2 AND is_available = 1",
        params![room_id, start, end],
    )
}

/// Frees windows intersecting the interval unless another active booking
/// still covers them.
pub fn release_time_slots(
    conn: &Connection,
    room_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE time_slots SET is_available = 1
         WHERE room_id = ?1 AND start_time < ?3 AND end_time > ?2 AND is_available = 0
           AND NOT EXISTS (
               SELECT 1 FROM bookings b
               WHERE b.room_id = time_slots.room_id
                 AND b.status IN ('pending', 'confirmed')
                 AND b.start_time < time_slots.end_time
                 AND b.end_time > time_slots.start_time
           )",
        params![room_id, start, end],
    )
}

/// Recomputes every window flag of a room from booking state.
pub fn resync_time_slots(conn: &Connection, room_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE time_slots SET is_available = NOT EXISTS (
               SELECT 1 FROM bookings b
               WHERE b.room_id = time_slots.room_id
                 AND b.status IN ('pending', 'confirmed')
                 AND b.start_time < time_slots.end_time
                 AND b.end_time > time_slots.start_time
           )
         WHERE room_id = ?1",
        params![room_id],
    )
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, account_id, room_id, start_time, end_time, num_guests, \
     special_requests, status, total_price_cents, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, account_id, room_id, start_time, end_time, num_guests, special_requests, status, total_price_cents, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.account_id,
            booking.room_id,
            booking.start_time,
            booking.end_time,
            booking.num_guests,
            booking.special_requests,
            booking.status,
            Cents(booking.total_price),
            booking.created_at,
            booking.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        parse_booking_row,
    )
    .optional()
}

/// Overlap test over pending and confirmed bookings:
/// `existing.start < end AND existing.end > start`.
pub fn has_overlapping_booking(
    conn: &Connection,
    room_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    exclude_id: Option<&str>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (
             SELECT 1 FROM bookings
             WHERE room_id = ?1
               AND status IN ('pending', 'confirmed')
               AND start_time < ?3
               AND end_time > ?2
               AND (?4 IS NULL OR id != ?4)
         )",
        params![room_id, start, end, exclude_id],
        |row| row.get(0),
    )
}

pub fn get_active_bookings_in_range(
    conn: &Connection,
    room_id: i64,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE room_id = ?1 AND status IN ('pending', 'confirmed')
           AND start_time < ?3 AND end_time > ?2
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![room_id, from, to], parse_booking_row)?;
    rows.collect()
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, updated_at, id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_interval(
    conn: &Connection,
    booking: &Booking,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET start_time = ?1, end_time = ?2, total_price_cents = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            booking.start_time,
            booking.end_time,
            Cents(booking.total_price),
            booking.updated_at,
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

/// Moves every confirmed booking whose interval has ended to `completed`.
pub fn complete_due_bookings(conn: &Connection, now: &DateTime<Utc>) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE bookings SET status = 'completed', updated_at = ?1
         WHERE status = 'confirmed' AND end_time <= ?1",
        params![now],
    )
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        account_id: row.get(1)?,
        room_id: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        num_guests: row.get(5)?,
        special_requests: row.get(6)?,
        status: row.get(7)?,
        total_price: row.get::<_, Cents>(8)?.0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

// ── Wallet Transactions ──

pub struct NewWalletTransaction<'a> {
    pub account_id: &'a str,
    pub amount: Decimal,
    pub kind: EntryKind,
    pub description: &'a str,
    pub reference_id: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

pub fn insert_wallet_transaction(
    conn: &Connection,
    entry: &NewWalletTransaction<'_>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO wallet_transactions (account_id, amount_cents, kind, description, reference_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.account_id,
            Cents(entry.amount),
            entry.kind,
            entry.description,
            entry.reference_id,
            entry.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent first.
pub fn get_wallet_transactions(
    conn: &Connection,
    account_id: &str,
    limit: i64,
) -> rusqlite::Result<Vec<WalletTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, amount_cents, kind, description, reference_id, created_at
         FROM wallet_transactions WHERE account_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![account_id, limit], |row| {
        Ok(WalletTransaction {
            id: row.get(0)?,
            account_id: row.get(1)?,
            amount: row.get::<_, Cents>(2)?.0,
            kind: row.get(3)?,
            description: row.get(4)?,
            reference_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    rows.collect()
}

pub fn sum_wallet_transactions(conn: &Connection, account_id: &str) -> rusqlite::Result<Decimal> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM wallet_transactions WHERE account_id = ?1",
        params![account_id],
        |row| row.get::<_, Cents>(0).map(|c| c.0),
    )
}

// ── Payments ──

const PAYMENT_COLUMNS: &str =
    "id, booking_id, account_id, amount_cents, status, gateway_reference, created_at, updated_at";

pub fn insert_payment(conn: &Connection, payment: &Payment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, booking_id, account_id, amount_cents, status, gateway_reference, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            payment.id,
            payment.booking_id,
            payment.account_id,
            Cents(payment.amount),
            payment.status,
            payment.gateway_reference,
            payment.created_at,
            payment.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_payment(conn: &Connection, id: &str) -> rusqlite::Result<Option<Payment>> {
    conn.query_row(
        &format!("SELECT {PAYMENT_COLUMNS} FROM transactions WHERE id = ?1"),
        params![id],
        parse_payment_row,
    )
    .optional()
}

/// Latest payment for a booking in the given status.
pub fn get_booking_payment_with_status(
    conn: &Connection,
    booking_id: &str,
    status: PaymentStatus,
) -> rusqlite::Result<Option<Payment>> {
    conn.query_row(
        &format!(
            "SELECT {PAYMENT_COLUMNS} FROM transactions
             WHERE booking_id = ?1 AND status = ?2
             ORDER BY created_at DESC LIMIT 1"
        ),
        params![booking_id, status],
        parse_payment_row,
    )
    .optional()
}

pub fn get_payments_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> rusqlite::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM transactions WHERE booking_id = ?1 ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![booking_id], parse_payment_row)?;
    rows.collect()
}

pub fn update_payment_status(
    conn: &Connection,
    id: &str,
    status: PaymentStatus,
    gateway_reference: Option<&str>,
    updated_at: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE transactions
         SET status = ?1, gateway_reference = COALESCE(?2, gateway_reference), updated_at = ?3
         WHERE id = ?4",
        params![status, gateway_reference, updated_at, id],
    )?;
    Ok(count > 0)
}

/// Fails every payment still awaiting the gateway for a booking.
pub fn fail_pending_payments(
    conn: &Connection,
    booking_id: &str,
    updated_at: &DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE transactions SET status = ?1, updated_at = ?2
         WHERE booking_id = ?3 AND status = ?4",
        params![
            PaymentStatus::Failed,
            updated_at,
            booking_id,
            PaymentStatus::Pending
        ],
    )
}

fn parse_payment_row(row: &Row) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: row.get::<_, Cents>(3)?.0,
        status: row.get(4)?,
        gateway_reference: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// ── Payment Distributions ──

const DISTRIBUTION_COLUMNS: &str = "id, transaction_id, admin_cents, owner_cents, owner_id, \
     is_paid_to_owner, paid_date, created_at";

pub fn insert_distribution(
    conn: &Connection,
    transaction_id: &str,
    admin_amount: Decimal,
    owner_amount: Decimal,
    owner_id: &str,
    created_at: &DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO payment_distributions (transaction_id, admin_cents, owner_cents, owner_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transaction_id,
            Cents(admin_amount),
            Cents(owner_amount),
            owner_id,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_distribution(
    conn: &Connection,
    id: i64,
) -> rusqlite::Result<Option<PaymentDistribution>> {
    conn.query_row(
        &format!("SELECT {DISTRIBUTION_COLUMNS} FROM payment_distributions WHERE id = ?1"),
        params![id],
        parse_distribution_row,
    )
    .optional()
}

pub fn get_distribution_for_payment(
    conn: &Connection,
    transaction_id: &str,
) -> rusqlite::Result<Option<PaymentDistribution>> {
    conn.query_row(
        &format!(
            "SELECT {DISTRIBUTION_COLUMNS} FROM payment_distributions WHERE transaction_id = ?1"
        ),
        params![transaction_id],
        parse_distribution_row,
    )
    .optional()
}

/// One-way flip; an already-paid row keeps its original paid date.
pub fn mark_distribution_paid(
    conn: &Connection,
    id: i64,
    paid_date: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE payment_distributions SET is_paid_to_owner = 1, paid_date = ?1
         WHERE id = ?2 AND is_paid_to_owner = 0",
        params![paid_date, id],
    )?;
    Ok(count > 0)
}

pub fn get_unpaid_distributions(
    conn: &Connection,
    owner_id: Option<&str>,
) -> rusqlite::Result<Vec<PaymentDistribution>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISTRIBUTION_COLUMNS} FROM payment_distributions
         WHERE is_paid_to_owner = 0 AND (?1 IS NULL OR owner_id = ?1)
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id], parse_distribution_row)?;
    rows.collect()
}

fn parse_distribution_row(row: &Row) -> rusqlite::Result<PaymentDistribution> {
    Ok(PaymentDistribution {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        admin_amount: row.get::<_, Cents>(2)?.0,
        owner_amount: row.get::<_, Cents>(3)?.0,
        owner_id: row.get(4)?,
        is_paid_to_owner: row.get(5)?,
        paid_date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

// ── Invoices ──

const INVOICE_COLUMNS: &str = "id, invoice_number, booking_id, account_id, issued_at, due_date, \
     total_cents, status, updated_at";

pub struct NewInvoice<'a> {
    pub invoice_number: &'a str,
    pub booking_id: &'a str,
    pub account_id: &'a str,
    pub issued_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
}

/// One invoice per booking: a second issue refreshes the total and status of
/// the existing row and keeps its number.
pub fn upsert_invoice(conn: &Connection, invoice: &NewInvoice<'_>) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO invoices (invoice_number, booking_id, account_id, issued_at, due_date, total_cents, status, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?4)
         ON CONFLICT (booking_id) DO UPDATE
         SET total_cents = excluded.total_cents,
             status = excluded.status,
             updated_at = excluded.updated_at",
        params![
            invoice.invoice_number,
            invoice.booking_id,
            invoice.account_id,
            invoice.issued_at,
            invoice.due_date,
            Cents(invoice.total_amount),
            invoice.status,
        ],
    )?;
    Ok(())
}

pub fn get_invoice_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> rusqlite::Result<Option<Invoice>> {
    conn.query_row(
        &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE booking_id = ?1"),
        params![booking_id],
        parse_invoice_row,
    )
    .optional()
}

pub fn get_invoice_by_number(
    conn: &Connection,
    invoice_number: &str,
) -> rusqlite::Result<Option<Invoice>> {
    conn.query_row(
        &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_number = ?1"),
        params![invoice_number],
        parse_invoice_row,
    )
    .optional()
}

/// Newest first.
pub fn get_invoices_for_account(
    conn: &Connection,
    account_id: &str,
) -> rusqlite::Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices
         WHERE account_id = ?1 ORDER BY issued_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![account_id], parse_invoice_row)?;
    rows.collect()
}

pub fn update_invoice_status(
    conn: &Connection,
    booking_id: &str,
    status: InvoiceStatus,
    updated_at: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE invoices SET status = ?1, updated_at = ?2 WHERE booking_id = ?3",
        params![status, updated_at, booking_id],
    )?;
    Ok(count > 0)
}

/// Re-prices an invoice that has not been paid yet.
pub fn update_unpaid_invoice_total(
    conn: &Connection,
    booking_id: &str,
    total_amount: Decimal,
    updated_at: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE invoices SET total_cents = ?1, updated_at = ?2
         WHERE booking_id = ?3 AND status = ?4",
        params![Cents(total_amount), updated_at, booking_id, InvoiceStatus::Sent],
    )?;
    Ok(count > 0)
}

fn parse_invoice_row(row: &Row) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        booking_id: row.get(2)?,
        account_id: row.get(3)?,
        issued_at: row.get(4)?,
        due_date: row.get(5)?,
        total_amount: row.get::<_, Cents>(6)?.0,
        status: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
