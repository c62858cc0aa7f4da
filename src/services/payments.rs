//! Payments taken outside the wallet. The gateway integration itself lives
//! elsewhere; this module only records what it reports.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Account, BookingStatus, InvoiceStatus, Payment, PaymentDistribution, PaymentStatus,
};
use crate::services::booking::{ensure_payable, get_reservation};
use crate::services::invoices;
use crate::services::settlement::{self, SettlementPolicy};

/// Starts a gateway checkout for an active reservation that has not been
/// charged and has no other checkout in flight. Issues the invoice.
pub fn open_gateway_payment(
    conn: &mut Connection,
    actor: &Account,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<Payment, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = get_reservation(&tx, booking_id)?;
    if booking.account_id != actor.id {
        return Err(AppError::Forbidden(format!(
            "only the payer can pay booking {booking_id}"
        )));
    }
    ensure_payable(&tx, &booking)?;

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        booking_id: booking.id.clone(),
        account_id: booking.account_id.clone(),
        amount: booking.total_price,
        status: PaymentStatus::Pending,
        gateway_reference: None,
        created_at: now,
        updated_at: now,
    };
    queries::insert_payment(&tx, &payment)?;
    invoices::issue(&tx, &booking, InvoiceStatus::Sent, now)?;
    tx.commit()?;

    tracing::info!(
        payment_id = %payment.id,
        booking_id,
        amount = %payment.amount,
        "gateway payment opened"
    );
    Ok(payment)
}

/// Gateway reported success: the charge completes, is settled, the invoice is
/// paid and the reservation is confirmed if it was still pending. Rejected
/// when the booking already has a completed charge or its price has moved
/// away from the payment amount; the payment then stays pending.
pub fn complete_gateway_payment(
    conn: &mut Connection,
    settlement_policy: &SettlementPolicy,
    payment_id: &str,
    gateway_reference: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(Payment, PaymentDistribution), AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let payment = load_transition(&tx, payment_id, PaymentStatus::Completed)?;

    let booking = get_reservation(&tx, &payment.booking_id)?;
    if !booking.status.is_active() {
        tracing::warn!(
            payment_id,
            booking_id = %booking.id,
            status = %booking.status,
            "gateway completion for inactive booking"
        );
        return Err(AppError::AlreadyTerminal {
            id: booking.id,
            status: booking.status,
        });
    }
    if queries::get_booking_payment_with_status(&tx, &booking.id, PaymentStatus::Completed)?
        .is_some()
    {
        tracing::warn!(payment_id, booking_id = %booking.id, "gateway completion for paid booking");
        return Err(AppError::AlreadyPaid(booking.id));
    }
    if payment.amount != booking.total_price {
        return Err(AppError::Validation(format!(
            "payment {payment_id} is for {} but booking {} now costs {}",
            payment.amount, booking.id, booking.total_price
        )));
    }

    queries::update_payment_status(
        &tx,
        payment_id,
        PaymentStatus::Completed,
        gateway_reference,
        &now,
    )?;
    let payment = reload(&tx, payment_id)?;
    let distribution = settlement::settle(&tx, settlement_policy, &payment, now)?;
    invoices::issue(&tx, &booking, InvoiceStatus::Paid, now)?;

    if booking.status == BookingStatus::Pending {
        queries::update_booking_status(&tx, &booking.id, BookingStatus::Confirmed, &now)?;
    }
    tx.commit()?;

    tracing::info!(payment_id, booking_id = %booking.id, "gateway payment completed");
    Ok((payment, distribution))
}

pub fn fail_gateway_payment(
    conn: &mut Connection,
    payment_id: &str,
    gateway_reference: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Payment, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    load_transition(&tx, payment_id, PaymentStatus::Failed)?;
    queries::update_payment_status(
        &tx,
        payment_id,
        PaymentStatus::Failed,
        gateway_reference,
        &now,
    )?;
    let payment = reload(&tx, payment_id)?;
    tx.commit()?;

    tracing::warn!(payment_id, "gateway payment failed");
    Ok(payment)
}

fn load_transition(
    tx: &Transaction<'_>,
    payment_id: &str,
    next: PaymentStatus,
) -> Result<Payment, AppError> {
    let payment = reload(tx, payment_id)?;
    if !payment.status.can_transition_to(next) {
        return Err(AppError::InvalidPaymentTransition {
            id: payment.id,
            from: payment.status,
            to: next,
        });
    }
    Ok(payment)
}

fn reload(conn: &Connection, payment_id: &str) -> Result<Payment, AppError> {
    queries::get_payment(conn, payment_id)?
        .ok_or_else(|| AppError::NotFound(format!("payment {payment_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Role, VenueType};
    use crate::services::booking::{self, ReservationRequest};
    use crate::services::refund::RefundPolicy;
    use crate::services::{accounts, ledger, venues};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    struct Fixture {
        conn: Connection,
        customer: Account,
        host: Account,
        booking_id: String,
    }

    fn setup() -> Fixture {
        let mut conn = db::init_db(":memory:").unwrap();
        let host =
            accounts::register_account(&mut conn, "hank", Role::Host, dec!(0), now()).unwrap();
        let customer =
            accounts::register_account(&mut conn, "cara", Role::Customer, dec!(0), now()).unwrap();
        let venue =
            venues::create_venue(&conn, &host, "Bistro", VenueType::Restaurant, now()).unwrap();
        let room = venues::add_room(&conn, &host, venue.id, "Terrace", 8, dec!(40.00)).unwrap();

        let held = booking::hold_reservation(
            &mut conn,
            &ReservationRequest {
                account_id: customer.id.clone(),
                room_id: room.id,
                start: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap(),
                num_guests: 2,
                special_requests: None,
            },
            now(),
        )
        .unwrap();

        Fixture {
            conn,
            customer,
            host,
            booking_id: held.id,
        }
    }

    fn open(fx: &mut Fixture) -> Result<Payment, AppError> {
        let customer = fx.customer.clone();
        let booking_id = fx.booking_id.clone();
        open_gateway_payment(&mut fx.conn, &customer, &booking_id, now())
    }

    fn complete(
        fx: &mut Fixture,
        payment_id: &str,
    ) -> Result<(Payment, PaymentDistribution), AppError> {
        complete_gateway_payment(
            &mut fx.conn,
            &SettlementPolicy::default(),
            payment_id,
            None,
            now(),
        )
    }

    fn completed_charges(conn: &Connection, booking_id: &str) -> usize {
        queries::get_payments_for_booking(conn, booking_id)
            .unwrap()
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .count()
    }

    #[test]
    fn test_gateway_success_settles_and_confirms() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(80.00));

        let (completed, split) = complete_gateway_payment(
            &mut fx.conn,
            &SettlementPolicy::default(),
            &payment.id,
            Some("gw-123"),
            now(),
        )
        .unwrap();
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert_eq!(completed.gateway_reference.as_deref(), Some("gw-123"));
        assert_eq!(split.admin_amount, dec!(8.00));
        assert_eq!(split.owner_amount, dec!(72.00));
        assert_eq!(split.owner_id, fx.host.id);

        let booking = booking::get_reservation(&fx.conn, &fx.booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        // a repeated callback cannot settle twice
        let again = complete(&mut fx, &payment.id);
        assert!(matches!(again, Err(AppError::InvalidPaymentTransition { .. })));
    }

    #[test]
    fn test_gateway_failure_keeps_booking_pending() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();
        let failed =
            fail_gateway_payment(&mut fx.conn, &payment.id, Some("declined"), now()).unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);

        let booking = booking::get_reservation(&fx.conn, &fx.booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        assert!(matches!(
            complete(&mut fx, &payment.id),
            Err(AppError::InvalidPaymentTransition { from: PaymentStatus::Failed, .. })
        ));
    }

    #[test]
    fn test_gateway_completion_after_cancel_is_rejected() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();
        booking::cancel_reservation(
            &mut fx.conn,
            &RefundPolicy::default(),
            &fx.customer,
            &fx.booking_id,
            now(),
        )
        .unwrap();

        let result = complete(&mut fx, &payment.id);
        assert!(matches!(
            result,
            Err(AppError::AlreadyTerminal { status: BookingStatus::Cancelled, .. })
        ));
        let stored = queries::get_payment(&fx.conn, &payment.id).unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_gateway_paid_booking_refunds_to_wallet() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();
        complete(&mut fx, &payment.id).unwrap();

        let outcome = booking::cancel_reservation(
            &mut fx.conn,
            &RefundPolicy::default(),
            &fx.customer,
            &fx.booking_id,
            now(),
        )
        .unwrap();
        assert_eq!(outcome.refunded, dec!(80.00));
        assert_eq!(
            ledger::current_balance(&fx.conn, &fx.customer.id).unwrap(),
            dec!(80.00)
        );
    }

    #[test]
    fn test_gateway_invoice_follows_payment() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();
        let invoice = invoices::for_booking(&fx.conn, &fx.booking_id).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.total_amount, dec!(80.00));

        complete(&mut fx, &payment.id).unwrap();
        let paid = invoices::for_booking(&fx.conn, &fx.booking_id).unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.invoice_number, invoice.invoice_number);

        booking::cancel_reservation(
            &mut fx.conn,
            &RefundPolicy::default(),
            &fx.customer,
            &fx.booking_id,
            now(),
        )
        .unwrap();
        assert_eq!(
            invoices::for_booking(&fx.conn, &fx.booking_id).unwrap().status,
            InvoiceStatus::Cancelled
        );
    }

    #[test]
    fn test_wallet_and_gateway_cannot_both_charge() {
        let mut fx = setup();
        let policy = SettlementPolicy::default();
        let payment = open(&mut fx).unwrap();

        assert!(matches!(
            booking::pay_reservation(&mut fx.conn, &policy, &fx.customer, &fx.booking_id, now()),
            Err(AppError::PaymentPending { payment_id, .. }) if payment_id == payment.id
        ));
        assert!(matches!(open(&mut fx), Err(AppError::PaymentPending { .. })));

        complete_gateway_payment(&mut fx.conn, &policy, &payment.id, None, now()).unwrap();

        assert!(matches!(
            booking::pay_reservation(&mut fx.conn, &policy, &fx.customer, &fx.booking_id, now()),
            Err(AppError::AlreadyPaid(_))
        ));
        assert!(matches!(open(&mut fx), Err(AppError::AlreadyPaid(_))));
        assert_eq!(completed_charges(&fx.conn, &fx.booking_id), 1);
        assert_eq!(settlement::unpaid_distributions(&fx.conn, None).unwrap().len(), 1);

        let outcome = booking::cancel_reservation(
            &mut fx.conn,
            &RefundPolicy::default(),
            &fx.customer,
            &fx.booking_id,
            now(),
        )
        .unwrap();
        assert_eq!(outcome.refunded, dec!(80.00));
        assert_eq!(completed_charges(&fx.conn, &fx.booking_id), 0);
    }

    #[test]
    fn test_completion_rejected_when_booking_already_charged() {
        let mut fx = setup();
        let payment = open(&mut fx).unwrap();

        // a charge recorded for the booking after the checkout was opened
        queries::insert_payment(
            &fx.conn,
            &Payment {
                id: "wallet-charge".to_string(),
                status: PaymentStatus::Completed,
                ..payment.clone()
            },
        )
        .unwrap();

        let result = complete(&mut fx, &payment.id);
        assert!(matches!(result, Err(AppError::AlreadyPaid(_))));
        assert_eq!(completed_charges(&fx.conn, &fx.booking_id), 1);
        let stored = queries::get_payment(&fx.conn, &payment.id).unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert!(settlement::unpaid_distributions(&fx.conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_owner_confirmed_booking_can_still_be_paid() {
        let mut fx = setup();
        booking::confirm_reservation(&mut fx.conn, &fx.host, &fx.booking_id, now()).unwrap();

        let payment = open(&mut fx).unwrap();
        let (_, split) = complete(&mut fx, &payment.id).unwrap();
        assert_eq!(split.owner_amount, dec!(72.00));

        let stored = booking::get_reservation(&fx.conn, &fx.booking_id).unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(completed_charges(&fx.conn, &fx.booking_id), 1);
    }

    #[test]
    fn test_reschedule_fails_stale_checkout() {
        let mut fx = setup();
        let stale = open(&mut fx).unwrap();

        let moved = booking::reschedule_reservation(
            &mut fx.conn,
            &fx.customer,
            &fx.booking_id,
            Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap(),
            now(),
        )
        .unwrap();
        assert_eq!(moved.total_price, dec!(120.00));
        assert_eq!(
            queries::get_payment(&fx.conn, &stale.id).unwrap().unwrap().status,
            PaymentStatus::Failed
        );
        assert_eq!(
            invoices::for_booking(&fx.conn, &fx.booking_id).unwrap().total_amount,
            dec!(120.00)
        );

        assert!(matches!(
            complete(&mut fx, &stale.id),
            Err(AppError::InvalidPaymentTransition { from: PaymentStatus::Failed, .. })
        ));

        let fresh = open(&mut fx).unwrap();
        assert_eq!(fresh.amount, dec!(120.00));
        let (completed, _) = complete(&mut fx, &fresh.id).unwrap();
        assert_eq!(completed.amount, dec!(120.00));
    }

    #[test]
    fn test_only_payer_opens_checkout() {
        let mut fx = setup();
        assert!(matches!(
            open_gateway_payment(&mut fx.conn, &fx.host, &fx.booking_id, now()),
            Err(AppError::Forbidden(_))
        ));
    }
}
