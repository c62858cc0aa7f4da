pub mod accounts;
pub mod admin;
pub mod bookings;
pub mod health;
pub mod invoices;
pub mod payments;
pub mod venues;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Account;
use crate::state::AppState;

/// Header carrying the already-authenticated caller.
pub const ACCOUNT_HEADER: &str = "x-account-id";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/accounts", post(accounts::create_account))
        .route("/api/accounts/:id/wallet", get(accounts::get_wallet))
        .route("/api/accounts/:id/deposit", post(accounts::deposit))
        .route("/api/accounts/:id/withdraw", post(accounts::withdraw))
        .route("/api/accounts/:id/deactivate", post(accounts::deactivate))
        .route("/api/venues", post(venues::create_venue))
        .route("/api/venues/:id/rooms", post(venues::add_room))
        .route("/api/rooms/:id/rate", post(venues::update_room_terms))
        .route("/api/rooms/:id/windows", post(venues::generate_windows))
        .route("/api/rooms/:id/availability", get(venues::get_availability))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/hold", post(bookings::hold_booking))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/confirm", post(bookings::confirm_booking))
        .route("/api/bookings/:id/pay", post(bookings::pay_booking))
        .route("/api/bookings/:id/reschedule", post(bookings::reschedule_booking))
        .route("/api/bookings/:id/checkout", post(bookings::checkout_booking))
        .route("/api/invoices", get(invoices::list_invoices))
        .route("/api/invoices/:number", get(invoices::get_invoice))
        .route("/api/payments/:id/complete", post(payments::complete_payment))
        .route("/api/payments/:id/fail", post(payments::fail_payment))
        .route("/api/admin/payouts", get(admin::get_payouts))
        .route(
            "/api/admin/distributions/:id/paid",
            post(admin::mark_distribution_paid),
        )
        .route("/api/admin/sweep", post(admin::run_completion_sweep))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bearer token check for operator endpoints.
pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Resolves the calling account from the identity header.
pub fn current_account(headers: &HeaderMap, conn: &Connection) -> Result<Account, AppError> {
    let id = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)?;

    queries::get_account(conn, id)?.ok_or(AppError::Unauthorized)
}
