use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::models::PaymentDistribution;
use crate::services::{booking, settlement};
use crate::state::AppState;

// GET /api/admin/payouts
#[derive(Deserialize)]
pub struct PayoutsQuery {
    pub owner_id: Option<String>,
}

pub async fn get_payouts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PayoutsQuery>,
) -> Result<Json<Vec<PaymentDistribution>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    let unpaid = settlement::unpaid_distributions(&db, query.owner_id.as_deref())?;
    Ok(Json(unpaid))
}

// POST /api/admin/distributions/:id/paid
pub async fn mark_distribution_paid(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<PaymentDistribution>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    let distribution = settlement::mark_paid_to_owner(&db, id, Utc::now())?;
    Ok(Json(distribution))
}

// POST /api/admin/sweep
pub async fn run_completion_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let mut db = state.db()?;
    let completed = booking::complete_due_reservations(&mut db, Utc::now())?;
    Ok(Json(serde_json::json!({ "ok": true, "completed": completed })))
}
