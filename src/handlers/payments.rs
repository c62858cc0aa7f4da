use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Payment, PaymentDistribution};
use crate::services::payments;
use crate::state::AppState;

/// Relayed gateway notification. Verifying the gateway's signature happens
/// before it reaches this service.
#[derive(Deserialize, Default)]
pub struct GatewayNotification {
    pub gateway_reference: Option<String>,
}

#[derive(Serialize)]
pub struct CompletedPaymentResponse {
    payment: Payment,
    distribution: PaymentDistribution,
}

// POST /api/payments/:id/complete
pub async fn complete_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<GatewayNotification>>,
) -> Result<Json<CompletedPaymentResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let Json(body) = body.unwrap_or_default();

    let mut db = state.db()?;
    let (payment, distribution) = payments::complete_gateway_payment(
        &mut db,
        &state.config.settlement_policy(),
        &id,
        body.gateway_reference.as_deref(),
        Utc::now(),
    )?;
    Ok(Json(CompletedPaymentResponse {
        payment,
        distribution,
    }))
}

// POST /api/payments/:id/fail
pub async fn fail_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<GatewayNotification>>,
) -> Result<Json<Payment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let Json(body) = body.unwrap_or_default();

    let mut db = state.db()?;
    let payment = payments::fail_gateway_payment(
        &mut db,
        &id,
        body.gateway_reference.as_deref(),
        Utc::now(),
    )?;
    Ok(Json(payment))
}
