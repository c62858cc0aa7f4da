use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{check_auth, current_account};
use crate::errors::AppError;
use crate::models::{Account, Role, WalletTransaction};
use crate::services::{accounts, ledger};
use crate::state::AppState;

// POST /api/accounts
#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub role: Role,
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    // admins are provisioned by the operator only
    if body.role == Role::Admin {
        check_auth(&headers, &state.config.admin_token)?;
    }

    let mut db = state.db()?;
    let account = accounts::register_account(
        &mut db,
        &body.username,
        body.role,
        state.config.customer_signup_credit,
        Utc::now(),
    )?;
    Ok(Json(account))
}

// GET /api/accounts/:id/wallet
#[derive(Deserialize)]
pub struct WalletQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct WalletResponse {
    account_id: String,
    balance: Decimal,
    transactions: Vec<WalletTransaction>,
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<WalletResponse>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    ensure_self_or_admin(&actor, &id)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Ok(Json(WalletResponse {
        balance: ledger::current_balance(&db, &id)?,
        transactions: ledger::history(&db, &id, limit)?,
        account_id: id,
    }))
}

// POST /api/accounts/:id/deposit
#[derive(Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

pub async fn deposit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    ensure_self(&actor, &id)?;

    let balance = ledger::deposit(&mut db, &id, body.amount, Utc::now())?;
    Ok(Json(serde_json::json!({ "ok": true, "balance": balance })))
}

// POST /api/accounts/:id/withdraw
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    ensure_self(&actor, &id)?;

    let balance = ledger::withdraw(&mut db, &id, body.amount, Utc::now())?;
    Ok(Json(serde_json::json!({ "ok": true, "balance": balance })))
}

// POST /api/accounts/:id/deactivate
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    accounts::deactivate_account(&db, &id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

fn ensure_self(actor: &Account, id: &str) -> Result<(), AppError> {
    if actor.id != id {
        return Err(AppError::Forbidden(format!(
            "account {} cannot move money for {id}",
            actor.id
        )));
    }
    Ok(())
}

fn ensure_self_or_admin(actor: &Account, id: &str) -> Result<(), AppError> {
    if actor.id != id && actor.role != Role::Admin {
        return Err(AppError::Forbidden(format!(
            "account {} cannot view wallet {id}",
            actor.id
        )));
    }
    Ok(())
}
