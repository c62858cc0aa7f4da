use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use super::current_account;
use crate::errors::AppError;
use crate::models::Invoice;
use crate::services::invoices;
use crate::state::AppState;

// GET /api/invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    Ok(Json(invoices::list_invoices(&db, &actor.id)?))
}

// GET /api/invoices/:number
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    Ok(Json(invoices::get_invoice(&db, &actor, &number)?))
}
