use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::current_account;
use crate::errors::AppError;
use crate::models::{Room, Venue, VenueType};
use crate::services::availability::{self, RoomAvailability};
use crate::services::{slots, venues};
use crate::state::AppState;

// POST /api/venues
#[derive(Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub venue_type: VenueType,
}

pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateVenueRequest>,
) -> Result<Json<Venue>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let venue = venues::create_venue(&db, &actor, &body.name, body.venue_type, Utc::now())?;
    Ok(Json(venue))
}

// POST /api/venues/:id/rooms
#[derive(Deserialize)]
pub struct AddRoomRequest {
    pub name: String,
    pub capacity: u32,
    pub price_per_hour: Decimal,
}

pub async fn add_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(venue_id): Path<i64>,
    Json(body): Json<AddRoomRequest>,
) -> Result<Json<Room>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let room = venues::add_room(
        &db,
        &actor,
        venue_id,
        &body.name,
        body.capacity,
        body.price_per_hour,
    )?;
    Ok(Json(room))
}

// POST /api/rooms/:id/rate
#[derive(Deserialize)]
pub struct RoomTermsRequest {
    pub price_per_hour: Decimal,
    pub capacity: u32,
}

pub async fn update_room_terms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(body): Json<RoomTermsRequest>,
) -> Result<Json<Room>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let room = venues::update_room_terms(&db, &actor, room_id, body.price_per_hour, body.capacity)?;
    Ok(Json(room))
}

// POST /api/rooms/:id/windows
#[derive(Deserialize)]
pub struct GenerateWindowsRequest {
    pub from: Option<NaiveDate>,
    pub days: Option<u32>,
}

pub async fn generate_windows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(body): Json<GenerateWindowsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;

    let from = body.from.unwrap_or_else(|| Utc::now().date_naive());
    let days = body.days.unwrap_or(state.config.slot_horizon_days);
    let created = slots::materialize_windows(&mut db, &actor, room_id, from, days)?;

    Ok(Json(serde_json::json!({ "ok": true, "created": created })))
}

// GET /api/rooms/:id/availability?from=...&to=...
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<RoomAvailability>, AppError> {
    let db = state.db()?;
    let report = availability::room_availability(&db, room_id, query.from, query.to)?;
    Ok(Json(report))
}
