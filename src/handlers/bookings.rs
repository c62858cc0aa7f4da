use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::current_account;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Payment};
use crate::services::booking::{self, CancellationOutcome, ReservationRequest};
use crate::services::{payments, venues};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BookingRequest {
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub num_guests: u32,
    pub special_requests: Option<String>,
}

impl BookingRequest {
    fn into_reservation(self, account_id: String) -> ReservationRequest {
        ReservationRequest {
            account_id,
            room_id: self.room_id,
            start: self.start_time,
            end: self.end_time,
            num_guests: self.num_guests,
            special_requests: self.special_requests,
        }
    }
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking = booking::create_reservation(
        &mut db,
        &state.config.settlement_policy(),
        &body.into_reservation(actor.id),
        Utc::now(),
    )?;
    Ok(Json(booking))
}

// POST /api/bookings/hold
pub async fn hold_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking =
        booking::hold_reservation(&mut db, &body.into_reservation(actor.id), Utc::now())?;
    Ok(Json(booking))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking = booking::get_reservation(&db, &id)?;

    if booking.account_id != actor.id {
        let (_, venue) = queries::get_room_with_venue(&db, booking.room_id)?
            .ok_or_else(|| AppError::NotFound(format!("room {}", booking.room_id)))?;
        venues::ensure_manages(&actor, &venue)?;
    }
    Ok(Json(booking))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancellationOutcome>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let outcome = booking::cancel_reservation(
        &mut db,
        &state.config.refund_policy(),
        &actor,
        &id,
        Utc::now(),
    )?;
    Ok(Json(outcome))
}

// POST /api/bookings/:id/confirm
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking = booking::confirm_reservation(&mut db, &actor, &id, Utc::now())?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/pay
pub async fn pay_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking = booking::pay_reservation(
        &mut db,
        &state.config.settlement_policy(),
        &actor,
        &id,
        Utc::now(),
    )?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let booking = booking::reschedule_reservation(
        &mut db,
        &actor,
        &id,
        body.start_time,
        body.end_time,
        Utc::now(),
    )?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/checkout
pub async fn checkout_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Payment>, AppError> {
    let mut db = state.db()?;
    let actor = current_account(&headers, &db)?;
    let payment = payments::open_gateway_payment(&mut db, &actor, &id, Utc::now())?;
    Ok(Json(payment))
}
