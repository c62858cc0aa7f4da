//! Minimal listing management: enough for hosts to register venues and rooms
//! and adjust a room's rate and capacity.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Account, Role, Room, Venue, VenueType};

pub fn create_venue(
    conn: &Connection,
    owner: &Account,
    name: &str,
    venue_type: VenueType,
    now: DateTime<Utc>,
) -> Result<Venue, AppError> {
    if !owner.role.can_host() {
        return Err(AppError::Forbidden(format!(
            "account {} cannot own venues",
            owner.id
        )));
    }
    if name.trim().is_empty() {
        return Err(AppError::Validation("venue name is required".to_string()));
    }

    let id = queries::insert_venue(conn, &owner.id, name.trim(), venue_type, &now)?;
    tracing::info!(venue_id = id, owner_id = %owner.id, "venue created");

    queries::get_venue(conn, id)?.ok_or_else(|| AppError::Internal(format!("venue {id} vanished")))
}

pub fn add_room(
    conn: &Connection,
    actor: &Account,
    venue_id: i64,
    name: &str,
    capacity: u32,
    price_per_hour: Decimal,
) -> Result<Room, AppError> {
    let venue = queries::get_venue(conn, venue_id)?
        .ok_or_else(|| AppError::NotFound(format!("venue {venue_id}")))?;
    ensure_manages(actor, &venue)?;
    validate_terms(capacity, price_per_hour)?;

    let id = queries::insert_room(conn, venue_id, name.trim(), capacity, price_per_hour)?;
    tracing::info!(room_id = id, venue_id, rate = %price_per_hour, "room added");

    queries::get_room(conn, id)?.ok_or_else(|| AppError::Internal(format!("room {id} vanished")))
}

/// New terms apply to future bookings only; existing bookings keep their price.
pub fn update_room_terms(
    conn: &Connection,
    actor: &Account,
    room_id: i64,
    price_per_hour: Decimal,
    capacity: u32,
) -> Result<Room, AppError> {
    let (_, venue) = queries::get_room_with_venue(conn, room_id)?
        .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))?;
    ensure_manages(actor, &venue)?;
    validate_terms(capacity, price_per_hour)?;

    queries::update_room_terms(conn, room_id, price_per_hour, capacity)?;
    tracing::info!(room_id, rate = %price_per_hour, capacity, "room terms updated");

    queries::get_room(conn, room_id)?
        .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))
}

pub fn ensure_manages(actor: &Account, venue: &Venue) -> Result<(), AppError> {
    if venue.owner_id == actor.id || actor.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "account {} does not manage venue {}",
            actor.id, venue.id
        )))
    }
}

fn validate_terms(capacity: u32, price_per_hour: Decimal) -> Result<(), AppError> {
    if capacity == 0 {
        return Err(AppError::Validation("capacity must be at least 1".to_string()));
    }
    if price_per_hour <= Decimal::ZERO || price_per_hour.round_dp(2) != price_per_hour {
        return Err(AppError::Validation(format!(
            "hourly rate must be a positive amount with at most two decimals, got {price_per_hour}"
        )));
    }
    Ok(())
}
