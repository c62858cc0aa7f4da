//! Whether a room is free for an interval. Booking rows are the source of
//! truth; `time_slots` flags are a cache updated in the same transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Interval, TimeSlot};

/// True when a pending or confirmed booking on the room intersects `[start, end)`.
pub fn check_overlap(
    conn: &Connection,
    room_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_booking_id: Option<&str>,
) -> Result<bool, AppError> {
    let interval = Interval::new(start, end)?;
    Ok(queries::has_overlapping_booking(
        conn,
        room_id,
        &interval.start,
        &interval.end,
        exclude_booking_id,
    )?)
}

pub fn claim_windows(
    conn: &Connection,
    room_id: i64,
    interval: &Interval,
) -> Result<usize, AppError> {
    let claimed = queries::claim_time_slots(conn, room_id, &interval.start, &interval.end)?;
    tracing::debug!(room_id, claimed, "windows claimed");
    Ok(claimed)
}

/// Frees the windows of a released interval. Call after the booking has left
/// the active states so it no longer counts as covering them.
pub fn release_windows(
    conn: &Connection,
    room_id: i64,
    interval: &Interval,
) -> Result<usize, AppError> {
    let released = queries::release_time_slots(conn, room_id, &interval.start, &interval.end)?;
    tracing::debug!(room_id, released, "windows released");
    Ok(released)
}

/// Rebuilds a room's window flags from booking state.
pub fn resync_windows(conn: &Connection, room_id: i64) -> Result<usize, AppError> {
    let touched = queries::resync_time_slots(conn, room_id)?;
    tracing::info!(room_id, touched, "windows resynced from bookings");
    Ok(touched)
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomAvailability {
    pub room_id: i64,
    pub range: Interval,
    pub booked: Vec<Interval>,
    pub free: Vec<Interval>,
    pub windows: Vec<TimeSlot>,
}

pub fn room_availability(
    conn: &Connection,
    room_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<RoomAvailability, AppError> {
    let range = Interval::new(from, to)?;
    if queries::get_room(conn, room_id)?.is_none() {
        return Err(AppError::NotFound(format!("room {room_id}")));
    }

    let booked = booked_intervals(conn, room_id, &range)?;
    let free = free_gaps(&range, &booked);
    let windows = queries::get_time_slots_in_range(conn, room_id, &range.start, &range.end)?;

    Ok(RoomAvailability {
        room_id,
        range,
        booked,
        free,
        windows,
    })
}

/// Busy parts of `range`, clipped to it, merged and sorted.
pub fn booked_intervals(
    conn: &Connection,
    room_id: i64,
    range: &Interval,
) -> Result<Vec<Interval>, AppError> {
    let bookings = queries::get_active_bookings_in_range(conn, room_id, &range.start, &range.end)?;
    let clipped = bookings.iter().map(|b| Interval {
        start: b.start_time.max(range.start),
        end: b.end_time.min(range.end),
    });
    Ok(merge(clipped.collect()))
}

pub fn free_intervals(
    conn: &Connection,
    room_id: i64,
    range: &Interval,
) -> Result<Vec<Interval>, AppError> {
    let booked = booked_intervals(conn, room_id, range)?;
    Ok(free_gaps(range, &booked))
}

/// Complement of sorted, non-overlapping `booked` within `range`.
pub fn free_gaps(range: &Interval, booked: &[Interval]) -> Vec<Interval> {
    let mut free = Vec::new();
    let mut cursor = range.start;

    for busy in booked {
        if busy.start > cursor {
            free.push(Interval {
                start: cursor,
                end: busy.start.min(range.end),
            });
        }
        cursor = cursor.max(busy.end);
        if cursor >= range.end {
            break;
        }
    }

    if cursor < range.end {
        free.push(Interval {
            start: cursor,
            end: range.end,
        });
    }

    free
}

fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|i| i.start);
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Booking, BookingStatus, Role, VenueType};
    use crate::services::{accounts, venues};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn iv(a: u32, b: u32) -> Interval {
        Interval::new(at(a), at(b)).unwrap()
    }

    struct Fixture {
        conn: Connection,
        room_id: i64,
        customer_id: String,
    }

    fn setup() -> Fixture {
        let mut conn = db::init_db(":memory:").unwrap();
        let host =
            accounts::register_account(&mut conn, "hank", Role::Host, dec!(0), Utc::now()).unwrap();
        let customer =
            accounts::register_account(&mut conn, "cara", Role::Customer, dec!(0), Utc::now())
                .unwrap();
        let venue =
            venues::create_venue(&conn, &host, "Hall", VenueType::EventSpace, Utc::now()).unwrap();
        let room = venues::add_room(&conn, &host, venue.id, "Main", 10, dec!(100)).unwrap();
        Fixture {
            conn,
            room_id: room.id,
            customer_id: customer.id,
        }
    }

    fn insert(fx: &Fixture, id: &str, interval: Interval, status: BookingStatus) {
        let now = Utc::now();
        queries::insert_booking(
            &fx.conn,
            &Booking {
                id: id.to_string(),
                account_id: fx.customer_id.clone(),
                room_id: fx.room_id,
                start_time: interval.start,
                end_time: interval.end,
                num_guests: 2,
                special_requests: None,
                status,
                total_price: dec!(100),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    fn add_hourly_windows(fx: &Fixture, from: u32, to: u32) {
        for h in from..to {
            queries::insert_time_slot(&fx.conn, fx.room_id, &at(h), &at(h + 1)).unwrap();
        }
    }

    #[test]
    fn test_overlap_detects_partial_intersection() {
        let fx = setup();
        insert(&fx, "b1", iv(10, 12), BookingStatus::Confirmed);
        assert!(check_overlap(&fx.conn, fx.room_id, at(11), at(13), None).unwrap());
        assert!(check_overlap(&fx.conn, fx.room_id, at(9), at(11), None).unwrap());
    }

    #[test]
    fn test_adjacent_booking_is_not_a_conflict() {
        let fx = setup();
        insert(&fx, "b1", iv(10, 12), BookingStatus::Confirmed);
        assert!(!check_overlap(&fx.conn, fx.room_id, at(12), at(14), None).unwrap());
        assert!(!check_overlap(&fx.conn, fx.room_id, at(8), at(10), None).unwrap());
    }

    #[test]
    fn test_cancelled_and_completed_do_not_block() {
        let fx = setup();
        insert(&fx, "b1", iv(10, 12), BookingStatus::Cancelled);
        insert(&fx, "b2", iv(10, 12), BookingStatus::Completed);
        assert!(!check_overlap(&fx.conn, fx.room_id, at(10), at(12), None).unwrap());

        insert(&fx, "b3", iv(10, 12), BookingStatus::Pending);
        assert!(check_overlap(&fx.conn, fx.room_id, at(10), at(12), None).unwrap());
    }

    #[test]
    fn test_exclude_self_when_revalidating() {
        let fx = setup();
        insert(&fx, "b1", iv(10, 12), BookingStatus::Confirmed);
        assert!(!check_overlap(&fx.conn, fx.room_id, at(11), at(13), Some("b1")).unwrap());
    }

    #[test]
    fn test_inverted_interval_rejected_before_lookup() {
        let fx = setup();
        let result = check_overlap(&fx.conn, fx.room_id, at(12), at(10), None);
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = check_overlap(&fx.conn, fx.room_id, at(10), at(10), None);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_claim_then_release_restores_windows() {
        let fx = setup();
        add_hourly_windows(&fx, 9, 15);

        let claimed = claim_windows(&fx.conn, fx.room_id, &iv(10, 12)).unwrap();
        assert_eq!(claimed, 2);

        let released = release_windows(&fx.conn, fx.room_id, &iv(10, 12)).unwrap();
        assert_eq!(released, 2);

        let windows =
            queries::get_time_slots_in_range(&fx.conn, fx.room_id, &at(0), &at(23)).unwrap();
        assert_eq!(windows.len(), 6);
        assert!(windows.iter().all(|w| w.is_available));
    }

    #[test]
    fn test_release_keeps_windows_still_covered() {
        let fx = setup();
        add_hourly_windows(&fx, 9, 15);
        insert(&fx, "other", iv(11, 12), BookingStatus::Confirmed);
        claim_windows(&fx.conn, fx.room_id, &iv(10, 12)).unwrap();

        let released = release_windows(&fx.conn, fx.room_id, &iv(10, 12)).unwrap();
        assert_eq!(released, 1);

        let windows =
            queries::get_time_slots_in_range(&fx.conn, fx.room_id, &at(11), &at(12)).unwrap();
        assert!(!windows[0].is_available);
    }

    #[test]
    fn test_resync_repairs_drifted_cache() {
        let fx = setup();
        add_hourly_windows(&fx, 9, 12);
        insert(&fx, "b1", iv(10, 11), BookingStatus::Confirmed);

        resync_windows(&fx.conn, fx.room_id).unwrap();
        let windows =
            queries::get_time_slots_in_range(&fx.conn, fx.room_id, &at(0), &at(23)).unwrap();
        let flags: Vec<bool> = windows.iter().map(|w| w.is_available).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_free_and_booked_intervals() {
        let fx = setup();
        insert(&fx, "b1", iv(10, 12), BookingStatus::Confirmed);
        insert(&fx, "b2", iv(11, 13), BookingStatus::Pending);
        insert(&fx, "b3", iv(15, 16), BookingStatus::Confirmed);

        let range = iv(9, 17);
        let booked = booked_intervals(&fx.conn, fx.room_id, &range).unwrap();
        assert_eq!(booked, vec![iv(10, 13), iv(15, 16)]);

        let free = free_intervals(&fx.conn, fx.room_id, &range).unwrap();
        assert_eq!(free, vec![iv(9, 10), iv(13, 15), iv(16, 17)]);
    }

    #[test]
    fn test_free_gaps_clips_to_range() {
        let range = iv(10, 14);
        assert_eq!(free_gaps(&range, &[]), vec![range]);
        assert!(free_gaps(&range, &[iv(10, 14)]).is_empty());
        assert_eq!(free_gaps(&range, &[iv(10, 11), iv(13, 14)]), vec![iv(11, 13)]);
    }

    #[test]
    fn test_room_availability_unknown_room() {
        let fx = setup();
        let result = room_availability(&fx.conn, 999, at(9), at(17));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
