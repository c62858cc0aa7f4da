//! Availability window generator. Windows are shaped by venue type and laid
//! out per calendar day (UTC).

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Account, Interval, VenueType};
use crate::services::{availability, venues};

/// Windows for one day. Hotels get a single 14:00 check-in to 12:00 check-out
/// stay, restaurants and cafes 2-hour sittings between 10:00 and 22:00,
/// everything else hourly slots between 09:00 and 21:00.
pub fn windows_for_day(venue_type: VenueType, date: NaiveDate) -> Vec<Interval> {
    let at = |day: NaiveDate, hour: u32| {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&day.and_time(time))
    };

    match venue_type {
        VenueType::Hotel => {
            let checkout_day = date.succ_opt().unwrap_or(date);
            vec![Interval {
                start: at(date, 14),
                end: at(checkout_day, 12),
            }]
        }
        VenueType::Restaurant | VenueType::Cafe => (10..22)
            .step_by(2)
            .map(|hour| {
                let start = at(date, hour);
                Interval {
                    start,
                    end: start + Duration::hours(2),
                }
            })
            .collect(),
        _ => (9..21)
            .map(|hour| {
                let start = at(date, hour);
                Interval {
                    start,
                    end: start + Duration::hours(1),
                }
            })
            .collect(),
    }
}

/// Creates the windows for `days` days starting at `from`, skipping ones that
/// already exist, then recomputes the room's flags from its bookings.
/// Returns the number of windows created.
pub fn materialize_windows(
    conn: &mut Connection,
    actor: &Account,
    room_id: i64,
    from: NaiveDate,
    days: u32,
) -> Result<usize, AppError> {
    if days == 0 || days > 366 {
        return Err(AppError::Validation(format!(
            "days must be between 1 and 366, got {days}"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (_, venue) = queries::get_room_with_venue(&tx, room_id)?
        .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))?;
    venues::ensure_manages(actor, &venue)?;

    let mut created = 0;
    for date in from.iter_days().take(days as usize) {
        for window in windows_for_day(venue.venue_type, date) {
            if queries::insert_time_slot(&tx, room_id, &window.start, &window.end)? {
                created += 1;
            }
        }
    }
    availability::resync_windows(&tx, room_id)?;
    tx.commit()?;

    tracing::info!(room_id, days, created, "availability windows generated");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;
    use crate::services::booking::{self, ReservationRequest};
    use crate::services::accounts;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_hotel_stay_spans_to_next_noon() {
        let windows = windows_for_day(VenueType::Hotel, day());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap());
        assert_eq!(windows[0].end, Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_restaurant_sittings() {
        let windows = windows_for_day(VenueType::Cafe, day());
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[0].start, Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        assert_eq!(windows[5].end, Utc.with_ymd_and_hms(2024, 3, 4, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_default_hourly_slots() {
        let windows = windows_for_day(VenueType::Conference, day());
        assert_eq!(windows.len(), 12);
        assert!(windows.iter().all(|w| w.duration_seconds() == 3600));
        assert_eq!(windows[11].end, Utc.with_ymd_and_hms(2024, 3, 4, 21, 0, 0).unwrap());
    }

    #[test]
    fn test_materialize_is_idempotent_and_respects_bookings() {
        let mut conn = db::init_db(":memory:").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let host = accounts::register_account(&mut conn, "hank", Role::Host, dec!(0), now).unwrap();
        let customer =
            accounts::register_account(&mut conn, "cara", Role::Customer, dec!(500), now).unwrap();
        let venue = venues::create_venue(&conn, &host, "Hub", VenueType::Conference, now).unwrap();
        let room = venues::add_room(&conn, &host, venue.id, "A", 6, dec!(25)).unwrap();

        booking::hold_reservation(
            &mut conn,
            &ReservationRequest {
                account_id: customer.id.clone(),
                room_id: room.id,
                start: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
                num_guests: 2,
                special_requests: None,
            },
            now,
        )
        .unwrap();

        assert_eq!(materialize_windows(&mut conn, &host, room.id, day(), 2).unwrap(), 24);
        assert_eq!(materialize_windows(&mut conn, &host, room.id, day(), 2).unwrap(), 0);

        let from = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let windows = queries::get_time_slots_in_range(&conn, room.id, &from, &to).unwrap();
        let taken = windows.iter().filter(|w| !w.is_available).count();
        assert_eq!(taken, 2);

        assert!(matches!(
            materialize_windows(&mut conn, &customer, room.id, day(), 1),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            materialize_windows(&mut conn, &host, room.id, day(), 0),
            Err(AppError::Validation(_))
        ));
    }
}
