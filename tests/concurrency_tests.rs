use std::path::PathBuf;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use reservehub::db;
use reservehub::errors::AppError;
use reservehub::models::{Role, VenueType};
use reservehub::services::booking::{self, ReservationRequest};
use reservehub::services::settlement::SettlementPolicy;
use reservehub::services::{accounts, ledger, venues};

const CONTENDERS: usize = 8;

struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("reservehub-{}.db", Uuid::new_v4())))
    }

    fn path(&self) -> &str {
        self.0.to_str().unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path()));
        }
    }
}

/// Returns (customer ids, room id). Every customer can afford the booking.
fn seed(conn: &mut Connection) -> (Vec<String>, i64) {
    let now = Utc::now();
    let host = accounts::register_account(conn, "hank", Role::Host, Decimal::ZERO, now).unwrap();
    let venue = venues::create_venue(conn, &host, "Hall", VenueType::Banquet, now).unwrap();
    let room = venues::add_room(conn, &host, venue.id, "Main", 50, Decimal::from(100)).unwrap();

    let customers = (0..CONTENDERS)
        .map(|i| {
            let username = format!("guest{i}");
            accounts::register_account(conn, &username, Role::Customer, Decimal::from(1000), now)
                .unwrap()
                .id
        })
        .collect();
    (customers, room.id)
}

fn request(account_id: &str, room_id: i64) -> ReservationRequest {
    let start = Utc.from_utc_datetime(
        &(Utc::now() + Duration::days(10))
            .date_naive()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    );
    ReservationRequest {
        account_id: account_id.to_string(),
        room_id,
        start,
        end: start + Duration::hours(2),
        num_guests: 2,
        special_requests: None,
    }
}

fn assert_single_winner(results: Vec<Result<String, AppError>>) -> String {
    let mut winners = Vec::new();
    for result in results {
        match result {
            Ok(account_id) => winners.push(account_id),
            Err(AppError::SlotConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners.len(), 1, "exactly one booking must win");
    winners.remove(0)
}

#[test]
fn test_concurrent_connections_book_once() {
    let file = TempDb::new();
    let mut setup = db::init_db(file.path()).unwrap();
    let (customers, room_id) = seed(&mut setup);

    // one connection per contender, as separate processes would have
    let connections: Vec<Connection> = (0..CONTENDERS)
        .map(|_| db::init_db(file.path()).unwrap())
        .collect();
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = connections
        .into_iter()
        .zip(customers.clone())
        .map(|(mut conn, customer)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                booking::create_reservation(
                    &mut conn,
                    &SettlementPolicy::default(),
                    &request(&customer, room_id),
                    Utc::now(),
                )
                .map(|b| b.account_id)
            })
        })
        .collect();

    let results = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winner = assert_single_winner(results);

    for customer in &customers {
        let expected = if *customer == winner { 800 } else { 1000 };
        assert_eq!(
            ledger::current_balance(&setup, customer).unwrap(),
            Decimal::from(expected)
        );
    }
    let active: i64 = setup
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE status IN ('pending', 'confirmed')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(active, 1);
}

#[test]
fn test_shared_connection_books_once() {
    let mut conn = db::init_db(":memory:").unwrap();
    let (customers, room_id) = seed(&mut conn);
    let shared = Arc::new(Mutex::new(conn));
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = customers
        .into_iter()
        .map(|customer| {
            let shared = Arc::clone(&shared);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut conn = shared.lock().unwrap();
                booking::create_reservation(
                    &mut conn,
                    &SettlementPolicy::default(),
                    &request(&customer, room_id),
                    Utc::now(),
                )
                .map(|b| b.account_id)
            })
        })
        .collect();

    let results = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_single_winner(results);
}
