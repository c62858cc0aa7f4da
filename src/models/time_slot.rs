use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Materialized availability window for a room. Advisory only: reservation
/// rows decide whether a room is actually free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_available: bool,
}
