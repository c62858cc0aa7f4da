use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub venue_type: VenueType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    Hotel,
    Restaurant,
    Cafe,
    EventSpace,
    Conference,
    Banquet,
}

impl VenueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueType::Hotel => "hotel",
            VenueType::Restaurant => "restaurant",
            VenueType::Cafe => "cafe",
            VenueType::EventSpace => "event_space",
            VenueType::Conference => "conference",
            VenueType::Banquet => "banquet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hotel" => Some(VenueType::Hotel),
            "restaurant" => Some(VenueType::Restaurant),
            "cafe" => Some(VenueType::Cafe),
            "event_space" => Some(VenueType::EventSpace),
            "conference" => Some(VenueType::Conference),
            "banquet" => Some(VenueType::Banquet),
            _ => None,
        }
    }
}

/// A bookable unit within a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub venue_id: i64,
    pub name: String,
    pub capacity: u32,
    pub price_per_hour: Decimal,
    pub is_active: bool,
}
