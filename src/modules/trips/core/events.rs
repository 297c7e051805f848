use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TripEvent {
    TripStarted {
        card_id: String,
        trip_id: String,
        origin: String,
        started_at: i64,
    },
    TripEnded {
        card_id: String,
        trip_id: String,
        origin: String,
        destination: String,
        ended_at: i64,
        fare: i64,
    },
}
