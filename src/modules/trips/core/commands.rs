use crate::shared::infrastructure::command_bus::Command;
use chrono::Utc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTrip {
    pub card_id: String,
    pub origin: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTrip {
    pub card_id: String,
    pub destination: String,
    pub ended_at: i64,
}

impl StartTrip {
    pub fn now(card_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            origin: origin.into(),
            started_at: Utc::now().timestamp_millis(),
        }
    }
}

impl EndTrip {
    pub fn now(card_id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            destination: destination.into(),
            ended_at: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripCommand {
    StartTrip(StartTrip),
    EndTrip(EndTrip),
}

impl TripCommand {
    pub const START_TRIP: &'static str = "StartTrip";
    pub const END_TRIP: &'static str = "EndTrip";
}

impl Command for TripCommand {
    fn name(&self) -> &'static str {
        match self {
            TripCommand::StartTrip(_) => Self::START_TRIP,
            TripCommand::EndTrip(_) => Self::END_TRIP,
        }
    }
}
