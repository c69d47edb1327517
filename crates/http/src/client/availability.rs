//! Availability scheduling methods

use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{Availability, NewAvailability};

const DAYS: [&str; 7] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

impl PeerzaClient {
    /// The logged-in user's weekly slots
    pub async fn my_availability(&self) -> Result<Vec<Availability>, ClientError> {
        self.execute(ApiRequest::get("/availability/")).await
    }

    /// Add a weekly slot; times are `HH:MM` or `HH:MM:SS`
    pub async fn add_availability(
        &self,
        slot: NewAvailability,
    ) -> Result<Availability, ClientError> {
        let slot = validate_slot(slot)?;
        let req = ApiRequest::post("/availability/").json(&slot)?;
        self.execute(req).await
    }

    pub async fn remove_availability(&self, slot_id: i64) -> Result<(), ClientError> {
        self.execute_empty(ApiRequest::delete(format!("/availability/{slot_id}/")))
            .await
    }

    /// A peer's slots, each flagged when an accepted meeting overlaps it
    pub async fn peer_availability(&self, peer_id: i64) -> Result<Vec<Availability>, ClientError> {
        self.execute(ApiRequest::get(format!("/availability/{peer_id}/user/")))
            .await
    }
}

fn validate_slot(slot: NewAvailability) -> Result<NewAvailability, ClientError> {
    let day = slot.day_of_week.trim().to_uppercase();
    if !DAYS.contains(&day.as_str()) {
        return Err(ClientError::InvalidInput(format!(
            "unknown day of week: {}",
            slot.day_of_week
        )));
    }

    let start = parse_time(&slot.start_time)?;
    let end = parse_time(&slot.end_time)?;
    if start >= end {
        return Err(ClientError::InvalidInput(
            "slot must end after it starts".into(),
        ));
    }

    Ok(NewAvailability {
        day_of_week: day,
        ..slot
    })
}

fn parse_time(value: &str) -> Result<chrono::NaiveTime, ClientError> {
    chrono::NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ClientError::InvalidInput(format!("invalid time: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: &str, start: &str, end: &str) -> NewAvailability {
        NewAvailability {
            day_of_week: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn test_validate_slot_normalizes_day() {
        let slot = validate_slot(slot("monday", "09:00", "10:30")).unwrap();
        assert_eq!(slot.day_of_week, "MONDAY");
    }

    #[test]
    fn test_validate_slot_rejects_bad_input() {
        assert!(validate_slot(slot("someday", "09:00", "10:00")).is_err());
        assert!(validate_slot(slot("FRIDAY", "9am", "10:00")).is_err());
        assert!(validate_slot(slot("FRIDAY", "11:00", "10:00")).is_err());
        assert!(validate_slot(slot("FRIDAY", "10:00:00", "10:00")).is_err());
    }
}
