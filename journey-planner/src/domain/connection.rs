//! Timetabled connections.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{ConnectionId, DomainError, LocationId, Timestamp, TravelMode, TripId};

fn default_mode() -> TravelMode {
    TravelMode::Train
}

fn allowed() -> bool {
    true
}

/// One vehicle movement between two consecutive stops of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub departure_stop: LocationId,
    pub arrival_stop: LocationId,
    pub departure_time: Timestamp,
    pub arrival_time: Timestamp,
    pub trip_id: TripId,

    #[serde(default = "default_mode")]
    pub travel_mode: TravelMode,

    /// Passengers may board at the departure stop.
    #[serde(default = "allowed")]
    pub pickup_allowed: bool,

    /// Passengers may alight at the arrival stop.
    #[serde(default = "allowed")]
    pub drop_off_allowed: bool,
}

impl Connection {
    /// Time spent on board.
    pub fn duration(&self) -> Duration {
        self.arrival_time - self.departure_time
    }

    /// Reject connections no scan can use.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.arrival_time < self.departure_time {
            return Err(DomainError::MalformedConnection(
                self.id.clone(),
                "arrives before it departs",
            ));
        }
        if self.departure_stop == self.arrival_stop {
            return Err(DomainError::MalformedConnection(
                self.id.clone(),
                "departure and arrival stop are the same",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn connection(dep: (u32, u32), arr: (u32, u32), from: &str, to: &str) -> Connection {
        Connection {
            id: ConnectionId::new("c1"),
            departure_stop: LocationId::new(from),
            arrival_stop: LocationId::new(to),
            departure_time: Utc.with_ymd_and_hms(2024, 3, 15, dep.0, dep.1, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2024, 3, 15, arr.0, arr.1, 0).unwrap(),
            trip_id: TripId::new("t1"),
            travel_mode: TravelMode::Train,
            pickup_allowed: true,
            drop_off_allowed: true,
        }
    }

    #[test]
    fn valid_connection() {
        let c = connection((10, 0), (10, 12), "a", "b");
        assert!(c.validate().is_ok());
        assert_eq!(c.duration(), Duration::minutes(12));
    }

    #[test]
    fn arrival_before_departure_is_malformed() {
        let c = connection((10, 0), (9, 59), "a", "b");
        assert!(matches!(
            c.validate(),
            Err(DomainError::MalformedConnection(_, "arrives before it departs"))
        ));
    }

    #[test]
    fn loop_is_malformed() {
        let c = connection((10, 0), (10, 5), "a", "a");
        assert!(c.validate().is_err());
    }

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{
            "id": "c9",
            "departure_stop": "a",
            "arrival_stop": "b",
            "departure_time": "2024-03-15T10:00:00Z",
            "arrival_time": "2024-03-15T10:05:00Z",
            "trip_id": "t"
        }"#;
        let c: Connection = serde_json::from_str(json).unwrap();
        assert_eq!(c.travel_mode, TravelMode::Train);
        assert!(c.pickup_allowed && c.drop_off_allowed);
    }
}
