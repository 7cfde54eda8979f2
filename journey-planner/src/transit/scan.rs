//! Checked reading of the connections stream.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::warn;

use crate::domain::{Connection, Timestamp};
use crate::error::ProviderError;
use crate::events::{Event, EventSink};
use crate::provider::{ConnectionsProvider, ScanDirection};

type ConnectionStream<'a> = Pin<Box<dyn Stream<Item = Result<Connection, ProviderError>> + 'a>>;

/// Connections in scan order. Malformed and out-of-order connections are
/// reported as warnings and skipped.
pub(super) struct OrderedConnections<'a> {
    stream: ConnectionStream<'a>,
    direction: ScanDirection,
    last_departure: Option<Timestamp>,
    exhausted: bool,
}

impl<'a> OrderedConnections<'a> {
    pub fn new<C: ConnectionsProvider>(
        provider: &'a C,
        from: Timestamp,
        direction: ScanDirection,
    ) -> Self {
        Self {
            stream: Box::pin(provider.connections(from, direction)),
            direction,
            last_departure: None,
            exhausted: false,
        }
    }

    /// Whether the provider has no connections left.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub async fn next_valid(
        &mut self,
        events: &dyn EventSink,
    ) -> Result<Option<Connection>, ProviderError> {
        while let Some(item) = self.stream.next().await {
            let connection = item?;
            if let Err(e) = connection.validate() {
                warn!(connection = %connection.id, error = %e, "Skipping connection");
                events.emit(Event::Warning(e.to_string()));
                continue;
            }
            if let Some(last) = self.last_departure {
                let in_order = match self.direction {
                    ScanDirection::Forward => connection.departure_time >= last,
                    ScanDirection::Backward => connection.departure_time <= last,
                };
                if !in_order {
                    events.emit(Event::Warning(format!(
                        "connection {} departs out of order",
                        connection.id
                    )));
                    continue;
                }
            }
            self.last_departure = Some(connection.departure_time);
            return Ok(Some(connection));
        }
        self.exhausted = true;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::domain::{ConnectionId, LocationId, TravelMode, TripId};
    use crate::events::RecordingSink;
    use crate::provider::{MemoryNetwork, NetworkData};

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    fn connection(id: &str, from: &str, to: &str, dep: Timestamp, arr: Timestamp) -> Connection {
        Connection {
            id: ConnectionId::new(id),
            departure_stop: LocationId::new(from),
            arrival_stop: LocationId::new(to),
            departure_time: dep,
            arrival_time: arr,
            trip_id: TripId::new("t"),
            travel_mode: TravelMode::Train,
            pickup_allowed: true,
            drop_off_allowed: true,
        }
    }

    #[tokio::test]
    async fn skips_malformed_connections() {
        let network = MemoryNetwork::new(NetworkData {
            connections: vec![
                connection("ok", "a", "b", at(10, 0), at(10, 5)),
                connection("backwards", "b", "c", at(10, 10), at(10, 5)),
                connection("loop", "c", "c", at(10, 20), at(10, 25)),
                connection("last", "b", "c", at(10, 30), at(10, 35)),
            ],
            ..NetworkData::default()
        });
        let events = RecordingSink::new();
        let mut scan = OrderedConnections::new(&network, at(9, 0), ScanDirection::Forward);

        let mut ids = Vec::new();
        while let Some(c) = scan.next_valid(&events).await.unwrap() {
            ids.push(c.id.to_string());
        }

        assert_eq!(ids, ["ok", "last"]);
        assert_eq!(events.count("warning"), 2);
        assert!(scan.is_exhausted());
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let network = MemoryNetwork::new(NetworkData {
            connections: vec![connection("c", "a", "b", at(8, 0), at(8, 5))],
            ..NetworkData::default()
        });
        network.fail_connections(true);
        let mut scan = OrderedConnections::new(&network, at(9, 0), ScanDirection::Backward);

        assert!(scan.next_valid(&RecordingSink::new()).await.is_err());
        assert!(!scan.is_exhausted());
    }
}
