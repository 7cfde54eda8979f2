//! Scenario tests for the widening query runner.

use super::*;
use crate::domain::{
    Connection, ConnectionId, Location, LocationId, Profiles, RoadClass, Stop, Timestamp, TravelMode, TripId,
};
use crate::error::{PlannerError, ProviderError};
use crate::events::RecordingSink;
use crate::pathfinding::{RoadPlanner, RoadPlannerConfig};
use crate::provider::{MemoryNetwork, NetworkData, RoadData};
use crate::tiles::{RoutableEdge, RoutableTileNode};
use crate::transit::PublicTransportPlanner;
use chrono::{Duration, TimeZone, Utc};
use futures::StreamExt;
use std::sync::Arc;

fn at(h: u32, m: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
}

fn stop(id: &str, latitude: f64, longitude: f64) -> Stop {
    Stop {
        id: LocationId::new(id),
        name: id.to_uppercase(),
        latitude,
        longitude,
        avg_stop_times: 0.0,
    }
}

/// `a` is a minute's walk from the origin; `b` to `f` follow eastwards,
/// about 1.3 km apart.
fn stops() -> Vec<Stop> {
    vec![
        stop("a", 51.0505, 3.7205),
        stop("b", 51.0505, 3.738),
        stop("c", 51.0505, 3.756),
        stop("d", 51.0505, 3.774),
        stop("e", 51.0505, 3.792),
        stop("f", 51.0505, 3.810),
    ]
}

fn origin() -> Location {
    Location::new(51.05, 3.72)
}

fn connection(id: &str, trip: &str, from: &str, to: &str, dep: Timestamp, arr: Timestamp) -> Connection {
    Connection {
        id: ConnectionId::new(id),
        departure_stop: LocationId::new(from),
        arrival_stop: LocationId::new(to),
        departure_time: dep,
        arrival_time: arr,
        trip_id: TripId::new(trip),
        travel_mode: TravelMode::Train,
        pickup_allowed: true,
        drop_off_allowed: true,
    }
}

/// Trip t1 runs a to d, trip t2 runs d to f five minutes later.
fn timetable() -> Vec<Connection> {
    vec![
        connection("t1-1", "t1", "a", "b", at(10, 0), at(10, 5)),
        connection("t1-2", "t1", "b", "c", at(10, 5), at(10, 10)),
        connection("t1-3", "t1", "c", "d", at(10, 10), at(10, 15)),
        connection("t2-1", "t2", "d", "e", at(10, 20), at(10, 25)),
        connection("t2-2", "t2", "e", "f", at(10, 25), at(10, 30)),
    ]
}

/// A street along the origin, past stop `a`.
fn street() -> RoadData {
    let nodes: Vec<RoutableTileNode> = (0..=20)
        .map(|i| RoutableTileNode::new(format!("n{i}"), 51.0502, 3.710 + 0.001 * i as f64))
        .collect();
    let edges = nodes
        .windows(2)
        .map(|pair| RoutableEdge {
            from: pair[0].id.clone(),
            to: pair[1].id.clone(),
            distance: pair[0].location().distance_to(&pair[1].location()),
            road_class: RoadClass::Residential,
            one_way: false,
        })
        .collect();
    RoadData { nodes, edges }
}

fn network(connections: Vec<Connection>, road: RoadData) -> Arc<MemoryNetwork> {
    Arc::new(MemoryNetwork::new(NetworkData {
        stops: stops(),
        connections,
        road,
    }))
}

fn runner(
    network: Arc<MemoryNetwork>,
    config: RunnerConfig,
    events: Arc<RecordingSink>,
) -> QueryRunner<MemoryNetwork, MemoryNetwork, MemoryNetwork> {
    let road = RoadPlanner::new(
        network.clone(),
        Arc::new(Profiles::with_defaults()),
        RoadPlannerConfig::default(),
        events.clone(),
    );
    QueryRunner::new(network.clone(), network, road, config, events)
}

fn config(planner: PublicTransportPlanner) -> RunnerConfig {
    RunnerConfig {
        planner,
        ..RunnerConfig::default()
    }
}

fn transit_legs(path: &crate::domain::Path) -> usize {
    path.legs()
        .iter()
        .filter(|leg| leg.travel_mode().is_transit())
        .count()
}

async fn five_connections_one_transfer(planner: PublicTransportPlanner) {
    let events = Arc::new(RecordingSink::new());
    let runner = runner(network(timetable(), RoadData::default()), config(planner), events.clone());
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(1).await.unwrap();

    assert_eq!(found.len(), 1);
    let path = &found[0];
    assert_eq!(transit_legs(path), 2);
    assert_eq!(path.transfer_count(), 1);
    assert!(path.departure_time().unwrap() >= at(9, 55));
    assert_eq!(path.arrival_time(), Some(at(10, 30)));
    assert_eq!(path.origin(), &origin());
    assert_eq!(path.destination().id, Some(LocationId::new("f")));
    for pair in path.steps().collect::<Vec<_>>().windows(2) {
        assert!(pair[0].stop.same_place(&pair[1].start));
    }

    // 15, 30 and 60 minute windows.
    assert_eq!(paths.iterations(), 3);
    assert_eq!(events.count("sub-query"), 3);
    assert_eq!(events.count("initial-reachable-stops"), 1);
    assert_eq!(events.count("final-reachable-stops"), 1);

    // Nothing departs after the last window.
    assert!(paths.next().await.is_none());
    assert_eq!(paths.state(), StreamState::Done);
}

#[tokio::test]
async fn profile_scan_finds_journey_with_one_transfer() {
    five_connections_one_transfer(PublicTransportPlanner::Profile).await;
}

#[tokio::test]
async fn earliest_arrival_finds_journey_with_one_transfer() {
    five_connections_one_transfer(PublicTransportPlanner::EarliestArrival).await;
}

#[tokio::test]
async fn walking_only_journey() {
    let network = Arc::new(MemoryNetwork::new(NetworkData {
        road: street(),
        ..NetworkData::default()
    }));
    let runner = runner(network, RunnerConfig::default(), Arc::new(RecordingSink::new()));
    let destination = Location::new(51.05, 3.727);
    let query = Query::new(origin(), destination.clone())
        .departing_after(at(9, 0))
        .public_transport_only(false);

    let paths: Vec<_> = runner
        .run(query)
        .await
        .unwrap()
        .into_stream()
        .collect()
        .await;

    assert_eq!(paths.len(), 1);
    let path = paths[0].as_ref().unwrap();
    assert_eq!(path.legs().len(), 1);
    assert_eq!(path.legs()[0].travel_mode(), TravelMode::Road);
    assert_eq!(path.origin(), &origin());
    assert_eq!(path.destination(), &destination);
    assert_eq!(path.departure_time(), Some(at(9, 0)));
    assert!(path.legs()[0].distance() < 1000.0);
}

#[tokio::test]
async fn short_walk_without_roads_is_straight() {
    let network = Arc::new(MemoryNetwork::new(NetworkData::default()));
    let runner = runner(network, RunnerConfig::default(), Arc::new(RecordingSink::new()));
    let query = Query::new(origin(), Location::new(51.053, 3.72)).departing_after(at(9, 0));

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(5).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].legs()[0].travel_mode(), TravelMode::Walking);
    assert_eq!(paths.state(), StreamState::Done);
}

#[tokio::test]
async fn public_transport_only_skips_walks() {
    let network = Arc::new(MemoryNetwork::new(NetworkData::default()));
    let runner = runner(network, RunnerConfig::default(), Arc::new(RecordingSink::new()));
    let query = Query::new(origin(), Location::new(51.053, 3.72))
        .departing_after(at(9, 0))
        .public_transport_only(true);

    let mut paths = runner.run(query).await.unwrap();
    assert!(paths.request(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_destination_ends_without_paths() {
    let events = Arc::new(RecordingSink::new());
    let runner = runner(network(timetable(), RoadData::default()), RunnerConfig::default(), events.clone());
    // Far from every stop.
    let query = Query::new(origin(), Location::new(51.30, 3.72)).departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();

    assert!(paths.request(3).await.unwrap().is_empty());
    assert_eq!(paths.state(), StreamState::Done);
    assert_eq!(paths.iterations(), 1);
    assert_eq!(events.count("sub-query"), 1);
}

#[tokio::test]
async fn widening_stops_at_the_timetable_horizon() {
    // t1 only: f is never reached.
    let runner = runner(
        network(timetable()[..3].to_vec(), RoadData::default()),
        RunnerConfig::default(),
        Arc::new(RecordingSink::new()),
    );
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();

    assert!(paths.next().await.is_none());
    assert_eq!(paths.state(), StreamState::Done);
    // The 15 minute window cuts t1-3 short; the 30 minute one sees it all.
    assert_eq!(paths.iterations(), 2);
}

/// Hourly shuttles from `a` to `b` for a day and a half; `f` is never reached
/// but the timetable never runs out within a window.
fn shuttles() -> Vec<Connection> {
    (0..36)
        .map(|hour| {
            let id = format!("s{hour}");
            let departure = at(10, 0) + Duration::hours(hour);
            connection(&id, &id, "a", "b", departure, departure + Duration::minutes(5))
        })
        .collect()
}

#[tokio::test]
async fn widening_stops_at_the_window_cap() {
    let events = Arc::new(RecordingSink::new());
    let runner = runner(network(shuttles(), RoadData::default()), RunnerConfig::default(), events.clone());
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();

    assert!(paths.request(3).await.unwrap().is_empty());
    assert_eq!(paths.state(), StreamState::Done);
    // 15 minutes doubled up to 960; 1920 exceeds the day-long cap.
    assert_eq!(paths.iterations(), 7);
    assert_eq!(events.count("sub-query"), 7);
}

#[tokio::test]
async fn widening_stops_after_max_iterations() {
    let config = RunnerConfig {
        max_iterations: 3,
        ..RunnerConfig::default()
    };
    let runner = runner(network(shuttles(), RoadData::default()), config, Arc::new(RecordingSink::new()));
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();

    assert!(paths.next().await.is_none());
    assert_eq!(paths.state(), StreamState::Done);
    assert_eq!(paths.iterations(), 3);
}

#[tokio::test]
async fn widening_stops_once_windows_go_stale() {
    let mut connections = timetable();
    // Keeps the timetable going well past every window that is planned.
    connections.push(connection("late", "late", "a", "b", at(20, 0), at(20, 5)));
    let events = Arc::new(RecordingSink::new());
    let runner = runner(network(connections, RoadData::default()), RunnerConfig::default(), events.clone());
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(10).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].arrival_time(), Some(at(10, 30)));
    assert_eq!(paths.state(), StreamState::Done);
    // Found in the 60 minute window; the 120 and 240 minute ones add nothing.
    assert_eq!(paths.iterations(), 5);
    assert_eq!(events.count("sub-query"), 5);
}

#[tokio::test]
async fn road_node_endpoints_are_resolved() {
    let runner = runner(
        network(timetable(), street()),
        config(PublicTransportPlanner::Profile),
        Arc::new(RecordingSink::new()),
    );
    let query = Query::new("n12", "f")
        .departing_after(at(9, 55))
        .public_transport_only(true);

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(1).await.unwrap();

    assert_eq!(found.len(), 1);
    assert!(found[0].origin().same_place(&Location::new(51.0502, 3.710 + 0.001 * 12.0).with_id("n12")));
    assert_eq!(found[0].arrival_time(), Some(at(10, 30)));
}

#[tokio::test]
async fn arrival_anchored_queries_widen_backwards() {
    let runner = runner(
        network(timetable(), RoadData::default()),
        RunnerConfig::default(),
        Arc::new(RecordingSink::new()),
    );
    let query = Query::new(origin(), "f").arriving_before(at(10, 35));

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(1).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].arrival_time(), Some(at(10, 30)));
    assert!(paths.query().minimum_departure_time < at(10, 0));
    assert_eq!(paths.query().maximum_arrival_time, at(10, 35));
}

#[tokio::test]
async fn later_windows_add_new_paths_only() {
    let mut connections = timetable();
    // The same trips an hour later.
    for c in timetable() {
        connections.push(Connection {
            id: ConnectionId::new(format!("{}-late", c.id)),
            trip_id: TripId::new(format!("{}-late", c.trip_id)),
            departure_time: c.departure_time + Duration::hours(1),
            arrival_time: c.arrival_time + Duration::hours(1),
            ..c
        });
    }
    let runner = runner(network(connections, RoadData::default()), RunnerConfig::default(), Arc::new(RecordingSink::new()));
    let query = Query::new(origin(), "f").departing_after(at(9, 55));

    let mut paths = runner.run(query).await.unwrap();
    let first = paths.request(1).await.unwrap();
    let state = paths.state();
    let rest = paths.request(10).await.unwrap();

    assert_eq!(first[0].arrival_time(), Some(at(10, 30)));
    assert_ne!(state, StreamState::Done);
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].arrival_time(), Some(at(11, 30)));
    assert_eq!(paths.found(), 2);
}

#[tokio::test]
async fn cancelled_streams_end() {
    let runner = runner(
        network(timetable(), RoadData::default()),
        RunnerConfig::default(),
        Arc::new(RecordingSink::new()),
    );
    let mut paths = runner
        .run(Query::new(origin(), "f").departing_after(at(9, 55)))
        .await
        .unwrap();

    paths.cancel();

    assert!(paths.next().await.is_none());
    assert_eq!(paths.iterations(), 0);
}

#[tokio::test]
async fn provider_failures_fail_the_stream() {
    let network = network(timetable(), RoadData::default());
    network.fail_connections(true);
    let runner = runner(network, RunnerConfig::default(), Arc::new(RecordingSink::new()));
    let mut paths = runner
        .run(Query::new(origin(), "f").departing_after(at(9, 55)))
        .await
        .unwrap();

    let err = paths.next().await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Provider(ProviderError::Fetch { .. })
    ));
    assert_eq!(paths.state(), StreamState::Failed);
    assert!(paths.next().await.is_none());
}

#[tokio::test]
async fn first_and_last_walks_can_follow_roads() {
    let config = RunnerConfig::default().with_road_legs(true);
    let runner = runner(network(timetable(), street()), config, Arc::new(RecordingSink::new()));
    let query = Query::new(origin(), "f")
        .departing_after(at(9, 55))
        .public_transport_only(true);

    let mut paths = runner.run(query).await.unwrap();
    let found = paths.request(1).await.unwrap();

    let path = &found[0];
    let first = &path.legs()[0];
    assert_eq!(first.travel_mode(), TravelMode::Road);
    assert_eq!(first.stop().id, Some(LocationId::new("a")));
    assert_eq!(first.arrival_time(), Some(at(10, 0)));
    assert_eq!(path.origin(), &origin());
}

#[tokio::test]
async fn rejects_bad_queries() {
    let runner = runner(
        network(timetable(), RoadData::default()),
        RunnerConfig::default(),
        Arc::new(RecordingSink::new()),
    );

    let unknown_profile = Query::new(origin(), "f")
        .departing_after(at(9, 55))
        .with_profile("bicycle");
    assert!(matches!(
        runner.run(unknown_profile).await.err(),
        Some(PlannerError::UnknownProfile(_))
    ));

    let unknown_stop = Query::new(origin(), "nowhere").departing_after(at(9, 55));
    assert!(matches!(
        runner.run(unknown_stop).await.err(),
        Some(PlannerError::InvalidQuery(_))
    ));

    let no_time = Query::new(origin(), Endpoint::Id(LocationId::new("f")));
    assert!(matches!(
        runner.run(no_time).await.err(),
        Some(PlannerError::InvalidQuery(_))
    ));
}
