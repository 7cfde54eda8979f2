use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use journey_planner::domain::{Location, Path, Profiles};
use journey_planner::events::{EventSink, TracingSink};
use journey_planner::pathfinding::{RoadPlanner, RoadPlannerConfig};
use journey_planner::provider::MemoryNetwork;
use journey_planner::query::{Endpoint, Query, QueryRunner, RunnerConfig};

fn usage() -> ! {
    eprintln!("usage: journey-planner <network.json> <from> <to> <departure>");
    eprintln!();
    eprintln!("  <from>, <to>   stop id or \"lat,lon\"");
    eprintln!("  <departure>    RFC 3339 time, e.g. 2024-03-15T09:55:00Z");
    std::process::exit(2);
}

fn parse_endpoint(arg: &str) -> Endpoint {
    let coordinates = arg
        .split_once(',')
        .and_then(|(lat, lon)| Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?)));
    match coordinates {
        Some((lat, lon)) => Endpoint::Location(Location::new(lat, lon)),
        None => Endpoint::from(arg),
    }
}

fn place(location: &Location) -> String {
    location
        .name
        .clone()
        .or_else(|| location.id.as_ref().map(|id| id.to_string()))
        .unwrap_or_else(|| format!("{:.5},{:.5}", location.latitude, location.longitude))
}

fn clock(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn describe(path: &Path) -> String {
    path.legs()
        .iter()
        .map(|leg| {
            let mode = format!("{:?}", leg.travel_mode());
            format!(
                "  {} {mode:>8} {} -> {} {} ({:.0} m)",
                clock(leg.departure_time()),
                place(leg.start()),
                place(leg.stop()),
                clock(leg.arrival_time()),
                leg.distance(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [network, from, to, departure] = args.as_slice() else {
        usage();
    };
    let departure: DateTime<Utc> = departure
        .parse()
        .unwrap_or_else(|e| panic!("invalid departure time {departure:?}: {e}"));

    let network = Arc::new(MemoryNetwork::from_file(network).expect("Failed to load network"));
    println!(
        "Loaded {} stops and {} connections",
        network.stop_count(),
        network.connection_count()
    );

    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let road = RoadPlanner::new(
        network.clone(),
        Arc::new(Profiles::with_defaults()),
        RoadPlannerConfig::default(),
        events.clone(),
    );
    let config = RunnerConfig::default().with_road_legs(true);
    let runner = QueryRunner::new(network.clone(), network.clone(), road, config, events);

    let query = Query::new(parse_endpoint(from), parse_endpoint(to)).departing_after(departure);
    let stream = runner.run(query).await.expect("Failed to start query");

    let mut paths = std::pin::pin!(stream.into_stream());
    let mut count = 0;
    while let Some(path) = paths.next().await {
        match path {
            Ok(path) => {
                count += 1;
                println!(
                    "Path {count}: {} transfer(s), {} min",
                    path.transfer_count(),
                    path.total_duration().num_minutes()
                );
                println!("{}", describe(&path));
            }
            Err(e) => {
                eprintln!("Planning failed: {e}");
                std::process::exit(1);
            }
        }
    }
    if count == 0 {
        println!("No journey found");
    }
}
