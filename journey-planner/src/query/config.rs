//! Widening configuration for the query runner.

use chrono::Duration;

use crate::transit::PublicTransportPlanner;

/// How the runner grows its search window.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Span of the first window (minutes).
    pub initial_window_mins: i64,

    /// Factor the span is multiplied by after every widening.
    pub growth_factor: f64,

    /// Widening stops once the span would exceed this (minutes).
    pub max_window_mins: i64,

    /// Widening stops after this many windows.
    pub max_iterations: usize,

    /// Widening stops after this many windows in a row add no path, once
    /// at least one path was found.
    pub stale_widenings_limit: usize,

    pub planner: PublicTransportPlanner,

    /// Replace the first and last walks of transit paths by routed road
    /// legs.
    pub road_legs: bool,

    /// Stops kept by the location resolver.
    pub resolver_capacity: u64,
}

impl RunnerConfig {
    pub fn new(
        initial_window_mins: i64,
        growth_factor: f64,
        max_window_mins: i64,
        max_iterations: usize,
        stale_widenings_limit: usize,
        planner: PublicTransportPlanner,
    ) -> Self {
        Self {
            initial_window_mins,
            growth_factor,
            max_window_mins,
            max_iterations,
            stale_widenings_limit,
            planner,
            ..Self::default()
        }
    }

    pub fn with_road_legs(mut self, road_legs: bool) -> Self {
        self.road_legs = road_legs;
        self
    }

    /// Returns the first window span as a Duration.
    pub fn initial_window(&self) -> Duration {
        Duration::minutes(self.initial_window_mins)
    }

    /// Returns the largest window span as a Duration.
    pub fn max_window(&self) -> Duration {
        Duration::minutes(self.max_window_mins)
    }

    /// The span following `span`.
    pub fn widen(&self, span: Duration) -> Duration {
        let millis = span.num_milliseconds() as f64 * self.growth_factor;
        Duration::milliseconds(millis.round() as i64)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            initial_window_mins: 15,
            growth_factor: 2.0,
            max_window_mins: 1440, // 1 day
            max_iterations: 10,
            stale_widenings_limit: 2,
            planner: PublicTransportPlanner::Profile,
            road_legs: false,
            resolver_capacity: 10_000,
        }
    }
}
