//! Query handling: input, endpoint resolution and the widening runner.

mod config;
mod request;
mod resolver;
mod runner;

#[cfg(test)]
mod runner_tests;

pub use config::RunnerConfig;
pub use request::{Endpoint, Query, ResolvedQuery, TimeBound};
pub use resolver::{LocationResolver, NetworkLocationResolver, StopLocationResolver};
pub use runner::{PathStream, QueryRunner, StreamState};
