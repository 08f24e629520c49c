//! Pitwall - replay server for recorded motorsport sessions

pub mod app;
pub mod config;
pub mod http;
pub mod narrative;
pub mod ranking;
pub mod replay;
pub mod schedule;
pub mod telemetry;
pub mod util;
pub mod ws;
