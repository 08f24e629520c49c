//! Application state

pub mod state;

pub use state::{AppState, Session};
