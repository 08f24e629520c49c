//! Session feed over WebSocket

pub mod feed;
pub mod handler;
pub mod protocol;

pub use feed::SessionFeed;
pub use protocol::{ClientMsg, DriverDetail, FeedMsg};
