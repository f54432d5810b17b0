//! Live event feed
//!
//! HTTP surface a renderer polls while a run is in progress:
//! - `/api/events` drains every stream of the event bus
//! - `/api/schedule` describes the configured schedule
//! - `/health` and `/metrics/prometheus` for the tool itself
//!
//! Without the HTTP feed, [`spawn_log_drain`] empties the bus periodically.

pub mod drain;
pub mod routes;

pub use drain::spawn_log_drain;
pub use routes::{FeedState, feed_routes};
