//! telemetry/mod.rs
//! Unified telemetry module: counters, timers, and immutable snapshots.
//!
//! Industry notes:
//! - Counters are plain structs owned by one thread each and merged after
//!   join, so no atomics or locks sit on the hot path.
//! - Immutable snapshots are serde-serializable for logs and dashboards.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
