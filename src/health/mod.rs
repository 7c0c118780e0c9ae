//! Venue health - warm path
//!
//! Heartbeat bookkeeping and the background task that drives it:
//! - VenueHealthMonitor: RTT statistics, connection state, order counters
//! - HeartbeatTask: periodic probes, ack matching, timeout checks

pub mod heartbeat;
pub mod monitor;

pub use heartbeat::{HeartbeatAck, HeartbeatTask, HeartbeatToken, HeartbeatTransport, SimulatedTransport};
pub use monitor::VenueHealthMonitor;
