//! Connection management for the realtime transport
//!
//! - `state`: connection state machine values and typed outcomes
//! - `manager`: the [`ConnectionManager`] owning the transport session

mod manager;
mod state;

pub use manager::ConnectionManager;
pub use state::{ConnectOutcome, ConnectionState, ReconnectOutcome};
