//! Procure Sync
//!
//! Realtime synchronization layer for a business-management front end. Push
//! events from a Pusher-protocol service are merged into locally held
//! collections of budgets, budget requests, invoices and transactions.
//!
//! # Modules
//!
//! - `connection`: connection manager and its state machine
//! - `router`: channel/event bindings multiplexed on the one connection
//! - `sync`: generic entity reconciler, collections and notification rules
//! - `notify`: notification bus carrying toasts
//! - `cache`: local fallback cache (in-memory or JSONL files)
//! - `transport`: Pusher WebSocket transport and an in-process loopback
//! - `api`: status API served by the binary
//! - `types`: domain records and toasts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use procure_sync::{RealtimeClient, RealtimeConfig, PusherTransport};
//! use procure_sync::types::Budget;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = RealtimeClient::new(Arc::new(PusherTransport::new()));
//!     client.bus().on(|toast| println!("{}", toast.message));
//!
//!     let budgets = client.reconciler::<Budget>(Vec::new());
//!     tokio::spawn(budgets.clone().follow_connection());
//!
//!     if let Err(e) = client.connect(&RealtimeConfig::from_env()) {
//!         eprintln!("realtime unavailable: {}", e);
//!     }
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod notify;
pub mod router;
pub mod sync;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use cache::{FallbackCache, JsonlCache, MemoryCache};
pub use client::RealtimeClient;
pub use config::{ConnectOptions, RealtimeConfig, ServerConfig};
pub use connection::{ConnectOutcome, ConnectionManager, ConnectionState, ReconnectOutcome};
pub use error::{CacheError, CacheResult, RealtimeError, RealtimeResult};
pub use notify::{ListenerId, NotificationBus, SHOW_TOAST};
pub use router::{ChannelRouter, Disposer};
pub use sync::{
    Change, EntityKind, NoOp, NotificationRules, Reconciler, ReconcilerOptions,
    SubscriptionStatus, SyncEntity,
};
pub use transport::{LoopbackTransport, PusherTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
