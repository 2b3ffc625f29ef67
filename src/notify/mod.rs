//! Toast notifications
//!
//! Reconcilers report "something changed" on a [`NotificationBus`]; how it is
//! shown is up to whoever listens.

mod bus;

pub use bus::{
    Listener, ListenerId, NotificationBus, ToastEvent, DEFAULT_STREAM_CAPACITY, SHOW_TOAST,
};
