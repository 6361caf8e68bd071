//! # Trace subscribers.
//!
//! ```text
//! Endpoint ── publish(Event) ──► Bus ──► forwarder task ──► SubscriberSet::emit
//!                                                              │
//!                                              ┌───────────────┼──────────────┐
//!                                              ▼               ▼              ▼
//!                                          LogWriter        Metrics        Custom
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] per-subscriber bounded queues and workers
//! - `LogWriter` (feature `logging`) writes every event through `tracing`

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
