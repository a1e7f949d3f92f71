//! Best-effort pub/sub fan-out for campaign and channel progress events.
//!
//! Observers subscribe under their owner id and receive typed [`Event`]s.
//! Delivery is at-most-once and never blocks the emitter: a slow or
//! disconnected observer simply misses the update and reconciles by
//! re-fetching state on reconnect.

pub mod broadcaster;
pub mod events;

pub use {
    broadcaster::{ProgressBroadcaster, Subscription},
    events::{Event, RecipientProgress},
};
