//! The broadcast registry: rooms, subscriptions, and delivery ordering
//! for outbound game events.
//!
//! # Modules
//!
//! - [`registry`] -- `BroadcastRegistry`: join/leave/publish against
//!   `world:{worldId}` and `settlement:{id}` rooms.

pub mod registry;

pub use registry::{BroadcastRegistry, SubscriberId, Subscription};
