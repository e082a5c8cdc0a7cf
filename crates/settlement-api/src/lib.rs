//! HTTP + `WebSocket` server for the settlement engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **The player event channel** (`GET /ws`) -- a single `WebSocket`
//!   connection multiplexing authentication, world join, construction and
//!   structure commands, and server-pushed state/progress/disaster events
//!   per room
//! - **The admin REST surface** -- server/world lifecycle, structure
//!   metadata and direct mutation, and disaster trigger/clear, all gated
//!   behind an administrator session
//!
//! # Architecture
//!
//! Handlers read and write through [`settlement_db`] stores directly;
//! there is no separate repository layer. Events visible to other
//! sessions are published through `settlement_events::BroadcastRegistry`
//! rooms, shared via [`AppState::registry`](state::AppState). REST writes
//! and event-channel commands that mutate the same entities (structures,
//! construction) share their validation and persistence logic through
//! `settlement-structures`/`settlement-construction`/`settlement-ledger`,
//! never duplicating it.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metadata_cache;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use startup::{spawn_server, StartupError};
pub use state::AppState;
