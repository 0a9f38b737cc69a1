//! Authoritative in-memory state and the controller that owns it.

/// Write-through owner of state, store and queue.
pub mod controller;
/// Record and entry id minting.
pub mod ids;
/// FIFO mutation queue.
pub mod queue;
/// In-memory record mirror.
pub mod repository;
/// Aggregate client state.
pub mod state;
