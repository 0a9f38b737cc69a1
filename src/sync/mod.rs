//! Synchronization engine and connectivity tracking.

/// Online/offline edge detection.
pub mod connectivity;
/// Queue-draining engine and its step protocol.
pub mod engine;
