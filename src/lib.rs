//! Offline-first synchronization core for a social activity feed.
//!
//! Records are created and edited against an in-memory mirror that is written
//! through to a durable key-value store. Writes made offline are queued and
//! replayed against a [`remote::RemoteService`] once connectivity returns,
//! with temporary ids reconciled to canonical ones.
//!
//! # Examples
//!
//! Synchronous usage with [`core::controller::Controller`]:
//! ```
//! use feedsync::{
//!     config::SyncConfig,
//!     core::controller::Controller,
//!     persist::memory::MemoryStore,
//!     record::{RecordBody, RecordDraft, UserProfile},
//! };
//!
//! let store = MemoryStore::new();
//! let mut core = Controller::open(Box::new(store), SyncConfig::default(), false);
//! core.login(UserProfile {
//!     id: "u1".to_string(),
//!     name: "Ada".to_string(),
//!     surname: "Lovelace".to_string(),
//!     avatar_url: None,
//! });
//! let rec = core
//!     .create_record(RecordDraft::new(RecordBody::WakeUp { description: None }))
//!     .expect("create");
//! assert!(rec.id.is_temporary());
//! assert_eq!(core.queue_snapshot().len(), 1);
//! ```
//!
//! Runtime usage with a SQLite store:
//! ```no_run
//! use std::sync::Arc;
//!
//! use feedsync::{
//!     config::SyncConfig,
//!     core::controller::Controller,
//!     persist::sqlite::SqliteStore,
//!     record::{Record, UserProfile},
//!     remote::{RemoteError, RemoteService},
//!     runtime::handle::spawn_feedsync,
//!     types::RecordId,
//! };
//!
//! struct Backend;
//!
//! #[async_trait::async_trait]
//! impl RemoteService for Backend {
//!     async fn apply_create(&self, _record: &Record) -> Result<RecordId, RemoteError> {
//!         Ok(RecordId::new("srv-1"))
//!     }
//!     async fn apply_update(&self, _id: &RecordId, _record: &Record) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//!     async fn apply_profile_update(&self, _profile: &UserProfile) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteStore::open("feed.db").expect("open sqlite");
//! let core = Controller::open(Box::new(store), SyncConfig::default(), false);
//! let handle = spawn_feedsync(core, Arc::new(Backend));
//! handle.set_online(true).await.expect("online");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Configuration loading and validation.
pub mod config;
/// Authoritative state, queue and controller.
pub mod core;
/// Mutation-queue entry model and on-disk envelope.
pub mod op;
/// Durable store abstraction with SQLite and in-memory backends.
pub mod persist;
/// Feed records, drafts and profiles.
pub mod record;
/// Remote service boundary.
pub mod remote;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Synchronization engine and connectivity monitor.
pub mod sync;
/// Tracing subscriber setup.
pub mod telemetry;
/// Shared identifiers and enums.
pub mod types;
