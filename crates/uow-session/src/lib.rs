//! Unit-of-work session.
//!
//! Application code registers domain objects with a [`Session`] and marks
//! them for insert, update, or delete. Nothing reaches storage until
//! [`Session::commit`], which forwards the minimal set of writes to the
//! object's [`Mapper`](uow_mapper::Mapper) in the order objects entered the
//! session.
//!
//! # Key Types
//!
//! - [`Session`] -- the public façade and commit protocol
//! - [`ObjectState`] -- immutable lifecycle state of one tracked object
//! - [`StateKind`] -- Transient / Loaded / Updated / Deleted / Forgotten
//! - [`IdentityMap`] -- one tracked instance per key
//! - [`Tracker`] -- registration-ordered states walked by commit
//! - [`SessionConfig`] -- label, sizing, and re-insert policy
//! - [`CommitSummary`] -- what the last commit forwarded
//!
//! # Dirty Tracking
//!
//! `update` only marks an object as a candidate. At commit the object is
//! dumped again and compared with the last stored dump; equal dumps forward
//! nothing, so a change that was reverted before commit costs no write.

pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod state;
pub mod summary;
pub mod tracker;

pub use config::SessionConfig;
pub use error::{Operation, SessionError, SessionResult, StateError};
pub use identity::IdentityMap;
pub use session::Session;
pub use state::{ObjectState, Persisted, StateKind};
pub use summary::{CommitSummary, Effect};
pub use tracker::Tracker;

// Re-export the mapper boundary so callers need only this crate.
pub use uow_mapper::{InMemoryMapper, Mapper, MapperError, MapperRegistry, MapperResult};
