//! Persistence boundary for the unit-of-work session.
//!
//! A [`Mapper`] knows how to key, snapshot, and physically write one kind of
//! domain object. The session never touches storage itself: it decides
//! *which* writes are necessary and forwards exactly those to the mapper on
//! commit.
//!
//! # Provided Types
//!
//! - [`Mapper`] -- the contract consumed by the session
//! - [`InMemoryMapper`] -- JSON-dump mapper over an in-memory table, for tests and embedding
//! - [`Journal`] / [`MapperOp`] -- record of every write a mapper received
//! - [`MapperRegistry`] -- explicit lookup from domain object type to mapper
//!
//! # Mapper Rules
//!
//! 1. `dump_key` and `dump` are deterministic for an unchanged object.
//! 2. Dumps are compared only for equality; the session never inspects them.
//! 3. `update` receives the previous dump so backends can diff or check for
//!    concurrent modification.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod journal;
pub mod memory;
pub mod registry;
pub mod traits;

pub use error::{MapperError, MapperResult};
pub use journal::{Journal, MapperOp};
pub use memory::InMemoryMapper;
pub use registry::MapperRegistry;
pub use traits::Mapper;
