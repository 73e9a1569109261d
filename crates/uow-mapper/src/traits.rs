use std::fmt::Debug;
use std::hash::Hash;

use crate::error::MapperResult;

/// Translates one kind of domain object to and from its persisted form.
///
/// All implementations must satisfy these invariants:
/// - `dump_key` is stable for the lifetime of tracking: the same object
///   yields the same key as long as its key fields are unchanged.
/// - `dump` is deterministic: an unchanged object yields an equal dump.
/// - `create`, `update`, and `delete` are the only calls that touch storage.
/// - Backend failures are returned as errors, never swallowed.
pub trait Mapper: Send + Sync {
    /// The application-side domain object.
    type Object: Clone;

    /// Identifier derived from an object, indexing the identity map.
    type Key: Clone + Eq + Hash + Debug;

    /// Comparable snapshot of an object's persisted form.
    type Dump: Clone + PartialEq + Debug;

    /// Derive the persistence key of an object.
    fn dump_key(&self, object: &Self::Object) -> MapperResult<Self::Key>;

    /// Snapshot an object into its persisted form.
    fn dump(&self, object: &Self::Object) -> MapperResult<Self::Dump>;

    /// Physically insert a dump.
    ///
    /// Returns the canonical stored dump, which may differ from the input
    /// (e.g. backend-generated columns). Sessions keep the dump they sent as
    /// the baseline for dirty checks.
    fn create(&self, dump: &Self::Dump) -> MapperResult<Self::Dump>;

    /// Physically replace the row at `key` with `dump`.
    ///
    /// `previous` is the last dump known to be stored, so backends can build
    /// a minimal diff or reject concurrent modification.
    fn update(&self, key: &Self::Key, dump: &Self::Dump, previous: &Self::Dump)
        -> MapperResult<()>;

    /// Physically remove the row at `key`.
    fn delete(&self, key: &Self::Key) -> MapperResult<()>;
}
