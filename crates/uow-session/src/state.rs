//! Lifecycle state of a single tracked domain object.
//!
//! An [`ObjectState`] is an immutable value: the key and dump are captured
//! when it is constructed, and every transition builds a new state rather
//! than mutating the old one. The variant decides which transitions are
//! legal and what `persist` forwards to the mapper:
//!
//! | State     | `delete`  | `forget`   | `persist`                        |
//! |-----------|-----------|------------|----------------------------------|
//! | Transient | error     | error      | `create`, then Loaded            |
//! | Loaded    | Deleted   | Forgotten  | nothing                          |
//! | Updated   | Deleted   | error      | `update` if dirty, then Loaded   |
//! | Deleted   | error     | error      | `delete`, then Forgotten         |
//! | Forgotten | error     | error      | nothing                          |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uow_mapper::{Mapper, MapperResult};

use crate::error::{Operation, SessionResult, StateError};
use crate::identity::IdentityMap;
use crate::summary::Effect;
use crate::tracker::Tracker;

/// Which lifecycle phase an object is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Constructed by the application, not yet stored.
    Transient,
    /// Stored, and the dump matches the stored row.
    Loaded,
    /// Stored, and marked as a candidate for update.
    Updated,
    /// Stored, and scheduled for deletion.
    Deleted,
    /// No longer tracked. Terminal.
    Forgotten,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "Transient",
            Self::Loaded => "Loaded",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::Forgotten => "Forgotten",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
enum Variant<D> {
    Transient,
    Loaded,
    /// `baseline` is the dump last known to be stored.
    Updated { baseline: D },
    Deleted,
    Forgotten,
}

/// A tracked domain object together with its key, dump, and lifecycle phase.
pub struct ObjectState<M: Mapper> {
    mapper: Arc<M>,
    object: M::Object,
    key: M::Key,
    dump: M::Dump,
    variant: Variant<M::Dump>,
}

/// Successor state produced by [`ObjectState::persist`], with what was written.
pub struct Persisted<M: Mapper> {
    pub state: ObjectState<M>,
    pub effect: Effect,
}

impl<M: Mapper> ObjectState<M> {
    /// Track a new object that does not exist in storage yet.
    pub fn transient(mapper: Arc<M>, object: M::Object) -> MapperResult<Self> {
        Self::capture(mapper, object, Variant::Transient)
    }

    /// Track an object hydrated from storage; its current dump is the baseline.
    pub fn loaded(mapper: Arc<M>, object: M::Object) -> MapperResult<Self> {
        Self::capture(mapper, object, Variant::Loaded)
    }

    fn capture(
        mapper: Arc<M>,
        object: M::Object,
        variant: Variant<M::Dump>,
    ) -> MapperResult<Self> {
        let key = mapper.dump_key(&object)?;
        let dump = mapper.dump(&object)?;
        Ok(Self {
            mapper,
            object,
            key,
            dump,
            variant,
        })
    }

    /// Same object, key, and dump under a new variant.
    fn successor(&self, variant: Variant<M::Dump>) -> Self {
        self.rebased(self.dump.clone(), variant)
    }

    /// Same object and key with a new dump and variant.
    fn rebased(&self, dump: M::Dump, variant: Variant<M::Dump>) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
            object: self.object.clone(),
            key: self.key.clone(),
            dump,
            variant,
        }
    }

    fn illegal(&self, operation: Operation) -> StateError {
        StateError::new(self.kind(), operation)
    }

    pub fn object(&self) -> &M::Object {
        &self.object
    }

    pub fn key(&self) -> &M::Key {
        &self.key
    }

    /// The dump captured when this state was constructed.
    pub fn dump(&self) -> &M::Dump {
        &self.dump
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }

    pub fn kind(&self) -> StateKind {
        match self.variant {
            Variant::Transient => StateKind::Transient,
            Variant::Loaded => StateKind::Loaded,
            Variant::Updated { .. } => StateKind::Updated,
            Variant::Deleted => StateKind::Deleted,
            Variant::Forgotten => StateKind::Forgotten,
        }
    }

    /// The dump the next write is compared against.
    ///
    /// For an Updated state this is the dump stored before the update was
    /// requested; for every other state it is the captured dump.
    pub fn baseline(&self) -> &M::Dump {
        match &self.variant {
            Variant::Updated { baseline } => baseline,
            _ => &self.dump,
        }
    }

    /// Returns `true` if `persist` may forward a write.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.variant,
            Variant::Transient | Variant::Updated { .. } | Variant::Deleted
        )
    }

    // ---------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------

    /// Re-snapshot the tracked object as `object`.
    ///
    /// A Loaded state becomes Updated with its dump as baseline. An Updated
    /// state stays Updated and keeps its original baseline. A Transient
    /// state stays Transient so the pending create carries the new dump.
    pub fn update(&self, object: M::Object) -> SessionResult<Self> {
        let variant = match &self.variant {
            Variant::Transient => Variant::Transient,
            Variant::Loaded => Variant::Updated {
                baseline: self.dump.clone(),
            },
            Variant::Updated { baseline } => Variant::Updated {
                baseline: baseline.clone(),
            },
            Variant::Deleted | Variant::Forgotten => {
                return Err(self.illegal(Operation::Update).into())
            }
        };
        let dump = self.mapper.dump(&object)?;
        Ok(Self {
            mapper: Arc::clone(&self.mapper),
            object,
            key: self.key.clone(),
            dump,
            variant,
        })
    }

    /// Schedule the object for deletion.
    pub fn delete(&self) -> Result<Self, StateError> {
        match self.variant {
            Variant::Loaded | Variant::Updated { .. } => Ok(self.successor(Variant::Deleted)),
            _ => Err(self.illegal(Operation::Delete)),
        }
    }

    /// Stop tracking a clean object.
    pub fn forget(&self) -> Result<Self, StateError> {
        match self.variant {
            Variant::Loaded => Ok(self.successor(Variant::Forgotten)),
            _ => Err(self.illegal(Operation::Forget)),
        }
    }

    /// Forward whatever write this state requires and return its successor.
    ///
    /// Updated states recompute the object's dump here, so a mutation that
    /// was reverted before commit forwards nothing.
    pub fn persist(&self) -> SessionResult<Persisted<M>> {
        let persisted = match &self.variant {
            Variant::Transient => {
                // The dump sent is the baseline, whatever the mapper returns.
                self.mapper.create(&self.dump)?;
                Persisted {
                    state: self.successor(Variant::Loaded),
                    effect: Effect::Created,
                }
            }
            Variant::Updated { baseline } => {
                let current = self.mapper.dump(&self.object)?;
                if current == *baseline {
                    debug!(key = ?self.key, "update reverted before commit; skipping");
                    Persisted {
                        state: self.rebased(current, Variant::Loaded),
                        effect: Effect::Unchanged,
                    }
                } else {
                    self.mapper.update(&self.key, &current, baseline)?;
                    Persisted {
                        state: self.rebased(current, Variant::Loaded),
                        effect: Effect::Updated,
                    }
                }
            }
            Variant::Deleted => {
                self.mapper.delete(&self.key)?;
                Persisted {
                    state: self.successor(Variant::Forgotten),
                    effect: Effect::Deleted,
                }
            }
            Variant::Loaded | Variant::Forgotten => Persisted {
                state: self.clone(),
                effect: Effect::Unchanged,
            },
        };
        Ok(persisted)
    }

    // ---------------------------------------------------------------
    // Registration hooks
    // ---------------------------------------------------------------

    /// Record this state in the tracker. Forgotten states drop their entry.
    pub fn update_tracker(&self, tracker: &mut Tracker<M>) {
        match self.variant {
            Variant::Forgotten => {
                tracker.remove(&self.key);
            }
            _ => tracker.add(self.clone()),
        }
    }

    /// Register the object in the identity map if this state owns a slot there.
    pub fn update_identity(&self, identity: &mut IdentityMap<M::Key, M::Object>) {
        if matches!(self.variant, Variant::Transient | Variant::Loaded) {
            identity.register(self.key.clone(), self.object.clone());
        }
    }

    /// Remove the object from the identity map once it is forgotten.
    pub fn delete_identity(&self, identity: &mut IdentityMap<M::Key, M::Object>) {
        if matches!(self.variant, Variant::Forgotten) {
            identity.remove(&self.key);
        }
    }
}

impl<M: Mapper> Clone for ObjectState<M> {
    fn clone(&self) -> Self {
        self.successor(self.variant.clone())
    }
}

impl<M: Mapper> fmt::Debug for ObjectState<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectState")
            .field("kind", &self.kind())
            .field("key", &self.key)
            .field("dump", &self.dump)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use serde_json::json;
    use uow_mapper::InMemoryMapper;

    #[derive(Clone, Debug, Serialize)]
    struct Note {
        id: u32,
        body: String,
    }

    type NoteMapper = InMemoryMapper<Note>;

    fn note(id: u32, body: &str) -> Note {
        Note {
            id,
            body: body.to_string(),
        }
    }

    fn mapper() -> Arc<NoteMapper> {
        Arc::new(NoteMapper::new("id"))
    }

    /// A Loaded state whose row already exists in the mapper.
    fn stored(mapper: &Arc<NoteMapper>, id: u32, body: &str) -> ObjectState<NoteMapper> {
        mapper.seed(&note(id, body)).unwrap();
        ObjectState::loaded(Arc::clone(mapper), note(id, body)).unwrap()
    }

    fn assert_illegal<T: fmt::Debug>(result: Result<T, StateError>, state: StateKind, op: Operation) {
        assert_eq!(result.unwrap_err(), StateError::new(state, op));
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn construction_captures_key_and_dump() {
        let state = ObjectState::transient(mapper(), note(7, "hi")).unwrap();
        assert_eq!(state.kind(), StateKind::Transient);
        assert_eq!(state.key(), "7");
        assert_eq!(state.dump(), &json!({"id": 7, "body": "hi"}));
        assert_eq!(state.object().body, "hi");
        assert!(state.is_pending());
    }

    #[test]
    fn construction_propagates_mapper_errors() {
        let state = ObjectState::loaded(Arc::new(NoteMapper::new("missing")), note(1, "x"));
        assert!(state.is_err());
    }

    #[test]
    fn clone_is_an_equal_snapshot() {
        let state = ObjectState::loaded(mapper(), note(1, "x")).unwrap();
        let copy = state.clone();
        assert_eq!(copy.kind(), StateKind::Loaded);
        assert_eq!(copy.key(), state.key());
        assert_eq!(copy.dump(), state.dump());
        assert!(Arc::ptr_eq(copy.mapper(), state.mapper()));
    }

    // -----------------------------------------------------------------------
    // Transient
    // -----------------------------------------------------------------------

    #[test]
    fn transient_persist_creates_and_becomes_loaded() {
        let mapper = mapper();
        let state = ObjectState::transient(Arc::clone(&mapper), note(1, "x")).unwrap();

        let persisted = state.persist().unwrap();
        assert_eq!(persisted.effect, Effect::Created);
        assert_eq!(persisted.state.kind(), StateKind::Loaded);
        assert_eq!(persisted.state.dump(), state.dump());
        assert_eq!(mapper.journal().inserts(), vec![state.dump().clone()]);
    }

    #[test]
    fn transient_cannot_be_deleted_or_forgotten() {
        let state = ObjectState::transient(mapper(), note(1, "x")).unwrap();
        assert_illegal(state.delete(), StateKind::Transient, Operation::Delete);
        assert_illegal(state.forget(), StateKind::Transient, Operation::Forget);
    }

    #[test]
    fn transient_update_refreshes_pending_insert() {
        let mapper = mapper();
        let state = ObjectState::transient(Arc::clone(&mapper), note(1, "draft")).unwrap();
        let state = state.update(note(1, "final")).unwrap();

        assert_eq!(state.kind(), StateKind::Transient);
        state.persist().unwrap();
        assert_eq!(
            mapper.journal().inserts(),
            vec![json!({"id": 1, "body": "final"})]
        );
    }

    // -----------------------------------------------------------------------
    // Loaded
    // -----------------------------------------------------------------------

    #[test]
    fn loaded_persist_is_an_idempotent_noop() {
        let mapper = mapper();
        let mut state = stored(&mapper, 1, "x");
        for _ in 0..3 {
            let persisted = state.persist().unwrap();
            assert_eq!(persisted.effect, Effect::Unchanged);
            assert_eq!(persisted.state.kind(), StateKind::Loaded);
            assert_eq!(persisted.state.dump(), state.dump());
            state = persisted.state;
        }
        assert!(mapper.journal().is_empty());
        assert!(!state.is_pending());
    }

    #[test]
    fn loaded_delete_and_forget() {
        let state = stored(&mapper(), 1, "x");
        let deleted = state.delete().unwrap();
        assert_eq!(deleted.kind(), StateKind::Deleted);
        assert_eq!(deleted.key(), state.key());

        let forgotten = state.forget().unwrap();
        assert_eq!(forgotten.kind(), StateKind::Forgotten);
    }

    #[test]
    fn loaded_update_captures_baseline() {
        let state = stored(&mapper(), 1, "before");
        let updated = state.update(note(1, "after")).unwrap();

        assert_eq!(updated.kind(), StateKind::Updated);
        assert_eq!(updated.baseline(), &json!({"id": 1, "body": "before"}));
        assert_eq!(updated.dump(), &json!({"id": 1, "body": "after"}));
        assert_eq!(updated.key(), state.key());
    }

    // -----------------------------------------------------------------------
    // Updated
    // -----------------------------------------------------------------------

    #[test]
    fn updated_persist_forwards_real_change() {
        let mapper = mapper();
        let updated = stored(&mapper, 1, "before").update(note(1, "after")).unwrap();

        let persisted = updated.persist().unwrap();
        assert_eq!(persisted.effect, Effect::Updated);
        assert_eq!(persisted.state.kind(), StateKind::Loaded);
        assert_eq!(persisted.state.dump(), &json!({"id": 1, "body": "after"}));
        assert_eq!(
            mapper.journal().updates(),
            vec![(
                "1".to_string(),
                json!({"id": 1, "body": "after"}),
                json!({"id": 1, "body": "before"})
            )]
        );
    }

    #[test]
    fn updated_persist_skips_unchanged_object() {
        let mapper = mapper();
        let updated = stored(&mapper, 1, "same").update(note(1, "same")).unwrap();

        let persisted = updated.persist().unwrap();
        assert_eq!(persisted.effect, Effect::Unchanged);
        assert_eq!(persisted.state.kind(), StateKind::Loaded);
        assert!(mapper.journal().is_empty());
    }

    #[test]
    fn re_update_keeps_original_baseline() {
        let state = stored(&mapper(), 1, "v0");
        let updated = state
            .update(note(1, "v1"))
            .unwrap()
            .update(note(1, "v2"))
            .unwrap();

        assert_eq!(updated.baseline(), &json!({"id": 1, "body": "v0"}));
        assert_eq!(updated.dump(), &json!({"id": 1, "body": "v2"}));
    }

    #[test]
    fn updated_can_be_deleted_but_not_forgotten() {
        let updated = stored(&mapper(), 1, "a").update(note(1, "b")).unwrap();
        assert_eq!(updated.delete().unwrap().kind(), StateKind::Deleted);
        assert_illegal(updated.forget(), StateKind::Updated, Operation::Forget);
    }

    #[test]
    fn updated_persist_propagates_conflict() {
        let mapper = mapper();
        let updated = stored(&mapper, 1, "a").update(note(1, "b")).unwrap();
        mapper.put_row(json!({"id": 1, "body": "elsewhere"})).unwrap();

        let err = updated.persist().err().unwrap();
        assert!(matches!(err, SessionError::Mapper(_)));
    }

    // -----------------------------------------------------------------------
    // Deleted / Forgotten
    // -----------------------------------------------------------------------

    #[test]
    fn deleted_persist_deletes_key_and_becomes_forgotten() {
        let mapper = mapper();
        let deleted = stored(&mapper, 4, "x").delete().unwrap();

        let persisted = deleted.persist().unwrap();
        assert_eq!(persisted.effect, Effect::Deleted);
        assert_eq!(persisted.state.kind(), StateKind::Forgotten);
        assert_eq!(mapper.journal().deletes(), vec!["4".to_string()]);
        assert!(mapper.row("4").is_none());
    }

    #[test]
    fn deleted_rejects_further_transitions() {
        let deleted = stored(&mapper(), 1, "x").delete().unwrap();
        assert_illegal(deleted.delete(), StateKind::Deleted, Operation::Delete);
        assert_illegal(deleted.forget(), StateKind::Deleted, Operation::Forget);
        let err = deleted.update(note(1, "y")).err().unwrap();
        assert!(matches!(
            err,
            SessionError::State(StateError { state: StateKind::Deleted, operation: Operation::Update })
        ));
    }

    #[test]
    fn forgotten_is_terminal() {
        let mapper = mapper();
        let forgotten = stored(&mapper, 1, "x").forget().unwrap();
        assert_illegal(forgotten.delete(), StateKind::Forgotten, Operation::Delete);
        assert_illegal(forgotten.forget(), StateKind::Forgotten, Operation::Forget);
        assert!(forgotten.update(note(1, "y")).is_err());

        let persisted = forgotten.persist().unwrap();
        assert_eq!(persisted.effect, Effect::Unchanged);
        assert_eq!(persisted.state.kind(), StateKind::Forgotten);
        assert!(mapper.journal().is_empty());
    }

    #[test]
    fn forgotten_keeps_object() {
        let forgotten = stored(&mapper(), 1, "kept").forget().unwrap();
        assert_eq!(forgotten.object().body, "kept");
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    #[test]
    fn loaded_registers_identity_and_tracker() {
        let state = stored(&mapper(), 1, "x");
        let mut identity = IdentityMap::new();
        let mut tracker = Tracker::new();

        state.update_identity(&mut identity);
        state.update_tracker(&mut tracker);
        state.delete_identity(&mut identity);

        assert_eq!(identity.lookup(&"1".to_string()).unwrap().body, "x");
        assert_eq!(tracker.get(&"1".to_string()).unwrap().kind(), StateKind::Loaded);
    }

    #[test]
    fn updated_and_deleted_leave_identity_alone() {
        let loaded = stored(&mapper(), 1, "x");
        let mut identity = IdentityMap::new();

        loaded.update(note(1, "y")).unwrap().update_identity(&mut identity);
        loaded.delete().unwrap().update_identity(&mut identity);
        loaded.delete().unwrap().delete_identity(&mut identity);
        assert!(identity.is_empty());
    }

    #[test]
    fn forgotten_clears_identity_and_tracker() {
        let state = stored(&mapper(), 1, "x");
        let mut identity = IdentityMap::new();
        let mut tracker = Tracker::new();
        state.update_identity(&mut identity);
        state.update_tracker(&mut tracker);

        let forgotten = state.forget().unwrap();
        forgotten.update_tracker(&mut tracker);
        forgotten.update_identity(&mut identity);
        forgotten.delete_identity(&mut identity);

        assert!(identity.is_empty());
        assert!(tracker.is_empty());
    }
}
