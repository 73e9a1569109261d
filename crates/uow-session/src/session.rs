//! The unit-of-work façade and its commit protocol.
//!
//! A [`Session`] collects inserts, updates, and deletes without touching
//! storage. [`Session::commit`] walks the tracked states in registration
//! order and asks each to persist itself; only states that actually differ
//! from storage reach the mapper. The first failure stops the walk: states
//! already persisted stay persisted, the rest remain pending for the next
//! commit.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uow_mapper::{Mapper, MapperRegistry};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::identity::IdentityMap;
use crate::state::{ObjectState, StateKind};
use crate::summary::{CommitSummary, Effect};
use crate::tracker::Tracker;

/// A single-caller unit of work over one mapper.
///
/// Every mutating operation takes `&mut self` and returns the session again,
/// so calls chain with `?`:
///
/// ```ignore
/// session.insert(order)?.update(customer)?.commit()?;
/// ```
pub struct Session<M: Mapper> {
    mapper: Arc<M>,
    config: SessionConfig,
    tracker: Tracker<M>,
    identity: IdentityMap<M::Key, M::Object>,
    /// Keys deleted or forgotten during this session. Only kept when
    /// re-insertion is disabled.
    retired: HashSet<M::Key>,
    committed: bool,
    last_commit: Option<CommitSummary>,
}

impl<M: Mapper> Session<M> {
    /// Create a session with the default configuration.
    pub fn new(mapper: Arc<M>) -> Self {
        Self::with_config(mapper, SessionConfig::default())
    }

    pub fn with_config(mapper: Arc<M>, config: SessionConfig) -> Self {
        Self {
            mapper,
            tracker: Tracker::with_capacity(config.capacity),
            identity: IdentityMap::with_capacity(config.capacity),
            retired: HashSet::new(),
            committed: true,
            last_commit: None,
            config,
        }
    }

    /// Create a session using the mapper registered for `M::Object`.
    pub fn from_registry(registry: &MapperRegistry, config: SessionConfig) -> SessionResult<Self>
    where
        M: 'static,
        M::Object: 'static,
    {
        let mapper = registry.resolve::<M>()?;
        Ok(Self::with_config(mapper, config))
    }

    // ---------------------------------------------------------------
    // Interactions
    // ---------------------------------------------------------------

    /// Track a new object; it is created in storage on the next commit.
    pub fn insert(&mut self, object: M::Object) -> SessionResult<&mut Self> {
        let state = ObjectState::transient(Arc::clone(&self.mapper), object)?;
        let key = state.key();
        if self.identity.contains(key) {
            return Err(SessionError::AlreadyTracked(format!("{key:?}")));
        }
        if !self.config.allow_reinsert && self.retired.contains(key) {
            return Err(SessionError::Retired(format!("{key:?}")));
        }

        debug!(session = self.config.effective_label(), key = ?key, "insert");
        state.update_tracker(&mut self.tracker);
        state.update_identity(&mut self.identity);
        self.committed = false;
        Ok(self)
    }

    /// Track an object just read from storage.
    ///
    /// Its current dump becomes the baseline for later updates. Loading
    /// schedules no write, so it does not affect [`committed`](Self::committed).
    pub fn load(&mut self, object: M::Object) -> SessionResult<&mut Self> {
        let state = ObjectState::loaded(Arc::clone(&self.mapper), object)?;
        let key = state.key();
        if self.identity.contains(key) {
            return Err(SessionError::AlreadyTracked(format!("{key:?}")));
        }
        if !self.config.allow_reinsert && self.retired.contains(key) {
            return Err(SessionError::Retired(format!("{key:?}")));
        }

        debug!(session = self.config.effective_label(), key = ?key, "load");
        state.update_tracker(&mut self.tracker);
        state.update_identity(&mut self.identity);
        Ok(self)
    }

    /// Mark a tracked object as a candidate for update.
    ///
    /// Whether a write is forwarded is decided at commit, by comparing the
    /// object's dump then against the last stored dump.
    pub fn update(&mut self, object: M::Object) -> SessionResult<&mut Self> {
        let key = self.mapper.dump_key(&object)?;
        let next = self.tracked(&key)?.update(object)?;

        debug!(session = self.config.effective_label(), key = ?key, state = %next.kind(), "update");
        next.update_tracker(&mut self.tracker);
        self.committed = false;
        Ok(self)
    }

    /// Schedule a tracked object for deletion.
    pub fn delete(&mut self, object: &M::Object) -> SessionResult<&mut Self> {
        let key = self.mapper.dump_key(object)?;
        let next = self.tracked(&key)?.delete()?;

        debug!(session = self.config.effective_label(), key = ?key, "delete");
        next.update_tracker(&mut self.tracker);
        self.committed = false;
        Ok(self)
    }

    /// Stop tracking a clean object without writing anything.
    pub fn forget(&mut self, object: &M::Object) -> SessionResult<&mut Self> {
        let key = self.mapper.dump_key(object)?;
        let next = self.tracked(&key)?.forget()?;

        debug!(session = self.config.effective_label(), key = ?key, "forget");
        next.update_tracker(&mut self.tracker);
        next.delete_identity(&mut self.identity);
        self.retire(key);
        Ok(self)
    }

    /// Persist every tracked state in registration order.
    ///
    /// Stops at the first error and returns it unchanged; the session then
    /// stays uncommitted and the remaining states stay pending.
    pub fn commit(&mut self) -> SessionResult<&mut Self> {
        let label = self.config.effective_label().to_string();
        let keys: Vec<M::Key> = self.tracker.keys().cloned().collect();
        let mut summary = CommitSummary::default();

        for key in keys {
            let Some(state) = self.tracker.get(&key) else {
                continue;
            };
            let persisted = match state.persist() {
                Ok(persisted) => persisted,
                Err(e) => {
                    warn!(
                        session = %label,
                        key = ?key,
                        state = %state.kind(),
                        error = %e,
                        "commit halted"
                    );
                    return Err(e);
                }
            };

            if persisted.effect != Effect::Unchanged {
                debug!(session = %label, key = ?key, effect = ?persisted.effect, "write forwarded");
            }
            summary.record(persisted.effect);

            let next = persisted.state;
            next.update_tracker(&mut self.tracker);
            next.update_identity(&mut self.identity);
            next.delete_identity(&mut self.identity);
            if next.kind() == StateKind::Forgotten {
                self.retire(key);
            }
        }

        info!(
            session = %label,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            "commit complete"
        );
        self.committed = true;
        self.last_commit = Some(summary);
        Ok(self)
    }

    /// Remember a key that left tracking, when re-insertion is disabled.
    fn retire(&mut self, key: M::Key) {
        if !self.config.allow_reinsert {
            self.retired.insert(key);
        }
    }

    fn tracked(&self, key: &M::Key) -> SessionResult<&ObjectState<M>> {
        if !self.identity.contains(key) {
            return Err(SessionError::NotTracked(format!("{key:?}")));
        }
        self.tracker
            .get(key)
            .ok_or_else(|| SessionError::NotTracked(format!("{key:?}")))
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// `true` until an interaction happens after the last successful commit.
    pub fn committed(&self) -> bool {
        self.committed
    }

    pub fn uncommitted(&self) -> bool {
        !self.committed
    }

    /// The most recently supplied object tracked under `key`.
    ///
    /// Membership comes from the identity map; the object comes from the
    /// current state, which holds the latest value passed to `update`.
    pub fn get(&self, key: &M::Key) -> Option<&M::Object> {
        self.identity.lookup(key)?;
        self.tracker.get(key).map(ObjectState::object)
    }

    /// Whether an object with the same key as `object` is tracked.
    pub fn contains(&self, object: &M::Object) -> SessionResult<bool> {
        let key = self.mapper.dump_key(object)?;
        Ok(self.identity.contains(&key))
    }

    /// Lifecycle phase of the object tracked under `key`.
    pub fn state(&self, key: &M::Key) -> Option<StateKind> {
        self.tracker.get(key).map(ObjectState::kind)
    }

    /// Number of tracked states with a scheduled write.
    ///
    /// Updated states count even if their change was reverted; that is only
    /// known at commit.
    pub fn pending(&self) -> usize {
        self.tracker.each().filter(|s| s.is_pending()).count()
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Summary of the last successful commit.
    pub fn last_commit(&self) -> Option<&CommitSummary> {
        self.last_commit.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }

    pub fn tracker(&self) -> &Tracker<M> {
        &self.tracker
    }

    pub fn identity_map(&self) -> &IdentityMap<M::Key, M::Object> {
        &self.identity
    }
}

impl<M: Mapper> std::fmt::Debug for Session<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.config.effective_label())
            .field("tracked", &self.tracker.len())
            .field("pending", &self.pending())
            .field("committed", &self.committed)
            .finish()
    }
}
