use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{MapperError, MapperResult};
use crate::journal::{Journal, MapperOp};
use crate::traits::Mapper;

/// In-memory mapper that dumps objects to JSON.
///
/// Any `Serialize` type can be mapped. The dump is the object's
/// `serde_json::Value`; the key is read from a configured top-level field of
/// that value. Rows live in a `HashMap` behind a `RwLock`, and every write is
/// appended to a [`Journal`] so callers can observe exactly what a session
/// forwarded.
pub struct InMemoryMapper<O> {
    key_field: String,
    rows: RwLock<HashMap<String, Value>>,
    journal: Journal,
    _object: PhantomData<fn(&O)>,
}

impl<O> InMemoryMapper<O> {
    /// Create an empty mapper keyed by `key_field`.
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            rows: RwLock::new(HashMap::new()),
            journal: Journal::new(),
            _object: PhantomData,
        }
    }

    /// Name of the dump field the key is read from.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// The journal of writes received so far.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The stored row for `key`, if any.
    pub fn row(&self, key: &str) -> Option<Value> {
        self.rows.read().expect("lock poisoned").get(key).cloned()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.read().expect("lock poisoned").is_empty()
    }

    /// Write a row directly, bypassing the journal.
    ///
    /// Models another writer touching storage outside the session.
    pub fn put_row(&self, dump: Value) -> MapperResult<String> {
        let key = self.key_of(&dump)?;
        self.rows
            .write()
            .expect("lock poisoned")
            .insert(key.clone(), dump);
        Ok(key)
    }

    /// Extract the key string from a dump.
    ///
    /// String keys are used verbatim; numbers and booleans use their JSON
    /// text. Null, missing, and structured values are rejected.
    pub fn key_of(&self, dump: &Value) -> MapperResult<String> {
        match dump.get(&self.key_field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            _ => Err(MapperError::MissingKey(self.key_field.clone())),
        }
    }
}

impl<O: Serialize + Clone> InMemoryMapper<O> {
    /// Store an object's dump directly, as if it had been written earlier.
    ///
    /// Used to prepare rows that a session will later load.
    pub fn seed(&self, object: &O) -> MapperResult<String> {
        let dump = self.dump(object)?;
        self.put_row(dump)
    }
}

impl<O: Serialize + Clone> Mapper for InMemoryMapper<O> {
    type Object = O;
    type Key = String;
    type Dump = Value;

    fn dump_key(&self, object: &O) -> MapperResult<String> {
        self.key_of(&self.dump(object)?)
    }

    fn dump(&self, object: &O) -> MapperResult<Value> {
        serde_json::to_value(object).map_err(|e| MapperError::Serialization(e.to_string()))
    }

    fn create(&self, dump: &Value) -> MapperResult<Value> {
        let key = self.key_of(dump)?;
        let mut rows = self.rows.write().expect("lock poisoned");
        if rows.contains_key(&key) {
            return Err(MapperError::DuplicateKey(key));
        }
        rows.insert(key.clone(), dump.clone());
        drop(rows);

        debug!(key = %key, "row created");
        self.journal.record(MapperOp::Insert { dump: dump.clone() });
        Ok(dump.clone())
    }

    fn update(&self, key: &String, dump: &Value, previous: &Value) -> MapperResult<()> {
        let mut rows = self.rows.write().expect("lock poisoned");
        let row = rows
            .get_mut(key)
            .ok_or_else(|| MapperError::NotFound(key.clone()))?;
        if *row != *previous {
            return Err(MapperError::Conflict(key.clone()));
        }
        *row = dump.clone();
        drop(rows);

        debug!(key = %key, "row updated");
        self.journal.record(MapperOp::Update {
            key: key.clone(),
            dump: dump.clone(),
            previous: previous.clone(),
        });
        Ok(())
    }

    fn delete(&self, key: &String) -> MapperResult<()> {
        let removed = self.rows.write().expect("lock poisoned").remove(key);
        if removed.is_none() {
            return Err(MapperError::NotFound(key.clone()));
        }

        debug!(key = %key, "row deleted");
        self.journal.record(MapperOp::Delete { key: key.clone() });
        Ok(())
    }
}

impl<O> std::fmt::Debug for InMemoryMapper<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMapper")
            .field("key_field", &self.key_field)
            .field("row_count", &self.len())
            .field("journal", &self.journal)
            .finish()
    }
}
