//! Record of the writes a mapper has received.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single write forwarded to a mapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MapperOp {
    /// A row was created from this dump.
    Insert { dump: Value },
    /// The row at `key` was replaced; `previous` is the dump it replaced.
    Update {
        key: String,
        dump: Value,
        previous: Value,
    },
    /// The row at `key` was removed.
    Delete { key: String },
}

/// Append-only, ordered log of [`MapperOp`]s.
///
/// Interior mutability lets mapper methods taking `&self` record writes.
#[derive(Default)]
pub struct Journal {
    ops: RwLock<Vec<MapperOp>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn record(&self, op: MapperOp) {
        self.ops.write().expect("lock poisoned").push(op);
    }

    /// All recorded operations, oldest first.
    pub fn entries(&self) -> Vec<MapperOp> {
        self.ops.read().expect("lock poisoned").clone()
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.read().expect("lock poisoned").is_empty()
    }

    /// Forget every recorded operation.
    pub fn clear(&self) {
        self.ops.write().expect("lock poisoned").clear();
    }

    /// Dumps passed to `create`, in call order.
    pub fn inserts(&self) -> Vec<Value> {
        self.ops
            .read()
            .expect("lock poisoned")
            .iter()
            .filter_map(|op| match op {
                MapperOp::Insert { dump } => Some(dump.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(key, dump, previous)` triples passed to `update`, in call order.
    pub fn updates(&self) -> Vec<(String, Value, Value)> {
        self.ops
            .read()
            .expect("lock poisoned")
            .iter()
            .filter_map(|op| match op {
                MapperOp::Update {
                    key,
                    dump,
                    previous,
                } => Some((key.clone(), dump.clone(), previous.clone())),
                _ => None,
            })
            .collect()
    }

    /// Keys passed to `delete`, in call order.
    pub fn deletes(&self) -> Vec<String> {
        self.ops
            .read()
            .expect("lock poisoned")
            .iter()
            .filter_map(|op| match op {
                MapperOp::Delete { key } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("op_count", &self.len())
            .finish()
    }
}
