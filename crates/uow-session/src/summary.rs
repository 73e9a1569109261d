use serde::{Deserialize, Serialize};

/// What persisting one object state did at the mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Created,
    Updated,
    Deleted,
    /// Nothing was forwarded.
    Unchanged,
}

/// Counts of the writes a single commit forwarded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl CommitSummary {
    /// Count one persisted state.
    pub fn record(&mut self, effect: Effect) {
        match effect {
            Effect::Created => self.created += 1,
            Effect::Updated => self.updated += 1,
            Effect::Deleted => self.deleted += 1,
            Effect::Unchanged => self.unchanged += 1,
        }
    }

    /// Number of writes forwarded to the mapper.
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Number of states visited.
    pub fn visited(&self) -> usize {
        self.writes() + self.unchanged
    }

    /// Returns `true` if the commit forwarded nothing.
    pub fn is_noop(&self) -> bool {
        self.writes() == 0
    }
}
