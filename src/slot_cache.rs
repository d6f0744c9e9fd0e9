use std::collections::HashMap;

use assist_transport::SlotKey;

use crate::session::{Session, SessionStatus};

/// Completed sessions keyed by slot.
///
/// Only `Done` sessions are admitted, so a hit can always be redisplayed as a
/// finished result.
#[derive(Debug, Default)]
pub struct SlotCache {
    entries: HashMap<SlotKey, Session>,
}

impl SlotCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `session` under its slot, replacing any previous result.
    /// Returns false (and stores nothing) unless the session is `Done`.
    pub fn store(&mut self, session: Session) -> bool {
        if session.status() != SessionStatus::Done {
            return false;
        }

        self.entries.insert(session.slot().clone(), session);
        true
    }

    #[must_use]
    pub fn get(&self, slot: &SlotKey) -> Option<&Session> {
        self.entries.get(slot)
    }

    #[must_use]
    pub fn contains(&self, slot: &SlotKey) -> bool {
        self.entries.contains_key(slot)
    }

    pub fn remove(&mut self, slot: &SlotKey) -> Option<Session> {
        self.entries.remove(slot)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
