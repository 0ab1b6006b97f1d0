//! Alert snapshot and its transitions.
//!
//! This module provides the [`AlertSnapshot`], the working memory of the alert
//! pipeline, together with the pure transition functions applied to it. No I/O
//! happens here: every transition takes a snapshot and returns the next one, and
//! the [`AlertDispatcher`](crate::alerts::AlertDispatcher) decides what to do with
//! the difference.
//!
//! # Alarm policy
//!
//! The alarm is edge-triggered:
//! - a refresh raises it when the active count goes up from zero or grows
//! - a pushed insert raises it for an emergency that never triggered before
//! - it drops when the last active emergency goes away
//! - an explicit stop silences it without touching the known emergencies, until
//!   a later refresh reports more emergencies than before

use std::collections::{HashMap, HashSet};

use crate::store::{ChangeEvent, Emergency};

/// Working memory of the alert pipeline.
///
/// Owned by the dispatcher. Widgets receive read-only clones through a watch
/// channel and never mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSnapshot {
    /// Known unresolved emergencies, by id
    active: HashMap<String, Emergency>,
    /// Ids that already raised the alarm once
    alerted: HashSet<String>,
    alarm_active: bool,
    /// Active count recorded by the last transition
    previous_count: usize,
    /// Display cleared locally, until the next refresh
    dismissed: bool,
}

/// Input of [`AlertSnapshot::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    /// Result of a successful listing
    Refresh(Vec<Emergency>),
    /// Pushed insert
    Insert(Emergency),
    /// Pushed update, or a local acknowledge
    Update(Emergency),
    /// Pushed delete
    Delete(String),
    /// Operator silenced the alarm
    ExplicitStop,
    /// Operator cleared the local display
    DismissAll,
}

impl From<ChangeEvent> for AlertEvent {
    fn from(event: ChangeEvent) -> Self {
        match event {
            ChangeEvent::Insert(emergency) => AlertEvent::Insert(emergency),
            ChangeEvent::Update(emergency) => AlertEvent::Update(emergency),
            ChangeEvent::Delete { id } => AlertEvent::Delete(id),
        }
    }
}

impl AlertSnapshot {
    pub fn is_alarm_active(&self) -> bool {
        self.alarm_active
    }

    /// Number of known unresolved emergencies.
    pub fn count(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    pub fn previous_count(&self) -> usize {
        self.previous_count
    }

    pub fn get(&self, id: &str) -> Option<&Emergency> {
        self.active.get(id)
    }

    /// Whether `id` already raised the alarm once.
    #[cfg(test)]
    pub fn was_alerted(&self, id: &str) -> bool {
        self.alerted.contains(id)
    }

    #[cfg(test)]
    pub fn alerted_count(&self) -> usize {
        self.alerted.len()
    }

    /// Known unresolved emergencies, most recent first.
    ///
    /// Emergencies reported at the same instant are ordered by id so that the
    /// rendering is stable.
    pub fn emergencies(&self) -> Vec<&Emergency> {
        let mut emergencies: Vec<&Emergency> = self.active.values().collect();
        emergencies.sort_by(|a, b| {
            b.reported_at
                .cmp(&a.reported_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        emergencies
    }

    /// Applies an event and returns the resulting snapshot.
    pub fn reduce(&self, event: AlertEvent) -> AlertSnapshot {
        match event {
            AlertEvent::Refresh(fetched) => self.on_refresh(fetched),
            AlertEvent::Insert(emergency) => self.on_insert(emergency),
            AlertEvent::Update(emergency) => self.on_update(emergency),
            AlertEvent::Delete(id) => self.on_delete(&id),
            AlertEvent::ExplicitStop => self.on_explicit_stop(),
            AlertEvent::DismissAll => self.on_dismiss_all(),
        }
    }

    /// Replaces the known emergencies with a fresh listing.
    ///
    /// Resolved records in `fetched` are ignored. The alarm rises when the count
    /// goes up from zero or grows, and drops when the count falls to zero. Listed
    /// ids are recorded as alerted so that a late pushed insert for one of them
    /// does not trigger again.
    ///
    /// Applying the same listing twice yields the same snapshot.
    pub fn on_refresh(&self, fetched: Vec<Emergency>) -> AlertSnapshot {
        let mut next = self.clone();
        next.active = fetched
            .into_iter()
            .filter(|emergency| !emergency.resolved)
            .map(|emergency| (emergency.id.clone(), emergency))
            .collect();

        let count = next.active.len();
        let previous = self.previous_count;

        if count > 0 && (previous == 0 || count > previous) {
            next.alarm_active = true;
        } else if count == 0 {
            next.alarm_active = false;
            if previous > 0 {
                next.alerted.clear();
            }
        }

        next.alerted.extend(next.active.keys().cloned());
        next.previous_count = count;
        next.dismissed = false;
        next
    }

    /// Adds a pushed emergency.
    ///
    /// Resolved records are ignored. The alarm rises only for an id that never
    /// triggered before.
    pub fn on_insert(&self, emergency: Emergency) -> AlertSnapshot {
        if emergency.resolved {
            return self.clone();
        }

        let mut next = self.clone();
        if next.alerted.insert(emergency.id.clone()) {
            next.alarm_active = true;
        }
        next.active.insert(emergency.id.clone(), emergency);
        next.settle_count();
        next
    }

    /// Applies a pushed update.
    ///
    /// A resolved record leaves the known set; when none is left the alarm drops
    /// and the alerted ids are forgotten. An unresolved record is upserted without
    /// touching the alarm.
    pub fn on_update(&self, emergency: Emergency) -> AlertSnapshot {
        let mut next = self.clone();

        if emergency.resolved {
            next.active.remove(&emergency.id);
            if next.active.is_empty() {
                next.alarm_active = false;
                if !next.dismissed {
                    next.alerted.clear();
                }
            }
        } else {
            next.active.insert(emergency.id.clone(), emergency);
        }

        next.settle_count();
        next
    }

    /// Removes a deleted emergency, dropping the alarm when none is left.
    pub fn on_delete(&self, id: &str) -> AlertSnapshot {
        let mut next = self.clone();
        next.active.remove(id);
        if next.active.is_empty() {
            next.alarm_active = false;
        }
        next.settle_count();
        next
    }

    /// Silences the alarm, the known emergencies stay.
    pub fn on_explicit_stop(&self) -> AlertSnapshot {
        let mut next = self.clone();
        next.alarm_active = false;
        next
    }

    /// Clears the local display without touching the store.
    ///
    /// The previous count and the alerted ids survive, so the next refresh with
    /// the same data repopulates the display silently.
    pub fn on_dismiss_all(&self) -> AlertSnapshot {
        let mut next = self.clone();
        next.active.clear();
        next.alarm_active = false;
        next.dismissed = true;
        next
    }

    /// Records the active count after a pushed change.
    ///
    /// While the display is dismissed the mapping only holds what was pushed since,
    /// so the count recorded before the dismiss is kept as a floor.
    fn settle_count(&mut self) {
        self.previous_count = if self.dismissed {
            self.previous_count.max(self.active.len())
        } else {
            self.active.len()
        };
    }
}
