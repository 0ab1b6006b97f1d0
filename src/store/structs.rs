//! Domain structures for emergencies and the students they concern.
//!
//! These are the internal representations handed to the alert pipeline. They are
//! built from the raw rows in [`response_structs`](crate::store::response_structs)
//! by the [`AlertSource`](crate::store::AlertSource).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A reported incident awaiting or having received a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emergency {
    /// Opaque identifier assigned by the store
    pub id: String,
    /// Reference to the student the emergency was raised for
    pub subject_ref: String,
    /// Free-text location given by the reporter
    pub location: String,
    /// When the emergency was reported
    pub reported_at: DateTime<Utc>,
    /// Whether a responder marked the emergency as handled
    pub resolved: bool,
    /// Student profile joined at read time
    ///
    /// `None` when the lookup failed or the student no longer exists.
    pub profile: Option<SubjectProfile>,
}

impl Emergency {
    /// Name to display for the student, falling back to the raw reference.
    pub fn subject_name(&self) -> String {
        match &self.profile {
            Some(profile) => profile.full_name(),
            None => format!("student #{}", self.subject_ref),
        }
    }

    /// Returns a copy of this emergency flagged as resolved.
    pub fn into_resolved(mut self) -> Self {
        self.resolved = true;
        self
    }
}

impl fmt::Display for Emergency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id={}, subject_ref={}, location={}, reported_at={}, resolved={}",
            self.id, self.subject_ref, self.location, self.reported_at, self.resolved
        )
    }
}

/// Denormalized student profile attached to an [`Emergency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProfile {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// School-issued student number, as shown to staff
    pub subject_id_display: String,
    /// Reference to the student's picture in object storage
    pub avatar_ref: Option<String>,
}

impl SubjectProfile {
    /// Joins the name parts, skipping an empty middle name.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
    }
}

/// Kind of change reported by the store's change feed.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change to the emergency collection delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A new emergency was reported
    Insert(Emergency),
    /// An existing emergency was modified
    Update(Emergency),
    /// An emergency was removed by an administrator
    Delete { id: String },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert(_) => ChangeKind::Insert,
            ChangeEvent::Update(_) => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Identifier of the emergency the change is about.
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Insert(emergency) | ChangeEvent::Update(emergency) => &emergency.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}
