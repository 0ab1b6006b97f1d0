//! Response structures for the hosted store's HTTP API.
//!
//! This module contains structures for deserializing JSON answers from the
//! store's REST and change-feed endpoints. Column names follow the store schema
//! (`student_id`, `created_at`, ...) and are renamed to the domain vocabulary here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::store::structs::ChangeKind;

/// Row of the `emergencies` collection.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EmergencyRow {
    /// Server-assigned identifier, numeric or textual depending on the schema.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Student the emergency was raised for.
    #[serde(rename = "student_id", deserialize_with = "deserialize_id")]
    pub subject_ref: String,
    /// Free-text location, may be null when the reporter left it empty.
    #[serde(default)]
    pub location: Option<String>,
    /// Report timestamp.
    #[serde(rename = "created_at")]
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

impl fmt::Display for EmergencyRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id={}, student_id={}, created_at={}, resolved={}",
            self.id, self.subject_ref, self.reported_at, self.resolved
        )
    }
}

/// Profile columns selected from the `students` collection.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileRow {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    /// Student number printed on school documents.
    #[serde(rename = "student_id", deserialize_with = "deserialize_id")]
    pub subject_id_display: String,
    #[serde(rename = "avatar_url", default)]
    pub avatar_ref: Option<String>,
}

/// Answer of `/realtime/v1/changes`.
///
/// The `cursor` must be sent back on the next request to receive the changes
/// that happened after this batch.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub cursor: String,
    #[serde(default)]
    pub changes: Vec<ChangeRow>,
}

/// One change notification, shaped like the store's replication payload.
///
/// `new` holds the row after an insert or update, `old` holds at least the
/// identifier of a deleted row. Both are kept as raw JSON because the store sends
/// an empty object for the side that does not apply.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChangeRow {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub new: Option<serde_json::Value>,
    #[serde(default)]
    pub old: Option<serde_json::Value>,
}

/// Identifier part of a deleted row.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DeletedRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Accepts identifiers sent either as JSON strings or as integers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
