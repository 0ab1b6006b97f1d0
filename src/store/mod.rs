//! Hosted store integration and API client.
//!
//! This module provides integration with the hosted backend holding the school's
//! records. It handles REST communication, the long-poll change feed for the
//! emergency collection, and the conversion of raw rows into domain structures.
//!
//! # Modules
//!
//! - `requester` - HTTP client for the store's REST and change-feed endpoints
//! - `response_structs` - Raw rows as the store serializes them
//! - `structs` - Emergencies and profiles handed to the alert pipeline
//! - `source` - Listing and subscription logic feeding the alert pipeline
//! - `records` - Read path of the student and documentation collections
//!
//! # Examples
//!
//! ```no_run
//! use schoolwatch::store::{AlertSource, StoreRequester};
//! use std::rc::Rc;
//!
//! let requester = Rc::new(StoreRequester::new("https://project.example.co", "anon-key", 25));
//! let source = AlertSource::new(requester);
//! let emergencies = source.list_active().await?;
//! ```

mod records;
mod requester;
mod response_structs;
mod source;
mod structs;

pub use crate::store::records::load_statistics;
#[cfg(test)]
pub use crate::store::requester::MockRequester;
pub use crate::store::requester::{Requester, StoreRequester};
#[cfg(test)]
pub use crate::store::response_structs::{ChangeBatch, ChangeRow, EmergencyRow, ProfileRow};
pub use crate::store::source::{AlertSource, Subscription};
pub use crate::store::structs::{ChangeEvent, Emergency};
#[cfg(test)]
pub use crate::store::structs::{ChangeKind, SubjectProfile};

/// Collection holding the reported emergencies.
pub const EMERGENCY_TABLE: &str = "emergencies";
/// Collection holding the registered students.
pub const STUDENT_TABLE: &str = "students";
/// Collection holding the incident documentation entries.
pub const DOCUMENTATION_TABLE: &str = "documentation";

/// Errors raised when talking to the store.
///
/// A transport failure never means "no data": callers keep their previous state
/// and retry later.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or its answer could not be decoded.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-2xx status.
    #[error("store rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Errors raised by the change feed.
///
/// Both variants are recovered by the subscription loop itself.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The feed request failed, the subscription starts over from the current position.
    #[error("change feed dropped: {0}")]
    Dropped(#[from] TransportError),
    /// A change notification could not be understood and was skipped.
    #[error("malformed change event: {0}")]
    Malformed(String),
}
