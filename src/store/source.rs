//! Emergency listing and change subscription.
//!
//! This module provides the [`AlertSource`] struct, the only producer of data for
//! the alert pipeline. It offers both transports of the store: a pull-based listing
//! of the unresolved emergencies and a push-style subscription to the change feed.

use std::{collections::HashMap, rc::Rc, time::Duration};

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::{task, task::JoinHandle, time};

use crate::store::{
    EMERGENCY_TABLE, SubscriptionError, TransportError,
    requester::Requester,
    response_structs::{ChangeRow, DeletedRow, EmergencyRow, ProfileRow},
    structs::{ChangeEvent, ChangeKind, Emergency, SubjectProfile},
};

/// First delay before resubscribing after a feed failure, in seconds
const FEED_RETRY_BASE_SECS: u64 = 1;
/// Upper bound of the resubscription delay, in seconds
const FEED_RETRY_MAX_SECS: u64 = 30;

/// Produces emergencies from the store.
///
/// The requester is shared behind an [`Rc`] so that the subscription task, which
/// runs on the local task set, can keep using it after this source is moved.
///
/// # Examples
///
/// ```no_run
/// use schoolwatch::store::{AlertSource, StoreRequester};
/// use std::rc::Rc;
///
/// let source = AlertSource::new(Rc::new(StoreRequester::new("https://project.example.co", "anon-key", 25)));
/// let subscription = source.subscribe(|event| println!("{:?}", event));
/// // later
/// subscription.dispose();
/// ```
pub struct AlertSource<R: Requester> {
    requester: Rc<R>,
}

impl<R: Requester> Clone for AlertSource<R> {
    fn clone(&self) -> Self {
        AlertSource {
            requester: Rc::clone(&self.requester),
        }
    }
}

impl<R: Requester + 'static> AlertSource<R> {
    /// Create a new [AlertSource].
    ///
    /// # Arguments
    ///
    /// * `requester` - An implementation of the [Requester] trait to interact with the store.
    pub fn new(requester: Rc<R>) -> Self {
        AlertSource { requester }
    }

    /// Fetches all unresolved emergencies, most recent first.
    ///
    /// The profile of each distinct student is requested in parallel. A failed
    /// profile lookup is logged and leaves the profile empty, it never fails the
    /// listing.
    ///
    /// # Returns
    ///
    /// The active emergencies, or the [`TransportError`] of the listing request.
    /// Callers must treat an error as "no change", never as "zero emergencies".
    pub async fn list_active(&self) -> Result<Vec<Emergency>, TransportError> {
        debug!("request active emergencies");
        let rows = self.requester.list_active_emergencies().await?;
        for row in &rows {
            debug!("listed emergency {}", row);
        }

        let mut subject_refs: Vec<&str> = rows.iter().map(|row| row.subject_ref.as_str()).collect();
        subject_refs.sort_unstable();
        subject_refs.dedup();

        let profiles = join_all(
            subject_refs
                .iter()
                .map(|subject_ref| fetch_profile(self.requester.as_ref(), subject_ref)),
        )
        .await;
        let profiles: HashMap<&str, Option<SubjectProfile>> =
            subject_refs.into_iter().zip(profiles).collect();

        let mut emergencies: Vec<Emergency> = rows
            .iter()
            .map(|row| {
                let profile = profiles.get(row.subject_ref.as_str()).cloned().flatten();
                to_emergency(row.clone(), profile)
            })
            .collect();
        emergencies.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));

        debug!("{} active emergencies", emergencies.len());
        Ok(emergencies)
    }

    /// Marks an emergency as resolved in the store.
    ///
    /// # Arguments
    ///
    /// * `emergency_id` - Identifier of the emergency to resolve.
    pub async fn set_resolved(&self, emergency_id: &str) -> Result<(), TransportError> {
        self.requester.set_resolved(emergency_id).await
    }

    /// Subscribes to the changes of the emergency collection.
    ///
    /// A local task long-polls the change feed and calls `on_event` for every
    /// change, in arrival order. Inserted and updated rows get their student
    /// profile joined on a best-effort basis. When the feed drops, the task
    /// starts over from the current position after an exponential backoff
    /// bounded to [`FEED_RETRY_MAX_SECS`].
    ///
    /// Must be called from within a [`tokio::task::LocalSet`].
    ///
    /// # Arguments
    ///
    /// * `on_event` - Callback invoked with each [`ChangeEvent`].
    ///
    /// # Returns
    ///
    /// The [`Subscription`] releasing the feed when disposed or dropped.
    pub fn subscribe<F>(&self, on_event: F) -> Subscription
    where
        F: Fn(ChangeEvent) + 'static,
    {
        let requester = Rc::clone(&self.requester);

        let handle = task::spawn_local(async move {
            info!("subscribe to {} changes", EMERGENCY_TABLE);
            let mut cursor: Option<String> = None;
            let mut failures: u32 = 0;

            loop {
                match next_batch(requester.as_ref(), cursor.clone()).await {
                    Ok((next_cursor, events)) => {
                        failures = 0;
                        cursor = Some(next_cursor);
                        events.into_iter().for_each(&on_event);
                    }
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        let delay = retry_delay(failures);
                        warn!("{}, resubscribe in {}s", err, delay.as_secs());
                        cursor = None;
                        time::sleep(delay).await;
                    }
                }
            }
        });

        Subscription {
            handle: Some(handle),
        }
    }
}

/// Handle on a running change subscription.
///
/// Dropping the handle releases the subscription as well, so a subscription never
/// outlives its owner.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Releases the subscription.
    pub fn dispose(mut self) {
        self.release();
    }

    /// Whether the feed task is still running.
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!("unsubscribe from {} changes", EMERGENCY_TABLE);
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Waits for the next change batch and converts it into events.
///
/// Malformed changes are logged and skipped so that one bad row does not stall
/// the feed.
async fn next_batch<R: Requester>(
    requester: &R,
    cursor: Option<String>,
) -> Result<(String, Vec<ChangeEvent>), SubscriptionError> {
    let batch = requester.poll_changes(EMERGENCY_TABLE, cursor).await?;

    let mut events = Vec::with_capacity(batch.changes.len());
    for change in batch.changes {
        match to_change_event(change) {
            Ok(event) => {
                debug!("received {:?} for emergency {}", event.kind(), event.id());
                events.push(with_profile(requester, event).await);
            }
            Err(err) => warn!("{}", err),
        }
    }

    Ok((batch.cursor, events))
}

/// Joins the student profile into inserted and updated emergencies.
async fn with_profile<R: Requester>(requester: &R, event: ChangeEvent) -> ChangeEvent {
    match event {
        ChangeEvent::Insert(mut emergency) => {
            emergency.profile = fetch_profile(requester, &emergency.subject_ref).await;
            ChangeEvent::Insert(emergency)
        }
        ChangeEvent::Update(mut emergency) => {
            emergency.profile = fetch_profile(requester, &emergency.subject_ref).await;
            ChangeEvent::Update(emergency)
        }
        delete => delete,
    }
}

/// Best-effort profile lookup.
async fn fetch_profile<R: Requester>(requester: &R, subject_ref: &str) -> Option<SubjectProfile> {
    match requester.get_subject_profile(subject_ref).await {
        Ok(Some(row)) => Some(SubjectProfile::from(row)),
        Ok(None) => {
            debug!("no profile for student {}", subject_ref);
            None
        }
        Err(err) => {
            warn!("error while requesting profile of student {}: {}", subject_ref, err);
            None
        }
    }
}

/// Converts a raw change row into a [`ChangeEvent`].
///
/// # Returns
///
/// [`SubscriptionError::Malformed`] when the side of the row matching the change
/// kind is missing or does not describe an emergency.
fn to_change_event(change: ChangeRow) -> Result<ChangeEvent, SubscriptionError> {
    match change.kind {
        ChangeKind::Insert | ChangeKind::Update => {
            let value = change.new.ok_or_else(|| {
                SubscriptionError::Malformed(format!("{:?} without new row", change.kind))
            })?;
            let row: EmergencyRow = serde_json::from_value(value)
                .map_err(|err| SubscriptionError::Malformed(err.to_string()))?;
            let emergency = to_emergency(row, None);

            Ok(if change.kind == ChangeKind::Insert {
                ChangeEvent::Insert(emergency)
            } else {
                ChangeEvent::Update(emergency)
            })
        }
        ChangeKind::Delete => {
            let value = change.old.ok_or_else(|| {
                SubscriptionError::Malformed("DELETE without old row".to_string())
            })?;
            let row: DeletedRow = serde_json::from_value(value)
                .map_err(|err| SubscriptionError::Malformed(err.to_string()))?;

            Ok(ChangeEvent::Delete { id: row.id })
        }
    }
}

fn to_emergency(row: EmergencyRow, profile: Option<SubjectProfile>) -> Emergency {
    Emergency {
        id: row.id,
        subject_ref: row.subject_ref,
        location: row.location.unwrap_or_default(),
        reported_at: row.reported_at,
        resolved: row.resolved,
        profile,
    }
}

impl From<ProfileRow> for SubjectProfile {
    fn from(row: ProfileRow) -> Self {
        SubjectProfile {
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            subject_id_display: row.subject_id_display,
            avatar_ref: row.avatar_ref,
        }
    }
}

/// Exponential backoff: 1s, 2s, 4s... capped.
fn retry_delay(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    let secs = FEED_RETRY_BASE_SECS
        .saturating_mul(1 << exponent)
        .min(FEED_RETRY_MAX_SECS);
    Duration::from_secs(secs)
}
