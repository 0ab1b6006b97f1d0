//! Alert pipeline orchestration.
//!
//! This module provides the [`AlertDispatcher`] which reconciles the polled and
//! pushed emergencies into the [`AlertSnapshot`], drives the alarm sound and the
//! desktop notifications, and broadcasts every new snapshot to the widgets.
//!
//! # Concurrency
//!
//! Everything runs on one thread inside a [`tokio::task::LocalSet`]. Two
//! independent producers feed the same reducer:
//! - a polling task, ticking every `polling_interval` and owning one refresh task
//!   per tick so that a hanging request never delays the next tick
//! - a change subscription applying pushed events in arrival order
//!
//! Both hold a weak reference to the dispatcher and are torn down on navigation
//! to a suppressing screen, on [`AlertDispatcher::shutdown`] and on drop. Every
//! mount gets a new generation; results carrying an older one are dropped, so a
//! listing that arrives after teardown never reaches the snapshot.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{
    sync::watch,
    task::{self, JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};

use crate::{
    alerts::{
        notifier::Notifier,
        screen::Screen,
        sound::SoundController,
        state::{AlertEvent, AlertSnapshot},
    },
    store::{AlertSource, Emergency, Requester, Subscription, TransportError},
};

/// Refreshes allowed to wait on the store at the same time.
///
/// Ticks are skipped while this many are pending.
const MAX_PENDING_REFRESHES: usize = 3;

/// Timing and transport settings of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Delay between two refreshes
    pub polling_interval: Duration,
    /// Whether to subscribe to the change feed in addition to polling
    pub push: bool,
}

/// Tasks running while a non-suppressing screen is shown.
#[derive(Default)]
struct Mounted {
    polling: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

/// Single owner of the alert state, the alarm sound and the notifications.
///
/// One dispatcher exists per process, shared behind an [`Rc`]. Widgets only read
/// its snapshots through [`AlertDispatcher::watch`]; every mutation goes through
/// the dispatcher.
///
/// # Examples
///
/// ```no_run
/// use schoolwatch::alerts::{AlertDispatcher, BellPlayback, DesktopNotifier, DispatchSettings, Screen, SoundController};
/// use schoolwatch::store::{AlertSource, StoreRequester};
/// use std::{rc::Rc, time::Duration};
///
/// let source = AlertSource::new(Rc::new(StoreRequester::new("https://project.example.co", "anon-key", 25)));
/// let dispatcher = AlertDispatcher::new(
///     source,
///     SoundController::new(BellPlayback::default()),
///     DesktopNotifier::probe(true).await,
///     DispatchSettings { polling_interval: Duration::from_secs(10), push: true },
/// );
/// dispatcher.navigate(Screen::Dashboard);
/// ```
pub struct AlertDispatcher<R: Requester + 'static> {
    source: AlertSource<R>,
    sound: SoundController,
    notifier: Box<dyn Notifier>,
    settings: DispatchSettings,
    snapshot_tx: watch::Sender<AlertSnapshot>,
    screen_tx: watch::Sender<Screen>,
    mounted: RefCell<Mounted>,
    /// Bumped on every unmount
    generation: Cell<u64>,
    /// Handed to the spawned tasks so they never keep the dispatcher alive
    weak_self: Weak<AlertDispatcher<R>>,
}

impl<R: Requester + 'static> AlertDispatcher<R> {
    /// Create a new [AlertDispatcher] on the login screen.
    ///
    /// Nothing runs until [`AlertDispatcher::navigate`] mounts a non-suppressing
    /// screen.
    ///
    /// # Arguments
    ///
    /// * `source` - Producer of emergencies.
    /// * `sound` - The process-wide alarm sound.
    /// * `notifier` - Desktop notifications.
    /// * `settings` - Polling interval and push switch.
    pub fn new(
        source: AlertSource<R>,
        sound: SoundController,
        notifier: impl Notifier + 'static,
        settings: DispatchSettings,
    ) -> Rc<Self> {
        let (snapshot_tx, _) = watch::channel(AlertSnapshot::default());
        let (screen_tx, _) = watch::channel(Screen::Login);

        Rc::new_cyclic(|weak_self| AlertDispatcher {
            source,
            sound,
            notifier: Box::new(notifier),
            settings,
            snapshot_tx,
            screen_tx,
            mounted: RefCell::new(Mounted::default()),
            generation: Cell::new(0),
            weak_self: weak_self.clone(),
        })
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> AlertSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Returns a receiver of every new snapshot.
    pub fn watch(&self) -> watch::Receiver<AlertSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn screen(&self) -> Screen {
        self.screen_tx.borrow().clone()
    }

    /// Returns a receiver of every screen change.
    pub fn watch_screen(&self) -> watch::Receiver<Screen> {
        self.screen_tx.subscribe()
    }

    #[cfg(test)]
    pub fn sound(&self) -> &SoundController {
        &self.sound
    }

    #[cfg(test)]
    /// Whether the polling task is running.
    pub fn is_polling(&self) -> bool {
        self.mounted
            .borrow()
            .polling
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[cfg(test)]
    /// Whether the change subscription is running.
    pub fn is_subscribed(&self) -> bool {
        self.mounted
            .borrow()
            .subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Switches to another screen.
    ///
    /// The running tasks are torn down first. The login screen then forces the
    /// alarm and the sound off; the respond screen silences the alarm and keeps
    /// the snapshot. Any other screen mounts the polling task, which refreshes
    /// immediately, and the change subscription when push is enabled.
    ///
    /// Navigating to the current screen does nothing.
    pub fn navigate(&self, screen: Screen) {
        if *self.screen_tx.borrow() == screen {
            debug!("already on screen {}", screen);
            return;
        }

        info!("navigate to {}", screen);
        self.unmount();

        match screen {
            Screen::Login => {
                self.apply(AlertEvent::ExplicitStop);
                self.sound.stop();
            }
            Screen::Respond(_) => self.apply(AlertEvent::ExplicitStop),
            _ => {}
        }

        let suppressed = screen.suppresses_alarm();
        self.screen_tx.send_replace(screen);
        if !suppressed {
            self.mount();
        }
    }

    /// Fetches the active emergencies and applies them.
    ///
    /// # Returns
    ///
    /// The [`TransportError`] of the listing; the snapshot is left unchanged then.
    pub async fn refresh(&self) -> Result<(), TransportError> {
        let fetched = self.source.list_active().await?;
        self.apply(AlertEvent::Refresh(fetched));
        Ok(())
    }

    /// Applies an event to the snapshot.
    ///
    /// When the snapshot changes it is broadcast to every receiver. A rising alarm
    /// starts the sound and shows a notification, a falling one stops the sound.
    pub fn apply(&self, event: AlertEvent) {
        let previous = self.snapshot();
        let next = previous.reduce(event);
        if next == previous {
            return;
        }

        let was_active = previous.is_alarm_active();
        let now_active = next.is_alarm_active();
        let count = next.count();
        let latest = next.emergencies().first().map(|emergency| (*emergency).clone());

        self.snapshot_tx.send_replace(next);

        if !was_active && now_active {
            self.raise_alarm(count, latest.as_ref());
        } else if was_active && !now_active {
            info!("alarm cleared, {} active emergencies", count);
            self.sound.stop();
        }
    }

    /// Marks an emergency as resolved in the store, then removes it locally.
    ///
    /// # Returns
    ///
    /// The [`TransportError`] of the store update; nothing changes locally then, so
    /// the operator can retry.
    pub async fn acknowledge(&self, id: &str) -> Result<(), TransportError> {
        self.source.set_resolved(id).await?;
        info!("emergency {} acknowledged", id);

        match self.snapshot().get(id) {
            Some(emergency) => self.apply(AlertEvent::Update(emergency.clone().into_resolved())),
            None => debug!("acknowledged emergency {} was not displayed", id),
        }
        Ok(())
    }

    /// Opens the respond screen for an emergency, which silences the alarm.
    pub fn respond(&self, id: &str) {
        self.navigate(Screen::Respond(id.to_owned()));
    }

    /// Clears the local display without touching the store.
    pub fn dismiss_all_locally(&self) {
        info!("dismiss all emergencies locally");
        self.apply(AlertEvent::DismissAll);
    }

    /// Silences the alarm, the known emergencies stay displayed.
    pub fn explicit_stop(&self) {
        info!("alarm explicitly stopped");
        self.apply(AlertEvent::ExplicitStop);
    }

    /// Calls `callback` with every new snapshot until the listener is disposed.
    ///
    /// Must be called from within a [`tokio::task::LocalSet`].
    pub fn on_snapshot_change<F>(&self, callback: F) -> SnapshotListener
    where
        F: Fn(&AlertSnapshot) + 'static,
    {
        let mut receiver = self.watch();
        let handle = task::spawn_local(async move {
            while receiver.changed().await.is_ok() {
                let snapshot = receiver.borrow_and_update().clone();
                callback(&snapshot);
            }
        });

        SnapshotListener {
            handle: Some(handle),
        }
    }

    /// Stops every task and releases the alarm sound.
    pub fn shutdown(&self) {
        info!("shut down alert pipeline");
        self.unmount();
        self.sound.dispose();
    }

    fn raise_alarm(&self, count: usize, latest: Option<&Emergency>) {
        info!("alarm raised, {} active emergencies", count);

        if let Err(err) = self.sound.start() {
            warn!("error while starting alarm sound: {}", err);
        }

        if self.notifier.permission_granted() {
            let title = match count {
                1 => "1 active emergency".to_string(),
                _ => format!("{} active emergencies", count),
            };
            let body = match latest {
                Some(emergency) => format!(
                    "Latest: {} at {}",
                    emergency.subject_name(),
                    emergency.location
                ),
                None => String::new(),
            };
            self.notifier.notify(&title, &body);
        }
    }

    fn mount(&self) {
        let mut mounted = self.mounted.borrow_mut();
        info!(
            "mount alert pipeline, refresh every {}s",
            self.settings.polling_interval.as_secs()
        );

        let generation = self.generation.get();
        let source = self.source.clone();
        let weak_self = self.weak_self.clone();
        let period = self.settings.polling_interval;
        mounted.polling = Some(task::spawn_local(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // aborted with the polling task
            let mut refreshes = JoinSet::new();

            loop {
                interval.tick().await;
                while refreshes.try_join_next().is_some() {}
                if refreshes.len() >= MAX_PENDING_REFRESHES {
                    warn!("{} refreshes still pending, skip this tick", refreshes.len());
                    continue;
                }
                refreshes.spawn_local(refresh_task(
                    source.clone(),
                    weak_self.clone(),
                    generation,
                ));
            }
        }));

        if self.settings.push {
            let weak_self = self.weak_self.clone();
            mounted.subscription = Some(self.source.subscribe(move |event| {
                if let Some(dispatcher) = weak_self.upgrade()
                    && dispatcher.is_mounted(generation)
                {
                    dispatcher.apply(event.into());
                }
            }));
        }
    }

    fn unmount(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));

        let mut mounted = self.mounted.borrow_mut();
        if let Some(polling) = mounted.polling.take() {
            info!("unmount alert pipeline");
            polling.abort();
        }
        if let Some(subscription) = mounted.subscription.take() {
            subscription.dispose();
        }
    }

    /// Whether the tasks of `generation` are still the mounted ones.
    fn is_mounted(&self, generation: u64) -> bool {
        self.generation.get() == generation && !self.screen().suppresses_alarm()
    }
}

impl<R: Requester + 'static> Drop for AlertDispatcher<R> {
    fn drop(&mut self) {
        let mounted = self.mounted.get_mut();
        if let Some(polling) = mounted.polling.take() {
            polling.abort();
        }
        mounted.subscription.take();
        self.sound.dispose();
    }
}

/// One polling cycle.
///
/// The dispatcher is only upgraded once the listing arrived, so a hanging request
/// never keeps it alive. A listing arriving after its mount was torn down is
/// discarded.
async fn refresh_task<R: Requester + 'static>(
    source: AlertSource<R>,
    dispatcher: Weak<AlertDispatcher<R>>,
    generation: u64,
) {
    let result = source.list_active().await;
    let Some(dispatcher) = dispatcher.upgrade() else {
        return;
    };
    if !dispatcher.is_mounted(generation) {
        debug!("discard refresh of an unmounted pipeline");
        return;
    }

    match result {
        Ok(fetched) => dispatcher.apply(AlertEvent::Refresh(fetched)),
        Err(err) => warn!("error while refreshing emergencies, keep previous state: {}", err),
    }
}

/// Handle on a snapshot callback registered with
/// [`AlertDispatcher::on_snapshot_change`].
///
/// Dropping the handle unregisters the callback as well.
#[derive(Debug)]
pub struct SnapshotListener {
    handle: Option<JoinHandle<()>>,
}

impl SnapshotListener {
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SnapshotListener {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{notifier::MockNotifier, sound::MockPlayback};
    use crate::store::{ChangeBatch, ChangeKind, ChangeRow, EmergencyRow, MockRequester, ProfileRow};
    use chrono::{TimeZone, Utc};
    use mockall::{Sequence, predicate::eq};
    use serde_json::json;
    use tokio::{sync::Notify, task::LocalSet};

    /// Store whose listings wait until the gate opens.
    struct GatedRequester {
        gate: Rc<Notify>,
        listing: Vec<EmergencyRow>,
        calls: Rc<Cell<usize>>,
    }

    impl Requester for GatedRequester {
        async fn list_active_emergencies(&self) -> Result<Vec<EmergencyRow>, TransportError> {
            self.calls.set(self.calls.get() + 1);
            self.gate.notified().await;
            Ok(self.listing.clone())
        }

        async fn get_subject_profile(
            &self,
            _subject_ref: &str,
        ) -> Result<Option<ProfileRow>, TransportError> {
            Ok(None)
        }

        async fn set_resolved(&self, _emergency_id: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn poll_changes(
            &self,
            _table: &str,
            _cursor: Option<String>,
        ) -> Result<ChangeBatch, TransportError> {
            std::future::pending().await
        }

        async fn list_records(
            &self,
            _collection: &str,
        ) -> Result<Vec<serde_json::Value>, TransportError> {
            Ok(vec![])
        }
    }

    fn create_gated_dispatcher(
        gate: &Rc<Notify>,
        calls: &Rc<Cell<usize>>,
        listing: Vec<EmergencyRow>,
    ) -> Rc<AlertDispatcher<GatedRequester>> {
        let requester = GatedRequester {
            gate: Rc::clone(gate),
            listing,
            calls: Rc::clone(calls),
        };
        AlertDispatcher::new(
            AlertSource::new(Rc::new(requester)),
            SoundController::new(playback(0, 0)),
            notifier(0),
            DispatchSettings {
                polling_interval: Duration::from_secs(10),
                push: false,
            },
        )
    }

    fn create_test_row(id: &str, minute: u32) -> EmergencyRow {
        EmergencyRow {
            id: id.to_string(),
            subject_ref: format!("s{}", id),
            location: Some("Gym".to_string()),
            reported_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
            resolved: false,
        }
    }

    fn rows(ids: &[&str]) -> Vec<EmergencyRow> {
        ids.iter()
            .enumerate()
            .map(|(minute, id)| create_test_row(id, minute as u32))
            .collect()
    }

    fn expect_listings(requester: &mut MockRequester, listings: Vec<Vec<EmergencyRow>>) {
        let mut seq = Sequence::new();
        for listing in listings {
            requester
                .expect_list_active_emergencies()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move || Ok(listing.clone()));
        }
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));
    }

    fn playback(starts: usize, halts: usize) -> MockPlayback {
        let mut playback = MockPlayback::new();
        playback.expect_start_loop().times(starts).returning(|| Ok(()));
        playback.expect_halt().times(halts).return_const(());
        playback.expect_release().times(1).return_const(());
        playback
    }

    fn notifier(notifications: usize) -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_permission_granted().return_const(true);
        notifier
            .expect_notify()
            .times(notifications)
            .return_const(());
        notifier
    }

    fn create_test_dispatcher(
        requester: MockRequester,
        playback: MockPlayback,
        notifier: MockNotifier,
        push: bool,
    ) -> Rc<AlertDispatcher<MockRequester>> {
        AlertDispatcher::new(
            AlertSource::new(Rc::new(requester)),
            SoundController::new(playback),
            notifier,
            DispatchSettings {
                polling_interval: Duration::from_secs(10),
                push,
            },
        )
    }

    #[tokio::test]
    async fn test_rising_edge_starts_sound_once() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a", "b"]), rows(&["b", "a"])]);

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        assert!(dispatcher.snapshot().is_alarm_active());
        assert!(dispatcher.sound().is_playing());

        let before = dispatcher.snapshot();
        dispatcher.refresh().await.unwrap();
        assert_eq!(dispatcher.snapshot(), before);
        assert!(dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_falling_edge_stops_sound() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a", "b"]), vec![]]);

        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        dispatcher.refresh().await.unwrap();

        let snapshot = dispatcher.snapshot();
        assert!(!snapshot.is_alarm_active());
        assert_eq!(snapshot.alerted_count(), 0);
        assert!(!dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_snapshot() {
        let mut requester = MockRequester::new();
        let mut seq = Sequence::new();
        requester
            .expect_list_active_emergencies()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(rows(&["a"])));
        requester
            .expect_list_active_emergencies()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Err(TransportError::Rejected {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            });
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        let before = dispatcher.snapshot();
        assert!(dispatcher.refresh().await.is_err());
        assert_eq!(dispatcher.snapshot(), before);
        assert_eq!(dispatcher.snapshot().count(), 1);
    }

    #[tokio::test]
    async fn test_push_insert_then_refresh_notifies_once() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["x"])]);

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier(1), false);

        let pushed = Emergency {
            id: "x".to_string(),
            subject_ref: "sx".to_string(),
            location: "Gym".to_string(),
            reported_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            resolved: false,
            profile: None,
        };
        dispatcher.apply(AlertEvent::Insert(pushed));
        dispatcher.refresh().await.unwrap();

        assert!(dispatcher.snapshot().is_alarm_active());
        assert!(dispatcher.snapshot().was_alerted("x"));
    }

    #[tokio::test]
    async fn test_acknowledge_last_emergency_stops_sound() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a"])]);
        requester
            .expect_set_resolved()
            .with(eq("a"))
            .times(1)
            .returning(|_| Ok(()));

        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        dispatcher.acknowledge("a").await.unwrap();

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.count(), 0);
        assert!(!snapshot.is_alarm_active());
        assert!(!dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_acknowledge_failure_leaves_state_unchanged() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a"])]);
        requester.expect_set_resolved().times(1).returning(|_| {
            Err(TransportError::Rejected {
                status: 500,
                message: "boom".to_string(),
            })
        });

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        let before = dispatcher.snapshot();
        assert!(dispatcher.acknowledge("a").await.is_err());
        assert_eq!(dispatcher.snapshot(), before);
        assert!(dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_explicit_stop_then_refreshes() {
        let mut requester = MockRequester::new();
        expect_listings(
            &mut requester,
            vec![rows(&["a", "b"]), rows(&["a", "b"]), rows(&["a", "b", "c"])],
        );

        let dispatcher = create_test_dispatcher(requester, playback(2, 1), notifier(2), false);

        dispatcher.refresh().await.unwrap();
        dispatcher.explicit_stop();
        assert!(!dispatcher.sound().is_playing());
        assert_eq!(dispatcher.snapshot().count(), 2);

        dispatcher.refresh().await.unwrap();
        assert!(!dispatcher.snapshot().is_alarm_active());

        dispatcher.refresh().await.unwrap();
        assert!(dispatcher.snapshot().is_alarm_active());
        assert!(dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_playback_failure_keeps_visual_alarm() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a"])]);

        let mut playback = MockPlayback::new();
        playback
            .expect_start_loop()
            .times(1)
            .returning(|| Err(crate::alerts::PlaybackError::EmptyCommand));
        playback.expect_release().times(1).return_const(());

        let dispatcher = create_test_dispatcher(requester, playback, notifier(1), false);

        dispatcher.refresh().await.unwrap();
        assert!(dispatcher.snapshot().is_alarm_active());
        assert!(!dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_notification_requires_permission() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a"])]);

        let mut notifier = MockNotifier::new();
        notifier.expect_permission_granted().return_const(false);
        notifier.expect_notify().never();

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier, false);
        dispatcher.refresh().await.unwrap();
        assert!(dispatcher.sound().is_playing());
    }

    #[tokio::test]
    async fn test_dismiss_all_locally() {
        let mut requester = MockRequester::new();
        expect_listings(&mut requester, vec![rows(&["a", "b"]), rows(&["a", "b"])]);

        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        dispatcher.refresh().await.unwrap();
        dispatcher.dismiss_all_locally();
        assert_eq!(dispatcher.snapshot().count(), 0);
        assert!(!dispatcher.sound().is_playing());

        dispatcher.refresh().await.unwrap();
        assert_eq!(dispatcher.snapshot().count(), 2);
        assert!(!dispatcher.sound().is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_until_login_screen() {
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .times(3)
            .returning(|| Ok(rows(&["a", "b"])));
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));

        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        LocalSet::new()
            .run_until(async move {
                dispatcher.navigate(Screen::Dashboard);
                assert!(dispatcher.is_polling());
                assert!(!dispatcher.is_subscribed());

                // ticks at 0s, 10s and 20s
                time::sleep(Duration::from_secs(25)).await;
                assert!(dispatcher.snapshot().is_alarm_active());
                assert!(dispatcher.sound().is_playing());

                dispatcher.navigate(Screen::Login);
                assert!(!dispatcher.is_polling());
                assert!(!dispatcher.snapshot().is_alarm_active());
                assert!(!dispatcher.sound().is_playing());
                assert_eq!(dispatcher.screen(), Screen::Login);

                // no more refreshes
                time::sleep(Duration::from_secs(60)).await;
                assert!(!dispatcher.snapshot().is_alarm_active());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_respond_screen_silences_and_keeps_snapshot() {
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .times(2)
            .returning(|| Ok(rows(&["a", "b"])));
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));

        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        LocalSet::new()
            .run_until(async move {
                dispatcher.navigate(Screen::Dashboard);
                time::sleep(Duration::from_secs(1)).await;
                assert!(dispatcher.sound().is_playing());

                dispatcher.respond("a");
                assert!(!dispatcher.is_polling());
                assert!(!dispatcher.sound().is_playing());
                assert_eq!(dispatcher.snapshot().count(), 2);
                assert_eq!(dispatcher.screen(), Screen::Respond("a".to_string()));

                // same count on return does not sound again
                dispatcher.navigate(Screen::Dashboard);
                time::sleep(Duration::from_secs(1)).await;
                assert!(!dispatcher.snapshot().is_alarm_active());
                assert!(!dispatcher.sound().is_playing());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_and_poll_converge_on_one_trigger() {
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .returning(|| Ok(rows(&["x"])));
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));
        requester
            .expect_poll_changes()
            .with(eq("emergencies"), eq(None::<String>))
            .times(1)
            .returning(|_, _| {
                Ok(ChangeBatch {
                    cursor: "c1".to_string(),
                    changes: vec![ChangeRow {
                        kind: ChangeKind::Insert,
                        new: Some(json!({"id": "x", "student_id": "sx", "location": "Gym", "created_at": "2024-03-01T10:00:00Z"})),
                        old: None,
                    }],
                })
            });
        requester.expect_poll_changes().returning(|_, _| {
            Err(TransportError::Rejected {
                status: 502,
                message: "bad gateway".to_string(),
            })
        });

        let dispatcher = create_test_dispatcher(requester, playback(1, 0), notifier(1), true);

        LocalSet::new()
            .run_until(async move {
                dispatcher.navigate(Screen::Dashboard);
                assert!(dispatcher.is_subscribed());

                time::sleep(Duration::from_secs(5)).await;
                let snapshot = dispatcher.snapshot();
                assert_eq!(snapshot.count(), 1);
                assert!(snapshot.is_alarm_active());
                assert!(snapshot.was_alerted("x"));

                dispatcher.shutdown();
                assert!(!dispatcher.is_polling());
                assert!(!dispatcher.is_subscribed());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_snapshot_change() {
        let requester = MockRequester::new();
        let dispatcher = create_test_dispatcher(requester, playback(1, 1), notifier(1), false);

        LocalSet::new()
            .run_until(async move {
                let counts = Rc::new(RefCell::new(Vec::new()));
                let seen = Rc::clone(&counts);
                let listener = dispatcher.on_snapshot_change(move |snapshot| {
                    seen.borrow_mut().push(snapshot.count());
                });

                dispatcher.apply(AlertEvent::Insert(Emergency {
                    id: "x".to_string(),
                    subject_ref: "sx".to_string(),
                    location: "Gym".to_string(),
                    reported_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                    resolved: false,
                    profile: None,
                }));
                time::sleep(Duration::from_millis(10)).await;

                dispatcher.apply(AlertEvent::Delete("x".to_string()));
                time::sleep(Duration::from_millis(10)).await;

                listener.dispose();
                dispatcher.explicit_stop();
                time::sleep(Duration::from_millis(10)).await;

                assert_eq!(*counts.borrow(), vec![1, 0]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_after_login_screen_is_discarded() {
        let gate = Rc::new(Notify::new());
        let calls = Rc::new(Cell::new(0));
        let dispatcher = create_gated_dispatcher(&gate, &calls, rows(&["a", "b"]));

        LocalSet::new()
            .run_until(async move {
                dispatcher.navigate(Screen::Dashboard);
                time::sleep(Duration::from_secs(1)).await;
                assert_eq!(calls.get(), 1);

                // the listing is answered while the operator logs out
                gate.notify_one();
                dispatcher.navigate(Screen::Login);
                time::sleep(Duration::from_secs(1)).await;

                let snapshot = dispatcher.snapshot();
                assert_eq!(dispatcher.screen(), Screen::Login);
                assert_eq!(snapshot.count(), 0);
                assert!(!snapshot.is_alarm_active());
                assert!(!dispatcher.sound().is_playing());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_store_bounds_pending_refreshes() {
        let gate = Rc::new(Notify::new());
        let calls = Rc::new(Cell::new(0));
        let dispatcher = create_gated_dispatcher(&gate, &calls, vec![]);

        LocalSet::new()
            .run_until(async move {
                dispatcher.navigate(Screen::Dashboard);

                // eleven ticks, none answered
                time::sleep(Duration::from_secs(105)).await;
                assert_eq!(calls.get(), MAX_PENDING_REFRESHES);
                assert!(dispatcher.is_polling());

                dispatcher.shutdown();
            })
            .await;
    }
}
