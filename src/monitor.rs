//! Operator console wiring the alert pipeline to the terminal.
//!
//! This module provides the [`Monitor`] which owns the [`AlertDispatcher`], mounts
//! the widgets and reads operator commands from standard input.
//!
//! # Architecture
//!
//! Everything runs on one thread inside a [`tokio::task::LocalSet`]:
//!
//! 1. **Polling Task**: mounted by the dispatcher on every non-suppressing screen,
//!    refreshes the active emergencies every `polling_interval` seconds
//! 2. **Change Feed Task**: mounted next to the polling task when push is enabled
//! 3. **Widget Tasks**: one per widget, printing its output when it changes
//! 4. **Console Loop**: reads commands from standard input until end of input or
//!    Ctrl-C
//!
//! # Command Processing Flow
//!
//! ```text
//! stdin line → Commander::parse → Commander::execute → print response → apply action
//! ```

use std::{path::Path, rc::Rc};

use log::{debug, error, info, warn};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    signal,
};

use crate::{
    alerts::{
        AlertDispatcher, BellPlayback, CommandPlayback, DesktopNotifier, DispatchSettings,
        Notifier, Screen, SoundController,
    },
    commands::{
        Action, CommandContext, CommandParseError, Commander, format_acknowledge_failed,
        format_acknowledged, format_statistics_failed,
    },
    config::Config,
    session::SessionStore,
    store::{AlertSource, Requester, StoreRequester, load_statistics},
    widgets::{Banner, Detail, MountedWidget, Panel, WidgetHost},
};

/// Hint printed while logged out.
const LOGIN_HINT: &str = "Log in with: !watch login <password>";

/// Operator console of the alert pipeline.
///
/// The monitor keeps the login flag, which gates the commands and decides whether
/// the pipeline is running: the login screen stops everything.
pub struct Monitor<R: Requester + 'static> {
    /// The alert pipeline
    dispatcher: Rc<AlertDispatcher<R>>,
    /// Store client, shared with the alert source for the statistics
    requester: Rc<R>,
    /// Command parser and executor
    commander: Commander,
    /// Persisted login flag
    session: SessionStore,
    logged_in: bool,
}

impl Monitor<StoreRequester> {
    /// Creates a new Monitor from the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `data_dir` - Directory of the persisted session
    ///
    /// # Errors
    ///
    /// Returns an error when the alarm player command is configured but empty.
    pub async fn new(config: Config, data_dir: &Path) -> Result<Self, anyhow::Error> {
        let requester = Rc::new(StoreRequester::new(
            &config.store.url,
            &config.store.api_key,
            config.store.feed_wait,
        ));

        let settings = DispatchSettings {
            polling_interval: config.polling_interval(),
            push: config.store.push,
        };

        let sound = match config.alarm.player {
            Some(command) if command.is_empty() => {
                anyhow::bail!("alarm.player must name a program");
            }
            Some(command) => {
                info!("alarm sound played with {}", command.join(" "));
                SoundController::new(CommandPlayback::new(command))
            }
            None => {
                info!("no alarm player configured, using the terminal bell");
                SoundController::new(BellPlayback::default())
            }
        };

        let notifier = DesktopNotifier::probe(config.alarm.notifications).await;

        Ok(Monitor::from_parts(
            requester,
            sound,
            notifier,
            settings,
            &config.auth.password,
            SessionStore::new(data_dir),
        ))
    }
}

impl<R: Requester + 'static> Monitor<R> {
    fn from_parts(
        requester: Rc<R>,
        sound: SoundController,
        notifier: impl Notifier + 'static,
        settings: DispatchSettings,
        password: &str,
        session: SessionStore,
    ) -> Self {
        let dispatcher = AlertDispatcher::new(
            AlertSource::new(Rc::clone(&requester)),
            sound,
            notifier,
            settings,
        );

        Monitor {
            dispatcher,
            requester,
            commander: Commander::new(password),
            session,
            logged_in: false,
        }
    }

    /// Runs the console until end of input or Ctrl-C.
    ///
    /// Must be called from within a [`tokio::task::LocalSet`]. The alert pipeline is
    /// shut down and the alarm sound released before returning.
    pub async fn start(mut self) {
        let _widgets = self.mount_widgets();
        let listener = self.dispatcher.on_snapshot_change(|snapshot| {
            debug!(
                "snapshot changed, {} active, alarm {}",
                snapshot.count(),
                if snapshot.is_alarm_active() { "on" } else { "off" }
            );
            for emergency in snapshot.emergencies() {
                debug!("active emergency {}", emergency);
            }
        });

        self.logged_in = self.session.load().await;
        if self.logged_in {
            self.dispatcher.navigate(Screen::Dashboard);
        } else {
            println!("{}", LOGIN_HINT);
        }

        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => {
                        info!("end of input, stopping");
                        break;
                    }
                    Err(e) => {
                        error!("failed to read standard input: {}", e);
                        break;
                    }
                },
                _ = signal::ctrl_c() => {
                    info!("interrupted, stopping");
                    break;
                }
            }
        }

        listener.dispose();
        self.dispatcher.shutdown();
    }

    fn mount_widgets(&self) -> Vec<MountedWidget> {
        let host = WidgetHost::new(
            self.dispatcher.watch(),
            self.dispatcher.watch_screen(),
            |name, output| println!("[{}] {}", name, output),
        );

        vec![host.mount(Banner), host.mount(Panel), host.mount(Detail)]
    }

    async fn handle_line(&mut self, line: &str) {
        let command = match self.commander.parse(line) {
            Ok(command) => command,
            Err(CommandParseError::NotForConsole) => {
                debug!("ignored input line");
                return;
            }
            Err(CommandParseError::InvalidCommand(message)) => {
                println!("{}", message);
                return;
            }
        };

        let context = CommandContext {
            snapshot: self.dispatcher.snapshot(),
            screen: self.dispatcher.screen(),
            logged_in: self.logged_in,
        };
        let result = self.commander.execute(&command, &context);
        println!("{}", result.response);

        if let Some(action) = result.action
            && let Some(outcome) = self.apply_action(action).await
        {
            println!("{}", outcome);
        }
    }

    /// Applies the action of a command.
    ///
    /// # Returns
    ///
    /// A follow-up message when the action completes asynchronously.
    async fn apply_action(&mut self, action: Action) -> Option<String> {
        match action {
            Action::Acknowledge(id) => match self.dispatcher.acknowledge(&id).await {
                Ok(()) => Some(format_acknowledged(&id)),
                Err(e) => {
                    error!("failed to resolve emergency {}: {}", id, e);
                    Some(format_acknowledge_failed(&id, &e.to_string()))
                }
            },
            Action::Respond(id) => {
                self.dispatcher.respond(&id);
                None
            }
            Action::DismissAll => {
                self.dispatcher.dismiss_all_locally();
                None
            }
            Action::ExplicitStop => {
                self.dispatcher.explicit_stop();
                None
            }
            Action::Navigate(screen) => {
                self.dispatcher.navigate(screen);
                None
            }
            Action::LogIn => {
                self.logged_in = true;
                self.session.persist(true).await;
                self.dispatcher.navigate(Screen::Dashboard);
                None
            }
            Action::LogOut => {
                self.logged_in = false;
                self.session.persist(false).await;
                self.dispatcher.navigate(Screen::Login);
                Some(LOGIN_HINT.to_owned())
            }
            Action::ShowStatistics => {
                self.dispatcher.navigate(Screen::Statistics);
                let active = self.dispatcher.snapshot().count();
                match load_statistics(self.requester.as_ref(), active).await {
                    Ok(statistics) => Some(statistics.to_string()),
                    Err(e) => {
                        warn!("failed to load statistics: {}", e);
                        Some(format_statistics_failed(&e.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{MockNotifier, MockPlayback};
    use crate::config::{Alarm, Auth, Store};
    use crate::store::{EmergencyRow, MockRequester, TransportError};
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::task::LocalSet;

    fn create_test_row(id: &str) -> EmergencyRow {
        EmergencyRow {
            id: id.to_string(),
            subject_ref: format!("s{}", id),
            location: Some("Gym".to_string()),
            reported_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            resolved: false,
        }
    }

    fn create_test_monitor(requester: MockRequester, data_dir: &Path) -> Monitor<MockRequester> {
        let mut playback = MockPlayback::new();
        playback.expect_start_loop().returning(|| Ok(()));
        playback.expect_halt().return_const(());
        playback.expect_release().return_const(());

        let mut notifier = MockNotifier::new();
        notifier.expect_permission_granted().return_const(false);

        Monitor::from_parts(
            Rc::new(requester),
            SoundController::new(playback),
            notifier,
            DispatchSettings {
                polling_interval: Duration::from_secs(10),
                push: false,
            },
            "secret",
            SessionStore::new(data_dir),
        )
    }

    fn create_test_config(player: Option<Vec<String>>) -> Config {
        Config {
            store: Store {
                url: "http://localhost:54321".to_string(),
                api_key: "anon-key".to_string(),
                polling_interval: 7,
                push: false,
                feed_wait: 5,
            },
            alarm: Alarm {
                player,
                notifications: false,
            },
            auth: Auth {
                password: "secret".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_new_with_player_command() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(Some(vec!["paplay".to_string(), "siren.oga".to_string()]));

        let monitor = Monitor::new(config, temp_dir.path()).await.unwrap();
        assert_eq!(monitor.dispatcher.screen(), Screen::Login);
        assert!(!monitor.logged_in);
    }

    #[tokio::test]
    async fn test_new_with_terminal_bell() {
        let temp_dir = TempDir::new().unwrap();

        assert!(Monitor::new(create_test_config(None), temp_dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_new_rejects_empty_player() {
        let temp_dir = TempDir::new().unwrap();

        let result = Monitor::new(create_test_config(Some(vec![])), temp_dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_login_persists_and_starts_polling() {
        let temp_dir = TempDir::new().unwrap();
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .returning(|| Ok(vec![]));

        LocalSet::new()
            .run_until(async {
                let mut monitor = create_test_monitor(requester, temp_dir.path());

                assert_eq!(monitor.apply_action(Action::LogIn).await, None);
                assert!(monitor.logged_in);
                assert_eq!(monitor.dispatcher.screen(), Screen::Dashboard);
                assert!(monitor.dispatcher.is_polling());
                assert!(SessionStore::new(temp_dir.path()).load().await);

                let outcome = monitor.apply_action(Action::LogOut).await;
                assert_eq!(outcome, Some(LOGIN_HINT.to_string()));
                assert!(!monitor.logged_in);
                assert!(!monitor.dispatcher.is_polling());
                assert!(!SessionStore::new(temp_dir.path()).load().await);

                monitor.dispatcher.shutdown();
            })
            .await;
    }

    #[tokio::test]
    async fn test_acknowledge_reports_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .times(1)
            .returning(|| Ok(vec![create_test_row("e1")]));
        requester
            .expect_get_subject_profile()
            .returning(|_| Ok(None));
        requester
            .expect_set_resolved()
            .with(eq("e1"))
            .times(1)
            .returning(|_| Ok(()));
        requester
            .expect_set_resolved()
            .with(eq("e2"))
            .times(1)
            .returning(|_| {
                Err(TransportError::Rejected {
                    status: 500,
                    message: "boom".to_string(),
                })
            });

        let mut monitor = create_test_monitor(requester, temp_dir.path());
        monitor.dispatcher.refresh().await.unwrap();
        assert_eq!(monitor.dispatcher.snapshot().count(), 1);

        let outcome = monitor
            .apply_action(Action::Acknowledge("e1".to_string()))
            .await;
        assert_eq!(outcome, Some(format_acknowledged("e1")));
        assert_eq!(monitor.dispatcher.snapshot().count(), 0);

        let outcome = monitor
            .apply_action(Action::Acknowledge("e2".to_string()))
            .await
            .unwrap();
        assert!(outcome.starts_with("Could not resolve emergency e2"));
    }

    #[tokio::test]
    async fn test_show_statistics() {
        let temp_dir = TempDir::new().unwrap();
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .returning(|| Ok(vec![]));
        requester
            .expect_list_records()
            .with(eq("students"))
            .returning(|_| Ok(vec![json!({"id": 1}), json!({"id": 2})]));
        requester
            .expect_list_records()
            .with(eq("documentation"))
            .returning(|_| Ok(vec![json!({"id": 1})]));

        LocalSet::new()
            .run_until(async {
                let mut monitor = create_test_monitor(requester, temp_dir.path());

                let outcome = monitor.apply_action(Action::ShowStatistics).await;
                assert_eq!(
                    outcome,
                    Some(
                        "students: 2, documentation entries: 1, active emergencies: 0".to_string()
                    )
                );
                assert_eq!(monitor.dispatcher.screen(), Screen::Statistics);

                monitor.dispatcher.shutdown();
            })
            .await;
    }

    #[tokio::test]
    async fn test_show_statistics_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut requester = MockRequester::new();
        requester
            .expect_list_active_emergencies()
            .returning(|| Ok(vec![]));
        requester.expect_list_records().returning(|_| {
            Err(TransportError::Rejected {
                status: 401,
                message: "invalid api key".to_string(),
            })
        });

        LocalSet::new()
            .run_until(async {
                let mut monitor = create_test_monitor(requester, temp_dir.path());

                let outcome = monitor.apply_action(Action::ShowStatistics).await.unwrap();
                assert!(outcome.starts_with("Could not load statistics"));

                monitor.dispatcher.shutdown();
            })
            .await;
    }
}
