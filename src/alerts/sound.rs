//! Alarm sound ownership.
//!
//! This module provides the [`SoundController`], the single owner of the looping
//! alarm sound, and the [`Playback`] backends it drives.

use std::{
    cell::RefCell,
    io::Write,
    process::Stdio,
    rc::Rc,
    time::Duration,
};

use log::{debug, info, warn};
use mockall::automock;
use tokio::{process::Command, task, task::JoinHandle, time};

use crate::alerts::PlaybackError;

/// Interval between two terminal bells.
const BELL_INTERVAL_SECS: u64 = 2;

/// A loopable audio resource.
///
/// Backends spawn their loop on the local task set, so [`Playback::start_loop`]
/// must be called from within a [`tokio::task::LocalSet`].
#[automock]
pub trait Playback {
    /// Starts looping playback.
    fn start_loop(&mut self) -> Result<(), PlaybackError>;
    /// Halts playback, the resource stays usable.
    fn halt(&mut self);
    /// Releases the resource for good, halting any playback.
    fn release(&mut self);
}

/// Single shared owner of the alarm sound.
///
/// Clones share the same resource: starting twice from two holders plays one
/// loop, stopping twice is harmless. The resource is released on
/// [`SoundController::dispose`] or when the last clone is dropped.
///
/// # Examples
///
/// ```no_run
/// use schoolwatch::alerts::{BellPlayback, SoundController};
///
/// let sound = SoundController::new(BellPlayback::default());
/// sound.start()?;
/// sound.clone().stop();
/// ```
#[derive(Clone)]
pub struct SoundController {
    inner: Rc<RefCell<SoundInner>>,
}

struct SoundInner {
    playback: Box<dyn Playback>,
    playing: bool,
    disposed: bool,
}

impl SoundController {
    /// Create a new [SoundController] owning `playback`.
    pub fn new(playback: impl Playback + 'static) -> Self {
        SoundController {
            inner: Rc::new(RefCell::new(SoundInner {
                playback: Box::new(playback),
                playing: false,
                disposed: false,
            })),
        }
    }

    /// Starts looping the alarm, no-op when already playing or disposed.
    ///
    /// # Returns
    ///
    /// The [`PlaybackError`] of the backend. The controller stays stopped and a
    /// later call tries again.
    pub fn start(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            warn!("alarm sound already released, ignore start");
            return Ok(());
        }
        if inner.playing {
            debug!("alarm sound already playing");
            return Ok(());
        }

        inner.playback.start_loop()?;
        inner.playing = true;
        info!("alarm sound started");
        Ok(())
    }

    /// Halts the alarm, no-op when not playing.
    pub fn stop(&self) {
        let mut inner = self.inner.borrow_mut();
        if !inner.playing {
            return;
        }

        inner.playback.halt();
        inner.playing = false;
        info!("alarm sound stopped");
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.inner.borrow().playing
    }

    /// Releases the audio resource for every clone.
    pub fn dispose(&self) {
        self.inner.borrow_mut().release();
    }
}

impl SoundInner {
    fn release(&mut self) {
        if self.disposed {
            return;
        }
        self.playback.release();
        self.playing = false;
        self.disposed = true;
        debug!("alarm sound released");
    }
}

impl Drop for SoundInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// Plays the alarm by relaunching an external player command.
///
/// The first launch happens synchronously so that a missing player is reported
/// to the caller. The loop ends when the player exits with a failure status.
pub struct CommandPlayback {
    /// Program and arguments, e.g. `["paplay", "siren.oga"]`
    command: Vec<String>,
    task: Option<JoinHandle<()>>,
}

impl CommandPlayback {
    pub fn new(command: Vec<String>) -> Self {
        CommandPlayback {
            command,
            task: None,
        }
    }

    fn spawn(command: &[String]) -> Result<tokio::process::Child, PlaybackError> {
        let (program, args) = command.split_first().ok_or(PlaybackError::EmptyCommand)?;

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlaybackError::Launch {
                program: program.to_owned(),
                source,
            })
    }
}

impl Playback for CommandPlayback {
    fn start_loop(&mut self) -> Result<(), PlaybackError> {
        self.halt();
        let mut child = Self::spawn(&self.command)?;
        let command = self.command.clone();

        self.task = Some(task::spawn_local(async move {
            loop {
                match child.wait().await {
                    Ok(status) if status.success() => debug!("player exited, relaunch"),
                    Ok(status) => {
                        warn!("player exited with {}, stop looping", status);
                        return;
                    }
                    Err(err) => {
                        warn!("error while waiting for player: {}", err);
                        return;
                    }
                }

                child = match Self::spawn(&command) {
                    Ok(child) => child,
                    Err(err) => {
                        warn!("{}", err);
                        return;
                    }
                };
            }
        }));
        Ok(())
    }

    fn halt(&mut self) {
        // dropping the task drops the child, which kills it
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn release(&mut self) {
        self.halt();
    }
}

/// Plays the alarm by ringing the terminal bell on an interval.
///
/// Used when no player command is configured.
#[derive(Default)]
pub struct BellPlayback {
    task: Option<JoinHandle<()>>,
}

impl Playback for BellPlayback {
    fn start_loop(&mut self) -> Result<(), PlaybackError> {
        self.halt();
        self.task = Some(task::spawn_local(async {
            let mut interval = time::interval(Duration::from_secs(BELL_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(b"\x07");
                let _ = stdout.flush();
            }
        }));
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn release(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[test]
    fn test_two_holders_share_one_playback() {
        let mut playback = MockPlayback::new();
        playback.expect_start_loop().times(1).returning(|| Ok(()));
        playback.expect_halt().times(1).return_const(());
        playback.expect_release().times(1).return_const(());

        let first = SoundController::new(playback);
        let second = first.clone();

        first.start().unwrap();
        second.start().unwrap();
        assert!(first.is_playing());
        assert!(second.is_playing());

        second.stop();
        first.stop();
        assert!(!first.is_playing());
    }

    #[test]
    fn test_start_failure_leaves_sound_stopped() {
        let mut playback = MockPlayback::new();
        playback
            .expect_start_loop()
            .times(2)
            .returning(|| Err(PlaybackError::EmptyCommand));
        playback.expect_halt().never();
        playback.expect_release().times(1).return_const(());

        let sound = SoundController::new(playback);
        assert!(sound.start().is_err());
        assert!(!sound.is_playing());
        // a later start tries again
        assert!(sound.start().is_err());
    }

    #[test]
    fn test_dispose_releases_once_and_ignores_start() {
        let mut playback = MockPlayback::new();
        playback.expect_start_loop().times(1).returning(|| Ok(()));
        playback.expect_halt().never();
        playback.expect_release().times(1).return_const(());

        let sound = SoundController::new(playback);
        let holder = sound.clone();
        sound.start().unwrap();

        sound.dispose();
        assert!(!holder.is_playing());
        assert!(holder.start().is_ok());
        assert!(!holder.is_playing());

        // dropping every clone does not release again
        drop(sound);
        drop(holder);
    }

    #[test]
    fn test_drop_of_last_clone_releases() {
        let mut playback = MockPlayback::new();
        playback.expect_start_loop().never();
        playback.expect_release().times(1).return_const(());

        let sound = SoundController::new(playback);
        let holder = sound.clone();
        drop(sound);
        drop(holder);
    }

    #[tokio::test]
    async fn test_command_playback_empty_command() {
        let mut playback = CommandPlayback::new(vec![]);

        LocalSet::new()
            .run_until(async move {
                assert!(matches!(
                    playback.start_loop(),
                    Err(PlaybackError::EmptyCommand)
                ));
            })
            .await;
    }

    #[tokio::test]
    async fn test_command_playback_missing_program() {
        let mut playback =
            CommandPlayback::new(vec!["schoolwatch-no-such-player".to_string()]);

        LocalSet::new()
            .run_until(async move {
                assert!(matches!(
                    playback.start_loop(),
                    Err(PlaybackError::Launch { .. })
                ));
                assert!(playback.task.is_none());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_bell_playback_halt_stops_task() {
        LocalSet::new()
            .run_until(async {
                let mut playback = BellPlayback::default();
                playback.start_loop().unwrap();
                assert!(playback.task.is_some());

                playback.halt();
                assert!(playback.task.is_none());
                playback.release();
            })
            .await;
    }
}
