//! Real-time emergency alert pipeline.
//!
//! This module decides when the school staff must be alerted and keeps every
//! consumer of that decision consistent. It consists of:
//!
//! - [`AlertSnapshot`]: the working memory and its pure transitions
//! - [`AlertDispatcher`]: the orchestration of polling, push, sound and notifications
//! - [`SoundController`]: the single owner of the looping alarm sound
//! - [`Notifier`]: one-shot desktop notifications
//! - [`Screen`]: the console screens and their suppression rules
//!
//! # Architecture
//!
//! ```text
//! AlertSource ──poll──┐
//!                     ├──► AlertDispatcher ──reduce──► AlertSnapshot ──watch──► widgets
//! AlertSource ──push──┘          │
//!                                ├──► SoundController
//!                                └──► Notifier
//! ```
//!
//! Only the dispatcher mutates the snapshot and commands the sound. Widgets read
//! snapshots from a watch channel.
//!
//! # Example Usage
//!
//! ```no_run
//! use schoolwatch::alerts::{AlertDispatcher, BellPlayback, DesktopNotifier, DispatchSettings, Screen, SoundController};
//! use schoolwatch::store::{AlertSource, StoreRequester};
//! use std::{rc::Rc, time::Duration};
//!
//! # async fn example() {
//! let source = AlertSource::new(Rc::new(StoreRequester::new("https://project.example.co", "anon-key", 25)));
//! let dispatcher = AlertDispatcher::new(
//!     source,
//!     SoundController::new(BellPlayback::default()),
//!     DesktopNotifier::probe(true).await,
//!     DispatchSettings { polling_interval: Duration::from_secs(10), push: true },
//! );
//!
//! let mut snapshots = dispatcher.watch();
//! dispatcher.navigate(Screen::Dashboard);
//! snapshots.changed().await.unwrap();
//! println!("{} active emergencies", snapshots.borrow().count());
//! # }
//! ```

mod dispatcher;
mod notifier;
mod screen;
mod sound;
mod state;

pub use crate::alerts::dispatcher::{AlertDispatcher, DispatchSettings};
pub use crate::alerts::notifier::{DesktopNotifier, Notifier};
pub use crate::alerts::screen::Screen;
pub use crate::alerts::sound::{BellPlayback, CommandPlayback, SoundController};
pub use crate::alerts::state::AlertSnapshot;

#[cfg(test)]
pub use crate::alerts::{notifier::MockNotifier, sound::MockPlayback};

/// Errors raised when the alarm sound cannot start.
///
/// Never fatal: the visual alarm stays authoritative.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The player command could not be launched.
    #[error("cannot launch player {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The configured player command is empty.
    #[error("empty player command")]
    EmptyCommand,
}
