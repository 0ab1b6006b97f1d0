//! Operator console command parsing and response formatting.
//!
//! This module provides the complete command processing pipeline of the console,
//! letting the operator act on the alert pipeline from standard input.
//!
//! # Overview
//!
//! 1. **Parsing** - Converting an input line into a structured [`command::Command`]
//! 2. **Gating** - Only `help` and `login` are accepted while logged out
//! 3. **Execution** - Routing commands to pure handlers
//! 4. **Response** - Formatting the text printed back to the operator
//!
//! Handlers never touch the dispatcher. They return an [`Action`] which the
//! [`Monitor`](crate::monitor::Monitor) applies.
//!
//! ```text
//! stdin line ─► Commander::parse() ─► Command ─► Commander::execute() ─► CommandResult
//!                                                                          │
//!                                                       Monitor applies ◄──┘ action
//! ```
//!
//! # Command Structure
//!
//! All commands follow the format: `!watch <subcommand> [args...]`
//!
//! | Command | Arguments | Description |
//! |---------|-----------|-------------|
//! | `help` | None | Display help information |
//! | `status` | None | Show the alert banner |
//! | `emergencies` | None | List the active emergencies |
//! | `ack` | `<id>` | Mark an emergency as resolved |
//! | `respond` | `<id>` | Open the respond screen, silencing the alarm |
//! | `dismiss` | None | Clear the local display |
//! | `stop` | None | Silence the alarm |
//! | `goto` | `<screen>` | Switch screen |
//! | `login` | `<password>` | Log in |
//! | `logout` | None | Log out |
//! | `stats` | None | Show the statistics |
//!
//! # Examples
//!
//! ```no_run
//! use schoolwatch::commands::{CommandContext, Commander};
//! use schoolwatch::alerts::{AlertSnapshot, Screen};
//!
//! let commander = Commander::new("secret");
//! let command = commander.parse("!watch status").unwrap();
//! let context = CommandContext {
//!     snapshot: AlertSnapshot::default(),
//!     screen: Screen::Dashboard,
//!     logged_in: true,
//! };
//! println!("{}", commander.execute(&command, &context).response);
//! ```

mod actions;
mod command;
mod commander;
mod responses;

pub use crate::commands::commander::Commander;
pub use crate::commands::responses::{
    format_acknowledge_failed, format_acknowledged, format_statistics_failed,
};

use crate::alerts::{AlertSnapshot, Screen};

/// Runtime context for command execution.
///
/// # Fields
///
/// * `snapshot` - Copy of the current alert snapshot
/// * `screen` - Screen shown when the command was typed
/// * `logged_in` - Whether the operator is logged in
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub snapshot: AlertSnapshot,
    pub screen: Screen,
    pub logged_in: bool,
}

/// Change requested by a command, applied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Resolve an emergency in the store
    Acknowledge(String),
    /// Open the respond screen for an emergency
    Respond(String),
    /// Clear the local display
    DismissAll,
    /// Silence the alarm
    ExplicitStop,
    Navigate(Screen),
    LogIn,
    LogOut,
    /// Load and print the statistics
    ShowStatistics,
}

/// Result of command execution.
///
/// # State Changes
///
/// Command handlers don't directly modify state. Instead, they return an
/// [`Action`] which the caller is responsible for applying.
///
/// # Examples
///
/// ```
/// # use schoolwatch::commands::CommandResult;
/// // Read-only command (help, status, emergencies)
/// let result = CommandResult {
///     response: "No active emergencies.".to_string(),
///     action: None,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Text printed to the operator
    pub response: String,
    /// Optional change to apply
    pub action: Option<Action>,
}

impl CommandResult {
    fn reply(response: String) -> Self {
        CommandResult {
            response,
            action: None,
        }
    }

    fn with_action(response: String, action: Action) -> Self {
        CommandResult {
            response,
            action: Some(action),
        }
    }
}

/// Errors that can occur during command parsing.
///
/// # Variants
///
/// * `NotForConsole` - Line is not a console command. Ignored silently.
/// * `InvalidCommand` - Command syntax or arguments are invalid. Contains the
///   message to print.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// Line is not a console command (silent error)
    NotForConsole,
    /// Invalid command syntax with error message
    InvalidCommand(String),
}
