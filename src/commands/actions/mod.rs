//! Command action handlers.
//!
//! Individual handler functions for each console command. Each handler receives
//! the [`CommandContext`](crate::commands::CommandContext) when it needs one, and
//! returns a [`CommandResult`](crate::commands::CommandResult).
//!
//! # Available Handlers
//!
//! - [`handle_help`] - Display help information
//! - [`handle_status`] / [`handle_emergencies`] - Read-only views of the snapshot
//! - [`handle_ack`] / [`handle_respond`] / [`handle_dismiss`] / [`handle_stop`] - Alarm actions
//! - [`handle_goto`] / [`handle_stats`] - Navigation
//! - [`handle_login`] / [`handle_logout`] - Session
//!
//! # State Changes
//!
//! Handlers don't modify state directly. They return an
//! [`Action`](crate::commands::Action) in the result instead.

mod alarm;
mod help;
mod navigation;
mod session;
mod status;

pub use crate::commands::actions::{
    alarm::{handle_ack, handle_dismiss, handle_respond, handle_stop},
    help::handle_help,
    navigation::{handle_goto, handle_stats},
    session::{handle_login, handle_logout},
    status::{handle_emergencies, handle_status},
};
