//! Help command handler.
//!
//! This is a stateless command that always returns the same help message. It is
//! accepted while logged out.

use log::debug;

use crate::commands::{CommandResult, responses::format_help};

/// Returns help information about available commands.
pub fn handle_help() -> CommandResult {
    debug!("handling help command");

    CommandResult::reply(format_help())
}
