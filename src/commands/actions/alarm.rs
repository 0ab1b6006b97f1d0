//! Alarm command handlers.
//!
//! Acknowledge, respond, dismiss and stop. None of them touches the dispatcher:
//! each returns the [`Action`] to apply.
//!
//! # Behavior
//!
//! - `ack` and `respond` only accept an emergency currently displayed
//! - `dismiss` and `stop` always succeed, even without active emergencies

use log::debug;

use crate::commands::{
    Action, CommandContext, CommandResult,
    responses::{
        format_acknowledging, format_dismissed, format_responding, format_stopped,
        format_unknown_emergency,
    },
};

/// Requests the resolution of an emergency in the store.
///
/// # Returns
///
/// - [`Action::Acknowledge`] when the emergency is displayed
/// - an error message without action otherwise
pub fn handle_ack(context: &CommandContext, id: &str) -> CommandResult {
    debug!("handling ack command for {}", id);

    if context.snapshot.get(id).is_none() {
        return CommandResult::reply(format_unknown_emergency(id));
    }

    CommandResult::with_action(format_acknowledging(id), Action::Acknowledge(id.to_owned()))
}

/// Requests the respond screen for an emergency.
pub fn handle_respond(context: &CommandContext, id: &str) -> CommandResult {
    debug!("handling respond command for {}", id);

    if context.snapshot.get(id).is_none() {
        return CommandResult::reply(format_unknown_emergency(id));
    }

    CommandResult::with_action(format_responding(id), Action::Respond(id.to_owned()))
}

pub fn handle_dismiss() -> CommandResult {
    debug!("handling dismiss command");

    CommandResult::with_action(format_dismissed(), Action::DismissAll)
}

pub fn handle_stop() -> CommandResult {
    debug!("handling stop command");

    CommandResult::with_action(format_stopped(), Action::ExplicitStop)
}
