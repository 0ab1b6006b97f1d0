//! Read-only views of the alert snapshot.
//!
//! Both handlers reuse the widget renderers so that the console answers exactly
//! what the widgets print.

use log::debug;

use crate::{
    commands::{CommandContext, CommandResult},
    widgets::{Banner, Panel},
};

/// Returns the banner line, whatever the current screen.
pub fn handle_status(context: &CommandContext) -> CommandResult {
    debug!("handling status command");

    CommandResult::reply(Banner::summary(&context.snapshot))
}

/// Returns the full listing of the active emergencies, most recent first.
pub fn handle_emergencies(context: &CommandContext) -> CommandResult {
    debug!("handling emergencies command");

    CommandResult::reply(Panel::listing(&context.snapshot))
}
