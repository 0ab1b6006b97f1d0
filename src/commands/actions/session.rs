//! Login and logout handlers.
//!
//! The password is compared client-side with the configured shared password.
//! There is no server-side session.

use log::{debug, warn};

use crate::commands::{
    Action, CommandContext, CommandResult,
    responses::{format_already_logged_in, format_login_success, format_logout, format_wrong_password},
};

/// Checks `attempt` against the shared password.
///
/// # Returns
///
/// [`Action::LogIn`] on a match; an error message without action otherwise.
pub fn handle_login(context: &CommandContext, attempt: &str, password: &str) -> CommandResult {
    debug!("handling login command");

    if context.logged_in {
        return CommandResult::reply(format_already_logged_in());
    }

    if attempt != password {
        warn!("login attempt with a wrong password");
        return CommandResult::reply(format_wrong_password());
    }

    CommandResult::with_action(format_login_success(), Action::LogIn)
}

pub fn handle_logout() -> CommandResult {
    debug!("handling logout command");

    CommandResult::with_action(format_logout(), Action::LogOut)
}
