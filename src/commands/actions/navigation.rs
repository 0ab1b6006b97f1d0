//! Screen navigation handlers.

use log::debug;

use crate::{
    alerts::Screen,
    commands::{
        Action, CommandContext, CommandResult,
        responses::{format_loading_statistics, format_navigate},
    },
};

/// Requests a screen change, no action when already on `screen`.
pub fn handle_goto(context: &CommandContext, screen: &Screen) -> CommandResult {
    debug!("handling goto command to {}", screen);

    if context.screen == *screen {
        return CommandResult::reply(format_navigate(screen));
    }

    CommandResult::with_action(format_navigate(screen), Action::Navigate(screen.clone()))
}

/// Requests the statistics, loaded and printed by the caller.
pub fn handle_stats() -> CommandResult {
    debug!("handling stats command");

    CommandResult::with_action(format_loading_statistics(), Action::ShowStatistics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::actions::tests::create_test_context;

    #[test]
    fn test_handle_goto() {
        let context = create_test_context(&[]);

        let result = handle_goto(&context, &Screen::Students);
        assert_eq!(result.action, Some(Action::Navigate(Screen::Students)));
        assert_eq!(result.response, "Switched to students.");
    }

    #[test]
    fn test_handle_goto_current_screen() {
        let context = create_test_context(&[]);

        let result = handle_goto(&context, &Screen::Dashboard);
        assert!(result.action.is_none());
    }

    #[test]
    fn test_handle_stats() {
        assert_eq!(handle_stats().action, Some(Action::ShowStatistics));
    }
}
