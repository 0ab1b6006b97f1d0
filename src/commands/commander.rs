//! Command orchestration and execution.
//!
//! This module provides the [`Commander`] struct, the entry point for processing
//! console commands.
//!
//! # Flow
//!
//! ```text
//! input line → parse() → Command → execute() → CommandResult
//! ```

use command_parser::Parser;

use crate::commands::{
    CommandContext, CommandParseError, CommandResult,
    actions::{
        handle_ack, handle_dismiss, handle_emergencies, handle_goto, handle_help, handle_login,
        handle_logout, handle_respond, handle_stats, handle_status, handle_stop,
    },
    command::{Command, format_command_error},
    responses::format_login_required,
};

/// Command orchestrator for parsing and executing console commands.
///
/// # Command Prefix
///
/// All commands must start with the `!watch` prefix. Other lines are silently
/// ignored (returning [`CommandParseError::NotForConsole`]).
///
/// # Login Gate
///
/// While logged out, only `help` and `login` are executed.
pub struct Commander {
    /// Command parser for processing operator commands
    parser: Parser,
    /// Shared password checked by `login`
    password: String,
}

impl Commander {
    /// Creates a new Commander instance.
    ///
    /// The parser recognizes commands starting with `!` and options starting
    /// with `-`.
    ///
    /// # Arguments
    ///
    /// * `password` - The shared password checked by `login`.
    pub fn new(password: &str) -> Self {
        let parser = Parser::new('!', '-');
        Commander {
            parser,
            password: password.to_owned(),
        }
    }

    /// Parses an input line into a structured command.
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - Successfully parsed and validated command
    /// * `Err(CommandParseError::NotForConsole)` - Line is not a console command
    /// * `Err(CommandParseError::InvalidCommand)` - Command syntax is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// # use schoolwatch::commands::Commander;
    /// let commander = Commander::new("secret");
    ///
    /// assert!(commander.parse("!watch help").is_ok());
    /// assert!(commander.parse("Hello, world!").is_err());
    /// ```
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        Command::parse(&self.parser, body).map_err(|error| match format_command_error(error) {
            Some(message) => CommandParseError::InvalidCommand(message),
            None => CommandParseError::NotForConsole,
        })
    }

    /// Executes a parsed command and returns the result.
    ///
    /// # Arguments
    ///
    /// * `command` - The parsed command to execute
    /// * `context` - Snapshot, screen and login flag at the time of the command
    pub fn execute(&self, command: &Command, context: &CommandContext) -> CommandResult {
        if !context.logged_in && !matches!(command, Command::Help | Command::Login(_)) {
            return CommandResult::reply(format_login_required());
        }

        match command {
            Command::Help => handle_help(),
            Command::Status => handle_status(context),
            Command::Emergencies => handle_emergencies(context),
            Command::Ack(id) => handle_ack(context, id),
            Command::Respond(id) => handle_respond(context, id),
            Command::Dismiss => handle_dismiss(),
            Command::Stop => handle_stop(),
            Command::Goto(screen) => handle_goto(context, screen),
            Command::Login(attempt) => handle_login(context, attempt, &self.password),
            Command::Logout => handle_logout(),
            Command::Stats => handle_stats(),
        }
    }
}
