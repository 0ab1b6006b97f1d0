//! Command parsing.
//!
//! This module converts console input lines into structured [`Command`] enums.

use command_parser::{Command as ParserCommand, Parser};
use log::debug;

use crate::alerts::Screen;
use crate::commands::responses::{
    format_invalid_screen, format_missing_argument, format_unknown_command,
};

/// Name following the `!` prefix of every console command.
pub const COMMAND_NAME: &str = "watch";

/// Represents a parsed console command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Display help information
    Help,
    /// Show the alert banner
    Status,
    /// List the active emergencies
    Emergencies,
    /// Mark an emergency as resolved
    ///
    /// # Fields
    ///
    /// * `String` - Emergency ID
    Ack(String),
    /// Open the respond screen
    ///
    /// # Fields
    ///
    /// * `String` - Emergency ID
    Respond(String),
    /// Clear the local display
    Dismiss,
    /// Silence the alarm
    Stop,
    /// Switch screen
    Goto(Screen),
    /// Log in with the shared password
    Login(String),
    Logout,
    /// Show the statistics
    Stats,
}

/// Errors that can occur during command parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParsingError {
    /// The line could not be parsed as a command
    UnableToParse,
    /// The command is not for the console (wrong name)
    NotWatch,
    /// The command is not recognized
    Unknown,
    /// A required argument is missing
    ///
    /// # Fields
    ///
    /// * `&'static str` - Usage of the command
    MissingArgument(&'static str),
    /// The screen name is not one the operator can navigate to
    InvalidScreen(String),
}

impl Command {
    /// Parses an input line into a Command.
    ///
    /// # Arguments
    ///
    /// * `parser` - The command parser instance
    /// * `body` - The line typed by the operator
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - If the line is a valid console command
    /// * `Err(CommandParsingError)` - If parsing fails or the command is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// # use command_parser::Parser;
    /// # use schoolwatch::commands::command::Command;
    /// let parser = Parser::new('!', '-');
    /// let result = Command::parse(&parser, "!watch ack 12");
    /// assert!(result.is_ok());
    /// ```
    pub fn parse(parser: &Parser, body: &str) -> Result<Self, CommandParsingError> {
        // The parser drops the last word, so a dummy word is appended
        let body = body.trim().to_string() + " dummy";

        let command = match parser.parse(&body) {
            Ok(cmd) => cmd,
            Err(_) => return Err(CommandParsingError::UnableToParse),
        };

        if command.name != COMMAND_NAME {
            return Err(CommandParsingError::NotWatch);
        }

        debug!("parsing command: {:?}", command);

        // If no arguments, return help
        if command.arguments.is_empty() {
            return Ok(Command::Help);
        }

        match command.arguments[0].as_str() {
            "help" => Ok(Command::Help),
            "status" => Ok(Command::Status),
            "emergencies" => Ok(Command::Emergencies),
            "ack" => Ok(Command::Ack(Self::argument(&command, "ack <id>")?)),
            "respond" => Ok(Command::Respond(Self::argument(&command, "respond <id>")?)),
            "dismiss" => Ok(Command::Dismiss),
            "stop" => Ok(Command::Stop),
            "goto" => {
                let name = Self::argument(&command, "goto <screen>")?;
                name.parse::<Screen>()
                    .map(Command::Goto)
                    .map_err(CommandParsingError::InvalidScreen)
            }
            "login" => Ok(Command::Login(Self::argument(&command, "login <password>")?)),
            "logout" => Ok(Command::Logout),
            "stats" => Ok(Command::Stats),
            _ => Err(CommandParsingError::Unknown),
        }
    }

    /// Returns the single argument following the subcommand.
    fn argument(
        command: &ParserCommand,
        usage: &'static str,
    ) -> Result<String, CommandParsingError> {
        command
            .arguments
            .get(1)
            .cloned()
            .ok_or(CommandParsingError::MissingArgument(usage))
    }
}

/// Formats a command error into a user-friendly message.
///
/// Lines that are not console commands produce no message.
///
/// # Returns
///
/// * `Some(String)` - A formatted error message for user-facing errors
/// * `None` - For lines that should not produce a response
pub fn format_command_error(error: CommandParsingError) -> Option<String> {
    match error {
        CommandParsingError::Unknown => Some(format_unknown_command()),
        CommandParsingError::MissingArgument(usage) => Some(format_missing_argument(usage)),
        CommandParsingError::InvalidScreen(message) => Some(format_invalid_screen(&message)),
        CommandParsingError::UnableToParse | CommandParsingError::NotWatch => None,
    }
}
