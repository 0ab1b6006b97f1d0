//! Console response formatters.
//!
//! Every line printed back to the operator in answer to a command is built here.

use crate::alerts::Screen;

/// Formats the help message listing the console commands.
pub fn format_help() -> String {
    let body = "Commands:\n\
        - `status`: show the alert banner\n\
        - `emergencies`: list the active emergencies\n\
        - `ack <id>`: mark an emergency as resolved\n\
        - `respond <id>`: open the respond screen and silence the alarm\n\
        - `dismiss`: clear the local display until the next refresh\n\
        - `stop`: silence the alarm, emergencies stay listed\n\
        - `goto <dashboard|students|documentation|statistics>`: switch screen\n\
        - `stats`: show students, documentation and emergency counts\n\
        - `login <password>` / `logout`: open or close the session\n\
        - `help`: show this help message\n\n\
        Every command starts with `!watch`. The alarm sounds when new emergencies are reported and stops once they are resolved or silenced.";

    body.to_owned()
}

pub fn format_unknown_command() -> String {
    "Unknown command. Type `!watch help` for more information.".to_owned()
}

pub fn format_missing_argument(usage: &str) -> String {
    format!("Missing argument. Usage: `!watch {}`", usage)
}

pub fn format_invalid_screen(message: &str) -> String {
    message.to_owned()
}

pub fn format_login_required() -> String {
    "Please log in first: `!watch login <password>`".to_owned()
}

pub fn format_login_success() -> String {
    "Logged in. Monitoring emergencies.".to_owned()
}

pub fn format_wrong_password() -> String {
    "Wrong password.".to_owned()
}

pub fn format_already_logged_in() -> String {
    "Already logged in.".to_owned()
}

pub fn format_logout() -> String {
    "Logged out. Alerts are paused until the next login.".to_owned()
}

pub fn format_unknown_emergency(id: &str) -> String {
    format!("Emergency {} is not active.", id)
}

pub fn format_acknowledging(id: &str) -> String {
    format!("Resolving emergency {}...", id)
}

/// Formats the answer to a successful acknowledge.
pub fn format_acknowledged(id: &str) -> String {
    format!("Emergency {} resolved.", id)
}

/// Formats the one-time message of a failed acknowledge.
///
/// # Arguments
///
/// * `id` - The emergency that could not be resolved
/// * `error` - Description of the store failure
pub fn format_acknowledge_failed(id: &str, error: &str) -> String {
    format!(
        "Could not resolve emergency {}: {}. Nothing changed, try again.",
        id, error
    )
}

pub fn format_responding(id: &str) -> String {
    format!("Responding to emergency {}. Alarm silenced.", id)
}

pub fn format_dismissed() -> String {
    "Display cleared. Emergencies reappear on the next refresh.".to_owned()
}

pub fn format_stopped() -> String {
    "Alarm silenced.".to_owned()
}

pub fn format_navigate(screen: &Screen) -> String {
    format!("Switched to {}.", screen)
}

pub fn format_loading_statistics() -> String {
    "Loading statistics...".to_owned()
}

/// Formats the message shown when the statistics cannot be loaded.
pub fn format_statistics_failed(error: &str) -> String {
    format!("Could not load statistics: {}", error)
}
