//! Console screens and their alarm suppression rules.

use std::{fmt, str::FromStr};

/// Screen currently shown by the operator console.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    /// Password prompt, shown until the operator logs in
    #[default]
    Login,
    Dashboard,
    Students,
    Documentation,
    Statistics,
    /// Dedicated screen for the emergency being worked
    Respond(String),
}

impl Screen {
    /// Whether polling and the change subscription must stay off on this screen.
    ///
    /// On the login screen nobody is there to hear the alarm; on the respond
    /// screen the operator is already handling it.
    pub fn suppresses_alarm(&self) -> bool {
        matches!(self, Screen::Login | Screen::Respond(_))
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Screen::Login => write!(f, "login"),
            Screen::Dashboard => write!(f, "dashboard"),
            Screen::Students => write!(f, "students"),
            Screen::Documentation => write!(f, "documentation"),
            Screen::Statistics => write!(f, "statistics"),
            Screen::Respond(id) => write!(f, "respond/{}", id),
        }
    }
}

/// Parses the screens an operator may navigate to by name.
///
/// The login and respond screens are reached through their own commands.
impl FromStr for Screen {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "dashboard" => Ok(Screen::Dashboard),
            "students" => Ok(Screen::Students),
            "documentation" => Ok(Screen::Documentation),
            "statistics" => Ok(Screen::Statistics),
            _ => Err(format!(
                "Unknown screen '{}'. Valid screens: dashboard, students, documentation, statistics",
                name
            )),
        }
    }
}
