//! Compact alert banner.

use crate::alerts::{AlertSnapshot, Screen};
use crate::widgets::Widget;

/// Compact count of the active emergencies.
///
/// Shown on every screen but the login and respond screens, while at least one
/// emergency is active.
#[derive(Debug, Default)]
pub struct Banner;

impl Banner {
    /// Summary line, also used by the `status` command.
    pub fn summary(snapshot: &AlertSnapshot) -> String {
        let count = snapshot.count();
        let noun = if count == 1 { "emergency" } else { "emergencies" };
        let indicator = if snapshot.is_alarm_active() {
            "alarm sounding"
        } else {
            "silenced"
        };

        match count {
            0 => "No active emergencies.".to_string(),
            _ => format!("{} active {} ({})", count, noun, indicator),
        }
    }
}

impl Widget for Banner {
    fn name(&self) -> &'static str {
        "banner"
    }

    fn visible_on(&self, screen: &Screen) -> bool {
        !screen.suppresses_alarm()
    }

    fn render(&self, snapshot: &AlertSnapshot, screen: &Screen) -> Option<String> {
        if !self.visible_on(screen) || snapshot.count() == 0 {
            return None;
        }
        Some(Self::summary(snapshot))
    }
}
