//! Expanded list of the active emergencies.

use crate::alerts::{AlertSnapshot, Screen};
use crate::widgets::{Widget, describe};

/// Lists every active emergency, most recent first, on the dashboard.
#[derive(Debug, Default)]
pub struct Panel;

impl Panel {
    /// Full listing, also used by the `emergencies` command.
    pub fn listing(snapshot: &AlertSnapshot) -> String {
        let emergencies = snapshot.emergencies();
        if emergencies.is_empty() {
            return "No active emergencies.".to_string();
        }

        let mut lines = vec![format!("Active emergencies ({}):", emergencies.len())];
        lines.extend(
            emergencies
                .into_iter()
                .map(|emergency| format!("- {}", describe(emergency))),
        );
        lines.join("\n")
    }
}

impl Widget for Panel {
    fn name(&self) -> &'static str {
        "panel"
    }

    fn visible_on(&self, screen: &Screen) -> bool {
        *screen == Screen::Dashboard
    }

    fn render(&self, snapshot: &AlertSnapshot, screen: &Screen) -> Option<String> {
        self.visible_on(screen).then(|| Self::listing(snapshot))
    }
}
