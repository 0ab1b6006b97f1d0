//! Detail of the emergency being worked.

use crate::alerts::{AlertSnapshot, Screen};
use crate::widgets::{REPORTED_AT_FORMAT, Widget};

/// Shown only on the respond screen.
#[derive(Debug, Default)]
pub struct Detail;

impl Widget for Detail {
    fn name(&self) -> &'static str {
        "detail"
    }

    fn visible_on(&self, screen: &Screen) -> bool {
        matches!(screen, Screen::Respond(_))
    }

    fn render(&self, snapshot: &AlertSnapshot, screen: &Screen) -> Option<String> {
        let Screen::Respond(id) = screen else {
            return None;
        };

        let Some(emergency) = snapshot.get(id) else {
            return Some(format!("Emergency {} is no longer active.", id));
        };

        let mut lines = vec![
            format!("Responding to emergency {}", emergency.id),
            format!("Student: {}", emergency.subject_name()),
        ];
        if let Some(profile) = &emergency.profile {
            lines.push(format!("Student ID: {}", profile.subject_id_display));
            if let Some(avatar_ref) = &profile.avatar_ref {
                lines.push(format!("Photo: {}", avatar_ref));
            }
        }
        lines.push(format!("Location: {}", emergency.location));
        lines.push(format!(
            "Reported: {}",
            emergency.reported_at.format(REPORTED_AT_FORMAT)
        ));
        lines.push(format!("Resolve with: !watch ack {}", emergency.id));

        Some(lines.join("\n"))
    }
}
