//! Console widgets rendering the alert snapshot.
//!
//! Widgets are pure consumers: they turn a snapshot and the current screen into
//! text and never command the alarm. Each one is mounted by the [`WidgetHost`] as
//! its own task.
//!
//! - [`Banner`] - compact count with the audible or silenced indicator
//! - [`Panel`] - every active emergency, on the dashboard
//! - [`Detail`] - the emergency being worked, on the respond screen

mod banner;
mod detail;
mod host;
mod panel;

pub use crate::widgets::banner::Banner;
pub use crate::widgets::detail::Detail;
pub use crate::widgets::host::{MountedWidget, WidgetHost};
pub use crate::widgets::panel::Panel;

use crate::alerts::{AlertSnapshot, Screen};
use crate::store::Emergency;

/// Format of report timestamps, always shown in UTC.
const REPORTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Read-only view of the alert snapshot.
pub trait Widget {
    /// Name printed in front of the widget output.
    fn name(&self) -> &'static str;

    /// Whether the widget is shown on `screen`.
    fn visible_on(&self, screen: &Screen) -> bool;

    /// Renders the widget, `None` when there is nothing to show.
    fn render(&self, snapshot: &AlertSnapshot, screen: &Screen) -> Option<String>;
}

/// One-line description of an emergency.
fn describe(emergency: &Emergency) -> String {
    let displayed_id = emergency
        .profile
        .as_ref()
        .map(|profile| format!(" ({})", profile.subject_id_display))
        .unwrap_or_default();
    let location = match emergency.location.trim() {
        "" => "unknown location",
        location => location,
    };

    format!(
        "[{}] {}{} at {}, reported {}",
        emergency.id,
        emergency.subject_name(),
        displayed_id,
        location,
        emergency.reported_at.format(REPORTED_AT_FORMAT)
    )
}
