//! Desktop notifications.

use std::process::Stdio;

use log::{debug, info, warn};
use mockall::automock;
use tokio::process::Command;

const NOTIFY_PROGRAM: &str = "notify-send";

/// One-shot desktop notifications.
#[automock]
pub trait Notifier {
    /// Whether notifications may be shown, as decided at startup.
    fn permission_granted(&self) -> bool;
    /// Shows a notification, best-effort.
    fn notify(&self, title: &str, body: &str);
}

/// Shows notifications through `notify-send`.
///
/// Permission is probed once: it is granted when notifications are enabled in the
/// configuration and `notify-send` can be launched.
pub struct DesktopNotifier {
    granted: bool,
}

impl DesktopNotifier {
    /// Probes `notify-send`.
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether the configuration allows notifications at all.
    pub async fn probe(enabled: bool) -> Self {
        if !enabled {
            info!("desktop notifications disabled");
            return DesktopNotifier { granted: false };
        }

        let granted = match Command::new(NOTIFY_PROGRAM)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(err) => {
                warn!("{} unavailable, desktop notifications disabled: {}", NOTIFY_PROGRAM, err);
                false
            }
        };

        info!("desktop notifications granted: {}", granted);
        DesktopNotifier { granted }
    }
}

impl Notifier for DesktopNotifier {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn notify(&self, title: &str, body: &str) {
        if !self.granted {
            return;
        }

        debug!("notify {}: {}", title, body);
        if let Err(err) = Command::new(NOTIFY_PROGRAM)
            .args(["--urgency", "critical", "--app-name", "schoolwatch", title, body])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            warn!("error while showing notification: {}", err);
        }
    }
}
