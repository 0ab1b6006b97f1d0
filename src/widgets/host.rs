//! Mounting of widgets as independent local tasks.

use std::rc::Rc;

use log::debug;
use tokio::{
    sync::watch,
    task::{self, JoinHandle},
};

use crate::alerts::{AlertSnapshot, Screen};
use crate::widgets::Widget;

/// Output passed to the sink when a widget stops showing anything.
const CLEARED_OUTPUT: &str = "(cleared)";

/// Mounts widgets on the snapshot and screen channels.
///
/// Every widget runs in its own task and calls the sink only when its rendered
/// output changes, so widgets stay independent of each other. A widget that
/// disappears reports a cleared line once.
pub struct WidgetHost {
    snapshots: watch::Receiver<AlertSnapshot>,
    screens: watch::Receiver<Screen>,
    sink: Rc<dyn Fn(&str, &str)>,
}

impl WidgetHost {
    /// Create a new [WidgetHost].
    ///
    /// # Arguments
    ///
    /// * `snapshots` - Receiver of the dispatcher snapshots.
    /// * `screens` - Receiver of the screen changes.
    /// * `sink` - Called with the widget name and its new output.
    pub fn new(
        snapshots: watch::Receiver<AlertSnapshot>,
        screens: watch::Receiver<Screen>,
        sink: impl Fn(&str, &str) + 'static,
    ) -> Self {
        WidgetHost {
            snapshots,
            screens,
            sink: Rc::new(sink),
        }
    }

    /// Mounts a widget until the returned handle is dropped.
    ///
    /// The widget renders the current state right away. Must be called from within
    /// a [`tokio::task::LocalSet`].
    pub fn mount(&self, widget: impl Widget + 'static) -> MountedWidget {
        let mut snapshots = self.snapshots.clone();
        let mut screens = self.screens.clone();
        let sink = Rc::clone(&self.sink);
        let name = widget.name();

        debug!("mount widget {}", name);
        let handle = task::spawn_local(async move {
            let mut last: Option<String> = None;

            loop {
                let output = {
                    let snapshot = snapshots.borrow_and_update();
                    let screen = screens.borrow_and_update();
                    widget.render(&snapshot, &screen)
                };

                if output != last {
                    sink(widget.name(), output.as_deref().unwrap_or(CLEARED_OUTPUT));
                    last = output;
                }

                let changed = tokio::select! {
                    changed = snapshots.changed() => changed,
                    changed = screens.changed() => changed,
                };
                if changed.is_err() {
                    debug!("widget {} lost its source", widget.name());
                    return;
                }
            }
        });

        MountedWidget { name, handle }
    }
}

/// A mounted widget, unmounted on drop.
#[derive(Debug)]
pub struct MountedWidget {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl MountedWidget {
    #[cfg(test)]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for MountedWidget {
    fn drop(&mut self) {
        debug!("unmount widget {}", self.name);
        self.handle.abort();
    }
}
