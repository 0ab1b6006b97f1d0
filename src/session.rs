//! Persistence of the operator login flag.
//!
//! This module provides the [`SessionStore`] which keeps the "logged in" flag in
//! the data directory between restarts. The flag is not validated by any server:
//! anyone able to write the file is logged in.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Name of the session file inside the data directory.
const SESSION_FILE: &str = "session.json";

/// Serialized content of the session file.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
struct PersistedSession {
    logged_in: bool,
}

/// Loads and persists the login flag.
///
/// Failures are never fatal: a missing or corrupted file reads as logged out,
/// and a failed write is logged.
///
/// # Examples
///
/// ```no_run
/// use schoolwatch::session::SessionStore;
/// use std::path::Path;
///
/// # async fn example() {
/// let session = SessionStore::new(Path::new("/var/lib/schoolwatch"));
/// if !session.load().await {
///     session.persist(true).await;
/// }
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a new `SessionStore` in `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        SessionStore {
            path: data_dir.join(SESSION_FILE),
        }
    }

    /// Reads the login flag.
    ///
    /// # Returns
    ///
    /// `true` when the persisted flag says logged in, `false` otherwise, including
    /// when the file is missing or cannot be deserialized.
    pub async fn load(&self) -> bool {
        let Ok(serialized_session) = fs::read_to_string(&self.path).await else {
            warn!("no persisted session found, starting logged out");
            return false;
        };

        let Ok(session) = serde_json::from_str::<PersistedSession>(&serialized_session) else {
            error!("failed to deserialize persisted session, starting logged out");
            return false;
        };

        info!("loaded persisted session, logged_in={}", session.logged_in);
        session.logged_in
    }

    /// Writes the login flag, creating the data directory when needed.
    pub async fn persist(&self, logged_in: bool) {
        let serialized_session = match serde_json::to_string(&PersistedSession { logged_in }) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("failed to serialize session: {}", e);
                return;
            }
        };

        if let Some(parent) = self.path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            error!("failed to create data directory {}: {}", parent.display(), e);
            return;
        }

        match fs::write(&self.path, serialized_session).await {
            Ok(_) => info!("persisted session, logged_in={}", logged_in),
            Err(e) => error!("failed to write session to {}: {}", self.path.display(), e),
        }
    }
}
