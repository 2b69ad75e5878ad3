use chrono::{DateTime, Local};
use log::warn;
use serde::Serialize;
use std::fs;

use crate::changelog::{ChangeEntry, ChangeLog, UNKNOWN_ACTOR};
use crate::store::RecordStore;

/// Number of log entries shown on the dashboard.
pub const RECENT_CHANGES: usize = 10;

/// Figures shown on the main page.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// `None` when the table could not be read.
    pub employee_count: Option<usize>,
    pub last_modified: String,
    pub last_modifier: String,
    pub recent_changes: Vec<ChangeEntry>,
}

impl Dashboard {
    /// Gather the dashboard figures. Never fails; unavailable figures read `-`.
    ///
    /// The last modification comes from the newest log entry, or from the
    /// backing file's mtime when the log is empty.
    pub fn collect(store: &RecordStore, log: &ChangeLog) -> Self {
        let employee_count = match store.load() {
            Ok(table) => Some(table.len()),
            Err(e) => {
                warn!("Dashboard could not load employees: {}", e);
                None
            }
        };

        let recent_changes = log.recent_entries(RECENT_CHANGES);
        let (last_modified, last_modifier) = match recent_changes.first() {
            Some(entry) => (entry.ts.clone(), entry.user.clone()),
            None => {
                let mtime = fs::metadata(store.path())
                    .and_then(|meta| meta.modified())
                    .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|_| UNKNOWN_ACTOR.to_string());
                (mtime, UNKNOWN_ACTOR.to_string())
            }
        };

        Dashboard {
            employee_count,
            last_modified,
            last_modifier,
            recent_changes,
        }
    }
}
