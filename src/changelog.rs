use chrono::Local;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::employee::{Employee, Field};

/// Actor recorded when the editing user is unknown.
pub const UNKNOWN_ACTOR: &str = "-";

/// One field that changed in an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub old: String,
    pub new: String,
}

/// One line of the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub ts: String,
    pub employee: String,
    pub user: String,
    pub changes: Vec<FieldDiff>,
}

/// Field-level differences between two snapshots of the same record.
///
/// The identity field is never reported. Values are compared trimmed. Known
/// fields come first in canonical order, then extra columns by name.
pub fn diff(before: &Employee, after: &Employee) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();

    let mut push = |field: &str, old: &str, new: &str| {
        let (old, new) = (old.trim(), new.trim());
        if old != new {
            diffs.push(FieldDiff {
                field: field.to_string(),
                old: old.to_string(),
                new: new.to_string(),
            });
        }
    };

    for field in Field::ALL {
        if field == Field::Name {
            continue;
        }
        push(field.as_str(), before.field(field), after.field(field));
    }

    let extra_keys: BTreeSet<&String> = before.extra.keys().chain(after.extra.keys()).collect();
    for key in extra_keys {
        let old = before.extra.get(key).map(String::as_str).unwrap_or("");
        let new = after.extra.get(key).map(String::as_str).unwrap_or("");
        push(key.as_str(), old, new);
    }

    diffs
}

/// Append-only JSON-lines journal of edits.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    path: PathBuf,
}

impl ChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ChangeLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an edit. Does nothing when `changes` is empty.
    ///
    /// Write failures are logged and swallowed; an edit is never rejected
    /// because its log line could not be written.
    pub fn append(&self, employee: &str, user: &str, changes: &[FieldDiff]) {
        if changes.is_empty() {
            return;
        }
        let entry = ChangeEntry {
            ts: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            employee: employee.to_string(),
            user: if user.is_empty() {
                UNKNOWN_ACTOR.to_string()
            } else {
                user.to_string()
            },
            changes: changes.to_vec(),
        };
        if let Err(e) = self.write_entry(&entry) {
            warn!(
                "Failed to append change log entry for {} to {}: {}",
                employee,
                self.path.display(),
                e
            );
        }
    }

    fn write_entry(&self, entry: &ChangeEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Up to `max` most recent entries, newest first.
    ///
    /// Lines that do not parse are skipped. A missing or unreadable log reads
    /// as empty.
    pub fn recent_entries(&self, max: usize) -> Vec<ChangeEntry> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Vec::new(),
        };

        // A line that is not UTF-8 has already been consumed when `lines`
        // reports it, so it is skipped on its own. Any other read error ends
        // the read.
        let mut entries: Vec<ChangeEntry> = BufReader::new(file)
            .lines()
            .map_while(|line| match line {
                Ok(line) => Some(Some(line)),
                Err(e) if e.kind() == ErrorKind::InvalidData => Some(None),
                Err(_) => None,
            })
            .flatten()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let skip = entries.len().saturating_sub(max);
        entries.drain(..skip);
        entries.reverse();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(team: &str, salary: &str) -> Employee {
        let mut emp = Employee::new("홍길동");
        emp.team_name = team.to_string();
        emp.salary = salary.to_string();
        emp
    }

    #[test]
    fn identical_snapshots_have_no_diff() {
        let emp = employee("센터", "30000000");
        assert!(diff(&emp, &emp.clone()).is_empty());
    }

    #[test]
    fn diff_ignores_identity_and_whitespace() {
        let before = employee("센터", "30000000");
        let mut after = employee(" 센터 ", "30000000");
        after.name = "다른이름".to_string();
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn diff_reports_changed_fields_in_order() {
        let before = employee("센터", "30000000");
        let mut after = employee("경영지원팀", "35000000");
        after.extra.insert("locker".to_string(), "12".to_string());

        let diffs = diff(&before, &after);
        let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, ["team_name", "salary", "locker"]);
        assert_eq!(diffs[0].old, "센터");
        assert_eq!(diffs[0].new, "경영지원팀");
        assert_eq!(diffs[2].old, "");
    }
}
