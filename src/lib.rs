/*!
# 인사 DB (HR Records)

A small internal web application for browsing, searching and editing employee
records kept in an Excel workbook.

## Overview

The workbook stays the system of record: administrators can still open it in
Excel, add rows, or drop resumes and photos into the private directories. The
application adds a login, a searchable team-ordered list, a detail/edit page,
and a journal of who changed what.

## Architecture

### Record core
- **employee**: fixed-shape `Employee` with the base and extended field sets, `Table`
- **normalize**: date (`YYYY-MM-DD`) and salary (whole won) canonicalization
- **store**: `.xlsx` load/save behind one process-wide lock, atomic replace on save
- **changelog**: per-field diffs appended to a JSON-lines journal, newest-first reads
- **query**: search over the list columns, stable team-priority sort, grouping
- **media**: resume/photo path resolution sandboxed to the private directories
- **editor**: the locked load → edit → save → journal sequence
- **dashboard**: employee count, last modification and recent changes

### Web layer (feature `web`)
- **login**: fixed account table (Argon2 hashes), server-side sessions, auth middleware
- **allowlist**: optional IP allow-list
- **app**: routing, handlebars rendering, media responses

## Data Persistence

- `<private>/db/insa_DB.xlsx` - one row per employee, one column per field
- `<private>/db/change_log.jsonl` - `{"ts", "employee", "user", "changes": [{"field", "old", "new"}]}`
- `<private>/resume/<name>.pdf`, `<private>/photo/<name>.png`, `<private>/photo/default.png`

## Routes

- `/login`, `/logout` - Session handling
- `/` - Dashboard
- `/employees?q=` - Team-grouped list with search
- `/employees/{name}` - Detail view (GET) and edit (POST)
- `/employees/{name}/resume/view`, `/employees/{name}/photo` - Media
- `/ip_block` - Shown to clients outside the allow-list
*/

pub mod changelog;
pub mod config;
pub mod dashboard;
pub mod editor;
pub mod employee;
pub mod error;
pub mod media;
pub mod normalize;
pub mod query;
pub mod store;

#[cfg(feature = "web")]
pub mod allowlist;
#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;

pub use changelog::{ChangeEntry, ChangeLog, FieldDiff};
pub use employee::{Employee, Field, Table};
pub use error::{HrError, HrResult};
pub use media::{MediaKind, MediaResolver};
pub use store::{RecordStore, StoreGuard};
