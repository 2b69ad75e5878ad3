use calamine::{Data, DataType, Reader, Xlsx, open_workbook};
use log::{debug, info};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;

use crate::employee::{Employee, Table};
use crate::error::{HrError, HrResult};

/// Spreadsheet-backed employee table.
///
/// All reads and writes of the backing file go through one mutex. A caller
/// that needs to modify a record must take [`RecordStore::lock`] and keep the
/// returned guard for the whole load, modify, save sequence; calling
/// [`RecordStore::load`] and [`RecordStore::save`] separately lets a
/// concurrent editor slip in between and lose one of the two updates.
///
/// # Examples
/// ```no_run
/// use insa_db::store::RecordStore;
///
/// let store = RecordStore::new("private/db/insa_DB.xlsx");
/// let guard = store.lock();
/// let mut table = guard.load()?;
/// if let Some(emp) = table.find_mut("홍길동") {
///     emp.position = "팀장".to_string();
/// }
/// guard.save(&table)?;
/// # Ok::<(), insa_db::error::HrError>(())
/// ```
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Exclusive access to the backing file, held until dropped.
pub struct StoreGuard<'a> {
    store: &'a RecordStore,
    _guard: MutexGuard<'a, ()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the process-wide store lock.
    pub fn lock(&self) -> StoreGuard<'_> {
        // The mutex protects no data of its own, so a panic in another holder
        // leaves nothing inconsistent behind.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        StoreGuard {
            store: self,
            _guard: guard,
        }
    }

    /// Create the backing file with only the base columns if it is absent.
    pub fn ensure_exists(&self) -> HrResult<()> {
        self.lock().ensure_exists()
    }

    /// Read the whole table under the lock.
    pub fn load(&self) -> HrResult<Table> {
        self.lock().load()
    }

    /// Atomically replace the backing file with `table` under the lock.
    pub fn save(&self, table: &Table) -> HrResult<()> {
        self.lock().save(table)
    }
}

impl StoreGuard<'_> {
    pub fn ensure_exists(&self) -> HrResult<()> {
        if self.store.path.exists() {
            return Ok(());
        }
        info!(
            "Creating empty employee table at {}",
            self.store.path.display()
        );
        self.save(&Table::with_base_columns())
    }

    /// Parse the backing file. Every cell comes back as text and every known
    /// field is present as a column.
    pub fn load(&self) -> HrResult<Table> {
        self.ensure_exists()?;
        let mut table = read_table(&self.store.path)?;
        table.backfill_columns();
        debug!(
            "Loaded {} employees from {}",
            table.len(),
            self.store.path.display()
        );
        Ok(table)
    }

    /// Write to a temporary file next to the backing file, then rename it over
    /// the original. Readers see either the old or the new file, never a mix.
    pub fn save(&self, table: &Table) -> HrResult<()> {
        let path = &self.store.path;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| {
            HrError::StoreWriteFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let buffer = write_table(table)?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| HrError::StoreWriteFailed(format!("temporary file: {}", e)))?;
        tmp.write_all(&buffer)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| HrError::StoreWriteFailed(format!("temporary write: {}", e)))?;
        tmp.persist(path).map_err(|e| {
            HrError::StoreWriteFailed(format!("replace {}: {}", path.display(), e.error))
        })?;

        info!("Saved {} employees to {}", table.len(), path.display());
        Ok(())
    }
}

fn read_table(path: &Path) -> HrResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
        HrError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HrError::StoreUnavailable(format!("{} has no sheets", path.display())))?
        .map_err(|e| HrError::StoreUnavailable(format!("cannot read {}: {}", path.display(), e)))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        // A workbook with no cells at all carries no columns either.
        return Ok(Table::default());
    };

    // Blank and repeated header cells map to no column; their data is dropped.
    let mut columns: Vec<String> = Vec::new();
    let mut positions: Vec<Option<usize>> = Vec::with_capacity(header.len());
    for cell in header {
        let name = cell_to_string(cell).trim().to_string();
        if name.is_empty() || columns.contains(&name) {
            positions.push(None);
            continue;
        }
        positions.push(Some(columns.len()));
        columns.push(name);
    }

    let mut table = Table {
        columns,
        rows: Vec::new(),
    };
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let mut employee = Employee::default();
        for (i, cell) in row.iter().enumerate() {
            if let Some(Some(col)) = positions.get(i) {
                employee.set(&table.columns[*col], cell_to_string(cell));
            }
        }
        table.rows.push(employee);
    }
    Ok(table)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn write_table(table: &Table) -> HrResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    let mut columns = table.columns.clone();
    for employee in &table.rows {
        for key in employee.extra.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| HrError::StoreWriteFailed(e.to_string());

    for (c, name) in columns.iter().enumerate() {
        worksheet
            .write_string(0, c as u16, name.as_str())
            .map_err(xlsx_err)?;
    }
    for (r, employee) in table.rows.iter().enumerate() {
        for (c, name) in columns.iter().enumerate() {
            let value = employee.get(name).unwrap_or("");
            // Blank cells stay blank; load reads them back as "".
            if !value.is_empty() {
                worksheet
                    .write_string((r + 1) as u32, c as u16, value)
                    .map_err(xlsx_err)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_err)
}
