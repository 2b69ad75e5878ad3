use log::info;

use crate::changelog::{ChangeLog, FieldDiff, diff};
use crate::employee::{Employee, Field};
use crate::error::{HrError, HrResult};
use crate::normalize::{normalize_date, normalize_salary, strip_float_suffix};
use crate::store::RecordStore;

/// Apply submitted form values to an employee.
///
/// `name` is the identity and is never overwritten. Values are trimmed, date
/// fields and salary are normalized. Keys that are neither known fields nor
/// existing columns become new extra columns.
pub fn apply_form<K, V>(employee: &mut Employee, form: &[(K, V)])
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in form {
        let key = key.as_ref();
        if key == Field::Name.as_str() {
            continue;
        }
        let value = value.as_ref().trim();
        let value = match key.parse::<Field>() {
            Ok(field) if field.is_date() => normalize_date(value),
            Ok(Field::Salary) => normalize_salary(value),
            _ => value.to_string(),
        };
        employee.set(key, value);
    }
}

/// Edit one employee and journal the change.
///
/// The store lock is held from load to the log append, so two concurrent
/// edits of different employees both survive. Returns the field differences
/// that were recorded (empty when the edit changed nothing).
pub fn edit_employee<K, V>(
    store: &RecordStore,
    log: &ChangeLog,
    name: &str,
    actor: &str,
    form: &[(K, V)],
) -> HrResult<Vec<FieldDiff>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let guard = store.lock();
    let mut table = guard.load()?;

    for (key, _) in form {
        let key = key.as_ref();
        if key != Field::Name.as_str() {
            table.ensure_column(key);
        }
    }

    let employee = table
        .find_mut(name)
        .ok_or_else(|| HrError::NotFound(format!("employee {:?}", name)))?;
    let before = employee.clone();
    apply_form(employee, form);
    let after = employee.clone();

    guard.save(&table)?;

    let changes = diff(&before, &after);
    log.append(name, actor, &changes);
    if !changes.is_empty() {
        info!(
            "{} edited {} ({} field(s) changed)",
            actor,
            name,
            changes.len()
        );
    }
    Ok(changes)
}

/// Copy of an employee prepared for the detail page: float artifacts removed
/// from the extension, dates and salary in canonical form.
pub fn display_view(employee: &Employee) -> Employee {
    let mut view = employee.clone();
    view.extension_number = strip_float_suffix(&view.extension_number);
    for field in Field::DATES {
        let normalized = normalize_date(view.field(field));
        *view.field_mut(field) = normalized;
    }
    view.salary = normalize_salary(&view.salary);
    view
}
