use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every column the detail view knows about.
///
/// The first ten are the base set written when the backing file is created;
/// the rest are the extended set, backfilled blank on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    TeamName,
    Position,
    ExtensionNumber,
    PhoneNumber,
    Mbti,
    Birthdate,
    HireDate,
    ExitDate,
    Salary,
    Ssn,
    EmergencyContact,
    StrongType,
    FiroI,
    FiroC,
    FiroA,
    InternalTraining,
    Email,
    ExitReason,
    Address,
    Major,
    Degree,
    Thesis,
    WorkHistory,
    Certification,
    DisciplineAwards,
    RecentProjects,
    CeoMeetingNotes,
    Notes,
}

impl Field {
    /// Canonical column order: base set followed by the extended set.
    pub const ALL: [Field; 29] = [
        Field::Name,
        Field::TeamName,
        Field::Position,
        Field::ExtensionNumber,
        Field::PhoneNumber,
        Field::Mbti,
        Field::Birthdate,
        Field::HireDate,
        Field::ExitDate,
        Field::Salary,
        Field::Ssn,
        Field::EmergencyContact,
        Field::StrongType,
        Field::FiroI,
        Field::FiroC,
        Field::FiroA,
        Field::InternalTraining,
        Field::Email,
        Field::ExitReason,
        Field::Address,
        Field::Major,
        Field::Degree,
        Field::Thesis,
        Field::WorkHistory,
        Field::Certification,
        Field::DisciplineAwards,
        Field::RecentProjects,
        Field::CeoMeetingNotes,
        Field::Notes,
    ];

    /// Columns of a freshly created backing file.
    pub const BASE: [Field; 10] = [
        Field::Name,
        Field::TeamName,
        Field::Position,
        Field::ExtensionNumber,
        Field::PhoneNumber,
        Field::Mbti,
        Field::Birthdate,
        Field::HireDate,
        Field::ExitDate,
        Field::Salary,
    ];

    /// Fields shown on the list page and searched by `query::filter`.
    pub const VISIBLE: [Field; 5] = [
        Field::Name,
        Field::TeamName,
        Field::Position,
        Field::ExtensionNumber,
        Field::Mbti,
    ];

    /// Fields normalized with `normalize_date` on edit and display.
    pub const DATES: [Field; 3] = [Field::Birthdate, Field::HireDate, Field::ExitDate];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::TeamName => "team_name",
            Field::Position => "position",
            Field::ExtensionNumber => "extension_number",
            Field::PhoneNumber => "phone_number",
            Field::Mbti => "mbti",
            Field::Birthdate => "birthdate",
            Field::HireDate => "hire_date",
            Field::ExitDate => "exit_date",
            Field::Salary => "salary",
            Field::Ssn => "ssn",
            Field::EmergencyContact => "emergency_contact",
            Field::StrongType => "strong_type",
            Field::FiroI => "firo_i",
            Field::FiroC => "firo_c",
            Field::FiroA => "firo_a",
            Field::InternalTraining => "internal_training",
            Field::Email => "email",
            Field::ExitReason => "exit_reason",
            Field::Address => "address",
            Field::Major => "major",
            Field::Degree => "degree",
            Field::Thesis => "thesis",
            Field::WorkHistory => "work_history",
            Field::Certification => "certification",
            Field::DisciplineAwards => "discipline_awards",
            Field::RecentProjects => "recent_projects",
            Field::CeoMeetingNotes => "ceo_meeting_notes",
            Field::Notes => "notes",
        }
    }

    pub fn is_date(self) -> bool {
        Field::DATES.contains(&self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or(())
    }
}

/// One row of the backing file.
///
/// Every known field is always present; columns the application does not know
/// about are carried in `extra` so that saving never drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub name: String,
    pub team_name: String,
    pub position: String,
    pub extension_number: String,
    pub phone_number: String,
    pub mbti: String,
    pub birthdate: String,
    pub hire_date: String,
    pub exit_date: String,
    pub salary: String,
    pub ssn: String,
    pub emergency_contact: String,
    pub strong_type: String,
    pub firo_i: String,
    pub firo_c: String,
    pub firo_a: String,
    pub internal_training: String,
    pub email: String,
    pub exit_reason: String,
    pub address: String,
    pub major: String,
    pub degree: String,
    pub thesis: String,
    pub work_history: String,
    pub certification: String,
    pub discipline_awards: String,
    pub recent_projects: String,
    pub ceo_meeting_notes: String,
    pub notes: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Employee {
    pub fn new(name: impl Into<String>) -> Self {
        Employee {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::TeamName => &self.team_name,
            Field::Position => &self.position,
            Field::ExtensionNumber => &self.extension_number,
            Field::PhoneNumber => &self.phone_number,
            Field::Mbti => &self.mbti,
            Field::Birthdate => &self.birthdate,
            Field::HireDate => &self.hire_date,
            Field::ExitDate => &self.exit_date,
            Field::Salary => &self.salary,
            Field::Ssn => &self.ssn,
            Field::EmergencyContact => &self.emergency_contact,
            Field::StrongType => &self.strong_type,
            Field::FiroI => &self.firo_i,
            Field::FiroC => &self.firo_c,
            Field::FiroA => &self.firo_a,
            Field::InternalTraining => &self.internal_training,
            Field::Email => &self.email,
            Field::ExitReason => &self.exit_reason,
            Field::Address => &self.address,
            Field::Major => &self.major,
            Field::Degree => &self.degree,
            Field::Thesis => &self.thesis,
            Field::WorkHistory => &self.work_history,
            Field::Certification => &self.certification,
            Field::DisciplineAwards => &self.discipline_awards,
            Field::RecentProjects => &self.recent_projects,
            Field::CeoMeetingNotes => &self.ceo_meeting_notes,
            Field::Notes => &self.notes,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.name,
            Field::TeamName => &mut self.team_name,
            Field::Position => &mut self.position,
            Field::ExtensionNumber => &mut self.extension_number,
            Field::PhoneNumber => &mut self.phone_number,
            Field::Mbti => &mut self.mbti,
            Field::Birthdate => &mut self.birthdate,
            Field::HireDate => &mut self.hire_date,
            Field::ExitDate => &mut self.exit_date,
            Field::Salary => &mut self.salary,
            Field::Ssn => &mut self.ssn,
            Field::EmergencyContact => &mut self.emergency_contact,
            Field::StrongType => &mut self.strong_type,
            Field::FiroI => &mut self.firo_i,
            Field::FiroC => &mut self.firo_c,
            Field::FiroA => &mut self.firo_a,
            Field::InternalTraining => &mut self.internal_training,
            Field::Email => &mut self.email,
            Field::ExitReason => &mut self.exit_reason,
            Field::Address => &mut self.address,
            Field::Major => &mut self.major,
            Field::Degree => &mut self.degree,
            Field::Thesis => &mut self.thesis,
            Field::WorkHistory => &mut self.work_history,
            Field::Certification => &mut self.certification,
            Field::DisciplineAwards => &mut self.discipline_awards,
            Field::RecentProjects => &mut self.recent_projects,
            Field::CeoMeetingNotes => &mut self.ceo_meeting_notes,
            Field::Notes => &mut self.notes,
        }
    }

    /// Look up a column by name, known field or extra.
    pub fn get(&self, column: &str) -> Option<&str> {
        match column.parse::<Field>() {
            Ok(field) => Some(self.field(field)),
            Err(()) => self.extra.get(column).map(String::as_str),
        }
    }

    /// Set a column by name; unknown names land in `extra`.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        match column.parse::<Field>() {
            Ok(field) => *self.field_mut(field) = value.into(),
            Err(()) => {
                self.extra.insert(column.to_string(), value.into());
            }
        }
    }

    /// All `(column, value)` pairs: known fields in canonical order, then extras.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        Field::ALL
            .iter()
            .map(|field| (field.as_str(), self.field(*field)))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// The whole backing file in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column order as written to the file.
    pub columns: Vec<String>,
    /// Rows in file order.
    pub rows: Vec<Employee>,
}

impl Table {
    /// Empty table with the base columns, as written on first run.
    pub fn with_base_columns() -> Self {
        Table {
            columns: Field::BASE.iter().map(|f| f.as_str().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append every known field missing from `columns`, in canonical order.
    pub fn backfill_columns(&mut self) {
        for field in Field::ALL {
            if !self.columns.iter().any(|c| c == field.as_str()) {
                self.columns.push(field.as_str().to_string());
            }
        }
    }

    /// Add a column if absent; existing rows read it as empty.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// First row with this name. Duplicate names resolve to the earliest row.
    pub fn find(&self, name: &str) -> Option<&Employee> {
        self.rows.iter().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Employee> {
        self.rows.iter_mut().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
