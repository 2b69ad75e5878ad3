use serde::Serialize;
use std::borrow::Borrow;

use crate::employee::{Employee, Field};

/// The columns shown on the employee list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeSummary {
    pub name: String,
    pub team_name: String,
    pub position: String,
    pub extension_number: String,
    pub mbti: String,
}

impl From<&Employee> for EmployeeSummary {
    fn from(emp: &Employee) -> Self {
        EmployeeSummary {
            name: emp.name.clone(),
            team_name: emp.team_name.clone(),
            position: emp.position.clone(),
            extension_number: emp.extension_number.clone(),
            mbti: emp.mbti.clone(),
        }
    }
}

/// Employees of one team, for the grouped list view.
#[derive(Debug, Clone, Serialize)]
pub struct TeamGroup {
    pub team: String,
    pub employees: Vec<EmployeeSummary>,
}

fn record<T: Borrow<Employee>>(item: &T) -> &Employee {
    <T as Borrow<Employee>>::borrow(item)
}

/// Keep records whose visible fields contain `query`, case-insensitively.
///
/// An empty (or all-whitespace) query returns the input unchanged.
pub fn filter<'a>(records: &'a [Employee], query: &str) -> Vec<&'a Employee> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|emp| {
            Field::VISIBLE
                .iter()
                .any(|field| emp.field(*field).to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort by team: listed teams by their index, every other team after
/// them in input order.
pub fn sort_by_team<T: Borrow<Employee>>(records: &mut [T], priority: &[String]) {
    let unlisted = priority.len();
    records.sort_by_key(|emp| {
        let team = &record(emp).team_name;
        priority
            .iter()
            .position(|p| p == team)
            .unwrap_or(unlisted)
    });
}

/// Distinct non-empty team names in encounter order, minus the priority teams.
pub fn distinct_teams_not_in_priority_list<T: Borrow<Employee>>(
    sorted: &[T],
    priority: &[String],
) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for emp in sorted {
        let team = &record(emp).team_name;
        if !team.is_empty() && !seen.contains(team) {
            seen.push(team.clone());
        }
    }
    seen.retain(|team| !priority.contains(team));
    seen
}

/// Group already sorted records for the list page: priority teams first (in
/// list order, skipping empty ones), then the other teams in encounter order,
/// then records with no team.
pub fn group_by_team<T: Borrow<Employee>>(sorted: &[T], priority: &[String]) -> Vec<TeamGroup> {
    let others = distinct_teams_not_in_priority_list(sorted, priority);
    let mut groups: Vec<TeamGroup> = priority
        .iter()
        .chain(others.iter())
        .map(|team| TeamGroup {
            team: team.clone(),
            employees: sorted
                .iter()
                .map(record)
                .filter(|emp| emp.team_name == *team)
                .map(EmployeeSummary::from)
                .collect(),
        })
        .filter(|group| !group.employees.is_empty())
        .collect();

    let unassigned: Vec<EmployeeSummary> = sorted
        .iter()
        .map(record)
        .filter(|emp| emp.team_name.is_empty())
        .map(EmployeeSummary::from)
        .collect();
    if !unassigned.is_empty() {
        groups.push(TeamGroup {
            team: String::new(),
            employees: unassigned,
        });
    }
    groups
}
