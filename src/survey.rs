//! Survey responses and the selection rules for protocols.
//!
//! The response sheet has one row per submitted protocol. Each department
//! has its own subject column (`Subject_itet`, `Subject_phys`, ...) because
//! the form branches on the department; a row fills exactly one of them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{Error, Result};
use crate::xlsx::Sheet;

pub const SEMESTER_COLUMN: &str = "Semester";
pub const EXAMINER_COLUMN: &str = "Examiner";
pub const SUMMARY_COLUMN: &str = "Summary";
pub const ATMOSPHERE_COLUMN: &str = "Atmosphere";

/// Name of the subject column for a department.
pub fn subject_column(department: &str) -> String {
    format!("Subject_{department}")
}

/// Half of an academic year. Spring precedes Fall within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Spring,
    Fall,
}

/// A semester such as `Fall 2023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Semester {
    pub year: u16,
    pub term: Term,
}

impl FromStr for Semester {
    type Err = ();

    fn from_str(label: &str) -> std::result::Result<Self, ()> {
        let mut parts = label.split_whitespace();
        let (Some(term), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(());
        };
        let term = if term.eq_ignore_ascii_case("spring") {
            Term::Spring
        } else if term.eq_ignore_ascii_case("fall") {
            Term::Fall
        } else {
            return Err(());
        };
        let year = year.parse().map_err(|_| ())?;
        Ok(Semester { year, term })
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = match self.term {
            Term::Spring => "Spring",
            Term::Fall => "Fall",
        };
        write!(f, "{term} {}", self.year)
    }
}

/// One submitted exam protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub semester: Option<String>,
    pub examiner: Option<String>,
    pub summary: Option<String>,
    pub atmosphere: Option<String>,
}

/// A subject together with the department whose column names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKey {
    pub department: String,
    pub subject: String,
}

/// Responses of one subject in one semester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterGroup<'a> {
    pub semester: Semester,
    /// Alphabetically first examiner named for the semester.
    pub examiner: Option<&'a str>,
    pub responses: Vec<&'a Response>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// Subject per department, aligned with `Survey::departments`.
    subjects: Vec<Option<String>>,
    response: Response,
}

/// The response sheet, indexed by department.
#[derive(Debug, Clone)]
pub struct Survey {
    departments: Vec<String>,
    entries: Vec<Entry>,
}

impl Survey {
    /// Build a survey from a sheet.
    ///
    /// Fails with [`Error::MissingColumn`] when the sheet lacks one of the
    /// response columns or a subject column of a configured department.
    pub fn from_sheet(sheet: &Sheet, departments: &[String]) -> Result<Self> {
        let require = |name: &str| {
            sheet
                .column(name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        let semester = require(SEMESTER_COLUMN)?;
        let examiner = require(EXAMINER_COLUMN)?;
        let summary = require(SUMMARY_COLUMN)?;
        let atmosphere = require(ATMOSPHERE_COLUMN)?;
        let subject_columns = departments
            .iter()
            .map(|d| require(&subject_column(d)))
            .collect::<Result<Vec<_>>>()?;

        let text = |row: usize, column: usize| {
            sheet
                .cell(row, column)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let entries = (0..sheet.rows.len())
            .map(|row| Entry {
                subjects: subject_columns.iter().map(|&c| text(row, c)).collect(),
                response: Response {
                    semester: text(row, semester),
                    examiner: text(row, examiner),
                    // Free text keeps its layout; only blank answers count as missing.
                    summary: sheet
                        .cell(row, summary)
                        .filter(|s| !s.trim().is_empty())
                        .map(String::from),
                    atmosphere: sheet
                        .cell(row, atmosphere)
                        .filter(|s| !s.trim().is_empty())
                        .map(String::from),
                },
            })
            .collect();

        Ok(Survey {
            departments: departments.to_vec(),
            entries,
        })
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct subjects of one department in order of first appearance.
    pub fn subjects(&self, department: &str) -> Result<Vec<&str>> {
        let index = self.department_index(department)?;
        let mut seen = BTreeSet::new();
        Ok(self
            .entries
            .iter()
            .filter_map(|e| e.subjects[index].as_deref())
            .filter(|s| seen.insert(*s))
            .collect())
    }

    /// Every (department, subject) pair that has at least one response,
    /// departments in configured order.
    pub fn valid_subjects(&self) -> Vec<SubjectKey> {
        let mut keys = Vec::new();
        for department in &self.departments {
            // Configured departments always resolve.
            if let Ok(subjects) = self.subjects(department) {
                keys.extend(subjects.into_iter().map(|subject| SubjectKey {
                    department: department.clone(),
                    subject: subject.to_string(),
                }));
            }
        }
        keys
    }

    /// All responses for a subject of a department, in sheet order.
    pub fn subject_responses(&self, subject: &str, department: &str) -> Result<Vec<&Response>> {
        let index = self.department_index(department)?;
        let valid = self.subjects(department)?;
        if !valid.contains(&subject) {
            return Err(Error::InvalidSubject {
                given: subject.to_string(),
                valid: valid.into_iter().map(String::from).collect(),
            });
        }

        Ok(self
            .entries
            .iter()
            .filter(|e| e.subjects[index].as_deref() == Some(subject))
            .map(|e| &e.response)
            .collect())
    }

    fn department_index(&self, department: &str) -> Result<usize> {
        self.departments
            .iter()
            .position(|d| d == department)
            .ok_or_else(|| Error::InvalidDepartment {
                given: department.to_string(),
                valid: self.departments.clone(),
            })
    }
}

/// Group responses by semester, latest semester first.
///
/// Responses without a recognisable semester label are skipped with a
/// warning. Within a group the sheet order is kept.
pub fn group_by_semester<'a>(responses: &[&'a Response]) -> Vec<SemesterGroup<'a>> {
    let mut groups: Vec<SemesterGroup<'a>> = Vec::new();

    for &response in responses {
        let label = response.semester.as_deref().unwrap_or_default();
        let Ok(semester) = label.parse::<Semester>() else {
            warn!(semester = label, "skipping response with unrecognised semester");
            continue;
        };
        match groups.iter_mut().find(|g| g.semester == semester) {
            Some(group) => group.responses.push(response),
            None => groups.push(SemesterGroup {
                semester,
                examiner: None,
                responses: vec![response],
            }),
        }
    }

    for group in &mut groups {
        group.examiner = group
            .responses
            .iter()
            .filter_map(|&r| r.examiner.as_deref())
            .min();
    }

    groups.sort_by(|a, b| b.semester.cmp(&a.semester));
    groups
}
