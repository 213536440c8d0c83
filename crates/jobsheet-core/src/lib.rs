//! # jobsheet-core
//!
//! Core domain model for the jobsheet weekly report generator.
//!
//! This crate provides:
//! - Domain records: `WorkRecord`, `DailyStatusRecord`, `WeeklyNoteRecord`
//! - The `ReportRequest` bundle handed to a generator, and its validation
//! - The two-week `ReportWindow` and its `Lane`s
//! - Spreadsheet date-serial conversion
//! - Error types and the `ReportRenderer` trait
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use jobsheet_core::{DailyStatusRecord, ReportRequest, WorkRecord, WorkType};
//!
//! let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
//! let request = ReportRequest::new(7, monday)
//!     .record(
//!         WorkRecord::new(7, monday, "Site survey")
//!             .content("Measured line A\nMeasured line B")
//!             .project("Plant retrofit"),
//!     )
//!     .status(DailyStatusRecord::new(7, monday.succ_opt().unwrap(), WorkType::AnnualLeave));
//!
//! let window = request.validate().unwrap();
//! assert_eq!(window.week_start(), monday);
//! ```

pub mod serial;
pub mod window;

pub use serial::{date_to_serial, serial_to_date};
pub use window::{week_start_of, Lane, ReportWindow, WEEKDAYS};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for an employee
pub type EmployeeId = u64;

// ============================================================================
// Work Type
// ============================================================================

/// Attendance classification of one employee-day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkType {
    #[serde(alias = "내근")]
    InOffice,
    #[serde(alias = "외근")]
    FieldWork,
    #[serde(alias = "연차")]
    AnnualLeave,
    #[serde(alias = "오전반차")]
    HalfDayAm,
    #[serde(alias = "오후반차")]
    HalfDayPm,
    #[serde(alias = "공휴일")]
    PublicHoliday,
    #[serde(alias = "공가")]
    PublicDutyLeave,
    #[serde(alias = "기타")]
    Other,
}

impl WorkType {
    /// Label printed on the report
    pub fn label(self) -> &'static str {
        match self {
            WorkType::InOffice => "내근",
            WorkType::FieldWork => "외근",
            WorkType::AnnualLeave => "연차",
            WorkType::HalfDayAm => "오전반차",
            WorkType::HalfDayPm => "오후반차",
            WorkType::PublicHoliday => "공휴일",
            WorkType::PublicDutyLeave => "공가",
            WorkType::Other => "기타",
        }
    }

    /// Leave-like days collapse to a single status row when nothing was logged
    pub fn is_leave(self) -> bool {
        matches!(
            self,
            WorkType::AnnualLeave
                | WorkType::HalfDayAm
                | WorkType::HalfDayPm
                | WorkType::PublicHoliday
                | WorkType::PublicDutyLeave
        )
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One job entry of an employee on a given day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// Owning employee
    pub employee_id: EmployeeId,
    /// Calendar date of the work
    pub date: NaiveDate,
    /// Short title
    pub title: String,
    /// Free text; every embedded newline starts a new visual line
    #[serde(default)]
    pub content: String,
    /// Associated project name
    #[serde(default)]
    pub project: Option<String>,
    /// Display position among the same day's records
    #[serde(default)]
    pub order: u32,
}

impl WorkRecord {
    /// Create a record with empty content and order 0
    pub fn new(employee_id: EmployeeId, date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            employee_id,
            date,
            title: title.into(),
            content: String::new(),
            project: None,
            order: 0,
        }
    }

    /// Set the content text
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the project name
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the ordering index
    pub fn order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Visual lines of the content.
    ///
    /// Every line is kept verbatim, empty and trailing ones included, so
    /// content with N newlines yields N + 1 lines. Whitespace-only content
    /// yields no lines.
    pub fn content_lines(&self) -> Vec<&str> {
        if self.content.trim().is_empty() {
            return Vec::new();
        }
        self.content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect()
    }
}

/// Attendance status of an employee on one day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyStatusRecord {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub work_type: WorkType,
    /// Display name of a public holiday
    #[serde(default)]
    pub holiday_name: Option<String>,
}

impl DailyStatusRecord {
    pub fn new(employee_id: EmployeeId, date: NaiveDate, work_type: WorkType) -> Self {
        Self {
            employee_id,
            date,
            work_type,
            holiday_name: None,
        }
    }

    /// Set the holiday display name
    pub fn holiday_name(mut self, name: impl Into<String>) -> Self {
        self.holiday_name = Some(name.into());
        self
    }

    /// Text of the status row, e.g. `연차` or `공휴일 · Lunar New Year`
    pub fn display_label(&self) -> String {
        match (&self.work_type, self.holiday_name.as_deref().map(str::trim)) {
            (WorkType::PublicHoliday, Some(name)) if !name.is_empty() => {
                format!("{} · {}", self.work_type.label(), name)
            }
            _ => self.work_type.label().to_string(),
        }
    }
}

/// Free-text "important information" note for one week
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyNoteRecord {
    pub employee_id: EmployeeId,
    /// Monday of the week the note belongs to
    pub week_start: NaiveDate,
    pub content: String,
}

impl WeeklyNoteRecord {
    pub fn new(employee_id: EmployeeId, week_start: NaiveDate, content: impl Into<String>) -> Self {
        Self {
            employee_id,
            week_start,
            content: content.into(),
        }
    }

    /// True when the note has nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Person the report is written for, shown in the header line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
}

impl Reporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            department: None,
        }
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// `보고자 : {department} {name}`
    pub fn header_line(&self) -> String {
        match self.department.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(department) => format!("보고자 : {} {}", department, self.name),
            None => format!("보고자 : {}", self.name),
        }
    }
}

// ============================================================================
// Report Request
// ============================================================================

/// Everything a generator needs to produce one employee's two-week report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub employee_id: EmployeeId,
    /// Monday of the current week; the window covers this week and the next
    pub week_start: NaiveDate,
    #[serde(default)]
    pub work_records: Vec<WorkRecord>,
    #[serde(default)]
    pub daily_statuses: Vec<DailyStatusRecord>,
    #[serde(default)]
    pub weekly_note: Option<WeeklyNoteRecord>,
    #[serde(default)]
    pub reporter: Option<Reporter>,
    /// Date printed as the report's writing date
    #[serde(default)]
    pub written_on: Option<NaiveDate>,
}

impl ReportRequest {
    pub fn new(employee_id: EmployeeId, week_start: NaiveDate) -> Self {
        Self {
            employee_id,
            week_start,
            work_records: Vec::new(),
            daily_statuses: Vec::new(),
            weekly_note: None,
            reporter: None,
            written_on: None,
        }
    }

    /// Add a work record
    pub fn record(mut self, record: WorkRecord) -> Self {
        self.work_records.push(record);
        self
    }

    /// Add a daily status
    pub fn status(mut self, status: DailyStatusRecord) -> Self {
        self.daily_statuses.push(status);
        self
    }

    /// Attach the weekly note
    pub fn note(mut self, note: WeeklyNoteRecord) -> Self {
        self.weekly_note = Some(note);
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn written_on(mut self, date: NaiveDate) -> Self {
        self.written_on = Some(date);
        self
    }

    /// Records of one day sorted by their `order` field
    pub fn records_on(&self, date: NaiveDate) -> Vec<&WorkRecord> {
        let mut records: Vec<&WorkRecord> =
            self.work_records.iter().filter(|r| r.date == date).collect();
        records.sort_by_key(|r| r.order);
        records
    }

    /// Status of one day, if any
    pub fn status_on(&self, date: NaiveDate) -> Option<&DailyStatusRecord> {
        self.daily_statuses.iter().find(|s| s.date == date)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Produces a finished report document from a request
pub trait ReportRenderer {
    /// Generate the report; a failed call yields no partial output
    fn generate(&self, request: &ReportRequest) -> Result<Vec<u8>, ReportError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Report generation error
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Template unreadable: {0}")]
    TemplateUnreadable(String),

    #[error("Invalid report window: {0}")]
    InvalidWindow(String),

    #[error("Out of capacity in {lane} lane: {demand} rows needed, {capacity} available")]
    OutOfCapacity {
        lane: Lane,
        demand: usize,
        capacity: usize,
    },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Sheet error: {0}")]
    Sheet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),
}

// ============================================================================
// Tests
// ============================================================================
