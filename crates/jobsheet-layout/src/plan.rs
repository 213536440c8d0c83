//! Day planning
//!
//! Turns the records of one lane's five weekdays into ordered blocks. A block
//! is the unit the allocator places without splitting.

use chrono::{Datelike, NaiveDate};
use jobsheet_core::{DailyStatusRecord, Lane, ReportRequest, ReportWindow, WorkRecord};

use crate::config::LayoutConfig;

const WEEKDAY_NAMES: [&str; 5] = ["월", "화", "수", "목", "금"];

/// Heading used when a record has neither project nor title
pub const UNTITLED: &str = "기타";

/// One unsplittable unit of a day
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Single row with a status label
    Status(String),
    /// Single row with nothing but the day label
    Blank,
    /// Heading row followed by one row per content line
    Record { heading: String, lines: Vec<String> },
}

impl BlockKind {
    /// Rows this block occupies
    pub fn rows(&self) -> usize {
        match self {
            BlockKind::Status(_) | BlockKind::Blank => 1,
            BlockKind::Record { lines, .. } => 1 + lines.len(),
        }
    }
}

/// The blocks of one weekday
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayPlan {
    pub date: NaiveDate,
    /// Day label such as `월(09)`
    pub label: String,
    pub blocks: Vec<BlockKind>,
}

impl DayPlan {
    /// Rows of all blocks plus the spacing between them
    pub fn rows(&self, record_spacing: usize) -> usize {
        let blocks: usize = self.blocks.iter().map(BlockKind::rows).sum();
        blocks + record_spacing * self.blocks.len().saturating_sub(1)
    }
}

/// `월(09)` for Monday the 9th
pub fn day_label(date: NaiveDate) -> String {
    let idx = date.weekday().num_days_from_monday() as usize;
    let name = WEEKDAY_NAMES.get(idx).copied().unwrap_or("");
    format!("{}({:02})", name, date.day())
}

/// `{n}. [{project}] {title}`; newlines in the title collapse to spaces
pub fn record_heading(n: usize, record: &WorkRecord) -> String {
    let title = record
        .title
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let project = record
        .project
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    match (project, title.is_empty()) {
        (Some(project), false) => format!("{n}. [{project}] {title}"),
        (Some(project), true) => format!("{n}. [{project}]"),
        (None, false) => format!("{n}. {title}"),
        (None, true) => format!("{n}. {UNTITLED}"),
    }
}

fn plan_day(
    date: NaiveDate,
    records: &[&WorkRecord],
    status: Option<&DailyStatusRecord>,
    config: &LayoutConfig,
) -> DayPlan {
    let mut blocks = Vec::new();

    match status {
        Some(status) if status.work_type.is_leave() => {
            blocks.push(BlockKind::Status(status.display_label()));
        }
        Some(status) if records.is_empty() => {
            blocks.push(BlockKind::Status(status.display_label()));
        }
        None if records.is_empty() => blocks.push(BlockKind::Blank),
        _ => {}
    }

    for (idx, record) in records.iter().enumerate() {
        blocks.push(BlockKind::Record {
            heading: record_heading(idx + 1, record),
            lines: record
                .content_lines()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
    }

    if config.work_type_footer && !records.is_empty() {
        if let Some(status) = status.filter(|s| !s.work_type.is_leave()) {
            blocks.push(BlockKind::Status(format!("<{}>", status.work_type.label())));
        }
    }

    DayPlan {
        date,
        label: day_label(date),
        blocks,
    }
}

/// Plan the five weekdays of one lane in chronological order
pub fn plan_lane(
    request: &ReportRequest,
    window: &ReportWindow,
    lane: Lane,
    config: &LayoutConfig,
) -> Vec<DayPlan> {
    window
        .days(lane)
        .into_iter()
        .map(|date| {
            let records = request.records_on(date);
            plan_day(date, &records, request.status_on(date), config)
        })
        .collect()
}
