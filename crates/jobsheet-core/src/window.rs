//! Two-week report window and request validation
//!
//! A report covers the weekdays of the week starting at `week_start`
//! (the current week) and of the following week (the next week). Each week
//! is laid out in its own lane of the sheet.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{ReportError, ReportRequest};

/// Number of reported days per week (Monday to Friday)
pub const WEEKDAYS: usize = 5;

/// Days from the window's first Monday to its last Friday
const WINDOW_DAYS: u64 = 11;

/// Column group of the sheet holding one week
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lane {
    /// Work done this week
    CurrentWeek,
    /// Work planned for next week
    NextWeek,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::CurrentWeek, Lane::NextWeek];

    /// Days between the window start and this lane's Monday
    fn offset_days(self) -> u64 {
        match self {
            Lane::CurrentWeek => 0,
            Lane::NextWeek => 7,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::CurrentWeek => f.write_str("current-week"),
            Lane::NextWeek => f.write_str("next-week"),
        }
    }
}

/// Monday of the week containing `date`
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// The validated two-week window `[week_start, week_start + 11]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportWindow {
    week_start: NaiveDate,
}

impl ReportWindow {
    /// Create a window; `week_start` must be a Monday
    pub fn new(week_start: NaiveDate) -> Result<Self, ReportError> {
        if week_start.weekday() != Weekday::Mon {
            return Err(ReportError::InvalidWindow(format!(
                "week start {week_start} is a {}, expected Monday",
                week_start.weekday()
            )));
        }
        if week_start.checked_add_days(Days::new(WINDOW_DAYS)).is_none() {
            return Err(ReportError::InvalidWindow(format!(
                "week start {week_start} leaves no room for a two-week window"
            )));
        }
        Ok(Self { week_start })
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    /// Friday of the next week
    pub fn end(&self) -> NaiveDate {
        self.offset(WINDOW_DAYS)
    }

    /// Monday of the given lane's week
    pub fn lane_start(&self, lane: Lane) -> NaiveDate {
        self.offset(lane.offset_days())
    }

    /// Monday to Friday of the given lane
    pub fn days(&self, lane: Lane) -> [NaiveDate; WEEKDAYS] {
        let start = lane.offset_days();
        let mut days = [self.week_start; WEEKDAYS];
        for (offset, day) in days.iter_mut().enumerate() {
            *day = self.offset(start + offset as u64);
        }
        days
    }

    /// `week_start + days`; `new` guarantees the whole window is representable
    fn offset(&self, days: u64) -> NaiveDate {
        self.week_start
            .checked_add_days(Days::new(days))
            .unwrap_or(self.week_start)
    }

    /// Lane and weekday index (0 = Monday) of a date inside the window
    pub fn locate(&self, date: NaiveDate) -> Option<(Lane, usize)> {
        Lane::ALL.into_iter().find_map(|lane| {
            self.days(lane)
                .iter()
                .position(|d| *d == date)
                .map(|idx| (lane, idx))
        })
    }

    fn check_date(&self, date: NaiveDate, what: &str) -> Result<(), ReportError> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Err(ReportError::InvalidWindow(format!(
                "{what} dated {date} falls on a weekend"
            )));
        }
        if self.locate(date).is_none() {
            return Err(ReportError::InvalidWindow(format!(
                "{what} dated {date} is outside {}..={}",
                self.week_start,
                self.end()
            )));
        }
        Ok(())
    }
}

impl ReportRequest {
    /// Check the request against the window and per-employee key invariants.
    ///
    /// Runs before any layout work; the first violation is returned.
    pub fn validate(&self) -> Result<ReportWindow, ReportError> {
        let window = ReportWindow::new(self.week_start)?;

        let mut record_keys = HashSet::new();
        for record in &self.work_records {
            if record.employee_id != self.employee_id {
                return Err(ReportError::MalformedRecord(format!(
                    "work record '{}' belongs to employee {}, not {}",
                    record.title, record.employee_id, self.employee_id
                )));
            }
            window.check_date(record.date, "work record")?;
            if !record_keys.insert((record.date, record.order)) {
                return Err(ReportError::MalformedRecord(format!(
                    "duplicate work record order {} on {}",
                    record.order, record.date
                )));
            }
        }

        let mut status_days = HashSet::new();
        for status in &self.daily_statuses {
            if status.employee_id != self.employee_id {
                return Err(ReportError::MalformedRecord(format!(
                    "daily status on {} belongs to employee {}, not {}",
                    status.date, status.employee_id, self.employee_id
                )));
            }
            window.check_date(status.date, "daily status")?;
            if !status_days.insert(status.date) {
                return Err(ReportError::MalformedRecord(format!(
                    "more than one daily status on {}",
                    status.date
                )));
            }
        }

        if let Some(note) = &self.weekly_note {
            if note.employee_id != self.employee_id {
                return Err(ReportError::MalformedRecord(format!(
                    "weekly note belongs to employee {}, not {}",
                    note.employee_id, self.employee_id
                )));
            }
            if note.week_start != window.week_start() {
                return Err(ReportError::MalformedRecord(format!(
                    "weekly note is for the week of {}, report week starts {}",
                    note.week_start,
                    window.week_start()
                )));
            }
        }

        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DailyStatusRecord, WeeklyNoteRecord, WorkRecord, WorkType};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn window_requires_monday() {
        assert!(ReportWindow::new(date(2026, 2, 9)).is_ok());
        let err = ReportWindow::new(date(2026, 2, 10)).unwrap_err();
        assert!(matches!(err, ReportError::InvalidWindow(_)));
    }

    #[test]
    fn window_past_the_calendar_end_is_rejected() {
        let last_monday = week_start_of(NaiveDate::MAX);
        assert_eq!(last_monday.weekday(), Weekday::Mon);
        let err = ReportWindow::new(last_monday).unwrap_err();
        assert!(matches!(err, ReportError::InvalidWindow(_)));

        let err = ReportRequest::new(1, last_monday).validate().unwrap_err();
        assert!(matches!(err, ReportError::InvalidWindow(_)));
    }

    #[test]
    fn window_spans_two_weeks() {
        let window = ReportWindow::new(date(2026, 2, 9)).unwrap();
        assert_eq!(window.end(), date(2026, 2, 20));
        assert_eq!(window.days(Lane::CurrentWeek)[4], date(2026, 2, 13));
        assert_eq!(window.days(Lane::NextWeek)[0], date(2026, 2, 16));
    }

    #[test]
    fn locate_maps_dates_to_lanes() {
        let window = ReportWindow::new(date(2026, 2, 9)).unwrap();
        assert_eq!(window.locate(date(2026, 2, 11)), Some((Lane::CurrentWeek, 2)));
        assert_eq!(window.locate(date(2026, 2, 20)), Some((Lane::NextWeek, 4)));
        assert_eq!(window.locate(date(2026, 2, 14)), None);
        assert_eq!(window.locate(date(2026, 2, 23)), None);
    }

    #[test]
    fn week_start_of_any_day() {
        assert_eq!(week_start_of(date(2026, 2, 9)), date(2026, 2, 9));
        assert_eq!(week_start_of(date(2026, 2, 13)), date(2026, 2, 9));
        assert_eq!(week_start_of(date(2026, 2, 15)), date(2026, 2, 9));
    }

    #[test]
    fn weekend_record_is_rejected() {
        let monday = date(2026, 2, 9);
        let request =
            ReportRequest::new(1, monday).record(WorkRecord::new(1, date(2026, 2, 14), "sat"));
        let err = request.validate().unwrap_err();
        assert!(matches!(err, ReportError::InvalidWindow(_)), "{err}");
    }

    #[test]
    fn out_of_window_status_is_rejected() {
        let monday = date(2026, 2, 9);
        let request = ReportRequest::new(1, monday).status(DailyStatusRecord::new(
            1,
            date(2026, 2, 23),
            WorkType::InOffice,
        ));
        assert!(matches!(
            request.validate(),
            Err(ReportError::InvalidWindow(_))
        ));
    }

    #[test]
    fn duplicate_order_is_malformed() {
        let monday = date(2026, 2, 9);
        let request = ReportRequest::new(1, monday)
            .record(WorkRecord::new(1, monday, "a").order(1))
            .record(WorkRecord::new(1, monday, "b").order(1));
        assert!(matches!(
            request.validate(),
            Err(ReportError::MalformedRecord(_))
        ));
    }

    #[test]
    fn same_order_on_different_days_is_fine() {
        let monday = date(2026, 2, 9);
        let request = ReportRequest::new(1, monday)
            .record(WorkRecord::new(1, monday, "a").order(1))
            .record(WorkRecord::new(1, date(2026, 2, 10), "b").order(1));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn duplicate_status_is_malformed() {
        let monday = date(2026, 2, 9);
        let request = ReportRequest::new(1, monday)
            .status(DailyStatusRecord::new(1, monday, WorkType::InOffice))
            .status(DailyStatusRecord::new(1, monday, WorkType::FieldWork));
        assert!(matches!(
            request.validate(),
            Err(ReportError::MalformedRecord(_))
        ));
    }

    #[test]
    fn foreign_employee_is_malformed() {
        let monday = date(2026, 2, 9);
        let request = ReportRequest::new(1, monday).record(WorkRecord::new(2, monday, "x"));
        assert!(matches!(
            request.validate(),
            Err(ReportError::MalformedRecord(_))
        ));
    }

    #[test]
    fn note_for_other_week_is_malformed() {
        let monday = date(2026, 2, 9);
        let request =
            ReportRequest::new(1, monday).note(WeeklyNoteRecord::new(1, date(2026, 2, 2), "n"));
        assert!(matches!(
            request.validate(),
            Err(ReportError::MalformedRecord(_))
        ));
    }

    #[test]
    fn window_check_runs_before_record_checks() {
        let request = ReportRequest::new(1, date(2026, 2, 10))
            .record(WorkRecord::new(2, date(2026, 2, 10), "x"));
        assert!(matches!(
            request.validate(),
            Err(ReportError::InvalidWindow(_))
        ));
    }
}
