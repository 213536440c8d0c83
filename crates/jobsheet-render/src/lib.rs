//! # jobsheet-render
//!
//! XLSX layer of the weekly report generator.
//!
//! This crate provides:
//! - `TemplateAsset`: the template bytes, shared immutably across calls
//! - `build_standard_template`: the report form drawn for a `LayoutConfig`
//! - `ReportGenerator`: decodes a template copy, lets the layout engine fill
//!   it, and patches the working sheet back into the package
//! - Batch generation into one zip archive
//! - `summarize`: read a generated report back
//!
//! Only the working sheet, the styles part (when wrap formats are added)
//! and the workbook's recalculation flag change; every other part of the
//! template is carried over as is.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use jobsheet_core::{ReportRenderer, ReportRequest, WorkRecord};
//! use jobsheet_render::ReportGenerator;
//!
//! let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
//! let request = ReportRequest::new(1, monday)
//!     .record(WorkRecord::new(1, monday, "Inspection").content("Line A\nLine B"));
//!
//! let generator = ReportGenerator::standard().unwrap();
//! let xlsx = generator.generate(&request).unwrap();
//! assert!(xlsx.starts_with(b"PK"));
//! ```

pub mod generator;
pub mod inspect;
pub mod package;
pub mod shared_strings;
pub mod styles;
pub mod template;
pub mod workbook;
pub mod worksheet;
mod xml;

pub use generator::{batch_entry_stem, read_sheet, ReportGenerator};
pub use inspect::{summarize, summarize_grid, ReportSummary, RowSummary};
pub use package::{read_archive, Package};
pub use template::{build_standard_template, TemplateAsset, FORM_SHEET_NAME};
