//! Report generation over a template copy

use jobsheet_core::{ReportError, ReportRenderer, ReportRequest};
use jobsheet_layout::{LayoutConfig, ReportLayoutEngine, SheetGrid};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use crate::package::{write_archive, Package};
use crate::shared_strings::{parse_shared_strings, SHARED_STRINGS_PART};
use crate::styles::{StyleSheet, STYLES_PART};
use crate::template::TemplateAsset;
use crate::workbook::{request_full_calc, sheet_part_path, WORKBOOK_PART};
use crate::worksheet::WorksheetPart;

/// A decoded template copy ready to be filled
struct WorkingCopy {
    package: Package,
    sheet: WorksheetPart,
    grid: SheetGrid,
}

impl WorkingCopy {
    fn open(bytes: &[u8], sheet_index: usize) -> Result<Self, ReportError> {
        let package = Package::from_bytes(bytes)?;
        let path = sheet_part_path(&package, sheet_index)?;
        let strings = match package.part(SHARED_STRINGS_PART) {
            Some(xml) => parse_shared_strings(xml)?,
            None => Vec::new(),
        };
        let (sheet, grid) = WorksheetPart::parse(&path, package.required_part(&path)?, &strings)?;
        debug!(
            sheet = %path,
            strings = strings.len(),
            merges = grid.merges().count(),
            "template decoded"
        );
        Ok(Self {
            package,
            sheet,
            grid,
        })
    }

    fn finish(mut self) -> Result<Vec<u8>, ReportError> {
        let mut styles = StyleSheet::parse(self.package.required_part(STYLES_PART)?)?;
        let sheet_xml = self.sheet.to_bytes(&self.grid, &mut styles);
        self.package.set_part(self.sheet.name(), sheet_xml);
        if styles.is_dirty() {
            self.package.set_part(STYLES_PART, styles.to_bytes());
        }
        let workbook = request_full_calc(self.package.required_part(WORKBOOK_PART)?)?;
        self.package.set_part(WORKBOOK_PART, workbook);
        self.package.to_bytes()
    }
}

/// Decode the working sheet of an XLSX file into a grid
pub fn read_sheet(bytes: &[u8], sheet_index: usize) -> Result<SheetGrid, ReportError> {
    WorkingCopy::open(bytes, sheet_index).map(|copy| copy.grid)
}

/// Fills the weekly report template for one request at a time
#[derive(Clone, Debug)]
pub struct ReportGenerator {
    template: TemplateAsset,
    engine: ReportLayoutEngine,
}

impl ReportGenerator {
    /// Generator over a template laid out like the default `LayoutConfig`
    pub fn new(template: TemplateAsset) -> Self {
        Self {
            template,
            engine: ReportLayoutEngine::default(),
        }
    }

    /// Generator over the standard template of the default layout
    pub fn standard() -> Result<Self, ReportError> {
        TemplateAsset::standard(&LayoutConfig::default()).map(Self::new)
    }

    /// Use a different template geometry
    pub fn with_layout(mut self, config: LayoutConfig) -> Result<Self, ReportError> {
        self.engine = ReportLayoutEngine::new(config)?;
        Ok(self)
    }

    pub fn with_template(mut self, template: TemplateAsset) -> Self {
        self.template = template;
        self
    }

    pub fn layout(&self) -> &LayoutConfig {
        self.engine.config()
    }

    pub fn template(&self) -> &TemplateAsset {
        &self.template
    }

    /// Generate every request in parallel and pack the reports into one zip.
    ///
    /// Entries are named `{name}_주간보고서_{week start}.xlsx`. The first
    /// failing request fails the whole batch.
    pub fn generate_batch(&self, requests: &[ReportRequest]) -> Result<Vec<u8>, ReportError> {
        let reports = requests
            .par_iter()
            .map(|request| self.generate(request))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let names: Vec<String> = requests
            .iter()
            .map(|request| {
                let base = batch_entry_stem(request);
                let mut name = format!("{base}.xlsx");
                let mut n = 2;
                while !seen.insert(name.clone()) {
                    name = format!("{base} ({n}).xlsx");
                    n += 1;
                }
                name
            })
            .collect();

        info!(reports = reports.len(), "batch generated");
        write_archive(
            names
                .iter()
                .map(String::as_str)
                .zip(reports.iter().map(Vec::as_slice)),
        )
    }
}

/// `{name}_주간보고서_{YYYY-MM-DD}`, falling back to the employee id
pub fn batch_entry_stem(request: &ReportRequest) -> String {
    let name = request
        .reporter
        .as_ref()
        .map(|r| r.name.trim())
        .filter(|n| !n.is_empty())
        .map(|n| {
            n.chars()
                .map(|c| match c {
                    '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                    other => other,
                })
                .collect::<String>()
        })
        .unwrap_or_else(|| request.employee_id.to_string());
    format!("{}_주간보고서_{}", name, request.week_start.format("%Y-%m-%d"))
}

impl ReportRenderer for ReportGenerator {
    #[instrument(skip_all, fields(employee = request.employee_id, week_start = %request.week_start))]
    fn generate(&self, request: &ReportRequest) -> Result<Vec<u8>, ReportError> {
        let mut copy = WorkingCopy::open(self.template.bytes(), self.engine.config().sheet_index)?;
        let layout = self.engine.apply(&mut copy.grid, request)?;
        let bytes = copy.finish()?;
        info!(
            current_rows = layout.lanes[0].used,
            next_rows = layout.lanes[1].used,
            bytes = bytes.len(),
            "report generated"
        );
        Ok(bytes)
    }
}
