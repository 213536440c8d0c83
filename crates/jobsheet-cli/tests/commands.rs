//! CLI integration tests
//!
//! Each test drives the `jobsheet` binary against files in a temporary
//! directory and checks exit status and the files it leaves behind.

use jobsheet_render::{read_archive, read_sheet};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const REQUEST: &str = r#"{
  "employee_id": 7,
  "week_start": "2026-02-09",
  "work_records": [
    {
      "employee_id": 7,
      "date": "2026-02-09",
      "title": "Boiler inspection",
      "project": "Plant A",
      "content": "pressure test\nvalve check",
      "order": 1
    }
  ],
  "daily_statuses": [
    { "employee_id": 7, "date": "2026-02-10", "work_type": "연차" }
  ],
  "weekly_note": { "employee_id": 7, "week_start": "2026-02-09", "content": "Audit on Thursday" },
  "reporter": { "name": "김철수" }
}"#;

fn jobsheet() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jobsheet"));
    cmd.env_remove("JOBSHEET_TEMPLATE").env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to execute jobsheet")
}

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn cell_text(path: &Path, a1: &str) -> Option<String> {
    let bytes = std::fs::read(path).unwrap();
    let grid = read_sheet(&bytes, 1).unwrap();
    let addr = jobsheet_layout::CellAddr::parse(a1).unwrap();
    grid.text(addr).map(str::to_string)
}

#[test]
fn generate_writes_a_report() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "request.json", REQUEST);
    let output = dir.path().join("report.xlsx");

    let out = run(jobsheet()
        .arg("generate")
        .arg("--input")
        .arg(&input)
        .arg("-o")
        .arg(&output));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(cell_text(&output, "C7").as_deref(), Some("1. [Plant A] Boiler inspection"));
    assert_eq!(cell_text(&output, "C11").as_deref(), Some("연차"));
    assert_eq!(cell_text(&output, "D41").as_deref(), Some("Audit on Thursday"));
}

#[test]
fn date_flag_moves_the_window_to_its_monday() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "request.json", r#"{ "employee_id": 3, "week_start": "2026-02-11" }"#);
    let output = dir.path().join("report.xlsx");

    let out = run(jobsheet().args(["generate", "-i"]).arg(&input).arg("-o").arg(&output));
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());

    let out = run(jobsheet()
        .args(["generate", "--date", "2026-02-18", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(cell_text(&output, "A7").as_deref(), Some("월(16)"));
    assert_eq!(cell_text(&output, "F7").as_deref(), Some("월(23)"));
}

#[test]
fn template_env_var_is_used() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("form.xlsx");
    let out = run(jobsheet().arg("template").arg("-o").arg(&template));
    assert!(out.status.success());

    let input = write(&dir, "request.json", REQUEST);
    let output = dir.path().join("report.xlsx");
    let out = run(jobsheet()
        .env("JOBSHEET_TEMPLATE", &template)
        .arg("generate")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = run(jobsheet()
        .env("JOBSHEET_TEMPLATE", dir.path().join("missing.xlsx"))
        .arg("generate")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("other.xlsx")));
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Template unreadable"));
}

#[test]
fn batch_writes_an_archive() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "requests.json",
        &format!(r#"[{REQUEST}, {{ "employee_id": 9, "week_start": "2026-02-09" }}]"#),
    );
    let output = dir.path().join("reports.zip");

    let out = run(jobsheet().arg("batch").arg("-i").arg(&input).arg("-o").arg(&output));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let entries = read_archive(&std::fs::read(&output).unwrap()).unwrap();
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["김철수_주간보고서_2026-02-09.xlsx", "9_주간보고서_2026-02-09.xlsx"]
    );
}

#[test]
fn overflow_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let records: Vec<String> = (1..=66)
        .map(|n| {
            format!(r#"{{ "employee_id": 1, "date": "2026-02-09", "title": "task {n}", "order": {n} }}"#)
        })
        .collect();
    let input = write(
        &dir,
        "request.json",
        &format!(
            r#"{{ "employee_id": 1, "week_start": "2026-02-09", "work_records": [{}] }}"#,
            records.join(",")
        ),
    );
    let output = dir.path().join("report.xlsx");

    let out = run(jobsheet().arg("generate").arg("-i").arg(&input).arg("-o").arg(&output));
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("74 rows needed, 73 available"));
}

#[test]
fn inspect_prints_the_report() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "request.json", REQUEST);
    let output = dir.path().join("report.xlsx");
    let out = run(jobsheet().arg("generate").arg("-i").arg(&input).arg("-o").arg(&output));
    assert!(out.status.success());

    let out = run(jobsheet().arg("inspect").arg(&output));
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("week of 2026-02-09"), "{stdout}");
    assert!(stdout.contains("1. [Plant A] Boiler inspection"), "{stdout}");
    assert!(stdout.contains("pressure test / valve check"), "{stdout}");
    assert!(stdout.contains("note: Audit on Thursday"), "{stdout}");
}

#[test]
fn custom_layout_round_trip() {
    let dir = TempDir::new().unwrap();
    let layout = write(
        &dir,
        "layout.toml",
        "day_spacing = 0\ndata_ranges = [{ start = 7, end = 20 }, { start = 26, end = 40 }]\nnote_cell = \"D22\"\n",
    );
    let template = dir.path().join("form.xlsx");
    let out = run(jobsheet().arg("template").arg("-o").arg(&template).arg("--layout").arg(&layout));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let input = write(&dir, "request.json", REQUEST);
    let output = dir.path().join("report.xlsx");
    let out = run(jobsheet()
        .arg("generate")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-t")
        .arg(&template)
        .arg("--layout")
        .arg(&layout));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(cell_text(&output, "D22").as_deref(), Some("Audit on Thursday"));
}

#[test]
fn invalid_layout_is_rejected() {
    let dir = TempDir::new().unwrap();
    let layout = write(&dir, "layout.toml", "data_ranges = [{ start = 20, end = 7 }]\n");
    let out = run(jobsheet()
        .arg("template")
        .arg("-o")
        .arg(dir.path().join("form.xlsx"))
        .arg("--layout")
        .arg(&layout));
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid layout"));
}
