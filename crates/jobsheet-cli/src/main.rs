//! jobsheet CLI - Weekly Job Report Generator
//!
//! Command-line interface for drawing the report template, filling it from
//! JSON requests, and reading generated reports back.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use jobsheet_core::{week_start_of, ReportRenderer, ReportRequest};
use jobsheet_layout::LayoutConfig;
use jobsheet_render::{build_standard_template, summarize, ReportGenerator, TemplateAsset};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "jobsheet")]
#[command(author, version, about = "Weekly job report generator", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the standard report template
    Template {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Layout file (TOML)
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Generate one report
    Generate {
        /// Request file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Template file (standard form if not specified)
        #[arg(short, long, env = "JOBSHEET_TEMPLATE")]
        template: Option<PathBuf>,

        /// Layout file (TOML)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Report the week containing this date instead of the request's
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Generate many reports into one zip archive
    Batch {
        /// Request list file (JSON array)
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive path
        #[arg(short, long)]
        output: PathBuf,

        /// Template file (standard form if not specified)
        #[arg(short, long, env = "JOBSHEET_TEMPLATE")]
        template: Option<PathBuf>,

        /// Layout file (TOML)
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Print the contents of a generated report
    Inspect {
        /// Report file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Layout file (TOML)
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Some(Commands::Template { output, layout }) => {
            let config = load_layout(layout.as_deref())?;
            let bytes = build_standard_template(&config)?;
            write_output(&output, &bytes)?;
        }
        Some(Commands::Generate {
            input,
            output,
            template,
            layout,
            date,
        }) => {
            let mut request: ReportRequest = read_json(&input)?;
            if let Some(date) = date {
                request.week_start = week_start_of(date);
            }
            let generator = load_generator(template.as_deref(), layout.as_deref())?;
            let bytes = generator
                .generate(&request)
                .with_context(|| format!("Failed to generate report from {}", input.display()))?;
            write_output(&output, &bytes)?;
        }
        Some(Commands::Batch {
            input,
            output,
            template,
            layout,
        }) => {
            let requests: Vec<ReportRequest> = read_json(&input)?;
            let generator = load_generator(template.as_deref(), layout.as_deref())?;
            let bytes = generator
                .generate_batch(&requests)
                .with_context(|| format!("Failed to generate batch from {}", input.display()))?;
            write_output(&output, &bytes)?;
        }
        Some(Commands::Inspect { file, layout }) => {
            let config = load_layout(layout.as_deref())?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = summarize(&bytes, &config)
                .with_context(|| format!("Failed to inspect {}", file.display()))?;
            print!("{summary}");
        }
        None => {
            println!("jobsheet - Weekly Job Report Generator");
            println!("Run with --help for usage information");
        }
    }

    Ok(())
}

fn load_layout(path: Option<&Path>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout {}", path.display()))?;
    LayoutConfig::from_toml_str(&text).with_context(|| format!("Invalid layout {}", path.display()))
}

fn load_generator(template: Option<&Path>, layout: Option<&Path>) -> Result<ReportGenerator> {
    let config = load_layout(layout)?;
    let asset = match template {
        Some(path) => TemplateAsset::load(path)?,
        None => TemplateAsset::standard(&config)?,
    };
    ReportGenerator::new(asset)
        .with_layout(config)
        .context("Invalid layout")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "written");
    println!("Wrote {}", path.display());
    Ok(())
}
