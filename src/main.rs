//! # labelpress CLI
//!
//! Command-line front end for batch label export.
//!
//! ## Usage
//!
//! ```bash
//! # Export one page per row to labels.pdf
//! labelpress export --layout layout.json --data table.json
//!
//! # Custom output path and export settings
//! labelpress export --layout layout.json --data table.json --config export.json --out out.pdf
//!
//! # Render page 3 to a PNG
//! labelpress preview --layout layout.json --data table.json --page 3 --png page3.png
//!
//! # List canvas size presets
//! labelpress sizes
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{Config, WriteLogger};

use labelpress::{
    Canvas, ExportConfig, Exporter, ImportedTable, LabelError, LabelSize, binding::BindingIssue,
};

/// labelpress - data-driven label layouts to PDF
#[derive(Parser, Debug)]
#[command(name = "labelpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every row of the table into one PDF
    Export {
        /// Layout file (JSON)
        #[arg(long, value_name = "FILE")]
        layout: PathBuf,

        /// Table file (JSON: {"headers": [...], "rows": [[...]]})
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// Export settings (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output path (defaults to the configured file name)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Oversampling factor for page bitmaps
        #[arg(long)]
        scale: Option<f32>,

        /// Abort on unencodable values instead of drawing placeholders
        #[arg(long)]
        strict: bool,
    },

    /// Render one page to a PNG
    Preview {
        #[arg(long, value_name = "FILE")]
        layout: PathBuf,

        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        /// Output PNG path
        #[arg(long, value_name = "FILE")]
        png: PathBuf,
    },

    /// List canvas size presets
    Sizes,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // A second init only fails if a logger is already installed.
    let _ = WriteLogger::init(level, Config::default(), std::io::stderr());
}

fn run(command: Commands) -> Result<(), LabelError> {
    match command {
        Commands::Export {
            layout,
            data,
            config,
            out,
            scale,
            strict,
        } => {
            let canvas = load_layout(&layout)?;
            let table = load_table(data.as_deref())?;
            let mut config = load_config(config.as_deref())?;
            if let Some(scale) = scale {
                config.scale = scale;
            }
            config.strict_encoding |= strict;

            let path = out.unwrap_or_else(|| PathBuf::from(&config.file_name));
            let mut exporter = Exporter::new(config)?;
            let report = exporter.export_to(&canvas, &table, &path)?;

            for issue in &report.issues {
                match issue {
                    BindingIssue::MissingBinding { column, .. } => {
                        eprintln!("warning: column '{}' not found in table", column)
                    }
                    BindingIssue::ColumnLengthMismatch {
                        column,
                        len,
                        page_count,
                    } => eprintln!(
                        "warning: column '{}' has {} of {} values",
                        column, len, page_count
                    ),
                }
            }
            for placeholder in &report.placeholders {
                eprintln!(
                    "warning: page {}: {}",
                    placeholder.page + 1,
                    placeholder.reason
                );
            }

            println!(
                "Wrote {} page(s) ({:.2}x{:.2} {}) to {}",
                report.pages,
                report.page_size.width,
                report.page_size.height,
                report.page_size.unit.suffix(),
                report.path.display()
            );
        }

        Commands::Preview {
            layout,
            data,
            config,
            page,
            png,
        } => {
            let canvas = load_layout(&layout)?;
            let table = load_table(data.as_deref())?;
            let config = load_config(config.as_deref())?;

            let mut exporter = Exporter::new(config)?;
            let rendered = exporter.preview(&canvas, &table, page.saturating_sub(1))?;
            rendered
                .bitmap
                .save(&png)
                .map_err(|e| LabelError::Image(format!("Failed to save PNG: {}", e)))?;
            println!("Saved page {} to {}", page, png.display());
        }

        Commands::Sizes => {
            println!("Canvas presets:");
            for size in LabelSize::PRESETS {
                let px = size.pixels();
                println!(
                    "  {:<14} {:<12} {}x{} px",
                    size.name(),
                    size.to_string(),
                    px.width,
                    px.height
                );
            }
        }
    }

    Ok(())
}

fn load_layout(path: &Path) -> Result<Canvas, LabelError> {
    let json = std::fs::read_to_string(path)?;
    Canvas::from_json(&json)
}

fn load_table(path: Option<&Path>) -> Result<ImportedTable, LabelError> {
    match path {
        Some(path) => ImportedTable::from_json(&std::fs::read_to_string(path)?),
        None => Ok(ImportedTable::new()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig, LabelError> {
    match path {
        Some(path) => ExportConfig::from_json_file(path),
        None => Ok(ExportConfig::default()),
    }
}
