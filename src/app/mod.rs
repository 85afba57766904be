use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, CommandsBackend, OsmImportBackend};
use crate::schema::Area;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input rule file (YAML)
    #[arg(short, long)]
    pub rules: PathBuf,

    /// Output file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Code generation backend (default: osm-import)
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum BackendKind {
    #[value(name = "osm-import")]
    OsmImport,
    #[value(name = "commands")]
    Commands,
}

pub fn backend_label(kind: &BackendKind) -> &'static str {
    match kind {
        BackendKind::OsmImport => "osm-import",
        BackendKind::Commands => "commands",
    }
}

pub fn init_backend(kind: &BackendKind) -> Box<dyn Backend> {
    tracing::info!("Backend: {}", backend_label(kind));
    match kind {
        BackendKind::OsmImport => Box::new(OsmImportBackend),
        BackendKind::Commands => Box::new(CommandsBackend),
    }
}

/// (area count, total rule count) for the startup summary.
pub fn summarize_areas(areas: &[Area]) -> (usize, usize) {
    let rule_count = areas
        .iter()
        .map(|area| {
            area.transit_lines.len()
                + area.transit_stops.len()
                + area.streets.len()
                + area.nature.len()
                + area.buildings.len()
        })
        .sum();
    (areas.len(), rule_count)
}

/// Write the finished unit in one go; the error paths before this point
/// leave no partial output behind.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if path == Path::new("-") {
        std::io::stdout()
            .write_all(contents.as_bytes())
            .context("CLI: Failed to write to stdout")?;
    } else {
        std::fs::write(path, contents)
            .with_context(|| format!("CLI: Failed to write {:?}", path))?;
    }
    Ok(())
}
