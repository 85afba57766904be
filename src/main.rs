mod app;
mod backend;
mod compile;
mod ir;
mod record;
mod schema;

use anyhow::Result;
use clap::Parser;

use app::{BackendKind, Cli, init_backend, summarize_areas, write_output};
use record::load::load_records;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let keeper = load_records(&cli.rules)?;

    // Validate the schema up front; a shape error must abort before any
    // output exists.
    let areas = schema::collect_areas(&keeper)?;
    let (area_count, rule_count) = summarize_areas(&areas);
    tracing::info!("Rules: {} areas, {} classification rules", area_count, rule_count);

    let backend = init_backend(&cli.backend.unwrap_or(BackendKind::OsmImport));

    let start = std::time::Instant::now();
    let output = backend.generate(&keeper)?;
    write_output(&cli.output, &output)?;

    tracing::info!(
        "Done! Wrote {} bytes in {:.2}ms",
        output.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
