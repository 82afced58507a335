//! Command-line interface for building charging-station snapshots.
#![forbid(unsafe_code)]

use std::num::NonZeroUsize;

use camino::Utf8Path;
use chargemap_core::{Pipeline, RawFeatureSet};
use chargemap_data::write_snapshot;
use clap::{Parser, Subcommand};
use log::info;

mod error;
mod fetch;
mod ingest;

pub use error::CliError;

use fetch::FetchArgs;
use ingest::IngestArgs;

const ARG_OVERPASS_API_ENDPOINT: &str = "overpass-api-endpoint";
const ARG_TIMEOUT_SECONDS: &str = "timeout-seconds";
const ARG_KEEP_INTERMEDIATE: &str = "keep-intermediate";
const ARG_OUTFILE_RAW: &str = "outfile-raw";
const ARG_OUTFILE_COMPRESSED: &str = "outfile-compressed";
const ARG_THREADS: &str = "threads";
const ARG_OSM_PBF: &str = "osm-pbf";
const ENV_OVERPASS_API_ENDPOINT: &str = "CHARGEMAP_CMDS_FETCH_OVERPASS_API_ENDPOINT";
const ENV_OSM_PBF: &str = "CHARGEMAP_CMDS_INGEST_OSM_PBF";

const DEFAULT_TIMEOUT_SECONDS: u64 = 900;
const DEFAULT_OUTFILE_RAW: &str = "overpass-result.json";
const DEFAULT_OUTFILE_COMPRESSED: &str = "charging-stations-osm.json.gz";

/// Run the chargemap CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Fetch(args) => fetch::run_fetch(args),
        Command::Ingest(args) => ingest::run_ingest(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "chargemap",
    about = "Build compressed snapshots of EV charging stations from OpenStreetMap",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download stations and charge points through an Overpass API endpoint.
    Fetch(FetchArgs),
    /// Read stations and charge points from an OSM PBF extract.
    Ingest(IngestArgs),
}

/// Aggregate `features` and write the compressed snapshot.
///
/// Both Overpass and PBF sources deliver WGS84 coordinates.
fn aggregate_and_write(
    features: &RawFeatureSet,
    threads: Option<NonZeroUsize>,
    outfile: &Utf8Path,
) -> Result<(), CliError> {
    info!("2: Processing {} entries", features.len());
    let mut pipeline = Pipeline::default();
    if let Some(threads) = threads {
        pipeline = pipeline.with_threads(threads);
    }
    let result = pipeline.run(features)?;
    info!(
        "Nested {} charge points under {} stations",
        result.charge_point_count(),
        result.count()
    );
    let report = write_snapshot(outfile, &result)?;
    info!("Done: {} ({})", report.path, format_bytes(report.bytes));
    Ok(())
}

/// Render a byte count with a binary unit suffix, e.g. `1.5K`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 'K';
    for next in ['M', 'G'] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1}{unit}")
}

#[cfg(test)]
mod tests;
