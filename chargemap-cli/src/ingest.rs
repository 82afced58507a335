//! Ingest command: read a PBF extract, aggregate, write the snapshot.

use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};
use chargemap_data::ingest_osm_pbf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_OSM_PBF, ARG_OUTFILE_COMPRESSED, ARG_THREADS, CliError,
    DEFAULT_OUTFILE_COMPRESSED, ENV_OSM_PBF, aggregate_and_write,
};

/// CLI arguments for the `ingest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read every charging station and charge point from an \
                 OpenStreetMap PBF extract and write the same snapshot the \
                 fetch command produces. Paths can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Build a snapshot from an OSM PBF extract"
)]
#[ortho_config(prefix = "CHARGEMAP")]
pub(crate) struct IngestArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    pub(crate) osm_pbf: Option<Utf8PathBuf>,
    /// Where to write the compressed snapshot.
    #[arg(long = ARG_OUTFILE_COMPRESSED, value_name = "path")]
    #[serde(default)]
    pub(crate) outfile_compressed: Option<Utf8PathBuf>,
    /// Worker threads for matching; defaults to one per core.
    #[arg(long = ARG_THREADS, value_name = "count")]
    #[serde(default)]
    pub(crate) threads: Option<NonZeroUsize>,
}

impl IngestArgs {
    pub(crate) fn into_config(self) -> Result<IngestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        IngestConfig::try_from(merged)
    }
}

/// Resolved `ingest` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IngestConfig {
    pub(crate) osm_pbf: Utf8PathBuf,
    pub(crate) outfile_compressed: Utf8PathBuf,
    pub(crate) threads: Option<NonZeroUsize>,
}

impl IngestConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.osm_pbf, ARG_OSM_PBF)
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match chargemap_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<IngestArgs> for IngestConfig {
    type Error = CliError;

    fn try_from(args: IngestArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        Ok(Self {
            osm_pbf,
            outfile_compressed: args
                .outfile_compressed
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTFILE_COMPRESSED)),
            threads: args.threads,
        })
    }
}

pub(crate) fn resolve_ingest_config(args: IngestArgs) -> Result<IngestConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn run_ingest(args: IngestArgs) -> Result<(), CliError> {
    let config = resolve_ingest_config(args)?;
    run_ingest_with(&config)
}

pub(crate) fn run_ingest_with(config: &IngestConfig) -> Result<(), CliError> {
    info!("1: Reading {}", config.osm_pbf);
    let features = ingest_osm_pbf(config.osm_pbf.as_std_path())?;
    aggregate_and_write(
        &features,
        config.threads,
        &config.outfile_compressed,
    )
}
