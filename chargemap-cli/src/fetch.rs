//! Fetch command: download from Overpass, aggregate, write the snapshot.

use std::num::NonZeroUsize;
use std::time::Duration;

use camino::Utf8PathBuf;
use chargemap_data::{
    OverpassClient, OverpassClientConfig, OverpassEndpoint, parse_response, write_raw,
};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_KEEP_INTERMEDIATE, ARG_OUTFILE_COMPRESSED, ARG_OUTFILE_RAW, ARG_OVERPASS_API_ENDPOINT,
    ARG_THREADS, ARG_TIMEOUT_SECONDS, CliError, DEFAULT_OUTFILE_COMPRESSED, DEFAULT_OUTFILE_RAW,
    DEFAULT_TIMEOUT_SECONDS, ENV_OVERPASS_API_ENDPOINT, aggregate_and_write, format_bytes,
};

/// CLI arguments for the `fetch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Query an Overpass API endpoint for every charging station \
                 and charge point, nest charge points under the stations \
                 that enclose them, and write a gzip-compressed JSON \
                 snapshot.",
    about = "Build a snapshot from an Overpass API endpoint"
)]
#[ortho_config(prefix = "CHARGEMAP")]
pub(crate) struct FetchArgs {
    /// Overpass endpoint: `switzerland`, `world`, or an http(s) URL.
    #[arg(long = ARG_OVERPASS_API_ENDPOINT, value_name = "endpoint")]
    #[serde(default)]
    pub(crate) overpass_api_endpoint: Option<String>,
    /// Server-side query timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECONDS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_seconds: Option<u64>,
    /// Keep the raw Overpass response next to the snapshot.
    #[arg(
        long = ARG_KEEP_INTERMEDIATE,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) keep_intermediate: Option<bool>,
    /// Where to keep the raw Overpass response.
    #[arg(long = ARG_OUTFILE_RAW, value_name = "path")]
    #[serde(default)]
    pub(crate) outfile_raw: Option<Utf8PathBuf>,
    /// Where to write the compressed snapshot.
    #[arg(long = ARG_OUTFILE_COMPRESSED, value_name = "path")]
    #[serde(default)]
    pub(crate) outfile_compressed: Option<Utf8PathBuf>,
    /// Worker threads for matching; defaults to one per core.
    #[arg(long = ARG_THREADS, value_name = "count")]
    #[serde(default)]
    pub(crate) threads: Option<NonZeroUsize>,
}

impl FetchArgs {
    pub(crate) fn into_config(self) -> Result<FetchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FetchConfig::try_from(merged)
    }
}

/// Resolved `fetch` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchConfig {
    pub(crate) endpoint: OverpassEndpoint,
    pub(crate) timeout_seconds: u64,
    pub(crate) keep_intermediate: bool,
    pub(crate) outfile_raw: Utf8PathBuf,
    pub(crate) outfile_compressed: Utf8PathBuf,
    pub(crate) threads: Option<NonZeroUsize>,
}

impl TryFrom<FetchArgs> for FetchConfig {
    type Error = CliError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let endpoint = args
            .overpass_api_endpoint
            .ok_or(CliError::MissingArgument {
                field: ARG_OVERPASS_API_ENDPOINT,
                env: ENV_OVERPASS_API_ENDPOINT,
            })?
            .parse::<OverpassEndpoint>()?;
        Ok(Self {
            endpoint,
            timeout_seconds: args.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            keep_intermediate: args.keep_intermediate.unwrap_or(false),
            outfile_raw: args
                .outfile_raw
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTFILE_RAW)),
            outfile_compressed: args
                .outfile_compressed
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTFILE_COMPRESSED)),
            threads: args.threads,
        })
    }
}

/// Supplies the raw Overpass response for a fetch invocation.
pub(crate) trait OverpassSource {
    fn download(&self, config: &FetchConfig) -> Result<Vec<u8>, CliError>;
}

pub(crate) struct HttpOverpassSource;

impl OverpassSource for HttpOverpassSource {
    fn download(&self, config: &FetchConfig) -> Result<Vec<u8>, CliError> {
        let client = OverpassClient::with_config(
            OverpassClientConfig::new(config.endpoint.clone())
                .with_query_timeout(Duration::from_secs(config.timeout_seconds)),
        )?;
        Ok(client.download()?)
    }
}

pub(crate) fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    run_fetch_with(&config, &HttpOverpassSource)
}

pub(crate) fn run_fetch_with(
    config: &FetchConfig,
    source: &dyn OverpassSource,
) -> Result<(), CliError> {
    info!(
        "1: Downloading data through Overpass API (this may take up to {} seconds...)",
        config.timeout_seconds
    );
    let body = source.download(config)?;
    let response = parse_response(&body)?;
    if config.keep_intermediate {
        let bytes = write_raw(&config.outfile_raw, &body)?;
        info!(
            "Kept raw response: {} ({})",
            config.outfile_raw,
            format_bytes(bytes)
        );
    }
    aggregate_and_write(
        &response.into_feature_set(),
        config.threads,
        &config.outfile_compressed,
    )
}
