//! Focused unit tests covering CLI configuration and command execution.

use super::helpers::{STATION_RESPONSE, StubOverpassSource, Workspace, read_snapshot};
use super::*;
use crate::fetch::{FetchArgs, FetchConfig, run_fetch_with};
use crate::ingest::{IngestArgs, IngestConfig, run_ingest_with};
use chargemap_core::PipelineError;
use chargemap_data::{OverpassEndpoint, OverpassError};
use rstest::rstest;

fn fetch_config(workspace: &Workspace, keep_intermediate: bool) -> FetchConfig {
    FetchConfig {
        endpoint: OverpassEndpoint::World,
        timeout_seconds: 60,
        keep_intermediate,
        outfile_raw: workspace.path("raw/overpass-result.json"),
        outfile_compressed: workspace.path("out/charging-stations-osm.json.gz"),
        threads: NonZeroUsize::new(2),
    }
}

#[rstest]
#[case(0, "0B")]
#[case(1, "1B")]
#[case(512, "512B")]
#[case(1023, "1023B")]
#[case(1024, "1.0K")]
#[case(1536, "1.5K")]
#[case(1024 * 1024 - 1, "1024.0K")]
#[case(1024 * 1024, "1.0M")]
#[case(1024 * 1024 * 3 / 2, "1.5M")]
#[case(1024 * 1024 * 1024, "1.0G")]
#[case(1024 * 1024 * 1024 * 5 / 2, "2.5G")]
#[case(1024 * 1024 * 1024 * 1024, "1024.0G")]
fn formats_byte_counts(#[case] bytes: u64, #[case] expected: &str) {
    assert_eq!(format_bytes(bytes), expected);
}

#[rstest]
fn converting_fetch_without_endpoint_errors() {
    let err = FetchConfig::try_from(FetchArgs::default()).expect_err("missing endpoint");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_OVERPASS_API_ENDPOINT);
            assert_eq!(env, ENV_OVERPASS_API_ENDPOINT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn fetch_config_applies_defaults() {
    let args = FetchArgs {
        overpass_api_endpoint: Some("switzerland".to_owned()),
        ..FetchArgs::default()
    };
    let config = FetchConfig::try_from(args).expect("config should build");
    assert_eq!(config.endpoint, OverpassEndpoint::Switzerland);
    assert_eq!(config.timeout_seconds, 900);
    assert!(!config.keep_intermediate);
    assert_eq!(config.outfile_raw, "overpass-result.json");
    assert_eq!(config.outfile_compressed, "charging-stations-osm.json.gz");
    assert_eq!(config.threads, None);
}

#[rstest]
fn fetch_config_rejects_unknown_endpoint() {
    let args = FetchArgs {
        overpass_api_endpoint: Some("moon".to_owned()),
        ..FetchArgs::default()
    };
    let err = FetchConfig::try_from(args).expect_err("unknown endpoint");
    assert!(matches!(err, CliError::InvalidEndpoint(_)));
    assert!(err.to_string().starts_with("Invalid value 'moon'."));
}

#[rstest]
#[case(&["--keep-intermediate"], Some(true))]
#[case(&["--keep-intermediate", "false"], Some(false))]
#[case(&[], None)]
fn keep_intermediate_flag_parses(#[case] extra: &[&str], #[case] expected: Option<bool>) {
    let mut invocation = vec!["chargemap", "fetch", "--overpass-api-endpoint", "world"];
    invocation.extend_from_slice(extra);
    let cli = Cli::try_parse_from(invocation).expect("arguments parse");
    let Command::Fetch(args) = cli.command else {
        panic!("expected the fetch command");
    };
    assert_eq!(args.keep_intermediate, expected);
}

#[rstest]
fn converting_ingest_without_pbf_errors() {
    let err = IngestConfig::try_from(IngestArgs::default()).expect_err("missing path");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_OSM_PBF);
            assert_eq!(env, ENV_OSM_PBF);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn ingest_validate_sources_distinguishes_missing_and_directories() {
    let workspace = Workspace::new();
    let missing = IngestConfig::try_from(IngestArgs {
        osm_pbf: Some(workspace.path("missing.osm.pbf")),
        ..IngestArgs::default()
    })
    .expect("config should build");
    assert!(matches!(
        missing.validate_sources(),
        Err(CliError::MissingSourceFile { field: ARG_OSM_PBF, .. })
    ));

    std::fs::create_dir(workspace.path("extract")).expect("create dir");
    let directory = IngestConfig {
        osm_pbf: workspace.path("extract"),
        ..missing
    };
    assert!(matches!(
        directory.validate_sources(),
        Err(CliError::SourcePathNotFile { field: ARG_OSM_PBF, .. })
    ));
}

#[rstest]
#[case(false)]
#[case(true)]
fn fetch_writes_snapshot(#[case] keep_intermediate: bool) {
    let workspace = Workspace::new();
    let config = fetch_config(&workspace, keep_intermediate);

    run_fetch_with(&config, &StubOverpassSource(STATION_RESPONSE)).expect("fetch succeeds");

    let snapshot = read_snapshot(&config.outfile_compressed);
    assert_eq!(snapshot.count, 1);
    let station = &snapshot.elements[0];
    assert_eq!(station.id, 500);
    let nested: Vec<u64> = station.charge_points.iter().flatten().map(|cp| cp.id).collect();
    assert_eq!(nested, vec![42]);

    let raw = std::fs::read(&config.outfile_raw).ok();
    if keep_intermediate {
        assert_eq!(raw.as_deref(), Some(STATION_RESPONSE.as_bytes()));
    } else {
        assert!(raw.is_none(), "raw response should not be kept");
    }
}

#[rstest]
#[case(false)]
#[case(true)]
fn empty_overpass_result_writes_nothing(#[case] keep_intermediate: bool) {
    let workspace = Workspace::new();
    let config = fetch_config(&workspace, keep_intermediate);
    let body = r#"{"elements":[],"remark":"runtime error: Query timed out"}"#;

    let err = run_fetch_with(&config, &StubOverpassSource(body)).expect_err("no elements");

    assert!(matches!(err, CliError::Overpass(OverpassError::Empty { .. })));
    assert!(!config.outfile_compressed.exists());
    assert!(!config.outfile_raw.exists(), "raw response must not outlive a failed fetch");
}

#[rstest]
fn empty_extract_fails_without_output() {
    let workspace = Workspace::new();
    let config = IngestConfig {
        osm_pbf: workspace.write("empty.osm.pbf", b""),
        outfile_compressed: workspace.path("stations.json.gz"),
        threads: None,
    };

    let err = run_ingest_with(&config).expect_err("nothing to aggregate");

    assert!(matches!(err, CliError::Pipeline(PipelineError::EmptyInput)));
    assert!(!config.outfile_compressed.exists());
}
