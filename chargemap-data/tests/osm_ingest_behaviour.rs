//! Behavioural tests for the `ingest_osm_pbf` entry point.

use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};

use chargemap_data::{OsmIngestError, OsmIngestReport, ingest_osm_pbf_report};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

type IngestOutcome = Option<Result<OsmIngestReport, OsmIngestError>>;

#[fixture]
fn workdir() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

#[fixture]
fn target() -> RefCell<Option<PathBuf>> {
    RefCell::new(None)
}

#[fixture]
fn ingestion_result() -> RefCell<IngestOutcome> {
    RefCell::new(None)
}

fn place(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write fixture file");
    path
}

#[given("a path to a missing PBF file")]
fn missing_dataset(
    #[from(workdir)] dir: &TempDir,
    #[from(target)] target: &RefCell<Option<PathBuf>>,
) {
    *target.borrow_mut() = Some(dir.path().join("missing.osm.pbf"));
}

#[given("a file containing invalid PBF data")]
fn invalid_dataset(
    #[from(workdir)] dir: &TempDir,
    #[from(target)] target: &RefCell<Option<PathBuf>>,
) {
    let path = place(dir.path(), "invalid.osm.pbf", b"this is not a protobuf blob");
    *target.borrow_mut() = Some(path);
}

#[given("an empty PBF file")]
fn empty_dataset(#[from(workdir)] dir: &TempDir, #[from(target)] target: &RefCell<Option<PathBuf>>) {
    let path = place(dir.path(), "empty.osm.pbf", b"");
    *target.borrow_mut() = Some(path);
}

#[when("I ingest the PBF file")]
fn ingest_selected(
    #[from(target)] target: &RefCell<Option<PathBuf>>,
    #[from(ingestion_result)] result: &RefCell<IngestOutcome>,
) {
    let outcome = {
        let guard = target.borrow();
        let path = guard.as_ref().expect("target path prepared");
        ingest_osm_pbf_report(path)
    };
    *result.borrow_mut() = Some(outcome);
}

#[then("an open error is returned")]
fn open_error(#[from(ingestion_result)] result: &RefCell<IngestOutcome>) {
    let borrowed = result.borrow();
    match borrowed.as_ref().expect("ingestion was attempted") {
        Err(OsmIngestError::Open { path, .. }) => {
            assert!(path.ends_with("missing.osm.pbf"), "unexpected path {path:?}");
        }
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[then("a decode error is returned")]
fn decode_error(#[from(ingestion_result)] result: &RefCell<IngestOutcome>) {
    let borrowed = result.borrow();
    assert!(
        matches!(
            borrowed.as_ref().expect("ingestion was attempted"),
            Err(OsmIngestError::Decode { .. })
        ),
        "expected a decode error, got {borrowed:?}"
    );
}

#[then("no features are returned")]
fn no_features(#[from(ingestion_result)] result: &RefCell<IngestOutcome>) {
    let borrowed = result.borrow();
    let report = borrowed
        .as_ref()
        .expect("ingestion was attempted")
        .as_ref()
        .expect("empty file decodes");
    assert!(report.features.is_empty());
    assert_eq!(report.summary.nodes, 0);
    assert_eq!(report.summary.bounds, None);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 0)]
fn missing_file_cannot_be_opened(
    workdir: TempDir,
    target: RefCell<Option<PathBuf>>,
    ingestion_result: RefCell<IngestOutcome>,
) {
    let _ = (workdir, target, ingestion_result);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 1)]
fn corrupt_data_fails_to_decode(
    workdir: TempDir,
    target: RefCell<Option<PathBuf>>,
    ingestion_result: RefCell<IngestOutcome>,
) {
    let _ = (workdir, target, ingestion_result);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 2)]
fn empty_file_yields_no_features(
    workdir: TempDir,
    target: RefCell<Option<PathBuf>>,
    ingestion_result: RefCell<IngestOutcome>,
) {
    let _ = (workdir, target, ingestion_result);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/osm_ingest.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "A missing file cannot be opened",
            "Corrupt data fails to decode",
            "An empty file yields no features",
        ],
        "scenario order changed in feature file"
    );
}
