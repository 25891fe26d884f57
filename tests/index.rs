mod common;

use std::fs;

use agscreen::backend::native::NativeBackend;
use agscreen::context::create_dir;
use agscreen::error::PipelineError;
use agscreen::index::{build_index, IndexLayout, IndexStatus};
use agscreen::logging::RunLog;
use agscreen::stage::StageKind;

use common::{read, Fixture, RecordingRunner};

fn prepared(fixture: &Fixture) -> (IndexLayout, RunLog) {
    let layout = IndexLayout::for_library(&fixture.options.library);
    create_dir(&layout.dir).unwrap();
    let log = RunLog::open(&layout.log_path("log.txt")).unwrap();
    (layout, log)
}

#[test]
fn existing_index_is_not_rebuilt() {
    let fixture = Fixture::new().with_index();
    let (layout, log) = prepared(&fixture);

    let mut runner = RecordingRunner::default();
    let status = build_index(&fixture.options.library, &layout, &NativeBackend, &mut runner, &log).unwrap();

    assert_eq!(status, IndexStatus::Present);
    assert!(runner.invocations.is_empty());
}

#[test]
fn builds_under_private_prefix_then_publishes() {
    let fixture = Fixture::new();
    let (layout, log) = prepared(&fixture);

    let mut runner = RecordingRunner::default();
    let status = build_index(&fixture.options.library, &layout, &NativeBackend, &mut runner, &log).unwrap();

    assert_eq!(status, IndexStatus::Built);
    assert_eq!(runner.programs(), vec!["bowtie2-build"]);
    let rendered = &runner.rendered()[0];
    assert!(rendered.contains("ags.fasta"));
    assert!(rendered.contains("aglib.partial-"));
    assert!(layout.exists());
    assert!(!layout.dir.join("aglib.lock").exists());

    let leftovers = fs::read_dir(&layout.dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().contains("partial"))
        .count();
    assert_eq!(leftovers, 0);
    assert!(read(&layout.log_path("log.txt")).contains("****** Bowtie2: library fasta indexing ******"));
}

#[test]
fn failed_build_leaves_no_marker_and_releases_lock() {
    let fixture = Fixture::new();
    let (layout, log) = prepared(&fixture);

    let mut runner = RecordingRunner::failing_on("bowtie2-build");
    let err = build_index(&fixture.options.library, &layout, &NativeBackend, &mut runner, &log).unwrap_err();

    assert!(matches!(err, PipelineError::StageFailed { stage: StageKind::IndexBuild, .. }));
    assert!(!layout.exists());
    assert!(!layout.dir.join("aglib.lock").exists());
    assert!(read(&layout.log_path("log.txt")).contains("Error: tool exploded"));
}

#[test]
fn concurrent_build_is_refused() {
    let fixture = Fixture::new();
    let (layout, log) = prepared(&fixture);
    fs::write(layout.dir.join("aglib.lock"), "").unwrap();

    let mut runner = RecordingRunner::default();
    let err = build_index(&fixture.options.library, &layout, &NativeBackend, &mut runner, &log).unwrap_err();

    assert!(matches!(err, PipelineError::IndexLocked { .. }));
    assert!(runner.invocations.is_empty());
    // the foreign lock is left alone
    assert!(layout.dir.join("aglib.lock").exists());
}

#[test]
fn missing_library_is_refused_before_running() {
    let fixture = Fixture::new();
    let (layout, log) = prepared(&fixture);
    fs::remove_file(&fixture.options.library).unwrap();

    let mut runner = RecordingRunner::default();
    let err = build_index(&fixture.options.library, &layout, &NativeBackend, &mut runner, &log).unwrap_err();

    assert!(matches!(err, PipelineError::MissingPredecessor { stage: StageKind::IndexBuild, .. }));
    assert!(runner.invocations.is_empty());
    assert!(!layout.dir.join("aglib.lock").exists());
}
