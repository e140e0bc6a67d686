/*!
 * End-to-end runs over folders of segment files.
 *
 * Every run uses the scripted transport, zero delays and a hidden progress
 * line, so each test finishes in milliseconds.
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use segtrans::app_config::RetryPolicy;
use segtrans::providers::mock::ScriptedTransport;
use segtrans::providers::{GenerateRequest, Transport, TransportOutcome};
use segtrans::translation::pipeline::{ModelPair, Orchestrator};
use segtrans::translation::{RunOptions, SegmentRange, TaskKind};
use crate::common::{self, RunDirs, FALLBACK_MODEL, PRIMARY_MODEL};

fn translate(dirs: &RunDirs) -> RunOptions {
    RunOptions::new(TaskKind::Translate, &dirs.input).output_dir(&dirs.output)
}

/// Five segments, one already done: exactly four jobs and segment 3 never sent
#[tokio::test]
async fn test_run_withOneOutputPresent_shouldProcessOnlyTheOthers() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=5)?;
    fs::create_dir_all(&dirs.output)?;
    fs::write(dirs.output_file(3), "đã dịch")?;

    let transport = Arc::new(ScriptedTransport::working());
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(2))
        .run(&translate(&dirs))
        .await?;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(transport.call_count(), 4);
    assert!(transport.calls().iter().all(|c| !c.prompt.contains("marker-3")));
    for n in [1, 2, 4, 5] {
        assert!(fs::metadata(dirs.output_file(n))?.len() > 0);
    }
    assert_eq!(fs::read_to_string(dirs.output_file(3))?, "đã dịch");
    assert_eq!(fs::read_dir(&dirs.output)?.count(), 5);
    Ok(())
}

/// Re-running over a finished folder queues nothing and calls nothing
#[tokio::test]
async fn test_run_twice_shouldEnqueueZeroJobsTheSecondTime() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=3)?;

    let transport = Arc::new(ScriptedTransport::working());
    let orchestrator = common::orchestrator(Arc::clone(&transport), common::keys(2));

    let first = orchestrator.run(&translate(&dirs)).await?;
    assert_eq!(first.total, 3);

    let second = orchestrator.run(&translate(&dirs)).await?;
    assert_eq!(second.total, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.workers, 0);
    assert_eq!(transport.call_count(), 3);
    Ok(())
}

/// Output that keeps its ideographs: three calls, file written, counted as warned
#[tokio::test]
async fn test_run_withResidualCjk_shouldWriteLastOutputAfterThreeCalls() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, [1])?;

    let transport = Arc::new(ScriptedTransport::always(TransportOutcome::Text(
        "Lâm Phong 走进了山门".into(),
    )));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(3))
        .run(&translate(&dirs))
        .await?;

    assert_eq!(transport.call_count(), 3);
    assert_eq!(transport.calls_for_key("K1"), 3);
    assert_eq!(summary.warned, 1);
    assert_eq!(summary.disabled_keys, 0);
    assert_eq!(fs::read_to_string(dirs.output_file(1))?, "Lâm Phong 走进了山门");
    Ok(())
}

/// Fewer than the threshold of ideographs passes the gate
#[tokio::test]
async fn test_run_withFewIdeographs_shouldAcceptFirstOutput() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, [1])?;

    let output = TransportOutcome::Text("Lâm Phong 山门".into());
    let transport = Arc::new(ScriptedTransport::always(output));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&translate(&dirs))
        .await?;

    assert_eq!(transport.call_count(), 1);
    assert_eq!(summary.succeeded, 1);
    Ok(())
}

/// Extracting names has no quality gate, so ideographs in the output are fine
#[tokio::test]
async fn test_run_withExtractNameTask_shouldNotRetryOnCjk() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, [1, 2])?;

    let transport = Arc::new(ScriptedTransport::always(TransportOutcome::Text(
        "<cn> 林风 </cn> - <vi> 林风 </vi>".into(),
    )));
    let options = RunOptions::new(TaskKind::ExtractName, &dirs.input).output_dir(&dirs.output);
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&options)
        .await?;

    assert_eq!(transport.call_count(), 2);
    assert_eq!(summary.succeeded, 2);
    Ok(())
}

/// Requesting more workers than keys starts one worker per key
#[tokio::test]
async fn test_run_withFiftyWorkersRequested_shouldStartOnePerKey() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=12)?;

    let transport = Arc::new(ScriptedTransport::working());
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(4))
        .run(&translate(&dirs).max_workers(50))
        .await?;

    assert_eq!(summary.workers, 4);
    assert_eq!(summary.succeeded, 12);
    let used: std::collections::HashSet<String> =
        transport.calls().into_iter().map(|c| c.key).collect();
    assert!(used.len() <= 4);
    Ok(())
}

/// Every queued job reaches exactly one terminal outcome
#[tokio::test]
async fn test_run_withMixedOutcomes_shouldCompleteEachJobOnce() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=6)?;

    let transport = Arc::new(ScriptedTransport::new(|call| {
        if call.prompt.contains("marker-2") {
            TransportOutcome::NetworkFault("timeout".into())
        } else if call.prompt.contains("marker-4") {
            TransportOutcome::Empty
        } else {
            TransportOutcome::Text("bản dịch".into())
        }
    }));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(3))
        .run(&translate(&dirs))
        .await?;

    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed(), summary.total);
    assert_eq!(summary.progress_completed, summary.total);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.warned, 1);
    assert_eq!(summary.failed, 1);
    Ok(())
}

/// Jobs left behind by retired workers are never counted as progress
#[tokio::test]
async fn test_run_withAllKeysRateLimited_shouldCountOnlyFinishedJobs() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=4)?;

    let transport = Arc::new(ScriptedTransport::always(TransportOutcome::HttpError {
        status: 429,
        message: "RESOURCE_EXHAUSTED".into(),
    }));
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(2))
        .run(&translate(&dirs))
        .await?;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.progress_completed, 2);
    assert_eq!(summary.progress_completed, summary.completed());
    assert!(summary.progress_completed < summary.total);
    Ok(())
}

/// Transport that holds each call open and records keys used concurrently
#[derive(Debug, Default)]
struct InFlightTransport {
    in_flight: Mutex<HashSet<String>>,
    shared_keys: Mutex<Vec<String>>,
    seen: Mutex<HashSet<String>>,
}

#[async_trait]
impl Transport for InFlightTransport {
    async fn send(&self, key: &str, _request: &GenerateRequest, _model: &str) -> TransportOutcome {
        if !self.in_flight.lock().insert(key.to_string()) {
            self.shared_keys.lock().push(key.to_string());
        }
        self.seen.lock().insert(key.to_string());

        tokio::time::sleep(Duration::from_millis(5)).await;

        self.in_flight.lock().remove(key);
        TransportOutcome::Text("bản dịch".into())
    }
}

/// No key is ever used by two workers at the same time
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_withManyWorkers_shouldNeverShareAKeyInFlight() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=24)?;

    let transport = Arc::new(InFlightTransport::default());
    let summary = Orchestrator::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        common::keys(4),
        ModelPair::new(PRIMARY_MODEL, FALLBACK_MODEL),
    )
    .with_policy(RetryPolicy::immediate())
    .with_progress(false)
    .run(&translate(&dirs).max_workers(50))
    .await?;

    assert_eq!(summary.workers, 4);
    assert_eq!(summary.succeeded, 24);
    assert_eq!(summary.progress_completed, 24);
    assert!(transport.shared_keys.lock().is_empty());
    assert!(transport.seen.lock().len() <= 4);
    Ok(())
}

/// Only segments inside the inclusive range are queued
#[tokio::test]
async fn test_run_withRange_shouldOnlyTouchSegmentsInside() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, 1..=6)?;

    let transport = Arc::new(ScriptedTransport::working());
    let summary = common::orchestrator(Arc::clone(&transport), common::keys(2))
        .run(&translate(&dirs).range(SegmentRange::new(Some(2), Some(4))))
        .await?;

    assert_eq!(summary.total, 3);
    assert!(dirs.output_file(3).exists());
    assert!(!dirs.output_file(1).exists());
    assert!(!dirs.output_file(5).exists());
    Ok(())
}

/// The glossary matching the segment name is embedded in the prompt
#[tokio::test]
async fn test_run_withGlossaryDir_shouldEmbedMatchingNames() -> Result<()> {
    let dirs = RunDirs::new()?;
    common::write_segments(&dirs.input, [1, 2])?;
    let names = dirs.root.path().join("names");
    fs::create_dir_all(&names)?;
    fs::write(names.join("segment_1.txt"), "<cn>林风</cn> - <vi>Lâm Phong</vi>")?;

    let transport = Arc::new(ScriptedTransport::working());
    common::orchestrator(Arc::clone(&transport), common::keys(1))
        .run(&translate(&dirs).glossary_dir(&names))
        .await?;

    let calls = transport.calls();
    let first = calls.iter().find(|c| c.prompt.contains("marker-1")).unwrap();
    let second = calls.iter().find(|c| c.prompt.contains("marker-2")).unwrap();
    assert!(first.prompt.contains("林风 - Lâm Phong"));
    assert!(!second.prompt.contains("Lâm Phong"));
    Ok(())
}

/// A missing input folder is an error, not an empty run
#[tokio::test]
async fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let dirs = RunDirs::new()?;
    let options = RunOptions::new(TaskKind::Translate, dirs.root.path().join("nope"))
        .output_dir(&dirs.output);

    let transport = Arc::new(ScriptedTransport::working());
    let result = common::orchestrator(transport, common::keys(1)).run(&options).await;
    assert!(result.is_err());
    Ok(())
}
