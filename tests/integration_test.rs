//! End-to-end engine tests against a synthetic Steam root on disk.
//! Intervals are kept at one second so the bounded sessions stay fast.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use steamwatch::counter::ByteCounterSource;
use steamwatch::engine::{EngineError, SnapshotSink, Tracker};
use steamwatch::model::{DownloadState, PollSchedule, StatusSnapshot, TerminalReason};

/// Scripted counter: replays a fixed byte sequence, then holds the last value.
struct ScriptedCounter {
    values: Vec<u64>,
    next: usize,
}

impl ScriptedCounter {
    fn new(values: Vec<u64>) -> Self {
        Self { values, next: 0 }
    }
}

impl ByteCounterSource for ScriptedCounter {
    fn current_bytes(&mut self) -> u64 {
        let idx = self.next.min(self.values.len() - 1);
        self.next += 1;
        self.values[idx]
    }
}

/// Collects the full outbound stream for assertions.
#[derive(Default)]
struct CollectingSink {
    snapshots: Vec<StatusSnapshot>,
    terminal: Option<TerminalReason>,
}

impl SnapshotSink for CollectingSink {
    fn snapshot(&mut self, snapshot: &StatusSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn terminal(&mut self, reason: TerminalReason) {
        self.terminal = Some(reason);
    }
}

fn steam_root_with_download(dir: &tempfile::TempDir) -> PathBuf {
    let root = dir.path().to_path_buf();
    let logs = root.join("logs");
    fs::create_dir_all(&logs).unwrap();
    fs::write(
        logs.join("content_log.txt"),
        "[10:00:01] Downloading app 730 Counter-Strike 2\n",
    )
    .unwrap();
    root
}

#[test]
fn zero_interval_fails_before_any_tick() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::with_root(
        PollSchedule::new(0, 300),
        Box::new(ScriptedCounter::new(vec![0])),
        steam_root_with_download(&dir),
    );

    let mut sink = CollectingSink::default();
    let result = tracker.run(Arc::new(AtomicBool::new(false)), &mut sink);

    assert!(matches!(result, Err(EngineError::InvalidSchedule { .. })));
    assert!(sink.snapshots.is_empty());
    assert!(sink.terminal.is_none());
}

#[test]
fn session_emits_max_ticks_snapshots_then_completes() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::with_root(
        PollSchedule::new(1, 3),
        Box::new(ScriptedCounter::new(vec![0, 1_000_000, 2_500_000])),
        steam_root_with_download(&dir),
    );

    let mut sink = CollectingSink::default();
    let reason = tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(reason, TerminalReason::Completed);
    assert_eq!(sink.terminal, Some(TerminalReason::Completed));
    assert_eq!(sink.snapshots.len(), 3);

    for (i, snapshot) in sink.snapshots.iter().enumerate() {
        assert_eq!(snapshot.tick_index, i as u64);
        assert_eq!(snapshot.state, DownloadState::Active);
        assert_eq!(snapshot.item_label.as_deref(), Some("Counter-Strike 2"));
    }

    // First tick has no previous sample; later ticks see a growing counter.
    assert_eq!(sink.snapshots[0].rate_bytes_per_sec, 0.0);
    assert!(sink.snapshots[1].rate_bytes_per_sec > 0.0);
    assert!(sink.snapshots[2].rate_bytes_per_sec > 0.0);
}

#[test]
fn cancellation_during_sleep_stops_within_one_slice() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::with_root(
        PollSchedule::new(1, 5),
        Box::new(ScriptedCounter::new(vec![0])),
        steam_root_with_download(&dir),
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let engine_cancel = Arc::clone(&cancel);
    let worker = thread::spawn(move || {
        let mut sink = CollectingSink::default();
        let result = tracker.run(engine_cancel, &mut sink);
        (result, sink)
    });

    // Ticks land at ~0s and ~1s; cancel mid-sleep before the third tick.
    thread::sleep(Duration::from_millis(1400));
    cancel.store(true, Ordering::Relaxed);

    let (result, sink) = worker.join().unwrap();
    assert_eq!(result.unwrap(), TerminalReason::Cancelled);
    assert_eq!(sink.terminal, Some(TerminalReason::Cancelled));
    assert_eq!(sink.snapshots.len(), 2);
}

#[test]
fn vanished_root_degrades_to_error_snapshots_not_failure() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    drop(dir); // the resolved root disappears before the session starts

    let tracker = Tracker::with_root(
        PollSchedule::new(1, 2),
        Box::new(ScriptedCounter::new(vec![0, 100])),
        root,
    );

    let mut sink = CollectingSink::default();
    let reason = tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(reason, TerminalReason::Completed);
    assert_eq!(sink.snapshots.len(), 2);
    for snapshot in &sink.snapshots {
        assert_eq!(snapshot.state, DownloadState::Error);
        assert!(snapshot.item_label.is_none());
    }
}

#[test]
fn staging_directory_probe_reports_active_download() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    // No logs, no config — only the per-app staging directory.
    fs::create_dir_all(root.join("steamapps/downloading/570")).unwrap();

    let tracker = Tracker::with_root(
        PollSchedule::new(1, 1),
        Box::new(ScriptedCounter::new(vec![0])),
        root,
    );

    let mut sink = CollectingSink::default();
    tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(sink.snapshots.len(), 1);
    assert_eq!(sink.snapshots[0].state, DownloadState::Active);
    assert_eq!(sink.snapshots[0].item_label.as_deref(), Some("Dota 2"));
}

#[test]
fn paused_config_wins_over_downloading_marker() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config/libraryfolders.vdf"),
        "\"libraryfolders\"\n{\n\t\"downloading\"\t\"1\"\n\t\"paused\"\t\"1\"\n}\n",
    )
    .unwrap();

    let tracker = Tracker::with_root(
        PollSchedule::new(1, 1),
        Box::new(ScriptedCounter::new(vec![0])),
        root,
    );

    let mut sink = CollectingSink::default();
    tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(sink.snapshots.len(), 1);
    assert_eq!(sink.snapshots[0].state, DownloadState::Paused);
}

#[test]
fn empty_root_reports_idle() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::with_root(
        PollSchedule::new(1, 1),
        Box::new(ScriptedCounter::new(vec![42])),
        dir.path().to_path_buf(),
    );

    let mut sink = CollectingSink::default();
    tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(sink.snapshots.len(), 1);
    assert_eq!(sink.snapshots[0].state, DownloadState::Idle);
    assert_eq!(sink.snapshots[0].raw_byte_count, 42);
}

#[test]
fn artifact_byte_count_preferred_over_system_counter() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config/libraryfolders.vdf"),
        "\"downloads\"\n{\n\t\"BytesPerSecond\"\t\"524288\"\n\t\"downloading\"\t\"1\"\n}\n",
    )
    .unwrap();

    let tracker = Tracker::with_root(
        PollSchedule::new(1, 1),
        // Would report a wildly different figure if consulted.
        Box::new(ScriptedCounter::new(vec![999_999_999])),
        root,
    );

    let mut sink = CollectingSink::default();
    tracker.run(Arc::new(AtomicBool::new(false)), &mut sink).unwrap();

    assert_eq!(sink.snapshots[0].raw_byte_count, 524_288);
}
