//! The polling engine: a bounded tick loop driving the
//! locate → read → extract → observe pipeline, one snapshot per tick.
//!
//! Only two things are fatal: an invalid schedule and a missing Steam
//! install, both surfaced before the first tick. Everything after that is
//! captured at the tick boundary — a bad artifact becomes an Error-state
//! snapshot and the cadence continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

use crate::apps;
use crate::artifact;
use crate::counter::ByteCounterSource;
use crate::extract;
use crate::locator;
use crate::model::{DownloadState, PollSchedule, RawStatus, StatusSnapshot, TerminalReason};
use crate::rate::RateEstimator;

/// Granularity of the cooperative inter-tick sleep; cancellation takes
/// effect within one slice.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid schedule: check interval must be positive (got {interval_secs}s)")]
    InvalidSchedule { interval_secs: u64 },
    #[error("steam installation not found in any known location")]
    SteamNotFound,
}

#[derive(Debug, Error)]
enum TickFault {
    #[error("install root no longer exists: {}", .0.display())]
    RootGone(PathBuf),
}

/// Receives the outbound snapshot stream. Injected at construction so the
/// engine never reaches for global state.
pub trait SnapshotSink: Send {
    fn snapshot(&mut self, snapshot: &StatusSnapshot);
    fn terminal(&mut self, reason: TerminalReason);
}

/// Event stream carried by [`ChannelSink`].
#[derive(Debug)]
pub enum SessionEvent {
    Snapshot(StatusSnapshot),
    Terminal(TerminalReason),
}

/// Sink backed by a std mpsc channel: the engine thread writes, the host
/// thread reads. Send failures mean the host hung up; they are ignored so
/// the session still winds down cleanly.
pub struct ChannelSink {
    tx: Sender<SessionEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSink {
    fn snapshot(&mut self, snapshot: &StatusSnapshot) {
        let _ = self.tx.send(SessionEvent::Snapshot(snapshot.clone()));
    }

    fn terminal(&mut self, reason: TerminalReason) {
        let _ = self.tx.send(SessionEvent::Terminal(reason));
    }
}

/// A single monitoring session. `run` consumes the tracker: terminal
/// states are final, a new session needs a fresh instance.
pub struct Tracker {
    schedule: PollSchedule,
    root: Option<PathBuf>,
    rate: RateEstimator,
    counter: Box<dyn ByteCounterSource + Send>,
}

impl Tracker {
    pub fn new(schedule: PollSchedule, counter: Box<dyn ByteCounterSource + Send>) -> Self {
        Self {
            schedule,
            root: None,
            rate: RateEstimator::new(),
            counter,
        }
    }

    /// Like [`Tracker::new`], but with the install root already resolved.
    pub fn with_root(
        schedule: PollSchedule,
        counter: Box<dyn ByteCounterSource + Send>,
        root: PathBuf,
    ) -> Self {
        Self {
            schedule,
            root: Some(root),
            rate: RateEstimator::new(),
            counter,
        }
    }

    /// Run the session to a terminal state, emitting one snapshot per tick
    /// through `sink` and finally the terminal reason.
    ///
    /// Fails fast — before any tick — on a zero interval or when no Steam
    /// install can be located.
    pub fn run(
        mut self,
        cancel: Arc<AtomicBool>,
        sink: &mut dyn SnapshotSink,
    ) -> Result<TerminalReason, EngineError> {
        if !self.schedule.is_valid() {
            return Err(EngineError::InvalidSchedule {
                interval_secs: self.schedule.interval_secs,
            });
        }

        // Resolved lazily, once. A root that vanishes later is a per-tick
        // Error, not a re-resolve: best-effort semantics.
        let root = match self.root.take().or_else(locator::resolve) {
            Some(root) => root,
            None => return Err(EngineError::SteamNotFound),
        };

        let max_ticks = self.schedule.max_ticks();
        info!(
            root = %root.display(),
            interval_secs = self.schedule.interval_secs,
            max_ticks,
            "monitoring session started"
        );

        let mut reason = TerminalReason::Completed;
        for tick_index in 0..max_ticks {
            if cancel.load(Ordering::Relaxed) {
                reason = TerminalReason::Cancelled;
                break;
            }

            let snapshot = self.tick(&root, tick_index);
            sink.snapshot(&snapshot);

            // No sleep after the final tick; the session just ends.
            if tick_index + 1 < max_ticks && !self.sleep_between_ticks(&cancel) {
                reason = TerminalReason::Cancelled;
                break;
            }
        }

        info!(?reason, "monitoring session ended");
        sink.terminal(reason);
        Ok(reason)
    }

    /// One pass of the pipeline. Faults never escape: they become an
    /// Error-state snapshot so a single bad tick cannot end the session.
    fn tick(&mut self, root: &Path, tick_index: u64) -> StatusSnapshot {
        let raw = match self.infer_status(root) {
            Ok(raw) => raw,
            Err(fault) => {
                warn!(tick = tick_index, %fault, "tick degraded to error state");
                RawStatus {
                    state: DownloadState::Error,
                    item_label: None,
                    byte_count: 0,
                }
            }
        };

        // Prefer a byte figure from the artifact itself; otherwise fall
        // back to the system counter so the rate window keeps advancing.
        let byte_count = if raw.byte_count > 0 {
            raw.byte_count
        } else {
            self.counter.current_bytes()
        };
        let rate = self.rate.observe(byte_count, Instant::now());

        StatusSnapshot {
            timestamp: Local::now(),
            state: raw.state,
            item_label: raw.item_label,
            rate_bytes_per_sec: rate,
            raw_byte_count: byte_count,
            tick_index,
        }
    }

    /// read → extract, plus the staging-directory probe as a backstop.
    fn infer_status(&self, root: &Path) -> Result<RawStatus, TickFault> {
        if !root.exists() {
            return Err(TickFault::RootGone(root.to_path_buf()));
        }

        let content = artifact::read_relevant_artifact(root);
        let mut raw = match &content {
            Some(content) => extract::extract(&content.text),
            // No readable artifact at all: nothing observable downloading.
            None => RawStatus {
                state: DownloadState::Idle,
                ..RawStatus::default()
            },
        };

        // A staging directory is direct evidence of an in-flight download;
        // it outranks a weak or missing text match, but never a Paused one.
        if !matches!(raw.state, DownloadState::Active | DownloadState::Paused) {
            if let Some(id) = artifact::active_download_ids(root).first() {
                raw.state = DownloadState::Active;
                if raw.item_label.is_none() {
                    raw.item_label = Some(id.clone());
                }
            }
        }

        // Bare numeric labels get the human-readable title.
        if let Some(label) = &raw.item_label {
            if label.chars().all(|c| c.is_ascii_digit()) {
                raw.item_label = Some(apps::display_name(label));
            }
        }

        Ok(raw)
    }

    /// Cooperative sleep between ticks. Returns `false` when cancellation
    /// arrived mid-sleep.
    fn sleep_between_ticks(&self, cancel: &AtomicBool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(self.schedule.interval_secs);
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}
