use chrono::{DateTime, Local};
use serde::Serialize;

// --- Download status ---

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// No download activity is observable.
    Idle,
    /// Something is being downloaded right now.
    Active,
    /// A download exists but is paused or suspended.
    Paused,
    /// The most recent download finished.
    Completed,
    /// Artifacts were readable but matched no heuristic.
    #[default]
    Unknown,
    /// The tick itself failed (e.g. the install root vanished).
    Error,
}

impl DownloadState {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadState::Idle => "idle",
            DownloadState::Active => "downloading",
            DownloadState::Paused => "paused",
            DownloadState::Completed => "completed",
            DownloadState::Unknown => "unknown",
            DownloadState::Error => "error",
        }
    }
}

/// One normalized status observation for a single tick. Built once,
/// never mutated afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Local>,
    pub state: DownloadState,
    pub item_label: Option<String>,
    pub rate_bytes_per_sec: f64,
    pub raw_byte_count: u64,
    pub tick_index: u64,
}

/// Intermediate result of artifact extraction, before rate folding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStatus {
    pub state: DownloadState,
    pub item_label: Option<String>,
    pub byte_count: u64,
}

// --- Polling schedule ---

/// Fixed-cadence schedule for a bounded monitoring session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval_secs: u64,
    pub duration_secs: u64,
}

impl PollSchedule {
    pub fn new(interval_secs: u64, duration_secs: u64) -> Self {
        Self { interval_secs, duration_secs }
    }

    /// Number of ticks the session will run: floor(duration / interval).
    /// A zero interval never divides — callers must reject it via
    /// [`PollSchedule::is_valid`] before asking for a tick count.
    pub fn max_ticks(&self) -> u64 {
        if self.interval_secs == 0 {
            0
        } else {
            self.duration_secs / self.interval_secs
        }
    }

    pub fn is_valid(&self) -> bool {
        self.interval_secs > 0
    }
}

/// Why a session reached its terminal state. Hard failures (bad schedule,
/// Steam missing) are reported as errors instead, before any tick runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    Completed,
    Cancelled,
}
