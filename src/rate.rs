//! Transfer-rate estimation from successive byte-counter samples.

use std::time::Instant;

/// The single previous observation. Overwritten every tick; no history.
#[derive(Clone, Copy, Debug)]
struct RateSample {
    byte_count: u64,
    at: Instant,
}

/// Derives an instantaneous bytes/sec figure from consecutive samples of a
/// cumulative byte counter.
#[derive(Debug, Default)]
pub struct RateEstimator {
    prev: Option<RateSample>,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Fold in a new observation and return the rate since the previous one.
    ///
    /// The first observation of a session returns 0.0 — there is no
    /// derivative from one point. Zero elapsed time clamps to 0.0 (clock
    /// anomaly guard), and so does a decreasing counter: the source may be
    /// a system-wide counter that reset underneath us, and a negative rate
    /// is never meaningful. Known limitation, not fixed here. The stored
    /// sample is replaced unconditionally, clamped or not.
    pub fn observe(&mut self, byte_count: u64, now: Instant) -> f64 {
        let rate = match self.prev {
            Some(prev) => {
                let elapsed = now.saturating_duration_since(prev.at).as_secs_f64();
                if elapsed <= 0.0 || byte_count < prev.byte_count {
                    0.0
                } else {
                    (byte_count - prev.byte_count) as f64 / elapsed
                }
            }
            None => 0.0,
        };
        self.prev = Some(RateSample { byte_count, at: now });
        rate
    }
}
