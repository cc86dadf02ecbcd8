//! Raw byte-counter sources feeding the rate estimator.

use sysinfo::Networks;

/// A cumulative byte counter sampled once per tick. The engine prefers a
/// byte figure carried by the artifact itself; this seam supplies one when
/// the artifact has none, and lets tests script the counter.
pub trait ByteCounterSource {
    fn current_bytes(&mut self) -> u64;
}

/// Cumulative received bytes summed across non-loopback interfaces.
///
/// System-wide, so the derived rate reflects all inbound traffic on the
/// machine, not just Steam's. Good enough for a rough progress figure;
/// per-process byte accounting is not portably available.
pub struct NetworkCounterSource {
    networks: Networks,
}

impl NetworkCounterSource {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for NetworkCounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteCounterSource for NetworkCounterSource {
    fn current_bytes(&mut self) -> u64 {
        self.networks.refresh(true);
        let mut total = 0u64;
        for (name, data) in &self.networks {
            if name.as_str() == "lo" {
                continue;
            }
            total = total.saturating_add(data.total_received());
        }
        total
    }
}
