//! Helpers for collecting statistics.

use itertools::*;
use std::collections::*;

/// Container for recording statistics while simulating some policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimStats {
    /// Per-PC statistics (indexed by program counter value).
    pub data: BTreeMap<u64, PcStats>,

    pub hits: u64,
    pub misses: u64,

    /// Misses that were not inserted into the cache
    pub bypasses: u64,

    /// Hits on lines that would have been expensive to lose (Modified, or
    /// shared by more than one core)
    pub coherence_wins: u64,
}
impl SimStats {
    pub fn new() -> Self { Self::default() }

    /// Return the total number of accesses.
    pub fn accesses(&self) -> u64 {
        self.hits.saturating_add(self.misses).saturating_add(self.bypasses)
    }

    /// Return the global hit rate (zero when nothing was simulated).
    pub fn hit_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }

    pub fn record_hit(&mut self, pc: u64, coherence_win: bool) {
        self.hits = self.hits.saturating_add(1);
        if coherence_win {
            self.coherence_wins = self.coherence_wins.saturating_add(1);
        }
        let data = self.get_mut(pc);
        data.occ = data.occ.saturating_add(1);
        data.hits = data.hits.saturating_add(1);
    }

    pub fn record_miss(&mut self, pc: u64) {
        self.misses = self.misses.saturating_add(1);
        let data = self.get_mut(pc);
        data.occ = data.occ.saturating_add(1);
    }

    pub fn record_bypass(&mut self, pc: u64) {
        self.bypasses = self.bypasses.saturating_add(1);
        let data = self.get_mut(pc);
        data.occ = data.occ.saturating_add(1);
        data.bypasses = data.bypasses.saturating_add(1);
    }

    /// Returns a reference to data collected for a particular PC.
    pub fn get(&self, pc: u64) -> Option<&PcStats> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular PC.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u64) -> &mut PcStats {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed program counters.
    pub fn num_unique_pcs(&self) -> usize { self.data.len() }

    /// Return the `n` most frequently observed PCs.
    pub fn get_common_pcs(&self, n: usize) -> Vec<(u64, &PcStats)> {
        self.data.iter()
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ).then(y.0.cmp(x.0)))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-PC statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PcStats {
    /// Number of accesses from this PC.
    pub occ: u64,

    /// Number of hits for this PC.
    pub hits: u64,

    /// Number of accesses from this PC that were not inserted.
    pub bypasses: u64,
}
impl PcStats {
    /// Return the hit rate for this PC.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 { 0.0 } else { self.hits as f64 / self.occ as f64 }
    }
}
