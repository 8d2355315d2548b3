//! Drives accesses through a cache and a replacement policy.

use log::debug;

use crate::cache::*;
use crate::config::CacheConfig;
use crate::feature::FeatureTuple;
use crate::policy::*;
use crate::stats::SimStats;
use crate::trace::*;
use crate::CoherenceState;

/// What happened to a single access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    Miss,

    /// The access missed and the line was not inserted
    Bypass,
}

/// A set-associative cache managed by some policy.
///
/// The simulator has no source of randomness: replaying the same trace
/// against the same policy always gives the same result.
pub struct Simulator<P: ReplacementPolicy> {
    cache: Cache,
    policy: P,
    stats: SimStats,
}
impl<P: ReplacementPolicy> Simulator<P> {
    pub fn new(cfg: CacheConfig, policy: P) -> Self {
        Self {
            cache: Cache::new(cfg),
            policy,
            stats: SimStats::new(),
        }
    }

    /// Simulate one access.
    pub fn access(&mut self, addr: u64, pc: u64, sharers: u32,
        state: CoherenceState) -> AccessOutcome
    {
        let set_idx = self.cache.set_index(addr);
        let tag = addr;

        if let Some(way) = self.cache.lookup(set_idx, tag) {
            self.cache.mark_used(set_idx, way);
            let line = self.cache.set(set_idx).line(way);
            self.policy.update_on_hit(set_idx, way, line);

            // Losing this line would have cost a writeback or invalidations
            let win = line.features.state == CoherenceState::Modified
                || line.features.sharers > 1;
            self.stats.record_hit(pc, win);
            return AccessOutcome::Hit;
        }

        let features = FeatureTuple::new(pc, sharers, state);
        if self.policy.on_miss(set_idx, tag, &features) == Admission::Bypass {
            self.stats.record_bypass(pc);
            return AccessOutcome::Bypass;
        }

        self.stats.record_miss(pc);
        let way = self.policy.find_victim(set_idx, self.cache.set(set_idx), &features);
        assert!(way < self.cache.ways(), "{} picked way {} in set {}",
            self.policy.name(), way, set_idx);
        self.cache.install(set_idx, way, tag, features);
        debug_assert!(self.cache.set(set_idx).has_unique_tags());
        self.policy.update_on_miss(set_idx, way);
        AccessOutcome::Miss
    }

    /// Simulate every access in a trace.
    pub fn run(&mut self, trace: &Trace) {
        for r in trace.iter() {
            self.access(r.addr, r.pc, r.sharers, r.state);
        }
        debug!("{}: {} on '{}' ({} hits, {} misses, {} bypasses)",
            self.policy.name(), trace.len(), trace.name(),
            self.stats.hits, self.stats.misses, self.stats.bypasses,
        );
    }

    pub fn stats(&self) -> &SimStats { &self.stats }

    pub fn cache(&self) -> &Cache { &self.cache }

    pub fn policy(&self) -> &P { &self.policy }

    /// Consume the simulator, returning the policy and the statistics.
    pub fn into_parts(self) -> (P, SimStats) {
        (self.policy, self.stats)
    }
}
