//! Static Re-Reference Interval Prediction (SRRIP) replacement.
//!
//! Every way carries a 2-bit re-reference prediction value (RRPV): 0 means
//! the line is expected to be reused soon, 3 means in the distant future.
//! New lines are inserted with a "long" interval (2) rather than a distant
//! one, so a single hit protects them before the next eviction scan.
//!
//! See "High Performance Cache Replacement Using Re-Reference Interval
//! Prediction (RRIP)" (Jaleel et al., 2010).

use crate::cache::*;
use crate::feature::FeatureTuple;
use crate::policy::ReplacementPolicy;
use crate::predictor::counter::*;

pub const RRPV_MAX: u8 = 3;
pub const RRPV_INSERT: u8 = 2;
pub const RRPV_HIT: u8 = 0;

/// SRRIP policy state.
#[derive(Clone, Debug)]
pub struct SrripPolicy {
    ways: usize,
    rrpv: Vec<SaturatingCounter>,
}
impl SrripPolicy {
    pub fn new(sets: usize, ways: usize) -> Self {
        let ctr = SaturatingCounterConfig { max: RRPV_MAX, default: RRPV_MAX };
        Self {
            ways,
            rrpv: vec![ctr.build(); sets * ways],
        }
    }

    /// Return the RRPV of a way.
    pub fn rrpv(&self, set_idx: usize, way: usize) -> u8 {
        self.rrpv[set_idx * self.ways + way].value()
    }

    /// Find a victim in a full set, returning the way and the number of
    /// aging passes it took.
    ///
    /// Each pass raises every counter by one, so some counter reaches
    /// [RRPV_MAX] after at most [RRPV_MAX] passes.
    pub fn select_victim(&mut self, set_idx: usize) -> (usize, usize) {
        let base = set_idx * self.ways;
        let ctrs = &mut self.rrpv[base..base + self.ways];
        for passes in 0..=RRPV_MAX as usize {
            if let Some(way) = ctrs.iter().position(|c| c.is_saturated()) {
                return (way, passes);
            }
            ctrs.iter_mut().for_each(|c| c.increment());
        }
        unreachable!("no distant line in set {} after aging", set_idx);
    }
}

impl ReplacementPolicy for SrripPolicy {
    fn name(&self) -> &'static str { "SRRIP" }

    fn find_victim(&mut self, set_idx: usize, set: &CacheSet,
        _incoming: &FeatureTuple) -> usize
    {
        if let Some(way) = set.first_invalid() {
            return way;
        }
        self.select_victim(set_idx).0
    }

    fn update_on_hit(&mut self, set_idx: usize, way: usize, _line: &CacheLine) {
        self.rrpv[set_idx * self.ways + way].set(RRPV_HIT);
    }

    fn update_on_miss(&mut self, set_idx: usize, way: usize) {
        self.rrpv[set_idx * self.ways + way].set(RRPV_INSERT);
    }
}
