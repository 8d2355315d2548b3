//! Records of recently evicted lines used for delayed, corrective training.
//!
//! The [Sampler] keeps a short history of evictions for a small fraction of
//! sets. When an evicted address comes back the eviction was premature, and
//! the features recorded with it are rewarded. The [GhostFilter] is a
//! cheaper, lossy alternative covering every set.

use bitvec::prelude::*;
use log::trace;

use crate::cache::CacheLine;
use crate::config::{ GhostFilterConfig, SamplerConfig };
use crate::feature::*;

/// Metadata kept for one evicted line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerEntry {
    pub valid: bool,

    /// Low bits of the evicted tag
    pub partial_tag: u64,

    /// Insertion signature of the evicted line
    pub features: FeatureTuple,

    /// Predictor vote for the line when it was chosen as the victim
    pub vote: i32,
}

/// Ring buffer of evictions for one sampled set.
#[derive(Clone, Debug)]
struct SamplerSet {
    data: Vec<Option<SamplerEntry>>,
    next: usize,
}
impl SamplerSet {
    fn new(capacity: usize) -> Self {
        Self { data: vec![None; capacity], next: 0 }
    }

    fn push(&mut self, e: SamplerEntry) {
        let cap = self.data.len();
        self.data[self.next] = Some(e);
        self.next = (self.next + 1) % cap;
    }

    fn len(&self) -> usize {
        self.data.iter().flatten().filter(|e| e.valid).count()
    }
}

/// Per-set eviction history for every Nth set.
#[derive(Clone, Debug)]
pub struct Sampler {
    cfg: SamplerConfig,
    sets: Vec<SamplerSet>,

    /// Number of recorded evictions
    pub recorded: u64,

    /// Number of re-accesses that matched a recorded eviction
    pub ghost_hits: u64,
}
impl Sampler {
    pub fn new(cfg: SamplerConfig, num_sets: usize) -> Self {
        assert!(cfg.sampling_rate > 0 && cfg.capacity > 0);
        let num_sampled = num_sets.div_ceil(cfg.sampling_rate);
        Self {
            cfg,
            sets: vec![SamplerSet::new(cfg.capacity); num_sampled],
            recorded: 0,
            ghost_hits: 0,
        }
    }

    /// Returns true if evictions from this set are recorded.
    pub fn is_sampled(&self, set_idx: usize) -> bool {
        set_idx % self.cfg.sampling_rate == 0
    }

    /// Return the number of sampled sets.
    pub fn num_sampled(&self) -> usize { self.sets.len() }

    pub fn capacity(&self) -> usize { self.cfg.capacity }

    fn slot(&self, set_idx: usize) -> Option<usize> {
        if self.is_sampled(set_idx) {
            let slot = set_idx / self.cfg.sampling_rate;
            assert!(slot < self.sets.len(), "set {} is outside the sampler", set_idx);
            Some(slot)
        } else {
            None
        }
    }

    fn partial_tag(&self, tag: u64) -> u64 {
        match self.cfg.partial_tag_bits {
            64 => tag,
            bits => tag & ((1u64 << bits) - 1),
        }
    }

    /// Remember a line evicted from some set.
    /// Evictions from unsampled sets are ignored.
    pub fn record_eviction(&mut self, set_idx: usize, line: &CacheLine, vote: i32) {
        if let Some(slot) = self.slot(set_idx) {
            let entry = SamplerEntry {
                valid: true,
                partial_tag: self.partial_tag(line.tag),
                features: line.features,
                vote,
            };
            self.sets[slot].push(entry);
            self.recorded = self.recorded.saturating_add(1);
        }
    }

    /// Check a missing address against the recorded evictions.
    ///
    /// On a match the entry is retired and the features recorded with the
    /// evicted line are returned.
    pub fn on_reaccess(&mut self, set_idx: usize, tag: u64) -> Option<FeatureTuple> {
        let slot = self.slot(set_idx)?;
        let ptag = self.partial_tag(tag);
        let entry = self.sets[slot].data.iter_mut()
            .flatten()
            .find(|e| e.valid && e.partial_tag == ptag)?;
        entry.valid = false;
        self.ghost_hits = self.ghost_hits.saturating_add(1);
        trace!("ghost hit in set {} for tag {:#x} (vote {})", set_idx, tag, entry.vote);
        Some(entry.features)
    }

    /// Return the valid entries for a set, oldest first.
    pub fn entries(&self, set_idx: usize) -> Vec<SamplerEntry> {
        let Some(slot) = self.slot(set_idx) else { return Vec::new() };
        let s = &self.sets[slot];
        let cap = s.data.len();
        (0..cap).filter_map(|i| s.data[(s.next + i) % cap])
            .filter(|e| e.valid)
            .collect()
    }

    /// Return the number of valid entries for a set.
    pub fn len(&self, set_idx: usize) -> usize {
        self.slot(set_idx).map_or(0, |slot| self.sets[slot].len())
    }
}

/// A bitset keyed by two hashes of an address.
///
/// Membership is approximate: an address may be reported as recently
/// evicted when it was not, never the other way around (until a reset).
#[derive(Clone, Debug)]
pub struct GhostFilter {
    bits: BitVec,
    reset_interval: usize,
    insertions: usize,
}
impl GhostFilter {
    pub fn new(cfg: GhostFilterConfig) -> Self {
        assert!(cfg.bits > 0);
        Self {
            bits: bitvec![0; cfg.bits],
            reset_interval: cfg.reset_interval,
            insertions: 0,
        }
    }

    fn hashes(&self, addr: u64) -> (usize, usize) {
        let n = self.bits.len() as u64;
        ((addr % n) as usize, (mix(addr, n) % n) as usize)
    }

    /// Record an evicted address.
    pub fn insert(&mut self, addr: u64) {
        if self.reset_interval != 0 && self.insertions >= self.reset_interval {
            self.clear();
        }
        let (h1, h2) = self.hashes(addr);
        self.bits.set(h1, true);
        self.bits.set(h2, true);
        self.insertions += 1;
    }

    /// Returns true if the address was probably evicted recently.
    pub fn contains(&self, addr: u64) -> bool {
        let (h1, h2) = self.hashes(addr);
        self.bits[h1] && self.bits[h2]
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
        self.insertions = 0;
    }

    /// Fraction of bits currently set.
    pub fn occupancy(&self) -> f64 {
        self.bits.count_ones() as f64 / self.bits.len() as f64
    }
}
