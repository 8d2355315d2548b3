//! Storage for a set-associative cache.
//!
//! Only line metadata is modeled. Replacement state (recency stacks,
//! re-reference counters) belongs to the policies and is indexed by the same
//! (set, way) coordinates used here.

use crate::config::CacheConfig;
use crate::feature::FeatureTuple;
use crate::CoherenceState;

/// One cache frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,

    pub tag: u64,

    /// Signature of the access that inserted this line
    pub features: FeatureTuple,

    /// Set when the line is hit after insertion
    pub used: bool,
}
impl Default for CacheLine {
    fn default() -> Self {
        Self {
            valid: false,
            tag: 0,
            features: FeatureTuple::new(0, 0, CoherenceState::Invalid),
            used: false,
        }
    }
}

/// A fixed-size group of [CacheLine].
#[derive(Clone, Debug)]
pub struct CacheSet {
    lines: Vec<CacheLine>,
}
impl CacheSet {
    pub fn new(ways: usize) -> Self {
        Self { lines: vec![CacheLine::default(); ways] }
    }

    /// Return the associativity of this set.
    pub fn ways(&self) -> usize { self.lines.len() }

    pub fn line(&self, way: usize) -> &CacheLine { &self.lines[way] }

    pub fn lines(&self) -> &[CacheLine] { &self.lines }

    /// Return the way holding a valid copy of `tag`.
    pub fn lookup(&self, tag: u64) -> Option<usize> {
        self.lines.iter().position(|l| l.valid && l.tag == tag)
    }

    /// Return the lowest-numbered way without a valid line.
    pub fn first_invalid(&self) -> Option<usize> {
        self.lines.iter().position(|l| !l.valid)
    }

    /// Returns true when every way holds a valid line.
    pub fn is_full(&self) -> bool { self.first_invalid().is_none() }

    /// Number of valid lines.
    pub fn occupancy(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }

    /// Overwrite a way with a new line.
    pub fn install(&mut self, way: usize, tag: u64, features: FeatureTuple) {
        self.lines[way] = CacheLine { valid: true, tag, features, used: false };
    }

    pub fn mark_used(&mut self, way: usize) {
        self.lines[way].used = true;
    }

    /// Returns true when no two valid lines share a tag.
    pub fn has_unique_tags(&self) -> bool {
        let valid: Vec<u64> = self.lines.iter()
            .filter(|l| l.valid)
            .map(|l| l.tag)
            .collect();
        valid.iter().enumerate()
            .all(|(i, tag)| !valid[i + 1..].contains(tag))
    }
}

/// An array of [CacheSet].
#[derive(Clone, Debug)]
pub struct Cache {
    cfg: CacheConfig,
    sets: Vec<CacheSet>,
}
impl Cache {
    pub fn new(cfg: CacheConfig) -> Self {
        assert!(cfg.sets > 0 && cfg.ways > 0);
        assert!(cfg.line_bytes.is_power_of_two());
        Self {
            sets: vec![CacheSet::new(cfg.ways); cfg.sets],
            cfg,
        }
    }

    pub fn num_sets(&self) -> usize { self.sets.len() }

    pub fn ways(&self) -> usize { self.cfg.ways }

    /// Return the set that holds some address.
    pub fn set_index(&self, addr: u64) -> usize {
        let idx = ((addr / self.cfg.line_bytes) % self.sets.len() as u64) as usize;
        assert!(idx < self.sets.len());
        idx
    }

    pub fn set(&self, set_idx: usize) -> &CacheSet { &self.sets[set_idx] }

    pub fn lookup(&self, set_idx: usize, tag: u64) -> Option<usize> {
        self.sets[set_idx].lookup(tag)
    }

    /// Overwrite a way with a new line.
    ///
    /// Panics when `tag` is already held by some other way in the set.
    pub fn install(&mut self, set_idx: usize, way: usize, tag: u64,
        features: FeatureTuple)
    {
        let set = &mut self.sets[set_idx];
        if let Some(other) = set.lookup(tag) {
            assert_eq!(other, way, "tag {:#x} already present in set {}", tag, set_idx);
        }
        set.install(way, tag, features);
    }

    pub fn mark_used(&mut self, set_idx: usize, way: usize) {
        self.sets[set_idx].mark_used(way);
    }

    /// Returns true when every set holds unique tags.
    pub fn check_invariants(&self) -> bool {
        self.sets.iter().all(|s| s.has_unique_tags())
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn f() -> FeatureTuple { FeatureTuple::new(0x400, 1, CoherenceState::Shared) }

    #[test]
    fn set_index_follows_line_address() {
        let c = Cache::new(CacheConfig::default());
        assert_eq!(c.set_index(0), 0);
        assert_eq!(c.set_index(15), 0);
        assert_eq!(c.set_index(64), 1);
        assert_eq!(c.set_index(64 * 64), 0);
        assert_eq!(c.set_index(1000), 15);
    }

    #[test]
    fn lookup_and_install() {
        let mut c = Cache::new(CacheConfig { sets: 4, ways: 2, line_bytes: 64 });
        assert_eq!(c.lookup(0, 7), None);
        assert_eq!(c.set(0).first_invalid(), Some(0));
        c.install(0, 0, 7, f());
        c.install(0, 1, 9, f());
        assert_eq!(c.lookup(0, 7), Some(0));
        assert_eq!(c.lookup(0, 9), Some(1));
        assert!(c.set(0).is_full());
        c.mark_used(0, 1);
        assert!(c.set(0).line(1).used);
        c.install(0, 1, 11, f());
        assert!(!c.set(0).line(1).used);
        assert_eq!(c.lookup(0, 9), None);
        assert!(c.check_invariants());
    }

    #[test]
    #[should_panic]
    fn duplicate_tags_are_rejected() {
        let mut c = Cache::new(CacheConfig { sets: 1, ways: 2, line_bytes: 64 });
        c.install(0, 0, 7, f());
        c.install(0, 1, 7, f());
    }
}
