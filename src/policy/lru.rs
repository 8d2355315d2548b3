//! Least Recently Used (LRU) replacement.
//!
//! Each way holds a position in its set's recency stack: 0 is the most
//! recently used line and `ways - 1` the least recently used one.

use crate::cache::*;
use crate::feature::FeatureTuple;
use crate::policy::ReplacementPolicy;

/// LRU policy state.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    ways: usize,

    /// Stack position of every (set, way), a permutation of `0..ways` per set
    stack: Vec<u8>,
}
impl LruPolicy {
    pub fn new(sets: usize, ways: usize) -> Self {
        assert!(ways > 0 && ways <= u8::MAX as usize);
        let stack = (0..sets)
            .flat_map(|_| (0..ways as u8))
            .collect();
        Self { ways, stack }
    }

    /// Return the stack position of a way.
    pub fn position(&self, set_idx: usize, way: usize) -> u8 {
        self.stack[set_idx * self.ways + way]
    }

    /// Move a way to the top of the stack, pushing younger ways down by one.
    fn promote(&mut self, set_idx: usize, way: usize) {
        let base = set_idx * self.ways;
        let stack = &mut self.stack[base..base + self.ways];
        let old = stack[way];
        for pos in stack.iter_mut() {
            if *pos < old { *pos += 1; }
        }
        stack[way] = 0;
    }
}

impl ReplacementPolicy for LruPolicy {
    fn name(&self) -> &'static str { "LRU" }

    fn find_victim(&mut self, set_idx: usize, set: &CacheSet,
        _incoming: &FeatureTuple) -> usize
    {
        if let Some(way) = set.first_invalid() {
            return way;
        }
        let lru = (self.ways - 1) as u8;
        (0..self.ways)
            .find(|way| self.position(set_idx, *way) == lru)
            .unwrap_or_else(|| unreachable!("set {} has no LRU way", set_idx))
    }

    fn update_on_hit(&mut self, set_idx: usize, way: usize, _line: &CacheLine) {
        self.promote(set_idx, way);
    }

    fn update_on_miss(&mut self, set_idx: usize, way: usize) {
        self.promote(set_idx, way);
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::CoherenceState;

    fn f() -> FeatureTuple { FeatureTuple::new(0, 0, CoherenceState::Exclusive) }

    fn is_permutation(p: &LruPolicy, set_idx: usize, ways: usize) -> bool {
        let mut pos: Vec<u8> = (0..ways).map(|w| p.position(set_idx, w)).collect();
        pos.sort();
        pos == (0..ways as u8).collect::<Vec<u8>>()
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut set = CacheSet::new(4);
        let mut p = LruPolicy::new(1, 4);
        for (way, tag) in [10, 11, 12, 13].iter().enumerate() {
            assert_eq!(p.find_victim(0, &set, &f()), way);
            set.install(way, *tag, f());
            p.update_on_miss(0, way);
        }
        // Touch tag 10 so that tag 11 becomes the oldest line
        p.update_on_hit(0, 0, set.line(0));
        assert!(is_permutation(&p, 0, 4));
        assert_eq!(p.find_victim(0, &set, &f()), 1);
        assert_eq!(p.position(0, 0), 0);
        assert_eq!(p.position(0, 3), 1);
    }

    #[test]
    fn sets_are_independent() {
        let mut p = LruPolicy::new(2, 8);
        p.update_on_miss(1, 7);
        assert_eq!(p.position(1, 7), 0);
        assert_eq!(p.position(0, 7), 7);
        assert!(is_permutation(&p, 0, 8));
        assert!(is_permutation(&p, 1, 8));
    }
}
