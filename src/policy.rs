//! Cache replacement policies.
//!
//! - `Lru`: Least Recently Used.
//! - `Srrip`: Static Re-Reference Interval Prediction.
//! - `Coalesce`: hashed-perceptron reuse prediction biased by coherence cost.

pub mod lru;
pub mod srrip;
mod coalesce;

pub use lru::*;
pub use srrip::*;
pub use coalesce::*;

use crate::cache::*;
use crate::feature::FeatureTuple;

/// Decision made for an incoming line after a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Allocate a way for the line
    Insert,

    /// Do not allocate; the set is left untouched
    Bypass,
}

/// Interface to a replacement policy.
///
/// A policy only sees (set, way) coordinates and line metadata. Any
/// recency or priority state it needs is kept by the policy itself.
pub trait ReplacementPolicy {
    fn name(&self) -> &'static str;

    /// Called when an access misses, before a victim is chosen.
    fn on_miss(&mut self, _set_idx: usize, _tag: u64, _features: &FeatureTuple)
        -> Admission
    {
        Admission::Insert
    }

    /// Select the way to overwrite in a set.
    /// An invalid way is always returned before any valid way.
    fn find_victim(&mut self, set_idx: usize, set: &CacheSet,
        incoming: &FeatureTuple) -> usize;

    /// Update policy state after an access hits `way`.
    fn update_on_hit(&mut self, set_idx: usize, way: usize, line: &CacheLine);

    /// Update policy state after a new line was installed in `way`.
    fn update_on_miss(&mut self, set_idx: usize, way: usize);
}
