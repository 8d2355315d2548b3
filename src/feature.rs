//! Feature tuples and the hash used to index weight tables.

use serde::Deserialize;
use crate::CoherenceState;

/// Seed mixed into every feature hash. Changing this constant re-shuffles
/// every table index.
pub const HASH_SEED: u64 = 0x9e37_79b9;

/// The signature recorded with a line when it is inserted.
///
/// Later training always uses this snapshot, so the predictor learns the
/// reuse behavior of the instruction that *brought in* the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeatureTuple {
    /// Program counter of the inserting access
    pub pc: u64,

    /// Number of cores sharing the line
    pub sharers: u32,

    /// Coherence state of the line
    pub state: CoherenceState,
}
impl FeatureTuple {
    pub fn new(pc: u64, sharers: u32, state: CoherenceState) -> Self {
        Self { pc, sharers, state }
    }
}

/// Which parts of a [FeatureTuple] are used to index a weight table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Program counter only (a coarse, stable prior)
    Pc,

    /// Program counter and sharer count
    PcSharers,

    /// Program counter, sharer count and coherence state
    Full,
}
impl Projection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pc => "pc",
            Self::PcSharers => "pc+sharers",
            Self::Full => "pc+sharers+state",
        }
    }
}

/// Combine two values with a handful of shift/add/XOR operations.
#[inline]
pub fn mix(a: u64, b: u64) -> u64 {
    a ^ b.wrapping_add(HASH_SEED)
        .wrapping_add(a << 6)
        .wrapping_add(a >> 2)
}

/// Hash the projected features of a tuple.
///
/// Collisions are expected: callers reduce the result modulo a table size.
#[inline]
pub fn feature_hash(projection: Projection, f: &FeatureTuple) -> u64 {
    match projection {
        Projection::Pc => mix(f.pc, 0),
        Projection::PcSharers => mix(f.pc, f.sharers as u64),
        Projection::Full => mix(mix(f.pc, f.sharers as u64), f.state.into()),
    }
}
