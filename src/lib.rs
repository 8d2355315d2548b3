
pub mod error;
pub mod config;
pub mod feature;
pub mod predictor;
pub mod sampler;
pub mod cache;
pub mod policy;
pub mod coherence;
pub mod trace;
pub mod stats;
pub mod sim;
pub mod experiment;

pub use error::*;
pub use config::*;
pub use feature::*;
pub use predictor::*;
pub use sampler::*;
pub use cache::*;
pub use policy::*;
pub use coherence::*;
pub use trace::*;
pub use stats::*;
pub use sim::*;

/// A MESI coherence state.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoherenceState {
    Invalid   = 0,
    Shared    = 1,
    Exclusive = 2,
    Modified  = 3,
}
impl CoherenceState {
    /// Return the single-letter name used in traces and reports.
    pub fn letter(&self) -> char {
        match self {
            Self::Invalid   => 'I',
            Self::Shared    => 'S',
            Self::Exclusive => 'E',
            Self::Modified  => 'M',
        }
    }

    /// Parse a state from its single-letter or full name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "I" | "INVALID"   => Some(Self::Invalid),
            "S" | "SHARED"    => Some(Self::Shared),
            "E" | "EXCLUSIVE" => Some(Self::Exclusive),
            "M" | "MODIFIED"  => Some(Self::Modified),
            _ => None,
        }
    }
}
impl From<CoherenceState> for u64 {
    fn from(x: CoherenceState) -> u64 { x as u64 }
}
impl std::fmt::Display for CoherenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

