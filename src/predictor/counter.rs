//! Saturating counters.

/// A signed 8-bit weight which saturates at `[-128, 127]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaturatingWeight(i8);
impl SaturatingWeight {
    pub const MIN: i8 = i8::MIN;
    pub const MAX: i8 = i8::MAX;

    pub fn new(val: i8) -> Self { Self(val) }

    /// Return the current value.
    pub fn value(&self) -> i8 { self.0 }

    /// Move the weight by one step toward [Self::MAX].
    pub fn increment(&mut self) { self.0 = self.0.saturating_add(1); }

    /// Move the weight by one step toward [Self::MIN].
    pub fn decrement(&mut self) { self.0 = self.0.saturating_sub(1); }

    /// Move the weight by one step in the requested direction.
    pub fn train(&mut self, positive: bool) {
        if positive { self.increment() } else { self.decrement() }
    }

    pub fn reset(&mut self) { self.0 = 0; }
}

/// Configuration for building a [`SaturatingCounter`].
#[derive(Clone, Copy, Debug)]
pub struct SaturatingCounterConfig {
    /// Largest representable value
    pub max: u8,

    /// Value of a freshly built (or reset) counter
    pub default: u8,
}
impl SaturatingCounterConfig {
    pub fn storage_bits(&self) -> usize {
        (self.max.max(1).ilog2() + 1) as usize
    }
    pub fn build(self) -> SaturatingCounter {
        assert!(self.default <= self.max);
        SaturatingCounter { cfg: self, ctr: self.default }
    }
}

/// An unsigned N-bit saturating counter.
#[derive(Clone, Copy, Debug)]
pub struct SaturatingCounter {
    cfg: SaturatingCounterConfig,
    ctr: u8,
}
impl SaturatingCounter {
    /// Return the current value.
    pub fn value(&self) -> u8 { self.ctr }

    /// Returns true when the counter holds its maximum value.
    pub fn is_saturated(&self) -> bool { self.ctr == self.cfg.max }

    pub fn increment(&mut self) {
        self.ctr = self.ctr.saturating_add(1).min(self.cfg.max);
    }

    pub fn decrement(&mut self) {
        self.ctr = self.ctr.saturating_sub(1);
    }

    /// Set the counter, clamping to the configured maximum.
    pub fn set(&mut self, val: u8) {
        self.ctr = val.min(self.cfg.max);
    }

    /// Reset the counter.
    pub fn reset(&mut self) {
        self.ctr = self.cfg.default;
    }
}
