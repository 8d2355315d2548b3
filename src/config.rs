//! Experiment configuration.
//!
//! Every table may be omitted from the TOML file; missing fields fall back
//! to the defaults below, which describe an 8-way, 64-set last-level cache
//! with 3% set sampling.

use serde::Deserialize;
use std::path::Path;

use crate::error::*;
use crate::feature::Projection;

const MAX_WAYS: usize = 16;

/// Top-level configuration for one experiment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub cache: CacheConfig,
    pub predictor: PredictorConfig,
    pub sampler: SamplerConfig,
    pub coalesce: CoalesceConfig,
    pub ghost: GhostFilterConfig,
}
impl ExperimentConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Reject geometries the simulator cannot represent.
    pub fn validate(&self) -> Result<()> {
        let c = &self.cache;
        if c.sets == 0 {
            return Err(Error::InvalidConfig("cache.sets must be non-zero".into()));
        }
        if c.ways == 0 || c.ways > MAX_WAYS {
            return Err(Error::InvalidConfig(
                format!("cache.ways must be in 1..={}", MAX_WAYS)
            ));
        }
        if !c.line_bytes.is_power_of_two() {
            return Err(Error::InvalidConfig(
                "cache.line_bytes must be a power of two".into()
            ));
        }
        if !self.predictor.table_size.is_power_of_two() {
            return Err(Error::InvalidConfig(
                "predictor.table_size must be a power of two".into()
            ));
        }
        if self.predictor.projections.is_empty() {
            return Err(Error::InvalidConfig(
                "predictor.projections must name at least one table".into()
            ));
        }
        if self.sampler.sampling_rate == 0 || self.sampler.capacity == 0 {
            return Err(Error::InvalidConfig(
                "sampler.sampling_rate and sampler.capacity must be non-zero".into()
            ));
        }
        if self.sampler.partial_tag_bits == 0 || self.sampler.partial_tag_bits > 64 {
            return Err(Error::InvalidConfig(
                "sampler.partial_tag_bits must be in 1..=64".into()
            ));
        }
        if self.ghost.enabled && self.ghost.bits == 0 {
            return Err(Error::InvalidConfig("ghost.bits must be non-zero".into()));
        }
        Ok(())
    }
}

/// Cache geometry.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of sets
    pub sets: usize,

    /// Associativity
    pub ways: usize,

    /// Line size in bytes, used to select a set from an address
    pub line_bytes: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { sets: 64, ways: 8, line_bytes: 64 }
    }
}

/// Parameters for the hashed perceptron.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Number of weights in each table (a power of two)
    pub table_size: usize,

    /// One weight table is built for each projection
    pub projections: Vec<Projection>,
}
impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            table_size: 4096,
            projections: vec![Projection::Pc, Projection::Full],
        }
    }
}

/// Parameters for set sampling.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Every Nth set is sampled
    pub sampling_rate: usize,

    /// Evictions remembered per sampled set
    pub capacity: usize,

    /// Number of low tag bits kept in each sampler entry
    pub partial_tag_bits: u32,
}
impl Default for SamplerConfig {
    fn default() -> Self {
        Self { sampling_rate: 32, capacity: 8, partial_tag_bits: 16 }
    }
}

/// Parameters for the COALESCE policy.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CoalesceConfig {
    /// Added to the vote of a line held in the Modified state
    pub modified_bonus: i32,

    /// Added to the vote of a line with more than `sharer_threshold` sharers
    pub sharer_bonus: i32,

    pub sharer_threshold: u32,

    /// Incoming lines voted below this value are not inserted
    pub bypass_threshold: i32,

    pub bypass_enabled: bool,

    /// Train every sampled victim negatively when it is evicted
    pub eager_punishment: bool,

    /// Only punish victims that were never hit after insertion
    pub punish_only_unused: bool,
}
impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            modified_bonus: 60,
            sharer_bonus: 30,
            sharer_threshold: 2,
            bypass_threshold: -90,
            bypass_enabled: false,
            eager_punishment: true,
            punish_only_unused: false,
        }
    }
}

/// Parameters for the bloom-style ghost filter.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct GhostFilterConfig {
    pub enabled: bool,

    /// Number of bits in the filter
    pub bits: usize,

    /// The filter is cleared after this many insertions (0 = never)
    pub reset_interval: usize,
}
impl Default for GhostFilterConfig {
    fn default() -> Self {
        Self { enabled: false, bits: 8192, reset_interval: 4096 }
    }
}
