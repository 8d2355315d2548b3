//! Errors raised at the edges of the simulator (configuration and traces).
//!
//! Nothing on the access path returns an error: a broken invariant inside
//! the cache model or the predictor is a bug and panics instead.

use thiserror::Error;

/// Errors produced while loading an experiment.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("trace line {line}: {msg}")]
    TraceParse { line: usize, msg: String },
}

pub type Result<T> = std::result::Result<T, Error>;
