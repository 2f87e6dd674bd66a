//! Tunables for the router and the adaptive dispatcher.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `TUNEDCOPY_*` environment variables.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File looked up when no explicit config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tunedcopy.toml";

/// Prefix for environment overrides, e.g. `TUNEDCOPY_LARGE_THRESHOLD`.
pub const ENV_PREFIX: &str = "TUNEDCOPY_";

/// Largest length served by the small (tail-then-forward-stride) band.
pub const SMALL_BAND_MAX: usize = 128;

/// Tunables consumed by [`Router`](crate::Router) and
/// [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Copies of at least this many bytes go to the adaptive dispatcher.
    pub large_threshold: usize,
    /// Length of one exploit/explore cycle; the threshold lives in `0..bucket_size`.
    pub bucket_size: usize,
    /// Explorations between two re-selections.
    pub exploration_horizon: usize,
    /// Divisor applied to the exploration probability at each re-selection.
    pub annealing_factor: f64,
    /// Let only one thread at a time run re-selection.
    pub exclusive_maintenance: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            large_threshold: 30_000,
            bucket_size: 256,
            exploration_horizon: 256,
            annealing_factor: 1.5,
            exclusive_maintenance: false,
        }
    }
}

impl TuningConfig {
    /// Builds the layered figment: defaults, TOML file, environment.
    ///
    /// Without `path`, [`DEFAULT_CONFIG_FILE`] is used if it exists.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads and validates the layered configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the router or dispatcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.large_threshold <= SMALL_BAND_MAX {
            return Err(Error::InvalidConfig(format!(
                "large_threshold must exceed {SMALL_BAND_MAX}, got {}",
                self.large_threshold
            )));
        }
        if self.bucket_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "bucket_size must be at least 2, got {}",
                self.bucket_size
            )));
        }
        if self.exploration_horizon == 0 {
            return Err(Error::InvalidConfig(
                "exploration_horizon must be at least 1".to_string(),
            ));
        }
        if !self.annealing_factor.is_finite() || self.annealing_factor <= 1.0 {
            return Err(Error::InvalidConfig(format!(
                "annealing_factor must be finite and greater than 1.0, got {}",
                self.annealing_factor
            )));
        }
        Ok(())
    }
}
