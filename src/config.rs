//! Model and training configuration.
//!
//! Defaults reproduce the reference setup: 64-dim reservoir, 16 trie levels,
//! alpha = 0.85, rho = 0.9, four output classes, lr 0.01 decayed by 0.9
//! every 20 epochs, no symbol drive. Both configs deserialize from JSON with every field
//! optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{EsnError, Result};

/// Largest alphabet a byte-symbol trie can address.
pub const MAX_ALPHABET: usize = 256;

/// Below this mean |w| the mean-abs heuristic leaves the matrix unscaled.
pub const DEGENERATE_MEAN_ABS: f64 = 1e-5;

// ---------------------------------------------------------------------------
// ScalingStrategy
// ---------------------------------------------------------------------------

/// How each depth matrix is rescaled toward the target `rho`.
///
/// None of these computes eigenvalues. `MeanAbs` is the cheap heuristic
/// the model is tuned for; `MaxRowSum` normalizes the induced infinity norm,
/// which upper-bounds the spectral radius.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    #[default]
    MeanAbs,
    MaxRowSum,
    Unscaled,
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of distinct byte symbols accepted (<= 256)
    pub alphabet_size: usize,
    /// Reservoir dimension R
    pub reservoir_size: usize,
    /// Trie depth bound D; also the number of weight matrices
    pub max_depth: usize,
    /// Post-activation decay
    pub alpha: f64,
    /// Target for the matrix scaling heuristic
    pub rho: f64,
    /// Output cardinality
    pub out_dim: usize,
    /// Amplitude of the uniform noise injected at each step
    pub noise_scale: f64,
    /// Amplitude of the fixed per-symbol drive vectors. The default 0 keeps
    /// the plain recurrence, where symbols only select trie edges.
    pub input_scale: f64,
    /// Amplitude of the initial readout weights
    pub readout_init_scale: f64,
    pub scaling: ScalingStrategy,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            alphabet_size: MAX_ALPHABET,
            reservoir_size: 64,
            max_depth: 16,
            alpha: 0.85,
            rho: 0.9,
            out_dim: 4,
            noise_scale: 0.01,
            input_scale: 0.0,
            readout_init_scale: 0.01,
            scaling: ScalingStrategy::MeanAbs,
            seed: None,
        }
    }
}

impl ModelConfig {
    /// Same config with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }

    /// Fail fast on inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.alphabet_size == 0 || self.alphabet_size > MAX_ALPHABET {
            return Err(EsnError::config(format!(
                "alphabet_size must be in 1..={}, got {}",
                MAX_ALPHABET, self.alphabet_size
            )));
        }
        if self.reservoir_size == 0 {
            return Err(EsnError::config("reservoir_size must be > 0"));
        }
        if self.max_depth == 0 {
            return Err(EsnError::config("max_depth must be > 0"));
        }
        if self.out_dim == 0 {
            return Err(EsnError::config("out_dim must be > 0"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(EsnError::config(format!("alpha must be in (0, 1], got {}", self.alpha)));
        }
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(EsnError::config(format!("rho must be positive, got {}", self.rho)));
        }
        for (name, value) in [
            ("noise_scale", self.noise_scale),
            ("input_scale", self.input_scale),
            ("readout_init_scale", self.readout_init_scale),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EsnError::config(format!("{name} must be >= 0, got {value}")));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

// ---------------------------------------------------------------------------
// TrainConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Multiplier applied every `decay_interval` epochs
    pub decay_factor: f64,
    pub decay_interval: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.01,
            decay_factor: 0.9,
            decay_interval: 20,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EsnError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.decay_factor.is_finite() && self.decay_factor > 0.0) {
            return Err(EsnError::config(format!(
                "decay_factor must be positive, got {}",
                self.decay_factor
            )));
        }
        if self.decay_interval == 0 {
            return Err(EsnError::config("decay_interval must be > 0"));
        }
        Ok(())
    }

    /// Learning rate in effect during `epoch` (0-based).
    pub fn rate_at(&self, epoch: usize) -> f64 {
        let decays = epoch / self.decay_interval;
        self.learning_rate * self.decay_factor.powi(decays as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ModelConfig::default().validate().unwrap();
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn default_has_no_symbol_drive() {
        assert_eq!(ModelConfig::default().input_scale, 0.0);
        let config = ModelConfig::from_json_str(r#"{"input_scale": 1.0}"#).unwrap();
        assert_eq!(config.input_scale, 1.0);
    }

    #[test]
    fn rejects_oversized_alphabet() {
        let config = ModelConfig { alphabet_size: 300, ..ModelConfig::default() };
        assert!(matches!(config.validate(), Err(EsnError::Configuration(_))));
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        let config = ModelConfig { alpha: 1.5, ..ModelConfig::default() };
        assert!(config.validate().is_err());
        let config = ModelConfig { alpha: 0.0, ..ModelConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = ModelConfig::from_json_str(r#"{"reservoir_size": 32, "scaling": "max_row_sum"}"#)
            .unwrap();
        assert_eq!(config.reservoir_size, 32);
        assert_eq!(config.scaling, ScalingStrategy::MaxRowSum);
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        assert!(matches!(
            ModelConfig::from_json_str(r#"{"max_depth": 0}"#),
            Err(EsnError::Configuration(_))
        ));
        assert!(matches!(ModelConfig::from_json_str("{"), Err(EsnError::Json(_))));
    }

    #[test]
    fn rate_decays_every_interval() {
        let tc = TrainConfig::default();
        assert_eq!(tc.rate_at(0), 0.01);
        assert_eq!(tc.rate_at(19), 0.01);
        assert!((tc.rate_at(20) - 0.009).abs() < 1e-12);
        assert!((tc.rate_at(99) - 0.01 * 0.9f64.powi(4)).abs() < 1e-12);
    }
}
