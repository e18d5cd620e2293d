//! Depth-indexed reservoir weight bank.
//!
//! One R×R recurrent matrix per trie depth, drawn uniformly from [-1, 1]
//! and rescaled toward a target `rho`. The default rescaling is a
//! heuristic: it makes the *mean absolute entry* equal `rho`, which only
//! loosely tracks the spectral radius. No contraction is guaranteed.
//!
//! The bank also carries one fixed drive vector per alphabet symbol. Like
//! the matrices, these are drawn once and never trained.

use rand::Rng;

use crate::config::{ModelConfig, ScalingStrategy, DEGENERATE_MEAN_ABS};
use crate::errors::{EsnError, Result};

/// Uniform sample in [-1, 1).
#[inline]
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>() * 2.0 - 1.0
}

/// Mean absolute value of a slice (0 for an empty slice).
pub fn mean_abs(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|w| w.abs()).sum::<f64>() / values.len() as f64
}

/// Largest absolute row sum of a dim×dim row-major matrix.
pub fn max_row_sum(weights: &[f64], dim: usize) -> f64 {
    weights
        .chunks(dim)
        .map(|row| row.iter().map(|w| w.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Rescale `weights` in place toward `rho`; returns the factor applied.
///
/// Falls back to a factor of 1 when the measured magnitude is below
/// [`DEGENERATE_MEAN_ABS`].
pub fn scale_matrix(weights: &mut [f64], dim: usize, rho: f64, strategy: ScalingStrategy) -> f64 {
    let measured = match strategy {
        ScalingStrategy::MeanAbs => mean_abs(weights),
        ScalingStrategy::MaxRowSum => max_row_sum(weights, dim),
        ScalingStrategy::Unscaled => return 1.0,
    };
    let scale = if measured > DEGENERATE_MEAN_ABS { rho / measured } else { 1.0 };
    for w in weights.iter_mut() {
        *w *= scale;
    }
    scale
}

// ---------------------------------------------------------------------------
// ReservoirBank
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ReservoirBank {
    /// Reservoir dimension R
    pub reservoir_size: usize,
    pub rho: f64,
    pub scaling: ScalingStrategy,
    /// depth_count matrices, each R×R row-major
    matrices: Vec<Vec<f64>>,
    /// alphabet_size drive vectors of length R; empty when drive is disabled
    inputs: Vec<Vec<f64>>,
}

impl ReservoirBank {
    /// Mean-abs scaled bank with no symbol drive.
    pub fn initialize<R: Rng + ?Sized>(
        depth_count: usize,
        reservoir_size: usize,
        rho: f64,
        rng: &mut R,
    ) -> Result<Self> {
        Self::build(depth_count, reservoir_size, rho, ScalingStrategy::MeanAbs, 0, 0.0, rng)
    }

    /// Bank sized for `config.max_depth` levels, with symbol drive vectors
    /// when `config.input_scale > 0`.
    pub fn from_config<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        Self::build(
            config.max_depth,
            config.reservoir_size,
            config.rho,
            config.scaling,
            config.alphabet_size,
            config.input_scale,
            rng,
        )
    }

    fn build<R: Rng + ?Sized>(
        depth_count: usize,
        reservoir_size: usize,
        rho: f64,
        scaling: ScalingStrategy,
        alphabet_size: usize,
        input_scale: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if depth_count == 0 {
            return Err(EsnError::config("weight bank needs at least one depth level"));
        }
        if reservoir_size == 0 {
            return Err(EsnError::config("reservoir_size must be > 0"));
        }

        let r2 = reservoir_size * reservoir_size;
        let matrices: Vec<Vec<f64>> = (0..depth_count)
            .map(|_| {
                let mut w: Vec<f64> = (0..r2).map(|_| uniform(rng)).collect();
                scale_matrix(&mut w, reservoir_size, rho, scaling);
                w
            })
            .collect();

        let inputs: Vec<Vec<f64>> = if input_scale > 0.0 {
            (0..alphabet_size)
                .map(|_| (0..reservoir_size).map(|_| input_scale * uniform(rng)).collect())
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            depth_count,
            reservoir_size,
            rho,
            ?scaling,
            drive = !inputs.is_empty(),
            "reservoir bank initialized"
        );

        Ok(Self {
            reservoir_size,
            rho,
            scaling,
            matrices,
            inputs,
        })
    }

    /// Number of depth levels.
    pub fn depth_count(&self) -> usize {
        self.matrices.len()
    }

    /// Recurrent matrix for `depth`.
    pub fn matrix(&self, depth: usize) -> Result<&[f64]> {
        self.matrices.get(depth).map(Vec::as_slice).ok_or_else(|| {
            EsnError::config(format!(
                "no weight matrix for depth {depth}; bank has {} levels",
                self.matrices.len()
            ))
        })
    }

    /// Drive vector for `symbol`, or `None` when drive is disabled.
    #[inline]
    pub fn input(&self, symbol: u8) -> Option<&[f64]> {
        self.inputs.get(symbol as usize).map(Vec::as_slice)
    }

    pub fn has_drive(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn matrices(&self) -> impl Iterator<Item = &[f64]> {
        self.matrices.iter().map(Vec::as_slice)
    }

    /// Fail unless the bank covers exactly `max_depth` levels of size `reservoir_size`.
    pub fn check_shape(&self, max_depth: usize, reservoir_size: usize) -> Result<()> {
        if self.matrices.len() != max_depth {
            return Err(EsnError::config(format!(
                "weight bank has {} levels but max_depth is {}",
                self.matrices.len(),
                max_depth
            )));
        }
        if self.reservoir_size != reservoir_size {
            return Err(EsnError::DimensionMismatch {
                expected: reservoir_size,
                got: self.reservoir_size,
            });
        }
        Ok(())
    }

    pub fn size_bytes(&self) -> usize {
        let entries: usize = self.matrices.iter().chain(self.inputs.iter()).map(Vec::len).sum();
        entries * std::mem::size_of::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_mean_abs_hits_rho() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let bank = ReservoirBank::initialize(16, 64, 0.9, &mut rng).unwrap();
        assert_eq!(bank.depth_count(), 16);
        for w in bank.matrices() {
            assert_eq!(w.len(), 64 * 64);
            assert!((mean_abs(w) - 0.9).abs() < 1e-9, "mean_abs = {}", mean_abs(w));
            assert!(w.iter().all(|x| x.abs() <= 0.9 / 0.4));
        }
        assert!(!bank.has_drive());
    }

    #[test]
    fn test_degenerate_matrix_unscaled() {
        let mut zeros = vec![0.0; 16];
        assert_eq!(scale_matrix(&mut zeros, 4, 0.9, ScalingStrategy::MeanAbs), 1.0);
        assert!(zeros.iter().all(|&w| w == 0.0));

        let mut tiny = vec![1e-7; 16];
        assert_eq!(scale_matrix(&mut tiny, 4, 0.9, ScalingStrategy::MeanAbs), 1.0);
        assert_eq!(tiny[0], 1e-7);
    }

    #[test]
    fn test_max_row_sum_strategy() {
        let mut w = vec![1.0, -1.0, 2.0, 0.5];
        let scale = scale_matrix(&mut w, 2, 0.9, ScalingStrategy::MaxRowSum);
        assert!((scale - 0.45).abs() < 1e-12);
        assert!((max_row_sum(&w, 2) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_unscaled_strategy() {
        let mut w = vec![0.3, -0.7];
        assert_eq!(scale_matrix(&mut w, 1, 0.9, ScalingStrategy::Unscaled), 1.0);
        assert_eq!(w, vec![0.3, -0.7]);
    }

    #[test]
    fn test_levels_are_independent() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bank = ReservoirBank::initialize(3, 8, 0.9, &mut rng).unwrap();
        let m0 = bank.matrix(0).unwrap();
        let m1 = bank.matrix(1).unwrap();
        assert_ne!(m0, m1);
        assert!(bank.matrix(3).is_err());
    }

    #[test]
    fn test_same_seed_same_bank() {
        let config = ModelConfig {
            reservoir_size: 8,
            max_depth: 4,
            input_scale: 0.5,
            ..ModelConfig::default()
        };
        let a = ReservoirBank::from_config(&config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = ReservoirBank::from_config(&config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
        assert!(a.has_drive());
        let u = a.input(b'a').unwrap();
        assert_eq!(u.len(), 8);
        assert!(u.iter().all(|x| x.abs() <= 0.5));
    }

    #[test]
    fn test_default_config_has_no_drive() {
        let config = ModelConfig { reservoir_size: 8, max_depth: 4, ..ModelConfig::default() };
        let bank = ReservoirBank::from_config(&config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert!(!bank.has_drive());
        assert!(bank.input(b'a').is_none());
        assert_eq!(bank.size_bytes(), 4 * 8 * 8 * 8);
    }

    #[test]
    fn test_check_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let bank = ReservoirBank::initialize(4, 8, 0.9, &mut rng).unwrap();
        bank.check_shape(4, 8).unwrap();
        assert!(matches!(bank.check_shape(5, 8), Err(EsnError::Configuration(_))));
        assert!(matches!(
            bank.check_shape(4, 16),
            Err(EsnError::DimensionMismatch { expected: 16, got: 8 })
        ));
        assert!(ReservoirBank::initialize(0, 8, 0.9, &mut rng).is_err());
    }
}
