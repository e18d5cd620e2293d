//! Reservoir dynamics driven by a trie walk.
//!
//! h ← alpha · tanh(W⁽ᵈ⁾ · h + noise)
//!
//! where d is the depth of the trie node *before* consuming symbol s and
//! noise is uniform in [-noise_scale, noise_scale] per component. When the
//! bank carries symbol drive (`input_scale > 0`), the fixed vector u(s) is
//! added inside the tanh as well.
//!
//! Noise makes forward passes nondeterministic unless the caller seeds the
//! RNG or sets `noise_scale = 0`.

use rand::Rng;

use crate::bank::{uniform, ReservoirBank};
use crate::config::ModelConfig;
use crate::errors::{EsnError, Result};
use crate::trie::Trie;

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// How much of a sequence the trie walk recognized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Traversal {
    /// Symbols consumed (= reservoir steps taken)
    pub consumed: usize,
    /// True if the walk reached min(len, max_depth) without a missing edge
    pub complete: bool,
    /// True if the walk stopped on a node some inserted sequence ends at
    pub ended_on_leaf: bool,
    /// True if the sequence is longer than max_depth
    pub truncated: bool,
}

// ---------------------------------------------------------------------------
// Dynamics
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dynamics {
    /// Post-activation decay (< 1)
    pub alpha: f64,
    pub noise_scale: f64,
}

impl Dynamics {
    pub fn new(alpha: f64, noise_scale: f64) -> Self {
        Self { alpha, noise_scale }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.alpha, config.noise_scale)
    }

    /// One reservoir update, in place.
    ///
    /// `weights` is R×R row-major; `state` and `drive` have length R.
    pub fn step<R: Rng + ?Sized>(
        &self,
        weights: &[f64],
        drive: Option<&[f64]>,
        state: &mut [f64],
        rng: &mut R,
    ) -> Result<()> {
        let dim = state.len();
        if dim == 0 {
            return Err(EsnError::DimensionMismatch { expected: 1, got: 0 });
        }
        if weights.len() != dim * dim {
            return Err(EsnError::DimensionMismatch {
                expected: dim * dim,
                got: weights.len(),
            });
        }
        if let Some(u) = drive.filter(|u| u.len() != dim) {
            return Err(EsnError::DimensionMismatch { expected: dim, got: u.len() });
        }

        let mut raw: Vec<f64> = weights
            .chunks(dim)
            .map(|row| row.iter().zip(state.iter()).map(|(w, h)| w * h).sum::<f64>())
            .collect();

        if let Some(u) = drive {
            for (r, &x) in raw.iter_mut().zip(u) {
                *r += x;
            }
        }
        if self.noise_scale > 0.0 {
            for r in raw.iter_mut() {
                *r += self.noise_scale * uniform(rng);
            }
        }

        for (h, r) in state.iter_mut().zip(raw) {
            *h = self.alpha * r.tanh();
        }
        Ok(())
    }

    /// Walk `sequence` through `trie`, updating `state` once per consumed symbol.
    ///
    /// `state` must be zeroed by the caller. A missing edge ends the walk
    /// silently; the state accumulated so far is the result.
    pub fn forward<R: Rng + ?Sized>(
        &self,
        trie: &Trie,
        bank: &ReservoirBank,
        sequence: &[u8],
        state: &mut [f64],
        rng: &mut R,
    ) -> Result<()> {
        self.trace(trie, bank, sequence, state, rng).map(|_| ())
    }

    /// Same as [`Dynamics::forward`], also reporting how far the walk got.
    pub fn trace<R: Rng + ?Sized>(
        &self,
        trie: &Trie,
        bank: &ReservoirBank,
        sequence: &[u8],
        state: &mut [f64],
        rng: &mut R,
    ) -> Result<Traversal> {
        if state.len() != bank.reservoir_size {
            return Err(EsnError::DimensionMismatch {
                expected: bank.reservoir_size,
                got: state.len(),
            });
        }
        if trie.max_depth() > bank.depth_count() {
            return Err(EsnError::config(format!(
                "trie depth {} exceeds weight bank depth {}",
                trie.max_depth(),
                bank.depth_count()
            )));
        }

        let limit = sequence.len().min(trie.max_depth());
        let mut cur = trie.root();
        let mut consumed = 0;

        for &symbol in &sequence[..limit] {
            trie.check_symbol(symbol)?;
            let Some(next) = cur.child(symbol) else {
                break;
            };
            let weights = bank.matrix(cur.depth)?;
            self.step(weights, bank.input(symbol), state, rng)?;
            cur = next;
            consumed += 1;
        }

        Ok(Traversal {
            consumed,
            complete: consumed == limit,
            ended_on_leaf: cur.is_leaf,
            truncated: sequence.len() > trie.max_depth(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::build_trie;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(words: &[&str], dim: usize, depth: usize) -> (Trie, ReservoirBank) {
        let trie = build_trie(words, depth, 256).unwrap();
        let config = ModelConfig {
            reservoir_size: dim,
            max_depth: depth,
            input_scale: 1.0,
            ..ModelConfig::default()
        };
        let bank = ReservoirBank::from_config(&config, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        (trie, bank)
    }

    #[test]
    fn test_step_known_values() {
        // 2×2 identity, no noise: h = alpha * tanh(h + u)
        let dyn_ = Dynamics::new(0.5, 0.0);
        let w = vec![1.0, 0.0, 0.0, 1.0];
        let mut h = vec![0.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        dyn_.step(&w, Some(&[1.0, 0.0][..]), &mut h, &mut rng).unwrap();
        assert!((h[0] - 0.5 * 1.0f64.tanh()).abs() < 1e-12);
        assert!((h[1] - 0.5 * 1.0f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_step_without_drive_matches_hand_computation() {
        // h = alpha * tanh(W h + noise), noise replayed from the same seed
        let dyn_ = Dynamics::new(0.85, 0.1);
        let w = vec![0.5, -0.25, 0.1, 0.8];
        let h0 = vec![0.4, -0.6];
        let mut h = h0.clone();
        dyn_.step(&w, None, &mut h, &mut ChaCha8Rng::seed_from_u64(17)).unwrap();

        let mut replay = ChaCha8Rng::seed_from_u64(17);
        let n0 = 0.1 * uniform(&mut replay);
        let n1 = 0.1 * uniform(&mut replay);
        let e0 = 0.85 * (0.5 * 0.4 + -0.25 * -0.6 + n0).tanh();
        let e1 = 0.85 * (0.1 * 0.4 + 0.8 * -0.6 + n1).tanh();
        assert!((h[0] - e0).abs() < 1e-12, "{} vs {e0}", h[0]);
        assert!((h[1] - e1).abs() < 1e-12, "{} vs {e1}", h[1]);
        assert_ne!(n0, 0.0);
    }

    #[test]
    fn test_step_rejects_mismatched_shapes() {
        let dyn_ = Dynamics::new(0.85, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut empty: Vec<f64> = Vec::new();
        assert!(matches!(
            dyn_.step(&[], None, &mut empty, &mut rng),
            Err(EsnError::DimensionMismatch { expected: 1, got: 0 })
        ));

        let mut h = vec![0.0; 2];
        assert!(matches!(
            dyn_.step(&[1.0, 0.0, 0.0], None, &mut h, &mut rng),
            Err(EsnError::DimensionMismatch { expected: 4, got: 3 })
        ));
        assert!(matches!(
            dyn_.step(&[1.0, 0.0, 0.0, 1.0], Some(&[1.0][..]), &mut h, &mut rng),
            Err(EsnError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(h, vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_state_without_drive_or_noise_stays_zero() {
        let dyn_ = Dynamics::new(0.85, 0.0);
        let w = vec![0.3; 16];
        let mut h = vec![0.0; 4];
        dyn_.step(&w, None, &mut h, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert!(h.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_state_bounded_by_alpha() {
        let (trie, bank) = setup(&["abcdefgh"], 16, 8);
        let dyn_ = Dynamics::new(0.85, 0.01);
        let mut h = vec![0.0; 16];
        dyn_.forward(&trie, &bank, b"abcdefgh", &mut h, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert!(h.iter().all(|x| x.abs() <= 0.85));
        assert!(h.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_uses_matrix_of_current_depth() {
        let (trie, bank) = setup(&["ab"], 8, 4);
        let dyn_ = Dynamics::new(0.85, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut walked = vec![0.0; 8];
        dyn_.forward(&trie, &bank, b"ab", &mut walked, &mut rng).unwrap();

        let mut manual = vec![0.0; 8];
        dyn_.step(bank.matrix(0).unwrap(), bank.input(b'a'), &mut manual, &mut rng).unwrap();
        dyn_.step(bank.matrix(1).unwrap(), bank.input(b'b'), &mut manual, &mut rng).unwrap();
        assert_eq!(walked, manual);
    }

    #[test]
    fn test_early_stop_on_missing_edge() {
        let (trie, bank) = setup(&["cat", "dog"], 16, 16);
        let dyn_ = Dynamics::new(0.85, 0.01);

        let mut full = vec![0.0; 16];
        let report = dyn_
            .trace(&trie, &bank, b"catalog", &mut full, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert_eq!(report.consumed, 3);
        assert!(!report.complete);
        assert!(report.ended_on_leaf);

        let mut cat = vec![0.0; 16];
        let report = dyn_
            .trace(&trie, &bank, b"cat", &mut cat, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert!(report.complete);
        assert_eq!(full, cat);
    }

    #[test]
    fn test_unknown_first_symbol_leaves_state_untouched() {
        let (trie, bank) = setup(&["cat"], 8, 4);
        let dyn_ = Dynamics::new(0.85, 0.01);
        let mut h = vec![0.0; 8];
        let report = dyn_.trace(&trie, &bank, b"zebra", &mut h, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert_eq!(report.consumed, 0);
        assert!(h.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let trie = build_trie(&["ab"], 4, 100).unwrap();
        let config = ModelConfig { reservoir_size: 8, max_depth: 4, ..ModelConfig::default() };
        let bank = ReservoirBank::from_config(&config, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        let dyn_ = Dynamics::from_config(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut short = vec![0.0; 3];
        assert!(matches!(
            dyn_.forward(&trie, &bank, b"ab", &mut short, &mut rng),
            Err(EsnError::DimensionMismatch { expected: 8, got: 3 })
        ));

        let mut h = vec![0.0; 8];
        assert!(matches!(
            dyn_.forward(&trie, &bank, &[b'a', 150], &mut h, &mut rng),
            Err(EsnError::OutOfRangeSymbol { symbol: 150, alphabet_size: 100 })
        ));

        let deep = build_trie(&["ab"], 6, 100).unwrap();
        assert!(matches!(
            dyn_.forward(&deep, &bank, b"ab", &mut h, &mut rng),
            Err(EsnError::Configuration(_))
        ));
    }
}
