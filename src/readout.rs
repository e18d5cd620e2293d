//! Softmax readout — the only trainable component.
//!
//! Maps a reservoir state to class probabilities through a dense
//! out_dim × R matrix, trained online by single-example SGD on
//! cross-entropy. No bias term.

use rand::Rng;

use crate::bank::uniform;
use crate::errors::{EsnError, Result};

/// Numerically stable softmax (max logit subtracted before `exp`).
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max_score).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Index of the largest value (first on ties).
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// ReadoutModel
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ReadoutModel {
    /// Input (reservoir) dimension R
    pub reservoir_size: usize,
    /// Number of output classes
    pub out_dim: usize,
    /// out_dim × R, row-major
    pub weights: Vec<f64>,
    /// SGD steps applied so far
    pub updates: u64,
}

impl ReadoutModel {
    /// All-zero readout (uniform predictions).
    pub fn new(reservoir_size: usize, out_dim: usize) -> Self {
        Self {
            reservoir_size,
            out_dim,
            weights: vec![0.0; out_dim * reservoir_size],
            updates: 0,
        }
    }

    /// Readout with weights uniform in [-init_scale, init_scale].
    pub fn initialize<R: Rng + ?Sized>(
        reservoir_size: usize,
        out_dim: usize,
        init_scale: f64,
        rng: &mut R,
    ) -> Self {
        let weights = (0..out_dim * reservoir_size)
            .map(|_| init_scale * uniform(rng))
            .collect();
        Self {
            reservoir_size,
            out_dim,
            weights,
            updates: 0,
        }
    }

    pub fn row(&self, class: usize) -> &[f64] {
        &self.weights[class * self.reservoir_size..(class + 1) * self.reservoir_size]
    }

    fn check_state(&self, state: &[f64]) -> Result<()> {
        if state.len() != self.reservoir_size {
            return Err(EsnError::DimensionMismatch {
                expected: self.reservoir_size,
                got: state.len(),
            });
        }
        Ok(())
    }

    /// Raw class scores W · state.
    pub fn logits(&self, state: &[f64]) -> Result<Vec<f64>> {
        self.check_state(state)?;
        let logits: Vec<f64> = self
            .weights
            .chunks(self.reservoir_size)
            .map(|row| row.iter().zip(state).map(|(w, h)| w * h).sum::<f64>())
            .collect();
        if let Some(bad) = logits.iter().find(|z| !z.is_finite()) {
            return Err(EsnError::NumericOverflow(format!("non-finite logit {bad}")));
        }
        Ok(logits)
    }

    /// Class probabilities; non-negative and summing to 1.
    pub fn forward(&self, state: &[f64]) -> Result<Vec<f64>> {
        Ok(softmax(&self.logits(state)?))
    }

    /// One SGD step on cross-entropy against `gold`.
    ///
    /// Returns the loss measured before the update.
    pub fn train_step(&mut self, state: &[f64], gold: usize, learning_rate: f64) -> Result<f64> {
        if gold >= self.out_dim {
            return Err(EsnError::InvalidLabel {
                index: gold,
                classes: self.out_dim,
            });
        }
        let probs = self.forward(state)?;
        let loss = -probs[gold].max(f64::MIN_POSITIVE).ln();

        // dL/dz_i = p_i - [i == gold]
        for (i, row) in self.weights.chunks_mut(self.reservoir_size).enumerate() {
            let grad = if i == gold { probs[i] - 1.0 } else { probs[i] };
            let step = learning_rate * grad;
            for (w, &h) in row.iter_mut().zip(state) {
                *w -= step * h;
            }
        }
        self.updates += 1;
        Ok(loss)
    }

    /// Model size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.weights.len() * std::mem::size_of::<f64>()
    }
}
