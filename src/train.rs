//! Training driver: online readout SGD over a labeled set.
//!
//! Each epoch visits every example in order: fresh zero state, trie walk,
//! one readout step. The learning rate decays by `decay_factor` every
//! `decay_interval` epochs. No convergence check and no early stopping;
//! the configured epoch count always runs.

use crate::config::TrainConfig;
use crate::errors::{EsnError, Result};
use crate::model::Model;
use crate::readout::argmax;

// ---------------------------------------------------------------------------
// Training data
// ---------------------------------------------------------------------------

/// A single training example: byte sequence → gold class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingSample {
    pub sequence: Vec<u8>,
    pub label: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TrainingSet {
    pub samples: Vec<TrainingSample>,
    pub name: String,
}

impl TrainingSet {
    pub fn new(name: &str) -> Self {
        Self {
            samples: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn add<S: AsRef<[u8]>>(&mut self, sequence: S, label: usize) -> &mut Self {
        self.samples.push(TrainingSample {
            sequence: sequence.as_ref().to_vec(),
            label,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn check_labels(&self, classes: usize) -> Result<()> {
        match self.samples.iter().find(|s| s.label >= classes) {
            Some(s) => Err(EsnError::InvalidLabel { index: s.label, classes }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct TrainReport {
    pub epochs: usize,
    /// Mean pre-update cross-entropy per epoch
    pub epoch_losses: Vec<f64>,
    /// Learning rate after the last decay
    pub final_learning_rate: f64,
    pub steps: usize,
}

impl TrainReport {
    pub fn first_loss(&self) -> Option<f64> {
        self.epoch_losses.first().copied()
    }

    pub fn last_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

#[derive(Clone, Debug)]
pub struct SampleResult {
    pub label: usize,
    pub predicted: usize,
    pub gold_probability: f64,
    /// False if the trie walk stopped on a missing edge
    pub recognized: bool,
}

#[derive(Clone, Debug)]
pub struct Evaluation {
    pub accuracy: f64,
    pub mean_gold_probability: f64,
    pub results: Vec<SampleResult>,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub fn train(model: &mut Model, training: &TrainingSet, config: &TrainConfig) -> Result<TrainReport> {
    config.validate()?;
    if training.is_empty() {
        return Err(EsnError::config("Training set is empty"));
    }
    training.check_labels(model.config().out_dim)?;

    let mut learning_rate = config.learning_rate;
    let mut epoch_losses = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        let mut total = 0.0;
        for sample in &training.samples {
            let state = model.forward(&sample.sequence)?;
            total += model.train_step(&state, sample.label, learning_rate)?;
        }
        let mean = total / training.len() as f64;
        epoch_losses.push(mean);
        tracing::debug!(epoch, loss = mean, learning_rate, "epoch complete");

        if epoch % config.decay_interval == config.decay_interval - 1 {
            learning_rate *= config.decay_factor;
        }
    }

    tracing::info!(
        set = %training.name,
        epochs = config.epochs,
        first_loss = epoch_losses.first().copied().unwrap_or(f64::NAN),
        last_loss = epoch_losses.last().copied().unwrap_or(f64::NAN),
        "training finished"
    );

    Ok(TrainReport {
        epochs: config.epochs,
        steps: config.epochs * training.len(),
        epoch_losses,
        final_learning_rate: learning_rate,
    })
}

/// Classify every sample once; no training.
pub fn evaluate(model: &mut Model, training: &TrainingSet) -> Result<Evaluation> {
    if training.is_empty() {
        return Err(EsnError::config("Evaluation set is empty"));
    }
    training.check_labels(model.config().out_dim)?;

    let mut results = Vec::with_capacity(training.len());
    for sample in &training.samples {
        let (state, report) = model.trace(&sample.sequence)?;
        let probs = model.predict(&state)?;
        results.push(SampleResult {
            label: sample.label,
            predicted: argmax(&probs).unwrap_or(0),
            gold_probability: probs[sample.label],
            recognized: report.complete,
        });
    }

    let n = results.len() as f64;
    let correct = results.iter().filter(|r| r.predicted == r.label).count();
    Ok(Evaluation {
        accuracy: correct as f64 / n,
        mean_gold_probability: results.iter().map(|r| r.gold_probability).sum::<f64>() / n,
        results,
    })
}
