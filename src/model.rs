//! Trie-conditioned echo state network.
//!
//! `Model` owns every piece of mutable state the classifier needs: the
//! trie, the fixed reservoir bank, the trainable readout and the RNG that
//! feeds weight initialization and step noise. Only the readout changes
//! after construction.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::bank::ReservoirBank;
use crate::config::ModelConfig;
use crate::errors::{EsnError, Result};
use crate::readout::{argmax, ReadoutModel};
use crate::reservoir::{Dynamics, Traversal};
use crate::trie::{build_trie, Trie};

#[derive(Clone, Debug)]
pub struct Model {
    config: ModelConfig,
    trie: Trie,
    bank: ReservoirBank,
    dynamics: Dynamics,
    readout: ReadoutModel,
    rng: ChaCha8Rng,
}

impl Model {
    /// Initialize the reservoir for `config.max_depth` levels and the readout.
    ///
    /// The trie must not be deeper, nor use a wider alphabet, than the config.
    pub fn new(config: ModelConfig, trie: Trie) -> Result<Self> {
        config.validate()?;
        if trie.max_depth() > config.max_depth {
            return Err(EsnError::config(format!(
                "trie max_depth {} exceeds configured max_depth {}",
                trie.max_depth(),
                config.max_depth
            )));
        }
        if trie.alphabet_size() > config.alphabet_size {
            return Err(EsnError::config(format!(
                "trie alphabet {} exceeds configured alphabet {}",
                trie.alphabet_size(),
                config.alphabet_size
            )));
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let bank = ReservoirBank::from_config(&config, &mut rng)?;
        bank.check_shape(config.max_depth, config.reservoir_size)?;
        let readout = ReadoutModel::initialize(
            config.reservoir_size,
            config.out_dim,
            config.readout_init_scale,
            &mut rng,
        );

        tracing::info!(
            reservoir_size = config.reservoir_size,
            max_depth = config.max_depth,
            out_dim = config.out_dim,
            trie_nodes = trie.node_count(),
            seeded = config.seed.is_some(),
            "model initialized"
        );

        Ok(Self {
            dynamics: Dynamics::from_config(&config),
            config,
            trie,
            bank,
            readout,
            rng,
        })
    }

    /// Build the trie from `vocabulary`, then the model.
    pub fn from_vocabulary<S: AsRef<[u8]>>(config: ModelConfig, vocabulary: &[S]) -> Result<Self> {
        let trie = build_trie(vocabulary, config.max_depth, config.alphabet_size)?;
        Self::new(config, trie)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn bank(&self) -> &ReservoirBank {
        &self.bank
    }

    pub fn readout(&self) -> &ReadoutModel {
        &self.readout
    }

    /// Restart the noise stream from a fixed seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Fixed-size embedding of `sequence`: a zeroed state walked through
    /// the trie. Stops silently at the first missing edge.
    pub fn forward(&mut self, sequence: &[u8]) -> Result<Vec<f64>> {
        self.trace(sequence).map(|(state, _)| state)
    }

    /// Embedding plus how much of `sequence` the trie recognized.
    pub fn trace(&mut self, sequence: &[u8]) -> Result<(Vec<f64>, Traversal)> {
        let mut state = vec![0.0; self.config.reservoir_size];
        let report = self
            .dynamics
            .trace(&self.trie, &self.bank, sequence, &mut state, &mut self.rng)?;
        Ok((state, report))
    }

    /// Class probabilities for an embedding.
    pub fn predict(&self, state: &[f64]) -> Result<Vec<f64>> {
        self.readout.forward(state)
    }

    /// One SGD step of the readout; the reservoir is never touched.
    pub fn train_step(&mut self, state: &[f64], gold: usize, learning_rate: f64) -> Result<f64> {
        self.readout.train_step(state, gold, learning_rate)
    }

    /// forward + predict.
    pub fn probabilities(&mut self, sequence: &[u8]) -> Result<Vec<f64>> {
        let state = self.forward(sequence)?;
        self.predict(&state)
    }

    /// Most probable class for an embedding.
    pub fn classify_state(&self, state: &[f64]) -> Result<usize> {
        let probs = self.predict(state)?;
        argmax(&probs).ok_or_else(|| EsnError::config("readout has no output classes"))
    }

    /// Most probable class for `sequence`.
    pub fn classify(&mut self, sequence: &[u8]) -> Result<usize> {
        let state = self.forward(sequence)?;
        self.classify_state(&state)
    }

    /// Bytes held by the bank and the readout weights.
    pub fn size_bytes(&self) -> usize {
        self.bank.size_bytes() + self.readout.size_bytes()
    }
}
