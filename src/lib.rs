//! trie-esn — trie-conditioned echo state network.
//!
//! Core mapping:
//!   - Trie: depth-bounded byte prefix tree; the walk picks the transition
//!   - Reservoir: one fixed random R×R matrix per trie depth
//!   - Dynamics: h ← alpha · tanh(W⁽ᵈ⁾ h + noise), one step per symbol;
//!     optional fixed symbol drive u(s) inside the tanh
//!   - Readout: linear + softmax, the only trained part (online SGD)

pub mod errors;
pub mod config;
pub mod trie;
pub mod bank;
pub mod reservoir;
pub mod readout;
pub mod model;
pub mod train;
pub mod data;

pub use config::{ModelConfig, ScalingStrategy, TrainConfig};
pub use errors::{EsnError, Result};
pub use model::Model;
pub use trie::{build_trie, Trie};
