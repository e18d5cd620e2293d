//! Built-in demo data and file-based example loading.

use std::fs;
use std::path::Path;

use crate::config::ModelConfig;
use crate::errors::{EsnError, Result};
use crate::train::TrainingSet;

/// Drive amplitude the demo runs with.
pub const DEMO_INPUT_SCALE: f64 = 1.0;

/// Default config with symbol drive switched on.
///
/// Without drive, sequences of equal recognized length reach statistically
/// identical states, so "cat" and "dog" cannot be told apart.
pub fn demo_config() -> ModelConfig {
    ModelConfig {
        input_scale: DEMO_INPUT_SCALE,
        ..ModelConfig::default()
    }
}

/// Vocabulary the demo trie is built from.
pub fn demo_vocabulary() -> Vec<&'static str> {
    vec!["hello", "help", "helium", "cat", "dog"]
}

/// Labeled demo examples: one class per word, "helium" left unlabeled.
pub fn demo_examples() -> Vec<(&'static str, usize)> {
    vec![("hello", 0), ("cat", 1), ("dog", 2), ("help", 3)]
}

pub fn demo_training_set() -> TrainingSet {
    let mut ts = TrainingSet::new("demo");
    for (word, label) in demo_examples() {
        ts.add(word, label);
    }
    ts
}

/// Parse `sequence<TAB>label` lines.
///
/// Skips empty lines and lines starting with '#'.
pub fn parse_examples(name: &str, content: &str) -> Result<TrainingSet> {
    let mut ts = TrainingSet::new(name);
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (sequence, label) = line.rsplit_once('\t').ok_or_else(|| {
            EsnError::config(format!("line {}: expected `sequence<TAB>label`", lineno + 1))
        })?;
        let label: usize = label.trim().parse().map_err(|_| {
            EsnError::config(format!("line {}: label `{}` is not an index", lineno + 1, label.trim()))
        })?;
        ts.add(sequence, label);
    }
    Ok(ts)
}

pub fn load_examples_from_file<P: AsRef<Path>>(path: P) -> Result<TrainingSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("examples");
    parse_examples(name, &content)
}
