use serde::{Deserialize, Serialize};

/// Central configuration for the label model.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LabelModelConfig {
    /// RNG seed. Training itself is deterministic (full-batch gradient
    /// descent from a constant init); the seed is carried for the synthetic
    /// data generator and future stochastic extensions.
    pub seed: u64,

    /// Enables progress reporting during training.
    pub verbose: bool,

    pub train: TrainConfig,
}

/// Hyper-parameters for the accuracy-fitting loop.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TrainConfig {
    /// Initial value for every gamma parameter. Must be non-zero: a zero
    /// init is a fixed point of the pairwise-product loss (all gradients
    /// vanish). Also serves as the center of the L2 prior.
    pub gamma_init: f64,

    /// L2 regularization strength, centered around `gamma_init`. 0 disables.
    pub l2: f64,

    /// Number of full-batch gradient steps. The only stopping criterion.
    pub n_epochs: usize,

    /// Report the loss every `print_at` epochs (and on the final epoch).
    pub print_at: usize,

    pub optimizer: SgdConfig,
}

/// Momentum SGD settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SgdConfig {
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
}

impl LabelModelConfig {
    pub fn new(seed: u64, verbose: bool, train: TrainConfig) -> Self {
        Self {
            seed,
            verbose,
            train,
        }
    }
}

impl Default for LabelModelConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            verbose: false,
            train: TrainConfig::default(),
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            gamma_init: 0.8,
            l2: 0.0,
            n_epochs: 100,
            print_at: 10,
            optimizer: SgdConfig::default(),
        }
    }
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            lr: 0.01,
            momentum: 0.9,
            weight_decay: 0.0,
        }
    }
}
