//! Experiment configuration.

use ht_types::{config_error, HtResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Domain, Objective};
use crate::trials::Trials;

/// Top-level configuration for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,

    /// Groups this experiment's trials inside a shared store.
    pub exp_key: Option<String>,

    /// Seed for the sampling random state. Entropy when unset.
    pub seed: Option<u64>,

    /// Passed unchanged to every objective call.
    pub fixed_params: serde_json::Value,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            exp_key: None,
            seed: None,
            fixed_params: serde_json::Value::Null,
        }
    }
}

impl ExperimentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_exp_key(mut self, exp_key: impl Into<String>) -> Self {
        self.exp_key = Some(exp_key.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fixed_params(mut self, fixed_params: serde_json::Value) -> Self {
        self.fixed_params = fixed_params;
        self
    }

    pub fn from_json_str(raw: &str) -> HtResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        if config.exp_key.as_deref() == Some("") {
            return Err(config_error!("exp_key must not be empty; omit it instead"));
        }
        Ok(config)
    }

    /// A fresh random state for one top-level evaluation sequence.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn trials(&self) -> Trials {
        Trials::new(self.exp_key.clone())
    }

    pub fn domain(&self, objective: impl Objective + 'static) -> Domain {
        Domain::new(objective, self.fixed_params.clone())
    }
}
