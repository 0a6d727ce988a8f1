use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::board::controller::DEFAULT_MAX_PLIES;
use crate::memory::PagedConfig;
use crate::reward::RewardPolicy;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Ring,
    Paged,
}

/// Training run settings; every field has a default so a JSON file only
/// needs the keys it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub name: String,
    pub start_at_step: u64,
    pub training_steps: u64,
    pub memory: MemoryKind,
    pub memory_size: usize,
    pub paged: PagedConfig,
    pub start_training_at: usize,
    pub batch: usize,
    pub gamma: f32,
    pub theta: f32,
    pub epsilon: f32,
    /// Steps below this play fully random moves.
    pub epsilon_threshold: u64,
    pub save_per_steps: u64,
    pub max_plies: u32,
    pub reward_policy: RewardPolicy,
    pub hidden: usize,
    pub learning_rate: f32,
    pub seed: u64,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let start_training_at = 2000;
        Self {
            name: "dqn".to_string(),
            start_at_step: 0,
            training_steps: 210_000,
            memory: MemoryKind::Ring,
            memory_size: 50_000,
            paged: PagedConfig::default(),
            start_training_at,
            batch: 32,
            gamma: 0.99,
            theta: 0.05,
            epsilon: 0.2,
            epsilon_threshold: (start_training_at as f64 * 1.01) as u64,
            save_per_steps: 1000,
            max_plies: DEFAULT_MAX_PLIES,
            reward_policy: RewardPolicy::Discrete,
            hidden: 200,
            learning_rate: 1e-3,
            seed: 12345,
            checkpoint_dir: PathBuf::from("checkpoints"),
        }
    }
}

impl TrainConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn epsilon_at(&self, step: u64) -> f32 {
        if step < self.epsilon_threshold { 1.0 } else { self.epsilon }
    }
}
