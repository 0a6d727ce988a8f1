#![allow(dead_code)]
use anyhow::Result;
use piedqn::eval::ValueEstimator;
use piedqn::memory::ExperienceRecord;
use piedqn::{encode, EncodedState};
use std::path::Path;

/// Scores one chosen state `favorite_value`, every other state `w[0]`.
#[derive(Clone, Debug)]
pub struct Scripted {
    pub w: Vec<f32>,
    pub favorite: Option<(EncodedState, f32)>,
    pub trained: Vec<Vec<f32>>,
}

impl Scripted {
    pub fn constant(v: f32) -> Self { Self { w: vec![v], favorite: None, trained: Vec::new() } }
    pub fn favoring(state: EncodedState, value: f32) -> Self {
        Self { w: vec![0.0], favorite: Some((state, value)), trained: Vec::new() }
    }
}

impl ValueEstimator for Scripted {
    fn evaluate(&self, state: &EncodedState) -> f32 {
        match &self.favorite {
            Some((fav, v)) if fav == state => *v,
            _ => self.w[0],
        }
    }
    fn train_batch(&mut self, _states: &[EncodedState], targets: &[f32]) -> f32 {
        self.trained.push(targets.to_vec());
        0.0
    }
    fn weights(&self) -> Vec<f32> { self.w.clone() }
    fn set_weights(&mut self, weights: &[f32]) -> Result<()> { self.w = weights.to_vec(); Ok(()) }
    fn save(&self, _path: &Path) -> Result<()> { Ok(()) }
    fn load(_path: &Path) -> Result<Self> { Ok(Self::constant(0.0)) }
}

pub fn record(fen: &str, reward: f32) -> ExperienceRecord {
    ExperienceRecord { state: encode(fen).unwrap(), fen: fen.to_string(), reward }
}

/// Fresh scratch directory under target/.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = Path::new("target").join("test-scratch").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
