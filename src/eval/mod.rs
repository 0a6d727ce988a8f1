use anyhow::Result;
use std::path::Path;
use crate::encoder::EncodedState;

pub mod mlp;

pub use mlp::Mlp;

/// Scalar value function over encoded positions, trained by regression.
/// `Clone` yields a structurally identical copy used as the target estimator.
pub trait ValueEstimator: Clone + Send + Sync {
    fn evaluate(&self, state: &EncodedState) -> f32;

    fn evaluate_batch(&self, states: &[EncodedState]) -> Vec<f32> {
        states.iter().map(|s| self.evaluate(s)).collect()
    }

    /// One gradient step on (state, target) pairs; returns the pre-step loss.
    fn train_batch(&mut self, states: &[EncodedState], targets: &[f32]) -> f32;

    /// Flat parameter vector.
    fn weights(&self) -> Vec<f32>;

    fn set_weights(&mut self, weights: &[f32]) -> Result<()>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}

/// target <- theta * active + (1 - theta) * target
pub fn soft_update<E: ValueEstimator>(target: &mut E, active: &E, theta: f32) -> Result<()> {
    let a = active.weights();
    let mut t = target.weights();
    for (tw, aw) in t.iter_mut().zip(a.iter()) {
        *tw = theta * aw + (1.0 - theta) * *tw;
    }
    target.set_weights(&t)
}
