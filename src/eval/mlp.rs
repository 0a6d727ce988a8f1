use anyhow::{bail, ensure, Context, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::io::{Read, Write};
use std::path::Path;
use crate::encoder::{EncodedState, STATE_LEN};
use crate::memory::codec::{open_reader, write_atomic};
use super::ValueEstimator;

const MLP_MAGIC: &[u8; 8] = b"PIEDQNV1";
const MLP_VERSION: u32 = 1;
// magic + version, input_dim, hidden_dim, learning_rate, leak
const MLP_HEADER_LEN: u64 = 8 + 5 * 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlpMeta {
    pub version: u32,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub learning_rate: f32,
    pub leak: f32,
}

/// input -> hidden (leaky ReLU) -> 1, trained with plain SGD on squared error.
#[derive(Clone, Debug)]
pub struct Mlp {
    pub meta: MlpMeta,
    w1: Vec<f32>, // hidden x input
    b1: Vec<f32>, // hidden
    w2: Vec<f32>, // hidden (single output row)
    b2: f32,
}

impl Mlp {
    /// Weights and biases drawn from N(0, 0.02).
    pub fn new(hidden_dim: usize, learning_rate: f32, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let normal = Normal::new(0.0f32, 0.02).expect("finite std dev");
        let mut draw = |n: usize| -> Vec<f32> { (0..n).map(|_| normal.sample(&mut rng)).collect() };
        let w1 = draw(hidden_dim * STATE_LEN);
        let b1 = draw(hidden_dim);
        let w2 = draw(hidden_dim);
        let b2 = draw(1)[0];
        Self {
            meta: MlpMeta { version: MLP_VERSION, input_dim: STATE_LEN, hidden_dim, learning_rate, leak: 0.01 },
            w1, b1, w2, b2,
        }
    }

    fn param_count(&self) -> usize { self.w1.len() + self.b1.len() + self.w2.len() + 1 }

    // Pre-activations of the hidden layer; inputs are sparse one-hot blocks.
    fn hidden_pre(&self, x: &[f32]) -> Vec<f32> {
        let n = self.meta.input_dim;
        let mut z = self.b1.clone();
        for (i, &v) in x.iter().enumerate().filter(|(_, v)| **v != 0.0) {
            for (j, zj) in z.iter_mut().enumerate() {
                *zj += self.w1[j * n + i] * v;
            }
        }
        z
    }

    fn act(&self, z: f32) -> f32 { if z > 0.0 { z } else { self.meta.leak * z } }

    fn forward(&self, x: &[f32]) -> (Vec<f32>, f32) {
        let z = self.hidden_pre(x);
        let out = self.b2 + z.iter().zip(&self.w2).map(|(zj, wj)| self.act(*zj) * wj).sum::<f32>();
        (z, out)
    }
}

impl ValueEstimator for Mlp {
    fn evaluate(&self, state: &EncodedState) -> f32 {
        self.forward(state.as_slice()).1
    }

    fn evaluate_batch(&self, states: &[EncodedState]) -> Vec<f32> {
        states.par_iter().map(|s| self.evaluate(s)).collect()
    }

    fn train_batch(&mut self, states: &[EncodedState], targets: &[f32]) -> f32 {
        let b = states.len().min(targets.len());
        if b == 0 { return 0.0; }
        let n = self.meta.input_dim;
        let h = self.meta.hidden_dim;
        let mut gw1 = vec![0f32; h * n];
        let mut gb1 = vec![0f32; h];
        let mut gw2 = vec![0f32; h];
        let mut gb2 = 0f32;
        let mut loss = 0f32;
        for (state, &target) in states.iter().zip(targets).take(b) {
            let x = state.as_slice();
            let (z, y) = self.forward(x);
            let err = y - target;
            loss += err * err;
            let g = 2.0 * err / b as f32;
            gb2 += g;
            for j in 0..h {
                gw2[j] += g * self.act(z[j]);
                let dz = g * self.w2[j] * if z[j] > 0.0 { 1.0 } else { self.meta.leak };
                gb1[j] += dz;
                for (i, &v) in x.iter().enumerate().filter(|(_, v)| **v != 0.0) {
                    gw1[j * n + i] += dz * v;
                }
            }
        }
        let lr = self.meta.learning_rate;
        for (w, g) in self.w1.iter_mut().zip(&gw1) { *w -= lr * g; }
        for (w, g) in self.b1.iter_mut().zip(&gb1) { *w -= lr * g; }
        for (w, g) in self.w2.iter_mut().zip(&gw2) { *w -= lr * g; }
        self.b2 -= lr * gb2;
        loss / b as f32
    }

    fn weights(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.param_count());
        out.extend_from_slice(&self.w1);
        out.extend_from_slice(&self.b1);
        out.extend_from_slice(&self.w2);
        out.push(self.b2);
        out
    }

    fn set_weights(&mut self, weights: &[f32]) -> Result<()> {
        ensure!(weights.len() == self.param_count(), "expected {} weights, got {}", self.param_count(), weights.len());
        let (w1, rest) = weights.split_at(self.w1.len());
        let (b1, rest) = rest.split_at(self.b1.len());
        let (w2, rest) = rest.split_at(self.w2.len());
        self.w1.copy_from_slice(w1);
        self.b1.copy_from_slice(b1);
        self.w2.copy_from_slice(w2);
        self.b2 = rest[0];
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        // magic b"PIEDQNV1", u32 version, u32 input_dim, u32 hidden_dim,
        // f32 learning_rate, f32 leak, then f32 w1, b1, w2, b2 (all LE)
        write_atomic(path, |w| {
            w.write_all(MLP_MAGIC)?;
            w.write_all(&self.meta.version.to_le_bytes())?;
            w.write_all(&(self.meta.input_dim as u32).to_le_bytes())?;
            w.write_all(&(self.meta.hidden_dim as u32).to_le_bytes())?;
            w.write_all(&self.meta.learning_rate.to_le_bytes())?;
            w.write_all(&self.meta.leak.to_le_bytes())?;
            for v in self.weights() { w.write_all(&v.to_le_bytes())?; }
            Ok(())
        })
    }

    fn load(path: &Path) -> Result<Self> {
        let mut r = open_reader(path)?;
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).context("read magic")?;
        if &magic != MLP_MAGIC { bail!("bad estimator magic in {}", path.display()); }
        let mut b4 = [0u8; 4];
        let mut next_u32 = |what: &str| -> Result<u32> {
            r.read_exact(&mut b4).with_context(|| format!("read {what}"))?;
            Ok(u32::from_le_bytes(b4))
        };
        let version = next_u32("version")?;
        let input_dim = next_u32("input_dim")? as usize;
        let hidden_dim = next_u32("hidden_dim")? as usize;
        let learning_rate = f32::from_bits(next_u32("learning_rate")?);
        let leak = f32::from_bits(next_u32("leak")?);
        if version != MLP_VERSION { bail!("unsupported estimator version {version}"); }
        if input_dim != STATE_LEN { bail!("estimator input_dim {input_dim} != {STATE_LEN}"); }
        let count = hidden_dim
            .checked_mul(input_dim)
            .and_then(|n| n.checked_add(2 * hidden_dim + 1))
            .and_then(|n| n.checked_mul(4))
            .with_context(|| format!("hidden_dim {hidden_dim} overflows in {}", path.display()))?;
        let file_len = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?.len();
        let body = file_len.saturating_sub(MLP_HEADER_LEN);
        if body != count as u64 {
            bail!("{} holds {body} weight bytes, header (hidden_dim {hidden_dim}) needs {count}", path.display());
        }
        let count = count / 4;
        let mut buf = vec![0u8; count * 4];
        r.read_exact(&mut buf).with_context(|| format!("read {count} weights from {}", path.display()))?;
        let weights: Vec<f32> = buf.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
        let mut mlp = Self {
            meta: MlpMeta { version, input_dim, hidden_dim, learning_rate, leak },
            w1: vec![0.0; hidden_dim * input_dim],
            b1: vec![0.0; hidden_dim],
            w2: vec![0.0; hidden_dim],
            b2: 0.0,
        };
        mlp.set_weights(&weights)?;
        Ok(mlp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    #[test]
    fn sgd_reduces_loss_on_fixed_target() {
        let mut m = Mlp::new(16, 0.01, 3);
        let s = encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let states = vec![s];
        let first = m.train_batch(&states, &[1.0]);
        let mut last = first;
        for _ in 0..50 { last = m.train_batch(&states, &[1.0]); }
        assert!(last < first, "loss did not drop: {first} -> {last}");
    }

    #[test]
    fn weights_round_trip_through_setter() {
        let a = Mlp::new(8, 0.01, 1);
        let mut b = Mlp::new(8, 0.01, 2);
        b.set_weights(&a.weights()).unwrap();
        let s = encode("8/8/8/5K1k/8/8/8/6R1 w - - 0 1").unwrap();
        assert_eq!(a.evaluate(&s), b.evaluate(&s));
        assert!(b.set_weights(&[0.0; 3]).is_err());
    }
}
