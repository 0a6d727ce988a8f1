use anyhow::{Context, Result};
use cozy_chess::{Color, Move};
use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use crate::board::{BoardController, NextState};
use crate::encoder::EncodedState;
use crate::eval::{soft_update, ValueEstimator};
use crate::memory::{ExperienceRecord, ReplayMemory};
use crate::reward::{evaluate, Outcome, Reward, RewardPolicy};

#[derive(Clone, Debug)]
pub struct StepReport {
    pub mv: Move,
    pub mirrored: bool,
    pub explored: bool,
    pub outcome: Outcome,
    pub reward: Reward,
    pub stored: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct TrainReport {
    pub batch: usize,
    pub loss: f32,
}

/// Black acts through the mirrored view so one estimator always scores "White to move".
pub fn acting_mirror(board: &BoardController) -> bool {
    board.turn() == Color::Black
}

/// Highest-scoring candidate; ties keep the first one enumerated.
pub fn choose_best<E: ValueEstimator>(estimator: &E, candidates: &[NextState]) -> Option<(usize, f32)> {
    let states: Vec<EncodedState> = candidates.iter().map(|c| c.state.clone()).collect();
    let scores = estimator.evaluate_batch(&states);
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if best.map_or(true, |(_, b)| s > b) { best = Some((i, s)); }
    }
    best
}

/// Bootstrap target for one stored record, using `target` to play the
/// opponent's best reply and to value our best continuation.
pub fn reinforced_target<E: ValueEstimator>(
    target: &E,
    policy: RewardPolicy,
    max_plies: u32,
    rec: &ExperienceRecord,
    gamma: f32,
) -> Result<f32> {
    let mut board = BoardController::from_fen(&rec.fen, max_plies)?;
    if board.game_over() {
        return Ok(rec.reward);
    }
    let mirror = acting_mirror(&board);
    let replies = board.legal_next_states(mirror)?;
    let Some((best, _)) = choose_best(target, &replies) else { return Ok(rec.reward) };
    board.commit(replies[best].mv, mirror)?;
    let (outcome, reward) = evaluate(&mut board, policy);
    let opponent = reward.value().unwrap_or(0.0);
    if opponent > policy.attack_reward() {
        return Ok(rec.reward - gamma * opponent);
    }
    // A finished or reset game has no continuation to value.
    let own_next = if outcome.is_terminal() || board.ply() == 0 {
        0.0
    } else {
        let own = board.legal_next_states(acting_mirror(&board))?;
        choose_best(target, &own).map_or(0.0, |(_, v)| v)
    };
    Ok(rec.reward + gamma * (own_next - opponent))
}

/// Epsilon-greedy self-play plus replay-driven updates of an active estimator
/// against a slowly tracking target copy.
pub struct Trainer<E: ValueEstimator, M: ReplayMemory> {
    active: E,
    target: E,
    memory: M,
    policy: RewardPolicy,
    max_plies: u32,
    step: u64,
    rng: SmallRng,
}

impl<E: ValueEstimator, M: ReplayMemory> Trainer<E, M> {
    pub fn new(active: E, memory: M, policy: RewardPolicy, max_plies: u32, seed: u64) -> Self {
        let target = active.clone();
        Self::from_parts(active, target, memory, policy, max_plies, seed)
    }

    pub fn from_parts(active: E, target: E, memory: M, policy: RewardPolicy, max_plies: u32, seed: u64) -> Self {
        Self { active, target, memory, policy, max_plies, step: 0, rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn active(&self) -> &E { &self.active }
    pub fn target(&self) -> &E { &self.target }
    pub fn memory(&self) -> &M { &self.memory }
    pub fn memory_mut(&mut self) -> &mut M { &mut self.memory }
    pub fn policy(&self) -> RewardPolicy { self.policy }
    pub fn step(&self) -> u64 { self.step }
    pub fn set_step(&mut self, step: u64) { self.step = step; }

    pub fn into_parts(self) -> (E, E, M) { (self.active, self.target, self.memory) }

    /// Choose and commit one move on `board`, score it, and store the
    /// experience unless the reward says to ignore the step.
    /// Returns `None` (after resetting the board) if no move exists.
    pub fn take_action(&mut self, board: &mut BoardController, epsilon: f32) -> Result<Option<StepReport>> {
        let mirror = acting_mirror(board);
        let mut candidates = board.legal_next_states(mirror)?;
        if candidates.is_empty() {
            warn!("no legal moves in {}; resetting board", board.fen());
            board.reset();
            return Ok(None);
        }
        let explored = self.rng.gen::<f32>() < epsilon;
        let pick = if explored {
            self.rng.gen_range(0..candidates.len())
        } else {
            choose_best(&self.active, &candidates).map_or(0, |(i, _)| i)
        };
        let chosen = candidates.swap_remove(pick);
        board.commit(chosen.mv, mirror)?;
        let (outcome, reward) = evaluate(board, self.policy);
        self.step += 1;
        let stored = match reward {
            Reward::Scored(value) => {
                self.memory.add(ExperienceRecord { state: chosen.state, fen: chosen.fen, reward: value })?;
                true
            }
            Reward::Ignore => false,
        };
        Ok(Some(StepReport { mv: chosen.mv, mirrored: mirror, explored, outcome, reward, stored }))
    }

    /// One gradient step from a replay batch, then a soft target update when
    /// `theta > 0`. `None` when the memory cannot supply a batch yet.
    pub fn train(&mut self, batch_size: usize, gamma: f32, theta: f32, min_rows: Option<usize>) -> Result<Option<TrainReport>> {
        self.memory.refresh_sources(self.step).context("refresh replay sources")?;
        let Some(batch) = self.memory.get_batch(batch_size, min_rows) else {
            debug!("step {}: no batch available, skipping update", self.step);
            return Ok(None);
        };
        let (target, policy, max_plies) = (&self.target, self.policy, self.max_plies);
        let targets = batch
            .par_iter()
            .map(|rec| reinforced_target(target, policy, max_plies, rec, gamma).with_context(|| format!("target for {}", rec.fen)))
            .collect::<Result<Vec<f32>>>()?;
        let states: Vec<EncodedState> = batch.into_iter().map(|r| r.state).collect();
        let loss = self.active.train_batch(&states, &targets);
        if theta > 0.0 {
            soft_update(&mut self.target, &self.active, theta)?;
        }
        debug!("step {}: trained on {} records, loss {:.4}", self.step, states.len(), loss);
        Ok(Some(TrainReport { batch: states.len(), loss }))
    }
}
