use serde::{Deserialize, Serialize};
use log::debug;
use crate::board::BoardController;

/// Two reward-shaping schemes. `Discrete` is the default; `Shaped` adds a
/// per-ply penalty and punishes draws instead of discarding them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardPolicy {
    #[default]
    Discrete,
    Shaped,
}

pub const CHECKMATE_REWARD: f32 = 100.0;
pub const DISCRETE_ATTACK_REWARD: f32 = 5.0;
pub const SHAPED_ATTACK_REWARD: f32 = 15.0;
pub const SHAPED_DRAW_REWARD: f32 = -10.0;
pub const SHAPED_TURN_PENALTY: f32 = -0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reward {
    Scored(f32),
    /// Step carries no learning signal and must not be stored.
    Ignore,
}

impl Reward {
    pub fn value(self) -> Option<f32> {
        match self { Reward::Scored(v) => Some(v), Reward::Ignore => None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checkmate,
    Draw,
    Attack,
    Ordinary,
}

impl Outcome {
    pub fn is_terminal(self) -> bool { matches!(self, Outcome::Checkmate | Outcome::Draw) }
}

impl RewardPolicy {
    pub fn attack_reward(self) -> f32 {
        match self {
            RewardPolicy::Discrete => DISCRETE_ATTACK_REWARD,
            RewardPolicy::Shaped => SHAPED_ATTACK_REWARD,
        }
    }

    pub fn reward_for(self, outcome: Outcome, ply: u32) -> Reward {
        let penalty = SHAPED_TURN_PENALTY * ply as f32;
        match (self, outcome) {
            (_, Outcome::Checkmate) => Reward::Scored(CHECKMATE_REWARD),
            (RewardPolicy::Discrete, Outcome::Draw) => Reward::Ignore,
            (RewardPolicy::Shaped, Outcome::Draw) => Reward::Scored(SHAPED_DRAW_REWARD),
            (RewardPolicy::Discrete, Outcome::Attack) => Reward::Scored(DISCRETE_ATTACK_REWARD),
            (RewardPolicy::Shaped, Outcome::Attack) => Reward::Scored(SHAPED_ATTACK_REWARD + penalty),
            (RewardPolicy::Discrete, Outcome::Ordinary) => Reward::Scored(0.0),
            (RewardPolicy::Shaped, Outcome::Ordinary) => Reward::Scored(penalty),
        }
    }
}

/// Classify the step just committed on `board`; first match wins:
/// checkmate, draw, attack, ordinary. The pending attack flag is consumed.
pub fn classify(board: &mut BoardController) -> Outcome {
    let attacked = board.take_attacked();
    if board.is_checkmate() {
        Outcome::Checkmate
    } else if board.is_draw() {
        Outcome::Draw
    } else if attacked {
        Outcome::Attack
    } else {
        Outcome::Ordinary
    }
}

/// Reward for the step just committed. Terminal positions and timeouts reset
/// the board to the start, so a second call on the same step sees a fresh game.
pub fn evaluate(board: &mut BoardController, policy: RewardPolicy) -> (Outcome, Reward) {
    let ply = board.ply();
    let outcome = classify(board);
    let reward = policy.reward_for(outcome, ply);
    if outcome.is_terminal() || board.timeout() {
        debug!("game finished at ply {} ({:?}, result {:?}); resetting", ply, outcome, board.result());
        board.reset();
    }
    (outcome, reward)
}
