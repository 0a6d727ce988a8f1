use piedqn::board::{BoardController, START_FEN};
use piedqn::reward::{evaluate, Outcome, Reward, RewardPolicy};
use pretty_assertions::assert_eq;

fn played(fen: &str, uci: &str) -> BoardController {
    let mut b = BoardController::from_fen(fen, 50).unwrap();
    b.commit(uci.parse().unwrap(), false).unwrap();
    b
}

const TACTIC: &str = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1";

#[test]
fn capture_onto_attacked_square_is_tactical() {
    let mut b = played(TACTIC, "e4d5");
    assert_eq!(evaluate(&mut b, RewardPolicy::Discrete), (Outcome::Attack, Reward::Scored(5.0)));
    assert!(!b.attacked(), "flag is consumed");
    assert_ne!(b.fen(), START_FEN);

    let mut b = played(TACTIC, "e4d5");
    assert_eq!(evaluate(&mut b, RewardPolicy::Shaped), (Outcome::Attack, Reward::Scored(14.5)));
}

#[test]
fn quiet_move_is_ordinary() {
    let mut b = played(START_FEN, "g1f3");
    assert_eq!(evaluate(&mut b, RewardPolicy::Discrete), (Outcome::Ordinary, Reward::Scored(0.0)));
    let mut b = played(START_FEN, "g1f3");
    assert_eq!(evaluate(&mut b, RewardPolicy::Shaped), (Outcome::Ordinary, Reward::Scored(-0.5)));
}

#[test]
fn checkmate_pays_and_resets() {
    let mut b = played("8/8/8/5K1k/8/8/8/6R1 w k - 0 1", "g1h1");
    assert_eq!(evaluate(&mut b, RewardPolicy::Discrete), (Outcome::Checkmate, Reward::Scored(100.0)));
    assert_eq!(b.fen(), START_FEN);
    assert_eq!(b.ply(), 0);
}

#[test]
fn stalemate_is_ignored_or_penalised() {
    let mut b = played("k7/8/8/1Q6/8/8/8/7K w - - 0 1", "b5b6");
    assert_eq!(evaluate(&mut b, RewardPolicy::Discrete), (Outcome::Draw, Reward::Ignore));
    assert_eq!(b.fen(), START_FEN);

    let mut b = played("k7/8/8/1Q6/8/8/8/7K w - - 0 1", "b5b6");
    assert_eq!(evaluate(&mut b, RewardPolicy::Shaped), (Outcome::Draw, Reward::Scored(-10.0)));
}

#[test]
fn timeout_resets_without_terminal_outcome() {
    let mut b = BoardController::new(1);
    b.commit("g1f3".parse().unwrap(), false).unwrap();
    let (outcome, reward) = evaluate(&mut b, RewardPolicy::Discrete);
    assert_eq!(outcome, Outcome::Ordinary);
    assert_eq!(reward, Reward::Scored(0.0));
    assert_eq!(b.ply(), 0);
}

#[test]
fn evaluation_is_deterministic() {
    let a = evaluate(&mut played(TACTIC, "e4d5"), RewardPolicy::Discrete);
    let b = evaluate(&mut played(TACTIC, "e4d5"), RewardPolicy::Discrete);
    assert_eq!(a, b);
}
