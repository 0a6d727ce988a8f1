use cozy_chess::{Color, Move};
use piedqn::board::{mirror_fen, mirror_move, BoardController, GameResult, START_FEN};
use piedqn::{encode, ChessError};
use pretty_assertions::assert_eq;

fn mv(s: &str) -> Move { s.parse().unwrap() }

#[test]
fn startpos_enumerates_twenty_moves_both_views() {
    let b = BoardController::new(50);
    assert_eq!(b.legal_next_states(false).unwrap().len(), 20);
    // the mirrored start position is Black to move with the same twenty replies
    assert_eq!(b.legal_next_states(true).unwrap().len(), 20);
}

#[test]
fn next_state_encodes_its_fen() {
    let b = BoardController::new(50);
    for ns in b.legal_next_states(false).unwrap() {
        assert_eq!(ns.state, encode(&ns.fen).unwrap());
    }
}

#[test]
fn illegal_move_leaves_state_untouched() {
    let mut b = BoardController::new(50);
    let before = b.fen();
    let err = b.commit(mv("e2e5"), false).unwrap_err();
    assert!(matches!(err, ChessError::IllegalMove { .. }));
    assert_eq!(b.fen(), before);
    assert_eq!(b.ply(), 0);
    assert!(!b.attacked());

    // in the mirrored view White's pieces belong to the side not on move
    assert!(b.commit(mv("e2e4"), true).is_err());
    assert_eq!(b.fen(), before);
}

#[test]
fn mirrored_commit_matches_direct_commit() {
    let after_e4 = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    let mut direct = BoardController::from_fen(after_e4, 50).unwrap();
    let mut mirrored = BoardController::from_fen(after_e4, 50).unwrap();
    assert_eq!(direct.turn(), Color::Black);

    direct.commit(mv("e7e5"), false).unwrap();
    mirrored.commit(mirror_move(mv("e7e5")), true).unwrap();
    assert_eq!(mirrored.fen(), direct.fen());
    assert_eq!(direct.position().fullmove_number(), 2);
    assert_eq!(mirrored.turn(), Color::White);
}

#[test]
fn mirrored_encoding_round_trips() {
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
    let twice = mirror_fen(&mirror_fen(fen));
    assert_eq!(encode(&twice).unwrap(), encode(fen).unwrap());
    assert_ne!(encode(&mirror_fen(fen)).unwrap(), encode(fen).unwrap());
}

#[test]
fn capture_onto_defended_square_sets_attack_flag() {
    let mut b = BoardController::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1", 50).unwrap();
    b.commit(mv("e4d5"), false).unwrap();
    assert!(b.attacked());
    assert!(b.take_attacked());
    assert!(!b.attacked());
}

#[test]
fn checkmate_and_result() {
    let mut b = BoardController::from_fen("8/8/8/5K1k/8/8/8/6R1 w k - 0 1", 50).unwrap();
    assert!(!b.game_over());
    b.commit(mv("g1h1"), false).unwrap();
    assert!(b.is_checkmate());
    assert!(b.game_over());
    assert_eq!(b.result(), Some(GameResult::WhiteWins));
    assert_eq!(b.king_attackers(Color::Black).len(), 1);
    b.reset();
    assert_eq!(b.fen(), START_FEN);
    assert_eq!(b.ply(), 0);
}

#[test]
fn stalemate_is_a_draw() {
    let mut b = BoardController::from_fen("k7/8/8/1Q6/8/8/8/7K w - - 0 1", 50).unwrap();
    b.commit(mv("b5b6"), false).unwrap();
    assert!(b.is_stalemate());
    assert!(b.is_draw());
    assert_eq!(b.result(), Some(GameResult::Draw));
}

#[test]
fn timeout_after_max_plies() {
    let mut b = BoardController::new(2);
    b.commit(mv("g1f3"), false).unwrap();
    assert!(!b.timeout());
    b.commit(mirror_move(mv("g8f6")), true).unwrap();
    assert!(b.timeout());
    assert_eq!(b.result(), Some(GameResult::Timeout));
}
