use std::fmt;
use cozy_chess::{Color, Move, Piece, Square};
use log::trace;
use crate::board::cozy::{mirror_fen, with_fullmove, Position};
use crate::encoder::{encode, EncodedState};
use crate::error::ChessError;

pub const DEFAULT_MAX_PLIES: u32 = 50;
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;
const FIVEFOLD: usize = 5;

/// One candidate move with the position it leads to.
#[derive(Clone, Debug)]
pub struct NextState {
    pub mv: Move,
    pub state: EncodedState,
    pub fen: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Timeout,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Timeout => "Timeout",
        };
        f.write_str(s)
    }
}

/// Holds the true-coordinate position of one game plus the bookkeeping
/// the reward evaluator needs (pending attack flag, ply counter, draw counters).
#[derive(Clone, Debug)]
pub struct BoardController {
    position: Position,
    attacked: bool,
    ply: u32,
    max_plies: u32,
    quiet_plies: u32,
    history: Vec<u64>,
}

impl BoardController {
    pub fn new(max_plies: u32) -> Self {
        Self::with_position(Position::startpos(), max_plies)
    }

    pub fn from_fen(fen: &str, max_plies: u32) -> Result<Self, ChessError> {
        Ok(Self::with_position(Position::from_fen(fen)?, max_plies))
    }

    fn with_position(position: Position, max_plies: u32) -> Self {
        let quiet_plies = position.halfmove_clock();
        let history = vec![position.hash()];
        Self { position, attacked: false, ply: 0, max_plies, quiet_plies, history }
    }

    pub fn position(&self) -> &Position { &self.position }
    pub fn fen(&self) -> String { self.position.fen() }
    pub fn turn(&self) -> Color { self.position.side_to_move() }
    pub fn ply(&self) -> u32 { self.ply }
    pub fn max_plies(&self) -> u32 { self.max_plies }
    pub fn attacked(&self) -> bool { self.attacked }

    /// The position as seen by the acting side; mirrored when `mirror` is set.
    pub fn view(&self, mirror: bool) -> Result<Position, ChessError> {
        if mirror { self.position.mirror() } else { Ok(self.position.clone()) }
    }

    /// Every legal move from the (possibly mirrored) position with the encoded
    /// successor and its FEN. Empty on terminal positions.
    pub fn legal_next_states(&self, mirror: bool) -> Result<Vec<NextState>, ChessError> {
        let view = self.view(mirror)?;
        let mut out = Vec::new();
        for mv in view.legal_moves() {
            let mut child = view.board().clone();
            child.play_unchecked(mv);
            let fen = format!("{}", child);
            let state = encode(&fen)?;
            out.push(NextState { mv, state, fen });
        }
        Ok(out)
    }

    /// Play `mv`, expressed in the coordinates of `view(mirror)`. The legality
    /// check precedes any mutation, so an IllegalMove leaves the controller untouched.
    pub fn commit(&mut self, mv: Move, mirror: bool) -> Result<&Position, ChessError> {
        let mut view = self.view(mirror)?;
        if !view.is_legal(mv) {
            return Err(ChessError::IllegalMove { mv: format!("{mv}") });
        }
        let mover = view.side_to_move();
        if !view.attackers(mv.to, !mover).is_empty() {
            self.attacked = true;
        }
        let true_mover = self.position.side_to_move();
        let fullmove = self.position.fullmove_number();
        view.play_checked(mv)?;
        let next = if mirror {
            // Un-mirror and restore the true move number: only a Black move advances it.
            let bump = if true_mover == Color::Black { 1 } else { 0 };
            Position::from_fen(&with_fullmove(&mirror_fen(&view.fen()), fullmove + bump))?
        } else {
            view
        };
        self.position = next;
        self.ply += 1;
        if self.position.halfmove_clock() == 0 {
            self.quiet_plies = 0;
            self.history.clear();
        } else {
            self.quiet_plies += 1;
        }
        self.history.push(self.position.hash());
        trace!("ply {} committed {} -> {}", self.ply, mv, self.position.fen());
        Ok(&self.position)
    }

    /// Read and clear the pending attack flag.
    pub fn take_attacked(&mut self) -> bool {
        std::mem::replace(&mut self.attacked, false)
    }

    pub fn is_checkmate(&self) -> bool { self.position.in_check() && !self.position.has_legal_move() }

    pub fn is_stalemate(&self) -> bool { !self.position.in_check() && !self.position.has_legal_move() }

    pub fn is_seventyfive_moves(&self) -> bool { self.quiet_plies >= SEVENTY_FIVE_MOVE_PLIES }

    pub fn is_fivefold_repetition(&self) -> bool {
        let current = self.position.hash();
        self.history.iter().filter(|h| **h == current).count() >= FIVEFOLD
    }

    /// Neither side can mate: no pawns or major pieces and at most one minor,
    /// or only bishops that all stand on one square color.
    pub fn is_insufficient_material(&self) -> bool {
        let b = self.position.board();
        let heavy = b.pieces(Piece::Pawn) | b.pieces(Piece::Rook) | b.pieces(Piece::Queen);
        if !heavy.is_empty() { return false; }
        let knights = b.pieces(Piece::Knight);
        let bishops = b.pieces(Piece::Bishop);
        if knights.len() + bishops.len() <= 1 { return true; }
        if !knights.is_empty() { return false; }
        let shade = |sq: Square| (sq.file() as usize + sq.rank() as usize) % 2;
        let mut shades = bishops.into_iter().map(shade);
        let first = shades.next();
        shades.all(|s| Some(s) == first)
    }

    pub fn is_draw(&self) -> bool {
        self.is_stalemate()
            || self.is_seventyfive_moves()
            || self.is_fivefold_repetition()
            || self.is_insufficient_material()
    }

    pub fn game_over(&self) -> bool { self.is_checkmate() || self.is_draw() }

    pub fn timeout(&self) -> bool { self.ply >= self.max_plies }

    pub fn result(&self) -> Option<GameResult> {
        if self.is_checkmate() {
            Some(if self.turn() == Color::White { GameResult::BlackWins } else { GameResult::WhiteWins })
        } else if self.is_draw() {
            Some(GameResult::Draw)
        } else if self.timeout() {
            Some(GameResult::Timeout)
        } else {
            None
        }
    }

    /// Opponent pieces currently giving check to `color`'s king.
    pub fn king_attackers(&self, color: Color) -> Vec<Square> {
        let king = self.position.board().king(color);
        self.position.attackers(king, !color).into_iter().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.max_plies);
    }
}

impl Default for BoardController {
    fn default() -> Self { Self::new(DEFAULT_MAX_PLIES) }
}
