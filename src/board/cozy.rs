use cozy_chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves,
    BitBoard, Board as CozyBoard, Color, Move, Piece, Square,
};
use crate::error::ChessError;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Board state whose only persisted form is its FEN.
#[derive(Clone, Debug)]
pub struct Position {
    board: CozyBoard,
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default() }
    }

    /// Parse a FEN after dropping castling/en-passant fields that contradict the placement.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let clean = sanitize_fen(fen)?;
        CozyBoard::from_fen(&clean, false)
            .map(|b| Self { board: b })
            .map_err(|e| ChessError::InvalidFen(format!("{fen}: {e:?}")))
    }

    pub fn fen(&self) -> String { format!("{}", self.board) }

    pub fn board(&self) -> &CozyBoard { &self.board }

    pub fn side_to_move(&self) -> Color { self.board.side_to_move() }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|ml| { moves.extend(ml); false });
        moves
    }

    pub fn has_legal_move(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|ml| { any = !ml.is_empty(); any });
        any
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        let mut found = false;
        self.board.generate_moves(|ml| {
            found = ml.into_iter().any(|m| m == mv);
            found
        });
        found
    }

    /// Play a move, rejecting it without touching the board if it is illegal.
    pub fn play_checked(&mut self, mv: Move) -> Result<(), ChessError> {
        if !self.is_legal(mv) {
            return Err(ChessError::IllegalMove { mv: format!("{mv}") });
        }
        self.board.play_unchecked(mv);
        Ok(())
    }

    /// Locate a legal move from its UCI text (e.g. "e2e4").
    pub fn find_move_uci(&self, mv_uci: &str) -> Option<Move> {
        self.legal_moves().into_iter().find(|m| format!("{m}") == mv_uci)
    }

    /// Colors swapped and ranks reflected, so the side to move flips as well.
    pub fn mirror(&self) -> Result<Self, ChessError> {
        Self::from_fen(&mirror_fen(&self.fen()))
    }

    /// Opponent pieces of `by` attacking `sq` with the current occupancy.
    pub fn attackers(&self, sq: Square, by: Color) -> BitBoard {
        attackers(&self.board, sq, by)
    }

    pub fn halfmove_clock(&self) -> u32 { self.board.halfmove_clock() as u32 }

    pub fn fullmove_number(&self) -> u32 { self.board.fullmove_number() as u32 }

    pub fn hash(&self) -> u64 { self.board.hash() }

    pub fn in_check(&self) -> bool { !self.board.checkers().is_empty() }
}

impl Default for Position {
    fn default() -> Self { Self::startpos() }
}

pub fn attackers(board: &CozyBoard, sq: Square, by: Color) -> BitBoard {
    let occ = board.occupied();
    let theirs = board.colors(by);
    let diag = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let ortho = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    // A pawn of `by` attacks sq iff a pawn of the other color on sq would attack it back.
    let pawns = get_pawn_attacks(sq, !by) & board.pieces(Piece::Pawn);
    let knights = get_knight_moves(sq) & board.pieces(Piece::Knight);
    let kings = get_king_moves(sq) & board.pieces(Piece::King);
    let sliders = (get_bishop_moves(sq, occ) & diag) | (get_rook_moves(sq, occ) & ortho);
    (pawns | knights | kings | sliders) & theirs
}

pub fn mirror_move(mv: Move) -> Move {
    Move { from: mv.from.flip_rank(), to: mv.to.flip_rank(), promotion: mv.promotion }
}

/// Reverse ranks, swap piece colors, side to move, castling rights and reflect the en-passant rank.
pub fn mirror_fen(fen: &str) -> String {
    let parts = pad_fields(fen);
    let placement = parts[0]
        .split('/')
        .rev()
        .map(|rank| rank.chars().map(swap_case).collect::<String>())
        .collect::<Vec<_>>()
        .join("/");
    let stm = if parts[1] == "b" { "w" } else { "b" };
    let castling = if parts[2] == "-" {
        "-".to_string()
    } else {
        let swapped: Vec<char> = parts[2].chars().map(swap_case).collect();
        let ordered: String = ['K', 'Q', 'k', 'q'].iter().filter(|c| swapped.contains(c)).collect();
        if ordered.is_empty() { "-".to_string() } else { ordered }
    };
    let ep = match parts[3].as_bytes() {
        [f, b'3'] => format!("{}6", *f as char),
        [f, b'6'] => format!("{}3", *f as char),
        _ => "-".to_string(),
    };
    format!("{} {} {} {} {} {}", placement, stm, castling, ep, parts[4], parts[5])
}

/// Replace the fullmove field.
pub fn with_fullmove(fen: &str, fullmove: u32) -> String {
    let n = fullmove.max(1).to_string();
    let mut parts = pad_fields(fen);
    parts[5] = &n;
    parts.join(" ")
}

fn swap_case(c: char) -> char {
    if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() }
}

/// Missing trailing fields take their defaults ("w - - 0 1"), like EPD lines.
fn pad_fields(fen: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = fen.split_whitespace().take(6).collect();
    let defaults = ["8/8/8/8/8/8/8/8", "w", "-", "-", "0", "1"];
    for d in defaults.iter().skip(parts.len()) { parts.push(*d); }
    parts
}

/// Expand placement into 64 chars in FEN order, '.' for empty.
fn expand_placement(placement: &str) -> Result<Vec<char>, ChessError> {
    let mut out = Vec::with_capacity(64);
    for ch in placement.chars() {
        match ch {
            '/' => {}
            '1'..='8' => out.extend(std::iter::repeat('.').take(ch as usize - '0' as usize)),
            _ => out.push(ch),
        }
    }
    if out.len() != 64 {
        return Err(ChessError::InvalidFen(format!("placement {placement:?} has {} squares", out.len())));
    }
    Ok(out)
}

/// Drop castling rights whose king/rook left home and en-passant targets with no pushed pawn behind them.
pub fn sanitize_fen(fen: &str) -> Result<String, ChessError> {
    let mut parts: Vec<String> = pad_fields(fen).into_iter().map(String::from).collect();
    let grid = expand_placement(&parts[0])?;
    let at = |idx: usize| grid[idx];
    if parts[2] != "-" {
        let keep: String = parts[2]
            .chars()
            .filter(|c| match c {
                'K' => at(60) == 'K' && at(63) == 'R',
                'Q' => at(60) == 'K' && at(56) == 'R',
                'k' => at(4) == 'k' && at(7) == 'r',
                'q' => at(4) == 'k' && at(0) == 'r',
                _ => false,
            })
            .collect();
        parts[2] = if keep.is_empty() { "-".into() } else { keep };
    }
    if parts[3] != "-" {
        let ok = match parts[3].as_bytes() {
            [f @ b'a'..=b'h', b'6'] => parts[1] == "w" && at(3 * 8 + (f - b'a') as usize) == 'p',
            [f @ b'a'..=b'h', b'3'] => parts[1] == "b" && at(4 * 8 + (f - b'a') as usize) == 'P',
            _ => false,
        };
        if !ok { parts[3] = "-".into(); }
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_fen_startpos_after_e4() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let m = mirror_fen(fen);
        assert_eq!(m, "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq e6 0 1");
        assert_eq!(mirror_fen(&m), fen);
    }

    #[test]
    fn sanitize_drops_impossible_castling() {
        let s = sanitize_fen("8/8/8/5K1k/8/8/8/6R1 w k - 0 1").unwrap();
        assert_eq!(s, "8/8/8/5K1k/8/8/8/6R1 w - - 0 1");
        assert!(Position::from_fen("8/8/8/5K1k/8/8/8/6R1 w k - 0 1").is_ok());
    }

    #[test]
    fn attackers_sees_defended_square() {
        let pos = Position::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let atk = pos.attackers(Square::D5, Color::Black);
        assert!(atk.has(Square::D8), "queen on d8 defends d5");
        assert!(pos.attackers(Square::E4, Color::Black).has(Square::D5));
    }
}
