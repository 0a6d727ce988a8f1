use crate::error::ChessError;

/// 64 squares x 6 piece-type slots.
pub const STATE_LEN: usize = 64 * PIECE_SLOTS;
pub const PIECE_SLOTS: usize = 6;

/// Flat feature vector of a piece placement, squares in FEN order (a8..h8, a7..h1).
/// Lowercase pieces encode as +1 in their type slot, uppercase as -1.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedState(pub [f32; STATE_LEN]);

impl EncodedState {
    pub fn zeros() -> Self { Self([0.0; STATE_LEN]) }
    pub fn as_slice(&self) -> &[f32] { &self.0 }

    /// Block of 6 slots for square `sq` (0 = a8, 63 = h1).
    pub fn square(&self, sq: usize) -> &[f32] { &self.0[sq * PIECE_SLOTS..(sq + 1) * PIECE_SLOTS] }

    pub fn nonzero_count(&self) -> usize { self.0.iter().filter(|v| **v != 0.0).count() }
}

/// Fixed letter table: (type slot, is_black). Slots follow pawn, knight, bishop, rook, queen, king.
fn piece_slot(ch: char) -> Option<(usize, bool)> {
    let slot = match ch.to_ascii_lowercase() {
        'p' => 0,
        'n' => 1,
        'b' => 2,
        'r' => 3,
        'q' => 4,
        'k' => 5,
        _ => return None,
    };
    Some((slot, ch.is_ascii_lowercase()))
}

/// Decode the placement field into one signed code per square:
/// 0 for empty, otherwise +(slot+1) for lowercase and -(slot+1) for uppercase.
pub fn placement_codes(fen: &str) -> Result<[i8; 64], ChessError> {
    let malformed = |reason: String| ChessError::MalformedSerialization { fen: fen.to_string(), reason };
    let placement = fen.split_whitespace().next().ok_or_else(|| malformed("empty input".into()))?;
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(malformed(format!("expected 8 rank groups, found {}", ranks.len())));
    }
    let mut out = [0i8; 64];
    for (ri, rank) in ranks.iter().enumerate() {
        let mut file = 0usize;
        for ch in rank.chars() {
            if let Some(d) = ch.to_digit(10) {
                if !(1..=8).contains(&d) { return Err(malformed(format!("bad empty-run digit {ch:?}"))); }
                file += d as usize;
            } else if let Some((slot, black)) = piece_slot(ch) {
                if file < 8 {
                    let code = (slot + 1) as i8;
                    out[ri * 8 + file] = if black { code } else { -code };
                }
                file += 1;
            } else {
                return Err(malformed(format!("unrecognized piece letter {ch:?}")));
            }
            if file > 8 { break; }
        }
        if file != 8 {
            return Err(malformed(format!("rank group {} covers {} squares", ri + 1, file)));
        }
    }
    Ok(out)
}

/// One-hot block of a single square code.
pub fn encode_square(code: i8) -> [f32; PIECE_SLOTS] {
    let mut block = [0f32; PIECE_SLOTS];
    if code != 0 {
        block[(code.unsigned_abs() - 1) as usize] = code.signum() as f32;
    }
    block
}

/// Encode a FEN (only the placement field is read) into the 384-value feature vector.
pub fn encode(fen: &str) -> Result<EncodedState, ChessError> {
    let codes = placement_codes(fen)?;
    let mut state = EncodedState::zeros();
    for (sq, &code) in codes.iter().enumerate() {
        state.0[sq * PIECE_SLOTS..(sq + 1) * PIECE_SLOTS].copy_from_slice(&encode_square(code));
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_codes_startpos() {
        let codes = placement_codes("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(&codes[0..8], &[4, 2, 3, 5, 6, 3, 2, 4]);
        assert_eq!(&codes[8..16], &[1; 8]);
        assert!(codes[16..48].iter().all(|c| *c == 0));
        assert_eq!(&codes[48..56], &[-1; 8]);
        assert_eq!(&codes[56..64], &[-4, -2, -3, -5, -6, -3, -2, -4]);
    }

    #[test]
    fn square_blocks() {
        assert_eq!(encode_square(0), [0.0; 6]);
        assert_eq!(encode_square(1), [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(encode_square(3), [0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(encode_square(-4), [0.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
        assert_eq!(encode_square(-6), [0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn rejects_bad_digit_sum() {
        let err = encode("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap_err();
        assert!(matches!(err, ChessError::MalformedSerialization { .. }));
        assert!(encode("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR").is_err());
        assert!(encode("rnbqkbnr/pppppppp/5/8/8/8/PPPPPPPP/RNBQKBNR").is_err());
    }

    #[test]
    fn rejects_unknown_letter_and_rank_count() {
        assert!(encode("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1").is_err());
        assert!(encode("8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(encode("").is_err());
    }
}
