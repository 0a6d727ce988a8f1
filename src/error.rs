use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// The move is not in the legal set of the (possibly mirrored) position.
    /// The board is left untouched.
    #[error("illegal move: {mv}")]
    IllegalMove { mv: String },
    /// Piece placement could not be decoded by the encoder.
    #[error("malformed serialization {fen:?}: {reason}")]
    MalformedSerialization { fen: String, reason: String },
    /// The rules library rejected the FEN.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}
