pub mod cozy;
pub mod controller;

pub use cozy::{mirror_fen, mirror_move, Position, START_FEN};
pub use controller::{BoardController, GameResult, NextState};
