// Self-play value learning for chess: encoder, board controller, rewards, replay memory, trainer
pub mod error;
pub mod encoder;
pub mod board;
pub mod reward;
pub mod memory;
pub mod eval;
pub mod trainer;
pub mod checkpoint;
pub mod config;

pub use error::ChessError;
pub use encoder::{encode, EncodedState, STATE_LEN};
