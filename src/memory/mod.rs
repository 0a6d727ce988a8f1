//! Experience replay: a resident ring buffer and a disk-paged tiered memory.

pub mod codec;
pub mod ring;
pub mod paged;

use anyhow::Result;
use std::path::Path;
use crate::encoder::EncodedState;

pub use paged::{PagedConfig, PagedMemory};
pub use ring::RingMemory;

/// What the trainer stores after each committed move.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperienceRecord {
    pub state: EncodedState,
    /// FEN of the position the stored state encodes.
    pub fen: String,
    pub reward: f32,
}

pub trait ReplayMemory {
    fn add(&mut self, record: ExperienceRecord) -> Result<()>;

    /// A random batch, or `None` when not enough records are visible.
    /// Never fails: the training loop checks this every step.
    fn get_batch(&mut self, batch_size: usize, min_rows: Option<usize>) -> Option<Vec<ExperienceRecord>>;

    /// Called by the trainer before each batch request; lets a memory rotate
    /// which stored records are sampleable.
    fn refresh_sources(&mut self, _step: u64) -> Result<()> { Ok(()) }

    /// Records visible to the sampler.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool { self.len() == 0 }

    fn save_snapshot(&self, path: &Path) -> Result<()>;

    /// Replace the resident contents with a snapshot written by `save_snapshot`.
    fn restore_snapshot(&mut self, path: &Path) -> Result<()>;
}
