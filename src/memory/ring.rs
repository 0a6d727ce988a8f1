use anyhow::{Context, Result};
use log::debug;
use rand::rngs::SmallRng;
use rand::seq::index;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::path::Path;
use super::codec::{read_records, write_records, RING_MAGIC};
use super::{ExperienceRecord, ReplayMemory};

/// Bounded FIFO of records held entirely in memory.
pub struct RingMemory {
    capacity: usize,
    records: VecDeque<ExperienceRecord>,
    rng: SmallRng,
}

impl RingMemory {
    pub fn new(capacity: usize, seed: u64) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, records: VecDeque::with_capacity(capacity.min(1 << 16)), rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ExperienceRecord> { self.records.iter() }

    /// Threshold used when the caller passes no `min_rows`.
    pub fn default_min_rows(&self) -> usize { self.capacity / 3 }
}

impl ReplayMemory for RingMemory {
    fn add(&mut self, record: ExperienceRecord) -> Result<()> {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        Ok(())
    }

    fn get_batch(&mut self, batch_size: usize, min_rows: Option<usize>) -> Option<Vec<ExperienceRecord>> {
        let min_rows = min_rows.unwrap_or_else(|| self.default_min_rows());
        let len = self.records.len();
        if len < min_rows || len < batch_size || batch_size == 0 {
            debug!("ring memory holds {} records (need {}, batch {})", len, min_rows, batch_size);
            return None;
        }
        let picks = index::sample(&mut self.rng, len, batch_size);
        Some(picks.into_iter().map(|i| self.records[i].clone()).collect())
    }

    fn len(&self) -> usize { self.records.len() }

    fn save_snapshot(&self, path: &Path) -> Result<()> {
        let recs: Vec<ExperienceRecord> = self.records.iter().cloned().collect();
        write_records(path, RING_MAGIC, &recs)
    }

    fn restore_snapshot(&mut self, path: &Path) -> Result<()> {
        let recs = read_records(path, RING_MAGIC).context("restore ring memory")?;
        let skip = recs.len().saturating_sub(self.capacity);
        self.records = recs.into_iter().skip(skip).collect();
        Ok(())
    }
}
