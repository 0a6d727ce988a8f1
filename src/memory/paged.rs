use anyhow::{bail, Context, Result};
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use super::codec::{
    open_reader, read_magic, read_records, read_section, write_atomic, write_records, write_section,
    PAGED_MAGIC, PIECE_MAGIC,
};
use super::{ExperienceRecord, ReplayMemory};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PagedConfig {
    /// Total records kept on disk across all pieces.
    pub max_size: usize,
    pub piece_size: usize,
    pub dir: PathBuf,
    /// Pieces already present in `dir` from an earlier run.
    pub saved_pieces: usize,
    pub min_batches_in_queue: usize,
    pub min_records: usize,
    /// Training steps between loads of a random persisted piece; 0 disables loading.
    pub load_piece_every: u64,
}

impl Default for PagedConfig {
    fn default() -> Self {
        Self {
            max_size: 50_000,
            piece_size: 10_000,
            dir: PathBuf::from("memory"),
            saved_pieces: 0,
            min_batches_in_queue: 100,
            min_records: 0,
            load_piece_every: 5_000,
        }
    }
}

/// Tiered memory: hot buffer -> cached batch -> rotating pieces on disk,
/// with a queue of precomputed batches drawn from whichever tiers are populated.
pub struct PagedMemory {
    cfg: PagedConfig,
    max_pieces: usize,
    next_piece: usize,
    pieces: usize,
    hot: Vec<ExperienceRecord>,
    cached: Vec<ExperienceRecord>,
    loaded: Option<Vec<ExperienceRecord>>,
    loaded_at: Option<u64>,
    batches: VecDeque<Vec<ExperienceRecord>>,
    rng: SmallRng,
}

impl PagedMemory {
    pub fn new(cfg: PagedConfig, seed: u64) -> Result<Self> {
        if cfg.piece_size == 0 { bail!("piece_size must be > 0"); }
        let max_pieces = (cfg.max_size / cfg.piece_size).max(1);
        if cfg.saved_pieces > max_pieces {
            bail!("{} saved pieces exceed the bound of {}", cfg.saved_pieces, max_pieces);
        }
        let pieces = cfg.saved_pieces;
        Ok(Self {
            max_pieces,
            next_piece: pieces % max_pieces,
            pieces,
            hot: Vec::with_capacity(cfg.piece_size),
            cached: Vec::new(),
            loaded: None,
            loaded_at: None,
            batches: VecDeque::new(),
            rng: SmallRng::seed_from_u64(seed),
            cfg,
        })
    }

    pub fn piece_path(&self, idx: usize) -> PathBuf {
        self.cfg.dir.join(format!("piece_{idx}.memory"))
    }

    pub fn max_pieces(&self) -> usize { self.max_pieces }
    pub fn persisted_pieces(&self) -> usize { self.pieces }
    pub fn next_piece(&self) -> usize { self.next_piece }
    pub fn hot_len(&self) -> usize { self.hot.len() }
    pub fn cached_len(&self) -> usize { self.cached.len() }
    pub fn loaded_len(&self) -> usize { self.loaded.as_ref().map_or(0, Vec::len) }
    pub fn queued_batches(&self) -> usize { self.batches.len() }

    /// Records across every tier, including pieces on disk.
    pub fn calculate_size(&self) -> usize {
        self.pieces * self.cfg.piece_size + self.hot.len() + self.cached.len()
    }

    /// Persist the cached tier as the next rotating piece.
    pub fn save_piece(&mut self) -> Result<()> {
        let path = self.piece_path(self.next_piece);
        write_records(&path, PIECE_MAGIC, &self.cached).with_context(|| format!("save piece {}", self.next_piece))?;
        info!("saved memory piece {} ({} records) to {}", self.next_piece, self.cached.len(), path.display());
        self.next_piece = (self.next_piece + 1) % self.max_pieces;
        if self.pieces < self.max_pieces { self.pieces += 1; }
        Ok(())
    }

    /// Load one persisted piece chosen uniformly among the valid indices.
    pub fn load_piece(&mut self) -> Result<()> {
        if self.pieces == 0 { bail!("no persisted memory pieces in {}", self.cfg.dir.display()); }
        let idx = self.rng.gen_range(0..self.pieces);
        let path = self.piece_path(idx);
        let recs = read_records(&path, PIECE_MAGIC).with_context(|| format!("load piece {idx}"))?;
        debug!("loaded memory piece {} ({} records)", idx, recs.len());
        self.loaded = Some(recs);
        Ok(())
    }

    fn sample_from(rng: &mut SmallRng, src: &[ExperienceRecord], batch_size: usize) -> Vec<ExperienceRecord> {
        index::sample(rng, src.len(), batch_size).into_iter().map(|i| src[i].clone()).collect()
    }

    fn refill(&mut self, batch_size: usize) {
        let depth = self.cfg.min_batches_in_queue.max(1);
        let before = self.batches.len();
        if self.cached.len() >= batch_size {
            for _ in 0..depth {
                let b = Self::sample_from(&mut self.rng, &self.cached, batch_size);
                self.batches.push_back(b);
            }
        }
        if let Some(loaded) = self.loaded.as_ref().filter(|l| l.len() >= batch_size) {
            for _ in 0..depth {
                let b = Self::sample_from(&mut self.rng, loaded, batch_size);
                self.batches.push_back(b);
            }
        }
        if self.hot.len() >= batch_size {
            let b = Self::sample_from(&mut self.rng, &self.hot, batch_size);
            self.batches.push_back(b);
        }
        self.batches.make_contiguous().shuffle(&mut self.rng);
        debug!("refilled batch queue: {} -> {}", before, self.batches.len());
    }
}

impl ReplayMemory for PagedMemory {
    fn add(&mut self, record: ExperienceRecord) -> Result<()> {
        self.hot.push(record);
        if self.hot.len() >= self.cfg.piece_size {
            self.cached = std::mem::take(&mut self.hot);
            self.save_piece()?;
        }
        Ok(())
    }

    fn get_batch(&mut self, batch_size: usize, min_rows: Option<usize>) -> Option<Vec<ExperienceRecord>> {
        let min_rows = min_rows.unwrap_or(self.cfg.min_records);
        if self.len() < min_rows || batch_size == 0 {
            debug!("paged memory: {} visible records, need {}", self.len(), min_rows);
            return None;
        }
        if self.batches.front().map_or(false, |b| b.len() != batch_size) {
            self.batches.clear();
        }
        if self.batches.len() < self.cfg.min_batches_in_queue.max(1) {
            self.refill(batch_size);
        }
        self.batches.pop_front()
    }

    /// Hot, cached and loaded-piece records; unloaded pieces are not sampleable.
    /// Swap in another persisted piece once `load_piece_every` steps have
    /// passed since the last load, or as soon as the first piece exists.
    fn refresh_sources(&mut self, step: u64) -> Result<()> {
        let every = self.cfg.load_piece_every;
        if every == 0 || self.pieces == 0 {
            return Ok(());
        }
        if self.loaded_at.map_or(true, |at| step >= at.saturating_add(every)) {
            self.load_piece()?;
            self.loaded_at = Some(step);
            self.batches.clear();
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.hot.len() + self.cached.len() + self.loaded_len()
    }

    fn save_snapshot(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| {
            w.write_all(PAGED_MAGIC)?;
            w.write_all(&(self.next_piece as u32).to_le_bytes())?;
            w.write_all(&(self.pieces as u32).to_le_bytes())?;
            write_section(w, &self.hot)?;
            write_section(w, &self.cached)
        })
    }

    fn restore_snapshot(&mut self, path: &Path) -> Result<()> {
        let mut r = open_reader(path)?;
        read_magic(&mut r, PAGED_MAGIC).with_context(|| format!("{}", path.display()))?;
        let mut b4 = [0u8; 4];
        r.read_exact(&mut b4).context("read next piece")?;
        let next_piece = u32::from_le_bytes(b4) as usize;
        r.read_exact(&mut b4).context("read piece count")?;
        let pieces = u32::from_le_bytes(b4) as usize;
        if pieces > self.max_pieces || next_piece >= self.max_pieces {
            bail!("snapshot rotation ({next_piece}, {pieces}) exceeds bound {}", self.max_pieces);
        }
        self.hot = read_section(&mut r).context("read hot tier")?;
        self.cached = read_section(&mut r).context("read cached tier")?;
        self.next_piece = next_piece;
        self.pieces = pieces;
        self.loaded = None;
        self.loaded_at = None;
        self.batches.clear();
        Ok(())
    }
}
