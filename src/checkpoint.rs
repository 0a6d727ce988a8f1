use anyhow::{bail, Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use crate::eval::ValueEstimator;
use crate::memory::ReplayMemory;

/// The co-located artifacts of one checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointPaths {
    pub active: PathBuf,
    pub target: PathBuf,
    pub memory: PathBuf,
}

impl CheckpointPaths {
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            active: dir.join(format!("{name}_active.bin")),
            target: dir.join(format!("{name}_target.bin")),
            memory: dir.join(format!("{name}_memory.bin")),
        }
    }
}

pub fn save<E, M, P>(dir: P, name: &str, active: &E, target: &E, memory: Option<&M>) -> Result<CheckpointPaths>
where
    E: ValueEstimator,
    M: ReplayMemory,
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("create checkpoint dir {}", dir.display()))?;
    let paths = CheckpointPaths::new(dir, name);
    active.save(&paths.active).context("save active estimator")?;
    target.save(&paths.target).context("save target estimator")?;
    if let Some(m) = memory {
        m.save_snapshot(&paths.memory).context("save memory snapshot")?;
    }
    info!("checkpoint {} written to {}", name, dir.display());
    Ok(paths)
}

/// Load active and target estimators; when `memory` is given its snapshot must
/// be present too. Any missing member is an error.
pub fn load<E, M, P>(dir: P, name: &str, memory: Option<&mut M>) -> Result<(E, E)>
where
    E: ValueEstimator,
    M: ReplayMemory,
    P: AsRef<Path>,
{
    let paths = CheckpointPaths::new(dir, name);
    let mut required = vec![&paths.active, &paths.target];
    if memory.is_some() { required.push(&paths.memory); }
    let missing: Vec<String> = required.iter().filter(|p| !p.exists()).map(|p| p.display().to_string()).collect();
    if !missing.is_empty() {
        bail!("incomplete checkpoint {name}: missing {}", missing.join(", "));
    }
    let active = E::load(&paths.active).context("load active estimator")?;
    let target = E::load(&paths.target).context("load target estimator")?;
    if let Some(m) = memory {
        m.restore_snapshot(&paths.memory).context("restore memory snapshot")?;
    }
    info!("checkpoint {} loaded", name);
    Ok((active, target))
}
