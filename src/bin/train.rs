use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use piedqn::board::BoardController;
use piedqn::checkpoint;
use piedqn::config::{MemoryKind, TrainConfig};
use piedqn::eval::Mlp;
use piedqn::memory::{PagedMemory, ReplayMemory, RingMemory};
use piedqn::reward::RewardPolicy;
use piedqn::trainer::Trainer;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "piedqn-train", about = "Self-play value training with experience replay")]
struct Args {
    /// JSON config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    steps: Option<u64>,
    #[arg(long)]
    start_at: Option<u64>,
    #[arg(long)]
    batch: Option<usize>,
    #[arg(long)]
    gamma: Option<f32>,
    #[arg(long)]
    theta: Option<f32>,
    #[arg(long)]
    epsilon: Option<f32>,
    #[arg(long)]
    seed: Option<u64>,
    /// discrete | shaped
    #[arg(long)]
    reward: Option<String>,
    /// ring | paged
    #[arg(long)]
    memory: Option<String>,
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    /// Checkpoint name to resume from (in checkpoint_dir)
    #[arg(long)]
    resume: Option<String>,
}

fn apply_overrides(cfg: &mut TrainConfig, a: &Args) -> Result<()> {
    if let Some(v) = &a.name { cfg.name = v.clone(); }
    if let Some(v) = a.steps { cfg.training_steps = v; }
    if let Some(v) = a.start_at { cfg.start_at_step = v; }
    if let Some(v) = a.batch { cfg.batch = v; }
    if let Some(v) = a.gamma { cfg.gamma = v; }
    if let Some(v) = a.theta { cfg.theta = v; }
    if let Some(v) = a.epsilon { cfg.epsilon = v; }
    if let Some(v) = a.seed { cfg.seed = v; }
    if let Some(v) = &a.checkpoint_dir { cfg.checkpoint_dir = v.clone(); }
    if let Some(v) = &a.reward {
        cfg.reward_policy = match v.as_str() {
            "discrete" => RewardPolicy::Discrete,
            "shaped" => RewardPolicy::Shaped,
            _ => anyhow::bail!("unknown reward policy {v:?}"),
        };
    }
    if let Some(v) = &a.memory {
        cfg.memory = match v.as_str() {
            "ring" => MemoryKind::Ring,
            "paged" => MemoryKind::Paged,
            _ => anyhow::bail!("unknown memory kind {v:?}"),
        };
    }
    Ok(())
}

fn run<M: ReplayMemory>(cfg: &TrainConfig, mut memory: M, resume: Option<&str>) -> Result<()> {
    let (active, target) = match resume {
        Some(name) => checkpoint::load::<Mlp, M, _>(&cfg.checkpoint_dir, name, Some(&mut memory))?,
        None => {
            let m = Mlp::new(cfg.hidden, cfg.learning_rate, cfg.seed);
            (m.clone(), m)
        }
    };
    let mut trainer = Trainer::from_parts(active, target, memory, cfg.reward_policy, cfg.max_plies, cfg.seed);
    trainer.set_step(cfg.start_at_step);
    let mut board = BoardController::new(cfg.max_plies);

    let total = cfg.training_steps.saturating_sub(cfg.start_at_step);
    let pb = ProgressBar::new(total);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")?);
    let mut last_loss = None;
    for i in cfg.start_at_step..cfg.training_steps {
        trainer.take_action(&mut board, cfg.epsilon_at(i))?;
        if let Some(r) = trainer.train(cfg.batch, cfg.gamma, cfg.theta, Some(cfg.start_training_at))? {
            last_loss = Some(r.loss);
        }
        if cfg.save_per_steps > 0 && i % cfg.save_per_steps == 0 {
            let name = format!("{}_{}", cfg.name, i);
            checkpoint::save(&cfg.checkpoint_dir, &name, trainer.active(), trainer.target(), Some(trainer.memory()))?;
        }
        pb.inc(1);
        if let Some(l) = last_loss { pb.set_message(format!("loss {l:.4} mem {}", trainer.memory().len())); }
    }
    pb.finish();

    let name = format!("{}_{}k", cfg.name, cfg.training_steps / 1000);
    checkpoint::save(&cfg.checkpoint_dir, &name, trainer.active(), trainer.target(), Some(trainer.memory()))?;
    info!("training finished at step {}", trainer.step());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let a = Args::parse();
    let mut cfg = match &a.config {
        Some(p) => TrainConfig::from_json_file(p)?,
        None => TrainConfig::default(),
    };
    apply_overrides(&mut cfg, &a)?;
    info!("training {} steps {}..{} (memory {:?}, reward {:?})", cfg.name, cfg.start_at_step, cfg.training_steps, cfg.memory, cfg.reward_policy);
    match cfg.memory {
        MemoryKind::Ring => run(&cfg, RingMemory::new(cfg.memory_size, cfg.seed), a.resume.as_deref()),
        MemoryKind::Paged => run(&cfg, PagedMemory::new(cfg.paged.clone(), cfg.seed)?, a.resume.as_deref()),
    }
}
