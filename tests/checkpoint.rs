mod common;

use common::{record, scratch_dir};
use piedqn::board::START_FEN;
use piedqn::checkpoint::{self, CheckpointPaths};
use piedqn::eval::{Mlp, ValueEstimator};
use piedqn::memory::{ReplayMemory, RingMemory};
use piedqn::encode;
use pretty_assertions::assert_eq;

#[test]
fn save_then_load_restores_everything() {
    let dir = scratch_dir("checkpoint_round_trip");
    let active = Mlp::new(8, 1e-3, 1);
    let target = Mlp::new(8, 1e-3, 2);
    let mut memory = RingMemory::new(10, 1);
    for i in 0..3 {
        memory.add(record(START_FEN, i as f32)).unwrap();
    }
    let paths = checkpoint::save(&dir, "run_1", &active, &target, Some(&memory)).unwrap();
    assert_eq!(paths, CheckpointPaths::new(&dir, "run_1"));
    assert!(paths.active.exists() && paths.target.exists() && paths.memory.exists());

    let mut restored = RingMemory::new(10, 9);
    let (a, t): (Mlp, Mlp) = checkpoint::load(&dir, "run_1", Some(&mut restored)).unwrap();
    assert_eq!(a.weights(), active.weights());
    assert_eq!(t.weights(), target.weights());
    assert_eq!(a.meta, active.meta);
    let s = encode(START_FEN).unwrap();
    assert_eq!(a.evaluate(&s), active.evaluate(&s));
    assert_eq!(restored.iter().cloned().collect::<Vec<_>>(), memory.iter().cloned().collect::<Vec<_>>());
}

#[test]
fn partial_checkpoint_is_an_error() {
    let dir = scratch_dir("checkpoint_partial");
    let m = Mlp::new(4, 1e-3, 1);
    let paths = checkpoint::save::<_, RingMemory, _>(&dir, "p", &m, &m, None).unwrap();
    assert!(!paths.memory.exists());

    // estimators alone load fine when no memory is requested
    assert!(checkpoint::load::<Mlp, RingMemory, _>(&dir, "p", None).is_ok());

    let mut mem = RingMemory::new(4, 1);
    let err = checkpoint::load::<Mlp, RingMemory, _>(&dir, "p", Some(&mut mem)).unwrap_err();
    assert!(err.to_string().contains("incomplete checkpoint"), "{err}");

    std::fs::remove_file(&paths.target).unwrap();
    assert!(checkpoint::load::<Mlp, RingMemory, _>(&dir, "p", None).is_err());
}

#[test]
fn corrupt_estimator_file_is_rejected() {
    let dir = scratch_dir("checkpoint_corrupt");
    let paths = CheckpointPaths::new(&dir, "bad");
    std::fs::write(&paths.active, b"garbage").unwrap();
    std::fs::write(&paths.target, b"garbage").unwrap();
    assert!(checkpoint::load::<Mlp, RingMemory, _>(&dir, "bad", None).is_err());
}

fn weights_header(hidden_dim: u32) -> Vec<u8> {
    let mut bytes = b"PIEDQNV1".to_vec();
    for v in [1u32, 384, hidden_dim] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&1e-3f32.to_le_bytes());
    bytes.extend_from_slice(&0.01f32.to_le_bytes());
    bytes
}

#[test]
fn oversized_hidden_dim_is_rejected_without_allocating() {
    let dir = scratch_dir("checkpoint_oversized");
    let paths = CheckpointPaths::new(&dir, "huge");
    std::fs::write(&paths.active, weights_header(u32::MAX)).unwrap();
    std::fs::write(&paths.target, weights_header(u32::MAX)).unwrap();
    assert!(Mlp::load(&paths.active).is_err());
    let err = checkpoint::load::<Mlp, RingMemory, _>(&dir, "huge", None).unwrap_err();
    assert!(format!("{err:#}").contains("huge_active.bin"), "{err:#}");
}

#[test]
fn truncated_weights_are_rejected() {
    let dir = scratch_dir("checkpoint_truncated");
    let path = dir.join("short.bin");
    Mlp::new(4, 1e-3, 1).save(&path).unwrap();
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 4);
    std::fs::write(&path, bytes).unwrap();
    assert!(Mlp::load(&path).is_err());
    assert_eq!(weights_header(4).len(), 28);
}
