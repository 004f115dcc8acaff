use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use graybox::{
    Configuration, ConfigurationInfo, Error, GrayBox, RawRecord, Result, TrainerOutput, Value,
};
use tempfile::TempDir;

fn config() -> Configuration {
    [("learning_rate", Value::Float(1e-3))].into_iter().collect()
}

fn info(id: usize) -> ConfigurationInfo {
    ConfigurationInfo::new(id, config())
}

fn record(epoch: u32, metric: f64) -> RawRecord {
    RawRecord::from([
        ("epoch".to_owned(), Value::from(epoch)),
        ("metric".to_owned(), Value::from(metric)),
    ])
}

/// One record per epoch in the trained delta, counting invocations and
/// remembering the (target, previous) pairs it was called with.
struct CallLog {
    invocations: usize,
    epochs: Vec<(u32, u32)>,
    paths: Vec<PathBuf>,
}

fn logging_trainer(
    log: Rc<RefCell<CallLog>>,
) -> impl FnMut(&Configuration, u32, u32, &Path) -> Result<TrainerOutput> {
    move |_config: &Configuration, target: u32, previous: u32, checkpoint: &Path|
          -> Result<TrainerOutput> {
        let mut log = log.borrow_mut();
        log.invocations += 1;
        log.epochs.push((target, previous));
        log.paths.push(checkpoint.to_path_buf());
        let records: Vec<RawRecord> = (previous + 1..=target)
            .map(|epoch| record(epoch, 1.0 / f64::from(epoch)))
            .collect();
        Ok(records.into())
    }
}

fn new_log() -> Rc<RefCell<CallLog>> {
    Rc::new(RefCell::new(CallLog {
        invocations: 0,
        epochs: Vec::new(),
        paths: Vec::new(),
    }))
}

fn root(dir: &TempDir) -> PathBuf {
    dir.path().join("checkpoints")
}

#[test]
fn records_are_enriched_and_ledger_updated() {
    let dir = TempDir::new().unwrap();
    let log = new_log();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(log.clone())).unwrap();

    let results = runner.start_trial(&[(info(0), 1)]).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].configuration_id, 0);
    assert_eq!(results[0].epoch, 1);
    assert_eq!(results[0].configuration, config());
    assert!(results[0].time >= 0.0);
    assert_eq!(runner.last_epoch(0), Some(1));
    assert_eq!(log.borrow().epochs, [(1, 0)]);
}

#[test]
fn exact_pair_is_cached_and_trainer_not_reinvoked() {
    let dir = TempDir::new().unwrap();
    let log = new_log();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(log.clone())).unwrap();

    let first = runner.start_trial(&[(info(0), 3)]).unwrap();
    let second = runner.start_trial(&[(info(0), 3)]).unwrap();

    assert_eq!(log.borrow().invocations, 1);
    assert_eq!(first, second);
}

#[test]
fn resume_passes_previous_epoch_and_trains_delta_only() {
    let dir = TempDir::new().unwrap();
    let log = new_log();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(log.clone())).unwrap();

    let first = runner.start_trial(&[(info(0), 2)]).unwrap();
    let extended = runner.start_trial(&[(info(0), 5)]).unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(extended.len(), 3);
    assert_eq!(extended[0].epoch, 3);
    assert_eq!(log.borrow().epochs, [(2, 0), (5, 2)]);
    assert_eq!(runner.last_epoch(0), Some(5));
}

#[test]
fn per_epoch_time_is_total_divided_by_record_count() {
    let dir = TempDir::new().unwrap();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(new_log())).unwrap();

    let results = runner.start_trial(&[(info(0), 4)]).unwrap();

    assert_eq!(results.len(), 4);
    // All records of one invocation share the same per-epoch cost.
    for r in &results {
        assert!((r.time - results[0].time).abs() < f64::EPSILON);
        assert!(r.time >= 0.0);
    }
}

#[test]
fn batch_preserves_request_order_and_duplicates_hit_cache() {
    let dir = TempDir::new().unwrap();
    let log = new_log();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(log.clone())).unwrap();

    let results = runner
        .start_trial(&[(info(0), 2), (info(1), 1), (info(0), 2)])
        .unwrap();

    // 2 + 1 + 2 records, concatenated in request order; the duplicate pair
    // is served from the cache the first request wrote.
    assert_eq!(results.len(), 5);
    assert_eq!(log.borrow().invocations, 2);
    let ids: Vec<usize> = results.iter().map(|r| r.configuration_id).collect();
    assert_eq!(ids, [0, 0, 1, 0, 0]);
    assert_eq!(&results[..2], &results[3..]);
}

#[test]
fn trainer_receives_per_configuration_checkpoint_path() {
    let dir = TempDir::new().unwrap();
    let log = new_log();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(log.clone())).unwrap();

    assert_eq!(runner.checkpoint_path(7), root(&dir).join("trial_7"));

    runner.start_trial(&[(info(3), 1)]).unwrap();
    assert_eq!(log.borrow().paths, [root(&dir).join("trial_3")]);
    // The root exists once a trial has run, ready for the trainer to write
    // its per-trial checkpoint under it.
    assert!(root(&dir).is_dir());
}

#[test]
fn missing_metric_aborts_and_caches_nothing() {
    let dir = TempDir::new().unwrap();
    let trainer = |_config: &Configuration,
                   target: u32,
                   _previous: u32,
                   _checkpoint: &Path|
     -> Result<TrainerOutput> {
        let mut bad = RawRecord::new();
        bad.insert("epoch".to_owned(), Value::from(target));
        Ok(bad.into())
    };
    let mut runner = GrayBox::new(root(&dir), trainer).unwrap();

    let err = runner.start_trial(&[(info(0), 1)]).unwrap_err();
    assert!(matches!(err, Error::MissingField { field: "metric" }));
    assert!(runner.cached(0, 1).is_none());
    assert_eq!(runner.last_epoch(0), None);
}

#[test]
fn empty_trainer_output_is_rejected() {
    let dir = TempDir::new().unwrap();
    let trainer = |_config: &Configuration,
                   _target: u32,
                   _previous: u32,
                   _checkpoint: &Path|
     -> Result<TrainerOutput> { Ok(TrainerOutput::Batch(Vec::new())) };
    let mut runner = GrayBox::new(root(&dir), trainer).unwrap();

    let err = runner.start_trial(&[(info(0), 1)]).unwrap_err();
    assert!(matches!(err, Error::EmptyResult));
    assert!(runner.cached(0, 1).is_none());
}

#[test]
fn trainer_failure_propagates_uncached() {
    let dir = TempDir::new().unwrap();
    let trainer = |_config: &Configuration,
                   _target: u32,
                   _previous: u32,
                   _checkpoint: &Path|
     -> Result<TrainerOutput> { Err(Error::Training("loss diverged".to_owned())) };
    let mut runner = GrayBox::new(root(&dir), trainer).unwrap();

    let err = runner.start_trial(&[(info(0), 1)]).unwrap_err();
    assert!(matches!(err, Error::Training(_)));
    assert!(runner.cached(0, 1).is_none());
}

#[test]
fn single_record_output_is_normalized() {
    let dir = TempDir::new().unwrap();
    let trainer = |_config: &Configuration,
                   target: u32,
                   _previous: u32,
                   _checkpoint: &Path|
     -> Result<TrainerOutput> { Ok(record(target, 0.5).into()) };
    let mut runner = GrayBox::new(root(&dir), trainer).unwrap();

    let results = runner.start_trial(&[(info(0), 3)]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].epoch, 3);
}

#[test]
fn close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut runner = GrayBox::new(root(&dir), logging_trainer(new_log())).unwrap();
    runner.start_trial(&[(info(0), 1)]).unwrap();
    assert!(root(&dir).is_dir());

    runner.close();
    assert!(!root(&dir).exists());
    // Second close on a missing tree must not fail.
    runner.close();
}

#[test]
fn drop_removes_checkpoint_tree() {
    let dir = TempDir::new().unwrap();
    {
        let mut runner = GrayBox::new(root(&dir), logging_trainer(new_log())).unwrap();
        runner.start_trial(&[(info(0), 1)]).unwrap();
        assert!(root(&dir).is_dir());
    }
    assert!(!root(&dir).exists());
}

#[test]
fn new_creates_parent_of_root() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("runs").join("checkpoints");
    let _runner = GrayBox::new(nested.clone(), logging_trainer(new_log())).unwrap();
    assert!(nested.parent().unwrap().is_dir());
    // The root itself is created lazily.
    assert!(!nested.exists());
}
