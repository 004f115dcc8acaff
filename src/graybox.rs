//! The graybox trial orchestrator.
//!
//! [`GrayBox`] maps (configuration, target epoch) requests onto
//! checkpoint-resuming invocations of a [`Trainer`]. Each configuration id
//! gets its own checkpoint directory under a caller-specified root, and the
//! orchestrator remembers the last epoch each configuration reached, so a
//! request for epoch 5 after epoch 2 trains only the 3-epoch delta.
//!
//! # How a request resolves
//!
//! 1. A cached result for the exact (configuration id, target epoch) pair is
//!    returned verbatim — the trainer is not invoked.
//! 2. Otherwise the checkpoint root is created if absent, the previous epoch
//!    is looked up from the fidelity ledger (absent means 0), and the
//!    trainer is invoked and timed end to end.
//! 3. The output is normalized to a record sequence, every record is
//!    validated to carry `epoch` and `metric`, and each record is enriched
//!    with the configuration id, the full configuration, and the per-epoch
//!    wall-clock cost (total time divided by record count).
//! 4. The ledger is updated to the target epoch and the enriched records are
//!    cached, write-once, under the exact pair.
//!
//! Caching on the *exact* target epoch means optimization loops that
//! re-query an already-reached fidelity (re-ranking does this constantly)
//! are answered for free.
//!
//! The orchestrator trusts callers to request non-decreasing epochs per
//! configuration; an out-of-order request reaches the trainer with
//! `previous_epoch > target_epoch` and behaves however the trainer does.
//!
//! # Lifecycle
//!
//! [`close`](GrayBox::close) deletes the checkpoint tree, best-effort and
//! idempotent. `Drop` calls it, so the tree is cleaned up even on early
//! returns and panics.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use graybox::{
//!     Configuration, ConfigurationInfo, GrayBox, RawRecord, Result, TrainerOutput, Value,
//! };
//!
//! let trainer = |_config: &Configuration,
//!                target: u32,
//!                previous: u32,
//!                _checkpoint: &Path|
//!  -> Result<TrainerOutput> {
//!     let records: Vec<RawRecord> = (previous + 1..=target)
//!         .map(|epoch| {
//!             RawRecord::from([
//!                 ("epoch".to_owned(), Value::from(epoch)),
//!                 ("metric".to_owned(), Value::from(0.9)),
//!             ])
//!         })
//!         .collect();
//!     Ok(records.into())
//! };
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut runner = GrayBox::new(dir.path().join("checkpoints"), trainer)?;
//!
//! let config: Configuration = [("lr", Value::Float(1e-3))].into_iter().collect();
//! let info = ConfigurationInfo::new(0, config);
//!
//! let results = runner.start_trial(&[(info.clone(), 2)])?;
//! assert_eq!(results.len(), 2);
//! assert_eq!(runner.last_epoch(0), Some(2));
//!
//! // Same pair again: served from cache, trainer not invoked.
//! let again = runner.start_trial(&[(info, 2)])?;
//! assert_eq!(again, results);
//! # Ok::<(), graybox::Error>(())
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::trial::{ConfigurationInfo, Trainer, TrialRecord};

/// Orchestrates checkpoint-resuming trainer invocations.
///
/// Owns the fidelity ledger (configuration id → last reached epoch), the
/// write-once result cache keyed by (configuration id, target epoch), and
/// the checkpoint directory tree. See the [module docs](self) for the
/// request pipeline.
pub struct GrayBox<T: Trainer> {
    trainer: T,
    root: PathBuf,
    previous_fidelities: HashMap<usize, u32>,
    trial_results: HashMap<(usize, u32), Vec<TrialRecord>>,
}

impl<T: Trainer> GrayBox<T> {
    /// Creates an orchestrator rooted at `root`.
    ///
    /// The root's parent directory is created eagerly; the root itself is
    /// created lazily before the first trainer invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(root: impl Into<PathBuf>, trainer: T) -> Result<Self> {
        let root = root.into();
        if let Some(parent) = root.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            trainer,
            root,
            previous_fidelities: HashMap::new(),
            trial_results: HashMap::new(),
        })
    }

    /// Evaluates a batch of (configuration, target epoch) requests.
    ///
    /// Requests are processed strictly in the given order, with no
    /// reordering and no cross-request deduplication: a pair that appears
    /// twice in the batch goes through the pipeline twice, the second pass
    /// hitting the cache the first one wrote. The returned records cover
    /// every request, concatenated in request order.
    ///
    /// # Errors
    ///
    /// A malformed trainer result (missing or invalid `epoch`/`metric`,
    /// or zero records) aborts the batch; nothing from the offending
    /// request is cached. Trainer failures and checkpoint directory I/O
    /// errors propagate likewise.
    pub fn start_trial(
        &mut self,
        requests: &[(ConfigurationInfo, u32)],
    ) -> Result<Vec<TrialRecord>> {
        let mut all = Vec::new();
        for (info, target_epoch) in requests {
            all.extend(self.run(info, *target_epoch)?);
        }
        Ok(all)
    }

    fn run(&mut self, info: &ConfigurationInfo, target_epoch: u32) -> Result<Vec<TrialRecord>> {
        let id = info.id;
        if let Some(cached) = self.trial_results.get(&(id, target_epoch)) {
            tracing::debug!(configuration_id = id, target_epoch, "trial served from cache");
            return Ok(cached.clone());
        }

        let checkpoint = self.checkpoint_path(id);
        fs::create_dir_all(&self.root)?;
        let previous_epoch = self.previous_fidelities.get(&id).copied().unwrap_or(0);

        let start = Instant::now();
        let output = self
            .trainer
            .train(&info.configuration, target_epoch, previous_epoch, &checkpoint)?;
        let elapsed = start.elapsed().as_secs_f64();

        let raw = output.into_records();
        if raw.is_empty() {
            return Err(Error::EmptyResult);
        }
        #[allow(clippy::cast_precision_loss)]
        let per_epoch_time = elapsed / raw.len() as f64;

        let mut records = Vec::with_capacity(raw.len());
        for entry in raw {
            records.push(TrialRecord::from_raw(
                entry,
                id,
                info.configuration.clone(),
                per_epoch_time,
            )?);
        }

        tracing::debug!(
            configuration_id = id,
            target_epoch,
            previous_epoch,
            records = records.len(),
            elapsed,
            "trial finished"
        );
        self.previous_fidelities.insert(id, target_epoch);
        self.trial_results.insert((id, target_epoch), records.clone());
        Ok(records)
    }

    /// The checkpoint path for a configuration id: `root/trial_{id}`.
    ///
    /// Pure derivation; nothing is created.
    #[must_use]
    pub fn checkpoint_path(&self, configuration_id: usize) -> PathBuf {
        self.root.join(format!("trial_{configuration_id}"))
    }

    /// The checkpoint root directory.
    #[must_use]
    pub fn checkpoint_root(&self) -> &Path {
        &self.root
    }

    /// The highest epoch `configuration_id` has been evaluated at, or
    /// `None` if it was never evaluated.
    #[must_use]
    pub fn last_epoch(&self, configuration_id: usize) -> Option<u32> {
        self.previous_fidelities.get(&configuration_id).copied()
    }

    /// The cached records for the exact (configuration id, epoch) pair, if
    /// that pair has been evaluated.
    #[must_use]
    pub fn cached(&self, configuration_id: usize, epoch: u32) -> Option<&[TrialRecord]> {
        self.trial_results
            .get(&(configuration_id, epoch))
            .map(Vec::as_slice)
    }

    /// Deletes the checkpoint directory tree.
    ///
    /// Best-effort: failures are logged, never propagated. Calling `close`
    /// when the tree is already gone is a no-op, so running it after `Drop`
    /// or twice in a row is fine.
    pub fn close(&mut self) {
        if !self.root.exists() {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.root) {
            tracing::warn!(
                root = %self.root.display(),
                %err,
                "failed to remove checkpoint directory"
            );
        }
    }
}

impl<T: Trainer> Drop for GrayBox<T> {
    fn drop(&mut self) {
        self.close();
    }
}
