#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]

//! Multi-fidelity hyperparameter evaluation with checkpoint resume.
//!
//! A multi-fidelity search loop repeatedly asks to evaluate a hyperparameter
//! configuration at an increasing training budget. Retraining from scratch
//! at every budget wastes most of that work; this crate instead reuses
//! partial training progress through checkpoints ("graybox" evaluation).
//! It provides the two stateful pieces such a loop needs:
//!
//! | Type | Role |
//! |------|------|
//! | [`ConfigurationManager`] | Sample, deduplicate, and id-stamp configurations; expose them as a table for surrogate models. |
//! | [`GrayBox`] | Map (configuration, target epoch) requests onto checkpoint-resuming [`Trainer`] invocations, with result caching and per-configuration fidelity tracking. |
//!
//! Training itself stays external: you supply a [`Trainer`] (any closure
//! with the right shape works) that trains for an epoch delta, resumes from
//! and re-persists a checkpoint, and reports per-epoch records. The search
//! space is likewise pluggable via [`SearchSpace`]; [`RandomSpace`] is the
//! built-in uniform implementation.
//!
//! # Getting started
//!
//! ```
//! use std::path::Path;
//! use graybox::prelude::*;
//!
//! # fn main() -> graybox::Result<()> {
//! let space = RandomSpace::new()
//!     .log_float("learning_rate", 1e-5, 1e-1)
//!     .int("batch_size", 16, 256)
//!     .categorical("optimizer", ["adam", "sgd"]);
//!
//! let manager = ConfigurationManager::builder(space)
//!     .initial(4)
//!     .seed(42)
//!     .build();
//!
//! let trainer = |_config: &Configuration,
//!                target: u32,
//!                previous: u32,
//!                _checkpoint: &Path|
//!  -> Result<TrainerOutput> {
//!     // A real trainer resumes from the checkpoint and trains the delta.
//!     let records: Vec<RawRecord> = (previous + 1..=target)
//!         .map(|epoch| {
//!             RawRecord::from([
//!                 ("epoch".to_owned(), Value::from(epoch)),
//!                 ("metric".to_owned(), Value::from(0.5)),
//!             ])
//!         })
//!         .collect();
//!     Ok(records.into())
//! };
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut runner = GrayBox::new(dir.path().join("checkpoints"), trainer)?;
//!
//! // Evaluate configuration 0 at epoch 2, then extend it to epoch 5:
//! // the second call trains only epochs 3..=5.
//! let results = runner.start_trial(&[(manager.configuration_info(0)?, 2)])?;
//! assert_eq!(results.len(), 2);
//! let extended = runner.start_trial(&[(manager.configuration_info(0)?, 5)])?;
//! assert_eq!(extended.len(), 3);
//! assert_eq!(runner.last_epoch(0), Some(5));
//! # Ok(())
//! # }
//! ```
//!
//! # Design notes
//!
//! - Configuration ids are insertion indices into the pool: stable, never
//!   reused or reordered.
//! - The result cache is keyed by the *exact* (id, target epoch) pair, so
//!   re-querying an already-reached fidelity never re-trains.
//! - Everything here is single-threaded and synchronous; the only blocking
//!   operation is the trainer call itself.

mod config;
mod error;
mod graybox;
mod manager;
mod space;
mod table;
mod trial;
mod value;

pub use config::Configuration;
pub use error::{Error, Result};
pub use graybox::GrayBox;
pub use manager::{
    ConfigurationManager, ConfigurationManagerBuilder, DedupMode, DEFAULT_MAX_ROUNDS,
};
pub use space::{Hyperparameter, HyperparameterKind, RandomSpace, SearchSpace};
pub use table::ConfigTable;
pub use trial::{ConfigurationInfo, RawRecord, Trainer, TrainerOutput, TrialRecord};
pub use value::Value;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use graybox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Configuration;
    pub use crate::error::{Error, Result};
    pub use crate::graybox::GrayBox;
    pub use crate::manager::{ConfigurationManager, DedupMode};
    pub use crate::space::{Hyperparameter, HyperparameterKind, RandomSpace, SearchSpace};
    pub use crate::table::ConfigTable;
    pub use crate::trial::{ConfigurationInfo, RawRecord, Trainer, TrainerOutput, TrialRecord};
    pub use crate::value::Value;
}
