//! The configuration manager: pool, dedup, and tabular projection.
//!
//! # How it works
//!
//! 1. At build time the manager derives its canonical column order and
//!    per-hyperparameter metadata from the space, once: log-scaled
//!    hyperparameters first, remaining numeric ones next, categorical ones
//!    last. That ordering minimizes column shuffling in downstream surrogate
//!    preprocessing.
//! 2. [`add`](ConfigurationManager::add) grows the pool by *unique*
//!    configurations, deduplicating on canonical keys, retrying sampling in
//!    a bounded loop.
//! 3. If the retry budget is exhausted with a deficit left, the manager
//!    switches permanently to [`DedupMode::DuplicatesAllowed`] and fills the
//!    remainder with duplicate draws. Spaces with few discrete combinations
//!    (all-categorical, small cardinality) would otherwise never terminate.
//! 4. After every insertion batch the [`ConfigTable`] is rebuilt whole from
//!    the pool and re-ordered to the canonical column order.
//!
//! Configuration ids are insertion indices: stable, monotonically assigned,
//! never reused or reordered.
//!
//! # Examples
//!
//! ```
//! use graybox::{ConfigurationManager, RandomSpace};
//!
//! let space = RandomSpace::new()
//!     .log_float("learning_rate", 1e-5, 1e-1)
//!     .categorical("optimizer", ["adam", "sgd"]);
//!
//! let mut manager = ConfigurationManager::builder(space)
//!     .initial(16)
//!     .seed(42)
//!     .build();
//!
//! assert_eq!(manager.len(), 16);
//! assert_eq!(manager.table().columns(), ["learning_rate", "optimizer"]);
//!
//! manager.add(4);
//! assert_eq!(manager.len(), 20);
//! ```

use std::collections::HashSet;

use crate::config::{CanonicalKey, Configuration};
use crate::error::{Error, Result};
use crate::space::{Hyperparameter, SearchSpace};
use crate::table::ConfigTable;
use crate::trial::ConfigurationInfo;
use crate::value::Value;

/// Default retry budget for [`ConfigurationManager::add`].
pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// Whether the pool still insists on unique configurations.
///
/// The mode transitions once, from [`UniqueOnly`](DedupMode::UniqueOnly) to
/// [`DuplicatesAllowed`](DedupMode::DuplicatesAllowed), and never reverts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupMode {
    /// Sampled configurations must not repeat an existing canonical key.
    UniqueOnly,
    /// Unique draws were exhausted; duplicates are accepted from now on.
    DuplicatesAllowed,
}

/// Owns the growing pool of sampled configurations.
///
/// The manager deduplicates configurations, assigns stable integer ids
/// (insertion order), and exposes a column-ordered [`ConfigTable`] for
/// surrogate consumption. Construct one through
/// [`builder`](ConfigurationManager::builder).
pub struct ConfigurationManager {
    space: Box<dyn SearchSpace>,
    pool: Vec<Configuration>,
    seen: HashSet<CanonicalKey>,
    hyperparameters: Vec<Hyperparameter>,
    columns: Vec<String>,
    table: ConfigTable,
    mode: DedupMode,
}

impl ConfigurationManager {
    /// Creates a builder around `space`.
    pub fn builder(space: impl SearchSpace + 'static) -> ConfigurationManagerBuilder {
        ConfigurationManagerBuilder {
            space: Box::new(space),
            initial: 0,
            seed: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Creates a manager with an empty pool and no seeding.
    pub fn new(space: impl SearchSpace + 'static) -> Self {
        Self::builder(space).build()
    }

    /// Draws `count` raw configurations from the space.
    ///
    /// Pure delegation: no dedup, no pool insertion, no table rebuild.
    pub fn sample(&mut self, count: usize) -> Vec<Configuration> {
        self.space.sample(count)
    }

    /// Grows the pool by `count` unique configurations, degrading to
    /// duplicate-tolerant sampling if the default retry budget
    /// ([`DEFAULT_MAX_ROUNDS`]) runs out.
    pub fn add(&mut self, count: usize) {
        self.add_with_rounds(count, DEFAULT_MAX_ROUNDS);
    }

    /// Like [`add`](Self::add) with an explicit retry budget.
    ///
    /// Each round samples enough candidates to cover the remaining deficit
    /// and accepts those whose canonical key is unseen. Once `max_rounds`
    /// rounds leave a nonzero deficit, the manager permanently switches to
    /// [`DedupMode::DuplicatesAllowed`] and keeps filling; the switch is
    /// logged, not raised. `count == 0` is a no-op.
    pub fn add_with_rounds(&mut self, count: usize, max_rounds: usize) {
        if count == 0 {
            return;
        }
        let mut added = 0;
        let mut rounds = 0;
        while added < count {
            let batch = self.space.sample(count - added);
            let batch_was_empty = batch.is_empty();
            for config in batch {
                let key = config.canonical_key();
                if self.mode == DedupMode::DuplicatesAllowed || !self.seen.contains(&key) {
                    self.seen.insert(key);
                    self.pool.push(config);
                    added += 1;
                }
            }
            rounds += 1;
            if added < count && rounds >= max_rounds {
                match self.mode {
                    DedupMode::UniqueOnly => {
                        tracing::warn!(
                            deficit = count - added,
                            rounds,
                            "unique configuration draws exhausted; \
                             switching to duplicate-tolerant sampling"
                        );
                        self.mode = DedupMode::DuplicatesAllowed;
                        rounds = 0;
                    }
                    // Duplicates are already accepted, so a deficit here
                    // means the space itself stopped producing.
                    DedupMode::DuplicatesAllowed => break,
                }
            }
            if batch_was_empty && self.mode == DedupMode::DuplicatesAllowed {
                break;
            }
        }
        tracing::debug!(added, pool = self.pool.len(), "configurations added");
        self.rebuild_table();
    }

    /// Inserts a caller-provided configuration directly, bypassing sampling.
    ///
    /// Used for seeding known-good configurations. The configuration joins
    /// the same dedup bookkeeping (its key is recorded so later sampled
    /// duplicates are rejected) and triggers the same full table rebuild.
    pub fn set(&mut self, configuration: Configuration) {
        self.seen.insert(configuration.canonical_key());
        self.pool.push(configuration);
        self.rebuild_table();
    }

    /// The tabular projection of the pool.
    #[must_use]
    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    /// The configuration with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownConfiguration`] if `id` was never assigned.
    pub fn get(&self, id: usize) -> Result<&Configuration> {
        self.pool.get(id).ok_or(Error::UnknownConfiguration { id })
    }

    /// The configuration with the given id, paired with that id, ready to
    /// hand to [`GrayBox::start_trial`](crate::GrayBox::start_trial).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownConfiguration`] if `id` was never assigned.
    pub fn configuration_info(&self, id: usize) -> Result<ConfigurationInfo> {
        Ok(ConfigurationInfo::new(id, self.get(id)?.clone()))
    }

    /// The number of configurations in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` if the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// The hyperparameter descriptors, in canonical column order.
    #[must_use]
    pub fn hyperparameters(&self) -> &[Hyperparameter] {
        &self.hyperparameters
    }

    /// The column names, in canonical order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Per-column log-scale flags (categorical columns report `false`).
    #[must_use]
    pub fn log_flags(&self) -> Vec<bool> {
        self.hyperparameters.iter().map(Hyperparameter::is_log).collect()
    }

    /// Per-column categorical flags and choice lists (numeric columns get an
    /// empty list).
    #[must_use]
    pub fn categorical_flags(&self) -> (Vec<bool>, Vec<Vec<Value>>) {
        let flags = self
            .hyperparameters
            .iter()
            .map(Hyperparameter::is_categorical)
            .collect();
        let choices = self
            .hyperparameters
            .iter()
            .map(|hp| hp.choices().to_vec())
            .collect();
        (flags, choices)
    }

    /// Returns `true` once the manager has degraded to duplicate-tolerant
    /// sampling. Sticky for the manager's lifetime.
    #[must_use]
    pub fn duplicates_allowed(&self) -> bool {
        self.mode == DedupMode::DuplicatesAllowed
    }

    fn rebuild_table(&mut self) {
        self.table = ConfigTable::project(&self.columns, &self.pool);
    }
}

/// Builder for [`ConfigurationManager`].
///
/// Covers initialization: optional sampler seeding, the initial pool size,
/// and the retry budget used while drawing the initial pool.
pub struct ConfigurationManagerBuilder {
    space: Box<dyn SearchSpace>,
    initial: usize,
    seed: Option<u64>,
    max_rounds: usize,
}

impl ConfigurationManagerBuilder {
    /// Number of configurations to sample into the pool up front.
    #[must_use]
    pub fn initial(mut self, count: usize) -> Self {
        self.initial = count;
        self
    }

    /// Seeds the space's sampler before the initial draw.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Retry budget for the initial draw (default [`DEFAULT_MAX_ROUNDS`]).
    #[must_use]
    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Builds the manager: derives column order and metadata from the space,
    /// seeds it if requested, then samples the initial pool.
    #[must_use]
    pub fn build(mut self) -> ConfigurationManager {
        if let Some(seed) = self.seed {
            self.space.seed(seed);
        }
        let hyperparameters = order_hyperparameters(self.space.hyperparameters());
        let columns: Vec<String> = hyperparameters.iter().map(|hp| hp.name.clone()).collect();
        let mut manager = ConfigurationManager {
            space: self.space,
            pool: Vec::new(),
            seen: HashSet::new(),
            hyperparameters,
            columns,
            table: ConfigTable::default(),
            mode: DedupMode::UniqueOnly,
        };
        manager.rebuild_table();
        manager.add_with_rounds(self.initial, self.max_rounds);
        manager
    }
}

/// Reorders descriptors into the canonical column order: log-scaled
/// hyperparameters, then remaining numeric ones, then categorical ones.
fn order_hyperparameters(hyperparameters: Vec<Hyperparameter>) -> Vec<Hyperparameter> {
    let mut log = Vec::new();
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for hp in hyperparameters {
        if hp.is_categorical() {
            categorical.push(hp);
        } else if hp.is_log() {
            log.push(hp);
        } else {
            numeric.push(hp);
        }
    }
    log.extend(numeric);
    log.extend(categorical);
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::RandomSpace;

    #[test]
    fn column_order_is_log_then_numeric_then_categorical() {
        let space = RandomSpace::new()
            .categorical("optimizer", ["adam", "sgd"])
            .float("momentum", 0.0, 1.0)
            .log_float("learning_rate", 1e-4, 1e-1);
        let manager = ConfigurationManager::new(space);

        assert_eq!(
            manager.column_names(),
            ["learning_rate", "momentum", "optimizer"]
        );
        assert_eq!(manager.log_flags(), [true, false, false]);
        let (flags, choices) = manager.categorical_flags();
        assert_eq!(flags, [false, false, true]);
        assert!(choices[0].is_empty() && choices[1].is_empty());
        assert_eq!(choices[2].len(), 2);
    }

    #[test]
    fn empty_manager_still_exposes_columns() {
        let manager =
            ConfigurationManager::new(RandomSpace::new().float("x", 0.0, 1.0));
        assert!(manager.is_empty());
        assert_eq!(manager.table().columns(), ["x"]);
        assert!(manager.table().is_empty());
    }
}
