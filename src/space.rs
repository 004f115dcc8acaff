//! The search-space seam and a built-in random sampling space.
//!
//! The [`ConfigurationManager`](crate::ConfigurationManager) treats the
//! search space as a black box behind the [`SearchSpace`] trait: it can draw
//! configurations and enumerate structural metadata, nothing more.
//!
//! Metadata is a fixed polymorphic descriptor, decided once when the space
//! is ingested: every hyperparameter is either
//! [`Numeric`](HyperparameterKind::Numeric) (with a log-scale flag) or
//! [`Categorical`](HyperparameterKind::Categorical) (with its choice list).
//! There is no per-access introspection.
//!
//! # Implementing a custom space
//!
//! ```
//! use graybox::{Configuration, Hyperparameter, SearchSpace};
//!
//! /// A space that enumerates a fixed list of configurations round-robin.
//! struct FixedSpace {
//!     configs: Vec<Configuration>,
//!     next: usize,
//! }
//!
//! impl SearchSpace for FixedSpace {
//!     fn sample(&mut self, count: usize) -> Vec<Configuration> {
//!         (0..count)
//!             .map(|_| {
//!                 let config = self.configs[self.next % self.configs.len()].clone();
//!                 self.next += 1;
//!                 config
//!             })
//!             .collect()
//!     }
//!
//!     fn hyperparameters(&self) -> Vec<Hyperparameter> {
//!         vec![Hyperparameter::numeric("x", false)]
//!     }
//! }
//! ```
//!
//! [`RandomSpace`] is the built-in implementation: independent uniform
//! sampling per hyperparameter, with log-scaled parameters drawn uniformly
//! in log space.

use crate::config::Configuration;
use crate::value::Value;

/// The shape of a single hyperparameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HyperparameterKind {
    /// A numeric hyperparameter (float or integer).
    Numeric {
        /// `true` if the hyperparameter is sampled on a log scale.
        log: bool,
    },
    /// A categorical hyperparameter with a fixed choice list.
    Categorical {
        /// The allowed values, in declaration order.
        choices: Vec<Value>,
    },
}

/// Structural metadata for one hyperparameter of a search space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hyperparameter {
    /// The hyperparameter name.
    pub name: String,
    /// Numeric or categorical shape.
    pub kind: HyperparameterKind,
}

impl Hyperparameter {
    /// Creates a numeric descriptor.
    #[must_use]
    pub fn numeric(name: impl Into<String>, log: bool) -> Self {
        Self {
            name: name.into(),
            kind: HyperparameterKind::Numeric { log },
        }
    }

    /// Creates a categorical descriptor.
    #[must_use]
    pub fn categorical<I, V>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            kind: HyperparameterKind::Categorical {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Returns `true` for categorical hyperparameters.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, HyperparameterKind::Categorical { .. })
    }

    /// Returns `true` for log-scaled numeric hyperparameters.
    #[must_use]
    pub fn is_log(&self) -> bool {
        matches!(self.kind, HyperparameterKind::Numeric { log: true })
    }

    /// The choice list for categorical hyperparameters, empty otherwise.
    #[must_use]
    pub fn choices(&self) -> &[Value] {
        match &self.kind {
            HyperparameterKind::Categorical { choices } => choices,
            HyperparameterKind::Numeric { .. } => &[],
        }
    }
}

/// A source of hyperparameter configurations.
///
/// `sample` takes `&mut self` because drawing advances the space's RNG (or
/// whatever internal cursor a deterministic space keeps). `seed` is optional;
/// spaces without randomness ignore it.
pub trait SearchSpace {
    /// Draws `count` configurations.
    ///
    /// A well-behaved space returns exactly `count` configurations; the
    /// configuration manager tolerates short batches but will stop retrying
    /// against a space that stops producing.
    fn sample(&mut self, count: usize) -> Vec<Configuration>;

    /// Enumerates the space's hyperparameters, in declaration order.
    fn hyperparameters(&self) -> Vec<Hyperparameter>;

    /// Re-seeds the space's sampler. Default: no-op.
    fn seed(&mut self, _seed: u64) {}
}

/// Per-hyperparameter sampling rule for [`RandomSpace`].
#[derive(Clone, Debug)]
enum ParamDef {
    Float { low: f64, high: f64, log: bool },
    Int { low: i64, high: i64, log: bool },
    Categorical { choices: Vec<Value> },
}

/// Independent uniform random sampling over a declared set of
/// hyperparameters.
///
/// Log-scaled parameters are drawn uniformly in log space and exponentiated
/// back, so e.g. a learning rate over `[1e-5, 1e-1]` spends equal probability
/// mass on each decade.
///
/// # Examples
///
/// ```
/// use graybox::{RandomSpace, SearchSpace};
///
/// let mut space = RandomSpace::new()
///     .log_float("learning_rate", 1e-5, 1e-1)
///     .int("batch_size", 16, 256)
///     .categorical("optimizer", ["adam", "sgd"]);
///
/// space.seed(42);
/// let configs = space.sample(5);
/// assert_eq!(configs.len(), 5);
/// ```
#[derive(Debug, Default)]
pub struct RandomSpace {
    params: Vec<(String, ParamDef)>,
    rng: fastrand::Rng,
}

impl RandomSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a uniform float hyperparameter over `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if `low >= high` or either bound is non-finite.
    #[must_use]
    pub fn float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        assert!(
            low.is_finite() && high.is_finite() && low < high,
            "float bounds must be finite with low < high"
        );
        self.params
            .push((name.into(), ParamDef::Float { low, high, log: false }));
        self
    }

    /// Declares a log-uniform float hyperparameter over `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if `low <= 0` or `low >= high` or either bound is non-finite.
    #[must_use]
    pub fn log_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        assert!(
            low.is_finite() && high.is_finite() && 0.0 < low && low < high,
            "log float bounds must be finite with 0 < low < high"
        );
        self.params
            .push((name.into(), ParamDef::Float { low, high, log: true }));
        self
    }

    /// Declares a uniform integer hyperparameter over `[low, high]`.
    ///
    /// # Panics
    ///
    /// Panics if `low > high`.
    #[must_use]
    pub fn int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        assert!(low <= high, "int bounds must satisfy low <= high");
        self.params
            .push((name.into(), ParamDef::Int { low, high, log: false }));
        self
    }

    /// Declares a log-uniform integer hyperparameter over `[low, high]`.
    ///
    /// # Panics
    ///
    /// Panics if `low < 1` or `low > high`.
    #[must_use]
    pub fn log_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        assert!(
            1 <= low && low <= high,
            "log int bounds must satisfy 1 <= low <= high"
        );
        self.params
            .push((name.into(), ParamDef::Int { low, high, log: true }));
        self
    }

    /// Declares a categorical hyperparameter with the given choices.
    ///
    /// # Panics
    ///
    /// Panics if `choices` is empty.
    #[must_use]
    pub fn categorical<I, V>(mut self, name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
        assert!(!choices.is_empty(), "categorical choices cannot be empty");
        self.params
            .push((name.into(), ParamDef::Categorical { choices }));
        self
    }

    /// Declares a boolean hyperparameter (categorical over `false`/`true`).
    #[must_use]
    pub fn bool_param(self, name: impl Into<String>) -> Self {
        self.categorical(name, [false, true])
    }

    fn draw(rng: &mut fastrand::Rng, def: &ParamDef) -> Value {
        match def {
            ParamDef::Float { low, high, log: false } => {
                Value::Float(low + rng.f64() * (high - low))
            }
            ParamDef::Float { low, high, log: true } => {
                let ln_low = low.ln();
                let v = (ln_low + rng.f64() * (high.ln() - ln_low)).exp();
                Value::Float(v.clamp(*low, *high))
            }
            ParamDef::Int { low, high, log: false } => Value::Int(rng.i64(*low..=*high)),
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            ParamDef::Int { low, high, log: true } => {
                let ln_low = (*low as f64).ln();
                let v = (ln_low + rng.f64() * ((*high as f64).ln() - ln_low)).exp();
                Value::Int((v.round() as i64).clamp(*low, *high))
            }
            ParamDef::Categorical { choices } => choices[rng.usize(0..choices.len())].clone(),
        }
    }
}

impl SearchSpace for RandomSpace {
    fn sample(&mut self, count: usize) -> Vec<Configuration> {
        (0..count)
            .map(|_| {
                self.params
                    .iter()
                    .map(|(name, def)| (name.clone(), Self::draw(&mut self.rng, def)))
                    .collect()
            })
            .collect()
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        self.params
            .iter()
            .map(|(name, def)| match def {
                ParamDef::Float { log, .. } | ParamDef::Int { log, .. } => {
                    Hyperparameter::numeric(name.clone(), *log)
                }
                ParamDef::Categorical { choices } => {
                    Hyperparameter::categorical(name.clone(), choices.clone())
                }
            })
            .collect()
    }

    fn seed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> RandomSpace {
        RandomSpace::new()
            .float("momentum", 0.0, 1.0)
            .log_float("learning_rate", 1e-5, 1e-1)
            .int("layers", 1, 8)
            .categorical("optimizer", ["adam", "sgd", "rmsprop"])
    }

    #[test]
    fn samples_stay_in_bounds() {
        let mut space = space();
        space.seed(1);
        for config in space.sample(200) {
            let momentum = config.get("momentum").unwrap().as_f64().unwrap();
            assert!((0.0..1.0).contains(&momentum));

            let lr = config.get("learning_rate").unwrap().as_f64().unwrap();
            assert!((1e-5..=1e-1).contains(&lr));

            let layers = config.get("layers").unwrap().as_int().unwrap();
            assert!((1..=8).contains(&layers));

            let opt = config.get("optimizer").unwrap().as_str().unwrap();
            assert!(["adam", "sgd", "rmsprop"].contains(&opt));
        }
    }

    #[test]
    fn seed_makes_sampling_reproducible() {
        let mut a = space();
        let mut b = space();
        a.seed(42);
        b.seed(42);
        assert_eq!(a.sample(20), b.sample(20));
    }

    #[test]
    fn hyperparameter_metadata_matches_declaration() {
        let space = space();
        let hps = space.hyperparameters();
        assert_eq!(hps.len(), 4);
        assert!(!hps[0].is_log() && !hps[0].is_categorical());
        assert!(hps[1].is_log());
        assert_eq!(hps[2].name, "layers");
        assert!(hps[3].is_categorical());
        assert_eq!(hps[3].choices().len(), 3);
    }

    #[test]
    fn log_int_covers_full_range() {
        let mut space = RandomSpace::new().log_int("units", 1, 1024);
        space.seed(3);
        for config in space.sample(500) {
            let units = config.get("units").unwrap().as_int().unwrap();
            assert!((1..=1024).contains(&units));
        }
    }
}
