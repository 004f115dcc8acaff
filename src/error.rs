//! Error types for the graybox crate.
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `core::result::Result<T, Error>`. Sampling exhaustion is deliberately
//! *not* an error: the configuration manager degrades to duplicate-tolerant
//! sampling instead (see
//! [`ConfigurationManager::add`](crate::ConfigurationManager::add)).

use crate::value::Value;

/// Errors returned by graybox operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration id that was never assigned by the pool.
    #[error("unknown configuration id {id}")]
    UnknownConfiguration {
        /// The id that was looked up.
        id: usize,
    },

    /// A training result record is missing a required entry.
    ///
    /// Every record returned by a [`Trainer`](crate::Trainer) must carry an
    /// `epoch` and a `metric` entry. This aborts the whole batch; nothing
    /// from the offending request is cached.
    #[error("`{field}` entry missing from training result")]
    MissingField {
        /// The name of the missing entry (`"epoch"` or `"metric"`).
        field: &'static str,
    },

    /// A training result record carries a value of the wrong shape, e.g. a
    /// string `epoch` or a negative one.
    #[error("`{field}` entry in training result has an invalid value: {value}")]
    InvalidField {
        /// The name of the offending entry.
        field: &'static str,
        /// The value that could not be interpreted.
        value: Value,
    },

    /// The training function returned zero result records.
    #[error("training function returned no result records")]
    EmptyResult,

    /// The training function itself failed.
    ///
    /// Custom [`Trainer`](crate::Trainer) implementations can use this to
    /// surface domain failures (diverged loss, CUDA OOM, ...) through
    /// [`GrayBox::start_trial`](crate::GrayBox::start_trial).
    #[error("training function failed: {0}")]
    Training(String),

    /// A checkpoint directory could not be created.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
