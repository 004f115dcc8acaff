//! The training-function seam and trial result records.
//!
//! A [`Trainer`] is the externally supplied routine that actually trains a
//! model. It receives the configuration, the target epoch, the last epoch
//! this configuration already reached, and a checkpoint path. It is expected
//! to resume from the checkpoint when `previous_epoch > 0`, train for the
//! epoch delta, persist an updated checkpoint at the same path, and report
//! one raw record per epoch trained (or a single record for the final
//! epoch — both shapes are accepted via [`TrainerOutput`]).
//!
//! Raw records are open maps so trainers can attach whatever extra metrics
//! they like; only `epoch` (integer) and `metric` (number) are required.
//! The orchestrator validates those two and promotes them into typed fields
//! on [`TrialRecord`], leaving the rest in [`TrialRecord::extra`].

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::value::Value;

/// A raw result record as returned by a [`Trainer`].
///
/// Must contain an `epoch` entry ([`Value::Int`], non-negative) and a
/// `metric` entry ([`Value::Float`] or [`Value::Int`]). Any other entries
/// are carried through unchanged.
pub type RawRecord = BTreeMap<String, Value>;

/// The return shape of a [`Trainer`] invocation.
///
/// A trainer reporting only its final epoch returns
/// [`Single`](TrainerOutput::Single); one reporting every epoch in the
/// trained delta returns [`Batch`](TrainerOutput::Batch). The orchestrator
/// normalizes both to a sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum TrainerOutput {
    /// One record, treated as a one-element sequence.
    Single(RawRecord),
    /// One record per epoch trained.
    Batch(Vec<RawRecord>),
}

impl TrainerOutput {
    /// Normalizes to a sequence of records.
    #[must_use]
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::Batch(records) => records,
        }
    }
}

impl From<RawRecord> for TrainerOutput {
    fn from(record: RawRecord) -> Self {
        Self::Single(record)
    }
}

impl From<Vec<RawRecord>> for TrainerOutput {
    fn from(records: Vec<RawRecord>) -> Self {
        Self::Batch(records)
    }
}

/// The externally supplied training routine.
///
/// Implemented for any
/// `FnMut(&Configuration, u32, u32, &Path) -> Result<TrainerOutput>`
/// closure, so simple trainers need no named type:
///
/// ```
/// use std::path::Path;
/// use graybox::{Configuration, RawRecord, Result, TrainerOutput, Value};
///
/// let trainer = |_config: &Configuration,
///                target: u32,
///                _previous: u32,
///                _checkpoint: &Path|
///  -> Result<TrainerOutput> {
///     let record = RawRecord::from([
///         ("epoch".to_owned(), Value::from(target)),
///         ("metric".to_owned(), Value::from(0.42)),
///     ]);
///     Ok(record.into())
/// };
/// # let _ = trainer;
/// ```
pub trait Trainer {
    /// Trains `configuration` from `previous_epoch` up to `target_epoch`,
    /// resuming from and re-persisting the checkpoint at `checkpoint_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if training itself fails; shape problems in the
    /// returned records are caught by the orchestrator afterwards.
    fn train(
        &mut self,
        configuration: &Configuration,
        target_epoch: u32,
        previous_epoch: u32,
        checkpoint_path: &Path,
    ) -> Result<TrainerOutput>;
}

impl<F> Trainer for F
where
    F: FnMut(&Configuration, u32, u32, &Path) -> Result<TrainerOutput>,
{
    fn train(
        &mut self,
        configuration: &Configuration,
        target_epoch: u32,
        previous_epoch: u32,
        checkpoint_path: &Path,
    ) -> Result<TrainerOutput> {
        self(configuration, target_epoch, previous_epoch, checkpoint_path)
    }
}

/// A configuration paired with its pool id, as passed to
/// [`GrayBox::start_trial`](crate::GrayBox::start_trial).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigurationInfo {
    /// The configuration's id in the pool.
    pub id: usize,
    /// The configuration itself.
    pub configuration: Configuration,
}

impl ConfigurationInfo {
    /// Pairs a configuration with its id.
    #[must_use]
    pub fn new(id: usize, configuration: Configuration) -> Self {
        Self { id, configuration }
    }
}

/// An enriched per-epoch trial result.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialRecord {
    /// The id of the evaluated configuration.
    pub configuration_id: usize,
    /// The epoch this record reports on.
    pub epoch: u32,
    /// The metric reported by the trainer for this epoch.
    pub metric: f64,
    /// Per-epoch wall-clock cost in seconds: the total invocation time
    /// divided by the number of records the invocation returned.
    pub time: f64,
    /// The full evaluated configuration.
    pub configuration: Configuration,
    /// Any extra entries the trainer attached to the raw record.
    pub extra: RawRecord,
}

impl TrialRecord {
    /// Validates a raw record and promotes it to an enriched one.
    pub(crate) fn from_raw(
        mut raw: RawRecord,
        configuration_id: usize,
        configuration: Configuration,
        time: f64,
    ) -> Result<Self> {
        let epoch = match raw.remove("epoch") {
            Some(Value::Int(e)) => u32::try_from(e).map_err(|_| Error::InvalidField {
                field: "epoch",
                value: Value::Int(e),
            })?,
            Some(other) => {
                return Err(Error::InvalidField {
                    field: "epoch",
                    value: other,
                })
            }
            None => return Err(Error::MissingField { field: "epoch" }),
        };
        let metric = match raw.remove("metric") {
            Some(Value::Float(m)) => m,
            #[allow(clippy::cast_precision_loss)]
            Some(Value::Int(m)) => m as f64,
            Some(other) => {
                return Err(Error::InvalidField {
                    field: "metric",
                    value: other,
                })
            }
            None => return Err(Error::MissingField { field: "metric" }),
        };
        Ok(Self {
            configuration_id,
            epoch,
            metric,
            time,
            configuration,
            extra: raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, Value)]) -> RawRecord {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn promotes_required_fields_and_keeps_extras() {
        let record = raw(&[
            ("epoch", Value::Int(3)),
            ("metric", Value::Float(0.8)),
            ("val_loss", Value::Float(0.2)),
        ]);
        let trial =
            TrialRecord::from_raw(record, 7, Configuration::new(), 1.5).unwrap();
        assert_eq!(trial.configuration_id, 7);
        assert_eq!(trial.epoch, 3);
        assert!((trial.metric - 0.8).abs() < f64::EPSILON);
        assert_eq!(trial.extra.get("val_loss"), Some(&Value::Float(0.2)));
        assert!(!trial.extra.contains_key("epoch"));
    }

    #[test]
    fn missing_metric_is_rejected() {
        let record = raw(&[("epoch", Value::Int(1))]);
        let err = TrialRecord::from_raw(record, 0, Configuration::new(), 0.0).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "metric" }));
    }

    #[test]
    fn negative_epoch_is_rejected() {
        let record = raw(&[("epoch", Value::Int(-1)), ("metric", Value::Float(0.0))]);
        let err = TrialRecord::from_raw(record, 0, Configuration::new(), 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "epoch", .. }));
    }

    #[test]
    fn integer_metric_is_widened() {
        let record = raw(&[("epoch", Value::Int(1)), ("metric", Value::Int(4))]);
        let trial = TrialRecord::from_raw(record, 0, Configuration::new(), 0.0).unwrap();
        assert!((trial.metric - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_output_normalizes_to_one_record() {
        let output = TrainerOutput::Single(raw(&[("epoch", Value::Int(1))]));
        assert_eq!(output.into_records().len(), 1);
    }
}
