//! Tabular projection of the configuration pool.
//!
//! Downstream surrogate models want configurations as a matrix, not as maps.
//! [`ConfigTable`] is that projection: one row per configuration (in id
//! order), columns in the manager's canonical order. Hyperparameters that
//! are inactive in a conditional subspace project to `None` — never a
//! sentinel value.
//!
//! The table is always rebuilt whole from the pool after an insertion batch;
//! it is a view, not a second source of truth.

use crate::config::Configuration;
use crate::value::Value;

/// A column-ordered view of the configuration pool.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl ConfigTable {
    /// Projects `pool` onto `columns`, cloning values cell by cell.
    pub(crate) fn project(columns: &[String], pool: &[Configuration]) -> Self {
        let rows = pool
            .iter()
            .map(|config| {
                columns
                    .iter()
                    .map(|name| config.get(name).cloned())
                    .collect()
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// The column names, in canonical order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in configuration id order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    /// The row for configuration id `index`, if it exists.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Option<Value>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// The cells of the named column, in id order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<Option<&Value>>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index].as_ref()).collect())
    }

    /// The number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
