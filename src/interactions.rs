//! Dense user × item interaction matrix built from raw rating events.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::common::Id;
use crate::error::{RecError, Result};

/// How aggregated ratings are turned into matrix cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixOptions {
    /// Map every cell to 1 if it exceeds `threshold`, else 0.
    pub normalize: bool,
    /// Value above which a rating is favorable. Required when `normalize`.
    pub threshold: Option<f32>,
}

impl MatrixOptions {
    /// Summed ratings, no binarization.
    pub fn raw() -> Self {
        Self::default()
    }

    /// Binarize at `threshold`.
    pub fn normalized(threshold: f32) -> Self {
        Self {
            normalize: true,
            threshold: Some(threshold),
        }
    }

    /// Threshold to binarize at, `None` for raw sums.
    pub(crate) fn binarize_at(&self) -> Result<Option<f32>> {
        match (self.normalize, self.threshold) {
            (true, None) => Err(RecError::MissingThreshold),
            (true, Some(t)) => Ok(Some(t)),
            (false, _) => Ok(None),
        }
    }
}

/// Row-major `n_users × n_items` table of aggregated ratings.
///
/// Rows are labelled by user id and columns by item id, both in ascending
/// order. Labels are unique and pairs without any event hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix<U, I> {
    users: Vec<U>,
    items: Vec<I>,
    values: Vec<f32>,
}

impl<U: Id, I: Id> InteractionMatrix<U, I> {
    /// Group `(user, item, rating)` rows by pair, sum the ratings and pivot.
    ///
    /// Fails with [`RecError::MissingThreshold`] before touching `rows` when
    /// normalization is requested without a threshold.
    pub fn from_ratings<R>(rows: R, options: &MatrixOptions) -> Result<Self>
    where
        R: IntoIterator<Item = (U, I, f32)>,
    {
        let threshold = options.binarize_at()?;

        let mut sums: AHashMap<(U, I), f32> = AHashMap::new();
        let mut user_set = BTreeSet::new();
        let mut item_set = BTreeSet::new();
        for (user, item, rating) in rows {
            user_set.insert(user.clone());
            item_set.insert(item.clone());
            *sums.entry((user, item)).or_insert(0.0) += rating;
        }

        let users: Vec<U> = user_set.into_iter().collect();
        let items: Vec<I> = item_set.into_iter().collect();
        let n_items = items.len();
        let mut values = vec![0.0f32; users.len() * n_items];
        {
            let user_pos: AHashMap<&U, usize> =
                users.iter().enumerate().map(|(i, u)| (u, i)).collect();
            let item_pos: AHashMap<&I, usize> =
                items.iter().enumerate().map(|(i, it)| (it, i)).collect();
            for ((user, item), sum) in &sums {
                values[user_pos[user] * n_items + item_pos[item]] = *sum;
            }
        }

        tracing::debug!(
            users = users.len(),
            items = n_items,
            pairs = sums.len(),
            "built interaction matrix"
        );

        let matrix = Self { users, items, values };
        Ok(match threshold {
            Some(t) => matrix.normalized(t),
            None => matrix,
        })
    }

    /// Wrap an existing row-major table. Labels must be strictly ascending
    /// and the value count must equal `users.len() * items.len()`.
    pub fn from_dense(users: Vec<U>, items: Vec<I>, values: Vec<f32>) -> Result<Self> {
        if values.len() != users.len() * items.len() {
            return Err(RecError::DimensionMismatch {
                expected: format!("{}x{} values", users.len(), items.len()),
                actual: format!("{} values", values.len()),
            });
        }
        if !users.windows(2).all(|w| w[0] < w[1]) {
            return Err(RecError::invalid(
                "users",
                users.len(),
                "row labels must be unique and ascending",
            ));
        }
        if !items.windows(2).all(|w| w[0] < w[1]) {
            return Err(RecError::invalid(
                "items",
                items.len(),
                "column labels must be unique and ascending",
            ));
        }
        Ok(Self { users, items, values })
    }

    /// Binary copy: 1 where the cell exceeds `threshold`, 0 elsewhere.
    pub fn normalized(&self, threshold: f32) -> Self {
        Self {
            users: self.users.clone(),
            items: self.items.clone(),
            values: self
                .values
                .iter()
                .map(|&v| if v > threshold { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// `(n_users, n_items)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.users.len(), self.items.len())
    }

    /// Row labels in row order.
    pub fn users(&self) -> &[U] {
        &self.users
    }

    /// Column labels in column order.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// Row-major cell values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Cells of row `row`.
    pub fn row(&self, row: usize) -> &[f32] {
        let n = self.items.len();
        &self.values[row * n..(row + 1) * n]
    }

    /// Cell by position.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.items.len() + col]
    }

    /// Cell by label; `None` when either label is absent.
    pub fn value(&self, user: &U, item: &I) -> Option<f32> {
        let row = self.users.binary_search(user).ok()?;
        let col = self.items.binary_search(item).ok()?;
        Some(self.get(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<(&'static str, u32, f32)> {
        vec![
            ("u2", 10, 2.0),
            ("u1", 20, 1.0),
            ("u1", 10, 5.0),
            ("u1", 10, 1.5),
            ("u3", 30, 4.0),
        ]
    }

    #[test]
    fn sums_duplicate_pairs_and_fills_zeros() {
        let m = InteractionMatrix::from_ratings(events(), &MatrixOptions::raw()).unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.users(), &["u1", "u2", "u3"]);
        assert_eq!(m.items(), &[10, 20, 30]);
        assert_eq!(m.row(0), &[6.5, 1.0, 0.0]);
        assert_eq!(m.value(&"u2", &10), Some(2.0));
        assert_eq!(m.value(&"u2", &30), Some(0.0));
        assert_eq!(m.value(&"u9", &30), None);
    }

    #[test]
    fn normalization_binarizes_strictly_above_threshold() {
        let m = InteractionMatrix::from_ratings(events(), &MatrixOptions::normalized(2.0)).unwrap();
        assert_eq!(m.row(0), &[1.0, 0.0, 0.0]);
        assert_eq!(m.row(1), &[0.0, 0.0, 0.0]);
        assert_eq!(m.row(2), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn normalization_without_threshold_fails_fast() {
        let opts = MatrixOptions {
            normalize: true,
            threshold: None,
        };
        let err = InteractionMatrix::from_ratings(events(), &opts).unwrap_err();
        assert!(matches!(err, RecError::MissingThreshold));

        let empty: Vec<(u8, u8, f32)> = Vec::new();
        assert!(InteractionMatrix::from_ratings(empty, &opts).is_err());
    }

    #[test]
    fn threshold_is_ignored_without_normalize_flag() {
        let opts = MatrixOptions {
            normalize: false,
            threshold: Some(100.0),
        };
        let m = InteractionMatrix::from_ratings(events(), &opts).unwrap();
        assert_eq!(m.get(0, 0), 6.5);
    }

    #[test]
    fn from_dense_rejects_bad_shapes_and_duplicate_labels() {
        assert!(InteractionMatrix::from_dense(vec![1, 2], vec!['a'], vec![0.0]).is_err());
        assert!(InteractionMatrix::from_dense(vec![1, 1], vec!['a'], vec![0.0, 1.0]).is_err());
        let m = InteractionMatrix::from_dense(vec![1, 2], vec!['a'], vec![0.0, 1.0]).unwrap();
        assert_eq!(m.get(1, 0), 1.0);
    }

    #[test]
    fn from_dense_rejects_unsorted_labels() {
        let rows = InteractionMatrix::from_dense(vec![3, 1, 2], vec!['a'], vec![30.0, 10.0, 20.0]);
        assert!(matches!(rows, Err(RecError::InvalidHyperparameter { .. })));
        assert!(InteractionMatrix::from_dense(vec![1], vec!['b', 'a'], vec![1.0, 2.0]).is_err());

        let m = InteractionMatrix::from_dense(vec![1, 2, 3], vec!['a'], vec![10.0, 20.0, 30.0]).unwrap();
        assert_eq!(m.value(&3, &'a'), Some(30.0));
        assert_eq!(m.value(&1, &'a'), Some(10.0));
    }
}
