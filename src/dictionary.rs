//! Translation between matrix positions and domain identifiers.

use ahash::AHashMap;

use crate::common::Id;
use crate::error::{RecError, Result};
use crate::interactions::InteractionMatrix;

/// User id → zero-based row position of the interaction matrix.
#[derive(Debug, Clone)]
pub struct UserIndex<U> {
    positions: AHashMap<U, usize>,
}

impl<U: Id> UserIndex<U> {
    /// Number the matrix's row labels in their existing order.
    pub fn from_matrix<I: Id>(matrix: &InteractionMatrix<U, I>) -> Self {
        Self {
            positions: number_labels(matrix.users()),
        }
    }

    pub fn position(&self, user: &U) -> Result<usize> {
        self.positions
            .get(user)
            .copied()
            .ok_or_else(|| RecError::unknown_user(user))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Item id → zero-based column position of the interaction matrix.
///
/// Item embeddings are indexed by this position, so it is the bridge between
/// similarity rows and item ids.
#[derive(Debug, Clone)]
pub struct ItemIndex<I> {
    positions: AHashMap<I, usize>,
}

impl<I: Id> ItemIndex<I> {
    pub fn from_matrix<U: Id>(matrix: &InteractionMatrix<U, I>) -> Self {
        Self::from_labels(matrix.items())
    }

    pub(crate) fn from_labels(items: &[I]) -> Self {
        Self {
            positions: number_labels(items),
        }
    }

    pub fn position(&self, item: &I) -> Result<usize> {
        self.positions
            .get(item)
            .copied()
            .ok_or_else(|| RecError::unknown_item(item))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn number_labels<K: Id>(labels: &[K]) -> AHashMap<K, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(pos, k)| (k.clone(), pos))
        .collect()
}

/// Item id → human-readable display name.
///
/// Independent of matrix column order. Callers guarantee every item that
/// appears in interactions has an entry; a gap surfaces as
/// [`RecError::UnknownItem`] at translation time.
#[derive(Debug, Clone)]
pub struct ItemDictionary<I> {
    names: AHashMap<I, String>,
}

impl<I> Default for ItemDictionary<I> {
    fn default() -> Self {
        Self {
            names: AHashMap::new(),
        }
    }
}

impl<I: Id> ItemDictionary<I> {
    /// Project `(id, name)` pairs. A repeated id keeps the last name.
    pub fn from_pairs<N, P>(pairs: P) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = (I, N)>,
    {
        Self {
            names: pairs.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }

    pub fn insert(&mut self, id: I, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name(&self, id: &I) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| RecError::unknown_item(id))
    }

    /// Translate every id, failing on the first one without a name.
    pub fn names<'a, It>(&self, ids: It) -> Result<Vec<String>>
    where
        I: 'a,
        It: IntoIterator<Item = &'a I>,
    {
        ids.into_iter()
            .map(|id| self.name(id).map(str::to_owned))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
