//! Item-item cosine similarity over learned item embeddings.

use ahash::AHashSet;
use faer::{linalg::matmul::matmul, Accum, MatMut, MatRef, Par};

use crate::common::{rank_desc, Id};
use crate::dictionary::{ItemDictionary, ItemIndex};
use crate::error::{RecError, Result};
use crate::trainer::Embeddings;

/// Square, symmetric `n_items × n_items` cosine-similarity table.
///
/// Both axes are labelled by item id in interaction-matrix column order and
/// the diagonal is exactly 1.0. Building it is O(items²) in time and space,
/// so build it once and reuse it for every lookup.
#[derive(Debug, Clone)]
pub struct ItemSimilarity<I> {
    items: Vec<I>,
    index: ItemIndex<I>,
    values: Vec<f32>,
}

/// Result of a nearest-item lookup, translated to display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarItems {
    /// Name of the queried item.
    pub query: String,
    /// Names of the most similar items, most similar first.
    pub similar: Vec<String>,
}

/// Row-normalized copy; zero rows stay zero.
fn l2_normalize_rows(embeddings: &Embeddings) -> Vec<f32> {
    let k = embeddings.dim();
    let mut out = embeddings.as_slice().to_vec();
    for (i, row) in out.chunks_exact_mut(k.max(1)).enumerate() {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        } else {
            tracing::warn!(item_row = i, "zero-norm item embedding");
        }
    }
    out
}

impl<I: Id> ItemSimilarity<I> {
    /// Pairwise cosine similarity of every item embedding.
    ///
    /// `items` names the embedding rows and must have one unique label per
    /// row.
    pub fn from_embeddings(embeddings: &Embeddings, items: &[I]) -> Result<Self> {
        let n = embeddings.rows();
        if items.len() != n {
            return Err(RecError::DimensionMismatch {
                expected: format!("{n} item labels"),
                actual: format!("{} item labels", items.len()),
            });
        }
        let mut seen = AHashSet::with_capacity(n);
        if !items.iter().all(|item| seen.insert(item)) {
            return Err(RecError::invalid("items", n, "item labels must be unique"));
        }
        let k = embeddings.dim();
        let normed = l2_normalize_rows(embeddings);

        // sim = E_n × E_n.T  (n × n)
        let mut values = vec![0.0f32; n * n];
        if k > 0 {
            matmul(
                MatMut::from_row_major_slice_mut(&mut values, n, n).as_mut(),
                Accum::Replace,
                MatRef::from_row_major_slice(&normed, n, k),
                MatRef::from_row_major_slice(&normed, n, k).transpose(),
                1.0f32,
                Par::rayon(0),
            );
        }
        // Mirror the upper triangle so the table is exactly symmetric.
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in i + 1..n {
                let v = values[i * n + j].clamp(-1.0, 1.0);
                values[i * n + j] = v;
                values[j * n + i] = v;
            }
        }

        tracing::debug!(items = n, dim = k, "built item similarity matrix");
        Ok(Self {
            items: items.to_vec(),
            index: ItemIndex::from_labels(items),
            values,
        })
    }

    /// Axis labels.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Row-major `len() × len()` similarity values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Similarities of `item` to every item, in label order.
    pub fn row(&self, item: &I) -> Result<&[f32]> {
        let n = self.items.len();
        let pos = self.index.position(item)?;
        Ok(&self.values[pos * n..(pos + 1) * n])
    }

    pub fn get(&self, a: &I, b: &I) -> Result<f32> {
        let col = self.index.position(b)?;
        Ok(self.row(a)?[col])
    }

    /// The `n` items most similar to `item`, most similar first.
    ///
    /// The query item itself is never returned. Ties keep label order.
    pub fn most_similar(&self, item: &I, n: usize) -> Result<Vec<(I, f32)>> {
        let pos = self.index.position(item)?;
        let row = self.row(item)?;
        Ok(rank_desc(row)
            .into_iter()
            .filter(|&j| j != pos)
            .take(n)
            .map(|j| (self.items[j].clone(), row[j]))
            .collect())
    }

    /// [`most_similar`](Self::most_similar), translated to display names.
    pub fn similar_item_names(
        &self,
        item: &I,
        dict: &ItemDictionary<I>,
        n: usize,
    ) -> Result<SimilarItems> {
        let similar = self.most_similar(item, n)?;
        Ok(SimilarItems {
            query: dict.name(item)?.to_owned(),
            similar: dict.names(similar.iter().map(|(id, _)| id))?,
        })
    }
}
