//! Top-N recommendation for a user from a trained embedding model.

use serde::{Deserialize, Serialize};

use crate::common::{rank_desc, Id};
use crate::csr::CsrMatrix;
use crate::dictionary::{ItemDictionary, ItemIndex, UserIndex};
use crate::error::{RecError, Result};
use crate::interactions::{InteractionMatrix, MatrixOptions};
use crate::similarity::ItemSimilarity;
use crate::trainer::{EmbeddingModel, EmbeddingTrainer};

/// Lookup knobs for [`Recommender::recommend`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendOptions {
    /// Raw interaction value above which an item counts as known.
    pub threshold: f32,
    /// Number of recommendations to return.
    pub num_items: usize,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            num_items: 10,
        }
    }
}

impl RecommendOptions {
    pub fn new(threshold: f32, num_items: usize) -> Self {
        Self {
            threshold,
            num_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem<I> {
    pub item: I,
    pub score: f32,
}

/// Ranked ids for one user, before name translation.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecommendations<I> {
    /// Items above the known threshold, by descending item id.
    pub known: Vec<I>,
    /// Unknown items by descending score, at most `num_items` of them.
    pub recommended: Vec<ScoredItem<I>>,
}

/// [`UserRecommendations`] translated to display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRecommendations {
    pub known: Vec<String>,
    pub recommended: Vec<String>,
}

impl<I: Id> UserRecommendations<I> {
    /// Translate every id; fails on the first one missing from `dict`.
    pub fn named(&self, dict: &ItemDictionary<I>) -> Result<NamedRecommendations> {
        Ok(NamedRecommendations {
            known: dict.names(&self.known)?,
            recommended: dict.names(self.recommended.iter().map(|s| &s.item))?,
        })
    }
}

/// A trained model bound to the interaction matrix it was trained on.
///
/// Holds the raw (never normalized) matrix, the user row and item column
/// index maps derived from it, and the model. Row and column order of all
/// four agree by construction.
#[derive(Debug, Clone)]
pub struct Recommender<U, I, M> {
    interactions: InteractionMatrix<U, I>,
    users: UserIndex<U>,
    items: ItemIndex<I>,
    model: M,
}

impl<U: Id, I: Id, M: EmbeddingModel> Recommender<U, I, M> {
    /// Bind an already trained model. Its user and item counts must match
    /// the matrix shape.
    pub fn new(interactions: InteractionMatrix<U, I>, model: M) -> Result<Self> {
        let shape = interactions.shape();
        if (model.n_users(), model.n_items()) != shape {
            return Err(RecError::DimensionMismatch {
                expected: format!("{}x{} users x items", shape.0, shape.1),
                actual: format!("{}x{}", model.n_users(), model.n_items()),
            });
        }
        if model.item_embeddings().rows() != shape.1 {
            return Err(RecError::DimensionMismatch {
                expected: format!("{} item embeddings", shape.1),
                actual: format!("{}", model.item_embeddings().rows()),
            });
        }
        Ok(Self {
            users: UserIndex::from_matrix(&interactions),
            items: ItemIndex::from_matrix(&interactions),
            interactions,
            model,
        })
    }

    /// Train on `interactions` and bind the result.
    ///
    /// `training` optionally binarizes the model input; known-item
    /// detection keeps using the raw `interactions` either way.
    pub fn fit<T>(
        interactions: InteractionMatrix<U, I>,
        training: &MatrixOptions,
        trainer: &T,
        epochs: usize,
        num_threads: usize,
    ) -> Result<Self>
    where
        T: EmbeddingTrainer<Model = M>,
    {
        let csr = match training.binarize_at()? {
            Some(t) => CsrMatrix::from_dense(&interactions.normalized(t)),
            None => CsrMatrix::from_dense(&interactions),
        };
        let model = trainer.fit(&csr, epochs, num_threads)?;
        Self::new(interactions, model)
    }

    pub fn interactions(&self) -> &InteractionMatrix<U, I> {
        &self.interactions
    }

    pub fn user_index(&self) -> &UserIndex<U> {
        &self.users
    }

    pub fn item_index(&self) -> &ItemIndex<I> {
        &self.items
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Score every item for `user`, drop the known ones and keep the top
    /// `num_items`.
    ///
    /// Equal scores keep column order. The result is shorter than
    /// `num_items` when fewer unknown items exist.
    pub fn recommend(&self, user: &U, options: &RecommendOptions) -> Result<UserRecommendations<I>> {
        let row = self.users.position(user)?;
        let all_items: Vec<usize> = (0..self.interactions.n_items()).collect();
        let scores = self.scores(row, &all_items)?;

        let raw = self.interactions.row(row);
        let labels = self.interactions.items();
        let mut known: Vec<I> = raw
            .iter()
            .zip(labels)
            .filter(|&(&v, _)| v > options.threshold)
            .map(|(_, id)| id.clone())
            .collect();
        known.sort_unstable_by(|a, b| b.cmp(a));

        let is_known = |col: usize| raw[col] > options.threshold;
        let recommended = rank_desc(&scores)
            .into_iter()
            .filter(|&col| !is_known(col))
            .take(options.num_items)
            .map(|col| ScoredItem {
                item: labels[col].clone(),
                score: scores[col],
            })
            .collect();

        Ok(UserRecommendations { known, recommended })
    }

    /// [`recommend`](Self::recommend), translated through `dict`.
    pub fn recommend_names(
        &self,
        user: &U,
        dict: &ItemDictionary<I>,
        options: &RecommendOptions,
    ) -> Result<NamedRecommendations> {
        self.recommend(user, options)?.named(dict)
    }

    /// Users with the highest predicted score for `item`. Ties keep row
    /// order.
    pub fn recommend_users(&self, item: &I, n: usize) -> Result<Vec<(U, f32)>> {
        let col = self.items.position(item)?;
        let scores = (0..self.interactions.n_users())
            .map(|u| Ok(self.scores(u, &[col])?[0]))
            .collect::<Result<Vec<f32>>>()?;
        Ok(rank_desc(&scores)
            .into_iter()
            .take(n)
            .map(|u| (self.interactions.users()[u].clone(), scores[u]))
            .collect())
    }

    // One score per requested column, or the model broke its contract.
    fn scores(&self, row: usize, cols: &[usize]) -> Result<Vec<f32>> {
        let scores = self.model.predict(row, cols);
        if scores.len() != cols.len() {
            return Err(RecError::DimensionMismatch {
                expected: format!("{} scores", cols.len()),
                actual: format!("{}", scores.len()),
            });
        }
        Ok(scores)
    }

    /// Cosine similarity of the model's item embeddings, labelled by the
    /// matrix columns.
    pub fn item_similarity(&self) -> Result<ItemSimilarity<I>> {
        ItemSimilarity::from_embeddings(self.model.item_embeddings(), self.interactions.items())
    }
}
