use numpy::{PyArray1, PyArray2, PyArrayMethods, PyReadonlyArray1};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::dictionary::ItemDictionary;
use crate::display::{print_similar_items, print_user_recommendations};
use crate::error::RecError;
use crate::interactions::{InteractionMatrix, MatrixOptions};
use crate::recommend::{RecommendOptions, Recommender};
use crate::similarity::ItemSimilarity;
use crate::trainer::{FactorizationModel, FactorizationTrainer, TrainerConfig};

impl From<RecError> for PyErr {
    fn from(err: RecError) -> PyErr {
        match err {
            RecError::UnknownUser(_) | RecError::UnknownItem(_) => PyKeyError::new_err(err.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

fn build_matrix(
    users: Vec<String>,
    items: Vec<String>,
    ratings: &[f32],
    options: &MatrixOptions,
) -> PyResult<InteractionMatrix<String, String>> {
    if users.len() != items.len() || users.len() != ratings.len() {
        return Err(PyValueError::new_err(format!(
            "users, items and ratings must have equal length, got {}, {}, {}",
            users.len(),
            items.len(),
            ratings.len()
        )));
    }
    let rows = users
        .into_iter()
        .zip(items)
        .zip(ratings.iter().copied())
        .map(|((u, i), r)| (u, i, r));
    Ok(InteractionMatrix::from_ratings(rows, options)?)
}

/// Returns `(user_ids, item_ids, dense matrix)`.
#[pyfunction]
#[pyo3(signature = (users, items, ratings, norm=false, threshold=None))]
pub fn create_interaction_matrix<'py>(
    py: Python<'py>,
    users: Vec<String>,
    items: Vec<String>,
    ratings: PyReadonlyArray1<'py, f32>,
    norm: bool,
    threshold: Option<f32>,
) -> PyResult<(Vec<String>, Vec<String>, Bound<'py, PyArray2<f32>>)> {
    let options = MatrixOptions {
        normalize: norm,
        threshold,
    };
    let m = build_matrix(users, items, ratings.as_slice()?, &options)?;
    let (n_users, n_items) = m.shape();
    let arr = PyArray1::from_vec(py, m.values().to_vec()).reshape([n_users, n_items])?;
    Ok((m.users().to_vec(), m.items().to_vec(), arr))
}

#[pyclass(name = "Recommender")]
pub struct PyRecommender {
    inner: Recommender<String, String, FactorizationModel>,
    names: ItemDictionary<String>,
    similarity: Option<ItemSimilarity<String>>,
}

fn cached_similarity<'a>(
    slot: &'a mut Option<ItemSimilarity<String>>,
    rec: &Recommender<String, String, FactorizationModel>,
) -> PyResult<&'a ItemSimilarity<String>> {
    let sim = match slot.take() {
        Some(sim) => sim,
        None => rec.item_similarity()?,
    };
    Ok(slot.insert(sim))
}

#[pymethods]
impl PyRecommender {
    /// Train on raw `(user, item, rating)` events. `norm`/`threshold`
    /// binarize the model input only.
    #[staticmethod]
    #[pyo3(signature = (
        users, items, ratings, item_ids, item_names,
        n_components=30, loss="warp", epoch=30, n_jobs=4,
        norm=false, threshold=None, seed=42
    ))]
    #[allow(clippy::too_many_arguments)]
    fn fit(
        py: Python<'_>,
        users: Vec<String>,
        items: Vec<String>,
        ratings: PyReadonlyArray1<'_, f32>,
        item_ids: Vec<String>,
        item_names: Vec<String>,
        n_components: usize,
        loss: &str,
        epoch: usize,
        n_jobs: usize,
        norm: bool,
        threshold: Option<f32>,
        seed: u64,
    ) -> PyResult<Self> {
        let matrix = build_matrix(users, items, ratings.as_slice()?, &MatrixOptions::raw())?;
        let training = MatrixOptions {
            normalize: norm,
            threshold,
        };
        let trainer = FactorizationTrainer::new(
            TrainerConfig::default()
                .with_components(n_components)
                .with_loss(loss.parse()?)
                .with_seed(seed),
        );
        let inner = py.detach(|| Recommender::fit(matrix, &training, &trainer, epoch, n_jobs))?;
        Ok(Self {
            inner,
            names: ItemDictionary::from_pairs(item_ids.into_iter().zip(item_names)),
            similarity: None,
        })
    }

    /// Recommended item names for `user_id`, optionally printed.
    #[pyo3(signature = (user_id, threshold=0.0, num_items=10, show_known=true, show_recs=true))]
    fn get_recs(
        &self,
        user_id: String,
        threshold: f32,
        num_items: usize,
        show_known: bool,
        show_recs: bool,
    ) -> PyResult<Vec<String>> {
        let options = RecommendOptions::new(threshold, num_items);
        let named = self.inner.recommend_names(&user_id, &self.names, &options)?;
        print_user_recommendations(&named, show_known, show_recs)?;
        Ok(named.recommended)
    }

    /// `(item_ids, cosine similarity matrix)`.
    fn item_similarity<'py>(
        &mut self,
        py: Python<'py>,
    ) -> PyResult<(Vec<String>, Bound<'py, PyArray2<f32>>)> {
        let sim = cached_similarity(&mut self.similarity, &self.inner)?;
        let n = sim.len();
        let arr = PyArray1::from_vec(py, sim.values().to_vec()).reshape([n, n])?;
        Ok((sim.items().to_vec(), arr))
    }

    /// Ids of the `n_items` items most similar to `item_id`.
    #[pyo3(signature = (item_id, n_items=10, show=true))]
    fn get_item_recs(&mut self, item_id: String, n_items: usize, show: bool) -> PyResult<Vec<String>> {
        let sim = cached_similarity(&mut self.similarity, &self.inner)?;
        let ids: Vec<String> = sim
            .most_similar(&item_id, n_items)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        if show {
            print_similar_items(&sim.similar_item_names(&item_id, &self.names, n_items)?)?;
        }
        Ok(ids)
    }
}
