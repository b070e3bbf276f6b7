//! Helpers for a matrix-factorization recommender.
//!
//! Build a user × item [`InteractionMatrix`] from raw rating events, train
//! embeddings through an [`EmbeddingTrainer`], then ask the bound
//! [`Recommender`] for top-N unseen items per user or build an
//! [`ItemSimilarity`] table for item-to-item lookups.
//!
//! ```
//! use embedrec::{
//!     FactorizationTrainer, InteractionMatrix, ItemDictionary, MatrixOptions, RecommendOptions,
//!     Recommender, TrainerConfig,
//! };
//!
//! let events = vec![("ann", 1, 5.0), ("ann", 2, 1.0), ("bob", 1, 4.0), ("bob", 3, 5.0)];
//! let matrix = InteractionMatrix::from_ratings(events, &MatrixOptions::raw())?;
//! let trainer = FactorizationTrainer::new(TrainerConfig::default().with_components(4));
//! let rec = Recommender::fit(matrix, &MatrixOptions::normalized(3.0), &trainer, 10, 1)?;
//!
//! let names = ItemDictionary::from_pairs(vec![(1, "Heat"), (2, "Ronin"), (3, "Thief")]);
//! let picks = rec.recommend_names(&"ann", &names, &RecommendOptions::new(3.0, 5))?;
//! assert_eq!(picks.known, vec!["Heat"]);
//! assert!(!picks.recommended.contains(&"Heat".to_string()));
//! # Ok::<(), embedrec::RecError>(())
//! ```

#[cfg(feature = "python")]
use mimalloc::MiMalloc;
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod common;
pub mod csr;
pub mod dictionary;
pub mod display;
pub mod error;
pub mod interactions;
#[cfg(feature = "python")]
mod python;
pub mod recommend;
pub mod similarity;
pub mod table;
pub mod trainer;

pub use common::Id;
pub use csr::CsrMatrix;
pub use dictionary::{ItemDictionary, ItemIndex, UserIndex};
pub use error::{RecError, Result};
pub use interactions::{InteractionMatrix, MatrixOptions};
pub use recommend::{NamedRecommendations, RecommendOptions, Recommender, ScoredItem, UserRecommendations};
pub use similarity::{ItemSimilarity, SimilarItems};
pub use trainer::{
    EmbeddingModel, EmbeddingTrainer, Embeddings, FactorizationModel, FactorizationTrainer, Loss,
    TrainerConfig,
};

#[cfg(feature = "python")]
#[pymodule]
fn _embedrec(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(python::create_interaction_matrix, m)?)?;
    m.add_class::<python::PyRecommender>()?;
    Ok(())
}
