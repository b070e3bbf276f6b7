//! Embedding training behind the [`EmbeddingTrainer`] capability.
//!
//! The shipped backend is SGD matrix factorization with per-entity biases,
//! trained with a WARP, BPR or logistic objective. Any other factorization
//! routine can be plugged in by implementing the two traits below; the
//! scorer and similarity engine only ever see [`EmbeddingModel`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::common::{dot, random_factors, sigmoid, XorShift64};
use crate::csr::CsrMatrix;
use crate::error::{RecError, Result};

/// Dense `rows × dim` block of embedding vectors, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
}

impl Embeddings {
    pub fn from_row_major(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
        if data.len() != rows * dim {
            return Err(RecError::DimensionMismatch {
                expected: format!("{rows}x{dim} values"),
                actual: format!("{} values", data.len()),
            });
        }
        Ok(Self { data, rows, dim })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// A trained model: relevance scores plus the learned vectors.
pub trait EmbeddingModel {
    fn n_users(&self) -> usize;

    fn n_items(&self) -> usize;

    /// Relevance of each of `items` (column positions) for user row `user`.
    fn predict(&self, user: usize, items: &[usize]) -> Vec<f32>;

    fn user_embeddings(&self) -> &Embeddings;

    fn item_embeddings(&self) -> &Embeddings;
}

/// Fits an [`EmbeddingModel`] to a sparse interaction matrix.
///
/// Training blocks until every epoch has run; there is no progress,
/// cancellation or timeout contract.
pub trait EmbeddingTrainer {
    type Model: EmbeddingModel;

    fn fit(&self, interactions: &CsrMatrix, epochs: usize, num_threads: usize)
        -> Result<Self::Model>;
}

/// Training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    /// Weighted approximate-rank pairwise.
    #[default]
    Warp,
    /// Bayesian personalized ranking.
    Bpr,
    /// Pointwise logistic on positives and sampled zeros.
    Logistic,
}

impl FromStr for Loss {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "warp" => Ok(Loss::Warp),
            "bpr" => Ok(Loss::Bpr),
            "logistic" => Ok(Loss::Logistic),
            other => Err(RecError::invalid("loss", other, "expected warp, bpr or logistic")),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Loss::Warp => "warp",
            Loss::Bpr => "bpr",
            Loss::Logistic => "logistic",
        })
    }
}

/// Hyperparameters of [`FactorizationTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Embedding dimensionality.
    pub n_components: usize,
    pub loss: Loss,
    pub learning_rate: f32,
    pub regularization: f32,
    /// WARP: negatives drawn per positive before giving up.
    pub max_sampled: usize,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_components: 30,
            loss: Loss::Warp,
            learning_rate: 0.05,
            regularization: 0.0,
            max_sampled: 10,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_max_sampled(mut self, max_sampled: usize) -> Self {
        self.max_sampled = max_sampled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(RecError::invalid("n_components", 0, "must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RecError::invalid(
                "learning_rate",
                self.learning_rate,
                "must be finite and positive",
            ));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(RecError::invalid(
                "regularization",
                self.regularization,
                "must be finite and non-negative",
            ));
        }
        if self.max_sampled == 0 {
            return Err(RecError::invalid("max_sampled", 0, "must be positive"));
        }
        Ok(())
    }
}

/// Latent factors plus biases; `score(u, i) = <x_u, y_i> + b_u + b_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorizationModel {
    users: Embeddings,
    items: Embeddings,
    user_biases: Vec<f32>,
    item_biases: Vec<f32>,
}

impl FactorizationModel {
    /// Plain dot-product model over precomputed vectors, zero biases.
    pub fn from_embeddings(users: Embeddings, items: Embeddings) -> Result<Self> {
        let (nu, ni) = (users.rows(), items.rows());
        Self::with_biases(users, items, vec![0.0; nu], vec![0.0; ni])
    }

    pub fn with_biases(
        users: Embeddings,
        items: Embeddings,
        user_biases: Vec<f32>,
        item_biases: Vec<f32>,
    ) -> Result<Self> {
        if users.dim() != items.dim() {
            return Err(RecError::DimensionMismatch {
                expected: format!("item dim {}", users.dim()),
                actual: format!("item dim {}", items.dim()),
            });
        }
        if user_biases.len() != users.rows() || item_biases.len() != items.rows() {
            return Err(RecError::DimensionMismatch {
                expected: format!("{} user / {} item biases", users.rows(), items.rows()),
                actual: format!("{} / {}", user_biases.len(), item_biases.len()),
            });
        }
        Ok(Self {
            users,
            items,
            user_biases,
            item_biases,
        })
    }

    pub fn user_biases(&self) -> &[f32] {
        &self.user_biases
    }

    pub fn item_biases(&self) -> &[f32] {
        &self.item_biases
    }
}

impl EmbeddingModel for FactorizationModel {
    fn n_users(&self) -> usize {
        self.users.rows()
    }

    fn n_items(&self) -> usize {
        self.items.rows()
    }

    fn predict(&self, user: usize, items: &[usize]) -> Vec<f32> {
        let xu = self.users.row(user);
        let bu = self.user_biases[user];
        items
            .iter()
            .map(|&i| dot(xu, self.items.row(i)) + bu + self.item_biases[i])
            .collect()
    }

    fn user_embeddings(&self) -> &Embeddings {
        &self.users
    }

    fn item_embeddings(&self) -> &Embeddings {
        &self.items
    }
}

/// SGD matrix factorization, Hogwild!-parallel over a dedicated rayon pool.
#[derive(Debug, Clone, Default)]
pub struct FactorizationTrainer {
    config: TrainerConfig,
}

impl FactorizationTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }
}

impl EmbeddingTrainer for FactorizationTrainer {
    type Model = FactorizationModel;

    fn fit(
        &self,
        interactions: &CsrMatrix,
        epochs: usize,
        num_threads: usize,
    ) -> Result<FactorizationModel> {
        self.config.validate()?;
        if num_threads == 0 {
            return Err(RecError::invalid("num_threads", 0, "must be positive"));
        }
        let samples = training_entries(interactions, self.config.loss);
        if !interactions.data().iter().any(|&v| v > 0.0) {
            return Err(RecError::invalid(
                "interactions",
                format!("{} stored entries", interactions.nnz()),
                "need at least one positive interaction",
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| RecError::invalid("num_threads", num_threads, &e.to_string()))?;

        let (uf, itf, ub, ib) = pool.install(|| train(interactions, &samples, &self.config, epochs, num_threads));

        let k = self.config.n_components;
        FactorizationModel::with_biases(
            Embeddings::from_row_major(uf, interactions.n_rows(), k)?,
            Embeddings::from_row_major(itf, interactions.n_cols(), k)?,
            ub,
            ib,
        )
    }
}

// Pairwise factor step on a (user, positive, negative) triad, reading the old
// values before writing:
// xu += lr * (deriv*(xi-xj) - reg*xu)
// xi += lr * (deriv*xu       - reg*xi)
// xj += lr * (-deriv*xu      - reg*xj)
#[inline(always)]
fn pairwise_update(xu: &mut [f32], xi: &mut [f32], xj: &mut [f32], lr: f32, deriv: f32, reg: f32) {
    let lr_d = lr * deriv;
    let lr_r = lr * reg;
    for f in 0..xu.len() {
        let (u, i, j) = (xu[f], xi[f], xj[f]);
        xu[f] = u + lr_d * (i - j) - lr_r * u;
        xi[f] = i + lr_d * u - lr_r * i;
        xj[f] = j - lr_d * u - lr_r * j;
    }
}

// Pointwise logistic step towards label `y`.
#[inline(always)]
fn pointwise_update(xu: &mut [f32], yi: &mut [f32], bu: &mut f32, bi: &mut f32, y: f32, lr: f32, reg: f32) {
    let pred = sigmoid(dot(xu, yi) + *bu + *bi);
    let err = pred - y;
    for f in 0..xu.len() {
        let (u, i) = (xu[f], yi[f]);
        xu[f] -= lr * (err * i + reg * u);
        yi[f] -= lr * (err * u + reg * i);
    }
    *bu -= lr * (err + reg * *bu);
    *bi -= lr * (err + reg * *bi);
}

// Only positive entries are positives. Stored non-positive entries are
// negatives for the pairwise losses and labelled 0 for logistic.
fn is_positive(csr: &CsrMatrix, u: usize, j: usize) -> bool {
    csr.value(u, j).is_some_and(|v| v > 0.0)
}

// Entries drawn per step: every stored entry for logistic, which reads the
// label off its sign, else only the positive ones.
fn training_entries(csr: &CsrMatrix, loss: Loss) -> Vec<usize> {
    csr.data()
        .iter()
        .enumerate()
        .filter(|&(_, &v)| loss == Loss::Logistic || v > 0.0)
        .map(|(entry, _)| entry)
        .collect()
}

// Logistic draws unobserved cells; the pairwise losses draw any non-positive one.
fn sample_negative(csr: &CsrMatrix, u: usize, loss: Loss, rng: &mut XorShift64) -> Option<usize> {
    for _ in 0..10 {
        let j = rng.next_below(csr.n_cols());
        let taken = match loss {
            Loss::Logistic => csr.has_interaction(u, j),
            Loss::Bpr | Loss::Warp => is_positive(csr, u, j),
        };
        if !taken {
            return Some(j);
        }
    }
    None
}

type Trained = (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>);

fn train(
    csr: &CsrMatrix,
    samples: &[usize],
    config: &TrainerConfig,
    epochs: usize,
    num_threads: usize,
) -> Trained {
    let k = config.n_components;
    let (n_users, n_items) = (csr.n_rows(), csr.n_cols());
    let mut user_factors = random_factors(n_users, k, config.seed);
    let mut item_factors = random_factors(n_items, k, config.seed.wrapping_add(1));
    let mut user_biases = vec![0.0f32; n_users];
    let mut item_biases = vec![0.0f32; n_items];

    let uf_ptr_raw = user_factors.as_mut_ptr() as usize;
    let if_ptr_raw = item_factors.as_mut_ptr() as usize;
    let ub_ptr_raw = user_biases.as_mut_ptr() as usize;
    let ib_ptr_raw = item_biases.as_mut_ptr() as usize;

    let n_samples = samples.len();
    let chunk_size = n_samples.div_ceil(num_threads);
    let (lr, reg) = (config.learning_rate, config.regularization);

    tracing::info!(
        loss = %config.loss,
        users = n_users,
        items = n_items,
        interactions = n_samples,
        factors = k,
        epochs,
        threads = num_threads,
        "training factorization model"
    );
    let start_time = Instant::now();

    for epoch in 0..epochs {
        let epoch_start = Instant::now();

        (0..num_threads).into_par_iter().for_each(|thread_idx| {
            let mut rng = XorShift64::new(
                config
                    .seed
                    .wrapping_add((epoch as u64) << 16)
                    .wrapping_add(thread_idx as u64 * 100),
            );

            let uf_ptr = uf_ptr_raw as *mut f32;
            let if_ptr = if_ptr_raw as *mut f32;
            let ub_ptr = ub_ptr_raw as *mut f32;
            let ib_ptr = ib_ptr_raw as *mut f32;

            for _ in 0..chunk_size {
                let entry = samples[rng.next_below(n_samples)];
                let u = csr.row_of_entry(entry);
                let i = csr.indices()[entry] as usize;

                // Hogwild!: threads race on shared rows without locks. CsrMatrix
                // keeps u < n_users and i < n_items with sorted rows, so the
                // user, positive and negative rows never alias within a step.
                unsafe {
                    let xu = std::slice::from_raw_parts_mut(uf_ptr.add(u * k), k);
                    let xi = std::slice::from_raw_parts_mut(if_ptr.add(i * k), k);
                    let bu = &mut *ub_ptr.add(u);

                    match config.loss {
                        Loss::Logistic => {
                            let bi = &mut *ib_ptr.add(i);
                            let y = if csr.data()[entry] > 0.0 { 1.0 } else { 0.0 };
                            pointwise_update(xu, xi, bu, bi, y, lr, reg);
                            if let Some(j) = sample_negative(csr, u, config.loss, &mut rng) {
                                let xj = std::slice::from_raw_parts_mut(if_ptr.add(j * k), k);
                                let bj = &mut *ib_ptr.add(j);
                                pointwise_update(xu, xj, bu, bj, 0.0, lr, reg);
                            }
                        }
                        Loss::Bpr => {
                            let Some(j) = sample_negative(csr, u, config.loss, &mut rng) else {
                                continue;
                            };
                            let xj = std::slice::from_raw_parts_mut(if_ptr.add(j * k), k);
                            let (bi, bj) = (&mut *ib_ptr.add(i), &mut *ib_ptr.add(j));
                            let diff = (dot(xu, xi) + *bi) - (dot(xu, xj) + *bj);
                            let deriv = 1.0 - sigmoid(diff);
                            pairwise_update(xu, xi, xj, lr, deriv, reg);
                            *bi += lr * (deriv - reg * *bi);
                            *bj += lr * (-deriv - reg * *bj);
                        }
                        Loss::Warp => {
                            let (bi_val, pos) = (*ib_ptr.add(i), dot(xu, xi));
                            let positive = pos + bi_val;
                            for trial in 1..=config.max_sampled {
                                let j = rng.next_below(n_items);
                                if is_positive(csr, u, j) {
                                    continue;
                                }
                                let xj = std::slice::from_raw_parts_mut(if_ptr.add(j * k), k);
                                let negative = dot(xu, xj) + *ib_ptr.add(j);
                                if negative > positive - 1.0 {
                                    let rank = ((n_items - 1) / trial).max(1);
                                    let weight = (rank as f32).ln();
                                    pairwise_update(xu, xi, xj, lr, weight, reg);
                                    let (bi, bj) = (&mut *ib_ptr.add(i), &mut *ib_ptr.add(j));
                                    *bi += lr * (weight - reg * *bi);
                                    *bj += lr * (-weight - reg * *bj);
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });

        tracing::debug!(
            epoch = epoch + 1,
            elapsed_ms = epoch_start.elapsed().as_millis() as u64,
            "epoch done"
        );
    }

    tracing::info!(
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "training finished"
    );

    (user_factors, item_factors, user_biases, item_biases)
}
