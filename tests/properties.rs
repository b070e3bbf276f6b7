use std::collections::HashMap;

use embedrec::{
    Embeddings, FactorizationModel, InteractionMatrix, ItemSimilarity, MatrixOptions,
    RecError, RecommendOptions, Recommender,
};
use proptest::prelude::*;

fn events() -> impl Strategy<Value = Vec<(u8, u8, f32)>> {
    prop::collection::vec((0u8..6, 0u8..8, (0u8..10).prop_map(f32::from)), 1..40)
}

fn matrix_and_model() -> impl Strategy<Value = (InteractionMatrix<u8, u8>, FactorizationModel)> {
    events().prop_flat_map(|rows| {
        let m = InteractionMatrix::from_ratings(rows, &MatrixOptions::raw()).unwrap();
        let (nu, ni) = m.shape();
        (
            Just(m),
            prop::collection::vec(-1.0f32..1.0, nu * 2),
            prop::collection::vec(-1.0f32..1.0, ni * 2),
        )
            .prop_map(move |(m, u, i)| {
                let model = FactorizationModel::from_embeddings(
                    Embeddings::from_row_major(u, nu, 2).unwrap(),
                    Embeddings::from_row_major(i, ni, 2).unwrap(),
                )
                .unwrap();
                (m, model)
            })
    })
}

proptest! {
    #[test]
    fn every_cell_is_the_sum_for_its_pair(rows in events()) {
        let m = InteractionMatrix::from_ratings(rows.clone(), &MatrixOptions::raw()).unwrap();

        let mut expected: HashMap<(u8, u8), f32> = HashMap::new();
        for &(u, i, r) in &rows {
            *expected.entry((u, i)).or_insert(0.0) += r;
        }
        let mut users: Vec<u8> = rows.iter().map(|r| r.0).collect();
        users.sort_unstable();
        users.dedup();
        let mut items: Vec<u8> = rows.iter().map(|r| r.1).collect();
        items.sort_unstable();
        items.dedup();

        prop_assert_eq!(m.users(), &users[..]);
        prop_assert_eq!(m.items(), &items[..]);
        for (row, u) in users.iter().enumerate() {
            for (col, i) in items.iter().enumerate() {
                let want = expected.get(&(*u, *i)).copied().unwrap_or(0.0);
                prop_assert_eq!(m.get(row, col), want);
            }
        }
    }

    #[test]
    fn normalization_is_idempotent(rows in events(), t in 0u8..10) {
        let t = f32::from(t);
        let once = InteractionMatrix::from_ratings(rows, &MatrixOptions::normalized(t)).unwrap();
        prop_assert_eq!(once.normalized(t), once.clone());
        prop_assert!(once.values().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn normalization_without_threshold_always_fails(rows in events()) {
        let opts = MatrixOptions { normalize: true, threshold: None };
        let result = InteractionMatrix::from_ratings(rows, &opts);
        prop_assert!(matches!(result, Err(RecError::MissingThreshold)));
    }

    #[test]
    fn recommendations_skip_known_items_and_have_expected_length(
        (m, model) in matrix_and_model(),
        threshold in 0u8..10,
        n in 0usize..12,
    ) {
        let threshold = f32::from(threshold);
        let users = m.users().to_vec();
        let n_items = m.n_items();
        let rec = Recommender::new(m, model).unwrap();

        for user in &users {
            let out = rec.recommend(user, &RecommendOptions::new(threshold, n)).unwrap();
            for scored in &out.recommended {
                prop_assert!(!out.known.contains(&scored.item));
                let raw = rec.interactions().value(user, &scored.item).unwrap();
                prop_assert!(raw <= threshold);
            }
            prop_assert_eq!(out.recommended.len(), n.min(n_items - out.known.len()));
            prop_assert!(out.known.windows(2).all(|w| w[0] > w[1]));
            prop_assert!(out.recommended.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn similarity_has_unit_diagonal_and_excludes_query(
        (m, model) in matrix_and_model(),
        n in 0usize..12,
    ) {
        let rec = Recommender::new(m, model).unwrap();
        let sim: ItemSimilarity<u8> = rec.item_similarity().unwrap();
        for item in sim.items() {
            prop_assert_eq!(sim.get(item, item).unwrap(), 1.0);
            let neighbours = sim.most_similar(item, n).unwrap();
            prop_assert!(neighbours.iter().all(|(id, _)| id != item));
            prop_assert_eq!(neighbours.len(), n.min(sim.len() - 1));
        }
    }
}
