use embedrec::display::{write_similar_items, write_user_recommendations};
use embedrec::table::{read_interactions, read_item_names};
use embedrec::{
    EmbeddingModel, FactorizationTrainer, InteractionMatrix, Loss, MatrixOptions, RecError,
    RecommendOptions, Recommender, TrainerConfig,
};

const RATINGS: &str = "\
userId,movieId,rating
1,10,5.0
1,20,1.0
2,10,2.0
2,30,4.5
3,20,4.0
3,30,3.5
3,40,5.0
4,10,4.0
4,40,2.0
";

const MOVIES: &str = "\
movieId,title
10,Heat (1995)
20,Ronin (1998)
30,Thief (1981)
40,Collateral (2004)
";

fn trainer(loss: Loss) -> FactorizationTrainer {
    FactorizationTrainer::new(
        TrainerConfig::default()
            .with_components(8)
            .with_loss(loss)
            .with_seed(11),
    )
}

#[test]
fn csv_to_recommendations_end_to_end() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let rows: Vec<(u32, u32, f32)> =
        read_interactions(RATINGS.as_bytes(), "userId", "movieId", "rating").unwrap();
    let names = read_item_names(MOVIES.as_bytes(), "movieId", "title").unwrap();
    let matrix = InteractionMatrix::from_ratings(rows, &MatrixOptions::raw()).unwrap();
    assert_eq!(matrix.shape(), (4, 4));

    let rec = Recommender::fit(
        matrix,
        &MatrixOptions::normalized(3.0),
        &trainer(Loss::Warp),
        20,
        2,
    )
    .unwrap();
    assert_eq!(rec.model().n_users(), 4);
    assert_eq!(rec.model().item_embeddings().rows(), 4);

    let picks = rec
        .recommend_names(&3, &names, &RecommendOptions::new(3.0, 10))
        .unwrap();
    // user 3 rated 20, 30 and 40 above 3; known is ordered by descending id
    assert_eq!(picks.known, vec!["Collateral (2004)", "Thief (1981)", "Ronin (1998)"]);
    assert_eq!(picks.recommended, vec!["Heat (1995)"]);

    let mut out = Vec::new();
    write_user_recommendations(&mut out, &picks, true, true).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Known Likes:\n1- Collateral (2004)\n"));
    assert!(text.ends_with("\n Recommended Items:\n1- Heat (1995)\n"));

    let sim = rec.item_similarity().unwrap();
    let similar = sim.similar_item_names(&10, &names, 2).unwrap();
    assert_eq!(similar.query, "Heat (1995)");
    assert_eq!(similar.similar.len(), 2);
    assert!(!similar.similar.contains(&"Heat (1995)".to_string()));

    let mut out = Vec::new();
    write_similar_items(&mut out, &similar).unwrap();
    assert!(String::from_utf8(out).unwrap().starts_with("Item of interest: Heat (1995)\nSimilar items:\n1- "));
}

#[test]
fn known_item_is_excluded_whatever_the_model_learns() {
    let events = vec![("u1", "i1", 5.0), ("u1", "i2", 1.0), ("u2", "i1", 2.0)];
    for loss in [Loss::Warp, Loss::Bpr, Loss::Logistic] {
        let matrix = InteractionMatrix::from_ratings(events.clone(), &MatrixOptions::raw()).unwrap();
        let rec = Recommender::fit(matrix, &MatrixOptions::raw(), &trainer(loss), 30, 1).unwrap();

        let out = rec.recommend(&"u1", &RecommendOptions::new(3.0, 10)).unwrap();
        assert_eq!(out.known, vec!["i1"]);
        let ids: Vec<&str> = out.recommended.iter().map(|s| s.item).collect();
        assert_eq!(ids, vec!["i2"], "{loss}");
    }
}

#[test]
fn exclusion_uses_raw_values_even_when_training_was_binarized() {
    let events = vec![(1, 'a', 2.0), (1, 'b', 4.0), (2, 'a', 5.0), (2, 'c', 1.0)];
    let matrix = InteractionMatrix::from_ratings(events, &MatrixOptions::raw()).unwrap();
    let rec = Recommender::fit(
        matrix,
        &MatrixOptions::normalized(3.0),
        &trainer(Loss::Bpr),
        10,
        1,
    )
    .unwrap();

    // 'a' was binarized to 0 for user 1 during training but its raw value 2.0
    // still exceeds a known threshold of 1.5.
    let out = rec.recommend(&1, &RecommendOptions::new(1.5, 10)).unwrap();
    assert_eq!(out.known, vec!['b', 'a']);
    assert_eq!(out.recommended.len(), 1);
    assert_eq!(out.recommended[0].item, 'c');
    assert_eq!(rec.interactions().value(&1, &'a'), Some(2.0));
}

#[test]
fn lookups_surface_missing_keys() {
    let matrix =
        InteractionMatrix::from_ratings(vec![(1u32, 10u32, 4.0)], &MatrixOptions::raw()).unwrap();
    let rec = Recommender::fit(matrix, &MatrixOptions::raw(), &trainer(Loss::Warp), 1, 1).unwrap();
    let names = read_item_names::<_, u32>(MOVIES.as_bytes(), "movieId", "title").unwrap();

    let err = rec
        .recommend_names(&7, &names, &RecommendOptions::default())
        .unwrap_err();
    assert!(matches!(err, RecError::UnknownUser(_)));

    let sim = rec.item_similarity().unwrap();
    assert!(matches!(sim.most_similar(&99, 3), Err(RecError::UnknownItem(_))));
    assert!(sim.most_similar(&10, 3).unwrap().is_empty());
}
