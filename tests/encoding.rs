//! Statistical and structural properties of the encoding layer.

use holomem::gram::open_ngrams;
use holomem::timing::{cosine_to_logodds, logodds_to_cosine};
use holomem::{Chunk, Hrr, SymbolSpace};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn random_vectors_are_nearly_orthogonal() {
    // E|cosine| between independent random vectors shrinks with N.
    let mean_abs = |dim: usize, seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let pairs = 40;
        let mut sum = 0.0;
        for _ in 0..pairs {
            let a = Hrr::random(dim, &mut rng);
            let b = Hrr::random(dim, &mut rng);
            sum += a.compare(&b).abs();
        }
        sum / pairs as f64
    };

    let coarse = mean_abs(64, 101);
    let fine = mean_abs(1024, 102);
    assert!(fine < coarse, "mean |cos| did not shrink: {coarse} -> {fine}");
    assert!(fine < 0.1, "mean |cos| at N=1024 too large: {fine}");
}

#[test]
fn binding_round_trips_through_correlation() {
    let mut rng = StdRng::seed_from_u64(103);
    let a = Hrr::random(1024, &mut rng);
    let b = Hrr::random(1024, &mut rng);

    let trace = a.bind(&b);
    let recovered = a.correlate(&trace);
    let similarity = recovered.compare(&b);
    assert!(
        similarity > 0.5,
        "correlation failed to recover bound partner: {similarity}"
    );
}

#[test]
fn symbol_creation_is_idempotent() {
    let mut space = SymbolSpace::new(512, Some(104));
    let first = space.symbol("token").clone();
    let second = space.symbol("token").clone();
    assert_eq!(first, second);
}

#[test]
fn logodds_round_trips_on_the_open_interval() {
    for c in [0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999] {
        let back = logodds_to_cosine(cosine_to_logodds(c));
        assert!((back - c).abs() < 1e-9, "round trip drifted at {c}: {back}");
    }
}

#[test]
fn open_ngrams_of_three_elements_with_pair_and_triple_scales() {
    let grams = open_ngrams(&["A", "B", "C"], 2..=3);
    let expected = [
        vec!["A", "B"],
        vec!["B", "C"],
        vec!["A", "C"], // the one gapped pair
        vec!["A", "B", "C"],
    ];
    assert_eq!(grams.len(), expected.len(), "grams: {grams:?}");
    for gram in &expected {
        assert!(grams.contains(gram), "missing {gram:?}");
    }
}

proptest! {
    #[test]
    fn parser_round_trips_bare_values(tokens in prop::collection::vec("[a-z][a-z0-9]{0,5}", 1..5)) {
        let text = tokens.join(" ");
        let chunk: Chunk = text.parse().unwrap();
        prop_assert_eq!(chunk.to_string(), text.clone());
        prop_assert_eq!(Chunk::parse(&text).unwrap(), chunk);
    }

    #[test]
    fn parser_round_trips_slotted_chunks(
        pairs in prop::collection::vec(("[a-z]{1,4}", "[a-z]{1,4}"), 1..5)
    ) {
        let text = pairs
            .iter()
            .map(|(s, v)| format!("{s}:{v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunk: Chunk = text.parse().unwrap();
        prop_assert!(chunk.is_slotted());
        prop_assert_eq!(chunk.to_string(), text);
    }

    #[test]
    fn open_ngrams_are_ordered_subsequences(
        len in 2usize..6,
        lo in 1usize..3,
        width in 0usize..3,
    ) {
        let seg: Vec<usize> = (0..len).collect();
        let hi = (lo + width).min(len);
        for gram in open_ngrams(&seg, lo..=hi) {
            prop_assert!(gram.len() >= lo && gram.len() <= hi);
            prop_assert!(gram.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(gram.iter().all(|&i| i < len));
        }
    }
}
