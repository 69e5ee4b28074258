use proptest::prelude::*;
use tierscore::{DispersionScorer, Scenario};

fn arb_scores() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..=3.0, 1..12)
}

proptest! {
    #[test]
    fn penalty_factor_is_bounded(scores in arb_scores()) {
        let scorer = DispersionScorer::new();
        let metrics = scorer.compute_metrics(&scores).unwrap();
        let (factor, details) = scorer.compute_adaptive_penalty_factor(&metrics);
        prop_assert!((0.5..=1.0).contains(&factor), "factor {}", factor);
        prop_assert_eq!(factor, details.penalty_factor);
    }

    #[test]
    fn adjusted_score_never_exceeds_weighted(scores in arb_scores()) {
        let (adjusted, details) = DispersionScorer::new()
            .compute_adjusted_score(&scores, None)
            .unwrap();
        prop_assert!(adjusted <= details.weighted_score + 1e-12);
        prop_assert!(adjusted >= 0.5 * details.weighted_score - 1e-12);
    }

    #[test]
    fn coherence_is_a_unit_fraction(scores in arb_scores()) {
        let (_, details) = DispersionScorer::new()
            .compute_adjusted_score(&scores, None)
            .unwrap();
        prop_assert!((0.0..=1.0).contains(&details.coherence));
    }

    #[test]
    fn single_score_is_unpenalized(score in 0.0f64..=3.0) {
        let (adjusted, details) = DispersionScorer::new()
            .compute_adjusted_score(&[score], None)
            .unwrap();
        prop_assert_eq!(details.coherence, 1.0);
        prop_assert_eq!(details.metrics.scenario, Scenario::Convergence);
        prop_assert_eq!(details.penalty_factor, 1.0);
        prop_assert!((adjusted - score).abs() < 1e-12);
    }

    #[test]
    fn identical_scores_are_unpenalized(score in 0.0f64..=3.0, n in 2usize..10) {
        let scores = vec![score; n];
        let (_, details) = DispersionScorer::new()
            .compute_adjusted_score(&scores, None)
            .unwrap();
        prop_assert!(details.metrics.std_dev < 1e-9);
        prop_assert!((details.penalty_factor - 1.0).abs() < 1e-9);
    }
}
