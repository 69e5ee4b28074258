use proptest::prelude::*;
use std::collections::BTreeMap;
use tierscore::{
    AggregationOrchestrator, CapacityBuilder, ChoquetEvaluator, Criterion, EngineSettings,
    FuzzyMeasureConfig, InvariantId, NodeSpec, TierKind, TierPlan,
};

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("c{}", i)).collect()
}

fn arb_weights(max: usize) -> impl Strategy<Value = BTreeMap<String, f64>> {
    prop::collection::vec(0.05f64..10.0, 1..=max)
        .prop_map(|ws| ids(ws.len()).into_iter().zip(ws).collect())
}

/// Capacity plus one unit-scale score per criterion.
fn arb_capacity_and_scores(max: usize) -> impl Strategy<Value = (FuzzyMeasureConfig, Vec<f64>)> {
    (arb_weights(max), 0.0f64..=1.0).prop_flat_map(|(weights, strength)| {
        let n = weights.len();
        let config = CapacityBuilder::new()
            .generate_shapley_proportional(&weights, &BTreeMap::new(), strength)
            .unwrap();
        (Just(config), prop::collection::vec(0.0f64..=1.0, n))
    })
}

fn score_map(config: &FuzzyMeasureConfig, scores: &[f64]) -> BTreeMap<String, f64> {
    config.criteria().iter().cloned().zip(scores.iter().copied()).collect()
}

// ── Capacity construction ────────────────────────────────────────────────

proptest! {
    #[test]
    fn generated_capacity_is_valid(weights in arb_weights(8), strength in 0.0f64..=1.0) {
        let config = CapacityBuilder::new()
            .generate_shapley_proportional(&weights, &BTreeMap::new(), strength)
            .unwrap();
        prop_assert!(config.is_valid(), "invalid capacity: {:?}", config.validate());
        prop_assert_eq!(config.capacity(config.grand_coalition()), 1.0);
    }

    #[test]
    fn shapley_values_sum_to_one(weights in arb_weights(8), strength in 0.0f64..=1.0) {
        let config = CapacityBuilder::new()
            .generate_shapley_proportional(&weights, &BTreeMap::new(), strength)
            .unwrap();
        let total: f64 = config.shapley_vector().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "shapley sum {}", total);
    }

    #[test]
    fn mobius_rebuilds_capacity((config, _) in arb_capacity_and_scores(6)) {
        for (coalition, value) in config.fuzzy_measure() {
            let rebuilt: f64 = coalition.subsets().map(|b| config.mobius(b)).sum();
            prop_assert!((rebuilt - value).abs() < 1e-9);
        }
    }
}

// ── Choquet integral ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn choquet_stays_within_input_range((config, scores) in arb_capacity_and_scores(6)) {
        let result = ChoquetEvaluator::new(&config)
            .aggregate(&score_map(&config, &scores))
            .unwrap();
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(result.final_score >= min - 1e-9, "{} < {}", result.final_score, min);
        prop_assert!(result.final_score <= max + 1e-9, "{} > {}", result.final_score, max);
    }

    #[test]
    fn choquet_is_idempotent((config, _) in arb_capacity_and_scores(6), c in 0.0f64..=1.0) {
        let scores = vec![c; config.len()];
        let result = ChoquetEvaluator::new(&config)
            .aggregate(&score_map(&config, &scores))
            .unwrap();
        prop_assert!((result.final_score - c).abs() < 1e-9);
    }

    #[test]
    fn raising_a_score_never_lowers_the_result(
        (config, scores) in arb_capacity_and_scores(6),
        pick in any::<prop::sample::Index>(),
        bump in 0.0f64..=1.0,
    ) {
        let evaluator = ChoquetEvaluator::new(&config);
        let before = evaluator.aggregate(&score_map(&config, &scores)).unwrap();

        let mut raised = scores.clone();
        let i = pick.index(raised.len());
        raised[i] = (raised[i] + bump).min(1.0);
        let after = evaluator.aggregate(&score_map(&config, &raised)).unwrap();

        prop_assert!(
            after.final_score >= before.final_score - 1e-9,
            "raising criterion {} lowered {} to {}",
            i, before.final_score, after.final_score
        );
    }
}

// ── Orchestrated dimension nodes ─────────────────────────────────────────

proptest! {
    #[test]
    fn dimension_nodes_never_breach_convexity(
        weights in arb_weights(6),
        strength in 0.0f64..=1.0,
        raw in prop::collection::vec(0.0f64..=3.0, 6),
    ) {
        let children: Vec<String> = weights.keys().cloned().collect();
        let spec = NodeSpec::new("D1", TierKind::Dimension, children.clone())
            .with_weights(weights.clone())
            .with_interaction_strength(strength);
        let orchestrator =
            AggregationOrchestrator::new(TierPlan::new(EngineSettings::default(), vec![spec]))
                .unwrap();

        let criteria: Vec<Criterion> = children
            .iter()
            .zip(&raw)
            .map(|(id, s)| Criterion::new(id.clone(), *s))
            .collect();
        let result = orchestrator.aggregate_node("D1", &criteria).unwrap();

        prop_assert!(result.score() >= 0.0 && result.score() <= 3.0);
        prop_assert!(result
            .violations
            .iter()
            .all(|v| v.invariant_id != InvariantId::Convexity));
    }
}
