use std::collections::{BTreeMap, BTreeSet};
use tierscore::{
    create_aggregation_contract, AggregationError, AggregationOrchestrator, CapacityBuilder,
    ChoquetEvaluator, Criterion, DispersionScorer, EngineSettings, InvariantId, NodeSpec,
    Provenance, Scenario, Severity, Shape, TierKind, TierPlan,
};

fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_additive_scenario_matches_weighted_sum() {
    let config = CapacityBuilder::new()
        .generate_shapley_proportional(
            &map(&[("@b", 0.4), ("@chain", 0.3), ("@q", 0.3)]),
            &BTreeMap::new(),
            0.0,
        )
        .unwrap();
    let result = ChoquetEvaluator::new(&config)
        .aggregate(&map(&[("@b", 0.8), ("@chain", 0.7), ("@q", 0.9)]))
        .unwrap();

    assert!((result.linear_contribution - 0.80).abs() < 1e-9);
    assert!((result.final_score - 0.80).abs() < 1e-9);
    assert!(result.interaction_breakdown.is_empty());
    assert!(result.constitutional_compliance.compliant);
}

#[test]
fn test_hermeticity_gap_raises_only_when_aborting() {
    let expected = set(&["A", "B", "C"]);
    let actual = owned(&["A", "B"]);

    let mut lenient = create_aggregation_contract("dimension", false).unwrap();
    let diagnosis = lenient.validate_hermeticity(&actual, &expected).unwrap();
    assert_eq!(diagnosis.missing, set(&["C"]));
    assert_eq!(lenient.get_violations().len(), 1);

    let mut strict = create_aggregation_contract("dimension", true).unwrap();
    let err = strict.validate_hermeticity(&actual, &expected).unwrap_err();
    assert!(matches!(err, AggregationError::ContractViolation(_)));
    assert_eq!(strict.get_violations().len(), 1);
}

#[test]
fn test_weight_normalization_severity() {
    let mut validator = create_aggregation_contract("area", false).unwrap();
    assert!(validator.validate_weight_normalization(&[0.5, 0.3, 0.2]).unwrap());
    assert!(!validator.validate_weight_normalization(&[0.5, 0.3, 0.3]).unwrap());

    let violations = validator.get_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].invariant_id, InvariantId::WeightNormalization);
    assert_eq!(violations[0].severity, Severity::Critical);
    assert!(validator.has_critical());
}

#[test]
fn test_unknown_tier_level() {
    let err = create_aggregation_contract("region", true).unwrap_err();
    assert!(matches!(err, AggregationError::UnknownTierLevel(_)));
}

#[test]
fn test_converged_scores_are_unpenalized() {
    let (adjusted, details) = DispersionScorer::new()
        .compute_adjusted_score(&[2.0, 2.0, 2.0], None)
        .unwrap();
    assert!((details.penalty_factor - 1.0).abs() < 1e-9);
    assert_eq!(details.metrics.scenario, Scenario::Convergence);
    assert!((adjusted - details.weighted_score).abs() < 1e-9);
}

#[test]
fn test_polarized_scores_are_penalized_harder() {
    let scorer = DispersionScorer::new();
    let (_, polarized) = scorer
        .compute_adjusted_score(&[0.1, 2.9, 0.1, 2.9], None)
        .unwrap();
    let (_, tight) = scorer
        .compute_adjusted_score(&[1.4, 1.6, 1.5, 1.5], None)
        .unwrap();

    assert!(
        polarized.metrics.scenario == Scenario::ExtremeDispersion
            || polarized.metrics.shape == Shape::Bimodal
    );
    assert!((polarized.weighted_score - tight.weighted_score).abs() < 1e-9);
    assert!(polarized.penalty_factor < tight.penalty_factor);
}

#[test]
fn test_full_hierarchy() {
    let plan = TierPlan::new(
        EngineSettings::default(),
        vec![
            NodeSpec::new("DIM-01", TierKind::Dimension, ["Q1", "Q2", "Q3"])
                .with_weights([("Q1", 2.0), ("Q2", 1.0), ("Q3", 1.0)])
                .with_interaction_strength(0.3),
            NodeSpec::new("DIM-02", TierKind::Dimension, ["Q4", "Q5"]),
            NodeSpec::new("AREA-01", TierKind::Area, ["DIM-01", "DIM-02"]),
            NodeSpec::new("CL-01", TierKind::Cluster, ["AREA-01", "AREA-02"]),
            NodeSpec::new("MACRO", TierKind::Macro, ["CL-01", "CL-02", "CL-03", "CL-04"]),
        ],
    );
    let orchestrator = AggregationOrchestrator::new(plan).unwrap();

    let dims = orchestrator.aggregate_batch(&[
        (
            "DIM-01".to_string(),
            vec![
                Criterion::new("Q1", 2.5),
                Criterion::new("Q2", 2.0),
                Criterion::new("Q3", 1.5),
            ],
        ),
        (
            "DIM-02".to_string(),
            vec![Criterion::new("Q4", 2.8), Criterion::new("Q5", 2.6)],
        ),
    ]);
    let dims: Vec<Criterion> = dims
        .into_iter()
        .map(|r| r.unwrap().as_criterion())
        .collect();
    assert_eq!(dims[0].id, "DIM-01");
    assert!(dims[0].score >= 1.5 && dims[0].score <= 2.5);

    let area = orchestrator.aggregate_node("AREA-01", &dims).unwrap();
    assert!(area.is_clean());

    let cluster = orchestrator
        .aggregate_node("CL-01", &[area.as_criterion(), Criterion::new("AREA-02", 2.2)])
        .unwrap();
    assert!(matches!(cluster.provenance, Provenance::Dispersion(_)));

    let macro_children = vec![
        cluster.as_criterion(),
        Criterion::new("CL-02", 2.0),
        Criterion::new("CL-03", 1.8),
        Criterion::new("CL-04", 2.4),
    ];
    let top = orchestrator.aggregate_node("MACRO", &macro_children).unwrap();

    let min = macro_children.iter().map(|c| c.score).fold(f64::INFINITY, f64::min);
    let max = macro_children.iter().map(|c| c.score).fold(f64::NEG_INFINITY, f64::max);
    assert!(top.score() >= min - 1e-9 && top.score() <= max + 1e-9);
    assert!(top.is_clean());
    assert!(top.node.hermeticity.cardinality.is_none());
}

#[test]
fn test_macro_requires_four_children() {
    let plan = TierPlan::new(
        EngineSettings::default(),
        vec![NodeSpec::new("MACRO", TierKind::Macro, ["CL-01", "CL-02", "CL-03"])],
    );
    let err = AggregationOrchestrator::new(plan).unwrap_err();
    assert!(matches!(err, AggregationError::InvalidInput(_)));

    let plan = TierPlan::new(
        EngineSettings::default(),
        vec![NodeSpec::new("MACRO", TierKind::Macro, ["CL-01", "CL-02", "CL-03", "CL-04"])],
    );
    let orchestrator = AggregationOrchestrator::new(plan).unwrap();
    let err = orchestrator
        .aggregate_node(
            "MACRO",
            &[
                Criterion::new("CL-01", 2.0),
                Criterion::new("CL-02", 2.0),
                Criterion::new("CL-03", 2.0),
            ],
        )
        .unwrap_err();
    match err {
        AggregationError::ContractViolation(v) => {
            assert_eq!(v.invariant_id, InvariantId::Hermeticity);
            assert_eq!(v.severity, Severity::Critical);
        }
        other => panic!("expected hermeticity violation, got {:?}", other),
    }
}

#[test]
fn test_out_of_range_children_are_fatal_on_every_tier() {
    let plan = TierPlan::new(
        EngineSettings::default(),
        vec![
            NodeSpec::new("DIM-01", TierKind::Dimension, ["a", "b"]),
            NodeSpec::new("AREA-01", TierKind::Area, ["a", "b"]),
            NodeSpec::new("CL-01", TierKind::Cluster, ["a", "b"]),
            NodeSpec::new("MACRO", TierKind::Macro, ["a", "b", "c", "d"]),
        ],
    );
    let orchestrator = AggregationOrchestrator::new(plan).unwrap();

    for node_id in orchestrator.node_ids() {
        let ids = &orchestrator.node_spec(node_id).unwrap().expected_children;
        let children: Vec<Criterion> = ids
            .iter()
            .map(|id| Criterion::new(id.clone(), 4.5))
            .collect();
        match orchestrator.aggregate_node(node_id, &children) {
            Err(AggregationError::ContractViolation(v)) => {
                assert_eq!(v.invariant_id, InvariantId::ScoreBounds, "node {}", node_id);
            }
            other => panic!("node {}: expected score bounds violation, got {:?}", node_id, other),
        }
    }
}
