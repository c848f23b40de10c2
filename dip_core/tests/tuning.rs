// dip_core/tests/tuning.rs

use dip_core::prelude::*;
use proptest::prelude::*;

fn factory() -> ControllerFactory {
    ControllerFactory::new(
        ControllerRegistry::standard(),
        DoubleInvertedPendulum::new(PhysicsParams::default()).unwrap(),
    )
}

fn evaluator(kind: ControllerKind, duration: f64, suite: &ScenarioSuite) -> FitnessEvaluator {
    let runner = SimulationRunner::new(SimulationConfig {
        duration,
        ..Default::default()
    })
    .unwrap();
    FitnessEvaluator::new(
        factory(),
        runner,
        ControllerConfig::default_for(kind),
        FitnessConfig::default(),
        suite,
    )
    .unwrap()
}

fn small_swarm(parallel: bool) -> PsoConfig {
    PsoConfig {
        swarm_size: 6,
        iterations: 4,
        seed: 2024,
        parallel,
        ..Default::default()
    }
}

#[test]
fn pso_runs_are_reproducible() {
    let eval = evaluator(ControllerKind::ClassicalSmc, 1.5, &ScenarioSuite::nominal());
    let bounds = PsoBounds::from_descriptor(eval.descriptor());

    let first = PsoOptimizer::new(small_swarm(true)).unwrap().optimize(&eval, &bounds).unwrap();
    let second = PsoOptimizer::new(small_swarm(true)).unwrap().optimize(&eval, &bounds).unwrap();
    let sequential = PsoOptimizer::new(small_swarm(false)).unwrap().optimize(&eval, &bounds).unwrap();

    assert_eq!(first.best_position, second.best_position);
    assert_eq!(first.cost_history(), second.cost_history());
    assert_eq!(first, sequential);

    assert_eq!(first.history.len(), 4);
    assert_eq!(first.evaluations, 24);
    for (x, (lo, hi)) in first.best_position.iter().zip(bounds.lower.iter().zip(&bounds.upper)) {
        assert!(lo <= x && x <= hi);
    }
    // Noise-free suite: the cost does not depend on the stream.
    assert_eq!(first.best_cost, eval.evaluate(&first.best_position));
}

#[test]
fn optimized_gains_do_not_lose_to_the_initial_swarm() {
    let eval = evaluator(ControllerKind::StaSmc, 1.5, &ScenarioSuite::nominal());
    let bounds = PsoBounds::from_descriptor(eval.descriptor());
    let result = PsoOptimizer::new(small_swarm(true)).unwrap().optimize(&eval, &bounds).unwrap();
    let history = result.cost_history();
    assert!(history.last().unwrap() <= history.first().unwrap());
    assert!(result.best_cost.is_finite());
}

#[test]
fn diverging_scenarios_cost_more_than_completed_ones() {
    let gains = ControllerRegistry::standard()
        .descriptor(ControllerKind::ClassicalSmc)
        .default_gains
        .to_vec();
    let calm = evaluator(
        ControllerKind::ClassicalSmc,
        2.0,
        &ScenarioSuite::new(vec![Scenario::from_angles("calm", 0.05, 0.05)]).unwrap(),
    );
    let folded = evaluator(
        ControllerKind::ClassicalSmc,
        2.0,
        &ScenarioSuite::new(vec![Scenario::from_angles("folded", 1.4, -1.4)]).unwrap(),
    );
    let penalty = FitnessConfig::default().instability_penalty;

    let calm_report = calm.report(&gains, 0).unwrap();
    let folded_report = folded.report(&gains, 0).unwrap();
    assert!(calm_report.scenarios[0].status.is_completed());
    assert!(!folded_report.scenarios[0].status.is_completed());
    assert!(calm_report.total < penalty);
    assert!(folded_report.total > penalty);
}

#[test]
fn worst_case_term_separates_uneven_gains() {
    let suite = ScenarioSuite::new(vec![
        Scenario::from_angles("calm", 0.05, 0.05).with_weight(3.0),
        Scenario::from_angles("folded", 1.4, -1.4),
    ])
    .unwrap();
    let runner = SimulationRunner::new(SimulationConfig {
        duration: 2.0,
        ..Default::default()
    })
    .unwrap();
    let gains = [2.0, 2.5, 3.0, 5.0, 35.0, 5.0];
    let plain = FitnessEvaluator::new(
        factory(),
        runner.clone(),
        ControllerConfig::default_for(ControllerKind::ClassicalSmc),
        FitnessConfig::default(),
        &suite,
    )
    .unwrap();
    let guarded = FitnessEvaluator::new(
        factory(),
        runner,
        ControllerConfig::default_for(ControllerKind::ClassicalSmc),
        FitnessConfig {
            worst_case_weight: 1.0,
            ..Default::default()
        },
        &suite,
    )
    .unwrap();

    let report = plain.report(&gains, 0).unwrap();
    let worst = report
        .scenarios
        .iter()
        .map(|s| s.cost)
        .fold(f64::NEG_INFINITY, f64::max);
    approx::assert_relative_eq!(guarded.evaluate(&gains), plain.evaluate(&gains) + worst);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn factory_rejects_non_positive_required_gains(
        kind_index in 0usize..4,
        slot in 0usize..6,
        bad in prop_oneof![Just(0.0), -100.0..-1e-9f64, Just(f64::NAN), Just(f64::INFINITY)],
    ) {
        let kind = ControllerKind::ALL[kind_index];
        let factory = factory();
        let descriptor = *factory.descriptor(kind);
        let slot = slot % descriptor.gain_count();
        let mut gains = descriptor.default_gains.to_vec();
        gains[slot] = bad;

        let result = factory.create(kind, &gains, &ControllerConfig::default_for(kind));
        let zero_ok = descriptor.zero_allowed[slot];
        if zero_ok && bad == 0.0 {
            prop_assert!(result.is_ok());
        } else {
            match result {
                Err(ConfigurationError::NonPositiveGain { index, .. })
                | Err(ConfigurationError::InvalidGain { index, .. }) => prop_assert_eq!(index, slot),
                other => prop_assert!(false, "unexpected {:?}", other.map(|c| c.kind())),
            }
        }
    }

    #[test]
    fn factory_accepts_positive_gains_or_reports_a_singular_surface(
        kind_index in 0usize..4,
        raw in proptest::collection::vec(0.1..50.0f64, 6),
    ) {
        let kind = ControllerKind::ALL[kind_index];
        let factory = factory();
        let n = factory.descriptor(kind).gain_count();
        let result = factory.create(kind, &raw[..n], &ControllerConfig::default_for(kind));
        match result {
            Ok(controller) => prop_assert_eq!(controller.gains(), &raw[..n]),
            Err(ConfigurationError::SingularSurface { .. }) => {}
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    #[test]
    fn wrong_gain_count_is_reported(kind_index in 0usize..4, len in 0usize..10) {
        let kind = ControllerKind::ALL[kind_index];
        let factory = factory();
        let expected = factory.descriptor(kind).gain_count();
        prop_assume!(len != expected);
        let gains = vec![1.0; len];
        let err = factory.create(kind, &gains, &ControllerConfig::default_for(kind));
        prop_assert!(
            matches!(
                err,
                Err(ConfigurationError::GainCount { expected: e, actual, .. }) if e == expected && actual == len
            ),
            "unexpected result"
        );
    }
}
