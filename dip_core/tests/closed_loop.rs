// dip_core/tests/closed_loop.rs

use dip_core::prelude::*;
use dip_core::error::ConfigurationError;
use dip_core::simulation::{settling_time, DivergenceReason};
use dip_core::types::perturbed_upright;

fn setup() -> (DoubleInvertedPendulum, ControllerFactory, SimulationRunner) {
    let plant = DoubleInvertedPendulum::new(PhysicsParams::default()).unwrap();
    let factory = ControllerFactory::new(ControllerRegistry::standard(), plant);
    let runner = SimulationRunner::new(SimulationConfig::default()).unwrap();
    (plant, factory, runner)
}

#[test]
fn classical_defaults_stabilize_a_small_lean() {
    let (plant, factory, runner) = setup();
    let controller = factory.create_default(ControllerKind::ClassicalSmc).unwrap();
    let result = runner.run(&plant, controller.as_ref(), &perturbed_upright(0.05, 0.05));

    assert_eq!(result.status, SimulationStatus::Completed);
    assert_eq!(result.trajectory.len(), 1000);
    let metrics = compute_metrics(&result.trajectory, controller.max_force(), 0.01);
    let settle = metrics.settling_time.expect("angles should settle");
    assert!(settle < 3.0, "settling time {settle}");
    assert!(metrics.final_angle_error < 0.01);
    assert!(metrics.saturation_fraction < 0.01);
}

#[test]
fn every_variant_settles_from_nominal_and_opposed_leans() {
    let (plant, factory, runner) = setup();
    for kind in ControllerKind::ALL {
        let controller = factory.create_default(kind).unwrap();
        for x0 in [perturbed_upright(0.05, 0.05), perturbed_upright(0.1, -0.1)] {
            let result = runner.run(&plant, controller.as_ref(), &x0);
            assert!(result.status.is_completed(), "{kind} from {x0:?}: {:?}", result.status);
            let settle = settling_time(&result.trajectory, 0.01);
            assert!(matches!(settle, Some(t) if t < 3.0), "{kind}: {settle:?}");
        }
    }
}

#[test]
fn default_gains_are_insufficient_for_a_large_lean() {
    let (plant, factory, runner) = setup();
    let controller = factory.create_default(ControllerKind::ClassicalSmc).unwrap();
    let fitness = FitnessConfig::default();

    let small = runner.run(&plant, controller.as_ref(), &perturbed_upright(0.05, 0.05));
    let large = runner.run(&plant, controller.as_ref(), &perturbed_upright(0.3, 0.3));

    let small_cost = fitness.scenario_cost(&small);
    let large_cost = fitness.scenario_cost(&large);
    assert!(
        large_cost >= 10.0 * small_cost,
        "large {large_cost} vs small {small_cost}"
    );
    if large.status.is_completed() {
        let settle = settling_time(&large.trajectory, 0.01);
        assert!(settle.map_or(true, |t| t > 3.0), "{settle:?}");
    }
}

#[test]
fn batch_lanes_match_scalar_runs_exactly() {
    let (plant, factory, runner) = setup();
    let controllers: Vec<Box<dyn Controller>> = ControllerKind::ALL
        .iter()
        .map(|&kind| factory.create_default(kind).unwrap())
        .collect();
    let initial = [
        perturbed_upright(0.05, 0.05),
        perturbed_upright(0.1, -0.1),
        // Fails within a few steps while the other lanes keep running.
        perturbed_upright(1.4, -1.4),
        perturbed_upright(0.3, 0.3),
    ];

    let batch = runner.run_batch(&plant, &controllers, &initial).unwrap();
    let many = runner.run_many(&plant, &controllers, &initial).unwrap();
    assert_eq!(batch.len(), 4);
    for (j, (controller, x0)) in controllers.iter().zip(&initial).enumerate() {
        let scalar = runner.run(&plant, controller.as_ref(), x0);
        assert_eq!(batch[j], scalar, "lane {j}");
        assert_eq!(many[j], scalar, "lane {j}");
    }
    assert!(!batch[2].status.is_completed());
}

#[test]
fn batches_need_one_initial_state_per_controller() {
    let (plant, factory, runner) = setup();
    let controllers: Vec<Box<dyn Controller>> = ControllerKind::ALL
        .iter()
        .map(|&kind| factory.create_default(kind).unwrap())
        .collect();
    let initial = [perturbed_upright(0.05, 0.05); 3];

    let expected = ConfigurationError::LengthMismatch {
        what: "initial states",
        expected: 4,
        actual: 3,
    };
    assert_eq!(runner.run_batch(&plant, &controllers, &initial).unwrap_err(), expected);
    assert_eq!(runner.run_many(&plant, &controllers, &initial).unwrap_err(), expected);
}

#[test]
fn aggressive_classical_gains_diverge_on_the_discrete_loop() {
    let (plant, factory, runner) = setup();
    let gains = [20.0, 15.0, 12.0, 8.0, 35.0, 5.0];
    let x0 = perturbed_upright(0.05, 0.05);
    for switching in [SwitchingMethod::Sign, SwitchingMethod::Tanh, SwitchingMethod::Saturation] {
        for boundary_layer in [0.05, 0.2, 0.5] {
            let config = ControllerConfig::ClassicalSmc(ClassicalConfig {
                boundary_layer,
                switching,
                ..Default::default()
            });
            let controller = factory.create(ControllerKind::ClassicalSmc, &gains, &config).unwrap();
            let result = runner.run(&plant, controller.as_ref(), &x0);
            match result.status {
                SimulationStatus::Diverged {
                    step,
                    reason: DivergenceReason::AngleLimit,
                } => assert!(step < 100, "{switching:?}/{boundary_layer}: step {step}"),
                other => panic!("{switching:?}/{boundary_layer}: {other:?}"),
            }
        }
    }
}

#[test]
fn every_variant_holds_its_command_on_a_non_finite_state() {
    let (_, factory, _) = setup();
    for kind in ControllerKind::ALL {
        let controller = factory.create_default(kind).unwrap();
        let warm = controller.compute_control(&perturbed_upright(0.05, 0.05), 0.0, &controller.reset());
        let history = warm.state;

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut x = perturbed_upright(0.05, 0.05);
            x[3] = bad;
            let out = controller.compute_control(&x, warm.force, &history);
            assert_eq!(out.force, warm.force, "{kind}");
            assert_eq!(out.state, history, "{kind}");
            assert!(out.diagnostics.held);
        }

        let out = controller.compute_control(&State::repeat(f64::NAN), f64::NAN, &history);
        assert_eq!(out.force, 0.0, "{kind}");
    }
}

#[test]
fn disturbances_reach_the_plant_but_not_the_controller() {
    let (plant, factory, runner) = setup();
    let controller = factory.create_default(ControllerKind::ClassicalSmc).unwrap();
    let x0 = perturbed_upright(0.05, 0.05);
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(0);
    let pushed = runner.run_with(
        &plant,
        controller.as_ref(),
        &x0,
        &Disturbance::Step {
            magnitude: 5.0,
            start: 2.0,
        },
        None,
        &mut rng,
    );
    let calm = runner.run(&plant, controller.as_ref(), &x0);
    assert!(pushed.status.is_completed());

    // Identical up to the push, different after it.
    assert_eq!(pushed.trajectory.states[..=200], calm.trajectory.states[..=200]);
    assert_ne!(pushed.trajectory.final_state, calm.trajectory.final_state);
}

#[test]
fn mismatched_plants_are_still_stabilized() {
    let (_, factory, runner) = setup();
    let controller = factory.create_default(ControllerKind::ClassicalSmc).unwrap();
    for factor in [0.8, 1.2] {
        let plant =
            DoubleInvertedPendulum::new(PhysicsParams::default().scaled(&ParameterScaling::uniform(factor)))
                .unwrap();
        let result = runner.run(&plant, controller.as_ref(), &perturbed_upright(0.05, 0.05));
        assert!(result.status.is_completed(), "scale {factor}");
        assert!(result.trajectory.final_state[2].abs() < 0.01);
    }
}
