//! Integration tests: end-to-end behaviour of the propagation pipeline.
//!
//! Covers the physical and numerical contracts of the engine:
//! - identity at zero distance and shape preservation
//! - forward/backward propagation as approximate inverses
//! - the oversampling-ratio diagnostic
//! - a Gaussian source reaching a reference plane (power conservation)
//! - exact mask multiplication at zero distance
//! - wavelength-dependent masks re-sampled per source
//! - sequential and parallel runs agreeing

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use num_complex::Complex64;

use optica_core::fields::{power_deviation, total_power};
use optica_core::profile::{Circle, Gaussian, ThinLens};
use optica_core::propagation::{oversampling_ratio, FresnelPropagator};
use optica_core::sampler::sample;
use optica_core::{
    BackwardPolicy, Mesh, OpticalPlane, PlaneBuilder, Profile, RecordingSink, Simulation, Stage,
};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

fn gaussian_source(id: &str, z: f64, wavelength: f64, waist: f64) -> OpticalPlane {
    PlaneBuilder::source(id, z, wavelength)
        .amplitude(Profile::Gaussian(Gaussian { waist }))
        .phase(Profile::Constant(0.0))
        .build()
        .unwrap()
}

fn plane_wave(id: &str, z: f64, wavelength: f64) -> OpticalPlane {
    PlaneBuilder::source(id, z, wavelength)
        .amplitude(Profile::Constant(1.0))
        .phase(Profile::Constant(0.0))
        .build()
        .unwrap()
}

fn circular_aperture(id: &str, z: f64, diameter: f64) -> OpticalPlane {
    PlaneBuilder::mask(id, z)
        .amplitude(Profile::Circle(Circle { diameter }))
        .phase(Profile::Constant(0.0))
        .build()
        .unwrap()
}

fn thin_lens(id: &str, z: f64, focal_length: f64) -> OpticalPlane {
    PlaneBuilder::mask(id, z)
        .amplitude(Profile::Constant(1.0))
        .phase(Profile::ThinLens(ThinLens { focal_length }))
        .build()
        .unwrap()
}

fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

// ─────────────────────────────────────────────────────────────
// Propagation operator
// ─────────────────────────────────────────────────────────────

#[test]
fn test_identity_at_zero_distance() {
    let mesh = Mesh::new(48, 32, 6.0, 4.0).unwrap();
    let source = gaussian_source("G1", 0.0, 633e-6, 0.7);
    let grid = sample(&source, &mesh, 633e-6).unwrap().unwrap();

    let out = FresnelPropagator::default()
        .propagate(&grid, 6.0, 4.0, 633e-6, 0.0)
        .unwrap();
    assert_eq!(out.grid, grid);
    assert_eq!(out.oversampling_ratio, 0.0);
}

#[test]
fn test_shape_preserved_for_odd_and_even_grids() {
    let propagator = FresnelPropagator::default();
    for (ny, nx) in [(16, 16), (15, 17), (10, 31)] {
        let mesh = Mesh::new(nx, ny, 3.0, 2.0).unwrap();
        let grid = sample(&gaussian_source("G", 0.0, 5e-4, 0.3), &mesh, 5e-4)
            .unwrap()
            .unwrap();
        let out = propagator.propagate(&grid, 3.0, 2.0, 5e-4, 12.5).unwrap();
        assert_eq!(out.grid.dim(), (ny, nx));
    }
}

#[test]
fn test_forward_backward_is_approximate_inverse() {
    let mesh = Mesh::square(64, 4.0).unwrap();
    let grid = sample(&gaussian_source("G", 0.0, 7e-4, 0.5), &mesh, 7e-4)
        .unwrap()
        .unwrap();
    let propagator = FresnelPropagator::default();
    let there = propagator.propagate_signed(&grid, 4.0, 4.0, 7e-4, 25.0).unwrap();
    let back = propagator
        .propagate_signed(&there.grid, 4.0, 4.0, 7e-4, -25.0)
        .unwrap();
    assert!(max_abs_diff(&back.grid, &grid) < 1e-10);
}

#[test]
fn test_oversampling_ratio_reference_value() {
    // Lx = 10 mm, N = 100, λ = 500 nm, z = 50 mm → dx = 0.1 mm, ratio 40.
    let ratio = oversampling_ratio(10.0, 100, 500e-6, 50.0);
    assert_eq!(ratio, (10.0 / 100.0) * 10.0 / (500e-6 * 50.0));
    assert_abs_diff_eq!(ratio, 40.0, epsilon = 1e-9);

    let grid = Array2::from_elem((100, 100), Complex64::new(1.0, 0.0));
    let out = FresnelPropagator::default()
        .propagate(&grid, 10.0, 10.0, 500e-6, 50.0)
        .unwrap();
    assert_eq!(out.oversampling_ratio, ratio);
}

// ─────────────────────────────────────────────────────────────
// Apertures
// ─────────────────────────────────────────────────────────────

#[test]
fn test_aperture_indicators() {
    let circ = Profile::Circle(Circle { diameter: 10.0 });
    assert_eq!(circ.evaluate(3.0, 4.0, 5e-4), 1.0);
    assert_eq!(circ.evaluate(4.0, 4.0, 5e-4), 0.0);

    let sq = Profile::Square(optica_core::profile::Square { width: 4.0 });
    assert_eq!(sq.evaluate(1.0, 1.0, 5e-4), 1.0);
    assert_eq!(sq.evaluate(3.0, 0.0, 5e-4), 0.0);
}

// ─────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────

#[test]
fn test_gaussian_to_reference_plane() {
    let wavelength = 700e-6;
    let mesh = Mesh::square(128, 8.0).unwrap();
    let source = gaussian_source("G1", 0.0, wavelength, 0.5);
    let initial = sample(&source, &mesh, wavelength).unwrap().unwrap();

    let sim = Simulation::new(
        mesh,
        vec![source, OpticalPlane::pass_through("P1", 20.0).unwrap()],
    );
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].steps.len(), 1);
    assert_eq!(sink.emissions.len(), 1);
    assert!(sink.find("G1", "P1", Stage::PostMask).is_none());

    let pre = sink.find("G1", "P1", Stage::PreMask).unwrap();
    assert_eq!(pre.z, 20.0);
    assert_eq!(pre.wavelength, wavelength);

    let expected = FresnelPropagator::default()
        .propagate(&initial, 8.0, 8.0, wavelength, 20.0)
        .unwrap();
    assert!(max_abs_diff(&pre.grid, &expected.grid) < 1e-12);

    // Discrete propagation is unitary up to rounding.
    assert!(power_deviation(&initial, &pre.grid) < 1e-9);
    let p0 = total_power(&initial, 8.0, 8.0);
    // ∫ exp(-2r²/w²) dA = πw²/2
    assert_abs_diff_eq!(p0, std::f64::consts::PI * 0.25 / 2.0, epsilon = 1e-6);

    let final_field = outcomes[0].field.as_ref().unwrap();
    assert_eq!(final_field.z, 20.0);
    assert_eq!(final_field.values, pre.grid);
    assert!(outcomes[0].steps[0].oversampling_ratio > 0.0);
}

#[test]
fn test_mask_multiplication_at_zero_distance() {
    let wavelength = 500e-6;
    let mesh = Mesh::square(64, 16.0).unwrap();
    let aperture = circular_aperture("C1", 0.0, 10.0);
    let indicator = sample(&aperture, &mesh, wavelength).unwrap().unwrap();

    let sim = Simulation::new(mesh, vec![plane_wave("W1", 0.0, wavelength), aperture]);
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);

    let post = sink.find("W1", "C1", Stage::PostMask).unwrap();
    assert_eq!(post.grid, indicator);
    assert_eq!(outcomes[0].steps[0].oversampling_ratio, 0.0);
    assert!(!outcomes[0].steps[0].propagated);
    assert!(indicator.iter().any(|v| v.re == 0.0));
    assert!(indicator.iter().any(|v| v.re == 1.0));
}

#[test]
fn test_lens_is_resampled_per_wavelength() {
    let mesh = Mesh::square(32, 4.0).unwrap();
    let sim = Simulation::new(
        mesh,
        vec![
            plane_wave("Wred", 0.0, 700e-6),
            plane_wave("Wblue", 0.0, 450e-6),
            thin_lens("L1", 0.0, 50.0),
        ],
    );
    let mut sink = RecordingSink::new();
    sim.run(&mut sink);

    let red = &sink.find("Wred", "L1", Stage::PostMask).unwrap().grid;
    let blue = &sink.find("Wblue", "L1", Stage::PostMask).unwrap().grid;
    // Off-axis phase scales as 1/λ.
    let (x, y) = (sim.mesh().x()[[0, 0]], sim.mesh().y()[[0, 0]]);
    let r2 = x * x + y * y;
    let expected_red = Complex64::from_polar(1.0, std::f64::consts::PI / (50.0 * 700e-6) * r2);
    let expected_blue = Complex64::from_polar(1.0, std::f64::consts::PI / (50.0 * 450e-6) * r2);
    assert!((red[[0, 0]] - expected_red).norm() < 1e-9);
    assert!((blue[[0, 0]] - expected_blue).norm() < 1e-9);
}

#[test]
fn test_chain_through_several_masks() {
    let wavelength = 633e-6;
    let mesh = Mesh::square(64, 6.0).unwrap();
    let sim = Simulation::new(
        mesh,
        vec![
            OpticalPlane::pass_through("P2", 60.0).unwrap(),
            circular_aperture("C1", 10.0, 2.0),
            gaussian_source("G1", 0.0, wavelength, 1.0),
            thin_lens("L1", 30.0, 30.0),
        ],
    );
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);

    let masks: Vec<&str> = outcomes[0].steps.iter().map(|s| s.mask.as_str()).collect();
    assert_eq!(masks, ["C1", "L1", "P2"]);
    let deltas: Vec<f64> = outcomes[0].steps.iter().map(|s| s.delta).collect();
    assert_eq!(deltas, [10.0, 20.0, 30.0]);

    // pre, post, pre, post, pre
    let stages: Vec<Stage> = sink.emissions.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        [Stage::PreMask, Stage::PostMask, Stage::PreMask, Stage::PostMask, Stage::PreMask]
    );

    // The aperture only removes power.
    let before = total_power(&sink.emissions[0].grid, 6.0, 6.0);
    let after = total_power(&sink.emissions[1].grid, 6.0, 6.0);
    assert!(after < before);
}

#[test]
fn test_backward_propagation_policy() {
    let wavelength = 600e-6;
    let mesh = Mesh::square(32, 4.0).unwrap();
    let source = gaussian_source("G1", 20.0, wavelength, 0.5);
    let initial = sample(&source, &mesh, wavelength).unwrap().unwrap();
    let sim = Simulation::new(
        mesh,
        vec![
            source,
            OpticalPlane::pass_through("Pback", 5.0).unwrap(),
            OpticalPlane::pass_through("Pfwd", 20.0).unwrap(),
        ],
    )
    .with_backward_policy(BackwardPolicy::Propagate);
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);

    let steps = &outcomes[0].steps;
    assert_eq!(steps[0].delta, -15.0);
    assert!(steps[0].propagated);
    assert_eq!(steps[1].delta, 15.0);

    // Back 15 mm then forward 15 mm returns to the injected field.
    let returned = &sink.find("G1", "Pfwd", Stage::PreMask).unwrap().grid;
    assert!(max_abs_diff(returned, &initial) < 1e-10);
}

#[test]
fn test_parallel_matches_sequential() {
    let mesh = Mesh::square(32, 4.0).unwrap();
    let planes = vec![
        gaussian_source("G1", 0.0, 700e-6, 0.5),
        gaussian_source("G2", 2.0, 500e-6, 0.3),
        plane_wave("W1", 1.0, 600e-6),
        circular_aperture("C1", 10.0, 2.5),
        thin_lens("L1", 15.0, 40.0),
    ];
    let sim = Simulation::new(mesh, planes);

    let mut seq = RecordingSink::new();
    let seq_out = sim.run(&mut seq);
    let mut par = RecordingSink::new();
    let par_out = sim.run_parallel(&mut par);

    assert_eq!(seq.emissions.len(), par.emissions.len());
    for (a, b) in seq.emissions.iter().zip(par.emissions.iter()) {
        assert_eq!((&a.source, &a.mask, a.stage), (&b.source, &b.mask, b.stage));
        assert!(max_abs_diff(&a.grid, &b.grid) < 1e-12);
    }
    for (a, b) in seq_out.iter().zip(par_out.iter()) {
        assert_eq!(a.identity, b.identity);
        assert_eq!(a.steps, b.steps);
    }
}
