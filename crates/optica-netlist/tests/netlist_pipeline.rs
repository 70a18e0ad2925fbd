//! Integration test: netlist text through to propagated fields.

use optica_core::fields::power_deviation;
use optica_core::propagation::FresnelPropagator;
use optica_core::sampler::sample;
use optica_core::{Mesh, RecordingSink, Simulation, Stage};
use optica_netlist::parse_netlist;

#[test]
fn test_gaussian_to_plane_netlist() {
    let netlist = parse_netlist("G1 0mm 700nm 0.5mm\nP1 20mm\n");
    assert!(netlist.diagnostics.is_empty());
    let (planes, failures) = netlist.to_planes();
    assert!(failures.is_empty());

    let mesh = Mesh::square(128, 8.0).unwrap();
    let initial = sample(&planes[0], &mesh, 700e-6).unwrap().unwrap();
    let sim = Simulation::new(mesh, planes);
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].steps.len(), 1);
    let pre = sink.find("G1", "P1", Stage::PreMask).unwrap();
    let expected = FresnelPropagator::default()
        .propagate(&initial, 8.0, 8.0, 700e-6, 20.0)
        .unwrap();
    let diff = pre
        .grid
        .iter()
        .zip(expected.grid.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);
    assert!(diff < 1e-12);
    assert!(power_deviation(&initial, &pre.grid) < 1e-9);
}

#[test]
fn test_bad_elements_do_not_stop_the_run() {
    let content = "\
W1 0 500nm
Q9 5mm 1mm        # unsupported element
C1 10mm -3mm      # invalid diameter, skipped at construction
S1 10mm 2mm
P1 25mm
";
    let netlist = parse_netlist(content);
    assert_eq!(netlist.diagnostics.len(), 1);
    let (planes, failures) = netlist.to_planes();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].identity, "C1");

    let sim = Simulation::new(Mesh::square(32, 8.0).unwrap(), planes);
    let mut sink = RecordingSink::new();
    let outcomes = sim.run(&mut sink);
    assert!(outcomes[0].is_ok());
    let masks: Vec<&str> = outcomes[0].steps.iter().map(|s| s.mask.as_str()).collect();
    assert_eq!(masks, ["S1", "P1"]);
    assert!(sink.find("W1", "S1", Stage::PostMask).is_some());
}
