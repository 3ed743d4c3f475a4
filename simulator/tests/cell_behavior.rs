// Cycle-level behavior of both cell kinds through the public driver.
//
// Covers the documented scenarios, the two-cycle latency, reset semantics
// and narrowing at the output registers.

use syscell::cell::{Cell, CellInputs, CellOutputs, InputFormats, Port, LATENCY};
use syscell::edge::EdgeCell;
use syscell::fixed::{Fixed, Format};
use syscell::interior::InteriorCell;
use syscell::sim::Simulator;

// ── Test helpers ────────────────────────────────────────────────────────────

fn q(int_bits: u32, frac_bits: u32) -> Format {
    Format::new(int_bits, frac_bits).unwrap()
}

fn q44() -> Format {
    q(4, 4)
}

fn inputs(nw: f64, ne: f64, s: f64) -> CellInputs {
    CellInputs {
        nw: Fixed::from_f64(nw, q44()),
        ne: Fixed::from_f64(ne, q44()),
        s: Fixed::from_f64(s, q44()),
    }
}

fn idle() -> CellInputs {
    inputs(0.0, 0.0, 0.0)
}

fn edge(out: Format) -> EdgeCell {
    EdgeCell::new(InputFormats::uniform(q44()), out, out, out)
}

fn interior(out: Format) -> InteriorCell {
    InteriorCell::new(InputFormats::uniform(q44()), out, out)
}

/// Drive `first`, then idle inputs, and return the outputs LATENCY cycles later.
fn settle<C: Cell>(cell: C, first: CellInputs) -> CellOutputs {
    let mut sim = Simulator::new(cell);
    sim.tick(idle(), true).unwrap();
    sim.tick(first, false).unwrap();
    for _ in 1..LATENCY {
        sim.tick(idle(), false).unwrap();
    }
    sim.outputs()
}

fn values(outputs: &CellOutputs) -> Vec<(Port, f64)> {
    outputs.iter().map(|(p, v)| (p, v.to_f64())).collect()
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn edge_scenario() {
    let out = settle(edge(q(8, 8)), inputs(1.5, 2.0, 0.25));
    assert_eq!(
        values(&out),
        vec![(Port::Se, 1.5), (Port::Sw, 2.0), (Port::N, 3.25)]
    );
}

#[test]
fn interior_scenario() {
    let cell = interior(q(8, 8));
    let widths = cell.widths();
    assert_eq!(widths.cross, q(9, 8));
    assert_eq!(widths.chain, q(13, 12));
    assert_eq!(widths.sum, q(14, 12));

    let out = settle(cell, inputs(1.5, 2.0, 0.25));
    assert_eq!(values(&out), vec![(Port::Sw, -3.0), (Port::N, -4.25)]);
}

// ── Latency ─────────────────────────────────────────────────────────────────

#[test]
fn each_output_reflects_inputs_two_cycles_earlier() {
    let stream = [
        inputs(1.0, 1.0, 0.0),
        inputs(0.5, -2.0, 1.0),
        inputs(-1.25, 3.0, -0.5),
        inputs(2.0, 2.0, 2.0),
    ];
    let mut sim = Simulator::new(edge(q(8, 8)));
    sim.tick(idle(), true).unwrap();

    let mut seen = Vec::new();
    for driven in stream.iter().cloned().chain([idle(), idle()]) {
        sim.tick(driven, false).unwrap();
        seen.push(sim.outputs().n.to_f64());
    }
    // Index i is the cycle after the i-th non-reset edge; stream[j] appears at j + 1.
    assert_eq!(seen, vec![0.0, 1.0, 0.0, -4.25, 6.0, 0.0]);
}

#[test]
fn nothing_leaks_after_one_cycle() {
    let mut sim = Simulator::new(interior(q(8, 8)));
    sim.tick(inputs(1.5, 2.0, 0.25), false).unwrap();
    assert!(sim.outputs().is_zero());
    sim.tick(idle(), false).unwrap();
    assert_eq!(sim.outputs().n.to_f64(), -4.25);
}

#[test]
fn cells_hold_no_accumulated_state() {
    let mut sim = Simulator::new(edge(q(8, 8)));
    for _ in 0..3 {
        sim.tick(inputs(1.0, 1.0, 1.0), false).unwrap();
    }
    assert_eq!(sim.outputs().n.to_f64(), 2.0);
}

// ── Reset ───────────────────────────────────────────────────────────────────

#[test]
fn reset_held_zeroes_outputs_through_the_following_cycle() {
    let mut sim = Simulator::new(edge(q(8, 8)));
    sim.tick(inputs(1.0, 1.0, 1.0), false).unwrap();
    sim.tick(inputs(2.0, 2.0, 2.0), false).unwrap();
    assert!(!sim.outputs().is_zero());

    for _ in 0..3 {
        sim.tick(inputs(3.0, 3.0, 3.0), true).unwrap();
        assert!(sim.outputs().is_zero());
    }
    // First cycle after deassertion: registers were cleared at the last reset edge.
    sim.tick(inputs(1.0, 2.0, 0.0), false).unwrap();
    assert!(sim.outputs().is_zero());
    sim.tick(idle(), false).unwrap();
    assert_eq!(sim.outputs().n.to_f64(), 2.0);
}

#[test]
fn reset_discards_values_in_flight() {
    let mut sim = Simulator::new(interior(q(8, 8)));
    sim.tick(inputs(1.5, 2.0, 0.25), false).unwrap();
    sim.tick(idle(), true).unwrap();
    assert!(sim.outputs().is_zero());
    sim.tick(idle(), false).unwrap();
    assert!(sim.outputs().is_zero());
}

#[test]
fn power_up_state_is_zero() {
    let cell = edge(q(8, 8));
    let state = cell.zero_state();
    assert!(cell.outputs(&state).is_zero());
    assert_eq!(cell.outputs(&state).se.map(|v| v.format()), Some(q(8, 8)));
}

// ── Narrowing ───────────────────────────────────────────────────────────────

#[test]
fn narrow_outputs_saturate() {
    let out = settle(edge(q44()), inputs(7.0, 7.0, 7.0));
    assert_eq!(out.n.to_f64(), q44().max_value());
    let out = settle(interior(q44()), inputs(-8.0, 7.0, -8.0));
    // m1 = 56 saturates high; n = -8 - 64*7 saturates low.
    assert_eq!(out.sw.to_f64(), 7.9375);
    assert_eq!(out.n.to_f64(), -8.0);
}

#[test]
fn narrow_outputs_round_half_to_even() {
    let cell = EdgeCell::new(InputFormats::uniform(q44()), q44(), q44(), q(8, 3));
    // 0.0625 * 1 = 0.0625 sits halfway between 0 and 0.125: rounds to 0.
    let out = settle(cell.clone(), inputs(0.0625, 1.0, 0.0));
    assert_eq!(out.n.to_f64(), 0.0);
    // 0.1875 sits halfway between 0.125 and 0.25: rounds to 0.25.
    let out = settle(cell, inputs(0.1875, 1.0, 0.0));
    assert_eq!(out.n.to_f64(), 0.25);
}

#[test]
fn wide_outputs_are_exact() {
    let cell = InteriorCell::new(InputFormats::uniform(q44()), q(9, 8), q(14, 12));
    let out = settle(cell, inputs(-8.0, -8.0, 7.9375));
    assert_eq!(out.sw.to_f64(), -64.0);
    assert_eq!(out.n.to_f64(), 7.9375 + 512.0);
}

#[test]
fn mismatched_input_format_is_reported() {
    let mut sim = Simulator::new(edge(q(8, 8)));
    let mut bad = idle();
    bad.ne = Fixed::zero(q(8, 8));
    let err = sim.tick(bad, false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "port `ne` expects sfixed(4, 4), got a value in sfixed(8, 8)"
    );
}
