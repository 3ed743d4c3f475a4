// testbench.rs — Randomized bit-exact check of a cell against a reference model
//
// Procedure: hold the inputs at zero with reset asserted for one cycle, then
// drive `events` random input triples on consecutive cycles and keep ticking
// until the last one has drained. Every output observed from cycle LATENCY
// onwards is compared bit-for-bit with the reference model applied to the
// inputs driven LATENCY cycles earlier (zero for the reset cycle).
//
// Preconditions: none; derived widths are unbounded.
// Postconditions: the report lists every mismatch and counts, per output
//                 port, narrowings that lost more than 1% of the exact value.
// Failure modes: none beyond `SimError` from the simulator.
// Side effects: emits `tracing` events.

use serde::Serialize;

use crate::cell::{AnyCell, Cell, CellInputs, CellKind, CellOutputs, Cycle, Port, LATENCY};
use crate::config::CellConfig;
use crate::error::SimError;
use crate::fixed::{Fixed, Format};
use crate::sim::Simulator;
use crate::stimulus::Stimulus;
use crate::trace::Trace;

/// Narrowings losing more than this fraction of the exact value are reported.
pub const LOSSY_THRESHOLD: f64 = 0.01;

// ── Reference model ─────────────────────────────────────────────────────────

/// Exact (unnarrowed) outputs of a cell of `kind` for the given inputs.
pub fn reference(kind: CellKind, inputs: &CellInputs) -> Vec<(Port, Fixed)> {
    let CellInputs { nw: a, ne: b, s: c } = inputs;
    match kind {
        CellKind::Edge => vec![
            (Port::Se, a.clone()),
            (Port::Sw, b.clone()),
            (Port::N, c + &(a * b)),
        ],
        CellKind::Interior => vec![
            (Port::Sw, -(a * b)),
            (Port::N, c - &(&(a * a) * b)),
        ],
    }
}

// ── Single run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct TestbenchConfig {
    pub events: usize,
    pub seed: u64,
    pub trace: bool,
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        TestbenchConfig {
            events: 100,
            seed: 0,
            trace: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub cycle: Cycle,
    pub port: Port,
    pub expected: f64,
    pub expected_bits: String,
    pub actual: f64,
    pub actual_bits: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LossyCount {
    pub port: Port,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestbenchReport {
    pub kind: CellKind,
    pub events: usize,
    pub seed: u64,
    /// Number of (cycle, port) output comparisons made.
    pub checked: u64,
    pub mismatches: Vec<Mismatch>,
    pub lossy: Vec<LossyCount>,
}

impl TestbenchReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    fn count_lossy(&mut self, port: Port) {
        match self.lossy.iter_mut().find(|l| l.port == port) {
            Some(entry) => entry.count += 1,
            None => self.lossy.push(LossyCount { port, count: 1 }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestbenchOutcome {
    pub report: TestbenchReport,
    pub trace: Option<Trace>,
}

/// Run the randomized check on `cell`.
pub fn run<C: Cell>(cell: C, config: &TestbenchConfig) -> Result<TestbenchOutcome, SimError> {
    let kind = cell.kind();
    let formats = cell.input_formats();
    let zero = CellInputs::zero(&formats);

    let mut sim = Simulator::new(cell);
    if config.trace {
        sim = sim.with_trace();
    }

    let mut report = TestbenchReport {
        kind,
        events: config.events,
        seed: config.seed,
        checked: 0,
        mismatches: Vec::new(),
        lossy: Vec::new(),
    };

    tracing::debug!(
        kind = %kind,
        events = config.events,
        seed = config.seed,
        "testbench start"
    );

    // Inputs driven per cycle; cycle 0 is the reset cycle.
    let mut driven: Vec<Option<CellInputs>> = Vec::with_capacity(config.events + 2);
    sim.tick(zero.clone(), true)?;
    driven.push(None);

    let mut stimulus = Stimulus::new(formats, config.seed);
    let total_cycles = config.events as u64 + LATENCY;
    while sim.cycle().0 < total_cycles {
        let data = driven.len() <= config.events;
        let inputs = if data {
            stimulus.next_inputs()
        } else {
            zero.clone()
        };
        sim.tick(inputs.clone(), false)?;
        driven.push(data.then_some(inputs));

        let source = (sim.cycle().0 - LATENCY) as usize;
        check_cycle(
            sim.cell(),
            &sim.outputs(),
            sim.cycle(),
            driven[source].as_ref(),
            &mut report,
        );
    }

    if report.passed() {
        tracing::debug!(checked = report.checked, "testbench passed");
    } else {
        tracing::warn!(
            mismatches = report.mismatches.len(),
            checked = report.checked,
            "testbench found mismatches"
        );
    }

    Ok(TestbenchOutcome {
        report,
        trace: sim.take_trace(),
    })
}

/// Dispatch `run` on either cell kind.
pub fn run_any(cell: &AnyCell, config: &TestbenchConfig) -> Result<TestbenchOutcome, SimError> {
    match cell {
        AnyCell::Edge(cell) => run(cell.clone(), config),
        AnyCell::Interior(cell) => run(cell.clone(), config),
    }
}

fn check_cycle<C: Cell>(
    cell: &C,
    outputs: &CellOutputs,
    cycle: Cycle,
    source: Option<&CellInputs>,
    report: &mut TestbenchReport,
) {
    let exact: Vec<(Port, Option<Fixed>)> = match source {
        Some(inputs) => reference(cell.kind(), inputs)
            .into_iter()
            .map(|(p, v)| (p, Some(v)))
            .collect(),
        None => cell.kind().output_ports().iter().map(|p| (*p, None)).collect(),
    };

    for (port, exact) in exact {
        let (Some(format), Some(actual)) = (cell.output_format(port), outputs.get(port)) else {
            continue;
        };
        let expected = exact
            .as_ref()
            .map_or_else(|| Fixed::zero(format), |v| v.resize(format));
        report.checked += 1;

        if let Some(exact) = &exact {
            if is_lossy(exact, &expected) {
                tracing::warn!(
                    port = %port,
                    cycle = cycle.0,
                    exact = exact.to_f64(),
                    narrowed = expected.to_f64(),
                    "narrowing difference exceeded 1% for output port {}",
                    port
                );
                report.count_lossy(port);
            }
        }

        if *actual != expected {
            report.mismatches.push(Mismatch {
                cycle,
                port,
                expected: expected.to_f64(),
                expected_bits: format!("{:x}", expected.to_bits()),
                actual: actual.to_f64(),
                actual_bits: format!("{:x}", actual.to_bits()),
            });
        }
    }
}

fn is_lossy(exact: &Fixed, narrowed: &Fixed) -> bool {
    let exact = exact.to_f64();
    exact != 0.0 && (exact - narrowed.to_f64()).abs() > LOSSY_THRESHOLD * exact.abs()
}

// ── Width sweep ─────────────────────────────────────────────────────────────

/// Input integer/fraction widths of the reference grid.
pub const SWEEP_INPUT_BITS: [u32; 4] = [4, 8, 16, 32];
/// Output width multipliers of the reference grid.
pub const SWEEP_OUTPUT_SCALES: [u32; 2] = [2, 3];

/// One grid point: uniform input format, uniform output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepPoint {
    pub in_int: u32,
    pub in_frac: u32,
    pub out_int: u32,
    pub out_frac: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SweepOutcome {
    Passed { checked: u64 },
    Failed { mismatches: usize, checked: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub point: SweepPoint,
    pub outcome: SweepOutcome,
}

/// Every point of the reference width grid.
pub fn sweep_grid() -> Vec<SweepPoint> {
    let mut grid = Vec::new();
    for in_int in SWEEP_INPUT_BITS {
        for in_frac in SWEEP_INPUT_BITS {
            for int_scale in SWEEP_OUTPUT_SCALES {
                for frac_scale in SWEEP_OUTPUT_SCALES {
                    grid.push(SweepPoint {
                        in_int,
                        in_frac,
                        out_int: in_int * int_scale,
                        out_frac: in_frac * frac_scale,
                    });
                }
            }
        }
    }
    grid
}

/// Run the testbench for every grid point on a cell of `kind`.
pub fn sweep(kind: CellKind, events: usize, seed: u64) -> Result<Vec<SweepEntry>, SimError> {
    sweep_grid()
        .into_iter()
        .map(|point| {
            Ok(SweepEntry {
                point,
                outcome: sweep_point(kind, point, events, seed)?,
            })
        })
        .collect()
}

fn sweep_point(
    kind: CellKind,
    point: SweepPoint,
    events: usize,
    seed: u64,
) -> Result<SweepOutcome, SimError> {
    let input = Format::new(point.in_int, point.in_frac)?;
    let output = Format::new(point.out_int, point.out_frac)?;
    let name = format!("sweep_{}_{}", point.in_int, point.in_frac);
    let cell = CellConfig::uniform(name, kind, input, output).build()?;

    let config = TestbenchConfig {
        events,
        seed,
        trace: false,
    };
    let report = run_any(&cell, &config)?.report;
    tracing::debug!(?point, passed = report.passed(), "sweep point done");
    Ok(if report.passed() {
        SweepOutcome::Passed {
            checked: report.checked,
        }
    } else {
        SweepOutcome::Failed {
            mismatches: report.mismatches.len(),
            checked: report.checked,
        }
    })
}
