// report.rs — Human-readable text reports
//
// Preconditions: none.
// Postconditions: returns newline-terminated text; output is deterministic.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::cell::{AnyCell, CellKind, Port};
use crate::config::CellConfig;
use crate::testbench::{SweepEntry, SweepOutcome, TestbenchReport};

/// At most this many mismatches are listed in a summary.
const MAX_LISTED_MISMATCHES: usize = 10;

/// Port, intermediate and narrowing formats of an elaborated cell.
pub fn emit_widths(config: &CellConfig, cell: &AnyCell) -> String {
    let mut buf = String::new();
    writeln!(buf, "cell {} ({})", config.name, cell.kind()).unwrap();

    writeln!(buf, "  ports:").unwrap();
    let outputs = [(Port::Se, config.se), (Port::Sw, Some(config.sw)), (Port::N, Some(config.n))];
    let ports = [
        (Port::Nw, Some(config.nw)),
        (Port::Ne, Some(config.ne)),
        (Port::S, Some(config.s)),
    ]
    .into_iter()
    .chain(outputs);
    for (port, format) in ports {
        let Some(format) = format else { continue };
        let dir = if port.is_input() { "in" } else { "out" };
        writeln!(buf, "    {:<3} {:<4} {}", port, dir, format).unwrap();
    }

    writeln!(buf, "  intermediates:").unwrap();
    for im in cell.intermediates() {
        writeln!(buf, "    {:<8} {:<10} {}", im.name, im.expr, im.format).unwrap();
    }

    writeln!(buf, "  narrowings:").unwrap();
    for n in cell.narrowings() {
        let lossy = if n.is_lossy() { "  lossy" } else { "" };
        writeln!(buf, "    {:<3} {} -> {}{}", n.port, n.source, n.target, lossy).unwrap();
    }
    buf
}

/// Outcome of one testbench run.
pub fn emit_summary(name: &str, report: &TestbenchReport) -> String {
    let mut buf = String::new();
    let verdict = if report.passed() { "PASS" } else { "FAIL" };
    writeln!(buf, "cell {} ({}): {}", name, report.kind, verdict).unwrap();
    writeln!(
        buf,
        "  events: {}  seed: {}  checked: {}",
        report.events, report.seed, report.checked
    )
    .unwrap();
    writeln!(buf, "  mismatches: {}", report.mismatches.len()).unwrap();
    for m in report.mismatches.iter().take(MAX_LISTED_MISMATCHES) {
        writeln!(
            buf,
            "    cycle {} {}: expected {} (0x{}), got {} (0x{})",
            m.cycle, m.port, m.expected, m.expected_bits, m.actual, m.actual_bits
        )
        .unwrap();
    }
    if report.mismatches.len() > MAX_LISTED_MISMATCHES {
        writeln!(
            buf,
            "    ... {} more",
            report.mismatches.len() - MAX_LISTED_MISMATCHES
        )
        .unwrap();
    }

    if report.lossy.is_empty() {
        writeln!(buf, "  lossy narrowings: none").unwrap();
    } else {
        let counts: Vec<String> = report
            .lossy
            .iter()
            .map(|l| format!("{}={}", l.port, l.count))
            .collect();
        writeln!(buf, "  lossy narrowings: {}", counts.join(" ")).unwrap();
    }
    buf
}

/// One line per grid point plus a totals header.
pub fn emit_sweep(kind: CellKind, entries: &[SweepEntry]) -> String {
    let count = |f: fn(&SweepOutcome) -> bool| entries.iter().filter(|e| f(&e.outcome)).count();
    let passed = count(|o| matches!(o, SweepOutcome::Passed { .. }));
    let failed = count(|o| matches!(o, SweepOutcome::Failed { .. }));

    let mut buf = String::new();
    writeln!(
        buf,
        "sweep {}: {} points, {} passed, {} failed",
        kind,
        entries.len(),
        passed,
        failed
    )
    .unwrap();

    for entry in entries {
        let p = entry.point;
        let input = format!("sfixed({}, {})", p.in_int, p.in_frac);
        let output = format!("sfixed({}, {})", p.out_int, p.out_frac);
        let outcome = match &entry.outcome {
            SweepOutcome::Passed { checked } => format!("passed ({checked} checks)"),
            SweepOutcome::Failed {
                mismatches,
                checked,
            } => format!("FAILED ({mismatches} of {checked} checks)"),
        };
        writeln!(buf, "  in {:<14} out {:<14} {}", input, output, outcome).unwrap();
    }
    buf
}
