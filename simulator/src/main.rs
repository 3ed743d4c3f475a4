use clap::Parser;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::Level;

use syscell::config::CellConfig;
use syscell::error::SimError;
use syscell::testbench::{self, SweepOutcome, TestbenchConfig, TestbenchReport};
use syscell::trace::Trace;
use syscell::{report, timing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    Summary,
    Trace,
    Json,
    Timing,
    Widths,
    Sweep,
    Fingerprint,
}

#[derive(Parser, Debug)]
#[command(
    name = "syscell",
    version,
    about = "Cycle-accurate simulator for fixed-point systolic Cholesky cells"
)]
struct Cli {
    /// Cell description (.cell) or JSON configuration (.json)
    config: PathBuf,

    /// Cell to simulate (defaults to the first one declared)
    #[arg(long)]
    cell: Option<String>,

    /// Number of random input events to drive
    #[arg(long, default_value_t = 100)]
    events: usize,

    /// Stimulus seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Summary)]
    emit: EmitStage,

    /// Log elaboration and run progress
    #[arg(long)]
    verbose: bool,
}

#[derive(Serialize)]
struct RunJson<'a> {
    cell: &'a CellConfig,
    report: &'a TestbenchReport,
    trace: Option<&'a Trace>,
}

fn die(code: i32, err: impl Display) -> ! {
    eprintln!("syscell: error: {}", err);
    std::process::exit(code);
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // ── Load and elaborate ──
    let loaded = match syscell::config::load_file(&cli.config) {
        Ok(loaded) => loaded,
        Err(e @ SimError::Io { .. }) => die(2, e),
        Err(e) => die(1, e),
    };

    let path = cli.config.display().to_string();
    for diag in &loaded.diagnostics {
        eprintln!("{}", diag.render(&path, &loaded.source));
    }
    if loaded.has_errors() {
        die(1, SimError::Rejected(loaded.error_count()));
    }

    let config = match loaded.select(cli.cell.as_deref()) {
        Ok(config) => config,
        Err(e) => die(2, e),
    };
    let cell = match config.build() {
        Ok(cell) => cell,
        Err(e) => die(1, e),
    };

    tracing::debug!(
        cell = %config.name,
        kind = %cell.kind(),
        events = cli.events,
        seed = cli.seed,
        emit = ?cli.emit,
        "configuration loaded"
    );

    // ── Static outputs ──
    match cli.emit {
        EmitStage::Widths => {
            print!("{}", report::emit_widths(config, &cell));
            return;
        }
        EmitStage::Timing => {
            print!(
                "{}",
                timing::emit_timing_chart(cell.kind(), 1, cli.events as u64)
            );
            return;
        }
        EmitStage::Sweep => {
            let entries = match testbench::sweep(cell.kind(), cli.events, cli.seed) {
                Ok(entries) => entries,
                Err(e) => die(1, e),
            };
            print!("{}", report::emit_sweep(cell.kind(), &entries));
            if entries
                .iter()
                .any(|e| matches!(e.outcome, SweepOutcome::Failed { .. }))
            {
                std::process::exit(1);
            }
            return;
        }
        _ => {}
    }

    // ── Testbench run ──
    let tb = TestbenchConfig {
        events: cli.events,
        seed: cli.seed,
        trace: cli.emit != EmitStage::Summary,
    };
    let outcome = match testbench::run_any(&cell, &tb) {
        Ok(outcome) => outcome,
        Err(e) => die(1, e),
    };

    match cli.emit {
        EmitStage::Trace => {
            if let Some(trace) = &outcome.trace {
                print!("{}", trace);
            }
        }
        EmitStage::Json => {
            let json = RunJson {
                cell: config,
                report: &outcome.report,
                trace: outcome.trace.as_ref(),
            };
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => die(1, e),
            }
        }
        EmitStage::Fingerprint => {
            let Some(trace) = &outcome.trace else {
                die(1, "no trace recorded");
            };
            match trace.fingerprint_hex() {
                Ok(hex) => println!("{}", hex),
                Err(e) => die(1, e),
            }
        }
        _ => print!("{}", report::emit_summary(&config.name, &outcome.report)),
    }

    if !outcome.report.passed() {
        std::process::exit(1);
    }
}
