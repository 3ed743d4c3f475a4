// sim.rs — Clocked driver for a single cell
//
// Owns one cell and its registers and advances them one edge per `tick`,
// carrying the cycle index explicitly. Optionally records a `Trace`.
//
// Preconditions: none.
// Postconditions: after `tick` returns Ok, `cycle()` has advanced by one and
//                 `outputs()` are the values valid during the new cycle.
// Failure modes: an input whose format differs from the port's declared
//                format is rejected before any register changes.
// Side effects: none.

use crate::cell::{Cell, CellInputs, CellOutputs, Cycle, Port};
use crate::error::SimError;
use crate::trace::{Trace, TraceRow};

pub struct Simulator<C: Cell> {
    cell: C,
    state: C::State,
    cycle: Cycle,
    trace: Option<Trace>,
}

impl<C: Cell> Simulator<C> {
    /// Start at cycle 0 with every register at zero.
    pub fn new(cell: C) -> Self {
        let state = cell.zero_state();
        Simulator {
            cell,
            state,
            cycle: Cycle::default(),
            trace: None,
        }
    }

    /// Record one `TraceRow` per tick from now on.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Trace::new(self.cell.kind()));
        self
    }

    pub fn cell(&self) -> &C {
        &self.cell
    }

    pub fn state(&self) -> &C::State {
        &self.state
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Output values valid during the current cycle.
    pub fn outputs(&self) -> CellOutputs {
        self.cell.outputs(&self.state)
    }

    /// Drive `inputs` and `reset` for the current cycle and apply the closing edge.
    ///
    /// Returns the outputs valid during the next cycle.
    pub fn tick(&mut self, inputs: CellInputs, reset: bool) -> Result<CellOutputs, SimError> {
        self.check_inputs(&inputs)?;

        if let Some(trace) = &mut self.trace {
            trace.push(TraceRow::sample(
                self.cycle,
                reset,
                &inputs,
                &self.cell.outputs(&self.state),
            ));
        }

        self.state = self.cell.advance(&self.state, &inputs, reset);
        self.cycle = self.cycle.next();
        Ok(self.outputs())
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn take_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    fn check_inputs(&self, inputs: &CellInputs) -> Result<(), SimError> {
        let declared = self.cell.input_formats();
        let ports = [
            (Port::Nw, declared.nw, &inputs.nw),
            (Port::Ne, declared.ne, &inputs.ne),
            (Port::S, declared.s, &inputs.s),
        ];
        for (port, expected, value) in ports {
            if value.format() != expected {
                return Err(SimError::PortFormat {
                    port,
                    expected,
                    found: value.format(),
                });
            }
        }
        Ok(())
    }
}
