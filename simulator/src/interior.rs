// interior.rs — Interior ("B"-type) cell
//
// Latches nw/ne/s into a/b/c, then on the following edge registers
//   sw = resize(m1), n = resize(c + m2)
// where m1 = -(a*b) and m2 = a*m1, so n = c - a²·b.

use crate::cell::{
    Cell, CellInputs, CellKind, CellOutputs, InputFormats, Intermediate, Narrowing, Port,
};
use crate::fixed::{Fixed, Format};

/// Full-precision formats derived from the input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorWidths {
    /// `m1 = -(a * b)`
    pub cross: Format,
    /// `m2 = a * m1`
    pub chain: Format,
    /// `c + m2`
    pub sum: Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteriorCell {
    inputs: InputFormats,
    sw: Format,
    n: Format,
    widths: InteriorWidths,
}

/// Registers of an interior cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteriorState {
    pub a: Fixed,
    pub b: Fixed,
    pub c: Fixed,
    pub sw: Fixed,
    pub n: Fixed,
}

impl InteriorCell {
    /// Elaborate an interior cell, deriving its full-precision widths.
    pub fn new(inputs: InputFormats, sw: Format, n: Format) -> Self {
        let cross = inputs.nw.product(inputs.ne).negated();
        let chain = inputs.nw.product(cross);
        let sum = inputs.s.sum(chain);
        InteriorCell {
            inputs,
            sw,
            n,
            widths: InteriorWidths { cross, chain, sum },
        }
    }

    pub fn widths(&self) -> InteriorWidths {
        self.widths
    }
}

impl Cell for InteriorCell {
    type State = InteriorState;

    fn kind(&self) -> CellKind {
        CellKind::Interior
    }

    fn input_formats(&self) -> InputFormats {
        self.inputs
    }

    fn output_format(&self, port: Port) -> Option<Format> {
        match port {
            Port::Sw => Some(self.sw),
            Port::N => Some(self.n),
            _ => None,
        }
    }

    fn zero_state(&self) -> InteriorState {
        InteriorState {
            a: Fixed::zero(self.inputs.nw),
            b: Fixed::zero(self.inputs.ne),
            c: Fixed::zero(self.inputs.s),
            sw: Fixed::zero(self.sw),
            n: Fixed::zero(self.n),
        }
    }

    fn advance(&self, state: &InteriorState, inputs: &CellInputs, reset: bool) -> InteriorState {
        if reset {
            return self.zero_state();
        }
        debug_assert_eq!(inputs.formats(), self.inputs);

        let m1 = -(&state.a * &state.b);
        let m2 = &state.a * &m1;
        let sum = &state.c + &m2;

        InteriorState {
            a: inputs.nw.clone(),
            b: inputs.ne.clone(),
            c: inputs.s.clone(),
            sw: m1.resize(self.sw),
            n: sum.resize(self.n),
        }
    }

    fn outputs(&self, state: &InteriorState) -> CellOutputs {
        CellOutputs {
            se: None,
            sw: state.sw.clone(),
            n: state.n.clone(),
        }
    }

    fn intermediates(&self) -> Vec<Intermediate> {
        vec![
            Intermediate {
                name: "m1",
                expr: "-(a * b)",
                format: self.widths.cross,
            },
            Intermediate {
                name: "m2",
                expr: "a * m1",
                format: self.widths.chain,
            },
            Intermediate {
                name: "sum",
                expr: "c + m2",
                format: self.widths.sum,
            },
        ]
    }

    fn narrowings(&self) -> Vec<Narrowing> {
        vec![
            Narrowing {
                port: Port::Sw,
                source: self.widths.cross,
                target: self.sw,
            },
            Narrowing {
                port: Port::N,
                source: self.widths.sum,
                target: self.n,
            },
        ]
    }
}
