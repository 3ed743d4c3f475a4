// edge.rs — Boundary ("A"-type) cell
//
// Latches nw/ne/s into a/b/c, then on the following edge registers
//   se = resize(a), sw = resize(b), n = resize(c + a*b)
// with the product and sum carried at full precision.

use crate::cell::{
    Cell, CellInputs, CellKind, CellOutputs, InputFormats, Intermediate, Narrowing, Port,
};
use crate::fixed::{Fixed, Format};

/// Full-precision formats derived from the input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWidths {
    /// `a * b`
    pub product: Format,
    /// `c + a * b`
    pub sum: Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCell {
    inputs: InputFormats,
    se: Format,
    sw: Format,
    n: Format,
    widths: EdgeWidths,
}

/// Registers of an edge cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeState {
    pub a: Fixed,
    pub b: Fixed,
    pub c: Fixed,
    pub se: Fixed,
    pub sw: Fixed,
    pub n: Fixed,
}

impl EdgeCell {
    /// Elaborate an edge cell, deriving its full-precision widths.
    pub fn new(inputs: InputFormats, se: Format, sw: Format, n: Format) -> Self {
        let product = inputs.nw.product(inputs.ne);
        let sum = inputs.s.sum(product);
        EdgeCell {
            inputs,
            se,
            sw,
            n,
            widths: EdgeWidths { product, sum },
        }
    }

    pub fn widths(&self) -> EdgeWidths {
        self.widths
    }
}

impl Cell for EdgeCell {
    type State = EdgeState;

    fn kind(&self) -> CellKind {
        CellKind::Edge
    }

    fn input_formats(&self) -> InputFormats {
        self.inputs
    }

    fn output_format(&self, port: Port) -> Option<Format> {
        match port {
            Port::Se => Some(self.se),
            Port::Sw => Some(self.sw),
            Port::N => Some(self.n),
            _ => None,
        }
    }

    fn zero_state(&self) -> EdgeState {
        EdgeState {
            a: Fixed::zero(self.inputs.nw),
            b: Fixed::zero(self.inputs.ne),
            c: Fixed::zero(self.inputs.s),
            se: Fixed::zero(self.se),
            sw: Fixed::zero(self.sw),
            n: Fixed::zero(self.n),
        }
    }

    fn advance(&self, state: &EdgeState, inputs: &CellInputs, reset: bool) -> EdgeState {
        if reset {
            return self.zero_state();
        }
        debug_assert_eq!(inputs.formats(), self.inputs);

        let product = &state.a * &state.b;
        let sum = &state.c + &product;

        EdgeState {
            a: inputs.nw.clone(),
            b: inputs.ne.clone(),
            c: inputs.s.clone(),
            se: state.a.resize(self.se),
            sw: state.b.resize(self.sw),
            n: sum.resize(self.n),
        }
    }

    fn outputs(&self, state: &EdgeState) -> CellOutputs {
        CellOutputs {
            se: Some(state.se.clone()),
            sw: state.sw.clone(),
            n: state.n.clone(),
        }
    }

    fn intermediates(&self) -> Vec<Intermediate> {
        vec![
            Intermediate {
                name: "product",
                expr: "a * b",
                format: self.widths.product,
            },
            Intermediate {
                name: "sum",
                expr: "c + a * b",
                format: self.widths.sum,
            },
        ]
    }

    fn narrowings(&self) -> Vec<Narrowing> {
        vec![
            Narrowing {
                port: Port::Se,
                source: self.inputs.nw,
                target: self.se,
            },
            Narrowing {
                port: Port::Sw,
                source: self.inputs.ne,
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
