// cell.rs — Port model and the step-function contract shared by all cells
//
// A cell is an elaborated, immutable description (port formats plus derived
// intermediate formats). Its registers live in a separate `State` value that
// the driver threads through `advance`, one call per clock edge.
//
// Preconditions: `advance` receives inputs whose formats equal the cell's
//                declared input formats (checked by `Simulator::tick`).
// Postconditions: `advance` is a total function of (state, inputs, reset).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge::EdgeCell;
use crate::fixed::{Fixed, Format};
use crate::interior::InteriorCell;

/// Cycles between driving a cell's inputs and observing the matching outputs.
pub const LATENCY: u64 = 2;

/// Discrete clock cycle index, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Cycle(pub u64);

impl Cycle {
    pub fn next(self) -> Cycle {
        Cycle(self.0 + 1)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ── Kinds and ports ─────────────────────────────────────────────────────────

/// The two cell roles of the triangular array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Boundary cell: `n = s + nw*ne`, forwards `nw` and `ne`.
    Edge,
    /// Interior cell: `sw = -(nw*ne)`, `n = s - nw²·ne`.
    Interior,
}

impl CellKind {
    pub fn from_name(name: &str) -> Option<CellKind> {
        match name {
            "edge" => Some(CellKind::Edge),
            "interior" => Some(CellKind::Interior),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CellKind::Edge => "edge",
            CellKind::Interior => "interior",
        }
    }

    pub fn output_ports(self) -> &'static [Port] {
        match self {
            CellKind::Edge => &[Port::Se, Port::Sw, Port::N],
            CellKind::Interior => &[Port::Sw, Port::N],
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Data ports, named by the neighbor they face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    Nw,
    Ne,
    S,
    Se,
    Sw,
    N,
}

impl Port {
    pub const INPUTS: [Port; 3] = [Port::Nw, Port::Ne, Port::S];

    pub fn from_name(name: &str) -> Option<Port> {
        match name {
            "nw" => Some(Port::Nw),
            "ne" => Some(Port::Ne),
            "s" => Some(Port::S),
            "se" => Some(Port::Se),
            "sw" => Some(Port::Sw),
            "n" => Some(Port::N),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Port::Nw => "nw",
            Port::Ne => "ne",
            Port::S => "s",
            Port::Se => "se",
            Port::Sw => "sw",
            Port::N => "n",
        }
    }

    pub fn is_input(self) -> bool {
        Port::INPUTS.contains(&self)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ── Port values ─────────────────────────────────────────────────────────────

/// Declared formats of the three input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormats {
    pub nw: Format,
    pub ne: Format,
    pub s: Format,
}

impl InputFormats {
    pub fn uniform(format: Format) -> Self {
        InputFormats {
            nw: format,
            ne: format,
            s: format,
        }
    }

    pub fn get(&self, port: Port) -> Option<Format> {
        match port {
            Port::Nw => Some(self.nw),
            Port::Ne => Some(self.ne),
            Port::S => Some(self.s),
            _ => None,
        }
    }
}

/// Values driven onto the input ports during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInputs {
    pub nw: Fixed,
    pub ne: Fixed,
    pub s: Fixed,
}

impl CellInputs {
    pub fn zero(formats: &InputFormats) -> Self {
        CellInputs {
            nw: Fixed::zero(formats.nw),
            ne: Fixed::zero(formats.ne),
            s: Fixed::zero(formats.s),
        }
    }

    pub fn formats(&self) -> InputFormats {
        InputFormats {
            nw: self.nw.format(),
            ne: self.ne.format(),
            s: self.s.format(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Port, &Fixed)> {
        [(Port::Nw, &self.nw), (Port::Ne, &self.ne), (Port::S, &self.s)].into_iter()
    }
}

/// Output register contents. `se` exists only on edge cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutputs {
    pub se: Option<Fixed>,
    pub sw: Fixed,
    pub n: Fixed,
}

impl CellOutputs {
    pub fn get(&self, port: Port) -> Option<&Fixed> {
        match port {
            Port::Se => self.se.as_ref(),
            Port::Sw => Some(&self.sw),
            Port::N => Some(&self.n),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Port, &Fixed)> {
        self.se
            .as_ref()
            .map(|se| (Port::Se, se))
            .into_iter()
            .chain([(Port::Sw, &self.sw), (Port::N, &self.n)])
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v.is_zero())
    }
}

// ── Elaboration metadata ────────────────────────────────────────────────────

/// A derived full-precision intermediate of a cell's datapath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intermediate {
    pub name: &'static str,
    pub expr: &'static str,
    pub format: Format,
}

/// The narrowing applied when an output register captures its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Narrowing {
    pub port: Port,
    pub source: Format,
    pub target: Format,
}

impl Narrowing {
    /// True when some source values cannot be represented exactly.
    pub fn is_lossy(&self) -> bool {
        !self.target.contains(self.source)
    }
}

// ── Cell contract ───────────────────────────────────────────────────────────

/// A synchronous processing cell, advanced one clock edge at a time.
pub trait Cell {
    /// Register contents. Owned by exactly one driver.
    type State: Clone + fmt::Debug;

    fn kind(&self) -> CellKind;

    fn input_formats(&self) -> InputFormats;

    fn output_format(&self, port: Port) -> Option<Format>;

    /// Registers after elaboration or after a reset edge.
    fn zero_state(&self) -> Self::State;

    /// Apply one clock edge. With `reset` asserted every register clears.
    fn advance(&self, state: &Self::State, inputs: &CellInputs, reset: bool) -> Self::State;

    /// Output register contents of `state`.
    fn outputs(&self, state: &Self::State) -> CellOutputs;

    fn intermediates(&self) -> Vec<Intermediate>;

    fn narrowings(&self) -> Vec<Narrowing>;
}

/// Either cell kind, for configuration-driven callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyCell {
    Edge(EdgeCell),
    Interior(InteriorCell),
}

impl AnyCell {
    pub fn kind(&self) -> CellKind {
        match self {
            AnyCell::Edge(cell) => cell.kind(),
            AnyCell::Interior(cell) => cell.kind(),
        }
    }

    pub fn input_formats(&self) -> InputFormats {
        match self {
            AnyCell::Edge(cell) => cell.input_formats(),
            AnyCell::Interior(cell) => cell.input_formats(),
        }
    }

    pub fn intermediates(&self) -> Vec<Intermediate> {
        match self {
            AnyCell::Edge(cell) => cell.intermediates(),
            AnyCell::Interior(cell) => cell.intermediates(),
        }
    }

    pub fn narrowings(&self) -> Vec<Narrowing> {
        match self {
            AnyCell::Edge(cell) => cell.narrowings(),
            AnyCell::Interior(cell) => cell.narrowings(),
        }
    }
}
