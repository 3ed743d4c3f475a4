// trace.rs — Cycle-by-cycle record of a simulation
//
// One row per tick: the reset level and inputs driven during the cycle, and
// the outputs valid during that same cycle (i.e. before its closing edge).
// Rows render as a text table, as JSON, and as a SHA-256 fingerprint of the
// canonical (compact) JSON.

use std::fmt;

use serde::Serialize;

use crate::cell::{CellInputs, CellKind, CellOutputs, Cycle, Port};
use crate::fixed::Fixed;

/// A port value as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSample {
    pub port: Port,
    pub value: f64,
    /// Two's-complement bit pattern in hex, zero-padded to the port width.
    pub bits: String,
}

impl PortSample {
    pub fn new(port: Port, value: &Fixed) -> Self {
        let digits = value.format().width().div_ceil(4) as usize;
        PortSample {
            port,
            value: value.to_f64(),
            bits: format!("{:0digits$x}", value.to_bits()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub cycle: Cycle,
    pub reset: bool,
    pub inputs: Vec<PortSample>,
    pub outputs: Vec<PortSample>,
}

impl TraceRow {
    pub fn sample(cycle: Cycle, reset: bool, inputs: &CellInputs, outputs: &CellOutputs) -> Self {
        TraceRow {
            cycle,
            reset,
            inputs: inputs.iter().map(|(p, v)| PortSample::new(p, v)).collect(),
            outputs: outputs.iter().map(|(p, v)| PortSample::new(p, v)).collect(),
        }
    }

    pub fn output(&self, port: Port) -> Option<&PortSample> {
        self.outputs.iter().find(|s| s.port == port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub kind: CellKind,
    pub rows: Vec<TraceRow>,
}

impl Trace {
    pub fn new(kind: CellKind) -> Self {
        Trace {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: TraceRow) {
        self.rows.push(row);
    }

    pub fn row(&self, cycle: Cycle) -> Option<&TraceRow> {
        self.rows.iter().find(|r| r.cycle == cycle)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of the compact JSON encoding.
    pub fn fingerprint(&self) -> Result<[u8; 32], serde_json::Error> {
        use sha2::{Digest, Sha256};

        let canonical = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Ok(hash)
    }

    pub fn fingerprint_hex(&self) -> Result<String, serde_json::Error> {
        Ok(bytes_to_hex(&self.fingerprint()?))
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn write_samples(f: &mut fmt::Formatter<'_>, samples: &[PortSample]) -> fmt::Result {
    for (i, s) in samples.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}={}", s.port, s.value)?;
    }
    Ok(())
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {} cell trace: cycle, reset, inputs | outputs", self.kind)?;
        for row in &self.rows {
            let rst = if row.reset { "R" } else { "-" };
            write!(f, "{:>6} {} ", row.cycle, rst)?;
            write_samples(f, &row.inputs)?;
            write!(f, " | ")?;
            write_samples(f, &row.outputs)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::InputFormats;
    use crate::fixed::Format;

    fn row(cycle: u64, reset: bool, nw: f64) -> TraceRow {
        let f = Format::new(4, 4).unwrap();
        let mut inputs = CellInputs::zero(&InputFormats::uniform(f));
        inputs.nw = Fixed::from_f64(nw, f);
        let outputs = CellOutputs {
            se: None,
            sw: Fixed::zero(f),
            n: Fixed::from_f64(-1.5, f),
        };
        TraceRow::sample(Cycle(cycle), reset, &inputs, &outputs)
    }

    #[test]
    fn samples_carry_padded_bits() {
        let s = PortSample::new(Port::N, &Fixed::from_f64(-1.5, Format::new(4, 4).unwrap()));
        assert_eq!(s.bits, "e8");
        let wide = PortSample::new(Port::N, &Fixed::from_f64(1.0, Format::new(5, 4).unwrap()));
        assert_eq!(wide.bits, "010");
        let f = Format::new(64, 64).unwrap();
        let min = PortSample::new(Port::N, &Fixed::from_f64(f.min_value(), f));
        assert_eq!(min.bits, format!("8{}", "0".repeat(31)));
    }

    #[test]
    fn display_lists_rows() {
        let mut trace = Trace::new(CellKind::Interior);
        trace.push(row(0, true, 0.0));
        trace.push(row(1, false, 1.5));
        let text = trace.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "     0 R nw=0 ne=0 s=0 | sw=0 n=-1.5");
        assert_eq!(lines[2], "     1 - nw=1.5 ne=0 s=0 | sw=0 n=-1.5");
    }

    #[test]
    fn json_names_ports_in_lowercase() {
        let mut trace = Trace::new(CellKind::Edge);
        trace.push(row(3, false, 0.5));
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"kind\": \"edge\""));
        assert!(json.contains("\"port\": \"nw\""));
        assert!(json.contains("\"cycle\": 3"));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut a = Trace::new(CellKind::Edge);
        a.push(row(0, false, 0.5));
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.push(row(1, false, 0.5));
        assert_ne!(a.fingerprint_hex().unwrap(), b.fingerprint_hex().unwrap());
        assert_eq!(a.fingerprint_hex().unwrap().len(), 64);
    }
}
