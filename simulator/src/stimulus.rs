// stimulus.rs — Seeded random input generation
//
// Draws every input uniformly over the full representable range of its
// port format. The same seed and formats always yield the same sequence.

use num_bigint::RandBigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cell::{CellInputs, InputFormats};
use crate::fixed::{Fixed, Format};

/// Draw one value uniformly from the representable range of `format`.
pub fn random_fixed<R: Rng + ?Sized>(rng: &mut R, format: Format) -> Fixed {
    let raw = rng.gen_bigint_range(&format.raw_min(), &(format.raw_max() + 1u32));
    Fixed::from_raw(format, raw).unwrap_or_else(|| Fixed::zero(format))
}

/// Endless stream of random input triples for one cell.
pub struct Stimulus {
    rng: StdRng,
    formats: InputFormats,
}

impl Stimulus {
    pub fn new(formats: InputFormats, seed: u64) -> Self {
        Stimulus {
            rng: StdRng::seed_from_u64(seed),
            formats,
        }
    }

    pub fn next_inputs(&mut self) -> CellInputs {
        CellInputs {
            nw: random_fixed(&mut self.rng, self.formats.nw),
            ne: random_fixed(&mut self.rng, self.formats.ne),
            s: random_fixed(&mut self.rng, self.formats.s),
        }
    }
}

impl Iterator for Stimulus {
    type Item = CellInputs;

    fn next(&mut self) -> Option<CellInputs> {
        Some(self.next_inputs())
    }
}
