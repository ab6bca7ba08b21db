//! Random soft targets for one epoch
//!
//! Every free scalar variable gets a uniformly random target value, expressed
//! as unit-weight soft constraints. The optimizer then maximizes the number
//! of targets it satisfies, which pulls the next model towards a random
//! corner of the solution space.

use crate::error::{Result, SamplerError};
use crate::formula::{SortKind, Variable};
use crate::oracle::{Backend, ConstraintOracle, SoftConstraint};
use crate::sampling::config::BitVecTargeting;
use num_bigint::{BigInt, BigUint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest integer magnitude drawn for Int targets
pub const MAX_INT_TARGET: i32 = i32::MAX;

/// Random `width`-bit numeral as hex digits, most significant first.
///
/// Bits that do not fill a whole hex digit come first, as one leading digit
/// masked to the remaining `width % 4` bits, so the numeral never exceeds
/// `width` bits.
pub fn random_bitvec_hex<R: Rng>(rng: &mut R, width: u32) -> String {
    let mut hex = String::new();
    let mut remaining = width;

    let partial = width % 4;
    if partial != 0 {
        let digit = rng.random_range(0..(1u32 << partial));
        hex.push_str(&format!("{:x}", digit));
        remaining -= partial;
    }
    while remaining > 0 {
        hex.push_str(&format!("{:x}", rng.random_range(0..16u32)));
        remaining -= 4;
    }
    hex
}

/// Random value of a `width`-bit vector
pub fn random_bitvec<R: Rng>(rng: &mut R, width: u32) -> BigUint {
    let hex = random_bitvec_hex(rng, width);
    BigUint::parse_bytes(hex.as_bytes(), 16).unwrap_or_default()
}

/// Generator of per-epoch random targets
#[derive(Debug)]
pub struct RandomAssignmentGenerator {
    rng: ChaCha8Rng,
    targeting: BitVecTargeting,
}

impl RandomAssignmentGenerator {
    pub fn new(targeting: BitVecTargeting, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self { rng, targeting }
    }

    pub fn targeting(&self) -> BitVecTargeting {
        self.targeting
    }

    /// Draw one round of targets for `variables`.
    ///
    /// Arrays and uninterpreted functions are never targeted. A Real
    /// variable has no random target and is rejected.
    pub fn targets(&mut self, variables: &[Variable]) -> Result<Vec<SoftConstraint>> {
        let mut targets = Vec::new();

        for var in variables {
            match var.kind {
                SortKind::Array | SortKind::UninterpretedFunction(_) => continue,
                SortKind::Boolean => targets.push(SoftConstraint::Bool {
                    var: var.name.clone(),
                    value: self.rng.random_bool(0.5),
                }),
                SortKind::BitVector(width) => match self.targeting {
                    BitVecTargeting::PerBit => {
                        for index in 0..width {
                            targets.push(SoftConstraint::Bit {
                                var: var.name.clone(),
                                width,
                                index,
                                value: self.rng.random_bool(0.5),
                            });
                        }
                    }
                    BitVecTargeting::WholeValue => targets.push(SoftConstraint::BitVec {
                        var: var.name.clone(),
                        width,
                        value: random_bitvec(&mut self.rng, width),
                    }),
                },
                SortKind::Integer => {
                    let magnitude = BigInt::from(self.rng.random_range(0..=MAX_INT_TARGET));
                    let value = if self.rng.random_bool(0.5) {
                        magnitude
                    } else {
                        -magnitude
                    };
                    targets.push(SoftConstraint::Int {
                        var: var.name.clone(),
                        value,
                    });
                }
                SortKind::Real => return Err(SamplerError::invalid_sort(&var.name, "Real")),
            }
        }

        Ok(targets)
    }

    /// Draw targets and assert them on the optimizing side of `oracle`.
    /// Returns the number of soft constraints asserted.
    pub fn generate<B: Backend>(
        &mut self,
        oracle: &mut ConstraintOracle<B>,
        variables: &[Variable],
    ) -> Result<usize> {
        let targets = self.targets(variables)?;
        for target in &targets {
            oracle.assert_soft(target)?;
        }
        log::debug!("Asserted {} soft targets", targets.len());
        Ok(targets.len())
    }
}
