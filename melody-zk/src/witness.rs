//! Witness generation: evaluate every signal of the melody circuit for one
//! concrete (melody, salt, commitment) triple.

use crate::circuit::{CircuitDigest, CompiledCircuit, MelodyCircuit};
use crate::error::WitnessError;
use crate::field::Scalar;
use crate::melody::{Commitment, Melody, Salt};
use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, OptimizationGoal};
use std::fmt;

/// The prover's secrets.
#[derive(Clone)]
pub struct PrivateInputs {
    pub melody: Melody,
    pub salt: Salt,
}

impl fmt::Debug for PrivateInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateInputs(<redacted>)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub expected_hash: Commitment,
}

impl PublicInputs {
    /// Field elements in `new_input` allocation order.
    pub fn to_scalars(&self) -> Vec<Scalar> {
        crate::circuit::public_inputs(&self.expected_hash)
    }
}

/// A full satisfying assignment.
///
/// Holds the private notes and salt in clear; it is deliberately not
/// serializable and its `Debug` prints only sizes.
pub struct Witness {
    /// Instance assignment, starting with the constant `1`.
    pub(crate) instance: Vec<Fr>,
    pub(crate) witness: Vec<Fr>,
    pub(crate) digest: CircuitDigest,
}

impl Witness {
    /// Public inputs without the leading constant.
    pub fn public_inputs(&self) -> &[Fr] {
        &self.instance[1..]
    }

    /// `instance || witness`, the layout the Groth16 prover consumes.
    pub fn full_assignment(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(self.instance.len() + self.witness.len());
        out.extend_from_slice(&self.instance);
        out.extend_from_slice(&self.witness);
        out
    }

    pub fn num_instance_variables(&self) -> usize {
        self.instance.len()
    }

    pub fn num_witness_variables(&self) -> usize {
        self.witness.len()
    }

    /// Digest of the circuit this witness was generated against.
    pub fn circuit_digest(&self) -> CircuitDigest {
        self.digest
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("instance_len", &self.instance.len())
            .field("witness_len", &self.witness.len())
            .finish()
    }
}

/// Synthesize the circuit with concrete values and check every constraint.
///
/// A melody or salt that does not hash to `public.expected_hash` yields
/// `UnsatisfiableConstraint`; no witness is ever returned for an unsatisfied
/// system.
pub fn generate_witness(
    compiled: &CompiledCircuit,
    private: &PrivateInputs,
    public: &PublicInputs,
) -> Result<Witness, WitnessError> {
    let circuit = MelodyCircuit::new(&private.melody, &private.salt, &public.expected_hash);

    let cs = ConstraintSystem::<Fr>::new_ref();
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    circuit
        .generate_constraints(cs.clone())
        .map_err(|e| WitnessError::Synthesis(e.to_string()))?;

    let satisfied = cs.is_satisfied().map_err(|e| WitnessError::Synthesis(e.to_string()))?;
    if !satisfied {
        // Naming the failing constraint needs a ConstraintLayer subscriber; only the outcome is reported.
        tracing::debug!(constraints = cs.num_constraints(), "witness rejected: constraint system unsatisfied");
        return Err(WitnessError::UnsatisfiableConstraint { constraint: None });
    }

    cs.finalize();

    let (instance, witness) = {
        let inner = cs
            .borrow()
            .ok_or_else(|| WitnessError::Synthesis("constraint system has no state".to_string()))?;
        (inner.instance_assignment.clone(), inner.witness_assignment.clone())
    };

    if instance.len() != compiled.num_instance_variables() {
        return Err(WitnessError::ShapeMismatch {
            what: "instance assignment",
            expected: compiled.num_instance_variables(),
            got: instance.len(),
        });
    }
    if witness.len() != compiled.num_witness_variables() {
        return Err(WitnessError::ShapeMismatch {
            what: "witness assignment",
            expected: compiled.num_witness_variables(),
            got: witness.len(),
        });
    }

    Ok(Witness {
        instance,
        witness,
        digest: compiled.digest(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melody::compute_commitment;

    fn inputs(notes: [u32; 8], salt: &str) -> PrivateInputs {
        PrivateInputs {
            melody: Melody::new(notes).unwrap(),
            salt: Salt::parse(salt).unwrap(),
        }
    }

    #[test]
    fn honest_inputs_produce_a_witness() {
        let compiled = CompiledCircuit::compile().unwrap();
        let private = inputs([60, 62, 64, 65, 67, 69, 71, 72], "0x1234567890abcdef1234567890abcdef");
        let public = PublicInputs {
            expected_hash: compute_commitment(&private.melody, &private.salt),
        };

        let w = generate_witness(&compiled, &private, &public).unwrap();
        assert_eq!(w.public_inputs(), public.to_scalars().as_slice());
        assert_eq!(w.num_instance_variables(), compiled.num_instance_variables());
        assert_eq!(w.num_witness_variables(), compiled.num_witness_variables());
        assert_eq!(w.full_assignment().len(), w.num_instance_variables() + w.num_witness_variables());
        assert_eq!(w.full_assignment()[0], Fr::from(1u64));
        assert_eq!(w.circuit_digest(), compiled.digest());
    }

    #[test]
    fn mismatched_melody_is_unsatisfiable() {
        let compiled = CompiledCircuit::compile().unwrap();
        let owner = inputs([60, 62, 64, 65, 67, 69, 71, 72], "99");
        let public = PublicInputs {
            expected_hash: compute_commitment(&owner.melody, &owner.salt),
        };

        let impostor = inputs([61, 63, 65, 67, 69, 71, 73, 75], "99");
        let err = generate_witness(&compiled, &impostor, &public).unwrap_err();
        assert_eq!(err, WitnessError::UnsatisfiableConstraint { constraint: None });

        let wrong_salt = inputs([60, 62, 64, 65, 67, 69, 71, 72], "100");
        assert!(matches!(
            generate_witness(&compiled, &wrong_salt, &public),
            Err(WitnessError::UnsatisfiableConstraint { .. })
        ));
    }

    #[test]
    fn debug_output_hides_values() {
        let compiled = CompiledCircuit::compile().unwrap();
        let private = inputs([60, 62, 64, 65, 67, 69, 71, 72], "424242");
        let public = PublicInputs {
            expected_hash: compute_commitment(&private.melody, &private.salt),
        };
        let w = generate_witness(&compiled, &private, &public).unwrap();

        let rendered = format!("{w:?} {private:?}");
        assert!(!rendered.contains("424242"));
        assert!(rendered.contains("witness_len"));
    }
}
