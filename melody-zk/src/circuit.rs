//! R1CS circuit for proving knowledge of a melody preimage.
//!
//! What this circuit proves:
//! 1) The prover knows 8 private notes and a private salt.
//! 2) Every note fits in 7 bits (a valid MIDI number).
//! 3) Poseidon(notes || salt) equals the public `expected_hash`.
//!
//! Privacy: notes and salt are witnesses (never public). Only the hash is public.

use crate::constants::{CIRCUIT_ID, MELODY_LENGTH, NOTE_BITS};
use crate::error::ZkError;
use crate::field::Scalar;
use crate::melody::{Commitment, Melody, Salt};
use crate::poseidon::{hash_gadget, params_fingerprint};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{
    ConstraintMatrices, ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, OptimizationGoal,
    SynthesisError, SynthesisMode,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Convert little-endian boolean bits into an FpVar.
fn bits_le_to_fp(bits_le: &[Boolean<Fr>]) -> FpVar<Fr> {
    let mut acc = FpVar::<Fr>::zero();
    let mut coeff = Fr::from(1u64);

    for b in bits_le {
        acc += FpVar::from(b.clone()) * coeff;
        coeff = coeff + coeff;
    }

    acc
}

/// Enforce that `v` fits in `NOTE_BITS` bits.
///
/// The bits are fresh boolean witnesses computed from `value`; recomposing them
/// and enforcing equality with `v` rules out any note above 127.
fn constrain_note(cs: ConstraintSystemRef<Fr>, v: &FpVar<Fr>, value: Option<Fr>) -> Result<(), SynthesisError> {
    let low = value.map(|x| x.into_bigint().as_ref()[0]);

    let mut bits = Vec::with_capacity(NOTE_BITS);
    for i in 0..NOTE_BITS {
        let bit = Boolean::new_witness(cs.clone(), || {
            low.map(|n| (n >> i) & 1 == 1).ok_or(SynthesisError::AssignmentMissing)
        })?;
        bits.push(bit);
    }

    bits_le_to_fp(&bits).enforce_equal(v)
}

/// Circuit proving `Poseidon(notes || salt) == expected_hash`.
///
/// All assignments are `Option` so the same struct drives key generation (blank)
/// and witness generation (filled). The constraint topology never depends on them.
#[derive(Clone)]
pub struct MelodyCircuit {
    /// Private notes.
    pub notes: Option<[Fr; MELODY_LENGTH]>,

    /// Private salt.
    pub salt: Option<Fr>,

    /// Public commitment the notes and salt must hash to.
    pub expected_hash: Option<Fr>,
}

impl MelodyCircuit {
    pub fn new(melody: &Melody, salt: &Salt, expected: &Commitment) -> Self {
        Self {
            notes: Some(melody.to_scalars()),
            salt: Some(*salt.as_scalar()),
            expected_hash: Some(*expected.as_scalar()),
        }
    }

    /// Circuit with no assignment, for setup and compilation.
    pub fn blank() -> Self {
        Self {
            notes: None,
            salt: None,
            expected_hash: None,
        }
    }
}

impl fmt::Debug for MelodyCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MelodyCircuit")
            .field("assigned", &self.notes.is_some())
            .finish_non_exhaustive()
    }
}

impl ConstraintSynthesizer<Fr> for MelodyCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // --- Public input ---
        // IMPORTANT: this is the only `new_input`; the verifier's public-input vector is `[expected_hash]`.
        let expected = FpVar::<Fr>::new_input(cs.clone(), || self.expected_hash.ok_or(SynthesisError::AssignmentMissing))?;

        // --- Witness: notes, then salt ---
        let mut hash_inputs = Vec::with_capacity(MELODY_LENGTH + 1);
        for i in 0..MELODY_LENGTH {
            let value = self.notes.map(|n| n[i]);
            let note = FpVar::<Fr>::new_witness(cs.clone(), || value.ok_or(SynthesisError::AssignmentMissing))?;
            constrain_note(cs.clone(), &note, value)?;
            hash_inputs.push(note);
        }

        let salt = FpVar::<Fr>::new_witness(cs.clone(), || self.salt.ok_or(SynthesisError::AssignmentMissing))?;
        hash_inputs.push(salt);

        // Commitment binding.
        let digest = hash_gadget(&hash_inputs)?;
        digest.enforce_equal(&expected)?;

        Ok(())
    }
}

/// SHA-256 identity of the compiled constraint system.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CircuitDigest(pub [u8; 32]);

impl fmt::Display for CircuitDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for CircuitDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CircuitDigest({self})")
    }
}

impl From<CircuitDigest> for String {
    fn from(d: CircuitDigest) -> Self {
        d.to_string()
    }
}

impl TryFrom<String> for CircuitDigest {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(&s).map_err(|e| format!("invalid digest hex: {e}"))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| "digest must be 32 bytes".to_string())?;
        Ok(Self(arr))
    }
}

/// The melody circuit lowered to R1CS matrices, plus its digest.
///
/// Built once per process; the prover needs the matrices and every key artifact
/// is checked against the digest.
pub struct CompiledCircuit {
    matrices: ConstraintMatrices<Fr>,
    digest: CircuitDigest,
}

impl CompiledCircuit {
    /// Synthesize the blank circuit the same way Groth16 setup does
    /// (setup mode, constraint-minimising goal, inlined linear combinations).
    pub fn compile() -> Result<Self, ZkError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);

        MelodyCircuit::blank()
            .generate_constraints(cs.clone())
            .map_err(|e| ZkError::Setup(format!("circuit synthesis: {e}")))?;
        cs.finalize();

        let matrices = cs
            .to_matrices()
            .ok_or_else(|| ZkError::Setup("constraint matrices unavailable".to_string()))?;
        let digest = digest_matrices(&matrices);

        tracing::debug!(
            constraints = matrices.num_constraints,
            instance_vars = matrices.num_instance_variables,
            witness_vars = matrices.num_witness_variables,
            %digest,
            "compiled melody circuit"
        );

        Ok(Self { matrices, digest })
    }

    pub fn digest(&self) -> CircuitDigest {
        self.digest
    }

    pub fn matrices(&self) -> &ConstraintMatrices<Fr> {
        &self.matrices
    }

    /// Instance variables including the constant `1`.
    pub fn num_instance_variables(&self) -> usize {
        self.matrices.num_instance_variables
    }

    pub fn num_witness_variables(&self) -> usize {
        self.matrices.num_witness_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.matrices.num_constraints
    }

    /// Public inputs the verifier expects (instance variables minus the constant).
    pub fn num_public_inputs(&self) -> usize {
        self.matrices.num_instance_variables - 1
    }
}

fn digest_matrices(m: &ConstraintMatrices<Fr>) -> CircuitDigest {
    let mut hasher = Sha256::new();
    hasher.update(CIRCUIT_ID.as_bytes());
    hasher.update(params_fingerprint());

    for n in [m.num_instance_variables, m.num_witness_variables, m.num_constraints] {
        hasher.update((n as u64).to_le_bytes());
    }

    for matrix in [&m.a, &m.b, &m.c] {
        hasher.update((matrix.len() as u64).to_le_bytes());
        for row in matrix {
            hasher.update((row.len() as u64).to_le_bytes());
            for (coeff, index) in row {
                hasher.update(coeff.into_bigint().to_bytes_be());
                hasher.update((*index as u64).to_le_bytes());
            }
        }
    }

    CircuitDigest(hasher.finalize().into())
}

/// Public-input vector for a commitment, in `new_input` allocation order.
pub fn public_inputs(commitment: &Commitment) -> Vec<Scalar> {
    vec![*commitment.as_scalar()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUM_PUBLIC_INPUTS;
    use crate::melody::compute_commitment;

    fn satisfied(circuit: MelodyCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn c_major() -> Melody {
        Melody::new([60, 62, 64, 65, 67, 69, 71, 72]).unwrap()
    }

    #[test]
    fn honest_assignment_satisfies() {
        let melody = c_major();
        let salt = Salt::parse("0x1234567890abcdef1234567890abcdef").unwrap();
        let h = compute_commitment(&melody, &salt);
        assert!(satisfied(MelodyCircuit::new(&melody, &salt, &h)));
    }

    #[test]
    fn wrong_melody_is_unsatisfiable() {
        let salt = Salt::parse("777").unwrap();
        let h = compute_commitment(&c_major(), &salt);
        let c_sharp = Melody::new([61, 63, 65, 67, 69, 71, 73, 75]).unwrap();
        assert!(!satisfied(MelodyCircuit::new(&c_sharp, &salt, &h)));
    }

    #[test]
    fn out_of_range_note_is_unsatisfiable() {
        // Bypass `Melody` validation and hash the raw values natively.
        let mut notes = c_major().to_scalars();
        notes[0] = Fr::from(200u64);
        let salt = Fr::from(5u64);
        let mut inputs = notes.to_vec();
        inputs.push(salt);
        let h = crate::poseidon::hash(&inputs);

        let circuit = MelodyCircuit {
            notes: Some(notes),
            salt: Some(salt),
            expected_hash: Some(h),
        };
        assert!(!satisfied(circuit));
    }

    #[test]
    fn compiled_shape_is_stable() {
        let a = CompiledCircuit::compile().unwrap();
        let b = CompiledCircuit::compile().unwrap();

        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.num_public_inputs(), NUM_PUBLIC_INPUTS);
        assert_eq!(a.num_constraints(), b.num_constraints());
        assert!(a.num_constraints() > MELODY_LENGTH * NOTE_BITS);
    }

    #[test]
    fn digest_serde_round_trips_as_hex() {
        let d = CircuitDigest([0xab; 32]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<CircuitDigest>(&json).unwrap(), d);
        assert!(serde_json::from_str::<CircuitDigest>("\"abcd\"").is_err());
    }
}
