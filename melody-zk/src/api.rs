//! Boundary functions: what a service layer or a registry calls.

use crate::constants::MELODY_LENGTH;
use crate::error::{InputError, ZkError};
use crate::field::{serde_scalar, serde_scalar_vec, Scalar};
use crate::keys::KeyMaterial;
use crate::melody::{self, Commitment, Melody, Salt};
use crate::prover::{prove, MelodyProof, ProofBytes};
use crate::verifier::{verify, MelodyVerifyingKey};
use crate::witness::{generate_witness, PrivateInputs, PublicInputs};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commitment for raw MIDI numbers and a salt.
pub fn compute_commitment(notes: [u32; MELODY_LENGTH], salt: Scalar) -> Result<Scalar, InputError> {
    let melody = Melody::new(notes)?;
    let commitment = melody::compute_commitment(&melody, &Salt::from_scalar(salt));
    Ok(*commitment.as_scalar())
}

/// Proof request: the private melody and salt plus the public hash they must match.
#[derive(Clone, Deserialize)]
pub struct ProofRequest {
    pub notes: [u32; MELODY_LENGTH],
    #[serde(with = "serde_scalar")]
    pub salt: Scalar,
    #[serde(with = "serde_scalar")]
    pub expected_hash: Scalar,
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("notes", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("expected_hash", &crate::field::scalar_to_decimal(&self.expected_hash))
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub proof: ProofBytes,
    #[serde(with = "serde_scalar_vec")]
    pub public_inputs: Vec<Scalar>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(with = "serde_scalar_vec")]
    pub public_inputs: Vec<Scalar>,
    pub proof: ProofBytes,
}

/// Validate, build the witness and prove.
///
/// A melody/salt that does not hash to `expected_hash` fails at witness
/// generation with an unsatisfiable-constraint error; no proof is produced.
pub fn prove_request<R: RngCore + CryptoRng>(
    keys: &KeyMaterial,
    req: &ProofRequest,
    rng: &mut R,
) -> Result<ProofResponse, ZkError> {
    let private = PrivateInputs {
        melody: Melody::new(req.notes)?,
        salt: Salt::from_scalar(req.salt),
    };
    let public = PublicInputs {
        expected_hash: Commitment::from_scalar(req.expected_hash),
    };

    let witness = generate_witness(keys.circuit(), &private, &public)?;
    let proof = prove(keys.proving_key(), &witness, rng)?;

    Ok(ProofResponse {
        proof: proof.to_bytes()?,
        public_inputs: witness.public_inputs().to_vec(),
    })
}

/// Decode the proof and run the pairing check.
pub fn verify_request(vk: &MelodyVerifyingKey, req: &VerifyRequest) -> Result<bool, ZkError> {
    let proof = MelodyProof::from_bytes(&req.proof)?;
    Ok(verify(vk, &req.public_inputs, &proof)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;

    #[test]
    fn commitment_rejects_bad_notes() {
        let salt = Fr::from(1u64);
        assert!(compute_commitment([60, 62, 64, 65, 67, 69, 71, 72], salt).is_ok());
        assert_eq!(
            compute_commitment([60, 62, 64, 65, 67, 69, 71, 300], salt),
            Err(InputError::NoteOutOfRange { index: 7, value: 300 })
        );
    }

    #[test]
    fn proof_request_parses_and_redacts() {
        let req: ProofRequest = serde_json::from_str(
            r#"{"notes":[60,62,64,65,67,69,71,72],"salt":"0xabc","expected_hash":"12345"}"#,
        )
        .unwrap();
        assert_eq!(req.salt, Fr::from(0xabcu64));

        let rendered = format!("{req:?}");
        assert!(rendered.contains("12345"));
        assert!(!rendered.contains("2748"));
        assert!(!rendered.contains("60"));

        assert!(serde_json::from_str::<ProofRequest>(r#"{"notes":[60],"salt":"1","expected_hash":"1"}"#).is_err());
    }
}
