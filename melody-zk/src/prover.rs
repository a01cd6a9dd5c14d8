//! Groth16 proving over a pre-generated witness.

use crate::curve::{decode_g1, decode_g2, encode_g1, encode_g2, G1_COMPRESSED_BYTES, G2_COMPRESSED_BYTES};
use crate::error::{ArithmeticError, ProverError};
use crate::keys::MelodyProvingKey;
use crate::witness::Witness;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof};
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Total size of an encoded proof: compressed A, B and C.
pub const PROOF_BYTES: usize = 2 * G1_COMPRESSED_BYTES + G2_COMPRESSED_BYTES;

/// A Groth16 proof `(A: G1, B: G2, C: G1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct MelodyProof(Proof<Bn254>);

impl MelodyProof {
    pub fn from_inner(proof: Proof<Bn254>) -> Self {
        Self(proof)
    }

    pub fn inner(&self) -> &Proof<Bn254> {
        &self.0
    }

    pub fn to_bytes(&self) -> Result<ProofBytes, ArithmeticError> {
        Ok(ProofBytes {
            a: encode_g1(&self.0.a)?,
            b: encode_g2(&self.0.b)?,
            c: encode_g1(&self.0.c)?,
        })
    }

    /// Decode, checking that every point is on its curve and in the prime-order subgroup.
    pub fn from_bytes(bytes: &ProofBytes) -> Result<Self, ArithmeticError> {
        Ok(Self(Proof {
            a: decode_g1(&bytes.a)?,
            b: decode_g2(&bytes.b)?,
            c: decode_g1(&bytes.c)?,
        }))
    }
}

/// Wire form of a proof. Each point is a hex string in JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBytes {
    #[serde(with = "hex_array")]
    pub a: [u8; G1_COMPRESSED_BYTES],
    #[serde(with = "hex_array")]
    pub b: [u8; G2_COMPRESSED_BYTES],
    #[serde(with = "hex_array")]
    pub c: [u8; G1_COMPRESSED_BYTES],
}

impl ProofBytes {
    /// `a || b || c`.
    pub fn to_bytes(&self) -> [u8; PROOF_BYTES] {
        let mut out = [0u8; PROOF_BYTES];
        out[..G1_COMPRESSED_BYTES].copy_from_slice(&self.a);
        out[G1_COMPRESSED_BYTES..G1_COMPRESSED_BYTES + G2_COMPRESSED_BYTES].copy_from_slice(&self.b);
        out[G1_COMPRESSED_BYTES + G2_COMPRESSED_BYTES..].copy_from_slice(&self.c);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArithmeticError> {
        if bytes.len() != PROOF_BYTES {
            return Err(ArithmeticError::MalformedPoint(format!(
                "proof must be {PROOF_BYTES} bytes, got {}",
                bytes.len()
            )));
        }
        let (a, rest) = bytes.split_at(G1_COMPRESSED_BYTES);
        let (b, c) = rest.split_at(G2_COMPRESSED_BYTES);

        let mut out = Self {
            a: [0u8; G1_COMPRESSED_BYTES],
            b: [0u8; G2_COMPRESSED_BYTES],
            c: [0u8; G1_COMPRESSED_BYTES],
        };
        out.a.copy_from_slice(a);
        out.b.copy_from_slice(b);
        out.c.copy_from_slice(c);
        Ok(out)
    }
}

mod hex_array {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        let len = raw.len();
        raw.try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

/// Produce a Groth16 proof for `witness`.
///
/// Fresh blinding factors `r, s` are drawn from `rng` for every call, so two
/// proofs of the same statement differ.
pub fn prove<R: RngCore + CryptoRng>(
    pk: &MelodyProvingKey,
    witness: &Witness,
    rng: &mut R,
) -> Result<MelodyProof, ProverError> {
    let circuit = pk.circuit();

    if witness.num_instance_variables() != circuit.num_instance_variables() {
        return Err(ProverError::ShapeMismatch {
            what: "instance assignment",
            expected: circuit.num_instance_variables(),
            got: witness.num_instance_variables(),
        });
    }
    if witness.num_witness_variables() != circuit.num_witness_variables() {
        return Err(ProverError::ShapeMismatch {
            what: "witness assignment",
            expected: circuit.num_witness_variables(),
            got: witness.num_witness_variables(),
        });
    }
    if witness.circuit_digest() != pk.digest() {
        return Err(ProverError::CircuitMismatch {
            witness: witness.circuit_digest().to_string(),
            key: pk.digest().to_string(),
        });
    }

    let r = Fr::rand(rng);
    let s = Fr::rand(rng);

    let proof = Groth16::<Bn254>::create_proof_with_reduction_and_matrices(
        pk.inner(),
        r,
        s,
        circuit.matrices(),
        circuit.num_instance_variables(),
        circuit.num_constraints(),
        &witness.full_assignment(),
    )
    .map_err(|e| ProverError::Backend(e.to_string()))?;

    tracing::debug!(digest = %pk.digest(), "groth16 proof generated");
    Ok(MelodyProof(proof))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitDigest;
    use crate::keys::KeyMaterial;
    use crate::melody::{compute_commitment, Melody, Salt};
    use crate::witness::{generate_witness, PrivateInputs, PublicInputs};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn honest_witness(keys: &KeyMaterial) -> Witness {
        let melody = Melody::new([60, 62, 64, 65, 67, 69, 71, 72]).unwrap();
        let salt = Salt::from_scalar(Fr::from(99u64));
        let expected_hash = compute_commitment(&melody, &salt);
        generate_witness(
            keys.circuit(),
            &PrivateInputs { melody, salt },
            &PublicInputs { expected_hash },
        )
        .unwrap()
    }

    #[test]
    fn mismatched_witness_is_refused_before_proving() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let keys = KeyMaterial::generate(&mut rng).unwrap();
        let pk = keys.proving_key();

        let honest = honest_witness(&keys);
        assert!(prove(pk, &honest, &mut rng).is_ok());

        let mut short = honest_witness(&keys);
        short.witness.pop();
        let err = prove(pk, &short, &mut rng).unwrap_err();
        assert!(matches!(err, ProverError::ShapeMismatch { what: "witness assignment", .. }));

        let mut extra = honest_witness(&keys);
        extra.instance.push(Fr::from(1u64));
        let err = prove(pk, &extra, &mut rng).unwrap_err();
        assert_eq!(
            err,
            ProverError::ShapeMismatch {
                what: "instance assignment",
                expected: 2,
                got: 3,
            }
        );

        let mut foreign = honest_witness(&keys);
        foreign.digest = CircuitDigest([0u8; 32]);
        let err = prove(pk, &foreign, &mut rng).unwrap_err();
        assert!(matches!(err, ProverError::CircuitMismatch { .. }));
    }

    #[test]
    fn proof_bytes_concatenate_in_order() {
        let pb = ProofBytes {
            a: [1u8; G1_COMPRESSED_BYTES],
            b: [2u8; G2_COMPRESSED_BYTES],
            c: [3u8; G1_COMPRESSED_BYTES],
        };
        let flat = pb.to_bytes();
        assert_eq!(flat.len(), 128);
        assert_eq!(flat[0], 1);
        assert_eq!(flat[32], 2);
        assert_eq!(flat[96], 3);
        assert_eq!(ProofBytes::from_bytes(&flat).unwrap(), pb);
        assert!(ProofBytes::from_bytes(&flat[..127]).is_err());
    }

    #[test]
    fn proof_bytes_json_is_hex() {
        let pb = ProofBytes {
            a: [0xaa; G1_COMPRESSED_BYTES],
            b: [0xbb; G2_COMPRESSED_BYTES],
            c: [0xcc; G1_COMPRESSED_BYTES],
        };
        let v = serde_json::to_value(&pb).unwrap();
        assert_eq!(v["a"], "aa".repeat(32));
        assert_eq!(v["b"], "bb".repeat(64));

        let back: ProofBytes = serde_json::from_value(v).unwrap();
        assert_eq!(back, pb);

        let short = serde_json::json!({ "a": "aa", "b": "bb".repeat(64), "c": "cc".repeat(32) });
        assert!(serde_json::from_value::<ProofBytes>(short).is_err());
    }

    #[test]
    fn garbage_points_are_rejected() {
        let pb = ProofBytes {
            a: [0xff; G1_COMPRESSED_BYTES],
            b: [0xff; G2_COMPRESSED_BYTES],
            c: [0xff; G1_COMPRESSED_BYTES],
        };
        assert!(matches!(MelodyProof::from_bytes(&pb), Err(ArithmeticError::MalformedPoint(_))));
    }
}
