//! BN254 group helpers: compressed point codecs, MSM and the pairing-product check
//! the verifier is built on.

use crate::error::ArithmeticError;
use crate::field::Scalar;
use ark_bn254::{Bn254, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ec::VariableBaseMSM;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

/// Compressed G1 encoding width.
pub const G1_COMPRESSED_BYTES: usize = 32;

/// Compressed G2 encoding width.
pub const G2_COMPRESSED_BYTES: usize = 64;

pub fn encode_g1(p: &G1Affine) -> Result<[u8; G1_COMPRESSED_BYTES], ArithmeticError> {
    let mut out = [0u8; G1_COMPRESSED_BYTES];
    p.serialize_compressed(&mut out[..])
        .map_err(|e| ArithmeticError::MalformedPoint(format!("g1 encode: {e}")))?;
    Ok(out)
}

/// Decode a compressed G1 point. Checks the curve equation and subgroup membership.
pub fn decode_g1(bytes: &[u8]) -> Result<G1Affine, ArithmeticError> {
    if bytes.len() != G1_COMPRESSED_BYTES {
        return Err(ArithmeticError::MalformedPoint(format!(
            "g1 point must be {G1_COMPRESSED_BYTES} bytes, got {}",
            bytes.len()
        )));
    }
    G1Affine::deserialize_compressed(bytes).map_err(|e| ArithmeticError::MalformedPoint(format!("g1: {e}")))
}

pub fn encode_g2(p: &G2Affine) -> Result<[u8; G2_COMPRESSED_BYTES], ArithmeticError> {
    let mut out = [0u8; G2_COMPRESSED_BYTES];
    p.serialize_compressed(&mut out[..])
        .map_err(|e| ArithmeticError::MalformedPoint(format!("g2 encode: {e}")))?;
    Ok(out)
}

/// Decode a compressed G2 point. Checks the curve equation and subgroup membership.
pub fn decode_g2(bytes: &[u8]) -> Result<G2Affine, ArithmeticError> {
    if bytes.len() != G2_COMPRESSED_BYTES {
        return Err(ArithmeticError::MalformedPoint(format!(
            "g2 point must be {G2_COMPRESSED_BYTES} bytes, got {}",
            bytes.len()
        )));
    }
    G2Affine::deserialize_compressed(bytes).map_err(|e| ArithmeticError::MalformedPoint(format!("g2: {e}")))
}

/// `sum(scalars[i] * bases[i])`.
pub fn linear_combination(bases: &[G1Affine], scalars: &[Scalar]) -> Result<G1Projective, ArithmeticError> {
    if bases.len() != scalars.len() {
        return Err(ArithmeticError::LengthMismatch {
            bases: bases.len(),
            scalars: scalars.len(),
        });
    }
    G1Projective::msm(bases, scalars).map_err(|_| ArithmeticError::LengthMismatch {
        bases: bases.len(),
        scalars: scalars.len(),
    })
}

/// Check `prod e(g1s[i], g2s[i]) == target` with a single final exponentiation.
pub fn pairing_product_equals(
    g1s: &[G1Affine],
    g2s: &[G2Affine],
    target: &PairingOutput<Bn254>,
) -> Result<bool, ArithmeticError> {
    if g1s.len() != g2s.len() {
        return Err(ArithmeticError::LengthMismatch {
            bases: g1s.len(),
            scalars: g2s.len(),
        });
    }
    let product = Bn254::multi_pairing(g1s.iter().copied(), g2s.iter().copied());
    Ok(product == *target)
}
