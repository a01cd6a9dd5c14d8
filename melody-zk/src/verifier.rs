//! Groth16 verification for the melody circuit.
//!
//! Checks `e(A, B) · e(acc, -γ) · e(C, -δ) == e(α, β)` with
//! `acc = IC_0 + Σ x_i · IC_i`, using one multi-pairing and a cached `e(α, β)`.

use crate::circuit::CircuitDigest;
use crate::curve::{linear_combination, pairing_product_equals};
use crate::error::VerifierError;
use crate::field::Scalar;
use crate::prover::MelodyProof;
use ark_bn254::{Bn254, G2Affine};
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ec::CurveGroup;
use ark_groth16::VerifyingKey;

/// Verifying key with the pairing-side precomputation done once.
#[derive(Clone, Debug)]
pub struct MelodyVerifyingKey {
    vk: VerifyingKey<Bn254>,
    alpha_beta: PairingOutput<Bn254>,
    neg_gamma: G2Affine,
    neg_delta: G2Affine,
    digest: CircuitDigest,
}

impl MelodyVerifyingKey {
    /// Callers check the input-base count first (see `keys::check_vk_shape`).
    pub(crate) fn new(vk: VerifyingKey<Bn254>, digest: CircuitDigest) -> Self {
        let alpha_beta = Bn254::pairing(vk.alpha_g1, vk.beta_g2);
        let neg_gamma = -vk.gamma_g2;
        let neg_delta = -vk.delta_g2;
        Self {
            vk,
            alpha_beta,
            neg_gamma,
            neg_delta,
            digest,
        }
    }

    pub fn inner(&self) -> &VerifyingKey<Bn254> {
        &self.vk
    }

    pub fn digest(&self) -> CircuitDigest {
        self.digest
    }

    /// Number of public inputs this key expects.
    pub fn num_public_inputs(&self) -> usize {
        self.vk.gamma_abc_g1.len().saturating_sub(1)
    }
}

/// Verify `proof` against `public_inputs`.
///
/// `Ok(false)` is an ordinary rejection (wrong melody, wrong hash, tampered proof).
/// Only a wrong-length input vector is an error.
pub fn verify(
    vk: &MelodyVerifyingKey,
    public_inputs: &[Scalar],
    proof: &MelodyProof,
) -> Result<bool, VerifierError> {
    let expected = vk.num_public_inputs();
    if public_inputs.len() != expected {
        return Err(VerifierError::InputShapeMismatch {
            expected,
            got: public_inputs.len(),
        });
    }

    let Some((ic0, bases)) = vk.vk.gamma_abc_g1.split_first() else {
        return Err(VerifierError::MalformedKey("no input bases".to_string()));
    };
    let acc = (linear_combination(bases, public_inputs)? + ic0).into_affine();

    let inner = proof.inner();
    let ok = pairing_product_equals(
        &[inner.a, acc, inner.c],
        &[inner.b, vk.neg_gamma, vk.neg_delta],
        &vk.alpha_beta,
    )?;

    if !ok {
        tracing::debug!("groth16 pairing check failed");
    }
    Ok(ok)
}
