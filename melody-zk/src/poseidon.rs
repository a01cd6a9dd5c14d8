//! Poseidon commitment hash with one round schedule and two evaluators.
//!
//! The permutation and sponge below are written once, generically over a
//! [`SpongeLane`]. `Fr` gives the native evaluator used to compute commitments;
//! `FpVar<Fr>` gives the in-circuit evaluator whose arithmetic becomes R1CS
//! constraints. Both read the same table from [`poseidon_config`], so for
//! identical inputs they produce identical outputs.
//!
//! Sponge layout matches arkworks' `PoseidonSponge`: capacity lanes first, then
//! rate lanes; inputs are added into the rate lanes a chunk at a time with one
//! permutation per chunk, and the digest is the first rate lane.

use crate::constants::poseidon_config;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_ff::{BigInteger, Field, PrimeField, Zero};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::SynthesisError;
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::sync::OnceLock;

/// One state lane of the sponge: either a concrete field element or a circuit variable.
pub trait SpongeLane: Clone {
    type Error;

    fn zero() -> Self;
    fn add(&self, other: &Self) -> Self;
    fn add_constant(&self, c: &Fr) -> Self;
    fn mul_constant(&self, c: &Fr) -> Self;
    fn sbox(&self, alpha: u64) -> Result<Self, Self::Error>;
}

impl SpongeLane for Fr {
    type Error = Infallible;

    fn zero() -> Self {
        <Fr as Zero>::zero()
    }

    fn add(&self, other: &Self) -> Self {
        *self + other
    }

    fn add_constant(&self, c: &Fr) -> Self {
        *self + c
    }

    fn mul_constant(&self, c: &Fr) -> Self {
        *self * c
    }

    fn sbox(&self, alpha: u64) -> Result<Self, Infallible> {
        Ok(self.pow([alpha]))
    }
}

impl SpongeLane for FpVar<Fr> {
    type Error = SynthesisError;

    fn zero() -> Self {
        <FpVar<Fr> as FieldVar<Fr, Fr>>::zero()
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn add_constant(&self, c: &Fr) -> Self {
        self + *c
    }

    fn mul_constant(&self, c: &Fr) -> Self {
        self * *c
    }

    fn sbox(&self, alpha: u64) -> Result<Self, SynthesisError> {
        self.pow_by_constant([alpha])
    }
}

/// Apply the full Poseidon permutation in place.
///
/// Round schedule: `full_rounds / 2` full rounds, `partial_rounds` partial rounds
/// (S-box on lane 0 only), then the remaining full rounds. Each round is
/// add-round-constants, S-box layer, MDS mix.
pub fn permute<L: SpongeLane>(cfg: &PoseidonConfig<Fr>, state: &mut [L]) -> Result<(), L::Error> {
    let half_full = cfg.full_rounds / 2;
    let total = cfg.full_rounds + cfg.partial_rounds;

    for round in 0..total {
        for (lane, c) in state.iter_mut().zip(&cfg.ark[round]) {
            *lane = lane.add_constant(c);
        }

        let is_full = round < half_full || round >= half_full + cfg.partial_rounds;
        if is_full {
            for lane in state.iter_mut() {
                *lane = lane.sbox(cfg.alpha)?;
            }
        } else {
            state[0] = state[0].sbox(cfg.alpha)?;
        }

        let mixed: Vec<L> = cfg
            .mds
            .iter()
            .map(|row| {
                row.iter()
                    .zip(state.iter())
                    .fold(L::zero(), |acc, (m, lane)| acc.add(&lane.mul_constant(m)))
            })
            .collect();
        state.clone_from_slice(&mixed);
    }

    Ok(())
}

/// Absorb `inputs` into a fresh sponge and squeeze one element.
pub fn sponge_hash<L: SpongeLane>(cfg: &PoseidonConfig<Fr>, inputs: &[L]) -> Result<L, L::Error> {
    let mut state = vec![L::zero(); cfg.rate + cfg.capacity];

    if inputs.is_empty() {
        permute(cfg, &mut state)?;
    }

    for chunk in inputs.chunks(cfg.rate) {
        for (i, x) in chunk.iter().enumerate() {
            let lane = cfg.capacity + i;
            state[lane] = state[lane].add(x);
        }
        permute(cfg, &mut state)?;
    }

    Ok(state[cfg.capacity].clone())
}

/// Native evaluation over `Fr`.
pub fn hash(inputs: &[Fr]) -> Fr {
    match sponge_hash(poseidon_config(), inputs) {
        Ok(digest) => digest,
        Err(never) => match never {},
    }
}

/// In-circuit evaluation; every S-box becomes multiplication constraints.
pub fn hash_gadget(inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    sponge_hash(poseidon_config(), inputs)
}

static PARAMS_FINGERPRINT: OnceLock<[u8; 32]> = OnceLock::new();

/// SHA-256 over the round counts, S-box exponent, sponge shape and every
/// round constant and MDS entry.
///
/// Published alongside key artifacts so a drifted constants table is caught
/// on load instead of surfacing as proofs that never verify.
pub fn params_fingerprint() -> [u8; 32] {
    *PARAMS_FINGERPRINT.get_or_init(|| fingerprint_config(poseidon_config()))
}

fn fingerprint_config(cfg: &PoseidonConfig<Fr>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"melody-zk/poseidon-params/v1");
    for n in [cfg.full_rounds, cfg.partial_rounds, cfg.rate, cfg.capacity] {
        hasher.update((n as u64).to_le_bytes());
    }
    hasher.update(cfg.alpha.to_le_bytes());

    for row in cfg.ark.iter().chain(cfg.mds.iter()) {
        hasher.update((row.len() as u64).to_le_bytes());
        for c in row {
            hasher.update(c.into_bigint().to_bytes_be());
        }
    }

    hasher.finalize().into()
}
