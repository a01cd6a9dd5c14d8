//! Zero-knowledge melody ownership.
//!
//! This crate contains:
//! - A Poseidon commitment over eight MIDI notes and a secret salt.
//! - An R1CS circuit proving knowledge of a melody that hashes to a public commitment.
//! - Witness generation, Groth16 setup, proving and verification on BN254.
//! - A versioned key artifact format bound to the circuit it was generated for.

pub mod api;
pub mod circuit;
pub mod constants;
pub mod curve;
pub mod error;
pub mod field;
pub mod keys;
pub mod melody;
pub mod poseidon;
pub mod prover;
pub mod verifier;
pub mod witness;

pub use circuit::{CircuitDigest, CompiledCircuit, MelodyCircuit};
pub use error::{ErrorClass, ZkError};
pub use field::Scalar;
pub use keys::{setup, KeyMaterial, MelodyProvingKey};
pub use melody::{compute_commitment, Commitment, Melody, Salt};
pub use prover::{prove, MelodyProof, ProofBytes};
pub use verifier::{verify, MelodyVerifyingKey};
pub use witness::{generate_witness, PrivateInputs, PublicInputs, Witness};
