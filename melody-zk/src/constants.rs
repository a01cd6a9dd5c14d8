//! Crate-wide constants used by the circuit, the commitment hash and the key artifacts.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;
use std::sync::OnceLock;

/// Number of notes in a registered melody.
pub const MELODY_LENGTH: usize = 8;

/// Highest valid MIDI note number.
pub const MIDI_NOTE_MAX: u32 = 127;

/// Bits needed to range-constrain a MIDI note inside the circuit.
pub const NOTE_BITS: usize = 7;

/// Salt width in bytes (128 bits of entropy).
pub const SALT_BYTES: usize = 16;

/// Private circuit inputs: the notes plus the salt.
pub const NUM_PRIVATE_INPUTS: usize = MELODY_LENGTH + 1;

/// Public circuit inputs: the expected commitment.
pub const NUM_PUBLIC_INPUTS: usize = 1;

// Poseidon sponge configuration.
//
// Width 3 (rate 2, capacity 1). The nine hash inputs are absorbed two at a time.
// These inputs to the parameter derivation are pinned: changing any of them changes
// the round-constant table, the circuit digest, and invalidates every key artifact.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Number of leading MDS candidates skipped by the Grain LFSR derivation.
pub const POSEIDON_SKIP_MATRICES: u64 = 0;

/// Expected `poseidon::params_fingerprint()` for the inputs above.
///
/// Setup refuses to run if the derived table hashes to anything else.
pub const POSEIDON_PARAMS_FINGERPRINT: [u8; 32] = [
    0x39, 0xcb, 0xe9, 0x06, 0xec, 0x94, 0x9c, 0xf8,
    0xe8, 0x91, 0xc7, 0x0d, 0x2b, 0x05, 0x43, 0xb0,
    0x8d, 0xf3, 0x8f, 0x3d, 0x86, 0x42, 0x15, 0x25,
    0x83, 0xaa, 0xd6, 0x4e, 0x77, 0xc3, 0xe7, 0x2f,
];

/// Magic bytes at the start of every key artifact.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"MELODYZK";

/// Current key artifact envelope version.
pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

/// File name of the proving key artifact inside a keys directory.
pub const PROVING_KEY_FILE: &str = "melody_pk.bin";

/// File name of the verifying key artifact inside a keys directory.
pub const VERIFYING_KEY_FILE: &str = "melody_vk.bin";

/// Domain tag mixed into the circuit digest.
pub const CIRCUIT_ID: &str = "melody-preimage/v1";

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// The single Poseidon parameter table shared by the native and in-circuit evaluators.
///
/// Derived once per process with arkworks' Grain LFSR helper from the pinned inputs
/// above, then cached.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(|| {
        let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            prime_bits,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            POSEIDON_SKIP_MATRICES,
        );

        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}
