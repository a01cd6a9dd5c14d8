//! End-to-end tests for the melody ownership proof.
//!
//! These exercise the whole pipeline: commitment, witness generation, Groth16
//! proving and verification, and the key artifact round trip through disk.
//! Key setup is the slow step, so one key pair is generated per test binary
//! and shared read-only.

use std::sync::OnceLock;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use melody_zk::api::{prove_request, verify_request, ProofRequest, VerifyRequest};
use melody_zk::constants::{PROVING_KEY_FILE, VERIFYING_KEY_FILE};
use melody_zk::error::{ArtifactError, ErrorClass, VerifierError, ZkError};
use melody_zk::prover::PROOF_BYTES;
use melody_zk::{
    compute_commitment, generate_witness, prove, verify, KeyMaterial, Melody, MelodyProof, MelodyVerifyingKey,
    PrivateInputs, ProofBytes, PublicInputs, Salt,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const C_MAJOR: [u32; 8] = [60, 62, 64, 65, 67, 69, 71, 72];
const C_SHARP_MAJOR: [u32; 8] = [61, 63, 65, 67, 69, 71, 73, 75];
const SALT: &str = "0x1234567890abcdef1234567890abcdef";

fn keys() -> &'static KeyMaterial {
    static KEYS: OnceLock<KeyMaterial> = OnceLock::new();
    KEYS.get_or_init(|| KeyMaterial::generate(&mut ChaCha20Rng::seed_from_u64(0x5eed)).unwrap())
}

fn rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

fn request(notes: [u32; 8], expected_hash: Fr) -> ProofRequest {
    ProofRequest {
        notes,
        salt: *Salt::parse(SALT).unwrap().as_scalar(),
        expected_hash,
    }
}

fn c_major_commitment() -> Fr {
    let melody = Melody::new(C_MAJOR).unwrap();
    *compute_commitment(&melody, &Salt::parse(SALT).unwrap()).as_scalar()
}

/// Prove C major against its own commitment.
fn honest_proof(seed: u64) -> (MelodyProof, Vec<Fr>) {
    let resp = prove_request(keys(), &request(C_MAJOR, c_major_commitment()), &mut rng(seed)).unwrap();
    (MelodyProof::from_bytes(&resp.proof).unwrap(), resp.public_inputs)
}

// ---------------------------------------------------------------------------
// Completeness and Soundness
// ---------------------------------------------------------------------------

#[test]
fn honest_proof_verifies() {
    let (proof, inputs) = honest_proof(1);
    assert_eq!(inputs, vec![c_major_commitment()]);
    assert!(verify(keys().verifying_key(), &inputs, &proof).unwrap());
}

#[test]
fn agrees_with_reference_verifier() {
    let (proof, inputs) = honest_proof(2);
    let pvk = PreparedVerifyingKey::from(keys().verifying_key().inner().clone());

    assert!(Groth16::<Bn254>::verify_proof(&pvk, proof.inner(), &inputs).unwrap());

    let wrong = vec![inputs[0] + Fr::from(1u64)];
    assert!(!Groth16::<Bn254>::verify_proof(&pvk, proof.inner(), &wrong).unwrap());
    assert!(!verify(keys().verifying_key(), &wrong, &proof).unwrap());
}

#[test]
fn wrong_melody_cannot_be_proven() {
    // C# major against the C major commitment.
    let err = prove_request(keys(), &request(C_SHARP_MAJOR, c_major_commitment()), &mut rng(3)).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unsatisfiable);
}

#[test]
fn out_of_range_note_is_an_input_error() {
    let mut notes = C_MAJOR;
    notes[5] = 128;
    let err = prove_request(keys(), &request(notes, c_major_commitment()), &mut rng(4)).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Input);
}

#[test]
fn proof_for_one_commitment_fails_for_another() {
    let (proof, _) = honest_proof(5);

    let other = Melody::new(C_SHARP_MAJOR).unwrap();
    let other_hash = compute_commitment(&other, &Salt::parse(SALT).unwrap());
    assert!(!verify(keys().verifying_key(), &[*other_hash.as_scalar()], &proof).unwrap());
}

#[test]
fn wrong_input_count_is_an_error_not_false() {
    let (proof, inputs) = honest_proof(6);
    let vk = keys().verifying_key();

    assert_eq!(
        verify(vk, &[], &proof),
        Err(VerifierError::InputShapeMismatch { expected: 1, got: 0 })
    );
    assert_eq!(
        verify(vk, &[inputs[0], inputs[0]], &proof),
        Err(VerifierError::InputShapeMismatch { expected: 1, got: 2 })
    );
}

// ---------------------------------------------------------------------------
// Proof Encoding
// ---------------------------------------------------------------------------

#[test]
fn proofs_are_fixed_size_and_randomized() {
    let (a, _) = honest_proof(7);
    let (b, _) = honest_proof(8);

    let a_bytes = a.to_bytes().unwrap().to_bytes();
    let b_bytes = b.to_bytes().unwrap().to_bytes();
    assert_eq!(a_bytes.len(), PROOF_BYTES);
    assert_eq!(PROOF_BYTES, 128);
    assert_ne!(a_bytes, b_bytes);
}

#[test]
fn tampered_proof_is_rejected() {
    let (proof, inputs) = honest_proof(9);
    let bytes = proof.to_bytes().unwrap().to_bytes();

    for byte in [0usize, 17, 40, 100, 127] {
        let mut flipped = bytes;
        flipped[byte] ^= 0x01;

        let Ok(pb) = ProofBytes::from_bytes(&flipped) else {
            continue;
        };
        match MelodyProof::from_bytes(&pb) {
            // Not a valid point any more.
            Err(_) => {}
            Ok(tampered) => assert!(!verify(keys().verifying_key(), &inputs, &tampered).unwrap()),
        }
    }
}

#[test]
fn swapped_a_and_c_is_rejected() {
    let (proof, inputs) = honest_proof(10);
    let mut pb = proof.to_bytes().unwrap();
    std::mem::swap(&mut pb.a, &mut pb.c);

    let swapped = MelodyProof::from_bytes(&pb).unwrap();
    assert!(!verify(keys().verifying_key(), &inputs, &swapped).unwrap());
}

#[test]
fn verify_request_over_json() {
    let resp = prove_request(keys(), &request(C_MAJOR, c_major_commitment()), &mut rng(11)).unwrap();

    let wire = serde_json::to_string(&resp).unwrap();
    let req: VerifyRequest = serde_json::from_str(&wire).unwrap();
    assert!(verify_request(keys().verifying_key(), &req).unwrap());

    let mut bad = req.clone();
    bad.public_inputs = vec![Fr::from(42u64)];
    assert!(!verify_request(keys().verifying_key(), &bad).unwrap());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_proofs_all_verify() {
    let keys = keys();
    let commitment = c_major_commitment();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                scope.spawn(move || {
                    let private = PrivateInputs {
                        melody: Melody::new(C_MAJOR).unwrap(),
                        salt: Salt::parse(SALT).unwrap(),
                    };
                    let public = PublicInputs {
                        expected_hash: melody_zk::Commitment::from_scalar(commitment),
                    };
                    let witness = generate_witness(keys.circuit(), &private, &public).unwrap();
                    let proof = prove(keys.proving_key(), &witness, &mut rng(100 + i)).unwrap();
                    verify(keys.verifying_key(), witness.public_inputs(), &proof).unwrap()
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap());
        }
    });
}

// ---------------------------------------------------------------------------
// Key Artifacts
// ---------------------------------------------------------------------------

#[test]
fn artifacts_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    keys().write_to_dir(dir.path()).unwrap();

    let loaded = KeyMaterial::load_from_dir(dir.path()).unwrap();
    assert_eq!(loaded.digest(), keys().digest());
    assert_eq!(loaded.verifying_key().inner(), keys().verifying_key().inner());

    // A proof from the loaded key verifies under the original key.
    let resp = prove_request(&loaded, &request(C_MAJOR, c_major_commitment()), &mut rng(12)).unwrap();
    let proof = MelodyProof::from_bytes(&resp.proof).unwrap();
    assert!(verify(keys().verifying_key(), &resp.public_inputs, &proof).unwrap());
}

#[test]
fn missing_artifacts_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = KeyMaterial::load_from_dir(dir.path()).err().unwrap();
    assert!(matches!(err, ZkError::Artifact(ArtifactError::Io { .. })));
    assert_eq!(err.class(), ErrorClass::Artifact);
}

#[test]
fn corrupt_artifacts_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    keys().write_to_dir(dir.path()).unwrap();
    let vk_path = dir.path().join(VERIFYING_KEY_FILE);
    let pristine = std::fs::read(&vk_path).unwrap();

    let mut bad_magic = pristine.clone();
    bad_magic[0] = b'X';
    std::fs::write(&vk_path, &bad_magic).unwrap();
    assert!(matches!(
        KeyMaterial::load_from_dir(dir.path()).err().unwrap(),
        ZkError::Artifact(ArtifactError::BadMagic)
    ));

    let mut bad_payload = pristine.clone();
    let last = bad_payload.len() - 1;
    bad_payload[last] ^= 0xff;
    std::fs::write(&vk_path, &bad_payload).unwrap();
    assert!(matches!(
        KeyMaterial::load_from_dir(dir.path()).err().unwrap(),
        ZkError::Artifact(ArtifactError::ChecksumMismatch)
    ));

    // Proving key in the verifying key's slot.
    let pk_bytes = std::fs::read(dir.path().join(PROVING_KEY_FILE)).unwrap();
    std::fs::write(&vk_path, &pk_bytes).unwrap();
    assert!(matches!(
        KeyMaterial::load_from_dir(dir.path()).err().unwrap(),
        ZkError::Artifact(ArtifactError::WrongKind { .. })
    ));
}

#[test]
fn verifying_key_for_another_circuit_is_rejected() {
    let vk_bytes = keys().verifying_key().to_artifact().unwrap();
    let other = melody_zk::CircuitDigest([0u8; 32]);

    assert!(matches!(
        MelodyVerifyingKey::from_artifact(&vk_bytes, other),
        Err(ArtifactError::CircuitMismatch { .. })
    ));
    assert!(MelodyVerifyingKey::from_artifact(&vk_bytes, keys().digest()).is_ok());
}

#[test]
fn keys_from_different_setups_do_not_pair() {
    let other = KeyMaterial::generate(&mut rng(0xbad)).unwrap();
    let vk_bytes = other.verifying_key().to_artifact().unwrap();
    let foreign_vk = MelodyVerifyingKey::from_artifact(&vk_bytes, keys().digest()).unwrap();

    // Same circuit, different toxic waste: the proof does not transfer.
    let (proof, inputs) = honest_proof(13);
    assert!(!verify(&foreign_vk, &inputs, &proof).unwrap());
}
