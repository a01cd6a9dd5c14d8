//! Groth16 key generation and the versioned key artifact format.
//!
//! SECURITY NOTE: `setup` is a single-party trusted setup. Whoever runs it learns
//! the toxic waste and could forge proofs. Production keys must come from an MPC
//! ceremony; locally generated keys are for development only.
//!
//! Artifact layout (all integers little-endian):
//!
//! ```text
//! magic "MELODYZK" [8] | format u16 | kind u8 | circuit digest [32]
//! | params fingerprint [32] | payload length u64 | payload sha256 [32] | payload
//! ```
//!
//! The payload is the arkworks compressed encoding of the key.

use crate::circuit::{CircuitDigest, CompiledCircuit, MelodyCircuit};
use crate::constants::{
    ARTIFACT_FORMAT_VERSION, ARTIFACT_MAGIC, NUM_PUBLIC_INPUTS, POSEIDON_PARAMS_FINGERPRINT, PROVING_KEY_FILE, VERIFYING_KEY_FILE,
};
use crate::error::{ArtifactError, ZkError};
use crate::poseidon::params_fingerprint;
use crate::verifier::MelodyVerifyingKey;
use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Fixed header size in bytes.
pub const ARTIFACT_HEADER_LEN: usize = 8 + 2 + 1 + 32 + 32 + 8 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ProvingKey,
    VerifyingKey,
}

impl ArtifactKind {
    pub fn tag(self) -> u8 {
        match self {
            ArtifactKind::ProvingKey => 1,
            ArtifactKind::VerifyingKey => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, ArtifactError> {
        match tag {
            1 => Ok(ArtifactKind::ProvingKey),
            2 => Ok(ArtifactKind::VerifyingKey),
            other => Err(ArtifactError::UnknownKind(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::ProvingKey => "proving-key",
            ArtifactKind::VerifyingKey => "verifying-key",
        }
    }
}

/// Decoded artifact header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub format_version: u16,
    pub kind: ArtifactKind,
    pub circuit_digest: CircuitDigest,
    pub params_fingerprint: [u8; 32],
    pub payload_len: u64,
    pub payload_sha256: [u8; 32],
}

fn take<const N: usize>(bytes: &[u8], at: &mut usize) -> Result<[u8; N], ArtifactError> {
    let end = *at + N;
    let slice = bytes.get(*at..end).ok_or(ArtifactError::Truncated)?;
    *at = end;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

/// Parse and sanity-check the fixed header without looking at the payload.
pub fn read_artifact_header(bytes: &[u8]) -> Result<ArtifactHeader, ArtifactError> {
    let mut at = 0;

    let magic: [u8; 8] = take(bytes, &mut at)?;
    if magic != ARTIFACT_MAGIC {
        return Err(ArtifactError::BadMagic);
    }

    let format_version = u16::from_le_bytes(take(bytes, &mut at)?);
    if format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion(format_version));
    }

    let [tag] = take::<1>(bytes, &mut at)?;
    let kind = ArtifactKind::from_tag(tag)?;

    let circuit_digest = CircuitDigest(take(bytes, &mut at)?);
    let params_fingerprint = take(bytes, &mut at)?;
    let payload_len = u64::from_le_bytes(take(bytes, &mut at)?);
    let payload_sha256 = take(bytes, &mut at)?;

    Ok(ArtifactHeader {
        format_version,
        kind,
        circuit_digest,
        params_fingerprint,
        payload_len,
        payload_sha256,
    })
}

fn seal_artifact(kind: ArtifactKind, digest: CircuitDigest, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ARTIFACT_HEADER_LEN + payload.len());
    out.extend_from_slice(&ARTIFACT_MAGIC);
    out.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
    out.push(kind.tag());
    out.extend_from_slice(&digest.0);
    out.extend_from_slice(&params_fingerprint());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&Sha256::digest(payload));
    out.extend_from_slice(payload);
    out
}

/// Validate the envelope and return the payload.
fn open_artifact(bytes: &[u8], expected_kind: ArtifactKind, expected_digest: CircuitDigest) -> Result<&[u8], ArtifactError> {
    let header = read_artifact_header(bytes)?;

    if header.kind != expected_kind {
        return Err(ArtifactError::WrongKind {
            expected: expected_kind.name(),
            found: header.kind.name(),
        });
    }

    let payload = &bytes[ARTIFACT_HEADER_LEN..];
    if (payload.len() as u64) < header.payload_len {
        return Err(ArtifactError::Truncated);
    }
    if (payload.len() as u64) > header.payload_len {
        return Err(ArtifactError::Corrupt("trailing bytes after payload".to_string()));
    }

    let checksum: [u8; 32] = Sha256::digest(payload).into();
    if checksum != header.payload_sha256 {
        return Err(ArtifactError::ChecksumMismatch);
    }

    if header.params_fingerprint != params_fingerprint() {
        return Err(ArtifactError::ParamsMismatch);
    }

    if header.circuit_digest != expected_digest {
        return Err(ArtifactError::CircuitMismatch {
            expected: expected_digest.to_string(),
            found: header.circuit_digest.to_string(),
        });
    }

    Ok(payload)
}

/// Check a Groth16 verifying key against the circuit's public-input count.
pub(crate) fn check_vk_shape(vk: &VerifyingKey<Bn254>, num_instance_variables: usize) -> Result<(), ArtifactError> {
    if vk.gamma_abc_g1.len() != num_instance_variables {
        return Err(ArtifactError::KeyShape(format!(
            "verifying key has {} input bases, circuit needs {}",
            vk.gamma_abc_g1.len(),
            num_instance_variables
        )));
    }
    Ok(())
}

/// Proving key bound to the compiled circuit it was generated for.
pub struct MelodyProvingKey {
    circuit: Arc<CompiledCircuit>,
    pk: ProvingKey<Bn254>,
}

impl MelodyProvingKey {
    /// Pair a raw key with a compiled circuit, checking every query length.
    pub fn from_parts(circuit: Arc<CompiledCircuit>, pk: ProvingKey<Bn254>) -> Result<Self, ArtifactError> {
        let inst = circuit.num_instance_variables();
        let wit = circuit.num_witness_variables();

        check_vk_shape(&pk.vk, inst)?;
        if pk.a_query.len() != inst + wit || pk.b_g1_query.len() != inst + wit || pk.b_g2_query.len() != inst + wit {
            return Err(ArtifactError::KeyShape(format!(
                "proving key queries do not cover {} variables",
                inst + wit
            )));
        }
        if pk.l_query.len() != wit {
            return Err(ArtifactError::KeyShape(format!(
                "proving key has {} witness bases, circuit needs {wit}",
                pk.l_query.len()
            )));
        }

        Ok(Self { circuit, pk })
    }

    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    pub fn digest(&self) -> CircuitDigest {
        self.circuit.digest()
    }

    pub fn inner(&self) -> &ProvingKey<Bn254> {
        &self.pk
    }

    /// The verifying key embedded in this proving key.
    pub fn verifying_key(&self) -> MelodyVerifyingKey {
        MelodyVerifyingKey::new(self.pk.vk.clone(), self.digest())
    }

    pub fn to_artifact(&self) -> Result<Vec<u8>, ZkError> {
        let mut payload = Vec::new();
        self.pk
            .serialize_compressed(&mut payload)
            .map_err(|e| ZkError::Serialization(format!("proving key: {e}")))?;
        Ok(seal_artifact(ArtifactKind::ProvingKey, self.digest(), &payload))
    }

    pub fn from_artifact(circuit: Arc<CompiledCircuit>, bytes: &[u8]) -> Result<Self, ArtifactError> {
        let payload = open_artifact(bytes, ArtifactKind::ProvingKey, circuit.digest())?;
        let pk = ProvingKey::<Bn254>::deserialize_compressed(payload)
            .map_err(|e| ArtifactError::Corrupt(format!("proving key: {e}")))?;
        Self::from_parts(circuit, pk)
    }
}

impl MelodyVerifyingKey {
    pub fn to_artifact(&self) -> Result<Vec<u8>, ZkError> {
        let mut payload = Vec::new();
        self.inner()
            .serialize_compressed(&mut payload)
            .map_err(|e| ZkError::Serialization(format!("verifying key: {e}")))?;
        Ok(seal_artifact(ArtifactKind::VerifyingKey, self.digest(), &payload))
    }

    /// Load a verifying key, requiring it to carry `expected_digest`.
    pub fn from_artifact(bytes: &[u8], expected_digest: CircuitDigest) -> Result<Self, ArtifactError> {
        let payload = open_artifact(bytes, ArtifactKind::VerifyingKey, expected_digest)?;
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(payload)
            .map_err(|e| ArtifactError::Corrupt(format!("verifying key: {e}")))?;
        check_vk_shape(&vk, NUM_PUBLIC_INPUTS + 1)?;
        Ok(MelodyVerifyingKey::new(vk, expected_digest))
    }
}

/// Run the Groth16 setup for the melody circuit.
pub fn setup<R: RngCore + CryptoRng>(
    circuit: &Arc<CompiledCircuit>,
    rng: &mut R,
) -> Result<(MelodyProvingKey, MelodyVerifyingKey), ZkError> {
    let fingerprint = params_fingerprint();
    if fingerprint != POSEIDON_PARAMS_FINGERPRINT {
        return Err(ZkError::Setup(format!(
            "poseidon parameters drifted: derived {}, pinned {}",
            hex::encode(fingerprint),
            hex::encode(POSEIDON_PARAMS_FINGERPRINT)
        )));
    }

    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(MelodyCircuit::blank(), rng)
        .map_err(|e| ZkError::Setup(e.to_string()))?;

    let pk = MelodyProvingKey::from_parts(Arc::clone(circuit), pk)?;
    let vk = pk.verifying_key();

    tracing::info!(digest = %pk.digest(), constraints = circuit.num_constraints(), "groth16 setup complete");
    Ok((pk, vk))
}

/// Everything needed to prove and verify, loaded once and shared read-only.
pub struct KeyMaterial {
    circuit: Arc<CompiledCircuit>,
    proving_key: MelodyProvingKey,
    verifying_key: MelodyVerifyingKey,
}

impl KeyMaterial {
    /// Bundle a key pair, checking that both halves belong together.
    pub fn from_keys(proving_key: MelodyProvingKey, verifying_key: MelodyVerifyingKey) -> Result<Self, ArtifactError> {
        if proving_key.digest() != verifying_key.digest() {
            return Err(ArtifactError::CircuitMismatch {
                expected: proving_key.digest().to_string(),
                found: verifying_key.digest().to_string(),
            });
        }
        if proving_key.inner().vk != *verifying_key.inner() {
            return Err(ArtifactError::KeyShape(
                "verifying key does not belong to the proving key".to_string(),
            ));
        }

        Ok(Self {
            circuit: Arc::clone(&proving_key.circuit),
            proving_key,
            verifying_key,
        })
    }

    /// Compile the circuit and run a fresh setup.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, ZkError> {
        let circuit = Arc::new(CompiledCircuit::compile()?);
        let (pk, vk) = setup(&circuit, rng)?;
        Ok(Self::from_keys(pk, vk)?)
    }

    /// Load `melody_pk.bin` and `melody_vk.bin` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ZkError> {
        let circuit = Arc::new(CompiledCircuit::compile()?);

        let pk_bytes = read_file(&dir.join(PROVING_KEY_FILE))?;
        let vk_bytes = read_file(&dir.join(VERIFYING_KEY_FILE))?;

        let pk = MelodyProvingKey::from_artifact(Arc::clone(&circuit), &pk_bytes)?;
        let vk = MelodyVerifyingKey::from_artifact(&vk_bytes, circuit.digest())?;

        let keys = Self::from_keys(pk, vk)?;
        tracing::info!(dir = %dir.display(), digest = %keys.digest(), "loaded key material");
        Ok(keys)
    }

    /// Write both artifacts into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), ZkError> {
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let pk_path = dir.join(PROVING_KEY_FILE);
        std::fs::write(&pk_path, self.proving_key.to_artifact()?).map_err(|e| io_error(&pk_path, e))?;

        let vk_path = dir.join(VERIFYING_KEY_FILE);
        std::fs::write(&vk_path, self.verifying_key.to_artifact()?).map_err(|e| io_error(&vk_path, e))?;

        tracing::info!(dir = %dir.display(), digest = %self.digest(), "wrote key artifacts");
        Ok(())
    }

    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    pub fn digest(&self) -> CircuitDigest {
        self.circuit.digest()
    }

    pub fn proving_key(&self) -> &MelodyProvingKey {
        &self.proving_key
    }

    pub fn verifying_key(&self) -> &MelodyVerifyingKey {
        &self.verifying_key
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
