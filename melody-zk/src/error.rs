//! Error taxonomy for the proving pipeline.
//!
//! Each stage has its own enum so callers can match on exactly what went wrong;
//! [`ZkError`] aggregates them for code that drives the whole pipeline.

use thiserror::Error;

/// User-correctable input problems, rejected before any witness is generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("melody must have exactly {expected} notes, got {got}")]
    WrongMelodyLength { expected: usize, got: usize },

    #[error("note {index} is {value}, outside the MIDI range 0..=127")]
    NoteOutOfRange { index: usize, value: u32 },

    #[error("unknown note name: {0:?}")]
    UnknownNote(String),

    #[error("invalid scalar: {0}")]
    InvalidScalar(String),

    #[error("public input vector must hold {expected} value(s), got {got}")]
    PublicInputCount { expected: usize, got: usize },
}

/// Field or curve arithmetic failures. These indicate a programming error or corrupt data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("zero has no multiplicative inverse")]
    NotInvertible,

    #[error("malformed curve point: {0}")]
    MalformedPoint(String),

    #[error("scalar encoding is not reduced modulo the field prime")]
    NonCanonicalScalar,

    #[error("length mismatch: {bases} bases vs {scalars} scalars")]
    LengthMismatch { bases: usize, scalars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError {
    /// The supplied notes and salt do not hash to the supplied public value.
    #[error("constraint system is unsatisfiable (first failing constraint: {})", .constraint.as_deref().unwrap_or("unknown"))]
    UnsatisfiableConstraint { constraint: Option<String> },

    #[error("witness shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("constraint synthesis failed: {0}")]
    Synthesis(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProverError {
    /// Proving key and witness were built for different circuits.
    #[error("prover shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("witness built for circuit {witness}, proving key is for {key}")]
    CircuitMismatch { witness: String, key: String },

    #[error("groth16 prover failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierError {
    #[error("public input vector must hold {expected} value(s), got {got}")]
    InputShapeMismatch { expected: usize, got: usize },

    #[error("malformed proof: {0}")]
    MalformedProof(#[from] ArithmeticError),

    #[error("malformed verifying key: {0}")]
    MalformedKey(String),
}

/// Problems with key artifacts. Always fatal: never retry, never fall back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("artifact i/o failed for {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("artifact is truncated")]
    Truncated,

    #[error("artifact magic bytes do not match")]
    BadMagic,

    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown artifact kind tag {0}")]
    UnknownKind(u8),

    #[error("expected a {expected} artifact, found a {found} artifact")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("artifact payload checksum mismatch")]
    ChecksumMismatch,

    #[error("artifact was built with a different Poseidon parameter table")]
    ParamsMismatch,

    #[error("artifact was built for circuit {found}, expected circuit {expected}")]
    CircuitMismatch { expected: String, found: String },

    #[error("key does not fit the compiled circuit: {0}")]
    KeyShape(String),

    #[error("artifact payload is corrupt: {0}")]
    Corrupt(String),
}

/// Coarse classification used for logging and for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input; the user may correct and retry.
    Input,
    /// The melody/salt does not match the claimed commitment. Expected, security-relevant.
    Unsatisfiable,
    /// Missing or mismatched key material. Needs operator intervention.
    Artifact,
    /// Arithmetic or encoding corruption.
    Arithmetic,
    /// Everything else: shape mismatches and backend failures.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZkError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Witness(#[from] WitnessError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ZkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ZkError::Input(_) => ErrorClass::Input,
            ZkError::Witness(WitnessError::UnsatisfiableConstraint { .. }) => ErrorClass::Unsatisfiable,
            ZkError::Artifact(_) | ZkError::Verifier(VerifierError::MalformedKey(_)) => ErrorClass::Artifact,
            ZkError::Arithmetic(_) | ZkError::Verifier(VerifierError::MalformedProof(_)) => {
                ErrorClass::Arithmetic
            }
            ZkError::Verifier(VerifierError::InputShapeMismatch { .. }) => ErrorClass::Input,
            ZkError::Witness(_) | ZkError::Prover(_) | ZkError::Setup(_) | ZkError::Serialization(_) => {
                ErrorClass::Internal
            }
        }
    }
}
