use chrono::{DateTime, Utc};
use melody_zk::field::{serde_scalar_vec, Scalar};
use melody_zk::melody::parse_note_name;
use melody_zk::error::InputError;
use melody_zk::ProofBytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account address that can own melodies: `0x` followed by 40 hex digits.
///
/// Stored and compared in lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner(String);

impl Owner {
    pub fn parse(s: &str) -> Result<Self, String> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| "owner address must start with 0x".to_string())?;
        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err("owner address must be 20 bytes of hex".to_string());
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Owner {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Owner> for String {
    fn from(o: Owner) -> Self {
        o.0
    }
}

/// A note given either as a MIDI number or as a pitch name like `"F#4"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NoteInput {
    Midi(u32),
    Name(String),
}

impl NoteInput {
    pub fn to_midi(&self) -> Result<u32, InputError> {
        match self {
            NoteInput::Midi(n) => Ok(*n),
            NoteInput::Name(name) => parse_note_name(name).map(u32::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitmentRequest {
    pub notes: Vec<NoteInput>,

    /// Decimal or `0x` hex. A fresh 128-bit salt is generated when omitted.
    pub salt: Option<String>,
}

/// Contains the salt in clear: it is returned once to the melody's author, who must keep it.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommitmentResponse {
    pub commitment: String,
    pub salt: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyHttpRequest {
    #[serde(with = "serde_scalar_vec")]
    pub public_inputs: Vec<Scalar>,
    pub proof: ProofBytes,

    /// Base64 verifying-key artifact. The service key is used when omitted.
    pub vk_b64: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub owner: Owner,
    #[serde(with = "serde_scalar_vec")]
    pub public_inputs: Vec<Scalar>,
    pub proof: ProofBytes,
}

/// One registered melody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodyRecord {
    /// Decimal commitment.
    pub commitment: String,
    pub owner: Owner,
    pub registered_at: DateTime<Utc>,
}

/// Registration record plus how many times ownership has changed hands.
#[derive(Debug, Serialize, Deserialize)]
pub struct MelodyDetailResponse {
    #[serde(flatten)]
    pub record: MelodyRecord,
    pub transfers: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerMelodiesResponse {
    pub owner: Owner,
    pub count: u64,
    pub commitments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: Owner,
    pub to: Owner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: Uuid,
    pub commitment: String,
    pub from: Owner,
    pub to: Owner,
    pub transferred_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZkVkResponse {
    pub curve: String,
    pub proof_system: String,
    pub circuit_digest: String,
    pub vk_b64: String,
}
