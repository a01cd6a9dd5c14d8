//! Application-layer inputs: the melody, its salt, and the public commitment.

use crate::constants::{MELODY_LENGTH, MIDI_NOTE_MAX, SALT_BYTES};
use crate::error::InputError;
use crate::field::{parse_scalar, scalar_to_decimal, serde_scalar, Scalar};
use crate::poseidon;
use ark_bn254::Fr;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exactly eight MIDI notes, each in `0..=127`. Immutable once built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct Melody([u8; MELODY_LENGTH]);

impl Melody {
    pub fn new(notes: [u32; MELODY_LENGTH]) -> Result<Self, InputError> {
        Self::from_slice(&notes)
    }

    pub fn from_slice(notes: &[u32]) -> Result<Self, InputError> {
        if notes.len() != MELODY_LENGTH {
            return Err(InputError::WrongMelodyLength {
                expected: MELODY_LENGTH,
                got: notes.len(),
            });
        }

        let mut out = [0u8; MELODY_LENGTH];
        for (index, (slot, &value)) in out.iter_mut().zip(notes).enumerate() {
            if value > MIDI_NOTE_MAX {
                return Err(InputError::NoteOutOfRange { index, value });
            }
            *slot = value as u8;
        }
        Ok(Self(out))
    }

    /// Build from scientific pitch names such as `"C4"` or `"F#5"`.
    pub fn from_note_names<S: AsRef<str>>(names: &[S]) -> Result<Self, InputError> {
        let notes = names
            .iter()
            .map(|n| parse_note_name(n.as_ref()).map(u32::from))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_slice(&notes)
    }

    pub fn notes(&self) -> [u8; MELODY_LENGTH] {
        self.0
    }

    pub fn to_scalars(&self) -> [Scalar; MELODY_LENGTH] {
        self.0.map(|n| Fr::from(n as u64))
    }
}

impl fmt::Debug for Melody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Melody(<redacted>)")
    }
}

impl TryFrom<Vec<u32>> for Melody {
    type Error = InputError;

    fn try_from(notes: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_slice(&notes)
    }
}

impl From<Melody> for Vec<u32> {
    fn from(m: Melody) -> Self {
        m.0.iter().map(|n| *n as u32).collect()
    }
}

/// Parse a scientific pitch name into a MIDI number (`C4` = 60).
///
/// Accepts a letter `A`-`G` (either case), an optional `#` or `b`, and an
/// octave from -1 to 9.
pub fn parse_note_name(name: &str) -> Result<u8, InputError> {
    let unknown = || InputError::UnknownNote(name.to_string());

    let mut chars = name.trim().chars();
    let letter = chars.next().ok_or_else(unknown)?;
    let pitch_class: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(unknown()),
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str.parse().map_err(|_| unknown())?;
    if !(-1..=9).contains(&octave) {
        return Err(unknown());
    }

    let midi = (octave + 1) * 12 + pitch_class + accidental;
    if !(0..=MIDI_NOTE_MAX as i32).contains(&midi) {
        return Err(unknown());
    }
    Ok(midi as u8)
}

/// The prover's secret salt. Never logged; `Debug` is redacted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt(Scalar);

impl Salt {
    /// Draw a fresh 128-bit salt from the injected RNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SALT_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(Fr::from(u128::from_be_bytes(bytes)))
    }

    pub fn from_scalar(x: Scalar) -> Self {
        Self(x)
    }

    /// Parse a decimal or `0x` hex salt.
    pub fn parse(s: &str) -> Result<Self, InputError> {
        parse_scalar(s).map(Self)
    }

    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }

    /// Decimal form, for handing back to the salt's owner.
    pub fn expose_decimal(&self) -> String {
        scalar_to_decimal(&self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Public commitment `Poseidon(notes || salt)`; identifies a registered melody.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(#[serde(with = "serde_scalar")] Scalar);

impl Commitment {
    pub fn from_scalar(x: Scalar) -> Self {
        Self(x)
    }

    pub fn parse(s: &str) -> Result<Self, InputError> {
        parse_scalar(s).map(Self)
    }

    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&scalar_to_decimal(&self.0))
    }
}

/// Hash inputs in circuit order: the eight notes, then the salt.
pub fn hash_inputs(melody: &Melody, salt: &Salt) -> Vec<Scalar> {
    let mut inputs = Vec::with_capacity(MELODY_LENGTH + 1);
    inputs.extend(melody.to_scalars());
    inputs.push(salt.0);
    inputs
}

/// Compute the public commitment for a melody and salt.
///
/// This MUST match the circuit's hashing logic.
pub fn compute_commitment(melody: &Melody, salt: &Salt) -> Commitment {
    Commitment(poseidon::hash(&hash_inputs(melody, salt)))
}
