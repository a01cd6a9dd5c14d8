//! Scalar-field helpers over BN254's `Fr`.
//!
//! Arithmetic itself is arkworks'; this module adds the fallible operations the
//! rest of the crate needs (inversion, strict parsing, canonical byte codecs) and
//! serde adapters that carry scalars as decimal strings.

use crate::error::{ArithmeticError, InputError};
use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, PrimeField, Zero};
use std::str::FromStr;

pub type Scalar = Fr;

/// Width of a canonical big-endian scalar encoding.
pub const SCALAR_BYTES: usize = 32;

/// Multiplicative inverse; fails on zero instead of returning a default.
pub fn inverse(x: &Scalar) -> Result<Scalar, ArithmeticError> {
    x.inverse().ok_or(ArithmeticError::NotInvertible)
}

/// `a / b` in the field.
pub fn div(a: &Scalar, b: &Scalar) -> Result<Scalar, ArithmeticError> {
    Ok(*a * inverse(b)?)
}

/// Decimal rendering of the canonical integer representative.
pub fn scalar_to_decimal(x: &Scalar) -> String {
    x.into_bigint().to_string()
}

pub fn scalar_to_be_bytes(x: &Scalar) -> [u8; SCALAR_BYTES] {
    let bytes = x.into_bigint().to_bytes_be();
    let mut out = [0u8; SCALAR_BYTES];
    out[SCALAR_BYTES - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Decode a big-endian scalar, rejecting values that are not reduced.
pub fn scalar_from_be_bytes(bytes: &[u8; SCALAR_BYTES]) -> Result<Scalar, ArithmeticError> {
    let x = Fr::from_be_bytes_mod_order(bytes);
    if scalar_to_be_bytes(&x) != *bytes {
        return Err(ArithmeticError::NonCanonicalScalar);
    }
    Ok(x)
}

/// Parse a scalar from a decimal string or a `0x`-prefixed big-endian hex string.
///
/// Values at or above the field modulus are rejected rather than reduced, so two
/// different strings never silently name the same scalar.
pub fn parse_scalar(s: &str) -> Result<Scalar, InputError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InputError::InvalidScalar("empty string".to_string()));
    }

    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return parse_hex(hex_digits);
    }

    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::InvalidScalar(format!("{s:?} is not a decimal number")));
    }

    // arkworks rejects superfluous leading zeros.
    let digits = s.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Fr::zero());
    }

    let x = Fr::from_str(digits).map_err(|_| InputError::InvalidScalar(format!("{s:?} is not a decimal number")))?;
    if scalar_to_decimal(&x) != digits {
        return Err(InputError::InvalidScalar("value is not below the field modulus".to_string()));
    }
    Ok(x)
}

fn parse_hex(digits: &str) -> Result<Scalar, InputError> {
    if digits.is_empty() {
        return Err(InputError::InvalidScalar("empty hex string".to_string()));
    }
    let digits = digits.trim_start_matches('0');
    if digits.len() > 2 * SCALAR_BYTES {
        return Err(InputError::InvalidScalar("value is not below the field modulus".to_string()));
    }

    let padded = format!("{digits:0>64}");
    let decoded = hex::decode(&padded).map_err(|e| InputError::InvalidScalar(format!("invalid hex: {e}")))?;

    let mut bytes = [0u8; SCALAR_BYTES];
    bytes.copy_from_slice(&decoded);
    scalar_from_be_bytes(&bytes).map_err(|_| InputError::InvalidScalar("value is not below the field modulus".to_string()))
}

/// Big-endian hex with a `0x` prefix.
pub fn scalar_to_hex(x: &Scalar) -> String {
    format!("0x{}", hex::encode(scalar_to_be_bytes(x)))
}

/// `#[serde(with = "serde_scalar")]`: decimal string out, decimal or `0x` hex in.
pub mod serde_scalar {
    use super::{parse_scalar, scalar_to_decimal, Scalar};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&scalar_to_decimal(x))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scalar, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_scalar(&s).map_err(D::Error::custom)
    }
}

/// Same as [`serde_scalar`] for `Vec<Scalar>`.
pub mod serde_scalar_vec {
    use super::{parse_scalar, scalar_to_decimal, Scalar};
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(xs: &[Scalar], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(xs.len()))?;
        for x in xs {
            seq.serialize_element(&scalar_to_decimal(x))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Scalar>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter().map(|s| parse_scalar(s).map_err(D::Error::custom)).collect()
    }
}
