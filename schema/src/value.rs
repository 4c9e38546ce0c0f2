use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::primitive::PrimitiveType;

/// Character encoding assumed for `char` values when the schema does not name one.
pub const DEFAULT_CHARACTER_ENCODING: &str = "US-ASCII";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("constant char value malformed: {0:?}")]
    MalformedChar(String),

    #[error("cannot parse {value:?} as {primitive}")]
    InvalidLiteral {
        value:     String,
        primitive: PrimitiveType,
    },

    #[error("length of {value:?} exceeds expected length {length}")]
    TooLong {
        value:  String,
        length: usize,
    },
}

/// A constant, min, max, null, valid-value or choice payload.
///
/// Integers (including `char` and the bit pattern of `uint64`) are held as
/// `Long`, floating point as `Double`, and `char` arrays as `Bytes`.
///
/// ```
/// use brine_sbe_schema::{PrimitiveType, PrimitiveValue};
///
/// let value = PrimitiveValue::parse("42", PrimitiveType::Uint16).unwrap();
/// assert_eq!(value.as_long(), Some(42));
/// assert_eq!(value.size(), 2);
/// assert_eq!(value.to_string(), "42");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "representation", rename_all = "lowercase")]
pub enum PrimitiveValue {
    Long {
        value: i64,
        size:  usize,
    },
    Double {
        value: f64,
        size:  usize,
    },
    Bytes {
        value:              Vec<u8>,
        character_encoding: String,
        size:               usize,
    },
}

impl PrimitiveValue {
    pub fn long(value: i64, size: usize) -> PrimitiveValue {
        PrimitiveValue::Long { value, size }
    }

    pub fn double(value: f64, size: usize) -> PrimitiveValue {
        PrimitiveValue::Double { value, size }
    }

    pub fn bytes(value: Vec<u8>, character_encoding: &str) -> PrimitiveValue {
        let size = value.len();
        PrimitiveValue::Bytes {
            value,
            character_encoding: character_encoding.to_string(),
            size,
        }
    }

    /// Parses a schema literal according to `primitive`.
    pub fn parse(value: &str, primitive: PrimitiveType) -> Result<PrimitiveValue, ValueError> {
        let size = primitive.size();
        let invalid = || ValueError::InvalidLiteral {
            value: value.to_string(),
            primitive,
        };

        match primitive {
            PrimitiveType::Char => {
                let bytes = value.as_bytes();
                if bytes.len() != 1 {
                    return Err(ValueError::MalformedChar(value.to_string()));
                }
                Ok(PrimitiveValue::long(bytes[0] as i64, size))
            }

            PrimitiveType::Uint64 => {
                let parsed = value.trim().parse::<u64>().map_err(|_| invalid())?;
                Ok(PrimitiveValue::long(parsed as i64, size))
            }

            PrimitiveType::Float => {
                let parsed = value.trim().parse::<f32>().map_err(|_| invalid())?;
                Ok(PrimitiveValue::double(parsed as f64, size))
            }

            PrimitiveType::Double => {
                let parsed = value.trim().parse::<f64>().map_err(|_| invalid())?;
                Ok(PrimitiveValue::double(parsed, size))
            }

            _ => {
                let parsed = value.trim().parse::<i64>().map_err(|_| invalid())?;
                if !fits(primitive, parsed) {
                    return Err(invalid());
                }
                Ok(PrimitiveValue::long(parsed, size))
            }
        }
    }

    /// Parses the text of a `char` array constant, NUL padded to `length`.
    /// A single `char` stays a `Long` so it compares equal to [`parse`](#method.parse).
    pub fn parse_array(
        value: &str,
        length: usize,
        character_encoding: &str,
    ) -> Result<PrimitiveValue, ValueError> {
        if length == 1 {
            return PrimitiveValue::parse(value, PrimitiveType::Char);
        }

        let mut bytes = value.as_bytes().to_vec();
        if bytes.len() > length {
            return Err(ValueError::TooLong {
                value: value.to_string(),
                length,
            });
        }
        bytes.resize(length, 0);

        Ok(PrimitiveValue::bytes(bytes, character_encoding))
    }

    pub fn as_long(&self) -> Option<i64> {
        match *self {
            PrimitiveValue::Long { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match *self {
            PrimitiveValue::Double { value, .. } => Some(value),
            PrimitiveValue::Long { value, .. } => Some(value as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            PrimitiveValue::Bytes { ref value, .. } => Some(value.as_slice()),
            _ => None,
        }
    }

    pub fn character_encoding(&self) -> Option<&str> {
        match *self {
            PrimitiveValue::Bytes { ref character_encoding, .. } => Some(character_encoding.as_str()),
            _ => None,
        }
    }

    pub fn size(&self) -> usize {
        match *self {
            PrimitiveValue::Long { size, .. }
            | PrimitiveValue::Double { size, .. }
            | PrimitiveValue::Bytes { size, .. } => size,
        }
    }
}

fn fits(primitive: PrimitiveType, value: i64) -> bool {
    match primitive {
        PrimitiveType::Int8   => i8::try_from(value).is_ok(),
        PrimitiveType::Int16  => i16::try_from(value).is_ok(),
        PrimitiveType::Int32  => i32::try_from(value).is_ok(),
        PrimitiveType::Uint8  => u8::try_from(value).is_ok(),
        PrimitiveType::Uint16 => u16::try_from(value).is_ok(),
        PrimitiveType::Uint32 => u32::try_from(value).is_ok(),
        _ => true,
    }
}

impl PartialEq for PrimitiveValue {
    /// Compares representation and value. Doubles compare by bit pattern so a
    /// NaN null sentinel equals itself.
    fn eq(&self, other: &PrimitiveValue) -> bool {
        match (self, other) {
            (PrimitiveValue::Long { value: a, .. }, PrimitiveValue::Long { value: b, .. }) => a == b,
            (PrimitiveValue::Double { value: a, .. }, PrimitiveValue::Double { value: b, .. }) => {
                a.to_bits() == b.to_bits()
            }
            (PrimitiveValue::Bytes { value: a, .. }, PrimitiveValue::Bytes { value: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrimitiveValue {}

impl Hash for PrimitiveValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            PrimitiveValue::Long { value, .. } => {
                0u8.hash(state);
                value.hash(state);
            }
            PrimitiveValue::Double { value, .. } => {
                1u8.hash(state);
                value.to_bits().hash(state);
            }
            PrimitiveValue::Bytes { ref value, .. } => {
                2u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            PrimitiveValue::Long { value, .. } => value.fmt(f),
            PrimitiveValue::Double { value, .. } => value.fmt(f),
            PrimitiveValue::Bytes { ref value, .. } => {
                let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
                f.write_str(&String::from_utf8_lossy(&value[..end]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_integers() {
        assert_eq!(PrimitiveValue::parse("-5", PrimitiveType::Int8), Ok(PrimitiveValue::long(-5, 1)));
        assert_eq!(PrimitiveValue::parse("65535", PrimitiveType::Uint16).unwrap().as_long(), Some(65535));
        assert_eq!(
            PrimitiveValue::parse("18446744073709551615", PrimitiveType::Uint64).unwrap().as_long(),
            Some(-1)
        );
        assert!(PrimitiveValue::parse("256", PrimitiveType::Uint8).is_err());
        assert!(PrimitiveValue::parse("-1", PrimitiveType::Uint32).is_err());
        assert!(PrimitiveValue::parse("abc", PrimitiveType::Int32).is_err());
    }

    #[test]
    fn parse_char() {
        assert_eq!(PrimitiveValue::parse("A", PrimitiveType::Char), Ok(PrimitiveValue::long(65, 1)));
        assert_eq!(
            PrimitiveValue::parse("AB", PrimitiveType::Char),
            Err(ValueError::MalformedChar("AB".to_string()))
        );
        assert!(PrimitiveValue::parse("", PrimitiveType::Char).is_err());
    }

    #[test]
    fn parse_floating_point() {
        let value = PrimitiveValue::parse("0.1", PrimitiveType::Float).unwrap();
        assert_eq!(value.as_double(), Some(0.1f32 as f64));
        assert_eq!(value.size(), 4);

        let nan = PrimitiveValue::parse("NaN", PrimitiveType::Double).unwrap();
        assert_eq!(nan, PrimitiveType::Double.null_value());
    }

    #[test]
    fn parse_char_array() {
        let value = PrimitiveValue::parse_array("Petrol", 8, DEFAULT_CHARACTER_ENCODING).unwrap();
        assert_eq!(value.as_bytes(), Some(&b"Petrol\0\0"[..]));
        assert_eq!(value.size(), 8);
        assert_eq!(value.to_string(), "Petrol");

        let single = PrimitiveValue::parse_array("P", 1, DEFAULT_CHARACTER_ENCODING).unwrap();
        assert_eq!(single, PrimitiveValue::long(b'P' as i64, 1));

        assert!(PrimitiveValue::parse_array("TooLong", 3, DEFAULT_CHARACTER_ENCODING).is_err());
    }

    #[test]
    fn equality_ignores_size_and_encoding() {
        assert_eq!(PrimitiveValue::long(7, 1), PrimitiveValue::long(7, 8));
        assert_ne!(PrimitiveValue::long(7, 8), PrimitiveValue::double(7.0, 8));
        assert_eq!(
            PrimitiveValue::bytes(b"ab".to_vec(), "UTF-8"),
            PrimitiveValue::bytes(b"ab".to_vec(), "US-ASCII")
        );

        let mut set = HashSet::new();
        set.insert(PrimitiveValue::long(1, 1));
        set.insert(PrimitiveValue::long(1, 2));
        set.insert(PrimitiveValue::double(f64::NAN, 8));
        set.insert(PrimitiveValue::double(f64::NAN, 8));
        assert_eq!(set.len(), 2);
    }
}
