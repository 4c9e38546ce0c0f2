use serde::Serialize;
use std::fmt;

use crate::value::PrimitiveValue;

/// The fixed catalogue of primitive types a field can be encoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
}

pub const MIN_VALUE_CHAR: i64 = 0x20;
pub const MAX_VALUE_CHAR: i64 = 0x7E;
pub const NULL_VALUE_CHAR: i64 = 0;

pub const MIN_VALUE_INT8: i64 = -127;
pub const MAX_VALUE_INT8: i64 = 127;
pub const NULL_VALUE_INT8: i64 = -128;

pub const MIN_VALUE_UINT8: i64 = 0;
pub const MAX_VALUE_UINT8: i64 = 254;
pub const NULL_VALUE_UINT8: i64 = 255;

pub const MIN_VALUE_INT16: i64 = -32767;
pub const MAX_VALUE_INT16: i64 = 32767;
pub const NULL_VALUE_INT16: i64 = -32768;

pub const MIN_VALUE_UINT16: i64 = 0;
pub const MAX_VALUE_UINT16: i64 = 65534;
pub const NULL_VALUE_UINT16: i64 = 65535;

pub const MIN_VALUE_INT32: i64 = -2_147_483_647;
pub const MAX_VALUE_INT32: i64 = 2_147_483_647;
pub const NULL_VALUE_INT32: i64 = -2_147_483_648;

pub const MIN_VALUE_UINT32: i64 = 0;
pub const MAX_VALUE_UINT32: i64 = 0xFFFF_FFFE;
pub const NULL_VALUE_UINT32: i64 = 0xFFFF_FFFF;

pub const MIN_VALUE_INT64: i64 = i64::MIN + 1;
pub const MAX_VALUE_INT64: i64 = i64::MAX;
pub const NULL_VALUE_INT64: i64 = i64::MIN;

// uint64 sentinels are held as the bit pattern of the unsigned value.
pub const MIN_VALUE_UINT64: i64 = 0;
pub const MAX_VALUE_UINT64: i64 = 0xFFFF_FFFF_FFFF_FFFE_u64 as i64;
pub const NULL_VALUE_UINT64: i64 = 0xFFFF_FFFF_FFFF_FFFF_u64 as i64;

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Uint8,
        PrimitiveType::Uint16,
        PrimitiveType::Uint32,
        PrimitiveType::Uint64,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Looks up a primitive type by the name used in schema documents.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        PrimitiveType::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Char   => "char",
            PrimitiveType::Int8   => "int8",
            PrimitiveType::Int16  => "int16",
            PrimitiveType::Int32  => "int32",
            PrimitiveType::Int64  => "int64",
            PrimitiveType::Uint8  => "uint8",
            PrimitiveType::Uint16 => "uint16",
            PrimitiveType::Uint32 => "uint32",
            PrimitiveType::Uint64 => "uint64",
            PrimitiveType::Float  => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Size in bytes of a single element on the wire.
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Char | PrimitiveType::Int8 | PrimitiveType::Uint8 => 1,
            PrimitiveType::Int16 | PrimitiveType::Uint16 => 2,
            PrimitiveType::Int32 | PrimitiveType::Uint32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::Uint64 | PrimitiveType::Double => 8,
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveType::Uint8 | PrimitiveType::Uint16 | PrimitiveType::Uint32 | PrimitiveType::Uint64
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    pub fn min_value(self) -> PrimitiveValue {
        let size = self.size();
        match self {
            PrimitiveType::Char   => PrimitiveValue::long(MIN_VALUE_CHAR, size),
            PrimitiveType::Int8   => PrimitiveValue::long(MIN_VALUE_INT8, size),
            PrimitiveType::Int16  => PrimitiveValue::long(MIN_VALUE_INT16, size),
            PrimitiveType::Int32  => PrimitiveValue::long(MIN_VALUE_INT32, size),
            PrimitiveType::Int64  => PrimitiveValue::long(MIN_VALUE_INT64, size),
            PrimitiveType::Uint8  => PrimitiveValue::long(MIN_VALUE_UINT8, size),
            PrimitiveType::Uint16 => PrimitiveValue::long(MIN_VALUE_UINT16, size),
            PrimitiveType::Uint32 => PrimitiveValue::long(MIN_VALUE_UINT32, size),
            PrimitiveType::Uint64 => PrimitiveValue::long(MIN_VALUE_UINT64, size),
            PrimitiveType::Float  => PrimitiveValue::double(-(f32::MAX as f64), size),
            PrimitiveType::Double => PrimitiveValue::double(-f64::MAX, size),
        }
    }

    pub fn max_value(self) -> PrimitiveValue {
        let size = self.size();
        match self {
            PrimitiveType::Char   => PrimitiveValue::long(MAX_VALUE_CHAR, size),
            PrimitiveType::Int8   => PrimitiveValue::long(MAX_VALUE_INT8, size),
            PrimitiveType::Int16  => PrimitiveValue::long(MAX_VALUE_INT16, size),
            PrimitiveType::Int32  => PrimitiveValue::long(MAX_VALUE_INT32, size),
            PrimitiveType::Int64  => PrimitiveValue::long(MAX_VALUE_INT64, size),
            PrimitiveType::Uint8  => PrimitiveValue::long(MAX_VALUE_UINT8, size),
            PrimitiveType::Uint16 => PrimitiveValue::long(MAX_VALUE_UINT16, size),
            PrimitiveType::Uint32 => PrimitiveValue::long(MAX_VALUE_UINT32, size),
            PrimitiveType::Uint64 => PrimitiveValue::long(MAX_VALUE_UINT64, size),
            PrimitiveType::Float  => PrimitiveValue::double(f32::MAX as f64, size),
            PrimitiveType::Double => PrimitiveValue::double(f64::MAX, size),
        }
    }

    pub fn null_value(self) -> PrimitiveValue {
        let size = self.size();
        match self {
            PrimitiveType::Char   => PrimitiveValue::long(NULL_VALUE_CHAR, size),
            PrimitiveType::Int8   => PrimitiveValue::long(NULL_VALUE_INT8, size),
            PrimitiveType::Int16  => PrimitiveValue::long(NULL_VALUE_INT16, size),
            PrimitiveType::Int32  => PrimitiveValue::long(NULL_VALUE_INT32, size),
            PrimitiveType::Int64  => PrimitiveValue::long(NULL_VALUE_INT64, size),
            PrimitiveType::Uint8  => PrimitiveValue::long(NULL_VALUE_UINT8, size),
            PrimitiveType::Uint16 => PrimitiveValue::long(NULL_VALUE_UINT16, size),
            PrimitiveType::Uint32 => PrimitiveValue::long(NULL_VALUE_UINT32, size),
            PrimitiveType::Uint64 => PrimitiveValue::long(NULL_VALUE_UINT64, size),
            PrimitiveType::Float  => PrimitiveValue::double(f64::NAN, size),
            PrimitiveType::Double => PrimitiveValue::double(f64::NAN, size),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte order of an encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Maps the schema's `byteOrder` attribute. Anything unrecognised is little endian.
    pub fn from_name(name: &str) -> ByteOrder {
        match name {
            "bigEndian" => ByteOrder::BigEndian,
            _ => ByteOrder::LittleEndian,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "littleEndian",
            ByteOrder::BigEndian => "bigEndian",
        }
    }
}
