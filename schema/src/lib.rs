//! Shared building blocks for reading and writing Simple Binary Encoding
//! (SBE) artifacts: the primitive type catalogue with its sentinel values,
//! the tagged `PrimitiveValue` used for constants and limits, and the
//! fixed-width byte buffers used by the IR codec and the on-the-fly decoder.
//!
//! ```
//! use brine_sbe_schema::*;
//!
//! let value = PrimitiveValue::parse("1024", PrimitiveType::Uint16).unwrap();
//! let mut bb = ByteBufferMut::new();
//! bb.write_value(&value, ByteOrder::LittleEndian);
//! let data = bb.data();
//! assert_eq!(data, [0, 4]);
//! assert_eq!(get_primitive(&data, 0, PrimitiveType::Uint16, ByteOrder::LittleEndian), Ok(value));
//! ```

pub mod bb;
pub mod primitive;
pub mod value;

pub use bb::*;
pub use primitive::*;
pub use value::*;
