//! brine-sbe
//!
//! Runtime support for working with compiled SBE schemas.
//!
//! - `TokenListener` trait and the on-the-fly decoder (re-exported from compiler)
//! - The `Ir` container and binary IR codec
//! - Helpers for reading primitive values out of encoded buffers

pub use brine_sbe_compiler::error::SbeError;
pub use brine_sbe_compiler::ir::{HeaderStructure, Ir};
pub use brine_sbe_compiler::otf::{decode_message, read_value, OtfHeaderDecoder};
pub use brine_sbe_compiler::token::{Encoding, Signal, Token};
pub use brine_sbe_compiler::traits::TokenListener;
pub use brine_sbe_compiler::{compile_schema, decode_binary_ir, encode_binary_ir, ValidationPolicy};
pub use brine_sbe_schema::{ByteOrder, PrimitiveType, PrimitiveValue};

/// Decode a binary IR buffer into a pretty-printed JSON string.
pub fn decode_to_json(buffer: &[u8]) -> Result<String, SbeError> {
    let ir = decode_binary_ir(buffer)?;
    serde_json::to_string_pretty(&ir).map_err(|e| SbeError::DecodeError(format!("Failed to render JSON: {}", e)))
}

pub mod traits {
    pub use brine_sbe_compiler::traits::TokenListener;
}

pub mod error {
    pub use brine_sbe_compiler::error::SbeError;
}

pub mod otf {
    pub use brine_sbe_compiler::otf::*;
}

pub mod schema {
    pub use brine_sbe_schema::{ByteOrder, PrimitiveType, PrimitiveValue};
}
