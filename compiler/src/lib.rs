//! brine-sbe-compiler
//!
//! This crate implements:
//!  1) A parser for SBE `messageSchema` XML documents into a typed model,
//!  2) Schema validation with collected errors and warnings (`ValidationPolicy`),
//!  3) The offset engine that lays out messages, groups and var data,
//!  4) `IrGenerator`, flattening a schema into BEGIN/END token runs held by `Ir`,
//!  5) `encode_binary_ir` / `decode_binary_ir` for the binary IR format,
//!  6) An on-the-fly decoder that walks a token run over an encoded message,
//!  7) Error types (`SbeError`), and the `TokenListener` trait.

pub mod error;
pub mod types;
pub mod utils;
pub mod parser;
pub mod verifier;
pub mod message;
pub mod schema;
pub mod token;
pub mod generator;
pub mod ir;
pub mod compiler;
pub mod otf;
pub mod traits;

pub use compiler::compile_schema;
pub use compiler::decode_binary_ir;
pub use compiler::decode_binary_ir_from_file;
pub use compiler::encode_binary_ir;
pub use compiler::encode_binary_ir_to_file;
pub use error::SbeError;
pub use generator::IrGenerator;
pub use ir::{HeaderStructure, Ir};
pub use parser::parse_schema;
pub use token::{Encoding, Signal, Token};
pub use verifier::ValidationPolicy;
