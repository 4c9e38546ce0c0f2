use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use brine_sbe_schema::PrimitiveType;

use crate::{
    error::SbeError,
    types::{CompositeType, EncodedDataType},
    utils::quote,
};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// How the schema parser reacts to the errors and warnings it finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationPolicy {
    /// Abort on the first error instead of collecting them.
    pub stop_on_error:   bool,
    /// Count warnings as errors.
    pub warnings_fatal:  bool,
    /// Do not log errors and warnings as they are found.
    pub suppress_output: bool,
}

/// Collects schema errors and warnings for one compile.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    policy:   ValidationPolicy,
    errors:   usize,
    warnings: usize,
    messages: Vec<String>,
}

impl ErrorHandler {
    pub fn new(policy: ValidationPolicy) -> ErrorHandler {
        ErrorHandler {
            policy,
            ..ErrorHandler::default()
        }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Records an error. Returns `Err` straight away under `stop_on_error`.
    pub fn error(&mut self, msg: impl Into<String>) -> Result<(), SbeError> {
        let msg = msg.into();
        self.errors += 1;

        if !self.policy.suppress_output {
            tracing::error!("{}", msg);
        }
        self.messages.push(format!("ERROR: {}", msg));

        if self.policy.stop_on_error {
            return Err(SbeError::Schema(msg));
        }
        Ok(())
    }

    /// Records a warning. Returns `Err` straight away when warnings are fatal
    /// and `stop_on_error` is set.
    pub fn warning(&mut self, msg: impl Into<String>) -> Result<(), SbeError> {
        let msg = msg.into();
        self.warnings += 1;

        if !self.policy.suppress_output {
            tracing::warn!("{}", msg);
        }
        self.messages.push(format!("WARNING: {}", msg));

        if self.policy.warnings_fatal && self.policy.stop_on_error {
            return Err(SbeError::Schema(msg));
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Fails with the collected diagnostics if any error was recorded, or any
    /// warning when warnings are fatal.
    pub fn check_if_should_exit(&self) -> Result<(), SbeError> {
        if self.errors > 0 || (self.warnings > 0 && self.policy.warnings_fatal) {
            return Err(SbeError::Validation {
                errors:   self.errors,
                warnings: self.warnings,
                messages: self.messages.clone(),
            });
        }
        Ok(())
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn check_for_valid_name(handler: &mut ErrorHandler, name: &str) -> Result<(), SbeError> {
    if !is_valid_identifier(name) {
        handler.error(format!("name is not a valid identifier: {}", quote(name)))?;
    }
    Ok(())
}

fn is_uint8_or_16(primitive: PrimitiveType) -> bool {
    primitive == PrimitiveType::Uint8 || primitive == PrimitiveType::Uint16
}

/// Checks a group dimension composite has unsigned `blockLength` and `numInGroup`.
pub fn check_group_size_encoding(
    handler: &mut ErrorHandler,
    name: &str,
    composite: &CompositeType,
) -> Result<(), SbeError> {
    match composite.encoded_member("blockLength") {
        None => handler.error(format!(
            "composite for group size encoding must have \"blockLength\": {}",
            quote(name)
        ))?,
        Some(t) if !t.primitive_type.is_unsigned() => {
            handler.error(format!("\"blockLength\" must be unsigned type: {}", quote(name)))?
        }
        _ => {}
    }

    match composite.encoded_member("numInGroup") {
        None => handler.error(format!(
            "composite for group size encoding must have \"numInGroup\": {}",
            quote(name)
        ))?,
        Some(t) if !t.primitive_type.is_unsigned() => {
            handler.error(format!("\"numInGroup\" must be unsigned type: {}", quote(name)))?
        }
        Some(t) if !is_uint8_or_16(t.primitive_type) => {
            handler.warning(format!("\"numInGroup\" should be UINT8 or UINT16: {}", quote(name)))?
        }
        _ => {}
    }

    Ok(())
}

/// Checks a var-data composite has an unsigned `length` and a `varData` member.
pub fn check_var_data_encoding(
    handler: &mut ErrorHandler,
    name: &str,
    composite: &CompositeType,
) -> Result<(), SbeError> {
    match composite.encoded_member("length") {
        None => handler.error(format!(
            "composite for variable length data encoding must have \"length\": {}",
            quote(name)
        ))?,
        Some(t) if !t.primitive_type.is_unsigned() => {
            handler.error(format!("\"length\" must be unsigned type: {}", quote(name)))?
        }
        Some(t) if !is_uint8_or_16(t.primitive_type) => {
            handler.warning(format!("\"length\" should be UINT8 or UINT16: {}", quote(name)))?
        }
        _ => {}
    }

    if composite.encoded_member("varData").is_none() {
        handler.error(format!(
            "composite for variable length data encoding must have \"varData\": {}",
            quote(name)
        ))?;
    }

    Ok(())
}

/// Checks the message header composite carries `blockLength`, `templateId`,
/// `schemaId` and `version`.
pub fn check_message_header(
    handler: &mut ErrorHandler,
    name: &str,
    composite: &CompositeType,
) -> Result<(), SbeError> {
    match composite.encoded_member("blockLength") {
        None => handler.error(format!(
            "composite for message header must have \"blockLength\": {}",
            quote(name)
        ))?,
        Some(t) if !t.primitive_type.is_unsigned() => {
            handler.error(format!("\"blockLength\" must be unsigned: {}", quote(name)))?
        }
        Some(t) if t.primitive_type != PrimitiveType::Uint16 => {
            handler.warning(format!("\"blockLength\" should be UINT16: {}", quote(name)))?
        }
        _ => {}
    }

    for member in ["templateId", "schemaId", "version"] {
        let found: Option<&EncodedDataType> = composite.encoded_member(member);
        match found {
            None => handler.error(format!(
                "composite for message header must have \"{}\": {}",
                member,
                quote(name)
            ))?,
            Some(t) if t.primitive_type != PrimitiveType::Uint16 => {
                handler.error(format!("\"{}\" must be UINT16: {}", member, quote(name)))?
            }
            _ => {}
        }
    }

    Ok(())
}
