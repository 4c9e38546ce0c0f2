use std::{fs, path::Path};

use brine_sbe_schema::{
    get_primitive, value_bytes, ByteBuffer, ByteBufferMut, ByteOrder, PrimitiveType, PrimitiveValue,
    DEFAULT_CHARACTER_ENCODING,
};

use crate::{
    error::SbeError,
    generator::IrGenerator,
    ir::Ir,
    parser::parse_schema,
    token::{
        byte_order_from_ordinal, byte_order_ordinal, find_end, presence_from_ordinal, presence_ordinal,
        primitive_from_ordinal, primitive_ordinal, Encoding, Signal, Token,
    },
    verifier::ValidationPolicy,
};

/// The only binary IR version this crate reads and writes.
pub const IR_VERSION: i32 = 0;

/// Compile an XML schema into `(Ir, Vec<u8>)`.
/// Returns `Err(SbeError)` if parsing, validation or encoding fails.
pub fn compile_schema(xml: &str, policy: ValidationPolicy, namespace: Option<&str>) -> Result<(Ir, Vec<u8>), SbeError> {
    let schema = parse_schema(xml, policy)?;
    let ir = IrGenerator::generate(&schema, namespace)?;
    let bin = encode_binary_ir(&ir)?;
    Ok((ir, bin))
}

/// Encode an `Ir` into bytes. Returns `Err(SbeError::EncodeError)` if a string
/// or value is too long for its `u16` length prefix.
pub fn encode_binary_ir(ir: &Ir) -> Result<Vec<u8>, SbeError> {
    let mut bb = ByteBufferMut::new();

    bb.write_i32(ir.id);
    bb.write_i32(IR_VERSION);
    bb.write_i32(ir.version);
    write_str(&mut bb, "package name", Some(&ir.package_name))?;
    write_str(&mut bb, "namespace name", ir.namespace_name.as_deref())?;
    write_str(&mut bb, "semantic version", ir.semantic_version.as_deref())?;

    for token in ir.header_structure().tokens() {
        encode_token(&mut bb, token)?;
    }
    for (_, tokens) in ir.messages() {
        for token in tokens {
            encode_token(&mut bb, token)?;
        }
    }

    tracing::debug!("encoded IR {}: {} bytes", ir.package_name, bb.len());
    Ok(bb.data())
}

fn write_str(bb: &mut ByteBufferMut, what: &str, value: Option<&str>) -> Result<(), SbeError> {
    bb.write_string(value.unwrap_or(""))
        .map_err(|e| SbeError::EncodeError(format!("Failed to write {}: {:?}", what, e)))
}

fn write_value(bb: &mut ByteBufferMut, what: &str, value: Option<&PrimitiveValue>, encoding: &Encoding) -> Result<(), SbeError> {
    let bytes = match value {
        None => Vec::new(),
        Some(value) => value_bytes(&sized_for(value, encoding.primitive_type), ByteOrder::LittleEndian),
    };
    bb.write_len_bytes(&bytes)
        .map_err(|e| SbeError::EncodeError(format!("Failed to write {}: {:?}", what, e)))
}

/// Scalars are written at the width of the token's primitive type.
fn sized_for(value: &PrimitiveValue, primitive_type: Option<PrimitiveType>) -> PrimitiveValue {
    match (value, primitive_type) {
        (PrimitiveValue::Long { value, .. }, Some(p)) if !p.is_floating_point() => PrimitiveValue::long(*value, p.size()),
        (PrimitiveValue::Double { value, .. }, Some(p)) if p.is_floating_point() => PrimitiveValue::double(*value, p.size()),
        _ => value.clone(),
    }
}

fn encode_token(bb: &mut ByteBufferMut, token: &Token) -> Result<(), SbeError> {
    let encoding = &token.encoding;

    bb.write_i32(token.offset);
    bb.write_i32(token.size);
    bb.write_i32(token.id);
    bb.write_i32(token.ref_id);
    bb.write_i32(token.version);
    bb.write_i32(token.deprecated);
    bb.write_i32(token.component_token_count);
    bb.write_byte(token.signal.ordinal());
    bb.write_byte(primitive_ordinal(encoding.primitive_type));
    bb.write_byte(byte_order_ordinal(encoding.byte_order));
    bb.write_byte(presence_ordinal(encoding.presence));

    write_str(bb, "token name", Some(&token.name))?;
    write_value(bb, "const value", encoding.const_value.as_ref(), encoding)?;
    write_value(bb, "min value", encoding.min_value.as_ref(), encoding)?;
    write_value(bb, "max value", encoding.max_value.as_ref(), encoding)?;
    write_value(bb, "null value", encoding.null_value.as_ref(), encoding)?;
    write_str(bb, "character encoding", encoding.character_encoding.as_deref())?;
    write_str(bb, "epoch", encoding.epoch.as_deref())?;
    write_str(bb, "time unit", encoding.time_unit.as_deref())?;
    write_str(bb, "semantic type", encoding.semantic_type.as_deref())?;
    write_str(bb, "description", token.description.as_deref())?;

    Ok(())
}

/// Decode a binary IR buffer back into an `Ir`.
/// Returns `Err(SbeError)` on any read failure or malformed token stream.
pub fn decode_binary_ir(buffer: &[u8]) -> Result<Ir, SbeError> {
    let mut bb = ByteBuffer::new(buffer);

    let id = bb
        .read_i32()
        .map_err(|e| SbeError::DecodeError(format!("Failed to read IR id: {:?}", e)))?;
    let ir_version = bb
        .read_i32()
        .map_err(|e| SbeError::DecodeError(format!("Failed to read IR version: {:?}", e)))?;
    if ir_version != IR_VERSION {
        return Err(SbeError::UnsupportedIrVersion(ir_version));
    }
    let schema_version = bb
        .read_i32()
        .map_err(|e| SbeError::DecodeError(format!("Failed to read schema version: {:?}", e)))?;

    let package_name = read_str(&mut bb, "package name")?.unwrap_or_default();
    let namespace_name = read_str(&mut bb, "namespace name")?;
    let semantic_version = read_str(&mut bb, "semantic version")?;

    let mut tokens = Vec::new();
    while bb.remaining() > 0 {
        tokens.push(decode_token(&mut bb)?);
    }

    let header_end = match tokens.first() {
        Some(t) if t.signal == Signal::BeginComposite => find_end(&tokens, 0)
            .ok_or_else(|| SbeError::DecodeError("header composite has no end token".to_string()))?,
        _ => return Err(SbeError::DecodeError("IR does not start with a header composite".to_string())),
    };
    let header_tokens = tokens[..=header_end].to_vec();
    let byte_order = header_tokens
        .iter()
        .find(|t| t.signal == Signal::Encoding)
        .map_or(ByteOrder::LittleEndian, |t| t.encoding.byte_order);

    let mut ir = Ir::new(
        &package_name,
        namespace_name.as_deref(),
        id,
        schema_version,
        semantic_version.as_deref(),
        byte_order,
        header_tokens,
    )?;

    let mut i = header_end + 1;
    while i < tokens.len() {
        if tokens[i].signal != Signal::BeginMessage {
            return Err(SbeError::DecodeError(format!(
                "expected BEGIN_MESSAGE at token {}, found {:?}",
                i, tokens[i].signal
            )));
        }
        let end = find_end(&tokens, i)
            .ok_or_else(|| SbeError::DecodeError(format!("message {} has no end token", tokens[i].name)))?;
        ir.add_message(tokens[i].id, tokens[i..=end].to_vec());
        i = end + 1;
    }

    tracing::debug!("decoded IR {}: {} bytes, {} tokens", ir.package_name, buffer.len(), tokens.len());
    Ok(ir)
}

fn read_str(bb: &mut ByteBuffer, what: &str) -> Result<Option<String>, SbeError> {
    let value = bb
        .read_string()
        .map_err(|e| SbeError::DecodeError(format!("Failed to read {}: {:?}", what, e)))?;
    Ok(if value.is_empty() { None } else { Some(value.into_owned()) })
}

fn read_value(
    bb: &mut ByteBuffer,
    what: &str,
    primitive_type: Option<PrimitiveType>,
) -> Result<Option<PrimitiveValue>, SbeError> {
    let bytes = bb
        .read_len_bytes()
        .map_err(|e| SbeError::DecodeError(format!("Failed to read {}: {:?}", what, e)))?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let primitive = match primitive_type {
        Some(PrimitiveType::Char) if bytes.len() != 1 => None,
        other => other,
    };
    let primitive = match primitive {
        Some(p) => p,
        None => return Ok(Some(PrimitiveValue::bytes(bytes.to_vec(), DEFAULT_CHARACTER_ENCODING))),
    };

    get_primitive(bytes, 0, primitive, ByteOrder::LittleEndian)
        .map(Some)
        .map_err(|e| {
            SbeError::DecodeError(format!(
                "Failed to read {}: {} bytes for {} ({:?})",
                what,
                bytes.len(),
                primitive,
                e
            ))
        })
}

fn decode_token(bb: &mut ByteBuffer) -> Result<Token, SbeError> {
    let mut ints = [0i32; 7];
    for (i, value) in ints.iter_mut().enumerate() {
        *value = bb
            .read_i32()
            .map_err(|e| SbeError::DecodeError(format!("Failed to read token header word {}: {:?}", i, e)))?;
    }
    let [offset, size, id, ref_id, version, deprecated, component_token_count] = ints;

    let mut ordinals = [0u8; 4];
    for (i, value) in ordinals.iter_mut().enumerate() {
        *value = bb
            .read_byte()
            .map_err(|e| SbeError::DecodeError(format!("Failed to read token ordinal {}: {:?}", i, e)))?;
    }
    let [signal, primitive, byte_order, presence] = ordinals;
    let primitive_type = primitive_from_ordinal(primitive);

    let name = read_str(bb, "token name")?.unwrap_or_default();
    // Values come before the character encoding on the wire.
    let const_value = read_value(bb, "const value", primitive_type)?;
    let min_value = read_value(bb, "min value", primitive_type)?;
    let max_value = read_value(bb, "max value", primitive_type)?;
    let null_value = read_value(bb, "null value", primitive_type)?;
    let character_encoding = read_str(bb, "character encoding")?;

    let mut token = Token::new(Signal::from_ordinal(signal), &name);
    token.offset = offset;
    token.size = size;
    token.id = id;
    token.ref_id = ref_id;
    token.version = version;
    token.deprecated = deprecated;
    token.component_token_count = component_token_count;
    token.encoding = Encoding {
        presence: presence_from_ordinal(presence),
        primitive_type,
        byte_order: byte_order_from_ordinal(byte_order),
        min_value,
        max_value,
        null_value,
        const_value: const_value.map(|v| with_character_encoding(v, character_encoding.as_deref())),
        character_encoding,
        epoch: read_str(bb, "epoch")?,
        time_unit: read_str(bb, "time unit")?,
        semantic_type: read_str(bb, "semantic type")?,
    };
    token.description = read_str(bb, "description")?;

    Ok(token)
}

fn with_character_encoding(value: PrimitiveValue, character_encoding: Option<&str>) -> PrimitiveValue {
    match (value, character_encoding) {
        (PrimitiveValue::Bytes { value, .. }, Some(encoding)) => PrimitiveValue::bytes(value, encoding),
        (value, _) => value,
    }
}

/// Encode `ir` and write it to `path` in one go.
pub fn encode_binary_ir_to_file(ir: &Ir, path: impl AsRef<Path>) -> Result<(), SbeError> {
    let bytes = encode_binary_ir(ir)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read the whole of `path` and decode it.
pub fn decode_binary_ir_from_file(path: impl AsRef<Path>) -> Result<Ir, SbeError> {
    let bytes = fs::read(path)?;
    decode_binary_ir(&bytes)
}
