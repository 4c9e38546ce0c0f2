//! On-the-fly decoding: walks an IR message run over an encoded buffer and
//! reports every value to a [`TokenListener`], with no generated code.

use brine_sbe_schema::{get_primitive, ByteOrder, PrimitiveType, PrimitiveValue, DEFAULT_CHARACTER_ENCODING};

use crate::{
    error::SbeError,
    ir::{HeaderStructure, BLOCK_LENGTH, SCHEMA_ID, SCHEMA_VERSION, TEMPLATE_ID},
    token::{Signal, Token},
    traits::TokenListener,
    types::Presence,
    utils::quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderField {
    offset:         usize,
    primitive_type: PrimitiveType,
    byte_order:     ByteOrder,
}

impl HeaderField {
    fn new(header: &HeaderStructure, name: &str) -> Result<HeaderField, SbeError> {
        let token = header
            .member(name)
            .ok_or_else(|| SbeError::InvalidHeader(format!("header has no {}", quote(name))))?;
        let primitive_type = token
            .encoding
            .primitive_type
            .ok_or_else(|| SbeError::InvalidHeader(format!("no primitive type for {}", quote(name))))?;

        Ok(HeaderField {
            offset: to_index(token.offset, name)?,
            primitive_type,
            byte_order: token.encoding.byte_order,
        })
    }

    fn get(&self, buffer: &[u8], index: usize) -> Result<i64, SbeError> {
        get_int(buffer, index + self.offset, self.primitive_type, self.byte_order)
    }
}

/// Reads message headers laid out by a [`HeaderStructure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtfHeaderDecoder {
    encoded_length: usize,
    block_length:   HeaderField,
    template_id:    HeaderField,
    schema_id:      HeaderField,
    schema_version: HeaderField,
}

impl OtfHeaderDecoder {
    pub fn new(header: &HeaderStructure) -> Result<OtfHeaderDecoder, SbeError> {
        let size = header.tokens().first().map_or(0, |t| t.size);

        Ok(OtfHeaderDecoder {
            encoded_length: to_index(size, "header")?,
            block_length:   HeaderField::new(header, BLOCK_LENGTH)?,
            template_id:    HeaderField::new(header, TEMPLATE_ID)?,
            schema_id:      HeaderField::new(header, SCHEMA_ID)?,
            schema_version: HeaderField::new(header, SCHEMA_VERSION)?,
        })
    }

    /// Bytes the header occupies ahead of the message body.
    pub fn encoded_length(&self) -> usize {
        self.encoded_length
    }

    pub fn get_block_length(&self, buffer: &[u8], index: usize) -> Result<i64, SbeError> {
        self.block_length.get(buffer, index)
    }

    pub fn get_template_id(&self, buffer: &[u8], index: usize) -> Result<i64, SbeError> {
        self.template_id.get(buffer, index)
    }

    pub fn get_schema_id(&self, buffer: &[u8], index: usize) -> Result<i64, SbeError> {
        self.schema_id.get(buffer, index)
    }

    pub fn get_schema_version(&self, buffer: &[u8], index: usize) -> Result<i64, SbeError> {
        self.schema_version.get(buffer, index)
    }
}

fn to_index(value: i32, what: &str) -> Result<usize, SbeError> {
    usize::try_from(value).map_err(|_| SbeError::OtfError(format!("negative offset {} for {}", value, quote(what))))
}

fn to_length(value: i64, what: &str) -> Result<usize, SbeError> {
    usize::try_from(value).map_err(|_| SbeError::OtfError(format!("invalid length {} for {}", value, quote(what))))
}

/// Reads an integer of `primitive_type` at `index`.
pub fn get_int(buffer: &[u8], index: usize, primitive_type: PrimitiveType, byte_order: ByteOrder) -> Result<i64, SbeError> {
    if primitive_type.is_floating_point() {
        return Err(SbeError::OtfError(format!("{} is not an integer type", primitive_type)));
    }

    get_primitive(buffer, index, primitive_type, byte_order)
        .ok()
        .and_then(|v| v.as_long())
        .ok_or_else(|| {
            SbeError::OtfError(format!(
                "buffer too short for {} at {} ({} bytes)",
                primitive_type,
                index,
                buffer.len()
            ))
        })
}

/// Reads the value `token` describes at `index`.
///
/// A token newer than `acting_version` yields its null value without touching
/// the buffer. Constants yield their constant. Arrays come back as bytes.
pub fn read_value(buffer: &[u8], index: usize, token: &Token, acting_version: i32) -> Result<PrimitiveValue, SbeError> {
    let encoding = &token.encoding;

    if token.version > acting_version {
        return encoding
            .applicable_null_value()
            .ok_or_else(|| SbeError::OtfError(format!("no null value for {}", quote(&token.name))));
    }

    if encoding.presence == Presence::Constant {
        return encoding
            .const_value
            .clone()
            .ok_or_else(|| SbeError::OtfError(format!("no constant value for {}", quote(&token.name))));
    }

    let primitive_type = encoding
        .primitive_type
        .ok_or_else(|| SbeError::OtfError(format!("no primitive type for {}", quote(&token.name))))?;

    if token.array_length() > 1 {
        let end = index + token.size as usize;
        let bytes = buffer.get(index..end).ok_or_else(|| {
            SbeError::OtfError(format!("buffer too short for {} at {}", quote(&token.name), index))
        })?;
        let character_encoding = encoding.character_encoding.as_deref().unwrap_or(DEFAULT_CHARACTER_ENCODING);
        return Ok(PrimitiveValue::bytes(bytes.to_vec(), character_encoding));
    }

    get_primitive(buffer, index, primitive_type, encoding.byte_order)
        .map_err(|e| SbeError::OtfError(format!("Failed to read {} at {}: {:?}", quote(&token.name), index, e)))
}

/// Whether bit `position` of `bits` is set.
pub fn is_choice_set(bits: u64, position: u32) -> bool {
    position < 64 && bits & (1u64 << position) != 0
}

/// Name of the valid value in an enum run matching `value`.
pub fn enum_value_name<'t>(tokens: &'t [Token], value: &PrimitiveValue) -> Option<&'t str> {
    tokens
        .iter()
        .filter(|t| t.signal == Signal::ValidValue)
        .find(|t| t.encoding.const_value.as_ref().and_then(|v| v.as_long()) == value.as_long())
        .map(|t| t.name.as_str())
}

/// Names of the choices set in `bits`, in declaration order.
pub fn set_choice_names(tokens: &[Token], bits: u64) -> Vec<&str> {
    tokens
        .iter()
        .filter(|t| t.signal == Signal::Choice)
        .filter(|t| {
            t.encoding
                .const_value
                .as_ref()
                .and_then(|v| v.as_long())
                .and_then(|p| u32::try_from(p).ok())
                .map_or(false, |p| is_choice_set(bits, p))
        })
        .map(|t| t.name.as_str())
        .collect()
}

/// Decodes the message body at `offset` using the message run `tokens`.
/// Returns the buffer index just past the message.
pub fn decode_message(
    buffer: &[u8],
    offset: usize,
    acting_version: i32,
    block_length: usize,
    tokens: &[Token],
    listener: &mut dyn TokenListener,
) -> Result<usize, SbeError> {
    let begin = match tokens.first() {
        Some(t) if t.signal == Signal::BeginMessage => t,
        _ => return Err(SbeError::OtfError("token run does not start with BEGIN_MESSAGE".to_string())),
    };
    let num_tokens = tokens.len();

    listener.on_begin_message(begin);

    let token_idx = decode_fields(buffer, offset, acting_version, tokens, 1, num_tokens, listener)?;
    let (index, token_idx) =
        decode_groups(buffer, offset + block_length, acting_version, tokens, token_idx, num_tokens, listener)?;
    let (index, token_idx) = decode_data(buffer, index, tokens, token_idx, num_tokens, listener)?;

    let end = tokens.get(token_idx).unwrap_or(begin);
    listener.on_end_message(end);

    Ok(index)
}

fn component_end(tokens: &[Token], token_idx: usize, limit: usize) -> Result<usize, SbeError> {
    let token = &tokens[token_idx];
    let count = usize::try_from(token.component_token_count).unwrap_or(0);
    if count == 0 || token_idx + count > limit {
        return Err(SbeError::OtfError(format!(
            "bad component token count {} for {}",
            token.component_token_count,
            quote(&token.name)
        )));
    }
    Ok(token_idx + count)
}

fn decode_fields(
    buffer: &[u8],
    index: usize,
    acting_version: i32,
    tokens: &[Token],
    mut token_idx: usize,
    num_tokens: usize,
    listener: &mut dyn TokenListener,
) -> Result<usize, SbeError> {
    while token_idx < num_tokens {
        let field_token = &tokens[token_idx];
        if field_token.signal != Signal::BeginField {
            break;
        }

        let next_field_idx = component_end(tokens, token_idx, num_tokens)?;
        if next_field_idx < token_idx + 3 {
            return Err(SbeError::OtfError(format!("field {} has no type", quote(&field_token.name))));
        }

        let type_tokens = &tokens[token_idx + 1..next_field_idx - 1];
        let type_token = &type_tokens[0];
        let at = index + to_index(type_token.offset, &type_token.name)?;

        match type_token.signal {
            Signal::BeginComposite => {
                decode_composite(field_token, buffer, at, type_tokens, acting_version, listener)?
            }
            Signal::BeginEnum => listener.on_enum(field_token, buffer, at, type_tokens, acting_version)?,
            Signal::BeginSet => listener.on_bit_set(field_token, buffer, at, type_tokens, acting_version)?,
            Signal::Encoding => listener.on_encoding(field_token, buffer, at, type_token, acting_version)?,
            _ => {}
        }

        token_idx = next_field_idx;
    }

    Ok(token_idx)
}

fn decode_composite(
    field_token: &Token,
    buffer: &[u8],
    index: usize,
    tokens: &[Token],
    acting_version: i32,
    listener: &mut dyn TokenListener,
) -> Result<(), SbeError> {
    listener.on_begin_composite(field_token, tokens);

    let last = tokens.len().saturating_sub(1);
    let mut i = 1;
    while i < last {
        let token = &tokens[i];
        let at = index + to_index(token.offset, &token.name)?;

        match token.signal {
            Signal::BeginComposite | Signal::BeginEnum | Signal::BeginSet => {
                let end = component_end(tokens, i, tokens.len())?;
                let run = &tokens[i..end];
                match token.signal {
                    Signal::BeginComposite => decode_composite(token, buffer, at, run, acting_version, listener)?,
                    Signal::BeginEnum => listener.on_enum(token, buffer, at, run, acting_version)?,
                    _ => listener.on_bit_set(token, buffer, at, run, acting_version)?,
                }
                i = end;
            }
            Signal::Encoding => {
                listener.on_encoding(token, buffer, at, token, acting_version)?;
                i += 1;
            }
            _ => i += 1,
        }
    }

    listener.on_end_composite(field_token, tokens);
    Ok(())
}

fn dimension_member<'t>(dimension: &'t [Token], name: &str, owner: &Token) -> Result<&'t Token, SbeError> {
    dimension
        .iter()
        .find(|t| t.signal == Signal::Encoding && t.name == name)
        .ok_or_else(|| SbeError::OtfError(format!("{} has no {}", quote(&owner.name), quote(name))))
}

fn read_member(buffer: &[u8], index: usize, token: &Token) -> Result<i64, SbeError> {
    let primitive_type = token
        .encoding
        .primitive_type
        .ok_or_else(|| SbeError::OtfError(format!("no primitive type for {}", quote(&token.name))))?;
    get_int(buffer, index + to_index(token.offset, &token.name)?, primitive_type, token.encoding.byte_order)
}

/// `index + length`, failing once that passes the end of `buffer`.
fn advance(buffer: &[u8], index: usize, length: usize, owner: &Token) -> Result<usize, SbeError> {
    index
        .checked_add(length)
        .filter(|next| *next <= buffer.len())
        .ok_or_else(|| {
            SbeError::OtfError(format!(
                "{} runs past the end of a buffer of {} bytes",
                quote(&owner.name),
                buffer.len()
            ))
        })
}

fn decode_groups(
    buffer: &[u8],
    mut index: usize,
    acting_version: i32,
    tokens: &[Token],
    mut token_idx: usize,
    num_tokens: usize,
    listener: &mut dyn TokenListener,
) -> Result<(usize, usize), SbeError> {
    while token_idx < num_tokens {
        let token = &tokens[token_idx];
        if token.signal != Signal::BeginGroup {
            break;
        }

        let end_group_idx = component_end(tokens, token_idx, num_tokens)? - 1;
        let dimension_idx = token_idx + 1;
        if dimension_idx >= end_group_idx || tokens[dimension_idx].signal != Signal::BeginComposite {
            return Err(SbeError::OtfError(format!("group {} has no dimension", quote(&token.name))));
        }
        let dimension_end = component_end(tokens, dimension_idx, end_group_idx)?;
        let dimension = &tokens[dimension_idx..dimension_end];

        let block_length = read_member(buffer, index, dimension_member(dimension, "blockLength", token)?)?;
        let block_length = to_length(block_length, "blockLength")?;
        let num_in_group = read_member(buffer, index, dimension_member(dimension, "numInGroup", token)?)? as u64;
        index = advance(buffer, index, to_index(dimension[0].size, &dimension[0].name)?, token)?;

        let fixed_bytes = usize::try_from(num_in_group).ok().and_then(|n| n.checked_mul(block_length));
        if fixed_bytes.map_or(true, |n| n > buffer.len() - index) {
            return Err(SbeError::OtfError(format!(
                "group {} of {} entries of {} bytes overruns buffer of {}",
                quote(&token.name),
                num_in_group,
                block_length,
                buffer.len()
            )));
        }

        listener.on_group_header(token, num_in_group);

        for g in 0..num_in_group {
            listener.on_begin_group(token, g, num_in_group);

            let after_fields = decode_fields(buffer, index, acting_version, tokens, dimension_end, end_group_idx, listener)?;
            index = advance(buffer, index, block_length, token)?;

            let (next, after_groups) =
                decode_groups(buffer, index, acting_version, tokens, after_fields, end_group_idx, listener)?;
            let (next, _) = decode_data(buffer, next, tokens, after_groups, end_group_idx, listener)?;
            index = next;

            listener.on_end_group(token, g, num_in_group);
        }

        token_idx = end_group_idx + 1;
    }

    Ok((index, token_idx))
}

fn decode_data(
    buffer: &[u8],
    mut index: usize,
    tokens: &[Token],
    mut token_idx: usize,
    num_tokens: usize,
    listener: &mut dyn TokenListener,
) -> Result<(usize, usize), SbeError> {
    while token_idx < num_tokens {
        let token = &tokens[token_idx];
        if token.signal != Signal::BeginVarData {
            break;
        }

        let next = component_end(tokens, token_idx, num_tokens)?;
        let composite = &tokens[token_idx + 1..next];

        let length = read_member(buffer, index, dimension_member(composite, "length", token)?)?;
        let length = to_length(length, "length")?;
        let data_token = dimension_member(composite, "varData", token)?;
        let data_index = index + to_index(data_token.offset, &data_token.name)?;

        if data_index + length > buffer.len() {
            return Err(SbeError::OtfError(format!(
                "var data {} of {} bytes overruns buffer of {}",
                quote(&token.name),
                length,
                buffer.len()
            )));
        }

        listener.on_var_data(token, buffer, data_index, length, data_token)?;

        index = data_index + length;
        token_idx = next;
    }

    Ok((index, token_idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::compile_schema, verifier::ValidationPolicy};

    const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <messageSchema package="otf" id="1" version="2">
            <types>
                <composite name="messageHeader">
                    <type name="blockLength" primitiveType="uint16"/>
                    <type name="templateId" primitiveType="uint16"/>
                    <type name="schemaId" primitiveType="uint16"/>
                    <type name="version" primitiveType="uint16"/>
                </composite>
                <composite name="groupSizeEncoding">
                    <type name="blockLength" primitiveType="uint16"/>
                    <type name="numInGroup" primitiveType="uint16"/>
                </composite>
                <composite name="varStringEncoding">
                    <type name="length" primitiveType="uint8"/>
                    <type name="varData" primitiveType="uint8" length="0"/>
                </composite>
                <enum name="Side" encodingType="char">
                    <validValue name="Buy">B</validValue>
                    <validValue name="Sell">S</validValue>
                </enum>
                <set name="Options" encodingType="uint8">
                    <choice name="A">0</choice>
                    <choice name="B">1</choice>
                    <choice name="C">2</choice>
                </set>
            </types>
            <message name="Car" id="1">
                <field name="serial" id="1" type="uint32"/>
                <field name="side" id="2" type="Side"/>
                <field name="options" id="3" type="Options"/>
                <field name="extra" id="4" type="uint16" presence="optional" sinceVersion="2"/>
                <group name="legs" id="5">
                    <field name="qty" id="6" type="int32"/>
                </group>
                <data name="note" id="7" type="varStringEncoding"/>
            </message>
        </messageSchema>"#;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TokenListener for Recorder {
        fn on_begin_message(&mut self, token: &Token) {
            self.events.push(format!("begin {}", token.name));
        }

        fn on_end_message(&mut self, token: &Token) {
            self.events.push(format!("end {}", token.name));
        }

        fn on_encoding(
            &mut self,
            field_token: &Token,
            buffer: &[u8],
            index: usize,
            type_token: &Token,
            acting_version: i32,
        ) -> Result<(), SbeError> {
            let value = read_value(buffer, index, type_token, acting_version)?;
            self.events.push(format!("{}={}", field_token.name, value));
            Ok(())
        }

        fn on_enum(
            &mut self,
            field_token: &Token,
            buffer: &[u8],
            index: usize,
            tokens: &[Token],
            acting_version: i32,
        ) -> Result<(), SbeError> {
            let value = read_value(buffer, index, &tokens[0], acting_version)?;
            let name = enum_value_name(tokens, &value).unwrap_or("?");
            self.events.push(format!("{}={}", field_token.name, name));
            Ok(())
        }

        fn on_bit_set(
            &mut self,
            field_token: &Token,
            buffer: &[u8],
            index: usize,
            tokens: &[Token],
            _acting_version: i32,
        ) -> Result<(), SbeError> {
            let encoding = &tokens[0].encoding;
            let primitive_type = encoding.primitive_type.unwrap_or(PrimitiveType::Uint8);
            let bits = get_int(buffer, index, primitive_type, encoding.byte_order)? as u64;
            self.events.push(format!("{}={}", field_token.name, set_choice_names(tokens, bits).join("|")));
            Ok(())
        }

        fn on_group_header(&mut self, token: &Token, num_in_group: u64) {
            self.events.push(format!("{}[{}]", token.name, num_in_group));
        }

        fn on_var_data(
            &mut self,
            field_token: &Token,
            buffer: &[u8],
            index: usize,
            length: usize,
            _type_token: &Token,
        ) -> Result<(), SbeError> {
            let text = String::from_utf8_lossy(&buffer[index..index + length]);
            self.events.push(format!("{}={}", field_token.name, text));
            Ok(())
        }
    }

    fn encoded_car() -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&7u32.to_le_bytes());
        buffer.push(b'S');
        buffer.push(0b101);
        buffer.extend_from_slice(&0x0102u16.to_le_bytes());
        buffer.extend_from_slice(&4u16.to_le_bytes());
        buffer.extend_from_slice(&2u16.to_le_bytes());
        buffer.extend_from_slice(&10i32.to_le_bytes());
        buffer.extend_from_slice(&(-3i32).to_le_bytes());
        buffer.push(2);
        buffer.extend_from_slice(b"hi");
        buffer
    }

    fn decode(acting_version: i32) -> (Vec<String>, usize) {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(SCHEMA, policy, None).unwrap();
        let tokens = ir.get_message(1).unwrap();
        let mut recorder = Recorder::default();
        let buffer = encoded_car();
        let end = decode_message(&buffer, 0, acting_version, tokens[0].size as usize, tokens, &mut recorder).unwrap();
        (recorder.events, end)
    }

    #[test]
    fn walks_fields_groups_and_data() {
        let (events, end) = decode(2);
        assert_eq!(
            events,
            vec![
                "begin Car",
                "serial=7",
                "side=Sell",
                "options=A|C",
                "extra=258",
                "legs[2]",
                "qty=10",
                "qty=-3",
                "note=hi",
                "end Car",
            ]
        );
        assert_eq!(end, encoded_car().len());
    }

    #[test]
    fn newer_fields_read_as_null() {
        let (events, _) = decode(1);
        assert!(events.contains(&"extra=65535".to_string()));
    }

    #[test]
    fn header_decoder() {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(SCHEMA, policy, None).unwrap();
        let decoder = OtfHeaderDecoder::new(ir.header_structure()).unwrap();

        let mut buffer = vec![0xff];
        for value in [8u16, 1, 1, 2] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }

        assert_eq!(decoder.encoded_length(), 8);
        assert_eq!(decoder.get_block_length(&buffer, 1).unwrap(), 8);
        assert_eq!(decoder.get_template_id(&buffer, 1).unwrap(), 1);
        assert_eq!(decoder.get_schema_id(&buffer, 1).unwrap(), 1);
        assert_eq!(decoder.get_schema_version(&buffer, 1).unwrap(), 2);
        assert!(decoder.get_schema_version(&buffer, 4).is_err());
    }

    #[test]
    fn short_buffers_fail_cleanly() {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(SCHEMA, policy, None).unwrap();
        let tokens = ir.get_message(1).unwrap();
        let buffer = encoded_car();

        for cut in [0, 3, 9, 14, 21] {
            let mut recorder = Recorder::default();
            let result = decode_message(&buffer[..cut], 0, 2, 8, tokens, &mut recorder);
            assert!(matches!(result, Err(SbeError::OtfError(_))), "cut at {}", cut);
        }
    }

    #[test]
    fn oversized_group_count_fails_before_walking() {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(SCHEMA, policy, None).unwrap();
        let tokens = ir.get_message(1).unwrap();

        let mut buffer = encoded_car();
        buffer[10..12].copy_from_slice(&u16::MAX.to_le_bytes());

        let mut recorder = Recorder::default();
        let result = decode_message(&buffer, 0, 2, 8, tokens, &mut recorder);
        match result {
            Err(SbeError::OtfError(msg)) => assert!(msg.contains("overruns"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!recorder.events.iter().any(|e| e.starts_with("legs[")));
    }

    #[test]
    fn group_block_length_past_the_end_fails() {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(SCHEMA, policy, None).unwrap();
        let tokens = ir.get_message(1).unwrap();

        let mut buffer = encoded_car();
        buffer[8..10].copy_from_slice(&4000u16.to_le_bytes());

        let mut recorder = Recorder::default();
        let result = decode_message(&buffer, 0, 2, 8, tokens, &mut recorder);
        assert!(matches!(result, Err(SbeError::OtfError(_))));
    }

    #[test]
    fn choice_bits() {
        assert!(is_choice_set(0b100, 2));
        assert!(!is_choice_set(0b100, 1));
        assert!(!is_choice_set(0, 0));
        assert!(!is_choice_set(u64::MAX, 64));
    }
}
