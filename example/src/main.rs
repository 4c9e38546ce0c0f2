// example/src/main.rs

use brine_sbe::otf::{enum_value_name, get_int, set_choice_names};
use brine_sbe::*;
use brine_sbe_schema::ByteBufferMut;
use serde::Serialize;

const CAR_SCHEMA: &str = include_str!("../schema/car.xml");

/// One decoded value, collected so the whole message can be dumped as JSON.
#[derive(Debug, Serialize)]
struct Entry {
    path:  String,
    value: String,
}

/// Prints every value as it is reached and keeps a flat copy.
#[derive(Default)]
struct Printer {
    scope:   Vec<String>,
    entries: Vec<Entry>,
}

impl Printer {
    fn record(&mut self, name: &str, value: String) {
        let mut path = self.scope.clone();
        path.push(name.to_string());
        let path = path.join(".");
        println!("{:indent$}{} = {}", "", name, value, indent = self.scope.len() * 2);
        self.entries.push(Entry { path, value });
    }
}

impl TokenListener for Printer {
    fn on_begin_message(&mut self, token: &Token) {
        println!("{} (id={}, blockLength={})", token.name, token.id, token.size);
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
        self.record(&field_token.name, value.to_string());
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
        // A constant enum field carries its valueRef instead of occupying space.
        if field_token.is_constant_encoding() {
            let value_ref = field_token.encoding.const_value.as_ref().map(|v| v.to_string()).unwrap_or_default();
            self.record(&field_token.name, value_ref);
            return Ok(());
        }

        let value = read_value(buffer, index, &tokens[0], acting_version)?;
        let name = enum_value_name(tokens, &value).unwrap_or("<unknown>");
        self.record(&field_token.name, name.to_string());
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
        self.record(&field_token.name, format!("{{{}}}", set_choice_names(tokens, bits).join(", ")));
        Ok(())
    }

    fn on_begin_composite(&mut self, field_token: &Token, _tokens: &[Token]) {
        self.scope.push(field_token.name.clone());
    }

    fn on_end_composite(&mut self, _field_token: &Token, _tokens: &[Token]) {
        self.scope.pop();
    }

    fn on_group_header(&mut self, token: &Token, num_in_group: u64) {
        println!("{:indent$}{} x{}", "", token.name, num_in_group, indent = self.scope.len() * 2);
    }

    fn on_begin_group(&mut self, token: &Token, group_index: u64, _num_in_group: u64) {
        self.scope.push(format!("{}[{}]", token.name, group_index));
    }

    fn on_end_group(&mut self, _token: &Token, _group_index: u64, _num_in_group: u64) {
        self.scope.pop();
    }

    fn on_var_data(
        &mut self,
        field_token: &Token,
        buffer: &[u8],
        index: usize,
        length: usize,
        _type_token: &Token,
    ) -> Result<(), SbeError> {
        let bytes = buffer
            .get(index..index + length)
            .ok_or_else(|| SbeError::OtfError(format!("{} runs past the buffer", field_token.name)))?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.record(&field_token.name, text);
        Ok(())
    }
}

/// Encodes a Car by hand, header first.
fn encode_car(block_length: u16, version: u16) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();

    // messageHeader
    for value in [block_length, 1, 1, version] {
        bb.write_u16(value);
    }

    bb.write_i64(1234);
    bb.write_u16(2013);
    bb.write_byte(1);
    bb.write_byte(b'A');
    bb.write_bytes(b"abcdef");
    bb.write_byte(0b0000_0101);
    bb.write_u16(2000);
    bb.write_byte(4);
    bb.write_byte(95);

    // fuelFigures
    bb.write_u16(6);
    bb.write_u16(2);
    for (speed, mpg) in [(30u16, 35.9f32), (55, 49.0)] {
        bb.write_u16(speed);
        bb.write_bytes(&mpg.to_le_bytes());
    }

    for text in ["Honda", "Civic VTi"] {
        bb.write_i32(text.len() as i32);
        bb.write_bytes(text.as_bytes());
    }

    bb.data()
}

fn main() -> Result<(), SbeError> {
    let policy = ValidationPolicy::default();
    let (ir, bin) = compile_schema(CAR_SCHEMA, policy, None)?;
    println!(
        "compiled {} (namespace {}) into {} bytes of IR",
        ir.package_name,
        ir.applicable_namespace(),
        bin.len()
    );

    // Decoding the IR again gives back the same token runs.
    let ir = decode_binary_ir(&bin)?;

    let header = OtfHeaderDecoder::new(ir.header_structure())?;
    let car = ir
        .get_message(1)
        .ok_or_else(|| SbeError::OtfError("no message with id 1".to_string()))?;

    let buffer = encode_car(car[0].size as u16, ir.version as u16);

    let template_id = header.get_template_id(&buffer, 0)?;
    let block_length = header.get_block_length(&buffer, 0)? as usize;
    let acting_version = header.get_schema_version(&buffer, 0)? as i32;
    println!("templateId={} blockLength={} version={}", template_id, block_length, acting_version);

    let mut printer = Printer::default();
    let end = decode_message(&buffer, header.encoded_length(), acting_version, block_length, car, &mut printer)?;
    println!("decoded {} of {} bytes", end, buffer.len());

    // The same buffer read as if written by version 1: `ron` did not exist yet.
    let mut old = Printer::default();
    decode_message(&buffer, header.encoded_length(), 1, block_length, car, &mut old)?;

    let json = serde_json::to_string_pretty(&printer.entries)
        .map_err(|e| SbeError::DecodeError(format!("Failed to render JSON: {}", e)))?;
    println!("{}", json);

    Ok(())
}
