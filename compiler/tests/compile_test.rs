#![cfg(test)]

use brine_sbe_compiler::{
    compile_schema, decode_binary_ir, decode_binary_ir_from_file, encode_binary_ir_to_file,
    otf::read_value,
    parser::parse_schema,
    token::Signal,
    SbeError, ValidationPolicy,
};
use brine_sbe_schema::PrimitiveValue;

const HEADER: &str = r#"
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
    <composite name="varDataEncoding">
        <type name="length" primitiveType="uint16"/>
        <type name="varData" primitiveType="uint8" length="0"/>
    </composite>"#;

fn quiet() -> ValidationPolicy {
    ValidationPolicy { suppress_output: true, ..Default::default() }
}

fn schema(version: i32, types: &str, messages: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <sbe:messageSchema xmlns:sbe="http://fixprotocol.io/2016/sbe"
                           package="integration" id="42" version="{}" byteOrder="littleEndian">
            <types>{}{}</types>
            {}
        </sbe:messageSchema>"#,
        version, HEADER, types, messages
    )
}

#[test]
fn test_fixed_message_layout() {
    let xml = schema(
        0,
        "",
        r#"<sbe:message name="Fixed" id="1">
            <field name="a" id="1" type="uint32"/>
            <field name="b" id="2" type="uint32"/>
            <field name="c" id="3" type="uint32"/>
        </sbe:message>"#,
    );
    let (ir, _) = compile_schema(&xml, quiet(), None).expect("compile_schema failed");
    let tokens = ir.get_message(1).expect("message 1 missing");

    assert_eq!(tokens[0].size, 12);
    let offsets: Vec<i32> = tokens.iter().filter(|t| t.signal == Signal::BeginField).map(|t| t.offset).collect();
    assert_eq!(offsets, vec![0, 4, 8]);
}

#[test]
fn test_group_with_trailing_var_data() {
    let xml = schema(
        0,
        "",
        r#"<sbe:message name="Order" id="2">
            <field name="id" id="1" type="uint32"/>
            <group name="entries" id="2" dimensionType="groupSizeEncoding">
                <field name="x" id="3" type="uint32"/>
                <field name="y" id="4" type="uint32"/>
            </group>
            <data name="payload" id="5" type="varDataEncoding"/>
        </sbe:message>"#,
    );
    let (ir, _) = compile_schema(&xml, quiet(), None).expect("compile_schema failed");
    let tokens = ir.get_message(2).expect("message 2 missing");

    assert_eq!(tokens[0].size, 4);
    let group = tokens.iter().find(|t| t.signal == Signal::BeginGroup).expect("no group");
    assert_eq!(group.size, 8);
    assert_eq!(group.offset, 4);
    let data = tokens.iter().find(|t| t.signal == Signal::BeginVarData).expect("no var data");
    assert_eq!(data.offset, -1);
}

#[test]
fn test_declared_block_length_too_small() {
    let xml = schema(
        0,
        "",
        r#"<sbe:message name="Cramped" id="1" blockLength="4">
            <field name="a" id="1" type="uint64"/>
        </sbe:message>"#,
    );
    match compile_schema(&xml, quiet(), None) {
        Err(SbeError::Validation { errors, messages, .. }) => {
            assert_eq!(errors, 1);
            assert!(messages[0].contains("insufficient space"));
        }
        other => panic!("expected a validation failure, got {:?}", other.map(|(ir, _)| ir.package_name)),
    }
}

#[test]
fn test_stop_on_error_aborts_early() {
    let xml = schema(
        0,
        "",
        r#"<sbe:message name="Cramped" id="1" blockLength="4">
            <field name="a" id="1" type="uint64"/>
        </sbe:message>"#,
    );
    let policy = ValidationPolicy { stop_on_error: true, ..quiet() };
    assert!(matches!(compile_schema(&xml, policy, None), Err(SbeError::Schema(_))));
}

#[test]
fn test_well_formedness_gating() {
    let no_num_in_group = r#"<?xml version="1.0"?>
        <messageSchema package="p" id="1">
            <types>
                <composite name="messageHeader">
                    <type name="blockLength" primitiveType="uint16"/>
                    <type name="templateId" primitiveType="uint16"/>
                    <type name="schemaId" primitiveType="uint16"/>
                    <type name="version" primitiveType="uint16"/>
                </composite>
                <composite name="groupSizeEncoding">
                    <type name="blockLength" primitiveType="uint16"/>
                </composite>
            </types>
            <message name="M" id="1">
                <group name="g" id="1"><field name="x" id="2" type="uint8"/></group>
            </message>
        </messageSchema>"#;
    assert!(compile_schema(no_num_in_group, quiet(), None).is_err());

    let no_var_data = schema(
        0,
        r#"<composite name="badVarData"><type name="length" primitiveType="uint8"/></composite>"#,
        r#"<message name="M" id="1"><data name="d" id="1" type="badVarData"/></message>"#,
    );
    assert!(compile_schema(&no_var_data, quiet(), None).is_err());

    let no_template_id = r#"<?xml version="1.0"?>
        <messageSchema package="p" id="1">
            <types>
                <composite name="messageHeader">
                    <type name="blockLength" primitiveType="uint16"/>
                    <type name="schemaId" primitiveType="uint16"/>
                    <type name="version" primitiveType="uint16"/>
                </composite>
            </types>
        </messageSchema>"#;
    assert!(compile_schema(no_template_id, quiet(), None).is_err());
}

#[test]
fn test_constant_type_takes_no_space() {
    let xml = schema(
        0,
        r#"<type name="Venue" primitiveType="char" length="4" presence="constant">XLON</type>"#,
        r#"<message name="Quote" id="3">
            <field name="venue" id="1" type="Venue"/>
            <field name="px" id="2" type="int64"/>
        </message>"#,
    );
    let parsed = parse_schema(&xml, quiet()).expect("parse_schema failed");
    assert_eq!(parsed.get_type("Venue").map(|t| t.encoded_length()), Some(0));

    let (ir, _) = compile_schema(&xml, quiet(), None).expect("compile_schema failed");
    let tokens = ir.get_message(3).expect("message 3 missing");
    let px = tokens.iter().find(|t| t.signal == Signal::BeginField && t.name == "px").expect("no px");
    assert_eq!(px.offset, 0);
    assert_eq!(tokens[0].size, 8);

    let venue = tokens.iter().find(|t| t.name == "Venue").expect("no Venue encoding");
    let value = read_value(&[], 0, venue, 0).expect("constant read");
    assert_eq!(value.to_string(), "XLON");
}

#[test]
fn test_version_gated_optional_field() {
    let xml = schema(
        3,
        "",
        r#"<message name="Evolving" id="4">
            <field name="base" id="1" type="uint32"/>
            <field name="added" id="2" type="int32" presence="optional" sinceVersion="3"/>
        </message>"#,
    );
    let (ir, _) = compile_schema(&xml, quiet(), None).expect("compile_schema failed");
    let tokens = ir.get_message(4).expect("message 4 missing");
    let added = tokens
        .iter()
        .find(|t| t.signal == Signal::Encoding && t.version == 3)
        .expect("no versioned encoding");

    let buffer = [1, 0, 0, 0, 9, 0, 0, 0];
    assert_eq!(read_value(&buffer, 4, added, 1).expect("gated read"), PrimitiveValue::long(i32::MIN as i64, 4));
    assert_eq!(read_value(&buffer, 4, added, 3).expect("current read"), PrimitiveValue::long(9, 4));
}

#[test]
fn test_idempotent_type_capture() {
    let xml = schema(
        0,
        r#"<enum name="Side" encodingType="uint8"><validValue name="Buy">1</validValue></enum>"#,
        r#"<message name="A" id="1"><field name="s" id="1" type="Side"/></message>
           <message name="B" id="2"><field name="s" id="1" type="Side"/></message>"#,
    );
    let (ir, _) = compile_schema(&xml, quiet(), None).expect("compile_schema failed");
    let type_count = ir.types().count();

    let mut again = ir.clone();
    let tokens = again.get_message(1).expect("message 1 missing").to_vec();
    again.add_message(1, tokens);
    assert_eq!(again.types().count(), type_count);
    assert_eq!(again.messages().count(), 2);
    assert_eq!(again, ir);
}

#[test]
fn test_binary_round_trip_through_file() {
    let xml = schema(
        1,
        r#"<set name="Flags" encodingType="uint16"><choice name="Hot">0</choice><choice name="Cold">9</choice></set>"#,
        r#"<message name="Reading" id="9" semanticType="R">
            <field name="flags" id="1" type="Flags"/>
            <field name="celsius" id="2" type="double"/>
            <data name="label" id="3" type="varDataEncoding"/>
        </message>"#,
    );
    let (ir, bin) = compile_schema(&xml, quiet(), Some("weather")).expect("compile_schema failed");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("integration.sbeir");
    encode_binary_ir_to_file(&ir, &path).expect("write IR");
    assert_eq!(std::fs::read(&path).expect("read back"), bin);

    let decoded = decode_binary_ir_from_file(&path).expect("decode IR");
    assert_eq!(decoded, ir);
    assert_eq!(decoded.applicable_namespace(), "weather");
    assert_eq!(decode_binary_ir(&bin).expect("decode bytes"), decoded);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = decode_binary_ir_from_file(dir.path().join("absent.sbeir"));
    assert!(matches!(result, Err(SbeError::Io(_))));
}
