#![cfg(test)]

use brine_sbe_compiler::{compile_schema, decode_binary_ir, token::Signal, ValidationPolicy};
use proptest::prelude::*;

const PRIMITIVES: [(&str, i32); 11] = [
    ("char", 1),
    ("int8", 1),
    ("int16", 2),
    ("int32", 4),
    ("int64", 8),
    ("uint8", 1),
    ("uint16", 2),
    ("uint32", 4),
    ("uint64", 8),
    ("float", 4),
    ("double", 8),
];

fn schema_with_fields(kinds: &[usize]) -> String {
    let fields: String = kinds
        .iter()
        .enumerate()
        .map(|(i, k)| format!(r#"<field name="f{}" id="{}" type="{}"/>"#, i, i + 1, PRIMITIVES[*k].0))
        .collect();

    format!(
        r#"<messageSchema package="prop" id="1">
            <types>
                <composite name="messageHeader">
                    <type name="blockLength" primitiveType="uint16"/>
                    <type name="templateId" primitiveType="uint16"/>
                    <type name="schemaId" primitiveType="uint16"/>
                    <type name="version" primitiveType="uint16"/>
                </composite>
            </types>
            <message name="Generated" id="1">{}</message>
        </messageSchema>"#,
        fields
    )
}

proptest! {
    #[test]
    fn decoding_arbitrary_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_binary_ir(&bytes);
    }

    #[test]
    fn decoding_corrupted_ir_never_panics(flips in proptest::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8)) {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (_, mut bin) = compile_schema(&schema_with_fields(&[3, 6, 10]), policy, None).unwrap();
        for (index, value) in flips {
            let i = index.index(bin.len());
            bin[i] = value;
        }
        let _ = decode_binary_ir(&bin);
    }

    #[test]
    fn fixed_offsets_are_packed_in_order(kinds in proptest::collection::vec(0..PRIMITIVES.len(), 1..16)) {
        let policy = ValidationPolicy { suppress_output: true, ..Default::default() };
        let (ir, _) = compile_schema(&schema_with_fields(&kinds), policy, None).unwrap();
        let tokens = ir.get_message(1).unwrap();

        let offsets: Vec<i32> = tokens.iter().filter(|t| t.signal == Signal::BeginField).map(|t| t.offset).collect();
        let mut expected = 0;
        for (offset, kind) in offsets.iter().zip(&kinds) {
            prop_assert_eq!(*offset, expected);
            expected += PRIMITIVES[*kind].1;
        }
        prop_assert_eq!(tokens[0].size, expected);
    }
}
