use std::collections::BTreeMap;

use brine_sbe_schema::{ByteOrder, PrimitiveType};
use serde::Serialize;

use crate::{
    error::SbeError,
    token::{find_end, Signal, Token},
    utils::quote,
};

/// A compiled schema: the header run, one token run per message and every
/// composite, enum and set those runs reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ir {
    pub package_name:     String,
    pub namespace_name:   Option<String>,
    pub id:               i32,
    pub version:          i32,
    pub semantic_version: Option<String>,
    pub byte_order:       ByteOrder,
    header_structure:     HeaderStructure,
    messages:             BTreeMap<i32, Vec<Token>>,
    types:                BTreeMap<String, Vec<Token>>,
}

impl Ir {
    pub fn new(
        package_name: &str,
        namespace_name: Option<&str>,
        id: i32,
        version: i32,
        semantic_version: Option<&str>,
        byte_order: ByteOrder,
        header_tokens: Vec<Token>,
    ) -> Result<Ir, SbeError> {
        let mut ir = Ir {
            package_name: package_name.to_string(),
            namespace_name: namespace_name.map(str::to_string),
            id,
            version,
            semantic_version: semantic_version.map(str::to_string),
            byte_order,
            header_structure: HeaderStructure::new(header_tokens)?,
            messages: BTreeMap::new(),
            types: BTreeMap::new(),
        };

        let header_tokens = ir.header_structure.tokens.clone();
        ir.capture_types(&header_tokens);
        Ok(ir)
    }

    /// Stores the run for `id`, replacing any earlier run, and captures the
    /// types it references. A type seen again is overwritten.
    pub fn add_message(&mut self, id: i32, tokens: Vec<Token>) {
        self.capture_types(&tokens);
        self.messages.insert(id, tokens);
    }

    fn capture_types(&mut self, tokens: &[Token]) {
        for (i, token) in tokens.iter().enumerate() {
            if !matches!(token.signal, Signal::BeginComposite | Signal::BeginEnum | Signal::BeginSet) {
                continue;
            }
            if let Some(end) = find_end(tokens, i) {
                self.types.insert(token.name.clone(), tokens[i..=end].to_vec());
            }
        }
    }

    pub fn get_message(&self, id: i32) -> Option<&[Token]> {
        self.messages.get(&id).map(Vec::as_slice)
    }

    pub fn get_type(&self, name: &str) -> Option<&[Token]> {
        self.types.get(name).map(Vec::as_slice)
    }

    /// Message runs in ascending id order.
    pub fn messages(&self) -> impl Iterator<Item = (i32, &[Token])> {
        self.messages.iter().map(|(id, tokens)| (*id, tokens.as_slice()))
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &[Token])> {
        self.types.iter().map(|(name, tokens)| (name.as_str(), tokens.as_slice()))
    }

    pub fn header_structure(&self) -> &HeaderStructure {
        &self.header_structure
    }

    /// Namespace for generated code, falling back to the package name.
    pub fn applicable_namespace(&self) -> &str {
        self.namespace_name.as_deref().unwrap_or(&self.package_name)
    }
}

/// The message header run and the primitive types of its four well-known
/// members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderStructure {
    tokens:              Vec<Token>,
    block_length_type:   PrimitiveType,
    template_id_type:    PrimitiveType,
    schema_id_type:      PrimitiveType,
    schema_version_type: PrimitiveType,
}

pub const BLOCK_LENGTH: &str = "blockLength";
pub const TEMPLATE_ID: &str = "templateId";
pub const SCHEMA_ID: &str = "schemaId";
pub const SCHEMA_VERSION: &str = "version";

impl HeaderStructure {
    pub fn new(tokens: Vec<Token>) -> Result<HeaderStructure, SbeError> {
        let find = |name: &str| -> Result<PrimitiveType, SbeError> {
            tokens
                .iter()
                .find(|t| t.signal == Signal::Encoding && t.name == name)
                .and_then(|t| t.encoding.primitive_type)
                .ok_or_else(|| SbeError::InvalidHeader(format!("no primitive type for {}", quote(name))))
        };

        Ok(HeaderStructure {
            block_length_type:   find(BLOCK_LENGTH)?,
            template_id_type:    find(TEMPLATE_ID)?,
            schema_id_type:      find(SCHEMA_ID)?,
            schema_version_type: find(SCHEMA_VERSION)?,
            tokens,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn block_length_type(&self) -> PrimitiveType {
        self.block_length_type
    }

    pub fn template_id_type(&self) -> PrimitiveType {
        self.template_id_type
    }

    pub fn schema_id_type(&self) -> PrimitiveType {
        self.schema_id_type
    }

    pub fn schema_version_type(&self) -> PrimitiveType {
        self.schema_version_type
    }

    /// The encoding token of a named header member.
    pub fn member(&self, name: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.signal == Signal::Encoding && t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{update_component_token_counts, EncodingBuilder};

    fn encoding(name: &str, primitive_type: PrimitiveType, offset: i32) -> Token {
        let mut token = Token::new(Signal::Encoding, name);
        token.offset = offset;
        token.size = primitive_type.size() as i32;
        token.encoding = EncodingBuilder::new().primitive_type(primitive_type).build();
        token
    }

    fn header() -> Vec<Token> {
        let mut tokens = vec![
            Token::new(Signal::BeginComposite, "messageHeader"),
            encoding(BLOCK_LENGTH, PrimitiveType::Uint16, 0),
            encoding(TEMPLATE_ID, PrimitiveType::Uint16, 2),
            encoding(SCHEMA_ID, PrimitiveType::Uint16, 4),
            encoding(SCHEMA_VERSION, PrimitiveType::Uint16, 6),
            Token::new(Signal::EndComposite, "messageHeader"),
        ];
        update_component_token_counts(&mut tokens);
        tokens
    }

    fn message(name: &str, id: i32, composite: &str) -> Vec<Token> {
        let mut begin = Token::new(Signal::BeginMessage, name);
        begin.id = id;
        let mut tokens = vec![
            begin.clone(),
            Token::new(Signal::BeginField, "f"),
            Token::new(Signal::BeginComposite, composite),
            encoding("a", PrimitiveType::Int32, 0),
            Token::new(Signal::EndComposite, composite),
            Token::new(Signal::EndField, "f"),
        ];
        begin.signal = Signal::EndMessage;
        tokens.push(begin);
        update_component_token_counts(&mut tokens);
        tokens
    }

    #[test]
    fn header_structure_requires_all_members() {
        let structure = HeaderStructure::new(header()).unwrap();
        assert_eq!(structure.template_id_type(), PrimitiveType::Uint16);
        assert_eq!(structure.member(SCHEMA_ID).map(|t| t.offset), Some(4));

        let mut missing = header();
        missing.remove(2);
        assert!(matches!(HeaderStructure::new(missing), Err(SbeError::InvalidHeader(_))));
    }

    #[test]
    fn add_message_overwrites_and_captures_types() {
        let mut ir = Ir::new("pkg", None, 1, 0, None, ByteOrder::LittleEndian, header()).unwrap();
        assert_eq!(ir.types().count(), 1);

        ir.add_message(5, message("First", 5, "Point"));
        ir.add_message(5, message("Second", 5, "Point"));
        ir.add_message(6, message("Third", 6, "Point"));

        assert_eq!(ir.messages().count(), 2);
        assert_eq!(ir.get_message(5).map(|t| t[0].name.as_str()), Some("Second"));
        assert_eq!(ir.types().count(), 2);
        assert_eq!(ir.get_type("Point").map(|t| t.len()), Some(3));
        assert!(ir.get_message(7).is_none());
    }

    #[test]
    fn namespace_falls_back_to_package() {
        let ir = Ir::new("pkg", None, 1, 0, None, ByteOrder::LittleEndian, header()).unwrap();
        assert_eq!(ir.applicable_namespace(), "pkg");

        let ir = Ir::new("pkg", Some("ns"), 1, 0, None, ByteOrder::LittleEndian, header()).unwrap();
        assert_eq!(ir.applicable_namespace(), "ns");
    }
}
