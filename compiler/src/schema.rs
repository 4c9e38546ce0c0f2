use std::collections::BTreeMap;
use std::rc::Rc;

use brine_sbe_schema::{ByteOrder, PrimitiveType};

use crate::{
    message::Message,
    types::{CompositeType, Type},
};

pub const DEFAULT_HEADER_TYPE: &str = "messageHeader";
pub const DEFAULT_DIMENSION_TYPE: &str = "groupSizeEncoding";

/// A parsed `messageSchema` document.
#[derive(Debug, Clone)]
pub struct MessageSchema {
    pub package_name:     String,
    pub description:      Option<String>,
    pub id:               i32,
    pub version:          i32,
    pub semantic_version: Option<String>,
    pub byte_order:       ByteOrder,
    pub header_type:      String,
    pub types:            BTreeMap<String, Rc<Type>>,
    pub messages:         BTreeMap<i32, Message>,
}

impl MessageSchema {
    pub fn new(package_name: &str, id: i32, version: i32) -> MessageSchema {
        MessageSchema {
            package_name: package_name.to_string(),
            description: None,
            id,
            version,
            semantic_version: None,
            byte_order: ByteOrder::LittleEndian,
            header_type: DEFAULT_HEADER_TYPE.to_string(),
            types: primitive_types(),
            messages: BTreeMap::new(),
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&Rc<Type>> {
        self.types.get(name)
    }

    pub fn get_message(&self, id: i32) -> Option<&Message> {
        self.messages.get(&id)
    }

    /// Messages in ascending id order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn message_header(&self) -> Option<&CompositeType> {
        self.get_type(&self.header_type).and_then(|t| t.as_composite())
    }
}

/// The type map every schema starts from: one entry per primitive name.
pub fn primitive_types() -> BTreeMap<String, Rc<Type>> {
    PrimitiveType::ALL
        .iter()
        .map(|p| (p.name().to_string(), Rc::new(Type::primitive(*p))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_primitive_types() {
        let schema = MessageSchema::new("baseline", 1, 0);
        assert_eq!(schema.types.len(), 11);
        assert_eq!(schema.get_type("uint32").map(|t| t.encoded_length()), Some(4));
        assert!(schema.message_header().is_none());
        assert_eq!(schema.messages().count(), 0);
    }
}
