use brine_sbe_schema::{PrimitiveType, PrimitiveValue};
use serde::Serialize;

/// Size marker for anything whose length is only known on the wire.
pub const VARIABLE_LENGTH: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Required,
    Optional,
    Constant,
}

impl Presence {
    pub fn from_name(name: &str) -> Option<Presence> {
        match name {
            "required" => Some(Presence::Required),
            "optional" => Some(Presence::Optional),
            "constant" => Some(Presence::Constant),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Presence::Required => "required",
            Presence::Optional => "optional",
            Presence::Constant => "constant",
        }
    }
}

/// A named type declared in a `<types>` block or nested inside a composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    pub name:             String,
    pub description:      Option<String>,
    pub presence:         Presence,
    pub semantic_type:    Option<String>,
    pub since_version:    i32,
    pub deprecated:       i32,
    /// Explicit `offset` of a composite member.
    pub offset_attribute: Option<i32>,
    pub kind:             TypeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeKind {
    Encoded(EncodedDataType),
    Composite(CompositeType),
    Enum(EnumType),
    Set(SetType),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedDataType {
    pub primitive_type:     PrimitiveType,
    pub length:             i32,
    pub variable_length:    bool,
    pub const_value:        Option<PrimitiveValue>,
    pub min_value:          Option<PrimitiveValue>,
    pub max_value:          Option<PrimitiveValue>,
    pub null_value:         Option<PrimitiveValue>,
    pub character_encoding: Option<String>,
    pub value_ref:          Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeType {
    pub members: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub encoding_type: PrimitiveType,
    pub null_value:    Option<PrimitiveValue>,
    pub valid_values:  Vec<ValidValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidValue {
    pub name:          String,
    pub description:   Option<String>,
    pub value:         PrimitiveValue,
    pub since_version: i32,
    pub deprecated:    i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetType {
    pub encoding_type: PrimitiveType,
    pub choices:       Vec<Choice>,
}

/// A named bit of a set. `value` holds the bit position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub name:          String,
    pub description:   Option<String>,
    pub value:         PrimitiveValue,
    pub since_version: i32,
    pub deprecated:    i32,
}

impl Type {
    pub fn new(name: &str, kind: TypeKind) -> Type {
        Type {
            name: name.to_string(),
            description: None,
            presence: Presence::Required,
            semantic_type: None,
            since_version: 0,
            deprecated: 0,
            offset_attribute: None,
            kind,
        }
    }

    /// The implicit type behind a bare primitive name such as `uint32`.
    pub fn primitive(primitive_type: PrimitiveType) -> Type {
        Type::new(primitive_type.name(), TypeKind::Encoded(EncodedDataType::new(primitive_type)))
    }

    /// Bytes this type occupies in a block, 0 for constants or
    /// [`VARIABLE_LENGTH`].
    pub fn encoded_length(&self) -> i32 {
        match self.kind {
            TypeKind::Encoded(ref encoded) => {
                if self.presence == Presence::Constant {
                    0
                } else if encoded.variable_length {
                    VARIABLE_LENGTH
                } else {
                    (encoded.primitive_type.size() as i32).saturating_mul(encoded.length)
                }
            }
            TypeKind::Composite(ref composite) => composite.encoded_length(),
            TypeKind::Enum(ref enum_type) => enum_type.encoding_type.size() as i32,
            TypeKind::Set(ref set) => set.encoding_type.size() as i32,
        }
    }

    pub fn is_variable_length(&self) -> bool {
        match self.kind {
            TypeKind::Encoded(ref encoded) => encoded.variable_length,
            TypeKind::Composite(ref composite) => composite.members.iter().any(Type::is_variable_length),
            _ => false,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.presence == Presence::Constant
    }

    pub fn as_encoded(&self) -> Option<&EncodedDataType> {
        match self.kind {
            TypeKind::Encoded(ref encoded) => Some(encoded),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeType> {
        match self.kind {
            TypeKind::Composite(ref composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self.kind {
            TypeKind::Enum(ref enum_type) => Some(enum_type),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetType> {
        match self.kind {
            TypeKind::Set(ref set) => Some(set),
            _ => None,
        }
    }
}

impl EncodedDataType {
    pub fn new(primitive_type: PrimitiveType) -> EncodedDataType {
        EncodedDataType {
            primitive_type,
            length: 1,
            variable_length: false,
            const_value: None,
            min_value: None,
            max_value: None,
            null_value: None,
            character_encoding: None,
            value_ref: None,
        }
    }
}

impl CompositeType {
    pub fn member(&self, name: &str) -> Option<&Type> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn encoded_member(&self, name: &str) -> Option<&EncodedDataType> {
        self.member(name).and_then(Type::as_encoded)
    }

    /// Sum of member sizes, honouring explicit member offsets.
    pub fn encoded_length(&self) -> i32 {
        let mut length = 0;

        for member in &self.members {
            if member.is_variable_length() {
                return VARIABLE_LENGTH;
            }
            if let Some(offset) = member.offset_attribute {
                length = offset;
            }
            if !member.is_constant() {
                length += member.encoded_length();
            }
        }

        length
    }

    /// Copy used by a `data` field: the `varData` member becomes variable length.
    pub fn to_var_data(&self) -> CompositeType {
        let mut composite = self.clone();
        for member in composite.members.iter_mut() {
            if member.name == "varData" {
                if let TypeKind::Encoded(ref mut encoded) = member.kind {
                    encoded.variable_length = true;
                }
            }
        }
        composite
    }
}

impl EnumType {
    pub fn valid_value(&self, name: &str) -> Option<&ValidValue> {
        self.valid_values.iter().find(|v| v.name == name)
    }
}

impl SetType {
    pub fn choice(&self, name: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(name: &str, primitive_type: PrimitiveType) -> Type {
        Type::new(name, TypeKind::Encoded(EncodedDataType::new(primitive_type)))
    }

    #[test]
    fn encoded_length_of_encoded_types() {
        let mut symbol = encoded("Symbol", PrimitiveType::Char);
        if let TypeKind::Encoded(ref mut e) = symbol.kind {
            e.length = 6;
        }
        assert_eq!(symbol.encoded_length(), 6);

        let mut constant = encoded("Flag", PrimitiveType::Uint32);
        constant.presence = Presence::Constant;
        assert_eq!(constant.encoded_length(), 0);

        let mut variable = encoded("varData", PrimitiveType::Uint8);
        if let TypeKind::Encoded(ref mut e) = variable.kind {
            e.variable_length = true;
        }
        assert_eq!(variable.encoded_length(), VARIABLE_LENGTH);
    }

    #[test]
    fn composite_honours_offsets_and_constants() {
        let mut second = encoded("second", PrimitiveType::Uint16);
        second.offset_attribute = Some(4);
        let mut constant = encoded("unit", PrimitiveType::Uint8);
        constant.presence = Presence::Constant;

        let composite = CompositeType {
            members: vec![encoded("first", PrimitiveType::Uint8), second, constant],
        };
        assert_eq!(composite.encoded_length(), 6);
        assert!(composite.member("second").is_some());
        assert!(composite.member("third").is_none());
    }

    #[test]
    fn var_data_composite_is_variable() {
        let composite = CompositeType {
            members: vec![
                encoded("length", PrimitiveType::Uint16),
                encoded("varData", PrimitiveType::Uint8),
            ],
        };
        assert_eq!(composite.encoded_length(), 3);

        let var_data = composite.to_var_data();
        assert_eq!(var_data.encoded_length(), VARIABLE_LENGTH);
        assert!(var_data.encoded_member("varData").map_or(false, |e| e.variable_length));
    }

    #[test]
    fn enum_and_set_sizes() {
        let enum_type = Type::new(
            "Side",
            TypeKind::Enum(EnumType {
                encoding_type: PrimitiveType::Char,
                null_value:    None,
                valid_values:  vec![],
            }),
        );
        assert_eq!(enum_type.encoded_length(), 1);

        let set = Type::new(
            "Flags",
            TypeKind::Set(SetType {
                encoding_type: PrimitiveType::Uint32,
                choices:       vec![],
            }),
        );
        assert_eq!(set.encoded_length(), 4);
    }
}
