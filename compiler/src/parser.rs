use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use brine_sbe_schema::{ByteOrder, PrimitiveType, PrimitiveValue, DEFAULT_CHARACTER_ENCODING};
use lazy_static::lazy_static;
use regex::Regex;
use roxmltree::{Document, Node};

use crate::{
    error::SbeError,
    message::{Field, FieldKind, Message, DEFAULT_EPOCH, DEFAULT_TIME_UNIT, INVALID_ID},
    schema::{primitive_types, MessageSchema, DEFAULT_DIMENSION_TYPE, DEFAULT_HEADER_TYPE},
    types::{Choice, CompositeType, EncodedDataType, EnumType, Presence, SetType, Type, TypeKind, ValidValue},
    utils::quote,
    verifier::{
        check_for_valid_name, check_group_size_encoding, check_message_header, check_var_data_encoding,
        ErrorHandler, ValidationPolicy,
    },
};

lazy_static! {
    static ref VALUE_REF: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)$").unwrap();
}

/// Parses an SBE XML schema and lays out every message.
///
/// Errors and warnings are collected according to `policy`; the collected
/// diagnostics surface as [`SbeError::Validation`].
pub fn parse_schema(xml: &str, policy: ValidationPolicy) -> Result<MessageSchema, SbeError> {
    let mut handler = ErrorHandler::new(policy);
    parse_schema_with_handler(xml, &mut handler)
}

/// Same as [`parse_schema`] but leaves the diagnostics in `handler` so a
/// caller can inspect warnings on success.
pub fn parse_schema_with_handler(xml: &str, handler: &mut ErrorHandler) -> Result<MessageSchema, SbeError> {
    let document = Document::parse(xml)?;
    let root = document.root_element();

    if !root.has_tag_name("messageSchema") {
        return Err(SbeError::Schema(format!(
            "root element must be messageSchema, found {}",
            quote(root.tag_name().name())
        )));
    }

    let parser = SchemaParser {
        handler,
        type_nodes: HashMap::new(),
        types: primitive_types(),
        resolving: HashSet::new(),
        version: 0,
    };
    let schema = parser.parse(root)?;

    tracing::debug!(
        "parsed schema {} with {} types and {} messages",
        quote(&schema.package_name),
        schema.types.len(),
        schema.messages.len()
    );

    Ok(schema)
}

struct SchemaParser<'a, 'input: 'a, 'h> {
    handler:    &'h mut ErrorHandler,
    /// Every named child of a `types` block, for `ref`, `valueRef` and
    /// `encodingType` lookups.
    type_nodes: HashMap<String, Node<'a, 'input>>,
    types:      BTreeMap<String, Rc<Type>>,
    /// Composites currently being parsed, to reject recursive refs.
    resolving:  HashSet<String>,
    version:    i32,
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn tag(node: Node) -> String {
    node.tag_name().name().to_string()
}

fn attr(node: Node, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_attr(node: Node, name: &str) -> Result<String, SbeError> {
    attr(node, name).ok_or_else(|| {
        SbeError::Schema(format!(
            "element {} has empty or missing attribute: {}",
            quote(&tag(node)),
            name
        ))
    })
}

fn int_attr(node: Node, name: &str, default: i32) -> Result<i32, SbeError> {
    match attr(node, name) {
        None => Ok(default),
        Some(value) => value.parse::<i32>().map_err(|_| {
            SbeError::Schema(format!(
                "attribute {} of element {} is not an integer: {}",
                name,
                quote(&tag(node)),
                quote(&value)
            ))
        }),
    }
}

fn required_int_attr(node: Node, name: &str) -> Result<i32, SbeError> {
    required_attr(node, name)?;
    int_attr(node, name, 0)
}

fn bool_attr(node: Node, name: &str, default: bool) -> Result<bool, SbeError> {
    match attr(node, name).as_deref() {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(SbeError::Schema(format!(
            "attribute {} of element {} is not a boolean: {}",
            name,
            quote(&tag(node)),
            quote(other)
        ))),
    }
}

fn presence_attr(node: Node) -> Result<Option<Presence>, SbeError> {
    match attr(node, "presence") {
        None => Ok(None),
        Some(value) => Presence::from_name(&value)
            .map(Some)
            .ok_or_else(|| SbeError::Schema(format!("unknown presence {}", quote(&value)))),
    }
}

fn text(node: Node) -> Option<String> {
    node.text().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

impl<'a, 'input: 'a, 'h> SchemaParser<'a, 'input, 'h> {
    fn parse(mut self, root: Node<'a, 'input>) -> Result<MessageSchema, SbeError> {
        let package_name = required_attr(root, "package")?;
        let id = required_int_attr(root, "id")?;
        self.version = int_attr(root, "version", 0)?;

        let mut schema = MessageSchema::new(&package_name, id, self.version);
        schema.description = attr(root, "description");
        schema.semantic_version = attr(root, "semanticVersion");
        schema.byte_order = attr(root, "byteOrder")
            .map(|b| ByteOrder::from_name(&b))
            .unwrap_or_default();
        schema.header_type = attr(root, "headerType").unwrap_or_else(|| DEFAULT_HEADER_TYPE.to_string());

        let types_nodes: Vec<Node<'a, 'input>> = elements(root).filter(|n| n.has_tag_name("types")).collect();

        for types_node in &types_nodes {
            for child in elements(*types_node) {
                if let Some(name) = attr(child, "name") {
                    self.type_nodes.insert(name, child);
                }
            }
        }

        for types_node in &types_nodes {
            for child in elements(*types_node) {
                if let Some(type_) = self.parse_type_node(child)? {
                    self.add_type(type_)?;
                }
            }
        }

        match self.types.get(&schema.header_type).and_then(|t| t.as_composite()) {
            Some(header) => check_message_header(self.handler, &schema.header_type, header)?,
            None => self.handler.error(format!(
                "message header type not found or not a composite: {}",
                quote(&schema.header_type)
            ))?,
        }

        self.handler.check_if_should_exit()?;

        let mut names = HashSet::new();
        for node in elements(root).filter(|n| n.has_tag_name("message")) {
            let mut message = self.parse_message(node, &schema.header_type)?;

            if schema.messages.contains_key(&message.id) {
                self.handler.error(format!("message template id already exists: {}", message.id))?;
                continue;
            }
            if !names.insert(message.name.clone()) {
                self.handler.warning(format!("message name already exists: {}", quote(&message.name)))?;
            }

            message.compute_layout(self.handler)?;
            schema.messages.insert(message.id, message);
        }

        schema.types = std::mem::take(&mut self.types);
        self.handler.check_if_should_exit()?;

        Ok(schema)
    }

    fn add_type(&mut self, type_: Type) -> Result<(), SbeError> {
        if self.types.contains_key(&type_.name) {
            self.handler.warning(format!("type already exists for name: {}", quote(&type_.name)))?;
        }
        self.types.insert(type_.name.clone(), Rc::new(type_));
        Ok(())
    }

    fn parse_type_node(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        if node.has_tag_name("type") {
            self.parse_encoded(node)
        } else if node.has_tag_name("composite") {
            self.parse_composite(node)
        } else if node.has_tag_name("enum") {
            self.parse_enum(node)
        } else if node.has_tag_name("set") {
            self.parse_set(node)
        } else {
            Ok(None)
        }
    }

    /// Fills the attributes every type shares.
    fn finish_type(&mut self, node: Node, name: String, presence: Presence, kind: TypeKind) -> Result<Type, SbeError> {
        check_for_valid_name(self.handler, &name)?;

        let offset_attribute = match attr(node, "offset") {
            Some(_) => Some(int_attr(node, "offset", 0)?),
            None => None,
        };

        Ok(Type {
            name,
            description: attr(node, "description"),
            presence,
            semantic_type: attr(node, "semanticType"),
            since_version: int_attr(node, "sinceVersion", 0)?,
            deprecated: int_attr(node, "deprecated", 0)?,
            offset_attribute,
            kind,
        })
    }

    fn parse_literal(
        &mut self,
        literal: &str,
        primitive_type: PrimitiveType,
        context: &str,
    ) -> Result<Option<PrimitiveValue>, SbeError> {
        match PrimitiveValue::parse(literal, primitive_type) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.handler.error(format!("{} in {}", e, quote(context)))?;
                Ok(None)
            }
        }
    }

    fn optional_literal(
        &mut self,
        node: Node,
        name: &str,
        primitive_type: PrimitiveType,
        context: &str,
    ) -> Result<Option<PrimitiveValue>, SbeError> {
        match attr(node, name) {
            Some(literal) => self.parse_literal(&literal, primitive_type, context),
            None => Ok(None),
        }
    }

    fn parse_encoded(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        let name = required_attr(node, "name")?;
        let presence = presence_attr(node)?.unwrap_or_default();
        let primitive_name = required_attr(node, "primitiveType")?;

        let primitive_type = match PrimitiveType::from_name(&primitive_name) {
            Some(p) => p,
            None => {
                self.handler.error(format!(
                    "unknown primitiveType {} for type {}",
                    quote(&primitive_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };

        let mut encoded = EncodedDataType::new(primitive_type);
        encoded.length = int_attr(node, "length", 1)?;
        if encoded.length < 0 {
            self.handler.error(format!("type {} has negative length {}", quote(&name), encoded.length))?;
            return Ok(None);
        }
        if (primitive_type.size() as i32).checked_mul(encoded.length).is_none() {
            self.handler.error(format!("length {} of type {} is too large", encoded.length, quote(&name)))?;
            return Ok(None);
        }
        encoded.variable_length = bool_attr(node, "variableLength", false)?;
        encoded.value_ref = attr(node, "valueRef");
        encoded.character_encoding = match attr(node, "characterEncoding") {
            Some(e) => Some(e),
            None if primitive_type == PrimitiveType::Char => Some(DEFAULT_CHARACTER_ENCODING.to_string()),
            None => None,
        };

        if presence == Presence::Constant {
            let literal = match encoded.value_ref.clone() {
                Some(value_ref) => self.lookup_value_ref(&value_ref)?,
                None => text(node),
            };

            match literal {
                None => self.handler.error(format!(
                    "type {} has declared presence \"constant\" but no value",
                    quote(&name)
                ))?,
                Some(literal) => {
                    let parsed = if primitive_type == PrimitiveType::Char && encoded.length > 1 {
                        let encoding = encoded
                            .character_encoding
                            .clone()
                            .unwrap_or_else(|| DEFAULT_CHARACTER_ENCODING.to_string());
                        PrimitiveValue::parse_array(&literal, encoded.length as usize, &encoding)
                    } else {
                        PrimitiveValue::parse(&literal, primitive_type)
                    };

                    match parsed {
                        Ok(value) => encoded.const_value = Some(value),
                        Err(e) => self.handler.error(format!("{} in {}", e, quote(&name)))?,
                    }
                }
            }
        }

        encoded.min_value = self.optional_literal(node, "minValue", primitive_type, &name)?;
        encoded.max_value = self.optional_literal(node, "maxValue", primitive_type, &name)?;
        encoded.null_value = self.optional_literal(node, "nullValue", primitive_type, &name)?;

        if encoded.null_value.is_some() && presence != Presence::Optional {
            self.handler
                .warning(format!("nullValue set, but presence is not optional for {}", quote(&name)))?;
        }

        Ok(Some(self.finish_type(node, name, presence, TypeKind::Encoded(encoded))?))
    }

    /// Resolves `Enum.Value` to the text of that valid value.
    fn lookup_value_ref(&mut self, value_ref: &str) -> Result<Option<String>, SbeError> {
        let (enum_name, value_name) = match VALUE_REF.captures(value_ref) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => {
                self.handler.error(format!("valueRef format not valid (enum.value): {}", quote(value_ref)))?;
                return Ok(None);
            }
        };

        let enum_node = match self.type_nodes.get(&enum_name) {
            Some(node) if node.has_tag_name("enum") => *node,
            _ => {
                self.handler.error(format!("valueRef for enum name not found: {}", quote(&enum_name)))?;
                return Ok(None);
            }
        };

        let value = elements(enum_node)
            .filter(|n| n.has_tag_name("validValue"))
            .find(|n| attr(*n, "name").as_deref() == Some(value_name.as_str()))
            .and_then(text);

        if value.is_none() {
            self.handler
                .error(format!("valueRef for validValue name not found: {}", quote(&value_name)))?;
        }

        Ok(value)
    }

    fn parse_composite(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        let name = required_attr(node, "name")?;
        let presence = presence_attr(node)?.unwrap_or_default();

        self.resolving.insert(name.clone());
        let members = self.parse_members_of_composite(node, &name);
        self.resolving.remove(&name);

        let composite = CompositeType { members: members? };
        self.check_for_valid_offsets(&name, &composite)?;

        Ok(Some(self.finish_type(node, name, presence, TypeKind::Composite(composite))?))
    }

    fn parse_members_of_composite(&mut self, node: Node<'a, 'input>, name: &str) -> Result<Vec<Type>, SbeError> {
        let mut members: Vec<Type> = Vec::new();

        for child in elements(node) {
            let member = if child.has_tag_name("ref") {
                self.parse_ref(child)?
            } else {
                self.parse_type_node(child)?
            };

            let member = match member {
                Some(m) => m,
                None => continue,
            };

            if members.iter().any(|m| m.name == member.name) {
                self.handler.error(format!(
                    "composite {} already contains a member named {}",
                    quote(name),
                    quote(&member.name)
                ))?;
                continue;
            }

            members.push(member);
        }

        Ok(members)
    }

    /// A `<ref name=".." type=".." offset=".."/>` member: a copy of a named
    /// type under a new name.
    fn parse_ref(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        let name = required_attr(node, "name")?;
        let type_name = required_attr(node, "type")?;

        if self.resolving.contains(&type_name) {
            self.handler.error(format!("ref {} to {} is recursive", quote(&name), quote(&type_name)))?;
            return Ok(None);
        }

        let referenced = match self.types.get(&type_name) {
            Some(t) => Some((**t).clone()),
            None => match self.type_nodes.get(&type_name).copied() {
                Some(type_node) => self.parse_type_node(type_node)?,
                None => None,
            },
        };

        let mut member = match referenced {
            Some(t) => t,
            None => {
                self.handler.error(format!("ref type not found: {}", quote(&type_name)))?;
                return Ok(None);
            }
        };

        check_for_valid_name(self.handler, &name)?;
        member.name = name;
        member.offset_attribute = match attr(node, "offset") {
            Some(_) => Some(int_attr(node, "offset", 0)?),
            None => None,
        };
        member.since_version = int_attr(node, "sinceVersion", member.since_version)?;

        Ok(Some(member))
    }

    fn check_for_valid_offsets(&mut self, name: &str, composite: &CompositeType) -> Result<(), SbeError> {
        let mut offset = 0;

        for member in &composite.members {
            if let Some(offset_attribute) = member.offset_attribute {
                if offset_attribute < offset {
                    self.handler.error(format!(
                        "composite element {} of {} has incorrect offset specified",
                        quote(&member.name),
                        quote(name)
                    ))?;
                }
                offset = offset_attribute;
            }
            // Offsets after a variable length member are not known until encoding.
            if member.is_variable_length() {
                break;
            }
            offset += member.encoded_length();
        }

        Ok(())
    }

    /// Primitive behind an `encodingType`: a primitive name or a named `type`.
    fn resolve_encoding_type(&self, name: &str) -> Option<PrimitiveType> {
        PrimitiveType::from_name(name).or_else(|| {
            self.type_nodes
                .get(name)
                .filter(|n| n.has_tag_name("type"))
                .and_then(|n| attr(*n, "primitiveType"))
                .and_then(|p| PrimitiveType::from_name(&p))
        })
    }

    fn parse_enum(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        let name = required_attr(node, "name")?;
        let presence = presence_attr(node)?.unwrap_or_default();
        let encoding_name = required_attr(node, "encodingType")?;

        let encoding_type = match self.resolve_encoding_type(&encoding_name) {
            Some(p @ PrimitiveType::Char) | Some(p @ PrimitiveType::Uint8) => p,
            _ => {
                self.handler.error(format!(
                    "illegal encodingType {} for enum {}",
                    quote(&encoding_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };

        let null_value = match attr(node, "nullValue") {
            Some(literal) => {
                if presence != Presence::Optional {
                    self.handler
                        .error(format!("nullValue set, but presence is not optional for {}", quote(&name)))?;
                }
                self.parse_literal(&literal, encoding_type, &name)?
            }
            None => None,
        };

        let mut valid_values: Vec<ValidValue> = Vec::new();
        for child in elements(node).filter(|n| n.has_tag_name("validValue")) {
            let value_name = required_attr(child, "name")?;
            check_for_valid_name(self.handler, &value_name)?;

            let literal = text(child).unwrap_or_default();
            let value = match self.parse_literal(&literal, encoding_type, &value_name)? {
                Some(v) => v,
                None => continue,
            };

            if valid_values.iter().any(|v| v.name == value_name) {
                self.handler
                    .error(format!("validValue already exists for name: {}", quote(&value_name)))?;
                continue;
            }
            if valid_values.iter().any(|v| v.value == value) {
                self.handler.error(format!("validValue already exists for value: {}", value))?;
                continue;
            }

            valid_values.push(ValidValue {
                name: value_name,
                description: attr(child, "description"),
                value,
                since_version: int_attr(child, "sinceVersion", 0)?,
                deprecated: int_attr(child, "deprecated", 0)?,
            });
        }

        let enum_type = EnumType {
            encoding_type,
            null_value,
            valid_values,
        };

        Ok(Some(self.finish_type(node, name, presence, TypeKind::Enum(enum_type))?))
    }

    fn parse_set(&mut self, node: Node<'a, 'input>) -> Result<Option<Type>, SbeError> {
        let name = required_attr(node, "name")?;
        let presence = presence_attr(node)?.unwrap_or_default();
        let encoding_name = required_attr(node, "encodingType")?;

        let encoding_type = match self.resolve_encoding_type(&encoding_name) {
            Some(p) if p.is_unsigned() => p,
            _ => {
                self.handler.error(format!(
                    "illegal encodingType {} for set {}",
                    quote(&encoding_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };
        let bits = 8 * encoding_type.size() as i64;

        let mut choices: Vec<Choice> = Vec::new();
        for child in elements(node).filter(|n| n.has_tag_name("choice")) {
            let choice_name = required_attr(child, "name")?;
            check_for_valid_name(self.handler, &choice_name)?;

            let literal = text(child).unwrap_or_default();
            let value = match self.parse_literal(&literal, encoding_type, &choice_name)? {
                Some(v) => v,
                None => continue,
            };

            let position = value.as_long().unwrap_or(-1);
            if position < 0 || position >= bits {
                self.handler.error(format!(
                    "choice {} value out of bounds: {}",
                    quote(&choice_name),
                    position
                ))?;
                continue;
            }

            if choices.iter().any(|c| c.name == choice_name) {
                self.handler.warning(format!("choice already exists for name: {}", quote(&choice_name)))?;
                continue;
            }
            if choices.iter().any(|c| c.value == value) {
                self.handler.warning(format!("choice already exists for value: {}", position))?;
                continue;
            }

            choices.push(Choice {
                name: choice_name,
                description: attr(child, "description"),
                value,
                since_version: int_attr(child, "sinceVersion", 0)?,
                deprecated: int_attr(child, "deprecated", 0)?,
            });
        }

        let set = SetType { encoding_type, choices };

        Ok(Some(self.finish_type(node, name, presence, TypeKind::Set(set))?))
    }

    fn parse_message(&mut self, node: Node<'a, 'input>, header_type: &str) -> Result<Message, SbeError> {
        let id = required_int_attr(node, "id")?;
        let name = required_attr(node, "name")?;
        check_for_valid_name(self.handler, &name)?;

        let fields = self.parse_members(node)?;

        Ok(Message {
            id,
            name,
            description: attr(node, "description"),
            declared_block_length: int_attr(node, "blockLength", 0)?,
            computed_block_length: 0,
            semantic_type: attr(node, "semanticType"),
            since_version: int_attr(node, "sinceVersion", 0)?,
            deprecated: int_attr(node, "deprecated", 0)?,
            header_type: header_type.to_string(),
            fields,
        })
    }

    /// Parses the `field`, `group` and `data` children of a message or group,
    /// in that order, and links entry-count and length fields.
    fn parse_members(&mut self, node: Node<'a, 'input>) -> Result<Vec<Field>, SbeError> {
        let mut fields: Vec<Field> = Vec::new();
        let mut seen_group = false;
        let mut seen_data = false;

        for child in elements(node) {
            let field = if child.has_tag_name("field") {
                if seen_group || seen_data {
                    self.handler.error(format!(
                        "field {} must come before any group or data element",
                        quote(&attr(child, "name").unwrap_or_default())
                    ))?;
                }
                self.parse_field(child)?
            } else if child.has_tag_name("group") {
                if seen_data {
                    self.handler.error(format!(
                        "group {} must come before any data element",
                        quote(&attr(child, "name").unwrap_or_default())
                    ))?;
                }
                seen_group = true;
                self.parse_group(child)?
            } else if child.has_tag_name("data") {
                seen_data = true;
                self.parse_data(child)?
            } else {
                continue;
            };

            let field = match field {
                Some(f) => f,
                None => continue,
            };

            if fields.iter().any(|f| f.name == field.name) {
                self.handler.error(format!("duplicate name found: {}", quote(&field.name)))?;
            }
            if field.id != INVALID_ID && fields.iter().any(|f| f.id == field.id) {
                self.handler.error(format!("duplicate id found: {}", field.id))?;
            }

            fields.push(field);
        }

        self.link_fields(&mut fields)?;

        Ok(fields)
    }

    fn link_fields(&mut self, fields: &mut [Field]) -> Result<(), SbeError> {
        for i in 0..fields.len() {
            if let Some(group_name) = fields[i].group_name.clone() {
                match (i + 1..fields.len()).find(|&j| fields[j].is_group() && fields[j].name == group_name) {
                    Some(j) => {
                        fields[i].group_field = Some(j);
                        fields[j].entry_count_field = Some(i);
                    }
                    None => self.handler.warning(format!(
                        "could not find group {} for entry count field {}",
                        quote(&group_name),
                        quote(&fields[i].name)
                    ))?,
                }
            }

            if fields[i].ref_id != INVALID_ID {
                let ref_id = fields[i].ref_id;
                match (0..fields.len()).find(|&j| fields[j].is_data() && fields[j].id == ref_id) {
                    Some(j) => {
                        fields[i].data_field = Some(j);
                        fields[j].length_field = Some(i);
                    }
                    None => self.handler.warning(format!(
                        "could not find data field with id {} for length field {}",
                        ref_id,
                        quote(&fields[i].name)
                    ))?,
                }
            }
        }

        Ok(())
    }

    /// Attributes shared by `field`, `group` and `data`.
    fn field_attributes(&mut self, node: Node, field: &mut Field, type_: Option<&Type>) -> Result<(), SbeError> {
        check_for_valid_name(self.handler, &field.name)?;

        field.description = attr(node, "description");
        field.offset = int_attr(node, "offset", 0)?;
        field.semantic_type = attr(node, "semanticType");
        field.presence = match presence_attr(node)? {
            Some(p) => p,
            None => type_.map_or(Presence::Required, |t| t.presence),
        };
        field.value_ref = attr(node, "valueRef");
        field.since_version = int_attr(node, "sinceVersion", 0)?;
        field.deprecated = int_attr(node, "deprecated", 0)?;
        field.epoch = attr(node, "epoch").unwrap_or_else(|| DEFAULT_EPOCH.to_string());
        field.time_unit = attr(node, "timeUnit").unwrap_or_else(|| DEFAULT_TIME_UNIT.to_string());
        field.group_name = attr(node, "groupName");
        field.ref_id = int_attr(node, "refId", INVALID_ID)?;

        if field.since_version > self.version {
            self.handler.error(format!(
                "sinceVersion {} of {} is greater than schema version {}",
                field.since_version,
                quote(&field.name),
                self.version
            ))?;
        }

        Ok(())
    }

    fn parse_field(&mut self, node: Node<'a, 'input>) -> Result<Option<Field>, SbeError> {
        let name = required_attr(node, "name")?;
        let id = required_int_attr(node, "id")?;
        let type_name = required_attr(node, "type")?;

        let type_ = match self.types.get(&type_name).cloned() {
            Some(t) => t,
            None => {
                self.handler.error(format!(
                    "could not find type {} for field {}",
                    quote(&type_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };

        let mut field = Field::new(&name, id, FieldKind::Field { type_: type_.clone() });
        self.field_attributes(node, &mut field, Some(type_.as_ref()))?;
        self.validate_field(&field, &type_)?;

        Ok(Some(field))
    }

    fn validate_field(&mut self, field: &Field, type_: &Type) -> Result<(), SbeError> {
        if let (Some(field_semantic), Some(type_semantic)) = (&field.semantic_type, &type_.semantic_type) {
            if field_semantic != type_semantic {
                self.handler
                    .error(format!("mismatched semanticType on type and field: {}", quote(&field.name)))?;
            }
        }

        if type_.as_enum().is_some() && field.presence == Presence::Constant && field.value_ref.is_none() {
            self.handler.error(format!("valueRef not set for constant enum {}", quote(&field.name)))?;
        }

        let value_ref = match field.value_ref {
            Some(ref v) => v.clone(),
            None => return Ok(()),
        };

        let (enum_name, value_name) = match VALUE_REF.captures(&value_ref) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => {
                self.handler.error(format!("valueRef format not valid (enum.value): {}", quote(&value_ref)))?;
                return Ok(());
            }
        };

        let enum_type = match self.types.get(&enum_name).and_then(|t| t.as_enum()).cloned() {
            Some(e) => e,
            None => {
                self.handler.error(format!("valueRef for enum name not found: {}", quote(&enum_name)))?;
                return Ok(());
            }
        };

        if enum_type.valid_value(&value_name).is_none() {
            self.handler
                .error(format!("valueRef for validValue name not found: {}", quote(&value_name)))?;
        }

        if field.presence == Presence::Constant {
            match type_.kind {
                TypeKind::Enum(_) if type_.name != enum_name => {
                    self.handler.error(format!("valueRef for enum name not found: {}", quote(&enum_name)))?
                }
                TypeKind::Enum(_) => {}
                TypeKind::Encoded(ref encoded) if encoded.primitive_type == enum_type.encoding_type => {}
                _ => self.handler.error(format!("valueRef does not match field type: {}", quote(&value_ref)))?,
            }
        }

        Ok(())
    }

    fn parse_group(&mut self, node: Node<'a, 'input>) -> Result<Option<Field>, SbeError> {
        let name = required_attr(node, "name")?;
        let id = int_attr(node, "id", INVALID_ID)?;
        let block_length = int_attr(node, "blockLength", 0)?;
        let dimension_name = attr(node, "dimensionType").unwrap_or_else(|| DEFAULT_DIMENSION_TYPE.to_string());

        let dimension_type = match self.types.get(&dimension_name).cloned() {
            Some(t) if t.as_composite().is_some() => t,
            _ => {
                self.handler.error(format!(
                    "could not find dimensionType {} for group {}",
                    quote(&dimension_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };

        if let Some(composite) = dimension_type.as_composite() {
            check_group_size_encoding(self.handler, &dimension_name, composite)?;
        }

        let fields = self.parse_members(node)?;
        let mut field = Field::new(
            &name,
            id,
            FieldKind::Group {
                dimension_type,
                block_length,
                fields,
            },
        );
        self.field_attributes(node, &mut field, None)?;

        Ok(Some(field))
    }

    fn parse_data(&mut self, node: Node<'a, 'input>) -> Result<Option<Field>, SbeError> {
        let name = required_attr(node, "name")?;
        let id = required_int_attr(node, "id")?;
        let type_name = required_attr(node, "type")?;

        let type_ = match self.types.get(&type_name).cloned() {
            Some(t) if t.as_composite().is_some() => t,
            _ => {
                self.handler.error(format!(
                    "could not find composite type {} for data field {}",
                    quote(&type_name),
                    quote(&name)
                ))?;
                return Ok(None);
            }
        };

        let var_data = match type_.as_composite() {
            Some(composite) => {
                check_var_data_encoding(self.handler, &type_name, composite)?;
                Type {
                    kind: TypeKind::Composite(composite.to_var_data()),
                    ..(*type_).clone()
                }
            }
            None => return Ok(None),
        };

        let var_data = Rc::new(var_data);
        let mut field = Field::new(&name, id, FieldKind::Data { type_: var_data.clone() });
        self.field_attributes(node, &mut field, Some(var_data.as_ref()))?;

        Ok(Some(field))
    }
}
