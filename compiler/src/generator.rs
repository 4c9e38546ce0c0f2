use brine_sbe_schema::{ByteOrder, PrimitiveValue};

use crate::{
    error::SbeError,
    ir::Ir,
    message::{Field, FieldKind, Message},
    schema::MessageSchema,
    token::{find_end, update_component_token_counts, EncodingBuilder, Signal, Token},
    types::{CompositeType, EncodedDataType, EnumType, Presence, SetType, Type, TypeKind},
    utils::quote,
};

/// Flattens a [`MessageSchema`] into token runs.
pub struct IrGenerator {
    tokens:     Vec<Token>,
    byte_order: ByteOrder,
}

impl IrGenerator {
    /// Builds the [`Ir`] for `schema`: the header run first, then one run per
    /// message in ascending id order.
    pub fn generate(schema: &MessageSchema, namespace: Option<&str>) -> Result<Ir, SbeError> {
        let header = schema.get_type(&schema.header_type).ok_or_else(|| {
            SbeError::InvalidHeader(format!("header type not found: {}", quote(&schema.header_type)))
        })?;
        if header.as_composite().is_none() {
            return Err(SbeError::InvalidHeader(format!(
                "header type is not a composite: {}",
                quote(&schema.header_type)
            )));
        }

        let mut generator = IrGenerator::new(schema.byte_order);
        generator.add_type(header, 0, None);
        let header_tokens = generator.finish();

        let mut ir = Ir::new(
            &schema.package_name,
            namespace,
            schema.id,
            schema.version,
            schema.semantic_version.as_deref(),
            schema.byte_order,
            header_tokens,
        )?;

        for message in schema.messages() {
            let mut generator = IrGenerator::new(schema.byte_order);
            generator.add_message(message);
            ir.add_message(message.id, generator.finish());
        }

        tracing::debug!(
            "generated IR for {}: {} message(s), {} type(s)",
            quote(&schema.package_name),
            ir.messages().count(),
            ir.types().count()
        );

        Ok(ir)
    }

    fn new(byte_order: ByteOrder) -> IrGenerator {
        IrGenerator {
            tokens: Vec::new(),
            byte_order,
        }
    }

    fn finish(mut self) -> Vec<Token> {
        update_component_token_counts(&mut self.tokens);
        self.tokens
    }

    fn add_message(&mut self, message: &Message) {
        self.add_message_signal(message, Signal::BeginMessage);
        self.add_all_fields(&message.fields);
        self.add_message_signal(message, Signal::EndMessage);
    }

    fn add_message_signal(&mut self, message: &Message, signal: Signal) {
        let mut token = Token::new(signal, &message.name);
        token.description = message.description.clone();
        token.size = message.block_length();
        token.id = message.id;
        token.version = message.since_version;
        token.deprecated = message.deprecated;
        token.encoding = EncodingBuilder::new().semantic_type(message.semantic_type.clone()).build();
        self.tokens.push(token);
    }

    fn add_field_signal(&mut self, field: &Field, signal: Signal) -> usize {
        let mut encoding = EncodingBuilder::new()
            .epoch(Some(field.epoch.clone()))
            .time_unit(Some(field.time_unit.clone()))
            .presence(field.presence)
            .semantic_type(semantic_type_of(None, Some(field)));

        if field.presence == Presence::Constant {
            if let Some(ref value_ref) = field.value_ref {
                let value = PrimitiveValue::bytes(value_ref.as_bytes().to_vec(), "UTF-8");
                encoding = encoding
                    .const_value(Some(value))
                    .primitive_type(brine_sbe_schema::PrimitiveType::Char);
            }
        }

        let mut token = Token::new(signal, &field.name);
        token.description = field.description.clone();
        token.size = field.computed_block_length;
        token.id = field.id;
        token.offset = field.computed_offset;
        token.version = field.since_version;
        token.deprecated = field.deprecated;
        token.encoding = encoding.build();

        self.tokens.push(token);
        self.tokens.len() - 1
    }

    fn add_all_fields(&mut self, fields: &[Field]) {
        let mut begins = Vec::with_capacity(fields.len());

        for field in fields {
            match field.kind {
                FieldKind::Group { ref dimension_type, ref fields, .. } => {
                    begins.push(self.add_field_signal(field, Signal::BeginGroup));
                    self.add_type(dimension_type, 0, Some(field));
                    self.add_all_fields(fields);
                    self.add_field_signal(field, Signal::EndGroup);
                }
                FieldKind::Data { ref type_ } => {
                    begins.push(self.add_field_signal(field, Signal::BeginVarData));
                    self.add_type(type_, field.computed_offset, Some(field));
                    self.add_field_signal(field, Signal::EndVarData);
                }
                FieldKind::Field { ref type_ } => {
                    begins.push(self.add_field_signal(field, Signal::BeginField));
                    self.add_type(type_, field.computed_offset, Some(field));
                    self.add_field_signal(field, Signal::EndField);
                }
            }
        }

        self.link_fields(fields, &begins);
    }

    /// Points the begin and end tokens of linked siblings at each other's
    /// begin token.
    fn link_fields(&mut self, fields: &[Field], begins: &[usize]) {
        for (i, field) in fields.iter().enumerate() {
            let target = field
                .entry_count_field
                .or(field.length_field)
                .or(field.group_field)
                .or(field.data_field);

            let target = match target.and_then(|j| begins.get(j)) {
                Some(&t) => t as i32,
                None => continue,
            };

            let begin = begins[i];
            self.tokens[begin].ref_id = target;
            if let Some(end) = find_end(&self.tokens, begin) {
                self.tokens[end].ref_id = target;
            }
        }
    }

    fn add_type(&mut self, type_: &Type, offset: i32, field: Option<&Field>) {
        match type_.kind {
            TypeKind::Encoded(ref encoded) => self.add_encoded(type_, encoded, offset, field),
            TypeKind::Composite(ref composite) => self.add_composite(type_, composite, offset, field),
            TypeKind::Enum(ref enum_type) => self.add_enum(type_, enum_type, offset, field),
            TypeKind::Set(ref set) => self.add_set(type_, set, offset, field),
        }
    }

    /// A begin token for a composite, enum or set. Field level version,
    /// deprecation and description take precedence over the type's.
    fn begin_token(&self, signal: Signal, type_: &Type, offset: i32, size: i32, field: Option<&Field>) -> Token {
        let mut token = Token::new(signal, &type_.name);
        token.description = type_.description.clone();
        token.offset = offset;
        token.size = size;
        token.version = type_.since_version;
        token.deprecated = type_.deprecated;

        if let Some(field) = field {
            token.version = field.since_version;
            token.deprecated = field.deprecated;
            if let Some(ref description) = field.description {
                if !description.is_empty() {
                    token.description = Some(description.clone());
                }
            }
        }

        token
    }

    fn add_composite(&mut self, type_: &Type, composite: &CompositeType, offset: i32, field: Option<&Field>) {
        let mut begin = self.begin_token(Signal::BeginComposite, type_, offset, type_.encoded_length(), field);
        begin.encoding = EncodingBuilder::new().semantic_type(semantic_type_of(Some(type_), field)).build();
        self.tokens.push(begin.clone());

        let mut member_offset = 0;
        for member in &composite.members {
            if let Some(explicit) = member.offset_attribute {
                member_offset = explicit;
            }
            self.add_type(member, member_offset, None);
            member_offset += member.encoded_length();
        }

        begin.signal = Signal::EndComposite;
        self.tokens.push(begin);
    }

    fn add_enum(&mut self, type_: &Type, enum_type: &EnumType, offset: i32, field: Option<&Field>) {
        let encoding_type = enum_type.encoding_type;
        let mut encoding = EncodingBuilder::new()
            .primitive_type(encoding_type)
            .byte_order(self.byte_order)
            .presence(type_.presence)
            .semantic_type(semantic_type_of(Some(type_), field));
        if type_.presence == Presence::Optional {
            encoding = encoding.null_value(Some(
                enum_type.null_value.clone().unwrap_or_else(|| encoding_type.null_value()),
            ));
        }

        let mut begin = self.begin_token(Signal::BeginEnum, type_, offset, encoding_type.size() as i32, field);
        begin.encoding = encoding.build();
        self.tokens.push(begin.clone());

        for value in &enum_type.valid_values {
            let mut token = Token::new(Signal::ValidValue, &value.name);
            token.description = value.description.clone();
            token.version = value.since_version;
            token.deprecated = value.deprecated;
            token.encoding = EncodingBuilder::new()
                .presence(Presence::Required)
                .byte_order(self.byte_order)
                .primitive_type(encoding_type)
                .const_value(Some(value.value.clone()))
                .build();
            self.tokens.push(token);
        }

        begin.signal = Signal::EndEnum;
        self.tokens.push(begin);
    }

    fn add_set(&mut self, type_: &Type, set: &SetType, offset: i32, field: Option<&Field>) {
        let encoding_type = set.encoding_type;

        let mut begin = self.begin_token(Signal::BeginSet, type_, offset, encoding_type.size() as i32, field);
        begin.encoding = EncodingBuilder::new()
            .primitive_type(encoding_type)
            .byte_order(self.byte_order)
            .presence(Presence::Required)
            .semantic_type(semantic_type_of(Some(type_), field))
            .build();
        self.tokens.push(begin.clone());

        for choice in &set.choices {
            let mut token = Token::new(Signal::Choice, &choice.name);
            token.description = choice.description.clone();
            token.version = choice.since_version;
            token.deprecated = choice.deprecated;
            token.encoding = EncodingBuilder::new()
                .presence(Presence::Required)
                .byte_order(self.byte_order)
                .primitive_type(encoding_type)
                .const_value(Some(choice.value.clone()))
                .build();
            self.tokens.push(token);
        }

        begin.signal = Signal::EndSet;
        self.tokens.push(begin);
    }

    fn add_encoded(&mut self, type_: &Type, encoded: &EncodedDataType, offset: i32, field: Option<&Field>) {
        let mut encoding = EncodingBuilder::new()
            .primitive_type(encoded.primitive_type)
            .byte_order(self.byte_order)
            .semantic_type(semantic_type_of(Some(type_), field))
            .character_encoding(encoded.character_encoding.clone());

        if let Some(field) = field {
            encoding = encoding.epoch(Some(field.epoch.clone())).time_unit(Some(field.time_unit.clone()));
        }

        let mut token = Token::new(Signal::Encoding, &type_.name);
        token.description = type_.description.clone();
        token.size = type_.encoded_length();
        token.offset = offset;
        token.version = type_.since_version;
        token.deprecated = type_.deprecated;

        if let Some(field) = field {
            let composite_field = field.type_().map_or(false, |t| t.as_composite().is_some());
            if !composite_field {
                token.version = field.since_version;
                token.deprecated = field.deprecated;
                if let Some(ref description) = field.description {
                    if !description.is_empty() {
                        token.description = Some(description.clone());
                    }
                }
            }
        }

        // An optional field over a required type reads as optional.
        let presence = match field {
            Some(f) if f.presence == Presence::Optional && type_.presence == Presence::Required => Presence::Optional,
            _ => type_.presence,
        };

        encoding = match presence {
            Presence::Required => encoding
                .presence(Presence::Required)
                .min_value(encoded.min_value.clone())
                .max_value(encoded.max_value.clone()),
            Presence::Optional => encoding
                .presence(Presence::Optional)
                .min_value(encoded.min_value.clone())
                .max_value(encoded.max_value.clone())
                .null_value(encoded.null_value.clone()),
            Presence::Constant => encoding
                .presence(Presence::Constant)
                .const_value(encoded.const_value.clone()),
        };

        token.encoding = encoding.build();
        self.tokens.push(token);
    }
}

fn semantic_type_of(type_: Option<&Type>, field: Option<&Field>) -> Option<String> {
    type_
        .and_then(|t| t.semantic_type.clone())
        .or_else(|| field.and_then(|f| f.semantic_type.clone()))
}
