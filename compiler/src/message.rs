use std::rc::Rc;

use crate::{
    error::SbeError,
    types::{Presence, Type, VARIABLE_LENGTH},
    utils::quote,
    verifier::ErrorHandler,
};

/// Id carried by groups that do not declare one, and by tokens with no cross reference.
pub const INVALID_ID: i32 = i32::MAX;

pub const DEFAULT_EPOCH: &str = "unix";
pub const DEFAULT_TIME_UNIT: &str = "nanosecond";

#[derive(Debug, Clone)]
pub enum FieldKind {
    Field {
        type_: Rc<Type>,
    },
    Group {
        dimension_type: Rc<Type>,
        /// Declared `blockLength`, 0 when unset.
        block_length:   i32,
        fields:         Vec<Field>,
    },
    Data {
        type_: Rc<Type>,
    },
}

/// A `field`, `group` or `data` element of a message or group.
///
/// The cross-link indices point at siblings in the same field list.
#[derive(Debug, Clone)]
pub struct Field {
    pub name:                  String,
    pub description:           Option<String>,
    pub id:                    i32,
    /// Declared `offset`, 0 when unset.
    pub offset:                i32,
    pub semantic_type:         Option<String>,
    pub presence:              Presence,
    pub value_ref:             Option<String>,
    pub since_version:         i32,
    pub deprecated:            i32,
    pub epoch:                 String,
    pub time_unit:             String,
    pub group_name:            Option<String>,
    pub ref_id:                i32,
    pub kind:                  FieldKind,
    pub computed_offset:       i32,
    pub computed_block_length: i32,
    pub entry_count_field:     Option<usize>,
    pub group_field:           Option<usize>,
    pub length_field:          Option<usize>,
    pub data_field:            Option<usize>,
}

impl Field {
    pub fn new(name: &str, id: i32, kind: FieldKind) -> Field {
        Field {
            name: name.to_string(),
            description: None,
            id,
            offset: 0,
            semantic_type: None,
            presence: Presence::Required,
            value_ref: None,
            since_version: 0,
            deprecated: 0,
            epoch: DEFAULT_EPOCH.to_string(),
            time_unit: DEFAULT_TIME_UNIT.to_string(),
            group_name: None,
            ref_id: INVALID_ID,
            kind,
            computed_offset: 0,
            computed_block_length: 0,
            entry_count_field: None,
            group_field: None,
            length_field: None,
            data_field: None,
        }
    }

    /// The encoded type of a plain or data field. Groups have none.
    pub fn type_(&self) -> Option<&Rc<Type>> {
        match self.kind {
            FieldKind::Field { ref type_ } | FieldKind::Data { ref type_ } => Some(type_),
            FieldKind::Group { .. } => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, FieldKind::Group { .. })
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, FieldKind::Data { .. })
    }

    pub fn is_variable_length(&self) -> bool {
        match self.kind {
            FieldKind::Data { .. } => true,
            FieldKind::Field { ref type_ } => type_.is_variable_length(),
            FieldKind::Group { .. } => false,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.presence == Presence::Constant
            || self.type_().map_or(false, |t| t.is_constant())
    }

    pub fn group_fields(&self) -> Option<&[Field]> {
        match self.kind {
            FieldKind::Group { ref fields, .. } => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id:                    i32,
    pub name:                  String,
    pub description:           Option<String>,
    /// Declared `blockLength`, 0 when unset.
    pub declared_block_length: i32,
    pub computed_block_length: i32,
    pub semantic_type:         Option<String>,
    pub since_version:         i32,
    pub deprecated:            i32,
    pub header_type:           String,
    pub fields:                Vec<Field>,
}

impl Message {
    /// Lays out every field and validates the declared block length.
    pub fn compute_layout(&mut self, handler: &mut ErrorHandler) -> Result<(), SbeError> {
        compute_and_validate_offsets(handler, &mut self.fields, self.declared_block_length)?;
        self.computed_block_length = compute_message_root_block_length(&self.fields);
        validate_block_length(handler, &self.name, self.declared_block_length, self.computed_block_length)
    }

    /// Effective root block length: the larger of declared and computed.
    pub fn block_length(&self) -> i32 {
        self.declared_block_length.max(self.computed_block_length)
    }
}

/// Assigns `computed_offset` and `computed_block_length` to `fields` in one
/// left to right pass, recursing into groups. Returns the final fixed offset.
///
/// A non-zero `block_length` moves the first group or variable-length field
/// to that offset when it declares none.
pub fn compute_and_validate_offsets(
    handler: &mut ErrorHandler,
    fields: &mut [Field],
    block_length: i32,
) -> Result<i32, SbeError> {
    let mut variable_length_block = false;
    let mut offset = 0;

    for field in fields.iter_mut() {
        if field.offset != 0 && field.offset < offset {
            handler.error(format!(
                "offset provides insufficient space at field: {}",
                quote(&field.name)
            ))?;
        }

        if offset != VARIABLE_LENGTH {
            if field.offset != 0 {
                offset = field.offset;
            } else if (field.is_group() || field.is_variable_length()) && block_length != 0 {
                offset = block_length;
            }
        }

        field.computed_offset = if variable_length_block { VARIABLE_LENGTH } else { offset };

        let name = field.name.clone();
        let constant = field.is_constant();
        match field.kind {
            FieldKind::Group { block_length: declared, ref mut fields, .. } => {
                let group_block_length = compute_and_validate_offsets(handler, fields, 0)?;
                validate_block_length(handler, &name, declared, group_block_length)?;
                field.computed_block_length = declared.max(group_block_length);
                variable_length_block = true;
            }
            FieldKind::Field { ref type_ } | FieldKind::Data { ref type_ } => {
                if constant {
                    continue;
                }
                let size = type_.encoded_length();
                if size == VARIABLE_LENGTH {
                    variable_length_block = true;
                } else {
                    field.computed_block_length = size;
                }
                if !variable_length_block {
                    offset += size;
                }
            }
        }
    }

    Ok(offset)
}

/// Length of the fixed prefix up to the first group or variable-length field.
pub fn compute_message_root_block_length(fields: &[Field]) -> i32 {
    let mut block_length = 0;

    for field in fields {
        let type_ = match field.kind {
            FieldKind::Group { .. } => return block_length,
            FieldKind::Field { ref type_ } | FieldKind::Data { ref type_ } => type_,
        };

        let length = type_.encoded_length();
        if length == VARIABLE_LENGTH {
            return block_length;
        }

        block_length = if field.is_constant() {
            field.computed_offset
        } else {
            field.computed_offset + length
        };
    }

    block_length
}

pub fn validate_block_length(
    handler: &mut ErrorHandler,
    name: &str,
    specified: i32,
    computed: i32,
) -> Result<(), SbeError> {
    if specified != 0 && computed > specified {
        handler.error(format!(
            "specified blockLength provides insufficient space {} > {} for {}",
            computed,
            specified,
            quote(name)
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompositeType, EncodedDataType, TypeKind};
    use crate::verifier::ValidationPolicy;
    use brine_sbe_schema::PrimitiveType;

    fn handler() -> ErrorHandler {
        ErrorHandler::new(ValidationPolicy { suppress_output: true, ..Default::default() })
    }

    fn field(name: &str, id: i32, primitive: PrimitiveType) -> Field {
        Field::new(name, id, FieldKind::Field { type_: Rc::new(Type::primitive(primitive)) })
    }

    fn encoded(name: &str, primitive: PrimitiveType) -> Type {
        Type::new(name, TypeKind::Encoded(EncodedDataType::new(primitive)))
    }

    fn dimension() -> Rc<Type> {
        Rc::new(Type::new(
            "groupSizeEncoding",
            TypeKind::Composite(CompositeType {
                members: vec![encoded("blockLength", PrimitiveType::Uint16), encoded("numInGroup", PrimitiveType::Uint16)],
            }),
        ))
    }

    fn var_data() -> Rc<Type> {
        let composite = CompositeType {
            members: vec![encoded("length", PrimitiveType::Uint8), encoded("varData", PrimitiveType::Uint8)],
        };
        Rc::new(Type::new("varDataEncoding", TypeKind::Composite(composite.to_var_data())))
    }

    fn message(fields: Vec<Field>, declared_block_length: i32) -> Message {
        Message {
            id: 1,
            name: "Msg".to_string(),
            description: None,
            declared_block_length,
            computed_block_length: 0,
            semantic_type: None,
            since_version: 0,
            deprecated: 0,
            header_type: "messageHeader".to_string(),
            fields,
        }
    }

    #[test]
    fn fixed_fields_are_packed() {
        let mut msg = message(
            vec![
                field("a", 1, PrimitiveType::Uint32),
                field("b", 2, PrimitiveType::Uint32),
                field("c", 3, PrimitiveType::Uint32),
            ],
            0,
        );
        let mut handler = handler();
        msg.compute_layout(&mut handler).unwrap();

        let offsets: Vec<i32> = msg.fields.iter().map(|f| f.computed_offset).collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(msg.block_length(), 12);
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn group_and_var_data() {
        let group = Field::new(
            "entries",
            2,
            FieldKind::Group {
                dimension_type: dimension(),
                block_length:   0,
                fields:         vec![field("x", 3, PrimitiveType::Uint32), field("y", 4, PrimitiveType::Uint32)],
            },
        );
        let data = Field::new("payload", 5, FieldKind::Data { type_: var_data() });
        let mut msg = message(vec![field("id", 1, PrimitiveType::Uint32), group, data], 0);

        let mut handler = handler();
        msg.compute_layout(&mut handler).unwrap();

        assert_eq!(msg.block_length(), 4);
        assert_eq!(msg.fields[1].computed_offset, 4);
        assert_eq!(msg.fields[1].computed_block_length, 8);
        assert_eq!(msg.fields[2].computed_offset, VARIABLE_LENGTH);

        let group_offsets: Vec<i32> =
            msg.fields[1].group_fields().unwrap().iter().map(|f| f.computed_offset).collect();
        assert_eq!(group_offsets, vec![0, 4]);
    }

    #[test]
    fn declared_block_length_moves_group() {
        let group = Field::new(
            "entries",
            2,
            FieldKind::Group {
                dimension_type: dimension(),
                block_length:   16,
                fields:         vec![field("x", 3, PrimitiveType::Uint32)],
            },
        );
        let mut msg = message(vec![field("id", 1, PrimitiveType::Uint32), group], 64);
        let mut handler = handler();
        msg.compute_layout(&mut handler).unwrap();

        assert_eq!(msg.fields[1].computed_offset, 64);
        assert_eq!(msg.fields[1].computed_block_length, 16);
        assert_eq!(msg.block_length(), 64);
    }

    #[test]
    fn constant_fields_take_no_space() {
        let mut constant = field("k", 2, PrimitiveType::Uint32);
        constant.presence = Presence::Constant;
        let mut msg = message(
            vec![field("a", 1, PrimitiveType::Uint16), constant, field("b", 3, PrimitiveType::Uint16)],
            0,
        );
        let mut handler = handler();
        msg.compute_layout(&mut handler).unwrap();

        let offsets: Vec<i32> = msg.fields.iter().map(|f| f.computed_offset).collect();
        assert_eq!(offsets, vec![0, 2, 2]);
        assert_eq!(msg.block_length(), 4);
    }

    #[test]
    fn block_length_too_small_is_an_error() {
        let mut msg = message(vec![field("a", 1, PrimitiveType::Uint64), field("b", 2, PrimitiveType::Uint64)], 8);
        let mut handler = handler();
        msg.compute_layout(&mut handler).unwrap();
        assert_eq!(handler.error_count(), 1);
        assert_eq!(msg.block_length(), 16);
    }

    #[test]
    fn offset_regression_is_an_error() {
        let mut second = field("b", 2, PrimitiveType::Uint32);
        second.offset = 2;
        let mut fields = vec![field("a", 1, PrimitiveType::Uint32), second];
        let mut handler = handler();
        compute_and_validate_offsets(&mut handler, &mut fields, 0).unwrap();
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn explicit_offsets_leave_gaps() {
        let mut second = field("b", 2, PrimitiveType::Uint32);
        second.offset = 8;
        let mut fields = vec![field("a", 1, PrimitiveType::Uint8), second];
        let mut handler = handler();
        let end = compute_and_validate_offsets(&mut handler, &mut fields, 0).unwrap();
        assert_eq!(fields[1].computed_offset, 8);
        assert_eq!(end, 12);
        assert_eq!(compute_message_root_block_length(&fields), 12);
    }
}
