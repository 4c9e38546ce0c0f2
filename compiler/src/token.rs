use brine_sbe_schema::{ByteOrder, PrimitiveType, PrimitiveValue};
use serde::Serialize;

use crate::{message::INVALID_ID, types::Presence};

/// What a token marks in the flat IR stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    BeginMessage,
    EndMessage,
    BeginComposite,
    EndComposite,
    BeginField,
    EndField,
    BeginGroup,
    EndGroup,
    BeginEnum,
    ValidValue,
    EndEnum,
    BeginSet,
    Choice,
    EndSet,
    BeginVarData,
    EndVarData,
    Encoding,
}

impl Signal {
    pub const ALL: [Signal; 17] = [
        Signal::BeginMessage,
        Signal::EndMessage,
        Signal::BeginComposite,
        Signal::EndComposite,
        Signal::BeginField,
        Signal::EndField,
        Signal::BeginGroup,
        Signal::EndGroup,
        Signal::BeginEnum,
        Signal::ValidValue,
        Signal::EndEnum,
        Signal::BeginSet,
        Signal::Choice,
        Signal::EndSet,
        Signal::BeginVarData,
        Signal::EndVarData,
        Signal::Encoding,
    ];

    /// Wire ordinal, starting at 1.
    pub fn ordinal(self) -> u8 {
        Signal::ALL.iter().position(|s| *s == self).map_or(17, |i| i as u8 + 1)
    }

    /// Unknown ordinals decode as [`Signal::Encoding`].
    pub fn from_ordinal(ordinal: u8) -> Signal {
        match ordinal {
            1..=17 => Signal::ALL[ordinal as usize - 1],
            _ => Signal::Encoding,
        }
    }

    /// The signal that closes a run opened by `self`.
    pub fn end_signal(self) -> Option<Signal> {
        match self {
            Signal::BeginMessage => Some(Signal::EndMessage),
            Signal::BeginComposite => Some(Signal::EndComposite),
            Signal::BeginField => Some(Signal::EndField),
            Signal::BeginGroup => Some(Signal::EndGroup),
            Signal::BeginEnum => Some(Signal::EndEnum),
            Signal::BeginSet => Some(Signal::EndSet),
            Signal::BeginVarData => Some(Signal::EndVarData),
            _ => None,
        }
    }

    pub fn is_begin(self) -> bool {
        self.end_signal().is_some()
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            Signal::EndMessage
                | Signal::EndComposite
                | Signal::EndField
                | Signal::EndGroup
                | Signal::EndEnum
                | Signal::EndSet
                | Signal::EndVarData
        )
    }
}

pub fn primitive_ordinal(primitive_type: Option<PrimitiveType>) -> u8 {
    match primitive_type {
        None => 0,
        Some(p) => PrimitiveType::ALL.iter().position(|q| *q == p).map_or(0, |i| i as u8 + 1),
    }
}

pub fn primitive_from_ordinal(ordinal: u8) -> Option<PrimitiveType> {
    match ordinal {
        1..=11 => Some(PrimitiveType::ALL[ordinal as usize - 1]),
        _ => None,
    }
}

pub fn byte_order_ordinal(byte_order: ByteOrder) -> u8 {
    match byte_order {
        ByteOrder::LittleEndian => 0,
        ByteOrder::BigEndian => 1,
    }
}

pub fn byte_order_from_ordinal(ordinal: u8) -> ByteOrder {
    match ordinal {
        1 => ByteOrder::BigEndian,
        _ => ByteOrder::LittleEndian,
    }
}

pub fn presence_ordinal(presence: Presence) -> u8 {
    match presence {
        Presence::Required => 0,
        Presence::Optional => 1,
        Presence::Constant => 2,
    }
}

pub fn presence_from_ordinal(ordinal: u8) -> Presence {
    match ordinal {
        1 => Presence::Optional,
        2 => Presence::Constant,
        _ => Presence::Required,
    }
}

/// How a token's value is laid out, plus its limits and metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Encoding {
    pub presence:           Presence,
    pub primitive_type:     Option<PrimitiveType>,
    pub byte_order:         ByteOrder,
    pub min_value:          Option<PrimitiveValue>,
    pub max_value:          Option<PrimitiveValue>,
    pub null_value:         Option<PrimitiveValue>,
    pub const_value:        Option<PrimitiveValue>,
    pub character_encoding: Option<String>,
    pub epoch:              Option<String>,
    pub time_unit:          Option<String>,
    pub semantic_type:      Option<String>,
}

impl Encoding {
    pub fn applicable_min_value(&self) -> Option<PrimitiveValue> {
        self.min_value.clone().or_else(|| self.primitive_type.map(|p| p.min_value()))
    }

    pub fn applicable_max_value(&self) -> Option<PrimitiveValue> {
        self.max_value.clone().or_else(|| self.primitive_type.map(|p| p.max_value()))
    }

    pub fn applicable_null_value(&self) -> Option<PrimitiveValue> {
        self.null_value.clone().or_else(|| self.primitive_type.map(|p| p.null_value()))
    }
}

/// Builds an [`Encoding`]. If presence is never set it is derived from the
/// values: constant with a const value, optional with a null value, otherwise
/// required.
#[derive(Debug, Clone, Default)]
pub struct EncodingBuilder {
    encoding: Encoding,
    presence: Option<Presence>,
}

impl EncodingBuilder {
    pub fn new() -> EncodingBuilder {
        EncodingBuilder::default()
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn primitive_type(mut self, primitive_type: PrimitiveType) -> Self {
        self.encoding.primitive_type = Some(primitive_type);
        self
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.encoding.byte_order = byte_order;
        self
    }

    pub fn min_value(mut self, value: Option<PrimitiveValue>) -> Self {
        self.encoding.min_value = value;
        self
    }

    pub fn max_value(mut self, value: Option<PrimitiveValue>) -> Self {
        self.encoding.max_value = value;
        self
    }

    pub fn null_value(mut self, value: Option<PrimitiveValue>) -> Self {
        self.encoding.null_value = value;
        self
    }

    pub fn const_value(mut self, value: Option<PrimitiveValue>) -> Self {
        self.encoding.const_value = value;
        self
    }

    pub fn character_encoding(mut self, value: Option<String>) -> Self {
        self.encoding.character_encoding = value;
        self
    }

    pub fn epoch(mut self, value: Option<String>) -> Self {
        self.encoding.epoch = value;
        self
    }

    pub fn time_unit(mut self, value: Option<String>) -> Self {
        self.encoding.time_unit = value;
        self
    }

    pub fn semantic_type(mut self, value: Option<String>) -> Self {
        self.encoding.semantic_type = value;
        self
    }

    pub fn build(self) -> Encoding {
        let mut encoding = self.encoding;
        encoding.presence = match self.presence {
            Some(p) => p,
            None if encoding.const_value.is_some() => Presence::Constant,
            None if encoding.null_value.is_some() => Presence::Optional,
            None => Presence::Required,
        };
        encoding
    }
}

/// One record of the flat IR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub signal:                Signal,
    pub name:                  String,
    pub description:           Option<String>,
    pub id:                    i32,
    /// Index of the linked token in the same run, [`INVALID_ID`] if none.
    pub ref_id:                i32,
    pub version:               i32,
    pub deprecated:            i32,
    pub offset:                i32,
    pub size:                  i32,
    /// Tokens in the run this token opens or closes, 1 for leaves.
    pub component_token_count: i32,
    pub encoding:              Encoding,
}

impl Token {
    pub fn new(signal: Signal, name: &str) -> Token {
        Token {
            signal,
            name: name.to_string(),
            description: None,
            id: INVALID_ID,
            ref_id: INVALID_ID,
            version: 0,
            deprecated: 0,
            offset: 0,
            size: 0,
            component_token_count: 1,
            encoding: Encoding::default(),
        }
    }

    pub fn is_constant_encoding(&self) -> bool {
        self.encoding.presence == Presence::Constant
    }

    pub fn is_optional_encoding(&self) -> bool {
        self.encoding.presence == Presence::Optional
    }

    /// Number of elements for an array encoding.
    pub fn array_length(&self) -> i32 {
        match self.encoding.primitive_type {
            Some(p) if self.size > 0 => self.size / p.size() as i32,
            _ => 1,
        }
    }
}

/// Index of the token closing the run opened at `start`, matched by depth.
pub fn find_end(tokens: &[Token], start: usize) -> Option<usize> {
    let end_signal = tokens.get(start)?.signal.end_signal()?;
    let begin_signal = tokens[start].signal;
    let mut depth = 0;

    for (i, token) in tokens.iter().enumerate().skip(start) {
        if token.signal == begin_signal {
            depth += 1;
        } else if token.signal == end_signal {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }

    None
}

/// Sets `component_token_count` on every begin/end pair of `tokens`.
pub fn update_component_token_counts(tokens: &mut [Token]) {
    let mut open: Vec<usize> = Vec::new();

    for i in 0..tokens.len() {
        let signal = tokens[i].signal;
        if signal.is_begin() {
            open.push(i);
        } else if signal.is_end() {
            if let Some(begin) = open.pop() {
                let count = (i - begin + 1) as i32;
                tokens[begin].component_token_count = count;
                tokens[i].component_token_count = count;
            }
        } else {
            tokens[i].component_token_count = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_ordinals() {
        assert_eq!(Signal::BeginMessage.ordinal(), 1);
        assert_eq!(Signal::BeginVarData.ordinal(), 15);
        assert_eq!(Signal::Encoding.ordinal(), 17);
        for signal in Signal::ALL {
            assert_eq!(Signal::from_ordinal(signal.ordinal()), signal);
        }
        assert_eq!(Signal::from_ordinal(0), Signal::Encoding);
        assert_eq!(Signal::from_ordinal(200), Signal::Encoding);
    }

    #[test]
    fn other_ordinals() {
        assert_eq!(primitive_ordinal(None), 0);
        assert_eq!(primitive_ordinal(Some(PrimitiveType::Char)), 1);
        assert_eq!(primitive_ordinal(Some(PrimitiveType::Double)), 11);
        assert_eq!(primitive_from_ordinal(7), Some(PrimitiveType::Uint16));
        assert_eq!(primitive_from_ordinal(12), None);
        assert_eq!(byte_order_from_ordinal(9), ByteOrder::LittleEndian);
        assert_eq!(presence_from_ordinal(2), Presence::Constant);
        assert_eq!(presence_from_ordinal(3), Presence::Required);
    }

    #[test]
    fn builder_derives_presence() {
        let constant = EncodingBuilder::new().const_value(Some(PrimitiveValue::long(1, 1))).build();
        assert_eq!(constant.presence, Presence::Constant);

        let optional = EncodingBuilder::new().null_value(Some(PrimitiveValue::long(0, 1))).build();
        assert_eq!(optional.presence, Presence::Optional);

        let explicit = EncodingBuilder::new()
            .presence(Presence::Required)
            .null_value(Some(PrimitiveValue::long(0, 1)))
            .build();
        assert_eq!(explicit.presence, Presence::Required);

        assert_eq!(EncodingBuilder::new().build().presence, Presence::Required);
    }

    #[test]
    fn applicable_values_fall_back_to_primitive() {
        let encoding = EncodingBuilder::new()
            .primitive_type(PrimitiveType::Uint8)
            .max_value(Some(PrimitiveValue::long(100, 1)))
            .build();
        assert_eq!(encoding.applicable_max_value(), Some(PrimitiveValue::long(100, 1)));
        assert_eq!(encoding.applicable_min_value(), Some(PrimitiveValue::long(0, 1)));
        assert_eq!(encoding.applicable_null_value(), Some(PrimitiveValue::long(255, 1)));
        assert_eq!(Encoding::default().applicable_null_value(), None);
    }

    #[test]
    fn component_counts_and_matching() {
        let mut tokens = vec![
            Token::new(Signal::BeginComposite, "outer"),
            Token::new(Signal::Encoding, "a"),
            Token::new(Signal::BeginComposite, "inner"),
            Token::new(Signal::Encoding, "b"),
            Token::new(Signal::EndComposite, "inner"),
            Token::new(Signal::EndComposite, "outer"),
        ];
        update_component_token_counts(&mut tokens);

        let counts: Vec<i32> = tokens.iter().map(|t| t.component_token_count).collect();
        assert_eq!(counts, vec![6, 1, 3, 1, 3, 6]);
        assert_eq!(find_end(&tokens, 0), Some(5));
        assert_eq!(find_end(&tokens, 2), Some(4));
        assert_eq!(find_end(&tokens, 1), None);
        assert_eq!(find_end(&tokens[..5], 0), None);
    }
}
