use crate::{error::SbeError, token::Token};

/// Callbacks fired by [`decode_message`](crate::otf::decode_message) as it
/// walks a message run over a buffer.
///
/// `index` is always an absolute position in `buffer`. Run slices passed to
/// `on_enum`, `on_bit_set` and the composite callbacks start at the begin
/// token and end at the matching end token.
pub trait TokenListener {
    fn on_begin_message(&mut self, _token: &Token) {}

    fn on_end_message(&mut self, _token: &Token) {}

    /// A primitive value, either a plain field or a composite member. For
    /// members `field_token` is the member token itself.
    fn on_encoding(
        &mut self,
        field_token: &Token,
        buffer: &[u8],
        index: usize,
        type_token: &Token,
        acting_version: i32,
    ) -> Result<(), SbeError>;

    fn on_enum(
        &mut self,
        _field_token: &Token,
        _buffer: &[u8],
        _index: usize,
        _tokens: &[Token],
        _acting_version: i32,
    ) -> Result<(), SbeError> {
        Ok(())
    }

    fn on_bit_set(
        &mut self,
        _field_token: &Token,
        _buffer: &[u8],
        _index: usize,
        _tokens: &[Token],
        _acting_version: i32,
    ) -> Result<(), SbeError> {
        Ok(())
    }

    fn on_begin_composite(&mut self, _field_token: &Token, _tokens: &[Token]) {}

    fn on_end_composite(&mut self, _field_token: &Token, _tokens: &[Token]) {}

    fn on_group_header(&mut self, _token: &Token, _num_in_group: u64) {}

    fn on_begin_group(&mut self, _token: &Token, _group_index: u64, _num_in_group: u64) {}

    fn on_end_group(&mut self, _token: &Token, _group_index: u64, _num_in_group: u64) {}

    fn on_var_data(
        &mut self,
        _field_token: &Token,
        _buffer: &[u8],
        _index: usize,
        _length: usize,
        _type_token: &Token,
    ) -> Result<(), SbeError> {
        Ok(())
    }
}
