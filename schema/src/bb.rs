use std::borrow::Cow;

use crate::primitive::{ByteOrder, PrimitiveType};
use crate::value::PrimitiveValue;

/// A fixed-width byte buffer meant for reading.
///
/// Multi-byte integers are little endian. Strings and byte blocks carry a
/// `u16` length prefix.
///
/// Example usage:
///
/// ```
/// use std::borrow::Cow;
/// let mut bb = brine_sbe_schema::ByteBuffer::new(&[3, 0, 99, 97, 114, 7, 0, 0, 0]);
/// assert_eq!(bb.read_string(), Ok(Cow::Borrowed("car")));
/// assert_eq!(bb.read_i32(), Ok(7));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &[u8]) -> ByteBuffer {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, ()> {
        if self.index >= self.data.len() {
            Err(())
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ()> {
        if len > self.remaining() {
            Err(())
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ()> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    /// Try to read a little-endian unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, ()> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Try to read a little-endian signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32, ()> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Try to read a little-endian signed 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64, ()> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Try to read a block of bytes preceded by its `u16` length.
    pub fn read_len_bytes(&mut self) -> Result<&'a [u8], ()> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Try to read a UTF-8 string preceded by its `u16` length. This string is
    /// returned as a slice when valid so it just aliases the underlying memory.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>, ()> {
        let bytes = self.read_len_bytes()?;
        Ok(String::from_utf8_lossy(bytes))
    }
}

/// Reads one primitive element at an absolute `offset` in `data`.
///
/// Unsigned types are widened without sign extension; `uint64` keeps its bit
/// pattern in the `i64`.
pub fn get_primitive(
    data: &[u8],
    offset: usize,
    primitive: PrimitiveType,
    byte_order: ByteOrder,
) -> Result<PrimitiveValue, ()> {
    let size = primitive.size();
    let end = offset.checked_add(size).ok_or(())?;
    if end > data.len() {
        return Err(());
    }

    let mut raw = [0u8; 8];
    match byte_order {
        ByteOrder::LittleEndian => raw[..size].copy_from_slice(&data[offset..end]),
        ByteOrder::BigEndian => {
            for (i, byte) in data[offset..end].iter().rev().enumerate() {
                raw[i] = *byte;
            }
        }
    }
    let bits = u64::from_le_bytes(raw);

    let value = match primitive {
        PrimitiveType::Char | PrimitiveType::Uint8 | PrimitiveType::Uint16 | PrimitiveType::Uint32 => {
            PrimitiveValue::long(bits as i64, size)
        }
        PrimitiveType::Int8 => PrimitiveValue::long(bits as u8 as i8 as i64, size),
        PrimitiveType::Int16 => PrimitiveValue::long(bits as u16 as i16 as i64, size),
        PrimitiveType::Int32 => PrimitiveValue::long(bits as u32 as i32 as i64, size),
        PrimitiveType::Int64 | PrimitiveType::Uint64 => PrimitiveValue::long(bits as i64, size),
        PrimitiveType::Float => PrimitiveValue::double(f32::from_bits(bits as u32) as f64, size),
        PrimitiveType::Double => PrimitiveValue::double(f64::from_bits(bits), size),
    };

    Ok(value)
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], 2), Err(()));

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(()));
}

#[test]
fn read_fixed_width() {
    assert_eq!(ByteBuffer::new(&[0x34, 0x12]).read_u16(), Ok(0x1234));
    assert_eq!(ByteBuffer::new(&[0x34]).read_u16(), Err(()));
    assert_eq!(ByteBuffer::new(&[0xFF, 0xFF, 0xFF, 0xFF]).read_i32(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[0xFF, 0xFF, 0xFF, 0x7F]).read_i32(), Ok(i32::MAX));
    assert_eq!(ByteBuffer::new(&[1, 0, 0]).read_i32(), Err(()));
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0, 0x80]).read_i64(), Ok(i64::MIN));
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Err(()));
    assert_eq!(read(&[0, 0]), Ok(Cow::Borrowed("")));
    assert_eq!(read(&[1, 0, 97]), Ok(Cow::Borrowed("a")));
    assert_eq!(read(&[4, 0, 97]), Err(()));
    assert_eq!(read(&[4, 0, 240, 159, 141, 149]), Ok(Cow::Borrowed("🍕")));
}

#[test]
fn read_sequence() {
    let mut bb = ByteBuffer::new(&[1, 0, 0, 0, 2, 0, 104, 105, 9]);
    assert_eq!(bb.read_i32(), Ok(1));
    assert_eq!(bb.read_string(), Ok(Cow::Borrowed("hi")));
    assert_eq!(bb.remaining(), 1);
    assert_eq!(bb.read_byte(), Ok(9));
    assert_eq!(bb.index(), 9);
}

#[test]
fn get_primitive_values() {
    let data = [0xFE, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
    let le = ByteOrder::LittleEndian;
    assert_eq!(get_primitive(&data, 0, PrimitiveType::Uint16, le), Ok(PrimitiveValue::long(65534, 2)));
    assert_eq!(get_primitive(&data, 0, PrimitiveType::Int16, le), Ok(PrimitiveValue::long(-2, 2)));
    assert_eq!(get_primitive(&data, 2, PrimitiveType::Uint8, le), Ok(PrimitiveValue::long(1, 1)));
    assert_eq!(get_primitive(&data, 1, PrimitiveType::Int8, le), Ok(PrimitiveValue::long(-1, 1)));
    assert_eq!(
        get_primitive(&[0x00, 0x01], 0, PrimitiveType::Uint16, ByteOrder::BigEndian),
        Ok(PrimitiveValue::long(1, 2))
    );
    assert_eq!(get_primitive(&data, 6, PrimitiveType::Uint32, le), Err(()));

    let float = 1.5f32.to_le_bytes();
    assert_eq!(get_primitive(&float, 0, PrimitiveType::Float, le), Ok(PrimitiveValue::double(1.5, 4)));
}

/// A fixed-width byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_sbe_schema::ByteBufferMut::new();
/// bb.write_string("car").unwrap();
/// bb.write_i32(7);
/// assert_eq!(bb.data(), [3, 0, 99, 97, 114, 7, 0, 0, 0]);
/// ```
///
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a little-endian unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian signed 64-bit integer.
    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a block of bytes preceded by its `u16` length. Fails if the block
    /// does not fit the prefix.
    pub fn write_len_bytes(&mut self, value: &[u8]) -> Result<(), ()> {
        let len = u16::try_from(value.len()).map_err(|_| ())?;
        self.write_u16(len);
        self.write_bytes(value);
        Ok(())
    }

    /// Write a UTF-8 string preceded by its `u16` length.
    pub fn write_string(&mut self, value: &str) -> Result<(), ()> {
        self.write_len_bytes(value.as_bytes())
    }

    /// Write a value using exactly `value.size()` bytes in `byte_order`.
    /// Integers are truncated to their size; a 4-byte double is narrowed to
    /// `f32`.
    pub fn write_value(&mut self, value: &PrimitiveValue, byte_order: ByteOrder) {
        let bytes = value_bytes(value, byte_order);
        self.write_bytes(&bytes);
    }
}

/// The wire bytes of a value, `value.size()` long.
pub fn value_bytes(value: &PrimitiveValue, byte_order: ByteOrder) -> Vec<u8> {
    match *value {
        PrimitiveValue::Long { value, size } => {
            let size = size.min(8);
            match byte_order {
                ByteOrder::LittleEndian => value.to_le_bytes()[..size].to_vec(),
                ByteOrder::BigEndian => value.to_be_bytes()[8 - size..].to_vec(),
            }
        }
        PrimitiveValue::Double { value, size } if size == 4 => match byte_order {
            ByteOrder::LittleEndian => (value as f32).to_le_bytes().to_vec(),
            ByteOrder::BigEndian => (value as f32).to_be_bytes().to_vec(),
        },
        PrimitiveValue::Double { value, .. } => match byte_order {
            ByteOrder::LittleEndian => value.to_le_bytes().to_vec(),
            ByteOrder::BigEndian => value.to_be_bytes().to_vec(),
        },
        PrimitiveValue::Bytes { ref value, .. } => value.clone(),
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_byte() {
    assert_eq!(write_once(|bb| bb.write_byte(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_byte(255)), [255]);
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_fixed_width() {
    assert_eq!(write_once(|bb| bb.write_u16(0x1234)), [0x34, 0x12]);
    assert_eq!(write_once(|bb| bb.write_i32(-1)), [0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(write_once(|bb| bb.write_i32(256)), [0, 1, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_i64(1)), [1, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("").unwrap()), [0, 0]);
    assert_eq!(write_once(|bb| bb.write_string("a").unwrap()), [1, 0, 97]);
    assert_eq!(write_once(|bb| bb.write_string("🍕").unwrap()), [4, 0, 240, 159, 141, 149]);

    let mut bb = ByteBufferMut::new();
    assert_eq!(bb.write_len_bytes(&vec![0u8; 70_000]), Err(()));
    assert!(bb.is_empty());
}

#[test]
fn write_values() {
    let le = ByteOrder::LittleEndian;
    assert_eq!(value_bytes(&PrimitiveValue::long(65535, 2), le), [0xFF, 0xFF]);
    assert_eq!(value_bytes(&PrimitiveValue::long(-2, 1), le), [0xFE]);
    assert_eq!(value_bytes(&PrimitiveValue::long(1, 4), ByteOrder::BigEndian), [0, 0, 0, 1]);
    assert_eq!(value_bytes(&PrimitiveValue::double(1.5, 4), le), 1.5f32.to_le_bytes());
    assert_eq!(value_bytes(&PrimitiveValue::double(1.5, 8), le), 1.5f64.to_le_bytes());
    assert_eq!(value_bytes(&PrimitiveValue::bytes(b"ab".to_vec(), "US-ASCII"), le), *b"ab");
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_i32(1);
    bb.write_string("hi").unwrap();
    bb.write_value(&PrimitiveValue::long(9, 1), ByteOrder::LittleEndian);
    assert_eq!(bb.len(), 9);
    assert_eq!(bb.data(), [1, 0, 0, 0, 2, 0, 104, 105, 9]);
}
