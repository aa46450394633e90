//! Bounds-checked byte cursors.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::SchemaError;

/// Reads little-endian values from a byte slice, tracking the offset.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the next byte to read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, needed: usize) -> Result<(), SchemaError> {
        if self.remaining() < needed {
            return Err(SchemaError::UnexpectedEof {
                offset: self.position,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn cursor(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    pub fn read_u8(&mut self) -> Result<u8, SchemaError> {
        self.ensure(1)?;
        let value = self.cursor().get_u8();
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, SchemaError> {
        self.ensure(2)?;
        let value = self.cursor().get_u16_le();
        self.position += 2;
        Ok(value)
    }

    pub fn read_u24_le(&mut self) -> Result<u32, SchemaError> {
        self.ensure(3)?;
        let value = self.cursor().get_uint_le(3) as u32;
        self.position += 3;
        Ok(value)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, SchemaError> {
        self.ensure(4)?;
        let value = self.cursor().get_u32_le();
        self.position += 4;
        Ok(value)
    }

    pub fn read_u48_le(&mut self) -> Result<u64, SchemaError> {
        self.ensure(6)?;
        let value = self.cursor().get_uint_le(6);
        self.position += 6;
        Ok(value)
    }

    /// Read exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], SchemaError> {
        self.ensure(len)?;
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Consume everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = self.cursor();
        self.position = self.data.len();
        slice
    }
}

/// Accumulates little-endian output.
#[derive(Debug, Default)]
pub struct Writer {
    buffer: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn put_u16_le(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    /// Write the low three bytes of `value`.
    pub fn put_u24_le(&mut self, value: u32) {
        self.buffer.put_uint_le(u64::from(value), 3);
    }

    pub fn put_u32_le(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Write the low six bytes of `value`.
    pub fn put_u48_le(&mut self, value: u64) {
        self.buffer.put_uint_le(value, 6);
    }

    pub fn put_slice(&mut self, data: &[u8]) {
        self.buffer.put_slice(data);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}
