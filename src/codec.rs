//! Tagged binary codec.
//!
//! Every field in a protocol message is one tag byte followed by a payload
//! whose shape the tag determines (see `protocol::tag`). `DataWriter` builds
//! a message body choosing the shortest legal encoding for each value;
//! `DataReader` walks a received body and hands back typed values.
//!
//! Integers (including opcodes, handles, and counts) always travel through
//! the integer tags; the only untagged integer on the wire is the 4-byte
//! frame length handled by the framed stream.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::tag;
use crate::value::{Date, Decimal, Time, Timestamp, Value};

// ============================================================================
// Byte-string helpers
// ============================================================================

/// Minimal sign-extended big-endian representation. Zero encodes to no bytes.
fn signed_bytes(value: i64) -> Vec<u8> {
    signed_bytes_wide(value as i128)
}

fn signed_bytes_wide(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let raw = value.to_be_bytes();
    let mut start = 0;
    // Drop redundant leading bytes while the sign bit stays intact.
    while start < raw.len() - 1 {
        let drop = raw[start];
        let keep_top = raw[start + 1] & 0x80;
        if (drop == 0x00 && keep_top == 0) || (drop == 0xFF && keep_top == 0x80) {
            start += 1;
        } else {
            break;
        }
    }
    raw[start..].to_vec()
}

/// Minimal unsigned big-endian representation. Zero encodes to no bytes.
fn unsigned_bytes(value: u64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let raw = value.to_be_bytes();
    let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len() - 1);
    raw[start..].to_vec()
}

fn sign_extend(data: &[u8]) -> i64 {
    if data.is_empty() {
        return 0;
    }
    let mut acc: i64 = if data[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in data {
        acc = (acc << 8) | i64::from(b);
    }
    acc
}

fn unsigned_extend(data: &[u8]) -> u64 {
    let mut acc: u64 = 0;
    for &b in data {
        acc = (acc << 8) | u64::from(b);
    }
    acc
}

// ============================================================================
// Writer
// ============================================================================

/// Builds one message body out of tagged fields.
#[derive(Debug, Default)]
pub struct DataWriter {
    buf: BytesMut,
}

impl DataWriter {
    pub fn new() -> Self {
        DataWriter { buf: BytesMut::new() }
    }

    /// Consume the writer, yielding the message body.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_null(&mut self) -> &mut Self {
        self.buf.put_u8(tag::NULL);
        self
    }

    pub fn write_boolean(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(if value { tag::TRUE } else { tag::FALSE });
        self
    }

    /// Tagged integer: bare tag for -10..=31, otherwise a counted
    /// sign-extended payload of 1..=8 bytes.
    pub fn write_int(&mut self, value: i64) -> &mut Self {
        if (-10..=31).contains(&value) {
            self.buf.put_u8((tag::INT_0 as i64 + value) as u8);
        } else {
            let data = signed_bytes(value);
            self.buf.put_u8(tag::INT_LEN_BASE + data.len() as u8);
            self.buf.put_slice(&data);
        }
        self
    }

    /// Exact decimal as a scaled integer. Values whose unscaled part does
    /// not fit in 8 sign-extended bytes are not representable.
    pub fn write_scaled_int(&mut self, value: Decimal) -> Result<&mut Self> {
        let (unscaled, scale) = if value.scale < 0 {
            // Negative scales are folded into the unscaled value.
            let factor = 10i128
                .checked_pow(-i32::from(value.scale) as u32)
                .ok_or_else(|| Error::Data("decimal scale out of range".to_string()))?;
            let widened = value
                .unscaled
                .checked_mul(factor)
                .ok_or_else(|| Error::Data("decimal overflow".to_string()))?;
            (widened, 0u8)
        } else {
            (value.unscaled, value.scale as u8)
        };

        let data = signed_bytes_wide(unscaled);
        if data.len() > 8 {
            return Err(Error::Data(format!(
                "decimal unscaled value {} does not fit in 8 bytes",
                unscaled
            )));
        }
        self.buf.put_u8(tag::SCALED_BASE + data.len() as u8);
        self.buf.put_u8(scale);
        self.buf.put_slice(&data);
        Ok(self)
    }

    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let data = value.as_bytes();
        if data.len() < 40 {
            self.buf.put_u8(tag::UTF8_LEN_BASE + data.len() as u8);
        } else {
            let len = unsigned_bytes(data.len() as u64);
            self.buf.put_u8(tag::UTF8_COUNT_BASE + len.len() as u8);
            self.buf.put_slice(&len);
        }
        self.buf.put_slice(data);
        self
    }

    pub fn write_opaque(&mut self, value: &[u8]) -> &mut Self {
        if value.len() < 40 {
            self.buf.put_u8(tag::OPAQUE_LEN_BASE + value.len() as u8);
        } else {
            let len = unsigned_bytes(value.len() as u64);
            self.buf.put_u8(tag::OPAQUE_COUNT_BASE + len.len() as u8);
            self.buf.put_slice(&len);
        }
        self.buf.put_slice(value);
        self
    }

    /// IEEE-754 big-endian with trailing zero bytes stripped.
    pub fn write_double(&mut self, value: f64) -> &mut Self {
        let raw = value.to_be_bytes();
        let len = 8 - raw.iter().rev().take_while(|&&b| b == 0).count();
        self.buf.put_u8(tag::DOUBLE_BASE + len as u8);
        self.buf.put_slice(&raw[..len]);
        self
    }

    pub fn write_uuid(&mut self, value: &[u8; 16]) -> &mut Self {
        self.buf.put_u8(tag::UUID);
        self.buf.put_slice(value);
        self
    }

    pub fn write_ms_since_epoch(&mut self, value: i64) -> &mut Self {
        let data = signed_bytes(value);
        self.buf.put_u8(tag::MSEC_BASE + data.len() as u8);
        self.buf.put_slice(&data);
        self
    }

    pub fn write_ns_since_epoch(&mut self, value: i64) -> &mut Self {
        let data = signed_bytes(value);
        self.buf.put_u8(tag::NSEC_BASE + data.len() as u8);
        self.buf.put_slice(&data);
        self
    }

    pub fn write_ms_since_midnight(&mut self, value: i32) -> &mut Self {
        let data = signed_bytes(value as i64);
        self.buf.put_u8(tag::TIME_BASE + data.len() as u8);
        self.buf.put_slice(&data);
        self
    }

    pub fn write_blob(&mut self, value: &[u8]) -> &mut Self {
        let len = unsigned_bytes(value.len() as u64);
        self.buf.put_u8(tag::BLOB_BASE + len.len() as u8);
        self.buf.put_slice(&len);
        self.buf.put_slice(value);
        self
    }

    pub fn write_clob(&mut self, value: &str) -> &mut Self {
        let len = unsigned_bytes(value.len() as u64);
        self.buf.put_u8(tag::CLOB_BASE + len.len() as u8);
        self.buf.put_slice(&len);
        self.buf.put_slice(value.as_bytes());
        self
    }

    fn write_scaled_ticks(&mut self, base: u8, ticks: i64, scale: u8) {
        let mut data = signed_bytes(ticks);
        if data.is_empty() {
            // The zero-length form would collide with the neighbouring tag.
            data.push(0);
        }
        self.buf.put_u8(base + data.len() as u8);
        self.buf.put_u8(scale);
        self.buf.put_slice(&data);
    }

    pub fn write_scaled_date(&mut self, value: Date) -> &mut Self {
        self.write_scaled_ticks(tag::SCALED_DATE_BASE, value.days, value.scale);
        self
    }

    pub fn write_scaled_time(&mut self, value: Time) -> &mut Self {
        self.write_scaled_ticks(tag::SCALED_TIME_BASE, value.ticks, value.scale);
        self
    }

    pub fn write_scaled_timestamp(&mut self, value: Timestamp) -> &mut Self {
        self.write_scaled_ticks(tag::SCALED_TIMESTAMP_BASE, value.ticks, value.scale);
        self
    }

    /// Encode any `Value` with its natural tag family.
    pub fn write_value(&mut self, value: &Value) -> Result<&mut Self> {
        match value {
            Value::Null => self.write_null(),
            Value::Boolean(v) => self.write_boolean(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Decimal(v) => self.write_scaled_int(*v)?,
            Value::Double(v) => self.write_double(*v),
            Value::String(v) => self.write_string(v),
            Value::Opaque(v) => self.write_opaque(v),
            Value::Blob(v) => self.write_blob(v),
            Value::Clob(v) => self.write_clob(v),
            Value::Uuid(v) => self.write_uuid(v),
            Value::Date(v) => self.write_scaled_date(*v),
            Value::Time(v) => self.write_scaled_time(*v),
            Value::Timestamp(v) => self.write_scaled_timestamp(*v),
            Value::MsSinceEpoch(v) => self.write_ms_since_epoch(*v),
            Value::NsSinceEpoch(v) => self.write_ns_since_epoch(*v),
            Value::MsSinceMidnight(v) => self.write_ms_since_midnight(*v),
        };
        Ok(self)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Walks one received message body, decoding tagged fields in order.
#[derive(Debug)]
pub struct DataReader {
    buf: Bytes,
}

impl DataReader {
    pub fn new(buf: Bytes) -> Self {
        DataReader { buf }
    }

    /// True if at least one more field could start here.
    pub fn has_remaining(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn peek_tag(&self) -> Result<u8> {
        self.buf
            .first()
            .copied()
            .ok_or_else(|| Error::Protocol("end of stream reached".to_string()))
    }

    fn get_tag(&mut self) -> Result<u8> {
        let t = self.peek_tag()?;
        self.buf = self.buf.slice(1..);
        Ok(t)
    }

    fn take(&mut self, n: usize) -> Result<Bytes> {
        if self.buf.len() < n {
            return Err(Error::Protocol(format!(
                "end of stream reached (need {} bytes, have {})",
                n,
                self.buf.len()
            )));
        }
        let out = self.buf.slice(..n);
        self.buf = self.buf.slice(n..);
        Ok(out)
    }

    pub fn read_int(&mut self) -> Result<i64> {
        let code = self.get_tag()?;
        match code {
            tag::INT_MINUS_10..=tag::INT_31 => Ok(i64::from(code) - i64::from(tag::INT_0)),
            tag::INT_LEN_1..=tag::INT_LEN_8 => {
                let data = self.take((code - tag::INT_LEN_BASE) as usize)?;
                Ok(sign_extend(&data))
            }
            _ => Err(Error::Protocol(format!("not an integer: tag {}", code))),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let v = self.read_int()?;
        i32::try_from(v).map_err(|_| Error::Protocol(format!("integer {} out of i32 range", v)))
    }

    pub fn read_boolean(&mut self) -> Result<bool> {
        match self.get_tag()? {
            tag::TRUE => Ok(true),
            tag::FALSE => Ok(false),
            code => Err(Error::Protocol(format!("not a boolean: tag {}", code))),
        }
    }

    pub fn read_string(&mut self) -> Result<String> {
        let code = self.get_tag()?;
        let data = match code {
            tag::UTF8_LEN_BASE..=tag::UTF8_LEN_MAX => {
                self.take((code - tag::UTF8_LEN_BASE) as usize)?
            }
            tag::UTF8_COUNT_1..=tag::UTF8_COUNT_4 => {
                let len = self.read_counted_length(code - tag::UTF8_COUNT_BASE)?;
                self.take(len)?
            }
            _ => return Err(Error::Protocol(format!("not a string: tag {}", code))),
        };
        String::from_utf8(data.to_vec()).map_err(|e| Error::Data(format!("invalid UTF-8: {}", e)))
    }

    pub fn read_opaque(&mut self) -> Result<Vec<u8>> {
        let code = self.get_tag()?;
        let data = match code {
            tag::OPAQUE_LEN_BASE..=tag::OPAQUE_LEN_MAX => {
                self.take((code - tag::OPAQUE_LEN_BASE) as usize)?
            }
            tag::OPAQUE_COUNT_1..=tag::OPAQUE_COUNT_4 => {
                let len = self.read_counted_length(code - tag::OPAQUE_COUNT_BASE)?;
                self.take(len)?
            }
            _ => return Err(Error::Protocol(format!("not an opaque value: tag {}", code))),
        };
        Ok(data.to_vec())
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let code = self.get_tag()?;
        if !(tag::DOUBLE_BASE..=tag::DOUBLE_MAX).contains(&code) {
            return Err(Error::Protocol(format!("not a double: tag {}", code)));
        }
        let data = self.take((code - tag::DOUBLE_BASE) as usize)?;
        let mut raw = [0u8; 8];
        raw[..data.len()].copy_from_slice(&data);
        Ok(f64::from_be_bytes(raw))
    }

    pub fn read_uuid(&mut self) -> Result<[u8; 16]> {
        let code = self.get_tag()?;
        if code != tag::UUID {
            return Err(Error::Protocol(format!("not a UUID: tag {}", code)));
        }
        let data = self.take(16)?;
        let mut out = [0u8; 16];
        out.copy_from_slice(&data);
        Ok(out)
    }

    pub fn read_scaled_int(&mut self) -> Result<Decimal> {
        let code = self.get_tag()?;
        match code {
            tag::SCALED_BASE..=tag::SCALED_MAX => {
                let scale = self.take(1)?[0];
                let data = self.take((code - tag::SCALED_BASE) as usize)?;
                Ok(Decimal::new(i128::from(sign_extend(&data)), scale as i8))
            }
            tag::SCALED_COUNT_1 | tag::SCALED_COUNT_2 => {
                let scale = self.take(1)?[0];
                let data = self.take(8)?;
                Ok(Decimal::new(i128::from(sign_extend(&data)), scale as i8))
            }
            _ => Err(Error::Protocol(format!("not a scaled integer: tag {}", code))),
        }
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let code = self.get_tag()?;
        if !(tag::BLOB_BASE..=tag::BLOB_MAX).contains(&code) {
            return Err(Error::Protocol(format!("not a blob: tag {}", code)));
        }
        let len = self.read_counted_length(code - tag::BLOB_BASE)?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_clob(&mut self) -> Result<String> {
        let code = self.get_tag()?;
        if !(tag::CLOB_BASE..=tag::CLOB_MAX).contains(&code) {
            return Err(Error::Protocol(format!("not a clob: tag {}", code)));
        }
        let len = self.read_counted_length(code - tag::CLOB_BASE)?;
        let data = self.take(len)?;
        String::from_utf8(data.to_vec()).map_err(|e| Error::Data(format!("invalid UTF-8: {}", e)))
    }

    fn read_scaled_ticks(&mut self, base: u8, code: u8) -> Result<(i64, u8)> {
        let scale = self.take(1)?[0];
        let data = self.take((code - base) as usize)?;
        Ok((sign_extend(&data), scale))
    }

    /// Decode whatever field comes next into a `Value`.
    pub fn read_value(&mut self) -> Result<Value> {
        let code = self.peek_tag()?;
        match code {
            tag::NULL => {
                self.get_tag()?;
                Ok(Value::Null)
            }
            tag::TRUE | tag::FALSE => Ok(Value::Boolean(self.read_boolean()?)),
            tag::INT_MINUS_10..=tag::INT_LEN_8 => Ok(Value::Int(self.read_int()?)),
            tag::SCALED_BASE..=tag::SCALED_MAX | tag::SCALED_COUNT_1 | tag::SCALED_COUNT_2 => {
                Ok(Value::Decimal(self.read_scaled_int()?))
            }
            tag::UTF8_COUNT_1..=tag::UTF8_COUNT_4 | tag::UTF8_LEN_BASE..=tag::UTF8_LEN_MAX => {
                Ok(Value::String(self.read_string()?))
            }
            tag::OPAQUE_COUNT_1..=tag::OPAQUE_COUNT_4
            | tag::OPAQUE_LEN_BASE..=tag::OPAQUE_LEN_MAX => Ok(Value::Opaque(self.read_opaque()?)),
            tag::DOUBLE_BASE..=tag::DOUBLE_MAX => Ok(Value::Double(self.read_double()?)),
            tag::MSEC_BASE..=tag::MSEC_MAX => {
                let code = self.get_tag()?;
                let data = self.take((code - tag::MSEC_BASE) as usize)?;
                Ok(Value::MsSinceEpoch(sign_extend(&data)))
            }
            tag::NSEC_BASE..=tag::NSEC_MAX => {
                let code = self.get_tag()?;
                let data = self.take((code - tag::NSEC_BASE) as usize)?;
                Ok(Value::NsSinceEpoch(sign_extend(&data)))
            }
            tag::TIME_BASE..=tag::TIME_MAX => {
                let code = self.get_tag()?;
                let data = self.take((code - tag::TIME_BASE) as usize)?;
                Ok(Value::MsSinceMidnight(sign_extend(&data) as i32))
            }
            tag::BLOB_BASE..=tag::BLOB_MAX => Ok(Value::Blob(self.read_blob()?)),
            tag::CLOB_BASE..=tag::CLOB_MAX => Ok(Value::Clob(self.read_clob()?)),
            tag::UUID => Ok(Value::Uuid(self.read_uuid()?)),
            tag::SCALED_DATE_1..=tag::SCALED_DATE_8 => {
                let code = self.get_tag()?;
                let (days, scale) = self.read_scaled_ticks(tag::SCALED_DATE_BASE, code)?;
                Ok(Value::Date(Date { days, scale }))
            }
            tag::SCALED_TIME_1..=tag::SCALED_TIME_8 => {
                let code = self.get_tag()?;
                let (ticks, scale) = self.read_scaled_ticks(tag::SCALED_TIME_BASE, code)?;
                Ok(Value::Time(Time { ticks, scale }))
            }
            tag::SCALED_TIMESTAMP_1..=tag::SCALED_TIMESTAMP_8 => {
                let code = self.get_tag()?;
                let (ticks, scale) = self.read_scaled_ticks(tag::SCALED_TIMESTAMP_BASE, code)?;
                Ok(Value::Timestamp(Timestamp { ticks, scale }))
            }
            _ => Err(Error::Protocol(format!("invalid type code: {}", code))),
        }
    }

    /// Unsigned big-endian length prefix of `n` bytes.
    fn read_counted_length(&mut self, n: u8) -> Result<usize> {
        let data = self.take(n as usize)?;
        Ok(unsigned_extend(&data) as usize)
    }
}
