//! `htsmsg` binary framing.
//!
//! A frame is a 4-byte big-endian body length followed by the body. The
//! body is a flat sequence of fields:
//!
//! ```text
//! type:u8  name_len:u8  data_len:u32be  name[name_len]  data[data_len]
//! ```
//!
//! Maps and lists nest another field sequence inside `data`; list entries
//! carry empty names. Signed integers are little-endian with trailing zero
//! bytes stripped, so `0` encodes as an empty payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;
use crate::message::{HtspMessage, Value};

/// Default ceiling for a single frame (16 MiB).
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

const LEN_PREFIX: usize = 4;
const FIELD_HEADER: usize = 6;

const TYPE_MAP: u8 = 1;
const TYPE_S64: u8 = 2;
const TYPE_STR: u8 = 3;
const TYPE_BIN: u8 = 4;
const TYPE_LIST: u8 = 5;
const TYPE_DBL: u8 = 6;
const TYPE_BOOL: u8 = 7;

/// `tokio_util` codec turning a byte stream into [`HtspMessage`]s.
#[derive(Debug, Clone)]
pub struct HtsmsgCodec {
    max_frame: usize,
}

impl HtsmsgCodec {
    pub fn new() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

impl Default for HtsmsgCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HtsmsgCodec {
    type Item = HtspMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(prefix) = src.get(..LEN_PREFIX) else {
            return Ok(None);
        };
        let body_len = read_len(prefix)?;
        if body_len > self.max_frame {
            return Err(Error::FrameTooLarge {
                size: body_len,
                max: self.max_frame,
            });
        }

        let frame_len = LEN_PREFIX + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        let body = src.split_to(body_len).freeze();
        decode_fields(&body).map(Some)
    }
}

impl Encoder<HtspMessage> for HtsmsgCodec {
    type Error = Error;

    fn encode(&mut self, item: HtspMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        dst.put_u32(0);
        for (name, value) in item.fields() {
            encode_field(name, value, dst)?;
        }

        let body_len = dst.len() - start - LEN_PREFIX;
        if body_len > self.max_frame {
            dst.truncate(start);
            return Err(Error::FrameTooLarge {
                size: body_len,
                max: self.max_frame,
            });
        }
        patch_len(dst, start, body_len)
    }
}

/// Encode a single message into a standalone frame.
pub fn encode_frame(message: HtspMessage) -> Result<Bytes, Error> {
    let mut buf = BytesMut::new();
    HtsmsgCodec::new().encode(message, &mut buf)?;
    Ok(buf.freeze())
}

// ── Decoding ─────────────────────────────────────────────────────────

fn read_len(bytes: &[u8]) -> Result<usize, Error> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| Error::Codec("truncated length".into()))?;
    usize::try_from(u32::from_be_bytes(arr)).map_err(|_| Error::Codec("length overflow".into()))
}

/// Decode a field sequence (a message body or a nested map/list payload).
pub(crate) fn decode_fields(mut buf: &[u8]) -> Result<HtspMessage, Error> {
    let mut msg = HtspMessage::new();

    while !buf.is_empty() {
        if buf.len() < FIELD_HEADER {
            return Err(Error::Codec("truncated field header".into()));
        }
        let (header, rest) = buf.split_at(FIELD_HEADER);
        let ty = header[0];
        let name_len = usize::from(header[1]);
        let data_len = read_len(&header[2..])?;

        if rest.len() < name_len + data_len {
            return Err(Error::Codec(format!(
                "truncated field: need {} bytes, have {}",
                name_len + data_len,
                rest.len()
            )));
        }
        let (name, rest) = rest.split_at(name_len);
        let (data, rest) = rest.split_at(data_len);
        buf = rest;

        let name = std::str::from_utf8(name)
            .map_err(|e| Error::Codec(format!("field name is not UTF-8: {e}")))?
            .to_owned();
        let value = decode_value(ty, data)?;
        msg.push(name, value);
    }

    Ok(msg)
}

fn decode_value(ty: u8, data: &[u8]) -> Result<Value, Error> {
    match ty {
        TYPE_MAP => decode_fields(data).map(Value::Map),
        TYPE_S64 => decode_s64(data).map(Value::S64),
        TYPE_STR => std::str::from_utf8(data)
            .map(|s| Value::Str(s.to_owned()))
            .map_err(|e| Error::Codec(format!("string field is not UTF-8: {e}"))),
        TYPE_BIN => Ok(Value::Bin(Bytes::copy_from_slice(data))),
        TYPE_LIST => {
            let inner = decode_fields(data)?;
            Ok(Value::List(inner.fields().map(|(_, v)| v.clone()).collect()))
        }
        TYPE_DBL => {
            let arr: [u8; 8] = data
                .try_into()
                .map_err(|_| Error::Codec(format!("double field has {} bytes", data.len())))?;
            Ok(Value::Dbl(f64::from_le_bytes(arr)))
        }
        TYPE_BOOL => {
            if data.len() > 1 {
                return Err(Error::Codec(format!("bool field has {} bytes", data.len())));
            }
            Ok(Value::Bool(data.first().is_some_and(|b| *b != 0)))
        }
        other => Err(Error::Codec(format!("unknown field type {other}"))),
    }
}

fn decode_s64(data: &[u8]) -> Result<i64, Error> {
    if data.len() > 8 {
        return Err(Error::Codec(format!("integer field has {} bytes", data.len())));
    }
    let mut arr = [0u8; 8];
    arr[..data.len()].copy_from_slice(data);
    Ok(i64::from_le_bytes(arr))
}

// ── Encoding ─────────────────────────────────────────────────────────

fn encode_field(name: &str, value: &Value, dst: &mut BytesMut) -> Result<(), Error> {
    let name_len = u8::try_from(name.len())
        .map_err(|_| Error::Codec(format!("field name too long: {} bytes", name.len())))?;

    let ty = match value {
        Value::Map(_) => TYPE_MAP,
        Value::S64(_) => TYPE_S64,
        Value::Str(_) => TYPE_STR,
        Value::Bin(_) => TYPE_BIN,
        Value::List(_) => TYPE_LIST,
        Value::Dbl(_) => TYPE_DBL,
        Value::Bool(_) => TYPE_BOOL,
    };

    dst.put_u8(ty);
    dst.put_u8(name_len);
    let len_at = dst.len();
    dst.put_u32(0);
    dst.put_slice(name.as_bytes());

    let data_start = dst.len();
    match value {
        Value::Map(m) => {
            for (n, v) in m.fields() {
                encode_field(n, v, dst)?;
            }
        }
        Value::S64(n) => {
            let bytes = n.to_le_bytes();
            let significant = 8 - usize::try_from(n.leading_zeros() / 8).unwrap_or(0);
            dst.put_slice(&bytes[..significant]);
        }
        Value::Str(s) => dst.put_slice(s.as_bytes()),
        Value::Bin(b) => dst.put_slice(b),
        Value::List(items) => {
            for item in items {
                encode_field("", item, dst)?;
            }
        }
        Value::Dbl(d) => dst.put_slice(&d.to_le_bytes()),
        Value::Bool(b) => dst.put_u8(u8::from(*b)),
    }

    patch_len(dst, len_at, dst.len() - data_start)
}

fn patch_len(dst: &mut BytesMut, at: usize, len: usize) -> Result<(), Error> {
    let len = u32::try_from(len).map_err(|_| Error::Codec(format!("payload too long: {len}")))?;
    dst[at..at + LEN_PREFIX].copy_from_slice(&len.to_be_bytes());
    Ok(())
}
