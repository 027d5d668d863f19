//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The Thrift binary protocol codec.
//!
//! Encoding is synchronous into a [`FrameWriter`]; decoding is
//! straight-line async code over a [`FrameReader`], suspending wherever
//! the next bytes have not arrived yet. A decode consumes exactly one
//! message's bytes; anything buffered beyond that belongs to the next
//! message.
//!
//! # Message framing
//!
//! Versioned (strict) header:
//!
//! ```text
//! +--------+--------+--------+--------+----------------+--------+----------------+
//! | 0x80   | 0x01   | 0x00   | kind   | name len (i32) | name   | sequence (i32) |
//! +--------+--------+--------+--------+----------------+--------+----------------+
//! ```
//!
//! Legacy (unversioned) header, accepted only by non-strict readers:
//!
//! ```text
//! +----------------+--------+--------+----------------+
//! | name len (i32) | name   | kind   | sequence (i32) |
//! +----------------+--------+--------+----------------+
//! ```
//!
//! The body is a struct: a run of `[tag:u8][id:i16][value]` field headers
//! terminated by a single STOP byte.

use crate::error::{ApplicationError, ApplicationErrorKind, Error};
use crate::protocol::{
    MessageKind, Protocol, RawField, RawList, RawMap, RawMessage, RawStruct, RawValue, WireType,
};
use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

/// The version word of a strict message header.
const VERSION_1: u16 = 0x8001;
/// Mask extracting the version number from the version word.
const VERSION_MASK: u16 = 0x7fff;
/// Field tag terminating a struct.
const STOP_FIELD: u8 = 0;

/// Upper bound on a single binary/string payload (16 MiB).
pub const MAX_BINARY_BYTES: usize = 16 * 1024 * 1024;
/// Upper bound on a single container's element count.
pub const MAX_CONTAINER_ITEMS: usize = 1 << 24;

/// The Thrift binary protocol.
///
/// `strict_write` controls whether outgoing messages carry the versioned
/// header; `strict_read` controls whether unversioned (legacy) headers are
/// rejected. The defaults — lenient reads, strict writes — interoperate
/// with both modern and legacy peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryProtocol {
    /// Reject unversioned message headers when decoding.
    pub strict_read: bool,
    /// Emit versioned message headers when encoding.
    pub strict_write: bool,
}

impl Default for BinaryProtocol {
    fn default() -> Self {
        Self { strict_read: false, strict_write: true }
    }
}

/// Maps reader I/O failures into the error taxonomy: a stream that ends
/// mid-message is a framing (protocol) error, anything else is transport.
fn framing(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ApplicationError::protocol("unexpected end of stream").into()
    } else {
        crate::error::TransportError::Io { source: err }.into()
    }
}

impl BinaryProtocol {
    /// A protocol with both strict flags set.
    pub fn strict() -> Self {
        Self { strict_read: true, strict_write: true }
    }

    /// Decodes one message, suspending while bytes are missing.
    pub async fn read_message<R>(&self, reader: &mut FrameReader<R>) -> Result<RawMessage, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let head = reader.peek(4).await.map_err(framing)?;
        let head = [head[0], head[1], head[2], head[3]];

        let (kind, name, seq);
        if head[0] & 0x80 != 0 {
            let version = u16::from_be_bytes([head[0], head[1]]) & VERSION_MASK;
            if version != 1 {
                return Err(ApplicationError::new(
                    ApplicationErrorKind::InvalidProtocol,
                    format!("unsupported binary protocol version: {version}"),
                )
                .into());
            }
            kind = Self::message_kind(head[3])?;
            reader.skip(4).await.map_err(framing)?;
            name = self.read_string(reader).await?;
            seq = reader.read_i32().await.map_err(framing)?;
        } else {
            if self.strict_read {
                return Err(ApplicationError::new(
                    ApplicationErrorKind::InvalidProtocol,
                    "unsupported binary protocol version: 0",
                )
                .into());
            }
            name = self.read_string(reader).await?;
            kind = Self::message_kind(reader.read_u8().await.map_err(framing)?)?;
            seq = reader.read_i32().await.map_err(framing)?;
        }
        let body = self.read_struct(reader).await?;
        Ok(RawMessage { kind, seq, name, body })
    }

    /// Encodes one message into the writer's buffers; the caller flushes.
    pub fn write_message<W>(&self, writer: &mut FrameWriter<W>, message: &RawMessage) -> Result<(), Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        if self.strict_write {
            writer.put_u16(VERSION_1);
            writer.put_u8(0);
            writer.put_u8(message.kind as u8);
            self.write_string(writer, &message.name);
            writer.put_i32(message.seq);
        } else {
            self.write_string(writer, &message.name);
            writer.put_u8(message.kind as u8);
            writer.put_i32(message.seq);
        }
        self.write_struct(writer, &message.body);
        Ok(())
    }

    fn message_kind(value: u8) -> Result<MessageKind, Error> {
        MessageKind::from_u8(value)
            .ok_or_else(|| ApplicationError::protocol(format!("invalid message kind {value}")).into())
    }

    async fn read_struct<R>(&self, reader: &mut FrameReader<R>) -> Result<RawStruct, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut fields = Vec::new();
        loop {
            let tag = reader.read_u8().await.map_err(framing)?;
            if tag == STOP_FIELD {
                break;
            }
            let ty = WireType::from_tag(tag)
                .ok_or_else(|| ApplicationError::protocol(format!("unknown wire type tag {tag}")))?;
            let id = reader.read_i16().await.map_err(framing)?;
            let value = self.read_value(reader, ty).await?;
            fields.push(RawField { id, name: String::new(), value });
        }
        Ok(RawStruct { name: String::new(), fields })
    }

    /// Reads one value of the given type.
    ///
    /// Boxed so struct/container readers can recurse through it.
    fn read_value<'a, R>(
        &'a self,
        reader: &'a mut FrameReader<R>,
        ty: WireType,
    ) -> BoxFuture<'a, Result<RawValue, Error>>
    where
        R: AsyncRead + Send + Unpin,
    {
        Box::pin(async move {
            Ok(match ty {
                WireType::Bool => RawValue::Bool(reader.read_u8().await.map_err(framing)? != 0),
                WireType::I8 => RawValue::I8(reader.read_i8().await.map_err(framing)?),
                WireType::I16 => RawValue::I16(reader.read_i16().await.map_err(framing)?),
                WireType::I32 => RawValue::I32(reader.read_i32().await.map_err(framing)?),
                WireType::I64 => RawValue::I64(reader.read_i64().await.map_err(framing)?),
                WireType::Double => RawValue::Double(reader.read_f64().await.map_err(framing)?),
                WireType::Binary => RawValue::Binary(self.read_binary(reader).await?),
                WireType::Uuid => {
                    let mut raw = [0u8; 16];
                    raw.copy_from_slice(reader.consume(16).await.map_err(framing)?);
                    RawValue::Uuid(Uuid::from_bytes(raw))
                }
                WireType::Struct => RawValue::Struct(self.read_struct(reader).await?),
                WireType::List => RawValue::List(self.read_list(reader).await?),
                WireType::Set => RawValue::Set(self.read_list(reader).await?),
                WireType::Map => RawValue::Map(self.read_map(reader).await?),
            })
        })
    }

    async fn read_list<R>(&self, reader: &mut FrameReader<R>) -> Result<RawList, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let tag = reader.read_u8().await.map_err(framing)?;
        let element_type = WireType::from_tag(tag)
            .ok_or_else(|| ApplicationError::protocol(format!("unknown wire type tag {tag}")))?;
        let count = Self::container_count(reader.read_i32().await.map_err(framing)?)?;
        let mut elements = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            elements.push(self.read_value(reader, element_type).await?);
        }
        Ok(RawList { element_type, elements })
    }

    async fn read_map<R>(&self, reader: &mut FrameReader<R>) -> Result<RawMap, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let header = reader.consume(2).await.map_err(framing)?;
        let (key_tag, value_tag) = (header[0], header[1]);
        let key_type = WireType::from_tag(key_tag)
            .ok_or_else(|| ApplicationError::protocol(format!("unknown wire type tag {key_tag}")))?;
        let value_type = WireType::from_tag(value_tag)
            .ok_or_else(|| ApplicationError::protocol(format!("unknown wire type tag {value_tag}")))?;
        let count = Self::container_count(reader.read_i32().await.map_err(framing)?)?;
        let mut keys = Vec::with_capacity(count.min(4096));
        let mut values = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            keys.push(self.read_value(reader, key_type).await?);
            values.push(self.read_value(reader, value_type).await?);
        }
        Ok(RawMap { key_type, value_type, keys, values })
    }

    async fn read_binary<R>(&self, reader: &mut FrameReader<R>) -> Result<Bytes, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let len = reader.read_i32().await.map_err(framing)?;
        if len < 0 {
            return Err(ApplicationError::protocol("negative binary length").into());
        }
        let len = len as usize;
        if len > MAX_BINARY_BYTES {
            return Err(ApplicationError::protocol(format!(
                "binary length {len} exceeds maximum {MAX_BINARY_BYTES}"
            ))
            .into());
        }
        Ok(Bytes::copy_from_slice(reader.consume(len).await.map_err(framing)?))
    }

    async fn read_string<R>(&self, reader: &mut FrameReader<R>) -> Result<String, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        let bytes = self.read_binary(reader).await?;
        String::from_utf8(bytes.into())
            .map_err(|_| ApplicationError::protocol("invalid UTF-8 in string").into())
    }

    fn container_count(raw: i32) -> Result<usize, Error> {
        if raw < 0 {
            return Err(ApplicationError::protocol("negative container size").into());
        }
        let count = raw as usize;
        if count > MAX_CONTAINER_ITEMS {
            return Err(ApplicationError::protocol(format!(
                "container size {count} exceeds maximum {MAX_CONTAINER_ITEMS}"
            ))
            .into());
        }
        Ok(count)
    }

    fn write_struct<W>(&self, writer: &mut FrameWriter<W>, value: &RawStruct)
    where
        W: AsyncWrite + Send + Unpin,
    {
        for field in &value.fields {
            writer.put_u8(field.value.wire_type().tag());
            writer.put_i16(field.id);
            self.write_value(writer, &field.value);
        }
        writer.put_u8(STOP_FIELD);
    }

    fn write_value<W>(&self, writer: &mut FrameWriter<W>, value: &RawValue)
    where
        W: AsyncWrite + Send + Unpin,
    {
        match value {
            RawValue::Bool(v) => writer.put_u8(u8::from(*v)),
            RawValue::I8(v) => writer.put_i8(*v),
            RawValue::I16(v) => writer.put_i16(*v),
            RawValue::I32(v) => writer.put_i32(*v),
            RawValue::I64(v) => writer.put_i64(*v),
            RawValue::Double(v) => writer.put_f64(*v),
            RawValue::Binary(bytes) => {
                writer.put_i32(bytes.len() as i32);
                writer.put_bytes(bytes.clone());
            }
            RawValue::Uuid(uuid) => writer.put(uuid.as_bytes()),
            RawValue::Struct(nested) => self.write_struct(writer, nested),
            RawValue::List(list) | RawValue::Set(list) => self.write_list(writer, list),
            RawValue::Map(map) => self.write_map(writer, map),
        }
    }

    fn write_list<W>(&self, writer: &mut FrameWriter<W>, list: &RawList)
    where
        W: AsyncWrite + Send + Unpin,
    {
        writer.put_u8(list.element_type.tag());
        writer.put_i32(list.elements.len() as i32);
        for element in &list.elements {
            self.write_value(writer, element);
        }
    }

    fn write_map<W>(&self, writer: &mut FrameWriter<W>, map: &RawMap)
    where
        W: AsyncWrite + Send + Unpin,
    {
        debug_assert_eq!(map.keys.len(), map.values.len());
        writer.put_u8(map.key_type.tag());
        writer.put_u8(map.value_type.tag());
        writer.put_i32(map.keys.len() as i32);
        for (key, value) in map.keys.iter().zip(&map.values) {
            self.write_value(writer, key);
            self.write_value(writer, value);
        }
    }

    fn write_string<W>(&self, writer: &mut FrameWriter<W>, value: &str)
    where
        W: AsyncWrite + Send + Unpin,
    {
        writer.put_i32(value.len() as i32);
        writer.put(value.as_bytes());
    }
}

#[async_trait]
impl Protocol for BinaryProtocol {
    async fn decode<R>(&self, reader: &mut FrameReader<R>) -> Result<RawMessage, Error>
    where
        R: AsyncRead + Send + Unpin,
    {
        self.read_message(reader).await
    }

    fn encode<W>(&self, writer: &mut FrameWriter<W>, message: &RawMessage) -> Result<(), Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.write_message(writer, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn encode(protocol: &BinaryProtocol, message: &RawMessage) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        protocol.write_message(&mut writer, message).unwrap();
        writer.flush().await.unwrap();
        writer.into_inner()
    }

    async fn decode(protocol: &BinaryProtocol, bytes: &[u8]) -> Result<RawMessage, Error> {
        let mut reader = FrameReader::new(bytes);
        protocol.read_message(&mut reader).await
    }

    fn kind_of(err: Error) -> ApplicationErrorKind {
        match err {
            Error::Application(app) => app.kind,
            other => panic!("expected application error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_strict_call_byte_layout() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 7,
            name: "Echo:ping".to_owned(),
            body: RawStruct::new(""),
        };
        let bytes = encode(&BinaryProtocol::strict(), &message).await;

        #[rustfmt::skip]
        let expected = [
            0x80, 0x01, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x09,
            b'E', b'c', b'h', b'o', b':', b'p', b'i', b'n', b'g',
            0x00, 0x00, 0x00, 0x07,
            0x00,
        ];
        assert_eq!(bytes, expected);

        let decoded = decode(&BinaryProtocol::strict(), &bytes).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_empty_struct_is_single_stop_byte() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "S:m".to_owned(),
            body: RawStruct::new(""),
        };
        let bytes = encode(&BinaryProtocol::strict(), &message).await;
        // Header: 4 (version+kind) + 4 (name length) + 3 (name) + 4 (seq).
        assert_eq!(bytes.len(), 15 + 1);
        assert_eq!(*bytes.last().unwrap(), 0x00);
    }

    fn sample_values() -> Vec<RawValue> {
        vec![
            RawValue::Bool(true),
            RawValue::Bool(false),
            RawValue::I8(-8),
            RawValue::I16(-16),
            RawValue::I32(i32::MIN),
            RawValue::I64(i64::MAX),
            RawValue::Double(6.02e23),
            RawValue::Binary(Bytes::from_static(b"")),
            RawValue::Binary(Bytes::from_static(b"payload")),
            RawValue::Uuid(Uuid::from_u128(0x6ba7_b810_9dad_11d1_80b4_00c0_4fd4_30c8)),
            RawValue::List(RawList { element_type: WireType::I32, elements: vec![] }),
            RawValue::Set(RawList {
                element_type: WireType::Binary,
                elements: vec![RawValue::Binary(Bytes::from_static(b"a"))],
            }),
            RawValue::Map(RawMap {
                key_type: WireType::Binary,
                value_type: WireType::I64,
                keys: vec![
                    RawValue::Binary(Bytes::from_static(b"one")),
                    RawValue::Binary(Bytes::from_static(b"two")),
                ],
                values: vec![RawValue::I64(1), RawValue::I64(2)],
            }),
            RawValue::Struct(
                RawStruct::new("").with_field(
                    1,
                    RawValue::Struct(RawStruct::new("").with_field(2, RawValue::Bool(true))),
                ),
            ),
        ]
    }

    #[tokio::test]
    async fn test_value_round_trip() {
        let mut body = RawStruct::new("");
        for (index, value) in sample_values().into_iter().enumerate() {
            body = body.with_field(index as i16 + 1, value);
        }
        let message = RawMessage {
            kind: MessageKind::Reply,
            seq: 99,
            name: "Svc:everything".to_owned(),
            body,
        };

        for protocol in [BinaryProtocol::strict(), BinaryProtocol { strict_read: false, strict_write: false }] {
            let bytes = encode(&protocol, &message).await;
            let decoded = decode(&protocol, &bytes).await.unwrap();
            // Decoded structs lose advisory names, which the sample never set.
            assert_eq!(decoded, message);
        }
    }

    #[tokio::test]
    async fn test_legacy_header_round_trip() {
        let legacy = BinaryProtocol { strict_read: false, strict_write: false };
        let message = RawMessage {
            kind: MessageKind::Oneway,
            seq: 0,
            name: "Log:write".to_owned(),
            body: RawStruct::new("").with_field(1, RawValue::I32(42)),
        };
        let bytes = encode(&legacy, &message).await;
        // Legacy framing: name first, then the kind byte, then the sequence.
        assert_eq!(&bytes[..4], &9i32.to_be_bytes());
        assert_eq!(bytes[4 + 9], MessageKind::Oneway as u8);

        let decoded = decode(&legacy, &bytes).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_strict_reader_rejects_legacy_header() {
        let legacy = BinaryProtocol { strict_read: false, strict_write: false };
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 3,
            name: "S:m".to_owned(),
            body: RawStruct::new(""),
        };
        let bytes = encode(&legacy, &message).await;

        let err = decode(&BinaryProtocol::strict(), &bytes).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::InvalidProtocol);
    }

    #[tokio::test]
    async fn test_unsupported_version_rejected() {
        let mut bytes = vec![0x80, 0x02, 0x00, 0x01];
        bytes.extend_from_slice(&1i32.to_be_bytes());
        bytes.push(b'x');
        let err = decode(&BinaryProtocol::default(), &bytes).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::InvalidProtocol);
    }

    #[tokio::test]
    async fn test_unknown_field_tag_rejected() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "S:m".to_owned(),
            body: RawStruct::new(""),
        };
        let mut bytes = encode(&BinaryProtocol::strict(), &message).await;
        // Replace the STOP byte with an unassigned tag plus a field id.
        bytes.pop();
        bytes.push(5);
        bytes.extend_from_slice(&1i16.to_be_bytes());
        let err = decode(&BinaryProtocol::strict(), &bytes).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn test_negative_binary_length_rejected() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "S:m".to_owned(),
            body: RawStruct::new(""),
        };
        let mut bytes = encode(&BinaryProtocol::strict(), &message).await;
        bytes.pop();
        bytes.push(WireType::Binary.tag());
        bytes.extend_from_slice(&1i16.to_be_bytes());
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        bytes.push(0x00);
        let err = decode(&BinaryProtocol::strict(), &bytes).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn test_negative_container_size_rejected() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "S:m".to_owned(),
            body: RawStruct::new(""),
        };
        let mut bytes = encode(&BinaryProtocol::strict(), &message).await;
        bytes.pop();
        bytes.push(WireType::List.tag());
        bytes.extend_from_slice(&1i16.to_be_bytes());
        bytes.push(WireType::I32.tag());
        bytes.extend_from_slice(&(-4i32).to_be_bytes());
        bytes.push(0x00);
        let err = decode(&BinaryProtocol::strict(), &bytes).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn test_truncated_message_is_protocol_error() {
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "Echo:ping".to_owned(),
            body: RawStruct::new("").with_field(1, RawValue::I64(7)),
        };
        let bytes = encode(&BinaryProtocol::strict(), &message).await;
        let err = decode(&BinaryProtocol::strict(), &bytes[..bytes.len() - 3]).await.unwrap_err();
        assert_eq!(kind_of(err), ApplicationErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn test_uuid_canonical_byte_order() {
        let uuid = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        let message = RawMessage {
            kind: MessageKind::Reply,
            seq: 1,
            name: "S:m".to_owned(),
            body: RawStruct::new("").with_field(1, RawValue::Uuid(uuid)),
        };
        let bytes = encode(&BinaryProtocol::strict(), &message).await;
        // Field header is tag + id; the 16 UUID bytes follow in textual
        // group order, not a mixed-endian reordering.
        let offset = bytes.len() - 17;
        assert_eq!(
            &bytes[offset..offset + 16],
            &[
                0x6b, 0xa7, 0xb8, 0x10, 0x9d, 0xad, 0x11, 0xd1,
                0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
            ],
        );

        let decoded = decode(&BinaryProtocol::strict(), &bytes).await.unwrap();
        assert_eq!(decoded.body.field(1), Some(&RawValue::Uuid(uuid)));
    }

    #[tokio::test]
    async fn test_decode_across_single_byte_chunks() {
        let mut body = RawStruct::new("");
        for (index, value) in sample_values().into_iter().enumerate() {
            body = body.with_field(index as i16 + 1, value);
        }
        let message = RawMessage {
            kind: MessageKind::Call,
            seq: 12345,
            name: "Svc:chunked".to_owned(),
            body,
        };
        let protocol = BinaryProtocol::strict();
        let bytes = encode(&protocol, &message).await;

        let (mut tx, rx) = tokio::io::duplex(16);
        let feeder = tokio::spawn(async move {
            for byte in bytes {
                tx.write_all(&[byte]).await.unwrap();
                tx.flush().await.unwrap();
            }
        });

        let mut reader = FrameReader::new(rx);
        let decoded = protocol.read_message(&mut reader).await.unwrap();
        assert_eq!(decoded, message);
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_back_to_back_messages_share_the_stream() {
        let protocol = BinaryProtocol::strict();
        let first = RawMessage {
            kind: MessageKind::Call,
            seq: 1,
            name: "S:a".to_owned(),
            body: RawStruct::new("").with_field(1, RawValue::I32(1)),
        };
        let second = RawMessage {
            kind: MessageKind::Call,
            seq: 2,
            name: "S:b".to_owned(),
            body: RawStruct::new("").with_field(1, RawValue::I32(2)),
        };

        let mut bytes = encode(&protocol, &first).await;
        bytes.extend(encode(&protocol, &second).await);

        let mut reader = FrameReader::new(&bytes[..]);
        assert_eq!(protocol.read_message(&mut reader).await.unwrap(), first);
        assert_eq!(protocol.read_message(&mut reader).await.unwrap(), second);
        assert!(reader.at_eof().await.unwrap());
    }
}
