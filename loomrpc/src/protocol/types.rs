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

//! The wire data model: message kinds, type tags, and the raw value union.
//!
//! These types are ephemeral carriers between the codec and the engines;
//! they are built per message and discarded once consumed. Generated
//! struct codecs convert between these shapes and typed values.

use bytes::Bytes;
use uuid::Uuid;

/// The four message kinds of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A request that expects a reply.
    Call = 1,
    /// A successful (or declared-exception) reply.
    Reply = 2,
    /// A framework-level error reply.
    Exception = 3,
    /// A fire-and-forget request.
    Oneway = 4,
}

impl MessageKind {
    /// Maps a wire byte to a message kind.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Call),
            2 => Some(Self::Reply),
            3 => Some(Self::Exception),
            4 => Some(Self::Oneway),
            _ => None,
        }
    }
}

/// The value types the binary protocol can carry.
///
/// The wire tag assignment is fixed by the Thrift binary protocol and is
/// distinct from the enum's own ordering; [`WireType::tag`] and
/// [`WireType::from_tag`] maintain the mapping in both directions.
///
/// ```
/// use loomrpc::WireType;
///
/// assert_eq!(WireType::Bool.tag(), 2);
/// assert_eq!(WireType::from_tag(15), Some(WireType::List));
/// assert_eq!(WireType::from_tag(5), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// A boolean value.
    Bool,
    /// An 8-bit signed integer.
    I8,
    /// A 16-bit signed integer.
    I16,
    /// A 32-bit signed integer.
    I32,
    /// A 64-bit signed integer.
    I64,
    /// A 64-bit IEEE-754 float.
    Double,
    /// A length-prefixed byte string.
    Binary,
    /// A nested struct.
    Struct,
    /// A map with parallel key/value sequences.
    Map,
    /// A set, encoded identically to a list.
    Set,
    /// A list.
    List,
    /// A 128-bit UUID.
    Uuid,
}

impl WireType {
    /// Returns the one-byte wire tag for this type.
    pub fn tag(self) -> u8 {
        match self {
            Self::Bool => 2,
            Self::I8 => 3,
            Self::Double => 4,
            Self::I16 => 6,
            Self::I32 => 8,
            Self::I64 => 10,
            Self::Binary => 11,
            Self::Struct => 12,
            Self::Map => 13,
            Self::Set => 14,
            Self::List => 15,
            Self::Uuid => 16,
        }
    }

    /// Maps a wire tag back to a type; unknown tags are protocol errors
    /// and yield `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            2 => Some(Self::Bool),
            3 => Some(Self::I8),
            4 => Some(Self::Double),
            6 => Some(Self::I16),
            8 => Some(Self::I32),
            10 => Some(Self::I64),
            11 => Some(Self::Binary),
            12 => Some(Self::Struct),
            13 => Some(Self::Map),
            14 => Some(Self::Set),
            15 => Some(Self::List),
            16 => Some(Self::Uuid),
            _ => None,
        }
    }
}

/// A single decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// A boolean.
    Bool(bool),
    /// An 8-bit signed integer.
    I8(i8),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 64-bit float.
    Double(f64),
    /// A byte string.
    Binary(Bytes),
    /// A UUID.
    Uuid(Uuid),
    /// A nested struct.
    Struct(RawStruct),
    /// A list of values sharing one element type.
    List(RawList),
    /// A set, carried with list layout.
    Set(RawList),
    /// A map with parallel key/value sequences.
    Map(RawMap),
}

impl RawValue {
    /// Returns the wire type this value encodes as.
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Bool(_) => WireType::Bool,
            Self::I8(_) => WireType::I8,
            Self::I16(_) => WireType::I16,
            Self::I32(_) => WireType::I32,
            Self::I64(_) => WireType::I64,
            Self::Double(_) => WireType::Double,
            Self::Binary(_) => WireType::Binary,
            Self::Uuid(_) => WireType::Uuid,
            Self::Struct(_) => WireType::Struct,
            Self::List(_) => WireType::List,
            Self::Set(_) => WireType::Set,
            Self::Map(_) => WireType::Map,
        }
    }
}

/// One field of a struct: numeric id plus value.
///
/// The name is advisory; the wire format never carries it, so decoded
/// fields always have an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    /// The numeric field id.
    pub id: i16,
    /// The advisory field name.
    pub name: String,
    /// The field value; its wire type travels with it.
    pub value: RawValue,
}

/// An unordered bag of fields keyed by numeric id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawStruct {
    /// The advisory struct name (not sent on the wire).
    pub name: String,
    /// The struct's fields.
    pub fields: Vec<RawField>,
}

impl RawStruct {
    /// Creates an empty struct with an advisory name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Appends a field, builder-style.
    pub fn with_field(mut self, id: i16, value: RawValue) -> Self {
        self.fields.push(RawField { id, name: String::new(), value });
        self
    }

    /// Looks up a field value by id.
    pub fn field(&self, id: i16) -> Option<&RawValue> {
        self.fields.iter().find(|field| field.id == id).map(|field| &field.value)
    }
}

/// A list or set payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawList {
    /// The element wire type.
    pub element_type: WireType,
    /// The elements, in wire order.
    pub elements: Vec<RawValue>,
}

/// A map payload.
///
/// Keys and values are parallel sequences of equal length; the wire
/// format makes no hashability or uniqueness assumption about keys.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMap {
    /// The key wire type.
    pub key_type: WireType,
    /// The value wire type.
    pub value_type: WireType,
    /// The keys, in wire order.
    pub keys: Vec<RawValue>,
    /// The values, parallel to `keys`.
    pub values: Vec<RawValue>,
}

/// A complete wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// The message kind.
    pub kind: MessageKind,
    /// The sequence id correlating calls with replies.
    pub seq: i32,
    /// The method name, namespaced as `"<service>:<method>"`.
    pub name: String,
    /// The message body.
    pub body: RawStruct,
}
