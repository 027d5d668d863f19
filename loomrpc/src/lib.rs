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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod service;
pub mod transport;

pub use client::{Client, ClientConfig, ReconnectPolicy, ServiceHandle};
pub use error::{ApplicationError, ApplicationErrorKind, Error, RegistrationError, TransportError};
pub use protocol::{
    BinaryProtocol, MessageKind, Protocol, RawField, RawList, RawMap, RawMessage, RawStruct,
    RawValue, WireType,
};
pub use server::{Server, ServerError};
pub use service::{DeclaredException, MethodSpec, MethodTable, ReplyBody, ServiceSpec};
pub use transport::{
    Connection, FrameReader, FrameWriter, MemoryTransport, MessageSender, TcpTransport, Transport,
};
#[cfg(feature = "tls")]
pub use transport::TlsTransport;
