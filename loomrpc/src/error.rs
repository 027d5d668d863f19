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

//! Layered error model for LoomRPC.
//!
//! Errors fall into three layers, each with its own handling strategy:
//!
//! 1. **Transport**: connection-level failures ([`TransportError`]) —
//!    close the connection, reject pending calls, reconnect if configured
//! 2. **Application**: protocol violations and framework-level failures
//!    ([`ApplicationError`]) — carried on the wire as EXCEPTION messages
//!    with a taxonomy code
//! 3. **Registration**: service/method table misuse ([`RegistrationError`])
//!    — programming errors surfaced at registration time
//!
//! Declared exceptions (errors listed in a method's IDL contract) are not
//! part of this module: they travel inside ordinary REPLY messages and are
//! produced by the typed service layer (see [`crate::service`]).

use crate::protocol::{MessageKind, RawMessage, RawStruct, RawValue};
use bytes::Bytes;
use std::fmt;
use std::io;
use thiserror::Error;

/// Taxonomy codes carried by wire-level exception messages.
///
/// The numeric values are fixed by the Thrift `TApplicationException`
/// contract and must round-trip through [`ApplicationErrorKind::code`] and
/// [`ApplicationErrorKind::from_code`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationErrorKind {
    /// The error type reported by the peer is unknown.
    Unknown,
    /// The method requested by the client is unknown to the server.
    UnknownMethod,
    /// The message kind does not fit the exchange (e.g. CALL to a oneway
    /// method, or a non-CALL message arriving at a server).
    InvalidMessageType,
    /// The method name in a reply does not match the request.
    WrongMethodName,
    /// A reply carried a sequence id the client never issued.
    BadSequenceId,
    /// A reply carried neither a result nor a declared exception.
    MissingResult,
    /// The handler failed with an error outside its declared contract.
    InternalError,
    /// Malformed bytes: bad lengths, unknown tags, truncated messages.
    ProtocolError,
    /// An unsupported transform was requested.
    InvalidTransform,
    /// The message header used an unsupported protocol or version.
    InvalidProtocol,
    /// The client type is not supported by this server.
    UnsupportedClientType,
}

impl ApplicationErrorKind {
    /// Returns the wire code for this kind.
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::UnknownMethod => 1,
            Self::InvalidMessageType => 2,
            Self::WrongMethodName => 3,
            Self::BadSequenceId => 4,
            Self::MissingResult => 5,
            Self::InternalError => 6,
            Self::ProtocolError => 7,
            Self::InvalidTransform => 8,
            Self::InvalidProtocol => 9,
            Self::UnsupportedClientType => 10,
        }
    }

    /// Maps a wire code back to a kind, falling back to [`Self::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            8 => Self::InvalidTransform,
            9 => Self::InvalidProtocol,
            10 => Self::UnsupportedClientType,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApplicationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "unknown error",
            Self::UnknownMethod => "unknown method",
            Self::InvalidMessageType => "invalid message type",
            Self::WrongMethodName => "wrong method name",
            Self::BadSequenceId => "bad sequence id",
            Self::MissingResult => "missing result",
            Self::InternalError => "internal error",
            Self::ProtocolError => "protocol error",
            Self::InvalidTransform => "invalid transform",
            Self::InvalidProtocol => "invalid protocol",
            Self::UnsupportedClientType => "unsupported client type",
        };
        f.write_str(text)
    }
}

/// Framework-level failure carried on the wire as an EXCEPTION message.
///
/// Application errors always pair a [`ApplicationErrorKind`] taxonomy code
/// with human-readable text. They cover protocol violations, dispatch
/// failures, and transport closure as seen by a pending call; declared
/// exceptions never use this type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct ApplicationError {
    /// Taxonomy code for this error.
    pub kind: ApplicationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Field id of the message text in a `TApplicationException` struct.
const EXCEPTION_MESSAGE_FIELD: i16 = 1;
/// Field id of the taxonomy code in a `TApplicationException` struct.
const EXCEPTION_TYPE_FIELD: i16 = 2;

impl ApplicationError {
    /// Creates a new application error.
    pub fn new(kind: ApplicationErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Creates a protocol error, the kind used for malformed bytes.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ApplicationErrorKind::ProtocolError, message)
    }

    /// The error every pending call is rejected with when its connection
    /// goes away.
    pub fn transport_closed() -> Self {
        Self::new(ApplicationErrorKind::ProtocolError, "underlying transport closed")
    }

    /// Builds the EXCEPTION wire message for this error.
    ///
    /// The body is a `TApplicationException` struct: field 1 carries the
    /// message text as a binary string, field 2 the taxonomy code as i32.
    pub fn to_message(&self, name: &str, seq: i32) -> RawMessage {
        let body = RawStruct::new("TApplicationException")
            .with_field(EXCEPTION_MESSAGE_FIELD, RawValue::Binary(Bytes::copy_from_slice(self.message.as_bytes())))
            .with_field(EXCEPTION_TYPE_FIELD, RawValue::I32(self.kind.code()));
        RawMessage {
            kind: MessageKind::Exception,
            seq,
            name: name.to_owned(),
            body,
        }
    }

    /// Rebuilds an application error from a received EXCEPTION message.
    ///
    /// Missing or malformed fields degrade to [`ApplicationErrorKind::Unknown`]
    /// and an empty message rather than failing: the peer already reported
    /// an error, and that report must reach the caller.
    pub fn from_message(message: &RawMessage) -> Self {
        let mut kind = ApplicationErrorKind::Unknown;
        let mut text = String::new();
        for field in &message.body.fields {
            match (field.id, &field.value) {
                (EXCEPTION_MESSAGE_FIELD, RawValue::Binary(bytes)) => {
                    text = String::from_utf8_lossy(bytes).into_owned();
                }
                (EXCEPTION_TYPE_FIELD, RawValue::I32(code)) => {
                    kind = ApplicationErrorKind::from_code(*code);
                }
                _ => {}
            }
        }
        Self { kind, message: text }
    }
}

/// Errors in the underlying byte transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the remote endpoint.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The address that failed to connect.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to bind a listening socket.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address that could not be bound.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The transport is closed.
    #[error("transport is closed")]
    Closed,

    /// The transport was configured with invalid parameters.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error.
        reason: String,
    },

    /// An I/O error occurred during a read or write.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}

/// Errors raised while registering or resolving services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A service with this name was already routed on the server.
    #[error("service {name} already registered")]
    ServiceRegistered {
        /// The conflicting service name.
        name: String,
    },

    /// A client re-resolved a service name with a different descriptor.
    #[error("service {name} already resolved with a different descriptor")]
    ServiceRedefined {
        /// The conflicting service name.
        name: String,
    },

    /// The method table is missing a method the descriptor declares.
    #[error("service {service} has no handler for method {method}")]
    MissingMethod {
        /// The service being registered.
        service: String,
        /// The declared method without a handler.
        method: String,
    },
}

/// Top-level error type composing the three layers.
#[derive(Debug, Error)]
pub enum Error {
    /// A transport-layer error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An application-layer error.
    #[error("application error: {0}")]
    Application(#[from] ApplicationError),

    /// A registration error.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),
}

impl Error {
    /// Returns `true` if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}
