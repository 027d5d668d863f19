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

//! Streaming transports and the buffering that adapts them to the codec.
//!
//! A [`Transport`] produces duplex byte streams, either by connecting out
//! or by accepting via a [`Listener`]. [`Connection`] layers a
//! [`Protocol`](crate::protocol::Protocol) over one stream, turning it
//! into discrete inbound and outbound [`RawMessage`](crate::RawMessage)s.
//! [`FrameReader`] and [`FrameWriter`] own the buffering in between.

mod connection;
mod memory;
mod reader;
mod tcp;
#[cfg(feature = "tls")]
mod tls;
mod writer;

pub use connection::{Connection, MessageSender};
pub use memory::MemoryTransport;
pub use reader::{FrameReader, COMPACT_THRESHOLD, READ_BUFFER_INIT};
pub use tcp::TcpTransport;
#[cfg(feature = "tls")]
pub use tls::TlsTransport;
pub use writer::{FrameWriter, SCRATCH_CAPACITY};

use crate::error::TransportError;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

/// A duplex byte stream usable as a connection.
///
/// Blanket-implemented for every `AsyncRead + AsyncWrite` stream, so TCP
/// streams, TLS streams, and in-memory duplexes all qualify.
pub trait StreamIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> StreamIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A boxed duplex byte stream.
pub type IoStream = Box<dyn StreamIo>;

/// Produces duplex byte streams, outbound or inbound.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens one connection to the configured endpoint.
    async fn connect(&self) -> Result<IoStream, TransportError>;

    /// Binds the configured endpoint for incoming connections.
    async fn bind(&self) -> Result<Box<dyn Listener>, TransportError>;
}

/// Accepts incoming connections.
///
/// Dropping a listener stops accepting without touching connections it
/// already handed out.
#[async_trait]
pub trait Listener: Send {
    /// Waits for the next incoming connection.
    async fn accept(&mut self) -> Result<IoStream, TransportError>;

    /// The bound local address, if the transport has one.
    fn local_addr(&self) -> Option<SocketAddr>;
}
