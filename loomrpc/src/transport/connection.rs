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

//! A protocol-layered duplex connection.
//!
//! [`Connection`] owns the read half of a stream and decodes inbound
//! messages; [`MessageSender`] is a cloneable handle to the write half
//! that encodes and flushes one message at a time under a lock, so
//! concurrent senders never interleave bytes mid-message.

use crate::error::{Error, TransportError};
use crate::protocol::{BinaryProtocol, Protocol, RawMessage};
use crate::transport::{FrameReader, FrameWriter, IoStream};
use std::sync::Arc;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::Mutex;

/// One protocol-layered connection.
pub struct Connection<P: Protocol = BinaryProtocol> {
    reader: FrameReader<ReadHalf<IoStream>>,
    protocol: Arc<P>,
    sender: MessageSender<P>,
}

impl<P: Protocol> Connection<P> {
    /// Layers a protocol over a duplex stream.
    pub fn new(io: IoStream, protocol: P) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        let protocol = Arc::new(protocol);
        let sender = MessageSender {
            inner: Arc::new(SenderInner {
                protocol: Arc::clone(&protocol),
                writer: Mutex::new(FrameWriter::new(write_half)),
            }),
        };
        Self { reader: FrameReader::new(read_half), protocol, sender }
    }

    /// Returns a cloneable handle for sending messages on this connection.
    pub fn sender(&self) -> MessageSender<P> {
        self.sender.clone()
    }

    /// Receives the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly at a
    /// message boundary. A stream that ends mid-message, or bytes that
    /// violate the protocol, are errors fatal to this connection.
    pub async fn recv(&mut self) -> Result<Option<RawMessage>, Error> {
        if self.reader.at_eof().await.map_err(|source| TransportError::Io { source })? {
            return Ok(None);
        }
        self.protocol.decode(&mut self.reader).await.map(Some)
    }
}

/// Cloneable sending handle for one connection.
///
/// Sends are atomic per message: the encoder and flush run under a lock,
/// and callers await the sink's backpressure through that flush.
pub struct MessageSender<P: Protocol> {
    inner: Arc<SenderInner<P>>,
}

struct SenderInner<P: Protocol> {
    protocol: Arc<P>,
    writer: Mutex<FrameWriter<WriteHalf<IoStream>>>,
}

impl<P: Protocol> Clone for MessageSender<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P: Protocol> MessageSender<P> {
    /// Encodes and flushes one message.
    pub async fn send(&self, message: &RawMessage) -> Result<(), Error> {
        let mut writer = self.inner.writer.lock().await;
        self.inner.protocol.encode(&mut writer, message)?;
        writer
            .flush()
            .await
            .map_err(|source| Error::from(TransportError::Io { source }))
    }
}
