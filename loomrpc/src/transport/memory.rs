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

//! In-memory transport for tests and benchmarks.
//!
//! Each `connect` creates a fresh [`tokio::io::duplex`] pair and queues
//! the peer end for the bound listener, so client and server exercise the
//! exact code paths used over real sockets without a network stack.

use crate::error::TransportError;
use crate::transport::{IoStream, Listener, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default per-direction buffer size for in-memory connections.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// In-memory transport. Clones share the same logical endpoint.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

struct Inner {
    accept_tx: mpsc::UnboundedSender<IoStream>,
    accept_rx: Mutex<Option<mpsc::UnboundedReceiver<IoStream>>>,
    buffer: usize,
}

impl MemoryTransport {
    /// Creates a new in-memory endpoint.
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER_SIZE)
    }

    /// Creates an endpoint with a specific per-direction buffer size,
    /// useful for exercising backpressure.
    pub fn with_buffer(buffer: usize) -> Self {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                accept_tx,
                accept_rx: Mutex::new(Some(accept_rx)),
                buffer,
            }),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<IoStream, TransportError> {
        let (local, remote) = tokio::io::duplex(self.inner.buffer);
        self.inner
            .accept_tx
            .send(Box::new(remote))
            .map_err(|_| TransportError::ConnectionFailed {
                address: "memory".to_owned(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "listener closed"),
            })?;
        Ok(Box::new(local))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, TransportError> {
        let receiver = self.inner.accept_rx.lock().take().ok_or_else(|| {
            TransportError::InvalidConfiguration {
                reason: "memory transport is already bound".to_owned(),
            }
        })?;
        Ok(Box::new(MemoryListener { receiver }))
    }
}

struct MemoryListener {
    receiver: mpsc::UnboundedReceiver<IoStream>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&mut self) -> Result<IoStream, TransportError> {
        self.receiver.recv().await.ok_or(TransportError::Closed)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}
