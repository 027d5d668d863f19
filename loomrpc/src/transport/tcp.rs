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

//! TCP stream transport.

use crate::error::TransportError;
use crate::transport::{IoStream, Listener, Transport};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// TCP transport for both connecting and listening.
///
/// `TCP_NODELAY` is enabled by default: RPC traffic is dominated by small
/// request/reply messages that should not wait on Nagle's algorithm.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
    nodelay: bool,
}

impl TcpTransport {
    /// Creates a transport for the given `host:port` address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), nodelay: true }
    }

    /// Overrides the `TCP_NODELAY` setting applied to every stream.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// The configured endpoint address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<IoStream, TransportError> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|source| {
            TransportError::ConnectionFailed { address: self.addr.clone(), source }
        })?;
        stream.set_nodelay(self.nodelay).map_err(|source| TransportError::Io { source })?;
        debug!(addr = %self.addr, "tcp connected");
        Ok(Box::new(stream))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, TransportError> {
        let listener = TcpListener::bind(&self.addr).await.map_err(|source| {
            TransportError::BindFailed { address: self.addr.clone(), source }
        })?;
        let local_addr = listener.local_addr().ok();
        info!(addr = ?local_addr, "tcp listening");
        Ok(Box::new(TcpStreamListener { listener, local_addr, nodelay: self.nodelay }))
    }
}

struct TcpStreamListener {
    listener: TcpListener,
    local_addr: Option<SocketAddr>,
    nodelay: bool,
}

#[async_trait]
impl Listener for TcpStreamListener {
    async fn accept(&mut self) -> Result<IoStream, TransportError> {
        let (stream, peer) = self.listener.accept().await.map_err(|source| TransportError::Io { source })?;
        stream.set_nodelay(self.nodelay).map_err(|source| TransportError::Io { source })?;
        debug!(%peer, "tcp connection accepted");
        Ok(Box::new(stream))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
