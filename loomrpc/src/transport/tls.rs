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

//! TLS stream transport layered over TCP, backed by rustls.
//!
//! Certificate and key material is the caller's concern: this transport
//! accepts pre-built `rustls` configs and only owns the socket plumbing.

use crate::error::TransportError;
use crate::transport::{IoStream, Listener, Transport};
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tracing::{debug, info};

enum Role {
    Client {
        config: Arc<rustls::ClientConfig>,
        server_name: ServerName<'static>,
    },
    Server {
        config: Arc<rustls::ServerConfig>,
    },
}

/// TLS transport for either the connecting or the listening side.
pub struct TlsTransport {
    addr: String,
    role: Role,
}

impl TlsTransport {
    /// Creates a connecting TLS transport.
    ///
    /// `server_name` is the name certificates are verified against; it
    /// defaults to the host part of `addr` when parseable.
    pub fn client(
        addr: impl Into<String>,
        config: Arc<rustls::ClientConfig>,
        server_name: impl TryInto<ServerName<'static>>,
    ) -> Result<Self, TransportError> {
        let addr = addr.into();
        let server_name = server_name.try_into().map_err(|_| TransportError::InvalidConfiguration {
            reason: "invalid TLS server name".to_owned(),
        })?;
        Ok(Self { addr, role: Role::Client { config, server_name } })
    }

    /// Creates a listening TLS transport.
    pub fn server(addr: impl Into<String>, config: Arc<rustls::ServerConfig>) -> Self {
        Self { addr: addr.into(), role: Role::Server { config } }
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn connect(&self) -> Result<IoStream, TransportError> {
        let Role::Client { config, server_name } = &self.role else {
            return Err(TransportError::InvalidConfiguration {
                reason: "server-side TLS transport cannot connect".to_owned(),
            });
        };
        let tcp = TcpStream::connect(&self.addr).await.map_err(|source| {
            TransportError::ConnectionFailed { address: self.addr.clone(), source }
        })?;
        tcp.set_nodelay(true).map_err(|source| TransportError::Io { source })?;
        let connector = TlsConnector::from(Arc::clone(config));
        let stream = connector
            .connect(server_name.clone(), tcp)
            .await
            .map_err(|source| TransportError::ConnectionFailed { address: self.addr.clone(), source })?;
        debug!(addr = %self.addr, "tls connected");
        Ok(Box::new(stream))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, TransportError> {
        let Role::Server { config } = &self.role else {
            return Err(TransportError::InvalidConfiguration {
                reason: "client-side TLS transport cannot listen".to_owned(),
            });
        };
        let listener = TcpListener::bind(&self.addr).await.map_err(|source| {
            TransportError::BindFailed { address: self.addr.clone(), source }
        })?;
        let local_addr = listener.local_addr().ok();
        info!(addr = ?local_addr, "tls listening");
        Ok(Box::new(TlsStreamListener {
            listener,
            acceptor: TlsAcceptor::from(Arc::clone(config)),
            local_addr,
        }))
    }
}

struct TlsStreamListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    local_addr: Option<SocketAddr>,
}

#[async_trait]
impl Listener for TlsStreamListener {
    async fn accept(&mut self) -> Result<IoStream, TransportError> {
        let (tcp, peer) = self.listener.accept().await.map_err(|source| TransportError::Io { source })?;
        tcp.set_nodelay(true).map_err(|source| TransportError::Io { source })?;
        let stream = self
            .acceptor
            .accept(tcp)
            .await
            .map_err(|source| TransportError::Io { source })?;
        debug!(%peer, "tls connection accepted");
        Ok(Box::new(stream))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
