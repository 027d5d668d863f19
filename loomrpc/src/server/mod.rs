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

//! The RPC server engine.
//!
//! A [`Server`] routes named services, accepts connections, and
//! dispatches every inbound call as its own task. Calls on one connection
//! run concurrently and may complete out of order; each task writes its
//! own reply, tagged with its own sequence id. Graceful shutdown stops
//! accepting immediately, stops dispatching new messages, and waits for
//! in-flight calls before closing sockets.

use crate::error::{ApplicationError, ApplicationErrorKind, RegistrationError, TransportError};
use crate::protocol::{BinaryProtocol, MessageKind, RawMessage, RawStruct};
use crate::service::{MethodFuture, MethodTable, ServiceSpec};
use crate::transport::{Connection, IoStream, Listener, MessageSender, Transport};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Capacity of the out-of-band error channel.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Server-level errors that never produce wire traffic.
///
/// ONEWAY failures and connection teardowns have no reply to carry them,
/// so they surface here (see [`Server::subscribe_errors`]) and in logs.
#[derive(Debug, Clone)]
pub enum ServerError {
    /// A oneway dispatch was rejected or its handler failed.
    Oneway {
        /// The wire method name.
        method: String,
        /// What went wrong.
        error: ApplicationError,
    },
    /// A connection was torn down after a protocol or transport error.
    Connection {
        /// Description of the failure.
        reason: String,
    },
}

#[derive(Clone)]
struct MethodRoute {
    oneway: bool,
    invoke: Arc<dyn Fn(RawStruct) -> MethodFuture + Send + Sync>,
}

#[derive(Default)]
struct RouteMap {
    services: HashSet<String>,
    methods: HashMap<String, MethodRoute>,
}

struct ServerShared {
    protocol: BinaryProtocol,
    routes: RwLock<RouteMap>,
    shutdown: watch::Sender<bool>,
    errors: broadcast::Sender<ServerError>,
}

/// An RPC server dispatching concurrent calls per connection.
pub struct Server {
    shared: Arc<ServerShared>,
    transport: Arc<dyn Transport>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    /// Creates a server over the given transport with the default
    /// protocol.
    pub fn new<T: Transport>(transport: T) -> Self {
        Self::with_protocol(transport, BinaryProtocol::default())
    }

    /// Creates a server with an explicit protocol configuration.
    pub fn with_protocol<T: Transport>(transport: T, protocol: BinaryProtocol) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(ServerShared {
                protocol,
                routes: RwLock::new(RouteMap::default()),
                shutdown,
                errors,
            }),
            transport: Arc::new(transport),
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Registers a service implementation under `name`.
    ///
    /// Every method the descriptor declares must have a table entry;
    /// table entries the descriptor does not declare are ignored.
    /// Re-registering a name is an error. Methods are stored flattened as
    /// `"<service>:<method>"`.
    ///
    /// A handler that panics aborts its call task without producing a
    /// reply; return an [`ApplicationError`] for failures that should
    /// reach the caller.
    pub fn route(
        &self,
        name: impl Into<String>,
        spec: &'static ServiceSpec,
        table: MethodTable,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        let mut routes = self.shared.routes.write();
        if routes.services.contains(&name) {
            return Err(RegistrationError::ServiceRegistered { name });
        }
        let mut handlers = table.into_methods();
        let mut staged = Vec::with_capacity(spec.methods.len());
        for method in spec.methods {
            let Some(handler) = handlers.remove(method.name) else {
                return Err(RegistrationError::MissingMethod {
                    service: name,
                    method: method.name.to_owned(),
                });
            };
            staged.push((
                format!("{name}:{}", method.name),
                MethodRoute { oneway: method.oneway, invoke: Arc::from(handler) },
            ));
        }
        for (key, route) in staged {
            routes.methods.insert(key, route);
        }
        routes.services.insert(name);
        Ok(())
    }

    /// Binds the transport and starts accepting connections.
    pub async fn listen(&self) -> Result<(), TransportError> {
        if self.accept_task.lock().is_some() {
            return Err(TransportError::InvalidConfiguration {
                reason: "server is already listening".to_owned(),
            });
        }
        let listener = self.transport.bind().await?;
        *self.local_addr.lock() = listener.local_addr();
        info!(addr = ?listener.local_addr(), "server listening");
        let task = tokio::spawn(accept_loop(Arc::clone(&self.shared), listener));
        let mut accept_task = self.accept_task.lock();
        if accept_task.is_some() {
            task.abort();
            return Err(TransportError::InvalidConfiguration {
                reason: "server is already listening".to_owned(),
            });
        }
        *accept_task = Some(task);
        Ok(())
    }

    /// The bound local address, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Subscribes to out-of-band server errors.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ServerError> {
        self.shared.errors.subscribe()
    }

    /// Gracefully shuts the server down.
    ///
    /// Stops accepting new connections immediately, lets every in-flight
    /// call finish and write its reply, then closes the sockets. Resolves
    /// once every connection has drained.
    pub async fn close(&self) {
        let _ = self.shared.shutdown.send(true);
        let accept_task = self.accept_task.lock().take();
        if let Some(task) = accept_task {
            let _ = task.await;
        }
    }
}

/// Accepts connections until shutdown, then waits for them to drain.
async fn accept_loop(shared: Arc<ServerShared>, mut listener: Box<dyn Listener>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut connections = JoinSet::new();
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = shutdown.changed() => {}
            accepted = listener.accept() => match accepted {
                Ok(io) => {
                    connections.spawn(serve_connection(Arc::clone(&shared), io));
                }
                Err(error) => {
                    warn!(%error, "accept failed, stopping listener");
                    break;
                }
            }
        }
    }
    // Stop accepting at once; existing connections keep running.
    drop(listener);
    if !connections.is_empty() {
        debug!(connections = connections.len(), "draining connections");
    }
    while connections.join_next().await.is_some() {}
}

/// Reads and dispatches one connection until it closes or drains.
async fn serve_connection(shared: Arc<ServerShared>, io: IoStream) {
    let mut conn = Connection::new(io, shared.protocol);
    let sender = conn.sender();
    let mut shutdown = shared.shutdown.subscribe();
    let mut calls = JoinSet::new();

    loop {
        if *shutdown.borrow() {
            debug!("draining connection");
            break;
        }
        tokio::select! {
            _ = shutdown.changed() => {}
            received = conn.recv() => match received {
                Ok(Some(message)) => dispatch(&shared, &sender, &mut calls, message),
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "tearing down connection after receive error");
                    let _ = shared.errors.send(ServerError::Connection { reason: error.to_string() });
                    break;
                }
            }
        }
    }

    // The in-flight set gates the socket: every running call finishes and
    // writes its reply before the connection drops.
    while calls.join_next().await.is_some() {}
}

/// Validates one inbound message and spawns its call task.
fn dispatch(
    shared: &Arc<ServerShared>,
    sender: &MessageSender<BinaryProtocol>,
    calls: &mut JoinSet<()>,
    message: RawMessage,
) {
    let RawMessage { kind, seq, name, body } = message;

    if !matches!(kind, MessageKind::Call | MessageKind::Oneway) {
        let error = ApplicationError::new(
            ApplicationErrorKind::InvalidMessageType,
            format!("invalid message kind {}", kind as u8),
        );
        spawn_exception_reply(calls, sender, error, name, seq);
        return;
    }
    let oneway = kind == MessageKind::Oneway;

    let route = shared.routes.read().methods.get(&name).cloned();
    let Some(route) = route else {
        let error =
            ApplicationError::new(ApplicationErrorKind::UnknownMethod, format!("unknown method {name}"));
        if oneway {
            warn!(method = %name, "dropping oneway call to unknown method");
            let _ = shared.errors.send(ServerError::Oneway { method: name, error });
        } else {
            spawn_exception_reply(calls, sender, error, name, seq);
        }
        return;
    };

    if !oneway && route.oneway {
        let error = ApplicationError::new(
            ApplicationErrorKind::InvalidMessageType,
            format!("method {name} is a oneway method"),
        );
        spawn_exception_reply(calls, sender, error, name, seq);
        return;
    }
    if oneway && !route.oneway {
        let error = ApplicationError::new(
            ApplicationErrorKind::InvalidMessageType,
            format!("method {name} is not a oneway method"),
        );
        warn!(method = %name, "dropping oneway call to a call method");
        let _ = shared.errors.send(ServerError::Oneway { method: name, error });
        return;
    }

    let sender = sender.clone();
    let errors = shared.errors.clone();
    let invoke = Arc::clone(&route.invoke);
    calls.spawn(async move {
        match (*invoke)(body).await {
            Ok(result) => {
                if oneway {
                    return;
                }
                let reply = RawMessage { kind: MessageKind::Reply, seq, name, body: result };
                if let Err(error) = sender.send(&reply).await {
                    warn!(%error, "failed to write reply");
                }
            }
            Err(error) => {
                if oneway {
                    warn!(method = %name, %error, "oneway handler failed");
                    let _ = errors.send(ServerError::Oneway { method: name, error });
                    return;
                }
                let reply = error.to_message(&name, seq);
                if let Err(error) = sender.send(&reply).await {
                    warn!(%error, "failed to write exception reply");
                }
            }
        }
    });
}

/// Queues an EXCEPTION reply as its own in-flight task.
fn spawn_exception_reply(
    calls: &mut JoinSet<()>,
    sender: &MessageSender<BinaryProtocol>,
    error: ApplicationError,
    name: String,
    seq: i32,
) {
    let sender = sender.clone();
    calls.spawn(async move {
        let reply = error.to_message(&name, seq);
        if let Err(error) = sender.send(&reply).await {
            warn!(%error, "failed to write exception reply");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{encode_result, MethodSpec};
    use crate::transport::MemoryTransport;
    use std::convert::Infallible;

    static PAIR: ServiceSpec = ServiceSpec {
        name: "Pair",
        methods: &[
            MethodSpec { name: "first", oneway: false },
            MethodSpec { name: "second", oneway: true },
        ],
    };

    fn full_table() -> MethodTable {
        MethodTable::new()
            .handle("first", |_args| async { Ok(encode_result::<Infallible>(Ok(None))) })
            .handle("second", |_args| async { Ok(encode_result::<Infallible>(Ok(None))) })
    }

    #[tokio::test]
    async fn test_route_validates_coverage() {
        let server = Server::new(MemoryTransport::new());
        let incomplete = MethodTable::new()
            .handle("first", |_args| async { Ok(encode_result::<Infallible>(Ok(None))) });
        assert!(matches!(
            server.route("Pair", &PAIR, incomplete),
            Err(RegistrationError::MissingMethod { .. })
        ));
        // The failed registration must not claim the name.
        server.route("Pair", &PAIR, full_table()).unwrap();
    }

    #[tokio::test]
    async fn test_route_rejects_duplicate_name() {
        let server = Server::new(MemoryTransport::new());
        server.route("Pair", &PAIR, full_table()).unwrap();
        assert!(matches!(
            server.route("Pair", &PAIR, full_table()),
            Err(RegistrationError::ServiceRegistered { .. })
        ));
        // A second name for the same descriptor is fine.
        server.route("Pair2", &PAIR, full_table()).unwrap();
    }

    #[tokio::test]
    async fn test_extra_table_entries_ignored() {
        let server = Server::new(MemoryTransport::new());
        let table = full_table()
            .handle("undeclared", |_args| async { Ok(encode_result::<Infallible>(Ok(None))) });
        server.route("Pair", &PAIR, table).unwrap();
        assert!(!server.shared.routes.read().methods.contains_key("Pair:undeclared"));
        assert!(server.shared.routes.read().methods.contains_key("Pair:first"));
    }

    #[tokio::test]
    async fn test_double_listen_rejected() {
        let server = Server::new(MemoryTransport::new());
        server.listen().await.unwrap();
        assert!(matches!(
            server.listen().await,
            Err(TransportError::InvalidConfiguration { .. })
        ));
        server.close().await;
    }
}
