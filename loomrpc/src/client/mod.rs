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

//! The RPC client engine.
//!
//! One [`Client`] owns one logical connection and multiplexes any number
//! of named services over it. A background engine task drives the
//! connection lifecycle: it starts connecting as soon as the client is
//! built, matches replies to pending calls by sequence id, and reconnects
//! with backoff after failures. Calls issued while the connection is down
//! are queued and written once it becomes writable; only a definitive
//! close rejects them.

mod backoff;

pub use backoff::ReconnectPolicy;

use crate::error::{ApplicationError, ApplicationErrorKind, RegistrationError};
use crate::protocol::{BinaryProtocol, MessageKind, RawMessage, RawStruct};
use crate::service::ServiceSpec;
use crate::transport::{Connection, TcpTransport, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Largest sequence id issued before the counter wraps.
const SEQ_MAX: i32 = i16::MAX as i32;

/// Client configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientConfig {
    /// The wire protocol.
    pub protocol: BinaryProtocol,
    /// The reconnect delay schedule.
    pub reconnect: ReconnectPolicy,
}

type CallReply = Result<RawStruct, ApplicationError>;

/// Pending calls awaiting replies, keyed by sequence id.
struct Pending {
    calls: Mutex<HashMap<i32, oneshot::Sender<CallReply>>>,
}

impl Pending {
    fn new() -> Self {
        Self { calls: Mutex::new(HashMap::new()) }
    }

    fn register(&self, seq: i32) -> oneshot::Receiver<CallReply> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().insert(seq, tx);
        rx
    }

    fn take(&self, seq: i32) -> Option<oneshot::Sender<CallReply>> {
        self.calls.lock().remove(&seq)
    }

    fn contains(&self, seq: i32) -> bool {
        self.calls.lock().contains_key(&seq)
    }

    /// Rejects every pending call exactly once and clears the map.
    fn reject_all(&self, error: &ApplicationError) {
        let drained: Vec<_> = self.calls.lock().drain().collect();
        for (_, tx) in drained {
            let _ = tx.send(Err(error.clone()));
        }
    }
}

struct ClientShared {
    pending: Pending,
    registry: Mutex<HashMap<String, &'static ServiceSpec>>,
    seq: Mutex<i32>,
    shutdown: watch::Sender<bool>,
}

impl ClientShared {
    /// Allocates the next sequence id.
    ///
    /// Ids walk 1..=32767 and wrap; an id still pending is skipped so it
    /// is never reused while its previous use is in flight.
    fn next_seq(&self) -> i32 {
        let mut seq = self.seq.lock();
        loop {
            let mut next = *seq + 1;
            if next > SEQ_MAX {
                next = 1;
            }
            *seq = next;
            if !self.pending.contains(next) {
                return next;
            }
        }
    }

    /// Routes an inbound message to its pending call.
    fn complete(&self, message: RawMessage) {
        let Some(tx) = self.pending.take(message.seq) else {
            // Stale or duplicate reply; the call may have been rejected
            // on a previous disconnect.
            trace!(seq = message.seq, "dropping reply with no pending call");
            return;
        };
        let reply = match message.kind {
            MessageKind::Reply => Ok(message.body),
            MessageKind::Exception => Err(ApplicationError::from_message(&message)),
            other => Err(ApplicationError::new(
                ApplicationErrorKind::InvalidMessageType,
                format!("invalid message kind {}", other as u8),
            )),
        };
        let _ = tx.send(reply);
    }
}

struct Outgoing {
    message: RawMessage,
    /// Completion signal for oneway sends; CALL messages resolve through
    /// the pending map instead.
    done: Option<oneshot::Sender<Result<(), ApplicationError>>>,
}

/// An RPC client multiplexing named services over one connection.
///
/// The client connects in the background as soon as it is constructed.
/// Dropping the client (and every [`ServiceHandle`]) stops the engine;
/// [`Client::close`] does the same explicitly and waits for it.
pub struct Client {
    shared: Arc<ClientShared>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    engine: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Creates a client over the given transport and starts connecting.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new<T: Transport>(transport: T, config: ClientConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(ClientShared {
            pending: Pending::new(),
            registry: Mutex::new(HashMap::new()),
            seq: Mutex::new(0),
            shutdown: shutdown_tx,
        });
        let engine = tokio::spawn(run_engine(
            Arc::clone(&shared),
            Arc::new(transport),
            config,
            outgoing_rx,
            shutdown_rx,
        ));
        Self { shared, outgoing: outgoing_tx, engine: Mutex::new(Some(engine)) }
    }

    /// Connects to a TCP endpoint with the default configuration.
    pub fn connect(host: &str, port: u16) -> Self {
        Self::new(TcpTransport::new(format!("{host}:{port}")), ClientConfig::default())
    }

    /// Resolves a service handle by name.
    ///
    /// The first resolution binds the name to the descriptor's identity;
    /// resolving the same name again with a *different* descriptor value
    /// is an error, while the same descriptor returns an equivalent
    /// handle.
    pub fn service(
        &self,
        name: impl Into<String>,
        spec: &'static ServiceSpec,
    ) -> Result<ServiceHandle, RegistrationError> {
        let name = name.into();
        let mut registry = self.shared.registry.lock();
        match registry.get(name.as_str()) {
            Some(existing) if std::ptr::eq(*existing, spec) => {}
            Some(_) => return Err(RegistrationError::ServiceRedefined { name }),
            None => {
                registry.insert(name.clone(), spec);
            }
        }
        Ok(ServiceHandle {
            shared: Arc::clone(&self.shared),
            outgoing: self.outgoing.clone(),
            name,
            spec,
        })
    }

    /// Stops the engine, rejects outstanding calls, and waits for a
    /// graceful disconnect.
    pub async fn close(&self) {
        let _ = self.shared.shutdown.send(true);
        let engine = self.engine.lock().take();
        if let Some(engine) = engine {
            let _ = engine.await;
        }
    }
}

/// A per-service view of a [`Client`].
///
/// Wire method names are namespaced as `"<service>:<method>"`. Generated
/// typed wrappers layer over [`ServiceHandle::call`] and
/// [`ServiceHandle::oneway`].
#[derive(Clone)]
pub struct ServiceHandle {
    shared: Arc<ClientShared>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    name: String,
    spec: &'static ServiceSpec,
}

impl ServiceHandle {
    /// The name this service is multiplexed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issues a CALL and awaits its reply result struct.
    ///
    /// The returned struct is the method's result encoding; use
    /// [`split_result`](crate::service::split_result) to separate success
    /// from declared exceptions.
    pub async fn call(&self, method: &str, args: RawStruct) -> Result<RawStruct, ApplicationError> {
        let spec = self.spec.method(method).ok_or_else(|| {
            ApplicationError::new(
                ApplicationErrorKind::UnknownMethod,
                format!("unknown method {}:{method}", self.name),
            )
        })?;
        if spec.oneway {
            return Err(ApplicationError::new(
                ApplicationErrorKind::InvalidMessageType,
                format!("method {}:{method} is a oneway method", self.name),
            ));
        }

        let seq = self.shared.next_seq();
        let reply = self.shared.pending.register(seq);
        let message = RawMessage {
            kind: MessageKind::Call,
            seq,
            name: format!("{}:{method}", self.name),
            body: args,
        };
        if self.outgoing.send(Outgoing { message, done: None }).is_err() {
            self.shared.pending.take(seq);
            return Err(ApplicationError::transport_closed());
        }
        match reply.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApplicationError::transport_closed()),
        }
    }

    /// Issues a ONEWAY message.
    ///
    /// Resolves as soon as the message has been written to the transport;
    /// the server never acknowledges a oneway call, not even on failure.
    pub async fn oneway(&self, method: &str, args: RawStruct) -> Result<(), ApplicationError> {
        let spec = self.spec.method(method).ok_or_else(|| {
            ApplicationError::new(
                ApplicationErrorKind::UnknownMethod,
                format!("unknown method {}:{method}", self.name),
            )
        })?;
        if !spec.oneway {
            return Err(ApplicationError::new(
                ApplicationErrorKind::InvalidMessageType,
                format!("method {}:{method} is not a oneway method", self.name),
            ));
        }

        let (done_tx, done_rx) = oneshot::channel();
        let message = RawMessage {
            kind: MessageKind::Oneway,
            seq: 0,
            name: format!("{}:{method}", self.name),
            body: args,
        };
        if self.outgoing.send(Outgoing { message, done: Some(done_tx) }).is_err() {
            return Err(ApplicationError::transport_closed());
        }
        match done_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApplicationError::transport_closed()),
        }
    }
}

/// The connection lifecycle task.
async fn run_engine(
    shared: Arc<ClientShared>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delay: Option<Duration> = None;
    'reconnect: loop {
        if *shutdown.borrow() {
            break;
        }
        if let Some(wait) = delay {
            debug!(delay = ?wait, "waiting before reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break 'reconnect,
            }
        }

        let io = tokio::select! {
            connected = transport.connect() => match connected {
                Ok(io) => io,
                Err(error) => {
                    warn!(%error, "connection attempt failed");
                    delay = Some(config.reconnect.next(delay));
                    continue 'reconnect;
                }
            },
            _ = shutdown.changed() => break 'reconnect,
        };
        debug!("transport connected");
        delay = None;

        let conn = Connection::new(io, config.protocol);
        let sender = conn.sender();
        let mut reader = tokio::spawn(read_loop(conn, Arc::clone(&shared)));

        let clean = loop {
            tokio::select! {
                _ = shutdown.changed() => break true,
                _ = &mut reader => break false,
                queued = outgoing.recv() => {
                    // Every handle gone means the client was dropped.
                    let Some(out) = queued else { break true };
                    if out.message.kind == MessageKind::Call
                        && !shared.pending.contains(out.message.seq)
                    {
                        // The call was rejected while its message sat in
                        // the queue across a disconnect; never write it.
                        trace!(seq = out.message.seq, "discarding stale queued call");
                        continue;
                    }
                    match sender.send(&out.message).await {
                        Ok(()) => {
                            if let Some(done) = out.done {
                                let _ = done.send(Ok(()));
                            }
                        }
                        Err(error) => {
                            warn!(%error, "send failed");
                            if let Some(done) = out.done {
                                let _ = done.send(Err(ApplicationError::transport_closed()));
                            }
                            break false;
                        }
                    }
                }
            }
        };

        reader.abort();
        drop(sender);
        shared.pending.reject_all(&ApplicationError::transport_closed());
        if clean {
            break 'reconnect;
        }
        delay = Some(config.reconnect.next(None));
    }
    shared.pending.reject_all(&ApplicationError::transport_closed());
}

/// Receives messages on one connection until it dies, resolving pending
/// calls as replies arrive.
async fn read_loop(mut conn: Connection, shared: Arc<ClientShared>) {
    loop {
        match conn.recv().await {
            Ok(Some(message)) => shared.complete(message),
            Ok(None) => {
                debug!("transport closed by peer");
                break;
            }
            Err(error) => {
                warn!(%error, "receive failed");
                break;
            }
        }
    }
}
