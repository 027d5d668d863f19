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

//! Hand-written stand-in for generated service glue: a small Calculator
//! service with a declared exception, a slow method, and a oneway method.

#![allow(dead_code)]

use bytes::Bytes;
use loomrpc::service::{encode_result, split_result, ReplyBody};
use loomrpc::{
    ApplicationError, ApplicationErrorKind, Client, ClientConfig, DeclaredException, MethodSpec,
    MethodTable, RawStruct, RawValue, ReconnectPolicy, Server, ServiceHandle, ServiceSpec,
    MemoryTransport,
};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// The Calculator service descriptor, as a generator would emit it.
pub static CALCULATOR: ServiceSpec = ServiceSpec {
    name: "Calculator",
    methods: &[
        MethodSpec { name: "add", oneway: false },
        MethodSpec { name: "div", oneway: false },
        MethodSpec { name: "echo_after", oneway: false },
        MethodSpec { name: "boom", oneway: false },
        MethodSpec { name: "notify", oneway: true },
    ],
};

/// Declared exception of `div`, slot 1 in its result struct.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("divide by zero: {message}")]
pub struct DivByZero {
    pub message: String,
}

impl DeclaredException for DivByZero {
    fn slot(&self) -> i16 {
        1
    }

    fn to_raw(&self) -> RawStruct {
        RawStruct::new("DivByZero")
            .with_field(1, RawValue::Binary(Bytes::copy_from_slice(self.message.as_bytes())))
    }

    fn from_raw(slot: i16, raw: &RawStruct) -> Option<Self> {
        if slot != 1 {
            return None;
        }
        let message = match raw.field(1) {
            Some(RawValue::Binary(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        };
        Some(Self { message })
    }
}

/// Server-side state observed by tests.
#[derive(Default)]
pub struct CalcState {
    pub notes: Mutex<Vec<String>>,
}

fn i32_field(args: &RawStruct, id: i16) -> Result<i32, ApplicationError> {
    match args.field(id) {
        Some(RawValue::I32(value)) => Ok(*value),
        _ => Err(ApplicationError::protocol(format!("missing i32 argument {id}"))),
    }
}

fn i64_field(args: &RawStruct, id: i16) -> Result<i64, ApplicationError> {
    match args.field(id) {
        Some(RawValue::I64(value)) => Ok(*value),
        _ => Err(ApplicationError::protocol(format!("missing i64 argument {id}"))),
    }
}

fn str_field(args: &RawStruct, id: i16) -> Result<String, ApplicationError> {
    match args.field(id) {
        Some(RawValue::Binary(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(ApplicationError::protocol(format!("missing string argument {id}"))),
    }
}

/// Builds the Calculator method table over a handler state, the way
/// generated glue adapts a handler implementation.
pub fn calculator_table(state: Arc<CalcState>) -> MethodTable {
    MethodTable::new()
        .handle("add", |args| async move {
            let a = i32_field(&args, 1)?;
            let b = i32_field(&args, 2)?;
            Ok(encode_result::<Infallible>(Ok(Some(RawValue::I32(a.wrapping_add(b))))))
        })
        .handle("div", |args| async move {
            let a = i32_field(&args, 1)?;
            let b = i32_field(&args, 2)?;
            if b == 0 {
                return Ok(encode_result(Err(DivByZero { message: format!("{a}/0") })));
            }
            Ok(encode_result::<DivByZero>(Ok(Some(RawValue::I32(a / b)))))
        })
        .handle("echo_after", |args| async move {
            let value = i32_field(&args, 1)?;
            let delay_ms = i64_field(&args, 2)?;
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
            Ok(encode_result::<Infallible>(Ok(Some(RawValue::I32(value)))))
        })
        .handle("boom", |_args| async {
            Err(ApplicationError::new(ApplicationErrorKind::InternalError, "handler exploded"))
        })
        .handle("notify", {
            let state = Arc::clone(&state);
            move |args| {
                let state = Arc::clone(&state);
                async move {
                    let message = str_field(&args, 1)?;
                    if message == "boom" {
                        return Err(ApplicationError::new(
                            ApplicationErrorKind::InternalError,
                            "rejected note",
                        ));
                    }
                    state.notes.lock().unwrap().push(message);
                    Ok(encode_result::<Infallible>(Ok(None)))
                }
            }
        })
}

/// Typed Calculator client, the way generated wrappers layer over a
/// [`ServiceHandle`].
#[derive(Clone)]
pub struct CalcClient {
    pub handle: ServiceHandle,
}

impl CalcClient {
    pub async fn add(&self, a: i32, b: i32) -> Result<i32, ApplicationError> {
        let args = RawStruct::new("add_args")
            .with_field(1, RawValue::I32(a))
            .with_field(2, RawValue::I32(b));
        let reply = self.handle.call("add", args).await?;
        expect_i32::<Infallible>(reply).map(|value| value.unwrap_or_else(|never| match never {}))
    }

    pub async fn div(&self, a: i32, b: i32) -> Result<Result<i32, DivByZero>, ApplicationError> {
        let args = RawStruct::new("div_args")
            .with_field(1, RawValue::I32(a))
            .with_field(2, RawValue::I32(b));
        let reply = self.handle.call("div", args).await?;
        expect_i32::<DivByZero>(reply)
    }

    pub async fn echo_after(&self, value: i32, delay_ms: i64) -> Result<i32, ApplicationError> {
        let args = RawStruct::new("echo_after_args")
            .with_field(1, RawValue::I32(value))
            .with_field(2, RawValue::I64(delay_ms));
        let reply = self.handle.call("echo_after", args).await?;
        expect_i32::<Infallible>(reply).map(|value| value.unwrap_or_else(|never| match never {}))
    }

    pub async fn boom(&self) -> Result<i32, ApplicationError> {
        let reply = self.handle.call("boom", RawStruct::new("boom_args")).await?;
        expect_i32::<Infallible>(reply).map(|value| value.unwrap_or_else(|never| match never {}))
    }

    pub async fn notify(&self, message: &str) -> Result<(), ApplicationError> {
        let args = RawStruct::new("notify_args")
            .with_field(1, RawValue::Binary(Bytes::copy_from_slice(message.as_bytes())));
        self.handle.oneway("notify", args).await
    }
}

fn expect_i32<E: DeclaredException>(reply: RawStruct) -> Result<Result<i32, E>, ApplicationError> {
    match split_result::<E>(reply)? {
        ReplyBody::Success(Some(RawValue::I32(value))) => Ok(Ok(value)),
        ReplyBody::Success(_) => Err(ApplicationError::new(
            ApplicationErrorKind::MissingResult,
            "reply carried no i32 result",
        )),
        ReplyBody::Declared(declared) => Ok(Err(declared)),
    }
}

/// A client configuration with short reconnect delays for tests.
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        reconnect: ReconnectPolicy {
            initial_delay: Duration::from_millis(10),
            multiplier: 1.5,
            max_delay: Duration::from_millis(100),
            jitter: false,
        },
        ..ClientConfig::default()
    }
}

/// Installs the test log subscriber; `RUST_LOG=loomrpc=debug` to see
/// engine activity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Spins up a Calculator server and connected client over the in-memory
/// transport.
pub async fn calculator_fixture() -> (Server, Client, CalcClient, Arc<CalcState>) {
    init_tracing();
    let transport = MemoryTransport::new();
    let server = Server::new(transport.clone());
    let state = Arc::new(CalcState::default());
    server
        .route("Calculator", &CALCULATOR, calculator_table(Arc::clone(&state)))
        .unwrap();
    server.listen().await.unwrap();

    let client = Client::new(transport, fast_config());
    let handle = client.service("Calculator", &CALCULATOR).unwrap();
    (server, client, CalcClient { handle }, state)
}
