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

//! The contract between generated service code and the runtime.
//!
//! An IDL code generator supplies three things per service: a
//! [`ServiceSpec`] describing the methods, a [`MethodTable`] adapting a
//! handler implementation for the server, and typed client wrappers that
//! build argument structs and interpret result structs. The runtime never
//! sees typed values — only [`RawStruct`]s — so this module also fixes the
//! result-struct conventions both sides share: field 0 carries the success
//! value, fields 1.. carry declared exceptions in their IDL slots.

use crate::error::{ApplicationError, ApplicationErrorKind};
use crate::protocol::{RawStruct, RawValue};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;

/// Field id of the success value in a method result struct.
pub const SUCCESS_FIELD: i16 = 0;

/// One method's declared shape.
///
/// A method with no result codec in the IDL is oneway: it consumes no
/// sequence id and never produces a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// The method name, without the service prefix.
    pub name: &'static str,
    /// Whether the method is fire-and-forget.
    pub oneway: bool,
}

/// An immutable service descriptor emitted by generated code.
///
/// Descriptors are compared by identity, not by content: resolving the
/// same service name twice against different descriptor values is an
/// error, catching accidental redefinition.
#[derive(Debug)]
pub struct ServiceSpec {
    /// The default service name.
    pub name: &'static str,
    /// The declared methods.
    pub methods: &'static [MethodSpec],
}

impl ServiceSpec {
    /// Looks up a declared method by name.
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// The future a method handler entry returns.
pub type MethodFuture = BoxFuture<'static, Result<RawStruct, ApplicationError>>;

/// A type-erased method handler entry.
///
/// Generated glue decodes the argument struct, invokes the handler,
/// encodes the outcome with [`encode_result`], and maps anything outside
/// the declared contract to an [`ApplicationError`].
pub type MethodFn = Box<dyn Fn(RawStruct) -> MethodFuture + Send + Sync>;

/// A flat, explicit method table for one service implementation.
///
/// ```
/// use loomrpc::{MethodTable, service::encode_result};
/// use std::convert::Infallible;
///
/// let table = MethodTable::new().handle("ping", |_args| async {
///     Ok(encode_result::<Infallible>(Ok(None)))
/// });
/// assert!(table.contains("ping"));
/// ```
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<&'static str, MethodFn>,
}

impl MethodTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler entry, builder-style. A repeated name replaces the
    /// previous entry.
    pub fn handle<F, Fut>(mut self, name: &'static str, handler: F) -> Self
    where
        F: Fn(RawStruct) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RawStruct, ApplicationError>> + Send + 'static,
    {
        self.methods
            .insert(name, Box::new(move |args| -> MethodFuture { Box::pin(handler(args)) }));
        self
    }

    /// Returns `true` if the table has an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn into_methods(self) -> HashMap<&'static str, MethodFn> {
        self.methods
    }
}

/// A closed set of exceptions declared by one method.
///
/// Generated code represents each method's `throws` clause as one type —
/// usually an enum with a variant per declared exception — and matches by
/// slot discriminant rather than open-ended downcasting. Methods that
/// declare no exceptions use [`Infallible`].
pub trait DeclaredException: std::error::Error + Sized + Send + 'static {
    /// The result-struct field id this exception occupies.
    fn slot(&self) -> i16;

    /// Encodes this exception as its IDL struct.
    fn to_raw(&self) -> RawStruct;

    /// Rebuilds the exception from a populated slot, or `None` if the
    /// slot is not part of this method's contract.
    fn from_raw(slot: i16, raw: &RawStruct) -> Option<Self>;
}

impl DeclaredException for Infallible {
    fn slot(&self) -> i16 {
        match *self {}
    }

    fn to_raw(&self) -> RawStruct {
        match *self {}
    }

    fn from_raw(_slot: i16, _raw: &RawStruct) -> Option<Self> {
        None
    }
}

/// Builds a method result struct from a handler outcome.
///
/// `Ok(None)` is a void success: the struct stays empty. A declared
/// exception lands in its own slot as a nested struct.
pub fn encode_result<E: DeclaredException>(result: Result<Option<RawValue>, E>) -> RawStruct {
    match result {
        Ok(None) => RawStruct::new(""),
        Ok(Some(value)) => RawStruct::new("").with_field(SUCCESS_FIELD, value),
        Err(declared) => {
            let slot = declared.slot();
            RawStruct::new("").with_field(slot, RawValue::Struct(declared.to_raw()))
        }
    }
}

/// The interpreted body of a REPLY message.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody<E> {
    /// The call succeeded; `None` for void methods.
    Success(Option<RawValue>),
    /// The call failed with a declared exception.
    Declared(E),
}

/// Splits a reply result struct into success value or declared exception.
///
/// A populated declared slot takes precedence over a success value.
/// Slots outside the method's contract are skipped, honoring the wire
/// type that travelled with them (forward compatibility).
pub fn split_result<E: DeclaredException>(raw: RawStruct) -> Result<ReplyBody<E>, ApplicationError> {
    let mut success = None;
    for field in raw.fields {
        if field.id == SUCCESS_FIELD {
            success = Some(field.value);
            continue;
        }
        if let RawValue::Struct(nested) = &field.value {
            if let Some(declared) = E::from_raw(field.id, nested) {
                return Ok(ReplyBody::Declared(declared));
            }
        }
    }
    Ok(ReplyBody::Success(success))
}

/// Maps a void-method reply, rejecting unexpected payloads.
pub fn expect_void<E: DeclaredException>(body: ReplyBody<E>) -> Result<Result<(), E>, ApplicationError> {
    match body {
        ReplyBody::Success(_) => Ok(Ok(())),
        ReplyBody::Declared(declared) => Ok(Err(declared)),
    }
}

/// Maps a value-returning reply, rejecting replies with no result field.
pub fn expect_value<E: DeclaredException>(
    body: ReplyBody<E>,
) -> Result<Result<RawValue, E>, ApplicationError> {
    match body {
        ReplyBody::Success(Some(value)) => Ok(Ok(value)),
        ReplyBody::Success(None) => Err(ApplicationError::new(
            ApplicationErrorKind::MissingResult,
            "reply carried neither a result nor a declared exception",
        )),
        ReplyBody::Declared(declared) => Ok(Err(declared)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    #[error("boom: {message}")]
    struct Boom {
        message: String,
    }

    impl DeclaredException for Boom {
        fn slot(&self) -> i16 {
            1
        }

        fn to_raw(&self) -> RawStruct {
            RawStruct::new("Boom")
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

    #[test]
    fn test_success_round_trip() {
        let raw = encode_result::<Boom>(Ok(Some(RawValue::I32(42))));
        let body = split_result::<Boom>(raw).unwrap();
        assert_eq!(body, ReplyBody::Success(Some(RawValue::I32(42))));
    }

    #[test]
    fn test_void_success_is_empty_struct() {
        let raw = encode_result::<Boom>(Ok(None));
        assert!(raw.fields.is_empty());
        let body = split_result::<Boom>(raw).unwrap();
        assert_eq!(body, ReplyBody::Success(None));
    }

    #[test]
    fn test_declared_exception_round_trip() {
        let raw = encode_result(Err(Boom { message: "zero".to_owned() }));
        let body = split_result::<Boom>(raw).unwrap();
        assert_eq!(body, ReplyBody::Declared(Boom { message: "zero".to_owned() }));
    }

    #[test]
    fn test_unknown_slot_skipped() {
        // Slot 9 is outside Boom's contract; the reader skips it and
        // still finds the success value.
        let raw = RawStruct::new("")
            .with_field(9, RawValue::Struct(RawStruct::new("")))
            .with_field(SUCCESS_FIELD, RawValue::Bool(true));
        let body = split_result::<Boom>(raw).unwrap();
        assert_eq!(body, ReplyBody::Success(Some(RawValue::Bool(true))));
    }

    #[test]
    fn test_expect_value_requires_result() {
        let raw = encode_result::<Boom>(Ok(None));
        let body = split_result::<Boom>(raw).unwrap();
        let err = expect_value(body).unwrap_err();
        assert_eq!(err.kind, ApplicationErrorKind::MissingResult);
    }

    #[test]
    fn test_method_table_builder() {
        let table = MethodTable::new()
            .handle("ping", |_args| async { Ok(encode_result::<Infallible>(Ok(None))) })
            .handle("echo", |args| async move {
                Ok(encode_result::<Infallible>(Ok(args.field(1).cloned())))
            });
        assert_eq!(table.len(), 2);
        assert!(table.contains("ping"));
        assert!(!table.contains("missing"));
    }

    #[test]
    fn test_spec_lookup() {
        static SPEC: ServiceSpec = ServiceSpec {
            name: "Echo",
            methods: &[
                MethodSpec { name: "ping", oneway: false },
                MethodSpec { name: "notify", oneway: true },
            ],
        };
        assert!(!SPEC.method("ping").unwrap().oneway);
        assert!(SPEC.method("notify").unwrap().oneway);
        assert!(SPEC.method("nope").is_none());
    }
}
