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

//! Wire protocol: the raw data model and the binary codec.
//!
//! [`Protocol`] is the seam alternate codecs would plug into;
//! [`BinaryProtocol`] is the implementation this crate ships.

mod binary;
mod types;

pub use binary::{BinaryProtocol, MAX_BINARY_BYTES, MAX_CONTAINER_ITEMS};
pub use types::{MessageKind, RawField, RawList, RawMap, RawMessage, RawStruct, RawValue, WireType};

use crate::error::Error;
use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A message codec over buffered stream halves.
///
/// `decode` must support being fed bytes incrementally — it suspends
/// inside the reader until enough bytes arrive — and must consume no more
/// bytes than one complete message. `encode` appends one message to the
/// writer's buffers; the transport flushes.
#[async_trait]
pub trait Protocol: Send + Sync + 'static {
    /// Decodes the next message from the reader.
    async fn decode<R>(&self, reader: &mut FrameReader<R>) -> Result<RawMessage, Error>
    where
        R: AsyncRead + Send + Unpin;

    /// Encodes a message into the writer's buffers.
    fn encode<W>(&self, writer: &mut FrameWriter<W>, message: &RawMessage) -> Result<(), Error>
    where
        W: AsyncWrite + Send + Unpin;
}
