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

//! Scratch-buffered writing to an async byte sink.
//!
//! Encoders append synchronously through [`FrameWriter`]'s `put_*`
//! methods; bytes accumulate in a fixed-size scratch buffer that is sealed
//! into an outgoing chunk whenever it would overflow. Payloads larger than
//! the scratch buffer become their own chunk instead of being copied
//! through it. Nothing touches the sink until [`FrameWriter::flush`].

use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::mem;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Capacity of the scratch buffer.
pub const SCRATCH_CAPACITY: usize = 8 * 1024;

/// Buffered writer over an async byte sink.
#[derive(Debug)]
pub struct FrameWriter<W> {
    io: W,
    scratch: Vec<u8>,
    outbox: VecDeque<Bytes>,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wraps a byte sink in a buffered writer.
    pub fn new(io: W) -> Self {
        Self {
            io,
            scratch: Vec::with_capacity(SCRATCH_CAPACITY),
            outbox: VecDeque::new(),
        }
    }

    /// Appends bytes, sealing the scratch buffer when it would overflow.
    pub fn put(&mut self, bytes: &[u8]) {
        if bytes.len() >= SCRATCH_CAPACITY {
            self.seal();
            self.outbox.push_back(Bytes::copy_from_slice(bytes));
            return;
        }
        if self.scratch.len() + bytes.len() > SCRATCH_CAPACITY {
            self.seal();
        }
        self.scratch.extend_from_slice(bytes);
    }

    /// Appends an owned payload; large payloads become their own chunk
    /// without passing through the scratch buffer.
    pub fn put_bytes(&mut self, bytes: Bytes) {
        if bytes.len() < SCRATCH_CAPACITY {
            self.put(&bytes);
        } else {
            self.seal();
            self.outbox.push_back(bytes);
        }
    }

    /// Appends one byte.
    pub fn put_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    /// Appends one signed byte.
    pub fn put_i8(&mut self, value: i8) {
        self.put(&[value as u8]);
    }

    /// Appends a big-endian u16.
    pub fn put_u16(&mut self, value: u16) {
        self.put(&value.to_be_bytes());
    }

    /// Appends a big-endian i16.
    pub fn put_i16(&mut self, value: i16) {
        self.put(&value.to_be_bytes());
    }

    /// Appends a big-endian i32.
    pub fn put_i32(&mut self, value: i32) {
        self.put(&value.to_be_bytes());
    }

    /// Appends a big-endian i64.
    pub fn put_i64(&mut self, value: i64) {
        self.put(&value.to_be_bytes());
    }

    /// Appends a big-endian IEEE-754 double.
    pub fn put_f64(&mut self, value: f64) {
        self.put(&value.to_be_bytes());
    }

    /// Bytes accumulated but not yet flushed to the sink.
    pub fn pending(&self) -> usize {
        self.scratch.len() + self.outbox.iter().map(Bytes::len).sum::<usize>()
    }

    /// Writes every accumulated chunk to the sink and flushes it.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.seal();
        while let Some(chunk) = self.outbox.pop_front() {
            self.io.write_all(&chunk).await?;
        }
        self.io.flush().await
    }

    /// Flushes remaining bytes and shuts the sink down.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.io.shutdown().await
    }

    /// Consumes the writer, returning the underlying sink.
    ///
    /// Unflushed bytes are discarded.
    pub fn into_inner(self) -> W {
        self.io
    }

    /// Moves the scratch contents into the outbox.
    fn seal(&mut self) {
        if !self.scratch.is_empty() {
            let chunk = mem::replace(&mut self.scratch, Vec::with_capacity(SCRATCH_CAPACITY));
            self.outbox.push_back(chunk.into());
        }
    }
}
