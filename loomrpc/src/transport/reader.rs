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

//! Buffered, incremental reading over an async byte stream.
//!
//! [`FrameReader`] exposes the three primitives the codec decodes with —
//! `consume`, `peek`, and `skip` — and suspends inside them until enough
//! bytes have arrived. The decoder is written as straight-line async code
//! and never sees chunk boundaries.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial capacity of the read buffer.
pub const READ_BUFFER_INIT: usize = 8 * 1024;

/// Once the read cursor passes this point the buffer is repacked so unread
/// bytes move back to the front.
pub const COMPACT_THRESHOLD: usize = 16 * 1024;

/// Buffered reader over an async byte stream.
///
/// Unread bytes live in a single growable buffer behind a read cursor.
/// Requests larger than the buffered amount await more data from the
/// stream; an end-of-stream in the middle of a request is a framing error
/// (`ErrorKind::UnexpectedEof`). Buffer growth is geometric (at least
/// 1.5x) and the buffer is compacted once the cursor passes
/// [`COMPACT_THRESHOLD`].
#[derive(Debug)]
pub struct FrameReader<R> {
    io: R,
    buf: Vec<u8>,
    pos: usize,
    compact_threshold: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps a byte stream in a buffered reader.
    pub fn new(io: R) -> Self {
        Self::with_compact_threshold(io, COMPACT_THRESHOLD)
    }

    /// Wraps a byte stream, repacking the buffer whenever the read cursor
    /// passes `compact_threshold` bytes.
    pub fn with_compact_threshold(io: R, compact_threshold: usize) -> Self {
        Self {
            io,
            buf: Vec::with_capacity(READ_BUFFER_INIT),
            pos: 0,
            compact_threshold,
        }
    }

    /// Number of bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Waits for at least one unread byte, returning `true` when the
    /// stream has ended cleanly with nothing buffered.
    ///
    /// Connections use this to tell a clean close at a message boundary
    /// apart from a truncated message.
    pub async fn at_eof(&mut self) -> io::Result<bool> {
        while self.buffered() == 0 {
            self.compact();
            let read = self.io.read_buf(&mut self.buf).await?;
            if read == 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the next `n` bytes and advances the cursor.
    pub async fn consume(&mut self, n: usize) -> io::Result<&[u8]> {
        self.fill(n).await?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    /// Returns the next `n` bytes without advancing the cursor.
    pub async fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        self.fill(n).await?;
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Advances the cursor by `n` bytes without returning data.
    pub async fn skip(&mut self, n: usize) -> io::Result<()> {
        self.fill(n).await?;
        self.pos += n;
        Ok(())
    }

    /// Reads one unsigned byte.
    pub async fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.consume(1).await?[0])
    }

    /// Reads one signed byte.
    pub async fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_u8().await? as i8)
    }

    /// Reads a big-endian i16.
    pub async fn read_i16(&mut self) -> io::Result<i16> {
        let bytes = self.consume(2).await?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian i32.
    pub async fn read_i32(&mut self) -> io::Result<i32> {
        let bytes = self.consume(4).await?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a big-endian i64.
    pub async fn read_i64(&mut self) -> io::Result<i64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.consume(8).await?);
        Ok(i64::from_be_bytes(raw))
    }

    /// Reads a big-endian IEEE-754 double.
    pub async fn read_f64(&mut self) -> io::Result<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.consume(8).await?);
        Ok(f64::from_be_bytes(raw))
    }

    /// Suspends until at least `need` unread bytes are buffered.
    async fn fill(&mut self, need: usize) -> io::Result<()> {
        if self.buffered() >= need {
            return Ok(());
        }
        if self.pos > self.compact_threshold {
            self.compact();
        }
        let missing = need - self.buffered();
        if self.buf.capacity() - self.buf.len() < missing {
            let target = (self.buf.len() + missing).max(self.buf.capacity() * 3 / 2);
            self.buf.reserve(target - self.buf.len());
        }
        while self.buffered() < need {
            let read = self.io.read_buf(&mut self.buf).await?;
            if read == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended mid-message"));
            }
        }
        Ok(())
    }

    /// Moves unread bytes to the front of the buffer.
    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        let remaining = self.buffered();
        self.buf.copy_within(self.pos.., 0);
        self.buf.truncate(remaining);
        self.pos = 0;
    }
}
