// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Batched byte access over a [`Read`].
//!
//! The row parser looks at every byte of a chunk; pulling them one at a time
//! from a decompressor would cost a call per byte. `ByteStream` refills a
//! fixed buffer and hands bytes out of it.

use std::io::{self, Read};

/// Default refill size.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug)]
pub struct ByteStream<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl<R: Read> ByteStream<R> {
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    /// Refill when drained. Returns false at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.pos < self.filled {
            return Ok(true);
        }
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    /// Append bytes to `out` up to the first `a` or `b`, consuming the stop
    /// byte and returning it. `None` means the stream ended first.
    pub fn copy_until(&mut self, out: &mut Vec<u8>, a: u8, b: u8) -> io::Result<Option<u8>> {
        loop {
            if !self.fill()? {
                return Ok(None);
            }
            let window = &self.buf[self.pos..self.filled];
            match window.iter().position(|&c| c == a || c == b) {
                Some(i) => {
                    let stop = window[i];
                    out.extend_from_slice(&window[..i]);
                    self.pos += i + 1;
                    return Ok(Some(stop));
                }
                None => {
                    out.extend_from_slice(window);
                    self.pos = self.filled;
                }
            }
        }
    }
}
