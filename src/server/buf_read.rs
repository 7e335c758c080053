// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! The fixed-capacity scan buffer underneath `MultipartStream`.

use super::boundary::BoundaryMatcher;
use super::progress::ProgressNotifier;

use crate::error::{Error, Result};

use std::cmp;
use std::io::{self, Read};

/// Default requested buffer capacity.
pub const DEFAULT_BUF_SIZE: usize = 4096;

/// A byte buffer refilled from `R` that knows where the next delimiter is.
///
/// `head` is the first unconsumed byte and `tail` is one past the last valid byte. While no
/// delimiter is visible between them, the last `pad` bytes before `tail` are withheld from
/// callers because they may be the beginning of a delimiter that the next read completes.
pub struct BufferedScanner<R> {
    source: R,
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
    matcher: BoundaryMatcher,
    boundary_pos: Option<usize>,
    pad: usize,
    notifier: ProgressNotifier,
}

impl<R: Read> BufferedScanner<R> {
    /// The capacity is raised to twice the delimiter length if `buf_size` is smaller.
    pub fn new(source: R, matcher: BoundaryMatcher, buf_size: usize, notifier: ProgressNotifier) -> Self {
        let capacity = cmp::max(buf_size, matcher.delimiter_len() * 2);

        BufferedScanner {
            source: source,
            buf: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            matcher: matcher,
            boundary_pos: None,
            pad: 0,
            notifier: notifier,
        }
    }

    /// Return the next byte, reading from the source if the buffer is drained.
    ///
    /// `Ok(None)` means the source is exhausted.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.head == self.tail {
            self.forget_boundary();
            self.head = 0;
            self.tail = 0;

            let read = read_retrying(&mut self.source, &mut self.buf)?;

            if read == 0 {
                return Ok(None);
            }

            self.notifier.note_bytes_read(read);
            self.tail = read;
        }

        let byte = self.buf[self.head];
        self.head += 1;
        Ok(Some(byte))
    }

    /// Search the unconsumed bytes for the delimiter and update the withheld region.
    pub fn locate(&mut self) {
        self.boundary_pos = self.matcher.find(&self.buf[self.head..self.tail])
            .map(|pos| pos + self.head);

        self.pad = match self.boundary_pos {
            Some(_) => 0,
            None => cmp::min(self.matcher.len(), self.tail - self.head),
        };
    }

    /// The position of the located delimiter, if it is in the buffer.
    pub fn boundary_pos(&self) -> Option<usize> {
        self.boundary_pos
    }

    /// Bytes deliverable without reading from the source: up to the delimiter if it was
    /// located, up to the withheld region otherwise.
    pub fn available(&self) -> usize {
        match self.boundary_pos {
            Some(pos) => pos - self.head,
            None => self.tail - self.head - self.pad,
        }
    }

    /// Move the withheld region to the front and read until either new bytes are deliverable
    /// or the delimiter becomes visible. Returns the new `available()`.
    ///
    /// A source that ends before the delimiter appears is a malformed stream.
    pub fn refill(&mut self) -> Result<usize> {
        if self.boundary_pos.is_some() {
            return Ok(0);
        }

        let pad = self.pad;

        if pad > 0 {
            safemem::copy_over(&mut self.buf, self.tail - pad, 0, pad);
        }

        self.head = 0;
        self.tail = pad;

        loop {
            let read = read_retrying(&mut self.source, &mut self.buf[self.tail..])?;

            if read == 0 {
                return Err(Error::malformed("stream ended unexpectedly"));
            }

            trace!("refilled {} bytes, {} retained", read, pad);

            self.notifier.note_bytes_read(read);
            self.tail += read;
            self.locate();

            let available = self.available();

            if available > 0 || self.boundary_pos.is_some() {
                return Ok(available);
            }
        }
    }

    /// The deliverable bytes.
    pub fn buffer(&self) -> &[u8] {
        let available = self.available();
        &self.buf[self.head..self.head + available]
    }

    /// Mark `amt` deliverable bytes as consumed.
    pub fn consume(&mut self, amt: usize) {
        assert!(amt <= self.available(), "consumed past the end of the body");
        self.head += amt;
    }

    /// Step over the delimiter located at `head`.
    pub fn consume_boundary(&mut self) {
        debug_assert_eq!(self.boundary_pos, Some(self.head));
        self.head += self.matcher.len();
        self.forget_boundary();
    }

    /// The active delimiter matcher.
    pub fn matcher(&self) -> &BoundaryMatcher {
        &self.matcher
    }

    /// Switch the matcher between prefixed and unprefixed mode.
    pub fn set_prefixed(&mut self, prefixed: bool) {
        self.matcher.set_prefixed(prefixed);
        self.forget_boundary();
    }

    /// Install a same-length boundary token.
    pub fn set_token(&mut self, token: &[u8]) -> Result<()> {
        self.matcher.set_token(token)?;
        self.forget_boundary();
        Ok(())
    }

    /// The progress notifier fed by this buffer.
    pub fn notifier_mut(&mut self) -> &mut ProgressNotifier {
        &mut self.notifier
    }

    /// The total capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Unwrap the underlying source. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn forget_boundary(&mut self) {
        self.boundary_pos = None;
        self.pad = 0;
    }
}

fn read_retrying<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match source.read(buf) {
            Ok(read) => return Ok(read),
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => (),
            Err(err) => return Err(Error::from(err)),
        }
    }
}
