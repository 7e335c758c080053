// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! The encapsulation-level protocol over a multipart body.

use super::body::PartBodyStream;
use super::boundary::BoundaryMatcher;
use super::buf_read::{BufferedScanner, DEFAULT_BUF_SIZE};
use super::progress::ProgressNotifier;

use crate::error::{Error, Result};

use std::io::{self, Read, Write};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Terminates a part's header section.
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Follows a delimiter when another encapsulation comes next.
const FIELD_SEPARATOR: &[u8] = b"\r\n";

/// Follows the final delimiter.
const STREAM_TERMINATOR: &[u8] = b"--";

/// The default ceiling for a single part's header section.
pub const DEFAULT_HEADER_SIZE_MAX: usize = 10 * 1024;

/// Walks the encapsulations of a multipart body in a single pass.
///
/// The caller drives the protocol:
///
/// ```rust
/// # use fileupload::server::MultipartStream;
/// # fn run() -> fileupload::Result<()> {
/// let body = &b"--b0undary\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue\r\n--b0undary--"[..];
/// let mut stream = MultipartStream::new(body, b"b0undary")?;
///
/// let mut more = stream.skip_preamble()?;
/// while more {
///     let _headers = stream.read_headers()?;
///     let mut value = Vec::new();
///     stream.read_body_data(&mut value)?;
///     assert_eq!(value, b"value".to_vec());
///     more = stream.read_boundary()?;
/// }
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct MultipartStream<R> {
    scanner: BufferedScanner<R>,
    header_size_max: Option<usize>,
}

impl<R: Read> MultipartStream<R> {
    /// Wrap `source`, splitting it on `boundary` (the `boundary` parameter of the request's
    /// `Content-Type`, without the leading dashes).
    pub fn new(source: R, boundary: &[u8]) -> Result<Self> {
        Self::with_buffer_size(source, boundary, DEFAULT_BUF_SIZE)
    }

    /// As `new()`, requesting a specific scan buffer size. The buffer is never smaller than
    /// twice the delimiter.
    pub fn with_buffer_size(source: R, boundary: &[u8], buf_size: usize) -> Result<Self> {
        Self::with_notifier(source, boundary, buf_size, ProgressNotifier::default())
    }

    /// As `with_buffer_size()`, reporting reads to `notifier`.
    pub fn with_notifier(source: R, boundary: &[u8], buf_size: usize, notifier: ProgressNotifier)
        -> Result<Self> {
        let matcher = BoundaryMatcher::new(boundary)?;

        debug!("boundary: {:?}", String::from_utf8_lossy(boundary));

        Ok(MultipartStream {
            scanner: BufferedScanner::new(source, matcher, buf_size, notifier),
            header_size_max: Some(DEFAULT_HEADER_SIZE_MAX),
        })
    }

    /// Set the maximum size of one part's header section, terminator included.
    ///
    /// `None` removes the limit.
    pub fn set_header_size_max<L: Into<Option<usize>>>(&mut self, limit: L) -> &mut Self {
        self.header_size_max = limit.into();
        self
    }

    /// The maximum size of one part's header section.
    pub fn header_size_max(&self) -> Option<usize> {
        self.header_size_max
    }

    /// Discard everything up to the first delimiter and step over it.
    ///
    /// The first delimiter of a body does not need a leading `CRLF`. Returns `false` if the body
    /// does not contain an encapsulation, which includes a body that breaks off before one is
    /// found.
    pub fn skip_preamble(&mut self) -> Result<bool> {
        self.scanner.set_prefixed(false);
        let result = self.read_boundary();
        self.scanner.set_prefixed(true);

        match result {
            Err(Error::MalformedStream(reason)) => {
                debug!("no encapsulation found: {}", reason);
                Ok(false)
            }
            other => other,
        }
    }

    /// Read the header section of the current part, returning it verbatim including the
    /// terminating empty line.
    ///
    /// A part whose body follows the delimiter line directly with an empty line has an empty
    /// header section, returned as a lone `CRLF`.
    pub fn read_headers(&mut self) -> Result<Vec<u8>> {
        let mut raw = Vec::new();
        let mut matched = 0;

        while matched < HEADER_SEPARATOR.len() {
            let byte = self.next_byte()?;

            if let Some(limit) = self.header_size_max {
                if raw.len() >= limit {
                    return Err(Error::HeaderSectionTooLarge { limit: limit });
                }
            }

            raw.push(byte);

            matched = if byte == HEADER_SEPARATOR[matched] {
                matched + 1
            } else if byte == CR {
                1
            } else {
                0
            };

            if raw.len() == FIELD_SEPARATOR.len() && raw == FIELD_SEPARATOR {
                break;
            }
        }

        debug!("read {} header bytes", raw.len());

        Ok(raw)
    }

    /// A stream over the current part's body.
    pub fn body_stream(&mut self) -> PartBodyStream<R> {
        PartBodyStream::new(&mut self.scanner)
    }

    /// Copy the rest of the current part's body to `out`.
    pub fn read_body_data<W: Write>(&mut self, out: W) -> Result<u64> {
        self.body_stream().copy_to(out)
    }

    /// Skip the rest of the current part's body.
    pub fn discard_body_data(&mut self) -> Result<u64> {
        self.body_stream().copy_to(io::sink())
    }

    /// Step over the delimiter ending the current part and report whether another part
    /// follows.
    ///
    /// Any body bytes not yet read are discarded first. A bare `LF` after the delimiter is
    /// accepted in place of `CRLF`.
    pub fn read_boundary(&mut self) -> Result<bool> {
        let discarded = self.discard_body_data()?;

        if discarded > 0 {
            debug!("discarded {} unread body bytes", discarded);
        }

        self.scanner.consume_boundary();

        let first = self.next_byte()?;

        if first == LF {
            warn!("delimiter followed by LF without CR, assuming another part follows");
            return Ok(true);
        }

        let marker = [first, self.next_byte()?];

        if marker == STREAM_TERMINATOR {
            debug!("closing delimiter found");
            Ok(false)
        } else if marker == FIELD_SEPARATOR {
            Ok(true)
        } else {
            Err(Error::malformed("unexpected characters follow a boundary"))
        }
    }

    /// Replace the boundary token, for parsing a nested multipart body in the same pass.
    ///
    /// The new token must have the same length as the current one; otherwise
    /// `Error::IllegalBoundary` is returned and the boundary is left unchanged.
    pub fn set_boundary(&mut self, boundary: &[u8]) -> Result<()> {
        self.scanner.set_token(boundary)?;
        debug!("boundary switched to {:?}", String::from_utf8_lossy(boundary));
        Ok(())
    }

    /// The current boundary token.
    pub fn boundary(&self) -> &[u8] {
        self.scanner.matcher().token()
    }

    /// The progress notifier fed by this stream.
    pub fn notifier_mut(&mut self) -> &mut ProgressNotifier {
        self.scanner.notifier_mut()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        self.scanner.get_ref()
    }

    /// Unwrap the underlying source. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.scanner.into_inner()
    }

    fn next_byte(&mut self) -> Result<u8> {
        match self.scanner.read_byte()? {
            Some(byte) => Ok(byte),
            None => Err(Error::malformed("stream ended unexpectedly")),
        }
    }
}
