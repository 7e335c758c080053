// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! The body of a single part, as a stream that ends at the next delimiter.

use super::buf_read::BufferedScanner;

use crate::error::{Error, Result};

use std::cmp;
use std::io::{self, BufRead, Read};

/// A view over the scan buffer yielding the current part's body.
///
/// Reading stops exactly before the next delimiter, leaving the stream positioned for
/// `MultipartStream::read_boundary()`. Dropping the view without reading it to the end is fine;
/// the remaining bytes are discarded by the next call on the stream.
///
/// Once `close()` has been called every read fails with `Error::ItemAlreadyConsumed`.
pub struct PartBodyStream<'a, R: 'a> {
    scanner: &'a mut BufferedScanner<R>,
    bytes_read: u64,
    closed: bool,
}

impl<'a, R: Read + 'a> PartBodyStream<'a, R> {
    pub(crate) fn new(scanner: &'a mut BufferedScanner<R>) -> Self {
        scanner.locate();

        PartBodyStream {
            scanner: scanner,
            bytes_read: 0,
            closed: false,
        }
    }

    /// The number of body bytes delivered through `read()` or `consume()` so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether `close()` has completed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Discard up to `n` bytes without copying them, returning how many were skipped.
    ///
    /// Returns `Ok(0)` only at the end of the body.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let available = self.fill()?;
        let skipped = cmp::min(available as u64, n);
        self.scanner.consume(skipped as usize);
        Ok(skipped)
    }

    /// Discard the rest of the body. Calling this more than once is harmless.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        loop {
            let available = self.fill()?;

            if available == 0 {
                break;
            }

            self.scanner.consume(available);
        }

        self.closed = true;
        Ok(())
    }

    /// Copy the rest of the body into `out`, returning the number of bytes written.
    pub fn copy_to<W: io::Write>(&mut self, mut out: W) -> Result<u64> {
        let mut written = 0;

        loop {
            let available = self.fill()?;

            if available == 0 {
                return Ok(written);
            }

            out.write_all(self.scanner.buffer())?;
            self.consume(available);
            written += available as u64;
        }
    }

    fn fill(&mut self) -> Result<usize> {
        if self.closed {
            return Err(Error::ItemAlreadyConsumed);
        }

        match self.scanner.available() {
            0 => self.scanner.refill(),
            available => Ok(available),
        }
    }
}

impl<'a, R: Read + 'a> Read for PartBodyStream<'a, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Error::ItemAlreadyConsumed.into());
        }

        if out.is_empty() {
            return Ok(0);
        }

        let available = self.fill()?;
        let len = cmp::min(available, out.len());
        out[..len].copy_from_slice(&self.scanner.buffer()[..len]);
        self.consume(len);
        Ok(len)
    }
}

impl<'a, R: Read + 'a> BufRead for PartBodyStream<'a, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill()?;
        Ok(self.scanner.buffer())
    }

    fn consume(&mut self, amt: usize) {
        self.scanner.consume(amt);
        self.bytes_read += amt as u64;
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::mock::ChunkedReader;
    use crate::server::MultipartStream;

    use std::io::{self, BufRead, Read};

    const BODY: &[u8] = b"--xx\r\nA: b\r\n\r\nhello there, world\r\n--xx\r\nA: c\r\n\r\nsecond\r\n--xx--";

    fn at_first_body(chunk: usize) -> MultipartStream<ChunkedReader<'static>> {
        let mut stream = MultipartStream::with_buffer_size(ChunkedReader::fixed(BODY, chunk), b"xx", 1)
            .unwrap();
        assert!(stream.skip_preamble().unwrap());
        stream.read_headers().unwrap();
        stream
    }

    #[test]
    fn reads_until_delimiter() {
        for chunk in 1..BODY.len() + 1 {
            let mut stream = at_first_body(chunk);
            let mut text = String::new();

            {
                let mut body = stream.body_stream();
                body.read_to_string(&mut text).unwrap();
                assert_eq!(body.bytes_read(), 18);
                assert_eq!(body.read(&mut [0; 4]).unwrap(), 0);
            }

            assert_eq!(text, "hello there, world");
            assert!(stream.read_boundary().unwrap());
        }
    }

    #[test]
    fn close_discards_and_blocks_reads() {
        let mut stream = at_first_body(3);

        {
            let mut body = stream.body_stream();
            let mut start = [0; 5];
            body.read_exact(&mut start).unwrap();
            assert_eq!(&start, b"hello");

            body.close().unwrap();
            body.close().unwrap();
            assert!(body.is_closed());

            let err = body.read(&mut start).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);

            match Error::from(err) {
                Error::ItemAlreadyConsumed => (),
                other => panic!("unexpected error: {:?}", other),
            }

            match body.skip(1) {
                Err(Error::ItemAlreadyConsumed) => (),
                other => panic!("unexpected result: {:?}", other),
            }
        }

        assert!(stream.read_boundary().unwrap());
        assert_eq!(stream.read_headers().unwrap(), b"A: c\r\n\r\n".to_vec());
        let mut rest = Vec::new();
        stream.read_body_data(&mut rest).unwrap();
        assert_eq!(rest, b"second".to_vec());
        assert!(!stream.read_boundary().unwrap());
    }

    #[test]
    fn skip_and_buf_read() {
        let mut stream = at_first_body(64);
        let mut body = stream.body_stream();

        // Skips stop at the end of the buffered bytes.
        let mut skipped = 0;
        while skipped < 6 {
            let step = body.skip(6 - skipped).unwrap();
            assert!(step > 0);
            skipped += step;
        }
        assert_eq!(skipped, 6);

        let mut line = Vec::new();
        body.read_until(b',', &mut line).unwrap();
        assert_eq!(line, b"there,".to_vec());
        assert_eq!(body.bytes_read(), 6);

        let mut rest = Vec::new();
        assert_eq!(body.copy_to(&mut rest).unwrap(), 6);
        assert_eq!(rest, b" world".to_vec());
        assert_eq!(body.skip(10).unwrap(), 0);
    }
}
