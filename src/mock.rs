// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Mock readers and request builders for testing parsers without a network connection.
use rand::rngs::ThreadRng;
use rand::Rng;

use std::fmt;
use std::io::{self, Read};

const BOUNDARY_LEN: usize = 16;

enum Chunking {
    Fixed(usize),
    Random(ThreadRng),
}

/// A reader over a byte slice that hands out data in small pieces, the way a network
/// connection does.
pub struct ChunkedReader<'a> {
    data: &'a [u8],
    chunking: Chunking,
}

impl<'a> ChunkedReader<'a> {
    /// Return at most `chunk` bytes per read. A `chunk` of zero is treated as one.
    pub fn fixed(data: &'a [u8], chunk: usize) -> Self {
        ChunkedReader {
            data: data,
            chunking: Chunking::Fixed(if chunk == 0 { 1 } else { chunk }),
        }
    }

    /// Return a random, non-zero number of bytes per read.
    pub fn random(data: &'a [u8]) -> Self {
        ChunkedReader {
            data: data,
            chunking: Chunking::Random(rand::thread_rng()),
        }
    }

    /// The bytes not read yet.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a> Read for ChunkedReader<'a> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.len() == 0 {
            debug!("Passed a zero-sized buffer.");
            return Ok(0);
        }

        let len = match self.chunking {
            Chunking::Fixed(chunk) => chunk.min(out.len()),
            // Simulate the randomness of a network connection by not always reading everything
            Chunking::Random(ref mut rng) => rng.gen_range(1..=out.len()),
        };

        self.data.read(&mut out[..len])
    }
}

impl<'a> fmt::Debug for ChunkedReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let chunking = match self.chunking {
            Chunking::Fixed(chunk) => format!("Fixed({})", chunk),
            Chunking::Random(_) => "Random".to_owned(),
        };

        f.debug_struct("fileupload::mock::ChunkedReader")
            .field("remaining", &self.data.len())
            .field("chunking", &chunking)
            .finish()
    }
}

/// Builds `multipart/form-data` bodies.
///
/// ```rust
/// use fileupload::mock::FormBuilder;
///
/// let mut form = FormBuilder::with_boundary("XyZ");
/// form.text("name", "value");
///
/// assert_eq!(form.content_type(), "multipart/form-data; boundary=XyZ");
/// assert_eq!(
///     form.finish(),
///     b"--XyZ\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nvalue\r\n--XyZ--\r\n".to_vec()
/// );
/// ```
#[derive(Clone, Debug)]
pub struct FormBuilder {
    boundary: String,
    parts: Vec<(String, Vec<u8>)>,
}

impl FormBuilder {
    /// A builder with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(&format!("--------{}", crate::random_alphanumeric(BOUNDARY_LEN)))
    }

    /// A builder using `boundary`.
    pub fn with_boundary(boundary: &str) -> Self {
        FormBuilder {
            boundary: boundary.to_owned(),
            parts: Vec::new(),
        }
    }

    /// The boundary token.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for the request.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Add a plain form field.
    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.part(&format!("Content-Disposition: form-data; name=\"{}\"", name), value.as_bytes())
    }

    /// Add a file.
    pub fn file(&mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> &mut Self {
        let headers = format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}",
            name, file_name, content_type
        );

        self.part(&headers, data)
    }

    /// Add a part with arbitrary `headers`, given as lines separated by `CRLF` without the
    /// blank line that ends them.
    pub fn part(&mut self, headers: &str, body: &[u8]) -> &mut Self {
        self.parts.push((headers.to_owned(), body.to_vec()));
        self
    }

    /// The complete request body.
    pub fn finish(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for &(ref headers, ref body) in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(headers.as_bytes());
            out.extend_from_slice(b"\r\n\r\n");
            out.extend_from_slice(body);
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{ChunkedReader, FormBuilder};

    use std::io::Read;

    #[test]
    fn fixed_chunks() {
        let mut reader = ChunkedReader::fixed(b"abcdefg", 3);
        let mut buf = [0; 16];

        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(reader.read(&mut buf[..2]).unwrap(), 2);
        assert_eq!(reader.remaining(), b"fg");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn random_chunks_deliver_everything() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4000).collect();
        let mut out = Vec::new();
        ChunkedReader::random(&data).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn random_boundaries_differ() {
        let first = FormBuilder::new();
        let second = FormBuilder::new();
        assert_ne!(first.boundary(), second.boundary());
        assert!(first.content_type().ends_with(first.boundary()));
    }
}
