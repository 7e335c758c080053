// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Boundary search using a Knuth-Morris-Pratt failure table.

use crate::error::{Error, Result};

/// `CR LF - -`, prepended to the boundary token to form a delimiter.
pub const BOUNDARY_PREFIX: &[u8] = b"\r\n--";

/// The length of the `CR LF` part of `BOUNDARY_PREFIX`.
const CRLF_LEN: usize = 2;

/// Locates occurrences of a multipart delimiter (`CRLF--token`) in a byte window.
///
/// The very first delimiter of a stream does not have to be preceded by `CRLF`, so the
/// matcher can be switched into an unprefixed mode with `set_prefixed(false)` which searches
/// for `--token` instead. Every change of the active pattern rebuilds the failure table.
#[derive(Debug, Clone)]
pub struct BoundaryMatcher {
    delimiter: Vec<u8>,
    offset: usize,
    table: Vec<isize>,
}

impl BoundaryMatcher {
    /// Create a matcher for the given boundary token, as found in the `boundary` parameter of
    /// the request's `Content-Type`.
    pub fn new(token: &[u8]) -> Result<BoundaryMatcher> {
        if token.is_empty() {
            return Err(Error::InvalidContentType("the boundary token is empty".into()));
        }

        let mut delimiter = Vec::with_capacity(BOUNDARY_PREFIX.len() + token.len());
        delimiter.extend_from_slice(BOUNDARY_PREFIX);
        delimiter.extend_from_slice(token);

        let mut matcher = BoundaryMatcher {
            delimiter: delimiter,
            offset: 0,
            table: Vec::new(),
        };

        matcher.compute_table();
        Ok(matcher)
    }

    /// The pattern currently searched for.
    pub fn pattern(&self) -> &[u8] {
        &self.delimiter[self.offset..]
    }

    /// The length of the pattern currently searched for.
    pub fn len(&self) -> usize {
        self.delimiter.len() - self.offset
    }

    /// The length of the full `CRLF--token` delimiter, regardless of mode.
    pub fn delimiter_len(&self) -> usize {
        self.delimiter.len()
    }

    /// The boundary token without any prefix.
    pub fn token(&self) -> &[u8] {
        &self.delimiter[BOUNDARY_PREFIX.len()..]
    }

    /// The failure table for the active pattern, `pattern().len() + 1` entries long.
    pub fn table(&self) -> &[isize] {
        &self.table
    }

    /// Whether the active pattern starts with `CRLF`.
    pub fn is_prefixed(&self) -> bool {
        self.offset == 0
    }

    /// Switch between searching for `CRLF--token` (`true`) and `--token` (`false`).
    pub fn set_prefixed(&mut self, prefixed: bool) {
        let offset = if prefixed { 0 } else { CRLF_LEN };

        if offset != self.offset {
            self.offset = offset;
            self.compute_table();
        }
    }

    /// Replace the boundary token with one of the same length.
    ///
    /// On error the matcher is left untouched.
    pub fn set_token(&mut self, token: &[u8]) -> Result<()> {
        let expected = self.token().len();

        if token.len() != expected {
            return Err(Error::IllegalBoundary {
                expected: expected,
                actual: token.len(),
            });
        }

        self.delimiter[BOUNDARY_PREFIX.len()..].copy_from_slice(token);
        self.compute_table();
        Ok(())
    }

    /// Return the start offset of the first complete occurrence of the active pattern in
    /// `haystack`, never looking past its end.
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        let pattern = self.pattern();
        let mut matched: isize = 0;

        for (idx, &byte) in haystack.iter().enumerate() {
            while matched >= 0 && byte != pattern[matched as usize] {
                matched = self.table[matched as usize];
            }

            matched += 1;

            if matched as usize == pattern.len() {
                return Some(idx + 1 - pattern.len());
            }
        }

        None
    }

    fn compute_table(&mut self) {
        let len = self.len();
        let mut table = vec![0isize; len + 1];
        table[0] = -1;

        {
            let pattern = self.pattern();
            let mut position = 2;
            let mut candidate = 0usize;

            while position <= len {
                if pattern[position - 1] == pattern[candidate] {
                    candidate += 1;
                    table[position] = candidate as isize;
                    position += 1;
                } else if candidate > 0 {
                    candidate = table[candidate] as usize;
                } else {
                    table[position] = 0;
                    position += 1;
                }
            }
        }

        self.table = table;
    }
}
