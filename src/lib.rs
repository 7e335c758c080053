// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Streaming support for `multipart/form-data` request bodies.
//!
//! The parser is split into layers, all of which live in the `server` module:
//!
//! * `MultipartStream` walks the encapsulations of a multipart body over any
//! `Read` source, holding only a fixed-size scan buffer in memory.
//! * `FileUpload` and `ItemIter` sit on top of it. They apply request, item,
//! and count limits, parse part headers, and descend into nested
//! `multipart/mixed` parts.
//! * `FileItemFactory` implementations decide where item bodies end up when the
//! whole request is drained with `FileUpload::parse_request()`.
//!
//! The `mock` module (feature `mock`, on by default) contains readers and
//! builders for exercising a parser without a real HTTP connection.
#![deny(unsafe_code)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;

extern crate httparse;
extern crate mime;
extern crate mime_guess;
extern crate rand;
extern crate safemem;
extern crate tempfile;

#[cfg(test)]
extern crate env_logger;

pub mod error;
pub mod server;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Error, Result};

/// Generate a random alphanumeric sequence of length `len`
pub fn random_alphanumeric(len: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(len)
        .collect()
}

#[cfg(test)]
mod test {
    #[test]
    fn random_alphanumeric_len() {
        let s = super::random_alphanumeric(24);
        assert_eq!(s.len(), 24);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
