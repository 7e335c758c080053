// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! The error type shared by every layer of the parser.
//!
//! Body streams implement `std::io::Read`, so errors raised while reading them
//! travel as `io::Error` of kind `InvalidData` wrapping an `Error`. Converting
//! such an `io::Error` back with `Error::from()` recovers the original variant.

use std::io;

quick_error! {
    /// Everything that can go wrong while parsing a multipart body.
    #[derive(Debug)]
    pub enum Error {
        /// The byte sequence does not conform to multipart syntax.
        MalformedStream(reason: String) {
            display("malformed multipart stream: {}", reason)
        }
        /// A part's header section grew past the configured ceiling.
        HeaderSectionTooLarge { limit: usize } {
            display("header section has more than {} bytes (maybe it is not properly terminated)", limit)
        }
        /// A body stream was read after it had been closed.
        ItemAlreadyConsumed {
            display("the item body was already consumed or closed")
        }
        /// A replacement boundary with a different length was installed.
        IllegalBoundary { expected: usize, actual: usize } {
            display("the length of a boundary token cannot be changed (expected {} bytes, got {})",
                    expected, actual)
        }
        /// The request is not a usable `multipart/*` request.
        InvalidContentType(reason: String) {
            display("invalid content type: {}", reason)
        }
        /// The request body is larger than the permitted maximum.
        SizeLimitExceeded { actual: u64, permitted: u64 } {
            display("the request was rejected because its size ({}) exceeds the configured maximum ({})",
                    actual, permitted)
        }
        /// A single item is larger than the permitted maximum.
        FileSizeLimitExceeded { field_name: String, file_name: Option<String>, permitted: u64 } {
            display("the field {} exceeds its maximum permitted size of {} bytes", field_name, permitted)
        }
        /// The request holds more items than permitted.
        FileCountLimitExceeded { permitted: usize } {
            display("the request contains more than the maximum of {} items", permitted)
        }
        /// An error from the underlying byte source or sink.
        Io(err: io::Error) {
            display("I/O error: {}", err)
            cause(err)
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed<S: Into<String>>(reason: S) -> Error {
        Error::MalformedStream(reason.into())
    }

    /// `true` for `MalformedStream`.
    pub fn is_malformed(&self) -> bool {
        match *self {
            Error::MalformedStream(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        let wraps_ours = err.get_ref().map_or(false, |inner| inner.is::<Error>());

        if !wraps_ours {
            return Error::Io(err);
        }

        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Error::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
            None => Error::malformed("lost wrapped error"),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Error;

    use std::io;

    #[test]
    fn io_round_trip_keeps_variant() {
        let io_err: io::Error = Error::HeaderSectionTooLarge { limit: 12 }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        match Error::from(io_err) {
            Error::HeaderSectionTooLarge { limit } => assert_eq!(limit, 12),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn plain_io_error_stays_io() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));

        match err {
            Error::Io(ref inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
            ref other => panic!("unexpected error: {:?}", other),
        }

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
    }
}
