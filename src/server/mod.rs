// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Streaming parser for `multipart/form-data` request bodies.
//!
//! `MultipartStream` is the low-level reader: it finds delimiters, hands out raw header
//! sections and streams part bodies without buffering them. `FileUpload` builds on it,
//! turning parts into `Item`s, applying size and count limits and flattening nested
//! `multipart/mixed` file lists.
//!
//! See the `FileUpload` struct for more info.

#[doc(inline)]
pub use self::boundary::BoundaryMatcher;

#[doc(inline)]
pub use self::buf_read::BufferedScanner;

pub use self::body::PartBodyStream;

pub use self::field::Item;

pub use self::headers::{boundary_from_content_type, Charset, ContentDisposition, PartHeaders};

pub use self::progress::{ProgressListener, ProgressNotifier};

pub use self::save::{
    DiskFileItem, DiskFileItemFactory, FileItemFactory, FileItemInfo, FileItemSink,
    MemoryFileItem, MemoryFileItemFactory,
};

pub use self::stream::MultipartStream;

pub use self::upload::{FileUpload, ItemIter, SizeLimited};

mod body;
mod boundary;
mod buf_read;
mod field;
pub mod headers;
mod progress;
pub mod save;
pub mod stream;
mod upload;
