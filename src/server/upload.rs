// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Request-level parsing: limits, item iteration, and nested `multipart/mixed` parts.

use super::buf_read::DEFAULT_BUF_SIZE;
use super::field::Item;
use super::headers::{boundary_from_content_type, is_multipart_mixed, Charset, PartHeaders};
use super::progress::{ProgressListener, ProgressNotifier};
use super::save::{FileItemFactory, FileItemInfo, FileItemSink};
use super::stream::{MultipartStream, DEFAULT_HEADER_SIZE_MAX};

use crate::error::{Error, Result};

use std::fmt;
use std::io::{self, Read};
use std::rc::Rc;

/// Configuration for parsing `multipart/form-data` requests.
///
/// ### Limits
/// All limits are off by default except the per-part header limit of 10 KiB. Each setter takes
/// either a value or an `Option`; `None` clears the limit.
///
/// * `size_max()` bounds the whole request body.
/// * `file_size_max()` bounds every single item.
/// * `file_count_max()` bounds the number of items, form fields included.
/// * `header_size_max()` bounds the header section of each part.
#[derive(Clone)]
pub struct FileUpload {
    size_max: Option<u64>,
    file_size_max: Option<u64>,
    file_count_max: Option<usize>,
    header_size_max: Option<usize>,
    buffer_size: usize,
    header_charset: Charset,
    listener: Option<Rc<dyn ProgressListener>>,
}

impl Default for FileUpload {
    fn default() -> Self {
        FileUpload {
            size_max: None,
            file_size_max: None,
            file_count_max: None,
            header_size_max: Some(DEFAULT_HEADER_SIZE_MAX),
            buffer_size: DEFAULT_BUF_SIZE,
            header_charset: Charset::Utf8,
            listener: None,
        }
    }
}

impl FileUpload {
    /// A configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum size of the request body.
    pub fn size_max<L: Into<Option<u64>>>(&mut self, limit: L) -> &mut Self {
        self.size_max = limit.into();
        self
    }

    /// Set the maximum size of a single item.
    pub fn file_size_max<L: Into<Option<u64>>>(&mut self, limit: L) -> &mut Self {
        self.file_size_max = limit.into();
        self
    }

    /// Set the maximum number of items.
    pub fn file_count_max<L: Into<Option<usize>>>(&mut self, limit: L) -> &mut Self {
        self.file_count_max = limit.into();
        self
    }

    /// Set the maximum size of one part's header section.
    pub fn header_size_max<L: Into<Option<usize>>>(&mut self, limit: L) -> &mut Self {
        self.header_size_max = limit.into();
        self
    }

    /// Set the requested scan buffer size.
    pub fn buffer_size(&mut self, size: usize) -> &mut Self {
        self.buffer_size = size;
        self
    }

    /// Set the charset used to decode part headers, e.g. the request's character encoding.
    pub fn header_encoding(&mut self, label: &str) -> &mut Self {
        self.header_charset = Charset::from_label(label);
        self
    }

    /// Report parsing progress to `listener`.
    pub fn progress_listener<L: ProgressListener + 'static>(&mut self, listener: L) -> &mut Self {
        self.listener = Some(Rc::new(listener));
        self
    }

    /// Start iterating over the items of a request body.
    ///
    /// `content_type` is the request's `Content-Type` header and must be a `multipart/*` type
    /// with a boundary. `content_length` is the declared body size, if known; a declared size
    /// above `size_max` is rejected before anything is read.
    pub fn item_iter<R: Read>(&self, body: R, content_type: &str, content_length: Option<u64>)
        -> Result<ItemIter<R>> {
        let boundary = boundary_from_content_type(content_type)?;

        if let (Some(permitted), Some(actual)) = (self.size_max, content_length) {
            if actual > permitted {
                return Err(Error::SizeLimitExceeded {
                    actual: actual,
                    permitted: permitted,
                });
            }
        }

        let notifier = ProgressNotifier::new(self.listener.clone(), content_length);
        let source = SizeLimited::new(body, self.size_max);

        let mut stream = MultipartStream::with_notifier(source, &boundary, self.buffer_size, notifier)?;
        stream.set_header_size_max(self.header_size_max);

        Ok(ItemIter {
            stream: stream,
            boundary: boundary,
            nested_field: None,
            skip_preamble: true,
            eof: false,
            file_size_max: self.file_size_max,
            file_count_max: self.file_count_max,
            header_charset: self.header_charset,
            items: 0,
        })
    }

    /// Read the whole request, storing every item in a sink created by `factory`.
    ///
    /// Items already stored are dropped if an error occurs.
    pub fn parse_request<R, F>(&self, body: R, content_type: &str, content_length: Option<u64>, factory: &F)
        -> Result<Vec<<F::Sink as FileItemSink>::Item>>
        where R: Read, F: FileItemFactory {
        let mut iter = self.item_iter(body, content_type, content_length)?;
        let mut items = Vec::new();

        while let Some(mut item) = iter.next_item()? {
            let info = FileItemInfo::from_item(&item);
            let mut sink = factory.create_sink(&info)?;

            io::copy(&mut item, &mut sink)?;
            items.push(sink.finish()?);
        }

        Ok(items)
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("size_max", &self.size_max)
            .field("file_size_max", &self.file_size_max)
            .field("file_count_max", &self.file_count_max)
            .field("header_size_max", &self.header_size_max)
            .field("buffer_size", &self.buffer_size)
            .field("header_charset", &self.header_charset)
            .finish()
    }
}

/// Yields the items of a multipart request in the order they arrive.
///
/// This cannot implement `Iterator` because each item borrows the iterator; use
/// `while let Some(item) = iter.next_item()? { .. }` instead.
pub struct ItemIter<R> {
    stream: MultipartStream<SizeLimited<R>>,
    boundary: Vec<u8>,
    nested_field: Option<String>,
    skip_preamble: bool,
    eof: bool,
    file_size_max: Option<u64>,
    file_count_max: Option<usize>,
    header_charset: Charset,
    items: usize,
}

impl<R: Read> ItemIter<R> {
    /// Advance to the next item, discarding whatever is left of the previous one.
    ///
    /// Returns `Ok(None)` once the closing delimiter has been read. Parts that carry no usable
    /// `Content-Disposition` are skipped.
    pub fn next_item(&mut self) -> Result<Option<Item<R>>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            let more = if self.skip_preamble {
                self.skip_preamble = false;
                self.stream.skip_preamble()?
            } else {
                self.stream.read_boundary()?
            };

            if !more {
                match self.nested_field.take() {
                    Some(field_name) => {
                        debug!("end of nested parts for field {:?}", field_name);
                        self.stream.set_boundary(&self.boundary)?;
                        continue;
                    }
                    None => {
                        self.eof = true;
                        return Ok(None);
                    }
                }
            }

            let raw = self.stream.read_headers()?;
            let headers = PartHeaders::parse(&raw, self.header_charset)?;

            let (field_name, file_name) = match self.nested_field {
                None => match headers.field_name() {
                    Some(field_name) => {
                        if let Some(nested) = headers.content_type().filter(is_multipart_mixed) {
                            let boundary = boundary_from_content_type(nested.as_ref())?;
                            debug!("field {:?} holds nested parts", field_name);

                            self.stream.set_boundary(&boundary)?;
                            self.nested_field = Some(field_name);
                            self.skip_preamble = true;
                            continue;
                        }

                        (field_name, headers.file_name())
                    }
                    None => {
                        warn!("skipping part without a form-data field name: {:?}", headers);
                        continue;
                    }
                },
                Some(ref field_name) => match headers.file_name() {
                    Some(file_name) => (field_name.clone(), Some(file_name)),
                    None => {
                        warn!("skipping nested part without a file name: {:?}", headers);
                        continue;
                    }
                },
            };

            return self.open_item(field_name, file_name, headers).map(Some);
        }
    }

    /// The number of items returned so far.
    pub fn items(&self) -> usize {
        self.items
    }

    fn open_item(&mut self, field_name: String, file_name: Option<String>, headers: PartHeaders)
        -> Result<Item<R>> {
        if let Some(permitted) = self.file_count_max {
            if self.items >= permitted {
                return Err(Error::FileCountLimitExceeded { permitted: permitted });
            }
        }

        self.items += 1;
        self.stream.notifier_mut().note_item();

        debug!("item {}: field {:?}, file {:?}", self.items, field_name, file_name);

        Item::new(field_name, file_name, headers, self.stream.body_stream(), self.file_size_max)
    }
}

/// A reader failing with `Error::SizeLimitExceeded` once more than `limit` bytes are read.
#[derive(Debug)]
pub struct SizeLimited<R> {
    inner: R,
    read: u64,
    limit: Option<u64>,
}

impl<R> SizeLimited<R> {
    /// Wrap `inner`; `None` means no limit.
    pub fn new(inner: R, limit: Option<u64>) -> Self {
        SizeLimited {
            inner: inner,
            read: 0,
            limit: limit,
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl<R: Read> Read for SizeLimited<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.read += read as u64;

        match self.limit {
            Some(permitted) if self.read > permitted => Err(Error::SizeLimitExceeded {
                actual: self.read,
                permitted: permitted,
            }.into()),
            _ => Ok(read),
        }
    }
}
