// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! A single item of a `multipart/form-data` request.

use mime::Mime;

use super::body::PartBodyStream;
use super::headers::PartHeaders;
use super::upload::SizeLimited;

use crate::error::{Error, Result};

use std::fmt;
use std::io::{self, BufRead, Read};

/// A field or file in a multipart request, readable as a stream of its body.
///
/// Items borrow the iterator that produced them; any bytes left unread are discarded when the
/// next item is requested.
pub struct Item<'a, R: 'a> {
    field_name: String,
    file_name: Option<String>,
    content_type: Option<Mime>,
    headers: PartHeaders,
    body: PartBodyStream<'a, SizeLimited<R>>,
    size_max: Option<u64>,
}

impl<'a, R: Read + 'a> Item<'a, R> {
    pub(crate) fn new(
        field_name: String,
        file_name: Option<String>,
        headers: PartHeaders,
        body: PartBodyStream<'a, SizeLimited<R>>,
        size_max: Option<u64>,
    ) -> Result<Self> {
        if let (Some(permitted), Some(declared)) = (size_max, headers.content_length()) {
            if declared > permitted {
                debug!("field {:?} declares {} bytes, permitted {}", field_name, declared, permitted);

                return Err(Error::FileSizeLimitExceeded {
                    field_name: field_name,
                    file_name: file_name,
                    permitted: permitted,
                });
            }
        }

        Ok(Item {
            field_name: field_name,
            file_name: file_name,
            content_type: headers.content_type(),
            headers: headers,
            body: body,
            size_max: size_max,
        })
    }

    /// The name of the form field this item belongs to.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The file name supplied by the client, if this item is a file.
    ///
    /// ### Warning
    /// You should treat this value as untrustworthy because it is an arbitrary string provided by
    /// the client. You should *not* blindly append it to a directory path and save the file there,
    /// as such behavior could easily be exploited by a malicious client.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_ref().map(String::as_ref)
    }

    /// The parsed `Content-Type` of the item, if the client sent a valid one.
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// `true` if this item is a plain form field rather than a file.
    pub fn is_form_field(&self) -> bool {
        self.file_name.is_none()
    }

    /// All headers of this item's part.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Body bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.body.bytes_read()
    }

    /// Discard the rest of the body. Further reads fail with `Error::ItemAlreadyConsumed`.
    pub fn close(&mut self) -> Result<()> {
        self.body.close()
    }

    fn check_size(&self) -> Result<()> {
        match self.size_max {
            Some(permitted) if self.body.bytes_read() > permitted => Err(Error::FileSizeLimitExceeded {
                field_name: self.field_name.clone(),
                file_name: self.file_name.clone(),
                permitted: permitted,
            }),
            _ => Ok(()),
        }
    }
}

impl<'a, R: Read + 'a> Read for Item<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.body.read(buf)?;
        self.check_size()?;
        Ok(read)
    }
}

impl<'a, R: Read + 'a> BufRead for Item<'a, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.check_size()?;
        self.body.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.body.consume(amt)
    }
}

impl<'a, R: 'a> fmt::Debug for Item<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Item")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish()
    }
}
