// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Storage for parsed items, in memory or spilled to temporary files.
//!
//! `FileUpload::parse_request()` asks a `FileItemFactory` for one sink per item, copies the
//! item's body into it and collects whatever the sink's `finish()` returns.

use mime::Mime;
use tempfile::{Builder, NamedTempFile};

use super::field::Item;
use super::headers::{Charset, PartHeaders};

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Items up to this size are kept in memory by `DiskFileItemFactory`.
pub const DEFAULT_SIZE_THRESHOLD: usize = 10 * 1024;

const TEMP_FILE_PREFIX: &str = "upload_";
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// What is known about an item before its body is read.
#[derive(Clone, Debug, PartialEq)]
pub struct FileItemInfo {
    /// The form field name.
    pub field_name: String,
    /// The client-supplied file name, `None` for plain form fields.
    pub file_name: Option<String>,
    /// The item's content type.
    ///
    /// Taken from the part headers if present. Otherwise form fields are `text/plain` and files
    /// are guessed from the file name's extension, falling back to `application/octet-stream`.
    pub content_type: Mime,
    /// All headers of the part.
    pub headers: PartHeaders,
}

impl FileItemInfo {
    /// Capture the metadata of `item`.
    pub fn from_item<R: Read>(item: &Item<R>) -> FileItemInfo {
        let content_type = match (item.content_type(), item.file_name()) {
            (Some(mime), _) => mime.clone(),
            (None, Some(file_name)) => mime_guess::from_path(file_name).first_or_octet_stream(),
            (None, None) => mime::TEXT_PLAIN,
        };

        FileItemInfo {
            field_name: item.field_name().to_owned(),
            file_name: item.file_name().map(str::to_owned),
            content_type: content_type,
            headers: item.headers().clone(),
        }
    }

    /// `true` if the item is a plain form field rather than a file.
    pub fn is_form_field(&self) -> bool {
        self.file_name.is_none()
    }

    /// Decode `data` using the `charset` parameter of the content type, UTF-8 if there is none.
    pub fn decode(&self, data: &[u8]) -> String {
        self.content_type.get_param(mime::CHARSET)
            .map_or(Charset::Utf8, |name| Charset::from_label(name.as_str()))
            .decode(data)
    }
}

/// Receives the body of one item.
pub trait FileItemSink: Write {
    /// The stored item.
    type Item;

    /// Called once the whole body has been written.
    fn finish(self) -> io::Result<Self::Item>;
}

/// Creates a sink for every item of a request.
pub trait FileItemFactory {
    /// The sink type created by this factory.
    type Sink: FileItemSink;

    /// Create the sink for the item described by `info`.
    fn create_sink(&self, info: &FileItemInfo) -> io::Result<Self::Sink>;
}

/// Keeps every item in memory.
///
/// Only use this together with `FileUpload::size_max()` or `file_size_max()` when you do not
/// trust the client.
#[derive(Copy, Clone, Debug, Default)]
pub struct MemoryFileItemFactory;

impl FileItemFactory for MemoryFileItemFactory {
    type Sink = MemorySink;

    fn create_sink(&self, info: &FileItemInfo) -> io::Result<MemorySink> {
        Ok(MemorySink {
            info: info.clone(),
            data: Vec::new(),
        })
    }
}

/// Sink of `MemoryFileItemFactory`.
#[derive(Debug)]
pub struct MemorySink {
    info: FileItemInfo,
    data: Vec<u8>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileItemSink for MemorySink {
    type Item = MemoryFileItem;

    fn finish(self) -> io::Result<MemoryFileItem> {
        Ok(MemoryFileItem {
            info: self.info,
            data: self.data,
        })
    }
}

/// An item stored in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryFileItem {
    info: FileItemInfo,
    data: Vec<u8>,
}

impl MemoryFileItem {
    /// The item's metadata.
    pub fn info(&self) -> &FileItemInfo {
        &self.info
    }

    /// The form field name.
    pub fn field_name(&self) -> &str {
        &self.info.field_name
    }

    /// The client-supplied file name.
    pub fn file_name(&self) -> Option<&str> {
        self.info.file_name.as_ref().map(String::as_ref)
    }

    /// The item's content type.
    pub fn content_type(&self) -> &Mime {
        &self.info.content_type
    }

    /// `true` if the item is a plain form field.
    pub fn is_form_field(&self) -> bool {
        self.info.is_form_field()
    }

    /// Size of the body in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The body.
    pub fn get(&self) -> &[u8] {
        &self.data
    }

    /// The body decoded as text.
    pub fn text(&self) -> String {
        self.info.decode(&self.data)
    }

    /// Take the body.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Keeps small items in memory and writes larger ones to temporary files.
///
/// Temporary files are deleted when the `DiskFileItem` owning them is dropped, unless
/// `DiskFileItem::persist()` moved them elsewhere first.
#[derive(Clone, Debug)]
pub struct DiskFileItemFactory {
    size_threshold: usize,
    repository: Option<PathBuf>,
}

impl Default for DiskFileItemFactory {
    fn default() -> Self {
        DiskFileItemFactory {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            repository: None,
        }
    }
}

impl DiskFileItemFactory {
    /// A factory with the default threshold, writing to the system's temporary directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Items larger than `threshold` bytes go to disk.
    pub fn size_threshold(&mut self, threshold: usize) -> &mut Self {
        self.size_threshold = threshold;
        self
    }

    /// The directory to create temporary files in.
    pub fn repository<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.repository = Some(dir.into());
        self
    }

    fn temp_file(&self) -> io::Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(TEMP_FILE_SUFFIX);

        match self.repository {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

impl FileItemFactory for DiskFileItemFactory {
    type Sink = ThresholdSink;

    fn create_sink(&self, info: &FileItemInfo) -> io::Result<ThresholdSink> {
        Ok(ThresholdSink {
            info: info.clone(),
            factory: self.clone(),
            storage: Storage::InMemory(Vec::new()),
        })
    }
}

/// Sink of `DiskFileItemFactory`, switching to a temporary file once the threshold is passed.
#[derive(Debug)]
pub struct ThresholdSink {
    info: FileItemInfo,
    factory: DiskFileItemFactory,
    storage: Storage,
}

impl ThresholdSink {
    /// `true` while nothing has been written to disk.
    pub fn is_in_memory(&self) -> bool {
        match self.storage {
            Storage::InMemory(_) => true,
            Storage::OnDisk { .. } => false,
        }
    }

    fn spill(&mut self) -> io::Result<()> {
        let mut file = self.factory.temp_file()?;

        let size = match self.storage {
            Storage::InMemory(ref data) => {
                file.write_all(data)?;
                data.len() as u64
            }
            Storage::OnDisk { .. } => return Ok(()),
        };

        debug!("field {:?} passed {} bytes, writing to {}",
               self.info.field_name, self.factory.size_threshold, file.path().display());

        self.storage = Storage::OnDisk { file: file, size: size };
        Ok(())
    }
}

impl Write for ThresholdSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let spill = match self.storage {
            Storage::InMemory(ref data) => data.len() + buf.len() > self.factory.size_threshold,
            Storage::OnDisk { .. } => false,
        };

        if spill {
            self.spill()?;
        }

        match self.storage {
            Storage::InMemory(ref mut data) => {
                data.extend_from_slice(buf);
                Ok(buf.len())
            }
            Storage::OnDisk { ref mut file, ref mut size } => {
                let written = file.write(buf)?;
                *size += written as u64;
                Ok(written)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.storage {
            Storage::InMemory(_) => Ok(()),
            Storage::OnDisk { ref mut file, .. } => file.flush(),
        }
    }
}

impl FileItemSink for ThresholdSink {
    type Item = DiskFileItem;

    fn finish(mut self) -> io::Result<DiskFileItem> {
        self.flush()?;

        Ok(DiskFileItem {
            info: self.info,
            storage: self.storage,
        })
    }
}

enum Storage {
    InMemory(Vec<u8>),
    OnDisk { file: NamedTempFile, size: u64 },
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Storage::InMemory(ref data) => write!(f, "InMemory({} bytes)", data.len()),
            Storage::OnDisk { ref file, size } => write!(f, "OnDisk({}, {} bytes)", file.path().display(), size),
        }
    }
}

/// An item stored by `DiskFileItemFactory`.
#[derive(Debug)]
pub struct DiskFileItem {
    info: FileItemInfo,
    storage: Storage,
}

impl DiskFileItem {
    /// The item's metadata.
    pub fn info(&self) -> &FileItemInfo {
        &self.info
    }

    /// The form field name.
    pub fn field_name(&self) -> &str {
        &self.info.field_name
    }

    /// The client-supplied file name.
    pub fn file_name(&self) -> Option<&str> {
        self.info.file_name.as_ref().map(String::as_ref)
    }

    /// The item's content type.
    pub fn content_type(&self) -> &Mime {
        &self.info.content_type
    }

    /// `true` if the item is a plain form field.
    pub fn is_form_field(&self) -> bool {
        self.info.is_form_field()
    }

    /// `true` if the body was kept in memory.
    pub fn is_in_memory(&self) -> bool {
        match self.storage {
            Storage::InMemory(_) => true,
            Storage::OnDisk { .. } => false,
        }
    }

    /// Size of the body in bytes.
    pub fn size(&self) -> u64 {
        match self.storage {
            Storage::InMemory(ref data) => data.len() as u64,
            Storage::OnDisk { size, .. } => size,
        }
    }

    /// The temporary file holding the body, if it was written to disk.
    pub fn path(&self) -> Option<&Path> {
        match self.storage {
            Storage::InMemory(_) => None,
            Storage::OnDisk { ref file, .. } => Some(file.path()),
        }
    }

    /// Read the whole body into memory.
    pub fn get(&self) -> io::Result<Vec<u8>> {
        match self.storage {
            Storage::InMemory(ref data) => Ok(data.clone()),
            Storage::OnDisk { ref file, size } => {
                let mut data = Vec::with_capacity(size as usize);
                file.reopen()?.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    /// The body decoded as text.
    pub fn text(&self) -> io::Result<String> {
        self.get().map(|data| self.info.decode(&data))
    }

    /// Move the body to `dest`, replacing any file already there.
    ///
    /// Bodies on disk are renamed if possible; bodies in memory are written out.
    pub fn persist<P: AsRef<Path>>(self, dest: P) -> io::Result<()> {
        match self.storage {
            Storage::InMemory(data) => fs::write(dest, &data),
            Storage::OnDisk { file, .. } => file.persist(dest).map(|_| ()).map_err(io::Error::from),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DiskFileItemFactory, FileItemFactory, FileItemInfo, FileItemSink, MemoryFileItemFactory};

    use crate::mock::FormBuilder;
    use crate::server::{FileUpload, PartHeaders};

    use std::fs;
    use std::io::Write;

    fn info(file_name: Option<&str>, content_type: &str) -> FileItemInfo {
        FileItemInfo {
            field_name: "field".to_owned(),
            file_name: file_name.map(str::to_owned),
            content_type: content_type.parse().unwrap(),
            headers: PartHeaders::default(),
        }
    }

    #[test]
    fn content_type_resolution() {
        let mut form = FormBuilder::new();
        form.text("plain", "v")
            .part("Content-Disposition: form-data; name=\"pic\"; filename=\"cat.png\"", b"png")
            .part("Content-Disposition: form-data; name=\"blob\"; filename=\"noext\"", b"?")
            .file("explicit", "data.png", "application/x-custom", b"c");
        let body = form.finish();

        let items = FileUpload::new()
            .parse_request(&body[..], &form.content_type(), None, &MemoryFileItemFactory)
            .unwrap();

        let types: Vec<_> = items.iter().map(|item| item.content_type().to_string()).collect();
        assert_eq!(types, ["text/plain", "image/png", "application/octet-stream", "application/x-custom"]);
        assert!(items[0].is_form_field());
        assert_eq!(items[1].file_name(), Some("cat.png"));
    }

    #[test]
    fn memory_items() {
        let mut form = FormBuilder::new();
        form.text("greeting", "hello").file("upload", "a.bin", "application/octet-stream", &[0, 1, 2, 3]);
        let body = form.finish();

        let items = FileUpload::new()
            .parse_request(&body[..], &form.content_type(), Some(body.len() as u64), &MemoryFileItemFactory)
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].field_name(), "greeting");
        assert_eq!(items[0].text(), "hello");
        assert_eq!(items[1].get(), &[0, 1, 2, 3]);
        assert_eq!(items[1].size(), 4);
    }

    #[test]
    fn text_uses_declared_charset() {
        let mut sink = MemoryFileItemFactory.create_sink(&info(None, "text/plain; charset=ISO-8859-1")).unwrap();
        sink.write_all(b"caf\xe9").unwrap();
        assert_eq!(sink.finish().unwrap().text(), "caf\u{e9}");

        let mut sink = MemoryFileItemFactory.create_sink(&info(None, "text/plain")).unwrap();
        sink.write_all("caf\u{e9}".as_bytes()).unwrap();
        assert_eq!(sink.finish().unwrap().text(), "caf\u{e9}");
    }

    #[test]
    fn threshold_keeps_small_items_in_memory() {
        let mut factory = DiskFileItemFactory::new();
        factory.size_threshold(4);

        let mut sink = factory.create_sink(&info(Some("x.txt"), "text/plain")).unwrap();
        sink.write_all(b"ab").unwrap();
        sink.write_all(b"cd").unwrap();
        assert!(sink.is_in_memory());

        let item = sink.finish().unwrap();
        assert!(item.is_in_memory());
        assert!(item.path().is_none());
        assert_eq!(item.get().unwrap(), b"abcd".to_vec());
    }

    #[test]
    fn threshold_spills_to_repository() {
        let dir = tempfile::tempdir().unwrap();

        let mut factory = DiskFileItemFactory::new();
        factory.size_threshold(4).repository(dir.path());

        let mut sink = factory.create_sink(&info(Some("x.txt"), "text/plain")).unwrap();
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"defgh").unwrap();
        assert!(!sink.is_in_memory());

        let item = sink.finish().unwrap();
        let temp_path = item.path().unwrap().to_owned();
        assert!(temp_path.starts_with(dir.path()));
        assert_eq!(item.size(), 8);
        assert_eq!(item.text().unwrap(), "abcdefgh");

        let dest = dir.path().join("kept.txt");
        item.persist(&dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "abcdefgh");
        assert!(!temp_path.exists());
    }

    #[test]
    fn dropped_items_remove_temp_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut factory = DiskFileItemFactory::new();
        factory.size_threshold(0).repository(dir.path());

        let mut sink = factory.create_sink(&info(Some("y"), "application/octet-stream")).unwrap();
        sink.write_all(b"z").unwrap();
        let item = sink.finish().unwrap();
        let path = item.path().unwrap().to_owned();
        assert!(path.exists());

        drop(item);
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn in_memory_items_persist() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskFileItemFactory::new().create_sink(&info(None, "text/plain")).unwrap();
        let dest = dir.path().join("empty");

        sink.finish().unwrap().persist(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), Vec::<u8>::new());
    }
}
