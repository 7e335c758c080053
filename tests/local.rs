#[macro_use]
extern crate log;
extern crate env_logger;

extern crate fileupload;
extern crate rand;

use fileupload::mock::{ChunkedReader, FormBuilder};
use fileupload::server::{DiskFileItemFactory, FileUpload, MultipartStream};
use fileupload::Error;

use rand::Rng;

use std::io::prelude::*;

#[derive(Debug, PartialEq)]
struct Field {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

fn init_log() {
    let _ = env_logger::try_init();
}

fn random_fields() -> Vec<Field> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(1..=8);

    (0..count).map(|i| {
        let len = rng.gen_range(0..=3000);
        let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

        if rng.gen() {
            Field {
                name: format!("file{}", i),
                file_name: Some(format!("{}.bin", fileupload::random_alphanumeric(8))),
                data: data,
            }
        } else {
            Field {
                name: format!("text{}", i),
                file_name: None,
                data: fileupload::random_alphanumeric(len % 200).into_bytes(),
            }
        }
    }).collect()
}

fn build(fields: &[Field]) -> FormBuilder {
    let mut form = FormBuilder::new();

    for field in fields {
        match field.file_name {
            Some(ref file_name) => form.file(&field.name, file_name, "application/octet-stream", &field.data),
            None => form.text(&field.name, &String::from_utf8_lossy(&field.data)),
        };
    }

    form
}

#[test]
fn local_test() {
    init_log();

    for &buffer_size in &[1, 64, 1000, 4096] {
        let fields = random_fields();
        let form = build(&fields);
        let body = form.finish();

        debug!("buffer size {}, {} fields, {} bytes", buffer_size, fields.len(), body.len());

        let mut upload = FileUpload::new();
        upload.buffer_size(buffer_size);

        let mut items = upload.item_iter(ChunkedReader::random(&body), &form.content_type(), None).unwrap();
        let mut parsed = Vec::new();

        while let Some(mut item) = items.next_item().unwrap() {
            let mut data = Vec::new();
            item.read_to_end(&mut data).unwrap();

            parsed.push(Field {
                name: item.field_name().to_owned(),
                file_name: item.file_name().map(str::to_owned),
                data: data,
            });
        }

        assert_eq!(parsed, fields);
    }
}

const BROWSER_BODY: &[u8] = b"This is the preamble.  It is to be ignored.\r\n\
--AaB03x\r\n\
content-disposition: form-data; name=\"field1\"\r\n\
\r\n\
Joe Blow\r\nalmost --AaB03 but not quite\r\n\
--AaB03x\r\n\
content-disposition: form-data; name=\"pics\"; filename=\"file1.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
... contents of file1.txt ...\r\n\
--AaB03x--\r\n\
This is the epilogue.  It is also to be ignored.\r\n";

#[test]
fn stream_walk() {
    init_log();

    for chunk in 1..BROWSER_BODY.len() + 1 {
        let mut stream = MultipartStream::with_buffer_size(ChunkedReader::fixed(BROWSER_BODY, chunk), b"AaB03x", 0)
            .unwrap();

        assert!(stream.skip_preamble().unwrap());
        assert_eq!(stream.read_headers().unwrap(), b"content-disposition: form-data; name=\"field1\"\r\n\r\n".to_vec());

        let mut first = Vec::new();
        stream.read_body_data(&mut first).unwrap();
        assert_eq!(first, b"Joe Blow\r\nalmost --AaB03 but not quite".to_vec());

        assert!(stream.read_boundary().unwrap());
        stream.read_headers().unwrap();
        assert_eq!(stream.discard_body_data().unwrap(), 29);

        assert!(!stream.read_boundary().unwrap());
    }
}

#[test]
fn upload_skips_preamble_and_epilogue() {
    init_log();

    let items = FileUpload::new()
        .parse_request(ChunkedReader::random(BROWSER_BODY), "multipart/form-data; boundary=AaB03x", None,
                       &DiskFileItemFactory::new())
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text().unwrap(), "Joe Blow\r\nalmost --AaB03 but not quite");
    assert_eq!(items[1].file_name(), Some("file1.txt"));
    assert_eq!(items[1].get().unwrap(), b"... contents of file1.txt ...".to_vec());
}

#[test]
fn large_files_spill_to_disk() {
    init_log();

    let dir = tempfile::tempdir().unwrap();
    let big: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    let mut form = FormBuilder::new();
    form.text("note", "small").file("big", "big.dat", "application/octet-stream", &big);
    let body = form.finish();

    let mut factory = DiskFileItemFactory::new();
    factory.repository(dir.path());

    let items = FileUpload::new()
        .parse_request(ChunkedReader::random(&body), &form.content_type(), Some(body.len() as u64), &factory)
        .unwrap();

    assert!(items[0].is_in_memory());
    assert!(!items[1].is_in_memory());
    assert_eq!(items[1].size(), big.len() as u64);
    assert_eq!(items[1].get().unwrap(), big);
}

#[test]
fn truncated_bodies_are_malformed() {
    init_log();

    let mut form = FormBuilder::with_boundary("cut-here");
    form.text("a", "first").file("b", "b.txt", "text/plain", b"second body");
    let body = form.finish();

    // Cut inside the headers, the body and the closing delimiter.
    for &end in &[30, body.len() - 20, body.len() - 6] {
        let result: Result<(), Error> = (|| {
            let upload = FileUpload::new();
            let mut items = upload.item_iter(&body[..end], &form.content_type(), None)?;

            while let Some(mut item) = items.next_item()? {
                item.read_to_end(&mut Vec::new())?;
            }

            Ok(())
        })();

        match result {
            Err(ref err) if err.is_malformed() => (),
            other => panic!("cut at {}: unexpected result {:?}", end, other),
        }
    }
}

#[test]
fn request_limit_from_streamed_bytes() {
    init_log();

    let mut form = FormBuilder::new();
    form.file("f", "f.bin", "application/octet-stream", &[1u8; 5000]);
    let body = form.finish();

    let mut upload = FileUpload::new();
    upload.size_max(4096);

    match upload.parse_request(ChunkedReader::random(&body), &form.content_type(), None, &DiskFileItemFactory::new()) {
        Err(Error::SizeLimitExceeded { permitted: 4096, .. }) => (),
        other => panic!("unexpected result: {:?}", other.map(|items| items.len())),
    }
}

#[test]
fn header_section_filling_the_buffer() {
    init_log();

    let capacity = 4096;
    let fixed = "--edge\r\n".len() + "Content-Disposition: form-data; name=\"\"".len() + "\r\n\r\n".len();
    let name = "n".repeat(capacity - fixed);

    let mut form = FormBuilder::with_boundary("edge");
    form.text(&name, "value").text("after", "more");
    let body = form.finish();

    let mut upload = FileUpload::new();
    upload.buffer_size(capacity);

    let mut items = upload.item_iter(&body[..], &form.content_type(), None).unwrap();
    let mut parsed = Vec::new();

    while let Some(mut item) = items.next_item().unwrap() {
        let mut value = String::new();
        item.read_to_string(&mut value).unwrap();
        parsed.push((item.field_name().to_owned(), value));
    }

    assert_eq!(parsed, vec![(name, "value".to_owned()), ("after".to_owned(), "more".to_owned())]);
}
