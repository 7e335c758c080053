#![no_main]
use libfuzzer_sys::fuzz_target;

use fileupload::mock::ChunkedReader;
use fileupload::server::FileUpload;

use std::io;

const CONTENT_TYPE: &str = "multipart/form-data; boundary=--12--34--56";

fuzz_target!(|data: &[u8]| {
    if data.is_empty() { return; }

    // The first byte picks the read size, the rest is the body.
    let (chunk, body) = (data[0] as usize, &data[1..]);

    let mut upload = FileUpload::new();
    upload.buffer_size(chunk).header_size_max(1024).file_count_max(64);

    let mut items = upload.item_iter(ChunkedReader::fixed(body, chunk), CONTENT_TYPE, None)
        .expect("boundary is valid");

    // A lot of requests will be malformed
    while let Ok(Some(mut item)) = items.next_item() {
        if io::copy(&mut item, &mut io::sink()).is_err() {
            break;
        }
    }
});
