// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Dump the items of a `multipart/form-data` body stored in a file.
//!
//! Usage: `multipart_dump <boundary> <file>`
#[macro_use]
extern crate log;
extern crate fileupload;
extern crate rand;

use log::{LevelFilter, Log, Metadata, Record};

use fileupload::server::FileUpload;

use rand::rngs::ThreadRng;
use rand::Rng;

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::process;

const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LOG_LEVEL);
    }

    let mut args = env::args().skip(1);

    let (boundary, path) = match (args.next(), args.next()) {
        (Some(boundary), Some(path)) => (boundary, path),
        _ => {
            eprintln!("usage: multipart_dump <boundary> <file>");
            process::exit(2);
        }
    };

    if let Err(err) = dump(&boundary, &path) {
        error!("{}", err);
        process::exit(1);
    }
}

fn dump(boundary: &str, path: &str) -> fileupload::Result<()> {
    let file = File::open(path)?;
    let content_length = file.metadata()?.len();

    let reader = RandomReader {
        inner: file,
        rng: rand::thread_rng(),
    };

    let content_type = format!("multipart/form-data; boundary={}", boundary);
    let upload = FileUpload::new();
    let mut items = upload.item_iter(reader, &content_type, Some(content_length))?;

    while let Some(mut item) = items.next_item()? {
        let size = io::copy(&mut item, &mut io::sink())?;

        println!("Read item: {:?} (file: {:?}, type: {:?}, {} bytes)",
                 item.field_name(), item.file_name(), item.content_type(), size);
    }

    println!("All items read!");
    Ok(())
}

/// Hands out file contents in random-sized pieces, like a network connection.
struct RandomReader<R> {
    inner: R,
    rng: ThreadRng,
}

impl<R: Read> Read for RandomReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.len() == 0 {
            debug!("RandomReader::read() passed a zero-sized buffer.");
            return Ok(0);
        }

        let len = self.rng.gen_range(1..=buf.len());

        self.inner.read(&mut buf[..len])
    }
}
