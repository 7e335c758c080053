// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Progress reporting for long-running uploads.

use std::fmt;
use std::rc::Rc;

/// Receives progress updates while a request body is being parsed.
///
/// Called synchronously from the parsing thread, after each read from the underlying source
/// and each time a new item is started.
pub trait ProgressListener {
    /// `bytes_read` counts the raw body bytes consumed so far, `content_length` is the declared
    /// request size if known, and `items` is the number of the item currently being read
    /// (zero before the first one).
    fn update(&self, bytes_read: u64, content_length: Option<u64>, items: usize);
}

impl<F> ProgressListener for F where F: Fn(u64, Option<u64>, usize) {
    fn update(&self, bytes_read: u64, content_length: Option<u64>, items: usize) {
        self(bytes_read, content_length, items)
    }
}

/// Accumulates byte and item counts and forwards them to an optional `ProgressListener`.
#[derive(Clone, Default)]
pub struct ProgressNotifier {
    listener: Option<Rc<dyn ProgressListener>>,
    content_length: Option<u64>,
    bytes_read: u64,
    items: usize,
}

impl ProgressNotifier {
    /// A notifier forwarding to `listener`.
    pub fn new(listener: Option<Rc<dyn ProgressListener>>, content_length: Option<u64>) -> Self {
        ProgressNotifier {
            listener: listener,
            content_length: content_length,
            bytes_read: 0,
            items: 0,
        }
    }

    /// Record `count` more bytes read from the source.
    pub fn note_bytes_read(&mut self, count: usize) {
        self.bytes_read += count as u64;
        self.notify();
    }

    /// Record the start of a new item.
    pub fn note_item(&mut self) {
        self.items += 1;
        self.notify();
    }

    /// Bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Items started so far.
    pub fn items(&self) -> usize {
        self.items
    }

    fn notify(&self) {
        if let Some(ref listener) = self.listener {
            listener.update(self.bytes_read, self.content_length, self.items);
        }
    }
}

impl fmt::Debug for ProgressNotifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProgressNotifier")
            .field("listener", &self.listener.is_some())
            .field("content_length", &self.content_length)
            .field("bytes_read", &self.bytes_read)
            .field("items", &self.items)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{ProgressListener, ProgressNotifier};

    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn forwards_running_totals() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let listener: Rc<dyn ProgressListener> = Rc::new(move |read: u64, len: Option<u64>, items: usize| {
            sink.borrow_mut().push((read, len, items));
        });

        let mut notifier = ProgressNotifier::new(Some(listener), Some(100));
        notifier.note_bytes_read(10);
        notifier.note_item();
        notifier.note_bytes_read(5);

        assert_eq!(notifier.bytes_read(), 15);
        assert_eq!(notifier.items(), 1);
        assert_eq!(*seen.borrow(), vec![(10, Some(100), 0), (10, Some(100), 1), (15, Some(100), 1)]);
    }

    #[test]
    fn silent_without_listener() {
        let mut notifier = ProgressNotifier::default();
        notifier.note_bytes_read(3);
        assert_eq!(notifier.bytes_read(), 3);
    }
}
