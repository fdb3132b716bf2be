//! A scriptable stream for testing SMTP transactions without a network
// Comes from https://github.com/inre/rust-mq/blob/master/netopt

#![allow(missing_docs)]

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

pub type MockCursor = Cursor<Vec<u8>>;

/// A `Read`/`Write` pair backed by in-memory buffers
///
/// Clones share the same buffers, so a test can keep a handle to inspect
/// what the client wrote while the client owns the stream.
#[derive(Clone, Debug)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
}

impl Default for MockStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStream {
    pub fn new() -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(MockCursor::new(Vec::new()))),
            writer: Arc::new(Mutex::new(MockCursor::new(Vec::new()))),
        }
    }

    /// Creates a stream whose reads are served from `vec`
    pub fn with_vec(vec: Vec<u8>) -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(MockCursor::new(vec))),
            writer: Arc::new(Mutex::new(MockCursor::new(Vec::new()))),
        }
    }

    /// Takes everything written so far, clearing the write buffer
    pub fn take_vec(&mut self) -> Vec<u8> {
        let mut cursor = self.writer.lock().unwrap();
        let vec = cursor.get_ref().to_vec();
        cursor.set_position(0);
        cursor.get_mut().clear();
        vec
    }

    /// Replaces the remaining readable bytes with `vec`
    pub fn next_vec(&mut self, vec: &[u8]) {
        let mut cursor = self.reader.lock().unwrap();
        cursor.set_position(0);
        cursor.get_mut().clear();
        cursor.get_mut().extend_from_slice(vec);
    }
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        self.writer.lock().unwrap().write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.lock().unwrap().flush()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.lock().unwrap().read(buf)
    }
}

#[cfg(test)]
mod test {
    use super::MockStream;
    use std::io::{Read, Write};

    #[test]
    fn write_take_test() {
        let mut mock = MockStream::new();
        mock.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(mock.take_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn read_with_vec_test() {
        let mut mock = MockStream::with_vec(vec![4, 5]);
        let mut vec = Vec::new();
        mock.read_to_end(&mut vec).unwrap();
        assert_eq!(vec, vec![4, 5]);
    }

    #[test]
    fn clone_test() {
        let mock = MockStream::new();
        let mut cloned = mock.clone();
        let mut mock = mock;
        mock.write_all(&[6, 7]).unwrap();
        assert_eq!(cloned.take_vec(), vec![6, 7]);
    }

    #[test]
    fn next_vec_test() {
        let mut mock = MockStream::with_vec(vec![1]);
        let mut vec = Vec::new();
        mock.read_to_end(&mut vec).unwrap();
        mock.next_vec(&[8, 9]);
        let mut vec = Vec::new();
        mock.read_to_end(&mut vec).unwrap();
        assert_eq!(vec, vec![8, 9]);
    }
}
