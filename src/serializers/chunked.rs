use std::{
    fs::File,
    io::{ErrorKind, Read},
    path::Path,
};

use base64::{Engine, engine::general_purpose::STANDARD};

/// Reads an input in fixed size chunks and yields each chunk as its own base64 fragment.
///
/// Every fragment except the last encodes exactly `chunk_size` bytes, so as long as the chunk size is a multiple of 3
/// the fragments can be concatenated into one valid base64 string.
/// Only one chunk is held in memory at a time. The input is dropped with the iterator.
pub struct Base64Chunks<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    finished: bool,
}

impl Base64Chunks<File> {
    /// Opens a file for sequential reading.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> std::io::Result<Self> {
        Ok(Self::new(File::open(path)?, chunk_size))
    }
}

impl<R: Read> Base64Chunks<R> {
    /// Creates a chunk iterator over any reader. A chunk size of zero yields nothing.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0; chunk_size],
            finished: chunk_size == 0,
        }
    }

    /// Fills the buffer as far as possible, returning how many bytes were read.
    fn read_chunk(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;

        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(filled)
    }
}

impl<R: Read> Iterator for Base64Chunks<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_chunk() {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(count) => {
                if count < self.buffer.len() {
                    self.finished = true;
                }
                Some(Ok(STANDARD.encode(&self.buffer[..count])))
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}
