//! Sorted runs and sequential access to integer files.

use std::fs;
use std::io::{self, prelude::*};

use byteorder::{BigEndian, ReadBytesExt};

use crate::page::INT_SIZE;

/// Contiguous, internally sorted region of an integer file.
/// Offset and length are measured in integers, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    offset: u64,
    len: u64,
}

impl Run {
    pub fn new(offset: u64, len: u64) -> Self {
        Run { offset, len }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the first integer of the run.
    pub fn byte_offset(&self) -> u64 {
        self.offset * INT_SIZE as u64
    }

    /// Byte offset just past the last integer of the run.
    pub fn byte_end(&self) -> u64 {
        (self.offset + self.len) * INT_SIZE as u64
    }
}

/// Returns the number of integers stored in `byte_len` bytes,
/// or [`None`] if the length is not a multiple of the integer size.
pub fn int_count(byte_len: u64) -> Option<u64> {
    if byte_len % INT_SIZE as u64 == 0 {
        Some(byte_len / INT_SIZE as u64)
    } else {
        None
    }
}

/// Sequential big-endian integer reader limited to a fixed number of bytes.
pub struct IntReader<R: Read> {
    reader: io::Take<R>,
}

impl<R: Read> IntReader<R> {
    /// Creates a reader yielding the integers stored in the first `byte_len` bytes of `reader`.
    pub fn new(reader: R, byte_len: u64) -> Self {
        IntReader {
            reader: reader.take(byte_len),
        }
    }
}

impl IntReader<io::BufReader<fs::File>> {
    /// Opens an integer file for sequential reading.
    ///
    /// # Arguments
    /// * `file` - Integer file, read from the beginning
    /// * `buf_size` - Read buffer size. If the parameter is [`None`] the default buffer size is used.
    pub fn open(mut file: fs::File, buf_size: Option<usize>) -> io::Result<Self> {
        let byte_len = file.metadata()?.len();
        if int_count(byte_len).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file length {} is not a multiple of {}", byte_len, INT_SIZE),
            ));
        }
        file.rewind()?;

        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(IntReader::new(reader, byte_len));
    }
}

impl<R: Read> Iterator for IntReader<R> {
    type Item = io::Result<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.limit() == 0 {
            None
        } else {
            Some(self.reader.read_i32::<BigEndian>())
        }
    }
}

/// Checks that the integers are in non-decreasing order.
/// Empty and single-item inputs are sorted.
pub fn is_sorted<I>(items: I) -> io::Result<bool>
where
    I: IntoIterator<Item = io::Result<i32>>,
{
    let mut prev: Option<i32> = None;
    for item in items {
        let item = item?;
        if let Some(prev) = prev {
            if item < prev {
                return Ok(false);
            }
        }
        prev = Some(item);
    }

    return Ok(true);
}
