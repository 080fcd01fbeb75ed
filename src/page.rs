//! Page buffers and cursors.

use std::cmp;
use std::io::{self, prelude::*, SeekFrom};

use byteorder::{BigEndian, ByteOrder};

/// Size of a single serialized integer in bytes.
pub const INT_SIZE: usize = 4;

/// Byte-offset cursor into a random-access file.
///
/// The cursor is independent of the file's own position: every page operation seeks to
/// the cursor offset first and advances the cursor by what was transferred.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    offset: u64,
}

impl PageCursor {
    pub fn new(offset: u64) -> Self {
        PageCursor { offset }
    }

    /// Returns the current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Moves the cursor forward by `bytes`.
    pub fn advance(&mut self, bytes: u64) {
        self.offset += bytes;
    }
}

/// Fixed-capacity page of integers. The unit of I/O and of in-memory sort.
///
/// A page read at the end of a file or a run holds fewer than `capacity` values; only the first
/// [`Page::len`] slots are meaningful and only those are written back.
pub struct Page {
    items: Vec<i32>,
    len: usize,
    raw: Vec<u8>,
}

impl Page {
    /// Allocates a page able to hold `capacity` integers.
    pub fn new(capacity: usize) -> Self {
        Page {
            items: vec![0; capacity],
            len: 0,
            raw: vec![0; capacity * INT_SIZE],
        }
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Returns the number of values the page holds.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checks if the page reached its capacity.
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity()
    }

    /// Appends a value to the page. The page must not be full.
    pub fn push(&mut self, item: i32) {
        debug_assert!(!self.is_full(), "push to a full page");
        self.items[self.len] = item;
        self.len += 1;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.items[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.items[..self.len]
    }

    /// Fills the page from `source` starting at the cursor offset.
    /// Reads at most `capacity` integers and never reads at or past the byte offset `end`.
    /// Returns the number of integers read, zero if the cursor already reached `end`.
    ///
    /// # Arguments
    /// * `source` - Random-access source to read from
    /// * `cursor` - Read cursor, advanced past the consumed bytes
    /// * `end` - Exclusive byte offset the read is bounded by
    pub fn read_from<R: Read + Seek>(&mut self, source: &mut R, cursor: &mut PageCursor, end: u64) -> io::Result<usize> {
        let available = end.saturating_sub(cursor.offset()) / INT_SIZE as u64;
        let count = cmp::min(available, self.capacity() as u64) as usize;

        self.len = count;
        if count == 0 {
            return Ok(0);
        }

        let bytes = count * INT_SIZE;
        source.seek(SeekFrom::Start(cursor.offset()))?;
        source.read_exact(&mut self.raw[..bytes])?;
        BigEndian::read_i32_into(&self.raw[..bytes], &mut self.items[..count]);
        cursor.advance(bytes as u64);

        return Ok(count);
    }

    /// Writes the page values to `sink` at the cursor offset and advances the cursor.
    pub fn write_to<W: Write + Seek>(&mut self, sink: &mut W, cursor: &mut PageCursor) -> io::Result<()> {
        if self.len == 0 {
            return Ok(());
        }

        let bytes = self.len * INT_SIZE;
        BigEndian::write_i32_into(&self.items[..self.len], &mut self.raw[..bytes]);
        sink.seek(SeekFrom::Start(cursor.offset()))?;
        sink.write_all(&self.raw[..bytes])?;
        cursor.advance(bytes as u64);

        return Ok(());
    }
}

/// Bounded pool of equally sized pages, allocated once per sort and reused by every pass.
pub struct PagePool {
    pages: Vec<Page>,
}

impl PagePool {
    /// Allocates `buffers` pages of `page_size` integers each.
    pub fn new(buffers: usize, page_size: usize) -> Self {
        PagePool {
            pages: Vec::from_iter((0..buffers).map(|_| Page::new(page_size))),
        }
    }

    /// Returns the number of pages in the pool.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Returns the page used by the partial sort pass.
    pub fn working_page(&mut self) -> Option<&mut Page> {
        self.pages.first_mut()
    }

    /// Splits the pool into merge input pages and a single output page.
    pub fn merge_pages(&mut self) -> Option<(&mut [Page], &mut Page)> {
        let (output, inputs) = self.pages.split_last_mut()?;
        return Some((inputs, output));
    }
}
