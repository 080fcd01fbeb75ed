//! K-way page merger.

use std::io::{self, prelude::*};

use log;

use crate::page::{Page, PageCursor, INT_SIZE};
use crate::run::Run;

/// Selects the input holding the smallest head value.
/// Exhausted inputs are passed as [`None`] and skipped. On ties the input with the highest index wins.
/// Returns [`None`] if every input is exhausted.
pub fn select_min<I>(heads: I) -> Option<usize>
where
    I: IntoIterator<Item = Option<i32>>,
{
    let mut selected: Option<(usize, i32)> = None;
    for (idx, head) in heads.into_iter().enumerate() {
        if let Some(value) = head {
            match selected {
                Some((_, low)) if value > low => {}
                _ => selected = Some((idx, value)),
            }
        }
    }

    return selected.map(|(idx, _)| idx);
}

/// Read state of a single merge input.
#[derive(Default)]
struct StreamSlot {
    /// Read cursor, private to the run being consumed.
    cursor: PageCursor,
    /// Byte offset the run ends at.
    end: u64,
    /// Position of the head value in the slot page.
    index: usize,
    exhausted: bool,
}

impl StreamSlot {
    fn open(&mut self, run: &Run) {
        self.cursor = PageCursor::new(run.byte_offset());
        self.end = run.byte_end();
        self.index = 0;
        self.exhausted = false;
    }

    fn close(&mut self) {
        self.exhausted = true;
    }

    /// Loads the next page of the run, or marks the slot exhausted if the run has been consumed.
    fn refill<R: Read + Seek>(&mut self, source: &mut R, page: &mut Page) -> io::Result<()> {
        self.index = 0;
        if page.read_from(source, &mut self.cursor, self.end)? == 0 {
            self.exhausted = true;
        }

        return Ok(());
    }

    fn head(&self, page: &Page) -> Option<i32> {
        if self.exhausted {
            None
        } else {
            Some(page.as_slice()[self.index])
        }
    }
}

/// K-way merger. Merges groups of up to *k* sorted runs of a source file into single runs of a
/// destination file, where *k* is the number of input pages.
///
/// Head selection scans all *k* inputs, so a pass costs *m* \* *k* comparisons where *m* is
/// the number of items.
pub struct KWayMerger<'p> {
    inputs: &'p mut [Page],
    output: &'p mut Page,
    slots: Vec<StreamSlot>,
}

impl<'p> KWayMerger<'p> {
    /// Creates a merger using `inputs` as stream pages and `output` as the output page.
    ///
    /// # Arguments
    /// * `inputs` - One page per merged stream, determines the fan-in
    /// * `output` - Page collecting merged values before they are written out
    pub fn new(inputs: &'p mut [Page], output: &'p mut Page) -> Self {
        let slots = Vec::from_iter(inputs.iter().map(|_| StreamSlot::default()));

        return KWayMerger { inputs, output, slots };
    }

    /// Returns the number of runs merged at once.
    pub fn fan_in(&self) -> usize {
        self.inputs.len()
    }

    /// Merges every consecutive group of up to *k* runs of `source` into one run of `dest`.
    /// Writing starts at the beginning of `dest`. Returns the merged runs.
    ///
    /// `source` and `dest` must be different files.
    pub fn merge_pass<R, W>(&mut self, source: &mut R, runs: &[Run], dest: &mut W) -> io::Result<Vec<Run>>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        if self.fan_in() == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "merger has no input pages"));
        }

        let mut cursor = PageCursor::new(0);
        let mut merged = Vec::with_capacity((runs.len() + self.fan_in() - 1) / self.fan_in());

        for group in runs.chunks(self.fan_in()) {
            let run = self.merge_group(source, group, dest, &mut cursor)?;
            log::trace!("merged {} runs into run {:?}", group.len(), run);
            merged.push(run);
        }

        return Ok(merged);
    }

    fn merge_group<R, W>(&mut self, source: &mut R, group: &[Run], dest: &mut W, cursor: &mut PageCursor) -> io::Result<Run>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let start = cursor.offset();
        self.output.clear();

        for (idx, (slot, page)) in self.slots.iter_mut().zip(self.inputs.iter_mut()).enumerate() {
            match group.get(idx) {
                Some(run) => {
                    slot.open(run);
                    slot.refill(source, page)?;
                }
                None => slot.close(),
            }
        }

        loop {
            let heads = self.slots.iter().zip(self.inputs.iter()).map(|(slot, page)| slot.head(page));
            let idx = match select_min(heads) {
                Some(idx) => idx,
                None => break,
            };

            let slot = &mut self.slots[idx];
            let page = &mut self.inputs[idx];

            self.output.push(page.as_slice()[slot.index]);
            slot.index += 1;
            if slot.index == page.len() {
                slot.refill(source, page)?;
            }

            if self.output.is_full() {
                self.output.write_to(dest, cursor)?;
                self.output.clear();
            }
        }

        self.output.write_to(dest, cursor)?;
        self.output.clear();

        let len = (cursor.offset() - start) / INT_SIZE as u64;
        return Ok(Run::new(start / INT_SIZE as u64, len));
    }
}
