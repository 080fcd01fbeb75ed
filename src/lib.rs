//! `page-sort` is a k-way external merge sort of binary integer files.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! The sorter works on flat files of big-endian 32-bit signed integers (no header, length a multiple of 4)
//! using a fixed number of page buffers:
//!
//! * **Partial sort pass:**
//!   the input is read one page at a time, each page is sorted in memory and appended to the output
//!   as an independent run.
//! * **Merge passes:**
//!   groups of up to *k* = `buffers - 1` runs are merged into one run, the remaining buffer collects
//!   merged output. Passes alternate between the output file and a scratch file, so a pass never writes
//!   to the file it reads from.
//! * **Convergence:**
//!   merge passes are repeated until a full scan of the file confirms non-decreasing order.
//!
//! Every `i32` value, including `i32::MIN` and `i32::MAX`, is sorted as ordinary data.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use page_sort::ExternalSorterBuilder;
//!
//! fn main() {
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_buffers(8)
//!         .with_page_size(4096)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort(Path::new("input.bin"), Path::new("output.bin")).unwrap();
//!     println!("{} integers sorted in {} merge passes", summary.items, summary.passes);
//! }
//! ```

pub mod merger;
pub mod page;
pub mod quicksort;
pub mod run;
pub mod sort;

pub use merger::KWayMerger;
pub use page::{Page, PageCursor, PagePool};
pub use run::{IntReader, Run};
pub use sort::{sort_file, ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};
