//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io::{self, prelude::*};
use std::mem;
use std::path::{Path, PathBuf};

use crate::merger::KWayMerger;
use crate::page::{PageCursor, PagePool, INT_SIZE};
use crate::quicksort;
use crate::run::{self, IntReader, Run};

/// Default number of page buffers.
pub const DEFAULT_BUFFERS: usize = 16;
/// Default page size in integers.
pub const DEFAULT_PAGE_SIZE: usize = 1024;
/// Smallest buffer count able to merge: two input pages and one output page.
pub const MIN_BUFFERS: usize = 3;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Common I/O error.
    IO(io::Error),
    /// File length is not a multiple of the integer size.
    InvalidLength { path: PathBuf, len: u64 },
    /// Sorter configuration error.
    InvalidConfig(&'static str),
    /// Merge passes stopped reducing the file to a sorted one.
    NotConverged { runs: usize },
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::IO(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::InvalidLength { path, len } => write!(
                f,
                "file {} length {} is not a multiple of {}",
                path.display(),
                len,
                INT_SIZE
            ),
            SortError::InvalidConfig(msg) => write!(f, "invalid sorter configuration: {}", msg),
            SortError::NotConverged { runs } => write!(f, "merge did not converge ({} runs left)", runs),
        }
    }
}

/// Sorting summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of sorted integers.
    pub items: u64,
    /// Number of runs produced by the partial sort pass.
    pub runs: usize,
    /// Number of merge passes performed.
    pub passes: usize,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder {
    /// Number of page buffers.
    buffers: usize,
    /// Page size in integers.
    page_size: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Verification and copy read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        ExternalSorter::new(self.buffers, self.page_size, self.tmp_dir.as_deref(), self.rw_buf_size)
    }

    /// Sets number of page buffers. One of them collects merge output, the rest are merge inputs.
    pub fn with_buffers(mut self, buffers: usize) -> ExternalSorterBuilder {
        self.buffers = buffers;
        return self;
    }

    /// Sets page size in integers.
    pub fn with_page_size(mut self, page_size: usize) -> ExternalSorterBuilder {
        self.page_size = page_size;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets verification and copy read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            buffers: DEFAULT_BUFFERS,
            page_size: DEFAULT_PAGE_SIZE,
            tmp_dir: None,
            rw_buf_size: None,
        }
    }
}

/// External sorter.
pub struct ExternalSorter {
    /// Number of page buffers.
    buffers: usize,
    /// Page size in integers.
    page_size: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: tempfile::TempDir,
    /// Verification and copy read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl ExternalSorter {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `buffers` - Number of page buffers, at least [`MIN_BUFFERS`]. Merge fan-in is `buffers - 1`.
    /// * `page_size` - Number of integers in a page.
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Verification and copy read/write buffer size.
    pub fn new(
        buffers: usize,
        page_size: usize,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        if buffers < MIN_BUFFERS {
            return Err(SortError::InvalidConfig("at least 3 page buffers required"));
        }
        if page_size == 0 {
            return Err(SortError::InvalidConfig("page size must be positive"));
        }
        log::info!(
            "initializing sorter (buffers: {}, page size: {}, fan-in: {})",
            buffers,
            page_size,
            buffers - 1
        );

        return Ok(ExternalSorter {
            buffers,
            page_size,
            rw_buf_size,
            tmp_dir: Self::init_tmp_directory(tmp_path)?,
        });
    }

    fn init_tmp_directory(tmp_path: Option<&Path>) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Sorts the integer file `input` into `output`.
    /// The output file is created or truncated. Returns once the output is verified to be sorted.
    ///
    /// # Arguments
    /// * `input` - File of big-endian 32-bit integers to be sorted
    /// * `output` - Result file, must differ from the input
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortSummary, SortError> {
        if let (Ok(input), Ok(output)) = (fs::canonicalize(input), fs::canonicalize(output)) {
            if input == output {
                return Err(SortError::InvalidConfig("input and output must be different files"));
            }
        }

        let input_file = fs::File::open(input).map_err(|err| SortError::IO(err))?;
        let input_len = input_file.metadata().map_err(|err| SortError::IO(err))?.len();
        let items = run::int_count(input_len).ok_or_else(|| SortError::InvalidLength {
            path: input.into(),
            len: input_len,
        })?;

        let output_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)
            .map_err(|err| SortError::IO(err))?;
        let scratch_file = tempfile::tempfile_in(self.tmp_dir.path()).map_err(|err| SortError::TempDir(err))?;

        log::info!("sorting {} ({} integers)", input.display(), items);

        let mut session = SortSession {
            pool: PagePool::new(self.buffers, self.page_size),
            rw_buf_size: self.rw_buf_size,
            len: input_len,
        };
        let summary = session.run(input_file, output_file, scratch_file)?;

        log::info!(
            "sorted {} into {} (runs: {}, merge passes: {})",
            input.display(),
            output.display(),
            summary.runs,
            summary.passes
        );

        return Ok(summary);
    }
}

/// State of a single sort call: page buffers and the data length shared by every pass.
struct SortSession {
    pool: PagePool,
    rw_buf_size: Option<usize>,
    /// Data length in bytes, identical for the input and every pass output.
    len: u64,
}

impl SortSession {
    fn run(&mut self, mut input: fs::File, output: fs::File, scratch: fs::File) -> Result<SortSummary, SortError> {
        let mut current = output;
        let mut other = scratch;
        let mut in_output = true;

        let mut runs = self.partial_sort(&mut input, &mut current).map_err(|err| SortError::IO(err))?;
        let summary_runs = runs.len();
        let mut passes = 0;

        while !self.scan_sorted(&current).map_err(|err| SortError::IO(err))? {
            if runs.len() <= 1 {
                return Err(SortError::NotConverged { runs: runs.len() });
            }

            runs = self
                .merge(&mut current, &runs, &mut other)
                .map_err(|err| SortError::IO(err))?;
            mem::swap(&mut current, &mut other);
            in_output = !in_output;
            passes += 1;

            log::debug!("merge pass {} done, {} runs left", passes, runs.len());
        }

        if !in_output {
            log::debug!("moving sorted data from scratch file to output");
            self.copy(&mut current, &mut other).map_err(|err| SortError::IO(err))?;
        }

        return Ok(SortSummary {
            items: self.len / INT_SIZE as u64,
            runs: summary_runs,
            passes,
        });
    }

    /// Splits the input into page-sized runs, sorts each one in memory and appends it to `dest`.
    fn partial_sort(&mut self, input: &mut fs::File, dest: &mut fs::File) -> io::Result<Vec<Run>> {
        let len = self.len;
        let page = self
            .pool
            .working_page()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page pool is empty"))?;

        let mut read_cursor = PageCursor::new(0);
        let mut write_cursor = PageCursor::new(0);
        let mut runs = Vec::new();

        while read_cursor.offset() < len {
            let offset = write_cursor.offset() / INT_SIZE as u64;
            let count = page.read_from(input, &mut read_cursor, len)?;

            quicksort::sort(page.as_mut_slice());
            page.write_to(dest, &mut write_cursor)?;

            runs.push(Run::new(offset, count as u64));
        }

        log::debug!("partial sort pass done, {} runs created", runs.len());

        return Ok(runs);
    }

    fn merge(&mut self, source: &mut fs::File, runs: &[Run], dest: &mut fs::File) -> io::Result<Vec<Run>> {
        let (inputs, output) = self
            .pool
            .merge_pages()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page pool is empty"))?;

        let merged = KWayMerger::new(inputs, output).merge_pass(source, runs, dest)?;
        dest.set_len(self.len)?;

        return Ok(merged);
    }

    /// Scans the file from the beginning checking global non-decreasing order.
    fn scan_sorted(&self, file: &fs::File) -> io::Result<bool> {
        let mut file = file;
        file.rewind()?;

        let reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return run::is_sorted(IntReader::new(reader, self.len));
    }

    fn copy(&self, source: &mut fs::File, dest: &mut fs::File) -> io::Result<()> {
        source.rewind()?;
        dest.rewind()?;
        dest.set_len(0)?;

        let mut writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, &mut *dest),
            None => io::BufWriter::new(&mut *dest),
        };
        io::copy(&mut source.take(self.len), &mut writer)?;
        writer.flush()?;

        return Ok(());
    }
}

/// Sorts the integer file `input` into `output` using `buffers` pages of `page_size` integers each.
///
/// Temporary data is stored in the default OS temporary directory.
/// Use [`ExternalSorterBuilder`] for finer control.
pub fn sort_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    buffers: usize,
    page_size: usize,
) -> Result<(), SortError> {
    ExternalSorterBuilder::new()
        .with_buffers(buffers)
        .with_page_size(page_size)
        .build()?
        .sort(input.as_ref(), output.as_ref())?;

    return Ok(());
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::{self, prelude::*};
    use std::path::{Path, PathBuf};

    use byteorder::{BigEndian, WriteBytesExt};
    use rand::Rng;
    use rstest::*;

    use super::{sort_file, ExternalSorter, ExternalSorterBuilder, SortError};
    use crate::run::{self, IntReader};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write_ints(path: &Path, items: &[i32]) {
        let mut writer = io::BufWriter::new(fs::File::create(path).unwrap());
        for item in items {
            writer.write_i32::<BigEndian>(*item).unwrap();
        }
        writer.flush().unwrap();
    }

    fn read_ints(path: &Path) -> Vec<i32> {
        let reader = IntReader::open(fs::File::open(path).unwrap(), None).unwrap();
        let items: io::Result<Vec<i32>> = reader.collect();
        items.unwrap()
    }

    fn paths(tmp_dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        (tmp_dir.path().join("input.bin"), tmp_dir.path().join("output.bin"))
    }

    fn sorter(buffers: usize, page_size: usize, tmp_dir: &tempfile::TempDir) -> ExternalSorter {
        ExternalSorterBuilder::new()
            .with_buffers(buffers)
            .with_page_size(page_size)
            .with_tmp_dir(tmp_dir.path())
            .with_rw_buf_size(64)
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_sort_scenario(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &[9, 1, 8, 2, 7, 3, 6, 4, 5, 0]);

        let summary = sorter(4, 3, &tmp_dir).sort(&input, &output).unwrap();

        assert_eq!(read_ints(&output), Vec::from_iter(0..10));
        assert_eq!(summary.items, 10);
        assert_eq!(summary.runs, 4);
        assert_eq!(summary.passes, 2);
    }

    #[rstest]
    fn test_sort_file(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &[9, 1, 8, 2, 7, 3, 6, 4, 5, 0]);

        sort_file(&input, &output, 4, 3).unwrap();

        assert_eq!(read_ints(&output), Vec::from_iter(0..10));
        // input is left untouched
        assert_eq!(read_ints(&input), vec![9, 1, 8, 2, 7, 3, 6, 4, 5, 0]);
    }

    #[rstest]
    #[case(1, 3, 3)]
    #[case(100, 3, 1)]
    #[case(100, 3, 7)]
    #[case(1000, 4, 8)]
    #[case(1000, 16, 10)]
    #[case(1001, 5, 16)]
    #[case(4096, 3, 64)]
    fn test_sort_random(tmp_dir: tempfile::TempDir, #[case] count: usize, #[case] buffers: usize, #[case] page_size: usize) {
        let (input, output) = paths(&tmp_dir);
        let mut rng = rand::thread_rng();
        let items = Vec::from_iter((0..count).map(|_| rng.gen_range(-500..500)));
        write_ints(&input, &items);

        let summary = sorter(buffers, page_size, &tmp_dir).sort(&input, &output).unwrap();

        let mut expected = items.clone();
        expected.sort();
        assert_eq!(read_ints(&output), expected);
        assert_eq!(summary.runs, (count + page_size - 1) / page_size);
    }

    #[rstest]
    fn test_sort_extreme_values(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        let items = vec![i32::MAX, 0, i32::MIN, -1, i32::MAX, 1, i32::MIN];
        write_ints(&input, &items);

        sorter(3, 2, &tmp_dir).sort(&input, &output).unwrap();

        assert_eq!(read_ints(&output), vec![i32::MIN, i32::MIN, -1, 0, 1, i32::MAX, i32::MAX]);
    }

    #[rstest]
    #[case(vec![6, 5, 4, 3, 2, 1], 1)]
    #[case(vec![8, 7, 6, 5, 4, 3, 2, 1, 0], 2)]
    fn test_sort_pass_parity(tmp_dir: tempfile::TempDir, #[case] items: Vec<i32>, #[case] passes: usize) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &items);

        let summary = sorter(3, 3, &tmp_dir).sort(&input, &output).unwrap();

        let mut expected = items.clone();
        expected.sort();
        assert_eq!(read_ints(&output), expected);
        assert_eq!(summary.passes, passes);
        assert_eq!(fs::metadata(&output).unwrap().len(), (items.len() * 4) as u64);
    }

    #[rstest]
    fn test_sort_single_page(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &[3, -2, 7, 7, 0]);

        let summary = sorter(3, 8, &tmp_dir).sort(&input, &output).unwrap();

        assert_eq!(read_ints(&output), vec![-2, 0, 3, 7, 7]);
        assert_eq!(summary.runs, 1);
        assert_eq!(summary.passes, 0);
    }

    #[rstest]
    fn test_sort_empty(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &[]);

        let summary = sorter(3, 4, &tmp_dir).sort(&input, &output).unwrap();

        assert_eq!(fs::metadata(&output).unwrap().len(), 0);
        assert_eq!(summary.items, 0);
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.passes, 0);
    }

    #[rstest]
    fn test_sort_already_sorted(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        let items = Vec::from_iter((0..200).map(|x| x / 3));
        write_ints(&input, &items);

        let summary = sorter(3, 7, &tmp_dir).sort(&input, &output).unwrap();
        assert_eq!(read_ints(&output), items);
        assert_eq!(summary.passes, 0);

        // sorting the result again keeps it as is
        let resorted = tmp_dir.path().join("resorted.bin");
        sorter(3, 7, &tmp_dir).sort(&output, &resorted).unwrap();
        assert_eq!(read_ints(&resorted), items);
    }

    #[rstest]
    fn test_sort_overwrites_existing_output(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        write_ints(&input, &[2, 1]);
        write_ints(&output, &[9, 9, 9, 9, 9, 9]);

        sorter(3, 1, &tmp_dir).sort(&input, &output).unwrap();

        assert_eq!(read_ints(&output), vec![1, 2]);
    }

    #[rstest]
    fn test_sort_output_is_verified(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        let mut rng = rand::thread_rng();
        let items = Vec::from_iter((0..777).map(|_| rng.gen::<i32>()));
        write_ints(&input, &items);

        sorter(6, 5, &tmp_dir).sort(&input, &output).unwrap();

        let reader = IntReader::open(fs::File::open(&output).unwrap(), None).unwrap();
        assert!(run::is_sorted(reader).unwrap());
    }

    #[rstest]
    fn test_sort_invalid_length(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);
        fs::write(&input, [0u8, 0, 0, 1, 0, 0]).unwrap();

        let err = sorter(3, 4, &tmp_dir).sort(&input, &output).unwrap_err();

        assert!(matches!(err, SortError::InvalidLength { len: 6, .. }), "{}", err);
    }

    #[rstest]
    fn test_sort_missing_input(tmp_dir: tempfile::TempDir) {
        let (input, output) = paths(&tmp_dir);

        let err = sorter(3, 4, &tmp_dir).sort(&input, &output).unwrap_err();

        assert!(matches!(err, SortError::IO(ref err) if err.kind() == io::ErrorKind::NotFound), "{}", err);
    }

    #[rstest]
    fn test_sort_same_file(tmp_dir: tempfile::TempDir) {
        let (input, _) = paths(&tmp_dir);
        write_ints(&input, &[2, 1]);

        let err = sorter(3, 4, &tmp_dir).sort(&input, &input).unwrap_err();

        assert!(matches!(err, SortError::InvalidConfig(_)), "{}", err);
        assert_eq!(read_ints(&input), vec![2, 1]);
    }

    #[rstest]
    #[case(2, 4)]
    #[case(0, 4)]
    #[case(3, 0)]
    fn test_invalid_config(#[case] buffers: usize, #[case] page_size: usize) {
        let result = ExternalSorterBuilder::new()
            .with_buffers(buffers)
            .with_page_size(page_size)
            .build();

        assert!(matches!(result, Err(SortError::InvalidConfig(_))));
    }
}
