//! Reading and writing partition data files.
//!
//! A data file holds one record per line, `<key>\t<partition>\n`, where the
//! key is a signed 64-bit integer and the partition an unsigned 32-bit one.

use crate::error::{Error, Result};
use crate::{AffinityKey, PartitionId};
use std::io::{BufRead, Write};

/// Parse a single `<key>\t<partition>` record. `line_no` is 1-based and only
/// used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> Result<(AffinityKey, PartitionId)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some((key, value)) = line.split_once('\t') else {
        return Err(Error::Parse {
            line: line_no,
            reason: format!("expected <key>\\t<partition>, got {line:?}"),
        });
    };

    let key = key.trim().parse::<AffinityKey>().map_err(|e| Error::Parse {
        line: line_no,
        reason: format!("invalid key {key:?}: {e}"),
    })?;
    let value = value.trim().parse::<PartitionId>().map_err(|e| Error::Parse {
        line: line_no,
        reason: format!("invalid partition {value:?}: {e}"),
    })?;

    Ok((key, value))
}

/// Iterator over the records of a data file. Blank lines are skipped.
pub struct Records<R> {
    reader: R,
    buf: String,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> Records<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<(AffinityKey, PartitionId)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    if self.buf.trim().is_empty() {
                        continue;
                    }
                    let record = parse_line(&self.buf, self.line_no);
                    if record.is_err() {
                        self.done = true;
                    }
                    return Some(record);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}

/// Iterate the records of `reader`. Stops after the first error.
pub fn read_records<R: BufRead>(reader: R) -> Records<R> {
    Records::new(reader)
}

/// Write records as `<key>\t<partition>\n` lines. Returns the number written.
pub fn write_records<W, I>(mut writer: W, records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (AffinityKey, PartitionId)>,
{
    let mut written = 0;
    for (key, value) in records {
        writeln!(writer, "{key}\t{value}")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Partition count used by [`generate_records`] callers that don't pick one.
pub const DEFAULT_PARTITIONS: PartitionId = 4;

/// Synthetic test data: keys `1..=count` in shuffled order, each assigned a
/// partition drawn uniformly from `0..partitions`.
///
/// # Panics
///
/// Panics if `partitions` is 0.
#[cfg(feature = "gen")]
pub fn generate_records<R: rand::Rng>(
    count: u64,
    partitions: PartitionId,
    rng: &mut R,
) -> Vec<(AffinityKey, PartitionId)> {
    use rand::seq::SliceRandom;

    assert!(partitions > 0, "partitions must be greater than 0");

    let mut keys: Vec<AffinityKey> = (1..=count as AffinityKey).collect();
    keys.shuffle(rng);
    keys.into_iter()
        .map(|key| (key, rng.random_range(0..partitions)))
        .collect()
}
