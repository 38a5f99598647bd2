use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use scout_core::{Record, RECORD_HEADER};
use scout_logging::{scout_debug, scout_error, scout_warn};

use crate::persist::PersistError;

/// Default number of rows per flush.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Append-only byte storage behind a [`BatchWriter`].
pub trait BatchSink: Send {
    /// Write all of `bytes` at the end and make them durable.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Cut the storage back to `len` bytes so the next append starts there.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl BatchSink for File {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()?;
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Buffers records and appends them to a CSV file in batches.
///
/// The file is created with its header by [`BatchWriter::create`]; rows are
/// only ever appended after that, in the order records were appended. Each
/// flush lands whole or not at all: a failed append is cut back to the last
/// complete batch and the records stay buffered. If that cut fails too the
/// file's tail is unknown and every later flush is refused.
pub struct BatchWriter {
    path: PathBuf,
    sink: Box<dyn BatchSink>,
    batch: Vec<Record>,
    threshold: usize,
    persisted: usize,
    committed_len: u64,
    broken: bool,
}

impl BatchWriter {
    /// Create a new output file and write the header. Fails if the file exists.
    pub fn create(path: impl Into<PathBuf>, threshold: usize) -> Result<Self, PersistError> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => PersistError::AlreadyExists(path.clone()),
                _ => PersistError::Io(err),
            })?;
        Self::with_sink(path, Box::new(file), threshold)
    }

    /// Write the header into an empty `sink`; `path` is used for reporting.
    pub fn with_sink(
        path: impl Into<PathBuf>,
        mut sink: Box<dyn BatchSink>,
        threshold: usize,
    ) -> Result<Self, PersistError> {
        let header = encode_rows(std::iter::once(RECORD_HEADER))?;
        sink.append(&header)?;

        let threshold = threshold.max(1);
        Ok(Self {
            path: path.into(),
            sink,
            batch: Vec::with_capacity(threshold),
            threshold,
            persisted: 0,
            committed_len: header.len() as u64,
            broken: false,
        })
    }

    pub fn append(&mut self, record: Record) {
        self.batch.push(record);
    }

    /// `true` once the buffer holds at least one full batch.
    pub fn is_due(&self) -> bool {
        self.batch.len() >= self.threshold
    }

    /// Write every buffered record and clear the buffer.
    ///
    /// Returns the number of rows written; an empty buffer writes nothing.
    /// When the append fails the file is cut back to its previous length and
    /// the buffer is kept, so a later flush writes the same rows again.
    pub fn flush(&mut self) -> Result<usize, PersistError> {
        if self.batch.is_empty() {
            return Ok(0);
        }
        if self.broken {
            return Err(PersistError::Unrecoverable(self.path.clone()));
        }

        let bytes = encode_rows(self.batch.iter().map(Record::to_row))?;
        if let Err(err) = self.sink.append(&bytes) {
            self.roll_back();
            return Err(err.into());
        }

        let rows = self.batch.len();
        self.batch.clear();
        self.persisted += rows;
        self.committed_len += bytes.len() as u64;
        scout_debug!(
            "Flushed {} rows to {:?} ({} total)",
            rows,
            self.path,
            self.persisted
        );
        Ok(rows)
    }

    fn roll_back(&mut self) {
        match self.sink.truncate(self.committed_len) {
            Ok(()) => scout_warn!(
                "Write to {:?} failed; kept {} complete rows",
                self.path,
                self.persisted
            ),
            Err(err) => {
                scout_error!(
                    "Could not cut {:?} back after a failed write: {}",
                    self.path,
                    err
                );
                self.broken = true;
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.batch.len()
    }

    pub fn persisted(&self) -> usize {
        self.persisted
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn encode_rows<R, I>(rows: I) -> Result<Vec<u8>, PersistError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| PersistError::Io(err.into_error()))
}
