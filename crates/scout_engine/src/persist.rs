use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("output file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("{} may end in a partial row after a failed write; no further rows are written", .0.display())]
    Unrecoverable(PathBuf),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not encode {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` if needed and check that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |err: io::Error| PersistError::OutputDir(format!("{}: {}", dir.display(), err));
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(unusable)?
        }
        Err(err) => return Err(unusable(err)),
    }
    // Probe file is removed on drop.
    NamedTempFile::new_in(dir).map_err(unusable)?;
    Ok(())
}

/// Replaces small state files (the session cache) in one step: a sibling
/// temp file is written and synced, then renamed over the target.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Target directory of `path`, with a bare file name resolving to `.`.
    pub fn for_path(path: &Path) -> Self {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::new(parent.to_path_buf()),
            _ => Self::new(PathBuf::from(".")),
        }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Pretty-printed JSON variant of [`AtomicFileWriter::write`].
    pub fn write_json<T: Serialize>(
        &self,
        filename: &str,
        value: &T,
    ) -> Result<PathBuf, PersistError> {
        let content = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Encode {
            name: filename.to_string(),
            source,
        })?;
        self.write(filename, &content)
    }
}
