//! Host file sink
//!
//! Creates `data_{session}.csv` and `events_{session}.csv` in a directory
//! and appends through a [`BufWriter`] per file. `sync` flushes both writers
//! and asks the OS to persist the data.
//!
//! ```rust,no_run
//! use cansat_core::telemetry::{FileSink, LogFile, TelemetrySink};
//!
//! let mut sink = FileSink::create("/media/sd", 1_700_000_000)?;
//! sink.append(LogFile::Data, "0.100,21.5,1006.5,0.0,None,None,None,None,None,None,None,None")?;
//! sink.sync()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::time::Timestamp;

use super::{LogFile, TelemetrySink};

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
    has_lines: bool,
}

impl OpenFile {
    fn open(dir: &Path, file: LogFile, session: Timestamp) -> io::Result<Self> {
        let path = dir.join(format!("{}_{}.csv", file.prefix(), session));
        let handle = OpenOptions::new().create(true).append(true).open(&path)?;
        let has_lines = handle.metadata()?.len() > 0;
        Ok(Self { path, writer: BufWriter::new(handle), has_lines })
    }

    fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()
    }
}

/// Data and event CSV files on a host filesystem
pub struct FileSink {
    data: OpenFile,
    events: OpenFile,
}

impl FileSink {
    /// Open (or create) both session files under `dir`
    pub fn create(dir: impl AsRef<Path>, session: Timestamp) -> io::Result<Self> {
        let dir = dir.as_ref();
        let sink = Self {
            data: OpenFile::open(dir, LogFile::Data, session)?,
            events: OpenFile::open(dir, LogFile::Events, session)?,
        };
        log_info!("created {} and {}", sink.data.path.display(), sink.events.path.display());
        Ok(sink)
    }

    /// Path of `file`
    pub fn path(&self, file: LogFile) -> &Path {
        &self.file(file).path
    }

    fn file(&self, file: LogFile) -> &OpenFile {
        match file {
            LogFile::Data => &self.data,
            LogFile::Events => &self.events,
        }
    }

    fn file_mut(&mut self, file: LogFile) -> &mut OpenFile {
        match file {
            LogFile::Data => &mut self.data,
            LogFile::Events => &mut self.events,
        }
    }
}

impl TelemetrySink for FileSink {
    type Error = io::Error;

    fn append(&mut self, file: LogFile, line: &str) -> io::Result<()> {
        let open = self.file_mut(file);
        open.writer.write_all(line.as_bytes())?;
        open.writer.write_all(b"\n")?;
        open.has_lines = true;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.data.sync()?;
        self.events.sync()
    }

    fn has_lines(&self, file: LogFile) -> bool {
        self.file(file).has_lines
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.sync();
    }
}
