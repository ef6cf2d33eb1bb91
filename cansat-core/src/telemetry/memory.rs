//! In-memory telemetry sink for tests and host simulation
//!
//! Clones share the same storage, so a test can keep a handle while the
//! recorder owns another. Failures can be injected to exercise the
//! recorder's error paths.
//!
//! ```rust
//! use cansat_core::telemetry::{LogFile, MemorySink, TelemetrySink};
//!
//! let mut sink = MemorySink::new();
//! let observer = sink.clone();
//! sink.append(LogFile::Events, "0.000,Main Loop,READY,None,").unwrap();
//! assert_eq!(observer.lines(LogFile::Events).len(), 1);
//! ```

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use super::{LogFile, TelemetrySink};

#[derive(Debug, Default)]
struct Files {
    data: Vec<String>,
    events: Vec<String>,
    fail_appends: bool,
    fail_sync: bool,
    syncs: usize,
}

impl Files {
    fn file(&mut self, file: LogFile) -> &mut Vec<String> {
        match file {
            LogFile::Data => &mut self.data,
            LogFile::Events => &mut self.events,
        }
    }
}

/// Shared in-memory pair of log files
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Rc<RefCell<Files>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines appended to `file`
    pub fn lines(&self, file: LogFile) -> Vec<String> {
        self.files.borrow_mut().file(file).clone()
    }

    /// Make every following `append` fail until cleared
    pub fn fail_appends(&mut self, fail: bool) {
        self.files.borrow_mut().fail_appends = fail;
    }

    /// Make every following `sync` fail until cleared
    pub fn fail_sync(&mut self, fail: bool) {
        self.files.borrow_mut().fail_sync = fail;
    }

    /// Successful `sync` calls so far
    pub fn syncs(&self) -> usize {
        self.files.borrow().syncs
    }
}

fn injected() -> io::Error {
    io::Error::other("injected storage failure")
}

impl TelemetrySink for MemorySink {
    type Error = io::Error;

    fn append(&mut self, file: LogFile, line: &str) -> io::Result<()> {
        let mut files = self.files.borrow_mut();
        if files.fail_appends {
            return Err(injected());
        }
        files.file(file).push(line.to_owned());
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut files = self.files.borrow_mut();
        if files.fail_sync {
            return Err(injected());
        }
        files.syncs += 1;
        Ok(())
    }

    fn has_lines(&self, file: LogFile) -> bool {
        !self.files.borrow_mut().file(file).is_empty()
    }
}
