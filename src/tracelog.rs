//! Process-wide trace log toggled by the start/stop logging commands.
//!
//! The sink itself is shared; each worker buffers its own lines in a
//! [`LogSegment`] and appends them in one locked write, so lines from
//! different workers never interleave mid-line.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use crate::{
    topology::{NodeId, WorkerId},
    transition::TransitionId,
};

/// Shared trace sink, closed until a worker leader opens it.
#[derive(Debug, Default)]
pub struct TraceLog {
    sink: Mutex<Option<BufWriter<File>>>,
}

impl TraceLog {
    /// Create a closed trace log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sink: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create (or truncate) `path` and route trace lines to it, closing any
    /// previously open file first.
    ///
    /// # Errors
    ///
    /// Returns any error from creating the file or flushing the old one.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let mut sink = self.lock();
        if let Some(mut old) = sink.take() {
            old.flush()?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "# tokenflow trace")?;
        *sink = Some(file);
        Ok(())
    }

    /// Flush and close the file, if open.
    ///
    /// # Errors
    ///
    /// Returns any error from the final flush.
    pub fn close(&self) -> io::Result<()> {
        match self.lock().take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    /// Whether a file is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool { self.lock().is_some() }

    /// Append pre-formatted lines. Does nothing while closed.
    ///
    /// # Errors
    ///
    /// Returns any write error.
    pub fn append(&self, lines: &str) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(file) => file.write_all(lines.as_bytes()),
            None => Ok(()),
        }
    }
}

/// One worker's buffered trace lines.
#[derive(Debug)]
pub struct LogSegment {
    worker: WorkerId,
    lines: String,
}

impl LogSegment {
    /// Start an empty segment for `worker`.
    #[must_use]
    pub const fn new(worker: WorkerId) -> Self {
        Self {
            worker,
            lines: String::new(),
        }
    }

    /// Record that `node` fired `transition`.
    pub fn fire(&mut self, node: NodeId, transition: TransitionId) {
        self.lines.push_str(&format!(
            "w{} fire node={node} transition={transition}\n",
            self.worker
        ));
    }

    /// Record that a batch of `packets` was received.
    pub fn receive(&mut self, packets: usize) {
        self.lines
            .push_str(&format!("w{} recv packets={packets}\n", self.worker));
    }

    /// Move buffered lines to `log`.
    ///
    /// # Errors
    ///
    /// Returns any write error; the buffer is cleared either way.
    pub fn flush(&mut self, log: &TraceLog) -> io::Result<()> {
        if self.lines.is_empty() {
            return Ok(());
        }
        let result = log.append(&self.lines);
        self.lines.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn segments_reach_the_file_only_while_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.log");
        let log = TraceLog::new();
        let mut segment = LogSegment::new(WorkerId::new(1));

        segment.receive(3);
        segment.flush(&log).expect("flush while closed");

        log.open(&path).expect("open");
        assert!(log.is_open());
        segment.fire(NodeId::new(2), TransitionId::new(5));
        segment.flush(&log).expect("flush");
        log.close().expect("close");
        assert!(!log.is_open());

        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(text, "# tokenflow trace\nw1 fire node=2 transition=5\n");
    }

    #[test]
    fn closing_twice_is_harmless() {
        let log = TraceLog::new();
        log.close().expect("close");
        log.close().expect("close again");
    }
}
