//! Persistent log file sink
//!
//! Append-only text file on the storage volume. The handle is optional: it
//! exists only while persistent logging is enabled and the file could be
//! opened. Every `sync_cycle`-th write, counted from the first write after
//! opening, forces the data to stable storage.

use super::{LogLine, Sink};
use crate::core::{Result, UtilsError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Counters of the currently open log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistentStats {
    pub open: bool,
    /// Lines written since the file was opened
    pub writes: u64,
    /// Durability syncs since the file was opened
    pub syncs: u64,
}

pub struct PersistentLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    sync_cycle: u32,
    writes: u64,
    syncs: u64,
}

impl PersistentLog {
    /// Create a closed persistent log for `path`
    pub fn new(path: impl Into<PathBuf>, sync_cycle: u32) -> Self {
        Self {
            path: path.into(),
            writer: None,
            sync_cycle: sync_cycle.max(1),
            writes: 0,
            syncs: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn stats(&self) -> PersistentStats {
        PersistentStats {
            open: self.is_open(),
            writes: self.writes,
            syncs: self.syncs,
        }
    }

    /// Close any open handle, create the directory and open the file for append
    ///
    /// A failure to sync the previous handle does not stop the new open; the
    /// old handle is dropped either way.
    pub fn open(&mut self) -> Result<()> {
        let _ = self.close();

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                UtilsError::io_operation(
                    "creating log directory",
                    dir.display().to_string(),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                UtilsError::io_operation("opening log file", self.path.display().to_string(), e)
            })?;

        self.writer = Some(BufWriter::new(file));
        self.writes = 0;
        self.syncs = 0;
        Ok(())
    }

    /// Flush, sync and close the handle; a no-op when already closed
    pub fn close(&mut self) -> Result<()> {
        let result = self.sync();
        self.writer = None;
        result
    }

    /// Drop the handle without trying to write anything more
    pub fn abandon(&mut self) {
        if let Some(writer) = self.writer.take() {
            // discard buffered bytes, the device already failed
            let _ = writer.into_parts();
        }
    }

    /// Force buffered lines to stable storage
    pub fn sync(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
            writer.get_ref().sync_data()?;
            self.syncs += 1;
        }
        Ok(())
    }

    /// Durability sync, optionally followed by a close
    pub fn flush_log(&mut self, and_close: bool) -> Result<()> {
        if and_close {
            self.close()
        } else {
            self.sync()
        }
    }

    /// Close and delete the file, reopening it afterwards if asked
    pub fn clear(&mut self, reopen: bool) -> Result<()> {
        self.close()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(UtilsError::io_operation(
                    "removing log file",
                    self.path.display().to_string(),
                    e,
                ))
            }
        }
        if reopen {
            self.open()?;
        }
        Ok(())
    }

    /// Append one line, syncing on the configured cycle
    pub fn append(&mut self, text: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| UtilsError::log_file(self.path.display().to_string(), "not open"))?;

        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;

        let count = self.writes;
        self.writes += 1;
        if count % u64::from(self.sync_cycle) == 0 {
            self.sync()?;
        }
        Ok(())
    }

    /// Free bytes on the volume holding the log file
    #[cfg(feature = "file")]
    pub fn available_space(&self) -> Result<u64> {
        let volume = self
            .path
            .ancestors()
            .skip(1)
            .find(|p| p.exists())
            .unwrap_or_else(|| Path::new("."));
        fs2::available_space(volume).map_err(|e| {
            UtilsError::io_operation("querying free space", volume.display().to_string(), e)
        })
    }
}

impl Sink for PersistentLog {
    fn write_line(&mut self, line: &LogLine<'_>) -> Result<()> {
        self.append(line.text)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for PersistentLog {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
