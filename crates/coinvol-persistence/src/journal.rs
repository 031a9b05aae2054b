//! JSON Lines journal of price observations.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete observation
//! - Partial file corruption only affects individual lines
//! - Can be read even if write was interrupted
//!
//! Files are named by the UTC day of the observation time, so one
//! ingestion batch always lands in a single file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use coinvol_core::{PriceObservation, UnixSeconds};
use tracing::{debug, info, warn};

use crate::error::{PersistenceError, PersistenceResult};

const FILE_PREFIX: &str = "observations_";
const FILE_SUFFIX: &str = ".jsonl";

/// UTC day of a unix timestamp.
pub(crate) fn day_of(time: UnixSeconds) -> PersistenceResult<NaiveDate> {
    DateTime::from_timestamp(time, 0)
        .map(|dt| dt.date_naive())
        .ok_or(PersistenceError::Timestamp(time))
}

/// `observations_YYYY-MM-DD.jsonl`
pub fn journal_file_name(day: NaiveDate) -> String {
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", day.format("%Y-%m-%d"))
}

/// Parse the day back out of a journal file name.
pub(crate) fn parse_file_day(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Open file for the current day.
struct ActiveFile {
    writer: BufWriter<File>,
    day: NaiveDate,
    records_written: usize,
}

/// Append-only JSON Lines writer for observations.
pub struct ObservationJournal {
    base_dir: PathBuf,
    buffer: Vec<PriceObservation>,
    /// Buffered observations before a flush. 1 flushes every append.
    max_buffer_size: usize,
    active: Option<ActiveFile>,
}

impl ObservationJournal {
    pub fn new(base_dir: impl AsRef<Path>, max_buffer_size: usize) -> PersistenceResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            buffer: Vec::with_capacity(max_buffer_size.max(1)),
            max_buffer_size: max_buffer_size.max(1),
            active: None,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn record(&mut self, observation: PriceObservation) -> PersistenceResult<()> {
        self.buffer.push(observation);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write buffered observations, rotating files on day boundaries.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.buffer);
        let count = pending.len();
        for observation in &pending {
            let day = day_of(observation.time)?;
            let active = self.writer_for(day)?;
            let line = serde_json::to_string(observation)?;
            writeln!(active.writer, "{line}")?;
            active.records_written += 1;
        }

        if let Some(active) = self.active.as_mut() {
            active.writer.flush()?;
        }
        debug!(records = count, "Flushed observations to journal");
        Ok(())
    }

    /// Flush pending data and close the open file.
    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active()
    }

    fn writer_for(&mut self, day: NaiveDate) -> PersistenceResult<&mut ActiveFile> {
        if self.active.as_ref().is_some_and(|a| a.day != day) {
            self.close_active()?;
        }

        let active = match self.active.take() {
            Some(active) => active,
            None => {
                let path = self.base_dir.join(journal_file_name(day));
                info!(path = %path.display(), "Opening observation journal (append mode)");
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                ActiveFile {
                    writer: BufWriter::new(file),
                    day,
                    records_written: 0,
                }
            }
        };
        Ok(self.active.insert(active))
    }

    fn close_active(&mut self) -> PersistenceResult<()> {
        if let Some(mut active) = self.active.take() {
            active.writer.flush()?;
            info!(
                day = %active.day,
                records = active.records_written,
                "Closed observation journal"
            );
        }
        Ok(())
    }
}

impl Drop for ObservationJournal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(?e, "Failed to close observation journal on drop");
        }
    }
}
