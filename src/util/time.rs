//! Wall clock helpers
//!
//! A device without a battery-backed clock starts at the epoch. [`Clock`]
//! keeps an offset over the system time that is set once, either from a
//! network time source or from the time reported by a browser.

use crate::core::error::{Result, UtilsError};
use chrono::{Duration, NaiveDateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Epoch seconds below which the clock is considered unset
pub const MIN_VALID_EPOCH: i64 = 10_000;

const BROWSER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format an uptime in milliseconds as `D-HH:MM:SS`
///
/// ```
/// use device_utils::util::format_elapsed_time;
///
/// assert_eq!(format_elapsed_time(90_061_000), "1-01:01:01");
/// ```
pub fn format_elapsed_time(millis: u64) -> String {
    let secs = millis / 1000;
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;
    format!(
        "{}-{:02}:{:02}:{:02}",
        days,
        hours % 24,
        mins % 60,
        secs % 60
    )
}

/// Build a storage path from a timestamp
///
/// Folders are `/YYYYMMDD`, files are `/YYYYMMDD/YYYYMMDD_HHMMSS`.
pub fn date_format(at: &NaiveDateTime, is_folder: bool) -> String {
    if is_folder {
        at.format("/%Y%m%d").to_string()
    } else {
        at.format("/%Y%m%d/%Y%m%d_%H%M%S").to_string()
    }
}

/// System clock with a one-time correction
#[derive(Debug)]
pub struct Clock {
    offset: RwLock<Duration>,
    synchronized: AtomicBool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            offset: RwLock::new(Duration::zero()),
            synchronized: AtomicBool::new(false),
        }
    }

    /// Current corrected time
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + *self.offset.read()
    }

    /// Seconds since the Unix epoch
    pub fn epoch(&self) -> i64 {
        self.now().and_utc().timestamp()
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized.load(Ordering::Acquire)
    }

    /// Record that an external source has set the time
    pub fn mark_synchronized(&self) {
        self.synchronized.store(true, Ordering::Release);
    }

    /// Whether the clock holds a plausible date
    pub fn has_valid_time(&self) -> bool {
        self.epoch() > MIN_VALID_EPOCH
    }

    /// Storage path for the current time, see [`date_format`]
    pub fn date_path(&self, is_folder: bool) -> String {
        date_format(&self.now(), is_folder)
    }

    /// Set the clock from a browser timestamp `YYYY-MM-DDTHH:MM:SS`
    ///
    /// Ignored once the clock is synchronized. Returns whether the clock
    /// was changed.
    pub fn sync_to_browser(&self, value: &str) -> Result<bool> {
        if self.is_synchronized() {
            return Ok(false);
        }

        let target = NaiveDateTime::parse_from_str(value.trim(), BROWSER_TIME_FORMAT)
            .map_err(|e| UtilsError::time(value, e.to_string()))?;

        *self.offset.write() = target - Utc::now().naive_utc();
        self.mark_synchronized();
        Ok(true)
    }
}
