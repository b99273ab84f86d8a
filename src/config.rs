//! Runtime configuration flags.
//!
//! All flags are process-wide and read without locking on the hot path.
//! They are meant to be set before [`crate::init_log`]; changing them
//! afterwards is safe and takes effect eventually.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;

use lazy_static::lazy_static;

use crate::record::Level;

lazy_static! {
    static ref LOG_DIR: RwLock<PathBuf> = RwLock::new(PathBuf::from("./log/"));
}

static MIN_LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static MAX_LOG_SIZE: AtomicU32 = AtomicU32::new(10);
static LOG_FLUSH_INTERVAL: AtomicU64 = AtomicU64::new(3);
static LOG_STDERR: AtomicBool = AtomicBool::new(true);
static MAX_FILE_COUNT: AtomicU64 = AtomicU64::new(10);

/// Directory the rolling files are written to; created if absent.
pub fn log_dir() -> PathBuf {
    LOG_DIR.read().unwrap().clone()
}

pub fn set_log_dir(dir: impl Into<PathBuf>) {
    *LOG_DIR.write().unwrap() = dir.into();
}

/// Records below this level are elided with no formatting cost.
pub fn min_log_level() -> Level {
    Level::from_u8(MIN_LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_min_log_level(level: Level) {
    MIN_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Per-file rotation threshold in MiB.
pub fn max_log_size() -> u32 {
    MAX_LOG_SIZE.load(Ordering::Relaxed)
}

pub fn set_max_log_size(mib: u32) {
    MAX_LOG_SIZE.store(mib, Ordering::Relaxed);
}

/// `max_log_size` with values outside `(0, 4096)` treated as 1.
pub(crate) fn max_log_size_clamped() -> u32 {
    let size = max_log_size();
    if size > 0 && size < 4096 {
        size
    } else {
        1
    }
}

/// Consumer wait timeout and file flush period, in seconds.
pub fn log_flush_interval() -> u64 {
    LOG_FLUSH_INTERVAL.load(Ordering::Relaxed)
}

pub fn set_log_flush_interval(seconds: u64) {
    LOG_FLUSH_INTERVAL.store(seconds, Ordering::Relaxed);
}

/// Whether records are mirrored to standard error with level colors.
pub fn log_stderr() -> bool {
    LOG_STDERR.load(Ordering::Relaxed)
}

pub fn set_log_stderr(enabled: bool) {
    LOG_STDERR.store(enabled, Ordering::Relaxed);
}

/// Bound on the number of files kept on disk; oldest are deleted first.
pub fn max_file_count() -> usize {
    MAX_FILE_COUNT.load(Ordering::Relaxed) as usize
}

pub fn set_max_file_count(count: usize) {
    MAX_FILE_COUNT.store(count as u64, Ordering::Relaxed);
}
