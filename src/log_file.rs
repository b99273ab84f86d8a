use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

/// In-process I/O buffer in front of the kernel.
const FILE_BUFFER_SIZE: usize = 64 * 1024;

const DAY_OF_SECONDS: i64 = 24 * 60 * 60;

/// Buffered append-only writer for one on-disk log file.
///
/// A file that fails to open is a tolerated state: appends become no-ops
/// and the written-bytes counter stays at zero.
pub struct LogFile {
    writer: Option<BufWriter<File>>,
    written_bytes: u64,
}

impl LogFile {
    pub fn open(path: &Path) -> Self {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(|file| BufWriter::with_capacity(FILE_BUFFER_SIZE, file));
        LogFile {
            writer,
            written_bytes: 0,
        }
    }

    fn closed() -> Self {
        LogFile {
            writer: None,
            written_bytes: 0,
        }
    }

    /// Appends `bytes`, retrying short writes. A zero-progress write or a
    /// hard error abandons the rest of the fragment; the counter advances
    /// by what was actually written.
    pub fn append(&mut self, bytes: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let mut written = 0;
        while written < bytes.len() {
            match writer.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        self.written_bytes += written as u64;
    }

    /// Forces the in-process buffer down to the kernel.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    pub fn written_bytes(&self) -> u64 {
        self.written_bytes
    }
}

/// Rolls log files by size and by day, keeping at most `max_file` of them
/// on disk (oldest deleted first).
///
/// The manager is single-owner by construction: the pipeline consumer holds
/// it exclusively and needs no lock. Sharing it across producer threads is
/// done by wrapping it in `Arc<Mutex<_>>` at the call site.
pub struct LogFileManager {
    max_size_kib: u64,
    max_file: usize,
    flush_interval: i64,
    day_start: i64,
    last_flush: i64,
    dir: PathBuf,
    prefix: String,
    file: LogFile,
    names: VecDeque<PathBuf>,
}

impl LogFileManager {
    /// Creates `dir` if absent; otherwise seeds the retention queue with
    /// every existing file whose name contains `prefix`. Opens the first
    /// file immediately.
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        max_size_kib: u64,
        max_file: usize,
        flush_interval_secs: u64,
    ) -> Self {
        let dir = dir.into();
        let prefix = prefix.into();

        let mut names = VecDeque::new();
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        } else if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if name.to_string_lossy().contains(&prefix) {
                    names.push_back(dir.join(name));
                }
            }
        }

        let mut manager = LogFileManager {
            max_size_kib,
            max_file,
            flush_interval: flush_interval_secs as i64,
            day_start: 0,
            last_flush: 0,
            dir,
            prefix,
            file: LogFile::closed(),
            names,
        };
        manager.roll_file();
        manager
    }

    /// Appends one fragment, then applies the rotation and flush policy.
    pub fn append(&mut self, bytes: &[u8]) {
        self.file.append(bytes);

        if self.file.written_bytes() >> 10 >= self.max_size() {
            self.roll_file();
        } else {
            let now = Local::now().timestamp();
            let today = now / DAY_OF_SECONDS * DAY_OF_SECONDS;
            if today != self.day_start {
                self.roll_file();
            } else if now - self.last_flush > self.flush_interval {
                self.last_flush = now;
                self.file.flush();
            }
        }
    }

    pub fn flush(&mut self) {
        self.file.flush();
    }

    /// Bytes written into the current file.
    pub fn written_bytes(&self) -> u64 {
        self.file.written_bytes()
    }

    /// Number of files currently tracked for retention.
    pub fn retained_files(&self) -> usize {
        self.names.len()
    }

    fn max_size(&self) -> u64 {
        if self.max_size_kib > 0 {
            self.max_size_kib
        } else {
            1
        }
    }

    fn roll_file(&mut self) {
        let now = Local::now();
        let filename = self.dir.join(format!(
            "{}_{}.log",
            self.prefix,
            now.format("%Y%m%d_%H%M%S%.3f")
        ));

        while self.names.len() >= self.max_file {
            match self.names.pop_front() {
                Some(oldest) => {
                    let _ = fs::remove_file(oldest);
                }
                None => break,
            }
        }
        self.names.push_back(filename.clone());

        let secs = now.timestamp();
        self.day_start = secs / DAY_OF_SECONDS * DAY_OF_SECONDS;
        self.last_flush = secs;
        self.file = LogFile::open(&filename);
    }
}
