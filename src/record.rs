use std::fmt::{self, Write as _};
use std::io::{self, Write as _};
use std::sync::{Arc, RwLock};

use chrono::Local;
use lazy_static::lazy_static;

use crate::config;
use crate::log_stream::LogStream;
use crate::time_cache;

/// Record severity, ordered from chattiest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// 6-char space-padded tokens, indexed by level.
const LEVEL_NAMES: [&str; 6] = ["TRACE ", "DEBUG ", "INFO  ", "WARN  ", "ERROR ", "FATAL "];

impl Level {
    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Fatal,
        }
    }

    pub(crate) fn token(self) -> &'static str {
        LEVEL_NAMES[self as usize]
    }
}

/// Byte sink every finalized record is handed to.
pub type OutputFunc = Arc<dyn Fn(&[u8]) + Send + Sync>;
/// Invoked before the process aborts on a fatal record.
pub type FlushFunc = Arc<dyn Fn() + Send + Sync>;

fn default_output(_msg: &[u8]) {}

fn default_flush() {
    let _ = io::stderr().flush();
}

lazy_static! {
    static ref OUTPUT: RwLock<OutputFunc> = RwLock::new(Arc::new(default_output));
    static ref FLUSH: RwLock<FlushFunc> = RwLock::new(Arc::new(default_flush));
}

/// Installs the byte sink records are dispatched to. `init_log` points this
/// at the async pipeline; tests substitute their own collectors.
pub fn set_output(output: OutputFunc) {
    *OUTPUT.write().unwrap() = output;
}

pub fn set_flush(flush: FlushFunc) {
    *FLUSH.write().unwrap() = flush;
}

fn output_hook() -> OutputFunc {
    OUTPUT.read().unwrap().clone()
}

fn flush_hook() -> FlushFunc {
    FLUSH.read().unwrap().clone()
}

/// Substring of `path` after the final path separator. Usable in const
/// context, so `file!()` folds to its basename at compile time.
pub const fn source_basename(path: &'static str) -> &'static str {
    let bytes = path.as_bytes();
    let mut i = bytes.len();
    while i > 0 {
        i -= 1;
        if bytes[i] == b'/' || bytes[i] == b'\\' {
            let (_, tail) = bytes.split_at(i + 1);
            // SAFETY: the split is right after an ASCII separator, which
            // cannot sit inside a multi-byte UTF-8 sequence.
            return unsafe { std::str::from_utf8_unchecked(tail) };
        }
    }
    path
}

fn color_print(msg: &[u8], level: Level) {
    let color = match level {
        Level::Info => "\x1b[0;34m",
        Level::Error => "\x1b[0;31m",
        Level::Warn => "\x1b[1;33m",
        _ => "\x1b[1;37m",
    };
    eprint!("{}{}\x1b[0m", color, String::from_utf8_lossy(msg));
}

/// A single in-flight log record.
///
/// Construction stamps the header (level token, cached time prefix); the
/// payload is pushed through [`Record::stream`] or [`Record::write_args`];
/// dropping the record appends the ` - basename:line\n` trailer and hands
/// the finished line to the installed output sink. The `log_*!` macros
/// manage the whole lifecycle; a record lives for one statement.
pub struct Record {
    stream: LogStream,
    level: Level,
    basename: &'static str,
    line: u32,
}

impl Record {
    pub fn new(basename: &'static str, line: u32, level: Level) -> Self {
        let now = Local::now();
        let mut stream = LogStream::new();
        stream.push(level.token());
        time_cache::append_time_prefix(&mut stream, &now);
        Record {
            stream,
            level,
            basename,
            line,
        }
    }

    /// Tags the record with the originating module, the form DEBUG and
    /// TRACE records carry.
    pub fn with_func(mut self, func: &'static str) -> Self {
        self.stream.push('[').push(func).push("] ");
        self
    }

    /// Appends the thread's last OS error, for the `log_syserr!` family.
    pub fn with_os_error(mut self) -> Self {
        let err = io::Error::last_os_error();
        let _ = write!(self.stream, "{} ", err);
        self
    }

    pub fn stream(&mut self) -> &mut LogStream {
        &mut self.stream
    }

    /// Writes the formatted payload and finalizes the record.
    pub fn write_args(mut self, args: fmt::Arguments<'_>) {
        let _ = self.stream.write_fmt(args);
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        self.stream
            .push(" - ")
            .push(self.basename)
            .push(':')
            .push(self.line)
            .push('\n');

        let buffer = self.stream.buffer();
        output_hook()(buffer.view());

        if config::log_stderr() {
            color_print(buffer.view(), self.level);
        }

        if self.level == Level::Fatal {
            flush_hook()();
            std::process::abort();
        }
    }
}

/// Builds the record behind the `log_*!` macros. Not called directly.
#[doc(hidden)]
#[macro_export]
macro_rules! __record {
    ($level:ident) => {
        $crate::Record::new(
            {
                const BASENAME: &str = $crate::source_basename(::core::file!());
                BASENAME
            },
            ::core::line!(),
            $crate::Level::$level,
        )
    };
}

/// Emits a TRACE record tagged with the originating module.
#[macro_export]
macro_rules! log_trace {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Trace {
            $crate::__record!(Trace).with_func(::core::module_path!());
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Trace {
            $crate::__record!(Trace)
                .with_func(::core::module_path!())
                .write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits a DEBUG record tagged with the originating module.
#[macro_export]
macro_rules! log_debug {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Debug {
            $crate::__record!(Debug).with_func(::core::module_path!());
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Debug {
            $crate::__record!(Debug)
                .with_func(::core::module_path!())
                .write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits an INFO record.
#[macro_export]
macro_rules! log_info {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Info {
            $crate::__record!(Info);
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Info {
            $crate::__record!(Info).write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits a WARN record.
#[macro_export]
macro_rules! log_warn {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Warn {
            $crate::__record!(Warn);
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Warn {
            $crate::__record!(Warn).write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits an ERROR record.
#[macro_export]
macro_rules! log_error {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Error {
            $crate::__record!(Error);
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Error {
            $crate::__record!(Error).write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits a FATAL record, then flushes the pipeline and aborts the process.
#[macro_export]
macro_rules! log_fatal {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Fatal {
            $crate::__record!(Fatal);
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Fatal {
            $crate::__record!(Fatal).write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits an ERROR record prefixed with the thread's last OS error.
#[macro_export]
macro_rules! log_syserr {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Error {
            $crate::__record!(Error).with_os_error();
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Error {
            $crate::__record!(Error)
                .with_os_error()
                .write_args(::core::format_args!($($arg)+));
        }
    };
}

/// Emits a FATAL record prefixed with the thread's last OS error, then
/// flushes the pipeline and aborts the process.
#[macro_export]
macro_rules! log_sysfatal {
    () => {
        if $crate::config::min_log_level() <= $crate::Level::Fatal {
            $crate::__record!(Fatal).with_os_error();
        }
    };
    ($($arg:tt)+) => {
        if $crate::config::min_log_level() <= $crate::Level::Fatal {
            $crate::__record!(Fatal)
                .with_os_error()
                .write_args(::core::format_args!($($arg)+));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_directories() {
        assert_eq!(source_basename("src/record.rs"), "record.rs");
        assert_eq!(source_basename("/a/b/c/deep.rs"), "deep.rs");
        assert_eq!(source_basename(r"C:\src\lib.rs"), "lib.rs");
        assert_eq!(source_basename("bare.rs"), "bare.rs");
    }

    #[test]
    fn basename_is_const_foldable() {
        const NAME: &str = source_basename(file!());
        assert_eq!(NAME, "record.rs");
    }

    #[test]
    fn level_tokens_are_six_chars() {
        for name in LEVEL_NAMES {
            assert_eq!(name.len(), 6);
        }
    }

    #[test]
    fn level_order() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(Level::from_u8(Level::Warn as u8), Level::Warn);
    }
}

