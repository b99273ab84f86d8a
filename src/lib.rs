//! An asynchronous, multi-producer / single-consumer logging engine.
//!
//! Producer threads format records into stack-resident fixed buffers and
//! hand the finished bytes to a shared double-buffered pipeline; a single
//! background thread drains the pipeline into size- and day-rolled files
//! with bounded retention. Memory is bounded (four 4 MB buffers at steady
//! state), quiet periods are flushed on a timer, and a backlog past
//! ~100 MB is shed with a synthetic notice record.
//!
//! ```no_run
//! use fastlog::{init_log, log_info, uninit_log};
//!
//! fastlog::config::set_log_dir("./log/");
//! init_log("server");
//! log_info!("listening on {}", 8080);
//! uninit_log();
//! ```

pub mod async_logging;
pub mod compress;
pub mod config;
pub mod fixed_buffer;
pub mod log_file;
pub mod log_stream;
pub mod record;
pub mod time_cache;

pub use async_logging::{init_log, uninit_log, AsyncLogging};
pub use fixed_buffer::{FixedBuffer, LARGE_BUFFER, SMALL_BUFFER};
pub use log_file::{LogFile, LogFileManager};
pub use log_stream::{Fmt, LogStream, StreamValue};
pub use record::{
    set_flush, set_output, source_basename, FlushFunc, Level, OutputFunc, Record,
};
