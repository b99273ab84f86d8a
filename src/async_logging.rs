use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use lazy_static::lazy_static;

use crate::compress;
use crate::config;
use crate::fixed_buffer::{FixedBuffer, LARGE_BUFFER};
use crate::log_file::LogFileManager;
use crate::record;

type Buffer = FixedBuffer<LARGE_BUFFER>;
type BufferPtr = Box<Buffer>;

/// Filled-buffer backlog beyond which the consumer sheds.
const OVERFLOW_BUFFERS: usize = 25;
/// Buffers kept across a shed and recycled between consumer cycles.
const RETAINED_BUFFERS: usize = 2;

/// Everything the pipeline mutex protects.
struct PipelineState {
    /// Buffer receiving new appends; never observably absent.
    current: BufferPtr,
    /// Pre-allocated replacement so a handoff does not allocate.
    next: Option<BufferPtr>,
    /// Filled buffers awaiting the consumer, oldest first.
    filled: Vec<BufferPtr>,
    /// Bytes appended since the last MiB-threshold reset; drives
    /// size-based rotation from the pipeline side.
    running_bytes: u64,
}

/// State shared between producers and the consumer thread.
struct Inner {
    state: Mutex<PipelineState>,
    ready: Condvar,
    running: AtomicBool,
    prefix: String,
}

/// The multi-producer / single-consumer logging pipeline.
///
/// Producers call [`AsyncLogging::append`] with finished record bytes; a
/// background thread drains filled 4 MB buffers into a rolling
/// [`LogFileManager`]. Four large buffers exist at steady state: `current`,
/// `next`, and the consumer's two spares.
pub struct AsyncLogging {
    inner: Arc<Inner>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncLogging {
    pub fn new(prefix: impl Into<String>) -> Self {
        AsyncLogging {
            inner: Arc::new(Inner {
                state: Mutex::new(PipelineState {
                    current: Buffer::boxed(),
                    next: Some(Buffer::boxed()),
                    filled: Vec::with_capacity(16),
                    running_bytes: 0,
                }),
                ready: Condvar::new(),
                running: AtomicBool::new(false),
                prefix: prefix.into(),
            }),
            thread: Mutex::new(None),
        }
    }

    /// Spawns the consumer thread. Idempotent.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || inner.consume());
        *self.thread.lock().unwrap() = Some(handle);
    }

    /// Requests shutdown and joins the consumer, which drains what it holds
    /// and flushes before exiting. Idempotent.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.inner.ready.notify_all();
        let handle = self.thread.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Submits one record's bytes. Never blocks on I/O.
    pub fn append(&self, bytes: &[u8]) {
        self.inner.append(bytes);
    }
}

impl Drop for AsyncLogging {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    /// Seals the current buffer when it cannot hold the record or the
    /// running byte count crosses the configured MiB threshold, waking the
    /// consumer; then appends.
    fn append(&self, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();

        let hit_threshold = state.running_bytes >> 20 >= u64::from(config::max_log_size_clamped());
        if state.current.avail() <= bytes.len() || hit_threshold {
            if hit_threshold {
                state.running_bytes = 0;
            }
            let replacement = state.next.take().unwrap_or_else(Buffer::boxed);
            let full = mem::replace(&mut state.current, replacement);
            state.filled.push(full);
            self.ready.notify_one();
        }

        state.current.append(bytes);
        state.running_bytes += bytes.len() as u64;
    }

    fn consume(&self) {
        let mut files = LogFileManager::new(
            config::log_dir(),
            self.prefix.as_str(),
            u64::from(config::max_log_size_clamped()) * 1024,
            config::max_file_count(),
            config::log_flush_interval(),
        );

        let mut spare1 = Some(Buffer::boxed());
        let mut spare2 = Some(Buffer::boxed());
        let mut to_write: Vec<BufferPtr> = Vec::with_capacity(16);

        loop {
            let still_running = self.collect(&mut to_write, &mut spare1, &mut spare2);

            if to_write.len() > OVERFLOW_BUFFERS {
                let notice = drop_notice(to_write.len());
                eprint!("{}", notice);
                files.append(notice.as_bytes());
                to_write.truncate(RETAINED_BUFFERS);
            }

            for buffer in &to_write {
                write_payload(&mut files, buffer.view());
            }

            // Keep two buffers to replenish the spares; the rest are freed.
            to_write.truncate(RETAINED_BUFFERS);
            if spare1.is_none() {
                if let Some(mut buffer) = to_write.pop() {
                    buffer.reset();
                    spare1 = Some(buffer);
                }
            }
            if spare2.is_none() {
                if let Some(mut buffer) = to_write.pop() {
                    buffer.reset();
                    spare2 = Some(buffer);
                }
            }
            to_write.clear();
            files.flush();

            if !still_running {
                break;
            }
        }
    }

    /// Blocks until filled buffers are available, the flush interval
    /// elapses, or shutdown is requested; then takes the filled list. On a
    /// timeout (and on shutdown) the current buffer is sealed too, so quiet
    /// periods still reach disk. Returns whether the pipeline is running.
    fn collect(
        &self,
        to_write: &mut Vec<BufferPtr>,
        spare1: &mut Option<BufferPtr>,
        spare2: &mut Option<BufferPtr>,
    ) -> bool {
        let wait = Duration::from_secs(config::log_flush_interval().max(1));
        let mut state = self.state.lock().unwrap();

        let mut timed_out = false;
        while state.filled.is_empty() && self.running.load(Ordering::Acquire) {
            let (guard, status) = self.ready.wait_timeout(state, wait).unwrap();
            state = guard;
            if status.timed_out() {
                timed_out = true;
                break;
            }
        }

        let running = self.running.load(Ordering::Acquire);
        if timed_out || !running {
            if let Some(mut replacement) = spare1.take() {
                replacement.reset();
                let full = mem::replace(&mut state.current, replacement);
                state.filled.push(full);
            }
        }

        mem::swap(to_write, &mut state.filled);
        if state.next.is_none() {
            state.next = spare2.take();
        }
        running
    }
}

/// Writes one filled buffer through the codec adapter; a codec failure
/// falls back to the raw payload.
fn write_payload(files: &mut LogFileManager, payload: &[u8]) {
    match compress::compress(payload) {
        Ok(packed) => files.append(&packed),
        Err(_) => files.append(payload),
    }
}

fn drop_notice(backlog: usize) -> String {
    format!(
        "Dropped log messages at {}, {} larger buffers\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        backlog - RETAINED_BUFFERS
    )
}

lazy_static! {
    static ref PIPELINE: Mutex<Option<Arc<AsyncLogging>>> = Mutex::new(None);
}

/// Starts the logging pipeline and routes record dispatch into it. Files
/// are named `<prefix>_YYYYMMDD_HHMMSS.mmm.log` under the configured
/// directory. A second call while the pipeline is live is a no-op.
pub fn init_log(prefix: &str) {
    let mut slot = PIPELINE.lock().unwrap();
    if slot.is_some() {
        return;
    }

    let pipeline = Arc::new(AsyncLogging::new(prefix));
    pipeline.start();

    let output = Arc::clone(&pipeline);
    record::set_output(Arc::new(move |bytes: &[u8]| output.append(bytes)));
    // Fatal records drain the pipeline synchronously before aborting.
    let flush = Arc::clone(&pipeline);
    record::set_flush(Arc::new(move || flush.stop()));

    *slot = Some(pipeline);
}

/// Stops the pipeline, releasing its background thread after a final drain.
pub fn uninit_log() {
    let pipeline = PIPELINE.lock().unwrap().take();
    if let Some(pipeline) = pipeline {
        pipeline.stop();
    }
}
