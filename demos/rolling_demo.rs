//! Multi-threaded rolling demo: two workers log at every level while the
//! background pipeline rolls files under ./demo_logs/.
//!
//! Run with: cargo run --example rolling_demo

use std::thread;
use std::time::Duration;

use fastlog::{
    config, init_log, log_debug, log_error, log_info, log_trace, log_warn, uninit_log, Level,
};

fn worker(long_payload: bool) {
    let long_text = "X".repeat(3000);
    let short_text = String::from(" ");

    let mut count = 0u64;
    for _ in 0..20 {
        for _ in 0..500 {
            log_trace!("0123456789");
            log_debug!("abcdefghijklmnopqrstuvwxyz");
            log_info!(
                "Hello 0123456789 abcdefghijklmnopqrstuvwxyz {}{}",
                if long_payload { &long_text } else { &short_text },
                count
            );
            log_warn!("abcdefghijklmnopqrstuvwxyz");
            log_error!("0123456789");
            count += 1;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn main() {
    config::set_log_dir("./demo_logs/");
    config::set_min_log_level(Level::Trace);
    config::set_max_log_size(5);
    config::set_log_flush_interval(1);
    config::set_log_stderr(false);
    init_log("demo");

    let long_worker = thread::spawn(|| worker(true));
    let short_worker = thread::spawn(|| worker(false));
    long_worker.join().unwrap();
    short_worker.join().unwrap();

    uninit_log();
    println!("done; inspect ./demo_logs/");
}
