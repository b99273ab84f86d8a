use std::cell::RefCell;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::log_stream::{Cursor, Fmt, LogStream};

/// Length of the cached `YYYYMMDD HH:MM:SS` text.
const DATE_TIME_LEN: usize = 17;
/// Length of the full time prefix including the `.mmm ` fraction.
pub const TIME_PREFIX_LEN: usize = DATE_TIME_LEN + 5;

thread_local! {
    static CACHE: RefCell<SecondCache> = const {
        RefCell::new(SecondCache {
            last_second: i64::MIN,
            text: [0; DATE_TIME_LEN],
        })
    };
}

/// Per-thread cache of the second-granularity part of the time prefix.
/// Local-time conversion and formatting run at most once per second per
/// producer thread; within a second only the millisecond fraction changes.
struct SecondCache {
    last_second: i64,
    text: [u8; DATE_TIME_LEN],
}

impl SecondCache {
    fn text(&mut self, now: &DateTime<Local>) -> &[u8; DATE_TIME_LEN] {
        let second = now.timestamp();
        if second != self.last_second {
            self.last_second = second;
            let mut cur = Cursor::new(&mut self.text);
            let _ = write!(
                cur,
                "{:04}{:02}{:02} {:02}:{:02}:{:02}",
                now.year(),
                now.month(),
                now.day(),
                now.hour(),
                now.minute(),
                now.second()
            );
        }
        &self.text
    }
}

/// Appends the 22-char `YYYYMMDD HH:MM:SS.mmm ` prefix for `now`.
pub(crate) fn append_time_prefix(stream: &mut LogStream, now: &DateTime<Local>) {
    CACHE.with(|cache| {
        stream.append(cache.borrow_mut().text(now));
    });
    // Leap seconds fold into .999 rather than widening the prefix.
    let ms = now.timestamp_subsec_millis().min(999);
    let fraction = Fmt::new(format_args!(".{:03} ", ms));
    debug_assert_eq!(fraction.len(), 5);
    stream.push(fraction);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix_for(now: &DateTime<Local>) -> Vec<u8> {
        let mut stream = LogStream::new();
        append_time_prefix(&mut stream, now);
        stream.buffer().view().to_vec()
    }

    #[test]
    fn prefix_is_twenty_two_chars() {
        let now = Local::now();
        let text = prefix_for(&now);
        assert_eq!(text.len(), TIME_PREFIX_LEN);
        assert_eq!(text[8], b' ');
        assert_eq!(text[11], b':');
        assert_eq!(text[14], b':');
        assert_eq!(text[17], b'.');
        assert_eq!(text[21], b' ');
    }

    #[test]
    fn prefix_matches_clock_fields() {
        let now = Local::now();
        let text = prefix_for(&now);
        let date = format!(
            "{:04}{:02}{:02}",
            now.year(),
            now.month(),
            now.day()
        );
        assert_eq!(&text[..8], date.as_bytes());
        let ms = format!(".{:03} ", now.timestamp_subsec_millis().min(999));
        assert_eq!(&text[17..], ms.as_bytes());
    }

    #[test]
    fn same_second_reuses_cached_text() {
        let now = Local::now();
        let first = prefix_for(&now);
        let second = prefix_for(&now);
        assert_eq!(first, second);
    }
}
