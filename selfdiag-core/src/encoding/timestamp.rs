//! Fixed-width timestamp rendering.
//!
//! Digits are produced with integer division straight into the caller's
//! buffer. No `format!`, no intermediate `String`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike, Utc};

/// Length of `YYYY-MM-DDTHH:MM:SS.fffffff` without any zone suffix.
pub const TIMESTAMP_BASE_LEN: usize = 27;

/// Longest possible encoded timestamp (`±HH:MM` suffix).
pub const MAX_TIMESTAMP_LEN: usize = TIMESTAMP_BASE_LEN + 6;

/// An instant together with how its zone should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Rendered with a trailing `Z`.
    Utc(DateTime<Utc>),
    /// Rendered with a trailing `±HH:MM` offset.
    Zoned(DateTime<FixedOffset>),
    /// Rendered without any zone designator.
    Unspecified(NaiveDateTime),
}

impl Timestamp {
    /// The current instant in UTC.
    pub fn now_utc() -> Self {
        Self::Utc(Utc::now())
    }

    /// Number of bytes `encode_timestamp` writes for this instant.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Utc(_) => TIMESTAMP_BASE_LEN + 1,
            Self::Zoned(_) => MAX_TIMESTAMP_LEN,
            Self::Unspecified(_) => TIMESTAMP_BASE_LEN,
        }
    }

    fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::Utc(dt) => dt.naive_utc(),
            Self::Zoned(dt) => dt.naive_local(),
            Self::Unspecified(naive) => *naive,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Utc(dt)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Zoned(dt)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Unspecified(naive)
    }
}

/// Write `timestamp` into `buffer` at `position` and return the new position.
///
/// The encoding needs `timestamp.encoded_len()` bytes plus one trailing byte
/// kept free for the record terminator. When that does not fit, nothing is
/// written and `position` is returned unchanged.
pub fn encode_timestamp(timestamp: &Timestamp, buffer: &mut [u8], position: usize) -> usize {
    let remaining = buffer.len().saturating_sub(position);
    if remaining <= timestamp.encoded_len() {
        return position;
    }

    let wall = timestamp.wall_clock();
    let mut pos = position;

    pos = put_digits(buffer, pos, wall.year().clamp(0, 9999) as u32, 4);
    buffer[pos] = b'-';
    pos = put_digits(buffer, pos + 1, wall.month(), 2);
    buffer[pos] = b'-';
    pos = put_digits(buffer, pos + 1, wall.day(), 2);
    buffer[pos] = b'T';
    pos = put_digits(buffer, pos + 1, wall.hour(), 2);
    buffer[pos] = b':';
    pos = put_digits(buffer, pos + 1, wall.minute(), 2);
    buffer[pos] = b':';
    pos = put_digits(buffer, pos + 1, wall.second(), 2);
    buffer[pos] = b'.';
    // 100ns ticks; a leap second shows up as nanos >= 1e9
    pos = put_digits(buffer, pos + 1, (wall.nanosecond() % 1_000_000_000) / 100, 7);

    match timestamp {
        Timestamp::Utc(_) => {
            buffer[pos] = b'Z';
            pos += 1;
        }
        Timestamp::Zoned(dt) => {
            let offset = dt.offset().local_minus_utc();
            buffer[pos] = if offset < 0 { b'-' } else { b'+' };
            let offset = offset.unsigned_abs();
            pos = put_digits(buffer, pos + 1, offset / 3600, 2);
            buffer[pos] = b':';
            pos = put_digits(buffer, pos + 1, (offset % 3600) / 60, 2);
        }
        Timestamp::Unspecified(_) => {}
    }

    pos
}

fn put_digits(buffer: &mut [u8], position: usize, mut value: u32, width: usize) -> usize {
    for slot in buffer[position..position + width].iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
    }
    position + width
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sample_naive() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 8, 14)
            .unwrap()
            .and_hms_nano_opt(20, 33, 24, 478_810_900)
            .unwrap()
    }

    fn encode(timestamp: Timestamp) -> String {
        let mut buffer = [0u8; 64];
        let end = encode_timestamp(&timestamp, &mut buffer, 0);
        assert_eq!(end, timestamp.encoded_len());
        String::from_utf8(buffer[..end].to_vec()).unwrap()
    }

    #[test]
    fn utc_timestamp() {
        let ts = Timestamp::Utc(Utc.from_utc_datetime(&sample_naive()));
        assert_eq!(encode(ts), "2020-08-14T20:33:24.4788109Z");
    }

    #[test]
    fn zoned_timestamp() {
        let offset = FixedOffset::west_opt(7 * 3600 + 30 * 60).unwrap();
        let ts = Timestamp::Zoned(offset.from_local_datetime(&sample_naive()).single().unwrap());
        assert_eq!(encode(ts), "2020-08-14T20:33:24.4788109-07:30");

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = Timestamp::Zoned(offset.from_local_datetime(&sample_naive()).single().unwrap());
        assert_eq!(encode(ts), "2020-08-14T20:33:24.4788109+02:00");
    }

    #[test]
    fn unspecified_timestamp() {
        assert_eq!(
            encode(Timestamp::Unspecified(sample_naive())),
            "2020-08-14T20:33:24.4788109"
        );
    }

    #[test]
    fn small_values_are_zero_padded() {
        let naive = NaiveDate::from_ymd_opt(7, 1, 2)
            .unwrap()
            .and_hms_nano_opt(3, 4, 5, 600)
            .unwrap();
        assert_eq!(
            encode(Timestamp::Unspecified(naive)),
            "0007-01-02T03:04:05.0000006"
        );
    }

    #[test]
    fn writes_at_offset() {
        let mut buffer = [b'#'; 40];
        let end = encode_timestamp(&Timestamp::Unspecified(sample_naive()), &mut buffer, 5);
        assert_eq!(end, 5 + TIMESTAMP_BASE_LEN);
        assert_eq!(&buffer[..5], b"#####");
        assert_eq!(&buffer[5..9], b"2020");
    }

    #[test]
    fn no_room_leaves_buffer_untouched() {
        let ts = Timestamp::Utc(Utc.from_utc_datetime(&sample_naive()));

        // Exactly the encoded length leaves no byte for the terminator.
        let mut buffer = [0u8; TIMESTAMP_BASE_LEN + 1];
        assert_eq!(encode_timestamp(&ts, &mut buffer, 0), 0);
        assert!(buffer.iter().all(|b| *b == 0));

        let mut buffer = [0u8; TIMESTAMP_BASE_LEN + 2];
        assert_eq!(encode_timestamp(&ts, &mut buffer, 0), TIMESTAMP_BASE_LEN + 1);
        assert_eq!(encode_timestamp(&ts, &mut buffer, 100), 100);
    }
}
