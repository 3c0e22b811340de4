//! Allocation-free rendering of diagnostic records.
//!
//! A record is one line of UTF-8:
//!
//! ```text
//! <timestamp>:<message>{<param1>}{<param2>}...\n
//! ```
//!
//! Everything is written into a caller-supplied fixed-size buffer. Nothing
//! here allocates or fails: a record that does not fit is truncated with a
//! visible `...` marker, and a buffer too small for even the markers yields
//! a partial record.

mod field;
mod timestamp;

pub use field::{ELLIPSIS, MESSAGE_RESERVE, PARAMETER_RESERVE, encode_field};
pub use timestamp::{MAX_TIMESTAMP_LEN, TIMESTAMP_BASE_LEN, Timestamp, encode_timestamp};

/// Separator between the timestamp and the message.
pub const TIMESTAMP_SEPARATOR: u8 = b':';

/// Record terminator.
pub const RECORD_TERMINATOR: u8 = b'\n';

/// Text rendered for a missing parameter value.
pub const NULL_PARAMETER: &str = "null";

/// Render a whole record into `buffer` and return the number of bytes written.
pub fn render_event(
    timestamp: &Timestamp,
    message: &str,
    parameters: &[Option<&str>],
    buffer: &mut [u8],
) -> usize {
    let mut pos = encode_timestamp(timestamp, buffer, 0);
    if pos > 0 && pos + 1 < buffer.len() {
        buffer[pos] = TIMESTAMP_SEPARATOR;
        pos += 1;
    }

    pos = encode_field(message, false, buffer, pos);
    for parameter in parameters {
        pos = encode_field(parameter.unwrap_or(NULL_PARAMETER), true, buffer, pos);
    }

    if pos < buffer.len() {
        buffer[pos] = RECORD_TERMINATOR;
        pos += 1;
    }
    pos
}
