//! Bounded UTF-8 field encoding.

/// Marker appended to a field that had to be cut short.
pub const ELLIPSIS: &[u8] = b"...";

/// Trailing bytes a message needs kept free: `...` plus the terminator.
pub const MESSAGE_RESERVE: usize = ELLIPSIS.len() + 1;

/// Trailing bytes a parameter needs kept free: `{...}` plus the terminator.
pub const PARAMETER_RESERVE: usize = ELLIPSIS.len() + 3;

/// Append `text` to `buffer` at `position` and return the new position.
///
/// Parameters are wrapped in `{` `}`. If the space left cannot hold the
/// truncation marker and the terminator, nothing is written. Text that does
/// not fit is cut on a character boundary and suffixed with `...` (inside
/// the braces for a parameter), so at least one byte always remains free for
/// the record terminator.
pub fn encode_field(text: &str, is_parameter: bool, buffer: &mut [u8], position: usize) -> usize {
    let reserve = if is_parameter {
        PARAMETER_RESERVE
    } else {
        MESSAGE_RESERVE
    };
    let Some(budget) = buffer
        .len()
        .checked_sub(position)
        .and_then(|remaining| remaining.checked_sub(reserve))
    else {
        return position;
    };

    let (body, truncated) = if text.len() <= budget {
        (text.as_bytes(), false)
    } else {
        (&text.as_bytes()[..char_floor(text, budget)], true)
    };

    let mut pos = position;
    if is_parameter {
        buffer[pos] = b'{';
        pos += 1;
    }
    pos = put(buffer, pos, body);
    if truncated {
        pos = put(buffer, pos, ELLIPSIS);
    }
    if is_parameter {
        buffer[pos] = b'}';
        pos += 1;
    }
    pos
}

fn put(buffer: &mut [u8], position: usize, bytes: &[u8]) -> usize {
    let end = position + bytes.len();
    buffer[position..end].copy_from_slice(bytes);
    end
}

/// Largest char boundary of `text` that is `<= limit`.
fn char_floor(text: &str, limit: usize) -> usize {
    let mut index = limit.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
