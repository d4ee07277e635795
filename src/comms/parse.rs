//! Lenient `KEY:VALUE` line parsing.
//!
//! Nothing here fails.  A line without a colon becomes a command with an
//! empty key; a value that is not a number reads as zero.

use heapless::String;

use super::COMM_BUFFER_SIZE;

/// Key or value text, bounded by the line buffer.
pub type Field = String<COMM_BUFFER_SIZE>;

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub key: Field,
    pub value: Field,
}

impl Command {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Value as an integer, `atoi` rules.
    pub fn int_value(&self) -> i32 {
        parse_int(&self.value)
    }
}

/// Copy ASCII text into a field, dropping `\r` and replacing anything
/// non-ASCII with `?`.
fn to_field(bytes: &[u8]) -> Field {
    let mut out = Field::new();
    for &b in bytes.iter().filter(|&&b| b != b'\r') {
        let c = if b.is_ascii() { char::from(b) } else { '?' };
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Split a raw line into key and value.
///
/// The key runs up to the first `:`.  The value is everything after it up
/// to the first `\n`, with `\r` removed.  Without a colon the key is empty
/// and the trimmed line becomes the value.
pub fn parse_line(line: &[u8]) -> Command {
    let line = match line.iter().position(|&b| b == b'\n') {
        Some(end) => &line[..end],
        None => line,
    };
    match line.iter().position(|&b| b == b':') {
        Some(colon) => Command {
            key: to_field(&line[..colon]),
            value: to_field(&line[colon + 1..]),
        },
        None => {
            let trimmed = to_field(line);
            let mut value = Field::new();
            // A trimmed slice is never longer than the original.
            let _ = value.push_str(trimmed.trim());
            Command { key: Field::new(), value }
        }
    }
}

/// C `atoi` semantics: skip leading whitespace, optional sign, then as
/// many digits as follow.  No digits yields 0; overflow saturates.
pub fn parse_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut acc: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        acc = (acc * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let signed = if negative { -acc } else { acc };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
