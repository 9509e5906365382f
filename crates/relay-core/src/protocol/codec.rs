//! Text codec for encoding and decoding wire lines.
//!
//! Pure functions, no state, no I/O. `decode(encode(e))` recovers `e` for
//! every valid event; decoding is best-effort and tolerant of trailing
//! whitespace, since peer firmware may echo lines back with a newline
//! appended.

use thiserror::Error;

use crate::protocol::messages::{
    InputEvent, MAX_KEY_CODE, MAX_POINTER_COORD, MAX_WIRE_LINE_BYTES, PREFIX_KEY_PRESS,
    PREFIX_KEY_RELEASE, PREFIX_POINTER_PRESS, PREFIX_POINTER_RELEASE,
};

/// Errors that can occur while encoding an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A field is outside the range the peer firmware accepts.
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    /// The encoded line would not fit in a single GATT write.
    #[error("encoded line is {got} bytes, limit is {limit}")]
    LineTooLong { got: usize, limit: usize },
}

/// Errors that can occur while decoding a wire line.
///
/// Decode failures are never fatal to the session; the caller logs them
/// and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The line does not start with one of the four known prefixes.
    #[error("unknown message format: {0:?}")]
    UnknownFormat(String),

    /// A prefix matched but a numeric field could not be parsed or is out
    /// of range.
    #[error("malformed {field} in {prefix} message: {value:?}")]
    MalformedField {
        prefix: &'static str,
        field: &'static str,
        value: String,
    },

    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes an [`InputEvent`] into one wire line (no trailing newline).
///
/// # Errors
///
/// Returns [`EncodeError::UnsupportedEvent`] if a key code exceeds
/// [`MAX_KEY_CODE`] or a coordinate exceeds [`MAX_POINTER_COORD`]. Such an
/// event must not be sent.
///
/// # Examples
///
/// ```rust
/// use relay_core::{encode, InputEvent};
///
/// let line = encode(&InputEvent::KeyDown { code: 65 }).unwrap();
/// assert_eq!(line, "KP:65");
///
/// let line = encode(&InputEvent::PointerDown { x: 100, y: 200 }).unwrap();
/// assert_eq!(line, "MDown:100,200");
/// ```
pub fn encode(event: &InputEvent) -> Result<String, EncodeError> {
    let line = match event {
        InputEvent::KeyDown { code } => {
            check_key_code(*code)?;
            format!("{PREFIX_KEY_PRESS}{code}")
        }
        InputEvent::KeyUp { code } => {
            check_key_code(*code)?;
            format!("{PREFIX_KEY_RELEASE}{code}")
        }
        InputEvent::PointerDown { x, y } => {
            check_coord(*x, *y)?;
            format!("{PREFIX_POINTER_PRESS}{x},{y}")
        }
        InputEvent::PointerUp { x, y } => {
            check_coord(*x, *y)?;
            format!("{PREFIX_POINTER_RELEASE}{x},{y}")
        }
    };

    // Every line must fit a single GATT write.
    if line.len() > MAX_WIRE_LINE_BYTES {
        return Err(EncodeError::LineTooLong {
            got: line.len(),
            limit: MAX_WIRE_LINE_BYTES,
        });
    }
    Ok(line)
}

fn check_key_code(code: u32) -> Result<(), EncodeError> {
    if code > MAX_KEY_CODE {
        return Err(EncodeError::UnsupportedEvent(format!(
            "key code {code:#x} exceeds {MAX_KEY_CODE:#x}"
        )));
    }
    Ok(())
}

fn check_coord(x: u16, y: u16) -> Result<(), EncodeError> {
    if x > MAX_POINTER_COORD || y > MAX_POINTER_COORD {
        return Err(EncodeError::UnsupportedEvent(format!(
            "coordinate ({x},{y}) exceeds {MAX_POINTER_COORD}"
        )));
    }
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one wire line back into an [`InputEvent`].
///
/// Trailing whitespace and newlines are ignored.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownFormat`] for lines that match none of the
/// four prefixes, and [`DecodeError::MalformedField`] for unparseable or
/// out-of-range fields.
///
/// # Examples
///
/// ```rust
/// use relay_core::{decode, InputEvent};
///
/// assert_eq!(decode(b"KR:65\r\n").unwrap(), InputEvent::KeyUp { code: 65 });
/// assert_eq!(
///     decode(b"MUp:100,200").unwrap(),
///     InputEvent::PointerUp { x: 100, y: 200 },
/// );
/// ```
pub fn decode(line: &[u8]) -> Result<InputEvent, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidUtf8)?;
    let text = text.trim_end();

    if let Some(rest) = text.strip_prefix(PREFIX_KEY_PRESS) {
        let code = parse_key_code(PREFIX_KEY_PRESS, rest)?;
        return Ok(InputEvent::KeyDown { code });
    }
    if let Some(rest) = text.strip_prefix(PREFIX_KEY_RELEASE) {
        let code = parse_key_code(PREFIX_KEY_RELEASE, rest)?;
        return Ok(InputEvent::KeyUp { code });
    }
    if let Some(rest) = text.strip_prefix(PREFIX_POINTER_PRESS) {
        let (x, y) = parse_coord(PREFIX_POINTER_PRESS, rest)?;
        return Ok(InputEvent::PointerDown { x, y });
    }
    if let Some(rest) = text.strip_prefix(PREFIX_POINTER_RELEASE) {
        let (x, y) = parse_coord(PREFIX_POINTER_RELEASE, rest)?;
        return Ok(InputEvent::PointerUp { x, y });
    }

    Err(DecodeError::UnknownFormat(text.to_string()))
}

fn parse_key_code(prefix: &'static str, rest: &str) -> Result<u32, DecodeError> {
    let malformed = || DecodeError::MalformedField {
        prefix,
        field: "code",
        value: rest.to_string(),
    };
    let code: u32 = rest.parse().map_err(|_| malformed())?;
    if code > MAX_KEY_CODE {
        return Err(malformed());
    }
    Ok(code)
}

fn parse_coord(prefix: &'static str, rest: &str) -> Result<(u16, u16), DecodeError> {
    let malformed = |field| DecodeError::MalformedField {
        prefix,
        field,
        value: rest.to_string(),
    };
    let (x_str, y_str) = rest.split_once(',').ok_or_else(|| malformed("x,y"))?;
    let x: u16 = x_str.parse().map_err(|_| malformed("x"))?;
    let y: u16 = y_str.parse().map_err(|_| malformed("y"))?;
    if x > MAX_POINTER_COORD || y > MAX_POINTER_COORD {
        return Err(malformed("x,y"));
    }
    Ok((x, y))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
