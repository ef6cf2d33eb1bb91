//! CSV field formatting shared by telemetry rows and event records
//!
//! Lines are built in a fixed-capacity [`CsvLine`]. Missing values are the
//! literal `None` so the offline tooling can tell them from zeros.

use core::fmt::{self, Display, Write};

use crate::errors::{FlightError, FlightResult};
use crate::time::Timestamp;

/// Maximum length of one CSV line
pub const CSV_LINE_CAPACITY: usize = 256;

/// One formatted CSV line, without the trailing newline
pub type CsvLine = heapless::String<CSV_LINE_CAPACITY>;

/// Literal written for a missing value
pub const MISSING: &str = "None";

/// Seconds with millisecond precision, e.g. `12.345`
pub(crate) fn push_timestamp<W: Write>(out: &mut W, timestamp: Timestamp) -> fmt::Result {
    write!(out, "{}.{:03}", timestamp / 1000, timestamp % 1000)
}

/// Value or the missing marker
pub(crate) fn push_optional<W: Write, T: Display>(out: &mut W, value: Option<T>) -> fmt::Result {
    match value {
        Some(value) => write!(out, "{}", value),
        None => out.write_str(MISSING),
    }
}

/// Free text, quoted when it contains a separator, quote or line break
pub(crate) fn push_text<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    if !text.contains([',', '"', '\n', '\r']) {
        return out.write_str(text);
    }
    out.write_char('"')?;
    for ch in text.chars() {
        if ch == '"' {
            out.write_char('"')?;
        }
        out.write_char(ch)?;
    }
    out.write_char('"')
}

/// Map a formatting overflow to a storage error
pub(crate) fn overflow(_: fmt::Error) -> FlightError {
    FlightError::Storage { reason: "csv line overflow" }
}

/// Build a line with `build`, reporting overflow as a storage error
pub(crate) fn line<F>(build: F) -> FlightResult<CsvLine>
where
    F: FnOnce(&mut CsvLine) -> fmt::Result,
{
    let mut out = CsvLine::new();
    build(&mut out).map_err(overflow)?;
    Ok(out)
}
