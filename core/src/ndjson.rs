//! Newline-delimited JSON decoding with per-line failure tolerance.
//!
//! Each non-blank line becomes one `LineOutcome`: either a decoded value or a
//! `DiscardedLine` carrying the raw text and the reason. A bad line never
//! aborts the lines after it.

use serde_json::Value;

use crate::error::LineDecodeError;

/// A line that contributed nothing to the result sequence.
#[derive(Debug)]
pub struct DiscardedLine {
    /// 1-based position in the response body, blank lines included.
    pub line_number: usize,
    /// Line text; invalid UTF-8 is shown as U+FFFD.
    pub raw: String,
    pub reason: LineDecodeError,
}

#[derive(Debug)]
pub enum LineOutcome<T> {
    Decoded(T),
    Discarded(DiscardedLine),
}

/// Lazily decode `body` line by line, passing every parsed JSON value
/// through `map`. Blank and whitespace-only lines yield nothing. A line that
/// is not valid UTF-8 is discarded like any other undecodable line.
pub fn decode_lines<'a, T, F>(body: &'a [u8], mut map: F) -> impl Iterator<Item = LineOutcome<T>> + 'a
where
    T: 'a,
    F: FnMut(Value) -> Result<T, LineDecodeError> + 'a,
{
    body.split(|&byte| byte == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.trim_ascii().is_empty())
        .map(move |(index, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let decoded = std::str::from_utf8(line.trim_ascii())
                .map_err(LineDecodeError::from)
                .and_then(|text| serde_json::from_str::<Value>(text).map_err(LineDecodeError::from))
                .and_then(&mut map);
            match decoded {
                Ok(item) => LineOutcome::Decoded(item),
                Err(reason) => LineOutcome::Discarded(DiscardedLine {
                    line_number: index + 1,
                    raw: String::from_utf8_lossy(line).into_owned(),
                    reason,
                }),
            }
        })
}

/// Accumulated result of one decode pass.
#[derive(Debug)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub discarded: Vec<DiscardedLine>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            discarded: Vec::new(),
        }
    }
}

impl<T> Decoded<T> {
    pub fn push(&mut self, outcome: LineOutcome<T>) {
        match outcome {
            LineOutcome::Decoded(item) => self.items.push(item),
            LineOutcome::Discarded(line) => self.discarded.push(line),
        }
    }

    pub fn discarded_count(&self) -> usize {
        self.discarded.len()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> FromIterator<LineOutcome<T>> for Decoded<T> {
    fn from_iter<I: IntoIterator<Item = LineOutcome<T>>>(iter: I) -> Self {
        let mut decoded = Decoded::default();
        for outcome in iter {
            decoded.push(outcome);
        }
        decoded
    }
}
