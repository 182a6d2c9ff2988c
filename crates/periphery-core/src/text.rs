//! Parameter-file line format.
//!
//! One parameter per line, `NAME VALUE`, separated by whitespace. Blank
//! lines and lines starting with `#` are ignored, and an unquoted `#`
//! preceded by whitespace starts a trailing comment, so rendered output
//! (which ends every line with `# description`) reads back unchanged.

use thiserror::Error;

use crate::dispatch::set_param;
use crate::error::{ParamError, ParamResult};
use crate::list::ListRef;

/// A failure while applying text, tagged with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {source}")]
pub struct LineError {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong on that line.
    pub source: ParamError,
}

/// Split one line into `(name, value)`.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> ParamResult<Option<(&str, &str)>> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Ok(None);
    }
    match line.split_once(char::is_whitespace) {
        Some((name, value)) => Ok(Some((name, value.trim()))),
        None => Err(ParamError::InvalidValue {
            field: line.to_string(),
            value: String::new(),
            expected: "a value",
        }),
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    let mut escaped = false;
    let mut prev_space = true;
    for (pos, c) in line.char_indices() {
        match c {
            '\\' if in_quote && !escaped => {
                escaped = true;
                prev_space = false;
                continue;
            }
            '"' if !escaped => in_quote = !in_quote,
            '#' if !in_quote && prev_space => return &line[..pos],
            _ => {}
        }
        escaped = false;
        prev_space = c.is_whitespace();
    }
    line
}

/// Apply every line of `text` below `root`, in order.
///
/// Stops at the first failing line. Returns the number of parameters set.
pub fn apply_text(root: &ListRef, text: &str) -> Result<usize, LineError> {
    let mut applied = 0;
    for (n, line) in text.lines().enumerate() {
        let at = |source| LineError { line: n + 1, source };
        let Some((name, value)) = parse_line(line).map_err(at)? else {
            continue;
        };
        set_param(root, name, value).map_err(at)?;
        applied += 1;
    }
    Ok(applied)
}
