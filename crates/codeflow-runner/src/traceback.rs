//! Human-readable failure descriptions.

use codeflow_script::{ParseError, Raised};

/// Formats an escaped exception the way Python prints one:
///
/// ```text
/// Traceback (most recent call last):
///   File "main.flow", line 5, in <module>
///     check(-1)
///   File "main.flow", line 3, in check
///     raise ValueError('negative input')
/// ValueError: negative input
/// ```
///
/// Frames run outermost first and at most `limit` are shown. Source lines
/// are included for frames in `file`, looked up in `source`.
pub fn format_traceback(raised: &Raised, file: &str, source: &str, limit: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = String::from("Traceback (most recent call last):\n");

    for entry in raised.traceback.iter().rev().take(limit) {
        out.push_str(&format!(
            "  File \"{}\", line {}, in {}\n",
            entry.file, entry.line, entry.function
        ));
        if entry.file != file {
            continue;
        }
        let text = (entry.line as usize)
            .checked_sub(1)
            .and_then(|i| lines.get(i))
            .map(|l| l.trim())
            .filter(|l| !l.is_empty());
        if let Some(text) = text {
            out.push_str(&format!("    {text}\n"));
        }
    }

    out.push_str(&raised.info.to_string());
    out
}

/// One-line description of a unit that failed to parse.
pub fn format_syntax_error(error: &ParseError, file: &str) -> String {
    format!("SyntaxError: {} ({file}, line {})", error.message, error.line)
}
