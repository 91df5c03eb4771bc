//! Error interfaces for this crate.
//!
//! All of the errors raised by this crate (lex, parse, load, and simulation
//! errors) implement the [`Error`] trait, which extends [`std::error::Error`]
//! with optional source position and help information.
//!
//! The [`report`] function renders an error against the source code it came
//! from, producing the diagnostics the `simleg` binary prints.

use std::borrow::Cow;
use std::ops::Range;

/// An error from this crate.
pub trait Error: std::error::Error {
    /// The range of characters in the source code where this error occurs.
    ///
    /// Errors which are not tied to a position in source (e.g., simulation
    /// errors) return `None`.
    fn span(&self) -> Option<Range<usize>> {
        None
    }

    /// A short message suggesting how to fix this error, if there is one.
    fn help(&self) -> Option<Cow<'_, str>> {
        None
    }
}

/// Renders an error against the source code it was raised from.
///
/// The rendering consists of the error message, the offending source line
/// with a caret marker under the error's span (if the error has one), and
/// the error's help text (if it has any).
///
/// ```
/// use legv8_ensemble::err::report;
/// use legv8_ensemble::parse::parse_program;
///
/// let src = "ADD X1, X2, Y3";
/// let err = parse_program(src).unwrap_err();
/// let text = report(&err, src);
/// assert!(text.starts_with("error: "));
/// ```
pub fn report<E: Error + ?Sized>(err: &E, src: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = write!(out, "error: {err}");

    if let Some(span) = err.span() {
        // Find the line containing the start of the span.
        let start = span.start.min(src.len());
        let line_no = src[..start].matches('\n').count();
        let line_start = src[..start].rfind('\n').map_or(0, |i| i + 1);
        let line = src[line_start..].lines().next().unwrap_or("");

        let col = start - line_start;
        let width = span.len().clamp(1, line.len().saturating_sub(col).max(1));

        let gutter = format!("{}", line_no + 1);
        let pad = " ".repeat(gutter.len());
        let _ = write!(out, "\n {pad} |\n {gutter} | {line}\n {pad} | ");
        let _ = write!(out, "{}{}", " ".repeat(col), "^".repeat(width));
    }

    if let Some(help) = err.help() {
        let _ = write!(out, "\nhelp: {help}");
    }

    out
}
