//! Caller resolution and stack capture for the slow path

use crate::core::record::StackFrame;
use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::Arc;

/// Maximum frames kept per captured stack.
pub const MAX_STACK_FRAMES: usize = 5;

/// Symbol prefixes that never count as user frames.
const SKIPPED_PREFIXES: &[&str] = &[
    "rust_fast_logger::",
    "<rust_fast_logger::",
    "std::",
    "<std::",
    "core::",
    "<core::",
    "alloc::",
    "<alloc::",
    "test::",
    "<test::",
    "backtrace::",
    "__rust",
    "_start",
    "__libc",
];

/// Where a record was logged from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerInfo<'a> {
    pub file: &'a str,
    pub line: u32,
    /// Empty when resolved from `#[track_caller]`, which carries no symbol.
    pub function: &'a str,
}

/// Hook that renders a [`CallerInfo`] into the caller slot.
pub type CallerFormatter = Arc<dyn Fn(&mut String, &CallerInfo<'_>) + Send + Sync>;

/// `file.rs:LINE`
pub fn short_caller(out: &mut String, caller: &CallerInfo<'_>) {
    out.push_str(base_name(caller.file));
    push_line(out, caller.line);
}

/// `path/to/file.rs:LINE`
pub fn long_caller(out: &mut String, caller: &CallerInfo<'_>) {
    out.push_str(caller.file);
    push_line(out, caller.line);
}

/// Shared [`short_caller`], the default caller formatter.
pub fn short_caller_formatter() -> CallerFormatter {
    Arc::new(short_caller)
}

/// Shared [`long_caller`].
pub fn long_caller_formatter() -> CallerFormatter {
    Arc::new(long_caller)
}

fn push_line(out: &mut String, line: u32) {
    out.push(':');
    out.push_str(itoa::Buffer::new().format(line));
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Resolve the caller `offset` frames above the logging call into `out`.
///
/// Offset zero uses the `#[track_caller]` location and costs nothing. Larger
/// offsets capture a backtrace and fall back to `location` when the trace has
/// too few user frames or no debug info.
pub(crate) fn resolve_caller(
    location: &Location<'_>,
    offset: usize,
    formatter: &CallerFormatter,
    out: &mut String,
) {
    if offset > 0 {
        let trace = Backtrace::force_capture().to_string();
        let frame = user_frames(&trace).nth(offset);
        if let Some(frame) = frame {
            formatter(
                out,
                &CallerInfo {
                    file: frame.file,
                    line: frame.line,
                    function: frame.function,
                },
            );
            return;
        }
    }
    formatter(
        out,
        &CallerInfo {
            file: location.file(),
            line: location.line(),
            function: "",
        },
    );
}

/// Capture up to [`MAX_STACK_FRAMES`] user frames into `out`.
pub(crate) fn capture_stack(out: &mut Vec<StackFrame>) {
    let trace = Backtrace::force_capture().to_string();
    collect_frames(&trace, out);
}

fn collect_frames(trace: &str, out: &mut Vec<StackFrame>) {
    out.extend(
        user_frames(trace)
            .take(MAX_STACK_FRAMES)
            .map(|frame| StackFrame {
                function: short_function(frame.function).to_string(),
                file: base_name(frame.file).to_string(),
                line: frame.line,
            }),
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawFrame<'t> {
    function: &'t str,
    file: &'t str,
    line: u32,
}

/// Frames of a rendered [`Backtrace`] that belong to user code, innermost
/// first. Frames without a source location are dropped.
fn user_frames(trace: &str) -> impl Iterator<Item = RawFrame<'_>> {
    let mut symbol: Option<&str> = None;
    trace.lines().filter_map(move |line| {
        let line = line.trim_start();
        if let Some(location) = line.strip_prefix("at ") {
            let function = symbol.take()?;
            let (file, line) = parse_location(location)?;
            return Some(RawFrame {
                function,
                file,
                line,
            });
        }
        symbol = parse_symbol(line).filter(|s| !is_skipped(s));
        None
    })
}

/// `12: crate::module::function::h0123456789abcdef`
fn parse_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.split_once(": ")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(strip_hash(symbol.trim()))
}

/// `./src/main.rs:12:5`
fn parse_location(location: &str) -> Option<(&str, u32)> {
    let mut parts = location.trim().rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some((file.strip_prefix("./").unwrap_or(file), line))
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}

fn is_skipped(symbol: &str) -> bool {
    SKIPPED_PREFIXES
        .iter()
        .any(|prefix| symbol.starts_with(prefix))
}

/// Last path segment of a symbol, ignoring closure markers.
fn short_function(symbol: &str) -> &str {
    symbol
        .rsplit("::")
        .find(|segment| !segment.is_empty() && *segment != "{{closure}}")
        .unwrap_or(symbol)
}
