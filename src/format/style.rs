//! Visual decoration for the text formatter
//!
//! Styles only wrap already-rendered text in escape sequences. Quoting
//! decisions are made on the raw value before any decoration is applied, so
//! enabling color never changes the semantic content of a line.

use crate::core::buffer::Buffer;
use crate::core::log_level::LogLevel;
use std::borrow::Cow;

const RESET: &str = "\x1b[0m";

/// An optional escape sequence opened before a span and reset after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paint {
    open: Cow<'static, str>,
}

impl Paint {
    /// No styling at all.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Raw opening sequence, e.g. `"\x1b[36m"`.
    pub fn ansi(open: impl Into<Cow<'static, str>>) -> Self {
        Self { open: open.into() }
    }

    /// Whether this paint emits nothing.
    #[inline]
    pub fn is_plain(&self) -> bool {
        self.open.is_empty()
    }

    /// Write `text` decorated with this paint.
    pub fn paint(&self, buf: &mut Buffer, text: &str) {
        if self.is_plain() {
            buf.push_str(text);
            return;
        }
        buf.push_str(&self.open);
        buf.push_str(text);
        buf.push_str(RESET);
    }

    /// Decorate the bytes written since `start`.
    pub fn wrap(&self, buf: &mut Buffer, start: usize) {
        if self.is_plain() {
            return;
        }
        buf.insert_bytes(start, self.open.as_bytes());
        buf.push_str(RESET);
    }
}

/// Per-element paints for text output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styles {
    pub timestamp: Paint,
    pub levels: [Paint; 7],
    pub caller: Paint,
    pub prefix: Paint,
    pub message: Paint,
    pub key: Paint,
    pub separator: Paint,
    pub value: Paint,
}

impl Styles {
    /// No decoration at all.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Style for the label of `level`.
    pub fn level(&self, level: LogLevel) -> &Paint {
        static PLAIN: Paint = Paint {
            open: Cow::Borrowed(""),
        };
        level
            .sampler_slot()
            .and_then(|slot| self.levels.get(slot))
            .unwrap_or(&PLAIN)
    }

    /// ANSI colors built from each level's color.
    #[cfg(feature = "console")]
    pub fn colored() -> Self {
        use colored::Color;

        fn fg(color: Color) -> Paint {
            Paint::ansi(format!("\x1b[{}m", color.to_fg_str()))
        }
        fn bold(color: Color) -> Paint {
            Paint::ansi(format!("\x1b[1;{}m", color.to_fg_str()))
        }

        let levels = [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::DPanic,
            LogLevel::Panic,
            LogLevel::Fatal,
        ]
        .map(|level| bold(level.color_code()));

        Self {
            timestamp: fg(Color::BrightBlack),
            levels,
            caller: fg(Color::BrightBlack),
            prefix: bold(Color::White),
            message: Paint::plain(),
            key: fg(Color::Blue),
            separator: fg(Color::BrightBlack),
            value: Paint::plain(),
        }
    }
}
