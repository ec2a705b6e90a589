//! Record encoders
//!
//! Both encoders write one complete, newline-terminated line into a
//! [`Buffer`]. Attached fields are pre-encoded only for JSON; text output is
//! rendered from the live field values every time.

pub mod json;
pub mod style;
pub mod text;

pub use style::{Paint, Styles};

use crate::core::buffer::Buffer;
use crate::core::output_format::OutputFormat;
use crate::core::record::{FieldSet, Header, PreEncoded, Record};

/// Fast path dispatch.
pub fn encode(
    buf: &mut Buffer,
    formatter: OutputFormat,
    header: &Header<'_>,
    fields: &FieldSet<'_>,
    pre_encoded: Option<&PreEncoded>,
    styles: &Styles,
) {
    match formatter {
        OutputFormat::Text => text::encode(buf, header, fields, styles),
        OutputFormat::Json => json::encode(buf, header, fields, pre_encoded),
    }
}

/// Slow path dispatch.
pub fn encode_record(buf: &mut Buffer, record: &Record<'_>, styles: &Styles) {
    match record.formatter {
        OutputFormat::Text => text::encode_record(buf, record, styles),
        OutputFormat::Json => json::encode_record(buf, record),
    }
}
