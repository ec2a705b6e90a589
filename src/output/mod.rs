//! Destinations for encoded records

mod file;
mod memory;

pub use file::open_file;
pub use memory::SharedWriter;

use crate::core::worker::Destination;
use std::io;

/// Standard error, unbuffered at this layer.
pub fn stderr() -> Destination {
    Box::new(io::stderr())
}

/// Standard output.
pub fn stdout() -> Destination {
    Box::new(io::stdout())
}
