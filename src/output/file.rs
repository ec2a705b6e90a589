//! File destination

use crate::core::error::{LoggerError, Result};
use crate::core::worker::Destination;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Open `path` for appending, creating it and its parent directories.
///
/// # Example
///
/// ```no_run
/// use rust_fast_logger::output::open_file;
/// use rust_fast_logger::Logger;
///
/// let logger = Logger::builder()
///     .output(open_file("/var/log/app/service.log").unwrap())
///     .build()
///     .unwrap();
/// ```
pub fn open_file(path: impl AsRef<Path>) -> Result<Destination> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggerError::io_operation("opening log file", path.display().to_string(), e))?;
    Ok(Box::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let mut out = open_file(&path).unwrap();
        out.write_all(b"first\n").unwrap();
        out.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let mut out = open_file(&path).unwrap();
        out.write_all(b"new\n").unwrap();
        out.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_directory_path_is_an_error() {
        let dir = tempdir().unwrap();
        let err = open_file(dir.path()).err().unwrap();
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }
}
