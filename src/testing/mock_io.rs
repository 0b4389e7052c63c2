//! Temporary files holding fixture text.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `text` to a temporary file deleted on drop.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
pub fn write_temp(text: &str) -> std::io::Result<NamedTempFile> {
    write_temp_with_extension(text, "csv")
}

/// Write `text` to a temporary file whose name ends in `.{extension}`.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
pub fn write_temp_with_extension(text: &str, extension: &str) -> std::io::Result<NamedTempFile> {
    write_temp_bytes(text.as_bytes(), extension)
}

/// Write raw bytes, such as compressed fixture text, to a temporary file.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
pub fn write_temp_bytes(bytes: &[u8], extension: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Read a file back as text; handy for checking exported error logs.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_text(path: impl AsRef<Path>) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}
