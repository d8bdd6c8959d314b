use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Result, TranscriptorError};

pub mod formatters;

pub use formatters::*;

/// Save the header and transcript body to `dir/filename`.
///
/// The directory is created if missing. Content goes to a temporary file in
/// the same directory that is renamed into place, so a failure leaves no
/// partial transcript behind. The file gets the same permissions as any
/// other file created under the current umask.
pub fn save_to_file(
    dir: &Path,
    filename: &str,
    header: &TranscriptHeader,
    body: &str,
) -> Result<PathBuf> {
    let path = dir.join(filename);
    let io_error = |source| TranscriptorError::Io {
        path: path.clone(),
        source,
    };

    fs_err::create_dir_all(dir).map_err(io_error)?;

    let mut file = temp_file_builder().tempfile_in(dir).map_err(io_error)?;
    file.write_all(format_header(header).as_bytes())
        .and_then(|_| file.write_all(body.as_bytes()))
        .and_then(|_| file.as_file().sync_all())
        .map_err(io_error)?;

    file.persist(&path).map_err(|e| io_error(e.error))?;

    tracing::debug!("Transcript written to {}", path.display());
    Ok(path)
}

#[cfg(unix)]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    // 0666 before umask, like File::create, instead of tempfile's private 0600
    let mut builder = tempfile::Builder::new();
    builder.permissions(std::fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    tempfile::Builder::new()
}

/// Print the transcript body to the console
pub fn print_to_console<W: Write>(console: &mut W, body: &str) -> std::io::Result<()> {
    writeln!(console, "{}", body)?;
    console.flush()
}
