//! Output targets: stdout, or a file replaced atomically

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Run `write` against stdout or `target`.
///
/// File output goes to a temp file in the target's directory which is
/// renamed over the target once `write` succeeds, so rewriting the input
/// file in place never truncates it early.
pub fn with_output<T, F>(target: Option<&Path>, write: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let Some(target) = target else {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        let value = write(&mut out)?;
        out.flush().context("Failed to flush stdout")?;
        return Ok(value);
    };

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = temp_file_in(dir)?;
    // An existing target keeps its mode; a new one gets the umask default
    if let Ok(metadata) = fs::metadata(target) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .context(format!("Failed to copy permissions of {}", target.display()))?;
    }

    let mut out = BufWriter::new(tmp);
    let value = write(&mut out)?;
    let tmp = out
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush output")?;
    tmp.persist(target)
        .map_err(|e| e.error)
        .context(format!("Failed to write {}", target.display()))?;

    Ok(value)
}

#[cfg(unix)]
fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
        .context(format!("Failed to create temp file in {}", dir.display()))
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    NamedTempFile::new_in(dir).context(format!("Failed to create temp file in {}", dir.display()))
}
