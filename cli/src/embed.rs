//! Shim library bundled into the launcher, and its extraction to disk.
//!
//! `build.rs` sets the `has_embedded_agent` cfg when it found a built shim to
//! embed. Without it the payload is empty and the launcher falls back to
//! looking for the library on disk.

use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, Result};
use log::debug;
use nerfed_protocol::platform::{temp_artifact_suffix, TEMP_ARTIFACT_PREFIX};
use tempfile::TempPath;

#[cfg(has_embedded_agent)]
static EMBEDDED_AGENT: &[u8] = include_bytes!(env!("NERFED_EMBEDDED_AGENT_PATH"));

#[cfg(not(has_embedded_agent))]
static EMBEDDED_AGENT: &[u8] = &[];

/// The embedded shim, or an empty slice when none was bundled.
pub fn payload() -> &'static [u8] {
    EMBEDDED_AGENT
}

/// Copy `payload` into a fresh, uniquely named file in the temp directory.
///
/// The returned [`TempPath`] deletes the file when dropped or closed. The
/// file handle itself is already closed so the loader can map it.
pub fn materialize(payload: &[u8]) -> Result<TempPath> {
    let suffix = temp_artifact_suffix();
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_ARTIFACT_PREFIX)
        .suffix(&suffix)
        .rand_bytes(6)
        .tempfile()
        .context("failed to create temporary shim file")?;

    // write_all keeps going after short writes and EINTR.
    file.as_file_mut()
        .write_all(payload)
        .with_context(|| format!("failed to write shim to {}", file.path().display()))?;

    file.as_file()
        .set_permissions(Permissions::from_mode(0o700))
        .with_context(|| format!("failed to set permissions on {}", file.path().display()))?;

    let path = file.into_temp_path();
    debug!("Extracted shim ({} bytes) to {}", payload.len(), path.display());
    Ok(path)
}
