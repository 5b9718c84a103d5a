//! Prepare the environment a command is started with: family toggles and
//! the loader preload entry pointing at the shim.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use log::debug;
use nerfed_protocol::platform::{
    agent_lib_name, installed_lib_paths, AGENT_LIB_ENV_VAR, PRELOAD_ENV_VAR, PRELOAD_EXTRA_ENV,
};
use nerfed_protocol::{Family, TOGGLE_VALUE};
use tempfile::TempPath;

use crate::embed;
use crate::error::LaunchError;

/// Shim path baked in at build time, e.g. by a distribution package.
const FIXED_AGENT_PATH: Option<&str> = option_env!("NERFED_PRELOAD_PATH");

/// Where the shim lives for this run.
#[derive(Debug)]
pub enum Artifact {
    /// An existing library on disk. Nothing to clean up.
    Fixed(PathBuf),
    /// Extracted from the launcher; deleted when dropped.
    Temporary(TempPath),
}

impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Artifact::Fixed(path) => path,
            Artifact::Temporary(path) => path,
        }
    }
}

/// Environment entries to add on top of the inherited environment.
#[derive(Debug, Default)]
pub struct PreloadEnv {
    vars: Vec<(OsString, OsString)>,
}

impl PreloadEnv {
    /// Add `name=value`, rejecting anything execve could not pass on intact.
    pub fn set(&mut self, name: &str, value: impl AsRef<OsStr>) -> Result<(), LaunchError> {
        let value = value.as_ref();
        if name.is_empty() {
            return Err(LaunchError::environment(name, "empty variable name"));
        }
        if name.contains('=') || name.contains('\0') {
            return Err(LaunchError::environment(name, "invalid character in variable name"));
        }
        if value.as_bytes().contains(&0) {
            return Err(LaunchError::environment(name, "value contains a NUL byte"));
        }

        self.vars.retain(|(existing, _)| existing != name);
        self.vars.push((name.into(), value.to_os_string()));
        Ok(())
    }

    /// Turn on the no-op behavior for every member of `family`.
    pub fn nerf(&mut self, family: Family) -> Result<(), LaunchError> {
        debug!("Nerfing {} via {}", family, family.toggle_var());
        self.set(family.toggle_var(), TOGGLE_VALUE)
    }

    /// Point the loader's preload list at `lib`.
    pub fn preload(&mut self, lib: &Path) -> Result<(), LaunchError> {
        let var = PRELOAD_ENV_VAR.ok_or_else(|| {
            LaunchError::environment("preload", "library preloading is not supported on this platform")
        })?;

        // The loader splits its list on these; a path containing one would
        // be read as several bogus entries.
        if lib
            .as_os_str()
            .as_bytes()
            .iter()
            .any(|b| *b == b':' || b.is_ascii_whitespace())
        {
            return Err(LaunchError::environment(
                var,
                format!("{} contains a list separator", lib.display()),
            ));
        }

        self.set(var, lib)?;
        for (name, value) in PRELOAD_EXTRA_ENV {
            self.set(name, value)?;
        }
        debug!("Setting {}={}", var, lib.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_os_str())
    }

    pub fn apply(&self, command: &mut Command) {
        command.envs(self.vars.iter().map(|(name, value)| (name, value)));
    }
}

/// Decide which shim library this run uses, extracting it if necessary.
///
/// Order: `NERFED_AGENT_LIB` at runtime, the build-time fixed path, the
/// embedded payload, then a search next to the executable.
pub fn resolve_artifact() -> Result<Artifact, LaunchError> {
    resolve_artifact_from(
        std::env::var_os(AGENT_LIB_ENV_VAR),
        FIXED_AGENT_PATH,
        embed::payload(),
    )
    .map_err(LaunchError::Artifact)
}

fn resolve_artifact_from(
    override_path: Option<OsString>,
    fixed_path: Option<&str>,
    payload: &[u8],
) -> Result<Artifact> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("{} points to {}", AGENT_LIB_ENV_VAR, path.display()))?;
        debug!("Using shim from {}: {}", AGENT_LIB_ENV_VAR, abs_path.display());
        return Ok(Artifact::Fixed(abs_path));
    }

    if let Some(path) = fixed_path.filter(|p| !p.is_empty()) {
        debug!("Using build-configured shim: {}", path);
        return Ok(Artifact::Fixed(PathBuf::from(path)));
    }

    if !payload.is_empty() {
        return Ok(Artifact::Temporary(embed::materialize(payload)?));
    }

    find_agent_library().map(Artifact::Fixed)
}

/// Find the shim library on disk when none is embedded.
fn find_agent_library() -> Result<PathBuf> {
    let lib_name = agent_lib_name();
    let mut candidates: Vec<PathBuf> = Vec::new();

    // Cargo puts the cdylib next to the binary; installs use ../lib.
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.push(exe_dir.join(&lib_name));
            candidates.push(exe_dir.join("..").join("lib").join(&lib_name));
        }
    }

    for install_path in installed_lib_paths() {
        candidates.push(install_path.join(&lib_name));
    }

    for candidate in &candidates {
        if candidate.is_file() {
            // The child may run in another directory, so make it absolute.
            let abs_path = candidate
                .canonicalize()
                .with_context(|| format!("Failed to canonicalize path: {}", candidate.display()))?;
            debug!("Found shim library: {}", abs_path.display());
            return Ok(abs_path);
        }
    }

    anyhow::bail!(
        "shim library {} not found and none embedded; build the nerfed-agent crate or set {}",
        lib_name,
        AGENT_LIB_ENV_VAR
    )
}
