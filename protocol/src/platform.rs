//! Platform-specific constants and utilities.
//!
//! Centralizes platform-dependent values to avoid scattered #[cfg] blocks.

use std::path::PathBuf;

/// Library file extension for the current platform.
pub const LIB_EXTENSION: &str = if cfg!(target_os = "macos") {
    "dylib"
} else {
    "so"
};

/// Library file prefix for the current platform.
pub const LIB_PREFIX: &str = "lib";

/// Returns the shim library filename for the current platform.
pub fn agent_lib_name() -> String {
    format!("{}nerfed_agent.{}", LIB_PREFIX, LIB_EXTENSION)
}

/// Prefix of a materialized shim file in the temp directory.
pub const TEMP_ARTIFACT_PREFIX: &str = "libeat-function.";

/// Suffix of a materialized shim file; the loader doesn't care, humans do.
pub fn temp_artifact_suffix() -> String {
    format!(".{}", LIB_EXTENSION)
}

/// Environment variable name for library preloading.
/// `None` where no loader preload mechanism is supported.
pub const PRELOAD_ENV_VAR: Option<&str> = if cfg!(target_os = "macos") {
    Some("DYLD_INSERT_LIBRARIES")
} else if cfg!(any(target_os = "linux", target_os = "freebsd", target_os = "netbsd")) {
    Some("LD_PRELOAD")
} else {
    None
};

/// Extra loader settings that must accompany the preload variable.
///
/// dyld only lets an inserted library interpose symbols of two-level
/// namespace images when flat namespace lookup is forced.
pub const PRELOAD_EXTRA_ENV: &[(&str, &str)] = if cfg!(target_os = "macos") {
    &[("DYLD_FORCE_FLAT_NAMESPACE", "1")]
} else {
    &[]
};

/// Runtime override for the shim location, checked before anything else.
pub const AGENT_LIB_ENV_VAR: &str = "NERFED_AGENT_LIB";

/// Log filter read by the shim inside the target process.
pub const AGENT_LOG_ENV_VAR: &str = "NERFED_AGENT_LOG";

/// Returns platform-appropriate library installation directories.
#[cfg(target_os = "macos")]
pub fn installed_lib_paths() -> Vec<PathBuf> {
    vec!["/usr/local/lib".into(), "/opt/homebrew/lib".into()]
}

/// Returns platform-appropriate library installation directories.
#[cfg(not(target_os = "macos"))]
pub fn installed_lib_paths() -> Vec<PathBuf> {
    vec!["/usr/local/lib".into(), "/usr/lib".into()]
}
