//! nerfed preload shim - injected into the target process to neutralize
//! chmod and mknod family calls.
//!
//! This library is compiled as a cdylib and loaded into the target process
//! via LD_PRELOAD (Linux) or DYLD_INSERT_LIBRARIES (macOS). The launcher
//! communicates with it only through the inherited environment; see
//! [`nerfed_protocol::Family::toggle_var`].

pub mod hooks;
pub mod symbol;


pub use hooks::is_nerfed;
pub use symbol::NextSymbol;

use log::debug;
use nerfed_protocol::platform::AGENT_LOG_ENV_VAR;
use nerfed_protocol::Family;

/// Shim entry point called when the library is loaded.
///
/// Logging stays off unless `NERFED_AGENT_LOG` is set, so the shim never
/// writes to a host program's stderr uninvited. The value is an
/// `env_logger` filter, e.g. `NERFED_AGENT_LOG=debug`.
#[unsafe(no_mangle)]
pub extern "C" fn nerfed_agent_init() -> i32 {
    if std::env::var_os(AGENT_LOG_ENV_VAR).is_none() {
        return 0;
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::new().filter(AGENT_LOG_ENV_VAR))
        .try_init();

    for family in Family::ALL {
        debug!(
            "pid {}: {} ({}) {}",
            std::process::id(),
            family,
            family.members().join(", "),
            if is_nerfed(family) { "nerfed" } else { "passthrough" }
        );
    }
    0
}

/// Constructor attribute for automatic initialization on library load (Linux).
#[cfg(all(target_os = "linux", not(test)))]
#[unsafe(link_section = ".init_array")]
#[used]
static INIT: extern "C" fn() = {
    extern "C" fn init() {
        nerfed_agent_init();
    }
    init
};

/// Constructor attribute for automatic initialization on library load (macOS).
#[cfg(all(target_os = "macos", not(test)))]
#[unsafe(link_section = "__DATA,__mod_init_func")]
#[used]
static INIT: extern "C" fn() = {
    extern "C" fn init() {
        nerfed_agent_init();
    }
    init
};
