//! Lazy resolution of the real libc implementations behind our exports.
//!
//! Each interposed function owns one [`NextSymbol`] slot. The first call
//! looks the symbol up with `dlsym(RTLD_NEXT, ..)`, i.e. in the objects loaded
//! after this shim, and every later call reuses the cached address.

use std::ffi::{c_char, CStr};
use std::io::Write;
use std::sync::OnceLock;

use log::{debug, error};

/// Process-wide cache slot for one real symbol.
pub struct NextSymbol {
    name: &'static CStr,
    slot: OnceLock<Result<usize, String>>,
}

impl NextSymbol {
    pub const fn new(name: &'static CStr) -> Self {
        Self {
            name,
            slot: OnceLock::new(),
        }
    }

    /// Address of the real implementation.
    ///
    /// Aborts the process with a diagnostic on stderr if the symbol cannot
    /// be found.
    pub fn address(&self) -> usize {
        match self.address_with(resolve_next) {
            Ok(address) => address,
            Err(reason) => abort_unresolvable(self.name, reason),
        }
    }

    /// Resolve through `resolve` unless a previous call already did.
    ///
    /// `OnceLock` runs exactly one initializer even when several threads
    /// race on the first call; the losers block until the winner stores its
    /// result. Failures are cached as well.
    pub fn address_with<F>(&self, resolve: F) -> Result<usize, &str>
    where
        F: FnOnce(&CStr) -> Result<usize, String>,
    {
        self.slot
            .get_or_init(|| resolve(self.name))
            .as_ref()
            .copied()
            .map_err(String::as_str)
    }
}

/// Look `name` up in the objects that follow this one in the search order.
pub fn resolve_next(name: &CStr) -> Result<usize, String> {
    // SAFETY: `name` is NUL-terminated and RTLD_NEXT is a valid pseudo-handle.
    let address = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if !address.is_null() {
        debug!("Resolved real {} at {:p}", name.to_string_lossy(), address);
        return Ok(address as usize);
    }

    // SAFETY: dlerror returns NULL or a NUL-terminated thread-local message.
    let reason: *const c_char = unsafe { libc::dlerror() };
    if reason.is_null() {
        Err("symbol not found".to_string())
    } else {
        // SAFETY: checked non-null above.
        Err(unsafe { CStr::from_ptr(reason) }
            .to_string_lossy()
            .into_owned())
    }
}

fn abort_unresolvable(name: &CStr, reason: &str) -> ! {
    let name = name.to_string_lossy();
    error!("Cannot resolve real {}: {}", name, reason);
    let _ = writeln!(
        std::io::stderr(),
        "nerfed: cannot resolve real '{}': {}",
        name,
        reason
    );
    std::process::abort()
}
