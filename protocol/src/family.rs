//! Call families and the environment toggles that neutralize them.

use std::ffi::CStr;
use std::fmt;

/// Value the launcher writes into a toggle it enables.
pub const TOGGLE_VALUE: &str = "1";

/// A group of libc entry points that are nerfed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `chmod`, `fchmodat`
    Chmod,
    /// `mknod`, `mknodat`
    Mknod,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::Chmod, Family::Mknod];

    /// Lower-case identifier, also used as the long CLI option name.
    pub fn name(self) -> &'static str {
        match self {
            Family::Chmod => "chmod",
            Family::Mknod => "mknod",
        }
    }

    /// Environment variable that disables this family when non-empty.
    pub fn toggle_var(self) -> &'static str {
        match self {
            Family::Chmod => "LIBEAT_FUNCTION_CHMOD",
            Family::Mknod => "LIBEAT_FUNCTION_MKNOD",
        }
    }

    /// [`Family::toggle_var`] as a C string, for `getenv` inside the shim.
    pub fn toggle_cvar(self) -> &'static CStr {
        match self {
            Family::Chmod => c"LIBEAT_FUNCTION_CHMOD",
            Family::Mknod => c"LIBEAT_FUNCTION_MKNOD",
        }
    }

    /// Symbols interposed for this family.
    pub fn members(self) -> &'static [&'static str] {
        match self {
            Family::Chmod => &["chmod", "fchmodat"],
            Family::Mknod => &["mknod", "mknodat"],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Toggle truthiness: present and non-empty means nerfed.
///
/// An empty value counts as absent, so
/// `LIBEAT_FUNCTION_CHMOD= make install` keeps chmod working.
pub fn toggle_is_set(value: Option<&[u8]>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}
