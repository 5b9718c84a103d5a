//! The interposed libc entry points.
//!
//! Every export has the exact C signature of the function it replaces. When
//! the toggle of its family is set the call returns 0 without touching the
//! filesystem; otherwise it forwards the untouched arguments to the next
//! definition in the search order and returns whatever that returns, errno
//! included.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, CStr};

use libc::{dev_t, mode_t};
use log::debug;
use nerfed_protocol::{toggle_is_set, Family};

use crate::symbol::NextSymbol;

type ChmodFn = unsafe extern "C" fn(*const c_char, mode_t) -> c_int;
type FchmodatFn = unsafe extern "C" fn(c_int, *const c_char, mode_t, c_int) -> c_int;
type MknodFn = unsafe extern "C" fn(*const c_char, mode_t, dev_t) -> c_int;
type MknodatFn = unsafe extern "C" fn(c_int, *const c_char, mode_t, dev_t) -> c_int;

static REAL_CHMOD: NextSymbol = NextSymbol::new(c"chmod");
static REAL_FCHMODAT: NextSymbol = NextSymbol::new(c"fchmodat");
static REAL_MKNOD: NextSymbol = NextSymbol::new(c"mknod");
static REAL_MKNODAT: NextSymbol = NextSymbol::new(c"mknodat");

/// Whether `family` is nerfed in this process right now. Not cached.
///
/// Reads through `getenv`: no allocation, no lock.
pub fn is_nerfed(family: Family) -> bool {
    // SAFETY: the name is a NUL-terminated static string.
    let value = unsafe { libc::getenv(family.toggle_cvar().as_ptr()) };
    if value.is_null() {
        return toggle_is_set(None);
    }
    // SAFETY: getenv returned a pointer into the environment block.
    toggle_is_set(Some(unsafe { CStr::from_ptr(value) }.to_bytes()))
}

/// Lossy rendering of a caller-supplied path, for log lines only.
///
/// # Safety
/// `path` must be null or point to a NUL-terminated string.
unsafe fn display_path<'a>(path: *const c_char) -> Cow<'a, str> {
    if path.is_null() {
        Cow::Borrowed("(null)")
    } else {
        CStr::from_ptr(path).to_string_lossy()
    }
}

/// # Safety
/// Same contract as libc `chmod`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chmod(path: *const c_char, mode: mode_t) -> c_int {
    if is_nerfed(Family::Chmod) {
        debug!("nerfed chmod({}, {:o})", display_path(path), mode);
        return 0;
    }

    let real: ChmodFn = std::mem::transmute(REAL_CHMOD.address());
    real(path, mode)
}

/// # Safety
/// Same contract as libc `fchmodat`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fchmodat(
    fd: c_int,
    path: *const c_char,
    mode: mode_t,
    flag: c_int,
) -> c_int {
    if is_nerfed(Family::Chmod) {
        debug!(
            "nerfed fchmodat({}, {}, {:o}, {:#x})",
            fd,
            display_path(path),
            mode,
            flag
        );
        return 0;
    }

    let real: FchmodatFn = std::mem::transmute(REAL_FCHMODAT.address());
    real(fd, path, mode, flag)
}

/// # Safety
/// Same contract as libc `mknod`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mknod(path: *const c_char, mode: mode_t, dev: dev_t) -> c_int {
    if is_nerfed(Family::Mknod) {
        debug!("nerfed mknod({}, {:o}, {:#x})", display_path(path), mode, dev);
        return 0;
    }

    let real: MknodFn = std::mem::transmute(REAL_MKNOD.address());
    real(path, mode, dev)
}

/// # Safety
/// Same contract as libc `mknodat`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mknodat(
    dirfd: c_int,
    path: *const c_char,
    mode: mode_t,
    dev: dev_t,
) -> c_int {
    if is_nerfed(Family::Mknod) {
        debug!(
            "nerfed mknodat({}, {}, {:o}, {:#x})",
            dirfd,
            display_path(path),
            mode,
            dev
        );
        return 0;
    }

    let real: MknodatFn = std::mem::transmute(REAL_MKNODAT.address());
    real(dirfd, path, mode, dev)
}
