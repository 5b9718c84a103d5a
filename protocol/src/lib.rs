//! Contract shared between the nerfed launcher and the preload shim.
//!
//! The two halves never talk to each other directly. The launcher writes
//! environment variables before starting the command and the shim reads them
//! inside the command's process, so the variable names and their truthiness
//! rule live here.

pub mod family;
pub mod platform;

pub use family::{toggle_is_set, Family, TOGGLE_VALUE};
