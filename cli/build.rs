//! Build script for shim embedding
//!
//! Builds the `nerfed-agent` shared library into OUT_DIR with a nested cargo
//! invocation and sets the `has_embedded_agent` cfg, so the launcher always
//! carries the shim compiled from the current sources.
//!
//! `NERFED_PRELOAD_PATH` (shim installed separately) disables embedding;
//! `NERFED_EMBED_AGENT` embeds a prebuilt library instead of building one.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    // Declare custom cfg flags to avoid warnings
    println!("cargo::rustc-check-cfg=cfg(has_embedded_agent)");
    println!("cargo:rerun-if-env-changed=NERFED_EMBED_AGENT");
    println!("cargo:rerun-if-env-changed=NERFED_PRELOAD_PATH");

    // A fixed install path means the shim ships separately.
    if env::var_os("NERFED_PRELOAD_PATH").is_some_and(|p| !p.is_empty()) {
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let lib_name = match target_os.as_str() {
        "macos" => "libnerfed_agent.dylib",
        "linux" | "freebsd" | "netbsd" => "libnerfed_agent.so",
        _ => {
            println!("cargo:warning=nerfed: no library preloading on {}", target_os);
            return;
        }
    };

    let payload = match env::var_os("NERFED_EMBED_AGENT") {
        Some(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            println!("cargo:rerun-if-changed={}", path.display());
            if !path.is_file() {
                panic!("NERFED_EMBED_AGENT={} is not a file", path.display());
            }
            path
        }
        _ => build_agent(lib_name),
    };

    println!("cargo:rustc-cfg=has_embedded_agent");
    println!(
        "cargo:rustc-env=NERFED_EMBEDDED_AGENT_PATH={}",
        payload.display()
    );
}

/// Build the shim for the current target and profile, returning the path of
/// the shared library.
fn build_agent(lib_name: &str) -> PathBuf {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let workspace = manifest_dir.parent().unwrap();
    for input in [
        "agent/src",
        "agent/Cargo.toml",
        "protocol/src",
        "protocol/Cargo.toml",
        "Cargo.toml",
        "Cargo.lock",
    ] {
        let path = workspace.join(input);
        // A missing path would force a rerun on every build.
        if path.exists() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let target_dir = out_dir.join("agent-target");
    let target = env::var("TARGET").unwrap();
    let release = env::var("PROFILE").as_deref() == Ok("release");

    let cargo = env::var_os("CARGO").unwrap_or_else(|| "cargo".into());
    let mut cmd = Command::new(cargo);
    cmd.arg("build")
        .arg("--manifest-path")
        .arg(workspace.join("agent").join("Cargo.toml"))
        .args(["--lib", "--target", &target])
        .arg("--target-dir")
        .arg(&target_dir)
        .env_remove("CARGO_TARGET_DIR");
    if release {
        cmd.arg("--release");
    }

    let status = cmd
        .status()
        .unwrap_or_else(|e| panic!("failed to run cargo for nerfed-agent: {e}"));
    if !status.success() {
        panic!("building nerfed-agent for embedding failed ({status})");
    }

    let lib = profile_dir(&target_dir, &target, release).join(lib_name);
    if !lib.is_file() {
        panic!("nerfed-agent build produced no {}", lib.display());
    }
    lib
}

fn profile_dir(target_dir: &Path, target: &str, release: bool) -> PathBuf {
    target_dir
        .join(target)
        .join(if release { "release" } else { "debug" })
}
