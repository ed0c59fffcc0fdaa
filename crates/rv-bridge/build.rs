//! Links the native Rendezvous library when the `tibrv` feature is enabled.
//!
//! `TIBRV_HOME` points at the Rendezvous install root; its `lib` directory is
//! added to the linker search path.  Unix installs ship `libtibrv64`,
//! Windows installs ship `tibrv.lib`.

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=TIBRV_HOME");
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_TIBRV").is_none() {
        return;
    }

    if let Some(home) = std::env::var_os("TIBRV_HOME") {
        let lib_dir = PathBuf::from(home).join("lib");
        println!("cargo:rustc-link-search=native={}", lib_dir.display());
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let lib = if target_os == "windows" { "tibrv" } else { "tibrv64" };
    println!("cargo:rustc-link-lib=dylib={lib}");
}
