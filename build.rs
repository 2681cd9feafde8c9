// gl-surface-view/build.rs
//
//! The `gl-surface-view` build script.

use cfg_aliases::cfg_aliases;
use gl_generator::{Api, Fallbacks, Profile, Registry, StructGenerator};
use std::env;
use std::fs::File;
use std::path::PathBuf;

fn main() {
    // Setup aliases for #[cfg] checks
    cfg_aliases! {
        android: { target_os = "android" },
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap();
    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    // Generate EGL bindings for the real driver backend.
    if target_os == "android" {
        let mut file = File::create(dest.join("egl_bindings.rs")).unwrap();
        let registry = Registry::new(
            Api::Egl,
            (1, 5),
            Profile::Core,
            Fallbacks::All,
            ["EGL_KHR_create_context", "EGL_ANDROID_presentation_time"],
        );
        registry.write_bindings(StructGenerator, &mut file).unwrap();
    }
}
