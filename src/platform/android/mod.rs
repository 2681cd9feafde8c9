// gl-surface-view/src/platform/android/mod.rs
//
//! The system EGL driver on Android.

pub mod egl;
pub use self::egl::AndroidEgl;

mod error;
mod ffi;
