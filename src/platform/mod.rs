//! Platform-specific EGL drivers.

#[cfg(android)]
pub mod android;
