// gl-surface-view/src/platform/android/ffi.rs
//
//! Generated EGL bindings and the system EGL library.

use libc::{dlopen, dlsym, RTLD_LAZY};
use std::ffi::CString;
use std::os::raw::{c_char, c_void};
use std::ptr;

#[allow(non_camel_case_types, dead_code, clippy::all)]
pub(crate) mod egl_sys {
    use std::os::raw::{c_long, c_void};
    pub type khronos_utime_nanoseconds_t = khronos_uint64_t;
    pub type khronos_stime_nanoseconds_t = khronos_int64_t;
    pub type khronos_uint64_t = u64;
    pub type khronos_int64_t = i64;
    pub type khronos_ssize_t = c_long;
    pub type EGLint = i32;
    pub type EGLNativeDisplayType = *const c_void;
    pub type EGLNativePixmapType = *const c_void;
    pub type EGLNativeWindowType = *const c_void;
    pub type NativeDisplayType = EGLNativeDisplayType;
    pub type NativePixmapType = EGLNativePixmapType;
    pub type NativeWindowType = EGLNativeWindowType;
    include!(concat!(env!("OUT_DIR"), "/egl_bindings.rs"));
}

struct EGLLibrary(*mut c_void);

unsafe impl Send for EGLLibrary {}
unsafe impl Sync for EGLLibrary {}

lazy_static! {
    static ref EGL_LIBRARY: EGLLibrary = {
        unsafe {
            EGLLibrary(dlopen(&b"libEGL.so\0"[0] as *const u8 as *const c_char, RTLD_LAZY))
        }
    };
}

thread_local! {
    pub(crate) static EGL_FUNCTIONS: egl_sys::Egl = egl_sys::Egl::load_with(get_proc_address);
}

/// Returns true if the system EGL library could be opened.
pub(crate) fn egl_library_loaded() -> bool {
    !EGL_LIBRARY.0.is_null()
}

fn get_proc_address(symbol_name: &str) -> *const c_void {
    if !egl_library_loaded() {
        return ptr::null();
    }
    let symbol_name = match CString::new(symbol_name) {
        Ok(symbol_name) => symbol_name,
        Err(_) => return ptr::null(),
    };
    unsafe { dlsym(EGL_LIBRARY.0, symbol_name.as_ptr()) as *const c_void }
}
