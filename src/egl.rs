// gl-surface-view/src/egl.rs
//
//! The EGL driver seam.
//!
//! Everything the rendering thread needs from EGL goes through the [`Egl`] trait, so the
//! lifecycle logic is independent of how the driver is loaded. Handles are opaque values;
//! a driver decides what they point at. Driver errors are reported as
//! [`WindowingApiError`]s; raw EGL error codes never cross this boundary.

use crate::surface::NativeWidget;
use crate::WindowingApiError;

use std::os::raw::c_void;
use std::ptr;

pub type EGLint = i32;

pub const NONE: EGLint = 0x3038;
pub const ALPHA_SIZE: EGLint = 0x3021;
pub const BLUE_SIZE: EGLint = 0x3022;
pub const GREEN_SIZE: EGLint = 0x3023;
pub const RED_SIZE: EGLint = 0x3024;
pub const DEPTH_SIZE: EGLint = 0x3025;
pub const STENCIL_SIZE: EGLint = 0x3026;
pub const CONFIG_ID: EGLint = 0x3028;
pub const RENDERABLE_TYPE: EGLint = 0x3040;
pub const OPENGL_ES2_BIT: EGLint = 0x0004;
pub const OPENGL_ES3_BIT_KHR: EGLint = 0x0040;
pub const CONTEXT_CLIENT_VERSION: EGLint = 0x3098;
pub const CONTEXT_MAJOR_VERSION_KHR: EGLint = CONTEXT_CLIENT_VERSION;
pub const CONTEXT_MINOR_VERSION_KHR: EGLint = 0x30fb;

macro_rules! egl_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub usize);

        impl $name {
            #[inline]
            pub fn from_ptr(ptr: *const c_void) -> $name {
                $name(ptr as usize)
            }

            #[inline]
            pub fn as_ptr(self) -> *const c_void {
                self.0 as *const c_void
            }
        }
    };
}

egl_handle!(
    /// An initialized-or-not EGL display connection.
    DisplayHandle
);
egl_handle!(
    /// A frame buffer configuration of a display.
    ConfigHandle
);
egl_handle!(
    /// An OpenGL ES rendering context.
    ContextHandle
);
egl_handle!(
    /// A window surface bound to a native window.
    SurfaceHandle
);

/// The subset of EGL 1.4 (plus `EGL_KHR_create_context` and
/// `EGL_ANDROID_presentation_time`) used to drive a window surface.
///
/// Implementations must be callable from any thread. Each rendering thread only ever
/// passes handles it created itself.
pub trait Egl: Send + Sync {
    /// `eglGetDisplay(EGL_DEFAULT_DISPLAY)`.
    fn get_default_display(&self) -> Option<DisplayHandle>;

    /// `eglInitialize`; returns the EGL version of the display.
    fn initialize(&self, display: DisplayHandle) -> Result<(EGLint, EGLint), WindowingApiError>;

    /// `eglTerminate`.
    fn terminate(&self, display: DisplayHandle) -> Result<(), WindowingApiError>;

    /// Returns how many configs match `attributes` (`eglChooseConfig` with no output array).
    fn config_count(&self, display: DisplayHandle, attributes: &[EGLint])
                    -> Result<usize, WindowingApiError>;

    /// Returns up to `max_configs` configs matching `attributes`, best first.
    fn choose_config(&self, display: DisplayHandle, attributes: &[EGLint], max_configs: usize)
                     -> Result<Vec<ConfigHandle>, WindowingApiError>;

    /// `eglGetConfigAttrib`; `None` if the attribute can't be read.
    fn get_config_attrib(&self, display: DisplayHandle, config: ConfigHandle, attribute: EGLint)
                         -> Option<EGLint>;

    /// `eglCreateContext` with no share context. `attributes` is `NONE`-terminated, or empty
    /// to request the driver defaults.
    fn create_context(&self, display: DisplayHandle, config: ConfigHandle, attributes: &[EGLint])
                      -> Result<ContextHandle, WindowingApiError>;

    /// `eglDestroyContext`.
    fn destroy_context(&self, display: DisplayHandle, context: ContextHandle)
                       -> Result<(), WindowingApiError>;

    /// `eglQueryContext`. Drivers without `EGL_KHR_create_context` report `BadAttribute` for
    /// the minor version.
    fn query_context(&self, display: DisplayHandle, context: ContextHandle, attribute: EGLint)
                     -> Result<EGLint, WindowingApiError>;

    /// `eglCreateWindowSurface` against the native window of `native_widget`.
    fn create_window_surface(&self,
                             display: DisplayHandle,
                             config: ConfigHandle,
                             native_widget: &NativeWidget,
                             attributes: &[EGLint])
                             -> Result<SurfaceHandle, WindowingApiError>;

    /// `eglDestroySurface`.
    fn destroy_surface(&self, display: DisplayHandle, surface: SurfaceHandle)
                       -> Result<(), WindowingApiError>;

    /// `eglMakeCurrent`. Passing `None` for everything releases the current context.
    fn make_current(&self,
                    display: DisplayHandle,
                    draw: Option<SurfaceHandle>,
                    read: Option<SurfaceHandle>,
                    context: Option<ContextHandle>)
                    -> Result<(), WindowingApiError>;

    /// `eglSwapBuffers`.
    fn swap_buffers(&self, display: DisplayHandle, surface: SurfaceHandle)
                    -> Result<(), WindowingApiError>;

    /// `eglPresentationTimeANDROID`. Drivers without the extension fail with `Failed`.
    fn presentation_time(&self, _display: DisplayHandle, _surface: SurfaceHandle, _nanos: i64)
                         -> Result<(), WindowingApiError> {
        Err(WindowingApiError::Failed)
    }

    /// `eglGetProcAddress`, used to load OpenGL ES entry points.
    fn get_proc_address(&self, _symbol_name: &str) -> *const c_void {
        ptr::null()
    }
}
