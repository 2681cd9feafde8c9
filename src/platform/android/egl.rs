// gl-surface-view/src/platform/android/egl.rs
//
//! The `Egl` driver over the system `libEGL.so`.

use super::error::ToWindowingApiError;
use super::ffi::egl_sys::types::{EGLConfig, EGLContext, EGLDisplay, EGLSurface};
use super::ffi::egl_sys::{self as sys, types::EGLint};
use super::ffi::{self, EGL_FUNCTIONS};
use crate::egl::{ConfigHandle, ContextHandle, DisplayHandle, Egl, SurfaceHandle};
use crate::surface::NativeWidget;
use crate::{Error, WindowingApiError};

use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

/// The system EGL driver.
///
/// Entry points are loaded lazily, once per thread that uses them.
#[derive(Clone, Copy, Debug)]
pub struct AndroidEgl {
    _private: (),
}

impl AndroidEgl {
    /// Opens the system EGL library.
    pub fn new() -> Result<AndroidEgl, Error> {
        if !ffi::egl_library_loaded() {
            return Err(Error::NoGLLibraryFound);
        }
        Ok(AndroidEgl { _private: () })
    }
}

fn last_error() -> WindowingApiError {
    EGL_FUNCTIONS.with(|egl| unsafe { egl.GetError() }).to_windowing_api_error()
}

fn check(result: sys::types::EGLBoolean) -> Result<(), WindowingApiError> {
    if result == sys::FALSE {
        Err(last_error())
    } else {
        Ok(())
    }
}

fn display(handle: DisplayHandle) -> EGLDisplay {
    handle.as_ptr() as EGLDisplay
}

fn config(handle: ConfigHandle) -> EGLConfig {
    handle.as_ptr() as EGLConfig
}

fn context(handle: Option<ContextHandle>) -> EGLContext {
    handle.map_or(sys::NO_CONTEXT, |handle| handle.as_ptr() as EGLContext)
}

fn surface(handle: Option<SurfaceHandle>) -> EGLSurface {
    handle.map_or(sys::NO_SURFACE, |handle| handle.as_ptr() as EGLSurface)
}

// Attribute lists handed to EGL must not be empty.
fn attribute_ptr(attributes: &[EGLint]) -> *const EGLint {
    if attributes.is_empty() {
        ptr::null()
    } else {
        attributes.as_ptr()
    }
}

impl Egl for AndroidEgl {
    fn get_default_display(&self) -> Option<DisplayHandle> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let egl_display = egl.GetDisplay(sys::DEFAULT_DISPLAY);
            if egl_display == sys::NO_DISPLAY {
                None
            } else {
                Some(DisplayHandle::from_ptr(egl_display as *const c_void))
            }
        })
    }

    fn initialize(&self, handle: DisplayHandle) -> Result<(EGLint, EGLint), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let (mut major_version, mut minor_version) = (0, 0);
            check(egl.Initialize(display(handle), &mut major_version, &mut minor_version))?;
            Ok((major_version, minor_version))
        })
    }

    fn terminate(&self, handle: DisplayHandle) -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe { check(egl.Terminate(display(handle))) })
    }

    fn config_count(&self, handle: DisplayHandle, attributes: &[EGLint])
                    -> Result<usize, WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let mut config_count = 0;
            check(egl.ChooseConfig(display(handle),
                                   attribute_ptr(attributes),
                                   ptr::null_mut(),
                                   0,
                                   &mut config_count))?;
            Ok(config_count.max(0) as usize)
        })
    }

    fn choose_config(&self, handle: DisplayHandle, attributes: &[EGLint], max_configs: usize)
                     -> Result<Vec<ConfigHandle>, WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let mut configs: Vec<EGLConfig> = vec![ptr::null(); max_configs];
            let mut config_count = 0;
            check(egl.ChooseConfig(display(handle),
                                   attribute_ptr(attributes),
                                   configs.as_mut_ptr(),
                                   max_configs as EGLint,
                                   &mut config_count))?;
            configs.truncate(config_count.max(0) as usize);
            Ok(configs.into_iter()
                      .map(|egl_config| ConfigHandle::from_ptr(egl_config as *const c_void))
                      .collect())
        })
    }

    fn get_config_attrib(&self, handle: DisplayHandle, egl_config: ConfigHandle, attribute: EGLint)
                         -> Option<EGLint> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let mut value = 0;
            let result = egl.GetConfigAttrib(display(handle),
                                             config(egl_config),
                                             attribute,
                                             &mut value);
            if result == sys::FALSE {
                None
            } else {
                Some(value)
            }
        })
    }

    fn create_context(&self,
                      handle: DisplayHandle,
                      egl_config: ConfigHandle,
                      attributes: &[EGLint])
                      -> Result<ContextHandle, WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let egl_context = egl.CreateContext(display(handle),
                                                config(egl_config),
                                                sys::NO_CONTEXT,
                                                attribute_ptr(attributes));
            if egl_context == sys::NO_CONTEXT {
                return Err(last_error());
            }
            Ok(ContextHandle::from_ptr(egl_context as *const c_void))
        })
    }

    fn destroy_context(&self, handle: DisplayHandle, egl_context: ContextHandle)
                       -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            check(egl.DestroyContext(display(handle), context(Some(egl_context))))
        })
    }

    fn query_context(&self, handle: DisplayHandle, egl_context: ContextHandle, attribute: EGLint)
                     -> Result<EGLint, WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let mut value = 0;
            check(egl.QueryContext(display(handle),
                                   context(Some(egl_context)),
                                   attribute,
                                   &mut value))?;
            Ok(value)
        })
    }

    fn create_window_surface(&self,
                             handle: DisplayHandle,
                             egl_config: ConfigHandle,
                             native_widget: &NativeWidget,
                             attributes: &[EGLint])
                             -> Result<SurfaceHandle, WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let egl_surface = egl.CreateWindowSurface(display(handle),
                                                      config(egl_config),
                                                      native_widget.native_window() as *const _,
                                                      attribute_ptr(attributes));
            if egl_surface == sys::NO_SURFACE {
                return Err(last_error());
            }
            Ok(SurfaceHandle::from_ptr(egl_surface as *const c_void))
        })
    }

    fn destroy_surface(&self, handle: DisplayHandle, egl_surface: SurfaceHandle)
                       -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            check(egl.DestroySurface(display(handle), surface(Some(egl_surface))))
        })
    }

    fn make_current(&self,
                    handle: DisplayHandle,
                    draw: Option<SurfaceHandle>,
                    read: Option<SurfaceHandle>,
                    egl_context: Option<ContextHandle>)
                    -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            check(egl.MakeCurrent(display(handle),
                                  surface(draw),
                                  surface(read),
                                  context(egl_context)))
        })
    }

    fn swap_buffers(&self, handle: DisplayHandle, egl_surface: SurfaceHandle)
                    -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            check(egl.SwapBuffers(display(handle), surface(Some(egl_surface))))
        })
    }

    fn presentation_time(&self, handle: DisplayHandle, egl_surface: SurfaceHandle, nanos: i64)
                         -> Result<(), WindowingApiError> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            if !egl.PresentationTimeANDROID.is_loaded() {
                return Err(WindowingApiError::Failed);
            }
            check(egl.PresentationTimeANDROID(display(handle), surface(Some(egl_surface)), nanos))
        })
    }

    fn get_proc_address(&self, symbol_name: &str) -> *const c_void {
        let symbol_name = match CString::new(symbol_name) {
            Ok(symbol_name) => symbol_name,
            Err(_) => return ptr::null(),
        };
        EGL_FUNCTIONS.with(|egl| unsafe {
            egl.GetProcAddress(symbol_name.as_ptr()) as *const c_void
        })
    }
}
