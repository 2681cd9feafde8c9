// gl-surface-view/src/factory.rs
//
//! Strategies for creating and destroying EGL contexts and window surfaces.

use crate::egl::{self, ConfigHandle, ContextHandle, DisplayHandle, Egl, EGLint, SurfaceHandle};
use crate::surface::NativeWidget;
use crate::{GLVersion, WindowingApiError};

/// Creates the rendering context for a view.
pub trait ContextFactory: Send + Sync {
    /// Creates a context for `config`, returning it along with the version the factory
    /// believes it obtained. The driver is queried afterwards for the version it actually
    /// honored; the returned version is only used when that query is unsupported.
    fn create_context(&self,
                      egl: &dyn Egl,
                      display: DisplayHandle,
                      config: ConfigHandle,
                      requested: GLVersion)
                      -> Result<(ContextHandle, GLVersion), WindowingApiError>;

    fn destroy_context(&self, egl: &dyn Egl, display: DisplayHandle, context: ContextHandle)
                       -> Result<(), WindowingApiError>;
}

/// Creates window surfaces for a view.
pub trait WindowSurfaceFactory: Send + Sync {
    fn create_window_surface(&self,
                             egl: &dyn Egl,
                             display: DisplayHandle,
                             config: ConfigHandle,
                             native_widget: &NativeWidget)
                             -> Result<SurfaceHandle, WindowingApiError>;

    fn destroy_surface(&self, egl: &dyn Egl, display: DisplayHandle, surface: SurfaceHandle);
}

/// Creates unshared contexts, negotiating the version down when the driver refuses the
/// requested minor version.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultContextFactory;

impl ContextFactory for DefaultContextFactory {
    fn create_context(&self,
                      egl: &dyn Egl,
                      display: DisplayHandle,
                      config: ConfigHandle,
                      requested: GLVersion)
                      -> Result<(ContextHandle, GLVersion), WindowingApiError> {
        let major = requested.major as EGLint;
        let minor = requested.minor as EGLint;

        if minor != 0 {
            let major_minor_attributes = [
                egl::CONTEXT_MAJOR_VERSION_KHR, major,
                egl::CONTEXT_MINOR_VERSION_KHR, minor,
                egl::NONE,
            ];
            match egl.create_context(display, config, &major_minor_attributes) {
                Ok(context) => return Ok((context, requested)),
                Err(err) => {
                    debug!("couldn't create a {} context ({:?}); retrying with major version {}",
                           requested,
                           err,
                           major);
                }
            }
        }

        let major_attributes = [egl::CONTEXT_CLIENT_VERSION, major, egl::NONE];
        let attributes: &[EGLint] = if major != 0 { &major_attributes } else { &[] };
        let context = egl.create_context(display, config, attributes)?;
        Ok((context, GLVersion::new(requested.major, 0)))
    }

    fn destroy_context(&self, egl: &dyn Egl, display: DisplayHandle, context: ContextHandle)
                       -> Result<(), WindowingApiError> {
        egl.destroy_context(display, context)
    }
}

/// Creates window surfaces with no extra attributes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultWindowSurfaceFactory;

impl WindowSurfaceFactory for DefaultWindowSurfaceFactory {
    fn create_window_surface(&self,
                             egl: &dyn Egl,
                             display: DisplayHandle,
                             config: ConfigHandle,
                             native_widget: &NativeWidget)
                             -> Result<SurfaceHandle, WindowingApiError> {
        egl.create_window_surface(display, config, native_widget, &[egl::NONE])
    }

    fn destroy_surface(&self, egl: &dyn Egl, display: DisplayHandle, surface: SurfaceHandle) {
        if let Err(err) = egl.destroy_surface(display, surface) {
            warn!("eglDestroySurface failed: {:?}", err);
        }
    }
}
