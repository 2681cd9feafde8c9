// gl-surface-view/src/gl_context.rs
//
//! The EGL display, config, context and window surface of one rendering thread.

use crate::egl::{self, ConfigHandle, ContextHandle, DisplayHandle, Egl, SurfaceHandle};
use crate::view::{DebugFlags, ViewShared};
use crate::{Error, GLVersion, WindowingApiError};

use std::sync::{Arc, Weak};

/// What happened when a frame was presented.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SwapStatus {
    /// The frame was presented.
    Success,
    /// The driver invalidated the context; it must be torn down and recreated.
    ContextLost,
    /// The surface is unusable; wait for the host to provide a fresh one.
    Failed(WindowingApiError),
}

/// Owns the EGL objects of one rendering thread.
///
/// Only the owning thread touches this. Strategies and the native window are resolved
/// through the view each time they're needed; the view may have gone away, in which case
/// creation fails and teardown falls back to plain EGL calls.
pub(crate) struct GLContext {
    egl: Arc<dyn Egl>,
    view: Weak<ViewShared>,
    display: Option<DisplayHandle>,
    config: Option<ConfigHandle>,
    context: Option<ContextHandle>,
    surface: Option<SurfaceHandle>,
}

impl GLContext {
    pub(crate) fn new(egl: Arc<dyn Egl>, view: Weak<ViewShared>) -> GLContext {
        GLContext { egl, view, display: None, config: None, context: None, surface: None }
    }

    /// Initializes the display, chooses a config and creates a context.
    ///
    /// Returns the version the driver actually honored. Every error is fatal to the session.
    pub(crate) fn start(&mut self) -> Result<GLVersion, Error> {
        let view = self.view.upgrade();
        if self.log_egl(&view) {
            info!("GLContext::start() tid={:?}", std::thread::current().id());
        }

        let display = self.egl.get_default_display().ok_or(Error::NoDisplayFound)?;
        self.display = Some(display);

        let (egl_major, egl_minor) = self.egl
                                         .initialize(display)
                                         .map_err(Error::DisplayInitializationFailed)?;
        trace!("initialized EGL {}.{}", egl_major, egl_minor);

        let view = match view {
            Some(view) => view,
            None => {
                self.config = None;
                self.context = None;
                return Err(Error::ContextCreationFailed(WindowingApiError::Failed));
            }
        };

        let strategies = view.strategies.read();
        let config = strategies.config_chooser.choose_config(&*self.egl,
                                                             display,
                                                             strategies.version)?;
        self.config = Some(config);

        let (context, created_version) = strategies.context_factory
                                                   .create_context(&*self.egl,
                                                                   display,
                                                                   config,
                                                                   strategies.version)
                                                   .map_err(Error::ContextCreationFailed)?;
        self.context = Some(context);

        // Drivers without `EGL_KHR_create_context` can't report the minor version. Trust the
        // factory in that case.
        let version = self.query_version(display, context).unwrap_or(created_version);
        *view.actual_version.lock() = version;
        debug!("created context, major version: {}; minor version: {}",
               version.major,
               version.minor);

        self.surface = None;
        Ok(version)
    }

    fn query_version(&self, display: DisplayHandle, context: ContextHandle)
                     -> Option<GLVersion> {
        let major = self.egl.query_context(display, context, egl::CONTEXT_MAJOR_VERSION_KHR).ok()?;
        let minor = self.egl.query_context(display, context, egl::CONTEXT_MINOR_VERSION_KHR).ok()?;
        Some(GLVersion::new(major as u8, minor as u8))
    }

    /// Creates a window surface against the view's current native window and makes it
    /// current.
    ///
    /// Any surface already held is destroyed first. Failures other than `NoCurrentContext`
    /// are surface-level: the native window may have gone away underneath us.
    pub(crate) fn create_surface(&mut self) -> Result<(), Error> {
        let (display, config, context) = match (self.display, self.config, self.context) {
            (Some(display), Some(config), Some(context)) => (display, config, context),
            _ => return Err(Error::NoCurrentContext),
        };

        let view = self.view.upgrade();
        if self.log_egl(&view) {
            info!("GLContext::create_surface() tid={:?}", std::thread::current().id());
        }

        self.destroy_surface_impl();

        let view = view.ok_or(Error::NoWidgetAttached)?;
        let native_widget = (*view.native_widget.lock()).ok_or(Error::NoWidgetAttached)?;
        let surface = view.strategies
                          .read()
                          .surface_factory
                          .create_window_surface(&*self.egl, display, config, &native_widget)
                          .map_err(|err| {
                              if err == WindowingApiError::BadNativeWindow {
                                  error!("createWindowSurface returned EGL_BAD_NATIVE_WINDOW.");
                              }
                              Error::SurfaceCreationFailed(err)
                          })?;
        self.surface = Some(surface);

        self.egl
            .make_current(display, Some(surface), Some(surface), Some(context))
            .map_err(Error::MakeCurrentFailed)
    }

    /// Presents the current surface.
    pub(crate) fn swap(&self) -> SwapStatus {
        let (display, surface) = match (self.display, self.surface) {
            (Some(display), Some(surface)) => (display, surface),
            _ => return SwapStatus::Failed(WindowingApiError::BadSurface),
        };

        match self.egl.swap_buffers(display, surface) {
            Ok(()) => SwapStatus::Success,
            Err(WindowingApiError::ContextLost) => SwapStatus::ContextLost,
            Err(err) => SwapStatus::Failed(err),
        }
    }

    /// Sets the presentation time of the next frame, if the driver supports it.
    pub(crate) fn set_presentation_time(&self, nanos: i64) {
        if let (Some(display), Some(surface)) = (self.display, self.surface) {
            if let Err(err) = self.egl.presentation_time(display, surface, nanos) {
                warn!("eglPresentationTimeANDROID failed: {:?}", err);
            }
        }
    }

    pub(crate) fn destroy_surface(&mut self) {
        if self.log_egl(&self.view.upgrade()) {
            info!("GLContext::destroy_surface() tid={:?}", std::thread::current().id());
        }
        self.destroy_surface_impl();
    }

    fn destroy_surface_impl(&mut self) {
        let (display, surface) = match (self.display, self.surface.take()) {
            (Some(display), Some(surface)) => (display, surface),
            _ => return,
        };

        if let Err(err) = self.egl.make_current(display, None, None, None) {
            warn!("eglMakeCurrent failed while releasing the surface: {:?}", err);
        }

        match self.view.upgrade() {
            Some(view) => {
                view.strategies.read().surface_factory.destroy_surface(&*self.egl, display, surface)
            }
            None => {
                if let Err(err) = self.egl.destroy_surface(display, surface) {
                    warn!("eglDestroySurface failed: {:?}", err);
                }
            }
        }
    }

    /// Destroys the context and terminates the display. Safe to call when nothing is held.
    pub(crate) fn finish(&mut self) -> Result<(), Error> {
        let view = self.view.upgrade();
        if self.log_egl(&view) {
            info!("GLContext::finish() tid={:?}", std::thread::current().id());
        }

        let mut result = Ok(());
        if let (Some(display), Some(context)) = (self.display, self.context.take()) {
            let destroyed = match view {
                Some(ref view) => {
                    let destroyed = view.strategies
                                        .read()
                                        .context_factory
                                        .destroy_context(&*self.egl, display, context);
                    *view.actual_version.lock() = GLVersion::UNKNOWN;
                    destroyed
                }
                None => self.egl.destroy_context(display, context),
            };
            if let Err(err) = destroyed {
                error!("eglDestroyContext failed: display: {:?} context: {:?}", display, context);
                result = Err(Error::ContextDestructionFailed(err));
            }
        }

        if let Some(display) = self.display.take() {
            if let Err(err) = self.egl.terminate(display) {
                warn!("eglTerminate failed: {:?}", err);
            }
        }
        self.config = None;
        result
    }

    fn log_egl(&self, view: &Option<Arc<ViewShared>>) -> bool {
        view.as_ref().map_or(false, |view| view.debug_flags().contains(DebugFlags::LOG_EGL))
    }
}
