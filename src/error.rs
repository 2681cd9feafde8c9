// gl-surface-view/src/error.rs
//
//! Various errors that methods can produce.

use std::fmt::{self, Display, Formatter};

/// Various errors that methods can produce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The system EGL library couldn't be located.
    NoGLLibraryFound,
    /// No default EGL display could be obtained.
    NoDisplayFound,
    /// The EGL display couldn't be initialized.
    DisplayInitializationFailed(WindowingApiError),
    /// Choosing an EGL config failed.
    PixelFormatSelectionFailed(WindowingApiError),
    /// The system couldn't choose an EGL config matching the requested attributes.
    NoPixelFormatFound,
    /// The system couldn't create an OpenGL ES context.
    ContextCreationFailed(WindowingApiError),
    /// The system couldn't destroy the OpenGL ES context.
    ContextDestructionFailed(WindowingApiError),
    /// The system couldn't make the OpenGL ES context current or not current.
    MakeCurrentFailed(WindowingApiError),
    /// A surface operation was attempted before a context was created.
    NoCurrentContext,
    /// The system couldn't create a window surface.
    SurfaceCreationFailed(WindowingApiError),
    /// The view has no native window to render into.
    NoWidgetAttached,
    /// The native widget type does not match the supplied driver.
    IncompatibleNativeWidget,
    /// The native widget is invalid.
    InvalidNativeWidget,
    /// The rendering thread couldn't be spawned.
    ThreadSpawnFailed,
    /// A renderer was already attached to this view.
    RendererAlreadySet,
    /// The operation requires a renderer, but none was attached.
    NoRenderer,
    /// The value does not name a render mode.
    InvalidRenderMode(i32),
    /// A blocking teardown was requested from the rendering thread itself.
    CalledFromRenderThread,
}

impl Error {
    /// Returns true if this error only invalidates the current window surface.
    ///
    /// Such errors are recovered from by waiting for the host to report a fresh native
    /// surface; all other errors met by a rendering thread end its session.
    pub fn is_surface_level(&self) -> bool {
        matches!(
            *self,
            Error::SurfaceCreationFailed(_)
                | Error::NoWidgetAttached
                | Error::InvalidNativeWidget
                | Error::MakeCurrentFailed(_)
        )
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        match *self {
            Error::DisplayInitializationFailed(err) => {
                write!(formatter, "eglInitialize failed: {:?}", err)
            }
            Error::PixelFormatSelectionFailed(err) => {
                write!(formatter, "eglChooseConfig failed: {:?}", err)
            }
            Error::ContextCreationFailed(err) => {
                write!(formatter, "eglCreateContext failed: {:?}", err)
            }
            Error::ContextDestructionFailed(err) => {
                write!(formatter, "eglDestroyContext failed: {:?}", err)
            }
            Error::MakeCurrentFailed(err) => write!(formatter, "eglMakeCurrent failed: {:?}", err),
            Error::SurfaceCreationFailed(err) => {
                write!(formatter, "eglCreateWindowSurface failed: {:?}", err)
            }
            Error::InvalidRenderMode(mode) => write!(formatter, "invalid render mode: {}", mode),
            other => write!(formatter, "{:?}", other),
        }
    }
}

impl std::error::Error for Error {}

/// Abstraction of the errors that EGL returns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowingApiError {
    /// Miscellaneous error.
    Failed,
    /// EGL is not initialized, or could not be initialized, for the specified EGL display
    /// connection.
    NotInitialized,
    /// EGL cannot access a requested resource (for example a context is bound in another
    /// thread).
    BadAccess,
    /// EGL failed to allocate resources for the requested operation.
    BadAlloc,
    /// An unrecognized attribute or attribute value was passed in the attribute list.
    BadAttribute,
    /// An EGLConfig argument does not name a valid EGL frame buffer configuration.
    BadConfig,
    /// An EGLContext argument does not name a valid EGL rendering context.
    BadContext,
    /// The current surface of the calling thread is a window, pixel buffer or pixmap that is no
    /// longer valid.
    BadCurrentSurface,
    /// An EGLDisplay argument does not name a valid EGL display connection.
    BadDisplay,
    /// An EGLSurface argument does not name a valid surface configured for GL rendering.
    BadSurface,
    /// Arguments are inconsistent (for example, a valid context requires buffers not supplied
    /// by a valid surface).
    BadMatch,
    /// One or more argument values are invalid.
    BadParameter,
    /// A NativePixmapType argument does not refer to a valid native pixmap.
    BadNativePixmap,
    /// A NativeWindowType argument does not refer to a valid native window.
    BadNativeWindow,
    /// A power management event has occurred. The application must destroy all contexts and
    /// reinitialise OpenGL ES state and objects to continue rendering.
    ContextLost,
}
