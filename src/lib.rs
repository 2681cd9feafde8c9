//! An OpenGL ES surface view that renders on a dedicated thread.
//!
//! A [`SurfaceView`] owns one rendering thread. The thread manages the EGL display,
//! context and window surface of the view in step with the host's lifecycle
//! notifications (surface available or gone, resize, pause and resume), and calls into an
//! application-supplied [`Renderer`] to draw. All views in a process synchronize through
//! one [`ContextArbiter`], which can restrict how many of them hold an EGL context at once.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod platform;
#[cfg(android)]
pub use platform::android::AndroidEgl;

pub mod error;
pub use crate::error::{Error, WindowingApiError};

mod info;
pub use crate::info::GLVersion;

pub mod egl;
pub use crate::egl::Egl;

mod surface;
pub use crate::surface::NativeWidget;

pub mod chooser;
pub use crate::chooser::{ComponentSizeChooser, ComponentSizes, ConfigChooser};

pub mod factory;
pub use crate::factory::{ContextFactory, DefaultContextFactory};
pub use crate::factory::{DefaultWindowSurfaceFactory, WindowSurfaceFactory};

mod gl_context;
pub use crate::gl_context::SwapStatus;

mod arbiter;
pub use crate::arbiter::{ArbiterPolicy, ContextArbiter, SessionID};

mod render_thread;
pub use crate::render_thread::{Event, RenderMode, RenderThread};

mod renderer;
pub use crate::renderer::Renderer;

mod view;
pub use crate::view::{DebugFlags, SurfaceView};

pub mod gl_utils;

#[cfg(test)]
mod tests;
