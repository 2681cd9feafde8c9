// gl-surface-view/src/view.rs
//
//! The surface view: configuration, renderer and host lifecycle forwarding.

use crate::arbiter::ContextArbiter;
use crate::chooser::{ComponentSizeChooser, ComponentSizes, ConfigChooser};
use crate::egl::Egl;
use crate::factory::{ContextFactory, DefaultContextFactory, DefaultWindowSurfaceFactory};
use crate::factory::WindowSurfaceFactory;
use crate::render_thread::{RenderMode, RenderThread, SessionState};
use crate::renderer::Renderer;
use crate::surface::NativeWidget;
use crate::{Error, GLVersion};

use euclid::default::Size2D;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

bitflags! {
    /// Categories of verbose diagnostic logging.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DebugFlags: u8 {
        const LOG_ATTACH_DETACH = 0x01;
        const LOG_THREADS       = 0x02;
        const LOG_PAUSE_RESUME  = 0x04;
        const LOG_SURFACE       = 0x08;
        const LOG_RENDERER      = 0x10;
        const LOG_DRAW_FRAME    = 0x20;
        const LOG_EGL           = 0x40;
    }
}

/// The strategies a rendering thread creates its EGL objects with.
pub(crate) struct EglStrategies {
    pub(crate) config_chooser: Box<dyn ConfigChooser>,
    pub(crate) context_factory: Box<dyn ContextFactory>,
    pub(crate) surface_factory: Box<dyn WindowSurfaceFactory>,
    pub(crate) version: GLVersion,
}

impl Default for EglStrategies {
    fn default() -> EglStrategies {
        EglStrategies {
            config_chooser: Box::new(ComponentSizeChooser::default()),
            context_factory: Box::new(DefaultContextFactory),
            surface_factory: Box::new(DefaultWindowSurfaceFactory),
            version: GLVersion::default(),
        }
    }
}

/// View state the rendering thread reaches through its weak back-reference.
pub(crate) struct ViewShared {
    pub(crate) strategies: RwLock<EglStrategies>,
    pub(crate) renderer: Mutex<Option<Box<dyn Renderer>>>,
    pub(crate) native_widget: Mutex<Option<NativeWidget>>,
    pub(crate) actual_version: Mutex<GLVersion>,
    preserve_egl_context_on_pause: AtomicBool,
    debug_flags: AtomicU8,
}

impl ViewShared {
    #[inline]
    pub(crate) fn preserve_egl_context_on_pause(&self) -> bool {
        self.preserve_egl_context_on_pause.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn debug_flags(&self) -> DebugFlags {
        DebugFlags::from_bits_truncate(self.debug_flags.load(Ordering::Relaxed))
    }
}

/// A drawable surface that renders with OpenGL ES on a dedicated thread.
///
/// Configure the view, attach a [`Renderer`] with `set_renderer()`, then forward the host's
/// surface and lifecycle notifications. Rendering starts once the view has a native surface
/// with a positive size.
pub struct SurfaceView {
    egl: Arc<dyn Egl>,
    arbiter: ContextArbiter,
    shared: Arc<ViewShared>,
    render_thread: Option<RenderThread>,
    detached: bool,
    has_surface: bool,
    surface_size: Size2D<i32>,
}

impl SurfaceView {
    /// Creates a view that arbitrates contexts with every other view in the process.
    pub fn new(egl: Arc<dyn Egl>) -> SurfaceView {
        SurfaceView::with_arbiter(egl, ContextArbiter::global())
    }

    pub fn with_arbiter(egl: Arc<dyn Egl>, arbiter: ContextArbiter) -> SurfaceView {
        SurfaceView {
            egl,
            arbiter,
            shared: Arc::new(ViewShared {
                strategies: RwLock::new(EglStrategies::default()),
                renderer: Mutex::new(None),
                native_widget: Mutex::new(None),
                actual_version: Mutex::new(GLVersion::UNKNOWN),
                preserve_egl_context_on_pause: AtomicBool::new(false),
                debug_flags: AtomicU8::new(0),
            }),
            render_thread: None,
            detached: false,
            has_surface: false,
            surface_size: Size2D::zero(),
        }
    }

    #[inline]
    pub fn arbiter(&self) -> &ContextArbiter {
        &self.arbiter
    }

    /// The rendering thread, once a renderer is attached.
    #[inline]
    pub fn render_thread(&self) -> Option<&RenderThread> {
        self.render_thread.as_ref()
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.shared.debug_flags()
    }

    pub fn set_debug_flags(&self, flags: DebugFlags) {
        self.shared.debug_flags.store(flags.bits(), Ordering::Relaxed);
    }

    /// Whether the context is kept across `on_pause()`/`on_resume()`.
    ///
    /// The driver may still lose the context, in which case it is recreated as usual.
    pub fn set_preserve_egl_context_on_pause(&self, preserve: bool) {
        self.shared.preserve_egl_context_on_pause.store(preserve, Ordering::Relaxed);
    }

    pub fn preserve_egl_context_on_pause(&self) -> bool {
        self.shared.preserve_egl_context_on_pause()
    }

    pub fn set_config_chooser<C>(&mut self, config_chooser: C) -> Result<(), Error>
                                 where C: ConfigChooser + 'static {
        self.check_render_thread_state()?;
        self.shared.strategies.write().config_chooser = Box::new(config_chooser);
        Ok(())
    }

    /// Chooses an RGB888 config, with or without a 16-bit depth buffer.
    pub fn set_config_chooser_with_depth(&mut self, needs_depth: bool) -> Result<(), Error> {
        self.set_config_chooser(ComponentSizeChooser::simple(needs_depth))
    }

    pub fn set_config_chooser_sizes(&mut self, sizes: ComponentSizes) -> Result<(), Error> {
        self.set_config_chooser(ComponentSizeChooser::new(sizes))
    }

    pub fn set_context_factory<F>(&mut self, context_factory: F) -> Result<(), Error>
                                  where F: ContextFactory + 'static {
        self.check_render_thread_state()?;
        self.shared.strategies.write().context_factory = Box::new(context_factory);
        Ok(())
    }

    pub fn set_window_surface_factory<F>(&mut self, surface_factory: F) -> Result<(), Error>
                                         where F: WindowSurfaceFactory + 'static {
        self.check_render_thread_state()?;
        self.shared.strategies.write().surface_factory = Box::new(surface_factory);
        Ok(())
    }

    /// Sets the OpenGL ES version contexts are requested with. Defaults to 2.0.
    pub fn set_context_version(&mut self, version: GLVersion) -> Result<(), Error> {
        self.check_render_thread_state()?;
        self.shared.strategies.write().version = version;
        Ok(())
    }

    /// The version the current context actually provides, or `GLVersion::UNKNOWN` when no
    /// context is held.
    pub fn context_version(&self) -> GLVersion {
        *self.shared.actual_version.lock()
    }

    /// Attaches the renderer and starts the rendering thread. May only be called once.
    pub fn set_renderer<R>(&mut self, renderer: R) -> Result<(), Error>
                           where R: Renderer + 'static {
        self.check_render_thread_state()?;
        *self.shared.renderer.lock() = Some(Box::new(renderer));
        self.start_render_thread(RenderMode::default())
    }

    fn start_render_thread(&mut self, render_mode: RenderMode) -> Result<(), Error> {
        let session = SessionState::new(self.has_surface, self.surface_size, render_mode);
        let render_thread = RenderThread::spawn(self.arbiter.monitor.clone(),
                                                self.egl.clone(),
                                                Arc::downgrade(&self.shared),
                                                session)?;
        if self.debug_flags().contains(DebugFlags::LOG_THREADS) {
            info!("started rendering thread {:?}", render_thread.id());
        }
        self.render_thread = Some(render_thread);
        Ok(())
    }

    fn check_render_thread_state(&self) -> Result<(), Error> {
        match self.render_thread {
            Some(_) => Err(Error::RendererAlreadySet),
            None => Ok(()),
        }
    }

    fn thread(&self) -> Result<&RenderThread, Error> {
        self.render_thread.as_ref().ok_or(Error::NoRenderer)
    }

    pub fn set_render_mode(&self, render_mode: RenderMode) -> Result<(), Error> {
        self.thread()?.set_render_mode(render_mode);
        Ok(())
    }

    pub fn render_mode(&self) -> Result<RenderMode, Error> {
        Ok(self.thread()?.render_mode())
    }

    /// Asks the rendering thread for a frame. Mostly useful with `RenderMode::WhenDirty`.
    pub fn request_render(&self) -> Result<(), Error> {
        self.thread()?.request_render();
        Ok(())
    }

    /// Runs `event` on the rendering thread before the next frame.
    pub fn queue_event<F>(&self, event: F) -> Result<(), Error>
                          where F: FnOnce() + Send + 'static {
        self.thread()?.queue_event(event);
        Ok(())
    }

    /// Sets the presentation time, in nanoseconds, of the next frame drawn.
    pub fn set_presentation_time(&self, nanos: i64) -> Result<(), Error> {
        self.thread()?.set_presentation_time(nanos);
        Ok(())
    }

    /// The error that ended the rendering thread, if any.
    pub fn fatal_error(&self) -> Option<Error> {
        self.render_thread.as_ref().and_then(RenderThread::fatal_error)
    }

    // Host notifications. These are no-ops for the rendering thread until a renderer is
    // attached; the surface state is remembered and handed to the thread when it starts.

    /// The host's native surface is available.
    pub fn surface_created(&mut self, native_widget: NativeWidget) {
        *self.shared.native_widget.lock() = Some(native_widget);
        self.has_surface = true;
        if let Some(ref render_thread) = self.render_thread {
            render_thread.surface_created();
        }
    }

    /// The host's native surface changed size. Waits for a frame at the new size when the
    /// view is able to draw.
    pub fn surface_changed(&mut self, size: Size2D<i32>) {
        self.surface_size = size;
        if let Some(ref render_thread) = self.render_thread {
            render_thread.on_window_resize(size);
        }
    }

    /// The host's native surface is about to be destroyed. Returns once rendering has
    /// stopped touching it.
    pub fn surface_destroyed(&mut self) {
        self.has_surface = false;
        if let Some(ref render_thread) = self.render_thread {
            render_thread.surface_destroyed();
        }
        *self.shared.native_widget.lock() = None;
    }

    /// The application is pausing. Returns once the rendering thread has paused.
    pub fn on_pause(&self) {
        if let Some(ref render_thread) = self.render_thread {
            render_thread.on_pause();
        }
    }

    /// The application is resuming. Recreates the context if needed and renders a frame.
    pub fn on_resume(&self) {
        if let Some(ref render_thread) = self.render_thread {
            render_thread.on_resume();
        }
    }

    /// The view was attached to a window. Restarts rendering after a detach, keeping the
    /// previous render mode.
    pub fn on_attached_to_window(&mut self) -> Result<(), Error> {
        if self.debug_flags().contains(DebugFlags::LOG_ATTACH_DETACH) {
            info!("on_attached_to_window reattach={}", self.detached);
        }

        if self.detached && self.shared.renderer.lock().is_some() {
            let render_mode = self.render_thread
                                  .take()
                                  .map_or(RenderMode::default(), |old| old.render_mode());
            self.start_render_thread(render_mode)?;
        }
        self.detached = false;
        Ok(())
    }

    /// The view was detached from its window. Stops the rendering thread.
    pub fn on_detached_from_window(&mut self) -> Result<(), Error> {
        if self.debug_flags().contains(DebugFlags::LOG_ATTACH_DETACH) {
            info!("on_detached_from_window");
        }

        if let Some(ref render_thread) = self.render_thread {
            render_thread.request_exit_and_wait()?;
        }
        self.detached = true;
        Ok(())
    }
}

impl Drop for SurfaceView {
    fn drop(&mut self) {
        // Stop the thread before the renderer goes away.
        drop(self.render_thread.take());
    }
}
