// gl-surface-view/src/render_thread.rs
//
//! The rendering thread of a view and the state it shares with the controlling thread.
//!
//! Each view drives one dedicated thread. The thread's loop has a single blocking wait on
//! the arbiter's monitor; the controlling thread mutates the session state under the same
//! monitor and, for the synchronous operations, waits on it until the rendering thread
//! has acknowledged the change.

use crate::arbiter::{Monitor, MonitorState, SessionID};
use crate::egl::Egl;
use crate::gl_context::{GLContext, SwapStatus};
use crate::renderer::Renderer;
use crate::view::{DebugFlags, ViewShared};
use crate::Error;

use euclid::default::Size2D;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::convert::TryFrom;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};

/// A unit of work run on the rendering thread before the next frame.
pub type Event = Box<dyn FnOnce() + Send + 'static>;

/// When the rendering thread draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum RenderMode {
    /// Draw only when a render is requested, the view is resized or the view resumes.
    WhenDirty = 0,
    /// Draw repeatedly.
    Continuously = 1,
}

impl Default for RenderMode {
    #[inline]
    fn default() -> RenderMode {
        RenderMode::Continuously
    }
}

impl TryFrom<i32> for RenderMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<RenderMode, Error> {
        match value {
            0 => Ok(RenderMode::WhenDirty),
            1 => Ok(RenderMode::Continuously),
            _ => Err(Error::InvalidRenderMode(value)),
        }
    }
}

/// The part of a session shared between the rendering thread and its controllers.
///
/// Only ever accessed with the monitor held.
pub(crate) struct SessionState {
    pub(crate) should_exit: bool,
    pub(crate) exited: bool,
    pub(crate) request_paused: bool,
    pub(crate) paused: bool,
    pub(crate) has_surface: bool,
    pub(crate) surface_is_bad: bool,
    pub(crate) waiting_for_surface: bool,
    pub(crate) have_egl_context: bool,
    pub(crate) have_egl_surface: bool,
    pub(crate) finished_creating_egl_surface: bool,
    pub(crate) size: Size2D<i32>,
    pub(crate) render_mode: RenderMode,
    pub(crate) request_render: bool,
    pub(crate) render_complete: bool,
    pub(crate) size_changed: bool,
    pub(crate) event_queue: VecDeque<Event>,
    pub(crate) presentation_time: Option<i64>,
    pub(crate) fatal_error: Option<Error>,
}

impl SessionState {
    /// A fresh session, seeded with what the view already knows about its native surface.
    pub(crate) fn new(has_surface: bool, size: Size2D<i32>, render_mode: RenderMode)
                      -> SessionState {
        SessionState {
            should_exit: false,
            exited: false,
            request_paused: false,
            paused: false,
            has_surface,
            surface_is_bad: false,
            waiting_for_surface: false,
            have_egl_context: false,
            have_egl_surface: false,
            finished_creating_egl_surface: false,
            size,
            render_mode,
            request_render: false,
            render_complete: false,
            size_changed: true,
            event_queue: VecDeque::new(),
            presentation_time: None,
            fatal_error: None,
        }
    }

    pub(crate) fn ready_to_draw(&self) -> bool {
        !self.paused &&
            self.has_surface &&
            !self.surface_is_bad &&
            self.size.width > 0 &&
            self.size.height > 0 &&
            (self.request_render || self.render_mode == RenderMode::Continuously)
    }

    pub(crate) fn able_to_draw(&self) -> bool {
        self.have_egl_context && self.have_egl_surface && self.ready_to_draw()
    }
}

/// Handle to a view's rendering thread.
///
/// Operations that block wait only while the rendering thread is alive, and never wait when
/// called from the rendering thread itself. Dropping the handle exits the thread.
pub struct RenderThread {
    id: SessionID,
    monitor: Arc<Monitor>,
    thread_id: ThreadId,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenderThread {
    pub(crate) fn spawn(monitor: Arc<Monitor>,
                        egl: Arc<dyn Egl>,
                        view: Weak<ViewShared>,
                        session: SessionState)
                        -> Result<RenderThread, Error> {
        let id = monitor.register_session(session);
        let mut render_loop = RenderLoop {
            id,
            monitor: monitor.clone(),
            view: view.clone(),
            gl: GLContext::new(egl, view),
        };

        let spawned = thread::Builder::new().name(format!("GLThread {}", id.0))
                                            .spawn(move || render_loop.run());
        match spawned {
            Ok(join_handle) => Ok(RenderThread {
                id,
                monitor,
                thread_id: join_handle.thread().id(),
                join_handle: Mutex::new(Some(join_handle)),
            }),
            Err(err) => {
                error!("failed to spawn the rendering thread: {}", err);
                monitor.unregister_session(id);
                Err(Error::ThreadSpawnFailed)
            }
        }
    }

    #[inline]
    pub fn id(&self) -> SessionID {
        self.id
    }

    /// Returns true if the caller is running on this rendering thread.
    #[inline]
    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn set_render_mode(&self, render_mode: RenderMode) {
        self.update(|session| session.render_mode = render_mode);
    }

    pub fn render_mode(&self) -> RenderMode {
        self.read(|session| session.render_mode).unwrap_or_default()
    }

    /// Asks for a frame. Returns immediately.
    pub fn request_render(&self) {
        self.update(|session| session.request_render = true);
    }

    /// The native surface is available. Waits until the rendering thread has noticed it.
    pub fn surface_created(&self) {
        self.update_and_wait(|session| {
                                 session.has_surface = true;
                                 session.finished_creating_egl_surface = false;
                             },
                             |session| {
                                 session.waiting_for_surface &&
                                     !session.finished_creating_egl_surface
                             });
    }

    /// The native surface is about to go away. Waits until the rendering thread has stopped
    /// using it.
    pub fn surface_destroyed(&self) {
        self.update_and_wait(|session| session.has_surface = false,
                             |session| !session.waiting_for_surface);
    }

    /// Waits until the rendering thread has paused.
    pub fn on_pause(&self) {
        self.update_and_wait(|session| session.request_paused = true,
                             |session| !session.paused);
    }

    /// Waits until the rendering thread has resumed or drawn a frame.
    pub fn on_resume(&self) {
        self.update_and_wait(|session| {
                                 session.request_paused = false;
                                 session.request_render = true;
                                 session.render_complete = false;
                             },
                             |session| session.paused && !session.render_complete);
    }

    /// Records the new surface size and waits for a frame at that size, unless the thread
    /// can't draw (paused, no surface or no context yet).
    pub fn on_window_resize(&self, size: Size2D<i32>) {
        self.update_and_wait(|session| {
                                 session.size = size;
                                 session.size_changed = true;
                                 session.request_render = true;
                                 session.render_complete = false;
                             },
                             |session| {
                                 !session.paused &&
                                     !session.render_complete &&
                                     session.able_to_draw()
                             });
    }

    /// Asks the thread to exit and waits for it to finish.
    ///
    /// Fails if called from the rendering thread, which could never observe its own exit.
    pub fn request_exit_and_wait(&self) -> Result<(), Error> {
        if self.is_current_thread() {
            return Err(Error::CalledFromRenderThread);
        }

        self.update_and_wait(|session| session.should_exit = true, |_| true);

        if let Some(join_handle) = self.join_handle.lock().take() {
            if join_handle.join().is_err() {
                warn!("rendering thread {:?} panicked", self.id);
            }
        }
        Ok(())
    }

    /// Makes the thread tear down its surface and context on its next pass and skip one
    /// reacquisition.
    pub fn request_release_context(&self) {
        let mut guard = self.monitor.state.lock();
        self.monitor.request_release_locked(&mut guard.arbitration, self.id);
    }

    /// Queues `event` to run on the rendering thread before the next frame.
    ///
    /// Events run one per loop pass, in the order they were queued.
    pub fn queue_event<F>(&self, event: F) where F: FnOnce() + Send + 'static {
        self.update(move |session| session.event_queue.push_back(Box::new(event)));
    }

    /// Sets the presentation time, in nanoseconds, of the next frame.
    pub fn set_presentation_time(&self, nanos: i64) {
        self.update(|session| session.presentation_time = Some(nanos));
    }

    /// The error that ended this thread, if any.
    pub fn fatal_error(&self) -> Option<Error> {
        self.read(|session| session.fatal_error).flatten()
    }

    pub fn is_paused(&self) -> bool {
        self.read(|session| session.paused).unwrap_or(false)
    }

    pub fn has_exited(&self) -> bool {
        self.read(|session| session.exited).unwrap_or(true)
    }

    fn read<F, T>(&self, f: F) -> Option<T> where F: FnOnce(&SessionState) -> T {
        self.monitor.state.lock().sessions.get(&self.id).map(f)
    }

    fn update<F>(&self, f: F) where F: FnOnce(&mut SessionState) {
        let mut guard = self.monitor.state.lock();
        if let Some(session) = guard.sessions.get_mut(&self.id) {
            f(session);
            self.monitor.cond.notify_all();
        }
    }

    // Applies `update`, then waits while the thread is alive and `keep_waiting` holds.
    fn update_and_wait<U, W>(&self, update: U, mut keep_waiting: W)
                             where U: FnOnce(&mut SessionState),
                                   W: FnMut(&SessionState) -> bool {
        let mut guard = self.monitor.state.lock();
        match guard.sessions.get_mut(&self.id) {
            Some(session) => update(session),
            None => return,
        }
        self.monitor.cond.notify_all();

        if self.is_current_thread() {
            return;
        }

        loop {
            match guard.sessions.get(&self.id) {
                Some(session) if !session.exited && keep_waiting(session) => {}
                _ => return,
            }
            self.monitor.cond.wait(&mut guard);
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if self.is_current_thread() {
            // The loop exits once it notices its session is gone.
            self.update(|session| session.should_exit = true);
        } else if let Err(err) = self.request_exit_and_wait() {
            warn!("couldn't stop the rendering thread: {}", err);
        }
        self.monitor.unregister_session(self.id);
    }
}

struct RenderLoop {
    id: SessionID,
    monitor: Arc<Monitor>,
    view: Weak<ViewShared>,
    gl: GLContext,
}

impl RenderLoop {
    fn run(&mut self) {
        if self.logs(DebugFlags::LOG_THREADS) {
            info!("starting tid={:?}", self.id);
        }

        if let Err(err) = self.guarded_run() {
            error!("rendering thread {:?} failed: {}", self.id, err);
            if let Some(session) = self.monitor.state.lock().sessions.get_mut(&self.id) {
                session.fatal_error = Some(err);
            }
        }

        if self.logs(DebugFlags::LOG_THREADS) {
            info!("exiting tid={:?}", self.id);
        }
    }

    fn guarded_run(&mut self) -> Result<(), Error> {
        let monitor = self.monitor.clone();
        let id = self.id;

        let mut create_egl_context = false;
        let mut notify_context_created = false;
        let mut create_egl_surface = false;
        let mut lost_egl_context = false;
        let mut size_changed = false;
        let mut want_render_notification = false;
        let mut do_render_notification = false;
        let mut size = Size2D::zero();
        let mut presentation_time = None;

        loop {
            let mut event = None;
            {
                let mut guard = monitor.state.lock();
                loop {
                    let MonitorState { sessions, arbitration, .. } = &mut *guard;
                    let session = match sessions.get_mut(&id) {
                        Some(session) => session,
                        None => return Ok(()),
                    };

                    if session.should_exit {
                        return Ok(());
                    }

                    if let Some(next_event) = session.event_queue.pop_front() {
                        event = Some(next_event);
                        break;
                    }

                    // Update the pause state.
                    let mut pausing = false;
                    if session.paused != session.request_paused {
                        pausing = session.request_paused;
                        session.paused = session.request_paused;
                        monitor.cond.notify_all();
                        if self.logs(DebugFlags::LOG_PAUSE_RESUME) {
                            info!("paused is now {} tid={:?}", session.paused, id);
                        }
                    }

                    if arbitration.take_release_request(id) {
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("releasing EGL context because asked to tid={:?}", id);
                        }
                        self.stop_egl_surface_locked(session);
                        self.stop_egl_context_locked(session);
                        monitor.release_egl_context_locked(arbitration, id);
                    }

                    if lost_egl_context {
                        self.stop_egl_surface_locked(session);
                        if self.stop_egl_context_locked(session) {
                            monitor.release_egl_context_locked(arbitration, id);
                        }
                        lost_egl_context = false;
                    }

                    // EGL surfaces can't be used while paused.
                    if pausing && session.have_egl_surface {
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("releasing EGL surface because paused tid={:?}", id);
                        }
                        self.stop_egl_surface_locked(session);
                    }

                    if pausing && session.have_egl_context && !self.preserves_context() {
                        if self.stop_egl_context_locked(session) {
                            monitor.release_egl_context_locked(arbitration, id);
                        }
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("releasing EGL context because paused tid={:?}", id);
                        }
                    }

                    if !session.has_surface && !session.waiting_for_surface {
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("noticed native surface lost tid={:?}", id);
                        }
                        self.stop_egl_surface_locked(session);
                        session.waiting_for_surface = true;
                        session.surface_is_bad = false;
                        monitor.cond.notify_all();
                    }

                    if session.has_surface && session.waiting_for_surface {
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("noticed native surface acquired tid={:?}", id);
                        }
                        session.waiting_for_surface = false;
                        monitor.cond.notify_all();
                    }

                    if do_render_notification {
                        if self.logs(DebugFlags::LOG_SURFACE) {
                            info!("sending render notification tid={:?}", id);
                        }
                        want_render_notification = false;
                        do_render_notification = false;
                        session.render_complete = true;
                        monitor.cond.notify_all();
                    }

                    if session.ready_to_draw() {
                        if !session.have_egl_context &&
                                monitor.try_acquire_egl_context_locked(arbitration, id) {
                            if let Err(err) = self.gl.start() {
                                monitor.release_egl_context_locked(arbitration, id);
                                return Err(err);
                            }
                            session.have_egl_context = true;
                            create_egl_context = true;
                            notify_context_created = true;
                            monitor.cond.notify_all();
                        }

                        if session.have_egl_context && !session.have_egl_surface {
                            session.have_egl_surface = true;
                            create_egl_surface = true;
                            size_changed = true;
                        }

                        if session.have_egl_surface {
                            if session.size_changed {
                                size_changed = true;
                                size = session.size;
                                want_render_notification = true;
                                if self.logs(DebugFlags::LOG_SURFACE) {
                                    info!("noticing that we want render notification tid={:?}",
                                          id);
                                }

                                // Destroy and recreate the EGL surface.
                                create_egl_surface = true;
                                session.size_changed = false;
                            }
                            session.request_render = false;
                            presentation_time = session.presentation_time.take();
                            monitor.cond.notify_all();
                            break;
                        }
                    } else if !session.have_egl_context {
                        monitor.withdraw_locked(arbitration, id);
                    }

                    if self.logs(DebugFlags::LOG_THREADS) {
                        info!("waiting tid={:?} have_egl_context: {} have_egl_surface: {} \
                               paused: {} has_surface: {} surface_is_bad: {} \
                               waiting_for_surface: {} size: {:?} request_render: {} \
                               render_mode: {:?}",
                              id,
                              session.have_egl_context,
                              session.have_egl_surface,
                              session.paused,
                              session.has_surface,
                              session.surface_is_bad,
                              session.waiting_for_surface,
                              session.size,
                              session.request_render,
                              session.render_mode);
                    }

                    // This is the only place the rendering thread waits.
                    monitor.cond.wait(&mut guard);
                }
            }

            if let Some(event) = event.take() {
                event();
                continue;
            }

            if notify_context_created {
                if self.logs(DebugFlags::LOG_RENDERER) {
                    info!("on_context_created tid={:?}", id);
                }
                self.with_renderer(|renderer| renderer.on_context_created());
                notify_context_created = false;
            }

            if create_egl_surface {
                if self.logs(DebugFlags::LOG_SURFACE) {
                    info!("creating EGL surface tid={:?}", id);
                }

                let created = self.gl.create_surface();
                let mut guard = monitor.state.lock();
                if let Some(session) = guard.sessions.get_mut(&id) {
                    session.finished_creating_egl_surface = true;
                    if created.is_err() {
                        session.surface_is_bad = true;
                    }
                }
                monitor.cond.notify_all();
                drop(guard);

                match created {
                    Ok(()) => create_egl_surface = false,
                    Err(err) if err.is_surface_level() => {
                        warn!("couldn't create an EGL surface: {}", err);
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }

            if create_egl_context {
                if self.logs(DebugFlags::LOG_RENDERER) {
                    info!("on_surface_created tid={:?}", id);
                }
                self.with_renderer(|renderer| renderer.on_surface_created());
                create_egl_context = false;
            }

            if size_changed {
                if self.logs(DebugFlags::LOG_RENDERER) {
                    info!("on_surface_changed({}, {}) tid={:?}", size.width, size.height, id);
                }
                self.with_renderer(|renderer| renderer.on_surface_changed(size));
                size_changed = false;
            }

            if self.logs(DebugFlags::LOG_DRAW_FRAME) {
                info!("on_draw_frame tid={:?}", id);
            }
            self.with_renderer(|renderer| renderer.on_draw_frame());

            if let Some(nanos) = presentation_time.take() {
                self.gl.set_presentation_time(nanos);
            }

            match self.gl.swap() {
                SwapStatus::Success => trace!("swapped tid={:?}", id),
                SwapStatus::ContextLost => {
                    if self.logs(DebugFlags::LOG_SURFACE) {
                        info!("egl context lost tid={:?}", id);
                    }
                    lost_egl_context = true;
                }
                SwapStatus::Failed(err) => {
                    // The native surface is probably gone and we haven't been told yet.
                    warn!("eglSwapBuffers failed: {:?}", err);
                    if let Some(session) = monitor.state.lock().sessions.get_mut(&id) {
                        session.surface_is_bad = true;
                    }
                    monitor.cond.notify_all();
                }
            }

            if want_render_notification {
                do_render_notification = true;
            }
        }
    }

    // The `_locked` methods expect the caller to hold the monitor.

    fn stop_egl_surface_locked(&mut self, session: &mut SessionState) {
        if session.have_egl_surface {
            session.have_egl_surface = false;
            self.gl.destroy_surface();
        }
    }

    // Returns true if a context was torn down; the caller releases ownership.
    fn stop_egl_context_locked(&mut self, session: &mut SessionState) -> bool {
        if !session.have_egl_context {
            return false;
        }
        if let Err(err) = self.gl.finish() {
            warn!("couldn't tear down the EGL context: {}", err);
        }
        session.have_egl_context = false;
        true
    }

    fn with_renderer<F>(&self, f: F) where F: FnOnce(&mut dyn Renderer) {
        if let Some(view) = self.view.upgrade() {
            if let Some(renderer) = view.renderer.lock().as_mut() {
                f(&mut **renderer);
            }
        }
    }

    fn preserves_context(&self) -> bool {
        self.view.upgrade().map_or(false, |view| view.preserve_egl_context_on_pause())
    }

    fn logs(&self, category: DebugFlags) -> bool {
        self.view.upgrade().map_or(false, |view| view.debug_flags().contains(category))
    }
}

impl Drop for RenderLoop {
    // Runs on normal exit, on fatal errors and while unwinding from a renderer panic.
    fn drop(&mut self) {
        let monitor = self.monitor.clone();
        let mut guard = monitor.state.lock();
        self.gl.destroy_surface();
        if let Err(err) = self.gl.finish() {
            warn!("couldn't tear down the EGL context: {}", err);
        }
        monitor.thread_exiting_locked(&mut guard, self.id);
    }
}
