// gl-surface-view/src/tests.rs
//
//! Unit tests, driven by a simulated EGL driver.

use crate::egl::{self, ConfigHandle, ContextHandle, DisplayHandle, Egl, EGLint, SurfaceHandle};
use crate::gl_utils;
use crate::{ArbiterPolicy, ComponentSizeChooser, ComponentSizes, ConfigChooser, ContextArbiter};
use crate::{ContextFactory, DefaultContextFactory, Error, GLVersion, NativeWidget, RenderMode};
use crate::{Renderer, SurfaceView, WindowingApiError};

use euclid::default::Size2D;
use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::Mutex;
use serial_test::serial;
use std::convert::TryFrom;
use std::os::raw::c_void;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DISPLAY: DisplayHandle = DisplayHandle(1);

#[derive(Clone, Debug, PartialEq)]
enum Call {
    ContextCreated,
    SurfaceCreated,
    SurfaceChanged(Size2D<i32>),
    DrawFrame,
    Event(u32),
    ContextLost,
}

type CallLog = Arc<Mutex<Vec<Call>>>;

#[derive(Clone, Copy, Debug)]
struct MockConfig {
    handle: ConfigHandle,
    sizes: ComponentSizes,
    renderable_type: EGLint,
}

struct MockState {
    next_handle: usize,
    configs: Vec<MockConfig>,
    contexts: FnvHashMap<ContextHandle, GLVersion>,
    surfaces: FnvHashSet<SurfaceHandle>,
    context_attempts: usize,
    contexts_created: usize,
    max_live_contexts: usize,
    surfaces_created: usize,
    swaps: usize,
    terminations: usize,
    last_config_attributes: Vec<EGLint>,
    presentation_times: Vec<(i64, Option<String>)>,
    call_log: Option<CallLog>,

    // Driver behavior.
    no_display: bool,
    fail_initialize: bool,
    fail_create_context: Option<WindowingApiError>,
    fail_window_surface: bool,
    supports_minor_version: bool,
    actual_version: Option<GLVersion>,
    lose_context_on_next_swap: bool,
    fail_next_swap: Option<WindowingApiError>,
}

struct MockEgl {
    state: Mutex<MockState>,
}

fn config(id: usize,
          sizes: (EGLint, EGLint, EGLint, EGLint, EGLint, EGLint),
          renderable_type: EGLint)
          -> MockConfig {
    let (red, green, blue, alpha, depth, stencil) = sizes;
    MockConfig {
        handle: ConfigHandle(id),
        sizes: ComponentSizes { red, green, blue, alpha, depth, stencil },
        renderable_type,
    }
}

impl MockEgl {
    fn new() -> Arc<MockEgl> {
        let es2_es3 = egl::OPENGL_ES2_BIT | egl::OPENGL_ES3_BIT_KHR;
        Arc::new(MockEgl {
            state: Mutex::new(MockState {
                next_handle: 100,
                configs: vec![
                    config(1, (8, 8, 8, 8, 24, 8), es2_es3),
                    config(2, (8, 8, 8, 0, 16, 0), es2_es3),
                    config(3, (5, 6, 5, 0, 16, 0), egl::OPENGL_ES2_BIT),
                    config(4, (8, 8, 8, 0, 0, 0), es2_es3),
                ],
                contexts: FnvHashMap::default(),
                surfaces: FnvHashSet::default(),
                context_attempts: 0,
                contexts_created: 0,
                max_live_contexts: 0,
                surfaces_created: 0,
                swaps: 0,
                terminations: 0,
                last_config_attributes: vec![],
                presentation_times: vec![],
                call_log: None,
                no_display: false,
                fail_initialize: false,
                fail_create_context: None,
                fail_window_surface: false,
                supports_minor_version: true,
                actual_version: None,
                lose_context_on_next_swap: false,
                fail_next_swap: None,
            }),
        })
    }

    fn live_contexts(&self) -> usize {
        self.state.lock().contexts.len()
    }

    fn live_surfaces(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    fn contexts_created(&self) -> usize {
        self.state.lock().contexts_created
    }

    fn matches(config: &MockConfig, attributes: &[EGLint]) -> bool {
        let sizes = config.sizes;
        attributes.chunks(2).all(|pair| match *pair {
            [egl::RED_SIZE, value] => sizes.red >= value,
            [egl::GREEN_SIZE, value] => sizes.green >= value,
            [egl::BLUE_SIZE, value] => sizes.blue >= value,
            [egl::ALPHA_SIZE, value] => sizes.alpha >= value,
            [egl::DEPTH_SIZE, value] => sizes.depth >= value,
            [egl::STENCIL_SIZE, value] => sizes.stencil >= value,
            [egl::RENDERABLE_TYPE, value] => config.renderable_type & value == value,
            _ => true,
        })
    }

    fn next_handle(state: &mut MockState) -> usize {
        state.next_handle += 1;
        state.next_handle
    }
}

impl Egl for MockEgl {
    fn get_default_display(&self) -> Option<DisplayHandle> {
        if self.state.lock().no_display {
            None
        } else {
            Some(DISPLAY)
        }
    }

    fn initialize(&self, _: DisplayHandle) -> Result<(EGLint, EGLint), WindowingApiError> {
        if self.state.lock().fail_initialize {
            return Err(WindowingApiError::NotInitialized);
        }
        Ok((1, 4))
    }

    fn terminate(&self, _: DisplayHandle) -> Result<(), WindowingApiError> {
        self.state.lock().terminations += 1;
        Ok(())
    }

    fn config_count(&self, _: DisplayHandle, attributes: &[EGLint])
                    -> Result<usize, WindowingApiError> {
        let mut state = self.state.lock();
        state.last_config_attributes = attributes.to_vec();
        Ok(state.configs.iter().filter(|config| MockEgl::matches(config, attributes)).count())
    }

    fn choose_config(&self, _: DisplayHandle, attributes: &[EGLint], max_configs: usize)
                     -> Result<Vec<ConfigHandle>, WindowingApiError> {
        let state = self.state.lock();
        Ok(state.configs
                .iter()
                .filter(|config| MockEgl::matches(config, attributes))
                .take(max_configs)
                .map(|config| config.handle)
                .collect())
    }

    fn get_config_attrib(&self, _: DisplayHandle, handle: ConfigHandle, attribute: EGLint)
                         -> Option<EGLint> {
        let state = self.state.lock();
        let config = state.configs.iter().find(|config| config.handle == handle)?;
        let sizes = config.sizes;
        match attribute {
            egl::RED_SIZE => Some(sizes.red),
            egl::GREEN_SIZE => Some(sizes.green),
            egl::BLUE_SIZE => Some(sizes.blue),
            egl::ALPHA_SIZE => Some(sizes.alpha),
            egl::DEPTH_SIZE => Some(sizes.depth),
            egl::STENCIL_SIZE => Some(sizes.stencil),
            egl::CONFIG_ID => Some(handle.0 as EGLint),
            _ => None,
        }
    }

    fn create_context(&self, _: DisplayHandle, _: ConfigHandle, attributes: &[EGLint])
                      -> Result<ContextHandle, WindowingApiError> {
        let mut state = self.state.lock();
        state.context_attempts += 1;
        if let Some(err) = state.fail_create_context {
            return Err(err);
        }

        let (mut major, mut minor) = (1, 0);
        for pair in attributes.chunks(2) {
            match *pair {
                [egl::CONTEXT_CLIENT_VERSION, value] => major = value,
                [egl::CONTEXT_MINOR_VERSION_KHR, value] => {
                    if !state.supports_minor_version {
                        return Err(WindowingApiError::BadAttribute);
                    }
                    minor = value;
                }
                _ => {}
            }
        }

        let version = state.actual_version.unwrap_or(GLVersion::new(major as u8, minor as u8));
        let context = ContextHandle(MockEgl::next_handle(&mut state));
        state.contexts.insert(context, version);
        state.contexts_created += 1;
        state.max_live_contexts = state.max_live_contexts.max(state.contexts.len());
        Ok(context)
    }

    fn destroy_context(&self, _: DisplayHandle, context: ContextHandle)
                       -> Result<(), WindowingApiError> {
        match self.state.lock().contexts.remove(&context) {
            Some(_) => Ok(()),
            None => Err(WindowingApiError::BadContext),
        }
    }

    fn query_context(&self, _: DisplayHandle, context: ContextHandle, attribute: EGLint)
                     -> Result<EGLint, WindowingApiError> {
        let state = self.state.lock();
        let version = *state.contexts.get(&context).ok_or(WindowingApiError::BadContext)?;
        match attribute {
            egl::CONTEXT_MAJOR_VERSION_KHR => Ok(version.major as EGLint),
            egl::CONTEXT_MINOR_VERSION_KHR if state.supports_minor_version => {
                Ok(version.minor as EGLint)
            }
            _ => Err(WindowingApiError::BadAttribute),
        }
    }

    fn create_window_surface(&self,
                             _: DisplayHandle,
                             _: ConfigHandle,
                             native_widget: &NativeWidget,
                             _: &[EGLint])
                             -> Result<SurfaceHandle, WindowingApiError> {
        let mut state = self.state.lock();
        if state.fail_window_surface || native_widget.native_window().is_null() {
            return Err(WindowingApiError::BadNativeWindow);
        }
        let surface = SurfaceHandle(MockEgl::next_handle(&mut state));
        state.surfaces.insert(surface);
        state.surfaces_created += 1;
        Ok(surface)
    }

    fn destroy_surface(&self, _: DisplayHandle, surface: SurfaceHandle)
                       -> Result<(), WindowingApiError> {
        if self.state.lock().surfaces.remove(&surface) {
            Ok(())
        } else {
            Err(WindowingApiError::BadSurface)
        }
    }

    fn make_current(&self,
                    _: DisplayHandle,
                    draw: Option<SurfaceHandle>,
                    _: Option<SurfaceHandle>,
                    context: Option<ContextHandle>)
                    -> Result<(), WindowingApiError> {
        let state = self.state.lock();
        if let Some(draw) = draw {
            if !state.surfaces.contains(&draw) {
                return Err(WindowingApiError::BadSurface);
            }
        }
        if let Some(context) = context {
            if !state.contexts.contains_key(&context) {
                return Err(WindowingApiError::BadContext);
            }
        }
        Ok(())
    }

    fn swap_buffers(&self, _: DisplayHandle, surface: SurfaceHandle)
                    -> Result<(), WindowingApiError> {
        let mut state = self.state.lock();
        if !state.surfaces.contains(&surface) {
            return Err(WindowingApiError::BadSurface);
        }
        if state.lose_context_on_next_swap {
            state.lose_context_on_next_swap = false;
            if let Some(ref call_log) = state.call_log {
                call_log.lock().push(Call::ContextLost);
            }
            return Err(WindowingApiError::ContextLost);
        }
        if let Some(err) = state.fail_next_swap.take() {
            return Err(err);
        }
        state.swaps += 1;
        Ok(())
    }

    fn presentation_time(&self, _: DisplayHandle, _: SurfaceHandle, nanos: i64)
                         -> Result<(), WindowingApiError> {
        let thread_name = thread::current().name().map(str::to_owned);
        self.state.lock().presentation_times.push((nanos, thread_name));
        Ok(())
    }
}

struct RecordingRenderer {
    calls: CallLog,
}

impl Renderer for RecordingRenderer {
    fn on_context_created(&mut self) {
        self.calls.lock().push(Call::ContextCreated);
    }

    fn on_surface_created(&mut self) {
        self.calls.lock().push(Call::SurfaceCreated);
    }

    fn on_surface_changed(&mut self, size: Size2D<i32>) {
        self.calls.lock().push(Call::SurfaceChanged(size));
    }

    fn on_draw_frame(&mut self) {
        self.calls.lock().push(Call::DrawFrame);
    }
}

struct Harness {
    egl: Arc<MockEgl>,
    calls: CallLog,
    view: SurfaceView,
}

impl Harness {
    fn new(egl: Arc<MockEgl>, arbiter: ContextArbiter) -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();
        let view = SurfaceView::with_arbiter(egl.clone(), arbiter);
        Harness { egl, calls: Arc::new(Mutex::new(vec![])), view }
    }

    fn unrestricted() -> Harness {
        Harness::new(MockEgl::new(), ContextArbiter::new(ArbiterPolicy::Unrestricted))
    }

    fn start(&mut self) {
        let renderer = RecordingRenderer { calls: self.calls.clone() };
        self.view.set_renderer(renderer).unwrap();
    }

    fn show(&mut self, width: i32, height: i32) {
        self.view.surface_created(widget());
        self.view.surface_changed(Size2D::new(width, height));
    }

    fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|&recorded| recorded == call).count()
    }

    fn draws(&self) -> usize {
        self.count(&Call::DrawFrame)
    }
}

fn widget() -> NativeWidget {
    unsafe { NativeWidget::from_native_window(0x1000 as *mut c_void) }
}

fn wait_for<F>(mut condition: F) -> bool where F: FnMut() -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn settle() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn test_continuous_rendering_draws_repeatedly() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.draws() > 1));
    assert_eq!(harness.calls.lock()[..4],
               [Call::ContextCreated,
                Call::SurfaceCreated,
                Call::SurfaceChanged(Size2D::new(100, 100)),
                Call::DrawFrame]);
    assert_eq!(harness.count(&Call::ContextCreated), 1);
    assert!(harness.egl.state.lock().swaps > 0);
    assert_eq!(harness.view.render_mode(), Ok(RenderMode::Continuously));
    assert_eq!(harness.view.context_version(), GLVersion::GLES_2_0);
}

#[test]
fn test_on_demand_rendering_waits_for_request() {
    let mut harness = Harness::unrestricted();
    harness.view.surface_changed(Size2D::new(64, 64));
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    harness.view.surface_created(widget());

    settle();
    assert_eq!(harness.draws(), 0);
    assert_eq!(harness.egl.contexts_created(), 0);

    harness.view.request_render().unwrap();
    assert!(wait_for(|| harness.draws() == 1));
    settle();
    assert_eq!(harness.draws(), 1);
}

#[test]
fn test_request_render_draws_exactly_once() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();

    // A resize counts as a render request.
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() == 1));

    for expected in 2..5 {
        harness.view.request_render().unwrap();
        assert!(wait_for(|| harness.draws() == expected));
        settle();
        assert_eq!(harness.draws(), expected);
    }
    assert_eq!(harness.count(&Call::ContextCreated), 1);
}

#[test]
fn test_pause_and_resume_recreate_context() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    for cycle in 0..3 {
        harness.view.on_pause();
        let render_thread = harness.view.render_thread().unwrap();
        assert!(render_thread.is_paused());
        assert_eq!(harness.egl.live_contexts(), 0);
        assert_eq!(harness.egl.live_surfaces(), 0);
        assert_eq!(harness.view.context_version(), GLVersion::UNKNOWN);

        let draws = harness.draws();
        settle();
        assert_eq!(harness.draws(), draws);

        harness.view.on_resume();
        assert!(wait_for(|| harness.count(&Call::ContextCreated) == cycle + 2));
        assert!(wait_for(|| harness.draws() > draws));
    }
    assert_eq!(harness.egl.contexts_created(), 4);
}

#[test]
fn test_pause_and_resume_preserving_context() {
    let mut harness = Harness::unrestricted();
    harness.view.set_preserve_egl_context_on_pause(true);
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    harness.view.on_pause();
    assert_eq!(harness.egl.live_contexts(), 1);
    assert_eq!(harness.egl.live_surfaces(), 0);

    let draws = harness.draws();
    harness.view.on_resume();
    assert!(wait_for(|| harness.draws() > draws));
    assert_eq!(harness.count(&Call::ContextCreated), 1);
    assert_eq!(harness.count(&Call::SurfaceCreated), 1);
    assert_eq!(harness.egl.contexts_created(), 1);
    assert_eq!(harness.egl.state.lock().surfaces_created, 2);
}

#[test]
fn test_resize_while_paused_returns() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    harness.view.on_pause();
    harness.view.surface_changed(Size2D::new(200, 150));
    assert!(!harness.calls.lock().contains(&Call::SurfaceChanged(Size2D::new(200, 150))));

    harness.view.on_resume();
    assert!(wait_for(|| {
        harness.calls.lock().contains(&Call::SurfaceChanged(Size2D::new(200, 150)))
    }));
}

#[test]
fn test_resize_waits_for_frame() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() == 1));
    settle();

    // The context and surface exist now, so this blocks until a frame at the new size.
    harness.view.surface_changed(Size2D::new(300, 200));
    assert!(harness.calls.lock().contains(&Call::SurfaceChanged(Size2D::new(300, 200))));
    assert_eq!(harness.draws(), 2);
}

#[test]
fn test_queued_events_run_in_order_before_frame() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() == 1));

    for index in 0..3 {
        let calls = harness.calls.clone();
        harness.view.queue_event(move || calls.lock().push(Call::Event(index))).unwrap();
    }
    harness.view.request_render().unwrap();
    assert!(wait_for(|| harness.draws() == 2));

    let calls = harness.calls.lock();
    assert_eq!(calls[calls.len() - 4..],
               [Call::Event(0), Call::Event(1), Call::Event(2), Call::DrawFrame]);
}

#[test]
fn test_exit_from_every_state() {
    let states = ["waiting", "rendering", "paused", "awaiting surface"];
    for &state in &states {
        let mut harness = Harness::unrestricted();
        harness.start();
        if state != "waiting" {
            harness.show(100, 100);
            assert!(wait_for(|| harness.draws() > 0));
        }
        match state {
            "paused" => harness.view.on_pause(),
            "awaiting surface" => harness.view.surface_destroyed(),
            _ => {}
        }

        let render_thread = harness.view.render_thread().unwrap();
        render_thread.request_exit_and_wait().unwrap();
        assert!(render_thread.has_exited(), "state: {}", state);
        assert_eq!(harness.egl.live_contexts(), 0, "state: {}", state);
        assert_eq!(harness.egl.live_surfaces(), 0, "state: {}", state);
        assert_eq!(render_thread.fatal_error(), None);
    }
}

#[test]
fn test_exit_from_render_thread_fails() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    let Harness { egl, view, .. } = harness;
    let view = Arc::new(Mutex::new(Some(view)));
    let (sender, receiver) = mpsc::channel();
    {
        let event_view = view.clone();
        let guard = view.lock();
        guard.as_ref().unwrap().queue_event(move || {
            let guard = event_view.lock();
            let render_thread = guard.as_ref().unwrap().render_thread().unwrap();
            sender.send(render_thread.request_exit_and_wait()).unwrap();
        }).unwrap();
    }

    let result = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(result, Err(Error::CalledFromRenderThread));

    let view = view.lock().take().unwrap();
    assert!(!view.render_thread().unwrap().has_exited());
    drop(view);
    assert_eq!(egl.live_contexts(), 0);
}

#[test]
fn test_context_loss_recreates_context() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().call_log = Some(harness.calls.clone());
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 1));

    harness.egl.state.lock().lose_context_on_next_swap = true;
    assert!(wait_for(|| harness.count(&Call::ContextCreated) == 2));
    assert!(wait_for(|| {
        let calls = harness.calls.lock();
        calls.iter()
             .position(|call| *call == Call::ContextLost)
             .map_or(false, |lost| calls.len() >= lost + 5)
    }));

    let calls = harness.calls.lock();
    let lost = calls.iter().position(|call| *call == Call::ContextLost).unwrap();
    assert_eq!(calls[lost + 1..lost + 5],
               [Call::ContextCreated,
                Call::SurfaceCreated,
                Call::SurfaceChanged(Size2D::new(100, 100)),
                Call::DrawFrame]);
    drop(calls);

    assert_eq!(harness.egl.contexts_created(), 2);
    assert_eq!(harness.egl.state.lock().max_live_contexts, 1);
}

#[test]
fn test_surface_loss_and_return() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    harness.view.surface_destroyed();
    assert_eq!(harness.egl.live_surfaces(), 0);
    assert_eq!(harness.egl.live_contexts(), 1);
    let draws = harness.draws();
    settle();
    assert_eq!(harness.draws(), draws);

    harness.view.surface_created(widget());
    assert!(wait_for(|| harness.draws() > draws));
    assert_eq!(harness.count(&Call::ContextCreated), 1);
    assert_eq!(harness.egl.state.lock().surfaces_created, 2);
}

#[test]
fn test_surface_creation_failure_recovers() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().fail_window_surface = true;
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.count(&Call::ContextCreated) == 1));
    settle();
    assert_eq!(harness.draws(), 0);
    assert_eq!(harness.view.fatal_error(), None);

    harness.egl.state.lock().fail_window_surface = false;
    harness.view.surface_destroyed();
    harness.view.surface_created(widget());
    assert!(wait_for(|| harness.draws() > 0));
    assert_eq!(harness.count(&Call::ContextCreated), 1);
    assert_eq!(harness.count(&Call::SurfaceCreated), 1);
}

#[test]
fn test_swap_failure_marks_surface_bad() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    harness.egl.state.lock().fail_next_swap = Some(WindowingApiError::BadNativeWindow);
    assert!(wait_for(|| harness.egl.state.lock().fail_next_swap.is_none()));
    settle();
    let draws = harness.draws();
    settle();
    assert_eq!(harness.draws(), draws);

    harness.view.surface_destroyed();
    harness.view.surface_created(widget());
    assert!(wait_for(|| harness.draws() > draws));
    assert_eq!(harness.view.fatal_error(), None);
}

#[test]
fn test_fatal_initialization_error_ends_session() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().fail_initialize = true;
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.view.render_thread().unwrap().has_exited()));
    assert_eq!(harness.view.fatal_error(),
               Some(Error::DisplayInitializationFailed(WindowingApiError::NotInitialized)));
    assert_eq!(harness.count(&Call::ContextCreated), 0);
    assert_eq!(harness.view.arbiter().owner(), None);

    // Blocking operations return once the thread is gone.
    harness.view.on_pause();
    harness.view.on_resume();
    harness.view.surface_destroyed();
}

#[test]
fn test_context_creation_failure_is_fatal() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().fail_create_context = Some(WindowingApiError::BadMatch);
    harness.view.set_context_version(GLVersion::new(3, 1)).unwrap();
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.view.render_thread().unwrap().has_exited()));
    assert_eq!(harness.view.fatal_error(),
               Some(Error::ContextCreationFailed(WindowingApiError::BadMatch)));

    // Both the major+minor and the major-only requests were tried.
    assert_eq!(harness.egl.state.lock().context_attempts, 2);
    assert_eq!(harness.view.arbiter().owner(), None);
    assert_eq!(harness.egl.live_contexts(), 0);
    assert_eq!(harness.egl.state.lock().terminations, 1);
    assert_eq!(harness.count(&Call::ContextCreated), 0);
}

#[test]
fn test_missing_display_is_fatal() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().no_display = true;
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.view.fatal_error().is_some()));
    assert_eq!(harness.view.fatal_error(), Some(Error::NoDisplayFound));
}

#[test]
fn test_version_falls_back_to_major_only() {
    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().supports_minor_version = false;
    harness.view.set_context_version(GLVersion::GLES_3_1).unwrap();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    assert_eq!(harness.view.context_version(), GLVersion::GLES_3_0);
    assert_eq!(harness.egl.state.lock().context_attempts, 2);
}

#[test]
fn test_version_reports_what_driver_honored() {
    let mut harness = Harness::unrestricted();
    harness.view.set_context_version(GLVersion::GLES_3_1).unwrap();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));
    assert_eq!(harness.view.context_version(), GLVersion::GLES_3_1);
    assert_eq!(harness.egl.state.lock().context_attempts, 1);

    let mut harness = Harness::unrestricted();
    harness.egl.state.lock().actual_version = Some(GLVersion::new(3, 2));
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));
    assert_eq!(harness.view.context_version(), GLVersion::new(3, 2));

    harness.view.render_thread().unwrap().request_exit_and_wait().unwrap();
    assert_eq!(harness.view.context_version(), GLVersion::UNKNOWN);
}

#[test]
fn test_default_context_factory_negotiation() {
    let egl = MockEgl::new();
    egl.state.lock().supports_minor_version = false;
    let factory = DefaultContextFactory;

    let (context, version) =
        factory.create_context(&*egl, DISPLAY, ConfigHandle(2), GLVersion::GLES_3_1).unwrap();
    assert_eq!(version, GLVersion::GLES_3_0);
    factory.destroy_context(&*egl, DISPLAY, context).unwrap();

    let (context, version) =
        factory.create_context(&*egl, DISPLAY, ConfigHandle(2), GLVersion::GLES_2_0).unwrap();
    assert_eq!(version, GLVersion::GLES_2_0);
    assert_eq!(egl.state.lock().context_attempts, 3);
    factory.destroy_context(&*egl, DISPLAY, context).unwrap();
    assert_eq!(factory.destroy_context(&*egl, DISPLAY, context),
               Err(WindowingApiError::BadContext));
}

#[test]
fn test_component_size_chooser() {
    let egl = MockEgl::new();

    let chooser = ComponentSizeChooser::default();
    assert_eq!(chooser.choose_config(&*egl, DISPLAY, GLVersion::GLES_2_0),
               Ok(ConfigHandle(2)));
    let attributes = egl.state.lock().last_config_attributes.clone();
    assert_eq!(attributes[attributes.len() - 3..],
               [egl::RENDERABLE_TYPE, egl::OPENGL_ES2_BIT, egl::NONE]);

    let chooser = ComponentSizeChooser::new(ComponentSizes {
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
        depth: 16,
        stencil: 8,
    });
    assert_eq!(chooser.choose_config(&*egl, DISPLAY, GLVersion::GLES_3_0),
               Ok(ConfigHandle(1)));
    let attributes = egl.state.lock().last_config_attributes.clone();
    assert!(attributes.windows(2)
                      .any(|pair| pair == [egl::RENDERABLE_TYPE, egl::OPENGL_ES3_BIT_KHR]));

    let chooser = ComponentSizeChooser::new(ComponentSizes {
        red: 5,
        green: 6,
        blue: 5,
        alpha: 0,
        depth: 0,
        stencil: 0,
    });
    assert_eq!(chooser.choose_config(&*egl, DISPLAY, GLVersion::GLES_2_0),
               Ok(ConfigHandle(3)));

    let chooser = ComponentSizeChooser::new(ComponentSizes {
        red: 10,
        green: 10,
        blue: 10,
        alpha: 2,
        depth: 0,
        stencil: 0,
    });
    assert_eq!(chooser.choose_config(&*egl, DISPLAY, GLVersion::GLES_2_0),
               Err(Error::NoPixelFormatFound));

    // Counted configs whose channels aren't an exact match are rejected in the second pass.
    let chooser = ComponentSizeChooser::new(ComponentSizes {
        red: 6,
        green: 6,
        blue: 6,
        alpha: 0,
        depth: 0,
        stencil: 0,
    });
    assert_eq!(chooser.choose_config(&*egl, DISPLAY, GLVersion::GLES_2_0),
               Err(Error::NoPixelFormatFound));
}

#[test]
fn test_no_matching_config_is_fatal() {
    let mut harness = Harness::unrestricted();
    harness.view.set_config_chooser_sizes(ComponentSizes {
        red: 16,
        green: 16,
        blue: 16,
        alpha: 16,
        depth: 0,
        stencil: 0,
    }).unwrap();
    harness.start();
    harness.show(100, 100);

    assert!(wait_for(|| harness.view.fatal_error().is_some()));
    assert_eq!(harness.view.fatal_error(), Some(Error::NoPixelFormatFound));
    assert_eq!(harness.egl.live_contexts(), 0);
}

#[test]
fn test_exclusive_arbiter_hands_off_context() {
    let egl = MockEgl::new();
    let arbiter = ContextArbiter::new(ArbiterPolicy::Exclusive);
    let mut first = Harness::new(egl.clone(), arbiter.clone());
    let mut second = Harness::new(egl.clone(), arbiter.clone());
    first.start();
    second.start();
    first.show(100, 100);
    second.show(80, 60);

    assert!(wait_for(|| first.draws() >= 3 && second.draws() >= 3));
    assert_eq!(egl.state.lock().max_live_contexts, 1);
    assert_eq!(arbiter.session_count(), 2);

    drop(first);
    drop(second);
    assert_eq!(egl.live_contexts(), 0);
    assert_eq!(arbiter.owner(), None);
    assert_eq!(arbiter.session_count(), 0);
}

#[test]
#[serial]
fn test_global_arbiter_grants_every_session() {
    let egl = MockEgl::new();
    let _ = env_logger::builder().is_test(true).try_init();
    let calls: CallLog = Arc::new(Mutex::new(vec![]));

    let mut views = vec![];
    for _ in 0..2 {
        let mut view = SurfaceView::new(egl.clone());
        assert_eq!(view.arbiter().policy(), ArbiterPolicy::Unrestricted);
        view.set_renderer(RecordingRenderer { calls: calls.clone() }).unwrap();
        view.surface_created(widget());
        view.surface_changed(Size2D::new(100, 100));
        views.push(view);
    }

    assert!(wait_for(|| egl.live_contexts() == 2));
    assert_eq!(ContextArbiter::global().session_count(), 2);
    let owner = ContextArbiter::global().owner();
    assert!(owner.is_some());
    assert!(views.iter().any(|view| view.render_thread().map(|thread| thread.id()) == owner));

    drop(views);
    assert_eq!(egl.live_contexts(), 0);
    assert_eq!(ContextArbiter::global().owner(), None);
    assert_eq!(ContextArbiter::global().session_count(), 0);
}

#[test]
fn test_release_context_on_request() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    harness.view.render_thread().unwrap().request_release_context();
    assert!(wait_for(|| harness.count(&Call::ContextCreated) == 2));

    // Continuous rendering picks up again on a fresh context without another wake-up.
    let draws = harness.draws();
    assert!(wait_for(|| harness.draws() > draws + 10));
    assert_eq!(harness.egl.contexts_created(), 2);
    assert_eq!(harness.egl.state.lock().max_live_contexts, 1);
    assert_eq!(harness.egl.live_contexts(), 1);
}

#[test]
fn test_exclusive_arbiter_serves_on_demand_requests() {
    let egl = MockEgl::new();
    let arbiter = ContextArbiter::new(ArbiterPolicy::Exclusive);
    let mut first = Harness::new(egl.clone(), arbiter.clone());
    let mut second = Harness::new(egl.clone(), arbiter.clone());
    first.start();
    second.start();
    first.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    second.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    let first_id = first.view.render_thread().unwrap().id();
    let second_id = second.view.render_thread().unwrap().id();

    first.show(100, 100);
    assert!(wait_for(|| first.draws() == 1));
    second.show(80, 60);
    assert!(wait_for(|| second.draws() == 1));
    assert!(wait_for(|| arbiter.owner() == Some(second_id)));

    // The idle owner gives the context back for each request.
    first.view.request_render().unwrap();
    assert!(wait_for(|| first.draws() == 2));
    assert!(wait_for(|| arbiter.owner() == Some(first_id)));
    second.view.request_render().unwrap();
    assert!(wait_for(|| second.draws() == 2));
    first.view.request_render().unwrap();
    assert!(wait_for(|| first.draws() == 3));

    settle();
    assert_eq!(first.draws(), 3);
    assert_eq!(second.draws(), 2);
    assert_eq!(egl.state.lock().max_live_contexts, 1);
    assert_eq!(arbiter.owner(), Some(first_id));
}

#[test]
fn test_presentation_time_applied_on_render_thread() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() == 1));

    harness.view.set_presentation_time(16_666_667).unwrap();
    harness.view.request_render().unwrap();
    assert!(wait_for(|| harness.draws() == 2));
    assert!(wait_for(|| !harness.egl.state.lock().presentation_times.is_empty()));

    let presentation_times = harness.egl.state.lock().presentation_times.clone();
    assert_eq!(presentation_times.len(), 1);
    let (nanos, ref thread_name) = presentation_times[0];
    assert_eq!(nanos, 16_666_667);
    assert!(thread_name.as_ref().unwrap().starts_with("GLThread"));
}

#[test]
fn test_detach_and_reattach_keep_render_mode() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.view.set_render_mode(RenderMode::WhenDirty).unwrap();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() == 1));

    harness.view.on_detached_from_window().unwrap();
    assert!(harness.view.render_thread().unwrap().has_exited());
    assert_eq!(harness.egl.live_contexts(), 0);

    harness.view.on_attached_to_window().unwrap();
    let render_thread = harness.view.render_thread().unwrap();
    assert!(!render_thread.has_exited());
    assert_eq!(render_thread.render_mode(), RenderMode::WhenDirty);
    assert_eq!(harness.view.arbiter().session_count(), 1);

    harness.view.request_render().unwrap();
    assert!(wait_for(|| harness.draws() == 2));
    assert_eq!(harness.count(&Call::ContextCreated), 2);
}

#[test]
fn test_drop_exits_render_thread() {
    let mut harness = Harness::unrestricted();
    harness.start();
    harness.show(100, 100);
    assert!(wait_for(|| harness.draws() > 0));

    let arbiter = harness.view.arbiter().clone();
    assert_eq!(arbiter.session_count(), 1);
    let Harness { egl, view, .. } = harness;
    drop(view);
    assert_eq!(arbiter.session_count(), 0);
    assert_eq!(egl.live_contexts(), 0);
    assert_eq!(egl.live_surfaces(), 0);
}

#[test]
fn test_programmer_errors() {
    assert_eq!(RenderMode::try_from(0), Ok(RenderMode::WhenDirty));
    assert_eq!(RenderMode::try_from(1), Ok(RenderMode::Continuously));
    assert_eq!(RenderMode::try_from(2), Err(Error::InvalidRenderMode(2)));
    assert_eq!(RenderMode::try_from(-1), Err(Error::InvalidRenderMode(-1)));

    let mut harness = Harness::unrestricted();
    assert_eq!(harness.view.request_render(), Err(Error::NoRenderer));
    assert_eq!(harness.view.set_render_mode(RenderMode::WhenDirty), Err(Error::NoRenderer));
    assert_eq!(harness.view.queue_event(|| {}), Err(Error::NoRenderer));

    harness.start();
    let renderer = RecordingRenderer { calls: harness.calls.clone() };
    assert_eq!(harness.view.set_renderer(renderer), Err(Error::RendererAlreadySet));
    assert_eq!(harness.view.set_config_chooser_with_depth(false),
               Err(Error::RendererAlreadySet));
    assert_eq!(harness.view.set_context_version(GLVersion::GLES_3_0),
               Err(Error::RendererAlreadySet));
}

#[test]
fn test_gl_version() {
    assert_eq!(GLVersion::default(), GLVersion::GLES_2_0);
    assert_eq!(GLVersion::recognized(2, 1), GLVersion::GLES_2_0);
    assert_eq!(GLVersion::recognized(3, 0), GLVersion::GLES_3_0);
    assert_eq!(GLVersion::recognized(3, 1), GLVersion::GLES_3_1);
    assert_eq!(GLVersion::recognized(3, 2), GLVersion::UNKNOWN);
    assert_eq!(GLVersion::recognized(1, 1), GLVersion::UNKNOWN);
    assert_eq!(GLVersion::GLES_3_1.to_string(), "3.1");
    assert_eq!(GLVersion::UNKNOWN.to_string(), "Unknown");
    assert!(GLVersion::GLES_2_0 < GLVersion::GLES_3_0);
}

#[test]
fn test_extension_list_contains() {
    let extensions = "GL_OES_EGL_image GL_EXT_texture_format_BGRA8888 GL_OES_depth24";
    assert!(gl_utils::extension_list_contains(extensions, "GL_OES_depth24"));
    assert!(gl_utils::extension_list_contains(extensions, "gl_ext_texture_format_bgra8888"));
    assert!(!gl_utils::extension_list_contains(extensions, "GL_OES_vertex_array_object"));
    assert!(!gl_utils::extension_list_contains(extensions, ""));
}

#[test]
fn test_error_classification() {
    assert!(Error::SurfaceCreationFailed(WindowingApiError::BadNativeWindow).is_surface_level());
    assert!(Error::NoWidgetAttached.is_surface_level());
    assert!(!Error::ContextCreationFailed(WindowingApiError::BadMatch).is_surface_level());
    assert!(!Error::NoDisplayFound.is_surface_level());
}
