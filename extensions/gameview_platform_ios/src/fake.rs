//! Headless backend for exercising the game view off-device
//!
//! GPU calls are recorded in thread-local state (each test runs on its own
//! thread), the timer only fires when the test says so, and the clock only
//! moves when advanced.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use gameview_platform::{GameViewError, Result};

use crate::config::{DrawableProperties, RenderingApi};
use crate::gl::{GLenum, GLint, GLsizei, GLuint, GlCalls, RENDERBUFFER_BINDING};
use crate::native::{
    Backend, ContextId, GraphicsContext, NativeView, RepeatingTimer, ViewController,
};

// ============================================================================
// GL
// ============================================================================

/// A recorded GPU call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlCall {
    BindFramebuffer(GLenum, GLuint),
    BindRenderbuffer(GLenum, GLuint),
    DeleteFramebuffer(GLuint),
    DeleteRenderbuffer(GLuint),
    FramebufferRenderbuffer(GLenum, GLenum, GLenum, GLuint),
    GenFramebuffer(GLuint),
    GenRenderbuffer(GLuint),
    GetInteger(GLenum),
    Scissor(GLint, GLint, GLsizei, GLsizei),
    Viewport(GLint, GLint, GLsizei, GLsizei),
}

/// Recorded GPU state for the current test thread
#[derive(Debug, Default)]
pub struct FakeGl {
    pub calls: Vec<GlCall>,
    pub live_framebuffers: BTreeSet<GLuint>,
    pub live_renderbuffers: BTreeSet<GLuint>,
    pub bound_framebuffer: GLuint,
    pub bound_renderbuffer: GLuint,
    pub viewport: Option<(GLint, GLint, GLsizei, GLsizei)>,
    pub scissor: Option<(GLint, GLint, GLsizei, GLsizei)>,
    next_name: GLuint,
}

impl FakeGl {
    fn gen_name(&mut self) -> GLuint {
        self.next_name += 1;
        self.next_name
    }

    /// Number of recorded calls matching `pred`
    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

thread_local! {
    static GL: RefCell<FakeGl> = RefCell::new(FakeGl::default());
}

/// Access the recorded GPU state
pub fn with_gl<R>(f: impl FnOnce(&mut FakeGl) -> R) -> R {
    GL.with(|gl| f(&mut gl.borrow_mut()))
}

/// Call table that records into [`FakeGl`]
pub fn fake_gl_calls(api: RenderingApi) -> GlCalls {
    GlCalls {
        api,
        bind_framebuffer: |target, framebuffer| {
            with_gl(|gl| {
                gl.calls.push(GlCall::BindFramebuffer(target, framebuffer));
                gl.bound_framebuffer = framebuffer;
            })
        },
        bind_renderbuffer: |target, renderbuffer| {
            with_gl(|gl| {
                gl.calls.push(GlCall::BindRenderbuffer(target, renderbuffer));
                gl.bound_renderbuffer = renderbuffer;
            })
        },
        delete_framebuffer: |framebuffer| {
            with_gl(|gl| {
                gl.calls.push(GlCall::DeleteFramebuffer(framebuffer));
                gl.live_framebuffers.remove(&framebuffer);
                if gl.bound_framebuffer == framebuffer {
                    gl.bound_framebuffer = 0;
                }
            })
        },
        delete_renderbuffer: |renderbuffer| {
            with_gl(|gl| {
                gl.calls.push(GlCall::DeleteRenderbuffer(renderbuffer));
                gl.live_renderbuffers.remove(&renderbuffer);
                if gl.bound_renderbuffer == renderbuffer {
                    gl.bound_renderbuffer = 0;
                }
            })
        },
        framebuffer_renderbuffer: |target, attachment, renderbuffer_target, renderbuffer| {
            with_gl(|gl| {
                gl.calls.push(GlCall::FramebufferRenderbuffer(
                    target,
                    attachment,
                    renderbuffer_target,
                    renderbuffer,
                ))
            })
        },
        gen_framebuffer: || {
            with_gl(|gl| {
                let name = gl.gen_name();
                gl.calls.push(GlCall::GenFramebuffer(name));
                gl.live_framebuffers.insert(name);
                name
            })
        },
        gen_renderbuffer: || {
            with_gl(|gl| {
                let name = gl.gen_name();
                gl.calls.push(GlCall::GenRenderbuffer(name));
                gl.live_renderbuffers.insert(name);
                name
            })
        },
        get_integer: |name| {
            with_gl(|gl| {
                gl.calls.push(GlCall::GetInteger(name));
                if name == RENDERBUFFER_BINDING {
                    gl.bound_renderbuffer as GLint
                } else {
                    gl.bound_framebuffer as GLint
                }
            })
        },
        scissor: |x, y, width, height| {
            with_gl(|gl| {
                gl.calls.push(GlCall::Scissor(x, y, width, height));
                gl.scissor = Some((x, y, width, height));
            })
        },
        viewport: |x, y, width, height| {
            with_gl(|gl| {
                gl.calls.push(GlCall::Viewport(x, y, width, height));
                gl.viewport = Some((x, y, width, height));
            })
        },
    }
}

// ============================================================================
// Native view
// ============================================================================

#[derive(Debug, Default)]
struct ControllerState {
    title: RefCell<Option<String>>,
    full_screen: Cell<bool>,
}

/// View controller that stores its properties in memory
#[derive(Clone, Debug, Default)]
pub struct FakeController {
    state: Rc<ControllerState>,
}

impl ViewController for FakeController {
    fn title(&self) -> Option<String> {
        self.state.title.borrow().clone()
    }

    fn set_title(&self, title: &str) {
        *self.state.title.borrow_mut() = Some(title.to_string());
    }

    fn wants_full_screen_layout(&self) -> bool {
        self.state.full_screen.get()
    }

    fn set_wants_full_screen_layout(&self, full_screen: bool) {
        self.state.full_screen.set(full_screen);
    }
}

#[derive(Debug)]
struct ViewState {
    bounds: Cell<(f64, f64)>,
    hidden: Cell<bool>,
    controller: RefCell<Option<FakeController>>,
    drawable_properties: Cell<Option<DrawableProperties>>,
}

/// Native view with settable layer bounds
#[derive(Clone, Debug)]
pub struct FakeView {
    state: Rc<ViewState>,
}

impl FakeView {
    /// View with the given layer bounds, owned by a view controller
    pub fn new(width: f64, height: f64) -> Self {
        let view = Self::detached(width, height);
        *view.state.controller.borrow_mut() = Some(FakeController::default());
        view
    }

    /// View with no view controller in its responder chain
    pub fn detached(width: f64, height: f64) -> Self {
        Self {
            state: Rc::new(ViewState {
                bounds: Cell::new((width, height)),
                hidden: Cell::new(false),
                controller: RefCell::new(None),
                drawable_properties: Cell::new(None),
            }),
        }
    }

    /// Change the layer bounds, as a rotation or split-screen would
    pub fn set_bounds(&self, width: f64, height: f64) {
        self.state.bounds.set((width, height));
    }

    /// Properties last written by the game view
    pub fn drawable_properties(&self) -> Option<DrawableProperties> {
        self.state.drawable_properties.get()
    }

    /// The owning controller, if any
    pub fn controller(&self) -> Option<FakeController> {
        self.state.controller.borrow().clone()
    }
}

impl NativeView for FakeView {
    type Controller = FakeController;

    fn layer_bounds(&self) -> (f64, f64) {
        self.state.bounds.get()
    }

    fn set_drawable_properties(&self, properties: &DrawableProperties) {
        self.state.drawable_properties.set(Some(*properties));
    }

    fn is_hidden(&self) -> bool {
        self.state.hidden.get()
    }

    fn set_hidden(&self, hidden: bool) {
        self.state.hidden.set(hidden);
    }

    fn view_controller(&self) -> Option<FakeController> {
        self.controller()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Fake graphics context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeContext {
    id: usize,
    api: RenderingApi,
}

impl FakeContext {
    /// API the context was created for
    pub fn api(&self) -> RenderingApi {
        self.api
    }
}

impl GraphicsContext for FakeContext {
    fn id(&self) -> ContextId {
        ContextId(self.id)
    }
}

struct TimerSlot {
    interval: Duration,
    active: Cell<bool>,
    tick: RefCell<Box<dyn FnMut()>>,
}

/// Timer that only fires from [`FakeBackend::fire_timers`]
pub struct FakeTimer {
    slot: Rc<TimerSlot>,
}

impl RepeatingTimer for FakeTimer {
    fn invalidate(&self) {
        self.slot.active.set(false);
    }
}

struct BackendState {
    next_context: Cell<usize>,
    live_contexts: RefCell<BTreeSet<usize>>,
    created: RefCell<Vec<FakeContext>>,
    current: RefCell<Option<FakeContext>>,
    refuse_storage: Cell<bool>,
    refuse_context: Cell<bool>,
    refuse_present: Cell<bool>,
    storage_requests: Cell<usize>,
    presents: Cell<usize>,
    timers: RefCell<Vec<Rc<TimerSlot>>>,
    now: Cell<Instant>,
}

/// Backend with scripted failures, a manual timer, and a manual clock
#[derive(Clone)]
pub struct FakeBackend {
    state: Rc<BackendState>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Rc::new(BackendState {
                next_context: Cell::new(0),
                live_contexts: RefCell::new(BTreeSet::new()),
                created: RefCell::new(Vec::new()),
                current: RefCell::new(None),
                refuse_storage: Cell::new(false),
                refuse_context: Cell::new(false),
                refuse_present: Cell::new(false),
                storage_requests: Cell::new(0),
                presents: Cell::new(0),
                timers: RefCell::new(Vec::new()),
                now: Cell::new(Instant::now()),
            }),
        }
    }

    /// Make the compositor refuse renderbuffer storage
    pub fn refuse_storage(&self, refuse: bool) {
        self.state.refuse_storage.set(refuse);
    }

    /// Make context creation fail
    pub fn refuse_context(&self, refuse: bool) {
        self.state.refuse_context.set(refuse);
    }

    /// Make presentation fail
    pub fn refuse_present(&self, refuse: bool) {
        self.state.refuse_present.set(refuse);
    }

    /// Contexts created and not yet released
    pub fn live_contexts(&self) -> usize {
        self.state.live_contexts.borrow().len()
    }

    /// Every context ever created, in order
    pub fn created_contexts(&self) -> Vec<FakeContext> {
        self.state.created.borrow().clone()
    }

    /// Identity of the current context
    pub fn current_id(&self) -> Option<ContextId> {
        self.state.current.borrow().as_ref().map(|c| c.id())
    }

    /// Bind a context that isn't owned by any game view
    pub fn bind_foreign_context(&self) -> ContextId {
        let context = self.new_context(RenderingApi::OpenGles2);
        let id = context.id();
        *self.state.current.borrow_mut() = Some(context);
        id
    }

    /// Number of renderbuffer storage requests
    pub fn storage_requests(&self) -> usize {
        self.state.storage_requests.get()
    }

    /// Number of successful presentations
    pub fn presents(&self) -> usize {
        self.state.presents.get()
    }

    /// Timers that are still scheduled
    pub fn active_timers(&self) -> usize {
        self.state
            .timers
            .borrow()
            .iter()
            .filter(|slot| slot.active.get())
            .count()
    }

    /// Interval of the most recently scheduled timer
    pub fn last_interval(&self) -> Option<Duration> {
        self.state.timers.borrow().last().map(|slot| slot.interval)
    }

    /// Run one tick of every active timer. Returns how many fired.
    pub fn fire_timers(&self) -> usize {
        let slots: Vec<Rc<TimerSlot>> = self.state.timers.borrow().clone();
        let mut fired = 0;
        for slot in slots {
            if slot.active.get() {
                let mut tick = slot.tick.borrow_mut();
                (*tick)();
                fired += 1;
            }
        }
        fired
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.state.now.set(self.state.now.get() + by);
    }

    fn new_context(&self, api: RenderingApi) -> FakeContext {
        let id = self.state.next_context.get() + 1;
        self.state.next_context.set(id);
        self.state.live_contexts.borrow_mut().insert(id);
        let context = FakeContext { id, api };
        self.state.created.borrow_mut().push(context.clone());
        context
    }
}

impl Backend for FakeBackend {
    type View = FakeView;
    type Context = FakeContext;
    type Timer = FakeTimer;

    fn create_context(&self, api: RenderingApi) -> Result<FakeContext> {
        if self.state.refuse_context.get() {
            return Err(GameViewError::platform("context creation refused"));
        }
        Ok(self.new_context(api))
    }

    fn gl_calls(&self, api: RenderingApi) -> GlCalls {
        fake_gl_calls(api)
    }

    fn current_context(&self) -> Option<FakeContext> {
        self.state.current.borrow().clone()
    }

    fn set_current_context(&self, context: Option<&FakeContext>) -> Result<()> {
        *self.state.current.borrow_mut() = context.cloned();
        Ok(())
    }

    fn renderbuffer_storage(&self, context: &FakeContext, _target: GLenum, _view: &FakeView) -> bool {
        self.state
            .storage_requests
            .set(self.state.storage_requests.get() + 1);
        assert_eq!(
            self.current_id(),
            Some(context.id()),
            "storage requested for a context that isn't current"
        );
        !self.state.refuse_storage.get()
    }

    fn present_renderbuffer(&self, _context: &FakeContext, _target: GLenum) -> bool {
        if self.state.refuse_present.get() {
            return false;
        }
        self.state.presents.set(self.state.presents.get() + 1);
        true
    }

    fn release_context(&self, context: FakeContext) {
        assert_ne!(
            self.current_id(),
            Some(context.id()),
            "released a context that is still current"
        );
        let removed = self.state.live_contexts.borrow_mut().remove(&context.id);
        assert!(removed, "context released twice");
    }

    fn schedule_repeating(&self, interval: Duration, tick: Box<dyn FnMut()>) -> FakeTimer {
        let slot = Rc::new(TimerSlot {
            interval,
            active: Cell::new(true),
            tick: RefCell::new(tick),
        });
        self.state.timers.borrow_mut().push(Rc::clone(&slot));
        FakeTimer { slot }
    }

    fn now(&self) -> Instant {
        self.state.now.get()
    }
}
