//! iOS game view
//!
//! [`GameView`] adapts a native view to the [`GameWindow`] interface. It owns
//! the EAGL-style context, the framebuffer/renderbuffer pair backed by the
//! view's compositor layer, and the repeating timer that drives the frame
//! loop.
//!
//! # Lifecycle
//!
//! ```text
//! new ─► configure ─► run ─► (tick: UpdateFrame, RenderFrame)* ─► stop ─► dispose
//!                      ▲                                          │
//!                      └──────────────────────────────────────────┘
//! ```
//!
//! `run` creates the framebuffer and fires `Load`; `stop` cancels the timer,
//! tears the framebuffer down and fires `Unload`; `dispose` releases whatever
//! is left and fires `Disposed` once.
//!
//! # Threading
//!
//! A `GameView` is `!Send`: the view, its context and its timer all belong to
//! the main thread. Handles are cheap clones of one shared view. The timer
//! only holds a weak handle, so dropping every `GameView` handle tears the view
//! down even while it is running.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use gameview_platform::{
    EventDispatcher, EventHandler, EventKind, FrameEventArgs, GameViewError, GameWindow,
    GameWindowEvent, Point, Result, Size, SubscriptionId, WindowBorder, WindowInfo, WindowState,
};
use tracing::{debug, info, trace, warn};

use crate::config::{
    frame_interval, ColorFormat, DrawableProperties, GameViewConfig, RenderingApi,
    DEFAULT_UPDATES_PER_SECOND,
};
use crate::gl::{GLuint, GlCalls, COLOR_ATTACHMENT0, FRAMEBUFFER, RENDERBUFFER, RENDERBUFFER_BINDING};
use crate::native::{Backend, ContextId, GraphicsContext, NativeView, RepeatingTimer, ViewController};

/// Hook run on the native view before its context is created
pub type LayerConfigurator<V> = Rc<dyn Fn(&V)>;

/// Context plus the render targets that only exist alongside it
struct Graphics<C> {
    context: C,
    gl: GlCalls,
    framebuffer: GLuint,
    renderbuffer: GLuint,
}

struct ViewState<B: Backend> {
    disposed: bool,
    rendering_api: RenderingApi,
    retained_backing: bool,
    color_format: Option<ColorFormat>,
    auto_resize: bool,
    updates_per_second: Option<f64>,
    graphics: Option<Graphics<B::Context>>,
    size: Size,
    timer: Option<B::Timer>,
    prev_update: Option<Instant>,
    prev_render: Option<Instant>,
}

impl<B: Backend> ViewState<B> {
    fn ensure_alive(&self) -> Result<()> {
        if self.disposed {
            Err(GameViewError::Disposed)
        } else {
            Ok(())
        }
    }

    fn graphics(&self) -> Result<&Graphics<B::Context>> {
        self.graphics.as_ref().ok_or_else(|| {
            GameViewError::invalid_state(
                "operation requires a graphics context, which hasn't been created yet",
            )
        })
    }

    fn ensure_no_context(&self, property: &str) -> Result<()> {
        if self.graphics.is_some() {
            return Err(GameViewError::invalid_state(format!(
                "can't change {property} after the graphics context is created"
            )));
        }
        Ok(())
    }
}

struct Shared<B: Backend> {
    backend: B,
    view: B::View,
    state: RefCell<ViewState<B>>,
    events: EventDispatcher,
    layer_configurator: RefCell<Option<LayerConfigurator<B::View>>>,
}

impl<B: Backend> Shared<B> {
    /// Delete the render targets and release the context
    ///
    /// The context is made current for the deletes if it isn't already. The
    /// previously current context is restored afterwards unless it was ours,
    /// in which case no context is left current.
    fn release_graphics(&self, graphics: Graphics<B::Context>) {
        let Graphics {
            context,
            gl,
            framebuffer,
            renderbuffer,
        } = graphics;

        let previous = self.backend.current_context();
        let ours_was_current = previous.as_ref().map(|c| c.id()) == Some(context.id());
        if !ours_was_current {
            if let Err(err) = self.backend.set_current_context(Some(&context)) {
                warn!("Failed to make context current for teardown: {}", err);
            }
        }

        (gl.delete_framebuffer)(framebuffer);
        (gl.delete_renderbuffer)(renderbuffer);

        let restore = if ours_was_current {
            None
        } else {
            previous.as_ref()
        };
        if let Err(err) = self.backend.set_current_context(restore) {
            warn!("Failed to restore previous context: {}", err);
        }
        drop(previous);

        self.backend.release_context(context);
        debug!(framebuffer, renderbuffer, "Framebuffer destroyed");
    }
}

impl<B: Backend> Drop for Shared<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.disposed {
            return;
        }
        let timer = state.timer.take();
        let graphics = state.graphics.take();

        if let Some(timer) = timer {
            timer.invalidate();
        }
        if let Some(graphics) = graphics {
            debug!("Game view dropped without dispose - releasing graphics");
            self.release_graphics(graphics);
        }
    }
}

/// iOS game view adapter
///
/// See the [module documentation](self) for the lifecycle.
pub struct GameView<B: Backend> {
    shared: Rc<Shared<B>>,
}

/// Weak handle to a [`GameView`], for native callbacks
pub struct WeakGameView<B: Backend> {
    shared: Weak<Shared<B>>,
}

impl<B: Backend> WeakGameView<B> {
    /// Get a strong handle if the view is still alive
    pub fn upgrade(&self) -> Option<GameView<B>> {
        self.shared.upgrade().map(|shared| GameView { shared })
    }
}

impl<B: Backend> Clone for WeakGameView<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<B: Backend> Clone for GameView<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<B: Backend> GameView<B> {
    /// Create a game view with the default configuration
    pub fn new(backend: B, view: B::View) -> Self {
        Self::with_config(backend, view, GameViewConfig::default())
    }

    /// Create a game view with the given configuration
    pub fn with_config(backend: B, view: B::View, config: GameViewConfig) -> Self {
        let state = ViewState {
            disposed: false,
            rendering_api: config.rendering_api,
            retained_backing: config.layer_retains_backing,
            color_format: config.layer_color_format,
            auto_resize: config.auto_resize,
            updates_per_second: config.updates_per_second,
            graphics: None,
            size: Size::default(),
            timer: None,
            prev_update: None,
            prev_render: None,
        };

        Self {
            shared: Rc::new(Shared {
                backend,
                view,
                state: RefCell::new(state),
                events: EventDispatcher::new(),
                layer_configurator: RefCell::new(None),
            }),
        }
    }

    /// Weak handle for callbacks that must not keep the view alive
    pub fn downgrade(&self) -> WeakGameView<B> {
        WeakGameView {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// The native view
    pub fn native_view(&self) -> &B::View {
        &self.shared.view
    }

    /// The platform backend
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    fn state(&self) -> Ref<'_, ViewState<B>> {
        self.shared.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, ViewState<B>> {
        self.shared.state.borrow_mut()
    }

    fn emit(&self, event: GameWindowEvent) {
        self.shared.events.emit(&event);
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// OpenGL ES version used for the next context
    pub fn rendering_api(&self) -> Result<RenderingApi> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.rendering_api)
    }

    /// Choose the OpenGL ES version. Fails once a context exists.
    pub fn set_rendering_api(&self, api: RenderingApi) -> Result<()> {
        let mut state = self.state_mut();
        state.ensure_alive()?;
        state.ensure_no_context("the rendering API")?;
        state.rendering_api = api;
        Ok(())
    }

    /// Whether the layer retains its contents after presentation
    pub fn layer_retains_backing(&self) -> Result<bool> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.retained_backing)
    }

    /// Choose retained backing. Fails once a context exists.
    pub fn set_layer_retains_backing(&self, retained: bool) -> Result<()> {
        let mut state = self.state_mut();
        state.ensure_alive()?;
        state.ensure_no_context("layer retained backing")?;
        state.retained_backing = retained;
        Ok(())
    }

    /// Layer pixel format, if set
    pub fn layer_color_format(&self) -> Result<Option<ColorFormat>> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.color_format)
    }

    /// Choose the layer pixel format. Fails once a context exists.
    pub fn set_layer_color_format(&self, format: ColorFormat) -> Result<()> {
        let mut state = self.state_mut();
        state.ensure_alive()?;
        state.ensure_no_context("the layer color format")?;
        state.color_format = Some(format);
        Ok(())
    }

    /// Whether layout changes recreate the framebuffer
    pub fn auto_resize(&self) -> Result<bool> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.auto_resize)
    }

    /// Enable or disable framebuffer recreation on layout changes
    pub fn set_auto_resize(&self, auto_resize: bool) -> Result<()> {
        let mut state = self.state_mut();
        state.ensure_alive()?;
        state.auto_resize = auto_resize;
        Ok(())
    }

    /// Install a hook that sees the native view after its drawable properties
    /// are written and before the context is created
    pub fn set_layer_configurator(&self, configure: impl Fn(&B::View) + 'static) -> Result<()> {
        self.state().ensure_alive()?;
        *self.shared.layer_configurator.borrow_mut() = Some(Rc::new(configure));
        Ok(())
    }

    // ========================================================================
    // Graphics resources
    // ========================================================================

    /// Current framebuffer name, 0 when there is none
    pub fn framebuffer(&self) -> Result<GLuint> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.graphics.as_ref().map_or(0, |g| g.framebuffer))
    }

    /// Current renderbuffer name, 0 when there is none
    pub fn renderbuffer(&self) -> Result<GLuint> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.graphics.as_ref().map_or(0, |g| g.renderbuffer))
    }

    /// Identity of the graphics context, if one exists
    pub fn context_id(&self) -> Result<Option<ContextId>> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.graphics.as_ref().map(|g| g.context.id()))
    }

    /// Whether a graphics context exists
    pub fn has_context(&self) -> Result<bool> {
        Ok(self.context_id()?.is_some())
    }

    /// Whether the frame loop timer is scheduled
    pub fn is_running(&self) -> Result<bool> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.timer.is_some())
    }

    /// Create the context and the layer-backed framebuffer
    ///
    /// Requires a color format. If the compositor refuses to back the
    /// renderbuffer, everything created so far is released before the error
    /// is returned.
    pub fn create_frame_buffer(&self) -> Result<()> {
        let (api, properties) = {
            let state = self.state();
            state.ensure_alive()?;
            let color_format = state.color_format.ok_or_else(|| {
                GameViewError::configuration(
                    "set the layer color format before creating the framebuffer",
                )
            })?;
            if state.graphics.is_some() {
                return Err(GameViewError::invalid_state("framebuffer already exists"));
            }
            (
                state.rendering_api,
                DrawableProperties {
                    retained_backing: state.retained_backing,
                    color_format,
                },
            )
        };

        let shared = &*self.shared;
        shared.view.set_drawable_properties(&properties);
        let configurator = shared.layer_configurator.borrow().clone();
        if let Some(configure) = configurator {
            configure(&shared.view);
        }

        let previous = shared.backend.current_context();
        let context = shared.backend.create_context(api)?;
        if let Err(err) = shared.backend.set_current_context(Some(&context)) {
            shared.backend.release_context(context);
            return Err(err);
        }
        let gl = shared.backend.gl_calls(api);

        let old_renderbuffer = (gl.get_integer)(RENDERBUFFER_BINDING) as GLuint;

        let renderbuffer = (gl.gen_renderbuffer)();
        (gl.bind_renderbuffer)(RENDERBUFFER, renderbuffer);

        if !shared
            .backend
            .renderbuffer_storage(&context, RENDERBUFFER, &shared.view)
        {
            warn!(?api, "Compositor refused renderbuffer storage");
            (gl.delete_renderbuffer)(renderbuffer);
            (gl.bind_renderbuffer)(RENDERBUFFER, old_renderbuffer);
            if let Err(err) = shared.backend.set_current_context(previous.as_ref()) {
                warn!("Failed to restore previous context: {}", err);
            }
            drop(previous);
            shared.backend.release_context(context);
            return Err(GameViewError::platform(
                "renderbuffer storage could not be allocated from the layer",
            ));
        }

        let framebuffer = (gl.gen_framebuffer)();
        (gl.bind_framebuffer)(FRAMEBUFFER, framebuffer);
        (gl.framebuffer_renderbuffer)(FRAMEBUFFER, COLOR_ATTACHMENT0, RENDERBUFFER, renderbuffer);

        let (width, height) = shared.view.layer_bounds();
        let new_size = Size::round(width, height);
        (gl.viewport)(0, 0, new_size.width, new_size.height);
        (gl.scissor)(0, 0, new_size.width, new_size.height);

        debug!(
            api = ?gl.api,
            framebuffer,
            renderbuffer,
            width = new_size.width,
            height = new_size.height,
            "Framebuffer created"
        );
        self.state_mut().graphics = Some(Graphics {
            context,
            gl,
            framebuffer,
            renderbuffer,
        });

        self.set_size(new_size)
    }

    /// Delete the framebuffer pair and release the context
    pub fn destroy_frame_buffer(&self) -> Result<()> {
        let graphics = {
            let mut state = self.state_mut();
            state.ensure_alive()?;
            state.graphics()?;
            state.graphics.take()
        };
        if let Some(graphics) = graphics {
            self.shared.release_graphics(graphics);
        }
        Ok(())
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// Run at the configured rate, or the default when none is configured
    pub fn run_configured(&self) -> Result<()> {
        let rate = {
            let state = self.state();
            state.ensure_alive()?;
            state.updates_per_second.unwrap_or(DEFAULT_UPDATES_PER_SECOND)
        };
        self.run_at(rate)
    }

    /// One timer tick: `UpdateFrame`, rebind the framebuffer, `RenderFrame`
    ///
    /// Each delta is the time since the previous notification of the same
    /// kind, and 0 on the first tick after `run`.
    pub fn run_iteration(&self) -> Result<()> {
        let now = self.shared.backend.now();
        let update_time = {
            let mut state = self.state_mut();
            state.ensure_alive()?;
            state.graphics()?;
            frame_delta(&mut state.prev_update, now)
        };
        trace!(update_time, "Update frame");
        self.emit(GameWindowEvent::UpdateFrame(FrameEventArgs::new(update_time)));

        {
            let state = self.state();
            let graphics = match (state.disposed, state.graphics.as_ref()) {
                (false, Some(graphics)) => graphics,
                _ => {
                    debug!("View stopped during update - skipping render");
                    return Ok(());
                }
            };
            (graphics.gl.bind_framebuffer)(FRAMEBUFFER, graphics.framebuffer);
        }

        let now = self.shared.backend.now();
        let render_time = frame_delta(&mut self.state_mut().prev_render, now);
        trace!(render_time, "Render frame");
        self.emit(GameWindowEvent::RenderFrame(FrameEventArgs::new(render_time)));
        Ok(())
    }

    // ========================================================================
    // Native view callbacks
    // ========================================================================

    /// Layout changed: recreate the framebuffer if the layer was resized
    pub fn layout_subviews(&self) -> Result<()> {
        let size = {
            let state = self.state();
            if state.disposed || state.graphics.is_none() || !state.auto_resize {
                return Ok(());
            }
            state.size
        };

        let (width, height) = self.shared.view.layer_bounds();
        let bounds = Size::round(width, height);
        if bounds == size {
            return Ok(());
        }

        debug!(
            from = ?size,
            to = ?bounds,
            "Layer bounds changed - recreating framebuffer"
        );
        self.destroy_frame_buffer()?;
        self.create_frame_buffer()
    }

    /// The view is moving to a window, or leaving its window
    pub fn will_move_to_window(&self, has_window: bool) -> Result<()> {
        let running = {
            let state = self.state();
            !state.disposed && state.timer.is_some()
        };
        if running && !has_window {
            self.stop()?;
        }
        Ok(())
    }

    fn controller(&self) -> Option<<B::View as NativeView>::Controller> {
        self.shared.view.view_controller()
    }
}

/// Seconds since `previous`, recording `now` as the new previous
fn frame_delta(previous: &mut Option<Instant>, now: Instant) -> f64 {
    let delta = previous.map_or(0.0, |prev| {
        now.saturating_duration_since(prev).as_secs_f64()
    });
    *previous = Some(now);
    delta
}

impl<B: Backend> GameWindow for GameView<B> {
    fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    fn run(&self) -> Result<()> {
        self.run_at(DEFAULT_UPDATES_PER_SECOND)
    }

    fn run_at(&self, updates_per_second: f64) -> Result<()> {
        self.check_disposed()?;
        let interval = frame_interval(updates_per_second)?;

        let has_context = {
            let state = self.state();
            if state.timer.is_some() {
                debug!("Game view already running");
                return Ok(());
            }
            state.graphics.is_some()
        };
        if !has_context {
            self.create_frame_buffer()?;
        }

        {
            // A Resize handler may have stopped or disposed the view
            let mut state = self.state_mut();
            state.ensure_alive()?;
            if state.graphics.is_none() {
                debug!("Game view stopped before Load");
                return Ok(());
            }
            state.prev_update = None;
            state.prev_render = None;
        }
        info!(?interval, "Game view running");
        self.emit(GameWindowEvent::Load);

        // A Load handler may have stopped, disposed or started the view
        {
            let state = self.state();
            state.ensure_alive()?;
            if state.timer.is_some() {
                return Ok(());
            }
            if state.graphics.is_none() {
                debug!("Game view stopped during Load");
                return Ok(());
            }
        }

        let weak = self.downgrade();
        let timer = self.shared.backend.schedule_repeating(
            interval,
            Box::new(move || {
                if let Some(view) = weak.upgrade() {
                    if let Err(err) = view.run_iteration() {
                        warn!("Frame tick failed: {}", err);
                    }
                }
            }),
        );
        self.state_mut().timer = Some(timer);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let (timer, graphics) = {
            let mut state = self.state_mut();
            state.ensure_alive()?;
            (state.timer.take(), state.graphics.take())
        };
        if timer.is_none() && graphics.is_none() {
            return Ok(());
        }

        if let Some(timer) = timer {
            timer.invalidate();
        }
        if let Some(graphics) = graphics {
            self.shared.release_graphics(graphics);
        }
        info!("Game view stopped");
        self.emit(GameWindowEvent::Unload);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.check_disposed()?;
        self.emit(GameWindowEvent::Closed);
        Ok(())
    }

    fn dispose(&self) {
        let (timer, graphics) = {
            let mut state = self.state_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (state.timer.take(), state.graphics.take())
        };

        if let Some(timer) = timer {
            timer.invalidate();
        }
        if let Some(graphics) = graphics {
            self.shared.release_graphics(graphics);
        }
        info!("Game view disposed");
        self.emit(GameWindowEvent::Disposed);
        // Nothing fires after Disposed; drop the handlers and what they capture
        self.shared.events.clear();
    }

    fn make_current(&self) -> Result<()> {
        let state = self.state();
        state.ensure_alive()?;
        let graphics = state.graphics()?;
        self.shared.backend.set_current_context(Some(&graphics.context))
    }

    fn swap_buffers(&self) -> Result<()> {
        let state = self.state();
        state.ensure_alive()?;
        let graphics = state.graphics()?;
        (graphics.gl.bind_renderbuffer)(RENDERBUFFER, graphics.renderbuffer);
        if !self
            .shared
            .backend
            .present_renderbuffer(&graphics.context, RENDERBUFFER)
        {
            return Err(GameViewError::platform("renderbuffer presentation failed"));
        }
        Ok(())
    }

    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Result<SubscriptionId> {
        self.check_disposed()?;
        match kind {
            EventKind::Move => Err(GameViewError::Unsupported("move events")),
            EventKind::FocusedChanged => Err(GameViewError::Unsupported("focus events")),
            EventKind::WindowBorderChanged => {
                Err(GameViewError::Unsupported("window border events"))
            }
            EventKind::KeyPress => Err(GameViewError::Unsupported("key press events")),
            _ => Ok(self.shared.events.subscribe(kind, handler)),
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.check_disposed()?;
        Ok(self.shared.events.unsubscribe(id))
    }

    fn title(&self) -> Result<String> {
        self.check_disposed()?;
        let controller = self.controller().ok_or(GameViewError::Unsupported("title"))?;
        Ok(controller.title().unwrap_or_default())
    }

    fn set_title(&self, title: &str) -> Result<()> {
        self.check_disposed()?;
        let controller = self.controller().ok_or(GameViewError::Unsupported("title"))?;
        if controller.title().as_deref() != Some(title) {
            controller.set_title(title);
            self.emit(GameWindowEvent::TitleChanged);
        }
        Ok(())
    }

    fn is_visible(&self) -> Result<bool> {
        self.check_disposed()?;
        Ok(!self.shared.view.is_hidden())
    }

    fn set_visible(&self, visible: bool) -> Result<()> {
        self.check_disposed()?;
        if self.shared.view.is_hidden() == visible {
            self.shared.view.set_hidden(!visible);
            self.emit(GameWindowEvent::VisibleChanged);
        }
        Ok(())
    }

    fn window_state(&self) -> Result<WindowState> {
        self.check_disposed()?;
        match self.controller() {
            Some(controller) if controller.wants_full_screen_layout() => {
                Ok(WindowState::Fullscreen)
            }
            _ => Ok(WindowState::Normal),
        }
    }

    fn set_window_state(&self, state: WindowState) -> Result<()> {
        self.check_disposed()?;
        if let Some(controller) = self.controller() {
            let full_screen = state == WindowState::Fullscreen;
            if controller.wants_full_screen_layout() != full_screen {
                controller.set_wants_full_screen_layout(full_screen);
                self.emit(GameWindowEvent::WindowStateChanged);
            }
        }
        Ok(())
    }

    fn window_border(&self) -> Result<WindowBorder> {
        self.check_disposed()?;
        Ok(WindowBorder::Hidden)
    }

    fn set_window_border(&self, _border: WindowBorder) -> Result<()> {
        self.check_disposed()
    }

    fn size(&self) -> Result<Size> {
        let state = self.state();
        state.ensure_alive()?;
        Ok(state.size)
    }

    fn set_size(&self, size: Size) -> Result<()> {
        {
            let mut state = self.state_mut();
            state.ensure_alive()?;
            if state.size == size {
                return Ok(());
            }
            state.size = size;
        }
        self.emit(GameWindowEvent::Resize);
        Ok(())
    }

    fn window_info(&self) -> Result<Option<WindowInfo>> {
        self.check_disposed()?;
        Ok(None)
    }

    fn point_to_client(&self, point: Point) -> Result<Point> {
        self.check_disposed()?;
        Ok(point)
    }

    fn point_to_screen(&self, point: Point) -> Result<Point> {
        self.check_disposed()?;
        Ok(point)
    }
}

impl<B: Backend> fmt::Debug for GameView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("GameView")
            .field("disposed", &state.disposed)
            .field("rendering_api", &state.rendering_api)
            .field("size", &state.size)
            .field("framebuffer", &state.graphics.as_ref().map(|g| g.framebuffer))
            .field("running", &state.timer.is_some())
            .finish()
    }
}
