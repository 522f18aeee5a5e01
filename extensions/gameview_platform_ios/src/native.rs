//! Native collaborators of the game view
//!
//! The adapter never talks to UIKit, EAGL or the run loop directly. It goes
//! through these traits, which the UIKit backend implements on iOS and the
//! test backend implements everywhere.

use std::time::{Duration, Instant};

use gameview_platform::Result;

use crate::config::{DrawableProperties, RenderingApi};
use crate::gl::{GLenum, GlCalls};

/// Identity of a graphics context, used to compare "current" against "ours"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub usize);

/// A native rendering context handle
pub trait GraphicsContext {
    /// Stable identity of the underlying native context
    fn id(&self) -> ContextId;
}

/// Owning view controller, found by walking the responder chain
pub trait ViewController {
    /// Controller title
    fn title(&self) -> Option<String>;

    /// Set the controller title
    fn set_title(&self, title: &str);

    /// Whether the controller lays out under the status bar
    fn wants_full_screen_layout(&self) -> bool;

    /// Change full-screen layout
    fn set_wants_full_screen_layout(&self, full_screen: bool);
}

/// The on-screen view whose compositor layer backs the framebuffer
pub trait NativeView {
    /// Controller type returned by [`NativeView::view_controller`]
    type Controller: ViewController;

    /// Current bounds of the compositor layer in points
    fn layer_bounds(&self) -> (f64, f64);

    /// Write retained-backing and color-format properties to the layer
    fn set_drawable_properties(&self, properties: &DrawableProperties);

    /// Whether the view is hidden
    fn is_hidden(&self) -> bool;

    /// Hide or show the view
    fn set_hidden(&self, hidden: bool);

    /// Nearest view controller in the responder chain
    fn view_controller(&self) -> Option<Self::Controller>;
}

/// A scheduled repeating callback
pub trait RepeatingTimer {
    /// Stop the timer. Its callback will not run again.
    fn invalidate(&self);
}

/// Platform services used by the game view
///
/// All methods are called from the thread that owns the view.
pub trait Backend: 'static {
    /// Native view type
    type View: NativeView;
    /// Graphics context type
    type Context: GraphicsContext;
    /// Timer type
    type Timer: RepeatingTimer;

    /// Create a context for `api`
    fn create_context(&self, api: RenderingApi) -> Result<Self::Context>;

    /// Resolve the GPU call table for `api`
    fn gl_calls(&self, api: RenderingApi) -> GlCalls;

    /// Context currently bound to this thread, if any
    fn current_context(&self) -> Option<Self::Context>;

    /// Bind `context` to this thread, or unbind with `None`
    fn set_current_context(&self, context: Option<&Self::Context>) -> Result<()>;

    /// Allocate storage for the bound renderbuffer from the view's layer
    ///
    /// Returns `false` if the compositor refuses.
    fn renderbuffer_storage(&self, context: &Self::Context, target: GLenum, view: &Self::View)
        -> bool;

    /// Present the bound renderbuffer. Returns `false` on failure.
    fn present_renderbuffer(&self, context: &Self::Context, target: GLenum) -> bool;

    /// Release a context. It is never current when released.
    fn release_context(&self, context: Self::Context);

    /// Schedule `tick` to run every `interval` on this thread's run loop
    fn schedule_repeating(&self, interval: Duration, tick: Box<dyn FnMut()>) -> Self::Timer;

    /// Monotonic clock used for frame deltas
    fn now(&self) -> Instant {
        Instant::now()
    }
}
