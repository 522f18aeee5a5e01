//! UIKit backend
//!
//! [`GameUIView`] is a `UIView` subclass whose layer is a `CAEAGLLayer`. It
//! forwards `layoutSubviews` and `willMoveToWindow:` to the [`GameView`] that
//! owns it. [`UIKitBackend`] supplies the EAGL contexts, the GL call tables
//! and the NSTimer frame loop.
//!
//! # Usage
//!
//! ```ignore
//! let mtm = MainThreadMarker::new().ok_or(GameViewError::Unsupported("off main thread"))?;
//! let game = create_game_view(GameViewConfig::new(ColorFormat::Rgba8), mtm);
//! parent.addSubview(game.native_view().ui_view());
//! game.subscribe(EventKind::RenderFrame, Rc::new(|_| draw()))?;
//! game.run()?;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use gameview_platform::Result;
use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject};
use objc2::{class, define_class, msg_send, DefinedClass, MainThreadMarker, MainThreadOnly};
use objc2_core_foundation::CGRect;
use objc2_foundation::{NSObject, NSObjectProtocol, NSString};
use objc2_ui_kit::{UIResponder, UIView};
use tracing::warn;

use crate::config::{DrawableProperties, GameViewConfig, RenderingApi};
use crate::eagl::{self, EaglContext};
use crate::gl::{GLenum, GlCalls};
use crate::native::{Backend, NativeView, ViewController};
use crate::timer::NsTimer;
use crate::view::GameView;

#[derive(Default)]
struct GameUIViewIvars {
    on_layout: RefCell<Option<Box<dyn Fn()>>>,
    on_move_to_window: RefCell<Option<Box<dyn Fn(bool)>>>,
}

define_class! {
    #[unsafe(super(UIView, UIResponder, NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "GameViewUIView"]
    #[ivars = GameUIViewIvars]
    pub struct GameUIView;

    unsafe impl NSObjectProtocol for GameUIView {}

    impl GameUIView {
        #[unsafe(method(layerClass))]
        fn layer_class() -> &'static AnyClass {
            class!(CAEAGLLayer)
        }

        #[unsafe(method(layoutSubviews))]
        fn layout_subviews(&self) {
            // SAFETY: forwarding to UIView's implementation.
            unsafe {
                let _: () = msg_send![super(self), layoutSubviews];
            }
            if let Some(hook) = self.ivars().on_layout.borrow().as_ref() {
                hook();
            }
        }

        #[unsafe(method(willMoveToWindow:))]
        fn will_move_to_window(&self, window: Option<&AnyObject>) {
            // SAFETY: forwarding to UIView's implementation.
            unsafe {
                let _: () = msg_send![super(self), willMoveToWindow: window];
            }
            if let Some(hook) = self.ivars().on_move_to_window.borrow().as_ref() {
                hook(window.is_some());
            }
        }
    }
}

impl GameUIView {
    /// Create a zero-sized view backed by a `CAEAGLLayer`
    pub fn new(mtm: MainThreadMarker) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(GameUIViewIvars::default());
        // SAFETY: UIView's init forwards to initWithFrame: with a zero rect.
        unsafe { msg_send![super(this), init] }
    }

    fn set_layout_hook(&self, hook: impl Fn() + 'static) {
        *self.ivars().on_layout.borrow_mut() = Some(Box::new(hook));
    }

    fn set_move_to_window_hook(&self, hook: impl Fn(bool) + 'static) {
        *self.ivars().on_move_to_window.borrow_mut() = Some(Box::new(hook));
    }

    fn layer(&self) -> Retained<AnyObject> {
        // SAFETY: every view has a layer.
        unsafe { msg_send![self, layer] }
    }
}

/// [`NativeView`] over a [`GameUIView`]
#[derive(Clone)]
pub struct UIKitView {
    view: Retained<GameUIView>,
}

impl UIKitView {
    /// Wrap an existing view
    pub fn new(view: Retained<GameUIView>) -> Self {
        Self { view }
    }

    /// The UIKit view, for adding to a view hierarchy
    pub fn ui_view(&self) -> &UIView {
        &self.view
    }

    fn layer(&self) -> Retained<AnyObject> {
        self.view.layer()
    }
}

impl NativeView for UIKitView {
    type Controller = UIKitViewController;

    fn layer_bounds(&self) -> (f64, f64) {
        // SAFETY: CALayer bounds is a plain CGRect getter.
        let bounds: CGRect = unsafe { msg_send![&*self.layer(), bounds] };
        (bounds.size.width as f64, bounds.size.height as f64)
    }

    fn set_drawable_properties(&self, properties: &DrawableProperties) {
        eagl::set_drawable_properties(&self.layer(), properties);
    }

    fn is_hidden(&self) -> bool {
        // SAFETY: plain BOOL getter.
        unsafe { msg_send![&*self.view, isHidden] }
    }

    fn set_hidden(&self, hidden: bool) {
        // SAFETY: plain BOOL setter.
        unsafe {
            let _: () = msg_send![&*self.view, setHidden: hidden];
        }
    }

    fn view_controller(&self) -> Option<UIKitViewController> {
        // SAFETY: `nextResponder` and `isKindOfClass:` have no preconditions.
        unsafe {
            let mut next: Option<Retained<AnyObject>> = msg_send![&*self.view, nextResponder];
            while let Some(responder) = next {
                let is_controller: bool =
                    msg_send![&*responder, isKindOfClass: class!(UIViewController)];
                if is_controller {
                    return Some(UIKitViewController { raw: responder });
                }
                next = msg_send![&*responder, nextResponder];
            }
        }
        None
    }
}

impl fmt::Debug for UIKitView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIKitView")
            .field("layer_bounds", &self.layer_bounds())
            .finish()
    }
}

/// The `UIViewController` that owns a game view
pub struct UIKitViewController {
    raw: Retained<AnyObject>,
}

impl ViewController for UIKitViewController {
    fn title(&self) -> Option<String> {
        // SAFETY: `title` is a nullable NSString property.
        let title: Option<Retained<NSString>> = unsafe { msg_send![&*self.raw, title] };
        title.map(|t| t.to_string())
    }

    fn set_title(&self, title: &str) {
        let title = NSString::from_str(title);
        // SAFETY: `setTitle:` copies the string.
        unsafe {
            let _: () = msg_send![&*self.raw, setTitle: &*title];
        }
    }

    // `wantsFullScreenLayout` is gone from current UIKit. Its replacement is
    // `extendedLayoutIncludesOpaqueBars`, which also defaults to NO.
    fn wants_full_screen_layout(&self) -> bool {
        // SAFETY: BOOL getter with no arguments.
        unsafe { msg_send![&*self.raw, extendedLayoutIncludesOpaqueBars] }
    }

    fn set_wants_full_screen_layout(&self, full_screen: bool) {
        // SAFETY: BOOL setter.
        unsafe {
            let _: () = msg_send![&*self.raw, setExtendedLayoutIncludesOpaqueBars: full_screen];
        }
    }
}

/// EAGL, UIKit and NSTimer services for [`GameView`]
#[derive(Clone, Copy, Debug)]
pub struct UIKitBackend {
    mtm: MainThreadMarker,
}

impl UIKitBackend {
    /// Backend bound to the main thread; every UIKit call it makes needs `mtm`
    pub fn new(mtm: MainThreadMarker) -> Self {
        Self { mtm }
    }
}

impl Backend for UIKitBackend {
    type View = UIKitView;
    type Context = EaglContext;
    type Timer = NsTimer;

    fn create_context(&self, api: RenderingApi) -> Result<EaglContext> {
        EaglContext::new(api)
    }

    fn gl_calls(&self, api: RenderingApi) -> GlCalls {
        GlCalls::for_api(api)
    }

    fn current_context(&self) -> Option<EaglContext> {
        EaglContext::current()
    }

    fn set_current_context(&self, context: Option<&EaglContext>) -> Result<()> {
        EaglContext::set_current(context)
    }

    fn renderbuffer_storage(&self, context: &EaglContext, target: GLenum, view: &UIKitView) -> bool {
        context.renderbuffer_storage(target, &view.layer())
    }

    fn present_renderbuffer(&self, context: &EaglContext, target: GLenum) -> bool {
        context.present_renderbuffer(target)
    }

    fn release_context(&self, context: EaglContext) {
        drop(context);
    }

    fn schedule_repeating(&self, interval: Duration, tick: Box<dyn FnMut()>) -> NsTimer {
        NsTimer::schedule(interval, tick, self.mtm)
    }
}

/// Create a UIKit-backed game view
///
/// The view's layout and window callbacks hold only a weak handle, so the
/// returned `GameView` controls the lifetime.
pub fn create_game_view(config: GameViewConfig, mtm: MainThreadMarker) -> GameView<UIKitBackend> {
    let ui_view = GameUIView::new(mtm);
    let game = GameView::with_config(
        UIKitBackend::new(mtm),
        UIKitView::new(ui_view.clone()),
        config,
    );

    let weak = game.downgrade();
    ui_view.set_layout_hook(move || {
        if let Some(game) = weak.upgrade() {
            if let Err(err) = game.layout_subviews() {
                warn!("Failed to resize framebuffer on layout: {}", err);
            }
        }
    });

    let weak = game.downgrade();
    ui_view.set_move_to_window_hook(move |has_window| {
        if let Some(game) = weak.upgrade() {
            if let Err(err) = game.will_move_to_window(has_window) {
                warn!("Failed to stop game view leaving its window: {}", err);
            }
        }
    });

    game
}
