//! iOS Game View
//!
//! UIKit integration and OpenGL ES rendering for games on iOS.
//!
//! This crate implements the `gameview_platform` [`GameWindow`] interface for
//! an iOS view: the game draws into a framebuffer backed by the view's
//! compositor layer, and a repeating run-loop timer drives the frame loop.
//!
//! # Architecture
//!
//! On iOS the run loop belongs to UIKit, so the game view is driven from it:
//!
//! - **NSTimer** fires each frame tick (`UpdateFrame`, then `RenderFrame`)
//! - **CAEAGLLayer** backs the renderbuffer the game draws into
//! - **EAGLContext** owns the OpenGL ES state, ES 1.1 or ES 2.0
//! - **layoutSubviews** recreates the framebuffer when the layer is resized
//!
//! The platform pieces sit behind the traits in [`native`], so the whole
//! lifecycle also runs headless in tests.
//!
//! # Usage
//!
//! ```ignore
//! use gameview_platform::prelude::*;
//! use gameview_platform_ios::{create_game_view, ColorFormat, GameViewConfig};
//!
//! let game = create_game_view(GameViewConfig::new(ColorFormat::Rgba8), mtm);
//! game.subscribe(EventKind::RenderFrame, Rc::new(|event| render(event)))?;
//! game.run()?;
//! ```
//!
//! [`GameWindow`]: gameview_platform::GameWindow

pub mod config;
pub mod gl;
pub mod native;
mod view;

#[cfg(target_os = "ios")]
mod eagl;
#[cfg(target_os = "ios")]
mod timer;
#[cfg(target_os = "ios")]
mod uikit;

#[cfg(test)]
mod fake;

// Re-export public types
pub use config::{
    frame_interval, ColorFormat, DrawableProperties, GameViewConfig, RenderingApi,
    DEFAULT_UPDATES_PER_SECOND,
};
pub use gl::GlCalls;
pub use native::{Backend, ContextId, GraphicsContext, NativeView, RepeatingTimer, ViewController};
pub use view::{GameView, LayerConfigurator, WeakGameView};

#[cfg(target_os = "ios")]
pub use eagl::EaglContext;
#[cfg(target_os = "ios")]
pub use timer::NsTimer;
#[cfg(target_os = "ios")]
pub use uikit::{create_game_view, GameUIView, UIKitBackend, UIKitView, UIKitViewController};

/// Install a `tracing` subscriber that prints to stderr
///
/// Xcode shows stderr in its console. Calling this more than once is
/// harmless; only the first subscriber is kept.
#[cfg(feature = "tracing-subscriber")]
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    let subscriber =
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_target(true));
    let _ = tracing::subscriber::set_global_default(subscriber);
}
