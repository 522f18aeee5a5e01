//! Game View Platform Abstraction
//!
//! This crate defines the cross-platform game window interface that
//! platform view adapters implement, independent of any native toolkit.
//!
//! # Architecture
//!
//! - [`GameWindow`] - run/stop, graphics context, notifications, properties
//! - [`GameWindowEvent`] / [`EventDispatcher`] - ordered notification delivery
//! - [`GameViewError`] - error taxonomy shared by all implementations
//!
//! Notifications fire in a fixed order: `Load`, then one `UpdateFrame`
//! followed by one `RenderFrame` per tick, then `Unload`.
//!
//! # Platform Implementations
//!
//! - `gameview_platform_ios` - UIKit view with an EAGL-backed framebuffer
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use gameview_platform::*;
//!
//! fn start(window: &impl GameWindow) -> Result<()> {
//!     window.subscribe(
//!         EventKind::UpdateFrame,
//!         Rc::new(|event| {
//!             if let Some(args) = event.frame_args() {
//!                 // Advance the simulation by args.time seconds
//!             }
//!         }),
//!     )?;
//!     window.run_at(30.0)
//! }
//! ```

mod error;
mod event;
mod window;

// Re-export all public types
pub use error::{GameViewError, Result};
pub use event::{
    EventDispatcher, EventHandler, EventKind, FrameEventArgs, GameWindowEvent, SubscriptionId,
};
pub use window::{GameWindow, Point, Rectangle, Size, WindowBorder, WindowInfo, WindowState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{GameViewError, Result};
    pub use crate::event::{
        EventDispatcher, EventHandler, EventKind, FrameEventArgs, GameWindowEvent, SubscriptionId,
    };
    pub use crate::window::{
        GameWindow, Point, Rectangle, Size, WindowBorder, WindowInfo, WindowState,
    };
}
