//! Game window abstraction and geometry types

use crate::error::{GameViewError, Result};
use crate::event::{EventHandler, EventKind, SubscriptionId};

/// Integer size in points
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in points
    pub width: i32,
    /// Height in points
    pub height: i32,
}

impl Size {
    /// Create a new size
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Round a fractional size to the nearest integer size
    ///
    /// Halfway values round away from zero.
    pub fn round(width: f64, height: f64) -> Self {
        Self {
            width: width.round() as i32,
            height: height.round() as i32,
        }
    }

    /// Check if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    /// Top-left corner
    pub origin: Point,
    /// Extent
    pub size: Size,
}

/// Window presentation state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

/// Window border style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowBorder {
    #[default]
    Resizable,
    Fixed,
    Hidden,
}

/// Platform-specific window information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowInfo {
    /// Opaque native handle
    pub handle: usize,
}

/// Game window abstraction
///
/// The interface a game loop drives: run/stop, frame and lifecycle
/// notifications, context management, and window properties. Platforms that
/// have no native equivalent for a property keep the provided implementation,
/// which reports [`GameViewError::Unsupported`] (or [`GameViewError::Disposed`]
/// once the window is gone).
pub trait GameWindow {
    /// Whether [`GameWindow::dispose`] has run
    fn is_disposed(&self) -> bool;

    /// Fail with [`GameViewError::Disposed`] once the window is disposed
    fn check_disposed(&self) -> Result<()> {
        if self.is_disposed() {
            Err(GameViewError::Disposed)
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create graphics resources and start the frame loop at the default rate
    fn run(&self) -> Result<()>;

    /// Create graphics resources and start the frame loop at `updates_per_second`
    ///
    /// A rate of zero means the platform default.
    fn run_at(&self, updates_per_second: f64) -> Result<()>;

    /// Stop the frame loop and release graphics resources
    fn stop(&self) -> Result<()>;

    /// Request that the window close
    fn close(&self) -> Result<()>;

    /// Release everything. Calling it again does nothing.
    fn dispose(&self);

    /// Pump pending platform events
    fn process_events(&self) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("process_events"))
    }

    // ------------------------------------------------------------------
    // Graphics context
    // ------------------------------------------------------------------

    /// Make the window's graphics context current on this thread
    fn make_current(&self) -> Result<()>;

    /// Present the rendered frame
    fn swap_buffers(&self) -> Result<()>;

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Register a notification handler
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Result<SubscriptionId>;

    /// Remove a notification handler
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool>;

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Window title
    fn title(&self) -> Result<String>;

    /// Set the window title
    fn set_title(&self, title: &str) -> Result<()>;

    /// Whether the window is visible
    fn is_visible(&self) -> Result<bool>;

    /// Show or hide the window
    fn set_visible(&self, visible: bool) -> Result<()>;

    /// Presentation state
    fn window_state(&self) -> Result<WindowState>;

    /// Change the presentation state
    fn set_window_state(&self, state: WindowState) -> Result<()>;

    /// Border style
    fn window_border(&self) -> Result<WindowBorder>;

    /// Change the border style
    fn set_window_border(&self, border: WindowBorder) -> Result<()>;

    /// Drawable size
    fn size(&self) -> Result<Size>;

    /// Change the drawable size
    fn set_size(&self, size: Size) -> Result<()>;

    /// Native window information, if the platform has any
    fn window_info(&self) -> Result<Option<WindowInfo>>;

    /// Whether the window has keyboard focus
    fn is_focused(&self) -> Result<bool> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("is_focused"))
    }

    /// Whether the native window exists
    fn exists(&self) -> Result<bool> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("exists"))
    }

    /// Outer bounds in screen coordinates
    fn bounds(&self) -> Result<Rectangle> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("bounds"))
    }

    /// Move and resize the window
    fn set_bounds(&self, _bounds: Rectangle) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("bounds"))
    }

    /// Top-left corner in screen coordinates
    fn location(&self) -> Result<Point> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("location"))
    }

    /// Move the window
    fn set_location(&self, _location: Point) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("location"))
    }

    /// Left edge in screen coordinates
    fn x(&self) -> Result<i32> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("x"))
    }

    /// Move the left edge
    fn set_x(&self, _x: i32) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("x"))
    }

    /// Top edge in screen coordinates
    fn y(&self) -> Result<i32> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("y"))
    }

    /// Move the top edge
    fn set_y(&self, _y: i32) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("y"))
    }

    /// Outer width
    fn width(&self) -> Result<i32> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("width"))
    }

    /// Change the outer width
    fn set_width(&self, _width: i32) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("width"))
    }

    /// Outer height
    fn height(&self) -> Result<i32> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("height"))
    }

    /// Change the outer height
    fn set_height(&self, _height: i32) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("height"))
    }

    /// Client area in window coordinates
    fn client_rectangle(&self) -> Result<Rectangle> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("client_rectangle"))
    }

    /// Change the client area
    fn set_client_rectangle(&self, _rect: Rectangle) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("client_rectangle"))
    }

    /// Client area size
    fn client_size(&self) -> Result<Size> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("client_size"))
    }

    /// Change the client area size
    fn set_client_size(&self, _size: Size) -> Result<()> {
        self.check_disposed()?;
        Err(GameViewError::Unsupported("client_size"))
    }

    /// Map a screen point into client coordinates
    fn point_to_client(&self, point: Point) -> Result<Point>;

    /// Map a client point into screen coordinates
    fn point_to_screen(&self, point: Point) -> Result<Point>;
}
