//! EAGL context handling
//!
//! `EAGLContext` has no typed binding in the objc2 framework crates, so it is
//! driven through `msg_send!` on `AnyObject`.

use std::fmt;

use gameview_platform::{GameViewError, Result};
use objc2::rc::{Allocated, Retained};
use objc2::runtime::AnyObject;
use objc2::{class, msg_send};
use objc2_foundation::NSString;

use crate::config::{ColorFormat, DrawableProperties, RenderingApi};
use crate::gl::GLenum;
use crate::native::{ContextId, GraphicsContext};

// Drawable property keys and color format values exported by OpenGLES.framework
#[link(name = "OpenGLES", kind = "framework")]
extern "C" {
    static kEAGLDrawablePropertyRetainedBacking: &'static NSString;
    static kEAGLDrawablePropertyColorFormat: &'static NSString;
    static kEAGLColorFormatRGBA8: &'static NSString;
    static kEAGLColorFormatRGB565: &'static NSString;
    static kEAGLColorFormatSRGBA8: &'static NSString;
}

fn color_format_value(format: ColorFormat) -> &'static NSString {
    // SAFETY: immutable framework constants, valid for the program's lifetime.
    unsafe {
        match format {
            ColorFormat::Rgba8 => kEAGLColorFormatRGBA8,
            ColorFormat::Rgb565 => kEAGLColorFormatRGB565,
            ColorFormat::Srgba8 => kEAGLColorFormatSRGBA8,
        }
    }
}

/// A retained `EAGLContext`
pub struct EaglContext {
    raw: Retained<AnyObject>,
}

impl EaglContext {
    /// Create a context for `api`
    pub fn new(api: RenderingApi) -> Result<Self> {
        // SAFETY: `initWithAPI:` takes an `EAGLRenderingAPI` (NSUInteger)
        // and returns nil when the API is unavailable.
        let raw: Option<Retained<AnyObject>> = unsafe {
            let alloc: Allocated<AnyObject> = msg_send![class!(EAGLContext), alloc];
            msg_send![alloc, initWithAPI: api as usize]
        };
        raw.map(|raw| Self { raw })
            .ok_or_else(|| GameViewError::platform(format!("EAGLContext refused {api:?}")))
    }

    /// The context current on this thread
    pub fn current() -> Option<Self> {
        // SAFETY: class method with no arguments.
        let raw: Option<Retained<AnyObject>> =
            unsafe { msg_send![class!(EAGLContext), currentContext] };
        raw.map(|raw| Self { raw })
    }

    /// Make `context` current, or clear the current context
    pub fn set_current(context: Option<&Self>) -> Result<()> {
        let raw = context.map(|c| &*c.raw);
        // SAFETY: `setCurrentContext:` accepts a context or nil.
        let ok: bool = unsafe { msg_send![class!(EAGLContext), setCurrentContext: raw] };
        if ok {
            Ok(())
        } else {
            Err(GameViewError::platform("EAGLContext setCurrentContext: failed"))
        }
    }

    /// Back the bound renderbuffer with the drawable `layer`
    pub fn renderbuffer_storage(&self, target: GLenum, layer: &AnyObject) -> bool {
        // SAFETY: `layer` is a CAEAGLLayer and this context is current.
        unsafe {
            msg_send![
                &*self.raw,
                renderbufferStorage: target as usize,
                fromDrawable: layer
            ]
        }
    }

    /// Present the bound renderbuffer
    pub fn present_renderbuffer(&self, target: GLenum) -> bool {
        // SAFETY: this context is current and owns the renderbuffer.
        unsafe { msg_send![&*self.raw, presentRenderbuffer: target as usize] }
    }
}

impl GraphicsContext for EaglContext {
    fn id(&self) -> ContextId {
        ContextId(Retained::as_ptr(&self.raw) as usize)
    }
}

impl fmt::Debug for EaglContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EaglContext").field(&self.id()).finish()
    }
}

/// Write `drawableProperties` on a CAEAGLLayer
pub fn set_drawable_properties(layer: &AnyObject, properties: &DrawableProperties) {
    let color_format = color_format_value(properties.color_format);

    // SAFETY: standard Foundation constructors and setters; the keys are
    // immutable framework constants.
    unsafe {
        let retained: Retained<AnyObject> =
            msg_send![class!(NSNumber), numberWithBool: properties.retained_backing];
        let dict: Retained<AnyObject> = msg_send![class!(NSMutableDictionary), dictionary];
        let _: () = msg_send![
            &*dict,
            setObject: &*retained,
            forKey: kEAGLDrawablePropertyRetainedBacking
        ];
        let _: () = msg_send![
            &*dict,
            setObject: color_format,
            forKey: kEAGLDrawablePropertyColorFormat
        ];
        let _: () = msg_send![layer, setDrawableProperties: &*dict];
    }
}
