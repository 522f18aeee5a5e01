//! GPU call table
//!
//! OpenGL ES 1.1 exposes framebuffer objects through the
//! `GL_OES_framebuffer_object` extension (`glBindFramebufferOES`, ...), while
//! OpenGL ES 2.0 has them in core (`glBindFramebuffer`, ...). The enum values
//! are identical in both. [`GlCalls`] hides the difference: it is resolved once
//! when a context is created and then called without branching on the API.

use crate::config::RenderingApi;

pub type GLenum = u32;
pub type GLuint = u32;
pub type GLint = i32;
pub type GLsizei = i32;

/// `GL_FRAMEBUFFER` / `GL_FRAMEBUFFER_OES`
pub const FRAMEBUFFER: GLenum = 0x8D40;
/// `GL_RENDERBUFFER` / `GL_RENDERBUFFER_OES`
pub const RENDERBUFFER: GLenum = 0x8D41;
/// `GL_COLOR_ATTACHMENT0` / `GL_COLOR_ATTACHMENT0_OES`
pub const COLOR_ATTACHMENT0: GLenum = 0x8CE0;
/// `GL_RENDERBUFFER_BINDING` / `GL_RENDERBUFFER_BINDING_OES`
pub const RENDERBUFFER_BINDING: GLenum = 0x8CA7;

/// Framebuffer-management entry points for one OpenGL ES version
///
/// Every entry assumes the owning context is current on the calling thread.
#[derive(Clone, Copy, Debug)]
pub struct GlCalls {
    /// API this table was resolved for
    pub api: RenderingApi,
    pub bind_framebuffer: fn(target: GLenum, framebuffer: GLuint),
    pub bind_renderbuffer: fn(target: GLenum, renderbuffer: GLuint),
    pub delete_framebuffer: fn(framebuffer: GLuint),
    pub delete_renderbuffer: fn(renderbuffer: GLuint),
    pub framebuffer_renderbuffer:
        fn(target: GLenum, attachment: GLenum, renderbuffer_target: GLenum, renderbuffer: GLuint),
    pub gen_framebuffer: fn() -> GLuint,
    pub gen_renderbuffer: fn() -> GLuint,
    pub get_integer: fn(name: GLenum) -> GLint,
    pub scissor: fn(x: GLint, y: GLint, width: GLsizei, height: GLsizei),
    pub viewport: fn(x: GLint, y: GLint, width: GLsizei, height: GLsizei),
}

#[cfg(target_os = "ios")]
mod ffi {
    use super::{GLenum, GLint, GLsizei, GLuint};

    #[link(name = "OpenGLES", kind = "framework")]
    extern "C" {
        pub fn glBindFramebufferOES(target: GLenum, framebuffer: GLuint);
        pub fn glBindRenderbufferOES(target: GLenum, renderbuffer: GLuint);
        pub fn glDeleteFramebuffersOES(n: GLsizei, framebuffers: *const GLuint);
        pub fn glDeleteRenderbuffersOES(n: GLsizei, renderbuffers: *const GLuint);
        pub fn glFramebufferRenderbufferOES(
            target: GLenum,
            attachment: GLenum,
            renderbuffertarget: GLenum,
            renderbuffer: GLuint,
        );
        pub fn glGenFramebuffersOES(n: GLsizei, framebuffers: *mut GLuint);
        pub fn glGenRenderbuffersOES(n: GLsizei, renderbuffers: *mut GLuint);

        pub fn glBindFramebuffer(target: GLenum, framebuffer: GLuint);
        pub fn glBindRenderbuffer(target: GLenum, renderbuffer: GLuint);
        pub fn glDeleteFramebuffers(n: GLsizei, framebuffers: *const GLuint);
        pub fn glDeleteRenderbuffers(n: GLsizei, renderbuffers: *const GLuint);
        pub fn glFramebufferRenderbuffer(
            target: GLenum,
            attachment: GLenum,
            renderbuffertarget: GLenum,
            renderbuffer: GLuint,
        );
        pub fn glGenFramebuffers(n: GLsizei, framebuffers: *mut GLuint);
        pub fn glGenRenderbuffers(n: GLsizei, renderbuffers: *mut GLuint);

        pub fn glGetIntegerv(pname: GLenum, params: *mut GLint);
        pub fn glScissor(x: GLint, y: GLint, width: GLsizei, height: GLsizei);
        pub fn glViewport(x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    }
}

// SAFETY (all entries below): the adapter only calls through the table while
// the context it was resolved for is current on the main thread, and every
// pointer handed to GL refers to a single live GLuint/GLint.
#[cfg(target_os = "ios")]
impl GlCalls {
    /// Resolve the call table for `api`
    pub fn for_api(api: RenderingApi) -> Self {
        match api {
            RenderingApi::OpenGles1 => Self::es1(),
            RenderingApi::OpenGles2 => Self::es2(),
        }
    }

    fn es1() -> Self {
        Self {
            api: RenderingApi::OpenGles1,
            bind_framebuffer: |t, f| unsafe { ffi::glBindFramebufferOES(t, f) },
            bind_renderbuffer: |t, r| unsafe { ffi::glBindRenderbufferOES(t, r) },
            delete_framebuffer: |f| unsafe { ffi::glDeleteFramebuffersOES(1, &f) },
            delete_renderbuffer: |r| unsafe { ffi::glDeleteRenderbuffersOES(1, &r) },
            framebuffer_renderbuffer: |t, a, rt, rb| unsafe {
                ffi::glFramebufferRenderbufferOES(t, a, rt, rb)
            },
            gen_framebuffer: || {
                let mut id = 0;
                unsafe { ffi::glGenFramebuffersOES(1, &mut id) };
                id
            },
            gen_renderbuffer: || {
                let mut id = 0;
                unsafe { ffi::glGenRenderbuffersOES(1, &mut id) };
                id
            },
            get_integer,
            scissor: |x, y, w, h| unsafe { ffi::glScissor(x, y, w, h) },
            viewport: |x, y, w, h| unsafe { ffi::glViewport(x, y, w, h) },
        }
    }

    fn es2() -> Self {
        Self {
            api: RenderingApi::OpenGles2,
            bind_framebuffer: |t, f| unsafe { ffi::glBindFramebuffer(t, f) },
            bind_renderbuffer: |t, r| unsafe { ffi::glBindRenderbuffer(t, r) },
            delete_framebuffer: |f| unsafe { ffi::glDeleteFramebuffers(1, &f) },
            delete_renderbuffer: |r| unsafe { ffi::glDeleteRenderbuffers(1, &r) },
            framebuffer_renderbuffer: |t, a, rt, rb| unsafe {
                ffi::glFramebufferRenderbuffer(t, a, rt, rb)
            },
            gen_framebuffer: || {
                let mut id = 0;
                unsafe { ffi::glGenFramebuffers(1, &mut id) };
                id
            },
            gen_renderbuffer: || {
                let mut id = 0;
                unsafe { ffi::glGenRenderbuffers(1, &mut id) };
                id
            },
            get_integer,
            scissor: |x, y, w, h| unsafe { ffi::glScissor(x, y, w, h) },
            viewport: |x, y, w, h| unsafe { ffi::glViewport(x, y, w, h) },
        }
    }
}

#[cfg(target_os = "ios")]
fn get_integer(name: GLenum) -> GLint {
    let mut value = 0;
    unsafe { ffi::glGetIntegerv(name, &mut value) };
    value
}
